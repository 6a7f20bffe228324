//! Palette wrapper.

use crate::error::BindError;
use crate::ffi::SDL_Color;
use crate::handle::{Driver, NativePtr};
use crate::hub::Bindings;
use crate::resource::{Instance, impl_wrapper, markers};
use libc::c_int;
use std::sync::Arc;

/// A color palette for indexed surfaces. Reference counted natively.
#[derive(Clone)]
pub struct Palette {
    inner: Arc<Instance<markers::Palette>>,
}

impl_wrapper!(Palette, markers::Palette);

impl Palette {
    /// Allocate a palette of `ncolors` entries, initialized to white.
    pub fn create(bindings: &Bindings, ncolors: usize) -> Result<Self, BindError> {
        let ncolors = c_int::try_from(ncolors).map_err(|e| BindError::InvalidArgument {
            param: "ncolors",
            reason: e.to_string(),
        })?;

        let raw = unsafe { (bindings.api().create_palette)(ncolors) };
        Self::created(
            bindings.shared(),
            raw,
            NativePtr::NULL,
            Driver::Generic,
            "SDL_CreatePalette",
        )
    }

    pub fn len(&self) -> Result<usize, BindError> {
        let raw = self.raw()?;
        Ok(unsafe { (*raw).ncolors }.max(0) as usize)
    }

    pub fn is_empty(&self) -> Result<bool, BindError> {
        Ok(self.len()? == 0)
    }

    /// A copy of the palette entries.
    pub fn colors(&self) -> Result<Vec<SDL_Color>, BindError> {
        let raw = self.raw()?;
        let len = self.len()?;
        let colors = unsafe { (*raw).colors };
        if colors.is_null() {
            return Ok(Vec::new());
        }
        Ok(unsafe { std::slice::from_raw_parts(colors, len) }.to_vec())
    }

    /// Current value of the native reference count. Diagnostic only.
    pub fn native_refcount(&self) -> Result<i32, BindError> {
        let raw = self.raw()?;
        Ok(unsafe { (*raw).refcount })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim;

    #[test]
    fn test_palette_colors() {
        let bindings = Bindings::new(sim::api());
        let palette = Palette::create(&bindings, 3).unwrap();
        assert_eq!(palette.len().unwrap(), 3);
        let colors = palette.colors().unwrap();
        assert_eq!(colors.len(), 3);
        assert!(colors.iter().all(|c| c.r == 0xff && c.a == 0xff));
    }

    #[test]
    fn test_zero_colors_is_a_native_error() {
        let bindings = Bindings::new(sim::api());
        let err = Palette::create(&bindings, 0).unwrap_err();
        assert!(matches!(err, BindError::Native { operation: "SDL_CreatePalette", .. }));
    }

    #[test]
    fn test_palette_from_native_is_borrowed_once() {
        let bindings = Bindings::new(sim::api());
        let raw = unsafe { (sim::api().create_palette)(4) };
        unsafe { sim::retain_palette(raw) };

        let first = unsafe { Palette::try_from_native(&bindings, raw) }.unwrap();
        let second = unsafe { Palette::try_from_native(&bindings, raw) }.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.native_refcount().unwrap(), 3);

        first.dispose();
        assert!(second.is_disposed());
        unsafe {
            assert_eq!((*raw).refcount, 2);
            (sim::api().destroy_palette)(raw);
            (sim::api().destroy_palette)(raw);
        }
        assert!(!sim::is_alive(raw));
    }

    #[test]
    fn test_drop_last_clone_releases() {
        let bindings = Bindings::new(sim::api());
        let palette = Palette::create(&bindings, 2).unwrap();
        let raw = palette.raw().unwrap();
        let clone = palette.clone();

        drop(palette);
        assert!(sim::is_alive(raw));
        drop(clone);
        assert!(!sim::is_alive(raw));
        assert!(bindings.palettes().is_empty());
    }
}
