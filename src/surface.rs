//! Surface wrapper.

use crate::error::BindError;
use crate::handle::{Driver, NativePtr};
use crate::hub::Bindings;
use crate::palette::Palette;
use crate::pixels::PixelFormat;
use crate::renderer::to_c_int;
use crate::resource::{Instance, impl_wrapper, markers};
use std::sync::Arc;

/// A block of pixels in system memory.
///
/// Surfaces are reference counted natively and are not bound to a renderer,
/// so they always carry [`Driver::Generic`].
#[derive(Clone)]
pub struct Surface {
    inner: Arc<Instance<markers::Surface>>,
}

impl_wrapper!(Surface, markers::Surface);

impl Surface {
    /// Allocate a new surface. Indexed formats get a palette from the native
    /// library.
    pub fn create(
        bindings: &Bindings,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<Self, BindError> {
        let w = to_c_int(width, "width")?;
        let h = to_c_int(height, "height")?;

        let raw = unsafe { (bindings.api().create_surface)(w, h, format.0) };
        Self::created(
            bindings.shared(),
            raw,
            NativePtr::NULL,
            Driver::Generic,
            "SDL_CreateSurface",
        )
    }

    /// The palette used by this surface, if it has one.
    pub fn palette(&self) -> Result<Option<Palette>, BindError> {
        let raw = self.raw()?;
        let shared = self.inner.shared();
        let palette = unsafe { (shared.api.get_surface_palette)(raw) };
        Ok(unsafe { Palette::lookup(shared, palette, None) })
    }

    /// Use `palette` for this surface. The surface takes its own native
    /// reference on the palette.
    pub fn set_palette(&self, palette: &Palette) -> Result<(), BindError> {
        let raw = self.raw()?;
        let palette = palette.raw()?;

        let api = &self.inner.shared().api;
        if unsafe { (api.set_surface_palette)(raw, palette) } {
            Ok(())
        } else {
            Err(BindError::native(api, "SDL_SetSurfacePalette"))
        }
    }

    pub fn format(&self) -> Result<PixelFormat, BindError> {
        let raw = self.raw()?;
        Ok(PixelFormat(unsafe { (*raw).format }))
    }

    pub fn width(&self) -> Result<u32, BindError> {
        let raw = self.raw()?;
        Ok(unsafe { (*raw).w }.max(0) as u32)
    }

    pub fn height(&self) -> Result<u32, BindError> {
        let raw = self.raw()?;
        Ok(unsafe { (*raw).h }.max(0) as u32)
    }

    /// Bytes between rows of pixels.
    pub fn pitch(&self) -> Result<u32, BindError> {
        let raw = self.raw()?;
        Ok(unsafe { (*raw).pitch }.max(0) as u32)
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
    fn test_surface_properties() {
        let bindings = Bindings::new(sim::api());
        let surface = Surface::create(&bindings, 10, 3, PixelFormat::XRGB8888).unwrap();
        assert_eq!(surface.width().unwrap(), 10);
        assert_eq!(surface.height().unwrap(), 3);
        assert_eq!(surface.pitch().unwrap(), 40);
        assert_eq!(surface.driver(), Driver::Generic);
        assert!(surface.palette().unwrap().is_none());
    }

    #[test]
    fn test_indexed_surface_palette_is_borrowed() {
        let bindings = Bindings::new(sim::api());
        let surface = Surface::create(&bindings, 4, 4, PixelFormat::INDEX8).unwrap();

        let palette = surface.palette().unwrap().unwrap();
        assert_eq!(palette.native_refcount().unwrap(), 2);
        assert_eq!(surface.palette().unwrap().unwrap(), palette);
        assert_eq!(palette.native_refcount().unwrap(), 2);

        let raw = palette.raw().unwrap();
        drop(palette);
        assert_eq!(unsafe { (*raw).refcount }, 1);

        surface.dispose();
        assert!(!sim::is_alive(raw));
    }

    #[test]
    fn test_set_palette_shares_ownership() {
        let bindings = Bindings::new(sim::api());
        let surface = Surface::create(&bindings, 2, 2, PixelFormat::INDEX8).unwrap();
        let palette = Palette::create(&bindings, 16).unwrap();

        surface.set_palette(&palette).unwrap();
        assert_eq!(palette.native_refcount().unwrap(), 2);
        assert_eq!(surface.palette().unwrap(), Some(palette.clone()));

        let raw = palette.raw().unwrap();
        palette.dispose();
        assert!(sim::is_alive(raw));
        surface.dispose();
        assert!(!sim::is_alive(raw));
    }

    #[test]
    fn test_outside_owner_keeps_surface_alive() {
        let bindings = Bindings::new(sim::api());
        let surface = Surface::create(&bindings, 2, 2, PixelFormat::RGBA8888).unwrap();
        let raw = surface.raw().unwrap();
        unsafe { sim::retain_surface(raw) };

        surface.dispose();
        assert!(sim::is_alive(raw));

        let found = unsafe { Surface::try_from_native(&bindings, raw) }.unwrap();
        assert_eq!(found.origin(), crate::Origin::Borrowed);
        assert_eq!(found.native_refcount().unwrap(), 2);
        drop(found);
        assert_eq!(unsafe { (*raw).refcount }, 1);

        unsafe { (sim::api().destroy_surface)(raw) };
        assert!(!sim::is_alive(raw));
    }

    #[test]
    fn test_failed_create_reports_native_error() {
        let bindings = Bindings::new(sim::api());
        sim::fail_next_create();
        let err = Surface::create(&bindings, 1, 1, PixelFormat::RGBA8888).unwrap_err();
        assert!(err.to_string().contains("Out of memory"));
        assert!(bindings.surfaces().is_empty());
    }
}
