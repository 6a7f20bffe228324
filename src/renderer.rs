//! Renderer wrapper.

use crate::error::BindError;
use crate::ffi::SDL_Window;
use crate::gpu_render_state::GpuRenderState;
use crate::handle::NativePtr;
use crate::hub::{Bindings, Shared};
use crate::pixels::{PixelFormat, TextureAccess};
use crate::resource::{Instance, impl_wrapper, markers, renderer_driver};
use crate::surface::Surface;
use crate::texture::Texture;
use crate::util::{cstr_to_string, option_as_ptr, option_to_cstring};
use libc::c_int;
use std::ptr;
use std::sync::Arc;

/// A 2D rendering context bound to a window.
///
/// Renderers have no native reference count. A renderer wrapper obtained
/// through [`Renderer::from_window`] or [`Renderer::try_from_native`] for a
/// renderer this hub did not create does not own it and never destroys it.
///
/// # Thread Safety
///
/// All operations must be called from the thread that created the window.
/// This is not checked.
#[derive(Clone)]
pub struct Renderer {
    inner: Arc<Instance<markers::Renderer>>,
}

impl_wrapper!(Renderer, markers::Renderer);

impl Renderer {
    /// Create a renderer for `window`.
    ///
    /// `driver` names a render driver (e.g. `"vulkan"`); `None` lets the
    /// native library pick one. The wrapper's [`Driver`](crate::Driver) tag is derived from
    /// the driver actually chosen.
    ///
    /// # Safety
    ///
    /// `window` must be a valid native window.
    pub unsafe fn create(
        bindings: &Bindings,
        window: *mut SDL_Window,
        driver: Option<&str>,
    ) -> Result<Self, BindError> {
        let name = option_to_cstring(driver, "driver")?;
        let api = bindings.api();

        let raw = unsafe { (api.create_renderer)(window, option_as_ptr(&name)) };
        let tag = unsafe { renderer_driver(api, raw) };
        Self::created(bindings.shared(), raw, NativePtr::NULL, tag, "SDL_CreateRenderer")
    }

    /// The renderer attached to `window`, if any.
    ///
    /// # Safety
    ///
    /// `window` must be a valid native window.
    pub unsafe fn from_window(bindings: &Bindings, window: *mut SDL_Window) -> Option<Self> {
        let raw = unsafe { (bindings.api().get_renderer)(window) };
        unsafe { Self::try_from_native(bindings, raw) }
    }

    /// Native name of the render driver.
    pub fn name(&self) -> Result<String, BindError> {
        let raw = self.raw()?;
        let api = &self.inner.shared().api;
        unsafe { cstr_to_string((api.get_renderer_name)(raw)) }
            .ok_or_else(|| BindError::native(api, "SDL_GetRendererName"))
    }

    /// The current render target, or `None` for the default target.
    pub fn render_target(&self) -> Result<Option<Texture>, BindError> {
        let raw = self.raw()?;
        let shared = self.inner.shared();
        let target = unsafe { (shared.api.get_render_target)(raw) };
        Ok(unsafe { Texture::lookup(shared, target, None) })
    }

    /// Set the render target. `None` resets to the default target.
    ///
    /// A disposed texture is an error rather than a reset: the two have
    /// different native meanings.
    pub fn set_render_target(&self, target: Option<&Texture>) -> Result<(), BindError> {
        let raw = self.raw()?;
        let texture = match target {
            Some(texture) => texture.raw()?,
            None => ptr::null_mut(),
        };

        let api = &self.inner.shared().api;
        if unsafe { (api.set_render_target)(raw, texture) } {
            Ok(())
        } else {
            Err(BindError::native(api, "SDL_SetRenderTarget"))
        }
    }

    pub fn create_texture(
        &self,
        format: PixelFormat,
        access: TextureAccess,
        width: u32,
        height: u32,
    ) -> Result<Texture, BindError> {
        let raw = self.raw()?;
        let w = to_c_int(width, "width")?;
        let h = to_c_int(height, "height")?;

        let shared = self.inner.shared();
        let texture = unsafe { (shared.api.create_texture)(raw, format.0, access.into(), w, h) };
        Texture::created(
            shared,
            texture,
            NativePtr::from_raw(raw),
            self.driver(),
            "SDL_CreateTexture",
        )
    }

    pub fn create_texture_from_surface(&self, surface: &Surface) -> Result<Texture, BindError> {
        let raw = self.raw()?;
        let source = surface.raw()?;

        let shared = self.inner.shared();
        let texture = unsafe { (shared.api.create_texture_from_surface)(raw, source) };
        Texture::created(
            shared,
            texture,
            NativePtr::from_raw(raw),
            self.driver(),
            "SDL_CreateTextureFromSurface",
        )
    }

    /// Set custom GPU render state. `None` restores the default state.
    pub fn set_gpu_render_state(&self, state: Option<&GpuRenderState>) -> Result<(), BindError> {
        let raw = self.raw()?;
        let state = match state {
            Some(state) => state.raw()?,
            None => ptr::null_mut(),
        };

        let api = &self.inner.shared().api;
        if unsafe { (api.set_gpu_render_state)(raw, state) } {
            Ok(())
        } else {
            Err(BindError::native(api, "SDL_SetGPURenderState"))
        }
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        self.inner.shared()
    }
}

pub(crate) fn to_c_int(value: u32, param: &'static str) -> Result<c_int, BindError> {
    c_int::try_from(value).map_err(|e| BindError::InvalidArgument {
        param,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::Driver;
    use crate::sim;

    fn setup(driver: Option<&str>) -> (Bindings, *mut SDL_Window, Renderer) {
        let _ = env_logger::builder().is_test(true).try_init();
        let bindings = Bindings::new(sim::api());
        let window = sim::create_window();
        let renderer = unsafe { Renderer::create(&bindings, window, driver) }.unwrap();
        (bindings, window, renderer)
    }

    #[test]
    fn test_driver_tag_from_native_name() {
        let (_bindings, window, renderer) = setup(Some("vulkan"));
        assert_eq!(renderer.driver(), Driver::Vulkan);
        assert_eq!(renderer.name().unwrap(), "vulkan");
        renderer.dispose();
        unsafe { sim::destroy_window(window) };
    }

    #[test]
    fn test_from_window_returns_created_wrapper() {
        let (bindings, window, renderer) = setup(None);
        let found = unsafe { Renderer::from_window(&bindings, window) }.unwrap();
        assert_eq!(found, renderer);
        assert_eq!(bindings.report().renderers.fabricated, 0);
        renderer.dispose();
        unsafe { sim::destroy_window(window) };
    }

    #[test]
    fn test_create_failure_registers_nothing() {
        let bindings = Bindings::new(sim::api());
        let window = sim::create_window();
        let err = unsafe { Renderer::create(&bindings, window, Some("glide")) }.unwrap_err();
        assert!(matches!(err, BindError::Native { operation: "SDL_CreateRenderer", .. }));
        assert!(bindings.renderers().is_empty());
        unsafe { sim::destroy_window(window) };
    }

    #[test]
    fn test_disposed_renderer_is_an_error() {
        let (_bindings, window, renderer) = setup(None);
        let raw = renderer.raw().unwrap();
        renderer.dispose();
        renderer.dispose();
        assert!(!sim::is_alive(raw));
        assert!(matches!(renderer.name(), Err(BindError::Disposed { .. })));
        unsafe { sim::destroy_window(window) };
    }

    #[test]
    fn test_unowned_renderer_never_destroys() {
        let bindings = Bindings::new(sim::api());
        let window = sim::create_window();
        let raw = unsafe { (sim::api().create_renderer)(window, std::ptr::null()) };

        let borrowed = unsafe { Renderer::from_window(&bindings, window) }.unwrap();
        assert_eq!(borrowed.origin(), crate::Origin::Unowned);
        assert_eq!(borrowed.driver(), Driver::Software);
        drop(borrowed);
        assert!(sim::is_alive(raw));
        assert!(bindings.renderers().is_empty());

        unsafe {
            (sim::api().destroy_renderer)(raw);
            sim::destroy_window(window);
        }
    }

    #[test]
    fn test_oversized_texture_rejected_before_native_call() {
        let (_bindings, window, renderer) = setup(None);
        let err = renderer
            .create_texture(PixelFormat::RGBA8888, TextureAccess::Static, u32::MAX, 1)
            .unwrap_err();
        assert!(matches!(err, BindError::InvalidArgument { param: "width", .. }));
        renderer.dispose();
        unsafe { sim::destroy_window(window) };
    }
}
