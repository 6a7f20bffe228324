//! Texture wrapper.

use crate::error::BindError;
use crate::pixels::PixelFormat;
use crate::renderer::Renderer;
use crate::resource::{Instance, impl_wrapper, markers};
use std::sync::Arc;

/// A texture owned by a renderer.
///
/// Textures are reference counted natively. A texture created through
/// [`Renderer::create_texture`] holds the reference returned by the creation
/// call; a texture wrapper fabricated for a pointer seen through a query
/// (such as [`Renderer::render_target`]) takes one extra reference of its
/// own. Either way, disposing or dropping the last clone releases exactly
/// that one reference.
///
/// The texture is tagged with its renderer's [`Driver`](crate::Driver).
/// Releasing the renderer frees the texture natively and leaves every
/// wrapper for it disposed.
///
/// # Thread Safety
///
/// All operations must be called from the thread that owns the renderer.
#[derive(Clone)]
pub struct Texture {
    inner: Arc<Instance<markers::Texture>>,
}

impl_wrapper!(Texture, markers::Texture);

impl Texture {
    /// The renderer that created this texture.
    pub fn renderer(&self) -> Result<Option<Renderer>, BindError> {
        let raw = self.raw()?;
        let shared = self.inner.shared();
        let renderer = unsafe { (shared.api.get_renderer_from_texture)(raw) };
        Ok(unsafe { Renderer::lookup(shared, renderer, None) })
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

    pub fn size(&self) -> Result<(u32, u32), BindError> {
        Ok((self.width()?, self.height()?))
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
    use crate::handle::Driver;
    use crate::hub::Bindings;
    use crate::pixels::TextureAccess;
    use crate::sim;

    #[test]
    fn test_texture_properties() {
        let bindings = Bindings::new(sim::api());
        let window = sim::create_window();
        let renderer = unsafe { Renderer::create(&bindings, window, Some("metal")) }.unwrap();

        let texture = renderer
            .create_texture(PixelFormat::ABGR8888, TextureAccess::Streaming, 32, 16)
            .unwrap();
        assert_eq!(texture.size().unwrap(), (32, 16));
        assert_eq!(texture.format().unwrap(), PixelFormat::ABGR8888);
        assert_eq!(texture.driver(), Driver::Metal);
        assert_eq!(texture.native_refcount().unwrap(), 1);
        assert_eq!(texture.renderer().unwrap(), Some(renderer.clone()));

        texture.dispose();
        assert!(matches!(texture.width(), Err(BindError::Disposed { .. })));

        renderer.dispose();
        unsafe { sim::destroy_window(window) };
    }

    #[test]
    fn test_renderer_disposal_retires_its_textures() {
        let bindings = Bindings::new(sim::api());
        let api = sim::api();
        let window = sim::create_window();
        let other_window = sim::create_window();
        let renderer = unsafe { Renderer::create(&bindings, window, Some("vulkan")) }.unwrap();
        let other = unsafe { Renderer::create(&bindings, other_window, None) }.unwrap();

        let created = renderer
            .create_texture(PixelFormat::RGBA8888, TextureAccess::Target, 8, 8)
            .unwrap();
        let raw = created.raw().unwrap();
        let native = unsafe {
            (api.create_texture)(renderer.raw().unwrap(), PixelFormat::RGBA8888.0, 0, 2, 2)
        };
        let borrowed = unsafe { Texture::try_from_native(&bindings, native) }.unwrap();
        let survivor = other
            .create_texture(PixelFormat::RGBA8888, TextureAccess::Static, 4, 4)
            .unwrap();

        renderer.dispose();
        assert!(!sim::is_alive(raw));
        assert!(!sim::is_alive(native));
        assert!(created.is_disposed());
        assert!(borrowed.is_disposed());
        assert!(matches!(created.renderer(), Err(BindError::Disposed { .. })));
        assert!(matches!(borrowed.width(), Err(BindError::Disposed { .. })));
        assert_eq!(bindings.textures().len(), 1);

        assert!(!survivor.is_disposed());
        assert_eq!(survivor.renderer().unwrap(), Some(other.clone()));

        drop(created);
        drop(borrowed);
        survivor.dispose();
        other.dispose();
        unsafe {
            sim::destroy_window(window);
            sim::destroy_window(other_window);
        }
    }

    #[test]
    fn test_fabricated_texture_detects_driver() {
        let bindings = Bindings::new(sim::api());
        let window = sim::create_window();
        let api = sim::api();
        let name = std::ffi::CString::new("direct3d12").unwrap();
        let renderer = unsafe { (api.create_renderer)(window, name.as_ptr()) };
        let raw = unsafe { (api.create_texture)(renderer, PixelFormat::RGBA8888.0, 0, 4, 4) };

        let texture = unsafe { Texture::try_from_native(&bindings, raw) }.unwrap();
        assert_eq!(texture.driver(), Driver::Direct3D12);
        assert_eq!(texture.origin(), crate::Origin::Borrowed);
        assert_eq!(texture.native_refcount().unwrap(), 2);

        drop(texture);
        assert_eq!(unsafe { (*raw).refcount }, 1);

        unsafe {
            (api.destroy_texture)(raw);
            (api.destroy_renderer)(renderer);
            sim::destroy_window(window);
        }
    }
}
