//! Identity-preserving wrappers over SDL3 renderer, texture, surface,
//! palette and GPU render state handles.
//!
//! Native query functions hand back pointers to objects that may or may not
//! already have a wrapper (the current render target, a texture's renderer,
//! a surface's palette). This crate keeps one identity registry per handle
//! category so that every native pointer maps to at most one live wrapper,
//! and so that the native reference count always accounts for the
//! references wrappers hold.
//!
//! # Identity
//!
//! - Wrappers created by a native creation call are registered with the
//!   reference the creation call returned.
//! - Wrappers fabricated for a pointer seen through a query take one extra
//!   native reference of their own, once. Later lookups of the same pointer
//!   return the same wrapper while it is alive.
//! - Typed lookups (`try_from_native_as`) refuse a live wrapper carrying a
//!   different [`Driver`] tag.
//!
//! # Thread Safety
//!
//! The registries are safe to use from any thread. Wrapper operations are
//! not: like the native library, every object must only be used from the
//! thread that owns its renderer or window. The binding does not enforce
//! this; [`Options::warn_cross_thread`] logs violations at disposal time.
//!
//! # Memory Management
//!
//! - Wrappers are cheap clones sharing one instance; equality is identity
//! - `dispose()` releases the native reference immediately and is idempotent
//! - Dropping the last clone of an undisposed wrapper releases it as well
//! - Using a disposed wrapper returns [`BindError::Disposed`]
//!
//! # Feature Flags
//!
//! - `sdl3`: link the system SDL3 library and enable [`Bindings::sdl3`]
//! - `sim`: export the in-process simulated native library in [`sim`]

mod config;
mod error;
pub mod ffi;
mod gpu_render_state;
mod handle;
mod hub;
mod palette;
mod pixels;
pub mod registry;
mod renderer;
pub mod resource;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
mod surface;
mod texture;
mod util;

pub use config::Options;
pub use error::{BindError, ErrorCode};
pub use ffi::NativeApi;
pub use gpu_render_state::GpuRenderState;
pub use handle::{Driver, Kind, NativePtr};
pub use hub::{Bindings, BindingsReport, Shared};
pub use palette::Palette;
pub use pixels::{PixelFormat, TextureAccess};
pub use registry::{Registry, RegistryReport};
pub use renderer::Renderer;
pub use resource::Origin;
pub use surface::Surface;
pub use texture::Texture;

/// Library version string.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
