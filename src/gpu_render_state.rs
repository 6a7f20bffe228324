//! Custom GPU render state wrapper.

use crate::error::BindError;
use crate::ffi::{SDL_GPURenderStateCreateInfo, SDL_GPUShader};
use crate::handle::NativePtr;
use crate::renderer::Renderer;
use crate::resource::{Instance, impl_wrapper, markers};
use std::sync::Arc;

/// Custom fragment shader state for a GPU renderer.
///
/// Not reference counted natively; like renderers, a wrapper fabricated for
/// a state this hub did not create never destroys it. The state carries its
/// renderer's [`Driver`](crate::Driver) tag.
#[derive(Clone)]
pub struct GpuRenderState {
    inner: Arc<Instance<markers::GpuRenderState>>,
}

impl_wrapper!(GpuRenderState, markers::GpuRenderState);

impl GpuRenderState {
    /// Create render state for `renderer` using `fragment_shader` and no
    /// extra resource bindings.
    ///
    /// # Safety
    ///
    /// `fragment_shader` must be a shader created on the renderer's GPU
    /// device.
    pub unsafe fn create(
        renderer: &Renderer,
        fragment_shader: *mut SDL_GPUShader,
    ) -> Result<Self, BindError> {
        let raw_renderer = renderer.raw()?;
        let shared = renderer.shared();

        let mut create_info = SDL_GPURenderStateCreateInfo::with_fragment_shader(fragment_shader);
        let raw = unsafe { (shared.api.create_gpu_render_state)(raw_renderer, &mut create_info) };
        Self::created(
            shared,
            raw,
            NativePtr::from_raw(raw_renderer),
            renderer.driver(),
            "SDL_CreateGPURenderState",
        )
    }
}
