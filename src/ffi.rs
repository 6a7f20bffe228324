//! Raw C ABI of the wrapped SDL3 library.
//!
//! Only the handful of structs whose layout the binding actually reads are
//! mirrored here: the ones carrying an embedded `refcount`. Everything else is
//! an opaque type that is only ever passed around by pointer.

#![allow(non_camel_case_types)]

use libc::{c_char, c_int, c_void};

/// SDL pixel format enum value (`SDL_PixelFormat`).
pub type SDL_PixelFormat = u32;

/// SDL texture access enum value (`SDL_TextureAccess`).
pub type SDL_TextureAccess = c_int;

/// SDL properties group id (`SDL_PropertiesID`).
pub type SDL_PropertiesID = u32;

/// Public part of `SDL_Texture`.
#[repr(C)]
#[derive(Debug)]
pub struct SDL_Texture {
    /// The format of the texture, read-only
    pub format: SDL_PixelFormat,
    /// The width of the texture, read-only
    pub w: c_int,
    /// The height of the texture, read-only
    pub h: c_int,
    /// Application reference count, used when freeing texture
    pub refcount: c_int,
}

/// Public part of `SDL_Surface`.
#[repr(C)]
#[derive(Debug)]
pub struct SDL_Surface {
    /// Surface flags, read-only
    pub flags: u32,
    /// The format of the surface, read-only
    pub format: SDL_PixelFormat,
    /// The width of the surface, read-only
    pub w: c_int,
    /// The height of the surface, read-only
    pub h: c_int,
    /// The distance in bytes between rows of pixels, read-only
    pub pitch: c_int,
    /// A pointer to the pixels of the surface
    pub pixels: *mut c_void,
    /// Application reference count, used when freeing surface
    pub refcount: c_int,
    /// Reserved for internal use
    pub reserved: *mut c_void,
}

/// A single palette entry.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SDL_Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Public part of `SDL_Palette`.
#[repr(C)]
#[derive(Debug)]
pub struct SDL_Palette {
    /// Number of elements in `colors`
    pub ncolors: c_int,
    /// An array of colors, `ncolors` long
    pub colors: *mut SDL_Color,
    /// Internal use only, do not touch
    pub version: u32,
    /// Internal use only, do not touch
    pub refcount: c_int,
}

/// Opaque window handle.
#[repr(C)]
pub struct SDL_Window {
    _opaque: [u8; 0],
}

/// Opaque renderer handle.
#[repr(C)]
pub struct SDL_Renderer {
    _opaque: [u8; 0],
}

/// Opaque GPU render state handle.
#[repr(C)]
pub struct SDL_GPURenderState {
    _opaque: [u8; 0],
}

/// Opaque GPU shader handle.
#[repr(C)]
pub struct SDL_GPUShader {
    _opaque: [u8; 0],
}

/// Creation parameters for `SDL_CreateGPURenderState`.
///
/// The binding only ever fills in the fragment shader; the variable-length
/// binding arrays are left empty.
#[repr(C)]
#[derive(Debug)]
pub struct SDL_GPURenderStateCreateInfo {
    pub fragment_shader: *mut SDL_GPUShader,
    pub num_sampler_bindings: i32,
    pub sampler_bindings: *const c_void,
    pub num_storage_textures: i32,
    pub storage_textures: *const *mut c_void,
    pub num_storage_buffers: i32,
    pub storage_buffers: *const *mut c_void,
    pub props: SDL_PropertiesID,
}

impl SDL_GPURenderStateCreateInfo {
    /// Create info with only a fragment shader and no resource bindings.
    pub fn with_fragment_shader(fragment_shader: *mut SDL_GPUShader) -> Self {
        Self {
            fragment_shader,
            num_sampler_bindings: 0,
            sampler_bindings: std::ptr::null(),
            num_storage_textures: 0,
            storage_textures: std::ptr::null(),
            num_storage_buffers: 0,
            storage_buffers: std::ptr::null(),
            props: 0,
        }
    }
}

/// Function table for every native entry point the binding calls.
///
/// Filling the table is the only place that knows where the native library
/// comes from: the linked SDL3 library (`sdl3` feature) or the in-process
/// simulation used by tests.
#[derive(Clone, Copy, Debug)]
pub struct NativeApi {
    pub get_error: unsafe extern "C" fn() -> *const c_char,

    pub create_renderer:
        unsafe extern "C" fn(window: *mut SDL_Window, name: *const c_char) -> *mut SDL_Renderer,
    pub get_renderer: unsafe extern "C" fn(window: *mut SDL_Window) -> *mut SDL_Renderer,
    pub get_renderer_name: unsafe extern "C" fn(renderer: *mut SDL_Renderer) -> *const c_char,
    pub destroy_renderer: unsafe extern "C" fn(renderer: *mut SDL_Renderer),

    pub create_texture: unsafe extern "C" fn(
        renderer: *mut SDL_Renderer,
        format: SDL_PixelFormat,
        access: SDL_TextureAccess,
        w: c_int,
        h: c_int,
    ) -> *mut SDL_Texture,
    pub create_texture_from_surface: unsafe extern "C" fn(
        renderer: *mut SDL_Renderer,
        surface: *mut SDL_Surface,
    ) -> *mut SDL_Texture,
    pub get_renderer_from_texture:
        unsafe extern "C" fn(texture: *mut SDL_Texture) -> *mut SDL_Renderer,
    pub destroy_texture: unsafe extern "C" fn(texture: *mut SDL_Texture),
    pub set_render_target:
        unsafe extern "C" fn(renderer: *mut SDL_Renderer, texture: *mut SDL_Texture) -> bool,
    pub get_render_target: unsafe extern "C" fn(renderer: *mut SDL_Renderer) -> *mut SDL_Texture,

    pub create_surface:
        unsafe extern "C" fn(w: c_int, h: c_int, format: SDL_PixelFormat) -> *mut SDL_Surface,
    pub destroy_surface: unsafe extern "C" fn(surface: *mut SDL_Surface),
    pub get_surface_palette: unsafe extern "C" fn(surface: *mut SDL_Surface) -> *mut SDL_Palette,
    pub set_surface_palette:
        unsafe extern "C" fn(surface: *mut SDL_Surface, palette: *mut SDL_Palette) -> bool,

    pub create_palette: unsafe extern "C" fn(ncolors: c_int) -> *mut SDL_Palette,
    pub destroy_palette: unsafe extern "C" fn(palette: *mut SDL_Palette),

    pub create_gpu_render_state: unsafe extern "C" fn(
        renderer: *mut SDL_Renderer,
        create_info: *mut SDL_GPURenderStateCreateInfo,
    ) -> *mut SDL_GPURenderState,
    pub set_gpu_render_state:
        unsafe extern "C" fn(renderer: *mut SDL_Renderer, state: *mut SDL_GPURenderState) -> bool,
    pub destroy_gpu_render_state: unsafe extern "C" fn(state: *mut SDL_GPURenderState),
}

#[cfg(feature = "sdl3")]
mod linked {
    use super::*;

    #[link(name = "SDL3")]
    unsafe extern "C" {
        pub fn SDL_GetError() -> *const c_char;

        pub fn SDL_CreateRenderer(window: *mut SDL_Window, name: *const c_char) -> *mut SDL_Renderer;
        pub fn SDL_GetRenderer(window: *mut SDL_Window) -> *mut SDL_Renderer;
        pub fn SDL_GetRendererName(renderer: *mut SDL_Renderer) -> *const c_char;
        pub fn SDL_DestroyRenderer(renderer: *mut SDL_Renderer);

        pub fn SDL_CreateTexture(
            renderer: *mut SDL_Renderer,
            format: SDL_PixelFormat,
            access: SDL_TextureAccess,
            w: c_int,
            h: c_int,
        ) -> *mut SDL_Texture;
        pub fn SDL_CreateTextureFromSurface(
            renderer: *mut SDL_Renderer,
            surface: *mut SDL_Surface,
        ) -> *mut SDL_Texture;
        pub fn SDL_GetRendererFromTexture(texture: *mut SDL_Texture) -> *mut SDL_Renderer;
        pub fn SDL_DestroyTexture(texture: *mut SDL_Texture);
        pub fn SDL_SetRenderTarget(renderer: *mut SDL_Renderer, texture: *mut SDL_Texture) -> bool;
        pub fn SDL_GetRenderTarget(renderer: *mut SDL_Renderer) -> *mut SDL_Texture;

        pub fn SDL_CreateSurface(w: c_int, h: c_int, format: SDL_PixelFormat) -> *mut SDL_Surface;
        pub fn SDL_DestroySurface(surface: *mut SDL_Surface);
        pub fn SDL_GetSurfacePalette(surface: *mut SDL_Surface) -> *mut SDL_Palette;
        pub fn SDL_SetSurfacePalette(surface: *mut SDL_Surface, palette: *mut SDL_Palette) -> bool;

        pub fn SDL_CreatePalette(ncolors: c_int) -> *mut SDL_Palette;
        pub fn SDL_DestroyPalette(palette: *mut SDL_Palette);

        pub fn SDL_CreateGPURenderState(
            renderer: *mut SDL_Renderer,
            create_info: *mut SDL_GPURenderStateCreateInfo,
        ) -> *mut SDL_GPURenderState;
        pub fn SDL_SetGPURenderState(
            renderer: *mut SDL_Renderer,
            state: *mut SDL_GPURenderState,
        ) -> bool;
        pub fn SDL_DestroyGPURenderState(state: *mut SDL_GPURenderState);
    }
}

#[cfg(feature = "sdl3")]
impl NativeApi {
    /// Function table backed by the linked SDL3 library.
    pub fn sdl3() -> Self {
        use linked::*;

        Self {
            get_error: SDL_GetError,
            create_renderer: SDL_CreateRenderer,
            get_renderer: SDL_GetRenderer,
            get_renderer_name: SDL_GetRendererName,
            destroy_renderer: SDL_DestroyRenderer,
            create_texture: SDL_CreateTexture,
            create_texture_from_surface: SDL_CreateTextureFromSurface,
            get_renderer_from_texture: SDL_GetRendererFromTexture,
            destroy_texture: SDL_DestroyTexture,
            set_render_target: SDL_SetRenderTarget,
            get_render_target: SDL_GetRenderTarget,
            create_surface: SDL_CreateSurface,
            destroy_surface: SDL_DestroySurface,
            get_surface_palette: SDL_GetSurfacePalette,
            set_surface_palette: SDL_SetSurfacePalette,
            create_palette: SDL_CreatePalette,
            destroy_palette: SDL_DestroyPalette,
            create_gpu_render_state: SDL_CreateGPURenderState,
            set_gpu_render_state: SDL_SetGPURenderState,
            destroy_gpu_render_state: SDL_DestroyGPURenderState,
        }
    }
}
