//! In-process stand-in for the native library.
//!
//! Implements every [`NativeApi`] entry point with the reference counting
//! rules of SDL3: destroy calls decrement the embedded `refcount` and free
//! the object at zero, a surface holds one reference on its palette, and
//! query functions return existing objects without taking a reference.
//!
//! Destroying a renderer frees every texture created from it regardless of
//! reference count, as the real library does.
//!
//! # Thread Safety
//!
//! Like the library it stands in for, nothing here is synchronized except
//! the liveness set and the per-thread error message. Each object must only
//! be touched from one thread at a time.

use crate::ffi::{
    NativeApi, SDL_Color, SDL_GPURenderState, SDL_GPURenderStateCreateInfo, SDL_GPUShader,
    SDL_Palette, SDL_PixelFormat, SDL_Renderer, SDL_Surface, SDL_Texture, SDL_TextureAccess,
    SDL_Window,
};
use crate::pixels::PixelFormat;
use libc::{c_char, c_int, c_void};
use parking_lot::Mutex;
use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::ffi::{CStr, CString};
use std::ptr;

/// Render driver names the simulated library accepts.
pub const RENDER_DRIVERS: &[&str] = &[
    "software",
    "opengl",
    "opengles2",
    "direct3d11",
    "direct3d12",
    "metal",
    "vulkan",
    "gpu",
];

static LIVE: Mutex<BTreeSet<usize>> = parking_lot::const_mutex(BTreeSet::new());

thread_local! {
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::default());
    static FAIL_NEXT: Cell<bool> = const { Cell::new(false) };
}

struct SimWindow {
    renderer: *mut SimRenderer,
}

struct SimRenderer {
    name: CString,
    window: *mut SimWindow,
    target: *mut SDL_Texture,
    gpu_state: *mut SDL_GPURenderState,
    textures: Vec<*mut SimTexture>,
}

#[repr(C)]
struct SimTexture {
    public: SDL_Texture,
    renderer: *mut SimRenderer,
}

#[repr(C)]
struct SimSurface {
    public: SDL_Surface,
    palette: *mut SDL_Palette,
    pixels: Vec<u8>,
}

#[repr(C)]
struct SimPalette {
    public: SDL_Palette,
    colors: Vec<SDL_Color>,
}

struct SimGpuState {
    renderer: *mut SimRenderer,
}

fn track<T>(ptr: *mut T) -> *mut T {
    LIVE.lock().insert(ptr as usize);
    ptr
}

fn untrack<T>(ptr: *mut T) {
    LIVE.lock().remove(&(ptr as usize));
}

/// Whether `ptr` names a simulated object that has not been freed.
pub fn is_alive<T>(ptr: *const T) -> bool {
    !ptr.is_null() && LIVE.lock().contains(&(ptr as usize))
}

fn set_error<T>(message: &str) -> *mut T {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(message).unwrap_or_default();
    });
    ptr::null_mut()
}

/// Make the next creation call on this thread fail as if out of memory.
pub fn fail_next_create() {
    FAIL_NEXT.with(|f| f.set(true));
}

fn creation_fails() -> bool {
    FAIL_NEXT.with(|f| f.replace(false))
}

/// Function table backed by the simulated library.
pub fn api() -> NativeApi {
    NativeApi {
        get_error,
        create_renderer,
        get_renderer,
        get_renderer_name,
        destroy_renderer,
        create_texture,
        create_texture_from_surface,
        get_renderer_from_texture,
        destroy_texture,
        set_render_target,
        get_render_target,
        create_surface,
        destroy_surface,
        get_surface_palette,
        set_surface_palette,
        create_palette,
        destroy_palette,
        create_gpu_render_state,
        set_gpu_render_state,
        destroy_gpu_render_state,
    }
}

/// Create a window that renderers can be attached to.
pub fn create_window() -> *mut SDL_Window {
    track(Box::into_raw(Box::new(SimWindow {
        renderer: ptr::null_mut(),
    })))
    .cast()
}

/// Free a window created by [`create_window`].
///
/// # Safety
///
/// `window` must come from [`create_window`] and its renderer, if any, must
/// already be destroyed.
pub unsafe fn destroy_window(window: *mut SDL_Window) {
    if window.is_null() {
        return;
    }
    untrack(window);
    drop(unsafe { Box::from_raw(window.cast::<SimWindow>()) });
}

/// A shader handle the simulated library accepts. Never dereferenced.
pub fn fragment_shader() -> *mut SDL_GPUShader {
    static SHADER: u8 = 0;
    ptr::addr_of!(SHADER).cast_mut().cast()
}

/// Take a reference on a texture on behalf of code outside the binding.
///
/// # Safety
///
/// `texture` must be a live simulated texture.
pub unsafe fn retain_texture(texture: *mut SDL_Texture) {
    unsafe { (*texture).refcount += 1 };
}

/// Take a reference on a surface on behalf of code outside the binding.
///
/// # Safety
///
/// `surface` must be a live simulated surface.
pub unsafe fn retain_surface(surface: *mut SDL_Surface) {
    unsafe { (*surface).refcount += 1 };
}

/// Take a reference on a palette on behalf of code outside the binding.
///
/// # Safety
///
/// `palette` must be a live simulated palette.
pub unsafe fn retain_palette(palette: *mut SDL_Palette) {
    unsafe { (*palette).refcount += 1 };
}

unsafe extern "C" fn get_error() -> *const c_char {
    LAST_ERROR.with(|e| e.borrow().as_ptr())
}

unsafe extern "C" fn create_renderer(
    window: *mut SDL_Window,
    name: *const c_char,
) -> *mut SDL_Renderer {
    if !is_alive(window) {
        return set_error("Invalid window");
    }
    if creation_fails() {
        return set_error("Out of memory");
    }

    let name = if name.is_null() {
        "software".to_string()
    } else {
        unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned()
    };
    if !RENDER_DRIVERS.contains(&name.as_str()) {
        return set_error(&format!("Couldn't find matching render driver {name}"));
    }

    let window = window.cast::<SimWindow>();
    if unsafe { !(*window).renderer.is_null() } {
        return set_error("Renderer already associated with window");
    }

    let renderer = track(Box::into_raw(Box::new(SimRenderer {
        name: CString::new(name).unwrap_or_default(),
        window,
        target: ptr::null_mut(),
        gpu_state: ptr::null_mut(),
        textures: Vec::new(),
    })));
    unsafe { (*window).renderer = renderer };
    renderer.cast()
}

unsafe extern "C" fn get_renderer(window: *mut SDL_Window) -> *mut SDL_Renderer {
    if !is_alive(window) {
        return set_error("Invalid window");
    }
    let renderer = unsafe { (*window.cast::<SimWindow>()).renderer };
    if renderer.is_null() {
        return set_error("Invalid renderer");
    }
    renderer.cast()
}

unsafe extern "C" fn get_renderer_name(renderer: *mut SDL_Renderer) -> *const c_char {
    if !is_alive(renderer) {
        return set_error::<c_char>("Invalid renderer");
    }
    unsafe { (*renderer.cast::<SimRenderer>()).name.as_ptr() }
}

unsafe extern "C" fn destroy_renderer(renderer: *mut SDL_Renderer) {
    if !is_alive(renderer) {
        return;
    }
    let renderer = renderer.cast::<SimRenderer>();
    unsafe {
        let window = (*renderer).window;
        if is_alive(window) {
            (*window).renderer = ptr::null_mut();
        }
        for texture in (*renderer).textures.drain(..) {
            untrack(texture);
            drop(Box::from_raw(texture));
        }
    }
    untrack(renderer);
    drop(unsafe { Box::from_raw(renderer) });
}

fn new_texture(
    renderer: *mut SDL_Renderer,
    format: SDL_PixelFormat,
    w: c_int,
    h: c_int,
) -> *mut SDL_Texture {
    if !is_alive(renderer) {
        return set_error("Invalid renderer");
    }
    if w <= 0 || h <= 0 {
        return set_error("Texture dimensions must be positive");
    }
    if creation_fails() {
        return set_error("Out of memory");
    }

    let renderer = renderer.cast::<SimRenderer>();
    let texture = track(Box::into_raw(Box::new(SimTexture {
        public: SDL_Texture {
            format,
            w,
            h,
            refcount: 1,
        },
        renderer,
    })));
    unsafe { (*renderer).textures.push(texture) };
    texture.cast()
}

unsafe extern "C" fn create_texture(
    renderer: *mut SDL_Renderer,
    format: SDL_PixelFormat,
    _access: SDL_TextureAccess,
    w: c_int,
    h: c_int,
) -> *mut SDL_Texture {
    new_texture(renderer, format, w, h)
}

unsafe extern "C" fn create_texture_from_surface(
    renderer: *mut SDL_Renderer,
    surface: *mut SDL_Surface,
) -> *mut SDL_Texture {
    if !is_alive(surface) {
        return set_error("Invalid surface");
    }
    let (w, h) = unsafe { ((*surface).w, (*surface).h) };
    new_texture(renderer, PixelFormat::ARGB8888.0, w, h)
}

unsafe extern "C" fn get_renderer_from_texture(texture: *mut SDL_Texture) -> *mut SDL_Renderer {
    if !is_alive(texture) {
        return set_error("Invalid texture");
    }
    unsafe { (*texture.cast::<SimTexture>()).renderer }.cast()
}

unsafe extern "C" fn destroy_texture(texture: *mut SDL_Texture) {
    if !is_alive(texture) {
        return;
    }
    let texture = texture.cast::<SimTexture>();
    unsafe {
        (*texture).public.refcount -= 1;
        if (*texture).public.refcount > 0 {
            return;
        }
        let renderer = (*texture).renderer;
        if is_alive(renderer) {
            if (*renderer).target == texture.cast() {
                (*renderer).target = ptr::null_mut();
            }
            (*renderer).textures.retain(|&t| t != texture);
        }
    }
    untrack(texture);
    drop(unsafe { Box::from_raw(texture) });
}

unsafe extern "C" fn set_render_target(
    renderer: *mut SDL_Renderer,
    texture: *mut SDL_Texture,
) -> bool {
    if !is_alive(renderer) {
        set_error::<c_void>("Invalid renderer");
        return false;
    }
    let renderer = renderer.cast::<SimRenderer>();
    if !texture.is_null() {
        if !is_alive(texture) {
            set_error::<c_void>("Invalid texture");
            return false;
        }
        if unsafe { (*texture.cast::<SimTexture>()).renderer } != renderer {
            set_error::<c_void>("Texture was not created with this renderer");
            return false;
        }
    }
    unsafe { (*renderer).target = texture };
    true
}

unsafe extern "C" fn get_render_target(renderer: *mut SDL_Renderer) -> *mut SDL_Texture {
    if !is_alive(renderer) {
        return set_error("Invalid renderer");
    }
    unsafe { (*renderer.cast::<SimRenderer>()).target }
}

unsafe extern "C" fn create_surface(
    w: c_int,
    h: c_int,
    format: SDL_PixelFormat,
) -> *mut SDL_Surface {
    if w < 0 || h < 0 {
        return set_error("Surface dimensions must not be negative");
    }
    if format == PixelFormat::UNKNOWN.0 {
        return set_error("Unknown pixel format");
    }
    if creation_fails() {
        return set_error("Out of memory");
    }

    let format_info = PixelFormat(format);
    let Some((pitch, len)) = surface_layout(w, h, format_info) else {
        return set_error("Surface size overflows");
    };
    let palette = if format_info.is_indexed() {
        unsafe { create_palette(256) }
    } else {
        ptr::null_mut()
    };

    let surface = Box::into_raw(Box::new(SimSurface {
        public: SDL_Surface {
            flags: 0,
            format,
            w,
            h,
            pitch,
            pixels: ptr::null_mut(),
            refcount: 1,
            reserved: ptr::null_mut(),
        },
        palette,
        pixels: vec![0; len],
    }));
    unsafe { (*surface).public.pixels = (*surface).pixels.as_mut_ptr().cast() };
    track(surface).cast()
}

/// Row pitch and pixel buffer length, or `None` when either overflows.
fn surface_layout(w: c_int, h: c_int, format: PixelFormat) -> Option<(c_int, usize)> {
    let bpp = c_int::try_from(format.bytes_per_pixel().max(1)).ok()?;
    let pitch = w.checked_mul(bpp)?;
    let len = pitch.checked_mul(h)?;
    Some((pitch, usize::try_from(len).ok()?))
}

unsafe extern "C" fn destroy_surface(surface: *mut SDL_Surface) {
    if !is_alive(surface) {
        return;
    }
    let surface = surface.cast::<SimSurface>();
    unsafe {
        (*surface).public.refcount -= 1;
        if (*surface).public.refcount > 0 {
            return;
        }
        destroy_palette((*surface).palette);
    }
    untrack(surface);
    drop(unsafe { Box::from_raw(surface) });
}

unsafe extern "C" fn get_surface_palette(surface: *mut SDL_Surface) -> *mut SDL_Palette {
    if !is_alive(surface) {
        return set_error("Invalid surface");
    }
    unsafe { (*surface.cast::<SimSurface>()).palette }
}

unsafe extern "C" fn set_surface_palette(
    surface: *mut SDL_Surface,
    palette: *mut SDL_Palette,
) -> bool {
    if !is_alive(surface) {
        set_error::<c_void>("Invalid surface");
        return false;
    }
    if !palette.is_null() {
        if !is_alive(palette) {
            set_error::<c_void>("Invalid palette");
            return false;
        }
        unsafe { (*palette).refcount += 1 };
    }
    let surface = surface.cast::<SimSurface>();
    let previous = unsafe { std::mem::replace(&mut (*surface).palette, palette) };
    unsafe { destroy_palette(previous) };
    true
}

unsafe extern "C" fn create_palette(ncolors: c_int) -> *mut SDL_Palette {
    if ncolors <= 0 {
        return set_error("Palette must have at least one color");
    }
    if creation_fails() {
        return set_error("Out of memory");
    }

    let white = SDL_Color {
        r: 0xff,
        g: 0xff,
        b: 0xff,
        a: 0xff,
    };
    let palette = Box::into_raw(Box::new(SimPalette {
        public: SDL_Palette {
            ncolors,
            colors: ptr::null_mut(),
            version: 1,
            refcount: 1,
        },
        colors: vec![white; ncolors as usize],
    }));
    unsafe { (*palette).public.colors = (*palette).colors.as_mut_ptr() };
    track(palette).cast()
}

unsafe extern "C" fn destroy_palette(palette: *mut SDL_Palette) {
    if !is_alive(palette) {
        return;
    }
    let palette = palette.cast::<SimPalette>();
    unsafe {
        (*palette).public.refcount -= 1;
        if (*palette).public.refcount > 0 {
            return;
        }
    }
    untrack(palette);
    drop(unsafe { Box::from_raw(palette) });
}

unsafe extern "C" fn create_gpu_render_state(
    renderer: *mut SDL_Renderer,
    create_info: *mut SDL_GPURenderStateCreateInfo,
) -> *mut SDL_GPURenderState {
    if !is_alive(renderer) {
        return set_error("Invalid renderer");
    }
    if create_info.is_null() || unsafe { (*create_info).fragment_shader.is_null() } {
        return set_error("Parameter 'createinfo->fragment_shader' is invalid");
    }
    let renderer = renderer.cast::<SimRenderer>();
    if unsafe { (*renderer).name.as_bytes() } != b"gpu" {
        return set_error("Renderer is not a GPU renderer");
    }
    if creation_fails() {
        return set_error("Out of memory");
    }

    track(Box::into_raw(Box::new(SimGpuState { renderer }))).cast()
}

unsafe extern "C" fn set_gpu_render_state(
    renderer: *mut SDL_Renderer,
    state: *mut SDL_GPURenderState,
) -> bool {
    if !is_alive(renderer) {
        set_error::<c_void>("Invalid renderer");
        return false;
    }
    if !state.is_null() && !is_alive(state) {
        set_error::<c_void>("Invalid GPU render state");
        return false;
    }
    unsafe { (*renderer.cast::<SimRenderer>()).gpu_state = state };
    true
}

unsafe extern "C" fn destroy_gpu_render_state(state: *mut SDL_GPURenderState) {
    if !is_alive(state) {
        return;
    }
    let state = state.cast::<SimGpuState>();
    unsafe {
        let renderer = (*state).renderer;
        if is_alive(renderer) && (*renderer).gpu_state == state.cast() {
            (*renderer).gpu_state = ptr::null_mut();
        }
    }
    untrack(state);
    drop(unsafe { Box::from_raw(state) });
}
