//! Native handle identities and the tags the registries key on.

use serde::Serialize;
use std::fmt;

/// Address-sized identity of a native object.
///
/// Never dereferenced by the registries; it is only a map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NativePtr(usize);

impl NativePtr {
    pub const NULL: Self = Self(0);

    /// Key for a raw native pointer.
    pub fn from_raw<T>(raw: *const T) -> Self {
        Self(raw as usize)
    }

    pub fn addr(self) -> usize {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for NativePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Category of native handle. Each category has its own registry and
/// handles are never mixed across categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Renderer,
    Texture,
    Surface,
    Palette,
    GpuRenderState,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::Renderer => "renderer",
            Kind::Texture => "texture",
            Kind::Surface => "surface",
            Kind::Palette => "palette",
            Kind::GpuRenderState => "GPU render state",
        })
    }
}

/// Driver tag carried by every wrapper instance.
///
/// Renderer-bound objects are tagged with the render driver that created
/// them; typed lookups compare tags instead of inspecting wrapper types.
/// Objects that are not bound to a renderer are [`Driver::Generic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Driver {
    Generic,
    Software,
    OpenGl,
    OpenGlEs2,
    Direct3D,
    Direct3D11,
    Direct3D12,
    Metal,
    Vulkan,
    Gpu,
    Unknown,
}

impl Driver {
    /// Map a native render driver name (as reported by `SDL_GetRendererName`).
    pub fn from_renderer_name(name: &str) -> Self {
        match name {
            "software" => Driver::Software,
            "opengl" => Driver::OpenGl,
            "opengles2" => Driver::OpenGlEs2,
            "direct3d" => Driver::Direct3D,
            "direct3d11" => Driver::Direct3D11,
            "direct3d12" => Driver::Direct3D12,
            "metal" => Driver::Metal,
            "vulkan" => Driver::Vulkan,
            "gpu" => Driver::Gpu,
            _ => Driver::Unknown,
        }
    }

    /// The native render driver name, if this tag names one.
    pub fn renderer_name(self) -> Option<&'static str> {
        Some(match self {
            Driver::Software => "software",
            Driver::OpenGl => "opengl",
            Driver::OpenGlEs2 => "opengles2",
            Driver::Direct3D => "direct3d",
            Driver::Direct3D11 => "direct3d11",
            Driver::Direct3D12 => "direct3d12",
            Driver::Metal => "metal",
            Driver::Vulkan => "vulkan",
            Driver::Gpu => "gpu",
            Driver::Generic | Driver::Unknown => return None,
        })
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.renderer_name() {
            Some(name) => f.write_str(name),
            None if *self == Driver::Generic => f.write_str("generic"),
            None => f.write_str("unknown"),
        }
    }
}
