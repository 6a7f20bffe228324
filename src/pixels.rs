//! Pixel format and texture access values passed through to the native
//! library.

use crate::ffi::{SDL_PixelFormat, SDL_TextureAccess};
use std::fmt;

/// An `SDL_PixelFormat` value.
///
/// Only a few common formats are named; any native value can be wrapped.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelFormat(pub SDL_PixelFormat);

impl PixelFormat {
    pub const UNKNOWN: Self = Self(0);
    pub const INDEX8: Self = Self(0x1300_0801);
    pub const XRGB8888: Self = Self(0x1616_1804);
    pub const ARGB8888: Self = Self(0x1636_2004);
    pub const RGBA8888: Self = Self(0x1646_2004);
    pub const ABGR8888: Self = Self(0x1676_2004);

    /// Bytes per pixel for non-FourCC formats.
    pub fn bytes_per_pixel(self) -> u32 {
        self.0 & 0xff
    }

    /// Whether pixels index into a palette.
    pub fn is_indexed(self) -> bool {
        matches!((self.0 >> 24) & 0x0f, 0x1..=0x3 | 0xc) && (self.0 >> 28) == 1
    }
}

impl fmt::Debug for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::UNKNOWN => "UNKNOWN",
            Self::INDEX8 => "INDEX8",
            Self::XRGB8888 => "XRGB8888",
            Self::ARGB8888 => "ARGB8888",
            Self::RGBA8888 => "RGBA8888",
            Self::ABGR8888 => "ABGR8888",
            _ => return write!(f, "PixelFormat({:#010x})", self.0),
        };
        f.write_str(name)
    }
}

/// How a texture will be used (`SDL_TextureAccess`).
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureAccess {
    /// Changes rarely, not lockable
    Static = 0,
    /// Changes frequently, lockable
    Streaming = 1,
    /// Can be used as a render target
    Target = 2,
}

impl From<TextureAccess> for SDL_TextureAccess {
    fn from(access: TextureAccess) -> Self {
        access as SDL_TextureAccess
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_details() {
        assert_eq!(PixelFormat::RGBA8888.bytes_per_pixel(), 4);
        assert_eq!(PixelFormat::INDEX8.bytes_per_pixel(), 1);
        assert!(PixelFormat::INDEX8.is_indexed());
        assert!(!PixelFormat::ARGB8888.is_indexed());
        assert!(!PixelFormat::UNKNOWN.is_indexed());
        assert_eq!(format!("{:?}", PixelFormat(0x1234)), "PixelFormat(0x00001234)");
    }
}
