//! Error handling for the binding layer.
//!
//! Registry lookups never fail with an error: "not found" and driver tag
//! conflicts are reported as `None`. Errors are reserved for misuse of a
//! wrapper and for native calls that report failure.

use crate::ffi::NativeApi;
use crate::handle::Kind;
use crate::util::cstr_to_string;

/// Error codes for binding errors.
///
/// These codes are stable and can be matched by embedding code.
/// Codes 1-99 are native library failures, codes 100+ are binding-layer
/// errors.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// No error
    Ok = 0,
    /// A native call returned failure
    Native = 1,
    /// A disposed wrapper was used where a live object is required
    Disposed = 100,
    /// An argument could not be passed to the native library
    InvalidArgument = 101,
    /// JSON parse or serialization error
    Json = 102,
}

/// Error returned by wrapper operations.
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    #[error("{kind} has already been disposed")]
    Disposed { kind: Kind },

    #[error("{operation} failed: {message}")]
    Native {
        operation: &'static str,
        message: String,
    },

    #[error("invalid argument {param}: {reason}")]
    InvalidArgument { param: &'static str, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BindError {
    pub fn code(&self) -> ErrorCode {
        match self {
            BindError::Disposed { .. } => ErrorCode::Disposed,
            BindError::Native { .. } => ErrorCode::Native,
            BindError::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            BindError::Json(_) => ErrorCode::Json,
        }
    }

    /// Build a native failure from the library's last error message.
    pub(crate) fn native(api: &NativeApi, operation: &'static str) -> Self {
        let message = unsafe { cstr_to_string((api.get_error)()) }
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "unknown native error".to_string());
        BindError::Native { operation, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let disposed = BindError::Disposed {
            kind: Kind::Texture,
        };
        assert_eq!(disposed.code(), ErrorCode::Disposed);
        assert_eq!(disposed.to_string(), "texture has already been disposed");

        let json = serde_json::from_str::<u32>("nope").unwrap_err();
        assert_eq!(BindError::from(json).code(), ErrorCode::Json);
    }

    #[test]
    fn test_native_message() {
        let api = crate::sim::api();
        crate::sim::fail_next_create();
        let raw = unsafe { (api.create_palette)(4) };
        assert!(raw.is_null());

        let err = BindError::native(&api, "SDL_CreatePalette");
        assert_eq!(err.code(), ErrorCode::Native);
        assert!(err.to_string().starts_with("SDL_CreatePalette failed: "));
    }
}
