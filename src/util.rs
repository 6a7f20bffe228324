//! Utility functions for marshaling across the C ABI.

use crate::error::BindError;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;

/// Convert a native C string to an owned Rust string.
///
/// Returns `None` for a null pointer. Invalid UTF-8 is replaced lossily;
/// native names and error messages are diagnostics, not data.
///
/// # Safety
///
/// The caller must ensure `ptr` is either null or points to a valid
/// null-terminated C string.
pub unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }

    let cstr = unsafe { CStr::from_ptr(ptr) };
    Some(cstr.to_string_lossy().into_owned())
}

/// Convert an optional Rust string to a C string for a native call.
///
/// Fails if the string contains an interior null byte.
pub fn option_to_cstring(
    s: Option<&str>,
    param: &'static str,
) -> Result<Option<CString>, BindError> {
    s.map(|s| {
        CString::new(s).map_err(|e| BindError::InvalidArgument {
            param,
            reason: e.to_string(),
        })
    })
    .transpose()
}

/// Pointer to an optional C string, null when absent.
pub fn option_as_ptr(s: &Option<CString>) -> *const c_char {
    s.as_ref().map_or(std::ptr::null(), |s| s.as_ptr())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cstr_roundtrip_null() {
        assert_eq!(unsafe { cstr_to_string(std::ptr::null()) }, None);
        let owned = CString::new("vulkan").unwrap();
        assert_eq!(
            unsafe { cstr_to_string(owned.as_ptr()) }.as_deref(),
            Some("vulkan")
        );
    }

    #[test]
    fn test_interior_nul_rejected() {
        let err = option_to_cstring(Some("bad\0name"), "name").unwrap_err();
        assert!(matches!(err, BindError::InvalidArgument { param: "name", .. }));
        assert!(option_to_cstring(None, "name").unwrap().is_none());
        assert!(option_as_ptr(&None).is_null());
    }
}
