//! The error record returned by every engine function.

use std::ffi::{c_char, CStr, CString};

/// Error record returned by every engine function.
///
/// A null `name` means the call succeeded and its out-parameter is valid.
/// On failure all three strings are owned by the engine and must be handed
/// back through `free_error_code` once the caller has copied them.
#[repr(C)]
#[derive(Debug)]
pub struct NativeErrorCode {
    /// Error kind (for example the engine's exception type name).
    pub name: *mut c_char,
    /// Human-readable message.
    pub message: *mut c_char,
    /// Engine-side stack trace.
    pub stack_trace: *mut c_char,
}

impl NativeErrorCode {
    /// The success record.
    pub const fn ok() -> Self {
        Self {
            name: std::ptr::null_mut(),
            message: std::ptr::null_mut(),
            stack_trace: std::ptr::null_mut(),
        }
    }

    /// Returns true if the record signals success.
    pub fn is_ok(&self) -> bool {
        self.name.is_null()
    }

    /// Returns true if the record signals failure.
    pub fn is_err(&self) -> bool {
        !self.is_ok()
    }

    /// Allocates a failure record.
    ///
    /// Intended for engines implemented in Rust. Interior NUL bytes are
    /// stripped so the record can always be built. Release the record with
    /// [`NativeErrorCode::release_allocated`].
    pub fn failure(name: &str, message: &str, stack_trace: &str) -> Self {
        Self {
            name: alloc_c_string(name),
            message: alloc_c_string(message),
            stack_trace: alloc_c_string(stack_trace),
        }
    }

    /// Frees the strings of a record built by [`NativeErrorCode::failure`].
    ///
    /// # Safety
    ///
    /// Every non-null field must come from [`NativeErrorCode::failure`] and
    /// must not have been released before.
    pub unsafe fn release_allocated(self) {
        for ptr in [self.name, self.message, self.stack_trace] {
            if !ptr.is_null() {
                drop(CString::from_raw(ptr));
            }
        }
    }

    /// Reads the name field.
    ///
    /// # Safety
    ///
    /// The field must be null or a valid NUL-terminated string.
    pub unsafe fn name_str(&self) -> Option<&CStr> {
        optional_c_str(self.name)
    }

    /// Reads the message field.
    ///
    /// # Safety
    ///
    /// The field must be null or a valid NUL-terminated string.
    pub unsafe fn message_str(&self) -> Option<&CStr> {
        optional_c_str(self.message)
    }

    /// Reads the stack trace field.
    ///
    /// # Safety
    ///
    /// The field must be null or a valid NUL-terminated string.
    pub unsafe fn stack_trace_str(&self) -> Option<&CStr> {
        optional_c_str(self.stack_trace)
    }
}

impl Default for NativeErrorCode {
    fn default() -> Self {
        Self::ok()
    }
}

/// Allocates a NUL-terminated copy of `s` owned by the Rust allocator.
///
/// Interior NUL bytes are removed. Free with `CString::from_raw`.
pub fn alloc_c_string(s: &str) -> *mut c_char {
    let bytes: Vec<u8> = s.bytes().filter(|&b| b != 0).collect();
    // Interior NULs were filtered out above.
    CString::new(bytes).map_or(std::ptr::null_mut(), CString::into_raw)
}

unsafe fn optional_c_str<'a>(ptr: *const c_char) -> Option<&'a CStr> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_record() {
        let code = NativeErrorCode::ok();
        assert!(code.is_ok());
        assert!(!code.is_err());
        assert!(code.message.is_null());
        assert!(code.stack_trace.is_null());
    }

    #[test]
    fn failure_record() {
        let code = NativeErrorCode::failure("ParseException", "unexpected end", "at parse()");
        assert!(code.is_err());

        // Safety: we just built it
        unsafe {
            assert_eq!(code.name_str().unwrap().to_str().unwrap(), "ParseException");
            assert_eq!(code.message_str().unwrap().to_str().unwrap(), "unexpected end");
            assert_eq!(code.stack_trace_str().unwrap().to_str().unwrap(), "at parse()");
            code.release_allocated();
        }
    }

    #[test]
    fn interior_nul_is_stripped() {
        let ptr = alloc_c_string("bad\0name");
        assert!(!ptr.is_null());

        // Safety: allocated above
        let owned = unsafe { CString::from_raw(ptr) };
        assert_eq!(owned.to_str().unwrap(), "badname");
    }
}
