//! Handle arrays and strings crossing the ABI.

use crate::types::EntityRef;
use std::ffi::{c_char, CString};

/// A variable-length list of handles owned by the engine.
///
/// The receiver adopts every handle in the list and then returns the backing
/// storage through `free_native_array`. The handles themselves stay alive.
#[repr(C)]
#[derive(Debug)]
pub struct NativeArray {
    /// Number of handles.
    pub length: i32,
    /// Pointer to the first handle.
    pub refs: *mut EntityRef,
}

impl NativeArray {
    /// Creates an empty array.
    pub const fn empty() -> Self {
        Self {
            length: 0,
            refs: std::ptr::null_mut(),
        }
    }

    /// Returns true if no storage is attached.
    pub fn is_null(&self) -> bool {
        self.refs.is_null()
    }

    /// Creates an array from a Vec, for engines implemented in Rust.
    ///
    /// Returns `None` if the list does not fit the ABI length field.
    /// Release with [`NativeArray::into_vec`].
    pub fn from_vec(refs: Vec<EntityRef>) -> Option<Self> {
        let length = i32::try_from(refs.len()).ok()?;
        if length == 0 {
            return Some(Self::empty());
        }
        let boxed = refs.into_boxed_slice();
        let refs = Box::into_raw(boxed).cast::<EntityRef>();
        Some(Self { length, refs })
    }

    /// Converts back to a Vec, consuming the array.
    ///
    /// # Safety
    ///
    /// The array must have been created by [`NativeArray::from_vec`] and not
    /// released before.
    pub unsafe fn into_vec(self) -> Vec<EntityRef> {
        if self.refs.is_null() || self.length <= 0 {
            return Vec::new();
        }
        let len = self.length as usize;
        let slice = std::ptr::slice_from_raw_parts_mut(self.refs, len);
        Box::from_raw(slice).into_vec()
    }

    /// Views the handles.
    ///
    /// Returns `None` for a negative length or a null pointer with a
    /// non-zero length.
    ///
    /// # Safety
    ///
    /// `refs` must point to `length` initialized handles that stay valid for
    /// the returned lifetime.
    pub unsafe fn as_slice(&self) -> Option<&[EntityRef]> {
        match (self.length, self.refs.is_null()) {
            (0, _) => Some(&[]),
            (n, false) if n > 0 => Some(std::slice::from_raw_parts(self.refs, n as usize)),
            _ => None,
        }
    }
}

impl Default for NativeArray {
    fn default() -> Self {
        Self::empty()
    }
}

/// Allocates a string for an engine string out-parameter.
///
/// Returns null if `s` contains an interior NUL byte. Release with
/// [`release_string`].
pub fn string_into_raw(s: &str) -> *mut c_char {
    CString::new(s).map_or(std::ptr::null_mut(), CString::into_raw)
}

/// Frees a string allocated by [`string_into_raw`].
///
/// # Safety
///
/// `ptr` must be null or come from [`string_into_raw`] and not have been
/// released before.
pub unsafe fn release_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}
