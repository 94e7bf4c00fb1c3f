//! Scoped guards over engine-owned memory.
//!
//! Each guard copies what it needs into Rust-owned values and hands the
//! engine's memory back exactly once when it goes out of scope, on every
//! exit path.

use crate::engine::Engine;
use crate::entity::Entity;
use crate::error::{BindingResult, ForeignError, ResourceError};
use symbridge_abi::{symbols, NativeArray, NativeErrorCode};
use std::ffi::{c_char, CStr};
use tracing::warn;

/// Copies a possibly null C string.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string.
unsafe fn copy_c_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        String::new()
    } else {
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

/// Copies every field of a failure record.
///
/// # Safety
///
/// Every non-null field must point to a NUL-terminated string.
unsafe fn copy_record(code: &NativeErrorCode) -> ForeignError {
    ForeignError {
        name: copy_c_string(code.name),
        message: copy_c_string(code.message),
        stack_trace: copy_c_string(code.stack_trace),
    }
}

/// Guard over the error record returned by one engine call.
pub(crate) struct ErrorRecord<'a> {
    engine: &'a Engine,
    raw: Option<NativeErrorCode>,
}

impl<'a> ErrorRecord<'a> {
    pub(crate) fn new(engine: &'a Engine, raw: NativeErrorCode) -> Self {
        Self {
            engine,
            raw: Some(raw),
        }
    }

    /// Copies a failure out of the record. The record is released afterwards.
    #[allow(clippy::let_and_return)]
    pub(crate) fn into_result(self) -> Result<(), ForeignError> {
        // Bound first so the borrow ends before the guard drops.
        let result = match &self.raw {
            // Safety: failure records carry engine-allocated C strings
            Some(code) if code.is_err() => Err(unsafe { copy_record(code) }),
            _ => Ok(()),
        };
        result
    }
}

impl Drop for ErrorRecord<'_> {
    fn drop(&mut self) {
        let Some(raw) = self.raw.take() else {
            return;
        };
        if raw.is_ok() {
            return;
        }

        // Safety: the record came from this engine and is released only here
        let status = unsafe { self.engine.foreign().free_error_code(raw) };
        self.engine.stats_ref().record_error_record_released();

        if status.is_err() {
            // Left to the engine: releasing it would recurse.
            // Safety: failure records carry engine-allocated C strings
            let foreign = unsafe { copy_record(&status) };
            self.engine.stats_ref().record_release_failure();
            warn!(
                symbol = symbols::FREE_ERROR_CODE,
                name = %foreign.name,
                message = %foreign.message,
                "release call failed"
            );
        }
    }
}

/// Guard over a string returned through an out-parameter.
pub(crate) struct ForeignString<'a> {
    engine: &'a Engine,
    ptr: *mut c_char,
}

impl<'a> ForeignString<'a> {
    pub(crate) fn new(engine: &'a Engine, ptr: *mut c_char) -> Self {
        Self { engine, ptr }
    }

    /// Copies the string. A null pointer reads as the empty string.
    pub(crate) fn to_owned_string(&self) -> String {
        // Safety: the engine returned a NUL-terminated string or null
        unsafe { copy_c_string(self.ptr) }
    }
}

impl Drop for ForeignString<'_> {
    fn drop(&mut self) {
        if self.ptr.is_null() {
            return;
        }
        let ptr = std::mem::replace(&mut self.ptr, std::ptr::null_mut());

        // Safety: the string came from this engine and is released only here
        let status = unsafe { self.engine.foreign().free_string(ptr) };
        self.engine.stats_ref().record_string_released();
        self.engine.absorb_release_status(symbols::FREE_STRING, status);
    }
}

/// Guard over a handle array returned through an out-parameter.
pub(crate) struct ForeignArray<'a> {
    engine: &'a Engine,
    symbol: &'static str,
    raw: Option<NativeArray>,
}

impl<'a> ForeignArray<'a> {
    pub(crate) fn new(engine: &'a Engine, symbol: &'static str, raw: NativeArray) -> Self {
        Self {
            engine,
            symbol,
            raw: Some(raw),
        }
    }

    /// Takes ownership of every handle in the array, in order.
    pub(crate) fn adopt_all(&self) -> BindingResult<Vec<Entity>> {
        let Some(raw) = &self.raw else {
            return Ok(Vec::new());
        };

        // Safety: the engine returned `length` valid handles at `refs`
        let refs = unsafe { raw.as_slice() }.ok_or(ResourceError::MalformedArray {
            symbol: self.symbol,
            length: raw.length,
        })?;

        Ok(refs
            .iter()
            .map(|&reference| Entity::adopt(self.engine.clone(), reference))
            .collect())
    }
}

impl Drop for ForeignArray<'_> {
    fn drop(&mut self) {
        let Some(raw) = self.raw.take() else {
            return;
        };

        // Safety: the array came from this engine and is released only here
        let status = unsafe { self.engine.foreign().free_native_array(raw) };
        self.engine.stats_ref().record_array_released();
        self.engine
            .absorb_release_status(symbols::FREE_NATIVE_ARRAY, status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symbridge_abi::error::alloc_c_string;
    use symbridge_testkit::FakeEngine;

    #[test]
    fn copy_null_string_is_empty() {
        // Safety: null is accepted
        assert_eq!(unsafe { copy_c_string(std::ptr::null()) }, "");
    }

    #[test]
    fn ok_record_is_not_released() {
        let fake = FakeEngine::new();
        let engine = Engine::new(fake.clone());

        assert!(ErrorRecord::new(&engine, NativeErrorCode::ok())
            .into_result()
            .is_ok());
        assert_eq!(fake.ledger().error_records_freed, 0);
        assert_eq!(engine.stats().error_records_released, 0);
    }

    #[test]
    fn failure_record_is_copied_then_released_once() {
        let fake = FakeEngine::new();
        let engine = Engine::new(fake.clone());

        let raw = fake.failure_record("EngineException", "boom", "at Op()");
        let err = ErrorRecord::new(&engine, raw).into_result().unwrap_err();

        assert_eq!(err, ForeignError::new("EngineException", "boom", "at Op()"));
        let ledger = fake.ledger();
        assert_eq!(ledger.error_records_issued, 1);
        assert_eq!(ledger.error_records_freed, 1);
        assert_eq!(ledger.double_frees, 0);
        assert_eq!(engine.stats().error_records_released, 1);
    }

    #[test]
    fn string_guard_releases_once() {
        let fake = FakeEngine::new();
        let engine = Engine::new(fake.clone());

        let ptr = fake.issue_string("x + 1");
        {
            let guard = ForeignString::new(&engine, ptr);
            assert_eq!(guard.to_owned_string(), "x + 1");
            assert_eq!(guard.to_owned_string(), "x + 1");
        }

        let ledger = fake.ledger();
        assert_eq!(ledger.strings_issued, 1);
        assert_eq!(ledger.strings_freed, 1);
        assert_eq!(ledger.double_frees, 0);
    }

    #[test]
    fn null_string_guard_releases_nothing() {
        let fake = FakeEngine::new();
        let engine = Engine::new(fake.clone());

        let guard = ForeignString::new(&engine, std::ptr::null_mut());
        assert_eq!(guard.to_owned_string(), "");
        drop(guard);

        assert_eq!(fake.ledger().strings_freed, 0);
    }

    #[test]
    fn malformed_array_is_still_released() {
        let fake = FakeEngine::new();
        let engine = Engine::new(fake.clone());

        let raw = NativeArray {
            length: -3,
            refs: std::ptr::null_mut(),
        };
        let guard = ForeignArray::new(&engine, symbols::ENTITY_NODES, raw);
        let err = guard.adopt_all().unwrap_err();
        assert!(err.is_resource());
        drop(guard);

        assert_eq!(engine.stats().arrays_released, 1);
    }

    #[test]
    fn free_error_code_failure_is_counted() {
        let fake = FakeEngine::new();
        let engine = Engine::new(fake.clone());

        // A record the fake engine never issued fails to release.
        let stray = NativeErrorCode {
            name: alloc_c_string("Stray"),
            message: std::ptr::null_mut(),
            stack_trace: std::ptr::null_mut(),
        };
        let name = stray.name;
        let err = ErrorRecord::new(&engine, stray).into_result().unwrap_err();
        assert_eq!(err.name, "Stray");
        assert_eq!(engine.stats().release_failures, 1);

        // Safety: the fake engine refused it, so it is still ours
        unsafe {
            drop(std::ffi::CString::from_raw(name));
        }
    }
}
