//! The engine handle.

use crate::config::EngineConfig;
use crate::entity::Entity;
use crate::error::{BindingError, BindingResult, FailureKind};
use crate::loader::DynamicEngine;
use crate::marshal::{ErrorRecord, ForeignArray, ForeignString};
use crate::stats::{EngineStats, StatsSnapshot};
use symbridge_abi::{symbols, EntityRef, ForeignEngine, MathFunction, NativeArray, NativeErrorCode};
use std::ffi::{c_char, CString};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// A shareable handle to one engine instance.
///
/// Cloning is cheap and every clone talks to the same engine. Entities keep
/// their engine alive, so an engine outlives every handle it issued.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    foreign: Box<dyn ForeignEngine>,
    stats: EngineStats,
    label: String,
}

impl Engine {
    /// Wraps an in-process implementation of the engine ABI.
    pub fn new<E: ForeignEngine + 'static>(foreign: E) -> Self {
        Self::with_label(foreign, "in-process")
    }

    fn with_label<E: ForeignEngine + 'static>(foreign: E, label: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                foreign: Box::new(foreign),
                stats: EngineStats::new(),
                label: label.into(),
            }),
        }
    }

    /// Loads the engine library described by `config`.
    pub fn load(config: &EngineConfig) -> BindingResult<Self> {
        let library = DynamicEngine::load(config)?;
        let label = library.path().to_owned();
        debug!(path = %label, "engine library loaded");
        Ok(Self::with_label(library, label))
    }

    /// Loads the engine library named by the environment.
    ///
    /// See [`EngineConfig::from_env`].
    pub fn from_env() -> BindingResult<Self> {
        Self::load(&EngineConfig::from_env())
    }

    /// Parses expression text into an entity.
    ///
    /// A rejected text surfaces the engine's own name, message and stack
    /// trace as [`BindingError::Parse`].
    pub fn parse(&self, text: &str) -> BindingResult<Entity> {
        let text = CString::new(text)
            .map_err(|_| BindingError::invalid_argument("expression text contains a NUL byte"))?;
        self.call_entity(symbols::MATHS_FROM_STRING, FailureKind::Parse, |engine, out| {
            engine.maths_from_string(&text, out)
        })
    }

    /// Returns true if the engine exports `function`.
    pub fn has_function(&self, function: MathFunction) -> bool {
        self.inner.foreign.has_function(function)
    }

    /// Returns a snapshot of the call and release counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Library path, or `in-process` for wrapped implementations.
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Returns true if both handles refer to the same engine instance.
    pub fn same_engine(&self, other: &Engine) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn foreign(&self) -> &dyn ForeignEngine {
        self.inner.foreign.as_ref()
    }

    pub(crate) fn stats_ref(&self) -> &EngineStats {
        &self.inner.stats
    }

    /// Issues one engine call and translates its error record.
    pub(crate) fn call<F>(&self, symbol: &'static str, kind: FailureKind, call: F) -> BindingResult<()>
    where
        F: FnOnce(&dyn ForeignEngine) -> NativeErrorCode,
    {
        self.inner.stats.record_call();
        let code = call(self.foreign());

        ErrorRecord::new(self, code).into_result().map_err(|foreign| {
            self.inner.stats.record_failure();
            debug!(symbol, name = %foreign.name, message = %foreign.message, "engine call failed");
            BindingError::from_foreign(foreign, kind)
        })
    }

    /// Issues a call producing a handle and adopts it.
    pub(crate) fn call_entity<F>(
        &self,
        symbol: &'static str,
        kind: FailureKind,
        call: F,
    ) -> BindingResult<Entity>
    where
        F: FnOnce(&dyn ForeignEngine, &mut EntityRef) -> NativeErrorCode,
    {
        let mut out = EntityRef::invalid();
        self.call(symbol, kind, |engine| call(engine, &mut out))?;
        Ok(Entity::adopt(self.clone(), out))
    }

    /// Issues a call producing a string, copies it and releases it.
    pub(crate) fn call_string<F>(&self, symbol: &'static str, call: F) -> BindingResult<String>
    where
        F: FnOnce(&dyn ForeignEngine, &mut *mut c_char) -> NativeErrorCode,
    {
        let mut out: *mut c_char = std::ptr::null_mut();
        self.call(symbol, FailureKind::Engine, |engine| call(engine, &mut out))?;

        let string = ForeignString::new(self, out);
        Ok(string.to_owned_string())
    }

    /// Issues a call producing a handle array, adopts every handle and
    /// releases the array.
    pub(crate) fn call_array<F>(&self, symbol: &'static str, call: F) -> BindingResult<Vec<Entity>>
    where
        F: FnOnce(&dyn ForeignEngine, &mut NativeArray) -> NativeErrorCode,
    {
        let mut out = NativeArray::empty();
        self.call(symbol, FailureKind::Engine, |engine| call(engine, &mut out))?;

        let array = ForeignArray::new(self, symbol, out);
        array.adopt_all()
    }

    /// Issues a call producing a plain value.
    pub(crate) fn call_value<T, F>(&self, symbol: &'static str, call: F) -> BindingResult<T>
    where
        T: Default,
        F: FnOnce(&dyn ForeignEngine, &mut T) -> NativeErrorCode,
    {
        let mut out = T::default();
        self.call(symbol, FailureKind::Engine, |engine| call(engine, &mut out))?;
        Ok(out)
    }

    /// Hands one handle back to the engine. Never fails observably.
    pub(crate) fn release_entity(&self, reference: EntityRef) {
        let status = self.foreign().free_entity(reference);
        self.inner.stats.record_released();
        trace!(handle = reference.into_raw(), "released handle");
        self.absorb_release_status(symbols::FREE_ENTITY, status);
    }

    /// Logs and counts a failed release; the failure record is still freed.
    pub(crate) fn absorb_release_status(&self, symbol: &'static str, status: NativeErrorCode) {
        if let Err(foreign) = ErrorRecord::new(self, status).into_result() {
            self.inner.stats.record_release_failure();
            warn!(symbol, name = %foreign.name, message = %foreign.message, "release call failed");
        }
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("label", &self.inner.label)
            .field("stats", &self.inner.stats.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symbridge_testkit::FakeEngine;

    #[test]
    fn parse_and_stringify() {
        let engine = Engine::new(FakeEngine::new());
        let expr = engine.parse("x+1").unwrap();
        assert_eq!(expr.stringify().unwrap(), "x + 1");
    }

    #[test]
    fn parse_failure_surfaces_engine_text() {
        let fake = FakeEngine::new();
        let engine = Engine::new(fake.clone());

        let err = engine.parse("x +").unwrap_err();
        assert!(err.is_parse());
        let foreign = err.foreign().unwrap();
        assert!(!foreign.name.is_empty());
        assert!(!foreign.message.is_empty());
        assert!(!foreign.stack_trace.is_empty());

        // No handle was issued and the record went back to the engine.
        let ledger = fake.ledger();
        assert_eq!(ledger.handles_issued, 0);
        assert_eq!(ledger.error_records_freed, 1);
        assert_eq!(engine.stats().foreign_failures, 1);
    }

    #[test]
    fn nul_byte_is_rejected_before_the_call() {
        let fake = FakeEngine::new();
        let engine = Engine::new(fake.clone());

        let err = engine.parse("x\0+ 1").unwrap_err();
        assert!(matches!(err, BindingError::InvalidArgument { .. }));
        assert_eq!(fake.ledger().calls(symbols::MATHS_FROM_STRING), 0);
    }

    #[test]
    fn clones_share_the_instance() {
        let engine = Engine::new(FakeEngine::new());
        let other = Engine::new(FakeEngine::new());

        assert!(engine.same_engine(&engine.clone()));
        assert!(!engine.same_engine(&other));
        assert_eq!(engine.label(), "in-process");
    }

    #[test]
    fn engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
        assert_send_sync::<Entity>();
    }

    #[test]
    fn release_failure_is_swallowed() {
        let fake = FakeEngine::new();
        let engine = Engine::new(fake.clone());

        // Never issued, so the fake engine reports an invalid handle.
        engine.release_entity(EntityRef::from_raw(9_999));

        let stats = engine.stats();
        assert_eq!(stats.release_failures, 1);
        assert_eq!(stats.error_records_released, 1);
        assert_eq!(fake.ledger().invalid_frees, 1);
    }
}
