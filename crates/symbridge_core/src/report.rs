//! Non-raising error handling.
//!
//! By default every operation returns a [`BindingResult`] and callers
//! propagate failures with `?`. Call sites that prefer an out-parameter
//! error object route results through [`ReportExt::report`] instead:
//!
//! ```rust,ignore
//! let mut slot = ErrorSlot::new();
//! let expr = engine.parse("x +").report(&mut slot);
//! if slot.is_set() {
//!     eprintln!("{}: {}", slot.name().unwrap_or_default(), slot.message().unwrap_or_default());
//! }
//! ```

use crate::error::{BindingError, BindingResult};

/// Caller-owned slot receiving the most recent failure.
#[derive(Debug, Default)]
pub struct ErrorSlot {
    error: Option<BindingError>,
}

impl ErrorSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a failure has been recorded.
    pub fn is_set(&self) -> bool {
        self.error.is_some()
    }

    /// The recorded failure.
    pub fn error(&self) -> Option<&BindingError> {
        self.error.as_ref()
    }

    /// Takes the recorded failure, leaving the slot empty.
    pub fn take(&mut self) -> Option<BindingError> {
        self.error.take()
    }

    /// Clears the slot.
    pub fn clear(&mut self) {
        self.error = None;
    }

    /// Engine error name, or the native error description for failures the
    /// engine did not report.
    pub fn name(&self) -> Option<String> {
        self.error.as_ref().map(|e| match e.foreign() {
            Some(foreign) => foreign.name.clone(),
            None => native_name(e).to_owned(),
        })
    }

    /// Error message.
    pub fn message(&self) -> Option<String> {
        self.error.as_ref().map(|e| match e.foreign() {
            Some(foreign) => foreign.message.clone(),
            None => e.to_string(),
        })
    }

    /// Engine stack trace, empty for native failures.
    pub fn stack_trace(&self) -> Option<String> {
        self.error
            .as_ref()
            .map(|e| e.foreign().map(|f| f.stack_trace.clone()).unwrap_or_default())
    }
}

fn native_name(error: &BindingError) -> &'static str {
    match error {
        BindingError::Parse(_) => "ParseError",
        BindingError::Engine(_) => "EngineError",
        BindingError::Resource(_) => "ResourceError",
        BindingError::InvalidArgument { .. } => "InvalidArgument",
        BindingError::Unsupported { .. } => "Unsupported",
        BindingError::Load { .. } | BindingError::MissingSymbol { .. } => "LoadError",
    }
}

/// Routes a result into an [`ErrorSlot`].
pub trait ReportExt<T> {
    /// Returns the value on success. On failure stores the error in `slot`
    /// and returns `None`.
    fn report(self, slot: &mut ErrorSlot) -> Option<T>;
}

impl<T> ReportExt<T> for BindingResult<T> {
    fn report(self, slot: &mut ErrorSlot) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                slot.error = Some(error);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Engine, ResourceError};
    use crate::entity::Entity;
    use symbridge_testkit::FakeEngine;

    #[test]
    fn success_leaves_slot_empty() {
        let engine = Engine::new(FakeEngine::new());
        let mut slot = ErrorSlot::new();

        let expr = engine.parse("x + 1").report(&mut slot);
        assert!(expr.is_some());
        assert!(!slot.is_set());
        assert!(slot.name().is_none());
    }

    #[test]
    fn failure_fills_slot_without_unwinding() {
        let engine = Engine::new(FakeEngine::new());
        let mut slot = ErrorSlot::new();

        let expr = engine.parse("x +").report(&mut slot);
        assert!(expr.is_none());
        assert!(slot.is_set());
        assert!(!slot.name().unwrap().is_empty());
        assert!(!slot.message().unwrap().is_empty());
        assert!(!slot.stack_trace().unwrap().is_empty());

        assert!(slot.take().unwrap().is_parse());
        assert!(!slot.is_set());
    }

    #[test]
    fn native_failures_are_named() {
        let mut slot = ErrorSlot::new();
        let empty = Entity::default();

        assert!(empty.simplify().report(&mut slot).is_none());
        assert_eq!(slot.name().as_deref(), Some("ResourceError"));
        assert!(matches!(
            slot.error(),
            Some(BindingError::Resource(ResourceError::EmptyEntity))
        ));
        assert_eq!(slot.stack_trace().as_deref(), Some(""));

        slot.clear();
        assert!(!slot.is_set());
    }
}
