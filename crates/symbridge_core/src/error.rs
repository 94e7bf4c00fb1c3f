//! Error types for SymBridge.

use std::fmt;
use thiserror::Error;

/// Result type for binding operations.
pub type BindingResult<T> = Result<T, BindingError>;

/// A failure reported by the engine, copied out of its error record.
///
/// The fields are the engine's own text, unmodified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignError {
    /// Error kind, for example the engine's exception type name.
    pub name: String,
    /// Human-readable message.
    pub message: String,
    /// Engine-side stack trace.
    pub stack_trace: String,
}

impl ForeignError {
    /// Creates a foreign error.
    pub fn new(
        name: impl Into<String>,
        message: impl Into<String>,
        stack_trace: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack_trace: stack_trace.into(),
        }
    }

    fn names_parse_failure(&self) -> bool {
        self.name.contains("Parse")
    }

    fn names_invalid_handle(&self) -> bool {
        ["InvalidHandle", "KeyNotFound", "ObjectDisposed"]
            .iter()
            .any(|marker| self.name.contains(marker))
    }
}

impl fmt::Display for ForeignError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

/// Errors that can occur in binding operations.
#[derive(Debug, Error)]
pub enum BindingError {
    /// The engine rejected the expression text.
    #[error("parse error: {0}")]
    Parse(ForeignError),

    /// The engine operation itself failed.
    #[error("engine error: {0}")]
    Engine(ForeignError),

    /// A handle or entity was used incorrectly.
    #[error("resource error: {0}")]
    Resource(#[from] ResourceError),

    /// An argument cannot cross the ABI.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// The loaded library does not export an optional function.
    #[error("engine does not export '{symbol}'")]
    Unsupported {
        /// The missing symbol.
        symbol: &'static str,
    },

    /// The engine library could not be loaded.
    #[error("failed to load engine library '{path}': {source}")]
    Load {
        /// Path or name that was tried.
        path: String,
        /// Loader error.
        #[source]
        source: libloading::Error,
    },

    /// The engine library is missing a required export.
    #[error("engine library '{path}' does not export '{symbol}': {source}")]
    MissingSymbol {
        /// Library path.
        path: String,
        /// The missing symbol.
        symbol: &'static str,
        /// Loader error.
        #[source]
        source: libloading::Error,
    },
}

/// Misuse of handles and entities.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The entity is the empty sentinel and owns no handle.
    #[error("entity is empty")]
    EmptyEntity,

    /// Two entities issued by different engine instances were combined.
    #[error("entities belong to different engine instances")]
    EngineMismatch,

    /// The engine reported an invalid or already released handle.
    #[error("invalid handle: {0}")]
    InvalidHandle(ForeignError),

    /// The engine returned a malformed handle array.
    #[error("malformed handle array from '{symbol}' (length {length})")]
    MalformedArray {
        /// The function that returned it.
        symbol: &'static str,
        /// The reported length.
        length: i32,
    },
}

/// Default classification for a failed call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailureKind {
    /// Parsing call sites.
    Parse,
    /// Every other operation.
    Engine,
}

impl BindingError {
    /// Classifies a foreign failure.
    ///
    /// Handle errors are always resource errors; a name mentioning parsing is
    /// always a parse error; everything else follows the call site.
    pub(crate) fn from_foreign(error: ForeignError, kind: FailureKind) -> Self {
        if error.names_invalid_handle() {
            Self::Resource(ResourceError::InvalidHandle(error))
        } else if kind == FailureKind::Parse || error.names_parse_failure() {
            Self::Parse(error)
        } else {
            Self::Engine(error)
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// The engine's error record, if the engine reported this failure.
    pub fn foreign(&self) -> Option<&ForeignError> {
        match self {
            Self::Parse(e) | Self::Engine(e) => Some(e),
            Self::Resource(ResourceError::InvalidHandle(e)) => Some(e),
            _ => None,
        }
    }

    /// Returns true for parse failures.
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }

    /// Returns true for resource misuse.
    pub fn is_resource(&self) -> bool {
        matches!(self, Self::Resource(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_site_classifies_as_parse() {
        let foreign = ForeignError::new("Exception", "bad input", "");
        let err = BindingError::from_foreign(foreign, FailureKind::Parse);
        assert!(err.is_parse());
    }

    #[test]
    fn parse_name_wins_at_any_site() {
        let foreign = ForeignError::new("UnhandledParseException", "bad input", "");
        let err = BindingError::from_foreign(foreign, FailureKind::Engine);
        assert!(err.is_parse());
    }

    #[test]
    fn handle_names_are_resource_errors() {
        for name in ["InvalidHandleException", "KeyNotFoundException", "ObjectDisposedException"] {
            let foreign = ForeignError::new(name, "gone", "");
            let err = BindingError::from_foreign(foreign, FailureKind::Parse);
            assert!(err.is_resource(), "{name} should be a resource error");
            assert_eq!(err.foreign().unwrap().name, name);
        }
    }

    #[test]
    fn other_names_are_engine_errors() {
        let foreign = ForeignError::new("NotSupportedException", "no limit", "at Limit()");
        let err = BindingError::from_foreign(foreign.clone(), FailureKind::Engine);
        assert!(matches!(err, BindingError::Engine(_)));
        assert_eq!(err.foreign(), Some(&foreign));
        assert_eq!(
            err.to_string(),
            "engine error: NotSupportedException: no limit"
        );
    }

    #[test]
    fn native_errors_have_no_foreign_record() {
        let err: BindingError = ResourceError::EmptyEntity.into();
        assert!(err.foreign().is_none());
        assert_eq!(err.to_string(), "resource error: entity is empty");

        let err = BindingError::invalid_argument("interior NUL");
        assert!(err.foreign().is_none());
    }
}
