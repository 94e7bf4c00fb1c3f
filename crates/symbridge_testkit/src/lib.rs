//! # SymBridge Testkit
//!
//! Test utilities for SymBridge.
//!
//! This crate provides:
//! - [`FakeEngine`], an in-process implementation of the engine ABI with an
//!   allocation ledger
//! - A small expression model backing the fake engine
//! - Property-based test generators using proptest
//! - Shared expression test vectors
//!
//! ## Usage
//!
//! ```rust,ignore
//! use symbridge_core::Engine;
//! use symbridge_testkit::prelude::*;
//!
//! #[test]
//! fn no_leaks() {
//!     let fake = FakeEngine::new();
//!     let engine = Engine::new(fake.clone());
//!     drop(engine.parse("x + 1").unwrap());
//!     assert!(fake.ledger().is_balanced());
//! }
//! ```

#![warn(missing_docs)]

pub mod calculus;
pub mod expr;
pub mod fake;
pub mod generators;
pub mod ledger;
pub mod vectors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::expr::Expr;
    pub use crate::fake::FakeEngine;
    pub use crate::generators::*;
    pub use crate::ledger::Ledger;
    pub use crate::vectors::*;
}

pub use expr::{parse, Expr, ParseError};
pub use fake::FakeEngine;
pub use ledger::Ledger;
pub use vectors::{all_vectors, ExpressionVector, Operation};
