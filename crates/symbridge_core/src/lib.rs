//! # SymBridge Core
//!
//! Safe bindings to a symbolic-mathematics engine exposed through a C ABI.
//!
//! This crate provides:
//! - [`Engine`], loaded from a shared library or wrapping an in-process
//!   implementation of [`symbridge_abi::ForeignEngine`]
//! - [`Entity`], an immutable expression with calculus, simplification,
//!   structural queries and numeric casts
//! - Arithmetic operators and elementary [`functions`]
//! - Deterministic release of every engine-owned handle, string, array and
//!   error record
//!
//! ```rust,ignore
//! use symbridge_core::Engine;
//!
//! let engine = Engine::from_env()?;
//! let expr = engine.parse("x^2 + 3x")?;
//! let x = engine.parse("x")?;
//! println!("{}", expr.differentiate(&x)?.simplify()?);
//! ```

#![warn(missing_docs)]

mod cache;
mod config;
mod engine;
mod entity;
mod error;
pub mod functions;
mod handle;
mod loader;
mod marshal;
mod ops;
mod report;
mod stats;

pub use cache::FieldCache;
pub use config::{platform_file_name, EngineConfig, DEFAULT_LIBRARY_NAME, ENGINE_LIB_ENV};
pub use engine::Engine;
pub use entity::{Complex, Entity};
pub use error::{BindingError, BindingResult, ForeignError, ResourceError};
pub use loader::DynamicEngine;
pub use report::{ErrorSlot, ReportExt};
pub use stats::{EngineStats, StatsSnapshot};
pub use symbridge_abi::{ApproachFrom, MathFunction};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
