//! # SymBridge ABI
//!
//! The C ABI contract between SymBridge and a symbolic-mathematics engine.
//!
//! This crate provides:
//! - `#[repr(C)]` wire types (handles, error records, arrays, tuples)
//! - The [`ForeignEngine`] trait, one method per exported engine function
//! - Exported symbol names
//! - Engine-side allocation helpers for in-process engine implementations
//!
//! Every engine function returns a [`NativeErrorCode`] and delivers its
//! payload through an out-parameter. A null error name means success.

#![warn(missing_docs)]

pub mod buffer;
pub mod engine;
pub mod error;
pub mod function;
pub mod symbols;
pub mod types;

pub use buffer::NativeArray;
pub use engine::ForeignEngine;
pub use error::NativeErrorCode;
pub use function::MathFunction;
pub use types::{ApproachFrom, DoubleTuple, EntityRef, LongTuple};
