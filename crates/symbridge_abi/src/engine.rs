//! The engine contract.

use crate::buffer::NativeArray;
use crate::error::NativeErrorCode;
use crate::function::MathFunction;
use crate::types::{ApproachFrom, DoubleTuple, EntityRef, LongTuple};
use std::ffi::{c_char, CStr};

/// One implementation of the engine ABI.
///
/// Each method mirrors one exported function: the error record is the
/// return value and the payload is written through the out-parameter. The
/// out-parameter is only meaningful when the returned record is a success.
///
/// Handles, strings, arrays and failure records produced by an engine must
/// be released through the same engine's `free_*` methods.
pub trait ForeignEngine: Send + Sync {
    /// Parses expression text.
    fn maths_from_string(&self, text: &CStr, out: &mut EntityRef) -> NativeErrorCode;

    /// Stringifies an entity. The string is owned by the engine.
    fn entity_to_string(&self, entity: EntityRef, out: &mut *mut c_char) -> NativeErrorCode;

    /// Renders an entity as LaTeX. The string is owned by the engine.
    fn entity_latexise(&self, entity: EntityRef, out: &mut *mut c_char) -> NativeErrorCode;

    /// Derivative of `entity` with respect to `var`.
    fn entity_differentiate(
        &self,
        entity: EntityRef,
        var: EntityRef,
        out: &mut EntityRef,
    ) -> NativeErrorCode;

    /// Antiderivative of `entity` with respect to `var`.
    fn entity_integrate(
        &self,
        entity: EntityRef,
        var: EntityRef,
        out: &mut EntityRef,
    ) -> NativeErrorCode;

    /// Limit of `entity` as `var` approaches `dest`.
    fn entity_limit(
        &self,
        entity: EntityRef,
        var: EntityRef,
        dest: EntityRef,
        from: ApproachFrom,
        out: &mut EntityRef,
    ) -> NativeErrorCode;

    /// Solves a statement for `var`.
    fn entity_solve(&self, entity: EntityRef, var: EntityRef, out: &mut EntityRef)
        -> NativeErrorCode;

    /// Solves `entity = 0` for `var`.
    fn entity_solve_equation(
        &self,
        entity: EntityRef,
        var: EntityRef,
        out: &mut EntityRef,
    ) -> NativeErrorCode;

    /// Simplified form.
    fn entity_simplify(&self, entity: EntityRef, out: &mut EntityRef) -> NativeErrorCode;

    /// Evaluated form.
    fn entity_evaled(&self, entity: EntityRef, out: &mut EntityRef) -> NativeErrorCode;

    /// Form with every inner node simplified.
    fn entity_inner_simplified(&self, entity: EntityRef, out: &mut EntityRef) -> NativeErrorCode;

    /// Equivalent alternate forms.
    fn entity_alternate(&self, entity: EntityRef, out: &mut NativeArray) -> NativeErrorCode;

    /// `a + b`
    fn op_entity_add(&self, a: EntityRef, b: EntityRef, out: &mut EntityRef) -> NativeErrorCode;

    /// `a - b`
    fn op_entity_sub(&self, a: EntityRef, b: EntityRef, out: &mut EntityRef) -> NativeErrorCode;

    /// `a * b`
    fn op_entity_mul(&self, a: EntityRef, b: EntityRef, out: &mut EntityRef) -> NativeErrorCode;

    /// `a / b`
    fn op_entity_div(&self, a: EntityRef, b: EntityRef, out: &mut EntityRef) -> NativeErrorCode;

    /// Every node, root first, children in engine order.
    fn entity_nodes(&self, entity: EntityRef, out: &mut NativeArray) -> NativeErrorCode;

    /// Free variables.
    fn entity_vars(&self, entity: EntityRef, out: &mut NativeArray) -> NativeErrorCode;

    /// Free variables and named constants.
    fn entity_vars_and_constants(&self, entity: EntityRef, out: &mut NativeArray)
        -> NativeErrorCode;

    /// Immediate children.
    fn entity_direct_children(&self, entity: EntityRef, out: &mut NativeArray) -> NativeErrorCode;

    /// Cast to a 64-bit integer.
    fn entity_to_long(&self, entity: EntityRef, out: &mut i64) -> NativeErrorCode;

    /// Cast to a (numerator, denominator) pair.
    fn entity_to_rational(&self, entity: EntityRef, out: &mut LongTuple) -> NativeErrorCode;

    /// Cast to a double.
    fn entity_to_double(&self, entity: EntityRef, out: &mut f64) -> NativeErrorCode;

    /// Cast to a (real, imaginary) pair.
    fn entity_to_complex(&self, entity: EntityRef, out: &mut DoubleTuple) -> NativeErrorCode;

    /// Returns true if the engine exports `function`.
    fn has_function(&self, function: MathFunction) -> bool;

    /// Applies an elementary function.
    ///
    /// `args.len()` equals `function.arity()`. Returns `None` if the engine
    /// does not export the function.
    fn math_function(
        &self,
        function: MathFunction,
        args: &[EntityRef],
        out: &mut EntityRef,
    ) -> Option<NativeErrorCode>;

    /// Releases one handle. The handle is invalid afterwards.
    fn free_entity(&self, entity: EntityRef) -> NativeErrorCode;

    /// Releases the storage of a handle array. The handles stay alive.
    ///
    /// # Safety
    ///
    /// `array` must come from this engine and not have been released before.
    unsafe fn free_native_array(&self, array: NativeArray) -> NativeErrorCode;

    /// Releases the strings of a failure record.
    ///
    /// # Safety
    ///
    /// `error` must come from this engine and not have been released before.
    unsafe fn free_error_code(&self, error: NativeErrorCode) -> NativeErrorCode;

    /// Releases a string returned by the engine.
    ///
    /// # Safety
    ///
    /// `string` must come from this engine and not have been released before.
    unsafe fn free_string(&self, string: *mut c_char) -> NativeErrorCode;
}
