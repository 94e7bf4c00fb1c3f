//! Exported symbol names of the engine library.

/// Releases one entity handle.
pub const FREE_ENTITY: &str = "free_entity";
/// Releases the storage of a handle array.
pub const FREE_NATIVE_ARRAY: &str = "free_native_array";
/// Releases the strings of a failure record.
pub const FREE_ERROR_CODE: &str = "free_error_code";
/// Releases a string returned by the engine.
pub const FREE_STRING: &str = "free_string";

/// Parses text into a handle.
pub const MATHS_FROM_STRING: &str = "maths_from_string";

/// Stringifies an entity.
pub const ENTITY_TO_STRING: &str = "entity_to_string";
/// Renders an entity as LaTeX.
pub const ENTITY_LATEXISE: &str = "entity_latexise";

/// Derivative with respect to a variable.
pub const ENTITY_DIFFERENTIATE: &str = "entity_differentiate";
/// Antiderivative with respect to a variable.
pub const ENTITY_INTEGRATE: &str = "entity_integrate";
/// Limit of an entity as a variable approaches a destination.
pub const ENTITY_LIMIT: &str = "entity_limit";
/// Solves a statement for a variable.
pub const ENTITY_SOLVE: &str = "entity_solve";
/// Solves `expr = 0` for a variable.
pub const ENTITY_SOLVE_EQUATION: &str = "entity_solve_equation";

/// Simplified form.
pub const ENTITY_SIMPLIFY: &str = "entity_simplify";
/// Evaluated form.
pub const ENTITY_EVALED: &str = "entity_evaled";
/// Form with simplified inner nodes.
pub const ENTITY_INNER_SIMPLIFIED: &str = "entity_inner_simplified";
/// Equivalent alternate forms.
pub const ENTITY_ALTERNATE: &str = "entity_alternate";

/// `a + b`
pub const OP_ENTITY_ADD: &str = "op_entity_add";
/// `a - b`
pub const OP_ENTITY_SUB: &str = "op_entity_sub";
/// `a * b`
pub const OP_ENTITY_MUL: &str = "op_entity_mul";
/// `a / b`
pub const OP_ENTITY_DIV: &str = "op_entity_div";

/// Every node in pre-order.
pub const ENTITY_NODES: &str = "entity_nodes";
/// Free variables.
pub const ENTITY_VARS: &str = "entity_vars";
/// Free variables and named constants.
pub const ENTITY_VARS_AND_CONSTANTS: &str = "entity_vars_and_constants";
/// Immediate children.
pub const ENTITY_DIRECT_CHILDREN: &str = "entity_direct_children";

/// Cast to a 64-bit integer.
pub const ENTITY_TO_LONG: &str = "entity_to_long";
/// Cast to a rational pair.
pub const ENTITY_TO_RATIONAL: &str = "entity_to_rational";
/// Cast to a double.
pub const ENTITY_TO_DOUBLE: &str = "entity_to_double";
/// Cast to a complex pair.
pub const ENTITY_TO_COMPLEX: &str = "entity_to_complex";

/// Symbols every engine library must export.
pub const REQUIRED: [&str; 28] = [
    FREE_ENTITY,
    FREE_NATIVE_ARRAY,
    FREE_ERROR_CODE,
    FREE_STRING,
    MATHS_FROM_STRING,
    ENTITY_TO_STRING,
    ENTITY_LATEXISE,
    ENTITY_DIFFERENTIATE,
    ENTITY_INTEGRATE,
    ENTITY_LIMIT,
    ENTITY_SOLVE,
    ENTITY_SOLVE_EQUATION,
    ENTITY_SIMPLIFY,
    ENTITY_EVALED,
    ENTITY_INNER_SIMPLIFIED,
    ENTITY_ALTERNATE,
    OP_ENTITY_ADD,
    OP_ENTITY_SUB,
    OP_ENTITY_MUL,
    OP_ENTITY_DIV,
    ENTITY_NODES,
    ENTITY_VARS,
    ENTITY_VARS_AND_CONSTANTS,
    ENTITY_DIRECT_CHILDREN,
    ENTITY_TO_LONG,
    ENTITY_TO_RATIONAL,
    ENTITY_TO_DOUBLE,
    ENTITY_TO_COMPLEX,
];
