//! Shared expression test vectors.
//!
//! The same vectors drive the in-process engine tests and the live-library
//! tests, so both must agree on the engine's text output.

use serde::{Deserialize, Serialize};

/// Operation a vector exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Parse then stringify.
    Stringify,
    /// Derivative with respect to `var`, simplified.
    Differentiate,
    /// Antiderivative with respect to `var`, simplified.
    Integrate,
    /// Simplified form.
    Simplify,
    /// Roots of `input = 0` in `var`.
    SolveEquation,
}

/// One input/expected pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpressionVector {
    /// Unique identifier for this vector.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Operation under test.
    pub operation: Operation,
    /// Expression text.
    pub input: String,
    /// Variable, for calculus operations.
    pub var: Option<String>,
    /// Expected string form of the result.
    pub expected: String,
}

impl ExpressionVector {
    fn new(
        id: &str,
        description: &str,
        operation: Operation,
        input: &str,
        var: Option<&str>,
        expected: &str,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            operation,
            input: input.into(),
            var: var.map(Into::into),
            expected: expected.into(),
        }
    }
}

/// Stringification vectors.
pub fn stringify_vectors() -> Vec<ExpressionVector> {
    vec![
        ExpressionVector::new(
            "stringify_sum",
            "Binary operators are spaced",
            Operation::Stringify,
            "x+1",
            None,
            "x + 1",
        ),
        ExpressionVector::new(
            "stringify_product_sum",
            "Products bind tighter than sums",
            Operation::Stringify,
            "a*b+b",
            None,
            "a * b + b",
        ),
        ExpressionVector::new(
            "stringify_grouping",
            "Parentheses are kept where required",
            Operation::Stringify,
            "(x+1)*2",
            None,
            "(x + 1) * 2",
        ),
    ]
}

/// Calculus vectors.
pub fn calculus_vectors() -> Vec<ExpressionVector> {
    vec![
        ExpressionVector::new(
            "differentiate_linear",
            "Constant term vanishes",
            Operation::Differentiate,
            "a*x + 2",
            Some("x"),
            "a",
        ),
        ExpressionVector::new(
            "differentiate_two_terms",
            "Coefficients of both terms are collected",
            Operation::Differentiate,
            "a*x + 2*x",
            Some("x"),
            "a + 2",
        ),
        ExpressionVector::new(
            "differentiate_square",
            "Power rule",
            Operation::Differentiate,
            "x^2",
            Some("x"),
            "2 * x",
        ),
        ExpressionVector::new(
            "integrate_identity",
            "Antiderivative of x",
            Operation::Integrate,
            "x",
            Some("x"),
            "x ^ 2 / 2",
        ),
        ExpressionVector::new(
            "solve_square",
            "Both roots of a quadratic",
            Operation::SolveEquation,
            "x^2 - 4",
            Some("x"),
            "{ -2, 2 }",
        ),
    ]
}

/// Simplification vectors.
pub fn simplify_vectors() -> Vec<ExpressionVector> {
    vec![
        ExpressionVector::new(
            "simplify_constants",
            "Constant subtrees are folded",
            Operation::Simplify,
            "2 + 3 * 4",
            None,
            "14",
        ),
        ExpressionVector::new(
            "simplify_neutral",
            "Neutral elements are removed",
            Operation::Simplify,
            "x * 1 + 0",
            None,
            "x",
        ),
    ]
}

/// Every vector.
pub fn all_vectors() -> Vec<ExpressionVector> {
    let mut vectors = stringify_vectors();
    vectors.extend(calculus_vectors());
    vectors.extend(simplify_vectors());
    vectors
}

/// Generate all vectors as JSON for cross-language use.
pub fn all_vectors_json() -> String {
    serde_json::to_string_pretty(&all_vectors()).expect("Failed to serialize vectors")
}

/// Parses vectors from JSON.
pub fn vectors_from_json(json: &str) -> serde_json::Result<Vec<ExpressionVector>> {
    serde_json::from_str(json)
}
