//! Property-based test generators using proptest.
//!
//! Provides strategies for expression trees, expression text and sequences
//! of entity operations for lifecycle tests.

use crate::expr::Expr;
use proptest::prelude::*;

/// Strategy for leaf expressions: small integers and a few variables.
pub fn leaf_strategy() -> impl Strategy<Value = Expr> {
    prop_oneof![
        (0i32..10).prop_map(|n| Expr::Number(f64::from(n))),
        prop::sample::select(vec!["x", "y", "a"]).prop_map(|name| Expr::sym(name)),
    ]
}

/// Strategy for expression trees up to a few levels deep.
pub fn expr_strategy() -> impl Strategy<Value = Expr> {
    leaf_strategy().prop_recursive(4, 32, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Expr::sum(a, b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Expr::minus(a, b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Expr::mul(a, b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Expr::div(a, b)),
            (inner.clone(), 0i32..4).prop_map(|(a, n)| Expr::pow(a, Expr::Number(f64::from(n)))),
            inner.prop_map(|a| Expr::call("sin", a)),
        ]
    })
}

/// Strategy for expression text the engine accepts.
pub fn expression_text_strategy() -> impl Strategy<Value = String> {
    expr_strategy().prop_map(|e| e.to_string())
}

/// Structural query on an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    /// String form.
    Stringify,
    /// Every node.
    Nodes,
    /// Free variables.
    Vars,
    /// Immediate children.
    Children,
    /// Evaluated form.
    Evaled,
    /// Derivative with respect to `x`.
    Differentiate,
    /// Simplified form.
    Simplify,
}

/// Operation in a lifecycle sequence.
///
/// Indices refer to a pool of live entities and wrap around its length.
#[derive(Debug, Clone)]
pub enum EntityOperation {
    /// Parse new text into the pool.
    Parse {
        /// Expression text.
        text: String,
    },
    /// Clone an entity into the pool.
    Share {
        /// Pool index.
        index: usize,
    },
    /// Drop an entity from the pool.
    Release {
        /// Pool index.
        index: usize,
    },
    /// Run a query and keep any produced entity.
    Query {
        /// Pool index.
        index: usize,
        /// The query.
        query: Query,
    },
    /// Add two entities.
    Add {
        /// Left pool index.
        left: usize,
        /// Right pool index.
        right: usize,
    },
}

/// Strategy for structural queries.
pub fn query_strategy() -> impl Strategy<Value = Query> {
    prop::sample::select(vec![
        Query::Stringify,
        Query::Nodes,
        Query::Vars,
        Query::Children,
        Query::Evaled,
        Query::Differentiate,
        Query::Simplify,
    ])
}

/// Strategy for entity operations.
pub fn entity_operation_strategy() -> impl Strategy<Value = EntityOperation> {
    prop_oneof![
        3 => expression_text_strategy().prop_map(|text| EntityOperation::Parse { text }),
        1 => "[a-z+*( ]{1,6}".prop_map(|text| EntityOperation::Parse { text }),
        1 => any::<usize>().prop_map(|index| EntityOperation::Share { index }),
        2 => any::<usize>().prop_map(|index| EntityOperation::Release { index }),
        3 => (any::<usize>(), query_strategy())
            .prop_map(|(index, query)| EntityOperation::Query { index, query }),
        1 => (any::<usize>(), any::<usize>())
            .prop_map(|(left, right)| EntityOperation::Add { left, right }),
    ]
}

/// Strategy for a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<EntityOperation>> {
    prop::collection::vec(entity_operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parse;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn printed_text_reparses_to_the_same_text(expr in expr_strategy()) {
            let text = expr.to_string();
            let reparsed = parse(&text).unwrap();
            prop_assert_eq!(reparsed.to_string(), text);
        }

        #[test]
        fn nodes_start_at_the_root(expr in expr_strategy()) {
            let nodes = expr.preorder();
            prop_assert_eq!(nodes[0], &expr);
            prop_assert!(nodes.len() >= expr.children().len() + 1);
        }
    }
}
