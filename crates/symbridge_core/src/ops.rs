//! Arithmetic operators on entities.
//!
//! Operators go through the engine, so they can fail: the output type is
//! [`BindingResult<Entity>`].
//!
//! ```rust,ignore
//! let sum = (&x + &one)?;
//! let neg = (-&x)?;
//! ```

use crate::entity::Entity;
use crate::error::BindingResult;
use symbridge_abi::MathFunction;
use std::ops::{Add, Div, Mul, Neg, Sub};

macro_rules! forward_binary_op {
    ($trait:ident, $method:ident, $inner:ident) => {
        impl $trait<&Entity> for &Entity {
            type Output = BindingResult<Entity>;

            fn $method(self, rhs: &Entity) -> Self::Output {
                self.$inner(rhs)
            }
        }

        impl $trait<Entity> for Entity {
            type Output = BindingResult<Entity>;

            fn $method(self, rhs: Entity) -> Self::Output {
                self.$inner(&rhs)
            }
        }

        impl $trait<&Entity> for Entity {
            type Output = BindingResult<Entity>;

            fn $method(self, rhs: &Entity) -> Self::Output {
                self.$inner(rhs)
            }
        }
    };
}

forward_binary_op!(Add, add, add_entity);
forward_binary_op!(Sub, sub, sub_entity);
forward_binary_op!(Mul, mul, mul_entity);
forward_binary_op!(Div, div, div_entity);

impl Neg for &Entity {
    type Output = BindingResult<Entity>;

    fn neg(self) -> Self::Output {
        self.apply(MathFunction::Negation, &[])
    }
}

impl Neg for Entity {
    type Output = BindingResult<Entity>;

    fn neg(self) -> Self::Output {
        -&self
    }
}

#[cfg(test)]
mod tests {
    use crate::{Engine, ResourceError};
    use crate::error::BindingError;
    use symbridge_abi::symbols;
    use symbridge_testkit::FakeEngine;

    #[test]
    fn operators_build_new_entities() {
        let engine = Engine::new(FakeEngine::new());
        let x = engine.parse("x").unwrap();
        let two = engine.parse("2").unwrap();

        assert_eq!((&x + &two).unwrap().to_string(), "x + 2");
        assert_eq!((&x - &two).unwrap().to_string(), "x - 2");
        assert_eq!((&x * &two).unwrap().to_string(), "x * 2");
        assert_eq!((&x / &two).unwrap().to_string(), "x / 2");
        assert_eq!((-&x).unwrap().to_string(), "-x");

        // Operands are untouched.
        assert_eq!(x.to_string(), "x");
        assert_eq!(two.to_string(), "2");
    }

    #[test]
    fn owned_operands() {
        let engine = Engine::new(FakeEngine::new());
        let a = engine.parse("a").unwrap();
        let b = engine.parse("b").unwrap();

        let product = (a * &b).unwrap();
        let sum = (product + b).unwrap();
        assert_eq!(sum.to_string(), "a * b + b");
    }

    #[test]
    fn operators_call_the_engine_once() {
        let fake = FakeEngine::new();
        let engine = Engine::new(fake.clone());
        let x = engine.parse("x").unwrap();

        let _ = (&x * &x).unwrap();
        assert_eq!(fake.ledger().calls(symbols::OP_ENTITY_MUL), 1);
    }

    #[test]
    fn mixing_engines_is_rejected() {
        let first = Engine::new(FakeEngine::new());
        let second = Engine::new(FakeEngine::new());
        let x = first.parse("x").unwrap();
        let y = second.parse("y").unwrap();

        let err = (&x + &y).unwrap_err();
        assert!(matches!(
            err,
            BindingError::Resource(ResourceError::EngineMismatch)
        ));
    }
}
