//! Elementary functions.
//!
//! Each function calls one optional engine export. When the loaded library
//! does not export it, the call fails with
//! [`BindingError::Unsupported`](crate::BindingError::Unsupported).

use crate::entity::Entity;
use crate::error::BindingResult;
use symbridge_abi::MathFunction;

macro_rules! unary_functions {
    ($($(#[$doc:meta])* $name:ident => $function:ident;)*) => {
        $(
            $(#[$doc])*
            pub fn $name(x: &Entity) -> BindingResult<Entity> {
                x.apply(MathFunction::$function, &[])
            }
        )*
    };
}

unary_functions! {
    /// `sin(x)`
    sin => Sin;
    /// `cos(x)`
    cos => Cos;
    /// `tan(x)`
    tan => Tan;
    /// `cotan(x)`
    cotan => Cotan;
    /// `sec(x)`
    sec => Sec;
    /// `cosec(x)`
    cosec => Cosec;
    /// `arcsin(x)`
    arcsin => Arcsin;
    /// `arccos(x)`
    arccos => Arccos;
    /// `arctan(x)`
    arctan => Arctan;
    /// `arccotan(x)`
    arccotan => Arccotan;
    /// `arcsec(x)`
    arcsec => Arcsec;
    /// `arccosec(x)`
    arccosec => Arccosec;
    /// Natural logarithm.
    ln => Ln;
    /// Square root.
    sqrt => Sqrt;
    /// Cube root.
    cbrt => Cbrt;
    /// `x ^ 2`
    sqr => Sqr;
    /// `x!`
    factorial => Factorial;
    /// Gamma function.
    gamma => Gamma;
    /// Sign.
    signum => Signum;
    /// Absolute value.
    abs => Abs;
    /// `-x`
    negation => Negation;
}

/// Logarithm of `x` in `base`.
pub fn log(base: &Entity, x: &Entity) -> BindingResult<Entity> {
    base.apply(MathFunction::Log, &[x])
}

/// `base ^ exponent`
pub fn pow(base: &Entity, exponent: &Entity) -> BindingResult<Entity> {
    base.apply(MathFunction::Pow, &[exponent])
}

/// `expr` restricted to where `condition` holds.
pub fn provided(expr: &Entity, condition: &Entity) -> BindingResult<Entity> {
    expr.apply(MathFunction::Provided, &[condition])
}

/// Hyperbolic functions.
pub mod hyperbolic {
    use super::*;

    unary_functions! {
        /// Hyperbolic sine.
        sinh => Sinh;
        /// Hyperbolic cosine.
        cosh => Cosh;
        /// Hyperbolic tangent.
        tanh => Tanh;
        /// Hyperbolic cotangent.
        cotanh => Cotanh;
        /// Hyperbolic secant.
        sech => Sech;
        /// Hyperbolic cosecant.
        cosech => Cosech;
        /// Inverse hyperbolic sine.
        arsinh => Arsinh;
        /// Inverse hyperbolic cosine.
        arcosh => Arcosh;
        /// Inverse hyperbolic tangent.
        artanh => Artanh;
        /// Inverse hyperbolic cotangent.
        arcotanh => Arcotanh;
        /// Inverse hyperbolic secant.
        arsech => Arsech;
        /// Inverse hyperbolic cosecant.
        arcosech => Arcosech;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BindingError, Engine};
    use symbridge_testkit::FakeEngine;

    #[test]
    fn unary_function() {
        let engine = Engine::new(FakeEngine::new());
        let x = engine.parse("x").unwrap();

        assert_eq!(sin(&x).unwrap().to_string(), "sin(x)");
        assert_eq!(hyperbolic::cosh(&x).unwrap().to_string(), "cosh(x)");
    }

    #[test]
    fn binary_functions() {
        let engine = Engine::new(FakeEngine::new());
        let x = engine.parse("x").unwrap();
        let two = engine.parse("2").unwrap();

        assert_eq!(pow(&x, &two).unwrap().to_string(), "x ^ 2");
        assert_eq!(log(&two, &x).unwrap().to_string(), "log(2, x)");
    }

    #[test]
    fn missing_export_is_unsupported() {
        let fake = FakeEngine::new().without_function(MathFunction::Gamma);
        let engine = Engine::new(fake.clone());
        let x = engine.parse("x").unwrap();

        let err = gamma(&x).unwrap_err();
        assert!(matches!(
            err,
            BindingError::Unsupported {
                symbol: "math_s_gamma"
            }
        ));
        // Nothing was allocated for the refused call.
        assert_eq!(fake.ledger().live_handles(), 1);
    }

    #[test]
    fn wrong_arity_is_rejected() {
        let engine = Engine::new(FakeEngine::new());
        let x = engine.parse("x").unwrap();

        let err = x.apply(MathFunction::Pow, &[]).unwrap_err();
        assert!(matches!(err, BindingError::InvalidArgument { .. }));
    }
}
