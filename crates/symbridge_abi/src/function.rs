//! Elementary function exports.
//!
//! These exports are optional: an engine library may ship without some of
//! them, and callers check availability before use.

/// An elementary function exported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MathFunction {
    /// `sin(x)`
    Sin,
    /// `cos(x)`
    Cos,
    /// `tan(x)`
    Tan,
    /// `cotan(x)`
    Cotan,
    /// `sec(x)`
    Sec,
    /// `cosec(x)`
    Cosec,
    /// `arcsin(x)`
    Arcsin,
    /// `arccos(x)`
    Arccos,
    /// `arctan(x)`
    Arctan,
    /// `arccotan(x)`
    Arccotan,
    /// `arcsec(x)`
    Arcsec,
    /// `arccosec(x)`
    Arccosec,
    /// Natural logarithm.
    Ln,
    /// `log(base, x)`
    Log,
    /// `base ^ exponent`
    Pow,
    /// Square root.
    Sqrt,
    /// Cube root.
    Cbrt,
    /// `x ^ 2`
    Sqr,
    /// `x!`
    Factorial,
    /// Gamma function.
    Gamma,
    /// Sign of `x`.
    Signum,
    /// Absolute value.
    Abs,
    /// `-x`
    Negation,
    /// `expr provided condition`
    Provided,
    /// Hyperbolic sine.
    Sinh,
    /// Hyperbolic cosine.
    Cosh,
    /// Hyperbolic tangent.
    Tanh,
    /// Hyperbolic cotangent.
    Cotanh,
    /// Hyperbolic secant.
    Sech,
    /// Hyperbolic cosecant.
    Cosech,
    /// Inverse hyperbolic sine.
    Arsinh,
    /// Inverse hyperbolic cosine.
    Arcosh,
    /// Inverse hyperbolic tangent.
    Artanh,
    /// Inverse hyperbolic cotangent.
    Arcotanh,
    /// Inverse hyperbolic secant.
    Arsech,
    /// Inverse hyperbolic cosecant.
    Arcosech,
}

impl MathFunction {
    /// Every exported function.
    pub const ALL: [MathFunction; 36] = [
        Self::Sin,
        Self::Cos,
        Self::Tan,
        Self::Cotan,
        Self::Sec,
        Self::Cosec,
        Self::Arcsin,
        Self::Arccos,
        Self::Arctan,
        Self::Arccotan,
        Self::Arcsec,
        Self::Arccosec,
        Self::Ln,
        Self::Log,
        Self::Pow,
        Self::Sqrt,
        Self::Cbrt,
        Self::Sqr,
        Self::Factorial,
        Self::Gamma,
        Self::Signum,
        Self::Abs,
        Self::Negation,
        Self::Provided,
        Self::Sinh,
        Self::Cosh,
        Self::Tanh,
        Self::Cotanh,
        Self::Sech,
        Self::Cosech,
        Self::Arsinh,
        Self::Arcosh,
        Self::Artanh,
        Self::Arcotanh,
        Self::Arsech,
        Self::Arcosech,
    ];

    /// Number of handle arguments.
    pub const fn arity(self) -> usize {
        match self {
            Self::Log | Self::Pow | Self::Provided => 2,
            _ => 1,
        }
    }

    /// Exported symbol name.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Sin => "math_s_sin",
            Self::Cos => "math_s_cos",
            Self::Tan => "math_s_tan",
            Self::Cotan => "math_s_cotan",
            Self::Sec => "math_s_sec",
            Self::Cosec => "math_s_cosec",
            Self::Arcsin => "math_s_arcsin",
            Self::Arccos => "math_s_arccos",
            Self::Arctan => "math_s_arctan",
            Self::Arccotan => "math_s_arccotan",
            Self::Arcsec => "math_s_arcsec",
            Self::Arccosec => "math_s_arccosec",
            Self::Ln => "math_s_ln",
            Self::Log => "math_s_log",
            Self::Pow => "math_s_pow",
            Self::Sqrt => "math_s_sqrt",
            Self::Cbrt => "math_s_cbrt",
            Self::Sqr => "math_s_sqr",
            Self::Factorial => "math_s_factorial",
            Self::Gamma => "math_s_gamma",
            Self::Signum => "math_s_signum",
            Self::Abs => "math_s_abs",
            Self::Negation => "math_s_negation",
            Self::Provided => "math_s_provided",
            Self::Sinh => "hyperbolic_sinh",
            Self::Cosh => "hyperbolic_cosh",
            Self::Tanh => "hyperbolic_tanh",
            Self::Cotanh => "hyperbolic_cotanh",
            Self::Sech => "hyperbolic_sech",
            Self::Cosech => "hyperbolic_cosech",
            Self::Arsinh => "hyperbolic_arsinh",
            Self::Arcosh => "hyperbolic_arcosh",
            Self::Artanh => "hyperbolic_artanh",
            Self::Arcotanh => "hyperbolic_arcotanh",
            Self::Arsech => "hyperbolic_arsech",
            Self::Arcosech => "hyperbolic_arcosech",
        }
    }

    /// Name the engine prints for this function.
    pub fn name(self) -> &'static str {
        let symbol = self.symbol();
        symbol
            .strip_prefix("math_s_")
            .or_else(|| symbol.strip_prefix("hyperbolic_"))
            .unwrap_or(symbol)
    }

    /// Looks up a function by the name the engine prints.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn symbols_are_unique() {
        let symbols: HashSet<_> = MathFunction::ALL.iter().map(|f| f.symbol()).collect();
        assert_eq!(symbols.len(), MathFunction::ALL.len());
    }

    #[test]
    fn names_strip_prefix() {
        assert_eq!(MathFunction::Sin.name(), "sin");
        assert_eq!(MathFunction::Arcosech.name(), "arcosech");
        assert_eq!(MathFunction::from_name("cosh"), Some(MathFunction::Cosh));
        assert_eq!(MathFunction::from_name("nope"), None);
    }

    #[test]
    fn arity() {
        assert_eq!(MathFunction::Log.arity(), 2);
        assert_eq!(MathFunction::Pow.arity(), 2);
        assert_eq!(MathFunction::Provided.arity(), 2);
        assert_eq!(MathFunction::Sqrt.arity(), 1);
    }
}
