//! Calculus for the in-process engine.
//!
//! Covers what the test suites exercise: polynomial and elementary-function
//! derivatives, term-wise antiderivatives, limits by substitution and
//! equations of degree at most two.

use crate::expr::Expr;
use symbridge_abi::ApproachFrom;

const EPSILON: f64 = 1e-9;

/// Derivative of `expr` with respect to `var`, simplified.
pub fn differentiate(expr: &Expr, var: &str) -> Result<Expr, String> {
    derive(expr, var).map(|d| d.simplify())
}

fn derive(expr: &Expr, var: &str) -> Result<Expr, String> {
    let d = |e: &Expr| derive(e, var);
    Ok(match expr {
        Expr::Number(_) => Expr::Number(0.0),
        Expr::Symbol(name) => Expr::Number(if name == var { 1.0 } else { 0.0 }),
        Expr::Sum(a, b) => Expr::sum(d(a)?, d(b)?),
        Expr::Minus(a, b) => Expr::minus(d(a)?, d(b)?),
        Expr::Mul(a, b) => Expr::sum(
            Expr::mul(d(a)?, (**b).clone()),
            Expr::mul((**a).clone(), d(b)?),
        ),
        Expr::Div(a, b) => Expr::div(
            Expr::minus(
                Expr::mul(d(a)?, (**b).clone()),
                Expr::mul((**a).clone(), d(b)?),
            ),
            Expr::pow((**b).clone(), Expr::Number(2.0)),
        ),
        Expr::Pow(base, exponent) if !exponent.contains_symbol(var) => Expr::mul(
            Expr::mul(
                (**exponent).clone(),
                Expr::pow(
                    (**base).clone(),
                    Expr::minus((**exponent).clone(), Expr::Number(1.0)),
                ),
            ),
            d(base)?,
        ),
        Expr::Pow(base, exponent) => Expr::mul(
            expr.clone(),
            Expr::sum(
                Expr::mul(d(exponent)?, Expr::call("ln", (**base).clone())),
                Expr::div(Expr::mul((**exponent).clone(), d(base)?), (**base).clone()),
            ),
        ),
        Expr::Call(name, args) if args.len() == 1 => {
            let inner = &args[0];
            let outer = match name.as_str() {
                "sin" => Expr::call("cos", inner.clone()),
                "cos" => Expr::negate(Expr::call("sin", inner.clone())),
                "tan" => Expr::div(
                    Expr::Number(1.0),
                    Expr::pow(Expr::call("cos", inner.clone()), Expr::Number(2.0)),
                ),
                "ln" => Expr::div(Expr::Number(1.0), inner.clone()),
                "sinh" => Expr::call("cosh", inner.clone()),
                "cosh" => Expr::call("sinh", inner.clone()),
                _ => return Err(format!("derivative of {name} is not known")),
            };
            Expr::mul(outer, d(inner)?)
        }
        other => return Err(format!("cannot differentiate {other}")),
    })
}

/// Antiderivative of `expr` with respect to `var`, simplified.
pub fn integrate(expr: &Expr, var: &str) -> Result<Expr, String> {
    antiderivative(expr, var).map(|i| i.simplify())
}

fn antiderivative(expr: &Expr, var: &str) -> Result<Expr, String> {
    let x = || Expr::sym(var);
    if !expr.contains_symbol(var) {
        return Ok(Expr::mul(expr.clone(), x()));
    }
    let i = |e: &Expr| antiderivative(e, var);
    Ok(match expr {
        Expr::Symbol(_) => Expr::div(Expr::pow(x(), Expr::Number(2.0)), Expr::Number(2.0)),
        Expr::Sum(a, b) => Expr::sum(i(a)?, i(b)?),
        Expr::Minus(a, b) => Expr::minus(i(a)?, i(b)?),
        Expr::Mul(a, b) if !a.contains_symbol(var) => Expr::mul((**a).clone(), i(b)?),
        Expr::Mul(a, b) if !b.contains_symbol(var) => Expr::mul(i(a)?, (**b).clone()),
        Expr::Pow(base, exponent) if **base == x() => match exponent.eval() {
            Some(n) if (n + 1.0).abs() > EPSILON => Expr::div(
                Expr::pow(x(), Expr::Number(n + 1.0)),
                Expr::Number(n + 1.0),
            ),
            Some(_) => Expr::call("ln", x()),
            None => return Err(format!("cannot integrate {expr}")),
        },
        Expr::Call(name, args) if args.len() == 1 && args[0] == x() => match name.as_str() {
            "sin" => Expr::negate(Expr::call("cos", x())),
            "cos" => Expr::call("sin", x()),
            _ => return Err(format!("antiderivative of {name} is not known")),
        },
        other => return Err(format!("cannot integrate {other}")),
    })
}

/// Limit of `expr` as `var` approaches `dest`.
///
/// Substitutes and folds. A limit that folds to a non-finite value is
/// reported as an error regardless of the side.
pub fn limit(expr: &Expr, var: &str, dest: &Expr, _from: ApproachFrom) -> Result<Expr, String> {
    let substituted = expr.substitute(var, dest).simplify();
    if let Some(value) = substituted.eval() {
        return Ok(Expr::Number(value));
    }
    if substituted.free_vars().is_empty() {
        return Err(format!("limit of {expr} as {var} -> {dest} cannot be computed"));
    }
    Ok(substituted)
}

/// Solves `statement` for `var`. The statement must be an equation.
pub fn solve(statement: &Expr, var: &str) -> Result<Expr, String> {
    match statement {
        Expr::Equals(lhs, rhs) => solve_equation(&Expr::minus((**lhs).clone(), (**rhs).clone()), var),
        other => Err(format!("{other} is not an equation")),
    }
}

/// Solves `expr = 0` for `var`.
///
/// Handles expressions that are polynomials of degree at most two in `var`
/// with no other free variables. Roots are returned as an ascending set.
pub fn solve_equation(expr: &Expr, var: &str) -> Result<Expr, String> {
    let unsupported = || format!("cannot solve {expr} = 0 for {var}");
    let at = |t: f64| {
        expr.substitute(var, &Expr::Number(t))
            .eval()
            .ok_or_else(unsupported)
    };
    let (f0, f1, f2, f3) = (at(0.0)?, at(1.0)?, at(2.0)?, at(3.0)?);

    // f(t) = a t^2 + b t + c, checked against a fourth sample.
    let a = (f2 - 2.0 * f1 + f0) / 2.0;
    let b = f1 - f0 - a;
    let c = f0;
    if (9.0 * a + 3.0 * b + c - f3).abs() > EPSILON * (1.0 + f3.abs()) {
        return Err(unsupported());
    }

    let mut roots = if a.abs() < EPSILON {
        if b.abs() < EPSILON {
            return Err(unsupported());
        }
        vec![-c / b]
    } else {
        let discriminant = b * b - 4.0 * a * c;
        if discriminant < -EPSILON {
            Vec::new()
        } else if discriminant.abs() <= EPSILON {
            vec![-b / (2.0 * a)]
        } else {
            let root = discriminant.sqrt();
            vec![(-b - root) / (2.0 * a), (-b + root) / (2.0 * a)]
        }
    };
    roots.sort_by(f64::total_cmp);

    Ok(Expr::Set(
        roots.into_iter().map(|r| Expr::Number(snap(r))).collect(),
    ))
}

/// Rounds values within tolerance of an integer.
fn snap(value: f64) -> f64 {
    let rounded = value.round();
    if (value - rounded).abs() < EPSILON {
        rounded + 0.0
    } else {
        value
    }
}
