//! Expression trees for the in-process engine.
//!
//! The printer follows the engine's text conventions: binary operators are
//! spaced (`x + 1`, `a * b`, `x ^ 2`), a product with `-1` prints as a
//! negation, a power of one half prints as `sqrt(..)` and function calls
//! print as `name(arg, ...)`. Parentheses are only emitted where operator
//! priority requires them.

use std::f64::consts::{E, PI};
use std::fmt;
use symbridge_abi::MathFunction;

/// Names that are constants rather than free variables.
pub const CONSTANTS: [&str; 3] = ["pi", "e", "i"];

const PRIORITY_EQUALS: u8 = 0;
const PRIORITY_SUM: u8 = 20;
const PRIORITY_MUL: u8 = 40;
const PRIORITY_POW: u8 = 60;
const PRIORITY_LEAF: u8 = 100;

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Real number.
    Number(f64),
    /// Variable or named constant.
    Symbol(String),
    /// `a + b`
    Sum(Box<Expr>, Box<Expr>),
    /// `a - b`
    Minus(Box<Expr>, Box<Expr>),
    /// `a * b`
    Mul(Box<Expr>, Box<Expr>),
    /// `a / b`
    Div(Box<Expr>, Box<Expr>),
    /// `a ^ b`
    Pow(Box<Expr>, Box<Expr>),
    /// Function application.
    Call(String, Vec<Expr>),
    /// `a = b`
    Equals(Box<Expr>, Box<Expr>),
    /// `{ a, b }`
    Set(Vec<Expr>),
}

impl Expr {
    /// A symbol.
    pub fn sym(name: impl Into<String>) -> Self {
        Self::Symbol(name.into())
    }

    /// `a + b`
    pub fn sum(a: Expr, b: Expr) -> Self {
        Self::Sum(Box::new(a), Box::new(b))
    }

    /// `a - b`
    pub fn minus(a: Expr, b: Expr) -> Self {
        Self::Minus(Box::new(a), Box::new(b))
    }

    /// `a * b`
    pub fn mul(a: Expr, b: Expr) -> Self {
        Self::Mul(Box::new(a), Box::new(b))
    }

    /// `a / b`
    pub fn div(a: Expr, b: Expr) -> Self {
        Self::Div(Box::new(a), Box::new(b))
    }

    /// `a ^ b`
    pub fn pow(a: Expr, b: Expr) -> Self {
        Self::Pow(Box::new(a), Box::new(b))
    }

    /// `a = b`
    pub fn equals(a: Expr, b: Expr) -> Self {
        Self::Equals(Box::new(a), Box::new(b))
    }

    /// One-argument call.
    pub fn call(name: &str, arg: Expr) -> Self {
        Self::Call(name.to_owned(), vec![arg])
    }

    /// `-a`. Numbers are negated in place.
    pub fn negate(a: Expr) -> Self {
        match a {
            Self::Number(v) => Self::Number(-v),
            other => Self::mul(Self::Number(-1.0), other),
        }
    }

    fn is_number(&self, value: f64) -> bool {
        matches!(self, Self::Number(v) if *v == value)
    }

    fn priority(&self) -> u8 {
        match self {
            Self::Number(v) if *v < 0.0 => PRIORITY_SUM,
            Self::Number(_) | Self::Symbol(_) | Self::Call(..) | Self::Set(_) => PRIORITY_LEAF,
            Self::Sum(..) | Self::Minus(..) => PRIORITY_SUM,
            Self::Mul(..) | Self::Div(..) => PRIORITY_MUL,
            Self::Pow(_, e) if e.is_number(0.5) => PRIORITY_LEAF,
            Self::Pow(..) => PRIORITY_POW,
            Self::Equals(..) => PRIORITY_EQUALS,
        }
    }

    /// Immediate children, left to right.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Self::Number(_) | Self::Symbol(_) => Vec::new(),
            Self::Sum(a, b)
            | Self::Minus(a, b)
            | Self::Mul(a, b)
            | Self::Div(a, b)
            | Self::Pow(a, b)
            | Self::Equals(a, b) => vec![&**a, &**b],
            Self::Call(_, items) | Self::Set(items) => items.iter().collect(),
        }
    }

    /// Every node, root first.
    pub fn preorder(&self) -> Vec<&Expr> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children().into_iter().rev());
        }
        out
    }

    /// Distinct symbol names in order of first appearance.
    pub fn symbols(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for node in self.preorder() {
            if let Self::Symbol(name) = node {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }

    /// Distinct free variables in order of first appearance.
    pub fn free_vars(&self) -> Vec<String> {
        self.symbols()
            .into_iter()
            .filter(|name| !CONSTANTS.contains(&name.as_str()))
            .collect()
    }

    /// Returns true if `name` occurs anywhere in the tree.
    pub fn contains_symbol(&self, name: &str) -> bool {
        self.preorder()
            .into_iter()
            .any(|node| matches!(node, Self::Symbol(s) if s == name))
    }

    /// Replaces every occurrence of `name` with `value`.
    pub fn substitute(&self, name: &str, value: &Expr) -> Expr {
        self.map_children(&|child| child.substitute(name, value), &|leaf| match leaf {
            Self::Symbol(s) if s == name => value.clone(),
            other => other.clone(),
        })
    }

    fn map_children(&self, f: &dyn Fn(&Expr) -> Expr, leaf: &dyn Fn(&Expr) -> Expr) -> Expr {
        let pair = |a: &Expr, b: &Expr| (Box::new(f(a)), Box::new(f(b)));
        match self {
            Self::Number(_) | Self::Symbol(_) => leaf(self),
            Self::Sum(a, b) => {
                let (a, b) = pair(a, b);
                Self::Sum(a, b)
            }
            Self::Minus(a, b) => {
                let (a, b) = pair(a, b);
                Self::Minus(a, b)
            }
            Self::Mul(a, b) => {
                let (a, b) = pair(a, b);
                Self::Mul(a, b)
            }
            Self::Div(a, b) => {
                let (a, b) = pair(a, b);
                Self::Div(a, b)
            }
            Self::Pow(a, b) => {
                let (a, b) = pair(a, b);
                Self::Pow(a, b)
            }
            Self::Equals(a, b) => {
                let (a, b) = pair(a, b);
                Self::Equals(a, b)
            }
            Self::Call(name, args) => Self::Call(name.clone(), args.iter().map(f).collect()),
            Self::Set(items) => Self::Set(items.iter().map(f).collect()),
        }
    }

    // === Folding ===

    /// Folds constant subtrees and removes neutral elements.
    pub fn simplify(&self) -> Expr {
        match self {
            Self::Sum(a, b) => fold_sum(a.simplify(), b.simplify()),
            Self::Minus(a, b) => fold_minus(a.simplify(), b.simplify()),
            Self::Mul(a, b) => fold_mul(a.simplify(), b.simplify()),
            Self::Div(a, b) => fold_div(a.simplify(), b.simplify()),
            Self::Pow(a, b) => fold_pow(a.simplify(), b.simplify()),
            other => other.map_children(&Expr::simplify, &Expr::clone),
        }
    }

    /// Numeric value, if the tree has no free variables.
    pub fn eval(&self) -> Option<f64> {
        let value = match self {
            Self::Number(v) => *v,
            Self::Symbol(name) => match name.as_str() {
                "pi" => PI,
                "e" => E,
                _ => return None,
            },
            Self::Sum(a, b) => a.eval()? + b.eval()?,
            Self::Minus(a, b) => a.eval()? - b.eval()?,
            Self::Mul(a, b) => a.eval()? * b.eval()?,
            Self::Div(a, b) => a.eval()? / b.eval()?,
            Self::Pow(a, b) => a.eval()?.powf(b.eval()?),
            Self::Call(name, args) => {
                let args = args.iter().map(Expr::eval).collect::<Option<Vec<_>>>()?;
                call_numeric(name, &args)?
            }
            Self::Equals(..) | Self::Set(_) => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Complex value, if the tree has no free variables other than `i`.
    pub fn eval_complex(&self) -> Option<(f64, f64)> {
        match self {
            Self::Symbol(name) if name == "i" => Some((0.0, 1.0)),
            Self::Sum(a, b) => {
                let ((ar, ai), (br, bi)) = (a.eval_complex()?, b.eval_complex()?);
                Some((ar + br, ai + bi))
            }
            Self::Minus(a, b) => {
                let ((ar, ai), (br, bi)) = (a.eval_complex()?, b.eval_complex()?);
                Some((ar - br, ai - bi))
            }
            Self::Mul(a, b) => Some(complex_mul(a.eval_complex()?, b.eval_complex()?)),
            Self::Div(a, b) => {
                let ((ar, ai), (br, bi)) = (a.eval_complex()?, b.eval_complex()?);
                let denominator = br * br + bi * bi;
                if denominator == 0.0 {
                    return None;
                }
                Some((
                    (ar * br + ai * bi) / denominator,
                    (ai * br - ar * bi) / denominator,
                ))
            }
            Self::Pow(a, b) => match b.eval() {
                Some(n) if n.fract() == 0.0 && (0.0..=64.0).contains(&n) => {
                    let base = a.eval_complex()?;
                    Some((0..n as u32).fold((1.0, 0.0), |acc, _| complex_mul(acc, base)))
                }
                _ => self.eval().map(|v| (v, 0.0)),
            },
            _ => self.eval().map(|v| (v, 0.0)),
        }
    }

    /// Exact rational value as a reduced `(numerator, denominator)` pair.
    pub fn eval_rational(&self) -> Option<(i64, i64)> {
        match self {
            Self::Number(v) if v.fract() == 0.0 && v.abs() < 9.0e15 => Some((*v as i64, 1)),
            Self::Sum(a, b) => {
                let ((p, q), (r, s)) = (a.eval_rational()?, b.eval_rational()?);
                reduce(p.checked_mul(s)?.checked_add(r.checked_mul(q)?)?, q.checked_mul(s)?)
            }
            Self::Minus(a, b) => {
                let ((p, q), (r, s)) = (a.eval_rational()?, b.eval_rational()?);
                reduce(p.checked_mul(s)?.checked_sub(r.checked_mul(q)?)?, q.checked_mul(s)?)
            }
            Self::Mul(a, b) => {
                let ((p, q), (r, s)) = (a.eval_rational()?, b.eval_rational()?);
                reduce(p.checked_mul(r)?, q.checked_mul(s)?)
            }
            Self::Div(a, b) => {
                let ((p, q), (r, s)) = (a.eval_rational()?, b.eval_rational()?);
                reduce(p.checked_mul(s)?, q.checked_mul(r)?)
            }
            _ => None,
        }
    }

    // === Rendering ===

    /// LaTeX rendering.
    pub fn latex(&self) -> String {
        let wrap = |e: &Expr, parens: bool| {
            if parens {
                format!("\\left({}\\right)", e.latex())
            } else {
                e.latex()
            }
        };
        match self {
            Self::Number(_) => self.to_string(),
            Self::Symbol(name) if name == "pi" => "\\pi".to_owned(),
            Self::Symbol(name) => name.clone(),
            Self::Sum(a, b) => format!(
                "{} + {}",
                wrap(a, a.priority() < PRIORITY_SUM),
                wrap(b, b.priority() < PRIORITY_SUM)
            ),
            Self::Minus(a, b) => format!(
                "{} - {}",
                wrap(a, a.priority() < PRIORITY_SUM),
                wrap(b, b.priority() <= PRIORITY_SUM)
            ),
            Self::Mul(a, b) if a.is_number(-1.0) => {
                format!("-{}", wrap(b, b.priority() < PRIORITY_MUL))
            }
            Self::Mul(a, b) => format!(
                "{} \\cdot {}",
                wrap(a, a.priority() < PRIORITY_MUL),
                wrap(b, b.priority() < PRIORITY_MUL)
            ),
            Self::Div(a, b) => format!("\\frac{{{}}}{{{}}}", a.latex(), b.latex()),
            Self::Pow(a, b) if b.is_number(0.5) => format!("\\sqrt{{{}}}", a.latex()),
            Self::Pow(a, b) => format!(
                "{{{}}}^{{{}}}",
                wrap(a, a.priority() <= PRIORITY_POW),
                b.latex()
            ),
            Self::Call(name, args) if name == "log" && args.len() == 2 => format!(
                "\\log_{{{}}}\\left({}\\right)",
                args[0].latex(),
                args[1].latex()
            ),
            Self::Call(name, args) => {
                let args: Vec<String> = args.iter().map(Expr::latex).collect();
                let command = match name.as_str() {
                    "sin" | "cos" | "tan" | "ln" | "sinh" | "cosh" | "tanh" | "arcsin"
                    | "arccos" | "arctan" => format!("\\{name}"),
                    _ => format!("\\operatorname{{{name}}}"),
                };
                format!("{command}\\left({}\\right)", args.join(", "))
            }
            Self::Equals(a, b) => format!("{} = {}", a.latex(), b.latex()),
            Self::Set(items) => {
                let items: Vec<String> = items.iter().map(Expr::latex).collect();
                format!("\\left\\{{{}\\right\\}}", items.join(", "))
            }
        }
    }
}

fn write_wrapped(f: &mut fmt::Formatter<'_>, e: &Expr, parens: bool) -> fmt::Result {
    if parens {
        write!(f, "({e})")
    } else {
        write!(f, "{e}")
    }
}

fn write_number(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v.fract() == 0.0 && v.abs() < 1.0e15 {
        write!(f, "{}", v as i64)
    } else {
        write!(f, "{v}")
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write_number(f, *v),
            Self::Symbol(name) => f.write_str(name),
            Self::Sum(a, b) => {
                write_wrapped(f, a, a.priority() < PRIORITY_SUM)?;
                f.write_str(" + ")?;
                write_wrapped(f, b, b.priority() < PRIORITY_SUM)
            }
            Self::Minus(a, b) => {
                write_wrapped(f, a, a.priority() < PRIORITY_SUM)?;
                f.write_str(" - ")?;
                write_wrapped(f, b, b.priority() <= PRIORITY_SUM)
            }
            Self::Mul(a, b) if a.is_number(-1.0) => {
                f.write_str("-")?;
                write_wrapped(f, b, b.priority() < PRIORITY_MUL)
            }
            Self::Mul(a, b) => {
                write_wrapped(f, a, a.priority() < PRIORITY_MUL)?;
                f.write_str(" * ")?;
                write_wrapped(f, b, b.priority() < PRIORITY_MUL)
            }
            Self::Div(a, b) => {
                write_wrapped(f, a, a.priority() < PRIORITY_MUL)?;
                f.write_str(" / ")?;
                write_wrapped(f, b, b.priority() <= PRIORITY_MUL)
            }
            Self::Pow(a, b) if b.is_number(0.5) => write!(f, "sqrt({a})"),
            Self::Pow(a, b) => {
                write_wrapped(f, a, a.priority() <= PRIORITY_POW)?;
                f.write_str(" ^ ")?;
                write_wrapped(f, b, b.priority() < PRIORITY_POW)
            }
            Self::Call(name, args) => {
                write!(f, "{name}(")?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Self::Equals(a, b) => write!(f, "{a} = {b}"),
            Self::Set(items) if items.is_empty() => f.write_str("{ }"),
            Self::Set(items) => {
                f.write_str("{ ")?;
                write_list(f, items)?;
                f.write_str(" }")
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn fold_sum(a: Expr, b: Expr) -> Expr {
    match (a, b) {
        (Expr::Number(x), Expr::Number(y)) => Expr::Number(x + y),
        (Expr::Number(z), e) | (e, Expr::Number(z)) if z == 0.0 => e,
        (a, b) => Expr::sum(a, b),
    }
}

fn fold_minus(a: Expr, b: Expr) -> Expr {
    match (a, b) {
        (Expr::Number(x), Expr::Number(y)) => Expr::Number(x - y),
        (e, Expr::Number(z)) if z == 0.0 => e,
        (a, b) if a == b => Expr::Number(0.0),
        (a, b) => Expr::minus(a, b),
    }
}

fn fold_mul(a: Expr, b: Expr) -> Expr {
    match (a, b) {
        (Expr::Number(x), Expr::Number(y)) => Expr::Number(x * y),
        (Expr::Number(z), _) | (_, Expr::Number(z)) if z == 0.0 => Expr::Number(0.0),
        (Expr::Number(one), e) | (e, Expr::Number(one)) if one == 1.0 => e,
        (a, b) => Expr::mul(a, b),
    }
}

fn fold_div(a: Expr, b: Expr) -> Expr {
    match (a, b) {
        (Expr::Number(x), Expr::Number(y)) if y != 0.0 && (x / y).fract() == 0.0 => {
            Expr::Number(x / y)
        }
        (Expr::Number(x), Expr::Number(y))
            if y != 0.0 && is_small_integer(x) && is_small_integer(y) =>
        {
            match reduce(x as i64, y as i64) {
                Some((p, q)) => Expr::div(Expr::Number(p as f64), Expr::Number(q as f64)),
                None => Expr::div(Expr::Number(x), Expr::Number(y)),
            }
        }
        (e, Expr::Number(one)) if one == 1.0 => e,
        (Expr::Number(z), b) if z == 0.0 && !b.is_number(0.0) => Expr::Number(0.0),
        (a, b) => Expr::div(a, b),
    }
}

fn is_small_integer(v: f64) -> bool {
    v.fract() == 0.0 && v.abs() < 9.0e15
}

fn fold_pow(a: Expr, b: Expr) -> Expr {
    match (a, b) {
        (Expr::Number(x), Expr::Number(n)) if n.fract() == 0.0 && (0.0..=64.0).contains(&n) => {
            Expr::Number(x.powi(n as i32))
        }
        (e, Expr::Number(one)) if one == 1.0 => e,
        (_, Expr::Number(z)) if z == 0.0 => Expr::Number(1.0),
        (a, b) => Expr::pow(a, b),
    }
}

fn complex_mul((ar, ai): (f64, f64), (br, bi): (f64, f64)) -> (f64, f64) {
    (ar * br - ai * bi, ar * bi + ai * br)
}

fn gcd(mut a: i64, mut b: i64) -> i64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.abs()
}

fn reduce(numerator: i64, denominator: i64) -> Option<(i64, i64)> {
    if denominator == 0 {
        return None;
    }
    let g = gcd(numerator, denominator).max(1);
    let sign = if denominator < 0 { -1 } else { 1 };
    Some((sign * numerator / g, sign * denominator / g))
}

fn call_numeric(name: &str, args: &[f64]) -> Option<f64> {
    let value = match (name, args) {
        ("sin", [x]) => x.sin(),
        ("cos", [x]) => x.cos(),
        ("tan", [x]) => x.tan(),
        ("cotan", [x]) => x.tan().recip(),
        ("sec", [x]) => x.cos().recip(),
        ("cosec", [x]) => x.sin().recip(),
        ("arcsin", [x]) => x.asin(),
        ("arccos", [x]) => x.acos(),
        ("arctan", [x]) => x.atan(),
        ("arccotan", [x]) => x.recip().atan(),
        ("arcsec", [x]) => x.recip().acos(),
        ("arccosec", [x]) => x.recip().asin(),
        ("ln", [x]) => x.ln(),
        ("log", [base, x]) => x.ln() / base.ln(),
        ("sqrt", [x]) => x.sqrt(),
        ("cbrt", [x]) => x.cbrt(),
        ("sqr", [x]) => x * x,
        ("abs", [x]) => x.abs(),
        ("signum", [x]) if *x == 0.0 => 0.0,
        ("signum", [x]) => x.signum(),
        ("factorial", [x]) if x.fract() == 0.0 && (0.0..=170.0).contains(x) => {
            (1..=*x as u64).map(|k| k as f64).product()
        }
        ("sinh", [x]) => x.sinh(),
        ("cosh", [x]) => x.cosh(),
        ("tanh", [x]) => x.tanh(),
        ("cotanh", [x]) => x.tanh().recip(),
        ("sech", [x]) => x.cosh().recip(),
        ("cosech", [x]) => x.sinh().recip(),
        ("arsinh", [x]) => x.asinh(),
        ("arcosh", [x]) => x.acosh(),
        ("artanh", [x]) => x.atanh(),
        ("arcotanh", [x]) => x.recip().atanh(),
        ("arsech", [x]) => x.recip().acosh(),
        ("arcosech", [x]) => x.recip().asinh(),
        _ => return None,
    };
    Some(value)
}

/// Builds the node an elementary function produces.
pub fn apply_function(function: MathFunction, mut args: Vec<Expr>) -> Expr {
    match (function, args.len()) {
        (MathFunction::Negation, 1) => Expr::negate(args.remove(0)),
        (MathFunction::Sqr, 1) => Expr::pow(args.remove(0), Expr::Number(2.0)),
        (MathFunction::Sqrt, 1) => Expr::pow(args.remove(0), Expr::Number(0.5)),
        (MathFunction::Pow, 2) => {
            let exponent = args.remove(1);
            Expr::pow(args.remove(0), exponent)
        }
        _ => Expr::Call(function.name().to_owned(), args),
    }
}

// === Parsing ===

/// A rejected expression text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// What went wrong.
    pub message: String,
    /// Byte offset of the offending token.
    pub position: usize,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at position {}", self.message, self.position)
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Punct(char),
}

fn tokenize(text: &str) -> Result<Vec<(usize, Token)>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() || c == '.' {
            let mut literal = String::new();
            while let Some(&(_, d)) = chars.peek() {
                if d.is_ascii_digit() || d == '.' {
                    literal.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            let value = literal.parse::<f64>().map_err(|_| ParseError {
                message: format!("invalid number '{literal}'"),
                position: start,
            })?;
            tokens.push((start, Token::Number(value)));
        } else if c.is_alphabetic() || c == '_' {
            let mut ident = String::new();
            while let Some(&(_, d)) = chars.peek() {
                if d.is_alphanumeric() || d == '_' {
                    ident.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push((start, Token::Ident(ident)));
        } else if "+-*/^(),={}".contains(c) {
            tokens.push((start, Token::Punct(c)));
            chars.next();
        } else {
            return Err(ParseError {
                message: format!("unexpected character '{c}'"),
                position: start,
            });
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(&Token::Punct(c)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            position: self.tokens.get(self.pos).map_or(self.end, |(p, _)| *p),
        }
    }

    fn expect(&mut self, c: char) -> Result<(), ParseError> {
        if self.eat(c) {
            Ok(())
        } else if self.peek().is_none() {
            Err(self.error(format!("expected '{c}' but reached the end of input")))
        } else {
            Err(self.error(format!("expected '{c}'")))
        }
    }

    fn equation(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.sum()?;
        if self.eat('=') {
            let rhs = self.sum()?;
            return Ok(Expr::equals(lhs, rhs));
        }
        Ok(lhs)
    }

    fn sum(&mut self) -> Result<Expr, ParseError> {
        let mut acc = self.product()?;
        loop {
            if self.eat('+') {
                acc = Expr::sum(acc, self.product()?);
            } else if self.eat('-') {
                acc = Expr::minus(acc, self.product()?);
            } else {
                return Ok(acc);
            }
        }
    }

    fn product(&mut self) -> Result<Expr, ParseError> {
        let mut acc = self.unary()?;
        loop {
            if self.eat('*') {
                acc = Expr::mul(acc, self.unary()?);
            } else if self.eat('/') {
                acc = Expr::div(acc, self.unary()?);
            } else if matches!(self.peek(), Some(Token::Ident(_) | Token::Punct('('))) {
                // Implicit multiplication: `3x`, `2(x + 1)`.
                acc = Expr::mul(acc, self.power()?);
            } else {
                return Ok(acc);
            }
        }
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.eat('-') {
            return Ok(Expr::negate(self.unary()?));
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr, ParseError> {
        let base = self.primary()?;
        if self.eat('^') {
            return Ok(Expr::pow(base, self.unary()?));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        match self.next() {
            Some(Token::Number(v)) => Ok(Expr::Number(v)),
            Some(Token::Ident(name)) => match MathFunction::from_name(&name) {
                Some(function) if self.eat('(') => {
                    let args = self.list(')')?;
                    if args.len() != function.arity() {
                        return Err(self.error(format!(
                            "{name} takes {} argument(s), got {}",
                            function.arity(),
                            args.len()
                        )));
                    }
                    Ok(apply_function(function, args))
                }
                _ => Ok(Expr::Symbol(name)),
            },
            Some(Token::Punct('(')) => {
                let inner = self.equation()?;
                self.expect(')')?;
                Ok(inner)
            }
            Some(Token::Punct('{')) => Ok(Expr::Set(self.list('}')?)),
            Some(Token::Punct(c)) => {
                self.pos -= 1;
                Err(self.error(format!("unexpected '{c}'")))
            }
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn list(&mut self, close: char) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(self.equation()?);
            if !self.eat(',') {
                self.expect(close)?;
                return Ok(items);
            }
        }
    }
}

/// Parses expression text.
pub fn parse(text: &str) -> Result<Expr, ParseError> {
    let mut parser = Parser {
        tokens: tokenize(text)?,
        pos: 0,
        end: text.len(),
    };
    let expr = parser.equation()?;
    if parser.peek().is_some() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(expr)
}
