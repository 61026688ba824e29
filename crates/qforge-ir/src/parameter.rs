//! Angle expressions for gate parameters.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::f64::consts::PI;
use std::fmt;

/// Unary functions allowed in QASM 2 parameter expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MathFn {
    /// Sine.
    Sin,
    /// Cosine.
    Cos,
    /// Tangent.
    Tan,
    /// Natural exponential.
    Exp,
    /// Natural logarithm.
    Ln,
    /// Square root.
    Sqrt,
}

impl MathFn {
    /// Look up a function by its QASM name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sin" => Some(MathFn::Sin),
            "cos" => Some(MathFn::Cos),
            "tan" => Some(MathFn::Tan),
            "exp" => Some(MathFn::Exp),
            "ln" => Some(MathFn::Ln),
            "sqrt" => Some(MathFn::Sqrt),
            _ => None,
        }
    }

    /// The QASM name of the function.
    pub fn name(self) -> &'static str {
        match self {
            MathFn::Sin => "sin",
            MathFn::Cos => "cos",
            MathFn::Tan => "tan",
            MathFn::Exp => "exp",
            MathFn::Ln => "ln",
            MathFn::Sqrt => "sqrt",
        }
    }

    /// Apply the function.
    pub fn apply(self, x: f64) -> f64 {
        match self {
            MathFn::Sin => x.sin(),
            MathFn::Cos => x.cos(),
            MathFn::Tan => x.tan(),
            MathFn::Exp => x.exp(),
            MathFn::Ln => x.ln(),
            MathFn::Sqrt => x.sqrt(),
        }
    }
}

/// A symbolic or concrete parameter expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterExpression {
    /// A constant numeric value.
    Constant(f64),
    /// A symbolic parameter.
    Symbol(String),
    /// The constant π.
    Pi,
    /// Negation.
    Neg(Box<ParameterExpression>),
    /// Addition.
    Add(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Subtraction.
    Sub(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Multiplication.
    Mul(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Division.
    Div(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Exponentiation (`a ^ b`).
    Pow(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Unary function application.
    Func(MathFn, Box<ParameterExpression>),
}

impl ParameterExpression {
    /// Create a constant parameter.
    pub fn constant(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }

    /// Create a symbolic parameter.
    pub fn symbol(name: impl Into<String>) -> Self {
        ParameterExpression::Symbol(name.into())
    }

    /// Create a π constant.
    pub fn pi() -> Self {
        ParameterExpression::Pi
    }

    /// Check if this expression contains any symbols.
    pub fn is_symbolic(&self) -> bool {
        match self {
            ParameterExpression::Symbol(_) => true,
            ParameterExpression::Constant(_) | ParameterExpression::Pi => false,
            ParameterExpression::Neg(e) | ParameterExpression::Func(_, e) => e.is_symbolic(),
            ParameterExpression::Add(a, b)
            | ParameterExpression::Sub(a, b)
            | ParameterExpression::Mul(a, b)
            | ParameterExpression::Div(a, b)
            | ParameterExpression::Pow(a, b) => a.is_symbolic() || b.is_symbolic(),
        }
    }

    /// Try to evaluate as a concrete f64 value.
    ///
    /// Returns `None` for symbolic expressions and for results that are not
    /// finite (division by zero, `ln(0)`, ...).
    pub fn as_f64(&self) -> Option<f64> {
        let v = match self {
            ParameterExpression::Constant(v) => *v,
            ParameterExpression::Symbol(_) => return None,
            ParameterExpression::Pi => PI,
            ParameterExpression::Neg(e) => -e.as_f64()?,
            ParameterExpression::Add(a, b) => a.as_f64()? + b.as_f64()?,
            ParameterExpression::Sub(a, b) => a.as_f64()? - b.as_f64()?,
            ParameterExpression::Mul(a, b) => a.as_f64()? * b.as_f64()?,
            ParameterExpression::Div(a, b) => a.as_f64()? / b.as_f64()?,
            ParameterExpression::Pow(a, b) => a.as_f64()?.powf(b.as_f64()?),
            ParameterExpression::Func(f, e) => f.apply(e.as_f64()?),
        };
        v.is_finite().then_some(v)
    }

    /// Get all symbol names in this expression.
    pub fn symbols(&self) -> HashSet<String> {
        let mut set = HashSet::new();
        self.collect_symbols(&mut set);
        set
    }

    fn collect_symbols(&self, set: &mut HashSet<String>) {
        match self {
            ParameterExpression::Constant(_) | ParameterExpression::Pi => {}
            ParameterExpression::Symbol(name) => {
                set.insert(name.clone());
            }
            ParameterExpression::Neg(e) | ParameterExpression::Func(_, e) => {
                e.collect_symbols(set);
            }
            ParameterExpression::Add(a, b)
            | ParameterExpression::Sub(a, b)
            | ParameterExpression::Mul(a, b)
            | ParameterExpression::Div(a, b)
            | ParameterExpression::Pow(a, b) => {
                a.collect_symbols(set);
                b.collect_symbols(set);
            }
        }
    }

    /// Bind a symbol to a value, returning a new expression.
    pub fn bind(&self, name: &str, value: f64) -> Self {
        self.map_symbols(&|n| (n == name).then_some(value))
    }

    /// Bind every symbol present in `values`, returning a new expression.
    pub fn bind_all(&self, values: &FxHashMap<String, f64>) -> Self {
        self.map_symbols(&|n| values.get(n).copied())
    }

    fn map_symbols(&self, lookup: &dyn Fn(&str) -> Option<f64>) -> Self {
        let rec = |e: &ParameterExpression| Box::new(e.map_symbols(lookup));
        match self {
            ParameterExpression::Symbol(n) => match lookup(n) {
                Some(v) => ParameterExpression::Constant(v),
                None => self.clone(),
            },
            ParameterExpression::Constant(_) | ParameterExpression::Pi => self.clone(),
            ParameterExpression::Neg(e) => ParameterExpression::Neg(rec(e)),
            ParameterExpression::Func(f, e) => ParameterExpression::Func(*f, rec(e)),
            ParameterExpression::Add(a, b) => ParameterExpression::Add(rec(a), rec(b)),
            ParameterExpression::Sub(a, b) => ParameterExpression::Sub(rec(a), rec(b)),
            ParameterExpression::Mul(a, b) => ParameterExpression::Mul(rec(a), rec(b)),
            ParameterExpression::Div(a, b) => ParameterExpression::Div(rec(a), rec(b)),
            ParameterExpression::Pow(a, b) => ParameterExpression::Pow(rec(a), rec(b)),
        }
    }

    /// Simplify the expression by evaluating constant subexpressions.
    pub fn simplify(&self) -> Self {
        if let Some(v) = self.as_f64() {
            return ParameterExpression::Constant(v);
        }
        let fold = |a: &ParameterExpression,
                    b: &ParameterExpression,
                    build: fn(Box<Self>, Box<Self>) -> Self| {
            build(Box::new(a.simplify()), Box::new(b.simplify()))
        };
        match self {
            ParameterExpression::Neg(e) => ParameterExpression::Neg(Box::new(e.simplify())),
            ParameterExpression::Func(f, e) => {
                ParameterExpression::Func(*f, Box::new(e.simplify()))
            }
            ParameterExpression::Add(a, b) => fold(a, b, ParameterExpression::Add),
            ParameterExpression::Sub(a, b) => fold(a, b, ParameterExpression::Sub),
            ParameterExpression::Mul(a, b) => fold(a, b, ParameterExpression::Mul),
            ParameterExpression::Div(a, b) => fold(a, b, ParameterExpression::Div),
            ParameterExpression::Pow(a, b) => fold(a, b, ParameterExpression::Pow),
            _ => self.clone(),
        }
    }
}

/// Renders in QASM expression syntax (`pi`, `sin(...)`, `^`).
impl fmt::Display for ParameterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterExpression::Constant(v) => write!(f, "{v}"),
            ParameterExpression::Symbol(name) => write!(f, "{name}"),
            ParameterExpression::Pi => write!(f, "pi"),
            ParameterExpression::Neg(e) => write!(f, "-({e})"),
            ParameterExpression::Add(a, b) => write!(f, "({a} + {b})"),
            ParameterExpression::Sub(a, b) => write!(f, "({a} - {b})"),
            ParameterExpression::Mul(a, b) => write!(f, "({a} * {b})"),
            ParameterExpression::Div(a, b) => write!(f, "({a} / {b})"),
            ParameterExpression::Pow(a, b) => write!(f, "({a} ^ {b})"),
            ParameterExpression::Func(func, e) => write!(f, "{}({e})", func.name()),
        }
    }
}

impl From<f64> for ParameterExpression {
    fn from(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }
}

impl From<i32> for ParameterExpression {
    fn from(value: i32) -> Self {
        ParameterExpression::Constant(f64::from(value))
    }
}

impl std::ops::Add for ParameterExpression {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        ParameterExpression::Add(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Sub for ParameterExpression {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        ParameterExpression::Sub(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Mul for ParameterExpression {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        ParameterExpression::Mul(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Div for ParameterExpression {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        ParameterExpression::Div(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Neg for ParameterExpression {
    type Output = Self;

    fn neg(self) -> Self::Output {
        ParameterExpression::Neg(Box::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant() {
        let p = ParameterExpression::constant(1.5);
        assert!(!p.is_symbolic());
        assert_eq!(p.as_f64(), Some(1.5));
    }

    #[test]
    fn test_symbol() {
        let p = ParameterExpression::symbol("theta");
        assert!(p.is_symbolic());
        assert_eq!(p.as_f64(), None);
        assert!(p.symbols().contains("theta"));
    }

    #[test]
    fn test_bind_all() {
        let p = ParameterExpression::symbol("a") * ParameterExpression::symbol("b");
        let mut values = FxHashMap::default();
        values.insert("a".to_string(), 2.0);
        let half = p.bind_all(&values);
        assert!(half.is_symbolic());
        let full = half.bind("b", 4.0);
        assert_eq!(full.as_f64(), Some(8.0));
    }

    #[test]
    fn test_functions_and_pow() {
        let e = ParameterExpression::Func(MathFn::Cos, Box::new(ParameterExpression::Pi));
        assert!((e.as_f64().unwrap() + 1.0).abs() < 1e-12);

        let p = ParameterExpression::Pow(
            Box::new(ParameterExpression::constant(2.0)),
            Box::new(ParameterExpression::constant(10.0)),
        );
        assert_eq!(p.as_f64(), Some(1024.0));
    }

    #[test]
    fn test_non_finite_is_none() {
        let e = ParameterExpression::constant(1.0) / ParameterExpression::constant(0.0);
        assert_eq!(e.as_f64(), None);
    }

    #[test]
    fn test_display_is_qasm_syntax() {
        let e = ParameterExpression::pi() / ParameterExpression::constant(2.0);
        assert_eq!(e.to_string(), "(pi / 2)");
    }
}
