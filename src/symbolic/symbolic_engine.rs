//! # Symbolic Engine Module
//!
//! Core symbolic expression type of the crate. An [`Expr`] is a recursive tree over
//! (usually) one free variable, built once per request by the parser and never mutated
//! afterwards.
//!
//! ## Main Structures and Methods
//!
//! ### `Expr` Enum
//! - **Variables**: `Var(String)` - the declared variable, e.g. "x"
//! - **Constants**: `Const(f64)` - numerical constants
//! - **Operations**: `Add`, `Sub`, `Mul`, `Div`, `Pow` - basic arithmetic
//! - **Functions**: `Exp`, `Ln`, `Abs`, `sin`, `cos`, `tg`, ... - elementary functions
//!
//! ### Key Methods
//! - `set_variable(var, value)` - substitute a number for a variable
//! - `substitute_variable(var, expr)` - substitute an expression for a variable
//! - `contains_variable(var)` - dependency check used by the integrator
//! - `Display` - canonical, re-parseable text form (`x**3/3`, `sin(x) + x**2`)
//!
//! ## Interesting Code Features
//!
//! 1. **Recursive Expression Tree**: Uses Box<Expr> for nested expressions
//! 2. **Operator Overloading**: Implements std::ops traits so rules read like math: `x * y + z`
//! 3. **Minimal Parentheses**: the printer wraps a child only when re-parsing would
//!    otherwise build a different tree, so `parse(display(e)) == e`
//! 4. **Non-standard Variant Names**: variants keep mathematical notation (tg, ctg, arctg),
//!    the printed form uses the common names (tan, cot, atan)

#![allow(non_camel_case_types)]

use std::collections::HashMap;
use std::fmt;

/// Core symbolic expression enum representing mathematical expressions as an abstract syntax tree.
///
/// # Examples
/// ```rust, ignore
/// let x = Expr::Var("x".to_string());
/// let expr = Expr::Add(Box::new(x), Box::new(Expr::Const(2.0)));
/// assert_eq!(expr.to_string(), "x + 2");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Symbolic variable with a name (e.g., "x", "t")
    Var(String),
    /// Numerical constant value
    Const(f64),
    /// Addition operation: left + right
    Add(Box<Expr>, Box<Expr>),
    /// Subtraction operation: left - right
    Sub(Box<Expr>, Box<Expr>),
    /// Multiplication operation: left * right
    Mul(Box<Expr>, Box<Expr>),
    /// Division operation: left / right
    Div(Box<Expr>, Box<Expr>),
    /// Power operation: base ^ exponent
    Pow(Box<Expr>, Box<Expr>),
    /// Exponential function: e^x
    Exp(Box<Expr>),
    /// Natural logarithm: ln(x)
    Ln(Box<Expr>),
    /// Absolute value: |x|
    Abs(Box<Expr>),
    /// Sine function: sin(x)
    sin(Box<Expr>),
    /// Cosine function: cos(x)
    cos(Box<Expr>),
    /// Tangent function: tan(x) - uses mathematical notation 'tg'
    tg(Box<Expr>),
    /// Cotangent function: cot(x) - uses mathematical notation 'ctg'
    ctg(Box<Expr>),
    /// Arcsine function: arcsin(x)
    arcsin(Box<Expr>),
    /// Arccosine function: arccos(x)
    arccos(Box<Expr>),
    /// Arctangent function: arctan(x) - uses mathematical notation 'arctg'
    arctg(Box<Expr>),
    /// Arccotangent function: arccot(x) - uses mathematical notation 'arcctg'
    arcctg(Box<Expr>),
}

/// Binding strength of a node when it is printed as an operand.
/// Negated terms and negative constants print with a leading '-' and bind like a product.
const PREC_ADD: u8 = 1;
const PREC_MUL: u8 = 2;
const PREC_POW: u8 = 3;
const PREC_ATOM: u8 = 4;

impl Expr {
    pub(crate) fn precedence(&self) -> u8 {
        match self {
            Expr::Add(_, _) | Expr::Sub(_, _) => PREC_ADD,
            Expr::Mul(_, _) | Expr::Div(_, _) => PREC_MUL,
            Expr::Pow(_, exp) if is_sqrt(exp) => PREC_ATOM,
            Expr::Pow(_, _) => PREC_POW,
            Expr::Const(val) if val.is_sign_negative() => PREC_MUL,
            _ => PREC_ATOM,
        }
    }

    /// Name of a one-argument function node as it is printed and parsed back.
    pub(crate) fn function_name(&self) -> Option<&'static str> {
        let name = match self {
            Expr::Exp(_) => "exp",
            Expr::Ln(_) => "log",
            Expr::Abs(_) => "Abs",
            Expr::sin(_) => "sin",
            Expr::cos(_) => "cos",
            Expr::tg(_) => "tan",
            Expr::ctg(_) => "cot",
            Expr::arcsin(_) => "asin",
            Expr::arccos(_) => "acos",
            Expr::arctg(_) => "atan",
            Expr::arcctg(_) => "acot",
            _ => return None,
        };
        Some(name)
    }

    /// Argument of a one-argument function node.
    pub(crate) fn function_argument(&self) -> Option<&Expr> {
        match self {
            Expr::Exp(e)
            | Expr::Ln(e)
            | Expr::Abs(e)
            | Expr::sin(e)
            | Expr::cos(e)
            | Expr::tg(e)
            | Expr::ctg(e)
            | Expr::arcsin(e)
            | Expr::arccos(e)
            | Expr::arctg(e)
            | Expr::arcctg(e) => Some(e),
            _ => None,
        }
    }

    /// Rebuilds the same kind of one-argument function around a new argument.
    /// Returns None for nodes that are not one-argument functions.
    pub(crate) fn with_function_argument(&self, arg: Expr) -> Option<Expr> {
        let arg = Box::new(arg);
        let rebuilt = match self {
            Expr::Exp(_) => Expr::Exp(arg),
            Expr::Ln(_) => Expr::Ln(arg),
            Expr::Abs(_) => Expr::Abs(arg),
            Expr::sin(_) => Expr::sin(arg),
            Expr::cos(_) => Expr::cos(arg),
            Expr::tg(_) => Expr::tg(arg),
            Expr::ctg(_) => Expr::ctg(arg),
            Expr::arcsin(_) => Expr::arcsin(arg),
            Expr::arccos(_) => Expr::arccos(arg),
            Expr::arctg(_) => Expr::arctg(arg),
            Expr::arcctg(_) => Expr::arcctg(arg),
            _ => return None,
        };
        Some(rebuilt)
    }

    /// `-1 * e` produced by unary minus, printed as `-e`.
    pub(crate) fn as_negation(&self) -> Option<&Expr> {
        match self {
            Expr::Mul(lhs, rhs) if **lhs == Expr::Const(-1.0) && !matches!(**rhs, Expr::Const(_)) => {
                Some(rhs)
            }
            _ => None,
        }
    }
}

/// `Pow(base, 0.5)` is printed and typeset as a square root.
pub(crate) fn is_sqrt(exp: &Expr) -> bool {
    *exp == Expr::Const(0.5)
}

fn write_operand(f: &mut fmt::Formatter, expr: &Expr, wrap: bool) -> fmt::Result {
    if wrap {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

/// Display implementation printing the canonical, re-parseable form.
///
/// Binary operators are left associative, so a right operand of the same strength is
/// wrapped; powers are right associative, so the base is wrapped instead.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Var(name) => write!(f, "{}", name),
            Expr::Const(val) => write!(f, "{}", val),
            Expr::Add(lhs, rhs) => {
                write_operand(f, lhs, lhs.precedence() < PREC_ADD)?;
                write!(f, " + ")?;
                write_operand(f, rhs, rhs.precedence() <= PREC_ADD)
            }
            Expr::Sub(lhs, rhs) => {
                write_operand(f, lhs, lhs.precedence() < PREC_ADD)?;
                write!(f, " - ")?;
                write_operand(f, rhs, rhs.precedence() <= PREC_ADD)
            }
            Expr::Mul(lhs, rhs) => {
                if let Some(inner) = self.as_negation() {
                    write!(f, "-")?;
                    // -(a*b) keeps its parentheses, -a*b would re-parse as (-a)*b
                    return write_operand(f, inner, inner.precedence() <= PREC_MUL);
                }
                write_operand(f, lhs, lhs.precedence() < PREC_MUL)?;
                write!(f, "*")?;
                write_operand(f, rhs, rhs.precedence() <= PREC_MUL)
            }
            Expr::Div(lhs, rhs) => {
                write_operand(f, lhs, lhs.precedence() < PREC_MUL)?;
                write!(f, "/")?;
                write_operand(f, rhs, rhs.precedence() <= PREC_MUL)
            }
            Expr::Pow(base, exp) if is_sqrt(exp) => write!(f, "sqrt({})", base),
            Expr::Pow(base, exp) => {
                write_operand(f, base, base.precedence() <= PREC_POW)?;
                write!(f, "**")?;
                write_operand(f, exp, exp.precedence() < PREC_POW)
            }
            other => {
                // every remaining variant is a one-argument function
                let name = other.function_name().unwrap_or("?");
                match other.function_argument() {
                    Some(arg) => write!(f, "{}({})", name, arg),
                    None => write!(f, "{}", name),
                }
            }
        }
    }
}

impl std::ops::Add for Expr {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Expr::Add(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Sub for Expr {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Expr::Sub(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Mul for Expr {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Expr::Mul(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Div for Expr {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        Expr::Div(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Neg for Expr {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Expr::Mul(Box::new(Expr::Const(-1.0)), Box::new(self))
    }
}

impl Expr {
    /// BASIC FEATURES

    /// Shorthand for `Expr::Var(name.to_string())`.
    pub fn var(name: &str) -> Expr {
        Expr::Var(name.to_string())
    }

    /// Substitutes a variable with a constant value throughout the expression.
    ///
    /// # Arguments
    /// * `var` - Name of the variable to substitute
    /// * `value` - Numerical value to substitute for the variable
    pub fn set_variable(&self, var: &str, value: f64) -> Expr {
        self.substitute_variable(var, &Expr::Const(value))
    }

    /// Substitutes multiple variables with constant values using a HashMap.
    pub fn set_variable_from_map(&self, var_map: &HashMap<String, f64>) -> Expr {
        match self {
            Expr::Var(name) => match var_map.get(name) {
                Some(value) => Expr::Const(*value),
                None => self.clone(),
            },
            Expr::Const(_) => self.clone(),
            Expr::Add(lhs, rhs) => Expr::Add(
                Box::new(lhs.set_variable_from_map(var_map)),
                Box::new(rhs.set_variable_from_map(var_map)),
            ),
            Expr::Sub(lhs, rhs) => Expr::Sub(
                Box::new(lhs.set_variable_from_map(var_map)),
                Box::new(rhs.set_variable_from_map(var_map)),
            ),
            Expr::Mul(lhs, rhs) => Expr::Mul(
                Box::new(lhs.set_variable_from_map(var_map)),
                Box::new(rhs.set_variable_from_map(var_map)),
            ),
            Expr::Div(lhs, rhs) => Expr::Div(
                Box::new(lhs.set_variable_from_map(var_map)),
                Box::new(rhs.set_variable_from_map(var_map)),
            ),
            Expr::Pow(base, exp) => Expr::Pow(
                Box::new(base.set_variable_from_map(var_map)),
                Box::new(exp.set_variable_from_map(var_map)),
            ),
            func => match func.function_argument() {
                Some(arg) => func
                    .with_function_argument(arg.set_variable_from_map(var_map))
                    .unwrap_or_else(|| func.clone()),
                None => func.clone(),
            },
        }
    }

    /// Substitutes a variable with an expression.
    ///
    /// Used by the integrator to write `F(a*x + b)` once `F(u)` is known.
    pub fn substitute_variable(&self, var: &str, expr: &Expr) -> Expr {
        match self {
            Expr::Var(name) if name == var => expr.clone(),
            Expr::Var(_) | Expr::Const(_) => self.clone(),
            Expr::Add(lhs, rhs) => Expr::Add(
                Box::new(lhs.substitute_variable(var, expr)),
                Box::new(rhs.substitute_variable(var, expr)),
            ),
            Expr::Sub(lhs, rhs) => Expr::Sub(
                Box::new(lhs.substitute_variable(var, expr)),
                Box::new(rhs.substitute_variable(var, expr)),
            ),
            Expr::Mul(lhs, rhs) => Expr::Mul(
                Box::new(lhs.substitute_variable(var, expr)),
                Box::new(rhs.substitute_variable(var, expr)),
            ),
            Expr::Div(lhs, rhs) => Expr::Div(
                Box::new(lhs.substitute_variable(var, expr)),
                Box::new(rhs.substitute_variable(var, expr)),
            ),
            Expr::Pow(base, exp) => Expr::Pow(
                Box::new(base.substitute_variable(var, expr)),
                Box::new(exp.substitute_variable(var, expr)),
            ),
            func => match func.function_argument() {
                Some(arg) => func
                    .with_function_argument(arg.substitute_variable(var, expr))
                    .unwrap_or_else(|| func.clone()),
                None => func.clone(),
            },
        }
    }

    /// check if the expression contains a variable
    pub fn contains_variable(&self, var_name: &str) -> bool {
        match self {
            Expr::Var(name) => name == var_name,
            Expr::Const(_) => false,
            Expr::Add(left, right)
            | Expr::Sub(left, right)
            | Expr::Mul(left, right)
            | Expr::Div(left, right)
            | Expr::Pow(left, right) => {
                left.contains_variable(var_name) || right.contains_variable(var_name)
            }
            func => func
                .function_argument()
                .is_some_and(|arg| arg.contains_variable(var_name)),
        }
    }

    /// Extracts all unique variable names from the symbolic expression,
    /// sorted and deduplicated.
    pub fn all_arguments_are_variables(&self) -> Vec<String> {
        let mut vars = Vec::new();
        self.collect_variables(&mut vars);
        vars.sort();
        vars.dedup();
        vars
    }

    fn collect_variables(&self, out: &mut Vec<String>) {
        match self {
            Expr::Var(name) => out.push(name.clone()),
            Expr::Const(_) => {}
            Expr::Add(lhs, rhs)
            | Expr::Sub(lhs, rhs)
            | Expr::Mul(lhs, rhs)
            | Expr::Div(lhs, rhs)
            | Expr::Pow(lhs, rhs) => {
                lhs.collect_variables(out);
                rhs.collect_variables(out);
            }
            func => {
                if let Some(arg) = func.function_argument() {
                    arg.collect_variables(out);
                }
            }
        }
    }

    /// Convenience method to wrap expression in Box for recursive structures.
    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    /// Creates exponential function e^(self).
    pub fn exp(self) -> Expr {
        Expr::Exp(self.boxed())
    }

    /// Creates natural logarithm ln(self).
    pub fn ln(self) -> Expr {
        Expr::Ln(self.boxed())
    }

    /// Creates absolute value |self|.
    pub fn abs(self) -> Expr {
        Expr::Abs(self.boxed())
    }

    /// Creates power expression self^rhs.
    pub fn pow(self, rhs: Expr) -> Expr {
        Expr::Pow(self.boxed(), rhs.boxed())
    }

    /// Creates square root as self^0.5.
    pub fn sqrt(self) -> Expr {
        Expr::Pow(self.boxed(), Box::new(Expr::Const(0.5)))
    }

    /// Checks if expression is exactly zero (constant 0.0).
    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Const(val) if *val == 0.0)
    }

    /// Checks if expression is exactly one (constant 1.0).
    pub fn is_one(&self) -> bool {
        matches!(self, Expr::Const(val) if *val == 1.0)
    }

    /// Number of nodes in the tree; used to pick the smaller of two equivalent forms.
    pub fn node_count(&self) -> usize {
        match self {
            Expr::Var(_) | Expr::Const(_) => 1,
            Expr::Add(lhs, rhs)
            | Expr::Sub(lhs, rhs)
            | Expr::Mul(lhs, rhs)
            | Expr::Div(lhs, rhs)
            | Expr::Pow(lhs, rhs) => 1 + lhs.node_count() + rhs.node_count(),
            func => 1 + func.function_argument().map_or(0, Expr::node_count),
        }
    }
}
