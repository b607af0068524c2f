//! # LaTeX Typesetting Module
//!
//! Renders an [`Expr`] as LaTeX math for the solution report.
//!
//! ## Interesting Code Features
//!
//! 1. **Same precedence table as `Display`**: an operand is wrapped in
//!    `\left( \right)` exactly where the plain-text printer would wrap it, except that
//!    fractions and roots group their content themselves.
//! 2. **Function powers**: `sin(x)**2` is typeset as `\sin^{2}\left(x\right)`.
//! 3. **Known constants**: constants equal to pi and e print as `\pi` and `e`.

use crate::symbolic::symbolic_engine::{Expr, is_sqrt};
use std::f64::consts::{E, PI};

fn wrapped(expr: &Expr, wrap: bool) -> String {
    if wrap {
        format!("\\left({}\\right)", expr.to_latex())
    } else {
        expr.to_latex()
    }
}

fn latex_number(val: f64) -> String {
    if val == PI {
        "\\pi".to_string()
    } else if val == -PI {
        "-\\pi".to_string()
    } else if val == E {
        "e".to_string()
    } else if val.is_infinite() {
        if val > 0.0 { "\\infty".to_string() } else { "-\\infty".to_string() }
    } else {
        format!("{}", val)
    }
}

/// LaTeX command of a one-argument function, `None` for exp and Abs which have their own layout.
fn latex_function_name(expr: &Expr) -> Option<&'static str> {
    let name = match expr {
        Expr::Ln(_) => "\\ln",
        Expr::sin(_) => "\\sin",
        Expr::cos(_) => "\\cos",
        Expr::tg(_) => "\\tan",
        Expr::ctg(_) => "\\cot",
        Expr::arcsin(_) => "\\arcsin",
        Expr::arccos(_) => "\\arccos",
        Expr::arctg(_) => "\\arctan",
        Expr::arcctg(_) => "\\operatorname{arccot}",
        _ => return None,
    };
    Some(name)
}

impl Expr {
    /// LaTeX source of the expression, without surrounding `$` delimiters.
    /// # Examples
    /// ```rust, ignore
    /// let f = Expr::parse_expression("x**3/3", "x").unwrap();
    /// assert_eq!(f.to_latex(), "\\frac{x^{3}}{3}");
    /// ```
    pub fn to_latex(&self) -> String {
        let add = 1;
        let mul = 2;
        let pow = 3;
        match self {
            Expr::Var(name) => name.clone(),
            Expr::Const(val) => latex_number(*val),
            Expr::Add(lhs, rhs) => format!(
                "{} + {}",
                wrapped(lhs, lhs.precedence() < add),
                wrapped(rhs, rhs.precedence() <= add)
            ),
            Expr::Sub(lhs, rhs) => format!(
                "{} - {}",
                wrapped(lhs, lhs.precedence() < add),
                wrapped(rhs, rhs.precedence() <= add)
            ),
            Expr::Mul(lhs, rhs) => {
                if let Some(inner) = self.as_negation() {
                    return format!("-{}", wrapped(inner, inner.precedence() < mul));
                }
                let left = wrapped(lhs, lhs.precedence() < mul);
                let right = wrapped(rhs, rhs.precedence() < mul || matches!(**rhs, Expr::Const(v) if v < 0.0));
                // a numeric coefficient is written in front of its factor without a dot
                if matches!(**lhs, Expr::Const(_)) && !matches!(**rhs, Expr::Const(_)) {
                    format!("{} {}", left, right)
                } else {
                    format!("{} \\cdot {}", left, right)
                }
            }
            Expr::Div(lhs, rhs) => format!("\\frac{{{}}}{{{}}}", lhs.to_latex(), rhs.to_latex()),
            Expr::Pow(base, exp) if is_sqrt(exp) => format!("\\sqrt{{{}}}", base.to_latex()),
            Expr::Pow(base, exp) => match latex_function_name(base) {
                Some(name) => {
                    let arg = base.function_argument().map(|a| a.to_latex()).unwrap_or_default();
                    format!("{}^{{{}}}\\left({}\\right)", name, exp.to_latex(), arg)
                }
                None => {
                    let wrap = base.precedence() <= pow
                        || matches!(**base, Expr::Exp(_))
                        || matches!(**base, Expr::Const(v) if v < 0.0);
                    format!("{}^{{{}}}", wrapped(base, wrap), exp.to_latex())
                }
            },
            Expr::Exp(arg) => format!("e^{{{}}}", arg.to_latex()),
            Expr::Abs(arg) => format!("\\left|{}\\right|", arg.to_latex()),
            other => {
                let name = latex_function_name(other).unwrap_or("\\operatorname{?}");
                let arg = other.function_argument().map(|a| a.to_latex()).unwrap_or_default();
                format!("{}\\left({}\\right)", name, arg)
            }
        }
    }
}
