//! # Symbolic Expression Simplification Module
//!
//! Algebraic simplification and polynomial expansion of symbolic expressions.
//!
//! ## Simplification Strategy
//!
//! 1. **Constant Folding**: arithmetic on numerical constants is evaluated
//! 2. **Algebraic Identities**: x + 0 = x, x * 1 = x, x^1 = x, ln(exp(u)) = u
//! 3. **Term Collection**: every product or quotient is split into a numeric
//!    coefficient and a list of factors with exponents, so `x*x**2/x` becomes `x**2`
//!    and `3*x + 2*x` becomes `5*x`
//! 4. **Canonical Rebuild**: rational coefficients are printed as fractions
//!    (`x**3/3`), negative terms after the first become subtractions
//!
//! ## Key Features
//!
//! - `simplify()` iterates to a fixed point, so simplifying twice changes nothing
//! - like terms are kept in order of first appearance, the constant term goes last
//! - `expand()` distributes products over sums and small integer powers of sums
//!
//! Simplification never removes a point from the domain on purpose but it may add
//! one: `x/x` becomes `1`. Domain checks therefore run on the unsimplified input.

use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::utils::as_rational;

/// Largest denominator printed as a fraction.
const MAX_DENOMINATOR: i64 = 100;
/// Largest integer power of a sum that `expand()` multiplies out.
const MAX_EXPANDED_POWER: f64 = 8.0;
const MAX_SIMPLIFY_PASSES: usize = 10;

/// A product split into `coeff * prod(base^exponent)`.
#[derive(Clone, Debug, PartialEq)]
struct Term {
    coeff: f64,
    factors: Vec<(Expr, f64)>,
}

impl Term {
    fn split(expr: &Expr) -> Term {
        let mut term = Term {
            coeff: 1.0,
            factors: Vec::new(),
        };
        term.collect(expr, 1.0);
        term.factors.retain(|(_, exponent)| *exponent != 0.0);
        term
    }

    fn collect(&mut self, expr: &Expr, sign: f64) {
        match expr {
            Expr::Const(c) => {
                if sign > 0.0 {
                    self.coeff *= c
                } else {
                    self.coeff /= c
                }
            }
            Expr::Mul(lhs, rhs) => {
                self.collect(lhs, sign);
                self.collect(rhs, sign);
            }
            Expr::Div(lhs, rhs) => {
                self.collect(lhs, sign);
                self.collect(rhs, -sign);
            }
            Expr::Pow(base, exp) if !matches!(base.as_ref(), Expr::Const(_)) => {
                match exp.as_ref() {
                    Expr::Const(n) => self.push(base, n * sign),
                    _ => self.push(expr, sign),
                }
            }
            _ => self.push(expr, sign),
        }
    }

    fn push(&mut self, base: &Expr, exponent: f64) {
        match self.factors.iter_mut().find(|(b, _)| b == base) {
            Some((_, e)) => *e += exponent,
            None => self.factors.push((base.clone(), exponent)),
        }
    }

    /// Factors without the coefficient, used as the key for like terms.
    fn key(&self) -> &[(Expr, f64)] {
        &self.factors
    }

    fn is_constant(&self) -> bool {
        self.factors.is_empty()
    }

    /// Single factor that is itself a sum, so the coefficient can be distributed.
    fn as_scaled_sum(&self) -> Option<&Expr> {
        match self.factors.as_slice() {
            [(sum @ (Expr::Add(_, _) | Expr::Sub(_, _)), e)] if *e == 1.0 => Some(sum),
            _ => None,
        }
    }

    fn build(&self) -> Expr {
        if self.coeff == 0.0 {
            return Expr::Const(0.0);
        }
        let (p, q) = match as_rational(self.coeff, MAX_DENOMINATOR) {
            Some((p, q)) => (p as f64, q as f64),
            None => (self.coeff, 1.0),
        };
        let power = |base: &Expr, e: f64| {
            if e == 1.0 {
                base.clone()
            } else {
                Expr::Pow(Box::new(base.clone()), Box::new(Expr::Const(e)))
            }
        };
        let numerator: Vec<Expr> = self
            .factors
            .iter()
            .filter(|(_, e)| *e > 0.0)
            .map(|(b, e)| power(b, *e))
            .collect();
        let denominator: Vec<Expr> = self
            .factors
            .iter()
            .filter(|(_, e)| *e < 0.0)
            .map(|(b, e)| power(b, -e))
            .collect();
        let numerator = product(p, numerator);
        match product(q, denominator) {
            Expr::Const(one) if one == 1.0 => numerator,
            denominator => Expr::Div(Box::new(numerator), Box::new(denominator)),
        }
    }
}

/// Splits a product or quotient and rebuilds it in canonical form.
/// Products whose coefficient overflows are returned as they are.
fn rebuild_product(expr: Expr) -> Expr {
    let term = Term::split(&expr);
    if term.coeff.is_finite() {
        term.build()
    } else {
        expr
    }
}

/// Left folded product `c*f1*f2*...`, with a unit coefficient left out.
fn product(coeff: f64, factors: Vec<Expr>) -> Expr {
    let mut chain: Vec<Expr> = Vec::with_capacity(factors.len() + 1);
    if coeff != 1.0 || factors.is_empty() {
        chain.push(Expr::Const(coeff));
    }
    chain.extend(factors);
    chain
        .into_iter()
        .reduce(|acc, f| Expr::Mul(Box::new(acc), Box::new(f)))
        .unwrap_or(Expr::Const(1.0))
}

/// Flatten nested Add/Sub expressions into coefficient terms, distributing numeric
/// multiples over inner sums: `-2*(a + b)` gives `[-2*a, -2*b]`.
fn flatten_add(expr: &Expr, scale: f64, out: &mut Vec<Term>) {
    match expr {
        Expr::Add(a, b) => {
            flatten_add(a, scale, out);
            flatten_add(b, scale, out);
        }
        Expr::Sub(a, b) => {
            flatten_add(a, scale, out);
            flatten_add(b, -scale, out);
        }
        _ => {
            let mut term = Term::split(expr);
            term.coeff *= scale;
            if let Some(sum) = term.as_scaled_sum() {
                flatten_add(sum, term.coeff, out);
            } else {
                out.push(term);
            }
        }
    }
}

/// Collects like terms of a sum and rebuilds it in canonical order.
fn collect_sum(expr: &Expr) -> Expr {
    let mut terms = Vec::new();
    flatten_add(expr, 1.0, &mut terms);
    if terms.iter().any(|t| !t.coeff.is_finite()) {
        return expr.clone();
    }
    let mut collected: Vec<Term> = Vec::new();
    let mut constant = 0.0;
    for term in terms {
        if term.is_constant() {
            constant += term.coeff;
            continue;
        }
        match collected.iter_mut().find(|t| t.key() == term.key()) {
            Some(existing) => existing.coeff += term.coeff,
            None => collected.push(term),
        }
    }
    collected.retain(|t| t.coeff != 0.0);
    if constant != 0.0 {
        collected.push(Term {
            coeff: constant,
            factors: Vec::new(),
        });
    }
    let mut result: Option<Expr> = None;
    for term in collected {
        result = Some(match result {
            None => term.build(),
            Some(acc) if term.coeff < 0.0 => {
                let positive = Term {
                    coeff: -term.coeff,
                    factors: term.factors,
                };
                Expr::Sub(Box::new(acc), Box::new(positive.build()))
            }
            Some(acc) => Expr::Add(Box::new(acc), Box::new(term.build())),
        });
    }
    result.unwrap_or(Expr::Const(0.0))
}

/// Terms of a sum, with subtracted terms negated.
fn sum_terms(expr: &Expr) -> Vec<Expr> {
    match expr {
        Expr::Add(a, b) => {
            let mut terms = sum_terms(a);
            terms.extend(sum_terms(b));
            terms
        }
        Expr::Sub(a, b) => {
            let mut terms = sum_terms(a);
            terms.extend(sum_terms(b).into_iter().map(|t| -t));
            terms
        }
        _ => vec![expr.clone()],
    }
}

fn is_sum(expr: &Expr) -> bool {
    matches!(expr, Expr::Add(_, _) | Expr::Sub(_, _))
}

fn rebuild_sum(terms: Vec<Expr>) -> Expr {
    terms
        .into_iter()
        .reduce(|acc, t| Expr::Add(Box::new(acc), Box::new(t)))
        .unwrap_or(Expr::Const(0.0))
}

fn distribute(lhs: &Expr, rhs: &Expr) -> Expr {
    let left = sum_terms(lhs);
    let right = sum_terms(rhs);
    let mut products = Vec::with_capacity(left.len() * right.len());
    for a in &left {
        for b in &right {
            products.push(Expr::Mul(Box::new(a.clone()), Box::new(b.clone())).expand());
        }
    }
    rebuild_sum(products)
}

impl Expr {
    //___________________________________SIMPLIFICATION____________________________________

    /// One bottom-up simplification pass.
    ///
    /// ### Additive rules
    /// - like terms are collected, `x - x = 0`
    /// ### Multiplicative rules
    /// - constants fold, `0 * x = 0`, `x^a * x^b = x^(a+b)`, `x^a / x^b = x^(a-b)`
    /// ### Power rules
    /// - `x^0 = 1`, `x^1 = x`, `1^x = 1`, `(x^a)^n = x^(a*n)` for integer `n`
    /// ### Transcendental Functions
    /// - `exp(0) = 1`, `ln(1) = 0`, `ln(exp(u)) = u`, `sin(0) = 0`, `cos(0) = 1`
    pub fn simplify_(&self) -> Expr {
        match self {
            Expr::Var(_) | Expr::Const(_) => self.clone(),
            Expr::Add(lhs, rhs) => {
                let expr = Expr::Add(Box::new(lhs.simplify_()), Box::new(rhs.simplify_()));
                collect_sum(&expr)
            }
            Expr::Sub(lhs, rhs) => {
                let expr = Expr::Sub(Box::new(lhs.simplify_()), Box::new(rhs.simplify_()));
                collect_sum(&expr)
            }
            Expr::Mul(lhs, rhs) => {
                let lhs = lhs.simplify_();
                let rhs = rhs.simplify_();
                match (&lhs, &rhs) {
                    (Expr::Const(a), Expr::Const(b)) => Expr::Const(a * b),
                    (Expr::Const(0.0), _) | (_, Expr::Const(0.0)) => Expr::Const(0.0),
                    _ => rebuild_product(Expr::Mul(Box::new(lhs), Box::new(rhs))),
                }
            }
            Expr::Div(lhs, rhs) => {
                let lhs = lhs.simplify_();
                let rhs = rhs.simplify_();
                match (&lhs, &rhs) {
                    // division by zero is kept so the point stays undefined
                    (_, Expr::Const(0.0)) => Expr::Div(Box::new(lhs), Box::new(rhs)),
                    (Expr::Const(a), Expr::Const(b)) => Expr::Const(a / b),
                    (Expr::Const(0.0), _) => Expr::Const(0.0),
                    _ => rebuild_product(Expr::Div(Box::new(lhs), Box::new(rhs))),
                }
            }
            Expr::Pow(base, exp) => {
                let base = base.simplify_();
                let exp = exp.simplify_();
                match (&base, &exp) {
                    (Expr::Const(a), Expr::Const(b)) if a.powf(*b).is_finite() => {
                        Expr::Const(a.powf(*b))
                    }
                    (_, Expr::Const(0.0)) => Expr::Const(1.0), // x ^ 0 = 1
                    (_, Expr::Const(1.0)) => base,             // x ^ 1 = x
                    (Expr::Const(1.0), _) => Expr::Const(1.0), // 1 ^ x = 1
                    // (x^a)^n = x^(a*n)
                    (Expr::Pow(inner_base, inner_exp), Expr::Const(n)) if n.fract() == 0.0 => {
                        let new_exp = Expr::Mul(inner_exp.clone(), Box::new(exp.clone())).simplify_();
                        Expr::Pow(inner_base.clone(), Box::new(new_exp)).simplify_()
                    }
                    (_, Expr::Const(n)) if *n < 0.0 && !matches!(base, Expr::Const(_)) => {
                        rebuild_product(Expr::Pow(Box::new(base), Box::new(exp)))
                    }
                    _ => Expr::Pow(Box::new(base), Box::new(exp)),
                }
            }
            Expr::Exp(expr) => match expr.simplify_() {
                Expr::Const(0.0) => Expr::Const(1.0),
                Expr::Ln(inner) => match inner.as_ref() {
                    Expr::Const(c) if *c > 0.0 => Expr::Const(*c),
                    _ => Expr::Exp(Box::new(Expr::Ln(inner))),
                },
                expr => Expr::Exp(Box::new(expr)),
            },
            Expr::Ln(expr) => match expr.simplify_() {
                Expr::Const(1.0) => Expr::Const(0.0),
                Expr::Exp(inner) => *inner,
                expr => Expr::Ln(Box::new(expr)),
            },
            Expr::Abs(expr) => match expr.simplify_() {
                Expr::Const(c) => Expr::Const(c.abs()),
                Expr::Abs(inner) => Expr::Abs(inner),
                expr => Expr::Abs(Box::new(expr)),
            },
            Expr::sin(expr) => match expr.simplify_() {
                Expr::Const(0.0) => Expr::Const(0.0),
                expr => Expr::sin(Box::new(expr)),
            },
            Expr::cos(expr) => match expr.simplify_() {
                Expr::Const(0.0) => Expr::Const(1.0),
                expr => Expr::cos(Box::new(expr)),
            },
            Expr::tg(expr) => match expr.simplify_() {
                Expr::Const(0.0) => Expr::Const(0.0),
                expr => Expr::tg(Box::new(expr)),
            },
            Expr::ctg(expr) => Expr::ctg(Box::new(expr.simplify_())),
            Expr::arcsin(expr) => match expr.simplify_() {
                Expr::Const(0.0) => Expr::Const(0.0),
                expr => Expr::arcsin(Box::new(expr)),
            },
            Expr::arccos(expr) => match expr.simplify_() {
                Expr::Const(1.0) => Expr::Const(0.0),
                expr => Expr::arccos(Box::new(expr)),
            },
            Expr::arctg(expr) => match expr.simplify_() {
                Expr::Const(0.0) => Expr::Const(0.0),
                expr => Expr::arctg(Box::new(expr)),
            },
            Expr::arcctg(expr) => Expr::arcctg(Box::new(expr.simplify_())),
        }
    }

    /// Simplifies until the expression stops changing.
    ///
    /// Applying `simplify` to its own output returns the same expression.
    pub fn simplify(&self) -> Expr {
        let mut current = self.simplify_();
        for _ in 1..MAX_SIMPLIFY_PASSES {
            let next = current.simplify_();
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    /// Multiplies out products of sums and integer powers of sums up to the 8th.
    ///
    /// The result is not simplified; call `simplify()` to collect terms.
    pub fn expand(&self) -> Expr {
        match self {
            Expr::Add(lhs, rhs) => Expr::Add(Box::new(lhs.expand()), Box::new(rhs.expand())),
            Expr::Sub(lhs, rhs) => Expr::Sub(Box::new(lhs.expand()), Box::new(rhs.expand())),
            Expr::Mul(lhs, rhs) => {
                let lhs = lhs.expand();
                let rhs = rhs.expand();
                if is_sum(&lhs) || is_sum(&rhs) {
                    distribute(&lhs, &rhs)
                } else {
                    Expr::Mul(Box::new(lhs), Box::new(rhs))
                }
            }
            Expr::Div(lhs, rhs) => {
                let lhs = lhs.expand();
                let rhs = rhs.expand();
                if is_sum(&lhs) && !rhs.is_zero() {
                    rebuild_sum(
                        sum_terms(&lhs)
                            .into_iter()
                            .map(|t| Expr::Div(Box::new(t), Box::new(rhs.clone())))
                            .collect(),
                    )
                } else {
                    Expr::Div(Box::new(lhs), Box::new(rhs))
                }
            }
            Expr::Pow(base, exp) => {
                let base = base.expand();
                match exp.as_ref() {
                    Expr::Const(n)
                        if is_sum(&base)
                            && n.fract() == 0.0
                            && *n >= 2.0
                            && *n <= MAX_EXPANDED_POWER =>
                    {
                        let mut acc = base.clone();
                        for _ in 1..(*n as usize) {
                            acc = distribute(&acc, &base);
                        }
                        acc
                    }
                    _ => Expr::Pow(Box::new(base), exp.clone()),
                }
            }
            other => match other.function_argument() {
                Some(arg) => other.with_function_argument(arg.expand()).unwrap_or_else(|| other.clone()),
                None => other.clone(),
            },
        }
    }

    /// True for polynomials in `var` with non-negative integer powers.
    pub fn is_polynomial(&self, var: &str) -> bool {
        match self {
            Expr::Var(_) | Expr::Const(_) => true,
            Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) => {
                a.is_polynomial(var) && b.is_polynomial(var)
            }
            Expr::Div(a, b) => a.is_polynomial(var) && !b.contains_variable(var),
            Expr::Pow(base, exp) => match exp.as_ref() {
                Expr::Const(n) => n.fract() == 0.0 && *n >= 0.0 && base.is_polynomial(var),
                _ => !self.contains_variable(var),
            },
            other => !other.contains_variable(var),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simplified(input: &str) -> String {
        Expr::parse_expression(input, "x").unwrap().simplify().to_string()
    }

    #[test]
    fn test_collect_like_terms() {
        assert_eq!(simplified("x + x"), "2*x");
        assert_eq!(simplified("3*x + 2*x - x"), "4*x");
        assert_eq!(simplified("sin(x) + 2*sin(x)"), "3*sin(x)");
        assert_eq!(simplified("x - x"), "0");
    }

    #[test]
    fn test_constant_folding_and_identities() {
        assert_eq!(simplified("2 + 3*4"), "14");
        assert_eq!(simplified("0*sin(x) + 1*x"), "x");
        assert_eq!(simplified("x**1 + x**0"), "x + 1");
        assert_eq!(simplified("exp(0)*ln(1) + cos(0)"), "1");
        assert_eq!(simplified("ln(exp(x))"), "x");
    }

    #[test]
    fn test_powers_merge() {
        assert_eq!(simplified("x*x**2"), "x**3");
        assert_eq!(simplified("x*x"), "x**2");
        assert_eq!(simplified("x**3/x"), "x**2");
        assert_eq!(simplified("x/x"), "1");
        assert_eq!(simplified("(x**2)**3"), "x**6");
        assert_eq!(simplified("x**(-1)"), "1/x");
    }

    #[test]
    fn test_rational_coefficients() {
        assert_eq!(simplified("x**3/3"), "x**3/3");
        assert_eq!(simplified("2*x**3/3"), "2*x**3/3");
        assert_eq!(simplified("-x**3/3"), "-x**3/3");
        assert_eq!(simplified("2*(1/x)/3"), "2/(3*x)");
        assert_eq!(simplified("0.5*x"), "x/2");
    }

    #[test]
    fn test_negative_terms_become_subtraction() {
        assert_eq!(simplified("x + -2*x**2"), "x - 2*x**2");
        assert_eq!(simplified("-cos(x) + x**3/3"), "-cos(x) + x**3/3");
        assert_eq!(simplified("-(x + 1) + 2*x"), "x - 1");
    }

    #[test]
    fn test_division_by_zero_is_kept() {
        let expr = Expr::parse_expression("x/0", "x").unwrap().simplify();
        assert!(!expr.eval_expression(&["x"], &[1.0]).is_finite());
    }

    #[test]
    fn test_simplify_is_idempotent() {
        for input in [
            "x**2 + 2*x + 1 - (x + 1)**2",
            "sin(x)*x/x + x**3/3",
            "-(x - 1)*2 + exp(2*x)/2",
            "1/(x + 1) - 3/(x + 1)",
        ] {
            let once = Expr::parse_expression(input, "x").unwrap().simplify();
            assert_eq!(once.simplify(), once, "input {}", input);
        }
    }

    #[test]
    fn test_expand() {
        let expr = Expr::parse_expression("(x + 1)**2", "x").unwrap();
        assert_eq!(expr.expand().simplify().to_string(), "x**2 + 2*x + 1");
        let expr = Expr::parse_expression("x*(x - 2)", "x").unwrap();
        assert_eq!(expr.expand().simplify().to_string(), "x**2 - 2*x");
        let expr = Expr::parse_expression("(x + 1)/2", "x").unwrap();
        assert_eq!(expr.expand().simplify().to_string(), "x/2 + 1/2");
    }

    #[test]
    fn test_is_polynomial() {
        let poly = Expr::parse_expression("3*x**2 - x/2 + (x + 1)**3", "x").unwrap();
        assert!(poly.is_polynomial("x"));
        let not_poly = Expr::parse_expression("x**2 + 1/x", "x").unwrap();
        assert!(!not_poly.is_polynomial("x"));
        let not_poly = Expr::parse_expression("sin(x)", "x").unwrap();
        assert!(!not_poly.is_polynomial("x"));
        let constant = Expr::parse_expression("sin(2)*x", "x").unwrap();
        assert!(constant.is_polynomial("x"));
    }
}
