use crate::symbolic::symbolic_engine::Expr;
use std::f64::consts::PI;

/// Compiled one-variable function, shareable with quadrature and plotting code.
pub type Lambda1D = Box<dyn Fn(f64) -> f64 + Send + Sync>;

impl Expr {
    /// LAMBDIFICATION - Converting Symbolic Expressions to Executable Functions

    /// Converts a single-variable symbolic expression into an executable Rust closure.
    ///
    /// The closure mirrors the expression tree, so nothing is parsed or looked up
    /// at call time. Any variable other than `var` evaluates to NaN.
    ///
    /// # Examples
    /// ```rust, ignore
    /// let x = Expr::Var("x".to_string());
    /// let f = x.pow(Expr::Const(2.0)); // x^2
    /// let func = f.lambdify1D("x");
    /// assert_eq!(func(3.0), 9.0);
    /// ```
    pub fn lambdify1D(&self, var: &str) -> Lambda1D {
        match self {
            Expr::Var(name) => {
                if name == var {
                    Box::new(|x| x)
                } else {
                    Box::new(|_| f64::NAN)
                }
            }
            Expr::Const(val) => {
                let val = *val;
                Box::new(move |_| val)
            }
            Expr::Add(lhs, rhs) => {
                let lhs_fn = lhs.lambdify1D(var);
                let rhs_fn = rhs.lambdify1D(var);
                Box::new(move |x| lhs_fn(x) + rhs_fn(x))
            }
            Expr::Sub(lhs, rhs) => {
                let lhs_fn = lhs.lambdify1D(var);
                let rhs_fn = rhs.lambdify1D(var);
                Box::new(move |x| lhs_fn(x) - rhs_fn(x))
            }
            Expr::Mul(lhs, rhs) => {
                let lhs_fn = lhs.lambdify1D(var);
                let rhs_fn = rhs.lambdify1D(var);
                Box::new(move |x| lhs_fn(x) * rhs_fn(x))
            }
            Expr::Div(lhs, rhs) => {
                let lhs_fn = lhs.lambdify1D(var);
                let rhs_fn = rhs.lambdify1D(var);
                Box::new(move |x| lhs_fn(x) / rhs_fn(x))
            }
            Expr::Pow(base, exp) => {
                let base_fn = base.lambdify1D(var);
                match exp.as_ref() {
                    // integer exponents are common and powi is exact for them
                    Expr::Const(n) if n.fract() == 0.0 && n.abs() <= i32::MAX as f64 => {
                        let n = *n as i32;
                        Box::new(move |x| base_fn(x).powi(n))
                    }
                    _ => {
                        let exp_fn = exp.lambdify1D(var);
                        Box::new(move |x| base_fn(x).powf(exp_fn(x)))
                    }
                }
            }
            Expr::Exp(expr) => {
                let expr_fn = expr.lambdify1D(var);
                Box::new(move |x| expr_fn(x).exp())
            }
            Expr::Ln(expr) => {
                let expr_fn = expr.lambdify1D(var);
                Box::new(move |x| expr_fn(x).ln())
            }
            Expr::Abs(expr) => {
                let expr_fn = expr.lambdify1D(var);
                Box::new(move |x| expr_fn(x).abs())
            }
            Expr::sin(expr) => {
                let expr_fn = expr.lambdify1D(var);
                Box::new(move |x| expr_fn(x).sin())
            }
            Expr::cos(expr) => {
                let expr_fn = expr.lambdify1D(var);
                Box::new(move |x| expr_fn(x).cos())
            }
            Expr::tg(expr) => {
                let expr_fn = expr.lambdify1D(var);
                Box::new(move |x| expr_fn(x).tan())
            }
            Expr::ctg(expr) => {
                let expr_fn = expr.lambdify1D(var);
                Box::new(move |x| 1.0 / expr_fn(x).tan())
            }
            Expr::arcsin(expr) => {
                let expr_fn = expr.lambdify1D(var);
                Box::new(move |x| expr_fn(x).asin())
            }
            Expr::arccos(expr) => {
                let expr_fn = expr.lambdify1D(var);
                Box::new(move |x| expr_fn(x).acos())
            }
            Expr::arctg(expr) => {
                let expr_fn = expr.lambdify1D(var);
                Box::new(move |x| expr_fn(x).atan())
            }
            Expr::arcctg(expr) => {
                let expr_fn = expr.lambdify1D(var);
                Box::new(move |x| PI / 2.0 - expr_fn(x).atan())
            }
        }
    } // end of lambdify1D

    /// Evaluates the expression on every point of `x`.
    pub fn lambdify1D_from_linspace(&self, var: &str, start: f64, end: f64, num_values: usize) -> Vec<f64> {
        let x = crate::symbolic::utils::linspace(start, end, num_values);
        self.calc_vector_lambdified1D(var, &x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lambdify1D_polynomial() {
        let expr = Expr::parse_expression("x**2 - 3*x + 2", "x").unwrap();
        let f = expr.lambdify1D("x");
        assert_eq!(f(1.0), 0.0);
        assert_eq!(f(2.0), 0.0);
        assert_eq!(f(4.0), 6.0);
    }

    #[test]
    fn test_lambdify1D_matches_eval_expression() {
        let expr = Expr::parse_expression("sin(x)*exp(-x/2) + sqrt(x) - acot(x)", "x").unwrap();
        let f = expr.lambdify1D("x");
        for &x in &[0.1, 0.5, 1.0, 2.5, 7.0] {
            assert_relative_eq!(f(x), expr.eval_expression(&["x"], &[x]), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_lambdify1D_undefined_points_are_not_finite() {
        let f = Expr::parse_expression("1/x", "x").unwrap().lambdify1D("x");
        assert!(!f(0.0).is_finite());
        let f = Expr::parse_expression("ln(x)", "x").unwrap().lambdify1D("x");
        assert!(!f(-1.0).is_finite());
        let f = Expr::parse_expression("sqrt(x)", "x").unwrap().lambdify1D("x");
        assert!(f(-1.0).is_nan());
    }

    #[test]
    fn test_lambdify1D_from_linspace() {
        let expr = Expr::parse_expression("2*x", "x").unwrap();
        let y = expr.lambdify1D_from_linspace("x", 0.0, 1.0, 3);
        assert_eq!(y, vec![0.0, 1.0, 2.0]);
    }
}
