#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
/// a module turns a String expression into a symbolic expression over one declared variable
///
///# Example
/// ```
/// use RustedIntegral::symbolic::symbolic_engine::Expr;
/// let input = "x**2*sin(x)";
/// let parsed_expression = Expr::parse_expression(input, "x").unwrap();
/// println!(" parsed_expression {}", parsed_expression);
/// let parsed_function = parsed_expression.lambdify1D("x");
/// println!("{}, Rust function: {}  \n", input, parsed_function(1.0));
/// ```
/// ________________________________________________________________________________________________________________________________
pub mod parse_expr;
///____________________________________________________________________________________________________________________________
/// # Symbolic engine
/// a module
/// 1) holds the expression tree and its canonical text form
/// 2) differentiates and evaluates symbolic expressions
/// 3) compares analytical and numerical derivatives
///# Example#
/// ```
/// use RustedIntegral::symbolic::symbolic_engine::Expr;
/// let f = Expr::parse_expression("x + exp(x)", "x").unwrap();
/// let df_dx = f.diff("x").simplify();
/// println!("df_dx = {}", df_dx);
/// // compare numerical and analytical derivatives on a grid of 100 points
/// let (norm, res) = f.compare_num1D("x", 0.0, 10.0, 100, 1e-6);
/// println!("norm = {}, res = {}", norm, res);
/// ```
/// ________________________________________________________________________________________________________________________________________________
pub mod symbolic_engine;
pub mod symbolic_engine_derivatives;
pub mod symbolic_lambdify;
pub mod symbolic_simplify;
///________________________________________________________________________________________________________________________________________________
/// # Integration
/// closed-form antiderivatives, definite integrals and numerical quadrature
/// Example#
/// ```
/// use RustedIntegral::symbolic::symbolic_engine::Expr;
/// let f = Expr::parse_expression("sin(x) + x**2", "x").unwrap();
/// let F = f.integrate("x").unwrap();
/// assert_eq!(F.to_string(), "-cos(x) + x**3/3");
/// let value = f.definite_integrate("x", 0.0, 2.0).unwrap();
/// assert!((value - (1.0 - 2.0_f64.cos() + 8.0 / 3.0)).abs() < 1e-12);
/// // no closed form: exp(-x^2) goes to quadrature
/// let g = Expr::parse_expression("exp(-x**2)", "x").unwrap();
/// assert!(g.integrate("x").is_err());
/// let q = g.adaptive_quad("x", 0.0, 1.0, 1e-10, 100).unwrap();
/// println!("quadrature = {} +- {}", q.value, q.error);
/// ```
pub mod symbolic_integration;
pub mod symbolic_latex;
///______________________________________________________________________________________________________________________________________________
/// grids, numerical derivatives and rational approximation of coefficients
/// _____________________________________________________________________________________________________________________________________________
pub mod utils;
