// SYMBOLIC ENGINE CAPABILITY //////////////////////////////////////////////////////////
// The narrow interface the pipeline needs from a computer algebra backend.
// The trait is implemented below for the native engine of this crate;
// add other engines here as needed

use crate::symbolic::parse_expr::ParseError;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_integration::{IntegrationError, QuadratureResult, QuadratureSettings};
use crate::symbolic::symbolic_lambdify::Lambda1D;
use std::fmt;

pub trait SymbolicEngine {
    /// Parsed expression type of the backend.
    type Expression: Clone + fmt::Display + fmt::Debug + PartialEq;

    fn name(&self) -> &'static str;
    fn parse(&self, text: &str, variable: &str) -> Result<Self::Expression, ParseError>;
    /// Callable evaluator; undefined points come back as NaN or infinity.
    fn evaluator(&self, expr: &Self::Expression, variable: &str) -> Lambda1D;
    fn antiderivative(
        &self,
        expr: &Self::Expression,
        variable: &str,
    ) -> Result<Self::Expression, IntegrationError>;
    /// `F(upper) - F(lower)`, an error when it is not finite.
    fn evaluate_between(
        &self,
        antiderivative: &Self::Expression,
        variable: &str,
        lower: f64,
        upper: f64,
    ) -> Result<f64, IntegrationError>;
    fn quadrature(
        &self,
        expr: &Self::Expression,
        variable: &str,
        lower: f64,
        upper: f64,
        settings: &QuadratureSettings,
    ) -> Result<QuadratureResult, IntegrationError>;
    /// LaTeX form for the typesetting collaborator.
    fn typeset(&self, expr: &Self::Expression) -> String;
}

///////////////// IMPLEMENTATION OF THE TRAIT FOR THE NATIVE ENGINE /////////////////////////
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeEngine;

impl SymbolicEngine for NativeEngine {
    type Expression = Expr;

    fn name(&self) -> &'static str {
        "native"
    }
    fn parse(&self, text: &str, variable: &str) -> Result<Expr, ParseError> {
        Expr::parse_expression(text, variable)
    }
    fn evaluator(&self, expr: &Expr, variable: &str) -> Lambda1D {
        expr.lambdify1D(variable)
    }
    fn antiderivative(&self, expr: &Expr, variable: &str) -> Result<Expr, IntegrationError> {
        expr.integrate(variable)
    }
    fn evaluate_between(
        &self,
        antiderivative: &Expr,
        variable: &str,
        lower: f64,
        upper: f64,
    ) -> Result<f64, IntegrationError> {
        antiderivative.evaluate_between(variable, lower, upper)
    }
    fn quadrature(
        &self,
        expr: &Expr,
        variable: &str,
        lower: f64,
        upper: f64,
        settings: &QuadratureSettings,
    ) -> Result<QuadratureResult, IntegrationError> {
        expr.integrate_numerically(variable, lower, upper, settings)
    }
    fn typeset(&self, expr: &Expr) -> String {
        expr.to_latex()
    }
}
