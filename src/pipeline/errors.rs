//! Error and note types of the expression pipeline.
//!
//! Failures that stop a request (`ParseError`, `BoundsError`, an unusable display range)
//! are returned as [`PipelineError`]. Undefined sample points and a missing closed form
//! do not stop a request; they travel inside the result as [`Note`]s.

use crate::symbolic::parse_expr::ParseError;
use crate::symbolic::symbolic_integration::{IntegrationError, QuadMethod};
use itertools::Itertools;
use std::fmt;
use thiserror::Error;

/// Integration bounds that cannot be used.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BoundsError {
    #[error("lower bound {lower} is greater than upper bound {upper}")]
    Reversed { lower: f64, upper: f64 },
    #[error("bounds must be finite numbers, got [{lower}, {upper}]")]
    NotFinite { lower: f64, upper: f64 },
}

/// The expression is undefined at some sample points; those points are flagged, not fatal.
#[derive(Debug, Clone, PartialEq, Error)]
#[error(
    "`{expression}` is undefined at {} sample point(s): {}",
    .points.len(),
    format_points(.variable, .points)
)]
pub struct DomainError {
    pub expression: String,
    pub variable: String,
    pub points: Vec<f64>,
}

/// Informational: the value was computed by quadrature because no antiderivative was found.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("no closed-form antiderivative for `{expression}`, the value was computed by {method} quadrature")]
pub struct NoClosedFormWarning {
    pub expression: String,
    pub method: QuadMethod,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Bounds(#[from] BoundsError),
    #[error("invalid display range [{x_min}, {x_max}] with {samples} samples")]
    DisplayRange { x_min: f64, x_max: f64, samples: usize },
    #[error("numerical integration failed: {0}")]
    Integration(#[from] IntegrationError),
}

/// Remarks attached to a successful result.
#[derive(Debug, Clone, PartialEq)]
pub enum Note {
    /// undefined points inside the display range
    Domain(DomainError),
    NoClosedForm(NoClosedFormWarning),
    /// the integrand is undefined on a stretch inside the bounds, so no value is reported
    UndefinedInsideBounds { at: f64 },
    /// isolated singular points inside the bounds; the integral was treated as improper
    InteriorSingularity { points: Vec<f64>, integrable: bool },
    /// the antiderivative is not finite at a bound, quadrature was used instead
    SingularAntiderivative,
    /// quadrature stopped before reaching the requested tolerance
    QuadratureNotConverged { estimate: f64, error: f64 },
}

const MAX_LISTED_POINTS: usize = 5;

fn format_points(variable: &str, points: &[f64]) -> String {
    let listed = points
        .iter()
        .take(MAX_LISTED_POINTS)
        .map(|p| format!("{} = {}", variable, p))
        .join(", ");
    if points.len() > MAX_LISTED_POINTS {
        format!("{}, ...", listed)
    } else {
        listed
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Note::Domain(err) => write!(f, "domain: {}", err),
            Note::NoClosedForm(warning) => write!(f, "{}", warning),
            Note::UndefinedInsideBounds { at } => write!(
                f,
                "the integrand is undefined around {} inside the bounds, the integral does not exist",
                at
            ),
            Note::InteriorSingularity { points, integrable } => {
                let listed = points.iter().take(MAX_LISTED_POINTS).join(", ");
                if *integrable {
                    write!(
                        f,
                        "the integrand is singular at {} inside the bounds, the value is an improper integral",
                        listed
                    )
                } else {
                    write!(
                        f,
                        "the integrand is singular at {} inside the bounds, the integral does not exist",
                        listed
                    )
                }
            }
            Note::SingularAntiderivative => write!(
                f,
                "the antiderivative is not finite at a bound, the value was computed by quadrature"
            ),
            Note::QuadratureNotConverged { estimate, error } => write!(
                f,
                "quadrature did not converge (last estimate {}, error estimate {}), the integral may diverge",
                estimate, error
            ),
        }
    }
}
