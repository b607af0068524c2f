//! # Expression Pipeline
//!
//! Turns expression text over one declared variable into everything a front end shows:
//! the validated expression, plot samples with undefined points flagged, and the definite
//! integral with its antiderivative and typeset form.
//!
//! ## Purpose
//!
//! The pipeline is a pure function of (text, variable, bounds, display range). It owns no
//! state between requests and never spawns threads. The symbolic work is delegated to a
//! [`SymbolicEngine`], so the backend can be replaced without touching this contract.
//!
//! ## Definite integral
//!
//! 1. `lower == upper` gives exactly `0`, nothing is evaluated.
//! 2. The integrand is probed on a grid over the bounds, and every local peak of |f| is
//!    refined to catch poles between probe points. An undefined stretch means the integral
//!    does not exist. Isolated singular points make it an improper integral: quadrature
//!    runs on each piece and the integral exists only if every piece converges.
//! 3. With a closed form, `F(upper) - F(lower)`. A non-finite difference (an antiderivative
//!    singular at a bound) sends the request to quadrature.
//! 4. Without a closed form, quadrature with a `NoClosedFormWarning` note.
//!
//! ## Interesting Code Features
//!
//! - Domain problems never fail a request: undefined points are `None` in the [`SampleSet`]
//!   and a [`Note::Domain`] is attached.
//! - Bounds are validated before the expression is even parsed.
//!
//! # Example
//! ```
//! use RustedIntegral::pipeline::{ExpressionPipeline, NativeEngine};
//! let pipeline = ExpressionPipeline::new(NativeEngine, "x");
//! let output = pipeline.run("x**2", 0.0, 1.0, None).unwrap();
//! assert_eq!(output.integral.antiderivative.unwrap().to_string(), "x**3/3");
//! assert!((output.integral.value.unwrap() - 1.0 / 3.0).abs() < 1e-15);
//! ```

pub mod engine;
pub mod errors;

#[cfg(test)]
mod pipeline_tests;

pub use engine::{NativeEngine, SymbolicEngine};
pub use errors::{BoundsError, DomainError, NoClosedFormWarning, Note, PipelineError};

use crate::symbolic::symbolic_integration::{QuadMethod, QuadratureSettings};
use crate::symbolic::symbolic_lambdify::Lambda1D;
use crate::symbolic::utils::linspace;
use log::{debug, info, warn};
use std::fmt;

/// Default number of plot samples.
/// Odd, so a display range symmetric around a point samples that point exactly.
pub const DEFAULT_SAMPLES: usize = 501;
/// Number of points used to look for undefined points between the bounds.
pub const DEFAULT_PROBE_POINTS: usize = 1001;
/// Padding added on each side of the bounds for the default display range.
const DISPLAY_PADDING: f64 = 0.25;
/// A local peak of |f| that grows by this factor under refinement is a pole.
const POLE_GROWTH: f64 = 1e8;
const POLE_SEARCH_STEPS: usize = 100;
/// Relative agreement needed to keep a closed-form value across a singular point.
const AGREEMENT: f64 = 1e-6;

/// (value, error estimate, method)
type Estimate = (Option<f64>, Option<f64>, IntegrationMethod);

/// What the probe grid found strictly between the bounds.
enum Interior {
    Regular,
    Singular(Vec<f64>),
    Gap(f64),
}

/// Ternary search for the peak of |f| on `[a, b]`; the peak is a pole when |f| is not
/// finite there or grows far beyond the probe value `reference`.
fn locate_pole(f: &Lambda1D, a: f64, b: f64, reference: f64) -> Option<f64> {
    let (mut lo, mut hi) = (a, b);
    for _ in 0..POLE_SEARCH_STEPS {
        let m1 = lo + (hi - lo) / 3.0;
        let m2 = hi - (hi - lo) / 3.0;
        let (f1, f2) = (f(m1).abs(), f(m2).abs());
        if !f1.is_finite() {
            return Some(m1);
        }
        if !f2.is_finite() {
            return Some(m2);
        }
        if f1 < f2 {
            lo = m1;
        } else {
            hi = m2;
        }
        if m1 >= m2 {
            break;
        }
    }
    let peak = 0.5 * (lo + hi);
    let value = f(peak).abs();
    if !value.is_finite() || value > POLE_GROWTH * reference.max(1.0) {
        Some(peak)
    } else {
        None
    }
}

/// Integration bounds, `lower <= upper` and both finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    lower: f64,
    upper: f64,
}

impl Bounds {
    /// Fails with `BoundsError` iff a bound is not finite or `lower > upper`.
    pub fn new(lower: f64, upper: f64) -> Result<Bounds, BoundsError> {
        if !lower.is_finite() || !upper.is_finite() {
            return Err(BoundsError::NotFinite { lower, upper });
        }
        if lower > upper {
            return Err(BoundsError::Reversed { lower, upper });
        }
        Ok(Bounds { lower, upper })
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn is_empty(&self) -> bool {
        self.lower == self.upper
    }
}

/// The x-interval shown in the plot and the number of samples taken across it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayRange {
    pub x_min: f64,
    pub x_max: f64,
    pub samples: usize,
}

impl DisplayRange {
    pub fn new(x_min: f64, x_max: f64, samples: usize) -> Result<DisplayRange, PipelineError> {
        if !(x_min.is_finite() && x_max.is_finite()) || x_min >= x_max || samples < 2 {
            return Err(PipelineError::DisplayRange { x_min, x_max, samples });
        }
        Ok(DisplayRange { x_min, x_max, samples })
    }

    /// The bounds padded by a quarter of their width on each side, or by 1 for empty bounds.
    pub fn around(bounds: &Bounds, samples: usize) -> DisplayRange {
        let padding = if bounds.is_empty() {
            1.0
        } else {
            DISPLAY_PADDING * bounds.width()
        };
        DisplayRange {
            x_min: bounds.lower() - padding,
            x_max: bounds.upper() + padding,
            samples: samples.max(2),
        }
    }
}

/// Evenly spaced samples of the expression; `None` marks an undefined point.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    pub x: Vec<f64>,
    pub y: Vec<Option<f64>>,
}

impl SampleSet {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// x positions where the expression is undefined.
    pub fn undefined_points(&self) -> Vec<f64> {
        self.x
            .iter()
            .zip(&self.y)
            .filter(|(_, y)| y.is_none())
            .map(|(x, _)| *x)
            .collect()
    }

    /// Runs of consecutive defined points, the pieces a plot draws as separate lines.
    pub fn defined_segments(&self) -> Vec<Vec<(f64, f64)>> {
        let mut segments = Vec::new();
        let mut current = Vec::new();
        for (x, y) in self.x.iter().zip(&self.y) {
            match y {
                Some(y) => current.push((*x, *y)),
                None => {
                    if !current.is_empty() {
                        segments.push(std::mem::take(&mut current));
                    }
                }
            }
        }
        if !current.is_empty() {
            segments.push(current);
        }
        segments
    }

    /// Smallest and largest defined value.
    pub fn y_range(&self) -> Option<(f64, f64)> {
        self.y.iter().flatten().fold(None, |acc, &y| match acc {
            None => Some((y, y)),
            Some((lo, hi)) => Some((lo.min(y), hi.max(y))),
        })
    }
}

/// How the value of an [`IntegralResult`] was obtained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntegrationMethod {
    /// antiderivative evaluated at the bounds
    Exact,
    Quadrature(QuadMethod),
    /// `lower == upper`
    ZeroWidth,
    /// the integrand is undefined on a stretch inside the bounds, nothing was computed
    NotComputed,
}

impl fmt::Display for IntegrationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrationMethod::Exact => write!(f, "exact (antiderivative)"),
            IntegrationMethod::Quadrature(method) => write!(f, "{} quadrature", method),
            IntegrationMethod::ZeroWidth => write!(f, "zero-width interval"),
            IntegrationMethod::NotComputed => write!(f, "not computed"),
        }
    }
}

/// Definite integral over validated bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegralResult<X> {
    pub bounds: Bounds,
    /// absent when no closed form exists
    pub antiderivative: Option<X>,
    pub antiderivative_latex: Option<String>,
    /// absent when the integral does not exist
    pub value: Option<f64>,
    /// absolute error estimate of a quadrature value
    pub error_estimate: Option<f64>,
    pub method: IntegrationMethod,
    /// typeset statement of the result
    pub display: String,
    pub notes: Vec<Note>,
}

/// Everything one request produces.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput<X> {
    pub expression: X,
    pub variable: String,
    pub expression_latex: String,
    pub display_range: DisplayRange,
    pub samples: SampleSet,
    pub integral: IntegralResult<X>,
}

impl<X> PipelineOutput<X> {
    /// Notes from sampling and integration, in that order.
    pub fn notes(&self) -> &[Note] {
        &self.integral.notes
    }
}

pub struct ExpressionPipeline<E: SymbolicEngine = NativeEngine> {
    engine: E,
    variable: String,
    quadrature: QuadratureSettings,
    probe_points: usize,
}

impl<E: SymbolicEngine> ExpressionPipeline<E> {
    pub fn new(engine: E, variable: &str) -> Self {
        ExpressionPipeline {
            engine,
            variable: variable.to_string(),
            quadrature: QuadratureSettings::default(),
            probe_points: DEFAULT_PROBE_POINTS,
        }
    }

    pub fn with_quadrature(mut self, settings: QuadratureSettings) -> Self {
        self.quadrature = settings;
        self
    }

    pub fn with_probe_points(mut self, probe_points: usize) -> Self {
        self.probe_points = probe_points.max(2);
        self
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Parses and validates the expression against the declared variable.
    pub fn parse(&self, text: &str) -> Result<E::Expression, PipelineError> {
        let expr = self.engine.parse(text, &self.variable)?;
        debug!("parsed `{}` as `{}` with the {} engine", text, expr, self.engine.name());
        Ok(expr)
    }

    /// Evaluates the expression at `range.samples` evenly spaced points.
    ///
    /// NaN and infinite values are recorded as undefined; the second element reports them.
    pub fn sample(
        &self,
        expr: &E::Expression,
        range: &DisplayRange,
    ) -> (SampleSet, Option<DomainError>) {
        let f = self.engine.evaluator(expr, &self.variable);
        let x = linspace(range.x_min, range.x_max, range.samples);
        let y: Vec<Option<f64>> = x
            .iter()
            .map(|&xi| {
                let yi = f(xi);
                if yi.is_finite() { Some(yi) } else { None }
            })
            .collect();
        let samples = SampleSet { x, y };
        let undefined = samples.undefined_points();
        let domain = if undefined.is_empty() {
            None
        } else {
            warn!(
                "`{}` is undefined at {} of {} sample points",
                expr,
                undefined.len(),
                samples.len()
            );
            Some(DomainError {
                expression: expr.to_string(),
                variable: self.variable.clone(),
                points: undefined,
            })
        };
        (samples, domain)
    }

    /// Looks for points strictly between the bounds where the integrand is undefined or
    /// has a pole that falls between two probe points.
    fn interior_singularities(&self, f: &Lambda1D, bounds: &Bounds) -> Interior {
        let grid = linspace(bounds.lower(), bounds.upper(), self.probe_points);
        let values: Vec<f64> = grid.iter().map(|&x| f(x)).collect();
        let mut points = Vec::new();
        for i in 1..grid.len().saturating_sub(1) {
            let (left, centre, right) = (values[i - 1], values[i], values[i + 1]);
            if !centre.is_finite() {
                if !left.is_finite() || !right.is_finite() {
                    // two undefined probe points in a row: a gap in the domain, not a point
                    return Interior::Gap(grid[i]);
                }
                points.push(grid[i]);
                continue;
            }
            let (l, c, r) = (left.abs(), centre.abs(), right.abs());
            if l.is_finite() && r.is_finite() && c > l && c >= r {
                if let Some(pole) = locate_pole(f, grid[i - 1], grid[i + 1], c) {
                    points.push(pole);
                }
            }
        }
        points.retain(|p| *p > bounds.lower() && *p < bounds.upper());
        points.sort_by(f64::total_cmp);
        points.dedup();
        if points.is_empty() {
            Interior::Regular
        } else {
            Interior::Singular(points)
        }
    }

    /// Definite integral of `expr` over `bounds`.
    pub fn integrate(
        &self,
        expr: &E::Expression,
        bounds: &Bounds,
    ) -> Result<IntegralResult<E::Expression>, PipelineError> {
        let var = self.variable.as_str();
        let mut notes = Vec::new();
        let antiderivative = match self.engine.antiderivative(expr, var) {
            Ok(antiderivative) => {
                info!("antiderivative of `{}`: `{}`", expr, antiderivative);
                Some(antiderivative)
            }
            Err(e) => {
                info!("{}", e);
                None
            }
        };

        let (value, error_estimate, method) = if bounds.is_empty() {
            (Some(0.0), None, IntegrationMethod::ZeroWidth)
        } else {
            let f = self.engine.evaluator(expr, var);
            match self.interior_singularities(&f, bounds) {
                Interior::Gap(at) => {
                    warn!("`{}` is undefined around {} = {} inside the bounds", expr, var, at);
                    notes.push(Note::UndefinedInsideBounds { at });
                    (None, None, IntegrationMethod::NotComputed)
                }
                Interior::Singular(points) => {
                    warn!("`{}` is singular at {:?} inside the bounds", expr, points);
                    self.improper(expr, antiderivative.as_ref(), bounds, points, &mut notes)?
                }
                Interior::Regular => {
                    self.regular(expr, antiderivative.as_ref(), bounds, &mut notes)?
                }
            }
        };
        let display = self.typeset_result(expr, antiderivative.as_ref(), bounds, value);
        let antiderivative_latex = antiderivative.as_ref().map(|anti| self.engine.typeset(anti));
        info!("integral over [{}, {}]: {:?} ({})", bounds.lower(), bounds.upper(), value, method);
        Ok(IntegralResult {
            bounds: *bounds,
            antiderivative,
            antiderivative_latex,
            value,
            error_estimate,
            method,
            display,
            notes,
        })
    }

    /// Integrand defined everywhere inside the bounds: the closed form if it is finite,
    /// quadrature otherwise.
    fn regular(
        &self,
        expr: &E::Expression,
        antiderivative: Option<&E::Expression>,
        bounds: &Bounds,
        notes: &mut Vec<Note>,
    ) -> Result<Estimate, PipelineError> {
        let var = self.variable.as_str();
        match antiderivative.map(|anti| {
            self.engine
                .evaluate_between(anti, var, bounds.lower(), bounds.upper())
        }) {
            Some(Ok(value)) => return Ok((Some(value), None, IntegrationMethod::Exact)),
            Some(Err(e)) => {
                warn!("{}", e);
                notes.push(Note::SingularAntiderivative);
            }
            None => notes.push(Note::NoClosedForm(NoClosedFormWarning {
                expression: expr.to_string(),
                method: self.quadrature.method,
            })),
        }
        let method = IntegrationMethod::Quadrature(self.quadrature.method);
        match self.quadrature_over(expr, &[bounds.lower(), bounds.upper()], notes)? {
            Some((value, error)) => Ok((Some(value), error, method)),
            None => Ok((None, None, method)),
        }
    }

    /// Integrand singular at `points` inside the bounds: an improper integral, split at
    /// every singular point. The closed form is kept when it agrees with the pieces.
    fn improper(
        &self,
        expr: &E::Expression,
        antiderivative: Option<&E::Expression>,
        bounds: &Bounds,
        points: Vec<f64>,
        notes: &mut Vec<Note>,
    ) -> Result<Estimate, PipelineError> {
        let mut breaks = Vec::with_capacity(points.len() + 2);
        breaks.push(bounds.lower());
        breaks.extend(points.iter().copied());
        breaks.push(bounds.upper());
        let method = IntegrationMethod::Quadrature(self.quadrature.method);
        let Some((value, error)) = self.quadrature_over(expr, &breaks, notes)? else {
            notes.push(Note::InteriorSingularity { points, integrable: false });
            return Ok((None, None, method));
        };
        notes.push(Note::InteriorSingularity { points, integrable: true });
        let exact = antiderivative.and_then(|anti| {
            self.engine
                .evaluate_between(anti, &self.variable, bounds.lower(), bounds.upper())
                .ok()
        });
        match exact {
            Some(exact) if (exact - value).abs() <= AGREEMENT * value.abs().max(1.0) => {
                Ok((Some(exact), None, IntegrationMethod::Exact))
            }
            _ => {
                if antiderivative.is_none() {
                    notes.push(Note::NoClosedForm(NoClosedFormWarning {
                        expression: expr.to_string(),
                        method: self.quadrature.method,
                    }));
                }
                Ok((Some(value), error, method))
            }
        }
    }

    /// Sum of quadratures over consecutive `breaks`; `None` when a piece does not converge.
    fn quadrature_over(
        &self,
        expr: &E::Expression,
        breaks: &[f64],
        notes: &mut Vec<Note>,
    ) -> Result<Option<(f64, Option<f64>)>, PipelineError> {
        let mut total = 0.0;
        let mut total_error: Option<f64> = Some(0.0);
        for piece in breaks.windows(2) {
            let result = self.engine.quadrature(
                expr,
                &self.variable,
                piece[0],
                piece[1],
                &self.quadrature,
            )?;
            debug!(
                "quadrature over [{}, {}]: value {}, error {}, {} intervals",
                piece[0], piece[1], result.value, result.error, result.intervals
            );
            if !result.converged {
                warn!("quadrature did not converge over [{}, {}]", piece[0], piece[1]);
                notes.push(Note::QuadratureNotConverged {
                    estimate: result.value,
                    error: result.error,
                });
                return Ok(None);
            }
            total += result.value;
            total_error = match (total_error, result.error.is_nan()) {
                (Some(acc), false) => Some(acc + result.error),
                _ => None,
            };
        }
        Ok(Some((total, total_error)))
    }

    /// `\int_a^b f\,dx = \left[F\right]_a^b = v` with the parts that exist.
    fn typeset_result(
        &self,
        expr: &E::Expression,
        antiderivative: Option<&E::Expression>,
        bounds: &Bounds,
        value: Option<f64>,
    ) -> String {
        let mut display = format!(
            "\\int_{{{}}}^{{{}}} {} \\, d{}",
            bounds.lower(),
            bounds.upper(),
            self.engine.typeset(expr),
            self.variable
        );
        if let Some(anti) = antiderivative {
            display.push_str(&format!(
                " = \\left[{}\\right]_{{{}}}^{{{}}}",
                self.engine.typeset(anti),
                bounds.lower(),
                bounds.upper()
            ));
        }
        match value {
            Some(v) if antiderivative.is_some() => display.push_str(&format!(" = {}", v)),
            Some(v) => display.push_str(&format!(" \\approx {}", v)),
            None => {}
        }
        display
    }

    /// Runs a full request: bounds check, parse, sampling, integration.
    ///
    /// `BoundsError` is returned before anything else is attempted.
    pub fn run(
        &self,
        text: &str,
        lower: f64,
        upper: f64,
        display: Option<DisplayRange>,
    ) -> Result<PipelineOutput<E::Expression>, PipelineError> {
        let bounds = Bounds::new(lower, upper)?;
        let expression = self.parse(text)?;
        let display_range = display.unwrap_or_else(|| DisplayRange::around(&bounds, DEFAULT_SAMPLES));
        let (samples, domain) = self.sample(&expression, &display_range);
        let mut integral = self.integrate(&expression, &bounds)?;
        if let Some(domain) = domain {
            integral.notes.insert(0, Note::Domain(domain));
        }
        Ok(PipelineOutput {
            expression_latex: self.engine.typeset(&expression),
            expression,
            variable: self.variable.clone(),
            display_range,
            samples,
            integral,
        })
    }
}

impl Default for ExpressionPipeline<NativeEngine> {
    fn default() -> Self {
        ExpressionPipeline::new(NativeEngine, "x")
    }
}
