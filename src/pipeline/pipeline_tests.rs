use crate::pipeline::*;
use crate::symbolic::parse_expr::{ParseError, ParseErrorKind};
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_integration::{
    IntegrationError, QuadMethod, QuadratureResult, QuadratureSettings,
};
use crate::symbolic::symbolic_lambdify::Lambda1D;
use std::cell::Cell;
//___________________________________TESTS____________________________________

/// Native engine that counts how often it is asked to parse.
#[derive(Default)]
struct CountingEngine {
    parses: Cell<usize>,
    inner: NativeEngine,
}

impl SymbolicEngine for CountingEngine {
    type Expression = Expr;

    fn name(&self) -> &'static str {
        "counting"
    }
    fn parse(&self, text: &str, variable: &str) -> Result<Expr, ParseError> {
        self.parses.set(self.parses.get() + 1);
        self.inner.parse(text, variable)
    }
    fn evaluator(&self, expr: &Expr, variable: &str) -> Lambda1D {
        self.inner.evaluator(expr, variable)
    }
    fn antiderivative(&self, expr: &Expr, variable: &str) -> Result<Expr, IntegrationError> {
        self.inner.antiderivative(expr, variable)
    }
    fn evaluate_between(
        &self,
        antiderivative: &Expr,
        variable: &str,
        lower: f64,
        upper: f64,
    ) -> Result<f64, IntegrationError> {
        self.inner.evaluate_between(antiderivative, variable, lower, upper)
    }
    fn quadrature(
        &self,
        expr: &Expr,
        variable: &str,
        lower: f64,
        upper: f64,
        settings: &QuadratureSettings,
    ) -> Result<QuadratureResult, IntegrationError> {
        self.inner.quadrature(expr, variable, lower, upper, settings)
    }
    fn typeset(&self, expr: &Expr) -> String {
        self.inner.typeset(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pipeline() -> ExpressionPipeline {
        ExpressionPipeline::default()
    }

    fn integral_of(text: &str, lower: f64, upper: f64) -> IntegralResult<Expr> {
        pipeline().run(text, lower, upper, None).unwrap().integral
    }

    #[test]
    fn test_polynomial_exact() {
        let output = pipeline().run("x**2", 0.0, 1.0, None).unwrap();
        let integral = &output.integral;
        assert_eq!(integral.antiderivative.as_ref().unwrap().to_string(), "x**3/3");
        assert_relative_eq!(integral.value.unwrap(), 1.0 / 3.0, epsilon = 1e-15);
        assert_eq!(integral.method, IntegrationMethod::Exact);
        assert!(output.notes().is_empty());
        assert_eq!(output.expression_latex, "x^{2}");
        assert!(integral.display.starts_with("\\int_{0}^{1} x^{2} \\, dx"));
        assert!(integral.display.contains("\\left[\\frac{x^{3}}{3}\\right]_{0}^{1}"));
    }

    #[test]
    fn test_sum_of_sine_and_square() {
        let integral = integral_of("sin(x) + x**2", 0.0, 2.0);
        assert_eq!(
            integral.antiderivative.as_ref().unwrap().to_string(),
            "-cos(x) + x**3/3"
        );
        let expected = 1.0 - 2.0_f64.cos() + 8.0 / 3.0;
        assert_relative_eq!(integral.value.unwrap(), expected, epsilon = 1e-12);
        assert_relative_eq!(integral.value.unwrap(), 4.0828, epsilon = 1e-4);
        assert_eq!(integral.method, IntegrationMethod::Exact);
    }

    #[test]
    fn test_square_root_of_quadratic() {
        let integral = integral_of("sqrt(x**2 - 1)", 1.0, 2.0);
        let root = 3.0_f64.sqrt();
        let expected = root - (2.0 + root).ln() / 2.0;
        assert_eq!(integral.method, IntegrationMethod::Exact);
        assert!(integral.antiderivative.is_some());
        assert_relative_eq!(integral.value.unwrap(), expected, epsilon = 1e-12);
        // only the undefined plot samples left of x = 1 are reported
        assert!(matches!(integral.notes.as_slice(), [Note::Domain(_)]));
    }

    #[test]
    fn test_reciprocal_across_zero() {
        let output = pipeline().run("1/x", -1.0, 1.0, None).unwrap();
        // sampling flags the pole instead of failing
        let undefined = output.samples.undefined_points();
        assert_eq!(undefined, vec![0.0]);
        assert_eq!(output.samples.len(), DEFAULT_SAMPLES);
        match &output.notes()[0] {
            Note::Domain(domain) => {
                assert_eq!(domain.points, vec![0.0]);
                assert_eq!(domain.variable, "x");
            }
            other => panic!("expected a domain note, got {:?}", other),
        }
        // the integral does not exist
        let integral = &output.integral;
        assert_eq!(integral.value, None);
        assert!(integral.notes.contains(&Note::InteriorSingularity {
            points: vec![0.0],
            integrable: false
        }));
        assert_eq!(
            integral.antiderivative.as_ref().unwrap().to_string(),
            "log(Abs(x))"
        );
    }

    #[test]
    fn test_pole_between_probe_points() {
        // ln(2) would come out of the antiderivative, but the integral diverges
        let integral = integral_of("1/x", -1.0, 2.0);
        assert_eq!(integral.value, None);
        assert!(integral.notes.iter().any(|note| matches!(
            note,
            Note::InteriorSingularity { integrable: false, .. }
        )));

        let integral = integral_of("tan(x)", 0.0, 2.0);
        assert_eq!(integral.value, None);
        let points = integral
            .notes
            .iter()
            .find_map(|note| match note {
                Note::InteriorSingularity { points, .. } => Some(points.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(points.len(), 1);
        assert_relative_eq!(points[0], std::f64::consts::FRAC_PI_2, epsilon = 1e-9);
    }

    #[test]
    fn test_integrable_interior_singularity() {
        let integral = integral_of("ln(Abs(x))", -1.0, 1.0);
        assert_relative_eq!(integral.value.unwrap(), -2.0, epsilon = 1e-7);
        assert!(integral.notes.contains(&Note::InteriorSingularity {
            points: vec![0.0],
            integrable: true
        }));

        // removable singularity at 0, no closed form
        let integral = integral_of("sin(x)/x", -1.0, 1.0);
        assert_relative_eq!(integral.value.unwrap(), 1.892_166_140_734_366_2, epsilon = 1e-8);
        assert_eq!(integral.method, IntegrationMethod::Quadrature(QuadMethod::Adaptive));
        assert!(integral
            .notes
            .iter()
            .any(|note| matches!(note, Note::NoClosedForm(_))));
    }

    #[test]
    fn test_undefined_stretch_inside_bounds() {
        let integral = integral_of("sqrt(x)", -1.0, 1.0);
        assert_eq!(integral.value, None);
        assert_eq!(integral.method, IntegrationMethod::NotComputed);
        assert!(matches!(integral.notes.last(), Some(Note::UndefinedInsideBounds { .. })));
    }

    #[test]
    fn test_parse_error_names_the_sequence() {
        let err = pipeline().run("x +* 2", 0.0, 1.0, None).unwrap_err();
        match err {
            PipelineError::Parse(parse) => {
                assert_eq!(
                    parse.kind,
                    ParseErrorKind::UnexpectedToken {
                        sequence: "+*".to_string()
                    }
                );
                assert!(parse.to_string().contains("+*"));
            }
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_oversized_input_is_a_parse_error() {
        let long_sum = vec!["x"; 1000].join(" + ");
        let err = pipeline().run(&long_sum, 0.0, 1.0, None).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Parse(ParseError { kind: ParseErrorKind::TooLarge(_), .. })
        ));
        let deep = format!("{}x{}", "(".repeat(300), ")".repeat(300));
        let err = pipeline().run(&deep, 0.0, 1.0, None).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Parse(ParseError { kind: ParseErrorKind::TooDeep(_), .. })
        ));

        let output = pipeline().run(&vec!["x"; 128].join(" + "), 0.0, 1.0, None).unwrap();
        assert_relative_eq!(output.integral.value.unwrap(), 64.0, epsilon = 1e-9);
    }

    #[test]
    fn test_unknown_symbol_is_rejected() {
        let err = pipeline().run("x + y", 0.0, 1.0, None).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Parse(ParseError {
                kind: ParseErrorKind::UnknownSymbol { .. },
                ..
            })
        ));
        // another declared variable accepts it
        let t = ExpressionPipeline::new(NativeEngine, "t");
        assert!(t.run("t**2", 0.0, 1.0, None).is_ok());
        assert!(t.run("x**2", 0.0, 1.0, None).is_err());
    }

    #[test]
    fn test_equal_bounds_give_zero() {
        let integral = integral_of("x**2", 1.5, 1.5);
        assert_eq!(integral.value, Some(0.0));
        assert_eq!(integral.method, IntegrationMethod::ZeroWidth);
        assert!(integral.antiderivative.is_some());

        // even where the integrand is undefined
        let integral = integral_of("1/x", 0.0, 0.0);
        assert_eq!(integral.value, Some(0.0));
    }

    #[test]
    fn test_reversed_bounds() {
        let err = pipeline().run("x**2", 2.0, 1.0, None).unwrap_err();
        assert_eq!(
            err,
            PipelineError::Bounds(BoundsError::Reversed {
                lower: 2.0,
                upper: 1.0
            })
        );
        let err = pipeline().run("x", f64::NAN, 1.0, None).unwrap_err();
        assert!(matches!(err, PipelineError::Bounds(BoundsError::NotFinite { .. })));
    }

    #[test]
    fn test_bounds_checked_before_parsing() {
        let pipeline = ExpressionPipeline::new(CountingEngine::default(), "x");
        let err = pipeline.run("x +* 2", 3.0, 1.0, None).unwrap_err();
        assert!(matches!(err, PipelineError::Bounds(_)));
        assert_eq!(pipeline.engine().parses.get(), 0);
        assert!(pipeline.run("x", 0.0, 1.0, None).is_ok());
        assert_eq!(pipeline.engine().parses.get(), 1);
    }

    #[test]
    fn test_no_closed_form_goes_to_quadrature() {
        let integral = integral_of("exp(-x**2)", -2.0, 3.0);
        assert!(integral.antiderivative.is_none());
        assert_relative_eq!(integral.value.unwrap(), 1.768_288_739_021_942_6, epsilon = 1e-9);
        assert_eq!(integral.method, IntegrationMethod::Quadrature(QuadMethod::Adaptive));
        assert!(integral.error_estimate.unwrap() < 1e-8);
        match &integral.notes[..] {
            [Note::NoClosedForm(warning)] => {
                assert_eq!(warning.method, QuadMethod::Adaptive);
                assert_eq!(warning.expression, "exp(-x**2)");
            }
            other => panic!("unexpected notes {:?}", other),
        }
        assert!(integral.display.contains("\\approx"));
    }

    #[test]
    fn test_other_quadrature_methods() {
        for method in [QuadMethod::GaussLegendre, QuadMethod::Simpson] {
            let settings = QuadratureSettings {
                method,
                degree: 50,
                ..QuadratureSettings::default()
            };
            let pipeline = ExpressionPipeline::default().with_quadrature(settings);
            let integral = pipeline.run("exp(-x**2)", 0.0, 1.0, None).unwrap().integral;
            assert_eq!(integral.method, IntegrationMethod::Quadrature(method));
            assert_relative_eq!(integral.value.unwrap(), 0.746_824_132_812_427, epsilon = 1e-7);
        }
    }

    #[test]
    fn test_antiderivative_singular_at_bound() {
        let integral = integral_of("ln(x)", 0.0, 1.0);
        assert!(integral.antiderivative.is_some());
        assert!(integral.notes.contains(&Note::SingularAntiderivative));
        assert_relative_eq!(integral.value.unwrap(), -1.0, epsilon = 1e-7);
        assert_eq!(integral.method, IntegrationMethod::Quadrature(QuadMethod::Adaptive));
    }

    #[test]
    fn test_divergent_at_bound() {
        let integral = integral_of("1/x", 0.0, 1.0);
        assert_eq!(integral.value, None);
        assert!(integral
            .notes
            .iter()
            .any(|note| matches!(note, Note::QuadratureNotConverged { .. })));
    }

    #[test]
    fn test_display_range() {
        let bounds = Bounds::new(0.0, 2.0).unwrap();
        let range = DisplayRange::around(&bounds, 11);
        assert_eq!(range, DisplayRange { x_min: -0.5, x_max: 2.5, samples: 11 });
        let empty = Bounds::new(3.0, 3.0).unwrap();
        let range = DisplayRange::around(&empty, 1);
        assert_eq!((range.x_min, range.x_max, range.samples), (2.0, 4.0, 2));

        assert!(DisplayRange::new(1.0, 1.0, 10).is_err());
        assert!(DisplayRange::new(0.0, 1.0, 1).is_err());
        assert!(DisplayRange::new(0.0, f64::INFINITY, 10).is_err());

        let custom = DisplayRange::new(-4.0, 4.0, 9).unwrap();
        let output = pipeline().run("x", 0.0, 1.0, Some(custom)).unwrap();
        assert_eq!(output.samples.x, vec![-4.0, -3.0, -2.0, -1.0, 0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_sampling_flags_undefined_points() {
        let pipeline = pipeline();
        let expr = pipeline.parse("sqrt(x)").unwrap();
        let range = DisplayRange::new(-1.0, 1.0, 5).unwrap();
        let (samples, domain) = pipeline.sample(&expr, &range);
        assert_eq!(samples.y[0], None);
        assert_eq!(samples.y[1], None);
        assert_eq!(samples.y[2], Some(0.0));
        assert_relative_eq!(samples.y[4].unwrap(), 1.0);
        assert_eq!(domain.unwrap().points, vec![-1.0, -0.5]);
        assert_eq!(samples.y_range(), Some((0.0, 1.0)));

        let expr = pipeline.parse("1/x").unwrap();
        let (samples, domain) = pipeline.sample(&expr, &range);
        assert!(domain.is_some());
        let segments = samples.defined_segments();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0], vec![(-1.0, -1.0), (-0.5, -2.0)]);
        assert_eq!(segments[1], vec![(0.5, 2.0), (1.0, 1.0)]);

        let expr = pipeline.parse("x**2").unwrap();
        let (samples, domain) = pipeline.sample(&expr, &range);
        assert!(domain.is_none());
        assert_eq!(samples.defined_segments().len(), 1);
    }

    #[test]
    fn test_fundamental_theorem() {
        // d/db of the integral from 0 to b is the integrand at b
        let h = 1e-5;
        for (text, tolerance) in [("x*exp(-x)", 1e-6), ("sin(x) + x**2", 1e-6), ("exp(-x**2)", 1e-4)]
        {
            let pipeline = pipeline();
            let expr = pipeline.parse(text).unwrap();
            let f = expr.lambdify1D("x");
            for b in [0.5, 1.0, 2.5] {
                let above = pipeline.integrate(&expr, &Bounds::new(0.0, b + h).unwrap()).unwrap();
                let below = pipeline.integrate(&expr, &Bounds::new(0.0, b - h).unwrap()).unwrap();
                let slope = (above.value.unwrap() - below.value.unwrap()) / (2.0 * h);
                assert_relative_eq!(slope, f(b), epsilon = tolerance);
            }
        }
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn bounds_error_iff_lower_above_upper(a in -1e3f64..1e3, b in -1e3f64..1e3) {
            let result = ExpressionPipeline::default().run("3*x**2 - x", a, b, None);
            match result {
                Err(PipelineError::Bounds(BoundsError::Reversed { .. })) => prop_assert!(a > b),
                Ok(output) => {
                    prop_assert!(a <= b);
                    let anti = |x: f64| x.powi(3) - x * x / 2.0;
                    let scale = anti(a).abs().max(anti(b).abs()).max(1.0);
                    let value = output.integral.value.unwrap();
                    prop_assert!((value - (anti(b) - anti(a))).abs() <= 1e-9 * scale);
                }
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }

        #[test]
        fn reversing_bounds_is_rejected(a in -50.0f64..50.0, width in 1e-6f64..10.0) {
            let pipeline = ExpressionPipeline::default();
            let forward = pipeline.run("sin(x)", a, a + width, None);
            prop_assert!(forward.is_ok());
            let backward = pipeline.run("sin(x)", a + width, a, None);
            prop_assert!(matches!(backward, Err(PipelineError::Bounds(_))), "backward run was not rejected");
        }
    }
}
