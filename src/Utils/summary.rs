/*
Pretty printing of a pipeline result as a key/value table for the terminal.
*/
use crate::pipeline::PipelineOutput;
use std::fmt::Display;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Debug, PartialEq, Tabled)]
pub struct ResultRow {
    key: &'static str,
    value: String,
}

pub fn summary_rows<X: Display>(output: &PipelineOutput<X>) -> Vec<ResultRow> {
    let integral = &output.integral;
    let undefined = output.samples.undefined_points().len();
    let mut rows = vec![
        ResultRow { key: "Expression", value: output.expression.to_string() },
        ResultRow { key: "Variable", value: output.variable.clone() },
        ResultRow {
            key: "Bounds",
            value: format!("[{}, {}]", integral.bounds.lower(), integral.bounds.upper()),
        },
        ResultRow {
            key: "Antiderivative",
            value: integral
                .antiderivative
                .as_ref()
                .map(|anti| format!("{} + C", anti))
                .unwrap_or_else(|| "no closed form".to_string()),
        },
        ResultRow {
            key: "Value",
            value: integral
                .value
                .map(|v| v.to_string())
                .unwrap_or_else(|| "does not exist".to_string()),
        },
        ResultRow { key: "Method", value: integral.method.to_string() },
    ];
    if let Some(error) = integral.error_estimate {
        rows.push(ResultRow { key: "Error estimate", value: format!("{:.3e}", error) });
    }
    rows.push(ResultRow {
        key: "Samples",
        value: format!(
            "{} on [{}, {}], {} undefined",
            output.samples.len(),
            output.display_range.x_min,
            output.display_range.x_max,
            undefined
        ),
    });
    for note in output.notes() {
        rows.push(ResultRow { key: "Note", value: note.to_string() });
    }
    rows
}

pub fn summary_table<X: Display>(output: &PipelineOutput<X>) -> String {
    let mut table = Table::new(summary_rows(output));
    table.with(Style::modern_rounded());
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ExpressionPipeline;

    #[test]
    fn test_summary_of_exact_result() {
        let output = ExpressionPipeline::default().run("x**2", 0.0, 1.0, None).unwrap();
        let rows = summary_rows(&output);
        assert!(rows.contains(&ResultRow { key: "Antiderivative", value: "x**3/3 + C".to_string() }));
        assert!(rows.contains(&ResultRow { key: "Method", value: "exact (antiderivative)".to_string() }));
        assert!(!rows.iter().any(|row| row.key == "Note"));
        let table = summary_table(&output);
        assert!(table.contains("x**3/3 + C"));
        assert!(table.contains('╭'));
    }

    #[test]
    fn test_summary_lists_notes() {
        let output = ExpressionPipeline::default().run("1/x", -1.0, 1.0, None).unwrap();
        let rows = summary_rows(&output);
        assert!(rows.contains(&ResultRow { key: "Value", value: "does not exist".to_string() }));
        assert!(rows.iter().filter(|row| row.key == "Note").count() >= 2);
        let samples = rows.iter().find(|row| row.key == "Samples").unwrap();
        assert!(samples.value.ends_with("1 undefined"));
    }
}
