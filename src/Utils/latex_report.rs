//! Step-by-step solution document for a definite integral, with optional PDF compilation.
//!
//! The document is a standalone `article`: the integral statement, the antiderivative (or the
//! quadrature method when there is none), the evaluation at the bounds and the final value.
//! [`compile_pdf`] runs `pdflatex`; without it the `.tex` file is the artefact.
use crate::pipeline::{IntegrationMethod, PipelineOutput};
use chrono::Local;
use log::{info, warn};
use std::fmt::{self, Write as _};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;

pub const PDFLATEX: &str = "pdflatex";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("LaTeX compiler `{0}` not found, the .tex file is kept instead")]
    CompilerNotFound(String),
    #[error("LaTeX compilation of {path} failed ({status})")]
    CompilationFailed { path: PathBuf, status: String },
    #[error("cannot write report: {0}")]
    Io(#[from] io::Error),
}

const PREAMBLE: &str = r"\documentclass{article}
\usepackage{amsmath}
\usepackage{geometry}
\geometry{margin=1in}

\begin{document}

\begin{center}
    \Large \textbf{Step-by-Step Integral Evaluation}
\end{center}
";

/// Escapes text for LaTeX paragraph mode.
pub fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str(r"\textbackslash{}"),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '~' => escaped.push_str(r"\textasciitilde{}"),
            '^' => escaped.push_str(r"\textasciicircum{}"),
            '`' => escaped.push('\''),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Full `.tex` source for one pipeline result.
pub fn build_document<X>(output: &PipelineOutput<X>) -> String {
    let mut doc = String::from(PREAMBLE);
    if let Err(e) = write_body(&mut doc, output) {
        warn!("LaTeX document is incomplete: {}", e);
    }
    doc
}

fn write_body<X>(doc: &mut String, output: &PipelineOutput<X>) -> fmt::Result {
    let integral = &output.integral;
    let (a, b) = (integral.bounds.lower(), integral.bounds.upper());
    let var = &output.variable;
    let f = &output.expression_latex;
    let definite = format!(r"\int_{{{}}}^{{{}}} {} \, d{}", a, b, f, var);

    writeln!(
        doc,
        "\\begin{{center}}\n    \\small {}\n\\end{{center}}\n",
        Local::now().format("%Y-%m-%d %H:%M")
    )?;
    writeln!(doc, "\\vspace{{0.5cm}}\n\\textbf{{Evaluate the integral:}}")?;
    writeln!(doc, "$$ I = {} $$\n", definite)?;
    writeln!(doc, "\\textbf{{Solution:}}\n")?;

    if integral.method == IntegrationMethod::ZeroWidth {
        writeln!(
            doc,
            "The lower and upper bounds coincide, so the integral vanishes:\n$$ I = 0 $$\n"
        )?;
    } else {
        writeln!(doc, "\\textbf{{Step 1: Antiderivative}} \\\\")?;
        match &integral.antiderivative_latex {
            Some(anti) => {
                writeln!(doc, "$$ \\int {} \\, d{} = {} + C $$\n", f, var, anti)?;
                writeln!(doc, "\\textbf{{Step 2: Evaluate at the bounds}} \\\\")?;
                match (integral.method, integral.value) {
                    (IntegrationMethod::Exact, Some(value)) => writeln!(
                        doc,
                        "$$ I = \\left[{}\\right]_{{{}}}^{{{}}} = {} $$\n",
                        anti, a, b, value
                    )?,
                    (IntegrationMethod::Quadrature(method), Some(value)) => writeln!(
                        doc,
                        "The antiderivative cannot be evaluated directly on $[{}, {}]$, so the \
                         value is computed by {}:\n$$ I \\approx {} $$\n",
                        a,
                        b,
                        method.description(),
                        value
                    )?,
                    _ => writeln!(doc, "The integral does not exist on $[{}, {}]$.\n", a, b)?,
                }
            }
            None => {
                writeln!(doc, "No closed-form antiderivative was found.\n")?;
                writeln!(doc, "\\textbf{{Step 2: Numerical evaluation}} \\\\")?;
                match (integral.method, integral.value) {
                    (IntegrationMethod::Quadrature(method), Some(value)) => {
                        write!(
                            doc,
                            "The value is computed by {}:\n$$ I \\approx {} $$\n",
                            method.description(),
                            value
                        )?;
                        if let Some(error) = integral.error_estimate {
                            write!(doc, "with an estimated absolute error of ${:.1e}$.", error)?;
                        }
                        doc.push_str("\n\n");
                    }
                    _ => writeln!(doc, "The integral does not exist on $[{}, {}]$.\n", a, b)?,
                }
            }
        }
    }

    if !integral.notes.is_empty() {
        writeln!(doc, "\\textbf{{Remarks:}}\n\\begin{{itemize}}")?;
        for note in &integral.notes {
            writeln!(doc, "    \\item {}", escape_text(&note.to_string()))?;
        }
        writeln!(doc, "\\end{{itemize}}\n")?;
    }

    writeln!(doc, "\\textbf{{Final Answer:}}")?;
    match integral.value {
        Some(value)
            if integral.method == IntegrationMethod::Exact
                || integral.method == IntegrationMethod::ZeroWidth =>
        {
            writeln!(doc, "$$ {} = {} $$", definite, value)?
        }
        Some(value) => writeln!(doc, "$$ {} \\approx {} $$", definite, value)?,
        None => writeln!(doc, "The integral ${}$ does not exist.", definite)?,
    }
    doc.push_str("\n\\end{document}\n");
    Ok(())
}

pub fn write_tex(path: &Path, document: &str) -> Result<(), ReportError> {
    fs::write(path, document)?;
    info!("LaTeX report written to {}", path.display());
    Ok(())
}

/// Compiles `tex_path` with `pdflatex` next to it and returns the PDF path.
pub fn compile_pdf(tex_path: &Path) -> Result<PathBuf, ReportError> {
    compile_pdf_with(PDFLATEX, tex_path)
}

/// Compiles with the given LaTeX compiler; `.aux` and `.log` files are removed either way.
pub fn compile_pdf_with(compiler: &str, tex_path: &Path) -> Result<PathBuf, ReportError> {
    let dir = match tex_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = tex_path.file_name().unwrap_or(tex_path.as_os_str());
    let status = Command::new(compiler)
        .arg("-interaction=nonstopmode")
        .arg(file_name)
        .current_dir(&dir)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    for extension in ["aux", "log"] {
        let auxiliary = tex_path.with_extension(extension);
        if auxiliary.exists() {
            if let Err(e) = fs::remove_file(&auxiliary) {
                warn!("cannot remove {}: {}", auxiliary.display(), e);
            }
        }
    }
    match status {
        Ok(status) if status.success() => {
            let pdf = tex_path.with_extension("pdf");
            info!("PDF report compiled to {}", pdf.display());
            Ok(pdf)
        }
        Ok(status) => Err(ReportError::CompilationFailed {
            path: tex_path.to_path_buf(),
            status: status.to_string(),
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("{} is not installed, keeping {}", compiler, tex_path.display());
            Err(ReportError::CompilerNotFound(compiler.to_string()))
        }
        Err(e) => Err(ReportError::Io(e)),
    }
}
