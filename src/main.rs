use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{info, warn};
use strum::IntoEnumIterator;
use thiserror::Error;

use RustedIntegral::Utils::config::{ConfigError, TaskConfig};
use RustedIntegral::Utils::latex_report::{self, ReportError};
use RustedIntegral::Utils::logger::{self, LoggerError};
use RustedIntegral::Utils::plots::{PlotData, PlotError, PlotRenderer, PlottersRenderer};
use RustedIntegral::Utils::summary::summary_table;
use RustedIntegral::pipeline::{Bounds, DisplayRange, ExpressionPipeline, NativeEngine, PipelineError};
use RustedIntegral::symbolic::symbolic_integration::QuadMethod;

/// Definite integral of a one-variable expression: antiderivative, value, plot and report
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Expression to integrate, e.g. "sin(x) + x**2"
    expression: Option<String>,

    /// TOML task file; flags given here override its values
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Integration variable
    #[clap(short, long)]
    variable: Option<String>,

    /// Lower bound
    #[clap(short = 'a', long, allow_hyphen_values = true)]
    lower: Option<f64>,

    /// Upper bound
    #[clap(short = 'b', long, allow_hyphen_values = true)]
    upper: Option<f64>,

    /// Left edge of the plot
    #[clap(long, allow_hyphen_values = true)]
    x_min: Option<f64>,

    /// Right edge of the plot
    #[clap(long, allow_hyphen_values = true)]
    x_max: Option<f64>,

    /// Number of plot samples
    #[clap(short = 'n', long)]
    samples: Option<usize>,

    /// Quadrature used when there is no usable closed form: adaptive, gauss-legendre or simpson
    #[clap(short, long)]
    method: Option<QuadMethod>,

    /// Print the available quadrature methods and exit
    #[clap(long)]
    list_methods: bool,

    /// Gauss-Legendre degree (Simpson uses twice as many intervals)
    #[clap(long)]
    degree: Option<usize>,

    /// Relative tolerance of adaptive quadrature
    #[clap(long)]
    tolerance: Option<f64>,

    /// Name of a `.png` or `.svg` file to plot into
    #[clap(short, long)]
    plot: Option<PathBuf>,

    /// Name of a `.tex` file for the step-by-step solution
    #[clap(long)]
    latex: Option<PathBuf>,

    /// Compile the solution with pdflatex
    #[clap(long)]
    pdf: bool,

    /// Name of a `.csv` file for the plot samples
    #[clap(long)]
    csv: Option<PathBuf>,

    /// off, error, warn, info, debug or trace
    #[clap(long)]
    log_level: Option<String>,

    /// Also log into this file
    #[clap(long)]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Error)]
enum AppError {
    #[error("no expression given, pass one or use --config")]
    MissingExpression,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Logger(#[from] LoggerError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Plot(#[from] PlotError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error("cannot write samples: {0}")]
    Csv(#[from] csv::Error),
}

/// Task file (if any) with the command line flags applied on top.
fn task_from_args(args: Args) -> Result<TaskConfig, AppError> {
    let mut task = match (&args.config, &args.expression) {
        (Some(path), _) => TaskConfig::from_file(path)?,
        (None, Some(expression)) => TaskConfig::new(expression),
        (None, None) => return Err(AppError::MissingExpression),
    };
    if let Some(expression) = args.expression {
        task.expression = expression;
    }
    if let Some(variable) = args.variable {
        task.variable = variable;
    }
    if let Some(lower) = args.lower {
        task.lower = lower;
    }
    if let Some(upper) = args.upper {
        task.upper = upper;
    }
    if args.x_min.is_some() {
        task.display.x_min = args.x_min;
    }
    if args.x_max.is_some() {
        task.display.x_max = args.x_max;
    }
    if let Some(samples) = args.samples {
        task.display.samples = samples;
    }
    if let Some(method) = args.method {
        task.integration.method = method;
    }
    if let Some(degree) = args.degree {
        task.integration.degree = degree;
    }
    if let Some(tolerance) = args.tolerance {
        task.integration.tolerance = tolerance;
    }
    if args.plot.is_some() {
        task.output.plot = args.plot;
    }
    if args.latex.is_some() {
        task.output.latex = args.latex;
    }
    if args.pdf {
        task.output.compile_pdf = true;
    }
    if args.csv.is_some() {
        task.output.csv = args.csv;
    }
    if let Some(level) = args.log_level {
        task.logging.level = level;
    }
    if args.log_file.is_some() {
        task.logging.file = args.log_file;
    }
    Ok(task)
}

/// Plot window from the task, padded around the bounds where an edge is not given.
fn display_range(task: &TaskConfig) -> Result<DisplayRange, PipelineError> {
    let bounds = Bounds::new(task.lower, task.upper)?;
    let around = DisplayRange::around(&bounds, task.display.samples);
    DisplayRange::new(
        task.display.x_min.unwrap_or(around.x_min),
        task.display.x_max.unwrap_or(around.x_max),
        task.display.samples,
    )
}

fn run(task: TaskConfig) -> Result<(), AppError> {
    let log_file = match (&task.logging.file, task.logging.dated_file) {
        (Some(file), _) => Some(file.clone()),
        (None, true) => Some(logger::dated_log_file()),
        (None, false) => None,
    };
    logger::init_logger(&task.logging.level, log_file.as_deref())?;
    info!("task: {:?}", task);

    let pipeline = ExpressionPipeline::new(NativeEngine, &task.variable)
        .with_quadrature(task.integration.clone());
    let range = display_range(&task)?;
    let output = pipeline.run(&task.expression, task.lower, task.upper, Some(range))?;

    println!("{}", summary_table(&output));
    println!("{}", output.integral.display);

    if let Some(path) = &task.output.plot {
        PlottersRenderer::default().render(&PlotData::from_output(&output), path)?;
        println!("plot saved to {}", path.display());
    }
    if let Some(path) = &task.output.csv {
        logger::save_samples_to_csv(&output.samples, &output.variable, path)?;
        println!("samples saved to {}", path.display());
    }
    let tex_path = match (&task.output.latex, task.output.compile_pdf) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => Some(PathBuf::from("solution.tex")),
        (None, false) => None,
    };
    if let Some(tex_path) = tex_path {
        latex_report::write_tex(&tex_path, &latex_report::build_document(&output))?;
        println!("LaTeX solution saved to {}", tex_path.display());
        if task.output.compile_pdf {
            match latex_report::compile_pdf(&tex_path) {
                Ok(pdf) => println!("PDF compiled to {}", pdf.display()),
                Err(e @ ReportError::CompilerNotFound(_)) => {
                    warn!("{}", e);
                    eprintln!("{}", e);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
    Ok(())
}

fn print_methods() {
    for method in QuadMethod::iter() {
        println!("{:<16} {}", method.to_string(), method.description());
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    if args.list_methods {
        print_methods();
        return ExitCode::SUCCESS;
    }
    match task_from_args(args).and_then(run) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
