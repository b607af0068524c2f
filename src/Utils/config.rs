//! TOML task file: the same fields a user fills in on the command line.
//!
//! ```toml
//! expression = "sin(x) + x**2"
//! lower = 0.0
//! upper = 2.0
//!
//! [display]
//! x_min = -1.0
//! x_max = 3.0
//! samples = 400
//!
//! [integration]
//! method = "gauss-legendre"
//! degree = 40
//!
//! [output]
//! plot = "integral.png"
//! latex = "solution.tex"
//! compile_pdf = true
//!
//! [logging]
//! level = "debug"
//! ```
//! Everything but `expression` may be left out.
use crate::pipeline::DEFAULT_SAMPLES;
use crate::symbolic::symbolic_integration::QuadratureSettings;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read task file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid task file: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    pub expression: String,
    #[serde(default = "default_variable")]
    pub variable: String,
    #[serde(default)]
    pub lower: f64,
    #[serde(default = "default_upper")]
    pub upper: f64,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub integration: QuadratureSettings,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_variable() -> String {
    "x".to_string()
}

fn default_upper() -> f64 {
    1.0
}

/// Plot window; a missing edge is derived from the bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayConfig {
    pub x_min: Option<f64>,
    pub x_max: Option<f64>,
    pub samples: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            x_min: None,
            x_max: None,
            samples: DEFAULT_SAMPLES,
        }
    }
}

/// Files to write; nothing is written unless asked for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub plot: Option<PathBuf>,
    pub latex: Option<PathBuf>,
    pub compile_pdf: bool,
    pub csv: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
    /// log to `log_<date>_<time>.txt` when no file is named
    pub dated_file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "warn".to_string(),
            file: None,
            dated_file: false,
        }
    }
}

impl TaskConfig {
    pub fn new(expression: &str) -> TaskConfig {
        TaskConfig {
            expression: expression.to_string(),
            variable: default_variable(),
            lower: 0.0,
            upper: default_upper(),
            display: DisplayConfig::default(),
            integration: QuadratureSettings::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<TaskConfig, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<TaskConfig, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = TaskConfig::from_toml_str(&text)?;
        info!("task loaded from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::symbolic_integration::QuadMethod;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_minimal_task_gets_defaults() {
        let config = TaskConfig::from_toml_str(r#"expression = "x**2""#).unwrap();
        assert_eq!(config, TaskConfig::new("x**2"));
        assert_eq!(config.display.samples, DEFAULT_SAMPLES);
        assert_eq!(config.integration.method, QuadMethod::Adaptive);
        assert!(config.output.plot.is_none());
        assert!(!config.output.compile_pdf);
    }

    #[test]
    fn test_full_task() {
        let text = r#"
            expression = "sin(t) + t**2"
            variable = "t"
            lower = -1.0
            upper = 2.5

            [display]
            x_min = -3.0
            samples = 101

            [integration]
            method = "gauss-legendre"
            degree = 40

            [output]
            plot = "out.svg"
            compile_pdf = true

            [logging]
            level = "debug"
            dated_file = true
        "#;
        let config = TaskConfig::from_toml_str(text).unwrap();
        assert_eq!(config.variable, "t");
        assert_eq!((config.lower, config.upper), (-1.0, 2.5));
        assert_eq!(config.display.x_min, Some(-3.0));
        assert_eq!(config.display.x_max, None);
        assert_eq!(config.display.samples, 101);
        assert_eq!(config.integration.method, QuadMethod::GaussLegendre);
        assert_eq!(config.integration.degree, 40);
        assert_eq!(config.integration.tolerance, QuadratureSettings::default().tolerance);
        assert_eq!(config.output.plot, Some(PathBuf::from("out.svg")));
        assert!(config.output.compile_pdf);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.dated_file);
    }

    #[test]
    fn test_invalid_tasks() {
        assert!(matches!(
            TaskConfig::from_toml_str("lower = 0.0"),
            Err(ConfigError::Toml(_))
        ));
        assert!(TaskConfig::from_toml_str("expression = \"x\"\nbogus = 1").is_err());
        assert!(TaskConfig::from_toml_str("expression = \"x\"\n[integration]\nmethod = \"romberg\"").is_err());
        let err = TaskConfig::from_toml_str("expression = \"x\"\n[integration]\ntolerence = 1e-6")
            .unwrap_err();
        assert!(err.to_string().contains("tolerence"), "{}", err);
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "expression = \"exp(-x**2)\"\nupper = 3.0").unwrap();
        let config = TaskConfig::from_file(file.path()).unwrap();
        assert_eq!(config.expression, "exp(-x**2)");
        assert_eq!(config.upper, 3.0);

        let err = TaskConfig::from_file(Path::new("/nonexistent/task.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
