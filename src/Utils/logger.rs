use crate::pipeline::SampleSet;
use chrono::Local;
use csv::Writer;
use log::{LevelFilter, SetLoggerError, info};
use simplelog::{ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("loglevel must be off, error, warn, info, debug or trace, got `{0}`")]
    InvalidLevel(String),
    #[error("cannot create log file: {0}")]
    File(#[from] io::Error),
    #[error(transparent)]
    AlreadyInitialized(#[from] SetLoggerError),
}

pub fn log_level_from_str(level: &str) -> Result<LevelFilter, LoggerError> {
    match level.to_lowercase().as_str() {
        "off" => Ok(LevelFilter::Off),
        "error" => Ok(LevelFilter::Error),
        "warn" => Ok(LevelFilter::Warn),
        "info" => Ok(LevelFilter::Info),
        "debug" => Ok(LevelFilter::Debug),
        "trace" => Ok(LevelFilter::Trace),
        _ => Err(LoggerError::InvalidLevel(level.to_string())),
    }
}

/// `log_<date>_<time>.txt` in the working directory
pub fn dated_log_file() -> PathBuf {
    let date_and_time = Local::now().format("%Y-%m-%d_%H-%M-%S");
    PathBuf::from(format!("log_{}.txt", date_and_time))
}

/// Terminal logger, plus a file logger when `file` is given. Call once per process.
pub fn init_logger(level: &str, file: Option<&Path>) -> Result<(), LoggerError> {
    let log_option = log_level_from_str(level)?;
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        log_option,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Some(file) = file {
        loggers.push(WriteLogger::new(
            log_option,
            Config::default(),
            File::create(file)?,
        ));
    }
    CombinedLogger::init(loggers)?;
    info!("logging at level {}", log_option);
    Ok(())
}

/// Writes the samples as `x,f(x)` rows; an undefined point gets an empty value.
pub fn save_samples_to_csv(samples: &SampleSet, variable: &str, path: &Path) -> Result<(), csv::Error> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record([variable.to_string(), format!("f({})", variable)])?;
    for (x, y) in samples.x.iter().zip(&samples.y) {
        let y = y.map(|v| v.to_string()).unwrap_or_default();
        writer.write_record([x.to_string(), y])?;
    }
    writer.flush()?;
    info!("{} samples saved to {}", samples.len(), path.display());
    Ok(())
}
