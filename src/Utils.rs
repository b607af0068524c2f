//! different utility modules used by the command line front end
/// TOML task file
pub mod config;
/// LaTeX solution report and its compilation to PDF
pub mod latex_report;
/// logger setup and saving of samples into csv
pub mod logger;
/// plot of the integrand with the shaded area
pub mod plots;
/// key/value table of a result, for the terminal
pub mod summary;
