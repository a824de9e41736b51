//! Error type shared by the loader, the configuration and the renderer.

use std::io;

use thiserror::Error;

/// Everything that can abort a run.
///
/// Matching and calibration are infallible; only reading inputs and writing the chart can fail.
#[derive(Debug, Error)]
pub enum Error {
    /// A catalog or configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A catalog row holds a field that is not a finite number.
    #[error("line {line}, column {column}: {message}")]
    Parse {
        /// 1-based line number in the source table.
        line: usize,
        /// 0-based column index.
        column: usize,
        /// What was wrong with the field.
        message: String,
    },

    /// A delimited catalog table is malformed, e.g. a quote is never closed.
    #[error("malformed table: {0}")]
    Csv(#[from] csv::Error),

    /// A catalog row is shorter than the configured column layout.
    #[error("line {line}: missing field in column {column}")]
    MissingField {
        /// 1-based line number in the source table.
        line: usize,
        /// 0-based column index.
        column: usize,
    },

    /// The configuration is syntactically valid but violates a constraint.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The configuration file is not valid TOML or lacks a required key.
    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// The chart could not be drawn or written.
    #[error("failed to render chart: {0}")]
    Render(String),
}

/// Shorthand used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
