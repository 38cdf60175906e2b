//! Common types and utilities shared across Kontakt crates.
//!
//! This crate defines the shared error taxonomy, the export format enum and
//! the observability helpers used throughout the workspace. It stays
//! dependency-light so the matcher, driver and CLI crates can all depend on it.
//!
//! # Overview
//!
//! - [`KontaktError`] and [`Result`]: shared error handling
//! - [`OutputFormat`]: preferred encoding for exported reports
//! - [`observability`]: centralised tracing/logging initialisation
//!
//! # Examples
//!
//! ```rust
//! use kontakt_common::{KontaktError, OutputFormat};
//!
//! let fmt: OutputFormat = "yaml".parse().unwrap();
//! assert_eq!(fmt, OutputFormat::Yaml);
//! assert_eq!(KontaktError::NoFormFound.to_string(), "no form found");
//! ```
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod observability;

/// Preferred output format for reports and exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Csv,
}

impl OutputFormat {
    /// File extension used when writing an export of this format.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
            OutputFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = KontaktError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(KontaktError::Config(format!("unknown output format: {other}"))),
        }
    }
}

/// Error types used across the Kontakt system.
///
/// The first six variants form the per-page failure taxonomy. None of them is
/// fatal to a batch: callers record them on the field outcome or URL report.
#[derive(thiserror::Error, Debug)]
pub enum KontaktError {
    /// The document contains no `<form>` element.
    #[error("no form found")]
    NoFormFound,

    /// The field-mapping oracle could not be reached or returned nothing usable.
    #[error("oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// A selector matched nothing in the page or any of its frames.
    #[error("selector not found: {0}")]
    SelectorNotResolved(String),

    /// The control exists but its value could not be set.
    #[error("fill rejected: {0}")]
    FillRejected(String),

    /// No submit control could be located or clicked.
    #[error("no submit control found")]
    SubmitNotFound,

    /// The browser could not load the target URL.
    #[error("navigation failed: {0}")]
    NavigationFailed(String),

    /// Configuration was incomplete or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// A driver (browser, network, etc.) reported an error.
    #[error("driver error: {0}")]
    Driver(#[from] anyhow::Error),

    /// Operation exceeded the configured timeout.
    #[error("timeout occurred")]
    Timeout,
}

/// Convenient alias for results that use [`KontaktError`].
pub type Result<T> = std::result::Result<T, KontaktError>;
