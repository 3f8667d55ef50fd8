//! Engine Errors
//!
//! Typed failures raised by the stats, signal, sizing and backtest stages.
//! Configuration problems are fatal and surface before any computation;
//! the data-related variants are local to one pair so a batch can continue.

use chrono::NaiveDate;
use thiserror::Error;

use crate::strategy::params::ConfigError;

/// Errors produced by the pairs engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Insufficient data for {context}: need at least {required} observations, got {actual}")]
    InsufficientData {
        context: String,
        required: usize,
        actual: usize,
    },

    #[error("Degenerate input in {field}{}: {reason}", at_date(.date))]
    DegenerateInput {
        field: String,
        date: Option<NaiveDate>,
        reason: String,
    },

    #[error("Empty series: {context}")]
    EmptySeries { context: String },

    #[error("Unknown ticker: {0} is not present in the price table")]
    UnknownTicker(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

fn at_date(date: &Option<NaiveDate>) -> String {
    match date {
        Some(d) => format!(" at {d}"),
        None => String::new(),
    }
}

impl EngineError {
    pub(crate) fn insufficient(context: impl Into<String>, required: usize, actual: usize) -> Self {
        EngineError::InsufficientData {
            context: context.into(),
            required,
            actual,
        }
    }

    pub(crate) fn degenerate(
        field: impl Into<String>,
        date: Option<NaiveDate>,
        reason: impl Into<String>,
    ) -> Self {
        EngineError::DegenerateInput {
            field: field.into(),
            date,
            reason: reason.into(),
        }
    }

    /// True for errors caused by invalid configuration rather than data
    pub fn is_configuration(&self) -> bool {
        matches!(self, EngineError::Configuration(_))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
