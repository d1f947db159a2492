//! Error types for the benchmark harness.
//!
//! Errors are scoped by how far they propagate:
//! - [`BenchError::Approach`] stays inside a single approach result
//! - [`BenchError::Fixture`] truncates one trial
//! - [`BenchError::Configuration`] and [`BenchError::ReportWrite`] abort the run

use crate::approach::Approach;
use crate::store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to prepare dataset of {volume} records: {source}")]
    Fixture {
        volume: usize,
        #[source]
        source: StoreError,
    },

    #[error("Approach '{approach}' failed: {source}")]
    Approach {
        approach: Approach,
        #[source]
        source: StoreError,
    },

    #[error("Failed to write report to {}: {source}", path.display())]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BenchError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        BenchError::Configuration(msg.into())
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        BenchError::InvalidArgument(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;
