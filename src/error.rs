//! # Error Types
//!
//! Structured error handling for the portability layer using thiserror.
//! Batch outcomes are broadcast to every member of a batch, so the error
//! type is `Clone` and carries only owned message strings.

use thiserror::Error;

/// Errors surfaced by topics, subscriptions and drivers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The topic or subscription was closed before or during the operation.
    #[error("resource is closed")]
    Closed,

    /// The caller's deadline elapsed before the operation completed.
    #[error("operation cancelled before completion")]
    Cancelled,

    /// The driver reported failure for an entire dispatched batch. The same
    /// error is delivered to every member of that batch; no attempt is made
    /// to attribute the failure to an individual message.
    #[error("driver batch failure: {message}")]
    DriverBatch { message: String },

    /// The caller violated the API contract, e.g. acknowledging a message
    /// that was never received or has already been acknowledged.
    #[error("caller misuse: {message}")]
    CallerMisuse { message: String },

    /// Invalid configuration, e.g. an unparseable environment override.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl Error {
    /// Build a batch-level driver error. Intended for driver implementations.
    pub fn driver(message: impl Into<String>) -> Self {
        Error::DriverBatch {
            message: message.into(),
        }
    }

    pub(crate) fn misuse(message: impl Into<String>) -> Self {
        Error::CallerMisuse {
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
