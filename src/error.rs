//! Error taxonomy for the benchmark core.
//!
//! Every fallible operation below the CLI boundary returns `Result<T, RunError>`
//! so callers can match on category instead of inspecting a message string.
//! `main` is the only place that flattens this (plus incidental `anyhow::Error`
//! from setup code) into a process exit code.

use thiserror::Error;

/// The concrete error categories a benchmark run can fail with.
#[derive(Debug, Error)]
pub enum RunError {
    /// Unknown flag, missing argument, empty key-prefix, or similar misuse.
    #[error("usage error: {0}")]
    Usage(String),

    /// Failed to establish the seed or a replacement connection.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// A read failure, parser failure, or other fatal I/O condition.
    #[error("I/O error: {0}")]
    Io(String),

    /// A server replied with a RESP error and `show_errors` was not enabled.
    #[error("server error: {0}")]
    ServerError(String),
}

impl RunError {
    /// The process exit code this category maps to. Every `RunError` variant
    /// is a fatal condition at the CLI boundary; only `--help` short-circuits
    /// before a `RunError` can be constructed at all.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

impl From<std::io::Error> for RunError {
    fn from(e: std::io::Error) -> Self {
        RunError::Io(e.to_string())
    }
}

pub type RunResult<T> = Result<T, RunError>;
