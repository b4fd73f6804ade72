//! Error types for jarmscan.
//!
//! Uses `thiserror` for ergonomic error definitions.

use crate::types::PortError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while dialing or probing a target, or while running the pipeline.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("connection timed out")]
    Timeout,

    #[error("connection refused")]
    ConnectionRefused,

    #[error("proxy error: {0}")]
    Proxy(String),

    #[error("no connection to {addr} after {attempts} attempt(s): {last}")]
    RetriesExhausted {
        addr: String,
        attempts: u32,
        last: Box<ScanError>,
    },

    #[error("output error: {0}")]
    Output(std::io::Error),

    #[error("task failed: {0}")]
    Task(String),
}

impl ScanError {
    /// Classify a connect error the way the operating system reported it.
    pub fn from_connect(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::ConnectionRefused => Self::ConnectionRefused,
            std::io::ErrorKind::TimedOut => Self::Timeout,
            _ => Self::ConnectionFailed(err.to_string()),
        }
    }
}

/// Result type alias for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors in configuration, reported before any probing starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid ports: {0}")]
    InvalidPorts(#[from] PortError),

    #[error("invalid worker count: {0}")]
    InvalidWorkerCount(usize),

    #[error("no targets specified")]
    NoTargets,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("invalid settings format: {0}")]
    InvalidFormat(String),

    #[error("invalid proxy configuration: {0}")]
    InvalidProxy(String),
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
