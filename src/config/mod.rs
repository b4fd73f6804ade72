//! Scan configuration.
//!
//! [`ScanConfig`] is built once at startup from the settings file, the
//! command line and the environment, then passed by reference to the
//! pipeline and the probe executor. Nothing changes it afterwards.

mod settings;

pub use settings::{AppSettings, Paths};

use crate::error::{ConfigError, ConfigResult};
use crate::output::OutputFormat;
use crate::scanner::proxy::ProxyConfig;
use crate::scanner::BackoffKind;
use crate::types::PortSet;
use std::time::Duration;

/// Everything a scan run needs to know besides its targets.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Ports probed on targets that do not name one.
    pub ports: PortSet,
    pub workers: usize,
    pub retries: u32,
    pub backoff: BackoffKind,
    pub connect_timeout: Duration,
    pub io_timeout: Duration,
    /// Connection attempts per second, 0 for unlimited.
    pub rate_limit: u32,
    pub emit_failures: bool,
    pub output: OutputFormat,
    /// Capacity of the target and result queues.
    pub queue_capacity: usize,
    pub proxy: Option<ProxyConfig>,
}

impl ScanConfig {
    pub const DEFAULT_WORKERS: usize = 256;
    pub const DEFAULT_QUEUE_CAPACITY: usize = 1;

    /// Create a configuration with default settings for everything but the
    /// ports and worker count.
    pub fn new(ports: PortSet, workers: usize) -> ConfigResult<Self> {
        if workers < 1 {
            return Err(ConfigError::InvalidWorkerCount(workers));
        }
        Ok(Self {
            ports,
            workers,
            retries: 0,
            backoff: BackoffKind::default(),
            connect_timeout: Duration::from_secs(2),
            io_timeout: Duration::from_secs(5),
            rate_limit: 0,
            emit_failures: false,
            output: OutputFormat::default(),
            queue_capacity: Self::DEFAULT_QUEUE_CAPACITY,
            proxy: None,
        })
    }

    pub fn with_retries(mut self, retries: u32, backoff: BackoffKind) -> Self {
        self.retries = retries;
        self.backoff = backoff;
        self
    }

    pub fn with_timeouts(mut self, connect: Duration, io: Duration) -> Self {
        self.connect_timeout = connect;
        self.io_timeout = io;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: u32) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_emit_failures(mut self, emit_failures: bool) -> Self {
        self.emit_failures = emit_failures;
        self
    }

    pub fn with_output(mut self, output: OutputFormat) -> Self {
        self.output = output;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<ProxyConfig>) -> Self {
        self.proxy = proxy;
        self
    }
}
