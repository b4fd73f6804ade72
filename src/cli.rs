//! Command-line interface definitions for jarmscan.
//!
//! Uses `clap` derive macros for declarative argument parsing. Options left
//! unset fall back to the settings file, then to built-in defaults.

use crate::config::{AppSettings, ScanConfig};
use crate::error::{ConfigError, ConfigResult};
use crate::logging::LogConfig;
use crate::output::OutputFormat;
use crate::scanner::{BackoffKind, ProxyConfig};
use crate::types::{parse_ports, PortSet};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Concurrent JARM TLS fingerprinting.
#[derive(Parser, Debug)]
#[command(name = "jarmscan")]
#[command(version)]
#[command(about = "Fingerprint TLS servers with JARM", long_about = None)]
pub struct Args {
    /// Targets: host, host:port, host,port, URL or CIDR range
    #[arg(value_name = "TARGET", required = true)]
    pub targets: Vec<String>,

    /// Ports for targets without one, e.g. "443", "443,8443", "1-1024" or
    /// "default" [default: 443]
    #[arg(short, long, value_name = "SPEC")]
    pub ports: Option<String>,

    /// Number of concurrent workers [default: 256]
    #[arg(short, long, env = "JARMSCAN_WORKERS")]
    pub workers: Option<usize>,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Log debug information
    #[arg(short, long)]
    pub verbose: bool,

    /// Extra connection attempts per probe [default: 0]
    #[arg(short, long, env = "JARMSCAN_RETRIES")]
    pub retries: Option<u32>,

    /// Delay policy between connection attempts [default: fixed]
    #[arg(long, value_enum)]
    pub backoff: Option<BackoffKind>,

    /// Connect timeout in milliseconds [default: 2000]
    #[arg(long, value_name = "MS")]
    pub connect_timeout: Option<u64>,

    /// Write and read timeout in milliseconds [default: 5000]
    #[arg(long, value_name = "MS")]
    pub io_timeout: Option<u64>,

    /// Maximum connection attempts per second, 0 for unlimited [default: 0]
    #[arg(long, value_name = "N")]
    pub rate: Option<u32>,

    /// Report unreachable targets instead of dropping them silently
    #[arg(long)]
    pub emit_failures: bool,

    /// Output format for results [default: plain]
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Settings file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Load the settings file named by `--config`, or the default one.
    pub fn load_settings(&self) -> ConfigResult<AppSettings> {
        match &self.config {
            Some(path) => AppSettings::load_from(path),
            None => AppSettings::load(),
        }
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig::from_flags(self.quiet, self.verbose)
    }

    /// Merge these arguments over `settings` into the scan configuration.
    pub fn scan_config(
        &self,
        settings: &AppSettings,
        proxy: Option<ProxyConfig>,
    ) -> ConfigResult<ScanConfig> {
        if self.targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }

        let port_spec = self.ports.as_deref().unwrap_or(&settings.ports);
        let ports = parse_ports(port_spec, &PortSet::default_tls())?;
        let workers = self.workers.unwrap_or(settings.workers);

        let connect_timeout = self.connect_timeout.unwrap_or(settings.connect_timeout_ms);
        let io_timeout = self.io_timeout.unwrap_or(settings.io_timeout_ms);

        Ok(ScanConfig::new(ports, workers)?
            .with_retries(
                self.retries.unwrap_or(settings.retries),
                self.backoff.unwrap_or(settings.backoff),
            )
            .with_timeouts(
                Duration::from_millis(connect_timeout),
                Duration::from_millis(io_timeout),
            )
            .with_rate_limit(self.rate.unwrap_or(settings.rate_limit))
            .with_emit_failures(self.emit_failures || settings.emit_failures)
            .with_output(self.output.unwrap_or(settings.output))
            .with_proxy(proxy))
    }
}
