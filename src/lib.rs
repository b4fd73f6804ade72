//! # jarmscan - Concurrent JARM TLS Fingerprinting
//!
//! jarmscan expands target specifications (hosts, `host:port` pairs, URLs
//! and CIDR ranges) into a stream of addresses, fingerprints each one with
//! JARM using a bounded pool of workers, and streams the fingerprints to
//! stdout as they complete.
//!
//! ## Features
//!
//! - **Flexible Targeting**: hosts, `host:port`, `host,port`, URLs and CIDR ranges
//! - **Bounded Concurrency**: a fixed worker pool fed through bounded queues
//! - **Retries**: per-connection retries with fixed or exponential backoff
//! - **Proxy Support**: SOCKS5 via `ALL_PROXY`, honoring `NO_PROXY`
//! - **Rate Limiting**: a shared cap on connection attempts per second
//! - **Multiple Output Formats**: plain text, JSON lines and CSV
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use jarmscan::config::ScanConfig;
//! use jarmscan::jarm::Jarm;
//! use jarmscan::output::{Consolidator, OutputFormat};
//! use jarmscan::scanner::{run_scan, ProbeExecutor};
//! use jarmscan::types::PortSet;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ScanConfig::new(PortSet::default_tls(), 64).unwrap();
//!     let prober = Arc::new(ProbeExecutor::from_config(Jarm, &config));
//!     let consolidator = Consolidator::new(OutputFormat::Plain, std::io::stdout());
//!
//!     let targets = vec!["example.com".to_string(), "192.0.2.0/28".to_string()];
//!     let summary = run_scan(prober, &config, targets, consolidator).await.unwrap();
//!     eprintln!("{} fingerprints", summary.output.written);
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Ports, port sets, target specifications and targets
//! - [`scanner`] - Dialing, retries, the probe executor and the worker pipeline
//! - [`jarm`] - JARM probes, ServerHello parsing and the fuzzy hash
//! - [`output`] - Result consolidation and output formats
//! - [`config`] - Settings file and the immutable scan configuration
//! - [`cli`] - Command-line arguments
//! - [`logging`] - tracing subscriber setup
//! - [`error`] - Error types

pub mod cli;
pub mod config;
pub mod error;
pub mod jarm;
pub mod logging;
pub mod output;
pub mod scanner;
pub mod types;

// Re-export commonly used types
pub use error::{ConfigError, ScanError};
pub use scanner::{run_scan, FingerprintResult, Fingerprinter, ProbeExecutor, Prober};
pub use types::{Port, PortSet, Target, TargetSpec};
