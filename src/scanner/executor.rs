//! Probe executor: one full fingerprinting cycle against one target.
//!
//! Every probe plan gets its own connection. Write, read and parse failures
//! only blank the answer of that probe; a target is abandoned only when a
//! connection cannot be established within its retry budget.

use crate::config::ScanConfig;
use crate::scanner::dialer::Dialer;
use crate::scanner::rate_limiter::RateLimiter;
use crate::scanner::traits::{FingerprintResult, Fingerprinter, Prober, ANSWER_DELIMITER};
use crate::types::Target;
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};

/// Default deadline for writing a probe and for reading its answer.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Bytes read from the server per probe.
pub const READ_BUFFER_SIZE: usize = 1484;

/// Drives a [`Fingerprinter`] over the network.
pub struct ProbeExecutor<F> {
    fingerprinter: F,
    dialer: Dialer,
    io_timeout: Duration,
    emit_failures: bool,
}

impl<F: Fingerprinter> ProbeExecutor<F> {
    pub fn new(fingerprinter: F, dialer: Dialer) -> Self {
        Self {
            fingerprinter,
            dialer,
            io_timeout: DEFAULT_IO_TIMEOUT,
            emit_failures: false,
        }
    }

    /// Build an executor with the dialer, deadlines and failure policy of a
    /// scan configuration.
    pub fn from_config(fingerprinter: F, config: &ScanConfig) -> Self {
        let dialer = Dialer::new(config.connect_timeout)
            .with_proxy(config.proxy.clone())
            .with_rate_limiter(RateLimiter::from_rate(config.rate_limit));

        Self::new(fingerprinter, dialer)
            .with_io_timeout(config.io_timeout)
            .with_emit_failures(config.emit_failures)
    }

    pub fn with_io_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    /// Report targets that could not be reached as error results instead of
    /// dropping them.
    pub fn with_emit_failures(mut self, emit_failures: bool) -> Self {
        self.emit_failures = emit_failures;
        self
    }

    /// Probe a target with every plan, in order, and reduce the answers.
    pub async fn execute(&self, target: Target) -> Option<FingerprintResult> {
        let plans = self
            .fingerprinter
            .probes(&target.host, target.port.as_u16());
        let mut answers = Vec::with_capacity(plans.len());

        for plan in &plans {
            let stream = match self.dialer.connect_with_retry(&target).await {
                Ok(stream) => stream,
                Err(e) => {
                    if self.emit_failures {
                        return Some(FingerprintResult::failed(target, e));
                    }
                    debug!(addr = %target, error = %e, "dropping unreachable target");
                    return None;
                }
            };
            answers.push(self.exchange(stream, plan).await);
        }

        let fingerprint = self
            .fingerprinter
            .reduce(&answers.join(ANSWER_DELIMITER));
        Some(FingerprintResult::success(target, fingerprint))
    }

    /// Send one probe and interpret the answer. The connection is closed
    /// on return.
    async fn exchange(&self, mut stream: TcpStream, plan: &F::Plan) -> String {
        let payload = self.fingerprinter.build_probe(plan);
        match timeout(self.io_timeout, stream.write_all(&payload)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                trace!(error = %e, "probe write failed");
                return String::new();
            }
            Err(_) => {
                trace!("probe write timed out");
                return String::new();
            }
        }

        // A failed or timed out read leaves nothing to parse.
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        let read = match timeout(self.io_timeout, stream.read(&mut buf)).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => {
                trace!(error = %e, "probe read failed");
                0
            }
            Err(_) => 0,
        };

        match self.fingerprinter.parse_answer(&buf[..read], plan) {
            Ok(answer) => answer,
            Err(e) => {
                trace!(error = %e, "unparseable answer");
                String::new()
            }
        }
    }
}

#[async_trait]
impl<F> Prober for ProbeExecutor<F>
where
    F: Fingerprinter + 'static,
{
    async fn probe(&self, target: Target) -> Option<FingerprintResult> {
        self.execute(target).await
    }
}
