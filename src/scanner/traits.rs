//! Seams between the scheduling pipeline and the probing logic.
//!
//! The pipeline only knows [`Prober`]. The default prober, the
//! [`ProbeExecutor`](super::ProbeExecutor), delegates everything protocol
//! specific to a [`Fingerprinter`].

use crate::error::ScanError;
use crate::jarm::FingerprintError;
use crate::types::Target;
use async_trait::async_trait;

/// Separator placed between probe answers before they are reduced.
pub const ANSWER_DELIMITER: &str = ",";

/// Protocol logic for one fingerprinting scheme.
///
/// Every method is pure: the executor owns all I/O.
pub trait Fingerprinter: Send + Sync {
    /// Parameters describing one request on the wire.
    type Plan: Send + Sync;

    /// The ordered probe plans for a host. Deterministic for a given input.
    fn probes(&self, host: &str, port: u16) -> Vec<Self::Plan>;

    /// The bytes to send for a plan.
    fn build_probe(&self, plan: &Self::Plan) -> Vec<u8>;

    /// Interpret the bytes a server sent back.
    fn parse_answer(&self, data: &[u8], plan: &Self::Plan) -> Result<String, FingerprintError>;

    /// Reduce delimiter-joined answers to the final fingerprint.
    fn reduce(&self, answers: &str) -> String;
}

/// The outcome of probing one target.
#[derive(Debug)]
pub struct FingerprintResult {
    pub target: Target,
    /// Empty when `error` is set.
    pub fingerprint: String,
    pub error: Option<ScanError>,
}

impl FingerprintResult {
    pub fn success(target: Target, fingerprint: impl Into<String>) -> Self {
        Self {
            target,
            fingerprint: fingerprint.into(),
            error: None,
        }
    }

    pub fn failed(target: Target, error: ScanError) -> Self {
        Self {
            target,
            fingerprint: String::new(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs a full probe cycle against one target.
///
/// Returning `None` drops the target without a result.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, target: Target) -> Option<FingerprintResult>;
}
