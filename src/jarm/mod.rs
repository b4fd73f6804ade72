//! JARM active TLS fingerprinting.
//!
//! Ten crafted ClientHello messages are sent to a server, one connection
//! each. The ServerHello answers are reduced to a 62 character fingerprint
//! that groups servers with the same TLS stack and configuration.
//!
//! [`Jarm`] plugs this into the scanner through the
//! [`Fingerprinter`](crate::scanner::Fingerprinter) trait.

pub mod hash;
pub mod hello;
pub mod probe;

use crate::scanner::Fingerprinter;
use thiserror::Error;

pub use hash::{fuzzy_hash, zero_fingerprint, FINGERPRINT_LEN};
pub use hello::{parse_server_hello, EMPTY_ANSWER};
pub use probe::ProbePlan;

/// Errors from interpreting a server's answer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FingerprintError {
    #[error("server hello truncated after {0} bytes")]
    Truncated(usize),
}

/// The JARM fingerprinter.
#[derive(Debug, Clone, Copy, Default)]
pub struct Jarm;

impl Fingerprinter for Jarm {
    type Plan = ProbePlan;

    fn probes(&self, host: &str, port: u16) -> Vec<ProbePlan> {
        probe::probes(host, port)
    }

    fn build_probe(&self, plan: &ProbePlan) -> Vec<u8> {
        probe::build(plan)
    }

    fn parse_answer(&self, data: &[u8], _plan: &ProbePlan) -> Result<String, FingerprintError> {
        parse_server_hello(data)
    }

    fn reduce(&self, answers: &str) -> String {
        fuzzy_hash(answers)
    }
}
