//! Scanner module - schedules probes against targets.
//!
//! [`run_scan`] streams targets through a fixed pool of workers, each
//! handing targets to a [`Prober`]. The [`ProbeExecutor`] is the prober
//! used in practice: it dials with retry and backoff, optionally through a
//! SOCKS5 proxy and under a shared rate limit, and leaves the wire format
//! to a [`Fingerprinter`].

pub mod backoff;
pub mod dialer;
pub mod executor;
pub mod pipeline;
pub mod proxy;
pub mod rate_limiter;
pub mod traits;

pub use backoff::{Backoff, BackoffKind, ExponentialBackoff, FixedBackoff};
pub use dialer::Dialer;
pub use executor::ProbeExecutor;
pub use pipeline::{run_scan, ScanSummary};
pub use proxy::ProxyConfig;
pub use rate_limiter::RateLimiter;
pub use traits::{FingerprintResult, Fingerprinter, Prober, ANSWER_DELIMITER};
