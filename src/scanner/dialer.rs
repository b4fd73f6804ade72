//! TCP dialing with a connect timeout, optional SOCKS5 proxy and retries.

use crate::error::{ScanError, ScanResult};
use crate::scanner::proxy::ProxyConfig;
use crate::scanner::rate_limiter::RateLimiter;
use crate::types::Target;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::trace;

/// Default per-attempt connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Opens TCP connections to targets.
#[derive(Debug, Clone)]
pub struct Dialer {
    connect_timeout: Duration,
    proxy: Option<ProxyConfig>,
    limiter: Option<RateLimiter>,
}

impl Dialer {
    /// Create a direct dialer with the given per-attempt timeout.
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            proxy: None,
            limiter: None,
        }
    }

    /// Route connections through a SOCKS5 proxy.
    pub fn with_proxy(mut self, proxy: Option<ProxyConfig>) -> Self {
        self.proxy = proxy;
        self
    }

    /// Throttle connection attempts.
    pub fn with_rate_limiter(mut self, limiter: Option<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    /// Make one connection attempt, bounded by the connect timeout.
    pub async fn connect(&self, host: &str, port: u16) -> ScanResult<TcpStream> {
        if let Some(limiter) = &self.limiter {
            limiter.wait().await;
        }

        let attempt = async {
            match &self.proxy {
                Some(proxy) if !proxy.bypasses(host) => proxy
                    .connect(host, port)
                    .await
                    .map_err(|e| match e.kind() {
                        std::io::ErrorKind::ConnectionRefused => ScanError::ConnectionRefused,
                        _ => ScanError::Proxy(e.to_string()),
                    }),
                _ => TcpStream::connect((host, port))
                    .await
                    .map_err(ScanError::from_connect),
            }
        };

        match timeout(self.connect_timeout, attempt).await {
            Ok(result) => result,
            Err(_) => Err(ScanError::Timeout),
        }
    }

    /// Connect to a target, retrying up to `target.retries` extra times.
    ///
    /// The target's backoff policy decides the pause between attempts. There
    /// is no pause after the final attempt.
    pub async fn connect_with_retry(&self, target: &Target) -> ScanResult<TcpStream> {
        let port = target.port.as_u16();
        let mut attempt = 0;

        loop {
            match self.connect(&target.host, port).await {
                Ok(stream) => return Ok(stream),
                Err(e) if attempt < target.retries => {
                    let delay = target.backoff.delay(attempt, target.retries);
                    trace!(addr = %target, attempt, error = %e, ?delay, "connect failed, retrying");
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(ScanError::RetriesExhausted {
                        addr: target.addr(),
                        attempts: attempt + 1,
                        last: Box::new(e),
                    })
                }
            }
        }
    }
}

impl Default for Dialer {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::backoff::{Backoff, FixedBackoff};
    use crate::types::Port;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::net::TcpListener;

    /// Counts how often it is consulted.
    #[derive(Debug, Default)]
    struct CountingBackoff {
        calls: AtomicU32,
    }

    impl Backoff for CountingBackoff {
        fn delay(&self, _attempt: u32, _max_attempts: u32) -> Duration {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Duration::ZERO
        }
    }

    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        port
    }

    #[tokio::test]
    async fn test_connect_open_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let dialer = Dialer::new(Duration::from_secs(1));
        assert!(dialer.connect("127.0.0.1", port).await.is_ok());
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let port = closed_port().await;
        let backoff = Arc::new(CountingBackoff::default());
        let target = Target::new(
            "127.0.0.1",
            Port::new(port).unwrap(),
            3,
            Arc::clone(&backoff) as Arc<dyn Backoff>,
        );

        let err = Dialer::new(Duration::from_secs(1))
            .connect_with_retry(&target)
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::RetriesExhausted { attempts: 4, .. }));
        assert_eq!(backoff.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_no_retries_means_single_attempt() {
        let port = closed_port().await;
        let target = Target::new(
            "127.0.0.1",
            Port::new(port).unwrap(),
            0,
            Arc::new(FixedBackoff::default()),
        );

        let started = std::time::Instant::now();
        let err = Dialer::default().connect_with_retry(&target).await.unwrap_err();

        assert!(matches!(err, ScanError::RetriesExhausted { attempts: 1, .. }));
        // No one-second backoff after the only attempt
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_bypassed_proxy_dials_directly() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        // Proxy address is unreachable, so success proves the bypass.
        let proxy = ProxyConfig::from_vars(Some("socks5://127.0.0.1:1"), Some("127.0.0.1"))
            .unwrap();
        let dialer = Dialer::new(Duration::from_secs(1)).with_proxy(proxy);
        assert!(dialer.connect("127.0.0.1", port).await.is_ok());
    }
}
