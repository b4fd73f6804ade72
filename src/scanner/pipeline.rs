//! The scan pipeline: producer, worker pool and consolidator.
//!
//! ```text
//! tokens -> producer -> [target queue] -> W workers -> [result queue] -> consolidator
//! ```
//!
//! Both queues are bounded, so a slow stage holds back the stages before
//! it. Shutdown runs front to back: the producer drops the target sender
//! once every token is expanded, the workers drain the queue and exit,
//! their result senders drop with them, and the consolidator finishes
//! after the last result.

use crate::config::ScanConfig;
use crate::error::{ScanError, ScanResult};
use crate::output::{Consolidator, OutputStats};
use crate::scanner::backoff::Backoff;
use crate::scanner::traits::{FingerprintResult, Prober};
use crate::types::{PortSet, Target, TargetSpec};
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, trace, warn};

/// Counters for a finished scan.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    /// Targets handed to the worker pool.
    pub queued: u64,
    /// Targets a worker ran a probe cycle for.
    pub probed: u64,
    /// Results passed on to the consolidator.
    pub reported: u64,
    /// Targets that produced no result.
    pub dropped: u64,
    pub output: OutputStats,
    pub elapsed: Duration,
}

#[derive(Debug, Default, Clone, Copy)]
struct WorkerStats {
    probed: u64,
    reported: u64,
    dropped: u64,
}

impl std::ops::AddAssign for WorkerStats {
    fn add_assign(&mut self, other: Self) {
        self.probed += other.probed;
        self.reported += other.reported;
        self.dropped += other.dropped;
    }
}

/// Fingerprint every target the tokens expand to.
///
/// Tokens that cannot be resolved are logged and skipped. Runs until every
/// target has been probed and every result consolidated.
pub async fn run_scan<W>(
    prober: Arc<dyn Prober>,
    config: &ScanConfig,
    tokens: Vec<String>,
    consolidator: Consolidator<W>,
) -> ScanResult<ScanSummary>
where
    W: Write + Send + 'static,
{
    let start = Instant::now();
    let capacity = config.queue_capacity.max(1);
    let (target_tx, target_rx) = mpsc::channel::<Target>(capacity);
    let (result_tx, result_rx) = mpsc::channel::<FingerprintResult>(capacity);

    let consolidator = tokio::task::spawn_blocking(move || consolidator.run(result_rx));

    let target_rx = Arc::new(Mutex::new(target_rx));
    let mut workers = Vec::with_capacity(config.workers);
    for worker_id in 0..config.workers {
        workers.push(tokio::spawn(worker(
            worker_id,
            Arc::clone(&prober),
            Arc::clone(&target_rx),
            result_tx.clone(),
        )));
    }
    // Workers hold the only result senders from here on.
    drop(result_tx);
    drop(target_rx);

    let producer = tokio::spawn(produce(
        tokens,
        config.ports.clone(),
        config.retries,
        config.backoff.build(),
        target_tx,
    ));
    let queued = producer.await.map_err(|e| ScanError::Task(e.to_string()))?;
    debug!(queued, "all targets queued");

    let mut totals = WorkerStats::default();
    for result in futures::future::join_all(workers).await {
        totals += result.map_err(|e| ScanError::Task(e.to_string()))?;
    }

    let output = consolidator
        .await
        .map_err(|e| ScanError::Task(e.to_string()))?
        .map_err(ScanError::Output)?;

    let summary = ScanSummary {
        queued,
        probed: totals.probed,
        reported: totals.reported,
        dropped: totals.dropped,
        output,
        elapsed: start.elapsed(),
    };
    info!(
        queued = summary.queued,
        probed = summary.probed,
        reported = summary.reported,
        dropped = summary.dropped,
        written = summary.output.written,
        failed = summary.output.failed,
        elapsed = ?summary.elapsed,
        "scan complete"
    );
    Ok(summary)
}

/// Resolve and expand every token into the target queue.
///
/// Returns the number of targets queued. Stops early if the workers are
/// gone.
async fn produce(
    tokens: Vec<String>,
    ports: PortSet,
    retries: u32,
    backoff: Arc<dyn Backoff>,
    targets: mpsc::Sender<Target>,
) -> u64 {
    let mut queued = 0;

    for token in tokens {
        let spec = match TargetSpec::resolve(&token) {
            Ok(spec) => spec,
            Err(e) => {
                warn!(token = %token, error = %e, "skipping target");
                continue;
            }
        };

        for (host, port) in spec.expand(&ports) {
            let target = Target::new(host, port, retries, Arc::clone(&backoff));
            if targets.send(target).await.is_err() {
                warn!("target queue closed early");
                return queued;
            }
            queued += 1;
        }
    }

    queued
}

async fn worker(
    worker_id: usize,
    prober: Arc<dyn Prober>,
    targets: Arc<Mutex<mpsc::Receiver<Target>>>,
    results: mpsc::Sender<FingerprintResult>,
) -> WorkerStats {
    let mut stats = WorkerStats::default();

    loop {
        let target = {
            let mut rx = targets.lock().await;
            rx.recv().await
        };
        let Some(target) = target else {
            break;
        };

        stats.probed += 1;
        match prober.probe(target).await {
            Some(result) => {
                if results.send(result).await.is_err() {
                    break;
                }
                stats.reported += 1;
            }
            None => stats.dropped += 1,
        }
    }

    trace!(worker_id, probed = stats.probed, "worker finished");
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Barrier;

    /// A `Write` sink the test keeps a handle to.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<std::sync::Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn lines(&self) -> Vec<String> {
            let buf = self.0.lock().unwrap();
            String::from_utf8_lossy(&buf)
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    /// Fingerprints a target as its own address.
    struct AddrProber;

    #[async_trait]
    impl Prober for AddrProber {
        async fn probe(&self, target: Target) -> Option<FingerprintResult> {
            let addr = target.addr();
            Some(FingerprintResult::success(target, addr))
        }
    }

    /// Waits until `workers` probes are in flight at once.
    struct BarrierProber {
        barrier: Barrier,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Prober for BarrierProber {
        async fn probe(&self, target: Target) -> Option<FingerprintResult> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.barrier.wait().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Some(FingerprintResult::success(target, "f"))
        }
    }

    /// Drops every target on an odd port, fails every target on port 13.
    struct FlakyProber;

    #[async_trait]
    impl Prober for FlakyProber {
        async fn probe(&self, target: Target) -> Option<FingerprintResult> {
            match target.port.as_u16() {
                13 => Some(FingerprintResult::failed(target, ScanError::Timeout)),
                p if p % 2 == 1 => None,
                _ => Some(FingerprintResult::success(target, "f")),
            }
        }
    }

    fn config(ports: &[u16], workers: usize) -> ScanConfig {
        ScanConfig::new(PortSet::from_raw(ports), workers).unwrap()
    }

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_every_target_consolidated_once() {
        let out = SharedBuf::default();
        let summary = run_scan(
            Arc::new(AddrProber),
            &config(&[443, 8443], 3),
            tokens(&["a.example", "b.example:9000", "c.example,10"]),
            Consolidator::new(OutputFormat::Plain, out.clone()),
        )
        .await
        .unwrap();

        assert_eq!(summary.queued, 4);
        assert_eq!(summary.reported, 4);
        assert_eq!(summary.output.written, 4);

        let lines: HashSet<String> = out.lines().into_iter().collect();
        assert_eq!(lines.len(), 4);
        for addr in ["a.example:443", "a.example:8443", "b.example:9000", "c.example:10"] {
            assert!(lines.iter().any(|l| l.ends_with(&format!("\t{addr}"))), "{addr}");
        }
    }

    #[tokio::test]
    async fn test_cidr_range_expands_to_each_address() {
        let out = SharedBuf::default();
        let summary = run_scan(
            Arc::new(AddrProber),
            &config(&[443], 2),
            tokens(&["192.0.2.0/30"]),
            Consolidator::new(OutputFormat::Plain, out.clone()),
        )
        .await
        .unwrap();

        assert_eq!(summary.queued, 4);
        let mut fingerprints: Vec<String> = out
            .lines()
            .iter()
            .filter_map(|l| l.rsplit('\t').next().map(str::to_string))
            .collect();
        fingerprints.sort();
        assert_eq!(
            fingerprints,
            vec!["192.0.2.0:443", "192.0.2.1:443", "192.0.2.2:443", "192.0.2.3:443"]
        );
    }

    #[tokio::test]
    async fn test_peak_concurrency_equals_worker_count() {
        const WORKERS: usize = 4;
        let prober = Arc::new(BarrierProber {
            barrier: Barrier::new(WORKERS),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });

        let hosts: Vec<String> = (0..12).map(|i| format!("host{i}.example")).collect();
        let summary = run_scan(
            Arc::clone(&prober) as Arc<dyn Prober>,
            &config(&[443], WORKERS),
            hosts,
            Consolidator::new(OutputFormat::Plain, SharedBuf::default()),
        )
        .await
        .unwrap();

        assert_eq!(summary.reported, 12);
        assert_eq!(prober.peak.load(Ordering::SeqCst), WORKERS);
    }

    #[tokio::test]
    async fn test_dropped_and_failed_targets_counted() {
        let out = SharedBuf::default();
        let summary = run_scan(
            Arc::new(FlakyProber),
            &config(&[10, 11, 12, 13], 2),
            tokens(&["host.example"]),
            Consolidator::new(OutputFormat::Plain, out.clone()),
        )
        .await
        .unwrap();

        assert_eq!(summary.queued, 4);
        assert_eq!(summary.probed, 4);
        assert_eq!(summary.dropped, 1);
        assert_eq!(summary.reported, 3);
        assert_eq!(summary.output.written, 2);
        assert_eq!(summary.output.failed, 1);
        assert_eq!(out.lines().len(), 2);
    }

    #[tokio::test]
    async fn test_unresolvable_tokens_skipped() {
        let summary = run_scan(
            Arc::new(AddrProber),
            &config(&[443], 1),
            tokens(&[":443", "ok.example"]),
            Consolidator::new(OutputFormat::Plain, SharedBuf::default()),
        )
        .await
        .unwrap();

        assert_eq!(summary.queued, 1);
        assert_eq!(summary.output.written, 1);
    }

    /// A sink whose writes wait until the gate opens, for up to five seconds.
    #[derive(Clone, Default)]
    struct GatedBuf {
        gate: Arc<(std::sync::Mutex<bool>, std::sync::Condvar)>,
        opened_before_write: Arc<AtomicUsize>,
        inner: SharedBuf,
    }

    impl GatedBuf {
        fn open(&self) {
            let (open, cvar) = &*self.gate;
            *open.lock().unwrap() = true;
            cvar.notify_all();
        }
    }

    impl Write for GatedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let (open, cvar) = &*self.gate;
            let (open, _) = cvar
                .wait_timeout_while(open.lock().unwrap(), Duration::from_secs(5), |o| !*o)
                .unwrap();
            if *open {
                self.opened_before_write.fetch_add(1, Ordering::SeqCst);
            }
            self.inner.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Opens the gate once every expected target has been probed.
    struct GateProber {
        out: GatedBuf,
        probed: AtomicUsize,
        expected: usize,
    }

    #[async_trait]
    impl Prober for GateProber {
        async fn probe(&self, target: Target) -> Option<FingerprintResult> {
            if self.probed.fetch_add(1, Ordering::SeqCst) + 1 == self.expected {
                self.out.open();
            }
            let addr = target.addr();
            Some(FingerprintResult::success(target, addr))
        }
    }

    #[tokio::test]
    async fn test_blocked_output_does_not_stall_workers() {
        let out = GatedBuf::default();
        let prober = Arc::new(GateProber {
            out: out.clone(),
            probed: AtomicUsize::new(0),
            expected: 4,
        });

        // Single-threaded runtime: a blocking write on it would starve the workers
        let summary = run_scan(
            prober,
            &config(&[443], 4),
            tokens(&["a.example", "b.example", "c.example", "d.example"]),
            Consolidator::new(OutputFormat::Plain, out.clone()),
        )
        .await
        .unwrap();

        assert_eq!(summary.output.written, 4);
        assert_eq!(out.inner.lines().len(), 4);
        assert!(out.opened_before_write.load(Ordering::SeqCst) >= 4);
    }

    #[tokio::test]
    async fn test_no_tokens() {
        let summary = run_scan(
            Arc::new(AddrProber),
            &config(&[443], 8),
            Vec::new(),
            Consolidator::new(OutputFormat::Plain, SharedBuf::default()),
        )
        .await
        .unwrap();
        assert_eq!(summary.queued, 0);
        assert_eq!(summary.output, OutputStats::default());
    }
}
