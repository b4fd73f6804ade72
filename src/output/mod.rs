//! Result consolidation and output formatting.
//!
//! A single [`Consolidator`] drains the result queue and writes one record
//! per fingerprint to its sink, flushing after each so output streams while
//! the scan runs. Error results are logged, never written.
//!
//! Sinks are plain `std::io::Write`, so the consolidator blocks on every
//! write. The pipeline runs it on a blocking task.

mod csv_format;
mod json_format;
mod plain;

pub use plain::{format_line, print_error, HOST_WIDTH};

use crate::scanner::FingerprintResult;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};
use tokio::sync::mpsc;
use tracing::warn;

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Tab-separated lines
    #[default]
    Plain,
    /// One JSON object per line
    Json,
    /// CSV with a header row
    Csv,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

/// What the consolidator did with the results it received.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OutputStats {
    pub written: u64,
    pub failed: u64,
}

enum Sink<W: Write> {
    Plain(W),
    Json(W),
    Csv(csv::Writer<W>),
}

impl<W: Write> Sink<W> {
    fn new(format: OutputFormat, out: W) -> Self {
        match format {
            OutputFormat::Plain => Self::Plain(out),
            OutputFormat::Json => Self::Json(out),
            OutputFormat::Csv => Self::Csv(csv_format::writer(out)),
        }
    }

    fn begin(&mut self) -> io::Result<()> {
        match self {
            Self::Csv(wtr) => csv_format::write_header(wtr),
            _ => Ok(()),
        }
    }

    fn write(&mut self, host: &str, port: u16, fingerprint: &str) -> io::Result<()> {
        match self {
            Self::Plain(out) => writeln!(out, "{}", format_line(host, port, fingerprint)),
            Self::Json(out) => {
                writeln!(out, "{}", json_format::format_line(host, port, fingerprint)?)
            }
            Self::Csv(wtr) => csv_format::write_row(wtr, host, port, fingerprint),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(out) | Self::Json(out) => out.flush(),
            Self::Csv(wtr) => wtr.flush(),
        }
    }
}

/// Drains results into an output sink.
pub struct Consolidator<W: Write> {
    sink: Sink<W>,
}

impl<W: Write> Consolidator<W> {
    pub fn new(format: OutputFormat, out: W) -> Self {
        Self {
            sink: Sink::new(format, out),
        }
    }

    /// Consume results until every sender is gone.
    ///
    /// Blocks the calling thread, so it must not run on an async worker; use
    /// `tokio::task::spawn_blocking`. Returns early only when the sink fails.
    /// The receiver is dropped then, which stops the workers feeding it.
    pub fn run(
        mut self,
        mut results: mpsc::Receiver<FingerprintResult>,
    ) -> io::Result<OutputStats> {
        let mut stats = OutputStats::default();
        self.sink.begin()?;

        while let Some(result) = results.blocking_recv() {
            if let Some(error) = &result.error {
                warn!(addr = %result.target, error = %error, "target failed");
                stats.failed += 1;
                continue;
            }

            let target = &result.target;
            self.sink
                .write(&target.host, target.port.as_u16(), &result.fingerprint)?;
            self.sink.flush()?;
            stats.written += 1;
        }

        self.sink.flush()?;
        Ok(stats)
    }
}
