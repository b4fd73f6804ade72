//! JSON output formatting, one object per line.

use serde::Serialize;
use std::io;

#[derive(Debug, Serialize)]
struct Record<'a> {
    host: &'a str,
    port: u16,
    fingerprint: &'a str,
}

/// Format one result as a single-line JSON object.
pub fn format_line(host: &str, port: u16, fingerprint: &str) -> io::Result<String> {
    let record = Record {
        host,
        port,
        fingerprint,
    };
    serde_json::to_string(&record).map_err(|e| io::Error::new(io::ErrorKind::Other, e))
}
