//! CSV output formatting.

use csv::WriterBuilder;
use std::io::{self, Write};

const HEADER: [&str; 3] = ["host", "port", "fingerprint"];

/// A CSV writer whose header is written explicitly with [`write_header`].
pub fn writer<W: Write>(out: W) -> csv::Writer<W> {
    WriterBuilder::new().has_headers(false).from_writer(out)
}

pub fn write_header<W: Write>(wtr: &mut csv::Writer<W>) -> io::Result<()> {
    wtr.write_record(HEADER)?;
    Ok(())
}

pub fn write_row<W: Write>(
    wtr: &mut csv::Writer<W>,
    host: &str,
    port: u16,
    fingerprint: &str,
) -> io::Result<()> {
    let port = port.to_string();
    wtr.write_record([host, port.as_str(), fingerprint])?;
    Ok(())
}
