//! Plain text output formatting.
//!
//! One tab-separated line per fingerprint, plus styled diagnostics for the
//! terminal.

use console::style;

/// Width the host is right-aligned to. Longer hosts are printed as is.
pub const HOST_WIDTH: usize = 24;

/// Format one result line: `JARM\t<host>:<port>\t<fingerprint>`.
pub fn format_line(host: &str, port: u16, fingerprint: &str) -> String {
    format!("JARM\t{host:>width$}:{port}\t{fingerprint}", width = HOST_WIDTH)
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}
