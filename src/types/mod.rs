//! Ports, port sets and targets.
//!
//! `Port` cannot hold 0, and a `Target` always carries a concrete port, so
//! everything past parsing works with validated values only.

mod port;
mod target;

pub use port::{parse_ports, Port, PortError, PortSet, DEFAULT_TLS_PORTS};
pub use target::{expand_addresses, split_host_port, Target, TargetError, TargetSpec};
