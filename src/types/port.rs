//! Port types with validation and parsing.
//!
//! The `Port` newtype ensures values are always valid port numbers (1-65535).
//! `PortSet` is the deduplicated result of parsing a port specification.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Ports selected by the `default` keyword when the caller has no list of its own.
pub const DEFAULT_TLS_PORTS: &[u16] = &[443, 465, 636, 853, 993, 995, 8443];

/// A validated network port number (1-65535).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Port(u16);

impl Port {
    /// Minimum valid port number.
    pub const MIN: u16 = 1;
    /// Maximum valid port number.
    pub const MAX: u16 = 65535;

    /// Create a new Port from a u16, returning None if invalid.
    #[inline]
    pub const fn new(port: u16) -> Option<Self> {
        if port >= Self::MIN {
            Some(Self(port))
        } else {
            None
        }
    }

    /// Get the raw port number.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u16> for Port {
    type Error = PortError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| PortError::InvalidPort(value.to_string()))
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.0
    }
}

/// Error type for port specification parsing.
///
/// Each variant carries the offending token as it appeared in the input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("invalid port {0}")]
    InvalidPort(String),
    #[error("invalid port range {0}")]
    InvalidRange(String),
    #[error("empty port specification")]
    Empty,
}

/// A deduplicated set of ports.
///
/// Iteration is ascending, but callers must not rely on any particular order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSet {
    ports: BTreeSet<Port>,
}

impl PortSet {
    /// Create an empty port set.
    pub const fn new() -> Self {
        Self {
            ports: BTreeSet::new(),
        }
    }

    /// Add a single port.
    pub fn insert(&mut self, port: Port) {
        self.ports.insert(port);
    }

    /// Add every port of an inclusive range.
    pub fn insert_range(&mut self, start: Port, end: Port) {
        self.ports.extend((start.0..=end.0).map(Port));
    }

    pub fn contains(&self, port: Port) -> bool {
        self.ports.contains(&port)
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Port> + '_ {
        self.ports.iter().copied()
    }

    /// Build a set from raw numbers, skipping 0.
    pub fn from_raw(ports: &[u16]) -> Self {
        ports.iter().filter_map(|&p| Port::new(p)).collect()
    }

    /// The built-in TLS port list.
    pub fn default_tls() -> Self {
        Self::from_raw(DEFAULT_TLS_PORTS)
    }

    /// Parse a port specification, expanding the `default` keyword to `defaults`.
    ///
    /// Supports:
    /// - Single ports: "443"
    /// - Inclusive ranges: "8000-8010"
    /// - The full range: "-"
    /// - The caller's defaults: "default" or "defaults"
    /// - Comma-separated mixes of the above: "default,8443,9000-9010"
    ///
    /// Parsing stops at the first bad token.
    pub fn parse_with_defaults(spec: &str, defaults: &PortSet) -> Result<Self, PortError> {
        if spec.trim().is_empty() {
            return Err(PortError::Empty);
        }

        let mut set = Self::new();

        for token in spec.split(',') {
            let token = token.trim();

            if token == "default" || token == "defaults" {
                set.ports.extend(defaults.iter());
                continue;
            }

            if token == "-" {
                set.insert_range(Port(Port::MIN), Port(Port::MAX));
                continue;
            }

            let bounds: Vec<&str> = token.split('-').collect();
            match bounds.as_slice() {
                [single] => {
                    let port = parse_port(single)
                        .ok_or_else(|| PortError::InvalidPort(token.to_string()))?;
                    set.insert(port);
                }
                [start, end] => {
                    let start = parse_port(start)
                        .ok_or_else(|| PortError::InvalidPort(token.to_string()))?;
                    let end = parse_port(end)
                        .ok_or_else(|| PortError::InvalidPort(token.to_string()))?;
                    if start > end {
                        return Err(PortError::InvalidRange(token.to_string()));
                    }
                    set.insert_range(start, end);
                }
                _ => return Err(PortError::InvalidRange(token.to_string())),
            }
        }

        Ok(set)
    }
}

/// Parse a port specification against a caller-supplied default set.
pub fn parse_ports(spec: &str, defaults: &PortSet) -> Result<PortSet, PortError> {
    PortSet::parse_with_defaults(spec, defaults)
}

fn parse_port(s: &str) -> Option<Port> {
    s.trim().parse::<u16>().ok().and_then(Port::new)
}

impl FromStr for PortSet {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_with_defaults(s, &Self::default_tls())
    }
}

impl FromIterator<Port> for PortSet {
    fn from_iter<I: IntoIterator<Item = Port>>(iter: I) -> Self {
        Self {
            ports: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for PortSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.ports.iter().map(|p| p.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}
