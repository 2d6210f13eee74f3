//! # Port Resolution
//!
//! Turns a port specification string into a concrete, deduplicated
//! sequence of port numbers. Supported forms:
//! * Inclusive range: `1-1000`.
//! * Comma-separated list: `22,80,443`.
//! * Single port: `8080`.

use std::collections::HashSet;

use tracing::warn;

use crate::error::SpecError;

/// Ordered, duplicate-free sequence of ports to probe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortSet {
    ports: Vec<u16>,
}

impl PortSet {
    pub fn resolve(spec: &str) -> Result<Self, SpecError> {
        let spec = spec.trim();

        let ports = if spec.contains('-') {
            expand_range(spec)?
        } else {
            parse_list(spec)
        };

        let ports = dedup_preserving_order(ports);
        if ports.is_empty() {
            return Err(SpecError::ports(spec, "no valid ports"));
        }
        Ok(Self { ports })
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.ports.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.ports
    }
}

/// Expands `"A-B"` to the inclusive range A..=B.
///
/// Unlike list elements, a malformed range bound is fatal: the caller's
/// intent cannot be partially honored.
fn expand_range(spec: &str) -> Result<Vec<u16>, SpecError> {
    let Some((start, end)) = spec.split_once('-') else {
        return Err(SpecError::ports(spec, "malformed range"));
    };
    let start: u16 = start
        .trim()
        .parse()
        .map_err(|_| SpecError::ports(spec, format!("invalid range start '{}'", start.trim())))?;
    let end: u16 = end
        .trim()
        .parse()
        .map_err(|_| SpecError::ports(spec, format!("invalid range end '{}'", end.trim())))?;
    if start > end {
        return Err(SpecError::ports(spec, "range start exceeds range end"));
    }
    Ok((start..=end).collect())
}

/// Parses a comma-separated list (a single port is a one-element list).
/// Unparsable entries are dropped with a warning.
fn parse_list(spec: &str) -> Vec<u16> {
    let mut ports = Vec::new();
    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.parse::<u16>() {
            Ok(port) => ports.push(port),
            Err(_) => warn!("invalid port: {part}"),
        }
    }
    ports
}

fn dedup_preserving_order(ports: Vec<u16>) -> Vec<u16> {
    let mut seen = HashSet::new();
    ports.into_iter().filter(|p| seen.insert(*p)).collect()
}
