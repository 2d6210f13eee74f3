//! # Target Resolution
//!
//! Turns a target specification string into a concrete, deduplicated
//! sequence of host addresses. Supported forms:
//! * A CIDR block (e.g. `192.168.1.0/24`), expanded to its usable hosts.
//! * A single IP literal or resolvable hostname.
//! * A comma-separated list of the above two forms.

use std::collections::HashSet;
use std::net::{IpAddr, ToSocketAddrs};

use pnet::ipnetwork::IpNetwork;
use tracing::warn;

use crate::error::SpecError;

/// Ordered, duplicate-free sequence of scan targets.
///
/// An empty set is never constructed: resolution fails with
/// [`SpecError::InvalidTargetSpec`] instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetSet {
    addrs: Vec<IpAddr>,
}

impl TargetSet {
    pub fn resolve(spec: &str) -> Result<Self, SpecError> {
        let spec = spec.trim();

        let addrs = if spec.contains('/') {
            expand_cidr(spec)?
        } else if let Some(addr) = resolve_host(spec) {
            vec![addr]
        } else if spec.contains(',') {
            resolve_list(spec)
        } else {
            Vec::new()
        };

        let addrs = dedup_preserving_order(addrs);
        if addrs.is_empty() {
            return Err(SpecError::target(spec, "no resolvable targets"));
        }
        Ok(Self { addrs })
    }

    pub fn iter(&self) -> impl Iterator<Item = IpAddr> + '_ {
        self.addrs.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    pub fn contains(&self, addr: IpAddr) -> bool {
        self.addrs.contains(&addr)
    }
}

impl<'a> IntoIterator for &'a TargetSet {
    type Item = IpAddr;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, IpAddr>>;

    fn into_iter(self) -> Self::IntoIter {
        self.addrs.iter().copied()
    }
}

/// Expands a CIDR block to its usable host addresses.
///
/// For IPv4 the network and broadcast addresses are excluded; /31 and /32
/// networks have no such reserved addresses and yield everything they
/// contain. IPv6 has no broadcast, so the whole block is usable.
fn expand_cidr(spec: &str) -> Result<Vec<IpAddr>, SpecError> {
    let network: IpNetwork = spec
        .parse()
        .map_err(|e| SpecError::target(spec, format!("not a valid CIDR block: {e}")))?;

    match network {
        IpNetwork::V4(net) => {
            let addrs: Vec<IpAddr> = if net.prefix() >= 31 {
                net.iter().map(IpAddr::V4).collect()
            } else {
                net.iter()
                    .filter(|ip| *ip != net.network() && *ip != net.broadcast())
                    .map(IpAddr::V4)
                    .collect()
            };
            Ok(addrs)
        }
        IpNetwork::V6(net) => Ok(net.iter().map(IpAddr::V6).collect()),
    }
}

/// Resolves one element: an IP literal, or a hostname via name resolution.
fn resolve_host(s: &str) -> Option<IpAddr> {
    if let Ok(addr) = s.parse::<IpAddr>() {
        return Some(addr);
    }
    (s, 0u16)
        .to_socket_addrs()
        .ok()?
        .map(|sock| sock.ip())
        .next()
}

/// Resolves a comma-separated list. Unresolvable elements are skipped with
/// a warning; an all-unresolvable list surfaces as an empty result.
fn resolve_list(spec: &str) -> Vec<IpAddr> {
    let mut addrs = Vec::new();
    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match resolve_host(part) {
            Some(addr) => addrs.push(addr),
            None => warn!("could not resolve target: {part}"),
        }
    }
    addrs
}

fn dedup_preserving_order(addrs: Vec<IpAddr>) -> Vec<IpAddr> {
    let mut seen = HashSet::new();
    addrs.into_iter().filter(|a| seen.insert(*a)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn v4(a: u8, b: u8, c: u8, d: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(a, b, c, d))
    }

    #[test]
    fn cidr_expands_to_usable_hosts_only() {
        let set = TargetSet::resolve("10.0.0.0/30").unwrap();
        let addrs: Vec<IpAddr> = set.iter().collect();
        assert_eq!(addrs, vec![v4(10, 0, 0, 1), v4(10, 0, 0, 2)]);
    }

    #[test]
    fn cidr_slash_24_strips_network_and_broadcast() {
        let set = TargetSet::resolve("192.168.1.0/24").unwrap();
        assert_eq!(set.len(), 254);
        assert!(!set.contains(v4(192, 168, 1, 0)));
        assert!(!set.contains(v4(192, 168, 1, 255)));
        assert!(set.contains(v4(192, 168, 1, 1)));
    }

    #[test]
    fn tiny_prefixes_keep_all_addresses() {
        let set = TargetSet::resolve("10.0.0.4/31").unwrap();
        assert_eq!(set.len(), 2);

        let set = TargetSet::resolve("10.0.0.7/32").unwrap();
        let addrs: Vec<IpAddr> = set.iter().collect();
        assert_eq!(addrs, vec![v4(10, 0, 0, 7)]);
    }

    #[test]
    fn single_ip_literal() {
        let set = TargetSet::resolve("127.0.0.1").unwrap();
        let addrs: Vec<IpAddr> = set.iter().collect();
        assert_eq!(addrs, vec![v4(127, 0, 0, 1)]);
    }

    #[test]
    fn ipv6_literal() {
        let set = TargetSet::resolve("::1").unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn comma_list_skips_unresolvable_elements() {
        let set = TargetSet::resolve("127.0.0.1, definitely.not.a.real.host.invalid, 127.0.0.2")
            .unwrap();
        let addrs: Vec<IpAddr> = set.iter().collect();
        assert_eq!(addrs, vec![v4(127, 0, 0, 1), v4(127, 0, 0, 2)]);
    }

    #[test]
    fn comma_list_deduplicates_preserving_order() {
        let set = TargetSet::resolve("127.0.0.2,127.0.0.1,127.0.0.2").unwrap();
        let addrs: Vec<IpAddr> = set.iter().collect();
        assert_eq!(addrs, vec![v4(127, 0, 0, 2), v4(127, 0, 0, 1)]);
    }

    #[test]
    fn unresolvable_spec_is_fatal() {
        let err = TargetSet::resolve("definitely.not.a.real.host.invalid").unwrap_err();
        assert!(matches!(err, SpecError::InvalidTargetSpec { .. }));
    }

    #[test]
    fn bad_cidr_is_fatal() {
        assert!(TargetSet::resolve("10.0.0.0/33").is_err());
        assert!(TargetSet::resolve("300.0.0.0/24").is_err());
    }
}
