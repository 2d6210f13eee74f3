use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

/// The probe strategy a scan runs with.
///
/// This is a closed, compile-time set: pluggable probe behaviour is modeled
/// as variants here, never as runtime-discovered modules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanKind {
    /// Full TCP handshake.
    Tcp,
    /// Half-open SYN probe over a raw socket.
    Syn,
    /// Connectionless UDP inference.
    Udp,
    /// Link-layer host discovery.
    Arp,
    /// ICMP echo host discovery.
    Ping,
}

impl ScanKind {
    /// ARP and ICMP scans probe hosts, not (host, port) pairs.
    pub fn is_host_discovery(self) -> bool {
        matches!(self, ScanKind::Arp | ScanKind::Ping)
    }

    /// Raw-socket strategies need elevated privileges on most platforms.
    pub fn needs_raw_sockets(self) -> bool {
        matches!(self, ScanKind::Syn | ScanKind::Arp | ScanKind::Ping)
    }
}

impl FromStr for ScanKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(ScanKind::Tcp),
            "syn" => Ok(ScanKind::Syn),
            "udp" => Ok(ScanKind::Udp),
            "arp" => Ok(ScanKind::Arp),
            "ping" => Ok(ScanKind::Ping),
            other => Err(format!("unknown scan type: {other}")),
        }
    }
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanKind::Tcp => "tcp",
            ScanKind::Syn => "syn",
            ScanKind::Udp => "udp",
            ScanKind::Arp => "arp",
            ScanKind::Ping => "ping",
        };
        f.write_str(name)
    }
}

/// Per-invocation scan settings, passed explicitly through the engine.
#[derive(Clone, Debug)]
pub struct ScanConfig {
    pub kind: ScanKind,
    /// Worker count for the scheduler pool.
    pub workers: usize,
    /// Timeout applied to every individual probe.
    pub probe_timeout: Duration,
    /// Fixed delay between task enqueues (coarse rate limiting).
    pub enqueue_delay: Duration,
    /// Randomize per-host port order before enqueueing.
    pub stealth: bool,
    pub detect_services: bool,
    pub detect_os: bool,
    pub resolve_dns: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            kind: ScanKind::Tcp,
            workers: 10,
            probe_timeout: Duration::from_secs(1),
            enqueue_delay: Duration::ZERO,
            stealth: false,
            detect_services: false,
            detect_os: false,
            resolve_dns: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_kind_round_trips_through_strings() {
        for name in ["tcp", "syn", "udp", "arp", "ping"] {
            let kind: ScanKind = name.parse().unwrap();
            assert_eq!(kind.to_string(), name);
        }
        assert!("xmas".parse::<ScanKind>().is_err());
    }

    #[test]
    fn host_discovery_kinds() {
        assert!(ScanKind::Arp.is_host_discovery());
        assert!(ScanKind::Ping.is_host_discovery());
        assert!(!ScanKind::Tcp.is_host_discovery());
        assert!(!ScanKind::Udp.is_host_discovery());
    }
}
