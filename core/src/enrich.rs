//! Post-scan enrichment: service names, OS guesses, reverse DNS.
//!
//! Enrichment runs sequentially after the pool drains and only over what
//! the scan actually found. Every step is best-effort; a failing lookup is
//! logged and skipped, never fatal.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{debug, warn};
use trust_dns_resolver::TokioAsyncResolver;
use wraith_common::config::ScanConfig;

use crate::probe::icmp;
use crate::store::{OsGuess, ResultStore};

/// What a service probe managed to identify on one port.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceInfo {
    pub name: String,
    pub product: Option<String>,
    pub version: Option<String>,
}

#[async_trait]
pub trait ServiceFingerprinter: Send + Sync {
    async fn identify(&self, port: u16, banner: Option<&str>) -> Option<ServiceInfo>;
}

#[async_trait]
pub trait OsFingerprinter: Send + Sync {
    async fn fingerprint(&self, addr: IpAddr, wait: Duration) -> anyhow::Result<Option<OsGuess>>;
}

#[async_trait]
pub trait ReverseResolver: Send + Sync {
    async fn reverse(&self, addr: IpAddr, wait: Duration) -> Option<String>;
}

const WELL_KNOWN: &[(u16, &str)] = &[
    (21, "ftp"),
    (22, "ssh"),
    (23, "telnet"),
    (25, "smtp"),
    (53, "domain"),
    (80, "http"),
    (110, "pop3"),
    (111, "rpcbind"),
    (135, "msrpc"),
    (139, "netbios-ssn"),
    (143, "imap"),
    (443, "https"),
    (445, "microsoft-ds"),
    (993, "imaps"),
    (995, "pop3s"),
    (1723, "pptp"),
    (3306, "mysql"),
    (3389, "ms-wbt-server"),
    (5900, "vnc"),
    (8080, "http-proxy"),
];

/// IANA-ish name for a well-known port.
pub fn well_known_name(port: u16) -> Option<&'static str> {
    WELL_KNOWN
        .iter()
        .find(|(p, _)| *p == port)
        .map(|(_, name)| *name)
}

/// Identifies services from the port number and any captured banner.
pub struct WellKnownServices;

#[async_trait]
impl ServiceFingerprinter for WellKnownServices {
    async fn identify(&self, port: u16, banner: Option<&str>) -> Option<ServiceInfo> {
        let name = well_known_name(port)?;
        let mut info = ServiceInfo {
            name: name.to_string(),
            product: None,
            version: None,
        };
        if let Some(banner) = banner {
            if let Some((product, version)) = parse_banner(banner) {
                info.product = Some(product);
                info.version = version;
            }
        }
        Some(info)
    }
}

/// Pulls product/version out of the two banner shapes worth knowing:
/// an SSH identification string or an HTTP `Server:` header.
fn parse_banner(banner: &str) -> Option<(String, Option<String>)> {
    if let Some(rest) = banner.strip_prefix("SSH-2.0-").or_else(|| banner.strip_prefix("SSH-1.99-")) {
        let ident = rest.split_whitespace().next()?;
        return Some(match ident.split_once('_') {
            Some((product, version)) => (product.to_string(), Some(version.to_string())),
            None => (ident.to_string(), None),
        });
    }
    for line in banner.lines() {
        if let Some(value) = line
            .strip_prefix("Server:")
            .or_else(|| line.strip_prefix("server:"))
        {
            let value = value.trim();
            return Some(match value.split_once('/') {
                Some((product, version)) => (
                    product.to_string(),
                    Some(version.split_whitespace().next().unwrap_or(version).to_string()),
                ),
                None => (value.to_string(), None),
            });
        }
    }
    None
}

/// Guesses the OS family from the TTL of an echo reply. Crude but cheap:
/// initial TTLs cluster at 64 (Unix-likes), 128 (Windows) and 255
/// (network gear), and few hops separate scanner and target on a LAN.
pub struct TtlFingerprinter;

#[async_trait]
impl OsFingerprinter for TtlFingerprinter {
    async fn fingerprint(&self, addr: IpAddr, wait: Duration) -> anyhow::Result<Option<OsGuess>> {
        let IpAddr::V4(dst) = addr else {
            return Ok(None);
        };
        let ttl = tokio::task::spawn_blocking(move || icmp::echo_exchange(dst, wait)).await??;
        Ok(ttl.map(guess_from_ttl))
    }
}

fn guess_from_ttl(ttl: u8) -> OsGuess {
    let (name, initial) = if ttl <= 64 {
        ("Linux/Unix", 64)
    } else if ttl <= 128 {
        ("Windows", 128)
    } else {
        ("Network device", 255)
    };
    OsGuess {
        name: name.to_string(),
        accuracy: if ttl == initial { 85 } else { 60 },
    }
}

/// PTR lookups through the system resolver configuration.
pub struct TrustDnsReverse {
    resolver: TokioAsyncResolver,
}

impl TrustDnsReverse {
    pub fn from_system_conf() -> anyhow::Result<Self> {
        Ok(Self {
            resolver: TokioAsyncResolver::tokio_from_system_conf()?,
        })
    }
}

#[async_trait]
impl ReverseResolver for TrustDnsReverse {
    async fn reverse(&self, addr: IpAddr, wait: Duration) -> Option<String> {
        let lookup = timeout(wait, self.resolver.reverse_lookup(addr)).await.ok()?;
        let lookup = lookup.ok()?;
        let name = lookup.iter().next()?;
        Some(name.to_utf8().trim_end_matches('.').to_string())
    }
}

/// The stages enabled for this invocation, in the order they run.
pub struct EnrichmentPipeline {
    services: Option<Box<dyn ServiceFingerprinter>>,
    os: Option<Box<dyn OsFingerprinter>>,
    dns: Option<Box<dyn ReverseResolver>>,
}

impl EnrichmentPipeline {
    pub fn from_config(cfg: &ScanConfig) -> Self {
        let dns: Option<Box<dyn ReverseResolver>> = if cfg.resolve_dns {
            match TrustDnsReverse::from_system_conf() {
                Ok(resolver) => Some(Box::new(resolver)),
                Err(e) => {
                    warn!(error = %e, "reverse DNS disabled: no usable resolver config");
                    None
                }
            }
        } else {
            None
        };
        Self {
            services: cfg
                .detect_services
                .then(|| Box::new(WellKnownServices) as Box<dyn ServiceFingerprinter>),
            os: cfg
                .detect_os
                .then(|| Box::new(TtlFingerprinter) as Box<dyn OsFingerprinter>),
            dns,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_none() && self.os.is_none() && self.dns.is_none()
    }

    /// Runs the enabled stages over everything the store holds.
    pub async fn run(&self, store: &ResultStore, wait: Duration) {
        if let Some(services) = &self.services {
            for (addr, ports) in store.open_ports() {
                for (port, banner) in ports {
                    if let Some(info) = services.identify(port, banner.as_deref()).await {
                        store.set_service(addr, port, info.name, info.product, info.version);
                    }
                }
            }
        }

        if let Some(os) = &self.os {
            for addr in store.up_hosts() {
                match os.fingerprint(addr, wait).await {
                    Ok(Some(guess)) => store.set_os(addr, guess),
                    Ok(None) => debug!(%addr, "no OS guess"),
                    Err(e) => warn!(%addr, error = %e, "OS fingerprint failed"),
                }
            }
        }

        if let Some(dns) = &self.dns {
            for addr in store.up_hosts() {
                if let Some(hostname) = dns.reverse(addr, wait).await {
                    store.set_hostname(addr, hostname);
                }
            }
        }
    }
}
