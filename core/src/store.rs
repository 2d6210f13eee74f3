//! Thread-safe aggregation of scan findings.
//!
//! One [`ResultStore`] lives for exactly one scan invocation. All mutation
//! goes through a single coarse mutex: write volume is tiny compared to
//! probe volume, so correctness wins over micro-parallel writes. Nothing
//! performs I/O while holding the lock.

use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::sync::Mutex;

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PortState {
    Open,
    Closed,
    Filtered,
    /// UDP silence: no reply and no ICMP unreachable. Deliberately kept
    /// distinct from `Open` because the protocol cannot distinguish an
    /// open port from a dropped datagram.
    PossiblyOpen,
}

impl PortState {
    pub fn is_positive(self) -> bool {
        matches!(self, PortState::Open | PortState::PossiblyOpen)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostStatus {
    #[default]
    Unknown,
    Up,
}

/// One discovered port. Created on the first positive probe, mutated only
/// by the enrichment pipeline afterwards, never deleted.
#[derive(Clone, Debug, Serialize)]
pub struct PortRecord {
    pub state: PortState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
}

impl PortRecord {
    fn new(state: PortState) -> Self {
        Self {
            state,
            service: None,
            product: None,
            version: None,
            banner: None,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct OsGuess {
    pub name: String,
    /// Match confidence in percent; zero-confidence guesses are discarded
    /// before they reach the record.
    pub accuracy: u8,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct HostRecord {
    pub status: HostStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<OsGuess>,
    /// BTreeMap keeps ports sorted ascending for reporting.
    pub ports: BTreeMap<u16, PortRecord>,
}

/// Shared, mutex-guarded host/port aggregation.
#[derive(Debug, Default)]
pub struct ResultStore {
    hosts: Mutex<HashMap<IpAddr, HostRecord>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures a record exists for `addr` without touching its status.
    pub fn touch(&self, addr: IpAddr) {
        let mut hosts = self.hosts.lock().unwrap();
        hosts.entry(addr).or_default();
    }

    /// Marks a host as up, recording its MAC when discovery learned one.
    /// Status is monotonic: a host never regresses to unknown.
    pub fn mark_up(&self, addr: IpAddr, mac: Option<String>) {
        let mut hosts = self.hosts.lock().unwrap();
        let record = hosts.entry(addr).or_default();
        record.status = HostStatus::Up;
        if record.mac.is_none() {
            record.mac = mac;
        }
    }

    /// Records a positive port probe, promoting the host to up.
    pub fn record_port(
        &self,
        addr: IpAddr,
        port: u16,
        state: PortState,
        service: Option<String>,
        banner: Option<String>,
    ) {
        let mut hosts = self.hosts.lock().unwrap();
        let host = hosts.entry(addr).or_default();
        host.status = HostStatus::Up;
        let record = host.ports.entry(port).or_insert_with(|| PortRecord::new(state));
        record.state = state;
        if record.service.is_none() {
            record.service = service;
        }
        if record.banner.is_none() {
            record.banner = banner;
        }
    }

    pub fn set_hostname(&self, addr: IpAddr, hostname: String) {
        let mut hosts = self.hosts.lock().unwrap();
        if let Some(record) = hosts.get_mut(&addr) {
            record.hostname = Some(hostname);
        }
    }

    pub fn set_os(&self, addr: IpAddr, os: OsGuess) {
        let mut hosts = self.hosts.lock().unwrap();
        if let Some(record) = hosts.get_mut(&addr) {
            record.os = Some(os);
        }
    }

    pub fn set_service(
        &self,
        addr: IpAddr,
        port: u16,
        name: String,
        product: Option<String>,
        version: Option<String>,
    ) {
        let mut hosts = self.hosts.lock().unwrap();
        if let Some(record) = hosts.get_mut(&addr).and_then(|h| h.ports.get_mut(&port)) {
            record.service = Some(name);
            record.product = product;
            record.version = version;
        }
    }

    /// Every host currently known to the store.
    pub fn addrs(&self) -> Vec<IpAddr> {
        self.hosts.lock().unwrap().keys().copied().collect()
    }

    pub fn up_hosts(&self) -> Vec<IpAddr> {
        self.hosts
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, record)| record.status == HostStatus::Up)
            .map(|(addr, _)| *addr)
            .collect()
    }

    /// Per-host open ports with any captured banner, for enrichment.
    pub fn open_ports(&self) -> Vec<(IpAddr, Vec<(u16, Option<String>)>)> {
        self.hosts
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(addr, record)| {
                let ports: Vec<(u16, Option<String>)> = record
                    .ports
                    .iter()
                    .filter(|(_, p)| p.state.is_positive())
                    .map(|(port, p)| (*port, p.banner.clone()))
                    .collect();
                (!ports.is_empty()).then(|| (*addr, ports))
            })
            .collect()
    }

    pub fn get(&self, addr: IpAddr) -> Option<HostRecord> {
        self.hosts.lock().unwrap().get(&addr).cloned()
    }

    pub fn host_count(&self) -> usize {
        self.hosts.lock().unwrap().len()
    }

    /// Consumes the store once all workers are gone.
    pub fn into_hosts(self) -> HashMap<IpAddr, HostRecord> {
        self.hosts.into_inner().unwrap()
    }
}
