//! Immutable scan reports: JSON serialization and the plain-text summary.

use std::fmt::Write as _;
use std::fs::File;
use std::io::BufWriter;
use std::net::IpAddr;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use wraith_common::config::ScanKind;
use wraith_common::network::target::TargetSet;

use crate::store::{HostRecord, HostStatus, PortRecord, PortState, ResultStore};

const BANNER_PREVIEW_LINES: usize = 2;

#[derive(Clone, Debug, Serialize)]
pub struct ScanInfo {
    /// Unix timestamps in fractional seconds.
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub scan_type: ScanKind,
    pub targets: String,
    pub ports: String,
}

/// Host records keyed by address, kept in insertion order. Serializes as
/// a JSON object mapping address to record.
#[derive(Clone, Debug, Default)]
pub struct HostMap {
    entries: Vec<(IpAddr, HostRecord)>,
}

impl HostMap {
    fn push(&mut self, addr: IpAddr, record: HostRecord) {
        self.entries.push((addr, record));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, addr: IpAddr) -> Option<&HostRecord> {
        self.entries
            .iter()
            .find(|(a, _)| *a == addr)
            .map(|(_, record)| record)
    }

    pub fn iter(&self) -> impl Iterator<Item = (IpAddr, &HostRecord)> {
        self.entries.iter().map(|(addr, record)| (*addr, record))
    }

    pub fn addrs(&self) -> impl Iterator<Item = IpAddr> + '_ {
        self.entries.iter().map(|(addr, _)| *addr)
    }
}

impl Serialize for HostMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (addr, record) in &self.entries {
            map.serialize_entry(addr, record)?;
        }
        map.end()
    }
}

/// The final product of a scan. Built once, never mutated afterwards.
#[derive(Clone, Debug, Serialize)]
pub struct ScanReport {
    pub scan_info: ScanInfo,
    pub hosts: HostMap,
}

/// Captures invocation metadata up front and assembles the report when
/// the engine hands the store back.
pub struct ReportBuilder {
    start_time: f64,
    scan_type: ScanKind,
    targets: String,
    ports: String,
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

impl ReportBuilder {
    pub fn start(scan_type: ScanKind, target_spec: &str, port_spec: &str) -> Self {
        Self {
            start_time: unix_now(),
            scan_type,
            targets: target_spec.to_string(),
            ports: port_spec.to_string(),
        }
    }

    /// Consumes the store. Hosts keep the order of the resolved target
    /// set; anything the store learned beyond that is appended sorted.
    pub fn finish(self, store: ResultStore, order: &TargetSet) -> ScanReport {
        let end_time = unix_now();
        let mut records = store.into_hosts();

        let mut hosts = HostMap::default();
        for addr in order {
            if let Some(record) = records.remove(&addr) {
                hosts.push(addr, record);
            }
        }
        let mut leftovers: Vec<(IpAddr, HostRecord)> = records.into_iter().collect();
        leftovers.sort_by_key(|(addr, _)| *addr);
        for (addr, record) in leftovers {
            hosts.push(addr, record);
        }

        ScanReport {
            scan_info: ScanInfo {
                start_time: self.start_time,
                end_time,
                duration: end_time - self.start_time,
                scan_type: self.scan_type,
                targets: self.targets,
                ports: self.ports,
            },
            hosts,
        }
    }
}

impl ScanReport {
    pub fn hosts_up(&self) -> usize {
        self.hosts
            .iter()
            .filter(|(_, record)| record.status == HostStatus::Up)
            .count()
    }

    pub fn open_port_count(&self) -> usize {
        self.hosts
            .iter()
            .flat_map(|(_, record)| record.ports.values())
            .filter(|p| p.state.is_positive())
            .count()
    }

    fn proto(&self) -> &'static str {
        match self.scan_info.scan_type {
            ScanKind::Udp => "udp",
            _ => "tcp",
        }
    }

    /// Plain-text summary, one block per responsive host.
    pub fn summary(&self) -> String {
        let bar = "=".repeat(60);
        let mut out = String::new();
        let _ = writeln!(out, "{bar}");
        let _ = writeln!(out, "SCAN SUMMARY");
        let _ = writeln!(out, "{bar}");
        let _ = writeln!(
            out,
            "Scanned {} hosts, {} hosts up, {} open ports found",
            self.hosts.len(),
            self.hosts_up(),
            self.open_port_count()
        );
        let _ = writeln!(out, "Scan duration: {:.2} seconds", self.scan_info.duration);

        for (addr, record) in self
            .hosts
            .iter()
            .filter(|(_, record)| record.status == HostStatus::Up)
        {
            let _ = writeln!(out);
            match &record.hostname {
                Some(name) => {
                    let _ = writeln!(out, "Host: {addr} ({name})");
                }
                None => {
                    let _ = writeln!(out, "Host: {addr}");
                }
            }
            if let Some(mac) = &record.mac {
                let _ = writeln!(out, "  MAC: {mac}");
            }
            if let Some(os) = &record.os {
                let _ = writeln!(out, "  OS: {} ({}%)", os.name, os.accuracy);
            }

            let open: Vec<_> = record
                .ports
                .iter()
                .filter(|(_, p)| p.state.is_positive())
                .collect();
            if open.is_empty() {
                continue;
            }
            let _ = writeln!(out, "  Open ports:");
            for (port, port_record) in open {
                let mut line = format!(
                    "    {port}/{}\t{}",
                    self.proto(),
                    self.service_label(port_record)
                );
                if port_record.state == PortState::PossiblyOpen {
                    line.push_str(" (possibly open)");
                }
                let _ = writeln!(out, "{line}");
                if let Some(banner) = &port_record.banner {
                    for preview in banner.lines().take(BANNER_PREVIEW_LINES) {
                        let _ = writeln!(out, "      {preview}");
                    }
                    if banner.lines().count() > BANNER_PREVIEW_LINES {
                        let _ = writeln!(out, "      ...");
                    }
                }
            }
        }
        out
    }

    fn service_label(&self, record: &PortRecord) -> String {
        let name = record.service.as_deref().unwrap_or("unknown");
        match (&record.product, &record.version) {
            (Some(product), Some(version)) => format!("{name} - {product} {version}"),
            (Some(product), None) => format!("{name} - {product}"),
            _ => name.to_string(),
        }
    }

    pub fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        let file = File::create(path)
            .with_context(|| format!("creating report file {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self).context("serializing report")?;
        Ok(())
    }
}
