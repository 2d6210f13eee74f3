use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use wraith_common::config::{ScanConfig, ScanKind};

#[derive(Parser)]
#[command(name = "wraith")]
#[command(about = "A concurrent network reconnaissance engine.")]
#[command(version)]
pub struct CommandLine {
    /// Target specification: IP, hostname, CIDR network, or a
    /// comma-separated list of those
    #[arg(short, long)]
    pub target: String,

    /// Port specification: single port, comma list, or range
    #[arg(short, long, default_value = "1-1000")]
    pub ports: String,

    /// Probe strategy: tcp, syn, udp, arp or ping
    #[arg(short = 's', long = "scan-type", default_value = "tcp")]
    pub scan_type: ScanKind,

    /// Number of concurrent workers
    #[arg(long, default_value_t = 10)]
    pub threads: usize,

    /// Per-probe timeout in seconds
    #[arg(long, default_value_t = 1.0)]
    pub timeout: f64,

    /// Delay between task enqueues in seconds
    #[arg(long, default_value_t = 0.0)]
    pub delay: f64,

    /// Randomize per-host port order
    #[arg(long)]
    pub stealth: bool,

    /// Identify services on open ports
    #[arg(long = "service-detection")]
    pub service_detection: bool,

    /// Guess the target OS from echo reply TTLs
    #[arg(long = "os-detection")]
    pub os_detection: bool,

    /// Reverse-resolve responsive hosts
    #[arg(long = "dns-lookup")]
    pub dns_lookup: bool,

    /// Write the report as JSON to this path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            kind: self.scan_type,
            workers: self.threads,
            probe_timeout: Duration::from_secs_f64(self.timeout),
            enqueue_delay: Duration::from_secs_f64(self.delay),
            stealth: self.stealth,
            detect_services: self.service_detection,
            detect_os: self.os_detection,
            resolve_dns: self.dns_lookup,
        }
    }
}
