//! The probe strategy abstraction and its closed set of implementations.
//!
//! Every strategy maps ordinary network failures (timeouts, refusals,
//! unreachables) to a [`PortState`] instead of propagating them; an `Err`
//! escaping `probe` means the strategy itself could not run (missing
//! privileges, no usable interface) and is downgraded to `closed` by the
//! scheduler.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use wraith_common::config::ScanKind;

use crate::scheduler::ScanTask;
use crate::store::PortState;

pub mod arp;
pub mod banner;
pub mod icmp;
pub mod syn;
pub mod tcp;
pub mod udp;

/// The outcome of one probe attempt.
#[derive(Clone, Debug)]
pub struct Probe {
    pub state: PortState,
    /// Hardware address learned from an ARP reply.
    pub mac: Option<String>,
    /// IP TTL observed on an echo reply.
    pub ttl: Option<u8>,
}

impl Probe {
    pub fn state(state: PortState) -> Self {
        Self {
            state,
            mac: None,
            ttl: None,
        }
    }

    pub fn closed() -> Self {
        Self::state(PortState::Closed)
    }
}

#[async_trait]
pub trait ProbeStrategy: Send + Sync {
    async fn probe(&self, task: &ScanTask, timeout: Duration) -> anyhow::Result<Probe>;
}

/// Selects the strategy for a scan kind. The set is closed at compile
/// time; there is no runtime strategy discovery.
pub fn strategy_for(kind: ScanKind) -> Arc<dyn ProbeStrategy> {
    match kind {
        ScanKind::Tcp => Arc::new(tcp::TcpConnect),
        ScanKind::Syn => Arc::new(syn::SynProbe),
        ScanKind::Udp => Arc::new(udp::UdpProbe),
        ScanKind::Arp => Arc::new(arp::ArpProbe),
        ScanKind::Ping => Arc::new(icmp::PingProbe),
    }
}
