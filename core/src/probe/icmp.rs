//! ICMP echo host discovery over a layer-3 channel.

use std::net::{IpAddr, Ipv4Addr};
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use async_trait::async_trait;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::transport::{self, TransportChannelType};
use wraith_common::network::interface;
use wraith_protocols as protocols;

use crate::probe::{Probe, ProbeStrategy};
use crate::scheduler::ScanTask;
use crate::store::PortState;

const CHANNEL_BUFFER: usize = 4096;
const RECV_SLICE: Duration = Duration::from_millis(50);

pub struct PingProbe;

#[async_trait]
impl ProbeStrategy for PingProbe {
    async fn probe(&self, task: &ScanTask, wait: Duration) -> anyhow::Result<Probe> {
        let IpAddr::V4(dst) = task.addr else {
            bail!("icmp probe supports IPv4 targets only");
        };

        let reply = tokio::task::spawn_blocking(move || echo_exchange(dst, wait)).await??;
        Ok(match reply {
            Some(ttl) => Probe {
                state: PortState::Open,
                mac: None,
                ttl: Some(ttl),
            },
            None => Probe::closed(),
        })
    }
}

/// Sends one echo request and waits for a matching reply, returning the
/// reply's IP TTL. Shared with the TTL-based OS fingerprinter.
pub(crate) fn echo_exchange(dst: Ipv4Addr, wait: Duration) -> anyhow::Result<Option<u8>> {
    let src = interface::source_ipv4_for(dst).context("selecting source address")?;
    let identifier: u16 = rand::random();

    let (mut tx, mut rx) = transport::transport_channel(
        CHANNEL_BUFFER,
        TransportChannelType::Layer3(IpNextHeaderProtocols::Icmp),
    )
    .context("opening raw icmp channel")?;

    let request = protocols::icmp::build_echo_packet(src, dst, identifier, 0)?;
    let packet = Ipv4Packet::new(&request).context("viewing echo request")?;
    tx.send_to(packet, IpAddr::V4(dst))?;

    let mut replies = transport::ipv4_packet_iter(&mut rx);
    let deadline = Instant::now() + wait;
    while Instant::now() < deadline {
        match replies.next_with_timeout(RECV_SLICE) {
            Ok(Some((reply, source))) => {
                if source != IpAddr::V4(dst) {
                    continue;
                }
                if let Some(ttl) = protocols::icmp::parse_echo_reply(&reply, identifier) {
                    return Ok(Some(ttl));
                }
            }
            Ok(None) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(None)
}
