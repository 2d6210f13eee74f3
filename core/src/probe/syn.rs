//! Half-open SYN probe over a raw layer-4 TCP channel.
//!
//! Requires privileges to open the transport channel; a SYN-ACK is
//! answered with a RST so the handshake never completes on the target.

use std::net::{IpAddr, Ipv4Addr};
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use async_trait::async_trait;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::tcp::TcpPacket;
use pnet::transport::{self, TransportChannelType, TransportProtocol};
use wraith_common::network::interface;
use wraith_protocols as protocols;

use crate::probe::{Probe, ProbeStrategy};
use crate::scheduler::ScanTask;
use crate::store::PortState;

const CHANNEL_BUFFER: usize = 4096;
const RECV_SLICE: Duration = Duration::from_millis(50);

pub struct SynProbe;

#[async_trait]
impl ProbeStrategy for SynProbe {
    async fn probe(&self, task: &ScanTask, wait: Duration) -> anyhow::Result<Probe> {
        let port = task.port.context("syn probe needs a port")?;
        let IpAddr::V4(dst) = task.addr else {
            bail!("syn probe supports IPv4 targets only");
        };

        let state =
            tokio::task::spawn_blocking(move || syn_exchange(dst, port, wait)).await??;
        Ok(Probe::state(state))
    }
}

fn syn_exchange(dst: Ipv4Addr, port: u16, wait: Duration) -> anyhow::Result<PortState> {
    let src_ip = interface::source_ipv4_for(dst).context("selecting source address")?;
    let src_port: u16 = rand::random_range(50_000..u16::MAX);
    let sequence: u32 = rand::random();

    let (mut tx, mut rx) = transport::transport_channel(
        CHANNEL_BUFFER,
        TransportChannelType::Layer4(TransportProtocol::Ipv4(IpNextHeaderProtocols::Tcp)),
    )
    .context("opening raw tcp channel")?;

    let syn = protocols::tcp::build_syn(src_ip, src_port, dst, port, sequence)?;
    let segment = TcpPacket::new(&syn).context("viewing syn segment")?;
    tx.send_to(segment, IpAddr::V4(dst))?;

    let mut replies = transport::tcp_packet_iter(&mut rx);
    let deadline = Instant::now() + wait;
    while Instant::now() < deadline {
        match replies.next_with_timeout(RECV_SLICE) {
            Ok(Some((reply, source))) => {
                if source != IpAddr::V4(dst)
                    || reply.get_source() != port
                    || reply.get_destination() != src_port
                {
                    continue;
                }
                if protocols::tcp::is_syn_ack(&reply) {
                    // Abort the half-open connection before reporting.
                    let rst = protocols::tcp::build_rst(
                        src_ip,
                        src_port,
                        dst,
                        port,
                        sequence.wrapping_add(1),
                    )?;
                    if let Some(rst) = TcpPacket::new(&rst) {
                        let _ = tx.send_to(rst, IpAddr::V4(dst));
                    }
                    return Ok(PortState::Open);
                }
                if protocols::tcp::is_rst(&reply) {
                    return Ok(PortState::Closed);
                }
            }
            Ok(None) => {}
            Err(e) => return Err(e.into()),
        }
    }

    // Silence: closed and filtered share a bucket for SYN probes.
    Ok(PortState::Closed)
}
