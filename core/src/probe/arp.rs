//! Link-layer host discovery: one broadcast ARP request per target.

use std::net::{IpAddr, Ipv4Addr};
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use async_trait::async_trait;
use pnet::datalink::{self, Channel, MacAddr};
use wraith_common::network::interface;
use wraith_protocols as protocols;

use crate::probe::{Probe, ProbeStrategy};
use crate::scheduler::ScanTask;
use crate::store::PortState;

const READ_SLICE: Duration = Duration::from_millis(50);

pub struct ArpProbe;

#[async_trait]
impl ProbeStrategy for ArpProbe {
    async fn probe(&self, task: &ScanTask, wait: Duration) -> anyhow::Result<Probe> {
        let IpAddr::V4(dst) = task.addr else {
            bail!("arp probe supports IPv4 targets only");
        };

        let reply = tokio::task::spawn_blocking(move || arp_exchange(dst, wait)).await??;
        Ok(match reply {
            Some(mac) => Probe {
                state: PortState::Open,
                mac: Some(mac.to_string()),
                ttl: None,
            },
            None => Probe::closed(),
        })
    }
}

fn arp_exchange(dst: Ipv4Addr, wait: Duration) -> anyhow::Result<Option<MacAddr>> {
    let intf =
        interface::interface_for(dst).with_context(|| format!("no interface routes {dst}"))?;
    let src_mac = intf.mac.context("interface has no hardware address")?;
    let src_ip = interface::ipv4_of(&intf).context("interface has no IPv4 address")?;

    let config = datalink::Config {
        read_timeout: Some(READ_SLICE),
        ..Default::default()
    };
    let (mut tx, mut rx) = match datalink::channel(&intf, config)? {
        Channel::Ethernet(tx, rx) => (tx, rx),
        _ => bail!("unsupported datalink channel on {}", intf.name),
    };

    let request = protocols::arp::build_request(src_mac, src_ip, dst)?;
    if let Some(Err(e)) = tx.send_to(&request, None) {
        return Err(e.into());
    }

    let deadline = Instant::now() + wait;
    while Instant::now() < deadline {
        match rx.next() {
            Ok(frame) => {
                if let Some((sender_ip, sender_mac)) = protocols::arp::parse_reply(frame) {
                    if sender_ip == dst {
                        return Ok(Some(sender_mac));
                    }
                }
            }
            // Read timeouts just mean no frame arrived in this slice.
            Err(_timeout) => {}
        }
    }
    Ok(None)
}
