//! Connectionless UDP inference.
//!
//! A connected UDP socket lets the kernel translate ICMP port-unreachable
//! into a refused send/recv, so the probe needs no raw socket. Silence is
//! inherently ambiguous and is reported as [`PortState::PossiblyOpen`]
//! rather than collapsed into open.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::probe::{Probe, ProbeStrategy};
use crate::scheduler::ScanTask;
use crate::store::PortState;

pub struct UdpProbe;

#[async_trait]
impl ProbeStrategy for UdpProbe {
    async fn probe(&self, task: &ScanTask, wait: Duration) -> anyhow::Result<Probe> {
        let port = task.port.context("udp probe needs a port")?;

        let bind_addr = match task.addr {
            IpAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            IpAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect((task.addr, port)).await?;

        if let Err(e) = socket.send(&[]).await {
            return Ok(Probe::state(classify_io_error(&e)));
        }

        let mut buf = [0u8; 512];
        let state = match timeout(wait, socket.recv(&mut buf)).await {
            Ok(Ok(_len)) => PortState::Open,
            Ok(Err(e)) => classify_io_error(&e),
            Err(_elapsed) => PortState::PossiblyOpen,
        };
        Ok(Probe::state(state))
    }
}

fn classify_io_error(e: &io::Error) -> PortState {
    // ICMP port unreachable surfaces as a refused connection here.
    match e.kind() {
        io::ErrorKind::ConnectionRefused => PortState::Closed,
        _ => PortState::Filtered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(addr: IpAddr, port: u16) -> ScanTask {
        ScanTask {
            addr,
            port: Some(port),
        }
    }

    #[tokio::test]
    async fn replying_socket_reports_open() {
        let responder = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = responder.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = [0u8; 64];
            if let Ok((_, peer)) = responder.recv_from(&mut buf).await {
                let _ = responder.send_to(b"pong", peer).await;
            }
        });

        let probe = UdpProbe
            .probe(&task(addr.ip(), addr.port()), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(probe.state, PortState::Open);
    }

    #[tokio::test]
    async fn silent_socket_reports_possibly_open() {
        // Bound but never replying: the ambiguous case.
        let quiet = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = quiet.local_addr().unwrap();

        let probe = UdpProbe
            .probe(&task(addr.ip(), addr.port()), Duration::from_millis(200))
            .await
            .unwrap();
        assert_eq!(probe.state, PortState::PossiblyOpen);
    }

    #[tokio::test]
    #[cfg(target_os = "linux")]
    async fn unbound_port_reports_closed() {
        let placeholder = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = placeholder.local_addr().unwrap();
        drop(placeholder);

        let probe = UdpProbe
            .probe(&task(addr.ip(), addr.port()), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(probe.state, PortState::Closed);
    }
}
