//! Full-handshake TCP probe: the only strategy that needs no privileges.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::probe::{Probe, ProbeStrategy};
use crate::scheduler::ScanTask;
use crate::store::PortState;

pub struct TcpConnect;

#[async_trait]
impl ProbeStrategy for TcpConnect {
    async fn probe(&self, task: &ScanTask, wait: Duration) -> anyhow::Result<Probe> {
        let port = task.port.context("tcp probe needs a port")?;
        let addr = SocketAddr::new(task.addr, port);

        let state = match timeout(wait, TcpStream::connect(addr)).await {
            Ok(Ok(_stream)) => PortState::Open,
            Ok(Err(_refused)) => PortState::Closed,
            Err(_elapsed) => PortState::Closed,
        };
        Ok(Probe::state(state))
    }
}
