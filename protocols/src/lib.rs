//! Raw packet construction and parsing for the wraith probe strategies.
//!
//! Every function here operates on plain byte buffers via `pnet`'s packet
//! views; sockets and channels are the probe layer's business.

pub mod arp;
pub mod ethernet;
pub mod icmp;
pub mod ipv4;
pub mod tcp;

use thiserror::Error;

pub const ETH_HDR_LEN: usize = 14;
pub const ARP_LEN: usize = 28;
pub const IPV4_HDR_LEN: usize = 20;
pub const ICMP_ECHO_LEN: usize = 16;
pub const TCP_HDR_LEN: usize = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    #[error("buffer too small for {0} packet")]
    Buffer(&'static str),
}
