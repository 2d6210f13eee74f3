use std::net::Ipv4Addr;

use pnet::packet::ip::IpNextHeaderProtocol;
use pnet::packet::ipv4::{self, Ipv4Flags, MutableIpv4Packet};

use crate::{IPV4_HDR_LEN, PacketError};

pub const DEFAULT_TTL: u8 = 64;

/// Writes an IPv4 header (no options) into the first 20 bytes of `buf`.
/// `payload_len` is the length of everything following the header.
pub fn write_header(
    buf: &mut [u8],
    src: Ipv4Addr,
    dst: Ipv4Addr,
    protocol: IpNextHeaderProtocol,
    payload_len: usize,
) -> Result<(), PacketError> {
    if buf.len() < IPV4_HDR_LEN {
        return Err(PacketError::Buffer("ipv4"));
    }
    let mut ip =
        MutableIpv4Packet::new(&mut buf[..IPV4_HDR_LEN]).ok_or(PacketError::Buffer("ipv4"))?;
    ip.set_version(4);
    ip.set_header_length((IPV4_HDR_LEN / 4) as u8);
    ip.set_total_length((IPV4_HDR_LEN + payload_len) as u16);
    ip.set_identification(rand::random());
    ip.set_flags(Ipv4Flags::DontFragment);
    ip.set_ttl(DEFAULT_TTL);
    ip.set_next_level_protocol(protocol);
    ip.set_source(src);
    ip.set_destination(dst);
    let checksum = ipv4::checksum(&ip.to_immutable());
    ip.set_checksum(checksum);
    Ok(())
}
