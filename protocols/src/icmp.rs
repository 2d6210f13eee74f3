use std::net::Ipv4Addr;

use pnet::packet::icmp::echo_reply::EchoReplyPacket;
use pnet::packet::icmp::echo_request::MutableEchoRequestPacket;
use pnet::packet::icmp::{self, IcmpPacket, IcmpTypes};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::Packet;

use crate::{ipv4, ICMP_ECHO_LEN, IPV4_HDR_LEN, PacketError};

const ECHO_PAYLOAD: [u8; 8] = [0x77, 0x72, 0x61, 0x69, 0x74, 0x68, 0x00, 0x00];

/// Builds a complete IPv4 packet carrying an ICMP echo request, suitable
/// for a layer-3 transport channel.
pub fn build_echo_packet(
    src: Ipv4Addr,
    dst: Ipv4Addr,
    identifier: u16,
    sequence: u16,
) -> Result<Vec<u8>, PacketError> {
    let mut packet = vec![0u8; IPV4_HDR_LEN + ICMP_ECHO_LEN];
    ipv4::write_header(&mut packet, src, dst, IpNextHeaderProtocols::Icmp, ICMP_ECHO_LEN)?;
    write_echo_request(&mut packet[IPV4_HDR_LEN..], identifier, sequence)?;
    Ok(packet)
}

/// Writes an ICMP echo request (8-byte header plus 8-byte payload).
pub fn write_echo_request(
    buf: &mut [u8],
    identifier: u16,
    sequence: u16,
) -> Result<(), PacketError> {
    if buf.len() < ICMP_ECHO_LEN {
        return Err(PacketError::Buffer("icmp echo"));
    }
    let mut echo = MutableEchoRequestPacket::new(&mut buf[..ICMP_ECHO_LEN])
        .ok_or(PacketError::Buffer("icmp echo"))?;
    echo.set_icmp_type(IcmpTypes::EchoRequest);
    echo.set_identifier(identifier);
    echo.set_sequence_number(sequence);
    echo.set_payload(&ECHO_PAYLOAD);

    let checksum = {
        let view = IcmpPacket::new(echo.packet()).ok_or(PacketError::Buffer("icmp echo"))?;
        icmp::checksum(&view)
    };
    echo.set_checksum(checksum);
    Ok(())
}

/// If `reply` is an echo reply matching `identifier`, returns the IP TTL
/// observed on the reply (fed to the OS fingerprint heuristic).
pub fn parse_echo_reply(reply: &Ipv4Packet, identifier: u16) -> Option<u8> {
    if reply.get_next_level_protocol() != IpNextHeaderProtocols::Icmp {
        return None;
    }
    let icmp = IcmpPacket::new(reply.payload())?;
    if icmp.get_icmp_type() != IcmpTypes::EchoReply {
        return None;
    }
    let echo = EchoReplyPacket::new(reply.payload())?;
    (echo.get_identifier() == identifier).then(|| reply.get_ttl())
}
