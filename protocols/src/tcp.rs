use std::net::Ipv4Addr;

use pnet::packet::tcp::{self, MutableTcpPacket, TcpFlags, TcpPacket};

use crate::{PacketError, TCP_HDR_LEN};

const WINDOW: u16 = 64240;

/// Builds a bare SYN segment for a half-open probe.
pub fn build_syn(
    src_ip: Ipv4Addr,
    src_port: u16,
    dst_ip: Ipv4Addr,
    dst_port: u16,
    sequence: u32,
) -> Result<Vec<u8>, PacketError> {
    build_segment(src_ip, src_port, dst_ip, dst_port, sequence, TcpFlags::SYN)
}

/// Builds the RST that aborts a half-open connection after a SYN-ACK.
pub fn build_rst(
    src_ip: Ipv4Addr,
    src_port: u16,
    dst_ip: Ipv4Addr,
    dst_port: u16,
    sequence: u32,
) -> Result<Vec<u8>, PacketError> {
    build_segment(src_ip, src_port, dst_ip, dst_port, sequence, TcpFlags::RST)
}

fn build_segment(
    src_ip: Ipv4Addr,
    src_port: u16,
    dst_ip: Ipv4Addr,
    dst_port: u16,
    sequence: u32,
    flags: u8,
) -> Result<Vec<u8>, PacketError> {
    let mut buf = vec![0u8; TCP_HDR_LEN];
    let mut segment = MutableTcpPacket::new(&mut buf).ok_or(PacketError::Buffer("tcp"))?;
    segment.set_source(src_port);
    segment.set_destination(dst_port);
    segment.set_sequence(sequence);
    segment.set_acknowledgement(0);
    segment.set_data_offset((TCP_HDR_LEN / 4) as u8);
    segment.set_flags(flags);
    segment.set_window(WINDOW);
    segment.set_urgent_ptr(0);
    let checksum = tcp::ipv4_checksum(&segment.to_immutable(), &src_ip, &dst_ip);
    segment.set_checksum(checksum);
    drop(segment);
    Ok(buf)
}

pub fn is_syn_ack(reply: &TcpPacket) -> bool {
    reply.get_flags() & (TcpFlags::SYN | TcpFlags::ACK) == (TcpFlags::SYN | TcpFlags::ACK)
}

pub fn is_rst(reply: &TcpPacket) -> bool {
    reply.get_flags() & TcpFlags::RST != 0
}
