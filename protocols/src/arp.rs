use std::net::Ipv4Addr;

use pnet::datalink::MacAddr;
use pnet::packet::arp::{ArpHardwareTypes, ArpOperations, ArpPacket, MutableArpPacket};
use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::packet::Packet;

use crate::{ethernet, ARP_LEN, ETH_HDR_LEN, PacketError};

/// Builds a broadcast Ethernet frame carrying an ARP who-has request.
pub fn build_request(
    src_mac: MacAddr,
    src_addr: Ipv4Addr,
    target_addr: Ipv4Addr,
) -> Result<Vec<u8>, PacketError> {
    let mut frame = vec![0u8; ETH_HDR_LEN + ARP_LEN];
    ethernet::write_header(&mut frame, src_mac, MacAddr::broadcast(), EtherTypes::Arp)?;
    write_request(&mut frame, src_mac, src_addr, target_addr)?;
    Ok(frame)
}

/// Writes the ARP request payload after the Ethernet header.
pub fn write_request(
    buf: &mut [u8],
    src_mac: MacAddr,
    src_addr: Ipv4Addr,
    target_addr: Ipv4Addr,
) -> Result<(), PacketError> {
    if buf.len() < ETH_HDR_LEN + ARP_LEN {
        return Err(PacketError::Buffer("arp"));
    }
    let mut arp = MutableArpPacket::new(&mut buf[ETH_HDR_LEN..ETH_HDR_LEN + ARP_LEN])
        .ok_or(PacketError::Buffer("arp"))?;
    arp.set_hardware_type(ArpHardwareTypes::Ethernet);
    arp.set_protocol_type(EtherTypes::Ipv4);
    arp.set_hw_addr_len(6);
    arp.set_proto_addr_len(4);
    arp.set_operation(ArpOperations::Request);
    arp.set_sender_hw_addr(src_mac);
    arp.set_sender_proto_addr(src_addr);
    arp.set_target_hw_addr(MacAddr::zero());
    arp.set_target_proto_addr(target_addr);
    Ok(())
}

/// Extracts (sender IP, sender MAC) from an Ethernet frame if it carries
/// an ARP reply. Anything else yields `None`.
pub fn parse_reply(frame: &[u8]) -> Option<(Ipv4Addr, MacAddr)> {
    let eth = EthernetPacket::new(frame)?;
    if eth.get_ethertype() != EtherTypes::Arp {
        return None;
    }
    let arp = ArpPacket::new(eth.payload())?;
    if arp.get_operation() != ArpOperations::Reply {
        return None;
    }
    Some((arp.get_sender_proto_addr(), arp.get_sender_hw_addr()))
}
