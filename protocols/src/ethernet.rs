use pnet::datalink::MacAddr;
use pnet::packet::ethernet::{EtherType, MutableEthernetPacket};

use crate::{ETH_HDR_LEN, PacketError};

/// Writes an Ethernet II header into the first 14 bytes of `buf`.
pub fn write_header(
    buf: &mut [u8],
    src: MacAddr,
    dst: MacAddr,
    ethertype: EtherType,
) -> Result<(), PacketError> {
    if buf.len() < ETH_HDR_LEN {
        return Err(PacketError::Buffer("ethernet"));
    }
    let mut eth =
        MutableEthernetPacket::new(&mut buf[..ETH_HDR_LEN]).ok_or(PacketError::Buffer("ethernet"))?;
    eth.set_source(src);
    eth.set_destination(dst);
    eth.set_ethertype(ethertype);
    Ok(())
}
