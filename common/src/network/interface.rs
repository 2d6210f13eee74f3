//! Interface and source-address selection for raw-socket probes.

use std::io;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use pnet::datalink::{self, NetworkInterface};
use pnet::ipnetwork::IpNetwork;

/// Picks the interface whose IPv4 network contains `target`, falling back
/// to the first usable (up, non-loopback, addressed) interface.
pub fn interface_for(target: Ipv4Addr) -> Option<NetworkInterface> {
    let interfaces = datalink::interfaces();

    let direct = interfaces.iter().find(|intf| {
        usable(intf)
            && intf
                .ips
                .iter()
                .any(|net| matches!(net, IpNetwork::V4(v4) if v4.contains(target)))
    });
    if let Some(intf) = direct {
        return Some(intf.clone());
    }

    interfaces
        .into_iter()
        .find(|intf| usable(intf) && ipv4_of(intf).is_some())
}

/// First IPv4 address assigned to the interface.
pub fn ipv4_of(intf: &NetworkInterface) -> Option<Ipv4Addr> {
    intf.ips.iter().find_map(|net| match net {
        IpNetwork::V4(v4) => Some(v4.ip()),
        IpNetwork::V6(_) => None,
    })
}

/// Source IPv4 address the kernel would route towards `target`.
///
/// Uses a connected UDP socket purely for route selection; no datagram is
/// ever sent.
pub fn source_ipv4_for(target: Ipv4Addr) -> io::Result<Ipv4Addr> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect((target, 53))?;
    match socket.local_addr()?.ip() {
        IpAddr::V4(v4) => Ok(v4),
        IpAddr::V6(_) => Err(io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            "no IPv4 route to target",
        )),
    }
}

fn usable(intf: &NetworkInterface) -> bool {
    intf.is_up() && !intf.is_loopback() && !intf.ips.is_empty()
}
