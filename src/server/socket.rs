//! Listener sockets and socket recycling (SPEC_FULL.md §4.9, §6).
//!
//! A listener is either bound to a global unicast address of a local
//! interface, or joined to the `ff02::1:2` "All_DHCP_Relay_Agents_and_Servers"
//! multicast group on a named interface. Recycling compares the previous
//! generation's bound listeners against the newly desired set and keeps a
//! socket's file descriptor when its (address, kind) pair is unchanged,
//! rather than unconditionally rebinding.

use std::fmt;
use std::net::{Ipv6Addr, SocketAddr, SocketAddrV6, UdpSocket};

use pnet::datalink;

/// The server port used by both unicast and multicast listeners.
pub const SERVER_PORT: u16 = 547;

/// `All_DHCP_Relay_Agents_and_Servers`, RFC 8415 §7.1.
pub const MULTICAST_ADDR: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 1, 2);

/// One configured listener, before it is bound to a socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerSpec {
    Unicast(SocketAddrV6),
    Multicast { interface: String },
}

impl fmt::Display for ListenerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerSpec::Unicast(addr) => write!(f, "unicast {addr}"),
            ListenerSpec::Multicast { interface } => {
                write!(f, "multicast {MULTICAST_ADDR} on {interface}")
            }
        }
    }
}

#[derive(Debug)]
pub enum SocketError {
    NotGlobalUnicast(Ipv6Addr),
    NoSuchLocalAddress(Ipv6Addr),
    NoSuchInterface(String),
    Io(std::io::Error),
}

impl fmt::Display for SocketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocketError::NotGlobalUnicast(addr) => {
                write!(f, "{addr} is not a global unicast IPv6 address")
            }
            SocketError::NoSuchLocalAddress(addr) => {
                write!(f, "{addr} is not assigned to any local interface")
            }
            SocketError::NoSuchInterface(name) => write!(f, "no local interface named `{name}`"),
            SocketError::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SocketError {}

impl From<std::io::Error> for SocketError {
    fn from(e: std::io::Error) -> Self {
        SocketError::Io(e)
    }
}

/// A global unicast IPv6 address, conservatively: not unspecified, loopback,
/// link-local, or a multicast address. `Ipv6Addr::is_global` is unstable, so
/// this mirrors its intent with the stable predicates available.
fn is_global_unicast(addr: &Ipv6Addr) -> bool {
    !(addr.is_unspecified()
        || addr.is_loopback()
        || addr.is_multicast()
        || is_unicast_link_local(addr))
}

fn is_unicast_link_local(addr: &Ipv6Addr) -> bool {
    (addr.segments()[0] & 0xffc0) == 0xfe80
}

/// Confirms `addr` is both a global unicast address and present on some
/// local interface, via `pnet`'s interface enumeration (grounded in the
/// original implementation's `netifaces`-based check, SPEC_FULL.md §4.9).
pub fn validate_unicast_address(addr: &Ipv6Addr) -> Result<(), SocketError> {
    if !is_global_unicast(addr) {
        return Err(SocketError::NotGlobalUnicast(*addr));
    }
    let present = datalink::interfaces().iter().any(|iface| {
        iface
            .ips
            .iter()
            .any(|ip| matches!(ip.ip(), std::net::IpAddr::V6(v6) if v6 == *addr))
    });
    if !present {
        return Err(SocketError::NoSuchLocalAddress(*addr));
    }
    Ok(())
}

fn interface_index(name: &str) -> Result<u32, SocketError> {
    datalink::interfaces()
        .into_iter()
        .find(|iface| iface.name == name)
        .map(|iface| iface.index)
        .ok_or_else(|| SocketError::NoSuchInterface(name.to_string()))
}

fn bind_unicast(addr: SocketAddrV6) -> Result<UdpSocket, SocketError> {
    validate_unicast_address(addr.ip())?;
    Ok(UdpSocket::bind(SocketAddr::V6(addr))?)
}

fn bind_multicast(interface: &str) -> Result<UdpSocket, SocketError> {
    let index = interface_index(interface)?;
    let socket = UdpSocket::bind(SocketAddr::V6(SocketAddrV6::new(
        Ipv6Addr::UNSPECIFIED,
        SERVER_PORT,
        0,
        0,
    )))?;
    socket.join_multicast_v6(&MULTICAST_ADDR, index)?;
    Ok(socket)
}

pub fn bind(spec: &ListenerSpec) -> Result<UdpSocket, SocketError> {
    match spec {
        ListenerSpec::Unicast(addr) => bind_unicast(*addr),
        ListenerSpec::Multicast { interface } => bind_multicast(interface),
    }
}

/// A bound listener: its spec plus the live socket.
pub struct Listener {
    pub spec: ListenerSpec,
    pub socket: UdpSocket,
}

impl Listener {
    /// True when this request arrived on a listener bound to the multicast
    /// group rather than a unicast address (`TransactionBundle::received_over_multicast`).
    pub fn is_multicast(&self) -> bool {
        matches!(self.spec, ListenerSpec::Multicast { .. })
    }
}

/// Binds every desired listener, reusing a previous generation's socket
/// verbatim when its (address, kind) pair is unchanged (SPEC_FULL.md §5, §6).
/// Listeners whose spec is absent from `desired` are dropped; for a
/// multicast listener, dropping the socket leaves its multicast membership.
pub fn recycle(
    mut previous: Vec<Listener>,
    desired: &[ListenerSpec],
) -> Result<Vec<Listener>, SocketError> {
    let mut result = Vec::with_capacity(desired.len());
    for spec in desired {
        if let Some(pos) = previous.iter().position(|l| &l.spec == spec) {
            result.push(previous.remove(pos));
        } else {
            result.push(Listener {
                spec: spec.clone(),
                socket: bind(spec)?,
            });
        }
    }
    // Anything left in `previous` is dropped here, releasing its fd (and,
    // for multicast listeners, leaving the group).
    Ok(result)
}
