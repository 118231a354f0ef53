//! # Peer Identity
//!
//! A `Peer` is the address a frame is sent to or received from: an IP (stored
//! as a single `u128` so IPv4 and IPv6 share one representation), a port, and
//! two advisory fields (hostname for DNS-based reconnection, node_id for
//! identity-level blacklisting independent of network address).

use bytes::Bytes;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Network address of a peer, plus optional identity metadata.
///
/// Equality and hashing are defined over `(ip, port, node_id)` only — the
/// hostname is advisory (it enables DNS-based reconnection in
/// [`crate::network::send_queue`]) and does not participate in identity.
#[derive(Clone, Debug, Default)]
pub struct Peer {
    pub ip: u128,
    pub port: u16,
    pub hostname: Option<String>,
    pub node_id: Option<Bytes>,
}

impl Peer {
    pub fn new(ip: u128, port: u16) -> Self {
        Self {
            ip,
            port,
            hostname: None,
            node_id: None,
        }
    }

    pub fn with_hostname(ip: u128, port: u16, hostname: impl Into<String>) -> Self {
        Self {
            ip,
            port,
            hostname: Some(hostname.into()),
            node_id: None,
        }
    }

    pub fn from_ip_addr(addr: IpAddr, port: u16) -> Self {
        Self::new(ip_to_u128(addr), port)
    }

    pub fn ip_addr(&self) -> IpAddr {
        u128_to_ip(self.ip)
    }

    /// `ip=0` or `port=0` means "unroutable"; send paths must reject these.
    pub fn is_routable(&self) -> bool {
        self.ip != 0 && self.port != 0
    }

    pub fn key(&self) -> PeerKey {
        PeerKey {
            ip: self.ip,
            port: self.port,
            node_id: self.node_id.clone(),
        }
    }
}

impl PartialEq for Peer {
    fn eq(&self, other: &Self) -> bool {
        self.ip == other.ip && self.port == other.port && self.node_id == other.node_id
    }
}

impl Eq for Peer {}

impl std::hash::Hash for Peer {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.ip.hash(state);
        self.port.hash(state);
        self.node_id.hash(state);
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.hostname {
            Some(h) => write!(f, "{}:{} ({})", self.ip_addr(), self.port, h),
            None => write!(f, "{}:{}", self.ip_addr(), self.port),
        }
    }
}

/// Hashable/orderable key for blacklist and send-queue maps. Separate from
/// `Peer` so maps don't need to clone the hostname around.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PeerKey {
    pub ip: u128,
    pub port: u16,
    pub node_id: Option<Bytes>,
}

impl From<&Peer> for PeerKey {
    fn from(p: &Peer) -> Self {
        p.key()
    }
}

/// Converts any `IpAddr` to a single `u128`, mapping IPv4 into the
/// IPv4-mapped-IPv6 range so a single integer width covers both families.
pub fn ip_to_u128(addr: IpAddr) -> u128 {
    match addr {
        IpAddr::V4(v4) => v4.to_ipv6_mapped().into(),
        IpAddr::V6(v6) => v6.into(),
    }
}

/// Inverse of [`ip_to_u128`]. Returns the IPv4 form when the value falls in
/// the IPv4-mapped range, otherwise a plain IPv6 address.
pub fn u128_to_ip(value: u128) -> IpAddr {
    let v6 = Ipv6Addr::from(value);
    match v6.to_ipv4_mapped() {
        Some(v4) => IpAddr::V4(v4),
        None => IpAddr::V6(v6),
    }
}

/// `0.0.0.0`, used by [`super::blacklist::Blacklist::is_valid_ip`].
pub const UNSPECIFIED_IPV4: Ipv4Addr = Ipv4Addr::new(0, 0, 0, 0);
/// `255.255.255.255`, used by [`super::blacklist::Blacklist::is_valid_ip`].
pub const BROADCAST_IPV4: Ipv4Addr = Ipv4Addr::new(255, 255, 255, 255);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipv4_roundtrips_through_u128() {
        let addr: IpAddr = "192.168.1.17".parse().unwrap();
        let as_u128 = ip_to_u128(addr);
        assert_eq!(u128_to_ip(as_u128), addr);
    }

    #[test]
    fn ipv6_roundtrips_through_u128() {
        let addr: IpAddr = "2001:db8::1".parse().unwrap();
        let as_u128 = ip_to_u128(addr);
        assert_eq!(u128_to_ip(as_u128), addr);
    }

    #[test]
    fn zero_ip_or_port_is_unroutable() {
        assert!(!Peer::new(0, 9740).is_routable());
        assert!(!Peer::new(ip_to_u128("10.0.0.1".parse().unwrap()), 0).is_routable());
        assert!(Peer::new(ip_to_u128("10.0.0.1".parse().unwrap()), 9740).is_routable());
    }

    #[test]
    fn equality_ignores_hostname() {
        let a = Peer::new(1, 2);
        let mut b = Peer::new(1, 2);
        b.hostname = Some("example.com".into());
        assert_eq!(a, b);
    }

    #[test]
    fn equality_considers_node_id() {
        let mut a = Peer::new(1, 2);
        let mut b = Peer::new(1, 2);
        a.node_id = Some(Bytes::from_static(b"a"));
        b.node_id = Some(Bytes::from_static(b"b"));
        assert_ne!(a, b);
    }
}
