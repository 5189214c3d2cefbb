//! Bogon address detection.
//!
//! A resolver answering with one of these addresses for a public name is
//! a common sign of DNS-based blocking.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Whether `address` is an IP literal inside a reserved, private or
/// otherwise non-routable range. Strings that do not parse are not bogons.
pub fn is_bogon(address: &str) -> bool {
    match address.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => is_bogon_v4(ip),
        Ok(IpAddr::V6(ip)) => is_bogon_v6(ip),
        Err(_) => false,
    }
}

fn is_bogon_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    ip.is_unspecified()
        || ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_broadcast()
        || ip.is_documentation()
        || ip.is_multicast()
        || a == 0
        // 100.64.0.0/10, carrier-grade NAT
        || (a == 100 && (b & 0xc0) == 64)
        // 192.0.0.0/24, IETF protocol assignments
        || ip.octets()[..3] == [192, 0, 0]
        // 198.18.0.0/15, benchmarking
        || (a == 198 && (b & 0xfe) == 18)
        // 240.0.0.0/4, reserved
        || a >= 240
}

fn is_bogon_v6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_bogon_v4(v4);
    }
    let first = ip.segments()[0];
    ip.is_unspecified()
        || ip.is_loopback()
        || ip.is_multicast()
        // fc00::/7, unique local
        || (first & 0xfe00) == 0xfc00
        // fe80::/10, link local
        || (first & 0xffc0) == 0xfe80
        // 2001:db8::/32, documentation
        || ip.segments()[..2] == [0x2001, 0x0db8]
}
