//! Modified EUI-64 conversion between MAC addresses and IPv6 interface identifiers
//!
//! A 48-bit MAC `aa:bb:cc:dd:ee:ff` is embedded into the low 64 bits of an IPv6
//! address as `(aa ^ 0x02)bb:ccff:fedd:eeff`. The inverse recovers the MAC from
//! any address whose interface identifier carries the `ff:fe` marker.

use mac_address::MacAddress;
use std::net::Ipv6Addr;

/// Link-local prefix `fe80::/64`
pub const LINK_LOCAL_PREFIX: Ipv6Addr = Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0);

const UNIVERSAL_LOCAL_BIT: u8 = 0x02;

/// Embed `mac` into the interface identifier of `prefix` (upper 64 bits kept)
pub fn from_mac(prefix: Ipv6Addr, mac: &MacAddress) -> Ipv6Addr {
    let mut octets = prefix.octets();
    let m = mac.bytes();
    octets[8] = m[0] ^ UNIVERSAL_LOCAL_BIT;
    octets[9] = m[1];
    octets[10] = m[2];
    octets[11] = 0xff;
    octets[12] = 0xfe;
    octets[13] = m[3];
    octets[14] = m[4];
    octets[15] = m[5];
    Ipv6Addr::from(octets)
}

/// Recover the MAC embedded in `addr`, if its interface identifier is EUI-64 derived
pub fn to_mac(addr: &Ipv6Addr) -> Option<MacAddress> {
    let o = addr.octets();
    if o[11] != 0xff || o[12] != 0xfe {
        return None;
    }
    Some(MacAddress::new([
        o[8] ^ UNIVERSAL_LOCAL_BIT,
        o[9],
        o[10],
        o[13],
        o[14],
        o[15],
    ]))
}

/// The address following `addr` in its low-order byte (wrapping)
///
/// Relays advertise a link address one below the client's link-local address.
pub fn next_host(addr: &Ipv6Addr) -> Ipv6Addr {
    let mut octets = addr.octets();
    octets[15] = octets[15].wrapping_add(1);
    Ipv6Addr::from(octets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac() -> MacAddress {
        MacAddress::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff])
    }

    #[test]
    fn test_from_mac_flips_universal_local_bit() {
        let addr = from_mac(LINK_LOCAL_PREFIX, &mac());
        assert_eq!(addr, "fe80::a8bb:ccff:fedd:eeff".parse::<Ipv6Addr>().unwrap());
    }

    #[test]
    fn test_from_mac_keeps_prefix() {
        let prefix: Ipv6Addr = "2001:db8:1:2::".parse().unwrap();
        let addr = from_mac(prefix, &mac());
        assert_eq!(addr, "2001:db8:1:2:a8bb:ccff:fedd:eeff".parse::<Ipv6Addr>().unwrap());
    }

    #[test]
    fn test_to_mac_inverts_from_mac() {
        let addr = from_mac(LINK_LOCAL_PREFIX, &mac());
        assert_eq!(to_mac(&addr), Some(mac()));
    }

    #[test]
    fn test_to_mac_requires_fffe_marker() {
        assert_eq!(to_mac(&Ipv6Addr::LOCALHOST), None);
        assert_eq!(to_mac(&"fe80::1:2:3:4".parse().unwrap()), None);
    }

    #[test]
    fn test_next_host_increments_low_byte() {
        let addr: Ipv6Addr = "fe80::a8bb:ccff:fedd:eefe".parse().unwrap();
        assert_eq!(next_host(&addr), "fe80::a8bb:ccff:fedd:eeff".parse::<Ipv6Addr>().unwrap());
    }

    #[test]
    fn test_next_host_wraps_low_byte_only() {
        let addr: Ipv6Addr = "fe80::a8bb:ccff:fedd:eeff".parse().unwrap();
        assert_eq!(next_host(&addr), "fe80::a8bb:ccff:fedd:ee00".parse::<Ipv6Addr>().unwrap());
    }
}
