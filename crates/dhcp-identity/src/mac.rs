//! MAC address formatting helpers
//!
//! `mac_address::MacAddress` displays as uppercase; records and inventory keys
//! use the lowercase colon-hex form, labels and names the sanitized form.

use mac_address::MacAddress;

/// Lowercase colon-hex form, e.g. `aa:bb:cc:dd:ee:ff`
pub fn canonical(mac: &MacAddress) -> String {
    let b = mac.bytes();
    format!(
        "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
        b[0], b[1], b[2], b[3], b[4], b[5]
    )
}

/// Canonical form with colons stripped, e.g. `aabbccddeeff`
pub fn sanitized(mac: &MacAddress) -> String {
    canonical(mac).replace(':', "")
}

/// Parse a colon- or hyphen-separated MAC address in either case
pub fn parse(value: &str) -> Option<MacAddress> {
    value.trim().parse().ok()
}
