use crate::mac::{format_octets, parse_octets, MacAddress, ParseMacError};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

const SYNCHRONIZATION_SCHEME: [u8; 6] = [0xff; 6];
const MAC_REPETITIONS: usize = 16;

/// Length of a packet without a SecureOn password.
pub const BASE_PACKET_LEN: usize = SYNCHRONIZATION_SCHEME.len() + 6 * MAC_REPETITIONS;

/// Password appended to the packet for NICs that require SecureOn.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SecureOnPassword {
    // Six raw bytes, written like a MAC address.
    Six([u8; 6]),
    // Four bytes, written like an IPv4 address.
    Four([u8; 4]),
}

impl SecureOnPassword {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Six(b) => &b[..],
            Self::Four(b) => &b[..],
        }
    }
}

impl FromStr for SecureOnPassword {
    type Err = ParseMacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains('.') {
            let addr: Ipv4Addr = s
                .parse()
                .map_err(|_| ParseMacError::BadOctet(s.to_string()))?;
            return Ok(Self::Four(addr.octets()));
        }
        Ok(Self::Six(parse_octets(s)?))
    }
}

impl fmt::Display for SecureOnPassword {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Six(b) => format_octets(f, b),
            Self::Four(b) => write!(f, "{}", Ipv4Addr::from(*b)),
        }
    }
}

/// The wire payload: six `0xFF` bytes, the target MAC sixteen times, then
/// the SecureOn password if there is one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MagicPacket(Vec<u8>);

impl MagicPacket {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for MagicPacket {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

pub fn build(mac: MacAddress, secure_on: Option<&SecureOnPassword>) -> MagicPacket {
    let password = secure_on.map(|p| p.as_bytes()).unwrap_or_default();
    let mut data = Vec::with_capacity(BASE_PACKET_LEN + password.len());
    data.extend(&SYNCHRONIZATION_SCHEME);
    for _ in 0..MAC_REPETITIONS {
        data.extend(mac.as_bytes());
    }
    data.extend(password);
    MagicPacket(data)
}

#[cfg(test)]
mod tests {
    use crate::mac::MacAddress;
    use crate::packet::*;
    use proptest::prelude::*;

    fn hex(packet: &MagicPacket) -> String {
        packet
            .as_bytes()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<Vec<_>>()
            .join(":")
    }

    #[test]
    fn known_mac_layout() {
        let mac: MacAddress = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        let packet = build(mac, None);
        assert_eq!(packet.len(), 102);
        let mut expected = vec!["ff:ff:ff:ff:ff:ff"];
        expected.extend(std::iter::repeat("aa:bb:cc:dd:ee:ff").take(16));
        assert_eq!(hex(&packet), expected.join(":"));
    }

    #[test]
    fn six_byte_password_appended() {
        let mac = MacAddress::new([1, 2, 3, 4, 5, 6]);
        let password: SecureOnPassword = "11:22:33:44:55:66".parse().unwrap();
        let packet = build(mac, Some(&password));
        assert_eq!(packet.len(), 108);
        assert_eq!(&packet.as_bytes()[102..], &[0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);
    }

    #[test]
    fn four_byte_password_appended() {
        let mac = MacAddress::new([1, 2, 3, 4, 5, 6]);
        let password: SecureOnPassword = "192.168.1.7".parse().unwrap();
        assert_eq!(password, SecureOnPassword::Four([192, 168, 1, 7]));
        let packet = build(mac, Some(&password));
        assert_eq!(packet.len(), 106);
        assert_eq!(&packet.as_bytes()[102..], &[192, 168, 1, 7]);
    }

    #[test]
    fn password_text() {
        assert_eq!(
            "aa-bb-cc-dd-ee-ff".parse::<SecureOnPassword>().unwrap().to_string(),
            "AA:BB:CC:DD:EE:FF"
        );
        assert_eq!(
            "10.0.0.1".parse::<SecureOnPassword>().unwrap().to_string(),
            "10.0.0.1"
        );
        assert!("10.0.0".parse::<SecureOnPassword>().is_err());
        assert!("AA:BB:CC:DD".parse::<SecureOnPassword>().is_err());
    }

    fn any_mac() -> impl Strategy<Value = MacAddress> {
        any::<[u8; 6]>().prop_map(MacAddress::new)
    }

    proptest! {
        #[test]
        fn plain_packet_layout(mac in any_mac()) {
            let packet = build(mac, None);
            let bytes = packet.as_bytes();
            prop_assert_eq!(bytes.len(), BASE_PACKET_LEN);
            prop_assert_eq!(&bytes[..6], &[0xff; 6]);
            for chunk in bytes[6..].chunks(6) {
                prop_assert_eq!(chunk, mac.as_bytes());
            }
        }

        #[test]
        fn password_is_suffix(mac in any_mac(), password in any::<[u8; 6]>()) {
            let packet = build(mac, Some(&SecureOnPassword::Six(password)));
            prop_assert_eq!(packet.len(), 108);
            let plain = build(mac, None);
            prop_assert_eq!(&packet.as_bytes()[..102], plain.as_bytes());
            prop_assert_eq!(&packet.as_bytes()[102..], &password);
        }

        #[test]
        fn build_is_deterministic(mac in any_mac(), password in any::<Option<[u8; 4]>>()) {
            let password = password.map(SecureOnPassword::Four);
            prop_assert_eq!(build(mac, password.as_ref()), build(mac, password.as_ref()));
        }
    }
}
