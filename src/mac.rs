use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const OCTETS: usize = 6;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseMacError {
    #[error("Expected 6 octets, found {0}")]
    WrongOctetCount(usize),
    #[error("Octet {0:?} is not a two digit hex value")]
    BadOctet(String),
}

/// A 48-bit hardware address.
///
/// Accepts `AA:BB:CC:DD:EE:FF` or `aa-bb-cc-dd-ee-ff` on input and always
/// displays as uppercase, colon separated pairs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress([u8; OCTETS]);

impl MacAddress {
    pub const fn new(octets: [u8; OCTETS]) -> Self {
        MacAddress(octets)
    }

    pub const fn octets(&self) -> [u8; OCTETS] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Parses six hex octets separated by `:` or `-`.
///
/// Each token must be exactly two hex digits; nothing is padded or
/// truncated.
pub fn parse_mac(text: &str) -> Result<MacAddress, ParseMacError> {
    Ok(MacAddress(parse_octets(text)?))
}

pub(crate) fn parse_octets<const N: usize>(text: &str) -> Result<[u8; N], ParseMacError> {
    let tokens: Vec<&str> = text.split(|c: char| c == ':' || c == '-').collect();
    if tokens.len() != N {
        return Err(ParseMacError::WrongOctetCount(tokens.len()));
    }
    let mut octets = [0u8; N];
    for (octet, token) in octets.iter_mut().zip(&tokens) {
        // from_str_radix tolerates a leading '+', so check the digits first.
        if token.len() != 2 || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParseMacError::BadOctet(token.to_string()));
        }
        *octet = u8::from_str_radix(token, 16)
            .map_err(|_| ParseMacError::BadOctet(token.to_string()))?;
    }
    Ok(octets)
}

pub(crate) fn format_octets(f: &mut fmt::Formatter, octets: &[u8]) -> fmt::Result {
    for (i, octet) in octets.iter().enumerate() {
        if i > 0 {
            f.write_str(":")?;
        }
        write!(f, "{:02X}", octet)?;
    }
    Ok(())
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        format_octets(f, &self.0)
    }
}

impl FromStr for MacAddress {
    type Err = ParseMacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_mac(s)
    }
}

impl TryFrom<String> for MacAddress {
    type Error = ParseMacError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        parse_mac(&s)
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> String {
        mac.to_string()
    }
}

impl From<[u8; OCTETS]> for MacAddress {
    fn from(octets: [u8; OCTETS]) -> Self {
        MacAddress(octets)
    }
}
