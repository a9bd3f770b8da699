//! IP version and prefix types with safe parsing.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Address family a host's shaping configuration is inspected for.
///
/// The version decides which network counts as "anywhere", which u32
/// match offsets carry addresses, and which firewall command lists the
/// mangle table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IpVersion {
    /// IPv4 (default).
    #[default]
    #[serde(rename = "4")]
    V4,
    /// IPv6.
    #[serde(rename = "6")]
    V6,
}

impl IpVersion {
    /// Returns the "match anything" network for this version.
    pub const fn anywhere_network(&self) -> &'static str {
        match self {
            IpVersion::V4 => "0.0.0.0/0",
            IpVersion::V6 => "::/0",
        }
    }

    /// Returns true if `network` is the "match anything" network for this version.
    ///
    /// Any zero-length prefix over the unspecified address of the matching
    /// family counts, so `::0/0` and `0:0:0:0:0:0:0:0/0` are both anywhere
    /// for IPv6. Text that does not parse as a prefix is compared verbatim.
    pub fn is_anywhere_network(&self, network: &str) -> bool {
        let network = network.trim();

        match network.parse::<IpPrefix>() {
            Ok(prefix) => {
                prefix.prefix_len() == 0
                    && prefix.address().is_unspecified()
                    && prefix.version() == *self
            }
            Err(_) => network == self.anywhere_network(),
        }
    }

    /// Returns the numeric version (4 or 6).
    pub const fn as_u8(&self) -> u8 {
        match self {
            IpVersion::V4 => 4,
            IpVersion::V6 => 6,
        }
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

impl FromStr for IpVersion {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "4" | "ipv4" | "v4" => Ok(IpVersion::V4),
            "6" | "ipv6" | "v6" => Ok(IpVersion::V6),
            _ => Err(ParseError::InvalidIpVersion(s.to_string())),
        }
    }
}

/// An IP prefix in CIDR notation (e.g., 10.0.0.0/24 or 2001:db8::/32).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IpPrefix {
    address: IpAddr,
    prefix_len: u8,
}

impl IpPrefix {
    /// Creates a new IP prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix length is invalid for the address type
    /// (>32 for IPv4, >128 for IPv6).
    pub fn new(address: IpAddr, prefix_len: u8) -> Result<Self, ParseError> {
        let max_len = match address {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };

        if prefix_len > max_len {
            return Err(ParseError::InvalidIpPrefix(format!(
                "prefix length {} exceeds maximum {} for address type",
                prefix_len, max_len
            )));
        }

        Ok(IpPrefix {
            address,
            prefix_len,
        })
    }

    /// Builds an IPv4 prefix from a u32 match value and mask.
    ///
    /// The prefix length is the number of set bits in the mask.
    pub fn from_v4_match(value: u32, mask: u32) -> Self {
        IpPrefix {
            address: IpAddr::V4(Ipv4Addr::from(value & mask)),
            prefix_len: mask.count_ones() as u8,
        }
    }

    /// Builds an IPv6 prefix from four 32-bit u32 match words and their masks.
    pub fn from_v6_match(words: [u32; 4], masks: [u32; 4]) -> Self {
        let mut value: u128 = 0;
        let mut prefix_len = 0u32;

        for (word, mask) in words.iter().zip(masks.iter()) {
            value = (value << 32) | u128::from(word & mask);
            prefix_len += mask.count_ones();
        }

        IpPrefix {
            address: IpAddr::V6(Ipv6Addr::from(value)),
            prefix_len: prefix_len as u8,
        }
    }

    /// Returns the network address of this prefix.
    pub const fn address(&self) -> &IpAddr {
        &self.address
    }

    /// Returns the prefix length in bits.
    pub const fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Returns the IP version of this prefix.
    pub const fn version(&self) -> IpVersion {
        match self.address {
            IpAddr::V4(_) => IpVersion::V4,
            IpAddr::V6(_) => IpVersion::V6,
        }
    }

    /// Returns true if this is a host route (/32 for IPv4, /128 for IPv6).
    pub const fn is_host_route(&self) -> bool {
        match self.address {
            IpAddr::V4(_) => self.prefix_len == 32,
            IpAddr::V6(_) => self.prefix_len == 128,
        }
    }
}

impl fmt::Display for IpPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

impl FromStr for IpPrefix {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr_str, len_str) = s
            .rsplit_once('/')
            .ok_or_else(|| ParseError::InvalidIpPrefix(s.to_string()))?;

        let address: IpAddr = addr_str
            .parse()
            .map_err(|_| ParseError::InvalidIpAddress(addr_str.to_string()))?;
        let prefix_len: u8 = len_str
            .parse()
            .map_err(|_| ParseError::InvalidIpPrefix(s.to_string()))?;

        IpPrefix::new(address, prefix_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_anywhere_network_v4() {
        assert!(IpVersion::V4.is_anywhere_network("0.0.0.0/0"));
        assert!(IpVersion::V4.is_anywhere_network(" 0.0.0.0/0 "));
        assert!(!IpVersion::V4.is_anywhere_network("192.0.2.0/24"));
        assert!(!IpVersion::V4.is_anywhere_network("::/0"));
    }

    #[test]
    fn test_anywhere_network_v6() {
        assert!(IpVersion::V6.is_anywhere_network("::/0"));
        assert!(IpVersion::V6.is_anywhere_network("0:0:0:0:0:0:0:0/0"));
        assert!(!IpVersion::V6.is_anywhere_network("2001:db8::/32"));
        assert!(!IpVersion::V6.is_anywhere_network("0.0.0.0/0"));
    }

    #[test]
    fn test_anywhere_network_unparsable() {
        assert!(!IpVersion::V4.is_anywhere_network("anywhere"));
        assert!(!IpVersion::V4.is_anywhere_network(""));
    }

    #[test]
    fn test_ip_version_parse() {
        assert_eq!("4".parse::<IpVersion>().unwrap(), IpVersion::V4);
        assert_eq!("ipv6".parse::<IpVersion>().unwrap(), IpVersion::V6);
        assert!("5".parse::<IpVersion>().is_err());
        assert_eq!(IpVersion::V6.to_string(), "6");
    }

    #[test]
    fn test_ip_prefix_parse() {
        let prefix: IpPrefix = "10.0.0.0/24".parse().unwrap();
        assert_eq!(prefix.version(), IpVersion::V4);
        assert_eq!(prefix.prefix_len(), 24);

        let v6_prefix: IpPrefix = "2001:db8::/32".parse().unwrap();
        assert_eq!(v6_prefix.version(), IpVersion::V6);
        assert_eq!(v6_prefix.prefix_len(), 32);
    }

    #[test]
    fn test_from_v4_match() {
        let prefix = IpPrefix::from_v4_match(0xc000_0201, 0xffff_ff00);
        assert_eq!(prefix.to_string(), "192.0.2.0/24");

        let host = IpPrefix::from_v4_match(0xcb00_7105, 0xffff_ffff);
        assert_eq!(host.to_string(), "203.0.113.5/32");
        assert!(host.is_host_route());
    }

    #[test]
    fn test_from_v6_match() {
        let prefix = IpPrefix::from_v6_match(
            [0x2001_0db8, 0x0000_0001, 0, 0],
            [0xffff_ffff, 0xffff_0000, 0, 0],
        );
        assert_eq!(prefix.to_string(), "2001:db8::/48");
    }

    #[test]
    fn test_invalid_prefix_length() {
        assert!("10.0.0.0/33".parse::<IpPrefix>().is_err());
        assert!("2001:db8::/129".parse::<IpPrefix>().is_err());
        assert!("10.0.0.0".parse::<IpPrefix>().is_err());
    }
}
