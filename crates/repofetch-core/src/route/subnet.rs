//! Local subnet membership for swap classification.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Membership test against the device's current subnet.
///
/// Implementations are read-only from the engine's point of view; whoever
/// tracks network changes swaps the whole value between downloads.
pub trait LocalSubnet: Send + Sync {
    /// True if `addr` is a usable host address on the local subnet.
    fn contains(&self, addr: Ipv4Addr) -> bool;
}

/// No local network (offline, or only a non-LAN uplink). Nothing is swap.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSubnet;

impl LocalSubnet for NoSubnet {
    fn contains(&self, _addr: Ipv4Addr) -> bool {
        false
    }
}

/// IPv4 network in CIDR form, e.g. `192.168.1.0/24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Subnet {
    network: Ipv4Addr,
    prefix_len: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetParseError(String);

impl fmt::Display for SubnetParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid CIDR subnet: {}", self.0)
    }
}

impl std::error::Error for SubnetParseError {}

impl Ipv4Subnet {
    /// Host bits of `addr` are masked off, so `10.0.0.7/24` means `10.0.0.0/24`.
    pub fn new(addr: Ipv4Addr, prefix_len: u8) -> Option<Self> {
        if prefix_len > 32 {
            return None;
        }
        let network = Ipv4Addr::from(u32::from(addr) & mask(prefix_len));
        Some(Self {
            network,
            prefix_len,
        })
    }

    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub fn broadcast(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.network) | !mask(self.prefix_len))
    }
}

fn mask(prefix_len: u8) -> u32 {
    match prefix_len {
        0 => 0,
        n => u32::MAX << (32 - u32::from(n)),
    }
}

impl FromStr for Ipv4Subnet {
    type Err = SubnetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || SubnetParseError(s.to_string());
        let (addr, prefix) = s.trim().split_once('/').ok_or_else(err)?;
        let addr: Ipv4Addr = addr.parse().map_err(|_| err())?;
        let prefix: u8 = prefix.parse().map_err(|_| err())?;
        Ipv4Subnet::new(addr, prefix).ok_or_else(err)
    }
}

impl fmt::Display for Ipv4Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

impl LocalSubnet for Ipv4Subnet {
    // Network and broadcast addresses are not hosts; /31 and /32 have none.
    fn contains(&self, addr: Ipv4Addr) -> bool {
        let a = u32::from(addr);
        let m = mask(self.prefix_len);
        if a & m != u32::from(self.network) {
            return false;
        }
        a > u32::from(self.network) && a < u32::from(self.broadcast())
    }
}
