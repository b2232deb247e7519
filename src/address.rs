//! Integer form of IPv4 and IPv6 addresses
//!
//! Every address carries its family so IPv4 and IPv6 ranges can never be
//! compared against each other. IPv4 values live in the low 32 bits.

use serde::Serialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::error::IndexError;

/// Address family of an [`Address`] or interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum IpFamily {
    /// 32-bit IPv4
    V4,
    /// 128-bit IPv6
    V6,
}

impl IpFamily {
    /// Largest integer value representable in this family
    pub fn max_value(self) -> u128 {
        match self {
            IpFamily::V4 => u32::MAX as u128,
            IpFamily::V6 => u128::MAX,
        }
    }
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpFamily::V4 => f.write_str("IPv4"),
            IpFamily::V6 => f.write_str("IPv6"),
        }
    }
}

/// A parsed IP address in integer form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    family: IpFamily,
    value: u128,
}

impl Address {
    /// IPv4 address from its integer value
    pub fn v4(value: u32) -> Self {
        Self {
            family: IpFamily::V4,
            value: value as u128,
        }
    }

    /// IPv6 address from its integer value
    pub fn v6(value: u128) -> Self {
        Self {
            family: IpFamily::V6,
            value,
        }
    }

    /// Parse textual IPv4 or IPv6. Surrounding whitespace is ignored.
    ///
    /// IPv4-mapped IPv6 text (`::ffff:1.2.3.4`) becomes an IPv4 address.
    pub fn parse(text: &str) -> Option<Self> {
        text.trim().parse::<IpAddr>().ok().map(Self::from)
    }

    /// Address family
    pub fn family(&self) -> IpFamily {
        self.family
    }

    /// Integer value; IPv4 values fit in 32 bits
    pub fn value(&self) -> u128 {
        self.value
    }

    /// Back to a standard library address
    pub fn to_ip(&self) -> IpAddr {
        match self.family {
            IpFamily::V4 => IpAddr::V4(Ipv4Addr::from(self.value as u32)),
            IpFamily::V6 => IpAddr::V6(Ipv6Addr::from(self.value)),
        }
    }
}

impl From<IpAddr> for Address {
    fn from(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(v4) => Self::from(v4),
            IpAddr::V6(v6) => Self::from(v6),
        }
    }
}

impl From<Ipv4Addr> for Address {
    fn from(ip: Ipv4Addr) -> Self {
        Address::v4(u32::from(ip))
    }
}

impl From<Ipv6Addr> for Address {
    fn from(ip: Ipv6Addr) -> Self {
        match ip.to_ipv4_mapped() {
            Some(v4) => Self::from(v4),
            None => Address::v6(u128::from(ip)),
        }
    }
}

impl FromStr for Address {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s).ok_or_else(|| IndexError::InvalidAddress(s.to_string()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_ip())
    }
}
