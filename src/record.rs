//! A single inclusive address range with its country label

use serde::Serialize;
use std::fmt;

use crate::address::{Address, IpFamily};
use crate::error::RowError;

/// Inclusive `[start, end]` range of one address family mapped to a label
///
/// Construction validates `start <= end`, matching families and a
/// non-blank label, so every record that exists is well formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct IntervalRecord {
    family: IpFamily,
    start: u128,
    end: u128,
    label: String,
}

impl IntervalRecord {
    /// Build a record from two addresses and a label
    pub fn new(start: Address, end: Address, label: &str) -> Result<Self, RowError> {
        if start.family() != end.family() {
            return Err(RowError::malformed(format!(
                "start {} is {} but end {} is {}",
                start,
                start.family(),
                end,
                end.family()
            )));
        }
        if start.value() > end.value() {
            return Err(RowError::malformed(format!(
                "start {} is after end {}",
                start, end
            )));
        }
        let label = label.trim();
        if label.is_empty() {
            return Err(RowError::EmptyLabel);
        }

        Ok(Self {
            family: start.family(),
            start: start.value(),
            end: end.value(),
            label: label.to_string(),
        })
    }

    /// Parse the three text fields of a dataset row
    pub fn parse(start: &str, end: &str, label: &str) -> Result<Self, RowError> {
        let start_addr = Address::parse(start)
            .ok_or_else(|| RowError::malformed(format!("invalid start address {:?}", start)))?;
        let end_addr = Address::parse(end)
            .ok_or_else(|| RowError::malformed(format!("invalid end address {:?}", end)))?;
        Self::new(start_addr, end_addr, label)
    }

    /// Address family of both bounds
    pub fn family(&self) -> IpFamily {
        self.family
    }

    /// First address (inclusive)
    pub fn start(&self) -> u128 {
        self.start
    }

    /// Last address (inclusive)
    pub fn end(&self) -> u128 {
        self.end
    }

    /// Country label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of addresses covered, saturating for the full IPv6 space
    pub fn span(&self) -> u128 {
        (self.end - self.start).saturating_add(1)
    }

    /// Inclusive containment test
    pub fn contains(&self, addr: &Address) -> bool {
        addr.family() == self.family && self.start <= addr.value() && addr.value() <= self.end
    }

    /// First address as an [`Address`]
    pub fn start_address(&self) -> Address {
        self.bound(self.start)
    }

    /// Last address as an [`Address`]
    pub fn end_address(&self) -> Address {
        self.bound(self.end)
    }

    fn bound(&self, value: u128) -> Address {
        match self.family {
            IpFamily::V4 => Address::v4(value as u32),
            IpFamily::V6 => Address::v6(value),
        }
    }
}

impl fmt::Display for IntervalRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} - {}] {}",
            self.bound(self.start),
            self.bound(self.end),
            self.label
        )
    }
}
