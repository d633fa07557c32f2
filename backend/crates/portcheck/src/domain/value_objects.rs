//! Domain Value Objects
//!
//! Immutable value types for the port check domain.

use std::fmt;
use std::net::IpAddr;

use crate::error::PortCheckError;

/// TCP port number, guaranteed to lie in 1..=65535
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Port(u16);

impl Port {
    pub const MIN: u16 = 1;
    pub const MAX: u16 = u16::MAX;

    pub fn new(value: u16) -> Option<Self> {
        (value >= Self::MIN).then_some(Self(value))
    }

    /// Parse caller input, rejecting anything outside 1..=65535
    pub fn parse(input: &str) -> Result<Self, PortCheckError> {
        let value: i64 = input
            .trim()
            .parse()
            .map_err(|_| PortCheckError::InvalidPort(input.to_string()))?;

        u16::try_from(value)
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| PortCheckError::InvalidPort(input.to_string()))
    }

    pub fn get(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Port> for u16 {
    fn from(p: Port) -> Self {
        p.0
    }
}

/// Key under which a caller is throttled and audited
///
/// IPv4-mapped IPv6 addresses are folded to plain IPv4 so one client
/// cannot hold two windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(IpAddr);

impl ClientId {
    pub fn new(ip: IpAddr) -> Self {
        Self(ip.to_canonical())
    }

    pub fn ip(&self) -> IpAddr {
        self.0
    }
}

impl From<IpAddr> for ClientId {
    fn from(ip: IpAddr) -> Self {
        Self::new(ip)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
