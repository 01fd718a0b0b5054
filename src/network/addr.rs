//! Interface address parsing and ordered address sets

use crate::error::{Error, Result};
use ipnet::IpNet;
use std::net::IpAddr;

/// Parse one interface address literal
///
/// A literal may carry a CIDR prefix length (`8.8.8.8/24`). Without one,
/// the full address width is assumed: /32 for IPv4, /128 for IPv6.
pub fn parse_ifaddr(literal: &str) -> Result<IpNet> {
    if literal.contains('/') {
        return literal
            .parse::<IpNet>()
            .map_err(|_| Error::InvalidAddress(literal.to_string()));
    }

    let addr: IpAddr = literal
        .parse()
        .map_err(|_| Error::InvalidAddress(literal.to_string()))?;
    let prefix = match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    };
    IpNet::new(addr, prefix).map_err(|_| Error::InvalidAddress(literal.to_string()))
}

/// One address literal or a list of them
///
/// Constructor options accept either form; everything funnels through this
/// conversion type.
#[derive(Debug, Clone, Default)]
pub struct IpInput(Vec<String>);

impl IpInput {
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<&str> for IpInput {
    fn from(v: &str) -> Self {
        IpInput(vec![v.to_string()])
    }
}

impl From<String> for IpInput {
    fn from(v: String) -> Self {
        IpInput(vec![v])
    }
}

impl From<Vec<String>> for IpInput {
    fn from(v: Vec<String>) -> Self {
        IpInput(v)
    }
}

impl From<Vec<&str>> for IpInput {
    fn from(v: Vec<&str>) -> Self {
        IpInput(v.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for IpInput {
    fn from(v: &[&str]) -> Self {
        IpInput(v.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for IpInput {
    fn from(v: [&str; N]) -> Self {
        IpInput(v.iter().map(|s| s.to_string()).collect())
    }
}

/// Ordered, deduplicated collection of interface addresses for one family
///
/// Entries are kept sorted ascending by the compressed textual form of the
/// address. That same string is the identity key: an address already present
/// is ignored on insert, regardless of prefix length. The set never shrinks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddrSet {
    entries: Vec<IpNet>,
}

impl AddrSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an address preserving sort order
    ///
    /// An address whose compressed form is already present is ignored.
    pub fn add(&mut self, ifaddr: IpNet) {
        let key = ifaddr.addr().to_string();
        match self
            .entries
            .binary_search_by(|entry| entry.addr().to_string().cmp(&key))
        {
            Ok(_) => {}
            Err(pos) => self.entries.insert(pos, ifaddr),
        }
    }

    pub fn contains(&self, addr: &IpAddr) -> bool {
        let key = addr.to_string();
        self.entries
            .binary_search_by(|entry| entry.addr().to_string().cmp(&key))
            .is_ok()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Smallest entry in compressed-string order, if any
    pub fn main(&self) -> Option<&IpNet> {
        self.entries.first()
    }

    /// All entries after the main one, in sorted order
    pub fn aliases(&self) -> &[IpNet] {
        self.entries.get(1..).unwrap_or(&[])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, IpNet> {
        self.entries.iter()
    }

    /// Compressed address strings in sorted order
    pub fn ips(&self) -> impl Iterator<Item = String> + '_ {
        self.entries.iter().map(|entry| entry.addr().to_string())
    }
}

impl<'a> IntoIterator for &'a AddrSet {
    type Item = &'a IpNet;
    type IntoIter = std::slice::Iter<'a, IpNet>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
