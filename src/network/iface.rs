//! Named network interfaces

use crate::error::Result;
use crate::network::addr::{AddrSet, parse_ifaddr};
use ipnet::IpNet;
use std::collections::BTreeSet;

/// A named network interface grouping IPv4 and IPv6 address sets
///
/// Owned by exactly one system. Equality is structural: same name and the
/// same addresses in both families.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    name: String,
    ifsv4: AddrSet,
    ifsv6: AddrSet,
}

impl Interface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ifsv4: AddrSet::new(),
            ifsv6: AddrSet::new(),
        }
    }

    /// Build an interface from address literals
    pub fn with_ips(name: impl Into<String>, literals: &[String]) -> Result<Self> {
        let mut iface = Self::new(name);
        iface.add_ips(literals)?;
        Ok(iface)
    }

    /// Parse address literals and insert them, routed by family
    ///
    /// Addresses already present are ignored.
    pub fn add_ips(&mut self, literals: &[String]) -> Result<()> {
        for literal in literals {
            self.add(parse_ifaddr(literal)?);
        }
        Ok(())
    }

    /// Insert one parsed address, routed by family
    pub fn add(&mut self, ifaddr: IpNet) {
        match ifaddr {
            IpNet::V4(_) => self.ifsv4.add(ifaddr),
            IpNet::V6(_) => self.ifsv6.add(ifaddr),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ifsv4(&self) -> &AddrSet {
        &self.ifsv4
    }

    pub fn ifsv6(&self) -> &AddrSet {
        &self.ifsv6
    }

    /// Compressed address strings across both families
    pub fn ips(&self) -> BTreeSet<String> {
        self.ifsv4.ips().chain(self.ifsv6.ips()).collect()
    }

    /// Main IPv4 address: the smallest-sorted entry, if any
    pub fn main_ifv4(&self) -> Option<&IpNet> {
        self.ifsv4.main()
    }

    /// IPv4 aliases: everything after the main address, in sorted order
    pub fn alias_ifsv4(&self) -> &[IpNet] {
        self.ifsv4.aliases()
    }

    /// Main IPv6 address: the smallest-sorted entry, if any
    pub fn main_ifv6(&self) -> Option<&IpNet> {
        self.ifsv6.main()
    }

    /// IPv6 aliases: everything after the main address, in sorted order
    pub fn alias_ifsv6(&self) -> &[IpNet] {
        self.ifsv6.aliases()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literals(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_routes_by_family() {
        let iface =
            Interface::with_ips("re0", &literals(&["8.8.8.8/24", "2a:2a::2a/100"])).unwrap();
        assert_eq!(iface.ifsv4().len(), 1);
        assert_eq!(iface.ifsv6().len(), 1);
    }

    #[test]
    fn test_ips_union() {
        let iface =
            Interface::with_ips("re0", &literals(&["8.8.8.8", "8.8.8.9", "2a:2a::2a"])).unwrap();
        let ips = iface.ips();
        assert!(ips.contains("8.8.8.8"));
        assert!(ips.contains("8.8.8.9"));
        assert!(ips.contains("2a:2a::2a"));
        assert_eq!(ips.len(), 3);
    }

    #[test]
    fn test_main_and_aliases() {
        let iface =
            Interface::with_ips("re0", &literals(&["8.8.8.9/24", "8.8.8.8/24"])).unwrap();
        assert_eq!(iface.main_ifv4().unwrap().addr().to_string(), "8.8.8.8");
        assert_eq!(iface.alias_ifsv4().len(), 1);
        assert_eq!(iface.alias_ifsv4()[0].addr().to_string(), "8.8.8.9");
    }

    #[test]
    fn test_main_absent_when_family_empty() {
        let iface = Interface::with_ips("re0", &literals(&["8.8.8.8"])).unwrap();
        assert!(iface.main_ifv4().is_some());
        assert!(iface.main_ifv6().is_none());
    }

    #[test]
    fn test_structural_equality() {
        let a = Interface::with_ips("re0", &literals(&["8.8.8.8", "2a:2a::2a"])).unwrap();
        let b = Interface::with_ips("re0", &literals(&["2a:2a::2a", "8.8.8.8"])).unwrap();
        let c = Interface::with_ips("ath0", &literals(&["8.8.8.8", "2a:2a::2a"])).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_duplicate_adds_ignored() {
        let mut iface = Interface::with_ips("re0", &literals(&["8.8.8.8/24"])).unwrap();
        iface.add_ips(&literals(&["8.8.8.8"])).unwrap();
        assert_eq!(iface.ifsv4().len(), 1);
    }
}
