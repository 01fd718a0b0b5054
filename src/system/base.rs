//! Shared system construction and the plain `System` entity

use crate::error::{Error, Result};
use crate::network::addr::IpInput;
use crate::network::iface::Interface;
use crate::system::Environment;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

/// Default interface names used when a role carries addresses but no
/// explicit device name
const DEFAULT_EXT_IF: &str = "em0";
const DEFAULT_INT_IF: &str = "em1";
const DEFAULT_LO_IF: &str = "lo0";

/// Configuration for a system entity
///
/// Consuming builder: every option has a chained setter. Address options
/// accept a single literal or a list, each optionally CIDR-suffixed.
#[derive(Debug, Clone, Default)]
pub struct SystemConfig {
    pub(crate) name: String,
    pub(crate) hostname: Option<String>,
    pub(crate) ext_if: Option<String>,
    pub(crate) int_if: Option<String>,
    pub(crate) lo_if: Option<String>,
    pub(crate) ext_ipv4: Vec<String>,
    pub(crate) ext_ipv6: Vec<String>,
    pub(crate) int_ipv4: Vec<String>,
    pub(crate) int_ipv6: Vec<String>,
    pub(crate) lo_ipv4: Vec<String>,
    pub(crate) lo_ipv6: Vec<String>,
}

impl SystemConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn ext_if(mut self, name: impl Into<String>) -> Self {
        self.ext_if = Some(name.into());
        self
    }

    pub fn int_if(mut self, name: impl Into<String>) -> Self {
        self.int_if = Some(name.into());
        self
    }

    pub fn lo_if(mut self, name: impl Into<String>) -> Self {
        self.lo_if = Some(name.into());
        self
    }

    pub fn ext_ipv4(mut self, ips: impl Into<IpInput>) -> Self {
        self.ext_ipv4.extend(ips.into().into_vec());
        self
    }

    pub fn ext_ipv6(mut self, ips: impl Into<IpInput>) -> Self {
        self.ext_ipv6.extend(ips.into().into_vec());
        self
    }

    pub fn int_ipv4(mut self, ips: impl Into<IpInput>) -> Self {
        self.int_ipv4.extend(ips.into().into_vec());
        self
    }

    pub fn int_ipv6(mut self, ips: impl Into<IpInput>) -> Self {
        self.int_ipv6.extend(ips.into().into_vec());
        self
    }

    pub fn lo_ipv4(mut self, ips: impl Into<IpInput>) -> Self {
        self.lo_ipv4.extend(ips.into().into_vec());
        self
    }

    pub fn lo_ipv6(mut self, ips: impl Into<IpInput>) -> Self {
        self.lo_ipv6.extend(ips.into().into_vec());
        self
    }
}

/// Identity and interface state shared by systems and masters
#[derive(Debug, Clone)]
pub(crate) struct Base {
    name: String,
    hostname: String,
    ext_if: Option<Interface>,
    int_if: Option<Interface>,
    lo_if: Option<Interface>,
}

impl Base {
    /// Build the shared state, assembling one interface per role that has
    /// an explicit name or at least one address
    ///
    /// The pool-wide uniqueness check runs once, at the end, over every
    /// address the entity ended up with.
    pub(crate) fn build(config: SystemConfig) -> Result<Self> {
        if config.name.is_empty() {
            return Err(Error::ConfigValidation(
                "system name cannot be empty".into(),
            ));
        }

        let hostname = config.hostname.unwrap_or_else(|| config.name.clone());

        let ext_if = make_interface(
            config.ext_if,
            DEFAULT_EXT_IF,
            &config.ext_ipv4,
            &config.ext_ipv6,
        )?;
        let int_if = make_interface(
            config.int_if,
            DEFAULT_INT_IF,
            &config.int_ipv4,
            &config.int_ipv6,
        )?;
        let lo_if = make_interface(
            config.lo_if,
            DEFAULT_LO_IF,
            &config.lo_ipv4,
            &config.lo_ipv6,
        )?;

        let base = Self {
            name: config.name,
            hostname,
            ext_if,
            int_if,
            lo_if,
        };
        check_unique(&base.ip_pool())?;
        Ok(base)
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn hostname(&self) -> &str {
        &self.hostname
    }

    pub(crate) fn ext_if(&self) -> Option<&Interface> {
        self.ext_if.as_ref()
    }

    pub(crate) fn int_if(&self) -> Option<&Interface> {
        self.int_if.as_ref()
    }

    pub(crate) fn lo_if(&self) -> Option<&Interface> {
        self.lo_if.as_ref()
    }

    /// Compressed address strings across all interfaces
    ///
    /// Order is external, internal, loopback; IPv4 before IPv6 within an
    /// interface; sorted within a family. Recomputed from interface state.
    pub(crate) fn ip_pool(&self) -> Vec<String> {
        let mut pool = Vec::new();
        for iface in [&self.ext_if, &self.int_if, &self.lo_if]
            .into_iter()
            .flatten()
        {
            pool.extend(iface.ifsv4().ips());
            pool.extend(iface.ifsv6().ips());
        }
        pool
    }
}

fn make_interface(
    name: Option<String>,
    default_name: &str,
    ipv4: &[String],
    ipv6: &[String],
) -> Result<Option<Interface>> {
    if name.is_none() && ipv4.is_empty() && ipv6.is_empty() {
        return Ok(None);
    }
    let mut iface = Interface::new(name.unwrap_or_else(|| default_name.to_string()));
    iface.add_ips(ipv4)?;
    iface.add_ips(ipv6)?;
    Ok(Some(iface))
}

/// Fail on the first address that appears twice in the candidate pool
pub(crate) fn check_unique(pool: &[String]) -> Result<()> {
    let mut seen = HashSet::new();
    for ip in pool {
        if !seen.insert(ip.as_str()) {
            return Err(Error::DuplicateIp { ip: ip.clone() });
        }
    }
    Ok(())
}

/// A standalone host: named interfaces, no jails
#[derive(Debug)]
pub struct System {
    base: Base,
}

impl System {
    pub fn new(config: SystemConfig) -> Result<Rc<Self>> {
        Ok(Rc::new(Self {
            base: Base::build(config)?,
        }))
    }

    pub fn name(&self) -> &str {
        self.base.name()
    }

    pub fn hostname(&self) -> &str {
        self.base.hostname()
    }

    pub fn ext_if(&self) -> Option<&Interface> {
        self.base.ext_if()
    }

    pub fn int_if(&self) -> Option<&Interface> {
        self.base.int_if()
    }

    pub fn lo_if(&self) -> Option<&Interface> {
        self.base.lo_if()
    }

    pub fn ip_pool(&self) -> Option<Vec<String>> {
        Some(self.base.ip_pool())
    }
}

impl Environment for System {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn hostname(&self) -> &str {
        self.base.hostname()
    }

    fn ip_pool(&self) -> Option<Vec<String>> {
        Some(self.base.ip_pool())
    }
}

impl fmt::Display for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
