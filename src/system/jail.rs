//! Jails: guest environments hosted on a master's interfaces

use crate::error::{Error, Result};
use crate::network::addr::{AddrSet, IpInput, parse_ifaddr};
use crate::system::base::{SystemConfig, check_unique};
use crate::system::master::Master;
use crate::system::{Environment, SystemRef};
use ipnet::IpNet;
use std::cell::RefCell;
use std::fmt;
use std::path::PathBuf;
use std::rc::{Rc, Weak};

/// Address roles a jail may carry
///
/// The discriminant doubles as the index into a jail's role table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpRole {
    ExtIpv4 = 0,
    ExtIpv6 = 1,
    IntIpv4 = 2,
    IntIpv6 = 3,
    LoIpv4 = 4,
    LoIpv6 = 5,
}

/// Role precedence for main-IP resolution: external before internal before
/// loopback, IPv4 before IPv6 within a role. This literal order is the
/// tie-break; it is never derived from field layout.
pub const MAIN_IP_PRECEDENCE: [IpRole; 6] = [
    IpRole::ExtIpv4,
    IpRole::ExtIpv6,
    IpRole::IntIpv4,
    IpRole::IntIpv6,
    IpRole::LoIpv4,
    IpRole::LoIpv6,
];

impl IpRole {
    pub const fn as_str(self) -> &'static str {
        match self {
            IpRole::ExtIpv4 => "ext_ipv4",
            IpRole::ExtIpv6 => "ext_ipv6",
            IpRole::IntIpv4 => "int_ipv4",
            IpRole::IntIpv6 => "int_ipv6",
            IpRole::LoIpv4 => "lo_ipv4",
            IpRole::LoIpv6 => "lo_ipv6",
        }
    }

    /// Look up a role by its option name; `None` for anything outside the
    /// allowed list
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "ext_ipv4" => Some(IpRole::ExtIpv4),
            "ext_ipv6" => Some(IpRole::ExtIpv6),
            "int_ipv4" => Some(IpRole::IntIpv4),
            "int_ipv6" => Some(IpRole::IntIpv6),
            "lo_ipv4" => Some(IpRole::LoIpv4),
            "lo_ipv6" => Some(IpRole::LoIpv6),
            _ => None,
        }
    }
}

impl fmt::Display for IpRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a jail
///
/// Wraps the system surface and adds the jail-only options. The interface
/// name options are still accepted by the builder; `Jail::new` rejects them
/// before touching any address.
#[derive(Debug, Clone)]
pub struct JailConfig {
    pub(crate) base: SystemConfig,
    uid: Option<u32>,
    master: Option<Rc<Master>>,
    main_ip: Option<String>,
    precedence: [IpRole; 6],
}

impl JailConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: SystemConfig::new(name),
            uid: None,
            master: None,
            main_ip: None,
            precedence: MAIN_IP_PRECEDENCE,
        }
    }

    pub fn uid(mut self, uid: u32) -> Self {
        self.uid = Some(uid);
        self
    }

    pub fn master(mut self, master: &Rc<Master>) -> Self {
        self.master = Some(master.clone());
        self
    }

    /// Name the role whose address becomes the jail's main IP
    pub fn main_ip(mut self, role: impl Into<String>) -> Self {
        self.main_ip = Some(role.into());
        self
    }

    /// Override the resolution precedence (defaults to
    /// [`MAIN_IP_PRECEDENCE`])
    pub fn main_ip_precedence(mut self, order: [IpRole; 6]) -> Self {
        self.precedence = order;
        self
    }

    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.base = self.base.hostname(hostname);
        self
    }

    pub fn ext_if(mut self, name: impl Into<String>) -> Self {
        self.base = self.base.ext_if(name);
        self
    }

    pub fn int_if(mut self, name: impl Into<String>) -> Self {
        self.base = self.base.int_if(name);
        self
    }

    pub fn lo_if(mut self, name: impl Into<String>) -> Self {
        self.base = self.base.lo_if(name);
        self
    }

    pub fn ext_ipv4(mut self, ips: impl Into<IpInput>) -> Self {
        self.base = self.base.ext_ipv4(ips);
        self
    }

    pub fn ext_ipv6(mut self, ips: impl Into<IpInput>) -> Self {
        self.base = self.base.ext_ipv6(ips);
        self
    }

    pub fn int_ipv4(mut self, ips: impl Into<IpInput>) -> Self {
        self.base = self.base.int_ipv4(ips);
        self
    }

    pub fn int_ipv6(mut self, ips: impl Into<IpInput>) -> Self {
        self.base = self.base.int_ipv6(ips);
        self
    }

    pub fn lo_ipv4(mut self, ips: impl Into<IpInput>) -> Self {
        self.base = self.base.lo_ipv4(ips);
        self
    }

    pub fn lo_ipv6(mut self, ips: impl Into<IpInput>) -> Self {
        self.base = self.base.lo_ipv6(ips);
        self
    }
}

/// A guest environment hosted by a master
///
/// A jail runs on its master's physical interfaces, so it owns no
/// `Interface` of its own, only per-role address sets. Its aggregate
/// `ip_pool` is always `None`; `jail_ip_pool` lists the jail's own
/// addresses.
#[derive(Debug)]
pub struct Jail {
    name: String,
    hostname: String,
    uid: Option<u32>,
    addrs: [AddrSet; 6],
    ip: Option<IpNet>,
    master: RefCell<Weak<Master>>,
}

impl Jail {
    /// Build and validate a jail
    ///
    /// When a master is configured, the jail is attached before the
    /// reference is returned; on any failure no jail escapes.
    pub fn new(config: JailConfig) -> Result<Rc<Self>> {
        // Interfaces belong to the master; reject before any address work
        if config.base.ext_if.is_some()
            || config.base.int_if.is_some()
            || config.base.lo_if.is_some()
        {
            return Err(Error::JailOwnInterfaces {
                jail: config.base.name,
            });
        }
        if config.base.name.is_empty() {
            return Err(Error::ConfigValidation("jail name cannot be empty".into()));
        }

        let name = config.base.name;
        let hostname = config.base.hostname.unwrap_or_else(|| name.clone());

        let mut addrs: [AddrSet; 6] = std::array::from_fn(|_| AddrSet::new());
        let inputs: [(IpRole, &[String]); 6] = [
            (IpRole::ExtIpv4, &config.base.ext_ipv4),
            (IpRole::ExtIpv6, &config.base.ext_ipv6),
            (IpRole::IntIpv4, &config.base.int_ipv4),
            (IpRole::IntIpv6, &config.base.int_ipv6),
            (IpRole::LoIpv4, &config.base.lo_ipv4),
            (IpRole::LoIpv6, &config.base.lo_ipv6),
        ];
        for (role, literals) in inputs {
            let set = &mut addrs[role as usize];
            for literal in literals {
                set.add(parse_ifaddr(literal)?);
            }
        }

        check_unique(&pool_of(&addrs))?;

        let ip = resolve_main_ip(
            &name,
            &addrs,
            config.main_ip.as_deref(),
            &config.precedence,
        )?;

        let jail = Rc::new(Self {
            name,
            hostname,
            uid: config.uid,
            addrs,
            ip,
            master: RefCell::new(Weak::new()),
        });

        if let Some(master) = config.master {
            master.attach(&SystemRef::Jail(jail.clone()))?;
        }
        Ok(jail)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn uid(&self) -> Option<u32> {
        self.uid
    }

    /// The resolved main address, if any role carries one
    pub fn ip(&self) -> Option<&IpNet> {
        self.ip.as_ref()
    }

    /// All addresses configured for one role, sorted
    pub fn role_addrs(&self, role: IpRole) -> &AddrSet {
        &self.addrs[role as usize]
    }

    /// The main (smallest-sorted) address of one role
    pub fn addr(&self, role: IpRole) -> Option<&IpNet> {
        self.addrs[role as usize].main()
    }

    pub fn ext_ipv4(&self) -> Option<&IpNet> {
        self.addr(IpRole::ExtIpv4)
    }

    pub fn ext_ipv6(&self) -> Option<&IpNet> {
        self.addr(IpRole::ExtIpv6)
    }

    pub fn int_ipv4(&self) -> Option<&IpNet> {
        self.addr(IpRole::IntIpv4)
    }

    pub fn int_ipv6(&self) -> Option<&IpNet> {
        self.addr(IpRole::IntIpv6)
    }

    pub fn lo_ipv4(&self) -> Option<&IpNet> {
        self.addr(IpRole::LoIpv4)
    }

    pub fn lo_ipv6(&self) -> Option<&IpNet> {
        self.addr(IpRole::LoIpv6)
    }

    /// A jail owns no interfaces, so it has no aggregate pool
    pub fn ip_pool(&self) -> Option<Vec<String>> {
        None
    }

    /// The jail's own addresses: external, internal, loopback, IPv4 before
    /// IPv6 within a role
    pub fn jail_ip_pool(&self) -> Vec<String> {
        let mut pool = Vec::new();
        for role in MAIN_IP_PRECEDENCE {
            pool.extend(self.addrs[role as usize].ips());
        }
        pool
    }

    /// The master this jail is attached to, if any
    pub fn master(&self) -> Option<Rc<Master>> {
        self.master.borrow().upgrade()
    }

    pub(crate) fn set_master(&self, master: Weak<Master>) {
        *self.master.borrow_mut() = master;
    }

    /// Root directory of the jail: `master.jail_root / name` when attached
    pub fn path(&self) -> Option<PathBuf> {
        self.master()
            .map(|master| master.jail_root().join(&self.name))
    }
}

impl Environment for Jail {
    fn name(&self) -> &str {
        &self.name
    }

    fn hostname(&self) -> &str {
        &self.hostname
    }

    fn ip_pool(&self) -> Option<Vec<String>> {
        None
    }
}

impl fmt::Display for Jail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn pool_of(addrs: &[AddrSet; 6]) -> Vec<String> {
    let mut pool = Vec::new();
    for role in MAIN_IP_PRECEDENCE {
        pool.extend(addrs[role as usize].ips());
    }
    pool
}

/// Pick the jail's main address
///
/// An explicit role name must be allowed and configured. Otherwise the head
/// of the precedence order wins outright when configured; failing that, a
/// single configured role is unambiguous, none means no main IP, and
/// several mean the caller has to choose.
fn resolve_main_ip(
    name: &str,
    addrs: &[AddrSet; 6],
    main_ip: Option<&str>,
    precedence: &[IpRole; 6],
) -> Result<Option<IpNet>> {
    if let Some(chosen) = main_ip {
        let role = IpRole::parse(chosen).ok_or_else(|| Error::MainIpNotAllowed {
            jail: name.to_string(),
            main_ip: chosen.to_string(),
        })?;
        return match addrs[role as usize].main() {
            Some(ifaddr) => Ok(Some(*ifaddr)),
            None => Err(Error::MainIpNotDefined {
                jail: name.to_string(),
                main_ip: role,
            }),
        };
    }

    if let Some(ifaddr) = addrs[precedence[0] as usize].main() {
        return Ok(Some(*ifaddr));
    }

    let defined: Vec<IpRole> = precedence
        .iter()
        .copied()
        .filter(|role| !addrs[*role as usize].is_empty())
        .collect();
    match defined.as_slice() {
        [] => Ok(None),
        [only] => Ok(addrs[*only as usize].main().copied()),
        _ => Err(Error::MainIpUndetermined {
            jail: name.to_string(),
            defined,
        }),
    }
}
