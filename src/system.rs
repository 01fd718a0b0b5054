//! System entities: plain hosts, jail masters and jails
//!
//! Provides:
//! - `System`: a standalone host with named interfaces
//! - `Master`: a host that can attach jails, with per-jail uniqueness
//! - `Jail`: a guest environment on a master's interfaces
//! - `SystemRef`: a capability-tagged handle over any of the three

pub mod base;
pub mod jail;
pub mod master;

pub use base::{System, SystemConfig};
pub use jail::{IpRole, Jail, JailConfig, MAIN_IP_PRECEDENCE};
pub use master::{DEFAULT_JAIL_ROOT, Master, MasterConfig};

use std::fmt;
use std::rc::Rc;

/// Common read surface shared by every system entity
///
/// `ip_pool` is `None` for entities that do not own interfaces (jails).
pub trait Environment {
    fn name(&self) -> &str;
    fn hostname(&self) -> &str;
    fn ip_pool(&self) -> Option<Vec<String>>;
}

/// A capability-tagged handle to any system entity
///
/// This is what `Master::attach` accepts: the tag tells the master whether
/// the candidate is actually a jail.
#[derive(Debug, Clone)]
pub enum SystemRef {
    System(Rc<System>),
    Master(Rc<Master>),
    Jail(Rc<Jail>),
}

impl SystemRef {
    pub fn name(&self) -> &str {
        match self {
            SystemRef::System(system) => system.name(),
            SystemRef::Master(master) => master.name(),
            SystemRef::Jail(jail) => jail.name(),
        }
    }

    pub fn hostname(&self) -> &str {
        match self {
            SystemRef::System(system) => system.hostname(),
            SystemRef::Master(master) => master.hostname(),
            SystemRef::Jail(jail) => jail.hostname(),
        }
    }

    pub fn ip_pool(&self) -> Option<Vec<String>> {
        match self {
            SystemRef::System(system) => system.ip_pool(),
            SystemRef::Master(master) => master.ip_pool(),
            SystemRef::Jail(jail) => jail.ip_pool(),
        }
    }

    pub fn as_jail(&self) -> Option<&Rc<Jail>> {
        match self {
            SystemRef::Jail(jail) => Some(jail),
            _ => None,
        }
    }
}

impl fmt::Display for SystemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Rc<System>> for SystemRef {
    fn from(system: Rc<System>) -> Self {
        SystemRef::System(system)
    }
}

impl From<Rc<Master>> for SystemRef {
    fn from(master: Rc<Master>) -> Self {
        SystemRef::Master(master)
    }
}

impl From<Rc<Jail>> for SystemRef {
    fn from(jail: Rc<Jail>) -> Self {
        SystemRef::Jail(jail)
    }
}
