//! Masters: hosts that attach and index jails

use crate::error::{Error, Result};
use crate::network::addr::IpInput;
use crate::network::iface::Interface;
use crate::system::base::{Base, SystemConfig};
use crate::system::jail::Jail;
use crate::system::{Environment, SystemRef};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

/// Where jail root directories live unless overridden
pub const DEFAULT_JAIL_ROOT: &str = "/usr/jails";

/// Configuration for a master
#[derive(Debug, Clone)]
pub struct MasterConfig {
    base: SystemConfig,
    jail_root: Option<PathBuf>,
}

impl MasterConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: SystemConfig::new(name),
            jail_root: None,
        }
    }

    pub fn jail_root_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.jail_root = Some(path.into());
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

/// Jail registry: primary map by name, shadow indices for hostname and uid
/// uniqueness, attach order for pool aggregation
#[derive(Debug, Default)]
struct Registry {
    by_name: BTreeMap<String, Rc<Jail>>,
    hostnames: HashMap<String, String>,
    uids: HashMap<u32, String>,
    order: Vec<String>,
}

/// A host that can attach jails
///
/// The registry is the only state that mutates after construction, and only
/// through `attach`.
#[derive(Debug)]
pub struct Master {
    base: Base,
    jail_root: PathBuf,
    registry: RefCell<Registry>,
    // Handle to the owning Rc, so attach can hand out weak back-references
    weak: Weak<Master>,
}

impl Master {
    pub fn new(config: MasterConfig) -> Result<Rc<Self>> {
        let base = Base::build(config.base)?;
        let jail_root = config
            .jail_root
            .unwrap_or_else(|| PathBuf::from(DEFAULT_JAIL_ROOT));
        Ok(Rc::new_cyclic(|weak| Self {
            base,
            jail_root,
            registry: RefCell::new(Registry::default()),
            weak: weak.clone(),
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

    pub fn jail_root(&self) -> &Path {
        &self.jail_root
    }

    /// Attached jails by name
    pub fn jails(&self) -> BTreeMap<String, Rc<Jail>> {
        self.registry.borrow().by_name.clone()
    }

    pub fn jail(&self, name: &str) -> Option<Rc<Jail>> {
        self.registry.borrow().by_name.get(name).cloned()
    }

    /// The master's addresses followed by every attached jail's, in attach
    /// order
    ///
    /// This aggregate supersedes the jails' own pools: global uniqueness is
    /// enforced over it at attach time.
    pub fn ip_pool(&self) -> Option<Vec<String>> {
        let mut pool = self.base.ip_pool();
        let registry = self.registry.borrow();
        for name in &registry.order {
            if let Some(jail) = registry.by_name.get(name) {
                pool.extend(jail.jail_ip_pool());
            }
        }
        Some(pool)
    }

    /// Attach a jail to this master
    ///
    /// Validation order: the candidate must be a jail; must not belong to
    /// another master; its name, hostname and uid must be new to this
    /// master (checked in that order, first match wins); none of its
    /// addresses may collide with the aggregate pool. Nothing is recorded
    /// until every check has passed.
    pub fn attach(&self, candidate: &SystemRef) -> Result<()> {
        let jail = candidate.as_jail().ok_or_else(|| Error::AttachNonJail {
            master: self.name().to_string(),
            jail: candidate.name().to_string(),
        })?;

        if let Some(owner) = jail.master() {
            if !std::ptr::eq(Rc::as_ptr(&owner), self) {
                return Err(Error::JailAlreadyAttached {
                    master: self.name().to_string(),
                    jail: jail.name().to_string(),
                    owner: owner.name().to_string(),
                });
            }
        }

        let mut registry = self.registry.borrow_mut();

        if registry.by_name.contains_key(jail.name()) {
            return Err(Error::DuplicateJailName {
                master: self.name().to_string(),
                jail: jail.name().to_string(),
                name: jail.name().to_string(),
            });
        }
        if registry.hostnames.contains_key(jail.hostname()) {
            return Err(Error::DuplicateJailHostname {
                master: self.name().to_string(),
                jail: jail.name().to_string(),
                hostname: jail.hostname().to_string(),
            });
        }
        if let Some(uid) = jail.uid() {
            if registry.uids.contains_key(&uid) {
                return Err(Error::DuplicateJailUid {
                    master: self.name().to_string(),
                    jail: jail.name().to_string(),
                    uid,
                });
            }
        }

        // Aggregate pool: own addresses plus every jail attached so far
        let mut seen: HashSet<String> = self.base.ip_pool().into_iter().collect();
        for name in &registry.order {
            if let Some(attached) = registry.by_name.get(name) {
                seen.extend(attached.jail_ip_pool());
            }
        }
        for ip in jail.jail_ip_pool() {
            if seen.contains(&ip) {
                return Err(Error::DuplicateIp { ip });
            }
        }

        let name = jail.name().to_string();
        registry.hostnames.insert(jail.hostname().to_string(), name.clone());
        if let Some(uid) = jail.uid() {
            registry.uids.insert(uid, name.clone());
        }
        registry.by_name.insert(name.clone(), jail.clone());
        registry.order.push(name);
        jail.set_master(self.weak.clone());
        Ok(())
    }
}

impl Environment for Master {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn hostname(&self) -> &str {
        self.base.hostname()
    }

    fn ip_pool(&self) -> Option<Vec<String>> {
        Master::ip_pool(self)
    }
}

impl fmt::Display for Master {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::base::System;
    use crate::system::jail::JailConfig;

    fn master(name: &str) -> Rc<Master> {
        Master::new(MasterConfig::new(name).ext_if("re0").ext_ipv4("9.9.9.9")).unwrap()
    }

    #[test]
    fn test_default_jail_root() {
        let master = Master::new(MasterConfig::new("system")).unwrap();
        assert_eq!(master.jail_root(), Path::new("/usr/jails"));
    }

    #[test]
    fn test_custom_jail_root() {
        let master = Master::new(
            MasterConfig::new("system").jail_root_path("/usr/local/ezjail"),
        )
        .unwrap();
        assert_eq!(master.jail_root(), Path::new("/usr/local/ezjail"));
    }

    #[test]
    fn test_jails_map() {
        let master = master("master");
        let jail_1 = Jail::new(
            JailConfig::new("jail_1").master(&master).ext_ipv4("7.7.7.7/24"),
        )
        .unwrap();
        let jail_2 = Jail::new(
            JailConfig::new("jail_2").master(&master).ext_ipv4("8.8.8.8/24"),
        )
        .unwrap();

        let jails = master.jails();
        assert_eq!(jails.len(), 2);
        assert!(Rc::ptr_eq(&jails["jail_1"], &jail_1));
        assert!(Rc::ptr_eq(&jails["jail_2"], &jail_2));
    }

    #[test]
    fn test_attach_non_jail() {
        let master = master("master");
        let system = System::new(SystemConfig::new("system").ext_ipv4("8.8.8.8")).unwrap();

        let err = master.attach(&SystemRef::System(system)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Can't attach `system` to `master`. `system` is not a jail."
        );
        assert!(master.jails().is_empty());

        let other = Master::new(MasterConfig::new("other")).unwrap();
        let err = master.attach(&SystemRef::Master(other)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Can't attach `other` to `master`. `other` is not a jail."
        );
        assert!(master.jails().is_empty());
    }

    #[test]
    fn test_already_attached() {
        let first = master("master_1");
        let second = master("master_2");
        let jail = Jail::new(
            JailConfig::new("jail").master(&first).ext_ipv4("8.8.8.8/24"),
        )
        .unwrap();

        let err = second.attach(&SystemRef::Jail(jail)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Can't attach `jail` to `master_2`. `jail` is already attached to `master_1`."
        );
        assert!(second.jails().is_empty());
    }

    #[test]
    fn test_duplicate_name() {
        let master = master("master");
        Jail::new(JailConfig::new("jail").master(&master).ext_ipv4("8.8.8.8/24")).unwrap();

        let other = Jail::new(JailConfig::new("jail").ext_ipv4("7.7.7.7/24")).unwrap();
        let err = master.attach(&SystemRef::Jail(other)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Can't attach `jail` to `master`. A jail called `jail` is already attached to `master`."
        );
        assert_eq!(master.jails().len(), 1);
    }

    #[test]
    fn test_duplicate_hostname() {
        let master = master("master");
        Jail::new(
            JailConfig::new("jail_1")
                .hostname("jail.foo.bar")
                .master(&master)
                .ext_ipv4("8.8.8.8/24"),
        )
        .unwrap();

        let err = Jail::new(
            JailConfig::new("jail_2")
                .hostname("jail.foo.bar")
                .master(&master)
                .ext_ipv4("7.7.7.7/24"),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Can't attach `jail_2` to `master`. A jail with hostname `jail.foo.bar` is already attached to `master`."
        );
    }

    #[test]
    fn test_duplicate_uid() {
        let master = master("master");
        Jail::new(
            JailConfig::new("jail_1").uid(110).master(&master).ext_ipv4("8.8.8.8/24"),
        )
        .unwrap();

        let err = Jail::new(
            JailConfig::new("jail_2").uid(110).master(&master).ext_ipv4("7.7.7.7/24"),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Can't attach `jail_2` to `master`. A jail with uid `110` is already attached to `master`."
        );
    }

    #[test]
    fn test_duplicate_checks_name_first() {
        // Same name, hostname and uid: the name check wins
        let master = master("master");
        Jail::new(
            JailConfig::new("jail").uid(110).master(&master).ext_ipv4("8.8.8.8/24"),
        )
        .unwrap();

        let err = Jail::new(
            JailConfig::new("jail").uid(110).ext_ipv4("7.7.7.7/24").master(&master),
        )
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateJailName { .. }));
    }

    #[test]
    fn test_distinct_uids_attach() {
        let master = master("master");
        Jail::new(
            JailConfig::new("jail_1").uid(110).master(&master).ext_ipv4("8.8.8.8/24"),
        )
        .unwrap();
        Jail::new(
            JailConfig::new("jail_2").uid(111).master(&master).ext_ipv4("7.7.7.7/24"),
        )
        .unwrap();
        assert_eq!(master.jails().len(), 2);
    }

    #[test]
    fn test_aggregate_pool_attach_order() {
        let master = master("master");
        Jail::new(JailConfig::new("jail_b").master(&master).ext_ipv4("8.8.8.8/24")).unwrap();
        Jail::new(JailConfig::new("jail_a").master(&master).ext_ipv4("7.7.7.7/24")).unwrap();

        // Own addresses first, then jails as they were attached
        assert_eq!(
            Master::ip_pool(&master),
            Some(vec![
                "9.9.9.9".to_string(),
                "8.8.8.8".to_string(),
                "7.7.7.7".to_string()
            ])
        );
    }

    #[test]
    fn test_jail_lookup() {
        let master = master("master");
        let jail = Jail::new(
            JailConfig::new("jail").master(&master).ext_ipv4("8.8.8.8/24"),
        )
        .unwrap();
        assert!(Rc::ptr_eq(&master.jail("jail").unwrap(), &jail));
        assert!(master.jail("missing").is_none());
    }
}
