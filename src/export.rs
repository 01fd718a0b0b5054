//! Topology export
//!
//! Serializes a validated topology to JSON so external tooling can consume
//! the resolved model without re-running validation.

use crate::error::Result;
use crate::system::jail::Jail;
use crate::system::master::Master;
use serde::Serialize;
use std::rc::Rc;

/// JSON view of a validated master and its jails
#[derive(Debug, Serialize)]
pub struct TopologyExport {
    pub master: MasterExport,
    pub jails: Vec<JailExport>,
}

/// The master's identity and aggregate pool
#[derive(Debug, Serialize)]
pub struct MasterExport {
    pub name: String,
    pub hostname: String,
    pub jail_root: String,
    /// Own addresses plus every attached jail's
    pub ip_pool: Vec<String>,
}

/// One attached jail
#[derive(Debug, Serialize)]
pub struct JailExport {
    pub name: String,
    pub hostname: String,
    pub uid: Option<u32>,
    /// Resolved main address, with prefix
    pub ip: Option<String>,
    pub path: Option<String>,
    pub jail_ip_pool: Vec<String>,
}

impl TopologyExport {
    pub fn from_master(master: &Rc<Master>) -> Self {
        let jails = master
            .jails()
            .values()
            .map(|jail| JailExport::from_jail(jail))
            .collect();
        Self {
            master: MasterExport {
                name: master.name().to_string(),
                hostname: master.hostname().to_string(),
                jail_root: master.jail_root().display().to_string(),
                ip_pool: master.ip_pool().unwrap_or_default(),
            },
            jails,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl JailExport {
    fn from_jail(jail: &Jail) -> Self {
        Self {
            name: jail.name().to_string(),
            hostname: jail.hostname().to_string(),
            uid: jail.uid(),
            ip: jail.ip().map(|ifaddr| ifaddr.to_string()),
            path: jail.path().map(|path| path.display().to_string()),
            jail_ip_pool: jail.jail_ip_pool(),
        }
    }
}
