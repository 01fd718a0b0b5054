//! Moorage models the network identity and attachment hierarchy of
//! FreeBSD host/jail topologies.
//!
//! A master system owns named interfaces (external, internal, loopback) and
//! hosts jails. Jails carry their own addresses but run on the master's
//! interfaces, so they may never define interfaces of their own. Attaching
//! a jail enforces global address uniqueness across the master's aggregate
//! pool and per-master name, hostname and uid uniqueness; each jail
//! resolves a single main IP by a fixed role precedence.
//!
//! The whole model is built once, eagerly validated, and then queried;
//! nothing mutates after construction except a master's jail registry,
//! which only grows through `attach`.

pub mod cli;
pub mod error;
pub mod export;
pub mod manifest;
pub mod network;
pub mod system;

pub use error::{Error, Result};
pub use network::{AddrSet, Interface, IpInput};
pub use system::{
    DEFAULT_JAIL_ROOT, Environment, IpRole, Jail, JailConfig, MAIN_IP_PRECEDENCE, Master,
    MasterConfig, System, SystemConfig, SystemRef,
};
