//! Unified error types for Moorage

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::system::jail::IpRole;

/// Main error type for Moorage operations
///
/// Attachment and main-IP variants reproduce the historical message
/// templates verbatim; tooling matches on them.
#[derive(Error, Debug)]
pub enum Error {
    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // Config errors
    #[error("Failed to read config file '{path}': {source}")]
    ConfigRead { path: PathBuf, source: io::Error },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config validation failed: {0}")]
    ConfigValidation(String),

    // Address errors
    #[error("Invalid IP address literal '{0}'")]
    InvalidAddress(String),

    #[error("IP address {ip} has already been attributed")]
    DuplicateIp { ip: String },

    // Attachment errors
    #[error("Can't attach `{jail}` to `{master}`. `{jail}` is not a jail.")]
    AttachNonJail { master: String, jail: String },

    #[error("Can't attach `{jail}` to `{master}`. `{jail}` is already attached to `{owner}`.")]
    JailAlreadyAttached {
        master: String,
        jail: String,
        /// The master the jail is currently attached to
        owner: String,
    },

    #[error("Can't attach `{jail}` to `{master}`. A jail called `{name}` is already attached to `{master}`.")]
    DuplicateJailName {
        master: String,
        jail: String,
        name: String,
    },

    #[error("Can't attach `{jail}` to `{master}`. A jail with hostname `{hostname}` is already attached to `{master}`.")]
    DuplicateJailHostname {
        master: String,
        jail: String,
        hostname: String,
    },

    #[error("Can't attach `{jail}` to `{master}`. A jail with uid `{uid}` is already attached to `{master}`.")]
    DuplicateJailUid {
        master: String,
        jail: String,
        uid: u32,
    },

    // Jail restriction errors
    #[error("A Jail cannot define its own interfaces")]
    JailOwnInterfaces { jail: String },

    // Main-IP resolution errors
    #[error("Chosen main ip is not allowed")]
    MainIpNotAllowed { jail: String, main_ip: String },

    #[error("Chosen main ip is not defined")]
    MainIpNotDefined { jail: String, main_ip: IpRole },

    #[error("Main ip cannot be determined")]
    MainIpUndetermined { jail: String, defined: Vec<IpRole> },

    // Command interface errors (no executor ships with the model)
    #[error("Can't execute command: `{command}` is not implemented on `{environment}`.")]
    CommandNotImplemented { command: String, environment: String },

    #[error("Can't execute command: `{command}` - can't connect to `{environment}`.")]
    CommandConnection { command: String, environment: String },

    // Export errors
    #[error("Failed to serialize topology: {0}")]
    ExportSerialize(#[from] serde_json::Error),
}

/// Result type alias for Moorage operations
pub type Result<T> = std::result::Result<T, Error>;
