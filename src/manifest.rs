//! Topology manifest parsing for Moorage
//!
//! Parses `moorage.toml` manifests using serde: one `[master]` table plus
//! any number of `[[jails]]` entries. `build` turns a parsed manifest into
//! the validated model, surfacing every attachment and address error.

use crate::error::{Error, Result};
use crate::system::jail::{Jail, JailConfig};
use crate::system::master::{Master, MasterConfig};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Load a topology manifest from a file
pub fn load(path: &Path) -> Result<TopologyConfig> {
    let content = fs::read_to_string(path).map_err(|e| Error::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config: TopologyConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Root manifest structure
#[derive(Debug, Deserialize)]
pub struct TopologyConfig {
    /// The host that will carry the jails
    pub master: MasterDef,

    /// Jail definitions, attached in file order
    #[serde(default)]
    pub jails: Vec<JailDef>,
}

impl TopologyConfig {
    /// Construct the validated model: the master plus every jail, attached
    /// in file order
    pub fn build(&self) -> Result<Rc<Master>> {
        let master = Master::new(self.master.to_config())?;
        for jail in &self.jails {
            Jail::new(jail.to_config(&master))?;
        }
        Ok(master)
    }
}

/// One address literal or a list of them
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "OneOrMany")]
pub struct AddrList(pub Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for AddrList {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(literal) => AddrList(vec![literal]),
            OneOrMany::Many(literals) => AddrList(literals),
        }
    }
}

/// Master definition
#[derive(Debug, Deserialize)]
pub struct MasterDef {
    pub name: String,
    pub hostname: Option<String>,

    pub ext_if: Option<String>,
    pub int_if: Option<String>,
    pub lo_if: Option<String>,

    #[serde(default)]
    pub ext_ipv4: AddrList,
    #[serde(default)]
    pub ext_ipv6: AddrList,
    #[serde(default)]
    pub int_ipv4: AddrList,
    #[serde(default)]
    pub int_ipv6: AddrList,
    #[serde(default)]
    pub lo_ipv4: AddrList,
    #[serde(default)]
    pub lo_ipv6: AddrList,

    /// Directory under which jail roots live (default /usr/jails)
    pub jail_root: Option<PathBuf>,
}

impl MasterDef {
    fn to_config(&self) -> MasterConfig {
        let mut config = MasterConfig::new(self.name.as_str());
        if let Some(hostname) = &self.hostname {
            config = config.hostname(hostname.as_str());
        }
        if let Some(name) = &self.ext_if {
            config = config.ext_if(name.as_str());
        }
        if let Some(name) = &self.int_if {
            config = config.int_if(name.as_str());
        }
        if let Some(name) = &self.lo_if {
            config = config.lo_if(name.as_str());
        }
        if let Some(root) = &self.jail_root {
            config = config.jail_root_path(root.clone());
        }
        config
            .ext_ipv4(self.ext_ipv4.0.clone())
            .ext_ipv6(self.ext_ipv6.0.clone())
            .int_ipv4(self.int_ipv4.0.clone())
            .int_ipv6(self.int_ipv6.0.clone())
            .lo_ipv4(self.lo_ipv4.0.clone())
            .lo_ipv6(self.lo_ipv6.0.clone())
    }
}

/// Jail definition
///
/// Interface names are accepted by the parser so that the model can reject
/// them with its own error instead of a generic deserialization failure.
#[derive(Debug, Deserialize)]
pub struct JailDef {
    pub name: String,
    pub hostname: Option<String>,
    pub uid: Option<u32>,

    pub ext_if: Option<String>,
    pub int_if: Option<String>,
    pub lo_if: Option<String>,

    #[serde(default)]
    pub ext_ipv4: AddrList,
    #[serde(default)]
    pub ext_ipv6: AddrList,
    #[serde(default)]
    pub int_ipv4: AddrList,
    #[serde(default)]
    pub int_ipv6: AddrList,
    #[serde(default)]
    pub lo_ipv4: AddrList,
    #[serde(default)]
    pub lo_ipv6: AddrList,

    /// Role whose address becomes the jail's main IP
    pub main_ip: Option<String>,
}

impl JailDef {
    fn to_config(&self, master: &Rc<Master>) -> JailConfig {
        let mut config = JailConfig::new(self.name.as_str()).master(master);
        if let Some(hostname) = &self.hostname {
            config = config.hostname(hostname.as_str());
        }
        if let Some(name) = &self.ext_if {
            config = config.ext_if(name.as_str());
        }
        if let Some(name) = &self.int_if {
            config = config.int_if(name.as_str());
        }
        if let Some(name) = &self.lo_if {
            config = config.lo_if(name.as_str());
        }
        if let Some(uid) = self.uid {
            config = config.uid(uid);
        }
        if let Some(main_ip) = &self.main_ip {
            config = config.main_ip(main_ip.as_str());
        }
        config
            .ext_ipv4(self.ext_ipv4.0.clone())
            .ext_ipv6(self.ext_ipv6.0.clone())
            .int_ipv4(self.int_ipv4.0.clone())
            .int_ipv6(self.int_ipv6.0.clone())
            .lo_ipv4(self.lo_ipv4.0.clone())
            .lo_ipv6(self.lo_ipv6.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MANIFEST: &str = r#"
[master]
name = "sencha"
hostname = "sencha.example.org"
ext_if = "re0"
ext_ipv4 = "9.9.9.9/24"
lo_if = "lo0"
lo_ipv4 = "127.0.0.1/8"

[[jails]]
name = "wiki"
uid = 101
ext_ipv4 = ["10.0.1.2/24", "10.0.1.3/24"]
main_ip = "ext_ipv4"

[[jails]]
name = "mail"
uid = 102
int_ipv6 = "2a:2a::2a"
"#;

    #[test]
    fn test_parse_and_build() {
        let config: TopologyConfig = toml::from_str(MANIFEST).unwrap();
        let master = config.build().unwrap();

        assert_eq!(master.name(), "sencha");
        assert_eq!(master.hostname(), "sencha.example.org");
        assert_eq!(master.ext_if().unwrap().name(), "re0");
        assert_eq!(master.jails().len(), 2);

        let wiki = master.jail("wiki").unwrap();
        assert_eq!(wiki.uid(), Some(101));
        assert_eq!(wiki.ip().unwrap().addr().to_string(), "10.0.1.2");
        assert_eq!(
            wiki.jail_ip_pool(),
            vec!["10.0.1.2".to_string(), "10.0.1.3".to_string()]
        );

        let mail = master.jail("mail").unwrap();
        assert_eq!(mail.ip().unwrap().addr().to_string(), "2a:2a::2a");
    }

    #[test]
    fn test_single_literal_and_list_forms() {
        let config: TopologyConfig = toml::from_str(MANIFEST).unwrap();
        assert_eq!(config.master.ext_ipv4.0, vec!["9.9.9.9/24"]);
        assert_eq!(
            config.jails[0].ext_ipv4.0,
            vec!["10.0.1.2/24", "10.0.1.3/24"]
        );
    }

    #[test]
    fn test_duplicate_ip_surfaces() {
        let manifest = r#"
[master]
name = "sencha"
ext_ipv4 = "9.9.9.9"

[[jails]]
name = "wiki"
ext_ipv4 = "9.9.9.9/24"
"#;
        let config: TopologyConfig = toml::from_str(manifest).unwrap();
        let err = config.build().unwrap_err();
        assert_eq!(
            err.to_string(),
            "IP address 9.9.9.9 has already been attributed"
        );
    }

    #[test]
    fn test_jail_interface_name_rejected() {
        let manifest = r#"
[master]
name = "sencha"

[[jails]]
name = "wiki"
ext_if = "re0"
ext_ipv4 = "10.0.1.2/24"
"#;
        let config: TopologyConfig = toml::from_str(manifest).unwrap();
        let err = config.build().unwrap_err();
        assert_eq!(err.to_string(), "A Jail cannot define its own interfaces");
    }

    #[test]
    fn test_jail_root_override() {
        let manifest = r#"
[master]
name = "sencha"
jail_root = "/usr/local/ezjail"
"#;
        let config: TopologyConfig = toml::from_str(manifest).unwrap();
        let master = config.build().unwrap();
        assert_eq!(master.jail_root(), Path::new("/usr/local/ezjail"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MANIFEST.as_bytes()).unwrap();

        let config = load(file.path()).unwrap();
        assert_eq!(config.jails.len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load(Path::new("/nonexistent/moorage.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }

    #[test]
    fn test_parse_rejects_unknown_syntax() {
        assert!(toml::from_str::<TopologyConfig>("not toml at all").is_err());
    }
}
