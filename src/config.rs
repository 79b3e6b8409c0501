// src/config.rs

//! Unit configuration and filesystem layout
//!
//! `BootstrapConfig` is read once from the `basic` options of the unit's
//! `layer.yaml`. `Layout` names every path the bootstrap pass touches.

use crate::context::HostContext;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the sentinel file inside the wheelhouse
pub const SENTINEL_NAME: &str = ".bootstrapped";

/// Typed bootstrap options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapConfig {
    /// Extra system packages, installed in declaration order
    pub packages: Vec<String>,
    /// Install the wheelhouse into a virtualenv instead of the system
    pub use_isolated_env: bool,
    /// Let the virtualenv see system site-packages
    pub include_system_packages: bool,
}

#[derive(Debug, Default, Deserialize)]
struct LayerYaml {
    #[serde(default)]
    options: LayerOptions,
}

#[derive(Debug, Default, Deserialize)]
struct LayerOptions {
    #[serde(default)]
    basic: BasicOptions,
}

#[derive(Debug, Default, Deserialize)]
struct BasicOptions {
    #[serde(default)]
    packages: PackageList,
    #[serde(default)]
    use_venv: bool,
    #[serde(default)]
    include_system_packages: bool,
}

/// `packages:` may be written as a single name or a list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PackageList {
    One(String),
    Many(Vec<String>),
}

impl Default for PackageList {
    fn default() -> Self {
        PackageList::Many(Vec::new())
    }
}

impl BootstrapConfig {
    /// Parse the `options.basic` section of a layer.yaml document
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        // A document holding only `~` is null
        let layer: Option<LayerYaml> = serde_yaml::from_str(content)?;
        let basic = layer.unwrap_or_default().options.basic;

        let packages = match basic.packages {
            PackageList::One(name) => vec![name],
            PackageList::Many(names) => names,
        };

        let config = Self {
            packages,
            use_isolated_env: basic.use_venv,
            include_system_packages: basic.include_system_packages,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No {} found, using default bootstrap options", path.display());
            return Ok(Self::default());
        }
        Self::from_yaml(&fs::read_to_string(path)?)
    }

    fn validate(&self) -> Result<()> {
        for name in &self.packages {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(Error::ConfigError("empty package name".to_string()));
            }
            if trimmed.starts_with('-') || trimmed.contains(char::is_whitespace) {
                return Err(Error::ConfigError(format!("invalid package name: {:?}", name)));
            }
        }
        Ok(())
    }
}

/// Every location the bootstrap pass reads or writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Unit root (`$JUJU_CHARM_DIR`)
    pub charm_dir: PathBuf,
    /// Local package cache
    pub wheelhouse: PathBuf,
    /// Isolated environment directory
    pub venv_dir: PathBuf,
    /// Filesystem root for release file detection
    pub root: PathBuf,
    /// Transient easy_install override pinning installs to the wheelhouse
    pub resolution_override: PathBuf,
    /// System pip binary protected from the pip self-upgrade
    pub system_pip: PathBuf,
}

impl Layout {
    /// Default layout for a unit rooted at `charm_dir`
    ///
    /// The virtualenv lives next to the working directory (`../.venv`).
    pub fn new(charm_dir: impl Into<PathBuf>, ctx: &HostContext) -> Self {
        let charm_dir = charm_dir.into();
        let home = ctx
            .var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/root"));
        let venv_parent = ctx
            .working_dir
            .parent()
            .unwrap_or(&ctx.working_dir)
            .to_path_buf();

        Self {
            wheelhouse: charm_dir.join("wheelhouse"),
            charm_dir,
            venv_dir: venv_parent.join(".venv"),
            root: PathBuf::from("/"),
            resolution_override: home.join(".pydistutils.cfg"),
            system_pip: PathBuf::from("/usr/bin/pip"),
        }
    }

    pub fn sentinel(&self) -> PathBuf {
        self.wheelhouse.join(SENTINEL_NAME)
    }

    pub fn layer_config(&self) -> PathBuf {
        self.charm_dir.join("layer.yaml")
    }

    pub fn hooks_dir(&self) -> PathBuf {
        self.charm_dir.join("exec.d")
    }

    /// Unit-local helper scripts, appended to the search path
    pub fn helper_bin(&self) -> PathBuf {
        self.charm_dir.join("bin")
    }

    pub fn venv_bin(&self) -> PathBuf {
        self.venv_dir.join("bin")
    }

    pub fn venv_python(&self) -> PathBuf {
        self.venv_bin().join("python")
    }

    pub fn venv_pip(&self) -> PathBuf {
        self.venv_bin().join("pip")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_full_layer_yaml() {
        let config = BootstrapConfig::from_yaml(
            "includes: ['layer:basic']\noptions:\n  basic:\n    packages: [foo, bar]\n    use_venv: true\n    include_system_packages: true\n",
        )
        .unwrap();

        assert_eq!(config.packages, vec!["foo", "bar"]);
        assert!(config.use_isolated_env);
        assert!(config.include_system_packages);
    }

    #[test]
    fn test_defaults() {
        let config = BootstrapConfig::from_yaml("options:\n  other: {}\n").unwrap();
        assert_eq!(config, BootstrapConfig::default());

        assert_eq!(BootstrapConfig::from_yaml("").unwrap(), BootstrapConfig::default());
    }

    #[test]
    fn test_single_package_string() {
        let config =
            BootstrapConfig::from_yaml("options:\n  basic:\n    packages: git\n").unwrap();
        assert_eq!(config.packages, vec!["git"]);
    }

    #[test]
    fn test_rejects_flag_like_package() {
        let result = BootstrapConfig::from_yaml("options:\n  basic:\n    packages: ['--purge']\n");
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_rejects_wrong_type() {
        let result = BootstrapConfig::from_yaml("options:\n  basic:\n    use_venv: [1, 2]\n");
        assert!(matches!(result, Err(Error::Yaml(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = BootstrapConfig::load(&dir.path().join("layer.yaml")).unwrap();
        assert_eq!(config, BootstrapConfig::default());
    }

    #[test]
    fn test_layout_paths() {
        let mut env = BTreeMap::new();
        env.insert("HOME".to_string(), "/home/ubuntu".to_string());
        let ctx = HostContext::new(env, PathBuf::from("/var/lib/juju/agents/unit-a-0/charm"));
        let layout = Layout::new("/var/lib/juju/agents/unit-a-0/charm", &ctx);

        assert_eq!(
            layout.sentinel(),
            PathBuf::from("/var/lib/juju/agents/unit-a-0/charm/wheelhouse/.bootstrapped")
        );
        assert_eq!(layout.venv_dir, PathBuf::from("/var/lib/juju/agents/unit-a-0/.venv"));
        assert_eq!(
            layout.venv_python(),
            PathBuf::from("/var/lib/juju/agents/unit-a-0/.venv/bin/python")
        );
        assert_eq!(
            layout.resolution_override,
            PathBuf::from("/home/ubuntu/.pydistutils.cfg")
        );
    }
}
