// src/provision/venv.rs

//! Isolated environment tooling per host family

use crate::host::{HostFamily, HostProfile};
use crate::runner::CommandSpec;
use std::path::Path;

/// Ubuntu releases that only ship virtualenv as `python-virtualenv`
const LEGACY_VIRTUALENV_SERIES: &[&str] = &["precise", "trusty"];

/// System package providing the isolation tool, if one is needed
pub fn tool_package(profile: &HostProfile) -> Option<&'static str> {
    match profile.family {
        HostFamily::DebianLike if LEGACY_VIRTUALENV_SERIES.contains(&profile.codename.as_str()) => {
            Some("python-virtualenv")
        }
        HostFamily::DebianLike => Some("virtualenv"),
        // python3 ships the venv module
        HostFamily::RedhatLike => None,
    }
}

/// Command creating the isolated environment at `venv_dir`
pub fn create_command(
    profile: &HostProfile,
    venv_dir: &Path,
    include_system_packages: bool,
) -> CommandSpec {
    let venv = venv_dir.to_string_lossy().into_owned();
    let mut cmd = match profile.family {
        HostFamily::DebianLike => CommandSpec::new(
            "virtualenv",
            ["-ppython3".to_string(), "--never-download".to_string(), venv],
        ),
        HostFamily::RedhatLike => {
            CommandSpec::new("python3", ["-m".to_string(), "venv".to_string(), venv])
        }
    };
    if include_system_packages {
        cmd.args.push("--system-site-packages".to_string());
    }
    cmd
}
