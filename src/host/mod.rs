// src/host/mod.rs

//! Host distribution detection
//!
//! Identifies the OS family and release from the well-known release files.
//! Detection runs once per process and the resulting `HostProfile` drives
//! every later decision (package manager, virtualenv tool).

pub mod release;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Debian-family release file, relative to the filesystem root
pub const LSB_RELEASE: &str = "etc/lsb-release";

/// RedHat-family release file, relative to the filesystem root
pub const REDHAT_RELEASE: &str = "etc/redhat-release";

/// Generic release file consulted only to infer the family
pub const OS_RELEASE: &str = "etc/os-release";

/// Supported distribution families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostFamily {
    /// Ubuntu, Debian and derivatives (apt)
    DebianLike,
    /// CentOS, RHEL and derivatives (yum)
    RedhatLike,
}

impl fmt::Display for HostFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostFamily::DebianLike => write!(f, "debian-like"),
            HostFamily::RedhatLike => write!(f, "redhat-like"),
        }
    }
}

/// Identity of the host OS
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostProfile {
    pub family: HostFamily,
    /// Distribution id, e.g. `Ubuntu`, `CentOS`
    pub release_id: String,
    /// Release version, e.g. `16.04`, `7.3.1611`; empty when unknown
    pub release: String,
    /// e.g. `xenial`, `CentOS7.3.1611`
    pub codename: String,
    pub description: String,
}

/// Detect the host profile from release files under `root`
///
/// `root` is `/` in production; tests point it at a fixture tree.
pub fn detect_host(root: &Path) -> Result<HostProfile> {
    let lsb = root.join(LSB_RELEASE);
    if lsb.is_file() {
        debug!("Reading {}", lsb.display());
        let profile = release::parse_lsb_release(&fs::read_to_string(&lsb)?);
        info!(
            "Detected {} host {} ({})",
            profile.family, profile.release_id, profile.codename
        );
        return Ok(profile);
    }

    let redhat = root.join(REDHAT_RELEASE);
    if redhat.is_file() {
        debug!("Reading {}", redhat.display());
        let content = fs::read_to_string(&redhat)?;
        let profile = release::parse_redhat_release(&content).ok_or_else(|| {
            Error::DetectionAmbiguous(format!(
                "unrecognised {}: {:?}",
                redhat.display(),
                content.trim()
            ))
        })?;
        info!(
            "Detected {} host {} ({})",
            profile.family, profile.release_id, profile.codename
        );
        return Ok(profile);
    }

    let os_release = root.join(OS_RELEASE);
    if os_release.is_file() && release::os_release_is_redhat(&fs::read_to_string(&os_release)?) {
        info!("No {} present, assuming default CentOS profile", redhat.display());
        return Ok(release::centos_fallback());
    }

    Err(Error::DetectionAmbiguous(format!(
        "neither {} nor {} found",
        lsb.display(),
        redhat.display()
    )))
}
