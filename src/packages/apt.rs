// src/packages/apt.rs

//! apt-get support for Debian-family hosts

use super::traits::PackageManager;

/// apt-get with the options that are easy to forget but should always be set
#[derive(Debug, Default, Clone, Copy)]
pub struct Apt;

impl PackageManager for Apt {
    fn program(&self) -> &'static str {
        "apt-get"
    }

    fn install_args(&self) -> Vec<String> {
        vec![
            // Keep operator-edited config files on upgrade
            "--option=Dpkg::Options::=--force-confold".to_string(),
            "--assume-yes".to_string(),
            "install".to_string(),
        ]
    }

    fn baseline_packages(&self) -> &'static [&'static str] {
        &["python3-pip", "python3-setuptools", "python3-yaml", "python3-dev"]
    }
}
