// src/packages/yum.rs

//! yum support for RedHat-family hosts

use super::traits::PackageManager;

#[derive(Debug, Default, Clone, Copy)]
pub struct Yum;

impl PackageManager for Yum {
    fn program(&self) -> &'static str {
        "yum"
    }

    fn install_args(&self) -> Vec<String> {
        vec!["--assumeyes".to_string(), "install".to_string()]
    }

    fn baseline_packages(&self) -> &'static [&'static str] {
        &["python3-pip", "python3-setuptools", "python3-PyYAML", "python3-devel"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_yum_install_command() {
        let cmd = Yum.install_command(&["foo".to_string()], BTreeMap::new());
        assert_eq!(cmd.display(), "yum --assumeyes install foo");
    }
}
