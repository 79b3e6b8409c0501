// src/packages/traits.rs

//! Common traits for native package managers

use crate::runner::CommandSpec;
use std::collections::BTreeMap;
use std::ffi::OsString;

/// Common interface for the host's native package manager (apt, yum)
pub trait PackageManager {
    /// Executable name, e.g. `apt-get`
    fn program(&self) -> &'static str;

    /// Options placed before the package list: non-interactive flags,
    /// the "assume yes" switch and the install verb
    fn install_args(&self) -> Vec<String>;

    /// Packages needed before the wheelhouse can be installed:
    /// pip, setuptools, YAML bindings and interpreter headers
    fn baseline_packages(&self) -> &'static [&'static str];

    /// Build the single install invocation for `packages`
    fn install_command(
        &self,
        packages: &[String],
        env: BTreeMap<OsString, OsString>,
    ) -> CommandSpec {
        let mut args = self.install_args();
        args.extend(packages.iter().cloned());
        CommandSpec::new(self.program(), args).with_env(env)
    }
}
