// src/provision/mod.rs

//! Environment provisioning from the local wheelhouse
//!
//! This module drives one provisioning pass:
//! - Short-circuits when the sentinel already exists
//! - Installs baseline and declared system packages
//! - Creates the isolated environment when configured
//! - Upgrades pip from the wheelhouse, then installs every cached archive
//! - Writes the sentinel only after all of the above succeeded

pub mod guard;
pub mod venv;

use crate::config::{BootstrapConfig, Layout};
use crate::context::HostContext;
use crate::error::{Error, Result};
use crate::host::HostProfile;
use crate::packages::{PackageInstaller, RetryPolicy};
use crate::runner::{CommandRunner, CommandSpec};
use crate::state::{BootstrapState, SentinelRecord};
use guard::{BinaryBackup, ResolutionOverride};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// pip used when no isolated environment is configured
const SYSTEM_PIP: &str = "pip3";

/// Interpreter the hand-off should run under
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interpreter {
    /// Whatever the hand-off program's own shebang selects
    System,
    /// Python inside the isolated environment
    Isolated(PathBuf),
}

/// What a provisioning call actually did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionKind {
    /// Sentinel was present, nothing installed
    AlreadyBootstrapped,
    /// Full pass completed and the sentinel was written
    Installed,
    /// No wheelhouse shipped with the unit, nothing to install
    NoWheelhouse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    pub interpreter: Interpreter,
    pub kind: ProvisionKind,
}

/// Runs the provisioning steps against a unit layout
pub struct Provisioner<'a> {
    layout: &'a Layout,
    runner: &'a dyn CommandRunner,
    retry: RetryPolicy,
}

impl<'a> Provisioner<'a> {
    pub fn new(layout: &'a Layout, runner: &'a dyn CommandRunner, retry: RetryPolicy) -> Self {
        Self {
            layout,
            runner,
            retry,
        }
    }

    pub fn state(&self) -> BootstrapState {
        BootstrapState::new(self.layout.sentinel())
    }

    /// Interpreter for an already provisioned unit
    pub fn interpreter_for(&self, config: &BootstrapConfig) -> Interpreter {
        if config.use_isolated_env {
            Interpreter::Isolated(self.layout.venv_python())
        } else {
            Interpreter::System
        }
    }

    /// Put the isolated environment first on the search path
    pub fn activate(&self, ctx: &mut HostContext, config: &BootstrapConfig) {
        if config.use_isolated_env && ctx.search_path.first() != Some(&self.layout.venv_bin()) {
            ctx.prepend_path(self.layout.venv_bin());
        }
    }

    /// Provision the unit, or return the existing interpreter if already done
    pub fn provision(
        &self,
        ctx: &mut HostContext,
        config: &BootstrapConfig,
        profile: &HostProfile,
    ) -> Result<Provisioned> {
        let state = self.state();
        if state.is_bootstrapped() {
            debug!("Sentinel {} present, skipping install", state.sentinel().display());
            self.activate(ctx, config);
            return Ok(Provisioned {
                interpreter: self.interpreter_for(config),
                kind: ProvisionKind::AlreadyBootstrapped,
            });
        }

        if !self.layout.wheelhouse.is_dir() {
            info!(
                "No wheelhouse at {}, nothing to provision",
                self.layout.wheelhouse.display()
            );
            return Ok(Provisioned {
                interpreter: Interpreter::System,
                kind: ProvisionKind::NoWheelhouse,
            });
        }

        info!(
            "Bootstrapping {} from {}",
            profile.codename,
            self.layout.wheelhouse.display()
        );

        let resolution =
            ResolutionOverride::install(&self.layout.resolution_override, &self.layout.wheelhouse)
                .map_err(|e| incomplete("writing resolution override", e))?;

        let installer = PackageInstaller::new(profile, self.runner, self.retry);
        installer.install_packages(ctx, installer.baseline_packages())?;
        installer.install_packages(ctx, config.packages.iter().cloned())?;

        let (pip, backup) = if config.use_isolated_env {
            self.ensure_venv(ctx, config, profile, &installer)?;
            self.activate(ctx, config);
            (self.layout.venv_pip().to_string_lossy().into_owned(), None)
        } else {
            let backup = BinaryBackup::save(&self.layout.system_pip)
                .map_err(|e| incomplete("saving system pip", e))?;
            (SYSTEM_PIP.to_string(), Some(backup))
        };

        self.install_wheelhouse(ctx, &pip)?;

        drop(backup);
        drop(resolution);

        self.state()
            .mark_bootstrapped(&SentinelRecord::new(profile, config.use_isolated_env))
            .map_err(|e| incomplete("writing sentinel", e))?;

        Ok(Provisioned {
            interpreter: self.interpreter_for(config),
            kind: ProvisionKind::Installed,
        })
    }

    /// Create the isolated environment unless it already exists
    fn ensure_venv(
        &self,
        ctx: &HostContext,
        config: &BootstrapConfig,
        profile: &HostProfile,
        installer: &PackageInstaller<'_>,
    ) -> Result<()> {
        let venv_dir = &self.layout.venv_dir;
        if venv_dir.is_dir() {
            debug!("Reusing isolated environment {}", venv_dir.display());
            return Ok(());
        }

        if let Some(package) = venv::tool_package(profile) {
            installer.install_packages(ctx, [package])?;
        }

        let cmd = venv::create_command(profile, venv_dir, config.include_system_packages)
            .with_env(ctx.child_env())
            .in_dir(&ctx.working_dir);
        info!("Creating isolated environment {}", venv_dir.display());
        self.run_step(&cmd)?;

        if !venv_dir.is_dir() {
            return Err(Error::ProvisionIncomplete(format!(
                "{} did not create {}",
                cmd.program,
                venv_dir.display()
            )));
        }
        Ok(())
    }

    /// Upgrade pip from the wheelhouse, then install every cached archive
    ///
    /// An outdated pip reports spurious double requirements, so the
    /// self-upgrade always runs first.
    fn install_wheelhouse(&self, ctx: &HostContext, pip: &str) -> Result<()> {
        let wheelhouse = self.layout.wheelhouse.to_string_lossy().into_owned();
        let base = ["install", "-U", "--no-index", "-f", wheelhouse.as_str()];

        let upgrade = CommandSpec::new(pip, base.iter().copied().chain(["pip"]))
            .with_env(ctx.child_env())
            .in_dir(&self.layout.charm_dir);
        info!("Upgrading pip from {}", wheelhouse);
        self.run_step(&upgrade)?;

        let archives = cached_archives(&self.layout.wheelhouse)
            .map_err(|e| incomplete("listing wheelhouse", e))?;
        if archives.is_empty() {
            info!("Wheelhouse {} holds no archives", wheelhouse);
            return Ok(());
        }

        let install = CommandSpec::new(
            pip,
            base.iter()
                .map(|s| s.to_string())
                .chain(archives.iter().map(|p| p.to_string_lossy().into_owned())),
        )
        .with_env(ctx.child_env())
        .in_dir(&self.layout.charm_dir);
        info!("Installing {} cached archives", archives.len());
        self.run_step(&install)
    }

    /// Run a single-attempt step; any failure is fatal to the pass
    fn run_step(&self, cmd: &CommandSpec) -> Result<()> {
        let status = self
            .runner
            .run(cmd)
            .map_err(|e| incomplete(&cmd.display(), e))?;
        if !status.success() {
            return Err(Error::ProvisionIncomplete(format!(
                "{} exited with status {}",
                cmd.display(),
                status.code_or_signal()
            )));
        }
        Ok(())
    }
}

/// Non-hidden wheelhouse entries in name order
fn cached_archives(wheelhouse: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut archives = Vec::new();
    for entry in fs::read_dir(wheelhouse)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        archives.push(entry.path());
    }
    archives.sort();
    Ok(archives)
}

fn incomplete(step: &str, err: impl std::fmt::Display) -> Error {
    Error::ProvisionIncomplete(format!("{}: {}", step, err))
}
