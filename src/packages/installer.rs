// src/packages/installer.rs

//! System package installation with retry support

use super::{for_family, PackageManager};
use crate::context::HostContext;
use crate::error::{Error, Result};
use crate::host::HostProfile;
use crate::runner::{CommandRunner, CommandSpec};
use std::ffi::OsString;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Maximum install attempts before giving up
pub const MAX_ATTEMPTS: u32 = 3;

/// Fixed delay between install attempts
pub const RETRY_DELAY: Duration = Duration::from_secs(5);

const FRONTEND_VAR: &str = "DEBIAN_FRONTEND";

/// How often and how patiently to retry a failing package manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            delay: RETRY_DELAY,
        }
    }
}

/// Outcome of one package manager invocation, logged and dropped
#[derive(Debug)]
struct InstallAttempt<'a> {
    command: &'a CommandSpec,
    attempt: u32,
    outcome: std::result::Result<(), String>,
}

/// Installs system packages through the host's package manager
pub struct PackageInstaller<'a> {
    manager: Box<dyn PackageManager>,
    runner: &'a dyn CommandRunner,
    policy: RetryPolicy,
}

impl<'a> PackageInstaller<'a> {
    /// Create an installer for the detected host
    pub fn new(
        profile: &HostProfile,
        runner: &'a dyn CommandRunner,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            manager: for_family(profile.family),
            runner,
            policy,
        }
    }

    /// Packages the host needs before the wheelhouse can be installed
    pub fn baseline_packages(&self) -> Vec<String> {
        self.manager
            .baseline_packages()
            .iter()
            .map(|p| p.to_string())
            .collect()
    }

    /// Install `packages` in one package manager invocation
    ///
    /// Accepts a single name or any list of names. Failed attempts are
    /// retried after a fixed delay; only the last failure is returned.
    pub fn install_packages<I, S>(&self, ctx: &HostContext, packages: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let packages: Vec<String> = packages.into_iter().map(Into::into).collect();
        if packages.is_empty() {
            return Ok(());
        }

        let mut env = ctx.child_env();
        // Never override an operator-supplied frontend
        env.entry(OsString::from(FRONTEND_VAR))
            .or_insert_with(|| OsString::from("noninteractive"));

        let command = self.manager.install_command(&packages, env);
        info!("Installing packages: {}", packages.join(" "));

        let mut attempt = 0;
        loop {
            attempt += 1;
            let record = InstallAttempt {
                command: &command,
                attempt,
                outcome: match self.runner.run(&command) {
                    Ok(status) if status.success() => Ok(()),
                    Ok(status) => Err(format!("exit status {}", status.code_or_signal())),
                    Err(e) => Err(e.to_string()),
                },
            };
            debug!("{:?}", record);

            match record.outcome {
                Ok(()) => return Ok(()),
                Err(reason) => {
                    if record.attempt >= self.policy.max_attempts {
                        return Err(Error::InstallFailed {
                            command: format!("{} ({})", record.command.display(), reason),
                            attempts: record.attempt,
                        });
                    }
                    warn!(
                        "Install attempt {} of {} failed: {}, retrying in {}s...",
                        record.attempt,
                        self.policy.max_attempts,
                        reason,
                        self.policy.delay.as_secs()
                    );
                    self.runner.sleep(self.policy.delay);
                }
            }
        }
    }
}
