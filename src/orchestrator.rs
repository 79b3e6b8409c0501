// src/orchestrator.rs

//! Bootstrap orchestration
//!
//! Sequences one bootstrap pass:
//!
//! ```text
//! Fresh -> Detecting -> Provisioning -> ReexecPending -> Done
//!              \
//!               -> AlreadyProvisioned -> Done
//! ```
//!
//! The orchestrator never replaces the process itself. It finishes with an
//! `Outcome` carrying the hand-off, and the binary's entry point performs
//! the re-exec.

use crate::config::{BootstrapConfig, Layout};
use crate::context::HostContext;
use crate::error::Result;
use crate::hooks;
use crate::host::{self, HostProfile};
use crate::packages::RetryPolicy;
use crate::provision::{Interpreter, ProvisionKind, Provisioner};
use crate::reexec::Handoff;
use crate::runner::CommandRunner;
use std::ffi::OsString;
use std::fmt;
use tracing::{debug, info};

/// Orchestrator states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Fresh,
    Detecting,
    AlreadyProvisioned,
    Provisioning,
    ReexecPending,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Fresh => "fresh",
            Phase::Detecting => "detecting",
            Phase::AlreadyProvisioned => "already-provisioned",
            Phase::Provisioning => "provisioning",
            Phase::ReexecPending => "reexec-pending",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Terminal result of a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Dependencies were installed in this process; restart to see them
    RestartRequired {
        interpreter: Interpreter,
        handoff: Option<Handoff>,
    },
    /// Sentinel found, existing environment activated
    AlreadyProvisioned {
        interpreter: Interpreter,
        handoff: Option<Handoff>,
    },
    /// No wheelhouse shipped with the unit
    NothingToProvision { handoff: Option<Handoff> },
}

impl Outcome {
    /// What the entry point should exec into, if a command was given
    pub fn handoff(&self) -> Option<&Handoff> {
        match self {
            Outcome::RestartRequired { handoff, .. }
            | Outcome::AlreadyProvisioned { handoff, .. }
            | Outcome::NothingToProvision { handoff } => handoff.as_ref(),
        }
    }
}

/// Drives the bootstrap state machine
pub struct Orchestrator<'a> {
    layout: Layout,
    config: BootstrapConfig,
    runner: &'a dyn CommandRunner,
    retry: RetryPolicy,
    phase: Phase,
    profile: Option<HostProfile>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(layout: Layout, config: BootstrapConfig, runner: &'a dyn CommandRunner) -> Self {
        Self {
            layout,
            config,
            runner,
            retry: RetryPolicy::default(),
            phase: Phase::Fresh,
            profile: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Host profile, once detection ran
    pub fn profile(&self) -> Option<&HostProfile> {
        self.profile.as_ref()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    fn transition(&mut self, next: Phase) {
        debug!("Bootstrap phase {} -> {}", self.phase, next);
        self.phase = next;
    }

    /// Run the pass and return the hand-off for `command`
    ///
    /// Any error leaves the orchestrator in the phase where it failed; the
    /// sentinel is only written by a completed provisioning step.
    pub fn run(&mut self, mut ctx: HostContext, command: &[OsString]) -> Result<Outcome> {
        // Hooks run before any package or network access
        hooks::run_preinstall_hooks(&ctx, &self.layout.hooks_dir(), self.runner)?;
        ctx.append_path(self.layout.helper_bin());
        self.transition(Phase::Detecting);

        let layout = self.layout.clone();
        let provisioner = Provisioner::new(&layout, self.runner, self.retry);

        if provisioner.state().is_bootstrapped() {
            provisioner.activate(&mut ctx, &self.config);
            let interpreter = provisioner.interpreter_for(&self.config);
            let handoff = Handoff::new(&interpreter, command, &ctx);
            self.transition(Phase::AlreadyProvisioned);
            self.transition(Phase::Done);
            info!("Already bootstrapped, activating existing environment");
            return Ok(Outcome::AlreadyProvisioned {
                interpreter,
                handoff,
            });
        }

        let profile = host::detect_host(&layout.root)?;
        self.profile = Some(profile.clone());

        self.transition(Phase::Provisioning);
        let provisioned = provisioner.provision(&mut ctx, &self.config, &profile)?;

        let handoff = Handoff::new(&provisioned.interpreter, command, &ctx);
        match provisioned.kind {
            ProvisionKind::Installed => {
                self.transition(Phase::ReexecPending);
                info!("Bootstrap complete, restart required");
                Ok(Outcome::RestartRequired {
                    interpreter: provisioned.interpreter,
                    handoff,
                })
            }
            // Sentinel appeared between the check above and provisioning
            ProvisionKind::AlreadyBootstrapped => {
                self.transition(Phase::Done);
                Ok(Outcome::AlreadyProvisioned {
                    interpreter: provisioned.interpreter,
                    handoff,
                })
            }
            ProvisionKind::NoWheelhouse => {
                self.transition(Phase::Done);
                info!("Nothing to bootstrap");
                Ok(Outcome::NothingToProvision { handoff })
            }
        }
    }
}
