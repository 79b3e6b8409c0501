// src/reexec.rs

//! Hand-off to the provisioned interpreter
//!
//! Packages installed during this process are not guaranteed to be visible
//! to an interpreter that was already running, so control passes to the
//! hook program by replacing the process image. Arguments and environment
//! travel as raw OS strings and reach exec(2) unchanged.

use crate::context::HostContext;
use crate::error::Error;
use crate::provision::Interpreter;
use nix::unistd::execve;
use std::collections::BTreeMap;
use std::ffi::{CString, NulError, OsStr, OsString};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::info;

/// Program, argument vector and environment to replace this process with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handoff {
    pub program: PathBuf,
    /// Full argv, `argv[0]` included
    pub argv: Vec<OsString>,
    pub env: BTreeMap<OsString, OsString>,
}

impl Handoff {
    /// Build the hand-off for `command` under `interpreter`
    ///
    /// With an isolated interpreter the command becomes the interpreter's
    /// script argument; otherwise it runs as given. Returns `None` for an
    /// empty command.
    pub fn new(
        interpreter: &Interpreter,
        command: &[OsString],
        ctx: &HostContext,
    ) -> Option<Self> {
        let (first, _) = command.split_first()?;
        let env = ctx.child_env();

        Some(match interpreter {
            Interpreter::Isolated(python) => {
                let mut argv = vec![python.as_os_str().to_owned()];
                argv.extend(command.iter().cloned());
                Self {
                    program: python.clone(),
                    argv,
                    env,
                }
            }
            Interpreter::System => Self {
                program: ctx
                    .resolve_program(first)
                    .unwrap_or_else(|| PathBuf::from(first)),
                argv: command.to_vec(),
                env,
            },
        })
    }

    /// Value of `key` in the hand-off environment
    pub fn env_var(&self, key: &str) -> Option<&OsStr> {
        self.env.get(OsStr::new(key)).map(OsString::as_os_str)
    }

    /// exec(2) arguments: program path, argv and `KEY=VALUE` environment
    fn exec_args(&self) -> Result<(CString, Vec<CString>, Vec<CString>), NulError> {
        let path = CString::new(self.program.as_os_str().as_bytes())?;
        let argv = self
            .argv
            .iter()
            .map(|arg| CString::new(arg.as_bytes()))
            .collect::<Result<Vec<_>, NulError>>()?;
        let envp = self
            .env
            .iter()
            .map(|(key, value)| {
                let mut entry = Vec::with_capacity(key.len() + value.len() + 1);
                entry.extend_from_slice(key.as_bytes());
                entry.push(b'=');
                entry.extend_from_slice(value.as_bytes());
                CString::new(entry)
            })
            .collect::<Result<Vec<_>, NulError>>()?;
        Ok((path, argv, envp))
    }
}

/// Replace the current process with `handoff`
///
/// Only returns on failure.
pub fn reexec_into(handoff: &Handoff) -> Error {
    let program = handoff.program.display().to_string();
    let failed = |reason: String| Error::ReexecFailed {
        program: program.clone(),
        reason,
    };

    if let Err(reason) = check_executable(&handoff.program) {
        return failed(reason);
    }

    let (path, argv, envp) = match handoff.exec_args() {
        Ok(args) => args,
        Err(e) => return failed(e.to_string()),
    };

    info!("Re-executing into {}", program);
    match execve(&path, &argv, &envp) {
        Ok(never) => match never {},
        Err(errno) => failed(errno.desc().to_string()),
    }
}

fn check_executable(path: &Path) -> Result<(), String> {
    let metadata = std::fs::metadata(path).map_err(|_| "No such file or directory".to_string())?;
    if !metadata.is_file() || metadata.permissions().mode() & 0o111 == 0 {
        return Err("Permission denied".to_string());
    }
    Ok(())
}
