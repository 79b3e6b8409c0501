// src/hooks.rs

//! Operator pre-install hooks
//!
//! Sites drop executables at `exec.d/<name>/charm-pre-install` to do bespoke
//! setup (proxies, secrets, mirrors) before anything touches the network or
//! the package manager.

use crate::context::HostContext;
use crate::error::{Error, Result};
use crate::runner::{CommandRunner, CommandSpec};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name looked up in each exec.d subdirectory
pub const PRE_INSTALL_HOOK: &str = "charm-pre-install";

/// Executable pre-install hooks under `hooks_dir`, in directory name order
pub fn discover(hooks_dir: &Path) -> Result<Vec<PathBuf>> {
    if !hooks_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut dirs: Vec<PathBuf> = fs::read_dir(hooks_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();

    Ok(dirs
        .into_iter()
        .map(|dir| dir.join(PRE_INSTALL_HOOK))
        .filter(|hook| is_executable(hook))
        .collect())
}

/// Run every pre-install hook; the first failure aborts
///
/// Each hook runs from its own directory with the context environment.
/// Returns the number of hooks run.
pub fn run_preinstall_hooks(
    ctx: &HostContext,
    hooks_dir: &Path,
    runner: &dyn CommandRunner,
) -> Result<usize> {
    let hooks = discover(hooks_dir)?;
    if hooks.is_empty() {
        debug!("No pre-install hooks under {}", hooks_dir.display());
        return Ok(0);
    }

    for hook in &hooks {
        let hook_name = hook.display().to_string();
        info!("Running pre-install hook {}", hook_name);

        let mut cmd =
            CommandSpec::new(hook_name.clone(), Vec::<String>::new()).with_env(ctx.child_env());
        if let Some(dir) = hook.parent() {
            cmd = cmd.in_dir(dir);
        }

        let status = runner.run(&cmd)?;
        if !status.success() {
            return Err(Error::HookFailed {
                hook: hook_name,
                status: status.code_or_signal(),
            });
        }
    }

    Ok(hooks.len())
}

fn is_executable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::testing::RecordingRunner;
    use std::collections::BTreeMap;

    fn write_hook(root: &Path, name: &str, mode: u32) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        let hook = dir.join(PRE_INSTALL_HOOK);
        fs::write(&hook, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&hook, fs::Permissions::from_mode(mode)).unwrap();
        hook
    }

    fn ctx() -> HostContext {
        HostContext::new(BTreeMap::<String, String>::new(), PathBuf::from("/"))
    }

    #[test]
    fn test_missing_exec_d_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::default();
        let ran = run_preinstall_hooks(&ctx(), &dir.path().join("exec.d"), &runner).unwrap();
        assert_eq!(ran, 0);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_hooks_run_in_order_from_their_dir() {
        let dir = tempfile::tempdir().unwrap();
        let second = write_hook(dir.path(), "20-proxy", 0o755);
        let first = write_hook(dir.path(), "10-secrets", 0o755);
        write_hook(dir.path(), "30-disabled", 0o644);
        fs::create_dir_all(dir.path().join("40-empty")).unwrap();

        let runner = RecordingRunner::default();
        let ran = run_preinstall_hooks(&ctx(), dir.path(), &runner).unwrap();

        assert_eq!(ran, 2);
        let calls = runner.calls();
        assert_eq!(calls[0].program, first.display().to_string());
        assert_eq!(calls[1].program, second.display().to_string());
        assert_eq!(calls[0].cwd.as_deref(), first.parent());
    }

    #[test]
    fn test_failing_hook_aborts() {
        let dir = tempfile::tempdir().unwrap();
        write_hook(dir.path(), "10-a", 0o755);
        write_hook(dir.path(), "20-b", 0o755);

        let runner = RecordingRunner::default();
        runner.push_codes(&[2]);
        let result = run_preinstall_hooks(&ctx(), dir.path(), &runner);

        assert!(matches!(result, Err(Error::HookFailed { status: 2, .. })));
        assert_eq!(runner.calls().len(), 1);
    }
}
