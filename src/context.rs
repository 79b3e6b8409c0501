// src/context.rs

//! Explicit host context
//!
//! Environment variables, executable search path and working directory are
//! captured once at startup and passed to every component. Nothing in this
//! crate mutates the process-global environment; changes such as prepending
//! the virtualenv `bin/` directory happen on a `HostContext` value and are
//! handed to child processes (and finally to the re-exec) from there.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

/// Environment variable naming the unit's root directory
pub const CHARM_DIR_VAR: &str = "JUJU_CHARM_DIR";

const PATH_VAR: &str = "PATH";

/// Snapshot of the ambient process state used as configuration
///
/// Names and values are kept as raw OS strings so the hand-off sees the
/// environment byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostContext {
    /// Environment variables, excluding `PATH` (see `search_path`)
    pub env: BTreeMap<OsString, OsString>,
    /// Executable search path, in lookup order
    pub search_path: Vec<PathBuf>,
    /// Working directory the pass was started from
    pub working_dir: PathBuf,
}

impl HostContext {
    /// Build a context from environment pairs and a working directory
    ///
    /// A `PATH` entry is split into `search_path`.
    pub fn new<I, K, V>(env: I, working_dir: PathBuf) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        let mut env: BTreeMap<OsString, OsString> = env
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let search_path = env
            .remove(OsStr::new(PATH_VAR))
            .map(|path| std::env::split_paths(&path).collect())
            .unwrap_or_default();

        Self {
            env,
            search_path,
            working_dir,
        }
    }

    /// Capture the current process environment and working directory
    pub fn from_process() -> Result<Self> {
        let working_dir = std::env::current_dir()?;
        Ok(Self::new(std::env::vars_os(), working_dir))
    }

    /// Look up an environment variable holding valid UTF-8
    pub fn var(&self, key: &str) -> Option<&str> {
        self.var_os(key).and_then(OsStr::to_str)
    }

    /// Look up an environment variable as raw bytes
    pub fn var_os(&self, key: &str) -> Option<&OsStr> {
        self.env.get(OsStr::new(key)).map(OsString::as_os_str)
    }

    /// Look up a variable that must be present
    pub fn require_var(&self, key: &str) -> Result<&OsStr> {
        self.var_os(key)
            .ok_or_else(|| Error::MissingEnv(key.to_string()))
    }

    /// The unit's root directory from `JUJU_CHARM_DIR`
    pub fn charm_dir(&self) -> Result<PathBuf> {
        self.require_var(CHARM_DIR_VAR).map(PathBuf::from)
    }

    /// Put `dir` in front of the search path
    pub fn prepend_path(&mut self, dir: impl Into<PathBuf>) {
        self.search_path.insert(0, dir.into());
    }

    /// Put `dir` at the end of the search path, once
    pub fn append_path(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        if !self.search_path.contains(&dir) {
            self.search_path.push(dir);
        }
    }

    /// Render `search_path` back into a `PATH` value
    pub fn path_var(&self) -> OsString {
        let mut path = OsString::new();
        for (i, dir) in self.search_path.iter().enumerate() {
            if i > 0 {
                path.push(":");
            }
            path.push(dir);
        }
        path
    }

    /// Full environment for a child process, `PATH` included
    pub fn child_env(&self) -> BTreeMap<OsString, OsString> {
        let mut env = self.env.clone();
        if !self.search_path.is_empty() {
            env.insert(OsString::from(PATH_VAR), self.path_var());
        }
        env
    }

    /// Resolve a bare program name against the search path
    ///
    /// Names containing `/` are returned as given, relative to `working_dir`
    /// when not absolute.
    pub fn resolve_program(&self, program: impl AsRef<OsStr>) -> Option<PathBuf> {
        let program = program.as_ref();
        if program.as_bytes().contains(&b'/') {
            let path = Path::new(program);
            return Some(if path.is_absolute() {
                path.to_path_buf()
            } else {
                self.working_dir.join(path)
            });
        }

        self.search_path
            .iter()
            .map(|dir| dir.join(program))
            .find(|candidate| candidate.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_with_path(path: &str) -> HostContext {
        let mut env = BTreeMap::new();
        env.insert("PATH".to_string(), path.to_string());
        env.insert("HOME".to_string(), "/root".to_string());
        HostContext::new(env, PathBuf::from("/var/lib/juju/agents/unit-foo-0/charm"))
    }

    #[test]
    fn test_path_is_split_out_of_env() {
        let ctx = ctx_with_path("/usr/bin:/bin");
        assert_eq!(
            ctx.search_path,
            vec![PathBuf::from("/usr/bin"), PathBuf::from("/bin")]
        );
        assert!(ctx.var("PATH").is_none());
        assert_eq!(ctx.var("HOME"), Some("/root"));
    }

    #[test]
    fn test_prepend_and_append_path() {
        let mut ctx = ctx_with_path("/usr/bin");
        ctx.prepend_path("/srv/.venv/bin");
        ctx.append_path("/charm/bin");
        ctx.append_path("/charm/bin");
        assert_eq!(ctx.path_var(), OsString::from("/srv/.venv/bin:/usr/bin:/charm/bin"));
        assert_eq!(
            ctx.child_env().get(OsStr::new("PATH")),
            Some(&OsString::from("/srv/.venv/bin:/usr/bin:/charm/bin"))
        );
    }

    #[test]
    fn test_missing_charm_dir() {
        let ctx = ctx_with_path("/usr/bin");
        assert!(matches!(ctx.charm_dir(), Err(Error::MissingEnv(_))));
    }

    #[test]
    fn test_resolve_program() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("install"), "#!/bin/sh\n").unwrap();

        let ctx = ctx_with_path(dir.path().to_str().unwrap());
        assert_eq!(ctx.resolve_program("install"), Some(dir.path().join("install")));
        assert_eq!(ctx.resolve_program("missing"), None);
        assert_eq!(
            ctx.resolve_program("hooks/install"),
            Some(PathBuf::from("/var/lib/juju/agents/unit-foo-0/charm/hooks/install"))
        );
    }

    #[test]
    fn test_non_utf8_values_are_kept_verbatim() {
        let value = OsStr::from_bytes(b"caf\xe9");
        let ctx = HostContext::new(
            [
                (OsString::from("PATH"), OsString::from("/usr/bin")),
                (OsString::from("LATIN1_GREETING"), value.to_owned()),
            ],
            PathBuf::from("/"),
        );

        assert_eq!(ctx.var_os("LATIN1_GREETING"), Some(value));
        assert_eq!(ctx.var("LATIN1_GREETING"), None);
        assert_eq!(
            ctx.child_env().get(OsStr::new("LATIN1_GREETING")).map(|v| v.as_bytes()),
            Some(&b"caf\xe9"[..])
        );
    }

    #[test]
    fn test_from_process_keeps_raw_bytes() {
        let key = "CHARM_BOOTSTRAP_CONTEXT_TEST_LATIN1";
        // SAFETY: the variable name is unique to this test
        unsafe { std::env::set_var(key, OsStr::from_bytes(b"caf\xe9")) };

        let ctx = HostContext::from_process().unwrap();
        assert_eq!(ctx.var_os(key).map(OsStr::as_bytes), Some(&b"caf\xe9"[..]));
    }

    #[test]
    fn test_charm_dir_from_env() {
        let ctx = HostContext::new(
            [("JUJU_CHARM_DIR", "/var/lib/juju/agents/unit-foo-0/charm")],
            PathBuf::from("/"),
        );
        assert_eq!(
            ctx.charm_dir().unwrap(),
            PathBuf::from("/var/lib/juju/agents/unit-foo-0/charm")
        );
    }
}
