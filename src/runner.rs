// src/runner.rs

//! Process boundary for every external command the bootstrap runs
//!
//! Package managers, virtualenv, pip and exec.d hooks are all invoked through
//! the `CommandRunner` trait so the provisioning sequence can be exercised
//! against a recording runner in tests.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;
use tracing::debug;

/// A fully specified command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Complete child environment; the parent's is not inherited
    pub env: BTreeMap<OsString, OsString>,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    pub fn with_env<I, K, V>(mut self, env: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        self.env = env.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    /// Value of `key` in the child environment
    pub fn env_var(&self, key: &str) -> Option<&OsStr> {
        self.env.get(OsStr::new(key)).map(OsString::as_os_str)
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Shell-like rendering for logs and error messages
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Exit status of a finished command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatus {
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
}

impl CommandStatus {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Exit code for reporting, -1 for signal termination
    pub fn code_or_signal(&self) -> i32 {
        self.code.unwrap_or(-1)
    }
}

/// Executes commands on the host
pub trait CommandRunner {
    /// Run a command to completion with inherited stdio
    fn run(&self, cmd: &CommandSpec) -> io::Result<CommandStatus>;

    /// Block between retries
    fn sleep(&self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

/// Runs commands with `std::process::Command`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &CommandSpec) -> io::Result<CommandStatus> {
        debug!("Running: {}", cmd.display());

        let mut command = Command::new(&cmd.program);
        command.args(&cmd.args).env_clear().envs(&cmd.env);
        if let Some(cwd) = &cmd.cwd {
            command.current_dir(cwd);
        }

        let status = command.status()?;
        Ok(CommandStatus {
            code: status.code(),
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::path::Path;

    /// Records every invocation; succeeds unless told otherwise
    #[derive(Default)]
    pub struct RecordingRunner {
        calls: RefCell<Vec<CommandSpec>>,
        sleeps: RefCell<Vec<Duration>>,
        queued: RefCell<VecDeque<i32>>,
        failing: RefCell<Vec<String>>,
        creates: RefCell<Vec<(String, PathBuf)>>,
    }

    impl RecordingRunner {
        /// Exit codes handed out to the next calls, in order
        pub fn push_codes(&self, codes: &[i32]) {
            self.queued.borrow_mut().extend(codes.iter().copied());
        }

        /// Any command whose rendering contains `needle` exits 1
        pub fn fail_matching(&self, needle: &str) {
            self.failing.borrow_mut().push(needle.to_string());
        }

        /// Create `dir` when a command containing `needle` runs
        pub fn create_dir_on(&self, needle: &str, dir: &Path) {
            self.creates
                .borrow_mut()
                .push((needle.to_string(), dir.to_path_buf()));
        }

        pub fn calls(&self) -> Vec<CommandSpec> {
            self.calls.borrow().clone()
        }

        pub fn rendered(&self) -> Vec<String> {
            self.calls.borrow().iter().map(CommandSpec::display).collect()
        }

        pub fn sleeps(&self) -> Vec<Duration> {
            self.sleeps.borrow().clone()
        }
    }

    impl CommandRunner for RecordingRunner {
        fn run(&self, cmd: &CommandSpec) -> io::Result<CommandStatus> {
            self.calls.borrow_mut().push(cmd.clone());
            let rendered = cmd.display();

            for (needle, dir) in self.creates.borrow().iter() {
                if rendered.contains(needle.as_str()) {
                    std::fs::create_dir_all(dir)?;
                }
            }

            if self
                .failing
                .borrow()
                .iter()
                .any(|needle| rendered.contains(needle.as_str()))
            {
                return Ok(CommandStatus { code: Some(1) });
            }

            let code = self.queued.borrow_mut().pop_front().unwrap_or(0);
            Ok(CommandStatus { code: Some(code) })
        }

        fn sleep(&self, delay: Duration) {
            self.sleeps.borrow_mut().push(delay);
        }
    }
}
