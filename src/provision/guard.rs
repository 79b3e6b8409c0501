// src/provision/guard.rs

//! Scoped filesystem changes undone on drop
//!
//! Both guards restore the host on every exit path of the provisioning pass,
//! including early returns through `?`.

use crate::error::Result;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// easy_install configuration restricting resolution to the wheelhouse
///
/// pip honours `--no-index`, but setuptools' easy_install (pulled in for
/// `setup_requires`) reads `~/.pydistutils.cfg` instead.
pub struct ResolutionOverride {
    path: PathBuf,
}

impl ResolutionOverride {
    pub fn install(path: &Path, wheelhouse: &Path) -> Result<Self> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        write!(
            tmp,
            "[easy_install]\nallow_hosts = ''\nfind_links = file://{}/\n",
            wheelhouse.display()
        )?;
        tmp.persist(path).map_err(|e| e.error)?;

        debug!("Wrote resolution override {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ResolutionOverride {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed resolution override {}", self.path.display()),
            Err(e) => warn!(
                "Failed to remove resolution override {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// Copy of an operator-managed binary kept aside while it may be clobbered
///
/// `pip install -U pip` against the system interpreter can replace
/// `/usr/bin/pip`; the saved copy is put back when the guard drops.
pub struct BinaryBackup {
    original: PathBuf,
    backup: Option<PathBuf>,
}

impl BinaryBackup {
    /// Save `original` to `<original>.save` if it exists
    ///
    /// A `.save` left behind by an interrupted pass still holds the
    /// operator's binary: it is put back and kept instead of being replaced
    /// by whatever the interrupted pass left at `original`.
    pub fn save(original: &Path) -> Result<Self> {
        let mut backup = original.as_os_str().to_owned();
        backup.push(".save");
        let backup = PathBuf::from(backup);

        if backup.exists() {
            warn!(
                "Found stale {}, restoring {} from it",
                backup.display(),
                original.display()
            );
            fs::copy(&backup, original)?;
            return Ok(Self {
                original: original.to_path_buf(),
                backup: Some(backup),
            });
        }

        if !original.exists() {
            return Ok(Self {
                original: original.to_path_buf(),
                backup: None,
            });
        }

        // fs::copy carries the permission bits over
        fs::copy(original, &backup)?;
        debug!("Saved {} to {}", original.display(), backup.display());

        Ok(Self {
            original: original.to_path_buf(),
            backup: Some(backup),
        })
    }

    pub fn backup(&self) -> Option<&Path> {
        self.backup.as_deref()
    }
}

impl Drop for BinaryBackup {
    fn drop(&mut self) {
        let Some(backup) = self.backup.take() else {
            return;
        };

        let restored = fs::copy(&backup, &self.original).and_then(|_| fs::remove_file(&backup));
        match restored {
            Ok(()) => debug!("Restored {}", self.original.display()),
            Err(e) => warn!(
                "Failed to restore {} from {}: {}",
                self.original.display(),
                backup.display(),
                e
            ),
        }
    }
}
