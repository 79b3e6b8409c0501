// src/state.rs

//! Bootstrap state tracking
//!
//! The only durable state this crate owns is the sentinel file inside the
//! wheelhouse. Its presence means a full pass completed; it is re-checked on
//! disk every time since a re-exec separates "not bootstrapped" from
//! "bootstrapped". This crate never removes it.

use crate::error::{Error, Result};
use crate::host::{HostFamily, HostProfile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Informational body written into the sentinel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentinelRecord {
    pub bootstrapped_at: DateTime<Utc>,
    pub family: HostFamily,
    pub codename: String,
    pub isolated: bool,
}

impl SentinelRecord {
    pub fn new(profile: &HostProfile, isolated: bool) -> Self {
        Self {
            bootstrapped_at: Utc::now(),
            family: profile.family,
            codename: profile.codename.clone(),
            isolated,
        }
    }
}

/// Sentinel-backed bootstrapped flag
#[derive(Debug, Clone)]
pub struct BootstrapState {
    sentinel: PathBuf,
}

impl BootstrapState {
    pub fn new(sentinel: impl Into<PathBuf>) -> Self {
        Self {
            sentinel: sentinel.into(),
        }
    }

    pub fn sentinel(&self) -> &Path {
        &self.sentinel
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.sentinel.exists()
    }

    /// Create the sentinel
    ///
    /// The record is written to a temporary file in the same directory and
    /// renamed into place, so the sentinel never exists half-written.
    pub fn mark_bootstrapped(&self, record: &SentinelRecord) -> Result<()> {
        let dir = self.sentinel.parent().ok_or_else(|| {
            Error::ProvisionIncomplete(format!("invalid sentinel path {}", self.sentinel.display()))
        })?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, record)?;
        tmp.write_all(b"\n")?;
        tmp.persist(&self.sentinel).map_err(|e| e.error)?;

        info!("Marked bootstrapped: {}", self.sentinel.display());
        Ok(())
    }

    /// Read the sentinel record, if any
    ///
    /// An empty or foreign sentinel body still counts as bootstrapped but
    /// yields `None` here.
    pub fn read_record(&self) -> Result<Option<SentinelRecord>> {
        if !self.is_bootstrapped() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.sentinel)?;
        match serde_json::from_str(&content) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                debug!("Sentinel {} has no readable record: {}", self.sentinel.display(), e);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::release::centos_fallback;

    #[test]
    fn test_fresh_host_is_not_bootstrapped() {
        let dir = tempfile::tempdir().unwrap();
        let state = BootstrapState::new(dir.path().join(".bootstrapped"));
        assert!(!state.is_bootstrapped());
        assert_eq!(state.read_record().unwrap(), None);
    }

    #[test]
    fn test_mark_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let state = BootstrapState::new(dir.path().join(".bootstrapped"));
        let record = SentinelRecord::new(&centos_fallback(), true);

        state.mark_bootstrapped(&record).unwrap();

        assert!(state.is_bootstrapped());
        assert_eq!(state.read_record().unwrap(), Some(record));
        // No stray temporary files left next to the sentinel
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_empty_sentinel_counts_as_bootstrapped() {
        let dir = tempfile::tempdir().unwrap();
        let sentinel = dir.path().join(".bootstrapped");
        fs::write(&sentinel, "").unwrap();

        let state = BootstrapState::new(&sentinel);
        assert!(state.is_bootstrapped());
        assert_eq!(state.read_record().unwrap(), None);
    }

    #[test]
    fn test_state_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let sentinel = dir.path().join(".bootstrapped");
        let state = BootstrapState::new(&sentinel);

        assert!(!state.is_bootstrapped());
        fs::write(&sentinel, "").unwrap();
        assert!(state.is_bootstrapped());
    }
}
