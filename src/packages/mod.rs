// src/packages/mod.rs

//! Native package manager support
//!
//! Each supported host family maps to one `PackageManager` implementation
//! (apt-get, yum). `PackageInstaller` wraps it with the retry policy.

pub mod apt;
pub mod installer;
pub mod traits;
pub mod yum;

pub use installer::{PackageInstaller, RetryPolicy};
pub use traits::PackageManager;

use crate::host::HostFamily;

/// Package manager for a host family
pub fn for_family(family: HostFamily) -> Box<dyn PackageManager> {
    match family {
        HostFamily::DebianLike => Box::new(apt::Apt),
        HostFamily::RedhatLike => Box::new(yum::Yum),
    }
}
