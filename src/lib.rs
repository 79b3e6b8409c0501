// src/lib.rs

//! charm-bootstrap
//!
//! Provisions a charm's runtime dependencies on a fresh host, exactly once,
//! then hands control to the provisioned interpreter.
//!
//! # Architecture
//!
//! - Explicit context: environment, search path and working directory travel
//!   as a `HostContext` value; nothing mutates the process environment
//! - Sentinel-gated: `wheelhouse/.bootstrapped` makes the pass idempotent and
//!   safely retriable after any failure
//! - Offline: Python dependencies come only from the local wheelhouse
//! - Re-exec as a value: the orchestrator returns an `Outcome` and the entry
//!   point replaces the process

pub mod config;
pub mod context;
mod error;
pub mod hooks;
pub mod host;
pub mod orchestrator;
pub mod packages;
pub mod provision;
pub mod reexec;
pub mod runner;
pub mod state;

pub use error::{Error, Result};
