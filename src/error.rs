// src/error.rs

use thiserror::Error;

/// Core error types for charm-bootstrap
#[derive(Error, Debug)]
pub enum Error {
    /// Host family could not be determined from the release files
    #[error("Unable to detect host distribution: {0}")]
    DetectionAmbiguous(String),

    /// Package manager kept failing after every retry
    #[error("Package install failed after {attempts} attempts: {command}")]
    InstallFailed { command: String, attempts: u32 },

    /// A step between baseline install and sentinel write failed
    #[error("Provisioning incomplete: {0}")]
    ProvisionIncomplete(String),

    /// Hand-off program missing or exec(2) failed
    #[error("Failed to re-exec into {program}: {reason}")]
    ReexecFailed { program: String, reason: String },

    /// An exec.d pre-install hook exited non-zero
    #[error("Pre-install hook {hook} failed with status {status}")]
    HookFailed { hook: String, status: i32 },

    /// Malformed unit configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Required environment variable is not set
    #[error("Environment variable {0} is not set")]
    MissingEnv(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// layer.yaml parse errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Sentinel record encode/decode errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using charm-bootstrap's Error type
pub type Result<T> = std::result::Result<T, Error>;
