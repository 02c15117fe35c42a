//! Error types for wasm-serve.
//!
//! Messages follow `"<operation> failed: <reason>"` or
//! `"<entity> not found: <identifier>"`, all lowercase.
//!
//! CHANGELOG:
//! - 10/16/2026 - Serve error for a listener that dies
//! - 10/16/2026 - Initial error taxonomy

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using wasm-serve's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or serving.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Toolchain Errors
    // ========================================================================
    /// An external tool could not be started or exited unsuccessfully.
    #[error("{step} failed: {reason}")]
    StepFailed {
        /// Step name ("compile", "bindgen").
        step: String,
        /// Exit status and captured stderr, or the spawn error.
        reason: String,
    },

    /// The compiled artifact is not where the build profile says it is.
    #[error("artifact not found: {}{}", path.display(), suggestion_suffix(suggestion))]
    ArtifactNotFound {
        /// Expected artifact path.
        path: PathBuf,
        /// Closest existing `.wasm` file, if any.
        suggestion: Option<PathBuf>,
    },

    // ========================================================================
    // Server Errors
    // ========================================================================
    /// The listener could not be bound.
    #[error("bind failed: {addr}: {reason}")]
    Bind {
        /// Address that was requested.
        addr: String,
        /// Underlying error message.
        reason: String,
    },

    /// The listener stopped accepting connections without being asked to.
    #[error("serve failed: {0}")]
    Serve(String),

    /// Root directory to serve does not exist or is not a directory.
    #[error("serve root not found: {}", path.display())]
    RootNotFound {
        /// Path that was not found.
        path: PathBuf,
    },

    /// Root directory exists but contains nothing to serve.
    #[error("serve root is empty: {} (did the build produce any output?)", path.display())]
    RootEmpty {
        /// Path of the empty directory.
        path: PathBuf,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration could not be loaded or is invalid.
    #[error("config operation failed: {operation}: {reason}")]
    Config {
        /// The operation that failed (e.g., "load", "parse mime override").
        operation: String,
        /// The reason for the failure.
        reason: String,
    },

    // ========================================================================
    // IO Errors
    // ========================================================================
    /// IO error wrapper.
    #[error("io operation failed: {0}")]
    Io(#[from] std::io::Error),
}

fn suggestion_suffix(suggestion: &Option<PathBuf>) -> String {
    match suggestion {
        Some(path) => format!(" (did you mean {}?)", path.display()),
        None => String::new(),
    }
}

impl Error {
    /// Create a step failure error.
    pub fn step_failed(step: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StepFailed {
            step: step.into(),
            reason: reason.into(),
        }
    }

    /// Create a bind error.
    pub fn bind(addr: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Bind {
            addr: addr.into(),
            reason: reason.into(),
        }
    }

    /// Create a serve loop error.
    pub fn serve(reason: impl Into<String>) -> Self {
        Self::Serve(reason.into())
    }

    /// Create a config operation error.
    pub fn config(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            operation: operation.into(),
            reason: reason.into(),
        }
    }
}
