//! Error types for the progress-tracking subsystem.
//!
//! The hook callbacks themselves never fail: operation failures reach them
//! as arguments. The errors here cover everything around them: walk script
//! loading and validation, address parsing, the replay walk and emitter
//! construction.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the crate.
#[derive(Debug, Error)]
pub enum ProgressError {
    /// Walk script errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Resource address errors.
    #[error("Address error: {0}")]
    Address(#[from] AddressError),

    /// Walk execution errors.
    #[error("Walk error: {0}")]
    Walk(#[from] WalkError),

    /// No async runtime was available where one is required.
    #[error("Runtime error: {message}")]
    Runtime {
        /// Description of the runtime problem.
        message: String,
    },

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Walk script errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The script file was not found.
    #[error("Walk script not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The script could not be parsed.
    #[error("Failed to parse walk script: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Walk script validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// The same address appears twice.
    #[error("Duplicate resource address: {address}")]
    DuplicateAddress {
        /// The duplicated address.
        address: String,
    },

    /// A dependency names an address the script does not define.
    #[error("{address} depends on unknown resource {dependency}")]
    UnknownDependency {
        /// Resource declaring the dependency.
        address: String,
        /// The missing dependency.
        dependency: String,
    },

    /// Circular dependency detected.
    #[error("Circular dependency detected: {cycle}")]
    CircularDependency {
        /// Description of the cycle.
        cycle: String,
    },
}

/// Resource address errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// The address string is malformed.
    #[error("Invalid resource address {input:?}: {reason}")]
    Invalid {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Errors produced while replaying a walk.
#[derive(Debug, Clone, Error)]
pub enum WalkError {
    /// A scripted operation failed.
    #[error("{address}: {message}")]
    OperationFailed {
        /// Resource whose operation failed.
        address: String,
        /// Failure message.
        message: String,
    },

    /// A provisioner step failed.
    #[error("{address}: provisioner {provisioner} failed: {message}")]
    ProvisionerFailed {
        /// Resource being provisioned.
        address: String,
        /// Provisioner type name.
        provisioner: String,
        /// Failure message.
        message: String,
    },

    /// A walk task ended abnormally.
    #[error("Walk task failed: {message}")]
    TaskFailed {
        /// Description of the failure.
        message: String,
    },
}

/// Result type alias for crate operations.
pub type Result<T> = std::result::Result<T, ProgressError>;

impl ProgressError {
    /// Creates a runtime error with the given message.
    #[must_use]
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
        }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }
}

impl AddressError {
    /// Creates an invalid-address error.
    #[must_use]
    pub fn invalid(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

impl WalkError {
    /// Creates an operation failure for the given resource.
    #[must_use]
    pub fn operation(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OperationFailed {
            address: address.into(),
            message: message.into(),
        }
    }
}
