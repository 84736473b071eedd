//! Error types for the smart license core
//!
//! All fallible operations return `Result<T, Error>`.
//! Nothing here is fatal: every variant maps to a message the caller can
//! show and recover from (re-upload, re-click, next poll tick).

use thiserror::Error;

use crate::VersionStatus;

/// Smart license error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Malformed JSON or an unreadable document
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Lifecycle transition not allowed from the current status
    #[error("Invalid transition: cannot {action} a license in status '{from}'")]
    InvalidTransition { action: &'static str, from: VersionStatus },

    /// Required input missing; one message per missing field
    #[error("Validation error: {}", .0.join("; "))]
    ValidationError(Vec<String>),

    /// Document structure violates a versioning invariant
    #[error("Document error: {0}")]
    DocumentError(String),

    /// Royalty formula could not be evaluated
    #[error("Evaluation error: {0}")]
    EvaluationError(String),

    /// Network profile or local settings problem
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Node unreachable or returned a non-JSON-RPC response
    #[error("Connectivity error: {0}")]
    ConnectivityError(String),

    /// A single contract read failed (bad address, revert, bad return data)
    #[error("Contract call {method} on {address} failed: {reason}")]
    ContractCallError {
        method: String,
        address: String,
        reason: String,
    },

    /// File read/write failure
    #[error("I/O error: {0}")]
    IoError(String),
}

impl Error {
    /// Remediation steps shown alongside connectivity failures
    pub fn remediation(&self) -> Option<&'static [&'static str]> {
        match self {
            Error::ConnectivityError(_) => Some(&[
                "Check that the blockchain node is running",
                "Verify the RPC URL of the selected network",
                "Switch network with `slm network use <development|alps|custom>`",
            ]),
            Error::ContractCallError { .. } => Some(&[
                "Verify the contract address for the selected network",
                "Make sure the contracts are deployed on this chain",
            ]),
            _ => None,
        }
    }

    /// True for errors caused by the chain rather than local input
    pub fn is_chain_error(&self) -> bool {
        matches!(
            self,
            Error::ConnectivityError(_) | Error::ContractCallError { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::ParseError(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IoError(e.to_string())
    }
}

/// Result type alias for smart license operations
pub type Result<T> = std::result::Result<T, Error>;
