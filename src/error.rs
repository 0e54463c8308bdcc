//! Error taxonomy for the certificate workflow
//!
//! Every failure carries enough detail (command line, captured output,
//! exit code) to reproduce the failing invocation by hand.

use std::path::PathBuf;
use std::time::Duration;

use crate::process::CommandResult;

/// Caller-supplied input rejected before any subprocess is spawned
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid algorithm: {0}")]
    InvalidAlgorithm(String),
    #[error("Invalid cipher: {0}")]
    InvalidCipher(String),
    #[error("Invalid message digest: {0}")]
    InvalidDigest(String),
    #[error("A parameter file and an explicit algorithm are mutually exclusive")]
    ConflictingKeyParameters,
    #[error("An existing key file and a new-key instruction are mutually exclusive")]
    ConflictingKeySource,
    #[error("Either an existing key file or a new-key instruction is required")]
    MissingKeySource,
    #[error("Unsafe configuration key: {0:?}")]
    UnsafeConfigKey(String),
    #[error("Unsafe configuration value for {key}: {value:?}")]
    UnsafeConfigValue { key: String, value: String },
}

/// Errors surfaced by workflow operations and the process runner
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to write temporary config file in {dir}: {source}")]
    ConfigWrite {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to launch `{command}`: {source}")]
    ProcessLaunch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    ProcessFailure(Box<CommandResult>),

    #[error("Could not retrieve list of supported ciphers from `{command}`")]
    CipherLookup { command: String, stdout: String },

    #[error("`{command}` did not settle within {after:?}")]
    Timeout { command: String, after: Duration },

    #[error("`{command}` was cancelled")]
    Cancelled { command: String },
}

impl WorkflowError {
    /// The structured result of a toolkit-reported failure, if this is one
    pub fn command_result(&self) -> Option<&CommandResult> {
        match self {
            WorkflowError::ProcessFailure(result) => Some(result),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, WorkflowError::Validation(_))
    }
}

pub type Result<T, E = WorkflowError> = std::result::Result<T, E>;
