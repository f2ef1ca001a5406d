//! Error types for Sandock

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SandockError {
    /// Missing, invalid or ambiguous configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Known failure while preparing or running a program
    #[error("Execution error: {0}")]
    Execution(String),

    #[error("error in executing command: {command}, stderr: {stderr}, stdout: {stdout}")]
    Shell {
        command: String,
        code: i32,
        stdout: String,
        stderr: String,
    },

    /// Malformed override token, usage already rendered in the message
    #[error("{0}")]
    Usage(String),

    /// Override help was requested, usage text carried for printing
    #[error("{0}")]
    HelpRequested(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "yaml")]
    #[error("YAML decode error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SandockError {
    /// Process exit code the CLI reports for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            SandockError::Shell { code, .. } => *code,
            SandockError::Usage(_) => 2,
            SandockError::HelpRequested(_) => 0,
            _ => 1,
        }
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        SandockError::Config(msg.into())
    }

    pub(crate) fn execution(msg: impl Into<String>) -> Self {
        SandockError::Execution(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SandockError>;
