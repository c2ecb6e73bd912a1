//! Errors returned by the orchestrator.

use thiserror::Error;

use super::poller::PollSettingsError;
use crate::api::ApiError;

/// Every failure an infrastructure command can end with.
///
/// Each variant renders a distinct, stable message and maps to a distinct
/// exit code so wrapping scripts can branch on the outcome.
#[derive(Error, Debug)]
pub enum DeployError {
    /// Missing or invalid input, caught before any remote call.
    #[error("Invalid arguments: {0}")]
    Validation(String),

    /// The confirmation guard denied the operation.
    #[error("Operation not confirmed. Aborting")]
    NotConfirmed,

    /// Communication with the remote API failed.
    #[error("MetalCloud API request failed")]
    Transport(#[from] ApiError),

    /// The remote API reported a terminal failure while waiting.
    #[error("Deploy failed: {0}")]
    DeployFailed(String),

    /// Waiting gave up before a terminal state; the deploy may still run.
    #[error(
        "Timed out after {timeout_secs}s ({attempts} status checks) waiting for deploy to finish; it may still be running"
    )]
    DeployTimeout { timeout_secs: u64, attempts: u32 },

    /// The interactive prompt could not be read.
    #[error("Failed to read confirmation")]
    Prompt(#[source] std::io::Error),

    /// A result could not be rendered as JSON.
    #[error("Failed to render output")]
    Render(#[source] serde_json::Error),
}

impl DeployError {
    /// Process exit code for this error kind.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::NotConfirmed => 3,
            Self::Transport(_) => 4,
            Self::DeployFailed(_) => 5,
            Self::DeployTimeout { .. } => 6,
            Self::Prompt(_) => 7,
            Self::Render(_) => 8,
        }
    }
}

impl From<PollSettingsError> for DeployError {
    fn from(err: PollSettingsError) -> Self {
        Self::Validation(err.to_string())
    }
}
