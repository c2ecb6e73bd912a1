//! API trait and common types for MetalCloud infrastructures.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::deploy::ShutdownPolicy;

/// Errors that can occur while talking to the MetalCloud API.
#[derive(Error, Debug)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid client configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Serialization error.
    #[error("Failed to parse API response")]
    Serialization(#[from] serde_json::Error),
}

/// Deploy status of an infrastructure, as reported by the remote API.
///
/// The provider owns the set of values; unrecognised strings are kept
/// verbatim in [`DeployStatus::Other`] and are never considered terminal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeployStatus {
    /// No deploy has been started for the pending changes.
    #[default]
    NotStarted,
    /// A deploy is running.
    Ongoing,
    /// The last deploy completed successfully.
    Finished,
    /// The last deploy stopped with an error.
    Error,
    /// The last deploy failed.
    Failed,
    /// The last deploy was aborted.
    Aborted,
    /// Any other provider-defined value.
    Other(String),
}

impl DeployStatus {
    /// Status string as sent by the API.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::NotStarted => "not_started",
            Self::Ongoing => "ongoing",
            Self::Finished => "finished",
            Self::Error => "error",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
            Self::Other(raw) => raw,
        }
    }

    /// Whether the deploy completed successfully.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Finished)
    }

    /// Whether the deploy ended in a failure state.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Error | Self::Failed | Self::Aborted)
    }

    /// Whether no further automatic transition will happen.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.is_success() || self.is_failure()
    }
}

impl From<&str> for DeployStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "not_started" => Self::NotStarted,
            "ongoing" => Self::Ongoing,
            "finished" => Self::Finished,
            "error" => Self::Error,
            "failed" => Self::Failed,
            "aborted" => Self::Aborted,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for DeployStatus {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<DeployStatus> for String {
    fn from(status: DeployStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for DeployStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An infrastructure, the top-level deployable unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Infrastructure {
    /// Numeric identifier.
    pub id: u64,
    /// Unique label.
    pub label: String,
    /// Service status (e.g. `active`, `ordered`, `deleted`).
    pub service_status: Option<String>,
    /// Status of the most recent deploy.
    pub deploy_status: DeployStatus,
    /// Revision of the pending configuration, required for updates.
    pub revision: Option<u64>,
}

/// Service statuses hidden from listings unless asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InfrastructureFilter {
    /// Include infrastructures created but never deployed.
    pub show_ordered: bool,
    /// Include deleted infrastructures.
    pub show_deleted: bool,
}

impl InfrastructureFilter {
    /// Service status filter expressions sent with a list request.
    #[must_use]
    pub fn service_status_filters(&self) -> Vec<&'static str> {
        let mut filters = Vec::new();
        if !self.show_ordered {
            filters.push("$not:$eq:ordered");
        }
        if !self.show_deleted {
            filters.push("$not:$eq:deleted");
        }
        filters
    }
}

/// Changes applied to an infrastructure's pending configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureUpdate {
    /// New label; the current one is resent when unchanged.
    pub label: String,
    /// Replacement custom variables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_variables: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Operations the orchestrator needs from the MetalCloud API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InfrastructureApi: Send + Sync {
    /// Get an infrastructure by ID.
    async fn get_infrastructure(&self, id: u64) -> Result<Infrastructure, ApiError>;

    /// List infrastructures ordered by ID, hiding the statuses `filter`
    /// excludes.
    async fn list_infrastructures(
        &self,
        filter: InfrastructureFilter,
    ) -> Result<Vec<Infrastructure>, ApiError>;

    /// Free-text search over infrastructures (matches IDs and labels).
    async fn search_infrastructures(&self, query: &str)
        -> Result<Vec<Infrastructure>, ApiError>;

    /// Fetch the current deploy status. Must be cheap to call repeatedly.
    async fn deploy_status(&self, id: u64) -> Result<DeployStatus, ApiError> {
        Ok(self.get_infrastructure(id).await?.deploy_status)
    }

    /// Create an empty infrastructure in a site.
    async fn create_infrastructure(
        &self,
        site_id: u64,
        label: &str,
    ) -> Result<Infrastructure, ApiError>;

    /// Update the pending configuration. The change is rejected by the API
    /// unless `revision` still matches the current configuration.
    async fn update_infrastructure(
        &self,
        id: u64,
        update: InfrastructureUpdate,
        revision: u64,
    ) -> Result<Infrastructure, ApiError>;

    /// Start a deploy. Returns once the request is accepted, not completed.
    async fn deploy(
        &self,
        id: u64,
        shutdown: ShutdownPolicy,
        allow_data_loss: bool,
    ) -> Result<(), ApiError>;

    /// Discard pending changes and return to the deployed state.
    async fn revert(&self, id: u64) -> Result<(), ApiError>;

    /// Delete an infrastructure.
    async fn delete(&self, id: u64) -> Result<(), ApiError>;
}
