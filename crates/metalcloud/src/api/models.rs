//! MetalCloud REST request and response models.

use serde::{Deserialize, Serialize};

use super::traits::{DeployStatus, Infrastructure};
use crate::deploy::ShutdownPolicy;

// ============================================================================
// Common wrapper types
// ============================================================================

/// Paginated list response.
#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    /// Page items.
    pub data: Vec<T>,
}

// ============================================================================
// Infrastructure types
// ============================================================================

/// Infrastructure resource from the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureResource {
    /// Infrastructure ID.
    pub id: u64,
    /// Infrastructure label.
    pub label: String,
    /// Service status.
    pub service_status: Option<String>,
    /// Pending configuration and its deploy state.
    pub config: Option<InfrastructureConfig>,
}

/// Infrastructure configuration revision.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureConfig {
    /// Configuration revision, matched on update.
    pub revision: Option<u64>,
    /// Deploy status for this revision.
    #[serde(default)]
    pub deploy_status: DeployStatus,
}

impl From<InfrastructureResource> for Infrastructure {
    fn from(resource: InfrastructureResource) -> Self {
        let (deploy_status, revision) = resource
            .config
            .map(|config| (config.deploy_status, config.revision))
            .unwrap_or_default();

        Self {
            id: resource.id,
            label: resource.label,
            service_status: resource.service_status,
            deploy_status,
            revision,
        }
    }
}

/// Request body for creating an infrastructure.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInfrastructureBody<'a> {
    /// Label of the new infrastructure.
    pub label: &'a str,
    /// Site the infrastructure belongs to.
    pub site_id: u64,
    /// Free-form metadata, sent empty.
    pub meta: serde_json::Map<String, serde_json::Value>,
}

// ============================================================================
// Deploy request
// ============================================================================

/// Request body for deploying an infrastructure.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployBody {
    /// Do not fail when the deploy would lose data.
    pub allow_data_loss: bool,
    /// How running servers are powered down first.
    pub shutdown_options: ShutdownOptions,
}

/// Shutdown options as understood by the API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShutdownOptions {
    /// Try an ACPI power off first.
    pub attempt_soft_shutdown: bool,
    /// Force power off once the soft timeout expires.
    pub attempt_hard_shutdown: bool,
    /// Seconds to wait for the soft power off.
    pub soft_shutdown_timeout: u32,
    /// Skip the soft path and power off immediately.
    pub force_shutdown: bool,
}

impl From<ShutdownPolicy> for ShutdownOptions {
    fn from(policy: ShutdownPolicy) -> Self {
        Self {
            attempt_soft_shutdown: policy.attempt_soft,
            attempt_hard_shutdown: policy.hard_after_timeout,
            soft_shutdown_timeout: policy.soft_timeout_seconds,
            force_shutdown: policy.forced,
        }
    }
}
