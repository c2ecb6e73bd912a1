//! MetalCloud REST client implementation.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use super::models::{CreateInfrastructureBody, DeployBody, InfrastructureResource, ListResponse};
use super::traits::{
    ApiError, Infrastructure, InfrastructureApi, InfrastructureFilter, InfrastructureUpdate,
};
use crate::config::ClientConfig;
use crate::deploy::ShutdownPolicy;

/// Path prefix for infrastructure resources.
const INFRASTRUCTURES_PATH: &str = "/api/v2/infrastructures";

/// MetalCloud API client.
#[derive(Clone)]
pub struct MetalCloud {
    /// HTTP client.
    client: Client,
    /// Base URL, without a trailing slash.
    endpoint: String,
    /// API key for authentication.
    api_key: String,
}

impl MetalCloud {
    /// Create a new client from a validated configuration.
    ///
    /// # Errors
    /// Returns error if HTTP client cannot be created.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Make an authenticated GET request.
    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{path}", self.endpoint);
        debug!(url = %url, "GET request");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(query)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Make an authenticated POST request.
    async fn post<T: serde::de::DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = format!("{}{path}", self.endpoint);
        debug!(url = %url, "POST request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Make an authenticated PATCH request guarded by an `If-Match` revision.
    async fn patch_if_match<T: serde::de::DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        revision: u64,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = format!("{}{path}", self.endpoint);
        debug!(url = %url, revision, "PATCH request");

        let response = self
            .client
            .patch(&url)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::IF_MATCH, revision.to_string())
            .json(body)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Make an authenticated POST request that returns an empty body.
    async fn post_empty<B: serde::Serialize>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        let url = format!("{}{path}", self.endpoint);
        debug!(url = %url, "POST request (empty response)");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// Make an authenticated DELETE request.
    async fn delete_path(&self, path: &str) -> Result<(), ApiError> {
        let url = format!("{}{path}", self.endpoint);
        debug!(url = %url, "DELETE request");

        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// Map a non-success status to an error, discarding the body otherwise.
    async fn check_status(response: reqwest::Response) -> Result<(), ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            Err(ApiError::NotFound(text))
        } else {
            Err(ApiError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }

    /// Handle API response, parsing JSON or error.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str(&text).map_err(|e| {
                warn!(error = %e, body = %text, "Failed to parse response");
                ApiError::Serialization(e)
            })
        } else if status == StatusCode::NOT_FOUND {
            Err(ApiError::NotFound(text))
        } else {
            Err(ApiError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }
}

#[async_trait]
impl InfrastructureApi for MetalCloud {
    async fn get_infrastructure(&self, id: u64) -> Result<Infrastructure, ApiError> {
        let resource: InfrastructureResource = self
            .get(&format!("{INFRASTRUCTURES_PATH}/{id}"), &[])
            .await?;
        Ok(resource.into())
    }

    async fn list_infrastructures(
        &self,
        filter: InfrastructureFilter,
    ) -> Result<Vec<Infrastructure>, ApiError> {
        let mut query: Vec<(&str, &str)> = filter
            .service_status_filters()
            .into_iter()
            .map(|expr| ("filter.serviceStatus", expr))
            .collect();
        query.push(("sortBy", "id:ASC"));

        let response: ListResponse<InfrastructureResource> =
            self.get(INFRASTRUCTURES_PATH, &query).await?;
        Ok(response.data.into_iter().map(Infrastructure::from).collect())
    }

    async fn search_infrastructures(
        &self,
        query: &str,
    ) -> Result<Vec<Infrastructure>, ApiError> {
        let response: ListResponse<InfrastructureResource> = self
            .get(INFRASTRUCTURES_PATH, &[("search", query)])
            .await?;
        Ok(response.data.into_iter().map(Infrastructure::from).collect())
    }

    async fn create_infrastructure(
        &self,
        site_id: u64,
        label: &str,
    ) -> Result<Infrastructure, ApiError> {
        info!(site_id, label, "Creating infrastructure");

        let body = CreateInfrastructureBody {
            label,
            site_id,
            meta: serde_json::Map::new(),
        };
        let resource: InfrastructureResource = self.post(INFRASTRUCTURES_PATH, &body).await?;

        info!(infrastructure_id = resource.id, "Infrastructure created");
        Ok(resource.into())
    }

    async fn update_infrastructure(
        &self,
        id: u64,
        update: InfrastructureUpdate,
        revision: u64,
    ) -> Result<Infrastructure, ApiError> {
        info!(infrastructure_id = id, revision, "Updating infrastructure configuration");

        let resource: InfrastructureResource = self
            .patch_if_match(&format!("{INFRASTRUCTURES_PATH}/{id}/config"), revision, &update)
            .await?;
        Ok(resource.into())
    }

    async fn deploy(
        &self,
        id: u64,
        shutdown: ShutdownPolicy,
        allow_data_loss: bool,
    ) -> Result<(), ApiError> {
        info!(
            infrastructure_id = id,
            allow_data_loss,
            forced = shutdown.forced,
            attempt_soft = shutdown.attempt_soft,
            "Requesting deploy"
        );

        let body = DeployBody {
            allow_data_loss,
            shutdown_options: shutdown.into(),
        };

        self.post_empty(&format!("{INFRASTRUCTURES_PATH}/{id}/actions/deploy"), &body)
            .await?;

        info!(infrastructure_id = id, "Deploy accepted");
        Ok(())
    }

    async fn revert(&self, id: u64) -> Result<(), ApiError> {
        info!(infrastructure_id = id, "Reverting pending changes");
        self.post_empty(
            &format!("{INFRASTRUCTURES_PATH}/{id}/actions/revert"),
            &serde_json::json!({}),
        )
        .await
    }

    async fn delete(&self, id: u64) -> Result<(), ApiError> {
        info!(infrastructure_id = id, "Deleting infrastructure");
        self.delete_path(&format!("{INFRASTRUCTURES_PATH}/{id}"))
            .await?;
        info!(infrastructure_id = id, "Infrastructure deleted");
        Ok(())
    }
}
