//! Tower Compute Environments

use crate::compute_env::{ComputeEnv, ComputeEnvConfig, ComputeEnvEnvelope};
use crate::tower::classify::Endpoint;
use crate::tower::client::TowerClient;
use crate::tower::error::{Result, TowerError};
use crate::tower::http::Request;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Listing entry for a compute environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeEnvSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Fields for a new compute environment
#[derive(Debug, Clone)]
pub struct NewComputeEnv {
    pub name: String,
    pub description: Option<String>,
    pub credentials_id: String,
    pub config: ComputeEnvConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ComputeEnvBody<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    platform: &'static str,
    credentials_id: &'a str,
    config: Map<String, Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateComputeEnvRequest<'a> {
    compute_env: ComputeEnvBody<'a>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateComputeEnvResponse {
    compute_env_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComputeEnvResponse {
    compute_env: ComputeEnvEnvelope,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListComputeEnvsResponse {
    #[serde(default)]
    compute_envs: Vec<ComputeEnvSummary>,
}

impl TowerClient {
    /// Create a compute environment, returning its id
    pub async fn create_compute_env(&self, workspace_id: i64, env: &NewComputeEnv) -> Result<String> {
        let body = CreateComputeEnvRequest {
            compute_env: ComputeEnvBody {
                name: &env.name,
                description: env.description.as_deref(),
                platform: env.config.platform(),
                credentials_id: &env.credentials_id,
                config: self.platforms().encode(&env.config)?,
            },
        };
        let request = Request::post("/compute-envs")
            .workspace(workspace_id)
            .json(&body)?;
        let response: CreateComputeEnvResponse = self.fetch(&request).await?;
        tracing::debug!(
            "Created {} compute environment {}",
            env.config.platform(),
            response.compute_env_id
        );
        Ok(response.compute_env_id)
    }

    /// Fetch a compute environment by id.
    ///
    /// Returns `None` when the environment is soft-deleted, either flagged
    /// in the record or answered with a 403.
    pub async fn get_compute_env(&self, workspace_id: i64, id: &str) -> Result<Option<ComputeEnv>> {
        let request = Request::get(format!("/compute-envs/{id}")).workspace(workspace_id);
        let response: Option<ComputeEnvResponse> =
            self.fetch_optional(Endpoint::ComputeEnvById, &request).await?;
        match response {
            Some(r) => r.compute_env.decode(self.platforms()),
            None => Ok(None),
        }
    }

    pub async fn list_compute_envs(&self, workspace_id: i64) -> Result<Vec<ComputeEnvSummary>> {
        let request = Request::get("/compute-envs").workspace(workspace_id);
        let response: ListComputeEnvsResponse = self.fetch(&request).await?;
        Ok(response.compute_envs)
    }

    pub async fn get_compute_env_by_name(&self, workspace_id: i64, name: &str) -> Result<ComputeEnv> {
        let not_found = || TowerError::NotFound {
            kind: "compute environment",
            name: name.to_string(),
        };
        let summary = self
            .list_compute_envs(workspace_id)
            .await?
            .into_iter()
            .find(|ce| ce.name == name)
            .ok_or_else(not_found)?;
        self.get_compute_env(workspace_id, &summary.id)
            .await?
            .ok_or_else(not_found)
    }

    pub async fn delete_compute_env(&self, workspace_id: i64, id: &str) -> Result<()> {
        self.call(&Request::delete(format!("/compute-envs/{id}")).workspace(workspace_id))
            .await
    }
}
