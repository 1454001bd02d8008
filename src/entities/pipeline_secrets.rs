//! Tower Pipeline Secrets

use crate::tower::classify::Endpoint;
use crate::tower::client::TowerClient;
use crate::tower::error::{Result, TowerError};
use crate::tower::http::Request;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A pipeline secret. The value is write-only and never returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSecret {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct SecretRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    value: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSecretResponse {
    secret_id: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecretResponse {
    pipeline_secret: PipelineSecret,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListSecretsResponse {
    #[serde(default)]
    pipeline_secrets: Vec<PipelineSecret>,
}

impl TowerClient {
    pub async fn create_pipeline_secret(&self, workspace_id: i64, name: &str, value: &str) -> Result<i64> {
        let request = Request::post("/pipeline-secrets")
            .workspace(workspace_id)
            .json(&SecretRequest {
                name: Some(name),
                value,
            })?;
        let response: CreateSecretResponse = self.fetch(&request).await?;
        Ok(response.secret_id)
    }

    /// Fetch a secret by id; `None` once deleted
    pub async fn get_pipeline_secret(&self, workspace_id: i64, id: i64) -> Result<Option<PipelineSecret>> {
        let request = Request::get(format!("/pipeline-secrets/{id}")).workspace(workspace_id);
        let response: Option<SecretResponse> = self
            .fetch_optional(Endpoint::PipelineSecretById, &request)
            .await?;
        Ok(response.map(|r| r.pipeline_secret))
    }

    pub async fn list_pipeline_secrets(&self, workspace_id: i64) -> Result<Vec<PipelineSecret>> {
        let request = Request::get("/pipeline-secrets").workspace(workspace_id);
        let response: ListSecretsResponse = self.fetch(&request).await?;
        Ok(response.pipeline_secrets)
    }

    pub async fn get_pipeline_secret_by_name(&self, workspace_id: i64, name: &str) -> Result<PipelineSecret> {
        self.list_pipeline_secrets(workspace_id)
            .await?
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| TowerError::NotFound {
                kind: "pipeline secret",
                name: name.to_string(),
            })
    }

    /// Replace a secret's value
    pub async fn update_pipeline_secret(&self, workspace_id: i64, id: i64, value: &str) -> Result<()> {
        let request = Request::put(format!("/pipeline-secrets/{id}"))
            .workspace(workspace_id)
            .json(&SecretRequest { name: None, value })?;
        self.call(&request).await
    }

    pub async fn delete_pipeline_secret(&self, workspace_id: i64, id: i64) -> Result<()> {
        self.call(&Request::delete(format!("/pipeline-secrets/{id}")).workspace(workspace_id))
            .await
    }
}
