//! Tower Pipelines
//!
//! Saved pipelines and the launch configuration they carry. A pipeline
//! record and its launch are separate resources on the server; reads fetch
//! both and join them.

use crate::compute_env::omit;
use crate::tower::classify::Endpoint;
use crate::tower::client::TowerClient;
use crate::tower::error::Result;
use crate::tower::http::Request;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Launch settings sent when creating or updating a pipeline or action.
///
/// Unset or empty optional strings are left out of the payload. Lists are
/// sent whenever they are set, even when empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchSpec {
    /// Existing launch id, required when updating an action
    #[serde(skip_serializing_if = "omit::is_empty_str")]
    pub id: Option<String>,
    pub compute_env_id: String,
    pub pipeline: String,
    pub work_dir: String,
    #[serde(skip_serializing_if = "omit::is_empty_str")]
    pub revision: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_profiles: Option<Vec<String>>,
    #[serde(skip_serializing_if = "omit::is_empty_str")]
    pub params_text: Option<String>,
    #[serde(skip_serializing_if = "omit::is_empty_str")]
    pub config_text: Option<String>,
    #[serde(skip_serializing_if = "omit::is_empty_str")]
    pub tower_config: Option<String>,
    #[serde(skip_serializing_if = "omit::is_empty_str")]
    pub main_script: Option<String>,
    #[serde(skip_serializing_if = "omit::is_empty_str")]
    pub entry_name: Option<String>,
    #[serde(skip_serializing_if = "omit::is_empty_str")]
    pub schema_name: Option<String>,
    #[serde(skip_serializing_if = "omit::is_empty_str")]
    pub pre_run_script: Option<String>,
    #[serde(skip_serializing_if = "omit::is_empty_str")]
    pub post_run_script: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_secrets: Option<Vec<String>>,
    #[serde(rename = "labelsIds", skip_serializing_if = "Option::is_none")]
    pub label_ids: Option<Vec<i64>>,
}

impl LaunchSpec {
    pub fn new(
        compute_env_id: impl Into<String>,
        pipeline: impl Into<String>,
        work_dir: impl Into<String>,
    ) -> Self {
        Self {
            compute_env_id: compute_env_id.into(),
            pipeline: pipeline.into(),
            work_dir: work_dir.into(),
            ..Default::default()
        }
    }
}

/// Compute environment reference embedded in a launch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeEnvRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
}

/// Launch settings as stored by Tower
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Launch {
    pub id: Option<String>,
    pub compute_env: Option<ComputeEnvRef>,
    pub pipeline: Option<String>,
    pub work_dir: Option<String>,
    pub revision: Option<String>,
    pub config_profiles: Option<Vec<String>>,
    pub params_text: Option<String>,
    pub config_text: Option<String>,
    pub tower_config: Option<String>,
    pub main_script: Option<String>,
    pub entry_name: Option<String>,
    pub schema_name: Option<String>,
    pub pre_run_script: Option<String>,
    pub post_run_script: Option<String>,
    pub workspace_secrets: Option<Vec<String>>,
}

/// A saved pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    pub pipeline_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub launch: Option<Launch>,
}

#[derive(Serialize)]
struct CreatePipelineRequest<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    launch: &'a LaunchSpec,
}

#[derive(Serialize)]
struct UpdatePipelineRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    launch: &'a LaunchSpec,
}

#[derive(Deserialize)]
struct PipelineResponse {
    pipeline: Pipeline,
}

#[derive(Deserialize)]
struct LaunchResponse {
    launch: Launch,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchPipelinesResponse {
    #[serde(default)]
    pipelines: Vec<Pipeline>,
}

impl TowerClient {
    /// Create a pipeline, returning its id
    pub async fn create_pipeline(
        &self,
        workspace_id: i64,
        name: &str,
        description: Option<&str>,
        launch: &LaunchSpec,
    ) -> Result<i64> {
        let request = Request::post("/pipelines")
            .workspace(workspace_id)
            .json(&CreatePipelineRequest {
                name,
                description,
                launch,
            })?;
        let response: PipelineResponse = self.fetch(&request).await?;
        Ok(response.pipeline.pipeline_id)
    }

    /// Fetch a pipeline with its launch settings; `None` once deleted
    pub async fn get_pipeline(&self, workspace_id: i64, id: i64) -> Result<Option<Pipeline>> {
        let request = Request::get(format!("/pipelines/{id}")).workspace(workspace_id);
        let Some(response) = self
            .fetch_optional::<PipelineResponse>(Endpoint::PipelineById, &request)
            .await?
        else {
            return Ok(None);
        };

        let launch_request =
            Request::get(format!("/pipelines/{id}/launch")).workspace(workspace_id);
        let launch: LaunchResponse = self.fetch(&launch_request).await?;

        let mut pipeline = response.pipeline;
        pipeline.launch = Some(launch.launch);
        Ok(Some(pipeline))
    }

    /// Find a pipeline by exact name
    pub async fn get_pipeline_by_name(&self, workspace_id: i64, name: &str) -> Result<Option<Pipeline>> {
        let request = Request::get("/pipelines")
            .workspace(workspace_id)
            .query("search", name);
        let response: SearchPipelinesResponse = self.fetch(&request).await?;
        match response.pipelines.into_iter().find(|p| p.name == name) {
            Some(found) => self.get_pipeline(workspace_id, found.pipeline_id).await,
            None => Ok(None),
        }
    }

    pub async fn update_pipeline(
        &self,
        workspace_id: i64,
        id: i64,
        description: Option<&str>,
        launch: &LaunchSpec,
    ) -> Result<()> {
        let request = Request::put(format!("/pipelines/{id}"))
            .workspace(workspace_id)
            .json(&UpdatePipelineRequest {
                description,
                launch,
            })?;
        self.call(&request).await
    }

    pub async fn delete_pipeline(&self, workspace_id: i64, id: i64) -> Result<()> {
        self.call(&Request::delete(format!("/pipelines/{id}")).workspace(workspace_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_launch_spec_omits_unset_fields() {
        let mut launch = LaunchSpec::new("ce1", "https://github.com/nf-core/rnaseq", "s3://work");
        launch.label_ids = Some(vec![7, 42]);
        assert_eq!(
            serde_json::to_value(&launch).unwrap(),
            json!({
                "computeEnvId": "ce1",
                "pipeline": "https://github.com/nf-core/rnaseq",
                "workDir": "s3://work",
                "labelsIds": [7, 42]
            })
        );
    }

    #[test]
    fn test_launch_spec_omits_empty_strings() {
        let mut launch = LaunchSpec::new("ce1", "nf-core/rnaseq", "s3://work");
        launch.id = Some(String::new());
        launch.revision = Some(String::new());
        launch.config_text = Some("process.cpus = 2".to_string());
        launch.pre_run_script = Some(String::new());
        launch.config_profiles = Some(Vec::new());
        assert_eq!(
            serde_json::to_value(&launch).unwrap(),
            json!({
                "computeEnvId": "ce1",
                "pipeline": "nf-core/rnaseq",
                "workDir": "s3://work",
                "configText": "process.cpus = 2",
                "configProfiles": []
            })
        );
    }

    #[test]
    fn test_launch_tolerates_sparse_records() {
        let launch: Launch = serde_json::from_value(json!({
            "computeEnv": {"id": "ce1", "name": "batch"},
            "pipeline": "nf-core/rnaseq",
            "configProfiles": ["test"]
        }))
        .unwrap();
        assert_eq!(launch.compute_env.unwrap().id, "ce1");
        assert_eq!(launch.config_profiles, Some(vec!["test".to_string()]));
        assert_eq!(launch.work_dir, None);
    }
}
