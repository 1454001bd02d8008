//! Tower Actions
//!
//! Webhook or GitHub triggered launches. Label names are ensured before
//! every write so the launch can reference their ids.

use super::labels::Label;
use super::pipelines::{Launch, LaunchSpec};
use crate::tower::client::TowerClient;
use crate::tower::error::Result;
use crate::tower::http::Request;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What triggers an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionSource {
    Github,
    Tower,
}

/// A pipeline action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub id: String,
    pub name: String,
    pub source: ActionSource,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub hook_id: Option<String>,
    #[serde(default)]
    pub hook_url: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub launch: Option<Launch>,
    #[serde(default)]
    pub labels: Vec<Label>,
}

#[derive(Serialize)]
struct CreateActionRequest<'a> {
    name: &'a str,
    source: ActionSource,
    launch: &'a LaunchSpec,
}

#[derive(Serialize)]
struct UpdateActionRequest<'a> {
    launch: &'a LaunchSpec,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateActionResponse {
    action_id: String,
}

#[derive(Deserialize)]
struct ActionResponse {
    action: Action,
}

impl TowerClient {
    /// Create an action, ensuring its labels first. Returns the action id.
    pub async fn create_action<S: AsRef<str>>(
        &self,
        workspace_id: i64,
        name: &str,
        source: ActionSource,
        launch: &LaunchSpec,
        labels: &[S],
    ) -> Result<String> {
        let launch = self.labelled(workspace_id, launch, labels).await?;
        let request = Request::post("/actions")
            .workspace(workspace_id)
            .json(&CreateActionRequest {
                name,
                source,
                launch: &launch,
            })?;
        let response: CreateActionResponse = self.fetch(&request).await?;
        Ok(response.action_id)
    }

    pub async fn get_action(&self, workspace_id: i64, id: &str) -> Result<Action> {
        let request = Request::get(format!("/actions/{id}"))
            .workspace(workspace_id)
            .query("attributes", "labels");
        let response: ActionResponse = self.fetch(&request).await?;
        Ok(response.action)
    }

    /// Replace an action's launch. `launch.id` must carry the existing launch id.
    pub async fn update_action<S: AsRef<str>>(
        &self,
        workspace_id: i64,
        id: &str,
        launch: &LaunchSpec,
        labels: &[S],
    ) -> Result<()> {
        let launch = self.labelled(workspace_id, launch, labels).await?;
        let request = Request::put(format!("/actions/{id}"))
            .workspace(workspace_id)
            .json(&UpdateActionRequest { launch: &launch })?;
        self.call(&request).await
    }

    pub async fn delete_action(&self, workspace_id: i64, id: &str) -> Result<()> {
        self.call(&Request::delete(format!("/actions/{id}")).workspace(workspace_id))
            .await
    }

    async fn labelled<S: AsRef<str>>(
        &self,
        workspace_id: i64,
        launch: &LaunchSpec,
        labels: &[S],
    ) -> Result<LaunchSpec> {
        let ids = self
            .ensure_labels(workspace_id, labels)
            .await?
            .into_iter()
            .map(|label| label.id)
            .collect();
        Ok(LaunchSpec {
            label_ids: Some(ids),
            ..launch.clone()
        })
    }
}
