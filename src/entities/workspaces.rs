//! Tower Workspaces

use crate::tower::client::TowerClient;
use crate::tower::error::{Result, TowerError};
use crate::tower::http::Request;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who can see a workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkspaceVisibility {
    Private,
    Shared,
}

/// Workspace information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub visibility: WorkspaceVisibility,
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Fields for a new workspace
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkspace {
    pub name: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub visibility: WorkspaceVisibility,
}

/// Mutable workspace fields
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceUpdate {
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub visibility: WorkspaceVisibility,
}

#[derive(Serialize)]
struct CreateWorkspaceRequest<'a> {
    workspace: &'a NewWorkspace,
}

#[derive(Deserialize)]
struct WorkspaceResponse {
    workspace: Workspace,
}

#[derive(Deserialize)]
struct ListWorkspacesResponse {
    #[serde(default)]
    workspaces: Vec<Workspace>,
}

impl TowerClient {
    /// Create a workspace in the client's organization
    pub async fn create_workspace(&self, workspace: &NewWorkspace) -> Result<Workspace> {
        let request = Request::post(self.org_path("/workspaces"))
            .json(&CreateWorkspaceRequest { workspace })?;
        let response: WorkspaceResponse = self.fetch(&request).await?;
        Ok(response.workspace)
    }

    pub async fn get_workspace(&self, id: i64) -> Result<Workspace> {
        let request = Request::get(self.org_path(&format!("/workspaces/{id}")));
        let response: WorkspaceResponse = self.fetch(&request).await?;
        Ok(response.workspace)
    }

    pub async fn list_workspaces(&self) -> Result<Vec<Workspace>> {
        let response: ListWorkspacesResponse =
            self.fetch(&Request::get(self.org_path("/workspaces"))).await?;
        Ok(response.workspaces)
    }

    /// Find a workspace by its short name
    pub async fn get_workspace_by_name(&self, name: &str) -> Result<Workspace> {
        let summary = self
            .list_workspaces()
            .await?
            .into_iter()
            .find(|w| w.name == name)
            .ok_or_else(|| TowerError::NotFound {
                kind: "workspace",
                name: name.to_string(),
            })?;
        self.get_workspace(summary.id).await
    }

    pub async fn update_workspace(&self, id: i64, update: &WorkspaceUpdate) -> Result<()> {
        let request =
            Request::put(self.org_path(&format!("/workspaces/{id}"))).json(update)?;
        self.call(&request).await
    }

    pub async fn delete_workspace(&self, id: i64) -> Result<()> {
        self.call(&Request::delete(self.org_path(&format!("/workspaces/{id}"))))
            .await
    }
}
