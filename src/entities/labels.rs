//! Tower Labels

use crate::tower::classify::{Classified, Endpoint};
use crate::tower::client::TowerClient;
use crate::tower::error::Result;
use crate::tower::http::Request;
use serde::{Deserialize, Serialize};

/// A workspace label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub resource: bool,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Serialize)]
struct CreateLabelRequest<'a> {
    name: &'a str,
}

#[derive(Deserialize)]
struct ListLabelsResponse {
    #[serde(default)]
    labels: Vec<Label>,
}

impl TowerClient {
    /// Create a label. A conflict means it already exists and yields
    /// `Classified::Exists`. The response body is ignored, since the id
    /// comes from the listing afterwards.
    pub(crate) async fn create_label(
        &self,
        workspace_id: i64,
        name: &str,
    ) -> Result<Classified<()>> {
        let request = Request::post("/labels")
            .workspace(workspace_id)
            .json(&CreateLabelRequest { name })?;
        let outcome = self
            .send_classified(Endpoint::LabelCreate, &request)
            .await?;
        Ok(match outcome {
            Classified::Value(_) => Classified::Value(()),
            Classified::Absent => Classified::Absent,
            Classified::Exists => Classified::Exists,
        })
    }

    pub async fn list_labels(&self, workspace_id: i64) -> Result<Vec<Label>> {
        let request = Request::get("/labels").workspace(workspace_id);
        let response: ListLabelsResponse = self.fetch(&request).await?;
        Ok(response.labels)
    }

    pub async fn delete_label(&self, workspace_id: i64, id: i64) -> Result<()> {
        self.call(&Request::delete(format!("/labels/{id}")).workspace(workspace_id))
            .await
    }
}
