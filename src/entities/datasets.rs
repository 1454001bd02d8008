//! Tower Datasets
//!
//! Datasets are workspace-scoped tables. Every upload creates a new
//! version; versions are immutable and fetched back by file name.

use crate::tower::client::TowerClient;
use crate::tower::error::{Result, TowerError};
use crate::tower::http::Request;
use crate::tower::payload::Payload;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{Read, Seek};

/// Dataset metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

/// One uploaded version of a dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetVersion {
    #[serde(default)]
    pub dataset_id: Option<String>,
    pub version: i64,
    pub file_name: String,
    #[serde(default)]
    pub has_header: bool,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct DatasetRequest<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

#[derive(Deserialize)]
struct DatasetResponse {
    dataset: Dataset,
}

#[derive(Deserialize)]
struct ListDatasetsResponse {
    #[serde(default)]
    datasets: Vec<Dataset>,
}

#[derive(Deserialize)]
struct VersionResponse {
    version: DatasetVersion,
}

#[derive(Deserialize)]
struct ListVersionsResponse {
    #[serde(default)]
    versions: Vec<DatasetVersion>,
}

fn datasets_path(workspace_id: i64) -> String {
    format!("/workspaces/{workspace_id}/datasets")
}

impl TowerClient {
    pub async fn create_dataset(
        &self,
        workspace_id: i64,
        name: &str,
        description: Option<&str>,
    ) -> Result<Dataset> {
        let request =
            Request::post(datasets_path(workspace_id)).json(&DatasetRequest { name, description })?;
        let response: DatasetResponse = self.fetch(&request).await?;
        Ok(response.dataset)
    }

    pub async fn get_dataset(&self, workspace_id: i64, id: &str) -> Result<Dataset> {
        let request = Request::get(format!("{}/{id}/metadata", datasets_path(workspace_id)));
        let response: DatasetResponse = self.fetch(&request).await?;
        Ok(response.dataset)
    }

    pub async fn list_datasets(&self, workspace_id: i64) -> Result<Vec<Dataset>> {
        let response: ListDatasetsResponse =
            self.fetch(&Request::get(datasets_path(workspace_id))).await?;
        Ok(response.datasets)
    }

    pub async fn get_dataset_by_name(&self, workspace_id: i64, name: &str) -> Result<Dataset> {
        self.list_datasets(workspace_id)
            .await?
            .into_iter()
            .find(|d| d.name == name)
            .ok_or_else(|| TowerError::NotFound {
                kind: "dataset",
                name: name.to_string(),
            })
    }

    pub async fn update_dataset(
        &self,
        workspace_id: i64,
        id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<()> {
        let request = Request::put(format!("{}/{id}", datasets_path(workspace_id)))
            .json(&DatasetRequest { name, description })?;
        self.call(&request).await
    }

    pub async fn delete_dataset(&self, workspace_id: i64, id: &str) -> Result<()> {
        self.call(&Request::delete(format!("{}/{id}", datasets_path(workspace_id))))
            .await
    }

    /// Upload file contents as a new dataset version.
    ///
    /// The content type of the part is sniffed from the leading bytes of
    /// `contents`, which is rewound before the full read.
    pub async fn upload_dataset_version<R: Read + Seek>(
        &self,
        workspace_id: i64,
        dataset_id: &str,
        contents: R,
        file_name: &str,
        has_header: bool,
    ) -> Result<DatasetVersion> {
        let request = Request::post(format!("{}/{dataset_id}/upload", datasets_path(workspace_id)))
            .query("header", has_header)
            .file(contents, file_name)?;
        let response: VersionResponse = self.fetch(&request).await?;
        tracing::info!(
            "Uploaded {} as version {} of dataset {}",
            file_name,
            response.version.version,
            dataset_id
        );
        Ok(response.version)
    }

    pub async fn list_dataset_versions(
        &self,
        workspace_id: i64,
        dataset_id: &str,
    ) -> Result<Vec<DatasetVersion>> {
        let request = Request::get(format!("{}/{dataset_id}/versions", datasets_path(workspace_id)));
        let response: ListVersionsResponse = self.fetch(&request).await?;
        Ok(response.versions)
    }

    /// Raw bytes of one dataset version
    pub async fn get_dataset_content(
        &self,
        workspace_id: i64,
        dataset_id: &str,
        version: i64,
        file_name: &str,
    ) -> Result<Bytes> {
        let request = Request::get(format!(
            "{}/{dataset_id}/v/{version}/n/{}",
            datasets_path(workspace_id),
            urlencoding::encode(file_name)
        ));
        // Served bytes are returned untouched, whatever the declared type.
        let response = self.execute(&request).await?;
        if response.status.as_u16() > 399 {
            return response.into_payload().map(Payload::into_bytes);
        }
        Ok(response.body)
    }

    /// Look up a version and fetch its contents
    pub async fn get_dataset_version(
        &self,
        workspace_id: i64,
        dataset_id: &str,
        version: i64,
    ) -> Result<(DatasetVersion, Bytes)> {
        let found = self
            .list_dataset_versions(workspace_id, dataset_id)
            .await?
            .into_iter()
            .find(|v| v.version == version)
            .ok_or_else(|| TowerError::NotFound {
                kind: "dataset version",
                name: format!("{dataset_id}@{version}"),
            })?;
        let contents = self
            .get_dataset_content(workspace_id, dataset_id, version, &found.file_name)
            .await?;
        Ok((found, contents))
    }
}
