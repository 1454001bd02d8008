//! Tower Credentials
//!
//! Provider-specific secret material scoped to a workspace.

use crate::tower::classify::Endpoint;
use crate::tower::client::TowerClient;
use crate::tower::error::{Result, TowerError};
use crate::tower::http::Request;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Secret keys, one shape per provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CredentialKeys {
    #[serde(rename_all = "camelCase")]
    Aws {
        access_key: String,
        secret_key: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        assume_role_arn: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ContainerRegistry {
        user_name: String,
        password: String,
        registry: String,
    },
    Github {
        #[serde(skip)]
        base_url: Option<String>,
        username: String,
        #[serde(rename = "password")]
        access_token: String,
    },
    Gitlab {
        #[serde(skip)]
        base_url: Option<String>,
        username: String,
        password: String,
        token: String,
    },
    #[serde(rename_all = "camelCase")]
    Ssh {
        private_key: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        passphrase: Option<String>,
    },
}

impl CredentialKeys {
    /// Tower provider discriminator
    pub fn provider(&self) -> &'static str {
        match self {
            Self::Aws { .. } => "aws",
            Self::ContainerRegistry { .. } => "container-reg",
            Self::Github { .. } => "github",
            Self::Gitlab { .. } => "gitlab",
            Self::Ssh { .. } => "ssh",
        }
    }

    /// Git server URL, sent beside the keys rather than inside them
    pub fn base_url(&self) -> Option<&str> {
        match self {
            Self::Github { base_url, .. } | Self::Gitlab { base_url, .. } => base_url.as_deref(),
            _ => None,
        }
    }
}

/// Stored credentials, as returned by Tower (secret keys are never echoed)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub id: String,
    pub name: String,
    pub provider: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub deleted: Option<bool>,
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    /// Non-secret key fields, e.g. the AWS access key id
    #[serde(default)]
    pub keys: Option<Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CredentialsBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    provider: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    base_url: Option<&'a str>,
    keys: &'a CredentialKeys,
}

#[derive(Serialize)]
struct CredentialsRequest<'a> {
    credentials: CredentialsBody<'a>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCredentialsResponse {
    credentials_id: String,
}

#[derive(Deserialize)]
struct CredentialsResponse {
    credentials: Credentials,
}

#[derive(Deserialize)]
struct ListCredentialsResponse {
    #[serde(default)]
    credentials: Vec<Credentials>,
}

impl TowerClient {
    /// Store new credentials, returning their id
    pub async fn create_credentials(
        &self,
        workspace_id: i64,
        name: &str,
        description: Option<&str>,
        keys: &CredentialKeys,
    ) -> Result<String> {
        let body = CredentialsRequest {
            credentials: CredentialsBody {
                id: None,
                name: Some(name),
                description,
                provider: keys.provider(),
                base_url: keys.base_url(),
                keys,
            },
        };
        let request = Request::post("/credentials")
            .workspace(workspace_id)
            .json(&body)?;
        let response: CreateCredentialsResponse = self.fetch(&request).await?;
        Ok(response.credentials_id)
    }

    /// Fetch credentials by id; `None` when they have been deleted
    pub async fn get_credentials(&self, workspace_id: i64, id: &str) -> Result<Option<Credentials>> {
        let request = Request::get(format!("/credentials/{id}")).workspace(workspace_id);
        let response: Option<CredentialsResponse> =
            self.fetch_optional(Endpoint::CredentialsById, &request).await?;
        Ok(response.map(|r| r.credentials))
    }

    pub async fn list_credentials(&self, workspace_id: i64) -> Result<Vec<Credentials>> {
        let request = Request::get("/credentials").workspace(workspace_id);
        let response: ListCredentialsResponse = self.fetch(&request).await?;
        Ok(response.credentials)
    }

    pub async fn get_credentials_by_name(&self, workspace_id: i64, name: &str) -> Result<Credentials> {
        let not_found = || TowerError::NotFound {
            kind: "credentials",
            name: name.to_string(),
        };
        let summary = self
            .list_credentials(workspace_id)
            .await?
            .into_iter()
            .find(|c| c.name == name)
            .ok_or_else(not_found)?;
        self.get_credentials(workspace_id, &summary.id)
            .await?
            .ok_or_else(not_found)
    }

    /// Replace the keys and description of existing credentials
    pub async fn update_credentials(
        &self,
        workspace_id: i64,
        id: &str,
        description: Option<&str>,
        keys: &CredentialKeys,
    ) -> Result<()> {
        let body = CredentialsRequest {
            credentials: CredentialsBody {
                id: Some(id),
                name: None,
                description,
                provider: keys.provider(),
                base_url: keys.base_url(),
                keys,
            },
        };
        let request = Request::put(format!("/credentials/{id}"))
            .workspace(workspace_id)
            .json(&body)?;
        self.call(&request).await
    }

    pub async fn delete_credentials(&self, workspace_id: i64, id: &str) -> Result<()> {
        self.call(&Request::delete(format!("/credentials/{id}")).workspace(workspace_id))
            .await
    }
}
