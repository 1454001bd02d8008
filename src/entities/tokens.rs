//! Tower Personal Access Tokens

use crate::tower::client::TowerClient;
use crate::tower::error::{Result, TowerError};
use crate::tower::http::Request;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token metadata; the secret is only returned at creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiToken {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub basic_auth: Option<String>,
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
}

/// A freshly created token with its secret access key
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedToken {
    pub token: ApiToken,
    pub access_key: String,
}

impl std::fmt::Debug for CreatedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreatedToken")
            .field("token", &self.token)
            .field("access_key", &"***")
            .finish()
    }
}

#[derive(Serialize)]
struct CreateTokenRequest<'a> {
    name: &'a str,
}

#[derive(Deserialize)]
struct ListTokensResponse {
    #[serde(default)]
    tokens: Vec<ApiToken>,
}

impl TowerClient {
    pub async fn create_token(&self, name: &str) -> Result<CreatedToken> {
        let request = Request::post("/tokens").json(&CreateTokenRequest { name })?;
        self.fetch(&request).await
    }

    pub async fn list_tokens(&self) -> Result<Vec<ApiToken>> {
        let response: ListTokensResponse = self.fetch(&Request::get("/tokens")).await?;
        Ok(response.tokens)
    }

    pub async fn get_token(&self, id: i64) -> Result<ApiToken> {
        self.list_tokens()
            .await?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| TowerError::NotFound {
                kind: "token",
                name: id.to_string(),
            })
    }

    pub async fn delete_token(&self, id: i64) -> Result<()> {
        self.call(&Request::delete(format!("/tokens/{id}"))).await
    }
}
