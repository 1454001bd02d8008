//! Tower Organizations
//!
//! Listing and name resolution. The organization id is resolved once when a
//! client connects and then fixed for the client's lifetime.

use crate::tower::client::TowerClient;
use crate::tower::error::{Result, TowerError};
use crate::tower::http::Request;
use serde::{Deserialize, Serialize};

/// Organization information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub org_id: i64,
    pub name: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListOrganizationsResponse {
    #[serde(default)]
    organizations: Vec<Organization>,
}

impl TowerClient {
    /// List organizations visible to the token
    pub async fn list_organizations(&self) -> Result<Vec<Organization>> {
        let response: ListOrganizationsResponse = self.fetch(&Request::get("/orgs")).await?;
        Ok(response.organizations)
    }

    /// Resolve an organization name to its id (exact, case-sensitive match)
    pub async fn resolve_organization_id(&self, name: &str) -> Result<i64> {
        tracing::debug!("Resolving organization id for {}", name);
        self.list_organizations()
            .await?
            .into_iter()
            .find(|org| org.name == name)
            .map(|org| org.org_id)
            .ok_or_else(|| TowerError::OrganizationNotFound(name.to_string()))
    }
}
