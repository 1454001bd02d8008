//! Tower Organization Members

use crate::tower::classify::{Classified, Endpoint};
use crate::tower::client::TowerClient;
use crate::tower::error::Result;
use crate::tower::http::Request;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Organization-level role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrgRole {
    Owner,
    Member,
    Collaborator,
}

impl OrgRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Member => "member",
            Self::Collaborator => "collaborator",
        }
    }
}

impl fmt::Display for OrgRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrgRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "owner" => Ok(Self::Owner),
            "member" => Ok(Self::Member),
            "collaborator" => Ok(Self::Collaborator),
            other => Err(format!("unknown organization role: {other}")),
        }
    }
}

/// A member of the client's organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationMember {
    pub member_id: i64,
    pub email: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    pub role: OrgRole,
}

#[derive(Serialize)]
struct AddMemberRequest<'a> {
    user: &'a str,
}

#[derive(Deserialize)]
struct AddMemberResponse {
    member: OrganizationMember,
}

#[derive(Deserialize)]
struct ListMembersResponse {
    #[serde(default)]
    members: Vec<OrganizationMember>,
}

#[derive(Serialize)]
struct RoleRequest {
    role: OrgRole,
}

impl TowerClient {
    /// Invite a user by email. An already-member conflict yields
    /// `Classified::Exists`.
    pub(crate) async fn add_organization_member(
        &self,
        email: &str,
    ) -> Result<Classified<OrganizationMember>> {
        let request =
            Request::put(self.org_path("/members/add")).json(&AddMemberRequest { user: email })?;
        match self.send_classified(Endpoint::OrgMemberAdd, &request).await? {
            Classified::Value(payload) => {
                let response: AddMemberResponse = payload.into_json()?;
                Ok(Classified::Value(response.member))
            }
            Classified::Absent => Ok(Classified::Absent),
            Classified::Exists => Ok(Classified::Exists),
        }
    }

    /// Full membership listing
    pub async fn list_organization_members(&self) -> Result<Vec<OrganizationMember>> {
        let response: ListMembersResponse =
            self.fetch(&Request::get(self.org_path("/members"))).await?;
        Ok(response.members)
    }

    /// Find a member by exact email
    pub async fn get_organization_member(&self, email: &str) -> Result<Option<OrganizationMember>> {
        let request = Request::get(self.org_path("/members")).query("search", email);
        let response: ListMembersResponse = self.fetch(&request).await?;
        Ok(response.members.into_iter().find(|m| m.email == email))
    }

    pub async fn update_organization_member_role(&self, member_id: i64, role: OrgRole) -> Result<()> {
        let request = Request::put(self.org_path(&format!("/members/{member_id}/role")))
            .json(&RoleRequest { role })?;
        self.call(&request).await
    }

    pub async fn delete_organization_member(&self, member_id: i64) -> Result<()> {
        self.call(&Request::delete(self.org_path(&format!("/members/{member_id}"))))
            .await
    }
}
