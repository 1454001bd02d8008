//! Tower Workspace Participants

use crate::tower::classify::{Classified, Endpoint};
use crate::tower::client::TowerClient;
use crate::tower::error::Result;
use crate::tower::http::Request;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Workspace-level role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceRole {
    Owner,
    Admin,
    Maintain,
    Launch,
    View,
}

impl WorkspaceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Maintain => "maintain",
            Self::Launch => "launch",
            Self::View => "view",
        }
    }
}

impl fmt::Display for WorkspaceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkspaceRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "maintain" => Ok(Self::Maintain),
            "launch" => Ok(Self::Launch),
            "view" => Ok(Self::View),
            other => Err(format!("unknown workspace role: {other}")),
        }
    }
}

/// How a participant is identified when added
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantRef {
    MemberId(i64),
    Email(String),
}

impl fmt::Display for ParticipantRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MemberId(id) => write!(f, "member {id}"),
            Self::Email(email) => f.write_str(email),
        }
    }
}

/// A workspace participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceParticipant {
    pub participant_id: i64,
    #[serde(default)]
    pub member_id: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(rename = "wspRole")]
    pub role: WorkspaceRole,
}

impl WorkspaceParticipant {
    pub fn matches(&self, reference: &ParticipantRef) -> bool {
        match reference {
            ParticipantRef::MemberId(id) => self.member_id == Some(*id),
            ParticipantRef::Email(email) => self.email.as_deref() == Some(email.as_str()),
        }
    }
}

#[derive(Serialize)]
enum AddParticipantRequest<'a> {
    #[serde(rename = "memberId")]
    MemberId(i64),
    #[serde(rename = "userNameOrEmail")]
    Email(&'a str),
}

#[derive(Deserialize)]
struct AddParticipantResponse {
    participant: WorkspaceParticipant,
}

#[derive(Deserialize)]
struct ListParticipantsResponse {
    #[serde(default)]
    participants: Vec<WorkspaceParticipant>,
}

#[derive(Serialize)]
struct RoleRequest {
    role: WorkspaceRole,
}

impl TowerClient {
    fn participants_path(&self, workspace_id: i64) -> String {
        self.org_path(&format!("/workspaces/{workspace_id}/participants"))
    }

    /// Add a participant. An already-participant conflict yields
    /// `Classified::Exists`.
    pub(crate) async fn add_workspace_participant(
        &self,
        workspace_id: i64,
        participant: &ParticipantRef,
    ) -> Result<Classified<WorkspaceParticipant>> {
        let body = match participant {
            ParticipantRef::MemberId(id) => AddParticipantRequest::MemberId(*id),
            ParticipantRef::Email(email) => AddParticipantRequest::Email(email),
        };
        let request =
            Request::put(format!("{}/add", self.participants_path(workspace_id))).json(&body)?;
        match self.send_classified(Endpoint::ParticipantAdd, &request).await? {
            Classified::Value(payload) => {
                let response: AddParticipantResponse = payload.into_json()?;
                Ok(Classified::Value(response.participant))
            }
            Classified::Absent => Ok(Classified::Absent),
            Classified::Exists => Ok(Classified::Exists),
        }
    }

    /// List participants, optionally filtered by a server-side search term
    pub async fn list_workspace_participants(
        &self,
        workspace_id: i64,
        search: Option<&str>,
    ) -> Result<Vec<WorkspaceParticipant>> {
        let mut request = Request::get(self.participants_path(workspace_id));
        if let Some(search) = search {
            request = request.query("search", search);
        }
        let response: ListParticipantsResponse = self.fetch(&request).await?;
        Ok(response.participants)
    }

    /// Find a participant by member id or exact email.
    ///
    /// Member ids are matched against the full listing; emails go through
    /// the search filter and are then matched exactly.
    pub async fn get_workspace_participant(
        &self,
        workspace_id: i64,
        participant: &ParticipantRef,
    ) -> Result<Option<WorkspaceParticipant>> {
        let search = match participant {
            ParticipantRef::MemberId(_) => None,
            ParticipantRef::Email(email) => Some(email.as_str()),
        };
        Ok(self
            .list_workspace_participants(workspace_id, search)
            .await?
            .into_iter()
            .find(|p| p.matches(participant)))
    }

    pub async fn update_workspace_participant_role(
        &self,
        workspace_id: i64,
        participant_id: i64,
        role: WorkspaceRole,
    ) -> Result<()> {
        let request = Request::put(format!(
            "{}/{participant_id}/role",
            self.participants_path(workspace_id)
        ))
        .json(&RoleRequest { role })?;
        self.call(&request).await
    }

    pub async fn delete_workspace_participant(&self, workspace_id: i64, participant_id: i64) -> Result<()> {
        let request = Request::delete(format!(
            "{}/{participant_id}",
            self.participants_path(workspace_id)
        ));
        self.call(&request).await
    }
}
