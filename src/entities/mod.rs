//! Tower entities
//!
//! Typed create, read, update and delete operations, one module per
//! resource. Every operation is an inherent method on
//! [`TowerClient`](crate::TowerClient); workspace-scoped calls take the
//! workspace id explicitly.

pub mod actions;
pub mod compute_envs;
pub mod credentials;
pub mod datasets;
pub mod labels;
pub mod org_members;
pub mod organizations;
pub mod participants;
pub mod pipeline_secrets;
pub mod pipelines;
pub mod tokens;
pub mod workspaces;

pub use actions::{Action, ActionSource};
pub use compute_envs::{ComputeEnvSummary, NewComputeEnv};
pub use credentials::{CredentialKeys, Credentials};
pub use datasets::{Dataset, DatasetVersion};
pub use labels::Label;
pub use org_members::{OrgRole, OrganizationMember};
pub use organizations::Organization;
pub use participants::{ParticipantRef, WorkspaceParticipant, WorkspaceRole};
pub use pipeline_secrets::PipelineSecret;
pub use pipelines::{ComputeEnvRef, Launch, LaunchSpec, Pipeline};
pub use tokens::{ApiToken, CreatedToken};
pub use workspaces::{NewWorkspace, Workspace, WorkspaceUpdate, WorkspaceVisibility};
