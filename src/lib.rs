//! nftower - typed client for the Nextflow Tower REST API
//!
//! # Architecture
//!
//! - [`tower`] - transport, payload encoding, status classification, client
//! - [`compute_env`] - platform-specific compute environment configuration
//! - [`entities`] - per-resource operations on [`TowerClient`]
//! - [`reconcile`] - idempotent upserts for labels, members and participants

pub mod compute_env;
pub mod entities;
pub mod reconcile;
pub mod tower;

pub use compute_env::{
    default_registry, AwsBatchConfig, ComputeEnv, ComputeEnvConfig, CustomPlatformConfig,
    EnvironmentVariable, LsfPlatformConfig, Platform, PlatformRegistry, Visibility,
};
pub use entities::{
    Action, ActionSource, ApiToken, ComputeEnvRef, ComputeEnvSummary, CreatedToken,
    CredentialKeys, Credentials, Dataset, DatasetVersion, Label, Launch, LaunchSpec,
    NewComputeEnv, NewWorkspace, OrgRole, Organization, OrganizationMember, ParticipantRef,
    Pipeline, PipelineSecret, Workspace, WorkspaceParticipant, WorkspaceRole, WorkspaceUpdate,
    WorkspaceVisibility,
};
pub use reconcile::{ReconcileState, Reconciliation};
pub use tower::classify::{Disposition, Endpoint};
pub use tower::client::{
    ClientConfig, TowerClient, TowerClientBuilder, DEFAULT_API_URL, DEFAULT_USER_AGENT,
};
pub use tower::error::{ApiError, Result, TowerError};
pub use tower::http::{CallScope, Request, Response};
pub use tower::payload::Payload;
pub use tower::retry::RetryPolicy;
