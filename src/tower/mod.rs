//! Tower API interaction module
//!
//! This module provides the core functionality for talking to the Tower REST
//! API: authentication, the retrying HTTP transport, body encoding and the
//! endpoint-aware interpretation of error statuses.
//!
//! # Module Structure
//!
//! - [`auth`] - Bearer token handling
//! - [`client`] - Main Tower client and its builder
//! - [`http`] - Request/response transport with retries and cancellation
//! - [`payload`] - JSON and multipart encoding, response decoding
//! - [`classify`] - Per-endpoint status interpretation table
//! - [`retry`] - Retry policy
//! - [`error`] - Error types
//!
//! # Example
//!
//! ```no_run
//! use nftower::TowerClient;
//!
//! async fn example() -> nftower::Result<()> {
//!     let client = TowerClient::builder("my-token")
//!         .organization("my-org")
//!         .connect()
//!         .await?;
//!     let workspaces = client.list_workspaces().await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod classify;
pub mod client;
pub mod error;
pub mod http;
pub mod payload;
pub mod retry;
