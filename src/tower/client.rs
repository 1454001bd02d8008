//! Tower Client
//!
//! Main client for the Tower API, combining the HTTP transport with the
//! immutable per-client configuration (base URL, token, user agent and the
//! organization id resolved once at construction).

use super::auth::AccessToken;
use super::classify::{classify, Classified, Endpoint};
use super::error::{Result, TowerError};
use super::http::{CallScope, Request, Response, TowerHttpClient, DEFAULT_ATTEMPT_TIMEOUT};
use super::payload::Payload;
use super::retry::RetryPolicy;
use crate::compute_env::PlatformRegistry;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Default API endpoint
pub const DEFAULT_API_URL: &str = "https://api.tower.nf";

/// Default user agent
pub const DEFAULT_USER_AGENT: &str = concat!("nftower/", env!("CARGO_PKG_VERSION"));

/// Fixed configuration of a constructed client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub token: AccessToken,
    pub user_agent: String,
    pub organization_id: i64,
}

/// Builder for [`TowerClient`]
#[derive(Debug, Clone)]
pub struct TowerClientBuilder {
    api_url: String,
    token: String,
    user_agent: String,
    organization: Option<String>,
    attempt_timeout: Duration,
    retry: RetryPolicy,
    platforms: Option<Arc<PlatformRegistry>>,
    cancel: Option<CancellationToken>,
}

impl TowerClientBuilder {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: token.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            organization: None,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            retry: RetryPolicy::default(),
            platforms: None,
            cancel: None,
        }
    }

    pub fn api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Organization name to resolve on [`connect`](Self::connect).
    pub fn organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Compute environment platforms understood by the client.
    /// Defaults to the built-in set.
    pub fn platforms(mut self, registry: PlatformRegistry) -> Self {
        self.platforms = Some(Arc::new(registry));
        self
    }

    /// Token that aborts every call made by the client, including the
    /// organization lookup in [`connect`](Self::connect).
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn scoped(&self, client: TowerClient) -> TowerClient {
        match &self.cancel {
            Some(token) => client.with_cancellation(token.clone()),
            None => client,
        }
    }

    fn registry(&self) -> Arc<PlatformRegistry> {
        self.platforms
            .clone()
            .unwrap_or_else(|| Arc::new(PlatformRegistry::with_defaults()))
    }

    fn transport(&self) -> Result<(TowerHttpClient, Url, AccessToken)> {
        let base_url = parse_base_url(&self.api_url)?;
        let token = AccessToken::new(&self.token)?;
        let http = TowerHttpClient::new(
            base_url.clone(),
            token.clone(),
            &self.user_agent,
            self.attempt_timeout,
            self.retry.clone(),
        )?;
        Ok((http, base_url, token))
    }

    /// Build a client for a known organization id, without any network call.
    pub fn build_with_organization_id(self, organization_id: i64) -> Result<TowerClient> {
        let (http, base_url, token) = self.transport()?;
        let platforms = self.registry();
        let client = TowerClient::from_parts(
            http,
            ClientConfig {
                base_url,
                token,
                user_agent: self.user_agent.clone(),
                organization_id,
            },
            platforms,
        );
        Ok(self.scoped(client))
    }

    /// Build the client, resolving the organization name to its id.
    pub async fn connect(self) -> Result<TowerClient> {
        let organization = self.organization.clone().ok_or_else(|| {
            TowerError::InvalidConfig("an organization name is required".to_string())
        })?;
        let (http, base_url, token) = self.transport()?;
        let platforms = self.registry();

        // The listing endpoint is not organization scoped, so a placeholder id is fine here.
        let bootstrap = self.scoped(TowerClient::from_parts(
            http.clone(),
            ClientConfig {
                base_url: base_url.clone(),
                token: token.clone(),
                user_agent: self.user_agent.clone(),
                organization_id: -1,
            },
            platforms.clone(),
        ));
        let organization_id = bootstrap.resolve_organization_id(&organization).await?;
        tracing::info!(
            "Resolved organization '{}' to id {}",
            organization,
            organization_id
        );

        let client = TowerClient::from_parts(
            http,
            ClientConfig {
                base_url,
                token,
                user_agent: self.user_agent.clone(),
                organization_id,
            },
            platforms,
        );
        Ok(self.scoped(client))
    }
}

fn parse_base_url(api_url: &str) -> Result<Url> {
    let url = Url::parse(api_url)
        .map_err(|e| TowerError::InvalidConfig(format!("invalid API URL {api_url}: {e}")))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(TowerError::InvalidConfig(format!(
            "API URL must start with http:// or https://, got: {api_url}"
        )));
    }
    Ok(url)
}

/// Main Tower client
///
/// Cheap to clone. The configuration never changes after construction, so
/// clones can be shared freely across tasks.
#[derive(Debug, Clone)]
pub struct TowerClient {
    http: TowerHttpClient,
    config: Arc<ClientConfig>,
    platforms: Arc<PlatformRegistry>,
    scope: CallScope,
}

impl TowerClient {
    pub fn builder(token: impl Into<String>) -> TowerClientBuilder {
        TowerClientBuilder::new(token)
    }

    fn from_parts(
        http: TowerHttpClient,
        config: ClientConfig,
        platforms: Arc<PlatformRegistry>,
    ) -> Self {
        Self {
            http,
            config: Arc::new(config),
            platforms,
            scope: CallScope::new(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn organization_id(&self) -> i64 {
        self.config.organization_id
    }

    pub fn platforms(&self) -> &PlatformRegistry {
        &self.platforms
    }

    /// A handle whose calls abort when `token` is cancelled.
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            scope: self.scope.clone().with_cancellation(token),
            ..self.clone()
        }
    }

    /// A handle whose calls fail with a timeout once `deadline` passes.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        Self {
            scope: self.scope.clone().with_deadline(deadline),
            ..self.clone()
        }
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn scope(&self) -> &CallScope {
        &self.scope
    }

    /// Execute a request and return the raw exchange.
    pub async fn execute(&self, request: &Request) -> Result<Response> {
        self.http.execute(request, &self.scope).await
    }

    /// Execute a request and decode the response body.
    pub async fn send(&self, request: &Request) -> Result<Payload> {
        self.http.send(request, &self.scope).await
    }

    /// Execute a request and decode a JSON response into `T`.
    pub async fn fetch<T: DeserializeOwned>(&self, request: &Request) -> Result<T> {
        self.send(request).await?.into_json()
    }

    /// Execute a request, discarding any response body.
    pub async fn call(&self, request: &Request) -> Result<()> {
        self.send(request).await.map(|_| ())
    }

    /// Execute a request and interpret error statuses for `endpoint`.
    pub(crate) async fn send_classified(
        &self,
        endpoint: Endpoint,
        request: &Request,
    ) -> Result<Classified<Payload>> {
        classify(endpoint, self.send(request).await)
    }

    /// Fetch-by-id where a soft-deleted record answers 403.
    pub(crate) async fn fetch_optional<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        request: &Request,
    ) -> Result<Option<T>> {
        match self.send_classified(endpoint, request).await?.into_option() {
            Some(payload) => Ok(Some(payload.into_json()?)),
            None => Ok(None),
        }
    }

    /// Path under the client's organization.
    pub(crate) fn org_path(&self, suffix: &str) -> String {
        format!("/orgs/{}{}", self.config.organization_id, suffix)
    }
}
