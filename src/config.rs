//! Configuration Management
//!
//! Persistent settings for nftower, overridden by environment variables and
//! command-line flags (CLI > environment > config file > defaults).

use anyhow::{bail, Context, Result};
use nftower::{RetryPolicy, TowerClientBuilder, DEFAULT_API_URL, DEFAULT_USER_AGENT};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_API_URL: &str = "NFTOWER_API_URL";
pub const ENV_API_KEY: &str = "NFTOWER_API_KEY";
pub const ENV_ORGANIZATION: &str = "NFTOWER_ORGANIZATION";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Tower API endpoint
    pub api_url: Option<String>,
    /// Personal access token
    pub access_token: Option<String>,
    /// Organization name, resolved to an id on connect
    pub organization: Option<String>,
    pub user_agent: Option<String>,
    /// Per-attempt request timeout
    pub request_timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub access_token: Option<String>,
    pub organization: Option<String>,
}

impl Settings {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("nftower").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    /// Layer environment variables and CLI flags over the loaded file.
    pub fn resolve<F>(mut self, env: F, cli: Overrides) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        self.api_url = cli.api_url.or_else(|| env(ENV_API_URL)).or(self.api_url);
        self.access_token = cli
            .access_token
            .or_else(|| env(ENV_API_KEY))
            .or(self.access_token);
        self.organization = cli
            .organization
            .or_else(|| env(ENV_ORGANIZATION))
            .or(self.organization);
        self
    }

    /// Get effective API URL (CLI > env > config > default)
    pub fn effective_api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    pub fn effective_user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    /// Validate and turn the settings into a client builder.
    pub fn client_builder(&self) -> Result<TowerClientBuilder> {
        let Some(token) = self.access_token.as_deref() else {
            bail!("No access token configured. Set {ENV_API_KEY} or use --token");
        };
        let organization = self.organization.as_deref().with_context(|| {
            format!("No organization configured. Set {ENV_ORGANIZATION} or use --organization")
        })?;

        let mut builder = TowerClientBuilder::new(token)
            .api_url(self.effective_api_url())
            .user_agent(self.effective_user_agent())
            .organization(organization);
        if let Some(secs) = self.request_timeout_secs {
            builder = builder.attempt_timeout(Duration::from_secs(secs));
        }
        if let Some(max_retries) = self.max_retries {
            builder = builder.retry_policy(RetryPolicy::default().with_max_retries(max_retries));
        }
        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_cli_beats_env_beats_file() {
        let file = Settings {
            api_url: Some("https://file.example".into()),
            access_token: Some("file-token".into()),
            organization: Some("file-org".into()),
            ..Default::default()
        };
        let env = env_of(&[(ENV_API_URL, "https://env.example"), (ENV_API_KEY, "env-token")]);
        let cli = Overrides {
            access_token: Some("cli-token".into()),
            ..Default::default()
        };

        let settings = file.resolve(env, cli);
        assert_eq!(settings.effective_api_url(), "https://env.example");
        assert_eq!(settings.access_token.as_deref(), Some("cli-token"));
        assert_eq!(settings.organization.as_deref(), Some("file-org"));
    }

    #[test]
    fn test_defaults_apply() {
        let settings = Settings::default().resolve(env_of(&[]), Overrides::default());
        assert_eq!(settings.effective_api_url(), DEFAULT_API_URL);
        assert_eq!(settings.effective_user_agent(), DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_blank_env_is_ignored() {
        let file = Settings {
            organization: Some("healx".into()),
            ..Default::default()
        };
        let settings = file.resolve(env_of(&[(ENV_ORGANIZATION, "  ")]), Overrides::default());
        assert_eq!(settings.organization.as_deref(), Some("healx"));
    }

    #[test]
    fn test_client_builder_requires_token() {
        let settings = Settings {
            organization: Some("healx".into()),
            ..Default::default()
        };
        assert!(settings.client_builder().is_err());
    }

    #[test]
    fn test_settings_file_shape() {
        let settings: Settings =
            serde_json::from_str(r#"{"api_url": "http://localhost:8000", "max_retries": 2}"#).unwrap();
        assert_eq!(settings.max_retries, Some(2));
        assert_eq!(settings.access_token, None);
    }
}
