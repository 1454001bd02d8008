//! Tower Authentication
//!
//! Tower personal access tokens are sent as a bearer token on every request.

use super::error::{Result, TowerError};
use reqwest::header::HeaderValue;
use std::fmt;
use std::sync::Arc;

/// A Tower access token.
///
/// Cheap to clone; never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(Arc<str>);

impl AccessToken {
    /// Validate and wrap a raw token string.
    pub fn new(token: impl AsRef<str>) -> Result<Self> {
        let token = token.as_ref().trim();
        if !validate_token(token) {
            return Err(TowerError::InvalidConfig(
                "access token is empty or contains invalid characters".to_string(),
            ));
        }
        Ok(Self(Arc::from(token)))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// `Authorization` header value, marked sensitive so it is never logged.
    pub fn header_value(&self) -> Result<HeaderValue> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.0))
            .map_err(|_| TowerError::InvalidConfig("access token is not a valid header".into()))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Tokens are printable ASCII without whitespace.
fn validate_token(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_graphic())
}
