//! Compute environment configuration
//!
//! A compute environment carries a platform discriminator and a nested,
//! platform-specific `config` object. Each platform is a [`Platform`]
//! implementation registered in a [`PlatformRegistry`]; adding a platform
//! means adding a type and registering it, without touching existing codecs.
//! Platforms defined outside this crate travel as
//! [`ComputeEnvConfig::Custom`].
//!
//! # Architecture
//!
//! - [`aws_batch`] - `aws-batch` queues
//! - [`lsf`] - `lsf-platform` on-prem scheduler
//! - [`env_var`] - environment variables shared by every platform
//!
//! Optional fields are omitted from the wire when absent, zero or empty,
//! because Tower treats an explicit empty value as an overwrite of its
//! default rather than "not set".

pub mod aws_batch;
pub mod env_var;
pub mod lsf;

pub use aws_batch::AwsBatchConfig;
pub use env_var::{EnvironmentVariable, Visibility};
pub use lsf::LsfPlatformConfig;

use crate::tower::error::{Result, TowerError};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Platform-specific configuration, keyed by discriminator.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ComputeEnvConfig {
    AwsBatch(AwsBatchConfig),
    LsfPlatform(LsfPlatformConfig),
    /// A registered platform without a built-in variant.
    Custom(CustomPlatformConfig),
}

impl ComputeEnvConfig {
    /// Wire discriminator of this configuration.
    pub fn platform(&self) -> &'static str {
        match self {
            Self::AwsBatch(_) => AwsBatchConfig::TAG,
            Self::LsfPlatform(_) => LsfPlatformConfig::TAG,
            Self::Custom(config) => config.platform,
        }
    }

    pub fn environment(&self) -> &[EnvironmentVariable] {
        match self {
            Self::AwsBatch(config) => &config.environment,
            Self::LsfPlatform(config) => &config.environment,
            Self::Custom(config) => &config.environment,
        }
    }

    /// Wrap a value of a platform defined outside this crate.
    pub fn custom<P: Platform>(config: &P) -> Result<Self> {
        CustomPlatformConfig::new(config).map(Self::Custom)
    }
}

/// Encoded configuration of a platform without a built-in variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomPlatformConfig {
    platform: &'static str,
    config: Map<String, Value>,
    environment: Vec<EnvironmentVariable>,
}

impl CustomPlatformConfig {
    pub fn new<P: Platform>(config: &P) -> Result<Self> {
        let config = object_of(config)?;
        let environment = match config.get("environment") {
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                TowerError::Encode(format!("invalid {} environment: {e}", P::TAG))
            })?,
            None => Vec::new(),
        };
        Ok(Self {
            platform: P::TAG,
            config,
            environment,
        })
    }

    pub fn platform(&self) -> &'static str {
        self.platform
    }

    /// The encoded `config` object.
    pub fn config(&self) -> &Map<String, Value> {
        &self.config
    }

    /// Decode back into the platform type.
    pub fn to_platform<P: Platform>(&self) -> Result<P> {
        if self.platform != P::TAG {
            return Err(TowerError::Decode(format!(
                "{} configuration read as {}",
                self.platform,
                P::TAG
            )));
        }
        serde_json::from_value(Value::Object(self.config.clone()))
            .map_err(|e| TowerError::Decode(format!("invalid {} configuration: {e}", P::TAG)))
    }
}

impl From<AwsBatchConfig> for ComputeEnvConfig {
    fn from(config: AwsBatchConfig) -> Self {
        Self::AwsBatch(config)
    }
}

impl From<LsfPlatformConfig> for ComputeEnvConfig {
    fn from(config: LsfPlatformConfig) -> Self {
        Self::LsfPlatform(config)
    }
}

/// A platform variant with its own wire shape.
///
/// Only `TAG` is required. The default methods store the value as
/// [`ComputeEnvConfig::Custom`], which is how platforms outside this crate
/// are carried; built-in platforms override both to use their own variant.
pub trait Platform: Serialize + DeserializeOwned + Sized {
    /// Discriminator sent as `platform`.
    const TAG: &'static str;

    fn into_config(self) -> Result<ComputeEnvConfig> {
        ComputeEnvConfig::custom(&self)
    }

    fn from_config(_config: &ComputeEnvConfig) -> Option<&Self> {
        None
    }
}

/// Encode and decode functions for one platform.
#[derive(Clone, Copy)]
pub struct PlatformCodec {
    pub tag: &'static str,
    encode: fn(&ComputeEnvConfig) -> Result<Map<String, Value>>,
    decode: fn(Value) -> Result<ComputeEnvConfig>,
}

impl PlatformCodec {
    pub fn of<P: Platform>() -> Self {
        Self {
            tag: P::TAG,
            encode: encode_platform::<P>,
            decode: decode_platform::<P>,
        }
    }
}

impl std::fmt::Debug for PlatformCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformCodec").field("tag", &self.tag).finish()
    }
}

fn encode_platform<P: Platform>(config: &ComputeEnvConfig) -> Result<Map<String, Value>> {
    if let Some(inner) = P::from_config(config) {
        return object_of(inner);
    }
    match config {
        // Round trip through `P` so omission rules apply to custom values too.
        ComputeEnvConfig::Custom(custom) if custom.platform == P::TAG => {
            object_of(&custom.to_platform::<P>()?)
        }
        _ => Err(TowerError::Encode(format!(
            "{} configuration passed to the {} codec",
            config.platform(),
            P::TAG
        ))),
    }
}

fn object_of<P: Platform>(inner: &P) -> Result<Map<String, Value>> {
    match serde_json::to_value(inner).map_err(|e| TowerError::Encode(e.to_string()))? {
        Value::Object(map) => Ok(map),
        other => Err(TowerError::Encode(format!(
            "{} configuration did not encode to an object: {other}",
            P::TAG
        ))),
    }
}

fn decode_platform<P: Platform>(value: Value) -> Result<ComputeEnvConfig> {
    let inner: P = serde_json::from_value(value)
        .map_err(|e| TowerError::Decode(format!("invalid {} configuration: {e}", P::TAG)))?;
    inner.into_config()
}

/// Open set of platform codecs, keyed by discriminator.
#[derive(Debug, Clone, Default)]
pub struct PlatformRegistry {
    codecs: HashMap<&'static str, PlatformCodec>,
}

impl PlatformRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with every built-in platform.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register::<AwsBatchConfig>();
        registry.register::<LsfPlatformConfig>();
        registry
    }

    pub fn register<P: Platform>(&mut self) -> &mut Self {
        self.codecs.insert(P::TAG, PlatformCodec::of::<P>());
        self
    }

    pub fn get(&self, tag: &str) -> Option<&PlatformCodec> {
        self.codecs.get(tag)
    }

    pub fn platforms(&self) -> Vec<&'static str> {
        let mut tags: Vec<_> = self.codecs.keys().copied().collect();
        tags.sort_unstable();
        tags
    }

    /// Encode a configuration into its nested `config` object.
    pub fn encode(&self, config: &ComputeEnvConfig) -> Result<Map<String, Value>> {
        let codec = self
            .get(config.platform())
            .ok_or_else(|| TowerError::UnsupportedPlatform(config.platform().to_string()))?;
        (codec.encode)(config)
    }

    /// Decode a nested `config` object for the given discriminator.
    pub fn decode(&self, platform: &str, config: Value) -> Result<ComputeEnvConfig> {
        let codec = self
            .get(platform)
            .ok_or_else(|| TowerError::UnsupportedPlatform(platform.to_string()))?;
        (codec.decode)(config)
    }
}

/// Shared registry of the built-in platforms.
pub fn default_registry() -> &'static PlatformRegistry {
    static REGISTRY: OnceLock<PlatformRegistry> = OnceLock::new();
    REGISTRY.get_or_init(PlatformRegistry::with_defaults)
}

/// A compute environment as returned by Tower.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputeEnv {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub credentials_id: Option<String>,
    pub status: Option<String>,
    pub date_created: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
    pub config: ComputeEnvConfig,
}

impl ComputeEnv {
    pub fn platform(&self) -> &'static str {
        self.config.platform()
    }
}

/// Compute environment record before platform dispatch.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeEnvEnvelope {
    pub id: String,
    pub name: String,
    pub platform: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub credentials_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deleted: Option<bool>,
    #[serde(default)]
    pub config: Option<Value>,
}

impl ComputeEnvEnvelope {
    /// Resolve the nested configuration.
    ///
    /// Soft-deleted records yield `None` before the platform is looked at,
    /// since their config may be missing or stale.
    pub fn decode(self, registry: &PlatformRegistry) -> Result<Option<ComputeEnv>> {
        if self.deleted.unwrap_or(false) {
            tracing::debug!("compute environment {} is deleted", self.id);
            return Ok(None);
        }

        let Some(codec) = registry.get(&self.platform) else {
            return Err(TowerError::UnsupportedPlatform(self.platform));
        };
        let config = match self.config {
            Some(config @ Value::Object(_)) => (codec.decode)(config)?,
            _ => {
                return Err(TowerError::Decode(format!(
                    "compute environment {} has no configuration",
                    self.id
                )))
            }
        };

        Ok(Some(ComputeEnv {
            id: self.id,
            name: self.name,
            description: self.description,
            credentials_id: self.credentials_id,
            status: self.status,
            date_created: self.date_created,
            last_updated: self.last_updated,
            config,
        }))
    }
}

/// Serde helpers treating zero and empty optionals as absent.
pub(crate) mod omit {
    use serde::{Deserialize, Deserializer};

    pub fn is_empty_str(value: &Option<String>) -> bool {
        value.as_deref().map_or(true, str::is_empty)
    }

    pub fn is_zero<T: Default + PartialEq>(value: &Option<T>) -> bool {
        value.as_ref().map_or(true, |v| *v == T::default())
    }

    pub fn is_false(value: &bool) -> bool {
        !*value
    }

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.is_empty()))
    }

    pub fn number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + Default + PartialEq,
    {
        Ok(Option::<T>::deserialize(deserializer)?.filter(|v| *v != T::default()))
    }

    pub fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
    }
}
