//! AWS Batch platform (`aws-batch`)

use super::env_var::EnvironmentVariable;
use super::{omit, ComputeEnvConfig, Platform};
use crate::tower::error::Result;
use serde::{Deserialize, Serialize};

/// Manually configured AWS Batch queues.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsBatchConfig {
    pub region: String,
    pub compute_queue: String,
    pub head_queue: String,
    pub cli_path: String,
    pub work_dir: String,

    #[serde(default, skip_serializing_if = "omit::is_empty_str", deserialize_with = "omit::string")]
    pub execution_role: Option<String>,
    #[serde(default, skip_serializing_if = "omit::is_empty_str", deserialize_with = "omit::string")]
    pub head_job_role: Option<String>,
    #[serde(default, skip_serializing_if = "omit::is_empty_str", deserialize_with = "omit::string")]
    pub compute_job_role: Option<String>,
    #[serde(default, skip_serializing_if = "omit::is_empty_str", deserialize_with = "omit::string")]
    pub pre_run_script: Option<String>,
    #[serde(default, skip_serializing_if = "omit::is_empty_str", deserialize_with = "omit::string")]
    pub post_run_script: Option<String>,
    #[serde(default, skip_serializing_if = "omit::is_zero", deserialize_with = "omit::number")]
    pub head_job_cpus: Option<u32>,
    #[serde(default, skip_serializing_if = "omit::is_zero", deserialize_with = "omit::number")]
    pub head_job_memory_mb: Option<u32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "omit::list")]
    pub environment: Vec<EnvironmentVariable>,
}

impl Platform for AwsBatchConfig {
    const TAG: &'static str = "aws-batch";

    fn into_config(self) -> Result<ComputeEnvConfig> {
        Ok(ComputeEnvConfig::AwsBatch(self))
    }

    fn from_config(config: &ComputeEnvConfig) -> Option<&Self> {
        match config {
            ComputeEnvConfig::AwsBatch(inner) => Some(inner),
            _ => None,
        }
    }
}
