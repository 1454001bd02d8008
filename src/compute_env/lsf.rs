//! IBM LSF platform (`lsf-platform`)

use super::env_var::EnvironmentVariable;
use super::{omit, ComputeEnvConfig, Platform};
use crate::tower::error::Result;
use serde::{Deserialize, Serialize};

/// An on-prem LSF cluster reached over SSH.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LsfPlatformConfig {
    pub work_dir: String,
    pub user_name: String,
    pub host_name: String,
    pub head_queue: String,
    pub compute_queue: String,

    #[serde(default, skip_serializing_if = "omit::is_empty_str", deserialize_with = "omit::string")]
    pub launch_dir: Option<String>,
    #[serde(default, skip_serializing_if = "omit::is_zero", deserialize_with = "omit::number")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "omit::is_zero", deserialize_with = "omit::number")]
    pub max_queue_size: Option<u32>,
    #[serde(default, skip_serializing_if = "omit::is_empty_str", deserialize_with = "omit::string")]
    pub head_job_options: Option<String>,
    #[serde(default, skip_serializing_if = "omit::is_empty_str", deserialize_with = "omit::string")]
    pub pre_run_script: Option<String>,
    #[serde(default, skip_serializing_if = "omit::is_empty_str", deserialize_with = "omit::string")]
    pub post_run_script: Option<String>,
    /// `KB`, `MB`, `GB`...
    #[serde(default, skip_serializing_if = "omit::is_empty_str", deserialize_with = "omit::string")]
    pub unit_for_limits: Option<String>,

    #[serde(default, skip_serializing_if = "omit::is_false")]
    pub propagate_head_job_options: bool,
    #[serde(default, skip_serializing_if = "omit::is_false")]
    pub per_job_mem_limit: bool,
    #[serde(default, skip_serializing_if = "omit::is_false")]
    pub per_task_reserve: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "omit::list")]
    pub environment: Vec<EnvironmentVariable>,
}

impl Platform for LsfPlatformConfig {
    const TAG: &'static str = "lsf-platform";

    fn into_config(self) -> Result<ComputeEnvConfig> {
        Ok(ComputeEnvConfig::LsfPlatform(self))
    }

    fn from_config(config: &ComputeEnvConfig) -> Option<&Self> {
        match config {
            ComputeEnvConfig::LsfPlatform(inner) => Some(inner),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_false_flags_and_zero_port_omitted() {
        let config = LsfPlatformConfig {
            work_dir: "/scratch/work".into(),
            user_name: "nextflow".into(),
            host_name: "lsf.example.org".into(),
            head_queue: "normal".into(),
            compute_queue: "long".into(),
            port: Some(0),
            per_task_reserve: true,
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            json!({
                "workDir": "/scratch/work",
                "userName": "nextflow",
                "hostName": "lsf.example.org",
                "headQueue": "normal",
                "computeQueue": "long",
                "perTaskReserve": true
            })
        );
    }
}
