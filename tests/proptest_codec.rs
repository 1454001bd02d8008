//! Property-based tests using proptest
//!
//! These tests verify that compute environment configurations survive an
//! encode/decode cycle for every platform and that zero or empty optional
//! fields never reach the wire.

use nftower::{
    AwsBatchConfig, ComputeEnvConfig, EnvironmentVariable, LsfPlatformConfig, PlatformRegistry,
    Visibility,
};
use proptest::prelude::*;
use serde_json::Value;

/// Optional string that is absent or non-empty
fn arb_opt_string() -> impl Strategy<Value = Option<String>> {
    prop::option::of("[a-zA-Z0-9/_:.-]{1,24}")
}

/// Optional string that may be present but empty
fn arb_maybe_empty() -> impl Strategy<Value = Option<String>> {
    prop::option::of(prop_oneof![Just(String::new()), "[a-z]{1,8}"])
}

fn arb_visibility() -> impl Strategy<Value = Visibility> {
    prop_oneof![
        Just(Visibility::Head),
        Just(Visibility::Compute),
        Just(Visibility::Both)
    ]
}

fn arb_environment() -> impl Strategy<Value = Vec<EnvironmentVariable>> {
    prop::collection::vec(
        ("[A-Z][A-Z0-9_]{0,15}", "[ -~]{0,20}", arb_visibility())
            .prop_map(|(name, value, vis)| EnvironmentVariable::new(name, value, vis)),
        0..4,
    )
}

fn arb_aws_batch() -> impl Strategy<Value = AwsBatchConfig> {
    (
        (
            "[a-z]{2}-[a-z]+-[1-9]",
            "[a-z0-9-]{1,20}",
            "[a-z0-9-]{1,20}",
            "/[a-z/]{1,30}",
            "s3://[a-z0-9-]{3,20}/work",
        ),
        (
            arb_opt_string(),
            arb_opt_string(),
            arb_opt_string(),
            arb_opt_string(),
            arb_opt_string(),
        ),
        (
            prop::option::of(1u32..256),
            prop::option::of(1u32..1_048_576),
            arb_environment(),
        ),
    )
        .prop_map(
            |(
                (region, compute_queue, head_queue, cli_path, work_dir),
                (execution_role, head_job_role, compute_job_role, pre_run_script, post_run_script),
                (head_job_cpus, head_job_memory_mb, environment),
            )| AwsBatchConfig {
                region,
                compute_queue,
                head_queue,
                cli_path,
                work_dir,
                execution_role,
                head_job_role,
                compute_job_role,
                pre_run_script,
                post_run_script,
                head_job_cpus,
                head_job_memory_mb,
                environment,
            },
        )
}

fn arb_lsf() -> impl Strategy<Value = LsfPlatformConfig> {
    (
        (
            "/[a-z/]{1,30}",
            "[a-z]{1,12}",
            "[a-z0-9.-]{1,30}",
            "[a-z]{1,10}",
            "[a-z]{1,10}",
        ),
        (
            arb_opt_string(),
            prop::option::of(1u16..65535),
            prop::option::of(1u32..10_000),
            arb_opt_string(),
            arb_opt_string(),
            arb_opt_string(),
            prop::option::of(prop_oneof![Just("KB".to_string()), Just("MB".to_string())]),
        ),
        (any::<bool>(), any::<bool>(), any::<bool>(), arb_environment()),
    )
        .prop_map(
            |(
                (work_dir, user_name, host_name, head_queue, compute_queue),
                (
                    launch_dir,
                    port,
                    max_queue_size,
                    head_job_options,
                    pre_run_script,
                    post_run_script,
                    unit_for_limits,
                ),
                (propagate_head_job_options, per_job_mem_limit, per_task_reserve, environment),
            )| LsfPlatformConfig {
                work_dir,
                user_name,
                host_name,
                head_queue,
                compute_queue,
                launch_dir,
                port,
                max_queue_size,
                head_job_options,
                pre_run_script,
                post_run_script,
                unit_for_limits,
                propagate_head_job_options,
                per_job_mem_limit,
                per_task_reserve,
                environment,
            },
        )
}

fn arb_config() -> impl Strategy<Value = ComputeEnvConfig> {
    prop_oneof![
        arb_aws_batch().prop_map(ComputeEnvConfig::from),
        arb_lsf().prop_map(ComputeEnvConfig::from),
    ]
}

/// True when a JSON value is a zero number or an empty string
fn is_zero_or_empty(value: &Value) -> bool {
    match value {
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Bool(b) => !b,
        _ => false,
    }
}

/// Required fields may legitimately be empty strings
const REQUIRED: &[&str] = &[
    "region",
    "computeQueue",
    "headQueue",
    "cliPath",
    "workDir",
    "userName",
    "hostName",
];

proptest! {
    /// decode(encode(config)) == config for every platform
    #[test]
    fn test_config_round_trips(config in arb_config()) {
        let registry = PlatformRegistry::with_defaults();
        let encoded = registry.encode(&config).unwrap();
        let decoded = registry.decode(config.platform(), Value::Object(encoded)).unwrap();
        prop_assert_eq!(decoded, config);
    }

    /// Encoded optional fields are never zero, empty or false
    #[test]
    fn test_encode_omits_zero_values(config in arb_config()) {
        let encoded = PlatformRegistry::with_defaults().encode(&config).unwrap();
        for (key, value) in &encoded {
            if REQUIRED.contains(&key.as_str()) {
                continue;
            }
            prop_assert!(!is_zero_or_empty(value), "{} encoded as {}", key, value);
        }
    }

    /// Present-but-empty strings and zero numbers are dropped on encode
    #[test]
    fn test_empty_optionals_never_encoded(
        role in arb_maybe_empty(),
        cpus in prop::option::of(0u32..4),
    ) {
        let config = ComputeEnvConfig::from(AwsBatchConfig {
            region: "eu-west-1".into(),
            compute_queue: "c".into(),
            head_queue: "h".into(),
            cli_path: "/aws".into(),
            work_dir: "s3://w".into(),
            execution_role: role.clone(),
            head_job_cpus: cpus,
            ..Default::default()
        });
        let encoded = PlatformRegistry::with_defaults().encode(&config).unwrap();

        let role_present = role.as_deref().is_some_and(|r| !r.is_empty());
        prop_assert_eq!(encoded.contains_key("executionRole"), role_present);
        prop_assert_eq!(encoded.contains_key("headJobCpus"), cpus.is_some_and(|c| c != 0));
    }

    /// Environment variables keep their visibility through the wire form
    #[test]
    fn test_environment_flags_round_trip(env in arb_environment()) {
        let json = serde_json::to_value(&env).unwrap();
        for (var, wire) in env.iter().zip(json.as_array().unwrap()) {
            prop_assert_eq!(wire["head"].as_bool(), Some(var.visibility.head()));
            prop_assert_eq!(wire["compute"].as_bool(), Some(var.visibility.compute()));
        }
        let back: Vec<EnvironmentVariable> = serde_json::from_value(json).unwrap();
        prop_assert_eq!(back, env);
    }
}
