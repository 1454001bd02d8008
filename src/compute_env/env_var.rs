//! Compute environment variables

use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

/// Which jobs see an environment variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Only the Nextflow head job.
    Head,
    /// Only the compute jobs.
    Compute,
    Both,
}

impl Visibility {
    pub fn head(self) -> bool {
        matches!(self, Self::Head | Self::Both)
    }

    pub fn compute(self) -> bool {
        matches!(self, Self::Compute | Self::Both)
    }

    /// `None` when neither job kind would see the variable.
    pub fn from_flags(head: bool, compute: bool) -> Option<Self> {
        match (head, compute) {
            (true, true) => Some(Self::Both),
            (true, false) => Some(Self::Head),
            (false, true) => Some(Self::Compute),
            (false, false) => None,
        }
    }
}

impl std::str::FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HEAD" => Ok(Self::Head),
            "COMPUTE" => Ok(Self::Compute),
            "BOTH" => Ok(Self::Both),
            other => Err(format!("visibility must be HEAD, COMPUTE or BOTH, got {other}")),
        }
    }
}

/// An environment variable passed to head and/or compute jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireEnvVar", into = "WireEnvVar")]
pub struct EnvironmentVariable {
    pub name: String,
    pub value: String,
    pub visibility: Visibility,
}

impl EnvironmentVariable {
    pub fn new(name: impl Into<String>, value: impl Into<String>, visibility: Visibility) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            visibility,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct WireEnvVar {
    name: String,
    #[serde(default)]
    value: String,
    #[serde(default)]
    head: bool,
    #[serde(default)]
    compute: bool,
}

impl TryFrom<WireEnvVar> for EnvironmentVariable {
    type Error = String;

    fn try_from(wire: WireEnvVar) -> Result<Self, Self::Error> {
        let visibility = Visibility::from_flags(wire.head, wire.compute).ok_or_else(|| {
            format!(
                "environment variable {} is visible to neither head nor compute jobs",
                wire.name
            )
        })?;
        Ok(Self {
            name: wire.name,
            value: wire.value,
            visibility,
        })
    }
}

impl From<EnvironmentVariable> for WireEnvVar {
    fn from(var: EnvironmentVariable) -> Self {
        Self {
            head: var.visibility.head(),
            compute: var.visibility.compute(),
            name: var.name,
            value: var.value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_flags() {
        let var = EnvironmentVariable::new("FOO", "bar", Visibility::Head);
        assert_eq!(
            serde_json::to_value(&var).unwrap(),
            json!({"name": "FOO", "value": "bar", "head": true, "compute": false})
        );
    }

    #[test]
    fn test_both_flags_false_is_rejected() {
        let result = serde_json::from_value::<EnvironmentVariable>(
            json!({"name": "FOO", "value": "bar", "head": false, "compute": false}),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_visibility_parse() {
        assert_eq!("both".parse::<Visibility>().unwrap(), Visibility::Both);
        assert_eq!("HEAD".parse::<Visibility>().unwrap(), Visibility::Head);
        assert!("nobody".parse::<Visibility>().is_err());
    }
}
