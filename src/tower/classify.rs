//! Status interpretation per endpoint
//!
//! Tower answers a handful of calls with statuses that do not mean what
//! they say: a 403 on a fetch-by-id means the record was soft-deleted, and
//! a 409 on some creation endpoints means the thing already exists. These
//! overrides live in one table so call sites only name their endpoint.

use super::error::{ApiError, Result, TowerError};

/// Endpoint categories with non-default status handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    CredentialsById,
    PipelineSecretById,
    PipelineById,
    ComputeEnvById,
    LabelCreate,
    ParticipantAdd,
    OrgMemberAdd,
    Other,
}

/// What an error status means at a given endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Propagate as an [`ApiError`].
    Error,
    /// The resource does not exist; yield an absent value.
    Absent,
    /// The resource already exists; resolve it by listing.
    Exists,
}

struct Rule {
    endpoint: Endpoint,
    status: u16,
    /// Case-insensitive substring the error message must contain.
    message: Option<&'static str>,
    disposition: Disposition,
}

const RULES: &[Rule] = &[
    Rule {
        endpoint: Endpoint::CredentialsById,
        status: 403,
        message: None,
        disposition: Disposition::Absent,
    },
    Rule {
        endpoint: Endpoint::PipelineSecretById,
        status: 403,
        message: None,
        disposition: Disposition::Absent,
    },
    Rule {
        endpoint: Endpoint::PipelineById,
        status: 403,
        message: None,
        disposition: Disposition::Absent,
    },
    Rule {
        endpoint: Endpoint::ComputeEnvById,
        status: 403,
        message: None,
        disposition: Disposition::Absent,
    },
    Rule {
        endpoint: Endpoint::LabelCreate,
        status: 409,
        message: None,
        disposition: Disposition::Exists,
    },
    Rule {
        endpoint: Endpoint::ParticipantAdd,
        status: 409,
        message: None,
        disposition: Disposition::Exists,
    },
    Rule {
        endpoint: Endpoint::OrgMemberAdd,
        status: 409,
        message: Some("already a participant"),
        disposition: Disposition::Exists,
    },
];

/// Look up the disposition of an API error at `endpoint`.
pub fn disposition(endpoint: Endpoint, error: &ApiError) -> Disposition {
    RULES
        .iter()
        .find(|rule| {
            rule.endpoint == endpoint
                && rule.status == error.status
                && rule.message.map_or(true, |needle| {
                    error
                        .message
                        .to_ascii_lowercase()
                        .contains(&needle.to_ascii_lowercase())
                })
        })
        .map(|rule| rule.disposition)
        .unwrap_or(Disposition::Error)
}

/// A call outcome after endpoint-specific interpretation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Classified<T> {
    Value(T),
    Absent,
    Exists,
}

/// Apply the table to a call result. Only API errors are reinterpreted;
/// transport, decode and cancellation errors pass through untouched.
pub(crate) fn classify<T>(endpoint: Endpoint, result: Result<T>) -> Result<Classified<T>> {
    match result {
        Ok(value) => Ok(Classified::Value(value)),
        Err(TowerError::Api(error)) => match disposition(endpoint, &error) {
            Disposition::Absent => {
                tracing::debug!(
                    "{:?}: status {} treated as absent ({})",
                    endpoint,
                    error.status,
                    error.url
                );
                Ok(Classified::Absent)
            }
            Disposition::Exists => {
                tracing::debug!(
                    "{:?}: status {} treated as already existing ({})",
                    endpoint,
                    error.status,
                    error.url
                );
                Ok(Classified::Exists)
            }
            Disposition::Error => Err(TowerError::Api(error)),
        },
        Err(other) => Err(other),
    }
}

impl<T> Classified<T> {
    /// Collapse a fetch outcome into an optional value.
    pub(crate) fn into_option(self) -> Option<T> {
        match self {
            Self::Value(value) => Some(value),
            Self::Absent | Self::Exists => None,
        }
    }
}
