//! Error types for Forge Core
//!
//! Provides error handling for:
//! - Generation backend and envelope failures
//! - Gate rejections
//! - Individual world-mutation commands
//! - Review actions without a pending proposal
//! - Configuration loading

use crate::types::OwnerId;
use forge_blueprint::ValidationError;
use std::path::PathBuf;

/// Generation backend failure
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Backend could not be reached or the connection failed
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// Backend did not answer in time
    #[error("backend timed out after {secs}s")]
    Timeout {
        /// Configured request timeout
        secs: u64,
    },

    /// Backend answered with a non-success status
    #[error("backend returned {status}: {detail}")]
    Backend {
        /// HTTP status code
        status: u16,
        /// Error detail reported by the backend
        detail: String,
    },

    /// Backend answered but the body was not the expected shape
    #[error("invalid backend response: {0}")]
    InvalidResponse(String),

    /// Response text held no usable JSON document
    #[error("malformed response envelope: {0}")]
    MalformedEnvelope(String),
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Unreachable(err.to_string())
        }
    }
}

/// Failure of one world-mutation command
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    /// World refused the command
    #[error("command rejected: {0}")]
    Rejected(String),

    /// World service not reachable
    #[error("world unavailable: {0}")]
    Unavailable(String),
}

/// Reason the generation gate refused a slot
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateRejection {
    /// The owner already has a generation in flight
    #[error("a build request for {0} is already in progress")]
    OwnerBusy(OwnerId),

    /// Global in-flight limit reached
    #[error("generation capacity reached ({0} in flight)")]
    AtCapacity(usize),
}

/// Review action on an owner without a pending proposal
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReviewError {
    /// Nothing to accept, deny or inspect
    #[error("no pending proposal for {0}")]
    NoPendingProposal(OwnerId),
}

/// Terminal outcome of a rejected build request
#[derive(Debug, thiserror::Error)]
pub enum BuildRejection {
    /// Nothing to build from
    #[error("build prompt is empty")]
    EmptyPrompt,

    /// Gate refused the request
    #[error("request rejected: {0}")]
    Busy(#[from] GateRejection),

    /// Backend failed or answered garbage
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// Generated blueprint did not validate
    #[error("blueprint rejected: {0}")]
    Invalid(#[from] ValidationError),
}

impl BuildRejection {
    /// Whether the caller may simply try again later
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy(_) | Self::Generation(_))
    }
}

/// Configuration failure
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File exists but could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// Config file path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// TOML syntax or type error
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Value out of range
    #[error("invalid config: {0}")]
    Invalid(String),
}
