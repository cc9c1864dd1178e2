//! Error types.
//!
//! None of these are fatal to a catalogue pass: collectors turn them into an
//! empty batch, a skipped instance, or a record with zero capability counts.

use crate::sources::SourceKind;
use thiserror::Error;

/// Failure to obtain or decode a device's report descriptor / preparsed data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("descriptor unavailable: {0}")]
    Unavailable(String),

    #[error("truncated item at byte {offset}")]
    Truncated { offset: usize },

    #[error("unbalanced collection at byte {offset}")]
    UnbalancedCollection { offset: usize },

    #[error("global stack underflow at byte {offset}")]
    StackUnderflow { offset: usize },

    #[error("HidP call {call} failed: status=0x{status:08x}")]
    Hidp { call: &'static str, status: u32 },
}

/// Failure inside one enumeration source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The whole source cannot be queried this pass (contributes an empty batch).
    #[error("{kind} source unavailable: {reason}")]
    Unavailable { kind: SourceKind, reason: String },

    /// One instance failed; the rest of the batch continues.
    #[error("instance {handle} failed: {reason}")]
    Instance { handle: String, reason: String },

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

/// Configuration loading / validation failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Umbrella error for the fallible public entry points.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error("failed to serialize catalogue: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T, E = CatalogError> = std::result::Result<T, E>;
