//! Error taxonomy for registry bootstrap and capability calls.

use crate::registry::Capability;
use crate::version::VersionId;
use thiserror::Error;

pub type Result<T, E = CompatError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum CompatError {
    /// The host build signature carries no recognisable revision token.
    #[error("Unrecognised host version signature: {0:?}")]
    UnrecognizedSignature(String),

    /// No adapter is registered for this exact (capability, version) key.
    #[error("Capability '{capability}' is not supported on version {version}")]
    UnsupportedVersion {
        capability: Capability,
        version: VersionId,
    },

    #[error("Particle not found: {0:?}")]
    ParticleNotFound(String),

    /// Required construction arguments were missing or invalid.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Failed to instantiate adapter {identifier}: {reason}")]
    AdapterInstantiation { identifier: String, reason: String },

    #[error(transparent)]
    Nbt(#[from] NbtError),

    #[error(transparent)]
    Host(#[from] HostError),
}

/// Malformed SNBT input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NbtError {
    #[error("Unexpected end of tag string (expected {expected})")]
    UnexpectedEnd { expected: &'static str },

    #[error("Unexpected character {found:?} at {position} (expected {expected})")]
    UnexpectedChar {
        found: char,
        position: usize,
        expected: &'static str,
    },

    #[error("Trailing data at {position}")]
    TrailingData { position: usize },

    #[error("List at {position} mixes element types")]
    MixedList { position: usize },

    #[error("Invalid {kind} literal {literal:?} in typed array")]
    InvalidArrayElement { kind: &'static str, literal: String },

    #[error("Tag nesting at {position} exceeds {limit} levels")]
    TooDeep { position: usize, limit: usize },

    #[error("Item tag must be a compound, found {0}")]
    NotACompound(&'static str),
}

/// Failures reported by the host binding layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("World '{0}' rejected the entity")]
    SpawnRejected(String),

    #[error("Enchantment {0} could not be registered: {1}")]
    EnchantmentRejected(String, String),

    #[error("Host error: {0}")]
    Other(String),
}
