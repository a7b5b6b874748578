//! Host revision detection.
//!
//! The host reports a build signature (for craftbukkit-style servers the
//! implementation package, e.g. `org.bukkit.craftbukkit.v1_16_R3`). The
//! revision token inside it is the only thing this crate ever compares:
//! versions are equal or not, never ordered.

use crate::error::{CompatError, Result};
use crate::host::HostServer;
use log::info;
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

static REVISION_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bv?(\d+_\d+_R\d+)\b").expect("revision regex is valid"));

/// Opaque host revision identifier such as `1_16_R3`.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(String);

impl VersionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Extract the revision token from a host build signature.
    pub fn from_signature(signature: &str) -> Option<Self> {
        REVISION_TOKEN
            .captures(signature)
            .and_then(|caps| caps.get(1))
            .map(|m| Self(m.as_str().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VersionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Detects the running host's revision once and memoizes it.
pub struct VersionResolver {
    host: Arc<dyn HostServer>,
    resolved: OnceCell<VersionId>,
}

impl VersionResolver {
    pub fn new(host: Arc<dyn HostServer>) -> Self {
        Self {
            host,
            resolved: OnceCell::new(),
        }
    }

    /// Resolve the host revision. The signature is read at most once per
    /// successful resolution; a failure is fatal for bootstrap.
    pub fn resolve(&self) -> Result<&VersionId> {
        self.resolved.get_or_try_init(|| -> Result<VersionId> {
            let signature = self.host.build_signature();
            let version = VersionId::from_signature(&signature)
                .ok_or_else(|| CompatError::UnrecognizedSignature(signature.clone()))?;
            info!("Detected host revision {} from '{}'", version, signature);
            Ok(version)
        })
    }

    /// The memoized revision, if `resolve` has succeeded.
    pub fn get(&self) -> Option<&VersionId> {
        self.resolved.get()
    }
}
