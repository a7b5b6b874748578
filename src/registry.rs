//! Capability registry: `(capability, version) -> adapter`.
//!
//! Built once at bootstrap from the [`AdapterFactory`] and never mutated
//! afterwards, so it is shared as a plain `Arc` without locks. Lookups are
//! exact: a key that was not registered is an error, never a fallback to
//! some other revision's adapter.

use crate::enchant::GlowAdapter;
use crate::error::{CompatError, Result};
use crate::factory::{canonical_identifier, AdapterContext, AdapterFactory};
use crate::item::NbtAdapter;
use crate::particle::ParticleAdapter;
use crate::pathfinder::PathfinderAdapter;
use crate::version::VersionId;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Nbt,
    Particle,
    Pathfinder,
    Glow,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::Nbt,
        Capability::Particle,
        Capability::Pathfinder,
        Capability::Glow,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Capability::Nbt => "nbt",
            Capability::Particle => "particle",
            Capability::Pathfinder => "pathfinder",
            Capability::Glow => "glow",
        }
    }

    /// Prefix of the canonical adapter identifier.
    pub fn base_name(self) -> &'static str {
        match self {
            Capability::Nbt => "NbtAdapter",
            Capability::Particle => "ParticleAdapter",
            Capability::Pathfinder => "PathfinderAdapter",
            Capability::Glow => "GlowAdapter",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CapabilityKey {
    pub capability: Capability,
    pub version: VersionId,
}

impl CapabilityKey {
    pub fn new(capability: Capability, version: VersionId) -> Self {
        Self {
            capability,
            version,
        }
    }
}

// ---------------------------------------------------------------------------
// Adapter handle
// ---------------------------------------------------------------------------

/// A constructed adapter behind its capability interface.
#[derive(Clone)]
pub enum AdapterHandle {
    Nbt(Arc<dyn NbtAdapter>),
    Particle(Arc<dyn ParticleAdapter>),
    Pathfinder(Arc<dyn PathfinderAdapter>),
    Glow(Arc<dyn GlowAdapter>),
}

impl AdapterHandle {
    pub fn capability(&self) -> Capability {
        match self {
            AdapterHandle::Nbt(_) => Capability::Nbt,
            AdapterHandle::Particle(_) => Capability::Particle,
            AdapterHandle::Pathfinder(_) => Capability::Pathfinder,
            AdapterHandle::Glow(_) => Capability::Glow,
        }
    }
}

impl std::fmt::Debug for AdapterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AdapterHandle({})", self.capability())
    }
}

/// One row of [`CapabilityRegistry::report`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityStatus {
    pub capability: Capability,
    pub identifier: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub struct CapabilityRegistry {
    version: VersionId,
    adapters: HashMap<CapabilityKey, AdapterHandle>,
    status: Vec<CapabilityStatus>,
}

impl CapabilityRegistry {
    /// Instantiate every capability for `version`. A capability that fails
    /// is logged and left out; the others are still registered.
    pub fn initialize(
        version: &VersionId,
        factory: &AdapterFactory,
        ctx: &AdapterContext<'_>,
    ) -> Self {
        let mut adapters = HashMap::new();
        let mut status = Vec::with_capacity(Capability::ALL.len());

        for capability in Capability::ALL {
            let identifier = canonical_identifier(capability, version);
            let outcome = factory.instantiate(capability, version, ctx);
            let error = match outcome {
                Ok(handle) => {
                    adapters.insert(CapabilityKey::new(capability, version.clone()), handle);
                    None
                }
                Err(e @ CompatError::UnsupportedVersion { .. }) => {
                    warn!("{}", e);
                    Some(e.to_string())
                }
                Err(e) => {
                    error!("Capability '{}' unavailable: {}", capability, e);
                    Some(e.to_string())
                }
            };
            status.push(CapabilityStatus {
                capability,
                identifier,
                available: error.is_none(),
                error,
            });
        }

        info!(
            "Capability registry ready for {}: {}/{} capabilities",
            version,
            adapters.len(),
            Capability::ALL.len()
        );
        Self {
            version: version.clone(),
            adapters,
            status,
        }
    }

    /// The revision this registry was built for.
    pub fn version(&self) -> &VersionId {
        &self.version
    }

    pub fn get(&self, capability: Capability, version: &VersionId) -> Result<&AdapterHandle> {
        self.adapters
            .get(&CapabilityKey::new(capability, version.clone()))
            .ok_or_else(|| CompatError::UnsupportedVersion {
                capability,
                version: version.clone(),
            })
    }

    pub fn contains(&self, capability: Capability, version: &VersionId) -> bool {
        self.get(capability, version).is_ok()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    pub fn report(&self) -> &[CapabilityStatus] {
        &self.status
    }

    // -----------------------------------------------------------------------
    // Typed accessors for the detected revision
    // -----------------------------------------------------------------------

    fn unsupported(&self, capability: Capability) -> CompatError {
        CompatError::UnsupportedVersion {
            capability,
            version: self.version.clone(),
        }
    }

    pub fn nbt(&self) -> Result<Arc<dyn NbtAdapter>> {
        match self.get(Capability::Nbt, &self.version)? {
            AdapterHandle::Nbt(adapter) => Ok(Arc::clone(adapter)),
            _ => Err(self.unsupported(Capability::Nbt)),
        }
    }

    pub fn particle(&self) -> Result<Arc<dyn ParticleAdapter>> {
        match self.get(Capability::Particle, &self.version)? {
            AdapterHandle::Particle(adapter) => Ok(Arc::clone(adapter)),
            _ => Err(self.unsupported(Capability::Particle)),
        }
    }

    pub fn pathfinder(&self) -> Result<Arc<dyn PathfinderAdapter>> {
        match self.get(Capability::Pathfinder, &self.version)? {
            AdapterHandle::Pathfinder(adapter) => Ok(Arc::clone(adapter)),
            _ => Err(self.unsupported(Capability::Pathfinder)),
        }
    }

    pub fn glow(&self) -> Result<Arc<dyn GlowAdapter>> {
        match self.get(Capability::Glow, &self.version)? {
            AdapterHandle::Glow(adapter) => Ok(Arc::clone(adapter)),
            _ => Err(self.unsupported(Capability::Glow)),
        }
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("version", &self.version)
            .field("status", &self.status)
            .finish()
    }
}
