//! Adapter registration table and factory.
//!
//! Every adapter is registered under its canonical identifier
//! `<CapabilityBaseName>_<VersionId>` (for example
//! `ParticleAdapter_1_17_R1`). Supporting a new revision means registering
//! constructors under its identifiers; nothing is discovered by name at
//! run time beyond this table.

use crate::enchant::GlowEnchantment;
use crate::error::{CompatError, Result};
use crate::host::HostServer;
use crate::item::RootTagAdapter;
use crate::particle::{LegacyParticleAdapter, ParticleFamily, RegistryParticleAdapter};
use crate::pathfinder::HiddenPathfinder;
use crate::protocol::ProtocolProfile;
use crate::registry::{AdapterHandle, Capability};
use crate::types::CompatConfig;
use crate::version::VersionId;
use log::debug;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// What a constructor may use while it runs. The host is borrowed for the
/// call only; adapters that need it later receive it per request.
pub struct AdapterContext<'a> {
    pub host: &'a dyn HostServer,
    pub config: &'a CompatConfig,
}

/// Builds one adapter. An `Err` carries the reason shown in the registry
/// report.
pub type AdapterConstructor =
    Box<dyn Fn(&AdapterContext<'_>) -> Built + Send + Sync>;

pub type Built = std::result::Result<AdapterHandle, String>;

pub fn canonical_identifier(capability: Capability, version: &VersionId) -> String {
    format!("{}_{}", capability.base_name(), version)
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct AdapterCatalog {
    constructors: HashMap<String, AdapterConstructor>,
}

impl AdapterCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every adapter shipped with this crate, one per capability and
    /// supported revision.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for version in ProtocolProfile::revisions() {
            for capability in Capability::ALL {
                catalog.register(
                    capability,
                    &version,
                    builtin_constructor(capability, version.clone()),
                );
            }
        }
        catalog
    }

    /// Register (or replace) the constructor for `capability` on `version`.
    pub fn register(
        &mut self,
        capability: Capability,
        version: &VersionId,
        constructor: AdapterConstructor,
    ) -> Option<AdapterConstructor> {
        self.constructors
            .insert(canonical_identifier(capability, version), constructor)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.constructors.contains_key(identifier)
    }

    /// Registered identifiers, sorted.
    pub fn identifiers(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

/// Pick the wire profile for the protocol the host actually speaks.
fn profile_for(
    version: &VersionId,
    ctx: &AdapterContext<'_>,
) -> std::result::Result<&'static ProtocolProfile, String> {
    let protocol = ctx.host.protocol_version();
    ProtocolProfile::lookup(version, protocol).ok_or_else(|| {
        format!(
            "protocol {} is not supported on {} (supported: {:?})",
            protocol,
            version,
            ProtocolProfile::protocols(version)
        )
    })
}

fn builtin_constructor(capability: Capability, version: VersionId) -> AdapterConstructor {
    match capability {
        Capability::Nbt => Box::new(move |ctx: &AdapterContext<'_>| -> Built {
            let profile = profile_for(&version, ctx)?;
            Ok(AdapterHandle::Nbt(Arc::new(RootTagAdapter::new(
                profile.snbt,
            ))))
        }),
        Capability::Particle => Box::new(move |ctx: &AdapterContext<'_>| -> Built {
            let profile = profile_for(&version, ctx)?;
            let handle = match profile.particles {
                ParticleFamily::Legacy { minor } => {
                    AdapterHandle::Particle(Arc::new(LegacyParticleAdapter::new(profile, minor)))
                }
                ParticleFamily::Registry { minor, registry } => AdapterHandle::Particle(
                    Arc::new(RegistryParticleAdapter::new(profile, minor, registry)?),
                ),
            };
            Ok(handle)
        }),
        Capability::Pathfinder => Box::new(move |ctx: &AdapterContext<'_>| -> Built {
            let profile = profile_for(&version, ctx)?;
            Ok(AdapterHandle::Pathfinder(Arc::new(HiddenPathfinder::new(
                profile,
                ctx.config.clone(),
            ))))
        }),
        Capability::Glow => Box::new(move |ctx: &AdapterContext<'_>| -> Built {
            let profile = profile_for(&version, ctx)?;
            Ok(AdapterHandle::Glow(Arc::new(GlowEnchantment::new(
                profile.glow_key,
                ctx.config,
            ))))
        }),
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

pub struct AdapterFactory {
    catalog: AdapterCatalog,
}

impl AdapterFactory {
    pub fn new(catalog: AdapterCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &AdapterCatalog {
        &self.catalog
    }

    /// Construct the adapter registered for `(capability, version)`.
    pub fn instantiate(
        &self,
        capability: Capability,
        version: &VersionId,
        ctx: &AdapterContext<'_>,
    ) -> Result<AdapterHandle> {
        let identifier = canonical_identifier(capability, version);
        let constructor = self.catalog.constructors.get(&identifier).ok_or_else(|| {
            CompatError::UnsupportedVersion {
                capability,
                version: version.clone(),
            }
        })?;

        // A panicking constructor only costs its own capability.
        let built = panic::catch_unwind(AssertUnwindSafe(|| constructor(ctx))).unwrap_or_else(
            |payload| Err(format!("constructor panicked: {}", panic_message(&*payload))),
        );
        let handle = built.map_err(|reason| CompatError::AdapterInstantiation {
            identifier: identifier.clone(),
            reason,
        })?;
        if handle.capability() != capability {
            return Err(CompatError::AdapterInstantiation {
                identifier,
                reason: format!("constructor built a {} adapter", handle.capability()),
            });
        }

        debug!("Instantiated {}", identifier);
        Ok(handle)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string payload")
}

impl Default for AdapterFactory {
    fn default() -> Self {
        Self::new(AdapterCatalog::builtin())
    }
}
