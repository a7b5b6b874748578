//! Compat – the stable surface plugin code calls.

use crate::enchant::Enchantment;
use crate::error::Result;
use crate::factory::{AdapterCatalog, AdapterContext, AdapterFactory};
use crate::host::{HostServer, Observer};
use crate::item::{ItemStack, ItemTag};
use crate::particle::{ParticleSpec, ResolvedParticle};
use crate::pathfinder::{PathRequest, PathSession};
use crate::registry::{CapabilityRegistry, CapabilityStatus};
use crate::types::{CompatConfig, Vec3};
use crate::version::{VersionId, VersionResolver};
use log::info;
use std::sync::Arc;

pub struct Compat {
    host: Arc<dyn HostServer>,
    config: CompatConfig,
    registry: Arc<CapabilityRegistry>,
}

impl Compat {
    /// Detect the host revision and build the registry from the shipped
    /// adapters. Fails only if the revision cannot be detected; missing
    /// capabilities show up in [`Compat::report`].
    pub fn bootstrap(host: Arc<dyn HostServer>, config: CompatConfig) -> Result<Self> {
        Self::with_catalog(host, config, AdapterCatalog::builtin())
    }

    pub fn with_catalog(
        host: Arc<dyn HostServer>,
        config: CompatConfig,
        catalog: AdapterCatalog,
    ) -> Result<Self> {
        let resolver = VersionResolver::new(Arc::clone(&host));
        let version = resolver.resolve()?;

        let factory = AdapterFactory::new(catalog);
        let registry = {
            let ctx = AdapterContext {
                host: host.as_ref(),
                config: &config,
            };
            CapabilityRegistry::initialize(version, &factory, &ctx)
        };
        info!("Compat layer bootstrapped on {}", version);

        Ok(Self {
            host,
            config,
            registry: Arc::new(registry),
        })
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    pub fn version(&self) -> &VersionId {
        self.registry.version()
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &CompatConfig {
        &self.config
    }

    pub fn report(&self) -> &[CapabilityStatus] {
        self.registry.report()
    }

    // -----------------------------------------------------------------------
    // NBT
    // -----------------------------------------------------------------------

    pub fn nbt_get(&self, item: &ItemStack) -> Result<ItemTag> {
        Ok(self.registry.nbt()?.get(item))
    }

    pub fn nbt_set(&self, item: &ItemStack, tag: &ItemTag) -> Result<ItemStack> {
        self.registry.nbt()?.set(item, tag)
    }

    // -----------------------------------------------------------------------
    // Particles
    // -----------------------------------------------------------------------

    pub fn resolve_particle(&self, name: &str) -> Result<ResolvedParticle> {
        self.registry.particle()?.resolve(name)
    }

    pub fn play_particle(
        &self,
        observer: &dyn Observer,
        origin: Vec3,
        spec: &ParticleSpec,
    ) -> Result<()> {
        self.registry.particle()?.play(observer, origin, spec)
    }

    // -----------------------------------------------------------------------
    // Pathfinding
    // -----------------------------------------------------------------------

    pub fn start_path(&self, request: PathRequest) -> Result<PathSession> {
        self.registry.pathfinder()?.spawn(&self.host, request)
    }

    // -----------------------------------------------------------------------
    // Glow
    // -----------------------------------------------------------------------

    pub fn glow_enchantment(&self) -> Result<Enchantment> {
        self.registry.glow()?.enchantment(self.host.as_ref())
    }
}

impl std::fmt::Debug for Compat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compat")
            .field("version", self.version())
            .field("registry", &self.registry)
            .finish()
    }
}
