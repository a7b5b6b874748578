//! voxel-compat
//!
//! One stable API over many incompatible voxel-game server revisions.
//!
//! ## Architecture
//!
//! ```text
//! Compat  (service.rs)                     ← stable facade
//!   └── CapabilityRegistry  (registry.rs)  ← (capability, version) -> adapter
//!         └── AdapterFactory (factory.rs)  ← canonical-identifier table
//!               ├── NbtAdapter        (item.rs, nbt.rs, snbt.rs)
//!               ├── ParticleAdapter   (particle.rs)
//!               ├── PathfinderAdapter (pathfinder.rs)
//!               └── GlowAdapter       (enchant.rs)
//! ```
//!
//! The running revision is detected once by [`version::VersionResolver`]
//! from the host's build signature. Adapters talk to the server only
//! through the traits in [`host`] and put bytes on the wire only through
//! [`protocol`].

pub mod enchant;
pub mod error;
pub mod factory;
pub mod host;
pub mod item;
pub mod mock;
pub mod nbt;
pub mod particle;
pub mod pathfinder;
pub mod protocol;
pub mod registry;
pub mod service;
pub mod snbt;
pub mod types;
pub mod version;

// Convenience re-exports
pub use error::{CompatError, HostError, NbtError, Result};
pub use item::{ItemStack, ItemTag};
pub use particle::ParticleSpec;
pub use pathfinder::{PathPhase, PathRequest, PathSession};
pub use registry::{Capability, CapabilityRegistry};
pub use service::Compat;
pub use types::{CompatConfig, EntityId, Vec3};
pub use version::VersionId;
