//! Host binding layer.
//!
//! Everything the adapters need from the running server (connections,
//! join events, world entity tables, the goal selector and enchantment
//! registration) goes through these traits. A server integration
//! implements them once; adapters never reach past them.

use crate::enchant::{Enchantment, EnchantmentKey};
use crate::error::HostError;
use crate::protocol::Packet;
use crate::types::{EntityId, ObserverId, SubscriptionId, Vec3};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Connections
// ---------------------------------------------------------------------------

/// A connected client.
pub trait Observer: Send + Sync {
    fn id(&self) -> ObserverId;

    /// Queue a packet on this connection. Fire-and-forget: delivery errors
    /// are the host's to log.
    fn send_packet(&self, packet: Packet);
}

/// Callback run for every observer that connects after registration.
pub type JoinHook = Box<dyn Fn(&Arc<dyn Observer>) + Send + Sync>;

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

pub trait HostServer: Send + Sync {
    /// Self-reported build identifier; parsed by [`crate::version::VersionResolver`].
    fn build_signature(&self) -> String;

    /// Client protocol number the server speaks. One revision can serve
    /// several (1.17 and 1.17.1 are both `1_17_R1`).
    fn protocol_version(&self) -> i32;

    fn online_observers(&self) -> Vec<Arc<dyn Observer>>;

    /// Register a join hook. Hooks must run before the host sends the new
    /// connection anything about existing entities.
    fn subscribe_join(&self, hook: JoinHook) -> SubscriptionId;

    /// Returns `false` if the subscription was already gone.
    fn unsubscribe_join(&self, id: SubscriptionId) -> bool;

    fn enchantment_registered(&self, key: &EnchantmentKey) -> bool;

    /// One-time registration of a custom enchantment. Hosts without an
    /// extension point for this must return an error rather than patch
    /// their registry behind its back.
    fn register_enchantment(&self, enchantment: &Enchantment) -> Result<(), HostError>;
}

// ---------------------------------------------------------------------------
// Worlds & entities
// ---------------------------------------------------------------------------

pub trait HostWorld: Send + Sync {
    fn name(&self) -> &str;

    /// Reserve an entity id without inserting anything yet.
    fn allocate_entity_id(&self) -> EntityId;

    /// Insert a mob into the world's entity table under `spawn.id`.
    fn spawn_mob(&self, spawn: MobSpawn) -> Result<Arc<dyn Mob>, HostError>;
}

/// Whether the host should run its default goal-selection setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProfile {
    Vanilla,
    /// No built-in goals; only goals installed through [`Mob::install_goal`] run.
    Disabled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MobSpawn {
    pub id: EntityId,
    pub uuid: [u8; 16],
    pub kind: String,
    pub position: Vec3,
    pub silent: bool,
    pub invisible: bool,
    pub invulnerable: bool,
    pub custom_name_visible: bool,
    pub health: f32,
    pub ai: AiProfile,
}

pub trait Mob: Send + Sync {
    fn id(&self) -> EntityId;
    fn position(&self) -> Vec3;

    /// Ask the host navigation to head for `target`. Returns `false` when no
    /// path could be computed.
    fn navigate_to(&self, target: Vec3, speed: f64) -> bool;

    fn install_goal(&self, priority: u8, goal: Box<dyn Goal>);

    /// Remove the mob from its world at the end of the current tick.
    fn discard(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalStatus {
    Running,
    /// The host drops the goal.
    Finished,
}

/// A goal ticked by the host on its simulation thread.
pub trait Goal: Send {
    fn tick(&mut self, mob: &dyn Mob) -> GoalStatus;
}

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// A point in a (possibly unknown) world.
#[derive(Clone)]
pub struct Location {
    pub world: Option<Arc<dyn HostWorld>>,
    pub position: Vec3,
}

impl Location {
    pub fn new(world: Arc<dyn HostWorld>, position: Vec3) -> Self {
        Self {
            world: Some(world),
            position,
        }
    }

    /// A location with no world attached.
    pub fn detached(position: Vec3) -> Self {
        Self {
            world: None,
            position,
        }
    }
}

impl std::fmt::Debug for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Location")
            .field("world", &self.world.as_ref().map(|w| w.name().to_string()))
            .field("position", &self.position)
            .finish()
    }
}
