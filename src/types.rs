//! Core types shared across all modules.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Basic math
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn distance(&self, other: &Vec3) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Move from `self` toward `target` by at most `step`, never overshooting.
    pub fn step_towards(&self, target: &Vec3, step: f64) -> Vec3 {
        let dist = self.distance(target);
        if dist <= step || dist == 0.0 {
            return *target;
        }
        let t = step / dist;
        Vec3::new(
            self.x + (target.x - self.x) * t,
            self.y + (target.y - self.y) * t,
            self.z + (target.z - self.z) * t,
        )
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Engine-level entity id (written as a VarInt on the wire).
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct EntityId(pub i32);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A connected client receiving protocol packets.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ObserverId(pub u64);

/// Handle for a join hook registered with the host.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct SubscriptionId(pub u64);

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompatConfig {
    /// Goal-selector priority of the injected steering goal.
    pub goal_priority: u8,
    /// Health given to hidden pathfinding entities.
    pub entity_health: f32,
    /// Distance (blocks) at which a path counts as arrived.
    pub arrival_radius: f64,
    /// Host entity kind used for hidden pathfinding entities.
    pub hidden_entity_kind: String,
    /// Numeric id of the glow enchantment on hosts without namespaced keys.
    pub glow_enchantment_id: u32,
    /// Namespace of the glow enchantment key on hosts that have them.
    pub glow_namespace: String,
}

impl Default for CompatConfig {
    fn default() -> Self {
        Self {
            goal_priority: 2,
            entity_health: 2.518,
            arrival_radius: 1.0,
            hidden_entity_kind: "pig".into(),
            glow_enchantment_id: 152634,
            glow_namespace: "voxel_compat".into(),
        }
    }
}
