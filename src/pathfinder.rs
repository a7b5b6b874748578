//! Pathfinder capability: walk an invisible host mob from a start point to
//! an end point and report every step.
//!
//! ## Session lifecycle
//!
//! ```text
//! Created ──spawn ok──▶ Moving ──arrived──▶ Completed
//!                          │
//!                          └──cancel()────▶ Cancelled
//! ```
//!
//! The mob stays hidden from every client: a destroy-entities packet goes
//! to each observer online at spawn time, and a join hook (registered
//! before the mob exists) sends it to each observer that connects later.
//!
//! Phase changes and callbacks run under one re-entrant gate per session.
//! A `cancel()` that returns on another thread therefore happens strictly
//! before or after a whole tick, and a `cancel()` made from inside a
//! callback re-enters the gate instead of deadlocking.

use crate::error::{CompatError, Result};
use crate::host::{
    AiProfile, Goal, GoalStatus, HostServer, HostWorld, Location, Mob, MobSpawn, Observer,
};
use crate::protocol::{DestroyEntities, ProtocolProfile};
use crate::types::{CompatConfig, EntityId, SubscriptionId, Vec3};
use log::{debug, info, warn};
use parking_lot::ReentrantMutex;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::sync::Arc;

pub type StepCallback = Box<dyn FnMut(&dyn Mob) + Send>;
pub type CompleteCallback = Box<dyn FnOnce(&dyn Mob) + Send>;

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Builder for a path session. Every field is required; [`PathfinderAdapter::spawn`]
/// rejects an incomplete request before touching the host.
pub struct PathRequest {
    start: Option<Location>,
    end: Option<Vec3>,
    speed: f64,
    on_step: Option<StepCallback>,
    on_complete: Option<CompleteCallback>,
}

impl Default for PathRequest {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            speed: 1.0,
            on_step: None,
            on_complete: None,
        }
    }
}

impl PathRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(mut self, start: Location) -> Self {
        self.start = Some(start);
        self
    }

    pub fn end(mut self, end: Vec3) -> Self {
        self.end = Some(end);
        self
    }

    pub fn speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn on_step(mut self, f: impl FnMut(&dyn Mob) + Send + 'static) -> Self {
        self.on_step = Some(Box::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl FnOnce(&dyn Mob) + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    fn validate(self) -> Result<ValidPath> {
        let start = self
            .start
            .ok_or_else(|| invalid("start location is required"))?;
        let world = start
            .world
            .ok_or_else(|| invalid("start location has no world"))?;
        let end = self.end.ok_or_else(|| invalid("end location is required"))?;
        let on_step = self
            .on_step
            .ok_or_else(|| invalid("on_step callback is required"))?;
        let on_complete = self
            .on_complete
            .ok_or_else(|| invalid("on_complete callback is required"))?;
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(invalid("speed must be a positive finite number"));
        }
        Ok(ValidPath {
            world,
            start: start.position,
            end,
            speed: self.speed,
            on_step,
            on_complete,
        })
    }
}

impl std::fmt::Debug for PathRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathRequest")
            .field("start", &self.start)
            .field("end", &self.end)
            .field("speed", &self.speed)
            .field("on_step", &self.on_step.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

fn invalid(reason: &str) -> CompatError {
    CompatError::Validation(reason.to_string())
}

struct ValidPath {
    world: Arc<dyn HostWorld>,
    start: Vec3,
    end: Vec3,
    speed: f64,
    on_step: StepCallback,
    on_complete: CompleteCallback,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathPhase {
    Created,
    Moving,
    Completed,
    Cancelled,
}

impl PathPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, PathPhase::Completed | PathPhase::Cancelled)
    }
}

struct SessionState {
    phase: Cell<PathPhase>,
    subscription: Cell<Option<SubscriptionId>>,
}

type Gate = Arc<ReentrantMutex<SessionState>>;

/// Move to `next` and tear down the join hook. Returns `false` if the
/// session had already terminated. Caller holds the gate.
fn terminate(state: &SessionState, host: &dyn HostServer, next: PathPhase) -> bool {
    if state.phase.get().is_terminal() {
        return false;
    }
    state.phase.set(next);
    if let Some(subscription) = state.subscription.take() {
        if !host.unsubscribe_join(subscription) {
            warn!("Join hook {:?} was already gone", subscription);
        }
    }
    true
}

/// Handle to a running path. Cloning shares the session; dropping a handle
/// does not stop it.
#[derive(Clone)]
pub struct PathSession {
    entity: Arc<dyn Mob>,
    gate: Gate,
    host: Arc<dyn HostServer>,
}

impl PathSession {
    pub fn entity_id(&self) -> EntityId {
        self.entity.id()
    }

    pub fn entity(&self) -> &Arc<dyn Mob> {
        &self.entity
    }

    pub fn phase(&self) -> PathPhase {
        self.gate.lock().phase.get()
    }

    /// Stop the session. Returns `true` if this call cancelled it, `false`
    /// if it had already completed or been cancelled. Once this returns
    /// `true` no further callback runs.
    pub fn cancel(&self) -> bool {
        let state = self.gate.lock();
        if !terminate(&state, &*self.host, PathPhase::Cancelled) {
            return false;
        }
        self.entity.discard();
        info!("Path session for entity {} cancelled", self.entity.id());
        true
    }
}

impl std::fmt::Debug for PathSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathSession")
            .field("entity", &self.entity.id())
            .field("phase", &self.phase())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Steering goal
// ---------------------------------------------------------------------------

/// Host goal that drives the mob toward `end` once per tick.
struct SteeringGoal {
    gate: Gate,
    host: Arc<dyn HostServer>,
    end: Vec3,
    speed: f64,
    arrival_radius: f64,
    on_step: StepCallback,
    on_complete: Option<CompleteCallback>,
}

impl Goal for SteeringGoal {
    fn tick(&mut self, mob: &dyn Mob) -> GoalStatus {
        let gate = Arc::clone(&self.gate);
        let state = gate.lock();
        if state.phase.get() != PathPhase::Moving {
            return GoalStatus::Finished;
        }

        if mob.position().distance(&self.end) <= self.arrival_radius {
            terminate(&state, &*self.host, PathPhase::Completed);
            if let Some(on_complete) = self.on_complete.take() {
                on_complete(mob);
            }
            mob.discard();
            info!("Path session for entity {} completed", mob.id());
            return GoalStatus::Finished;
        }

        if !mob.navigate_to(self.end, self.speed) {
            debug!("Entity {} has no path to {} this tick", mob.id(), self.end);
            return GoalStatus::Running;
        }
        (self.on_step)(mob);
        GoalStatus::Running
    }
}

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

pub trait PathfinderAdapter: Send + Sync {
    fn spawn(&self, host: &Arc<dyn HostServer>, request: PathRequest) -> Result<PathSession>;
}

/// Name-based (MD5, version 3) UUID for the hidden entity with `id`.
pub fn entity_uuid(id: EntityId) -> [u8; 16] {
    let mut bytes = md5::compute(format!("PathfinderEntity:{}", id.0)).0;
    bytes[6] = (bytes[6] & 0x0F) | 0x30;
    bytes[8] = (bytes[8] & 0x3F) | 0x80;
    bytes
}

/// Hyphenated lowercase form of a UUID.
pub fn format_uuid(bytes: &[u8; 16]) -> String {
    let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

/// Pathfinder that walks an AI-less, invisible mob and hides it from every
/// client with the revision's destroy-entities packet.
pub struct HiddenPathfinder {
    profile: &'static ProtocolProfile,
    config: CompatConfig,
}

impl HiddenPathfinder {
    pub fn new(profile: &'static ProtocolProfile, config: CompatConfig) -> Self {
        Self { profile, config }
    }
}

impl PathfinderAdapter for HiddenPathfinder {
    fn spawn(&self, host: &Arc<dyn HostServer>, request: PathRequest) -> Result<PathSession> {
        let path = request.validate()?;

        let id = path.world.allocate_entity_id();
        let destroy = DestroyEntities::single(id).encode(self.profile);

        let gate: Gate = Arc::new(ReentrantMutex::new(SessionState {
            phase: Cell::new(PathPhase::Created),
            subscription: Cell::new(None),
        }));

        // Hook first, so nobody can join between insertion and hiding.
        let hook_packets = destroy.clone();
        let subscription = host.subscribe_join(Box::new(move |observer: &Arc<dyn Observer>| {
            for packet in &hook_packets {
                observer.send_packet(packet.clone());
            }
        }));
        gate.lock().subscription.set(Some(subscription));

        let spawn = MobSpawn {
            id,
            uuid: entity_uuid(id),
            kind: self.config.hidden_entity_kind.clone(),
            position: path.start,
            silent: true,
            invisible: true,
            invulnerable: true,
            custom_name_visible: false,
            health: self.config.entity_health,
            ai: AiProfile::Disabled,
        };
        let mob = match path.world.spawn_mob(spawn) {
            Ok(mob) => mob,
            Err(e) => {
                host.unsubscribe_join(subscription);
                warn!("Hidden entity {} rejected by '{}': {}", id, path.world.name(), e);
                return Err(e.into());
            }
        };

        for observer in host.online_observers() {
            for packet in &destroy {
                observer.send_packet(packet.clone());
            }
        }

        gate.lock().phase.set(PathPhase::Moving);
        mob.install_goal(
            self.config.goal_priority,
            Box::new(SteeringGoal {
                gate: Arc::clone(&gate),
                host: Arc::clone(host),
                end: path.end,
                speed: path.speed,
                arrival_radius: self.config.arrival_radius,
                on_step: path.on_step,
                on_complete: Some(path.on_complete),
            }),
        );

        info!(
            "Path session started: entity {} in '{}' {} -> {} at speed {}",
            id,
            path.world.name(),
            path.start,
            path.end,
            path.speed
        );
        Ok(PathSession {
            entity: mob,
            gate,
            host: Arc::clone(host),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_uuid_is_name_based_version_3() {
        let uuid = entity_uuid(EntityId(7));
        assert_eq!(uuid[6] >> 4, 3);
        assert_eq!(uuid[8] & 0xC0, 0x80);
        assert_eq!(uuid, entity_uuid(EntityId(7)));
        assert_ne!(uuid, entity_uuid(EntityId(8)));
    }

    #[test]
    fn terminal_phases() {
        assert!(!PathPhase::Created.is_terminal());
        assert!(!PathPhase::Moving.is_terminal());
        assert!(PathPhase::Completed.is_terminal());
        assert!(PathPhase::Cancelled.is_terminal());
    }
}
