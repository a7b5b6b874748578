//! In-memory host for tests and the probe binary.
//!
//! Behaves like a single-threaded game server that is driven by explicit
//! [`MemoryWorld::tick`] calls: mobs walk in straight lines, goals run in
//! priority order, and a connecting observer sees join hooks fire before
//! the host tells it about existing entities.

use crate::enchant::{Enchantment, EnchantmentKey};
use crate::error::HostError;
use crate::host::{Goal, GoalStatus, HostServer, HostWorld, JoinHook, Mob, MobSpawn, Observer};
use crate::protocol::{Packet, ProtocolProfile};
use crate::types::{EntityId, ObserverId, SubscriptionId, Vec3};
use crate::version::VersionId;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Blocks walked per tick at speed 1.0.
pub const BLOCKS_PER_TICK: f64 = 0.25;

// ---------------------------------------------------------------------------
// Observer
// ---------------------------------------------------------------------------

/// Something an observer was told, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Packet(Packet),
    /// The host itself announced an entity to this client.
    EngineSpawn(EntityId),
}

pub struct RecordingObserver {
    id: ObserverId,
    deliveries: Mutex<Vec<Delivery>>,
}

impl RecordingObserver {
    pub fn new(id: ObserverId) -> Self {
        Self {
            id,
            deliveries: Mutex::new(Vec::new()),
        }
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().clone()
    }

    pub fn packets(&self) -> Vec<Packet> {
        self.deliveries
            .lock()
            .iter()
            .filter_map(|d| match d {
                Delivery::Packet(p) => Some(p.clone()),
                Delivery::EngineSpawn(_) => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.deliveries.lock().clear();
    }

    fn announce(&self, id: EntityId) {
        self.deliveries.lock().push(Delivery::EngineSpawn(id));
    }
}

impl Observer for RecordingObserver {
    fn id(&self) -> ObserverId {
        self.id
    }

    fn send_packet(&self, packet: Packet) {
        self.deliveries.lock().push(Delivery::Packet(packet));
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

type SharedHook = Arc<dyn Fn(&Arc<dyn Observer>) + Send + Sync>;

#[derive(Default)]
struct Online {
    observers: Mutex<Vec<Arc<RecordingObserver>>>,
}

impl Online {
    fn snapshot(&self) -> Vec<Arc<RecordingObserver>> {
        self.observers.lock().clone()
    }
}

pub struct MemoryHost {
    signature: String,
    protocol: i32,
    online: Arc<Online>,
    worlds: Mutex<Vec<Arc<MemoryWorld>>>,
    hooks: Mutex<Vec<(SubscriptionId, SharedHook)>>,
    next_subscription: AtomicU64,
    next_observer: AtomicU64,
    unsubscribed: AtomicUsize,
    enchantments: Mutex<Vec<Enchantment>>,
    enchantment_registrations: AtomicUsize,
    reject_enchantments: AtomicBool,
}

impl MemoryHost {
    /// A host reporting `signature`, speaking the newest protocol shipped
    /// for the revision it names (or `-1` if it names none).
    pub fn new(signature: impl Into<String>) -> Self {
        let signature = signature.into();
        let protocol = VersionId::from_signature(&signature)
            .and_then(|v| ProtocolProfile::latest(&v))
            .map_or(-1, |p| p.protocol);
        Self {
            signature,
            protocol,
            online: Arc::new(Online::default()),
            worlds: Mutex::new(Vec::new()),
            hooks: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
            next_observer: AtomicU64::new(1),
            unsubscribed: AtomicUsize::new(0),
            enchantments: Mutex::new(Vec::new()),
            enchantment_registrations: AtomicUsize::new(0),
            reject_enchantments: AtomicBool::new(false),
        }
    }

    /// A host reporting a craftbukkit-style package for `version`.
    pub fn for_version(version: &str) -> Self {
        Self::new(format!("org.bukkit.craftbukkit.v{}", version))
    }

    /// Speak an older (or unsupported) client protocol.
    pub fn with_protocol(mut self, protocol: i32) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn create_world(&self, name: impl Into<String>) -> Arc<MemoryWorld> {
        let world = Arc::new(MemoryWorld::new(name.into(), Arc::clone(&self.online)));
        self.worlds.lock().push(Arc::clone(&world));
        world
    }

    /// Connect a new observer: join hooks run first, then the host
    /// announces every live entity.
    pub fn connect(&self) -> Arc<RecordingObserver> {
        let id = ObserverId(self.next_observer.fetch_add(1, Ordering::Relaxed));
        let observer = Arc::new(RecordingObserver::new(id));
        let as_dyn: Arc<dyn Observer> = observer.clone();

        let hooks: Vec<SharedHook> = self.hooks.lock().iter().map(|(_, h)| h.clone()).collect();
        for hook in hooks {
            hook(&as_dyn);
        }

        let worlds = self.worlds.lock().clone();
        for world in worlds {
            for mob in world.mobs() {
                observer.announce(mob.id());
            }
        }

        self.online.observers.lock().push(Arc::clone(&observer));
        observer
    }

    pub fn disconnect(&self, id: ObserverId) {
        self.online.observers.lock().retain(|o| o.id != id);
    }

    pub fn active_hooks(&self) -> usize {
        self.hooks.lock().len()
    }

    /// Successful `unsubscribe_join` calls so far.
    pub fn unsubscribed(&self) -> usize {
        self.unsubscribed.load(Ordering::SeqCst)
    }

    pub fn enchantment_registrations(&self) -> usize {
        self.enchantment_registrations.load(Ordering::SeqCst)
    }

    pub fn set_reject_enchantments(&self, reject: bool) {
        self.reject_enchantments.store(reject, Ordering::SeqCst);
    }

    /// Pre-register an enchantment as if the host shipped it.
    pub fn preload_enchantment(&self, enchantment: Enchantment) {
        self.enchantments.lock().push(enchantment);
    }
}

impl HostServer for MemoryHost {
    fn build_signature(&self) -> String {
        self.signature.clone()
    }

    fn protocol_version(&self) -> i32 {
        self.protocol
    }

    fn online_observers(&self) -> Vec<Arc<dyn Observer>> {
        self.online
            .snapshot()
            .into_iter()
            .map(|o| o as Arc<dyn Observer>)
            .collect()
    }

    fn subscribe_join(&self, hook: JoinHook) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.hooks.lock().push((id, Arc::from(hook)));
        id
    }

    fn unsubscribe_join(&self, id: SubscriptionId) -> bool {
        let mut hooks = self.hooks.lock();
        let before = hooks.len();
        hooks.retain(|(sub, _)| *sub != id);
        let removed = hooks.len() != before;
        if removed {
            self.unsubscribed.fetch_add(1, Ordering::SeqCst);
        }
        removed
    }

    fn enchantment_registered(&self, key: &EnchantmentKey) -> bool {
        self.enchantments.lock().iter().any(|e| &e.key == key)
    }

    fn register_enchantment(&self, enchantment: &Enchantment) -> Result<(), HostError> {
        if self.reject_enchantments.load(Ordering::SeqCst) {
            return Err(HostError::EnchantmentRejected(
                enchantment.key.to_string(),
                "registry is frozen".into(),
            ));
        }
        let mut known = self.enchantments.lock();
        if known.iter().any(|e| e.key == enchantment.key) {
            return Err(HostError::EnchantmentRejected(
                enchantment.key.to_string(),
                "key already in use".into(),
            ));
        }
        known.push(enchantment.clone());
        self.enchantment_registrations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

pub struct MemoryWorld {
    name: String,
    online: Arc<Online>,
    next_entity: AtomicI32,
    mobs: Mutex<Vec<Arc<MemoryMob>>>,
    reject_spawns: AtomicBool,
}

impl MemoryWorld {
    fn new(name: String, online: Arc<Online>) -> Self {
        Self {
            name,
            online,
            next_entity: AtomicI32::new(1),
            mobs: Mutex::new(Vec::new()),
            reject_spawns: AtomicBool::new(false),
        }
    }

    /// Live (not yet removed) mobs.
    pub fn mobs(&self) -> Vec<Arc<MemoryMob>> {
        self.mobs.lock().clone()
    }

    pub fn mob(&self, id: EntityId) -> Option<Arc<MemoryMob>> {
        self.mobs.lock().iter().find(|m| m.id() == id).cloned()
    }

    pub fn set_reject_spawns(&self, reject: bool) {
        self.reject_spawns.store(reject, Ordering::SeqCst);
    }

    /// One simulation tick: run every mob's goals, then remove discarded
    /// mobs.
    pub fn tick(&self) {
        for mob in self.mobs() {
            if !mob.is_discarded() {
                mob.tick_goals();
            }
        }
        self.mobs.lock().retain(|m| !m.is_discarded());
    }
}

impl HostWorld for MemoryWorld {
    fn name(&self) -> &str {
        &self.name
    }

    fn allocate_entity_id(&self) -> EntityId {
        EntityId(self.next_entity.fetch_add(1, Ordering::Relaxed))
    }

    fn spawn_mob(&self, spawn: MobSpawn) -> Result<Arc<dyn Mob>, HostError> {
        if self.reject_spawns.load(Ordering::SeqCst) {
            return Err(HostError::SpawnRejected(self.name.clone()));
        }
        let id = spawn.id;
        let mob = Arc::new(MemoryMob::new(spawn));
        self.mobs.lock().push(Arc::clone(&mob));
        for observer in self.online.snapshot() {
            observer.announce(id);
        }
        Ok(mob)
    }
}

// ---------------------------------------------------------------------------
// Mob
// ---------------------------------------------------------------------------

pub struct MemoryMob {
    spawn: MobSpawn,
    position: Mutex<Vec3>,
    goals: Mutex<Vec<(u8, Box<dyn Goal>)>>,
    discarded: AtomicBool,
    stuck: AtomicBool,
}

impl MemoryMob {
    fn new(spawn: MobSpawn) -> Self {
        Self {
            position: Mutex::new(spawn.position),
            spawn,
            goals: Mutex::new(Vec::new()),
            discarded: AtomicBool::new(false),
            stuck: AtomicBool::new(false),
        }
    }

    /// The parameters the mob was spawned with.
    pub fn spawn(&self) -> &MobSpawn {
        &self.spawn
    }

    pub fn is_discarded(&self) -> bool {
        self.discarded.load(Ordering::SeqCst)
    }

    /// While stuck, navigation finds no path and the mob stays put.
    pub fn set_stuck(&self, stuck: bool) {
        self.stuck.store(stuck, Ordering::SeqCst);
    }

    pub fn goal_count(&self) -> usize {
        self.goals.lock().len()
    }

    pub fn goal_priorities(&self) -> Vec<u8> {
        self.goals.lock().iter().map(|(p, _)| *p).collect()
    }

    /// Tick goals in priority order (lowest first). The goal list is taken
    /// out of the lock for the duration so goals may call back into the mob.
    fn tick_goals(&self) {
        let mut goals = std::mem::take(&mut *self.goals.lock());
        let mut kept = Vec::with_capacity(goals.len());
        for (priority, mut goal) in goals.drain(..) {
            if self.is_discarded() {
                kept.push((priority, goal));
                continue;
            }
            if goal.tick(self) == GoalStatus::Running {
                kept.push((priority, goal));
            }
        }
        let mut slot = self.goals.lock();
        kept.append(&mut slot);
        kept.sort_by_key(|(priority, _)| *priority);
        *slot = kept;
    }
}

impl Mob for MemoryMob {
    fn id(&self) -> EntityId {
        self.spawn.id
    }

    fn position(&self) -> Vec3 {
        *self.position.lock()
    }

    fn navigate_to(&self, target: Vec3, speed: f64) -> bool {
        if self.stuck.load(Ordering::SeqCst) {
            return false;
        }
        let mut position = self.position.lock();
        *position = position.step_towards(&target, speed * BLOCKS_PER_TICK);
        true
    }

    fn install_goal(&self, priority: u8, goal: Box<dyn Goal>) {
        let mut goals = self.goals.lock();
        goals.push((priority, goal));
        goals.sort_by_key(|(priority, _)| *priority);
    }

    fn discard(&self) {
        self.discarded.store(true, Ordering::SeqCst);
    }
}
