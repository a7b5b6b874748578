//! Clientbound wire protocol.
//!
//! This module owns **every packet this crate puts on a connection**. The
//! host owns transport, framing and compression; we hand it a packet id and
//! a payload laid out exactly as the client of that revision expects.
//!
//! ## Revision table
//!
//! | Version   | Protocol | Particle | Destroy        | Position | Item slot | SNBT          |
//! |-----------|----------|----------|----------------|----------|-----------|---------------|
//! | `1_8_R3`  | 47       | `0x2A`   | `0x13` counted | f32      | item id   | indexed lists |
//! | `1_12_R1` | 335      | `0x22`   | `0x31` counted | f32      | item id   | plain         |
//! | `1_12_R1` | 338, 340 | `0x22`   | `0x32` counted | f32      | item id   | plain         |
//! | `1_13_R2` | 401      | `0x24`   | `0x35` counted | f32      | item id   | plain         |
//! | `1_13_R2` | 404      | `0x24`   | `0x35` counted | f32      | present   | plain         |
//! | `1_16_R3` | 754      | `0x22`   | `0x36` counted | f64      | present   | smart quotes  |
//! | `1_17_R1` | 755      | `0x24`   | `0x3A` single  | f64      | present   | smart quotes  |
//! | `1_17_R1` | 756      | `0x24`   | `0x3A` counted | f64      | present   | smart quotes  |
//!
//! ## Rules
//!
//! 1. All multi-byte numbers are big-endian; ids and counts are VarInts
//!    unless the layout says otherwise.
//! 2. A layout change is a new profile row, never a branch inside a caller.
//! 3. One server revision can serve several client protocols. Rows are
//!    keyed by `(version, protocol)`; a protocol with no row is unsupported.

use crate::enchant::GlowKeyStyle;
use crate::particle::ParticleFamily;
use crate::snbt::SnbtDialect;
use crate::types::{EntityId, Vec3};
use crate::version::VersionId;
use bytes::{Buf, BufMut, Bytes, BytesMut};

// ---------------------------------------------------------------------------
// VarInt
// ---------------------------------------------------------------------------

pub fn put_var_int(buf: &mut BytesMut, value: i32) {
    let mut v = value as u32;
    loop {
        if v & !0x7F == 0 {
            buf.put_u8(v as u8);
            return;
        }
        buf.put_u8(((v & 0x7F) | 0x80) as u8);
        v >>= 7;
    }
}

/// Read a VarInt, or `None` if the buffer ends early or the value runs
/// past five bytes.
pub fn get_var_int(buf: &mut impl Buf) -> Option<i32> {
    let mut value: u32 = 0;
    for shift in 0..5 {
        if !buf.has_remaining() {
            return None;
        }
        let byte = buf.get_u8();
        value |= ((byte & 0x7F) as u32) << (7 * shift);
        if byte & 0x80 == 0 {
            return Some(value as i32);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Packet
// ---------------------------------------------------------------------------

/// A clientbound packet: id plus payload, unframed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub id: i32,
    pub payload: Bytes,
}

impl Packet {
    pub fn new(id: i32, payload: Bytes) -> Self {
        Self { id, payload }
    }

    /// VarInt id followed by the payload.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.payload.len() + 5);
        put_var_int(&mut buf, self.id);
        buf.extend_from_slice(&self.payload);
        buf.freeze()
    }
}

// ---------------------------------------------------------------------------
// Revision profiles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionPrecision {
    Float,
    Double,
}

/// How the destroy packet carries its ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyLayout {
    /// VarInt count, then VarInt ids.
    Counted,
    /// Exactly one VarInt id per packet (1.17.0 only).
    Single,
}

/// How an item slot is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotLayout {
    /// Short item id, `-1` for an empty slot.
    ItemId,
    /// Boolean present flag (1.13.2 onward).
    Present,
}

/// Everything that differs on the wire between supported protocols.
#[derive(Debug)]
pub struct ProtocolProfile {
    pub version: &'static str,
    pub protocol: i32,
    pub particle_packet: i32,
    pub destroy_packet: i32,
    pub destroy_layout: DestroyLayout,
    pub item_slot: SlotLayout,
    pub particle_position: PositionPrecision,
    pub particles: ParticleFamily,
    pub snbt: SnbtDialect,
    pub glow_key: GlowKeyStyle,
}

pub static PROFILES: &[ProtocolProfile] = &[
    ProtocolProfile {
        version: "1_8_R3",
        protocol: 47,
        particle_packet: 0x2A,
        destroy_packet: 0x13,
        destroy_layout: DestroyLayout::Counted,
        item_slot: SlotLayout::ItemId,
        particle_position: PositionPrecision::Float,
        particles: ParticleFamily::Legacy { minor: 8 },
        snbt: SnbtDialect::IndexedLists,
        glow_key: GlowKeyStyle::Numeric,
    },
    ProtocolProfile {
        version: "1_12_R1",
        protocol: 335,
        particle_packet: 0x22,
        destroy_packet: 0x31,
        destroy_layout: DestroyLayout::Counted,
        item_slot: SlotLayout::ItemId,
        particle_position: PositionPrecision::Float,
        particles: ParticleFamily::Legacy { minor: 12 },
        snbt: SnbtDialect::Plain,
        glow_key: GlowKeyStyle::Numeric,
    },
    ProtocolProfile {
        version: "1_12_R1",
        protocol: 338,
        particle_packet: 0x22,
        destroy_packet: 0x32,
        destroy_layout: DestroyLayout::Counted,
        item_slot: SlotLayout::ItemId,
        particle_position: PositionPrecision::Float,
        particles: ParticleFamily::Legacy { minor: 12 },
        snbt: SnbtDialect::Plain,
        glow_key: GlowKeyStyle::Numeric,
    },
    ProtocolProfile {
        version: "1_12_R1",
        protocol: 340,
        particle_packet: 0x22,
        destroy_packet: 0x32,
        destroy_layout: DestroyLayout::Counted,
        item_slot: SlotLayout::ItemId,
        particle_position: PositionPrecision::Float,
        particles: ParticleFamily::Legacy { minor: 12 },
        snbt: SnbtDialect::Plain,
        glow_key: GlowKeyStyle::Numeric,
    },
    ProtocolProfile {
        version: "1_13_R2",
        protocol: 401,
        particle_packet: 0x24,
        destroy_packet: 0x35,
        destroy_layout: DestroyLayout::Counted,
        item_slot: SlotLayout::ItemId,
        particle_position: PositionPrecision::Float,
        particles: ParticleFamily::Registry {
            minor: 13,
            registry: crate::particle::REGISTRY_1_13,
        },
        snbt: SnbtDialect::Plain,
        glow_key: GlowKeyStyle::Namespaced,
    },
    ProtocolProfile {
        version: "1_13_R2",
        protocol: 404,
        particle_packet: 0x24,
        destroy_packet: 0x35,
        destroy_layout: DestroyLayout::Counted,
        item_slot: SlotLayout::Present,
        particle_position: PositionPrecision::Float,
        particles: ParticleFamily::Registry {
            minor: 13,
            registry: crate::particle::REGISTRY_1_13,
        },
        snbt: SnbtDialect::Plain,
        glow_key: GlowKeyStyle::Namespaced,
    },
    ProtocolProfile {
        version: "1_16_R3",
        protocol: 754,
        particle_packet: 0x22,
        destroy_packet: 0x36,
        destroy_layout: DestroyLayout::Counted,
        item_slot: SlotLayout::Present,
        particle_position: PositionPrecision::Double,
        particles: ParticleFamily::Registry {
            minor: 16,
            registry: crate::particle::REGISTRY_1_16,
        },
        snbt: SnbtDialect::SmartQuotes,
        glow_key: GlowKeyStyle::Namespaced,
    },
    ProtocolProfile {
        version: "1_17_R1",
        protocol: 755,
        particle_packet: 0x24,
        destroy_packet: 0x3A,
        destroy_layout: DestroyLayout::Single,
        item_slot: SlotLayout::Present,
        particle_position: PositionPrecision::Double,
        particles: ParticleFamily::Registry {
            minor: 17,
            registry: crate::particle::REGISTRY_1_17,
        },
        snbt: SnbtDialect::SmartQuotes,
        glow_key: GlowKeyStyle::Namespaced,
    },
    ProtocolProfile {
        version: "1_17_R1",
        protocol: 756,
        particle_packet: 0x24,
        destroy_packet: 0x3A,
        destroy_layout: DestroyLayout::Counted,
        item_slot: SlotLayout::Present,
        particle_position: PositionPrecision::Double,
        particles: ParticleFamily::Registry {
            minor: 17,
            registry: crate::particle::REGISTRY_1_17,
        },
        snbt: SnbtDialect::SmartQuotes,
        glow_key: GlowKeyStyle::Namespaced,
    },
];

impl ProtocolProfile {
    /// The row for a revision speaking `protocol`, if that pair is supported.
    pub fn lookup(version: &VersionId, protocol: i32) -> Option<&'static ProtocolProfile> {
        PROFILES
            .iter()
            .find(|p| p.version == version.as_str() && p.protocol == protocol)
    }

    /// Newest protocol row shipped for a revision.
    pub fn latest(version: &VersionId) -> Option<&'static ProtocolProfile> {
        PROFILES
            .iter()
            .filter(|p| p.version == version.as_str())
            .max_by_key(|p| p.protocol)
    }

    /// Distinct revisions, in table order.
    pub fn revisions() -> Vec<VersionId> {
        let mut seen: Vec<VersionId> = Vec::new();
        for profile in PROFILES {
            let id = profile.version_id();
            if !seen.contains(&id) {
                seen.push(id);
            }
        }
        seen
    }

    /// Protocols shipped for a revision, ascending.
    pub fn protocols(version: &VersionId) -> Vec<i32> {
        PROFILES
            .iter()
            .filter(|p| p.version == version.as_str())
            .map(|p| p.protocol)
            .collect()
    }

    pub fn version_id(&self) -> VersionId {
        VersionId::new(self.version)
    }
}

// ---------------------------------------------------------------------------
// Destroy entities
// ---------------------------------------------------------------------------

/// Tells a client to forget entities. Most protocols send a VarInt count
/// then VarInt ids in one packet; [`DestroyLayout::Single`] sends one
/// packet per id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestroyEntities {
    pub ids: Vec<EntityId>,
}

impl DestroyEntities {
    pub fn single(id: EntityId) -> Self {
        Self { ids: vec![id] }
    }

    pub fn encode(&self, profile: &ProtocolProfile) -> Vec<Packet> {
        match profile.destroy_layout {
            DestroyLayout::Counted => {
                let mut buf = BytesMut::with_capacity(5 * (self.ids.len() + 1));
                put_var_int(&mut buf, self.ids.len() as i32);
                for id in &self.ids {
                    put_var_int(&mut buf, id.0);
                }
                vec![Packet::new(profile.destroy_packet, buf.freeze())]
            }
            DestroyLayout::Single => self
                .ids
                .iter()
                .map(|id| {
                    let mut buf = BytesMut::with_capacity(5);
                    put_var_int(&mut buf, id.0);
                    Packet::new(profile.destroy_packet, buf.freeze())
                })
                .collect(),
        }
    }

    /// Parse one packet produced by [`DestroyEntities::encode`] for `profile`.
    pub fn decode(packet: &Packet, profile: &ProtocolProfile) -> Option<Self> {
        if packet.id != profile.destroy_packet {
            return None;
        }
        let mut payload = packet.payload.clone();
        let ids = match profile.destroy_layout {
            DestroyLayout::Counted => {
                let count = get_var_int(&mut payload)?;
                (0..count)
                    .map(|_| get_var_int(&mut payload).map(EntityId))
                    .collect::<Option<Vec<_>>>()?
            }
            DestroyLayout::Single => vec![EntityId(get_var_int(&mut payload)?)],
        };
        if payload.has_remaining() {
            return None;
        }
        Some(Self { ids })
    }
}

// ---------------------------------------------------------------------------
// World particles
// ---------------------------------------------------------------------------

/// Type-specific trailer of a particle packet.
#[derive(Debug, Clone, PartialEq)]
pub enum ParticleData {
    None,
    /// Legacy revisions: raw VarInt arguments (item id/data, block state).
    VarInts(Vec<i32>),
    Dust {
        rgb: [f32; 3],
        scale: f32,
    },
    DustTransition {
        from: [f32; 3],
        scale: f32,
        to: [f32; 3],
    },
    BlockState(i32),
    /// Item particles; only the empty slot is ever sent.
    EmptyItem,
    Vibration {
        origin: Vec3,
        destination: Vec3,
        ticks: i32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorldParticles {
    pub particle_id: i32,
    pub long_distance: bool,
    pub position: Vec3,
    pub offset: [f32; 3],
    pub speed: f32,
    pub count: i32,
    pub data: ParticleData,
}

impl WorldParticles {
    pub fn encode(&self, profile: &ProtocolProfile) -> Packet {
        let mut buf = BytesMut::with_capacity(64);
        buf.put_i32(self.particle_id);
        buf.put_u8(self.long_distance as u8);
        match profile.particle_position {
            PositionPrecision::Float => {
                buf.put_f32(self.position.x as f32);
                buf.put_f32(self.position.y as f32);
                buf.put_f32(self.position.z as f32);
            }
            PositionPrecision::Double => {
                buf.put_f64(self.position.x);
                buf.put_f64(self.position.y);
                buf.put_f64(self.position.z);
            }
        }
        for axis in self.offset {
            buf.put_f32(axis);
        }
        buf.put_f32(self.speed);
        buf.put_i32(self.count);

        match &self.data {
            ParticleData::None => {}
            ParticleData::VarInts(args) => {
                for arg in args {
                    put_var_int(&mut buf, *arg);
                }
            }
            ParticleData::Dust { rgb, scale } => {
                for c in rgb {
                    buf.put_f32(*c);
                }
                buf.put_f32(*scale);
            }
            ParticleData::DustTransition { from, scale, to } => {
                for c in from {
                    buf.put_f32(*c);
                }
                buf.put_f32(*scale);
                for c in to {
                    buf.put_f32(*c);
                }
            }
            ParticleData::BlockState(state) => put_var_int(&mut buf, *state),
            ParticleData::EmptyItem => match profile.item_slot {
                SlotLayout::ItemId => buf.put_i16(-1),
                SlotLayout::Present => buf.put_u8(0),
            },
            ParticleData::Vibration {
                origin,
                destination,
                ticks,
            } => {
                for v in [origin, destination] {
                    buf.put_f64(v.x);
                    buf.put_f64(v.y);
                    buf.put_f64(v.z);
                }
                buf.put_i32(*ticks);
            }
        }

        Packet::new(profile.particle_packet, buf.freeze())
    }
}
