//! Items and the NBT capability.

use crate::error::Result;
use crate::nbt::Compound;
use crate::snbt::{self, SnbtDialect};
use log::debug;
use serde::{Deserialize, Serialize};

/// Host-native item: the fields every revision has plus its tag tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemStack {
    pub material: String,
    pub amount: u8,
    pub durability: u16,
    pub tag: Option<Compound>,
}

impl ItemStack {
    pub fn new(material: impl Into<String>, amount: u8) -> Self {
        Self {
            material: material.into(),
            amount,
            durability: 0,
            tag: None,
        }
    }

    pub fn with_tag(mut self, tag: Compound) -> Self {
        self.tag = Some(tag);
        self
    }
}

/// String form of an item's tag tree. Callers treat it as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemTag(String);

impl ItemTag {
    pub fn new(snbt: impl Into<String>) -> Self {
        Self(snbt.into())
    }

    pub fn empty() -> Self {
        Self("{}".into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Default for ItemTag {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Display for ItemTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemTag {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

pub trait NbtAdapter: Send + Sync {
    /// The item's tag tree in this revision's string form (`{}` if none).
    fn get(&self, item: &ItemStack) -> ItemTag;

    /// A copy of `item` with `tag` merged onto its existing tree.
    fn set(&self, item: &ItemStack, tag: &ItemTag) -> Result<ItemStack>;
}

/// NBT adapter for revisions that keep the item tag as a single root
/// compound; revisions differ only in how they print it.
pub struct RootTagAdapter {
    dialect: SnbtDialect,
}

impl RootTagAdapter {
    pub fn new(dialect: SnbtDialect) -> Self {
        Self { dialect }
    }
}

impl NbtAdapter for RootTagAdapter {
    fn get(&self, item: &ItemStack) -> ItemTag {
        match &item.tag {
            Some(tag) => ItemTag(snbt::write_compound(tag, self.dialect)),
            None => ItemTag::empty(),
        }
    }

    fn set(&self, item: &ItemStack, tag: &ItemTag) -> Result<ItemStack> {
        let patch = snbt::parse_compound(tag.as_str())?;
        let patched_keys = patch.len();

        let mut out = item.clone();
        if let Some(existing) = out.tag.as_mut() {
            existing.merge(&patch);
        } else if !patch.is_empty() {
            out.tag = Some(patch);
        }
        debug!("Merged {} tag key(s) onto {}", patched_keys, out.material);
        Ok(out)
    }
}
