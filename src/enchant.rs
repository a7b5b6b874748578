//! Glow capability: a level-less custom enchantment whose only effect is
//! the enchanted shimmer on an item.

use crate::error::Result;
use crate::host::HostServer;
use crate::types::CompatConfig;
use log::{debug, info};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

/// How a revision addresses enchantments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GlowKeyStyle {
    /// Pre-1.13: a bare numeric id.
    Numeric,
    /// 1.13+: `namespace:key`.
    Namespaced,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnchantmentKey {
    Numeric(u32),
    Namespaced { namespace: String, key: String },
}

impl std::fmt::Display for EnchantmentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnchantmentKey::Numeric(id) => write!(f, "#{}", id),
            EnchantmentKey::Namespaced { namespace, key } => write!(f, "{}:{}", namespace, key),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enchantment {
    pub key: EnchantmentKey,
    pub name: String,
    pub start_level: u8,
    pub max_level: u8,
    pub treasure: bool,
    pub cursed: bool,
}

impl Enchantment {
    /// The glow enchantment for a given key: one level, no conflicts.
    pub fn glow(key: EnchantmentKey) -> Self {
        Self {
            key,
            name: "Glow".into(),
            start_level: 1,
            max_level: 1,
            treasure: false,
            cursed: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

pub trait GlowAdapter: Send + Sync {
    /// The glow enchantment, registered with `host` on first use.
    fn enchantment(&self, host: &dyn HostServer) -> Result<Enchantment>;
}

pub struct GlowEnchantment {
    key: EnchantmentKey,
    registered: OnceCell<Enchantment>,
}

impl GlowEnchantment {
    pub fn new(style: GlowKeyStyle, config: &CompatConfig) -> Self {
        let key = match style {
            GlowKeyStyle::Numeric => EnchantmentKey::Numeric(config.glow_enchantment_id),
            GlowKeyStyle::Namespaced => EnchantmentKey::Namespaced {
                namespace: config.glow_namespace.clone(),
                key: "glow".into(),
            },
        };
        Self {
            key,
            registered: OnceCell::new(),
        }
    }

    pub fn key(&self) -> &EnchantmentKey {
        &self.key
    }
}

impl GlowAdapter for GlowEnchantment {
    fn enchantment(&self, host: &dyn HostServer) -> Result<Enchantment> {
        self.registered
            .get_or_try_init(|| -> Result<Enchantment> {
                let enchantment = Enchantment::glow(self.key.clone());
                if host.enchantment_registered(&self.key) {
                    debug!("Enchantment {} already known to host", self.key);
                } else {
                    host.register_enchantment(&enchantment)?;
                    info!("Registered glow enchantment {}", self.key);
                }
                Ok(enchantment)
            })
            .cloned()
    }
}
