//! Glow enchantment capability tests

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use voxel_compat::enchant::{Enchantment, EnchantmentKey};
    use voxel_compat::mock::MemoryHost;
    use voxel_compat::{Compat, CompatConfig, CompatError, HostError};

    fn setup(version: &str) -> (Arc<MemoryHost>, Compat) {
        let host = Arc::new(MemoryHost::for_version(version));
        let compat = Compat::bootstrap(host.clone(), CompatConfig::default()).unwrap();
        (host, compat)
    }

    #[test]
    fn legacy_revisions_use_a_numeric_id() {
        let (host, compat) = setup("1_12_R1");
        let glow = compat.glow_enchantment().unwrap();
        assert_eq!(glow.key, EnchantmentKey::Numeric(152634));
        assert_eq!(glow.name, "Glow");
        assert_eq!((glow.start_level, glow.max_level), (1, 1));
        assert_eq!(host.enchantment_registrations(), 1);
    }

    #[test]
    fn modern_revisions_use_a_namespaced_key() {
        let (_, compat) = setup("1_17_R1");
        let glow = compat.glow_enchantment().unwrap();
        assert_eq!(glow.key.to_string(), "voxel_compat:glow");
    }

    #[test]
    fn registration_happens_once() {
        let (host, compat) = setup("1_16_R3");
        let first = compat.glow_enchantment().unwrap();
        let second = compat.glow_enchantment().unwrap();
        assert_eq!(first, second);
        assert_eq!(host.enchantment_registrations(), 1);
    }

    #[test]
    fn already_known_enchantment_is_not_registered_again() {
        let (host, compat) = setup("1_8_R3");
        host.preload_enchantment(Enchantment::glow(EnchantmentKey::Numeric(152634)));
        assert!(compat.glow_enchantment().is_ok());
        assert_eq!(host.enchantment_registrations(), 0);
    }

    #[test]
    fn configured_key_is_used() {
        let host = Arc::new(MemoryHost::for_version("1_13_R2"));
        let config = CompatConfig {
            glow_namespace: "myplugin".into(),
            ..Default::default()
        };
        let compat = Compat::bootstrap(host, config).unwrap();
        assert_eq!(
            compat.glow_enchantment().unwrap().key,
            EnchantmentKey::Namespaced {
                namespace: "myplugin".into(),
                key: "glow".into(),
            }
        );
    }

    #[test]
    fn host_refusal_is_reported_and_retryable() {
        let (host, compat) = setup("1_17_R1");
        host.set_reject_enchantments(true);
        let err = compat.glow_enchantment().unwrap_err();
        assert!(matches!(
            err,
            CompatError::Host(HostError::EnchantmentRejected(..))
        ));

        host.set_reject_enchantments(false);
        assert!(compat.glow_enchantment().is_ok());
        assert_eq!(host.enchantment_registrations(), 1);
    }
}
