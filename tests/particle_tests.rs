//! Particle capability tests: name resolution and exact packet bytes

#[cfg(test)]
mod tests {
    use bytes::{BufMut, BytesMut};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use voxel_compat::mock::{Delivery, MemoryHost};
    use voxel_compat::particle::ParticleSpec;
    use voxel_compat::{Compat, CompatConfig, CompatError, Vec3};

    fn setup(version: &str) -> (Arc<MemoryHost>, Compat) {
        let host = Arc::new(MemoryHost::for_version(version));
        let compat = Compat::bootstrap(host.clone(), CompatConfig::default()).unwrap();
        (host, compat)
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    #[test]
    fn exact_name_resolves_on_every_revision() {
        for version in ["1_8_R3", "1_12_R1", "1_13_R2", "1_16_R3", "1_17_R1"] {
            let (_, compat) = setup(version);
            let resolved = compat.resolve_particle("FLAME").unwrap();
            assert_eq!(resolved.name, "FLAME");
            assert!(resolved.exact, "{}", version);
        }
    }

    #[test]
    fn native_ids_follow_each_registry() {
        let expected = [
            ("1_8_R3", 26),
            ("1_12_R1", 26),
            ("1_13_R2", 23),
            ("1_16_R3", 26),
            ("1_17_R1", 28),
        ];
        for (version, id) in expected {
            let (_, compat) = setup(version);
            assert_eq!(compat.resolve_particle("FLAME").unwrap().native_id, id, "{}", version);
        }
    }

    #[test]
    fn substring_fallback_is_case_insensitive_and_first_match_wins() {
        let (_, compat) = setup("1_17_R1");

        let flame = compat.resolve_particle("flame").unwrap();
        assert_eq!(flame.name, "FLAME");
        assert!(!flame.exact);

        assert_eq!(compat.resolve_particle("spore").unwrap().name, "CRIMSON_SPORE");
        assert_eq!(compat.resolve_particle("dust").unwrap().name, "BLOCK_DUST");
        assert_eq!(
            compat.resolve_particle("Blossom").unwrap().name,
            "FALLING_SPORE_BLOSSOM"
        );
    }

    #[test]
    fn catalogs_are_per_revision() {
        let (_, v1_16) = setup("1_16_R3");
        assert!(matches!(
            v1_16.resolve_particle("blossom"),
            Err(CompatError::ParticleNotFound(name)) if name == "blossom"
        ));

        let (_, v1_12) = setup("1_12_R1");
        assert_eq!(v1_12.resolve_particle("TOTEM").unwrap().native_id, 47);
        assert!(v1_12.resolve_particle("SQUID_INK").is_err());

        let (_, v1_8) = setup("1_8_R3");
        assert!(v1_8.resolve_particle("TOTEM").is_err());
        assert_eq!(v1_8.resolve_particle("FOOTSTEP").unwrap().native_id, 28);
    }

    #[test]
    fn whitespace_name_matches_nothing() {
        let (_, compat) = setup("1_17_R1");
        assert!(matches!(
            compat.resolve_particle(" "),
            Err(CompatError::ParticleNotFound(name)) if name == " "
        ));
    }

    #[test]
    fn empty_name_falls_through_to_the_first_entry() {
        for version in ["1_8_R3", "1_17_R1"] {
            let (_, compat) = setup(version);
            let resolved = compat.resolve_particle("").unwrap();
            assert_eq!(resolved.name, "EXPLOSION_NORMAL", "{}", version);
            assert!(!resolved.exact);
        }
    }

    // -----------------------------------------------------------------------
    // Packets
    // -----------------------------------------------------------------------

    #[test]
    fn registry_packet_bytes_1_17() {
        let (host, compat) = setup("1_17_R1");
        let viewer = host.connect();

        compat
            .play_particle(
                viewer.as_ref(),
                Vec3::new(0.5, 64.0, -2.0),
                &ParticleSpec::new("FLAME").count(5),
            )
            .unwrap();

        let packets = viewer.packets();
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].id, 0x24);
        #[rustfmt::skip]
        let expected: &[u8] = &[
            0x00, 0x00, 0x00, 0x1C,                         // flame
            0x00,                                           // long distance
            0x3F, 0xE0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // x = 0.5
            0x40, 0x50, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // y = 64
            0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // z = -2
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,             // offsets
            0, 0, 0, 0,                                     // speed
            0x00, 0x00, 0x00, 0x05,                         // count
        ];
        assert_eq!(packets[0].payload.as_ref(), expected);
    }

    #[test]
    fn legacy_packet_bytes_1_8() {
        let (host, compat) = setup("1_8_R3");
        let viewer = host.connect();

        compat
            .play_particle(
                viewer.as_ref(),
                Vec3::new(1.0, 2.0, 3.0),
                &ParticleSpec::new("HEART")
                    .offset(Vec3::new(0.5, 0.0, 0.0))
                    .speed(1.0),
            )
            .unwrap();

        let packets = viewer.packets();
        assert_eq!(packets[0].id, 0x2A);
        #[rustfmt::skip]
        let expected: &[u8] = &[
            0x00, 0x00, 0x00, 0x22,             // heart
            0x00,
            0x3F, 0x80, 0x00, 0x00,             // x = 1
            0x40, 0x00, 0x00, 0x00,             // y = 2
            0x40, 0x40, 0x00, 0x00,             // z = 3
            0x3F, 0x00, 0x00, 0x00, 0, 0, 0, 0, 0, 0, 0, 0,
            0x3F, 0x80, 0x00, 0x00,             // speed = 1
            0x00, 0x00, 0x00, 0x01,
        ];
        assert_eq!(packets[0].payload.as_ref(), expected);
    }

    #[test]
    fn legacy_item_crack_carries_two_var_ints() {
        let (host, compat) = setup("1_12_R1");
        let viewer = host.connect();
        compat
            .play_particle(viewer.as_ref(), Vec3::zero(), &ParticleSpec::new("ITEM_CRACK"))
            .unwrap();

        let payload = viewer.packets()[0].payload.clone();
        assert_eq!(&payload[..4], &[0, 0, 0, 36]);
        assert_eq!(payload.len(), 4 + 1 + 12 + 12 + 4 + 4 + 2);
        assert_eq!(&payload[payload.len() - 2..], &[0, 0]);
    }

    #[test]
    fn dust_carries_default_colour() {
        let (host, compat) = setup("1_16_R3");
        let viewer = host.connect();
        compat
            .play_particle(viewer.as_ref(), Vec3::zero(), &ParticleSpec::new("REDSTONE"))
            .unwrap();

        let payload = viewer.packets()[0].payload.clone();
        assert_eq!(&payload[..4], &[0, 0, 0, 14]);
        let mut trailer = BytesMut::new();
        for v in [1.0f32, 0.0, 0.0, 1.0] {
            trailer.put_f32(v);
        }
        assert_eq!(&payload[payload.len() - 16..], trailer.as_ref());
    }

    #[test]
    fn vibration_targets_its_own_origin() {
        let (host, compat) = setup("1_17_R1");
        let viewer = host.connect();
        let origin = Vec3::new(3.0, 70.0, 3.0);
        compat
            .play_particle(viewer.as_ref(), origin, &ParticleSpec::new("VIBRATION"))
            .unwrap();

        let payload = viewer.packets()[0].payload.clone();
        assert_eq!(&payload[..4], &[0, 0, 0, 37]);
        let mut trailer = BytesMut::new();
        for _ in 0..2 {
            trailer.put_f64(origin.x);
            trailer.put_f64(origin.y);
            trailer.put_f64(origin.z);
        }
        trailer.put_i32(0);
        assert_eq!(&payload[payload.len() - 52..], trailer.as_ref());
    }

    #[test]
    fn item_particle_sends_an_empty_slot() {
        let (host, compat) = setup("1_13_R2");
        let viewer = host.connect();
        compat
            .play_particle(viewer.as_ref(), Vec3::zero(), &ParticleSpec::new("ITEM_CRACK"))
            .unwrap();

        let payload = viewer.packets()[0].payload.clone();
        assert_eq!(&payload[..4], &[0, 0, 0, 27]);
        assert_eq!(payload.len(), 4 + 1 + 12 + 12 + 4 + 4 + 1);
        assert_eq!(payload[payload.len() - 1], 0);
    }

    #[test]
    fn item_particle_on_1_13_1_sends_a_missing_item_id() {
        let host = Arc::new(MemoryHost::for_version("1_13_R2").with_protocol(401));
        let compat = Compat::bootstrap(host.clone(), CompatConfig::default()).unwrap();
        let viewer = host.connect();
        compat
            .play_particle(viewer.as_ref(), Vec3::zero(), &ParticleSpec::new("ITEM_CRACK"))
            .unwrap();

        let payload = viewer.packets()[0].payload.clone();
        assert_eq!(&payload[..4], &[0, 0, 0, 27]);
        assert_eq!(payload.len(), 4 + 1 + 12 + 12 + 4 + 4 + 2);
        assert_eq!(&payload[payload.len() - 2..], &[0xFF, 0xFF]);
    }

    #[test]
    fn only_the_target_observer_receives_the_packet() {
        let (host, compat) = setup("1_16_R3");
        let target = host.connect();
        let bystander = host.connect();

        let spec = ParticleSpec::new("HEART");
        compat.play_particle(target.as_ref(), Vec3::zero(), &spec).unwrap();
        compat.play_particle(target.as_ref(), Vec3::zero(), &spec).unwrap();

        assert_eq!(target.packets().len(), 2);
        assert!(bystander.deliveries().is_empty());
    }

    #[test]
    fn unknown_particle_sends_nothing() {
        let (host, compat) = setup("1_17_R1");
        let viewer = host.connect();

        let err = compat
            .play_particle(
                viewer.as_ref(),
                Vec3::zero(),
                &ParticleSpec::new("definitely_not_a_particle"),
            )
            .unwrap_err();

        assert!(matches!(err, CompatError::ParticleNotFound(_)));
        assert_eq!(viewer.deliveries(), Vec::<Delivery>::new());
    }
}
