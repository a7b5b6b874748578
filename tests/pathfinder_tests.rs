//! Pathfinder session tests against the in-memory host

#[cfg(test)]
mod tests {
    use once_cell::sync::OnceCell;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use voxel_compat::host::{AiProfile, Location};
    use voxel_compat::mock::{Delivery, MemoryHost, MemoryWorld};
    use voxel_compat::pathfinder::{entity_uuid, format_uuid};
    use voxel_compat::protocol::{DestroyEntities, ProtocolProfile};
    use voxel_compat::{
        Compat, CompatConfig, CompatError, EntityId, HostError, PathPhase, PathRequest,
        PathSession, Vec3, VersionId,
    };

    struct Harness {
        host: Arc<MemoryHost>,
        world: Arc<MemoryWorld>,
        compat: Compat,
        steps: Arc<Mutex<Vec<Vec3>>>,
        completions: Arc<AtomicUsize>,
    }

    fn harness(version: &str) -> Harness {
        let host = Arc::new(MemoryHost::for_version(version));
        let world = host.create_world("overworld");
        let compat = Compat::bootstrap(host.clone(), CompatConfig::default()).unwrap();
        Harness {
            host,
            world,
            compat,
            steps: Arc::new(Mutex::new(Vec::new())),
            completions: Arc::new(AtomicUsize::new(0)),
        }
    }

    impl Harness {
        /// A fully populated request that records steps and completions.
        fn request(&self, start: Vec3, end: Vec3) -> PathRequest {
            let steps = self.steps.clone();
            let completions = self.completions.clone();
            PathRequest::new()
                .start(Location::new(self.world.clone(), start))
                .end(end)
                .speed(1.0)
                .on_step(move |mob| steps.lock().push(mob.position()))
                .on_complete(move |_| {
                    completions.fetch_add(1, Ordering::SeqCst);
                })
        }

        fn run_until_done(&self, session: &PathSession, max_ticks: usize) {
            for _ in 0..max_ticks {
                if session.phase().is_terminal() {
                    break;
                }
                self.world.tick();
            }
            // One more so the host removes the discarded entity.
            self.world.tick();
        }

        fn step_count(&self) -> usize {
            self.steps.lock().len()
        }
    }

    fn destroys(packets: &[Delivery], profile: &ProtocolProfile) -> Vec<Vec<EntityId>> {
        packets
            .iter()
            .filter_map(|d| match d {
                Delivery::Packet(p) => DestroyEntities::decode(p, profile).map(|d| d.ids),
                Delivery::EngineSpawn(_) => None,
            })
            .collect()
    }

    fn profile(version: &str) -> &'static ProtocolProfile {
        ProtocolProfile::latest(&VersionId::new(version)).unwrap()
    }

    // -----------------------------------------------------------------------
    // Full run
    // -----------------------------------------------------------------------

    #[test]
    fn walks_to_the_end_and_completes_once() {
        let h = harness("1_16_R3");
        let session = h
            .compat
            .start_path(h.request(Vec3::new(0.0, 64.0, 0.0), Vec3::new(10.0, 64.0, 0.0)))
            .unwrap();
        assert_eq!(session.phase(), PathPhase::Moving);

        h.run_until_done(&session, 200);

        assert_eq!(session.phase(), PathPhase::Completed);
        assert_eq!(h.completions.load(Ordering::SeqCst), 1);

        let end = Vec3::new(10.0, 64.0, 0.0);
        let steps = h.steps.lock().clone();
        assert_eq!(steps.len(), 36);
        for pair in steps.windows(2) {
            assert!(pair[1].distance(&end) < pair[0].distance(&end));
        }

        assert!(h.world.mob(session.entity_id()).is_none());
        assert_eq!(h.host.active_hooks(), 0);
        assert_eq!(h.host.unsubscribed(), 1);
        assert!(!session.cancel());
    }

    #[test]
    fn hidden_entity_spawn_parameters() {
        let h = harness("1_17_R1");
        let session = h
            .compat
            .start_path(h.request(Vec3::new(5.0, 70.0, 5.0), Vec3::new(6.0, 70.0, 9.0)))
            .unwrap();

        let mob = h.world.mob(session.entity_id()).unwrap();
        let spawn = mob.spawn();
        assert_eq!(spawn.ai, AiProfile::Disabled);
        assert!(spawn.silent);
        assert!(spawn.invisible);
        assert!(spawn.invulnerable);
        assert!(!spawn.custom_name_visible);
        assert_eq!(spawn.health, 2.518);
        assert_eq!(spawn.kind, "pig");
        assert_eq!(spawn.position, Vec3::new(5.0, 70.0, 5.0));
        assert_eq!(spawn.uuid, entity_uuid(session.entity_id()));
        assert_eq!(mob.goal_priorities(), vec![2]);
    }

    #[test]
    fn entity_uuid_matches_name_based_reference() {
        assert_eq!(
            format_uuid(&entity_uuid(EntityId(1))),
            "4d06ea90-c379-3078-8faf-58ae6dcd7b17"
        );
    }

    // -----------------------------------------------------------------------
    // Visibility
    // -----------------------------------------------------------------------

    #[test]
    fn online_observers_are_sent_the_destroy_packet() {
        let h = harness("1_12_R1");
        let early = h.host.connect();
        let session = h
            .compat
            .start_path(h.request(Vec3::zero(), Vec3::new(4.0, 0.0, 0.0)))
            .unwrap();

        let id = session.entity_id();
        assert_eq!(
            destroys(&early.deliveries(), profile("1_12_R1")),
            vec![vec![id]]
        );
        assert_eq!(early.packets()[0].id, 0x32);
    }

    #[test]
    fn no_step_is_reported_while_the_entity_cannot_advance() {
        let h = harness("1_16_R3");
        let session = h
            .compat
            .start_path(h.request(Vec3::zero(), Vec3::new(10.0, 0.0, 0.0)))
            .unwrap();
        let mob = h.world.mob(session.entity_id()).unwrap();

        h.world.tick();
        assert_eq!(h.step_count(), 1);

        mob.set_stuck(true);
        for _ in 0..5 {
            h.world.tick();
        }
        assert_eq!(h.step_count(), 1);
        assert_eq!(session.phase(), PathPhase::Moving);

        mob.set_stuck(false);
        h.world.tick();
        assert_eq!(h.step_count(), 2);
        session.cancel();
    }

    #[test]
    fn first_1_17_protocol_destroys_with_a_bare_id() {
        let host = Arc::new(MemoryHost::for_version("1_17_R1").with_protocol(755));
        let world = host.create_world("overworld");
        let compat = Compat::bootstrap(host.clone(), CompatConfig::default()).unwrap();
        let viewer = host.connect();

        let session = compat
            .start_path(
                PathRequest::new()
                    .start(Location::new(world.clone(), Vec3::zero()))
                    .end(Vec3::new(5.0, 0.0, 0.0))
                    .on_step(|_| {})
                    .on_complete(|_| {}),
            )
            .unwrap();

        let packets = viewer.packets();
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].id, 0x3A);
        assert_eq!(packets[0].payload.as_ref(), &[session.entity_id().0 as u8]);

        let single = ProtocolProfile::lookup(&VersionId::new("1_17_R1"), 755).unwrap();
        assert_eq!(destroys(&viewer.deliveries(), single), vec![vec![session.entity_id()]]);
        session.cancel();
    }

    #[test]
    fn late_joiner_is_hidden_before_it_hears_of_the_entity() {
        let h = harness("1_17_R1");
        let session = h
            .compat
            .start_path(h.request(Vec3::zero(), Vec3::new(50.0, 0.0, 0.0)))
            .unwrap();
        h.world.tick();

        let late = h.host.connect();
        let deliveries = late.deliveries();
        let id = session.entity_id();

        let destroy_at = deliveries
            .iter()
            .position(|d| matches!(d, Delivery::Packet(p) if DestroyEntities::decode(p, profile("1_17_R1")).is_some()))
            .unwrap();
        let spawn_at = deliveries
            .iter()
            .position(|d| *d == Delivery::EngineSpawn(id))
            .unwrap();
        assert_eq!(destroy_at, 0);
        assert!(destroy_at < spawn_at);
    }

    #[test]
    fn joiners_after_termination_get_nothing() {
        let h = harness("1_13_R2");
        let session = h
            .compat
            .start_path(h.request(Vec3::zero(), Vec3::new(2.0, 0.0, 0.0)))
            .unwrap();
        h.run_until_done(&session, 50);
        assert_eq!(session.phase(), PathPhase::Completed);

        let late = h.host.connect();
        assert!(late.deliveries().is_empty());
    }

    // -----------------------------------------------------------------------
    // Cancellation
    // -----------------------------------------------------------------------

    #[test]
    fn cancel_stops_callbacks_and_tears_down_once() {
        let h = harness("1_16_R3");
        let session = h
            .compat
            .start_path(h.request(Vec3::zero(), Vec3::new(100.0, 0.0, 0.0)))
            .unwrap();
        for _ in 0..3 {
            h.world.tick();
        }
        assert_eq!(h.step_count(), 3);

        assert!(session.cancel());
        assert!(!session.cancel());
        assert_eq!(session.phase(), PathPhase::Cancelled);

        for _ in 0..5 {
            h.world.tick();
        }
        assert_eq!(h.step_count(), 3);
        assert_eq!(h.completions.load(Ordering::SeqCst), 0);
        assert_eq!(h.host.unsubscribed(), 1);
        assert_eq!(h.host.active_hooks(), 0);
        assert!(h.world.mob(session.entity_id()).is_none());
    }

    #[test]
    fn cancel_from_inside_a_step_callback() {
        let h = harness("1_17_R1");
        let handle: Arc<OnceCell<PathSession>> = Arc::new(OnceCell::new());
        let steps = Arc::new(AtomicUsize::new(0));
        let completions = h.completions.clone();

        let request = {
            let handle = handle.clone();
            let steps = steps.clone();
            PathRequest::new()
                .start(Location::new(h.world.clone(), Vec3::zero()))
                .end(Vec3::new(100.0, 0.0, 0.0))
                .on_step(move |_| {
                    if steps.fetch_add(1, Ordering::SeqCst) + 1 == 2 {
                        let cancelled = handle.get().map(PathSession::cancel);
                        assert_eq!(cancelled, Some(true));
                    }
                })
                .on_complete(move |_| {
                    completions.fetch_add(1, Ordering::SeqCst);
                })
        };

        let session = h.compat.start_path(request).unwrap();
        assert!(handle.set(session.clone()).is_ok());

        for _ in 0..10 {
            h.world.tick();
        }
        assert_eq!(steps.load(Ordering::SeqCst), 2);
        assert_eq!(session.phase(), PathPhase::Cancelled);
        assert_eq!(h.completions.load(Ordering::SeqCst), 0);
        assert_eq!(h.host.unsubscribed(), 1);
    }

    #[test]
    fn cancel_racing_the_tick_thread() {
        let h = harness("1_16_R3");
        let session = h
            .compat
            .start_path(h.request(Vec3::zero(), Vec3::new(1.0e6, 0.0, 0.0)))
            .unwrap();

        let stop = Arc::new(AtomicBool::new(false));
        let ticker = {
            let world = h.world.clone();
            let stop = stop.clone();
            std::thread::spawn(move || {
                while !stop.load(Ordering::SeqCst) {
                    world.tick();
                    std::thread::yield_now();
                }
            })
        };

        std::thread::sleep(Duration::from_millis(5));
        assert!(session.cancel());
        let at_cancel = h.step_count();

        std::thread::sleep(Duration::from_millis(5));
        stop.store(true, Ordering::SeqCst);
        ticker.join().unwrap();
        for _ in 0..5 {
            h.world.tick();
        }

        assert_eq!(h.step_count(), at_cancel);
        assert_eq!(h.completions.load(Ordering::SeqCst), 0);
        assert_eq!(h.host.unsubscribed(), 1);
        assert_eq!(session.phase(), PathPhase::Cancelled);
    }

    #[test]
    fn dropping_the_handle_does_not_cancel() {
        let h = harness("1_12_R1");
        let session = h
            .compat
            .start_path(h.request(Vec3::zero(), Vec3::new(3.0, 0.0, 0.0)))
            .unwrap();
        let id = session.entity_id();
        drop(session);

        for _ in 0..20 {
            h.world.tick();
        }
        assert_eq!(h.completions.load(Ordering::SeqCst), 1);
        assert!(h.world.mob(id).is_none());
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    fn assert_rejected(h: &Harness, request: PathRequest) {
        let err = h.compat.start_path(request).unwrap_err();
        assert!(matches!(err, CompatError::Validation(_)), "{:?}", err);
        assert!(h.world.mobs().is_empty());
        assert_eq!(h.host.active_hooks(), 0);
    }

    #[test]
    fn incomplete_requests_allocate_nothing() {
        let h = harness("1_17_R1");
        let start = Location::new(h.world.clone(), Vec3::zero());
        let end = Vec3::new(1.0, 0.0, 0.0);

        assert_rejected(&h, PathRequest::new().end(end).on_step(|_| {}).on_complete(|_| {}));
        assert_rejected(
            &h,
            PathRequest::new()
                .start(Location::detached(Vec3::zero()))
                .end(end)
                .on_step(|_| {})
                .on_complete(|_| {}),
        );
        assert_rejected(
            &h,
            PathRequest::new().start(start.clone()).on_step(|_| {}).on_complete(|_| {}),
        );
        assert_rejected(
            &h,
            PathRequest::new().start(start.clone()).end(end).on_complete(|_| {}),
        );
        assert_rejected(
            &h,
            PathRequest::new().start(start.clone()).end(end).on_step(|_| {}),
        );
        for speed in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert_rejected(&h, h.request(Vec3::zero(), end).speed(speed));
        }

        // Nothing was allocated: the first real spawn still gets the first id.
        let session = h.compat.start_path(h.request(Vec3::zero(), end)).unwrap();
        assert_eq!(session.entity_id(), EntityId(1));
    }

    #[test]
    fn rejected_spawn_releases_the_join_hook() {
        let h = harness("1_16_R3");
        h.world.set_reject_spawns(true);

        let err = h
            .compat
            .start_path(h.request(Vec3::zero(), Vec3::new(5.0, 0.0, 0.0)))
            .unwrap_err();
        assert!(matches!(err, CompatError::Host(HostError::SpawnRejected(_))));
        assert_eq!(h.host.active_hooks(), 0);
        assert_eq!(h.host.unsubscribed(), 1);
    }
}
