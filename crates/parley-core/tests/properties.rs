use parley_core::selector;
use parley_core::{
    ActorId, ChannelId, ChannelKind, ChannelNode, ChannelRegistry, ChoiceMethod, CommConfig,
    CommunicationDef, Definitions, PlayId, RecordingBackend, Request, Scheduler, SchedulerConfig,
    SelectionRng, Variables, Variation,
};
use proptest::prelude::*;
use std::collections::HashSet;

fn chain(depth: usize) -> ChannelNode {
    let mut node = ChannelNode::new(format!("C{}", depth - 1)).with_silence(0.0, 0.0);
    for level in (0..depth - 1).rev() {
        node = ChannelNode::new(format!("C{level}")).with_child(node);
    }
    node
}

fn voice_config() -> CommConfig {
    let mut config = CommConfig::new("Soldier");
    config
        .insert(CommunicationDef::new("Hello").with_variation(Variation::default().with_voice("hello_01")))
        .unwrap();
    config
}

proptest! {
    #[test]
    fn child_never_free_under_busy_ancestor(
        depth in 2usize..6,
        busy in 0usize..5,
        cooling in any::<bool>(),
        silence in 0.5f32..5.0,
    ) {
        let busy = busy % (depth - 1);
        let mut registry = ChannelRegistry::new();
        prop_assert!(registry.load_channels(&[chain(depth)]).is_empty());

        let actor = ActorId::new(1);
        let leaf = registry.resolve(ChannelId::from_name(&format!("C{}", depth - 1)), actor).unwrap();
        let ancestor = registry.resolve(ChannelId::from_name(&format!("C{busy}")), actor).unwrap();

        registry.occupy(ancestor);
        if cooling {
            registry.release(ancestor, Some(silence));
            registry.update(silence / 2.0);
        }

        prop_assert!(!registry.is_occupied(leaf));
        prop_assert_eq!(registry.channel(leaf).silence(), 0.0);
        prop_assert!(!registry.is_free(leaf));
    }

    #[test]
    fn higher_priority_evicts_per_channel_kind(
        low in -5i32..5,
        gap in 1i32..5,
        personal in any::<bool>(),
        same_actor in any::<bool>(),
    ) {
        let kind = if personal { ChannelKind::Personal } else { ChannelKind::Global };
        let defs = Definitions::new()
            .with_channel(ChannelNode::new("Low").with_priority(low))
            .with_channel(
                ChannelNode::new("High")
                    .with_priority(low + gap)
                    .with_kind(kind.to_string()),
            )
            .with_config(voice_config());
        let (mut scheduler, _) = Scheduler::with_definitions(RecordingBackend::new(), defs);

        let holder = ActorId::new(1);
        let requester = if same_actor { holder } else { ActorId::new(2) };

        let session = scheduler.play(Request::named(holder, "Soldier", "Hello", "Low"));
        prop_assert!(scheduler.is_playing(session));

        scheduler.play(Request::named(requester, "Soldier", "Hello", "High"));
        let evicts = !personal || same_actor;
        prop_assert_eq!(scheduler.is_playing(session), !evicts);
    }

    #[test]
    fn play_ids_are_unique_and_nonzero(actors in prop::collection::vec(0u64..4, 1..40)) {
        let defs = Definitions::new()
            .with_channel(ChannelNode::new("Busy"))
            .with_config(voice_config());
        let (mut scheduler, _) = Scheduler::with_definitions(RecordingBackend::new(), defs);

        let mut seen = HashSet::new();
        for actor in actors {
            let id = scheduler.play(
                Request::named(ActorId::new(actor), "Soldier", "Hello", "Busy").with_expiry(100.0),
            );
            prop_assert!(id.is_some());
            prop_assert!(seen.insert(id));
        }
    }

    #[test]
    fn random_sequence_history_self_resets(count in 1usize..=32, seed in any::<u64>()) {
        let mut comm = CommunicationDef::new("Chatter").with_choice_method(ChoiceMethod::RandomSequence);
        for i in 0..count {
            comm.push_variation(Variation::default().with_voice(format!("line_{i}")));
        }
        let vars = Variables::default();
        let mut rng = SelectionRng::new(seed);

        let mut picked = HashSet::new();
        for _ in 0..count {
            let chosen = selector::select(&mut comm, ChoiceMethod::RandomSequence, 0, &vars, &mut rng);
            prop_assert!(chosen.is_some());
            prop_assert!(picked.insert(chosen));
        }

        let next = selector::choose_variation(&comm, ChoiceMethod::RandomSequence, 0, &vars, &mut rng);
        if count > 1 {
            prop_assert!(next.is_some());
        }
        prop_assert!(selector::select(&mut comm, ChoiceMethod::RandomSequence, 0, &vars, &mut rng).is_some());
    }

    #[test]
    fn queue_expiry_on_crossing_tick(expiry in 0.2f32..3.0, dt in 0.05f32..0.5) {
        let config = SchedulerConfig { watchdog_secs: 1000.0, ..SchedulerConfig::default() };
        let mut scheduler = Scheduler::with_config(RecordingBackend::new(), config);
        let errors = scheduler.reload(
            Definitions::new()
                .with_channel(ChannelNode::new("Busy"))
                .with_config(voice_config()),
        );
        prop_assert!(errors.is_empty());

        scheduler.play(Request::named(ActorId::new(1), "Soldier", "Hello", "Busy"));
        let queued = scheduler.play(
            Request::named(ActorId::new(2), "Soldier", "Hello", "Busy").with_expiry(expiry),
        );
        prop_assert!(scheduler.is_queued(queued));

        let mut age = 0.0f32;
        loop {
            scheduler.update(dt);
            age += dt;
            if age <= expiry {
                prop_assert!(scheduler.is_queued(queued));
            } else {
                prop_assert!(!scheduler.is_queued(queued));
                break;
            }
        }
    }

    #[test]
    fn voice_restriction_gates_sound(ignore in any::<bool>()) {
        let defs = Definitions::new()
            .with_channel(ChannelNode::new("Radio").with_actor_silence(0.0, ignore))
            .with_config(voice_config());
        let (mut scheduler, _) = Scheduler::with_definitions(RecordingBackend::new(), defs);
        let actor = ActorId::new(1);
        scheduler.set_restricted_duration(actor, 3.0, 0.0);

        let id = scheduler.play(Request::named(actor, "Soldier", "Hello", "Radio"));
        if ignore {
            prop_assert!(scheduler.is_playing(id));
        } else {
            prop_assert_eq!(id, PlayId::NONE);
        }
    }
}

#[test]
fn play_id_wrap_skips_zero() {
    assert_eq!(PlayId(u32::MAX).successor(), PlayId(1));
}
