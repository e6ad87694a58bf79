//! Property tests over arbitrary text, object numbers and snapshot pairs.

use gruescope::adapter::GameAdapter;
use gruescope::games::planetfall;
use gruescope::memory::WorldObject;
use gruescope::registry::{AdapterRegistry, GameId};
use gruescope::{world_diff, ChangeEvent, IntrospectError, ObjectSnapshot, RangeKind};
use proptest::prelude::*;
use std::sync::Arc;

const ADAPTER_TOML: &str = r#"
[[game]]
id = "attic"
banner = ["Score:", "Moves:"]
self_object = 1
moves_addr = 0x100
score = { kind = "byte", addr = 0x102 }
max_score = 5
num_world_objs = 10
"#;

fn toml_adapter() -> Arc<GameAdapter> {
    let mut registry = AdapterRegistry::new();
    registry.load_config_str(ADAPTER_TOML).unwrap();
    registry.lookup(&GameId::new("attic")).unwrap()
}

/// Lines that look like interpreter output, banners included
fn output_line() -> impl Strategy<Value = String> {
    prop_oneof![
        "[ \t]*",
        ">[a-z ]{0,12}",
        "[A-Za-z ]{0,10}Score: [0-9]{1,3}[ ]*Moves: [0-9]{1,3}",
        "[ ]*Moves: [0-9]+[ \r]*",
        "[A-Za-z.,' ]{0,30}",
        any::<String>(),
    ]
}

fn raw_output() -> impl Strategy<Value = String> {
    prop::collection::vec(output_line(), 0..8).prop_map(|lines| lines.join("\n"))
}

/// (parent, attribute bits) per object for a world of `n` objects
fn world(n: u16) -> impl Strategy<Value = Vec<(u16, u32)>> {
    prop::collection::vec((0..=n, any::<u32>()), n as usize)
}

fn snapshot(state: &[(u16, u32)]) -> ObjectSnapshot {
    let objects = state
        .iter()
        .enumerate()
        .map(|(i, &(parent, bits))| {
            let mut obj = WorldObject::new(i as u16 + 1);
            obj.parent = parent;
            for attr in 0..32 {
                obj.attributes.set(attr, bits & (1 << attr) != 0);
            }
            obj
        })
        .collect();
    ObjectSnapshot::from_objects("noisy", objects)
}

fn world_pair() -> impl Strategy<Value = (u16, Vec<(u16, u32)>, Vec<(u16, u32)>)> {
    (1u16..40).prop_flat_map(|n| (Just(n), world(n), world(n)))
}

fn noisy_adapter(n: u16) -> GameAdapter {
    GameAdapter::builder("noisy")
        .num_world_objs(n)
        .ignore_moved_obj(|obj, dest| (obj + dest) % 3 == 0)
        .ignore_attr_set(|obj, attr| (obj ^ attr) % 4 == 0)
        .ignore_attr_cleared(|_, attr| attr % 5 == 0)
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn planetfall_clean_observation_is_idempotent(raw in raw_output()) {
        let a = planetfall::adapter().unwrap();
        let once = a.clean_observation(&raw);
        prop_assert_eq!(a.clean_observation(&once), once);
    }

    #[test]
    fn toml_banner_clean_observation_is_idempotent(raw in raw_output()) {
        let a = toml_adapter();
        let once = a.clean_observation(&raw);
        prop_assert_eq!(a.clean_observation(&once), once);
    }

    #[test]
    fn clean_observation_is_idempotent_on_any_string(raw in any::<String>()) {
        let a = planetfall::adapter().unwrap();
        let once = a.clean_observation(&raw);
        prop_assert_eq!(a.clean_observation(&once), once.clone());

        let b = toml_adapter();
        let once = b.clean_observation(&raw);
        prop_assert_eq!(b.clean_observation(&once), once);
    }

    #[test]
    fn diff_is_deterministic_and_honours_suppression((n, before, after) in world_pair()) {
        let a = noisy_adapter(n);
        let old = snapshot(&before);
        let new = snapshot(&after);

        let events = world_diff(Some(&old), &new, &a).unwrap();
        prop_assert_eq!(&world_diff(Some(&old), &new, &a).unwrap(), &events);

        // ordered by object, never reporting a suppressed transition
        prop_assert!(events.windows(2).all(|w| w[0].object() <= w[1].object()));
        for event in &events {
            match *event {
                ChangeEvent::ObjectMoved { object, new_parent, .. } => {
                    prop_assert!(!a.ignore_moved_obj(object, new_parent).unwrap());
                }
                ChangeEvent::AttributeSet { object, attr } => {
                    prop_assert!(!a.ignore_attr_set(object, attr).unwrap());
                }
                ChangeEvent::AttributeCleared { object, attr } => {
                    prop_assert!(!a.ignore_attr_cleared(object, attr).unwrap());
                }
            }
        }

        // every unsuppressed move is reported exactly once
        for (i, (&(old_parent, _), &(new_parent, _))) in before.iter().zip(&after).enumerate() {
            let object = i as u16 + 1;
            let reported = events
                .iter()
                .filter(|e| matches!(e, ChangeEvent::ObjectMoved { object: o, .. } if *o == object))
                .count();
            let expected = old_parent != new_parent && !a.ignore_moved_obj(object, new_parent).unwrap();
            prop_assert_eq!(reported, expected as usize);
        }
    }

    #[test]
    fn objects_beyond_bound_are_out_of_range(
        (n, obj) in (1u16..2000).prop_flat_map(|n| (Just(n), (n + 1)..=u16::MAX))
    ) {
        let a = GameAdapter::builder("bounded").num_world_objs(n).build().unwrap();
        let is_object_range = |r: Result<bool, IntrospectError>| {
            matches!(r, Err(IntrospectError::OutOfRange { kind: RangeKind::Object, index, .. }) if index == obj as usize)
        };
        prop_assert!(is_object_range(a.ignore_moved_obj(obj, 0)));
        prop_assert!(is_object_range(a.ignore_attr_set(obj, 0)));
        prop_assert!(is_object_range(a.ignore_attr_cleared(obj, 0)));
        prop_assert!(is_object_range(a.ignore_moved_obj(1, obj)));
    }
}

#[test]
fn planetfall_rejects_every_object_beyond_its_world() {
    let a = planetfall::adapter().unwrap();
    for obj in (planetfall::NUM_WORLD_OBJS + 1)..=u16::MAX {
        assert!(a.ignore_moved_obj(obj, 1).is_err());
        assert!(a.ignore_attr_set(obj, 0).is_err());
        assert!(a.ignore_attr_cleared(obj, 0).is_err());
    }
    for obj in 1..=planetfall::NUM_WORLD_OBJS {
        assert!(a.ignore_moved_obj(obj, 0).is_ok());
    }
}
