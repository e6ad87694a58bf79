//! End-to-end episode tests against the built-in Planetfall adapter and a
//! TOML-declared game.
//!
//! No real story files are needed: `StoryImage` builds a memory image with
//! the right object table and `ScriptedLoader` replays canned turns, moving
//! objects and poking counters the way the real game would.

use gruescope::games::planetfall::{
    MAX_SCORE, MOVES_ADDR, NUM_WORLD_OBJS, SCORE_ADDR, SELF_OBJECT, VICTORY_MARKER,
};
use gruescope::test_utils::{ScriptedLoader, ScriptedTurn, StoryImage};
use gruescope::{
    AdapterRegistry, ChangeEvent, Driver, EpisodeState, IntrospectError, Outcome,
};
use test_log::test;

const DECK: u16 = 10;
const LAB: u16 = 15;
const KIT: u16 = 12;

/// Planetfall-shaped image: player on the deck, a survival kit lying there
fn planetfall_story() -> Vec<u8> {
    let mut image = StoryImage::v3(NUM_WORLD_OBJS, 0x3000);
    image.insert(SELF_OBJECT, DECK).insert(KIT, DECK);
    image.into_bytes()
}

fn planetfall_driver(turns: Vec<ScriptedTurn>) -> Driver<ScriptedLoader> {
    let loader = ScriptedLoader::new(
        "Deck Nine                     Score: 0   Time: 4500\nThis is a featureless corridor.",
        turns,
    );
    Driver::with_builtins(loader)
}

#[test]
fn test_score_starts_at_zero_and_never_exceeds_max() {
    let d = planetfall_driver(vec![
        ScriptedTurn::says(">north\nYou can't go that way."),
        ScriptedTurn::says(">take kit\nTaken.").moving(KIT, SELF_OBJECT).poking(SCORE_ADDR, 4),
        ScriptedTurn::says(">wait\nTime passes.").poking(SCORE_ADDR, 9),
    ]);
    let (mut episode, initial) = d.start_episode("planetfall", &planetfall_story()).unwrap();
    assert_eq!(initial.score, 0);
    assert_eq!(initial.max_score, MAX_SCORE);
    assert_eq!(initial.observation, "This is a featureless corridor.");

    let mut last = initial.score;
    for cmd in ["north", "take kit", "wait"] {
        let r = d.step(&mut episode, cmd).unwrap();
        assert!(r.score <= MAX_SCORE);
        assert!(r.score >= last);
        last = r.score;
    }
    assert_eq!(last, 9);
}

#[test]
fn test_victory_marker_terminates_episode() {
    let won = format!("The Feinstein lands.\n\n{VICTORY_MARKER}\n");
    let d = planetfall_driver(vec![
        ScriptedTurn::says(">wait\nTime passes."),
        ScriptedTurn::says(&won).halting(),
    ]);
    let (mut episode, _) = d.start_episode("planetfall", &planetfall_story()).unwrap();

    let r = d.step(&mut episode, "wait").unwrap();
    assert!(!r.victory);
    assert_eq!(episode.state(), EpisodeState::Running);

    let r = d.step(&mut episode, "wait").unwrap();
    assert!(r.victory);
    assert!(!r.defeat);
    assert_eq!(episode.state(), EpisodeState::Terminated(Outcome::Victory));

    // absorbing: no more commands reach the interpreter
    match d.step(&mut episode, "look") {
        Err(IntrospectError::EpisodeFinished { outcome, .. }) => {
            assert_eq!(outcome, Outcome::Victory)
        }
        other => panic!("expected EpisodeFinished, got {other:?}"),
    }
    assert_eq!(episode.interpreter().unwrap().commands, vec!["wait", "wait"]);
}

#[test]
fn test_moves_counter_is_big_endian() {
    let d = planetfall_driver(vec![ScriptedTurn::says(">look\nDeck Nine")
        .poking(MOVES_ADDR, 0x01)
        .poking(MOVES_ADDR + 1, 0x2C)]);
    let (mut episode, initial) = d.start_episode("planetfall", &planetfall_story()).unwrap();
    assert_eq!(initial.moves, 0);
    assert_eq!(d.step(&mut episode, "look").unwrap().moves, 300);
}

#[test]
fn test_move_reported_before_attribute_changes() {
    let d = planetfall_driver(vec![ScriptedTurn::says(">drop kit\nDropped.")
        .moving(KIT, LAB)
        .setting(KIT, 3)
        .clearing(KIT, 0)]);

    let mut image = StoryImage::v3(NUM_WORLD_OBJS, 0x3000);
    image
        .insert(SELF_OBJECT, DECK)
        .insert(KIT, DECK)
        .set_attribute(KIT, 0, true);
    let (mut episode, initial) = d.start_episode("planetfall", image.bytes()).unwrap();
    assert!(initial.changes.is_empty());

    let r = d.step(&mut episode, "drop kit").unwrap();
    let moves: Vec<&ChangeEvent> = r
        .changes
        .iter()
        .filter(|e| matches!(e, ChangeEvent::ObjectMoved { .. }))
        .collect();
    assert_eq!(
        moves,
        vec![&ChangeEvent::ObjectMoved {
            object: KIT,
            old_parent: DECK,
            new_parent: LAB
        }]
    );
    assert_eq!(
        r.changes,
        vec![
            ChangeEvent::ObjectMoved {
                object: KIT,
                old_parent: DECK,
                new_parent: LAB
            },
            ChangeEvent::AttributeCleared { object: KIT, attr: 0 },
            ChangeEvent::AttributeSet { object: KIT, attr: 3 },
        ]
    );
}

#[test]
fn test_location_and_inventory_follow_the_player() {
    let d = planetfall_driver(vec![
        ScriptedTurn::says(">take kit\nTaken.").moving(KIT, SELF_OBJECT),
        ScriptedTurn::says(">east\nLab").moving(SELF_OBJECT, LAB),
    ]);
    let (mut episode, initial) = d.start_episode("planetfall", &planetfall_story()).unwrap();
    assert_eq!(initial.location, DECK);
    assert!(initial.inventory.is_empty());

    let r = d.step(&mut episode, "take kit").unwrap();
    assert_eq!(r.inventory, vec![KIT]);

    let r = d.step(&mut episode, "east").unwrap();
    assert_eq!(r.location, LAB);
    assert_eq!(r.inventory, vec![KIT]);
    assert_ne!(r.state_hash, initial.state_hash);
}

#[test]
fn test_independent_episodes_run_in_parallel() {
    let d = planetfall_driver(vec![
        ScriptedTurn::says(">take kit\nTaken.").moving(KIT, SELF_OBJECT),
        ScriptedTurn::says(">wait\nTime passes.").poking(SCORE_ADDR, 2),
    ]);
    let story = planetfall_story();
    let (d, story) = (&d, story.as_slice());

    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                s.spawn(move || {
                    let (mut episode, _) = d.start_episode("planetfall", story).unwrap();
                    let first = episode.step("take kit").unwrap();
                    let second = episode.step("wait").unwrap();
                    (first, second)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (first, second) in &results {
        assert_eq!(first, &results[0].0);
        assert_eq!(second.score, 2);
        assert_eq!(second.turn, 2);
    }
}

#[test]
fn test_toml_declared_game_runs_through_driver() {
    let mut registry = AdapterRegistry::new();
    registry
        .load_config_str(
            r#"
[[game]]
id = "hut"
intro_actions = ["wake"]
banner = ["Score:"]
victory_marker = "*** You have won ***"
game_over_marker = "*** You have died ***"
self_object = 2
moves_addr = 0x300
score = { kind = "word", addr = 0x302 }
max_score = 10
num_world_objs = 8
ignore_moved = [{ object = 7 }]
"#,
        )
        .unwrap();

    let loader = ScriptedLoader::new(
        "",
        vec![
            ScriptedTurn::says("Hut  Score: 0\nYou wake up."),
            ScriptedTurn::says("The mouse scurries. You fall into the pit.\n*** You have died ***")
                .moving(7, 1)
                .moving(2, 4)
                .poking(0x302, 0xFF)
                .poking(0x303, 0xFB)
                .halting(),
        ],
    );
    let d = Driver::new(registry, loader);

    let mut image = StoryImage::v3(8, 0x400);
    image.insert(2, 1).insert(7, 3);
    let (mut episode, initial) = d.start_episode("HUT", image.bytes()).unwrap();
    assert_eq!(initial.observation, "You wake up.");

    let r = d.step(&mut episode, "jump").unwrap();
    assert!(r.defeat);
    assert_eq!(r.score, -5);
    assert_eq!(
        r.changes,
        vec![ChangeEvent::ObjectMoved {
            object: 2,
            old_parent: 1,
            new_parent: 4
        }]
    );
    assert_eq!(episode.state(), EpisodeState::Terminated(Outcome::Defeat));
}

#[test]
fn test_unknown_game_is_rejected() {
    let d = planetfall_driver(vec![]);
    match d.start_episode("zork1", &planetfall_story()) {
        Err(IntrospectError::UnsupportedGame { game }) => assert_eq!(game, "zork1"),
        Err(other) => panic!("expected UnsupportedGame, got {other}"),
        Ok(_) => panic!("expected UnsupportedGame"),
    }
}

#[test]
fn test_change_events_render_for_logs() {
    let d = planetfall_driver(vec![ScriptedTurn::says(">take kit\nTaken.").moving(KIT, SELF_OBJECT)]);
    let (mut episode, _) = d.start_episode("planetfall", &planetfall_story()).unwrap();
    let r = d.step(&mut episode, "take kit").unwrap();

    let text = format!("{}", r.changes[0]);
    assert_eq!(text, format!("obj {KIT}: moved {DECK} -> {SELF_OBJECT}"));
}
