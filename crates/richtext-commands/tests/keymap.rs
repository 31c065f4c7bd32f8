//! Keymap dispatch through the public API, including configuration loaded from JSON.

use pretty_assertions::assert_eq;
use richtext_commands::{
    EditorState, Keymap, KeymapConfig, KeymapError, Platform, Selection, command_by_name,
};
use richtext_model::testing::TestDoc;
use richtext_model::{blockquote, doc, li, p, pre, ul};

const PC: Platform = Platform { mac: false };
const MAC: Platform = Platform { mac: true };

fn state_of(d: &TestDoc) -> EditorState {
    let selection = match (d.maybe_tag("a"), d.maybe_tag("b")) {
        (Some(a), Some(b)) => Selection::text(a, b),
        (Some(a), None) => Selection::cursor(a),
        _ => Selection::at_start(&d.node),
    };
    EditorState::with_selection(d.node.clone(), selection)
}

fn press(keymap: &Keymap, key: &str, d: &TestDoc) -> Option<EditorState> {
    let state = state_of(d);
    keymap
        .handle(key, &state, None)
        .map(|tr| state.apply(tr))
}

#[test]
fn enter_splits_a_paragraph() {
    let keymap = Keymap::base(PC);
    let next = press(&keymap, "Enter", &doc!(p!("foo<a>bar"))).unwrap();
    assert_eq!(next.doc(), &doc!(p!("foo"), p!("bar")).node);
}

#[test]
fn enter_in_code_inserts_newline() {
    let keymap = Keymap::base(PC);
    let next = press(&keymap, "Enter", &doc!(pre!("ab<a>c"))).unwrap();
    assert_eq!(next.doc(), &doc!(pre!("ab\nc")).node);
}

#[test]
fn enter_on_empty_list_item_lifts_it() {
    let keymap = Keymap::base(PC);
    let next = press(&keymap, "Enter", &doc!(ul!(li!(p!("a")), li!(p!("<a>"))))).unwrap();
    assert_eq!(next.doc(), &doc!(ul!(li!(p!("a"))), p!()).node);
}

#[test]
fn backspace_joins_then_falls_back_to_char_deletion() {
    let keymap = Keymap::base(PC);

    let joined = press(&keymap, "Backspace", &doc!(p!("a"), p!("<a>b"))).unwrap();
    assert_eq!(joined.doc(), &doc!(p!("ab")).node);

    let deleted = press(&keymap, "Backspace", &doc!(p!("ab<a>c"))).unwrap();
    assert_eq!(deleted.doc(), &doc!(p!("ac")).node);
    assert_eq!(deleted.selection(), &Selection::cursor(2));
}

#[test]
fn backspace_deletes_a_range_first() {
    let keymap = Keymap::base(PC);
    let next = press(&keymap, "Backspace", &doc!(p!("o<a>ne<b>"), p!("two"))).unwrap();
    assert_eq!(next.doc(), &doc!(p!("o"), p!("two")).node);
}

#[test]
fn delete_joins_forward() {
    let keymap = Keymap::base(PC);
    let next = press(&keymap, "Delete", &doc!(p!("a<a>"), blockquote!(p!("b")))).unwrap();
    assert_eq!(next.doc(), &doc!(p!("a"), p!("b")).node);
}

#[test]
fn mod_backspace_deletes_a_word() {
    let keymap = Keymap::base(PC);
    let next = press(&keymap, "Ctrl-Backspace", &doc!(p!("foo bar<a>"))).unwrap();
    assert_eq!(next.doc(), &doc!(p!("foo ")).node);
}

#[test]
fn mod_resolves_per_platform() {
    let pc = Keymap::base(PC);
    let mac = Keymap::base(MAC);
    assert!(pc.get("Ctrl-a").is_some());
    assert!(pc.get("Meta-a").is_none());
    assert!(mac.get("Cmd-a").is_some());
    assert_eq!(
        mac.get("Mod-a").map(|c| c.name().to_string()),
        mac.get("Meta-a").map(|c| c.name().to_string())
    );
}

#[test]
fn mac_emacs_bindings() {
    let keymap = Keymap::base(MAC);
    let d = doc!(p!("ab<a>c"));

    let start = press(&keymap, "Ctrl-a", &d).unwrap();
    assert_eq!(start.selection(), &Selection::cursor(1));

    let end = press(&keymap, "Ctrl-e", &d).unwrap();
    assert_eq!(end.selection(), &Selection::cursor(4));

    let deleted = press(&keymap, "Ctrl-d", &d).unwrap();
    assert_eq!(deleted.doc(), &doc!(p!("ab")).node);

    assert!(Keymap::base(PC).get("Ctrl-e").is_none());
}

#[test]
fn unbound_key_is_not_handled() {
    let keymap = Keymap::base(PC);
    assert!(press(&keymap, "Shift-F9", &doc!(p!("a<a>"))).is_none());
}

#[test]
fn config_round_trips_through_json() {
    let json = r#"{
        "platform": { "mac": true },
        "bindings": { "Mod-j": ["join_backward", "join_forward"] }
    }"#;
    let config: KeymapConfig = serde_json::from_str(json).unwrap();
    assert!(config.platform.mac);
    assert_eq!(
        config.bindings["Mod-j"],
        vec!["join_backward".to_string(), "join_forward".to_string()]
    );

    let serialized = serde_json::to_string(&config).unwrap();
    let back: KeymapConfig = serde_json::from_str(&serialized).unwrap();
    assert_eq!(back, config);
}

#[test]
fn missing_config_fields_use_defaults() {
    let config: KeymapConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, KeymapConfig::default());
    let keymap = Keymap::from_config(&config).unwrap();
    assert!(keymap.get("Enter").is_some());
}

#[test]
fn config_bindings_override_defaults() {
    let config: KeymapConfig =
        serde_json::from_str(r#"{ "bindings": { "Enter": ["lift"] } }"#).unwrap();
    let keymap = Keymap::from_config(&config).unwrap();
    assert_eq!(keymap.get("Enter").unwrap().name(), "lift");

    // A top-level paragraph has nothing to lift out of, and split_block is gone.
    assert!(press(&keymap, "Enter", &doc!(p!("foo<a>bar"))).is_none());
    let lifted = press(&keymap, "Enter", &doc!(blockquote!(p!("foo<a>bar")))).unwrap();
    assert_eq!(lifted.doc(), &doc!(p!("foobar")).node);
}

#[test]
fn config_errors() {
    let unknown: KeymapConfig =
        serde_json::from_str(r#"{ "bindings": { "Mod-j": ["no_such_command"] } }"#).unwrap();
    assert_eq!(
        Keymap::from_config(&unknown).unwrap_err(),
        KeymapError::UnknownCommand("no_such_command".to_string())
    );

    let empty: KeymapConfig = serde_json::from_str(r#"{ "bindings": { "Mod-j": [] } }"#).unwrap();
    assert_eq!(
        Keymap::from_config(&empty).unwrap_err(),
        KeymapError::EmptyBinding("Mod-j".to_string())
    );

    let bad_mod: KeymapConfig =
        serde_json::from_str(r#"{ "bindings": { "Hyper-j": ["lift"] } }"#).unwrap();
    assert!(matches!(
        Keymap::from_config(&bad_mod),
        Err(KeymapError::UnknownModifier { .. })
    ));
}

#[test]
fn every_named_command_resolves() {
    for name in [
        "delete_selection",
        "join_backward",
        "join_forward",
        "select_node_backward",
        "select_node_forward",
        "join_up",
        "join_down",
        "lift",
        "split_block",
        "split_block_keep_marks",
        "lift_empty_block",
        "select_parent_node",
        "select_all",
        "newline_in_code",
        "exit_code",
        "create_paragraph_near",
        "select_textblock_start",
        "select_textblock_end",
        "delete_char_backward",
        "delete_char_forward",
        "delete_word_backward",
        "delete_word_forward",
    ] {
        assert_eq!(command_by_name(name).map(|c| c.name().to_string()), Some(name.to_string()));
    }
    assert!(command_by_name("wrap_in").is_none());
}
