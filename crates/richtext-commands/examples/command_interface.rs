//! Command interface example
//!
//! Drives a small document through the default keymap and a few command factories,
//! printing the document after each step.

use richtext_commands::{EditorState, Keymap, Platform, Selection, commands};
use richtext_model::testing::schema;
use richtext_model::{blockquote, doc, p};

fn show(label: &str, state: &EditorState) {
    println!("  {label}");
    println!("    doc:       {:?}", state.doc());
    println!("    selection: {:?}\n", state.selection());
}

fn main() {
    println!("=== Command interface example ===\n");

    let keymap = Keymap::base(Platform::current());
    let d = doc!(p!("hello"), blockquote!(p!("<a>world")));
    let a = d.tag("a");
    let mut state = EditorState::with_selection(d.node, Selection::cursor(a));
    show("start", &state);

    // 1. Key presses go through the keymap, which tries a chain of commands.
    println!("1. Keymap:");
    for key in ["Backspace", "Backspace", "Enter"] {
        match keymap.handle(key, &state, None) {
            Some(tr) => {
                state = state.apply(tr);
                show(&format!("{key} applied"), &state);
            }
            None => println!("  {key}: nothing to do\n"),
        }
    }

    // 2. Factories build parametrized commands.
    println!("2. Factories:");
    let schema = schema();
    let quote = commands::wrap_in(&schema.node_type("blockquote").unwrap(), None);
    println!("  {} applies: {}", quote.name(), quote.probe(&state, None));
    if let Some(next) = quote.run(&state, None) {
        state = next;
        show("wrapped", &state);
    }

    let heading = commands::set_block_type(&schema.node_type("heading").unwrap(), None);
    if let Some(next) = heading.run(&state, None) {
        state = next;
        show("retyped", &state);
    }

    // 3. Probing never changes the state.
    println!("3. Probing:");
    let before = state.clone();
    let probed = keymap
        .get("Mod-BracketLeft")
        .is_some_and(|command| command.probe(&state, None));
    println!("  lift applies: {probed}");
    println!("  state unchanged: {}", before == state);
}
