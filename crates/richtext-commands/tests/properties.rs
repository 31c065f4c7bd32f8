//! Properties every command must hold: probing has no effect, chains stop at the first
//! command that applies, and nothing a command plans can break the schema.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use richtext_commands::{
    Command, EditorState, Selection, chain_commands, command_by_name, commands,
};
use richtext_model::testing::{Tagged, block, build_doc, heading, schema};
use richtext_model::{Node, doc, p};

const PRIMITIVES: &[&str] = &[
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
];

fn all_commands() -> Vec<Command> {
    let schema = schema();
    let node = |name: &str| schema.node_type(name).unwrap();
    let mark = |name: &str| schema.mark_type(name).unwrap();

    let mut out: Vec<Command> = PRIMITIVES
        .iter()
        .map(|name| command_by_name(name).unwrap())
        .collect();
    out.extend([
        commands::wrap_in(&node("blockquote"), None),
        commands::wrap_in(&node("bullet_list"), None),
        commands::set_block_type(&node("heading"), None),
        commands::set_block_type(&node("paragraph"), None),
        commands::set_block_type(&node("code_block"), None),
        commands::toggle_mark(&mark("em"), None),
        commands::toggle_mark(&mark("strong"), None),
        commands::insert_text("x y"),
    ]);
    out
}

#[derive(Debug, Clone)]
enum Block {
    Paragraph(Option<String>),
    Heading(Option<String>),
    Code(Option<String>),
    Rule,
    Quote(Vec<Option<String>>),
    List(Vec<Option<String>>),
}

fn inline(text: &Option<String>) -> Vec<Tagged> {
    text.iter().map(|t| Tagged::from(t.as_str())).collect()
}

fn paragraph(text: &Option<String>) -> Tagged {
    block("paragraph", None, inline(text))
}

impl Block {
    fn build(&self) -> Tagged {
        match self {
            Block::Paragraph(text) => paragraph(text),
            Block::Heading(text) => heading(2, inline(text)),
            Block::Code(text) => block("code_block", None, inline(text)),
            Block::Rule => block("horizontal_rule", None, Vec::new()),
            Block::Quote(paras) => block("blockquote", None, paras.iter().map(paragraph).collect()),
            Block::List(items) => block(
                "bullet_list",
                None,
                items
                    .iter()
                    .map(|text| block("list_item", None, vec![paragraph(text)]))
                    .collect(),
            ),
        }
    }
}

fn arb_text() -> impl Strategy<Value = Option<String>> {
    prop::option::of("[a-z]{1,4}( [a-z]{1,4})?")
}

fn arb_block() -> impl Strategy<Value = Block> {
    prop_oneof![
        3 => arb_text().prop_map(Block::Paragraph),
        1 => arb_text().prop_map(Block::Heading),
        1 => arb_text().prop_map(Block::Code),
        1 => Just(Block::Rule),
        1 => prop::collection::vec(arb_text(), 1..3).prop_map(Block::Quote),
        1 => prop::collection::vec(arb_text(), 1..3).prop_map(Block::List),
    ]
}

fn arb_document() -> impl Strategy<Value = Node> {
    prop::collection::vec(arb_block(), 1..5)
        .prop_map(|blocks| build_doc(blocks.iter().map(Block::build).collect()).node)
}

/// A document and a valid selection in it.
fn arb_state() -> impl Strategy<Value = EditorState> {
    (arb_document(), any::<usize>(), any::<usize>(), 0u8..4).prop_map(|(doc, a, b, shape)| {
        let size = doc.content_size() + 1;
        let (a, b) = (a % size, b % size);
        let selection = match shape {
            0 => Selection::node(&doc, a.min(b))
                .filter(|sel| {
                    sel.selected_node(&doc)
                        .is_some_and(|node| Selection::is_selectable(&node))
                })
                .unwrap_or_else(|| Selection::all(&doc)),
            1 => Selection::all(&doc),
            _ => {
                let anchor = doc.resolve(a).unwrap();
                let head = doc.resolve(b).unwrap();
                Selection::between(&anchor, &head, None)
            }
        };
        EditorState::with_selection(doc, selection)
    })
}

proptest! {
    /// Every planned transaction produces a document the schema accepts, with the
    /// selection inside it.
    #[test]
    fn prop_commands_keep_schema(state in arb_state()) {
        for command in all_commands() {
            if let Some(tr) = command.check(&state, None) {
                let next = state.apply(tr);
                prop_assert!(
                    next.doc().check().is_ok(),
                    "{} produced an invalid document: {:?}",
                    command.name(),
                    next.doc()
                );
                prop_assert!(next.selection().to() <= next.doc().content_size());
                prop_assert!(next.selection().resolve_range(next.doc()).is_some());
            }
        }
    }

    /// Probing agrees with planning and leaves the state alone.
    #[test]
    fn prop_probe_matches_check(state in arb_state()) {
        let before = state.clone();
        for command in all_commands() {
            let applies = command.probe(&state, None);
            prop_assert_eq!(applies, command.check(&state, None).is_some(), "{}", command.name());
            prop_assert_eq!(&state, &before);
        }
    }
}

#[test]
fn chain_stops_at_first_applicable_command() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = {
        let calls = calls.clone();
        Command::new("count", move |_state, _view| {
            calls.fetch_add(1, Ordering::SeqCst);
            None
        })
    };
    let d = doc!(p!("a"), p!("<a>b"));
    let state = EditorState::with_selection(d.node.clone(), Selection::cursor(d.tag("a")));

    let chain = chain_commands(vec![
        counter.clone(),
        Command::new("join_backward", commands::join_backward),
        counter,
    ]);
    let next = chain.run(&state, None).unwrap();

    assert_eq!(next.doc(), &doc!(p!("ab")).node);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn empty_chain_never_applies() {
    let d = doc!(p!("<a>a"));
    let state = EditorState::with_selection(d.node.clone(), Selection::cursor(d.tag("a")));
    assert!(!chain_commands(Vec::new()).probe(&state, None));
}

#[test]
fn join_then_split_restores_paragraphs() {
    let d = doc!(p!("ab"), p!("<a>cd"));
    let state = EditorState::with_selection(d.node.clone(), Selection::cursor(d.tag("a")));

    let joined = state.apply(commands::join_backward(&state, None).unwrap());
    assert_eq!(joined.doc(), &doc!(p!("abcd")).node);

    let split = joined.apply(commands::split_block(&joined, None).unwrap());
    assert_eq!(split.doc(), &d.node);
    assert_eq!(split.selection(), &Selection::cursor(d.tag("a")));
}
