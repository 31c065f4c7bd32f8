//! End-to-end editing scenarios: a document with tagged selection, one command, and the
//! expected result.

use pretty_assertions::assert_eq;
use richtext_commands::{
    Command, EditorState, LayoutOracle, Selection, Transaction, auto_join_types, commands,
};
use richtext_model::testing::*;
use richtext_model::{
    AttrSpec, Direction, Fragment, Node, NodeSpec, Schema, SchemaSpec, blockquote, doc, em, h1,
    li, p, pre, ul,
};

type Primitive = fn(&EditorState, Option<&dyn LayoutOracle>) -> Option<Transaction>;

fn state_of(d: &TestDoc) -> EditorState {
    let selection = match (d.maybe_tag("a"), d.maybe_tag("b")) {
        (Some(a), Some(b)) => Selection::text(a, b),
        (Some(a), None) => Selection::cursor(a),
        _ => Selection::at_start(&d.node),
    };
    EditorState::with_selection(d.node.clone(), selection)
}

fn apply(command: Primitive, d: &TestDoc) -> EditorState {
    let state = state_of(d);
    let tr = command(&state, None).expect("command should apply");
    state.apply(tr)
}

#[test]
fn join_backward_merges_paragraphs() {
    let next = apply(commands::join_backward, &doc!(p!("hi"), p!("<a>there")));
    assert_eq!(next.doc(), &doc!(p!("hithere")).node);
    assert_eq!(next.selection(), &Selection::cursor(3));
}

#[test]
fn join_backward_escapes_blockquote() {
    let next = apply(
        commands::join_backward,
        &doc!(p!("hi"), blockquote!(p!("<a>there"))),
    );
    assert_eq!(next.doc(), &doc!(p!("hi"), p!("there")).node);
}

#[test]
fn join_backward_wraps_into_list() {
    let next = apply(
        commands::join_backward,
        &doc!(ul!(li!(p!("hi"))), p!("<a>there")),
    );
    assert_eq!(next.doc(), &doc!(ul!(li!(p!("hi")), li!(p!("there")))).node);
}

#[test]
fn split_at_end_adds_empty_paragraph() {
    let next = apply(commands::split_block, &doc!(p!("foo<a>")));
    assert_eq!(next.doc(), &doc!(p!("foo"), p!()).node);
    assert_eq!(next.selection(), &Selection::cursor(6));
}

fn heading_first_schema() -> Schema {
    Schema::new(
        SchemaSpec::new()
            .node("doc", NodeSpec::new().content("heading? paragraph*"))
            .node(
                "heading",
                NodeSpec::new()
                    .content("text*")
                    .attr("level", AttrSpec::with_default(1)),
            )
            .node("paragraph", NodeSpec::new().content("text*"))
            .node("text", NodeSpec::new().inline()),
    )
    .expect("schema is valid")
}

fn text_block(schema: &Schema, name: &str, text: &str) -> Node {
    let content = if text.is_empty() {
        Fragment::empty()
    } else {
        Fragment::from(schema.text(text, Vec::new()).unwrap())
    };
    schema.node(name, None, content, Vec::new()).unwrap()
}

#[test]
fn split_falls_back_to_default_type() {
    let schema = heading_first_schema();
    let heading = text_block(&schema, "heading", "foobar");
    let d = schema.node("doc", None, Fragment::from(heading), Vec::new()).unwrap();
    let state = EditorState::with_selection(d, Selection::cursor(4));

    let next = state.apply(commands::split_block(&state, None).unwrap());

    let expected = schema
        .node(
            "doc",
            None,
            Fragment::from_vec(vec![
                text_block(&schema, "heading", "foo"),
                text_block(&schema, "paragraph", "bar"),
            ]),
            Vec::new(),
        )
        .unwrap();
    assert_eq!(next.doc(), &expected);
    assert!(next.doc().check().is_ok());
}

fn cell_schema() -> Schema {
    Schema::new(
        SchemaSpec::new()
            .node("doc", NodeSpec::new().content("block+"))
            .node("paragraph", NodeSpec::new().content("text*").group("block"))
            .node(
                "cell",
                NodeSpec::new().content("block+").group("block").isolating(),
            )
            .node("text", NodeSpec::new().inline()),
    )
    .expect("schema is valid")
}

/// `doc(p("a"), cell(p("b")))`: the cell spans 3..8 and its paragraph text starts at 5.
fn paragraph_then_cell(schema: &Schema) -> Node {
    let cell = schema
        .node(
            "cell",
            None,
            Fragment::from(text_block(schema, "paragraph", "b")),
            Vec::new(),
        )
        .unwrap();
    schema
        .node(
            "doc",
            None,
            Fragment::from_vec(vec![text_block(schema, "paragraph", "a"), cell]),
            Vec::new(),
        )
        .unwrap()
}

#[test]
fn join_backward_stops_at_isolating_cell() {
    let schema = cell_schema();
    let d = paragraph_then_cell(&schema);
    let state = EditorState::with_selection(d, Selection::cursor(5));
    assert!(commands::join_backward(&state, None).is_none());
}

#[test]
fn join_forward_selects_isolating_cell() {
    let schema = cell_schema();
    let d = paragraph_then_cell(&schema);
    let state = EditorState::with_selection(d.clone(), Selection::cursor(2));
    let next = state.apply(commands::join_forward(&state, None).unwrap());
    assert_eq!(next.doc(), &d);
    assert_eq!(next.selection(), &Selection::Node { from: 3, to: 8 });
}

#[test]
fn toggle_mark_is_its_own_inverse() {
    let d = doc!(p!("one <a>two<b>"));
    let em_type = schema().mark_type("em").unwrap();
    let toggle = commands::toggle_mark(&em_type, None);

    let state = state_of(&d);
    let marked = toggle.run(&state, None).unwrap();
    assert_eq!(marked.doc(), &doc!(p!("one ", em!("two"))).node);

    let unmarked = toggle.run(&marked, None).unwrap();
    assert_eq!(unmarked.doc(), &d.node);
}

#[test]
fn join_backward_clears_disallowed_marks() {
    let next = apply(commands::join_backward, &doc!(pre!("x"), p!("<a>y", em!("z"))));
    assert_eq!(next.doc(), &doc!(pre!("xyz")).node);
}

#[test]
fn delete_selection_stores_marks_of_deleted_text() {
    let next = apply(commands::delete_selection, &doc!(p!("a", em!("<a>bc<b>"), "d")));
    assert_eq!(next.doc(), &doc!(p!("ad")).node);
    assert_eq!(next.selection(), &Selection::cursor(2));
    let em = schema().mark("em", None).unwrap();
    assert_eq!(next.stored_marks(), Some(&[em][..]));
}

#[test]
fn split_heading_at_start_keeps_heading_text() {
    let next = apply(commands::split_block, &doc!(h1!("<a>title")));
    assert_eq!(next.doc(), &doc!(p!(), h1!("title")).node);
}

#[test]
fn split_selection_reaching_heading_end_adds_paragraph() {
    let next = apply(commands::split_block, &doc!(h1!("a<a>bc<b>")));
    assert_eq!(next.doc(), &doc!(h1!("a"), p!()).node);
    assert_eq!(next.selection(), &Selection::cursor(4));
}

#[test]
fn split_selection_across_blocks_adds_paragraph() {
    let next = apply(commands::split_block, &doc!(h1!("a<a>b"), p!("c<b>")));
    assert_eq!(next.doc(), &doc!(h1!("a"), p!()).node);
    assert_eq!(next.selection(), &Selection::cursor(4));
}

#[test]
fn auto_join_after_wrapping_between_lists() {
    let list = schema().node_type("bullet_list").unwrap();
    let wrap = auto_join_types(commands::wrap_in(&list, None), &["bullet_list"]);
    let d = doc!(ul!(li!(p!("a"))), p!("<a>b"));
    let next = wrap.run(&state_of(&d), None).unwrap();
    assert_eq!(next.doc(), &doc!(ul!(li!(p!("a")), li!(p!("b")))).node);
}

struct SoftWrapped {
    at_visual_start: bool,
}

impl LayoutOracle for SoftWrapped {
    fn end_of_textblock(&self, dir: Direction, _state: &EditorState) -> bool {
        dir == Direction::Backward && self.at_visual_start
    }
}

#[test]
fn layout_oracle_overrides_offset_check() {
    let d = doc!(p!("hi"), p!("<a>there"));
    let state = state_of(&d);
    let oracle = SoftWrapped {
        at_visual_start: false,
    };
    let join = Command::new("join_backward", commands::join_backward);
    assert!(join.probe(&state, None));
    assert!(!join.probe(&state, Some(&oracle)));
}
