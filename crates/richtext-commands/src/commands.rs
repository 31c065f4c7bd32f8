//! Editing Commands
//!
//! Every command here has the same shape: it reads an [`EditorState`] (plus an optional
//! [`LayoutOracle`]) and returns `None` when it does not apply, or the one
//! [`Transaction`] that performs it. Nothing is modified until the caller applies the
//! transaction, so calling a command is also the way to probe it.
//!
//! Parametrized commands ([`wrap_in`], [`set_block_type`], [`toggle_mark`], [`insert_text`])
//! are factories returning a [`Command`].
//!
//! # Example
//!
//! ```rust
//! use richtext_commands::{EditorState, Selection, commands};
//! use richtext_model::{doc, h1, p};
//!
//! let d = doc!(h1!("title<a>"));
//! let a = d.tag("a");
//! let state = EditorState::with_selection(d.node, Selection::cursor(a));
//!
//! // Splitting at the end of a heading continues with a paragraph.
//! let tr = commands::split_block(&state, None).unwrap();
//! let next = state.apply(tr);
//! assert_eq!(next.doc().child(1).node_type().name(), "paragraph");
//! ```

use richtext_model::{
    Attrs, ContentMatch, Direction, Fragment, MarkType, Node, NodeType, ResolvedPos,
    Result as ModelResult, TypeWithAttrs, can_join, can_split, find_wrapping, join_point,
    lift_target,
};

use crate::command::{Command, LayoutOracle};
use crate::merge::{delete_barrier, find_cut_after, find_cut_before};
use crate::selection::Selection;
use crate::state::EditorState;
use crate::text_unit::{TextUnit, next_boundary, prev_boundary};
use crate::transaction::Transaction;

/// Placeholder for non-text inline leaves when scanning a textblock's text.
const LEAF_PLACEHOLDER: &str = "\u{FFFC}";

/// Turn a failed transform builder into inapplicability. Builders are only called after
/// their preconditions were checked, so a failure here is unexpected.
fn attempt<T>(result: ModelResult<T>, command: &str) -> Option<T> {
    result
        .map_err(|err| log::warn!("{} failed to build its transaction: {}", command, err))
        .ok()
}

/// Delete the selection, if it is not empty.
pub fn delete_selection(
    state: &EditorState,
    _view: Option<&dyn LayoutOracle>,
) -> Option<Transaction> {
    if state.selection().is_empty() {
        return None;
    }
    let mut tr = state.tr();
    attempt(tr.delete_selection(), "delete_selection")?;
    tr.scroll_into_view();
    Some(tr)
}

fn at_block_start(state: &EditorState, view: Option<&dyn LayoutOracle>) -> Option<ResolvedPos> {
    let cursor = state.selection().resolve_cursor(state.doc())?;
    let at_start = match view {
        Some(view) => view.end_of_textblock(Direction::Backward, state),
        None => cursor.parent_offset() == 0,
    };
    at_start.then_some(cursor)
}

fn at_block_end(state: &EditorState, view: Option<&dyn LayoutOracle>) -> Option<ResolvedPos> {
    let cursor = state.selection().resolve_cursor(state.doc())?;
    let at_end = match view {
        Some(view) => view.end_of_textblock(Direction::Forward, state),
        None => cursor.parent_offset() >= cursor.parent().content_size(),
    };
    at_end.then_some(cursor)
}

/// Delete the (empty) block around `cursor`, going up through ancestors that would be left
/// empty, as long as the parent accepts the removal.
fn delete_empty_block(tr: &mut Transaction, cursor: &ResolvedPos) -> Option<()> {
    let mut depth = cursor.depth();
    while depth > 0 {
        let parent = cursor.node(depth - 1);
        let index = cursor.index(depth - 1);
        if parent.can_replace(index, index + 1, &Fragment::empty()) {
            let (from, to) = (cursor.before(depth).ok()?, cursor.after(depth).ok()?);
            attempt(tr.delete(from, to), "delete_empty_block")?;
            return Some(());
        }
        if depth == 1 || parent.child_count() > 1 {
            return None;
        }
        depth -= 1;
    }
    None
}

/// At the start of a textblock, join it with the block before it, lift it out of its
/// parent, or delete/select the node before it.
pub fn join_backward(state: &EditorState, view: Option<&dyn LayoutOracle>) -> Option<Transaction> {
    let cursor = at_block_start(state, view)?;
    let Some(cut) = find_cut_before(&cursor) else {
        let range = cursor.block_range(&cursor, None)?;
        let target = lift_target(&range)?;
        let mut tr = state.tr();
        attempt(tr.lift(&range, target), "join_backward")?;
        tr.scroll_into_view();
        return Some(tr);
    };
    let before = cut.node_before()?;
    let before_pos = cut.pos() - before.node_size();

    if before.is_atom() && Selection::is_selectable(&before) && cursor.parent().content_size() == 0
    {
        let mut tr = state.tr();
        if delete_empty_block(&mut tr, &cursor).is_some() {
            let selection = Selection::node(tr.doc(), before_pos)?;
            tr.set_selection(selection);
            tr.scroll_into_view();
            return Some(tr);
        }
    }

    if before.is_atom() && cut.depth() + 1 == cursor.depth() {
        let mut tr = state.tr();
        if tr.delete(before_pos, cut.pos()).is_ok() {
            tr.scroll_into_view();
            return Some(tr);
        }
    }

    if !before.node_type().is_isolating()
        && let Some(tr) = delete_barrier(state, &cut)
    {
        return Some(tr);
    }

    if Selection::is_selectable(&before) {
        let mut tr = state.tr();
        tr.set_selection(Selection::node(state.doc(), before_pos)?);
        tr.scroll_into_view();
        return Some(tr);
    }
    None
}

/// At the end of a textblock, join the block after it into it, or delete/select the node
/// after it.
pub fn join_forward(state: &EditorState, view: Option<&dyn LayoutOracle>) -> Option<Transaction> {
    let cursor = at_block_end(state, view)?;
    let cut = find_cut_after(&cursor)?;
    let after = cut.node_after()?;

    if after.is_atom() && Selection::is_selectable(&after) && cursor.parent().content_size() == 0 {
        let mut tr = state.tr();
        if delete_empty_block(&mut tr, &cursor).is_some() {
            let at = tr.mapping().map(cut.pos());
            let selection = Selection::node(tr.doc(), at)?;
            tr.set_selection(selection);
            tr.scroll_into_view();
            return Some(tr);
        }
    }

    if after.is_atom() && cut.depth() + 1 == cursor.depth() {
        let mut tr = state.tr();
        if tr.delete(cut.pos(), cut.pos() + after.node_size()).is_ok() {
            tr.scroll_into_view();
            return Some(tr);
        }
    }

    if !after.node_type().is_isolating()
        && let Some(tr) = delete_barrier(state, &cut)
    {
        return Some(tr);
    }

    if Selection::is_selectable(&after) {
        let mut tr = state.tr();
        tr.set_selection(Selection::node(state.doc(), cut.pos())?);
        tr.scroll_into_view();
        return Some(tr);
    }
    None
}

/// With an empty selection at the start of a textblock (or between blocks), select the
/// node before it.
pub fn select_node_backward(
    state: &EditorState,
    view: Option<&dyn LayoutOracle>,
) -> Option<Transaction> {
    let selection = state.selection();
    if !selection.is_empty() {
        return None;
    }
    let head = selection.resolve_head(state.doc())?;
    let cut = if head.parent().is_textblock() {
        at_block_start(state, view)?;
        find_cut_before(&head)?
    } else {
        head
    };
    let node = cut.node_before()?;
    if !Selection::is_selectable(&node) {
        return None;
    }
    let mut tr = state.tr();
    tr.set_selection(Selection::node(state.doc(), cut.pos() - node.node_size())?);
    tr.scroll_into_view();
    Some(tr)
}

/// With an empty selection at the end of a textblock (or between blocks), select the node
/// after it.
pub fn select_node_forward(
    state: &EditorState,
    view: Option<&dyn LayoutOracle>,
) -> Option<Transaction> {
    let selection = state.selection();
    if !selection.is_empty() {
        return None;
    }
    let head = selection.resolve_head(state.doc())?;
    let cut = if head.parent().is_textblock() {
        at_block_end(state, view)?;
        find_cut_after(&head)?
    } else {
        head
    };
    let node = cut.node_after()?;
    if !Selection::is_selectable(&node) {
        return None;
    }
    let mut tr = state.tr();
    tr.set_selection(Selection::node(state.doc(), cut.pos())?);
    tr.scroll_into_view();
    Some(tr)
}

fn same_type_around(doc: &Node, pos: usize) -> bool {
    doc.resolve(pos).is_ok_and(|rpos| match (rpos.node_before(), rpos.node_after()) {
        (Some(before), Some(after)) => before.node_type() == after.node_type(),
        _ => false,
    })
}

/// Join the selected block, or the closest ancestor block that can be joined, with the
/// sibling of the same type above it.
pub fn join_up(state: &EditorState, _view: Option<&dyn LayoutOracle>) -> Option<Transaction> {
    let selection = *state.selection();
    let node_selected = matches!(selection, Selection::Node { .. });
    let point = match selection {
        Selection::Node { from, .. } => {
            let node = selection.selected_node(state.doc())?;
            if node.is_textblock() || !can_join(state.doc(), from) {
                return None;
            }
            from
        }
        Selection::Text { .. } | Selection::All { .. } => {
            join_point(state.doc(), selection.from(), Direction::Backward)?
        }
    };
    if !same_type_around(state.doc(), point) {
        return None;
    }
    let before_size = state.doc().resolve(point).ok()?.node_before()?.node_size();
    let mut tr = state.tr();
    attempt(tr.join(point, 1), "join_up")?;
    if node_selected {
        let selection = Selection::node(tr.doc(), point - before_size)?;
        tr.set_selection(selection);
    }
    tr.scroll_into_view();
    Some(tr)
}

/// Join the selected block, or the closest ancestor block that can be joined, with the
/// sibling of the same type below it.
pub fn join_down(state: &EditorState, _view: Option<&dyn LayoutOracle>) -> Option<Transaction> {
    let selection = *state.selection();
    let point = match selection {
        Selection::Node { to, .. } => {
            let node = selection.selected_node(state.doc())?;
            if node.is_textblock() || !can_join(state.doc(), to) {
                return None;
            }
            to
        }
        Selection::Text { .. } | Selection::All { .. } => {
            join_point(state.doc(), selection.to(), Direction::Forward)?
        }
    };
    if !same_type_around(state.doc(), point) {
        return None;
    }
    let mut tr = state.tr();
    attempt(tr.join(point, 1), "join_down")?;
    if let Selection::Node { from, .. } = selection {
        let selection = Selection::node(tr.doc(), from)?;
        tr.set_selection(selection);
    }
    tr.scroll_into_view();
    Some(tr)
}

/// Lift the selected blocks out of their parent.
pub fn lift(state: &EditorState, _view: Option<&dyn LayoutOracle>) -> Option<Transaction> {
    let (rfrom, rto) = state.selection().resolve_range(state.doc())?;
    let range = rfrom.block_range(&rto, None)?;
    let target = lift_target(&range)?;
    let mut tr = state.tr();
    attempt(tr.lift(&range, target), "lift")?;
    tr.scroll_into_view();
    Some(tr)
}

/// Wrap the selected blocks in a node of type `ty`, adding whatever wrappers the schema
/// needs around or inside it.
pub fn wrap_in(ty: &NodeType, attrs: Option<Attrs>) -> Command {
    let ty = ty.clone();
    Command::new(format!("wrap_in({})", ty.name()), move |state, _view| {
        let (rfrom, rto) = state.selection().resolve_range(state.doc())?;
        let range = rfrom.block_range(&rto, None)?;
        let wrapping = find_wrapping(&range, &ty, attrs.as_ref(), None)?;
        let mut tr = state.tr();
        attempt(tr.wrap(&range, &wrapping), "wrap_in")?;
        tr.scroll_into_view();
        Some(tr)
    })
}

/// Turn the selected textblocks into `ty` with `attrs`. Applies when at least one of them
/// is not already of that markup and its parent allows the new type.
pub fn set_block_type(ty: &NodeType, attrs: Option<Attrs>) -> Command {
    let ty = ty.clone();
    Command::new(format!("set_block_type({})", ty.name()), move |state, _view| {
        let selection = state.selection();
        let (from, to) = (selection.from(), selection.to());
        let doc = state.doc();
        let mut applicable = false;
        doc.nodes_between(from, to, &mut |node, pos, _, _| {
            if applicable {
                return false;
            }
            if !node.is_textblock() || node.has_markup(&ty, attrs.as_ref(), None) {
                return true;
            }
            applicable = node.node_type() == &ty
                || doc.resolve(pos).is_ok_and(|rpos| {
                    let index = rpos.index(rpos.depth());
                    rpos.parent().can_replace_with(index, index + 1, &ty, None)
                });
            !applicable
        });
        if !applicable {
            return None;
        }
        let mut tr = state.tr();
        attempt(tr.set_block_type(from, to, &ty, attrs.as_ref()), "set_block_type")?;
        tr.scroll_into_view();
        Some(tr)
    })
}

/// Whether any textblock touched by `from..to` allows marks of `mark_type`.
fn mark_applies(doc: &Node, from: usize, to: usize, mark_type: &MarkType) -> bool {
    let mut can = doc.inline_content() && doc.node_type().allows_mark_type(mark_type);
    doc.nodes_between(from, to, &mut |node, _, _, _| {
        if can {
            return false;
        }
        can = node.inline_content() && node.node_type().allows_mark_type(mark_type);
        true
    });
    can
}

/// Toggle a mark of `mark_type`. On a cursor this toggles the stored marks; on a range it
/// removes the mark when any of the range has it, and adds it otherwise.
pub fn toggle_mark(mark_type: &MarkType, attrs: Option<Attrs>) -> Command {
    let mark_type = mark_type.clone();
    Command::new(format!("toggle_mark({})", mark_type.name()), move |state, _view| {
        let selection = *state.selection();
        let doc = state.doc();
        if !mark_applies(doc, selection.from(), selection.to(), &mark_type) {
            return None;
        }
        let mut tr = state.tr();
        if let Some(cursor) = selection.resolve_cursor(doc) {
            let active = match state.stored_marks() {
                Some(stored) => stored.to_vec(),
                None => cursor.marks(),
            };
            if mark_type.is_in_set(&active).is_some() {
                tr.remove_stored_mark(&mark_type);
            } else {
                let mark = attempt(mark_type.create(attrs.as_ref()), "toggle_mark")?;
                tr.add_stored_mark(&mark);
            }
            return Some(tr);
        }
        if selection.is_empty() {
            return None;
        }

        let (mut from, mut to) = (selection.from(), selection.to());
        if doc.range_has_mark(from, to, &mark_type) {
            attempt(tr.remove_mark(from, to, &mark_type), "toggle_mark")?;
        } else {
            let (rfrom, rto) = selection.resolve_range(doc)?;
            let space_start = rfrom
                .node_after()
                .and_then(|node| node.text().map(leading_space))
                .unwrap_or(0);
            let space_end = rto
                .node_before()
                .and_then(|node| node.text().map(trailing_space))
                .unwrap_or(0);
            if from + space_start < to {
                from += space_start;
                to -= space_end;
            }
            let mark = attempt(mark_type.create(attrs.as_ref()), "toggle_mark")?;
            attempt(tr.add_mark(from, to, &mark), "toggle_mark")?;
        }
        tr.scroll_into_view();
        Some(tr)
    })
}

fn leading_space(text: &str) -> usize {
    text.chars().take_while(|ch| ch.is_whitespace()).count()
}

fn trailing_space(text: &str) -> usize {
    text.chars().rev().take_while(|ch| ch.is_whitespace()).count()
}

/// The first textblock type without required attributes that `matched` accepts.
fn default_block_at(matched: Option<ContentMatch>) -> Option<NodeType> {
    let matched = matched?;
    (0..matched.edge_count())
        .filter_map(|n| matched.edge(n))
        .map(|(ty, _)| ty)
        .find(|ty| ty.is_textblock() && !ty.has_required_attrs())
}

/// Split the textblock at the selection, deleting selected content first. Splitting at the
/// end continues with the parent's default textblock; splitting at the start of a
/// non-default block turns the empty leading block into the default type.
pub fn split_block(state: &EditorState, _view: Option<&dyn LayoutOracle>) -> Option<Transaction> {
    let selection = *state.selection();
    let (rfrom, rto) = selection.resolve_range(state.doc())?;

    if let Selection::Node { from, .. } = selection {
        let node = selection.selected_node(state.doc())?;
        if !node.is_block() {
            return None;
        }
        if rfrom.parent_offset() == 0 || !can_split(state.doc(), from, 1, &[]) {
            return None;
        }
        let mut tr = state.tr();
        attempt(tr.split(from, 1, &[]), "split_block")?;
        tr.scroll_into_view();
        return Some(tr);
    }

    let depth = rfrom.depth();
    if depth == 0 || !rfrom.parent().is_block() {
        return None;
    }
    // Selected content is deleted first, so the split lands at the end of the block when
    // the selection's end does.
    let at_end = rto.parent_offset() == rto.parent().content_size();
    let at_start = rfrom.start(depth) == rfrom.pos();
    let deflt = default_block_at(
        rfrom
            .node(depth - 1)
            .content_match_at(rfrom.index_after(depth - 1)),
    );
    let mut types: Vec<Option<TypeWithAttrs>> = vec![match (&deflt, at_end) {
        (Some(deflt), true) => Some(TypeWithAttrs::new(deflt.clone())),
        _ => None,
    }];

    let mut tr = state.tr();
    if matches!(selection, Selection::Text { .. } | Selection::All { .. }) && !selection.is_empty()
    {
        attempt(tr.delete_selection(), "split_block")?;
    }
    let split_pos = tr.mapping().map(rfrom.pos());
    let mut can = can_split(tr.doc(), split_pos, 1, &types);
    if !can {
        types[0] = deflt.clone().map(TypeWithAttrs::new);
        can = can_split(tr.doc(), split_pos, 1, &types);
    }
    if !can {
        return None;
    }
    attempt(tr.split(split_pos, 1, &types), "split_block")?;

    if !at_end
        && at_start
        && let Some(deflt) = &deflt
        && rfrom.parent().node_type() != deflt
    {
        let first = tr.mapping().map(rfrom.before(depth).ok()?);
        let rfirst = tr.doc().resolve(first).ok()?;
        let index = rfirst.index(rfirst.depth());
        if rfrom
            .node(depth - 1)
            .can_replace_with(index, index + 1, deflt, None)
        {
            attempt(tr.set_node_markup(first, Some(deflt), None, None), "split_block")?;
        }
    }
    tr.scroll_into_view();
    Some(tr)
}

/// [`split_block`], keeping the active marks for the text typed after the split.
pub fn split_block_keep_marks(
    state: &EditorState,
    view: Option<&dyn LayoutOracle>,
) -> Option<Transaction> {
    let mut tr = split_block(state, view)?;
    let marks = match state.stored_marks() {
        Some(stored) => Some(stored.to_vec()),
        None => {
            let (rfrom, rto) = state.selection().resolve_range(state.doc())?;
            (rto.parent_offset() > 0).then(|| rfrom.marks())
        }
    };
    if let Some(marks) = marks {
        tr.ensure_marks(marks);
    }
    Some(tr)
}

/// In an empty textblock, split the parent around it when it is not the parent's last
/// child, or lift it out otherwise.
pub fn lift_empty_block(
    state: &EditorState,
    _view: Option<&dyn LayoutOracle>,
) -> Option<Transaction> {
    let cursor = state.selection().resolve_cursor(state.doc())?;
    if cursor.parent().content_size() > 0 {
        return None;
    }
    let depth = cursor.depth();
    if depth > 1 && cursor.after(depth).ok()? != cursor.end(depth - 1) {
        let before = cursor.before(depth).ok()?;
        if can_split(state.doc(), before, 1, &[]) {
            let mut tr = state.tr();
            attempt(tr.split(before, 1, &[]), "lift_empty_block")?;
            tr.scroll_into_view();
            return Some(tr);
        }
    }
    let range = cursor.block_range(&cursor, None)?;
    let target = lift_target(&range)?;
    let mut tr = state.tr();
    attempt(tr.lift(&range, target), "lift_empty_block")?;
    tr.scroll_into_view();
    Some(tr)
}

/// Select the smallest node around the selection that is not the document.
pub fn select_parent_node(
    state: &EditorState,
    _view: Option<&dyn LayoutOracle>,
) -> Option<Transaction> {
    let selection = state.selection();
    let (rfrom, _) = selection.resolve_range(state.doc())?;
    let same = rfrom.shared_depth(selection.to());
    if same == 0 {
        return None;
    }
    let pos = rfrom.before(same).ok()?;
    let mut tr = state.tr();
    tr.set_selection(Selection::node(state.doc(), pos)?);
    Some(tr)
}

/// Select the whole document.
pub fn select_all(state: &EditorState, _view: Option<&dyn LayoutOracle>) -> Option<Transaction> {
    let mut tr = state.tr();
    tr.set_selection(Selection::all(state.doc()));
    Some(tr)
}

fn code_head(state: &EditorState) -> Option<ResolvedPos> {
    let selection = state.selection();
    let head = selection.resolve_head(state.doc())?;
    let anchor = selection.resolve_anchor(state.doc())?;
    (head.parent().node_type().is_code() && head.same_parent(&anchor)).then_some(head)
}

/// Inside a code block, replace the selection with a newline.
pub fn newline_in_code(
    state: &EditorState,
    _view: Option<&dyn LayoutOracle>,
) -> Option<Transaction> {
    code_head(state)?;
    let mut tr = state.tr();
    attempt(tr.insert_text("\n", None), "newline_in_code")?;
    tr.scroll_into_view();
    Some(tr)
}

/// Inside a code block, create a default textblock after it and move the cursor there.
pub fn exit_code(state: &EditorState, _view: Option<&dyn LayoutOracle>) -> Option<Transaction> {
    let head = code_head(state)?;
    let depth = head.depth();
    let above = head.node(depth - 1);
    let after = head.index_after(depth - 1);
    let ty = default_block_at(above.content_match_at(after))?;
    if !above.can_replace_with(after, after, &ty, None) {
        return None;
    }
    let block = ty.create_and_fill(None, Fragment::empty(), Vec::new())?;
    let pos = head.after(depth).ok()?;
    let mut tr = state.tr();
    attempt(tr.insert(pos, block), "exit_code")?;
    let rpos = attempt(tr.doc().resolve(pos), "exit_code")?;
    tr.set_selection(Selection::near(&rpos, Direction::Forward));
    tr.scroll_into_view();
    Some(tr)
}

/// When a block node is selected (or the cursor sits between blocks), insert an empty
/// default textblock next to it.
pub fn create_paragraph_near(
    state: &EditorState,
    _view: Option<&dyn LayoutOracle>,
) -> Option<Transaction> {
    let selection = state.selection();
    if matches!(selection, Selection::All { .. }) {
        return None;
    }
    let (rfrom, rto) = selection.resolve_range(state.doc())?;
    if rfrom.parent().inline_content() || rto.parent().inline_content() {
        return None;
    }
    let ty = default_block_at(
        rto.parent()
            .content_match_at(rto.index_after(rto.depth())),
    )?;
    let side = if rfrom.parent_offset() == 0 && rto.index(rto.depth()) < rto.parent().child_count()
    {
        rfrom.pos()
    } else {
        rto.pos()
    };
    let block = ty.create_and_fill(None, Fragment::empty(), Vec::new())?;
    let mut tr = state.tr();
    attempt(tr.insert(side, block), "create_paragraph_near")?;
    tr.set_selection(Selection::cursor(side + 1));
    tr.scroll_into_view();
    Some(tr)
}

fn select_textblock_side(state: &EditorState, dir: Direction) -> Option<Transaction> {
    let selection = state.selection();
    let pos = match dir {
        Direction::Backward => selection.from(),
        Direction::Forward => selection.to(),
    };
    let rpos = state.doc().resolve(pos).ok()?;
    let depth = rpos.depth();
    if !rpos.parent().is_textblock() {
        return None;
    }
    let target = match dir {
        Direction::Backward => rpos.start(depth),
        Direction::Forward => rpos.end(depth),
    };
    let mut tr = state.tr();
    tr.set_selection(Selection::cursor(target));
    Some(tr)
}

/// Move the cursor to the start of the textblock around the selection.
pub fn select_textblock_start(
    state: &EditorState,
    _view: Option<&dyn LayoutOracle>,
) -> Option<Transaction> {
    select_textblock_side(state, Direction::Backward)
}

/// Move the cursor to the end of the textblock around the selection.
pub fn select_textblock_end(
    state: &EditorState,
    _view: Option<&dyn LayoutOracle>,
) -> Option<Transaction> {
    select_textblock_side(state, Direction::Forward)
}

/// Delete from the cursor to the next `unit` boundary in `dir`, staying inside the
/// cursor's textblock.
fn delete_unit(state: &EditorState, dir: Direction, unit: TextUnit) -> Option<Transaction> {
    let cursor = state.selection().resolve_cursor(state.doc())?;
    let parent = cursor.parent();
    if !parent.is_textblock() {
        return None;
    }
    let text = parent.text_between(0, parent.content_size(), None, Some(LEAF_PLACEHOLDER));
    let offset = cursor.parent_offset();
    let start = cursor.pos() - offset;
    let (from, to) = match dir {
        Direction::Backward => (prev_boundary(&text, offset, unit), offset),
        Direction::Forward => (offset, next_boundary(&text, offset, unit)),
    };
    if from == to {
        return None;
    }
    let mut tr = state.tr();
    attempt(tr.delete(start + from, start + to), "delete_unit")?;
    tr.set_selection(Selection::cursor(start + from));
    tr.scroll_into_view();
    Some(tr)
}

/// Delete the grapheme cluster before the cursor.
pub fn delete_char_backward(
    state: &EditorState,
    _view: Option<&dyn LayoutOracle>,
) -> Option<Transaction> {
    delete_unit(state, Direction::Backward, TextUnit::Char)
}

/// Delete the grapheme cluster after the cursor.
pub fn delete_char_forward(
    state: &EditorState,
    _view: Option<&dyn LayoutOracle>,
) -> Option<Transaction> {
    delete_unit(state, Direction::Forward, TextUnit::Char)
}

/// Delete the word before the cursor, with the whitespace right before the cursor.
pub fn delete_word_backward(
    state: &EditorState,
    _view: Option<&dyn LayoutOracle>,
) -> Option<Transaction> {
    delete_unit(state, Direction::Backward, TextUnit::Word)
}

/// Delete the word after the cursor, with the whitespace right after the cursor.
pub fn delete_word_forward(
    state: &EditorState,
    _view: Option<&dyn LayoutOracle>,
) -> Option<Transaction> {
    delete_unit(state, Direction::Forward, TextUnit::Word)
}

/// Replace the selection with `text`, which takes the active marks.
pub fn insert_text(text: impl Into<String>) -> Command {
    let text = text.into();
    Command::new("insert_text", move |state, _view| {
        let (rfrom, rto) = state.selection().resolve_range(state.doc())?;
        if !rfrom.parent().inline_content() || !rto.parent().inline_content() {
            return None;
        }
        let mut tr = state.tr();
        attempt(tr.insert_text(&text, None), "insert_text")?;
        tr.scroll_into_view();
        Some(tr)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use richtext_model::testing::*;

    fn state(d: &TestDoc) -> EditorState {
        let selection = match (d.maybe_tag("a"), d.maybe_tag("b")) {
            (Some(a), Some(b)) => Selection::text(a, b),
            (Some(a), None) => Selection::cursor(a),
            _ => Selection::at_start(&d.node),
        };
        EditorState::with_selection(d.node.clone(), selection)
    }

    fn apply(
        command: fn(&EditorState, Option<&dyn LayoutOracle>) -> Option<Transaction>,
        d: &TestDoc,
    ) -> Option<EditorState> {
        let state = state(d);
        command(&state, None).map(|tr| state.apply(tr))
    }

    #[test]
    fn test_delete_selection_needs_range() {
        assert!(apply(delete_selection, &doc!(p!("a<a>b"))).is_none());
        let next = apply(delete_selection, &doc!(p!("<a>ab<b>c"))).unwrap();
        assert_eq!(next.doc(), &doc!(p!("c")).node);
    }

    #[test]
    fn test_join_backward_requires_block_start() {
        assert!(apply(join_backward, &doc!(p!("a"), p!("b<a>c"))).is_none());
    }

    #[test]
    fn test_join_backward_deletes_leaf() {
        let next = apply(join_backward, &doc!(hr(), p!("<a>x"))).unwrap();
        assert_eq!(next.doc(), &doc!(p!("x")).node);
    }

    #[test]
    fn test_join_backward_selects_leaf_from_empty_block() {
        let next = apply(join_backward, &doc!(hr(), p!("<a>"), p!("x"))).unwrap();
        assert_eq!(next.doc(), &doc!(hr(), p!("x")).node);
        assert_eq!(next.selection(), &Selection::Node { from: 0, to: 1 });
    }

    #[test]
    fn test_join_backward_lifts_first_item() {
        let next = apply(join_backward, &doc!(blockquote!(p!("<a>a")), p!("b"))).unwrap();
        assert_eq!(next.doc(), &doc!(p!("a"), p!("b")).node);
    }

    #[test]
    fn test_join_forward_merges_next_block() {
        let next = apply(join_forward, &doc!(p!("a<a>"), p!("b"))).unwrap();
        assert_eq!(next.doc(), &doc!(p!("ab")).node);
        assert!(apply(join_forward, &doc!(p!("a<a>"))).is_none());
    }

    #[test]
    fn test_select_node_backward() {
        let next = apply(select_node_backward, &doc!(hr(), p!("<a>x"))).unwrap();
        assert_eq!(next.selection(), &Selection::Node { from: 0, to: 1 });
        assert!(apply(select_node_backward, &doc!(hr(), p!("x<a>y"))).is_none());
    }

    #[test]
    fn test_join_up_requires_same_type() {
        let next = apply(join_up, &doc!(ul!(li!(p!("a"))), ul!(li!(p!("<a>b"))))).unwrap();
        assert_eq!(next.doc(), &doc!(ul!(li!(p!("a")), li!(p!("b")))).node);
        assert!(apply(join_up, &doc!(ol!(li!(p!("a"))), ul!(li!(p!("<a>b"))))).is_none());
    }

    #[test]
    fn test_join_down_keeps_node_selection() {
        let d = doc!(blockquote!(p!("a")), blockquote!(p!("b")));
        let state =
            EditorState::with_selection(d.node.clone(), Selection::node(&d.node, 0).unwrap());
        let next = state.apply(join_down(&state, None).unwrap());
        assert_eq!(next.doc(), &doc!(blockquote!(p!("a"), p!("b"))).node);
        assert_eq!(next.selection(), &Selection::Node { from: 0, to: 8 });
    }

    #[test]
    fn test_lift_out_of_blockquote() {
        let next = apply(lift, &doc!(blockquote!(p!("<a>a")))).unwrap();
        assert_eq!(next.doc(), &doc!(p!("a")).node);
        assert!(apply(lift, &doc!(p!("<a>a"))).is_none());
    }

    #[test]
    fn test_set_block_type_skips_matching_blocks() {
        let heading = schema().node_type("heading").unwrap();
        let to_heading = set_block_type(&heading, None);
        let state = state(&doc!(p!("<a>a")));
        let next = to_heading.run(&state, None).unwrap();
        assert_eq!(next.doc(), &doc!(h1!("a")).node);
        assert!(!to_heading.probe(&next, None));
    }

    #[test]
    fn test_toggle_mark_on_cursor_uses_stored_marks() {
        let em = schema().mark_type("em").unwrap();
        let toggle = toggle_mark(&em, None);
        let state = state(&doc!(p!("ab<a>")));
        let next = toggle.run(&state, None).unwrap();
        assert_eq!(next.doc(), state.doc());
        assert_eq!(next.stored_marks().map(<[_]>::len), Some(1));
        let next = toggle.run(&next, None).unwrap();
        assert_eq!(next.stored_marks(), Some(&[][..]));
    }

    #[test]
    fn test_toggle_mark_trims_whitespace() {
        let strong = schema().mark_type("strong").unwrap();
        let state = state(&doc!(p!("a<a> bc <b>d")));
        let next = toggle_mark(&strong, None).run(&state, None).unwrap();
        assert_eq!(next.doc(), &doc!(p!("a ", strong!("bc"), " d")).node);
    }

    #[test]
    fn test_toggle_mark_not_allowed_in_code() {
        let em = schema().mark_type("em").unwrap();
        let state = state(&doc!(pre!("<a>co<b>de")));
        assert!(!toggle_mark(&em, None).probe(&state, None));
    }

    #[test]
    fn test_split_block_in_middle() {
        let next = apply(split_block, &doc!(h1!("ab<a>cd"))).unwrap();
        assert_eq!(next.doc(), &doc!(h1!("ab"), h1!("cd")).node);
        assert_eq!(next.selection(), &Selection::cursor(5));
    }

    #[test]
    fn test_split_block_at_heading_start() {
        let next = apply(split_block, &doc!(h1!("<a>ab"))).unwrap();
        assert_eq!(next.doc(), &doc!(p!(), h1!("ab")).node);
    }

    #[test]
    fn test_split_block_deletes_selection() {
        let next = apply(split_block, &doc!(p!("a<a>bc<b>d"))).unwrap();
        assert_eq!(next.doc(), &doc!(p!("a"), p!("d")).node);
    }

    #[test]
    fn test_split_block_keep_marks() {
        let next = apply(split_block_keep_marks, &doc!(p!(em!("ab<a>")))).unwrap();
        let em = schema().mark("em", None).unwrap();
        assert_eq!(next.stored_marks(), Some(&[em][..]));
    }

    #[test]
    fn test_lift_empty_block_splits_list() {
        let d = doc!(ul!(li!(p!("a"), p!("<a>"), p!("b"))));
        let next = apply(lift_empty_block, &d).unwrap();
        assert_eq!(next.doc(), &doc!(ul!(li!(p!("a")), li!(p!(), p!("b")))).node);
        assert!(apply(lift_empty_block, &doc!(p!("a<a>"))).is_none());
    }

    #[test]
    fn test_lift_empty_block_out_of_list() {
        let d = doc!(ul!(li!(p!("a")), li!(p!("<a>")), li!(p!("b"))));
        let next = apply(lift_empty_block, &d).unwrap();
        assert_eq!(
            next.doc(),
            &doc!(ul!(li!(p!("a"))), p!(), ul!(li!(p!("b")))).node
        );
    }

    #[test]
    fn test_select_parent_node() {
        let next = apply(select_parent_node, &doc!(blockquote!(p!("a<a>b")))).unwrap();
        assert_eq!(next.selection(), &Selection::Node { from: 1, to: 5 });
        let next = next.apply(select_parent_node(&next, None).unwrap());
        assert_eq!(next.selection(), &Selection::Node { from: 0, to: 6 });
        assert!(select_parent_node(&next, None).is_none());
    }

    #[test]
    fn test_newline_and_exit_code() {
        let d = doc!(pre!("a<a>b"));
        let next = apply(newline_in_code, &d).unwrap();
        assert_eq!(next.doc(), &doc!(pre!("a\nb")).node);
        let next = apply(exit_code, &d).unwrap();
        assert_eq!(next.doc(), &doc!(pre!("ab"), p!()).node);
        assert_eq!(next.selection(), &Selection::cursor(5));
        assert!(apply(newline_in_code, &doc!(p!("a<a>"))).is_none());
    }

    #[test]
    fn test_create_paragraph_near_selected_rule() {
        let d = doc!(hr());
        let state =
            EditorState::with_selection(d.node.clone(), Selection::node(&d.node, 0).unwrap());
        let next = state.apply(create_paragraph_near(&state, None).unwrap());
        assert_eq!(next.doc(), &doc!(hr(), p!()).node);
        assert_eq!(next.selection(), &Selection::cursor(2));
    }

    #[test]
    fn test_textblock_sides() {
        let d = doc!(p!("ab<a>cd"));
        assert_eq!(apply(select_textblock_start, &d).unwrap().selection(), &Selection::cursor(1));
        assert_eq!(apply(select_textblock_end, &d).unwrap().selection(), &Selection::cursor(5));
    }

    #[test]
    fn test_delete_units() {
        let d = doc!(p!("foo bar <a>baz"));
        let next = apply(delete_word_backward, &d).unwrap();
        assert_eq!(next.doc(), &doc!(p!("foo baz")).node);
        let next = apply(delete_char_forward, &d).unwrap();
        assert_eq!(next.doc(), &doc!(p!("foo bar az")).node);
        assert!(apply(delete_char_backward, &doc!(p!("<a>x"))).is_none());
    }

    #[test]
    fn test_insert_text_command() {
        let state = state(&doc!(p!("a<a>")));
        let next = insert_text("bc").run(&state, None).unwrap();
        assert_eq!(next.doc(), &doc!(p!("abc")).node);
    }
}
