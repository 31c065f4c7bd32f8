//! Structural merge across a block boundary.
//!
//! Given a cut between two sibling nodes, [`delete_barrier`] tries, in order:
//!
//! 1. joining the two nodes directly (deleting an empty `before` whose markup differs, or
//!    clearing what `before`'s type does not allow from `after` and joining);
//! 2. wrapping a textblock `after` in whatever `before` needs to hold it, moving it inside
//!    `before`, and joining the wrappers that end up adjacent;
//! 3. lifting the first selectable block after the cut out of its parent, when the lift
//!    does not go above the cut.
//!
//! Isolating nodes are never joined into or wrapped across.

use richtext_model::{
    Direction, Fragment, ReplaceAroundStep, ResolvedPos, Slice, can_join, lift_target,
};

use crate::selection::Selection;
use crate::state::EditorState;
use crate::transaction::Transaction;

/// Position before the nearest node preceding `pos`'s block at any depth, not crossing
/// isolating ancestors.
pub(crate) fn find_cut_before(pos: &ResolvedPos) -> Option<ResolvedPos> {
    if pos.parent().node_type().is_isolating() {
        return None;
    }
    for d in (0..pos.depth()).rev() {
        if pos.index(d) > 0 {
            return pos.doc().resolve(pos.before(d + 1).ok()?).ok();
        }
        if pos.node(d).node_type().is_isolating() {
            break;
        }
    }
    None
}

/// Position after the nearest node following `pos`'s block at any depth, not crossing
/// isolating ancestors.
pub(crate) fn find_cut_after(pos: &ResolvedPos) -> Option<ResolvedPos> {
    if pos.parent().node_type().is_isolating() {
        return None;
    }
    for d in (0..pos.depth()).rev() {
        let parent = pos.node(d);
        if pos.index(d) + 1 < parent.child_count() {
            return pos.doc().resolve(pos.after(d + 1).ok()?).ok();
        }
        if parent.node_type().is_isolating() {
            break;
        }
    }
    None
}

/// Merge the nodes on either side of `cut`, or `None` when no strategy applies.
pub fn delete_barrier(state: &EditorState, cut: &ResolvedPos) -> Option<Transaction> {
    let before = cut.node_before()?;
    let after = cut.node_after()?;
    let isolated = before.node_type().is_isolating() || after.node_type().is_isolating();

    if !isolated && let Some(tr) = join_maybe_clear(state, cut) {
        log::trace!("merge at {}: direct join", cut.pos());
        return Some(tr);
    }
    if !isolated && let Some(tr) = wrap_and_join(state, cut) {
        log::trace!("merge at {}: wrap and join", cut.pos());
        return Some(tr);
    }
    if !after.node_type().is_isolating() && let Some(tr) = lift_after_cut(state, cut) {
        log::trace!("merge at {}: lift", cut.pos());
        return Some(tr);
    }
    None
}

fn join_maybe_clear(state: &EditorState, cut: &ResolvedPos) -> Option<Transaction> {
    let before = cut.node_before()?;
    let after = cut.node_after()?;
    if !before.node_type().compatible_content(after.node_type()) {
        return None;
    }
    let parent = cut.parent();
    let index = cut.index(cut.depth());
    if before.content_size() == 0
        && !before.same_markup(&after)
        && index > 0
        && parent.can_replace(index - 1, index, &Fragment::empty())
    {
        let mut tr = state.tr();
        tr.delete(cut.pos() - before.node_size(), cut.pos()).ok()?;
        tr.scroll_into_view();
        return Some(tr);
    }
    if !parent.can_replace(index, index + 1, &Fragment::empty())
        || !(after.is_textblock() || can_join(state.doc(), cut.pos()))
    {
        return None;
    }
    let mut tr = state.tr();
    tr.clear_incompatible(
        cut.pos(),
        before.node_type(),
        before.content_match_at(before.child_count()),
    )
    .ok()?;
    tr.join(cut.pos(), 1).ok()?;
    tr.scroll_into_view();
    Some(tr)
}

fn wrap_and_join(state: &EditorState, cut: &ResolvedPos) -> Option<Transaction> {
    let before = cut.node_before()?;
    let after = cut.node_after()?;
    let index = cut.index(cut.depth());
    if !after.is_textblock() || !cut.parent().can_replace(index, index + 1, &Fragment::empty()) {
        return None;
    }
    let matched = before.content_match_at(before.child_count())?;
    let conn = matched.find_wrapping(after.node_type())?;
    let outer = conn.first().unwrap_or(after.node_type());
    if !matched.match_type(outer).is_some_and(|m| m.valid_end()) {
        return None;
    }

    let end = cut.pos() + after.node_size();
    let mut wrap = Fragment::empty();
    for ty in conn.iter().rev() {
        wrap = Fragment::from(ty.create(None, wrap, Vec::new()).ok()?);
    }
    let wrap = Fragment::from(before.copy(wrap));
    let mut tr = state.tr();
    tr.step(ReplaceAroundStep::structural(
        cut.pos() - 1,
        end,
        cut.pos(),
        end,
        Slice::new(wrap, 1, 0),
        conn.len(),
    ))
    .ok()?;

    let join_at = end + 2 * conn.len();
    let joins = tr.doc().resolve(join_at).is_ok_and(|rjoin| {
        rjoin
            .node_after()
            .is_some_and(|node| node.node_type() == before.node_type())
    }) && can_join(tr.doc(), join_at);
    if joins {
        tr.join(join_at, 1).ok()?;
    }
    tr.scroll_into_view();
    Some(tr)
}

fn lift_after_cut(state: &EditorState, cut: &ResolvedPos) -> Option<Transaction> {
    let sel_after = Selection::find_from(cut, Direction::Forward, false)?;
    let (rfrom, rto) = sel_after.resolve_range(state.doc())?;
    let range = rfrom.block_range(&rto, None)?;
    let target = lift_target(&range)?;
    if target < cut.depth() {
        return None;
    }
    let mut tr = state.tr();
    tr.lift(&range, target).ok()?;
    tr.scroll_into_view();
    Some(tr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use richtext_model::testing::*;

    fn cut_state(d: &TestDoc) -> (EditorState, ResolvedPos) {
        let state = EditorState::new(d.node.clone());
        let cut = d.node.resolve(d.tag("cut")).unwrap();
        (state, cut)
    }

    #[test]
    fn test_direct_join_clears_marks() {
        let d = doc!(pre!("code"), "<cut>", p!("x", em!("y")));
        let (state, cut) = cut_state(&d);
        let tr = delete_barrier(&state, &cut).unwrap();
        assert_eq!(tr.doc(), &doc!(pre!("codexy")).node);
    }

    #[test]
    fn test_empty_before_is_dropped() {
        let d = doc!(h1!(), "<cut>", p!("x"));
        let (state, cut) = cut_state(&d);
        let tr = delete_barrier(&state, &cut).unwrap();
        assert_eq!(tr.doc(), &doc!(p!("x")).node);
    }

    #[test]
    fn test_wrap_into_list() {
        let d = doc!(ol!(li!(p!("a"))), "<cut>", p!("b"));
        let (state, cut) = cut_state(&d);
        let tr = delete_barrier(&state, &cut).unwrap();
        assert_eq!(tr.doc(), &doc!(ol!(li!(p!("a")), li!(p!("b")))).node);
    }

    #[test]
    fn test_lift_out_of_quote() {
        let d = doc!(p!("a"), "<cut>", blockquote!(p!("b")));
        let (state, cut) = cut_state(&d);
        let tr = delete_barrier(&state, &cut).unwrap();
        assert_eq!(tr.doc(), &doc!(p!("a"), p!("b")).node);
    }

    #[test]
    fn test_cut_search_walks_up() {
        let d = doc!(p!("a"), blockquote!(p!("<x>b")));
        let pos = d.node.resolve(d.tag("x")).unwrap();
        assert_eq!(find_cut_before(&pos).map(|cut| cut.pos()), Some(3));
        assert_eq!(find_cut_after(&pos).map(|cut| cut.pos()), None);
    }
}
