//! Queries that find valid structural edits (lift, wrap, split, join) and the step builder
//! behind [`crate::Transform::replace`].

use crate::content::ContentMatch;
use crate::error::Result;
use crate::fragment::Fragment;
use crate::node::Node;
use crate::resolved::{NodeRange, ResolvedPos};
use crate::schema::{Attrs, NodeType};
use crate::slice::Slice;
use crate::step::{ReplaceAroundStep, ReplaceStep, Step};

/// Direction of a search through the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Towards the start of the document.
    Backward,
    /// Towards the end of the document.
    Forward,
}

impl Direction {
    /// The opposite direction.
    pub fn reverse(self) -> Self {
        match self {
            Direction::Backward => Direction::Forward,
            Direction::Forward => Direction::Backward,
        }
    }
}

/// A node type plus the attributes to create it with.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeWithAttrs {
    /// The type.
    pub ty: NodeType,
    /// Attributes, defaults when `None`.
    pub attrs: Option<Attrs>,
}

impl TypeWithAttrs {
    /// A type with default attributes.
    pub fn new(ty: NodeType) -> Self {
        Self { ty, attrs: None }
    }

    /// A type with explicit attributes.
    pub fn with_attrs(ty: NodeType, attrs: Attrs) -> Self {
        Self {
            ty,
            attrs: Some(attrs),
        }
    }
}

fn can_cut(node: &Node, start: usize, end: usize) -> bool {
    (start == 0 || node.can_replace(start, node.child_count(), &Fragment::empty()))
        && (end == node.child_count() || node.can_replace(0, end, &Fragment::empty()))
}

/// Depth the content of `range` can be lifted to, if any. Never crosses isolating nodes.
pub fn lift_target(range: &NodeRange) -> Option<usize> {
    let parent = range.parent();
    let content = parent
        .content()
        .cut_by_index(range.start_index(), range.end_index());
    let mut depth = range.depth();
    let mut content_before = 0;
    let mut content_after = 0;
    loop {
        let node = range.from().node(depth);
        let index = range.from().index(depth) + content_before;
        let end_index = range.to().index_after(depth).saturating_sub(content_after);
        if depth < range.depth() && node.can_replace(index, end_index, &content) {
            return Some(depth);
        }
        if depth == 0 || node.node_type().is_isolating() || !can_cut(node, index, end_index) {
            return None;
        }
        if index > 0 {
            content_before = 1;
        }
        if end_index < node.child_count() {
            content_after = 1;
        }
        depth -= 1;
    }
}

/// Wrappers needed to wrap `range` in a node of type `ty`: outer wrappers, `ty` itself, and
/// inner wrappers needed to fit the range's content into `ty`.
pub fn find_wrapping(
    range: &NodeRange,
    ty: &NodeType,
    attrs: Option<&Attrs>,
    inner_range: Option<&NodeRange>,
) -> Option<Vec<TypeWithAttrs>> {
    let inner_range = inner_range.unwrap_or(range);
    let around = find_wrapping_outside(range, ty)?;
    let inner = find_wrapping_inside(inner_range, ty)?;
    let mut result: Vec<TypeWithAttrs> = around.into_iter().map(TypeWithAttrs::new).collect();
    result.push(TypeWithAttrs {
        ty: ty.clone(),
        attrs: attrs.cloned(),
    });
    result.extend(inner.into_iter().map(TypeWithAttrs::new));
    Some(result)
}

fn find_wrapping_outside(range: &NodeRange, ty: &NodeType) -> Option<Vec<NodeType>> {
    let parent = range.parent();
    let (start, end) = (range.start_index(), range.end_index());
    let around = parent.content_match_at(start)?.find_wrapping(ty)?;
    let outer = around.first().unwrap_or(ty);
    if parent.can_replace_with(start, end, outer, None) {
        Some(around)
    } else {
        None
    }
}

fn find_wrapping_inside(range: &NodeRange, ty: &NodeType) -> Option<Vec<NodeType>> {
    let parent = range.parent();
    let inner = parent.maybe_child(range.start_index())?;
    let inside = ty.content_match().find_wrapping(inner.node_type())?;
    let last_type = inside.last().unwrap_or(ty).clone();
    let mut inner_match: Option<ContentMatch> = Some(last_type.content_match());
    for i in range.start_index()..range.end_index() {
        inner_match = inner_match.and_then(|m| m.match_type(parent.child(i).node_type()));
    }
    match inner_match {
        Some(m) if m.valid_end() => Some(inside),
        _ => None,
    }
}

/// Whether the textblock at `pos` could be turned into a node of type `ty`.
pub(crate) fn can_change_type(doc: &Node, pos: usize, ty: &NodeType) -> bool {
    let Ok(rpos) = doc.resolve(pos) else {
        return false;
    };
    let index = rpos.index(rpos.depth());
    rpos.parent().can_replace_with(index, index + 1, ty, None)
}

/// Whether splitting at `pos` through `depth` levels is valid. `types_after` optionally
/// gives the types of the nodes after the split, outermost first.
pub fn can_split(
    doc: &Node,
    pos: usize,
    depth: usize,
    types_after: &[Option<TypeWithAttrs>],
) -> bool {
    let Ok(rpos) = doc.resolve(pos) else {
        return false;
    };
    if depth == 0 {
        return false;
    }
    let Some(base) = rpos.depth().checked_sub(depth) else {
        return false;
    };
    let parent = rpos.parent();
    let index = rpos.index(rpos.depth());
    let inner_type = types_after
        .last()
        .and_then(|t| t.as_ref())
        .map(|t| t.ty.clone())
        .unwrap_or_else(|| parent.node_type().clone());
    if parent.node_type().is_isolating()
        || !parent.can_replace(index, parent.child_count(), &Fragment::empty())
        || !inner_type.valid_content(
            &parent
                .content()
                .cut_by_index(index.min(parent.child_count()), parent.child_count()),
        )
    {
        return false;
    }

    let mut d = rpos.depth() - 1;
    let mut i = depth as isize - 2;
    while d > base {
        let node = rpos.node(d);
        let index = rpos.index(d);
        if node.node_type().is_isolating() {
            return false;
        }
        let mut rest = node.content().cut_by_index(index, node.child_count());
        if let Some(override_child) = type_at(types_after, i + 1) {
            match override_child.ty.create(
                override_child.attrs.as_ref(),
                Fragment::empty(),
                Vec::new(),
            ) {
                Ok(child) => rest = rest.replace_child(0, child),
                Err(_) => return false,
            }
        }
        let after_type = type_at(types_after, i)
            .map(|t| t.ty.clone())
            .unwrap_or_else(|| node.node_type().clone());
        if !node.can_replace(index + 1, node.child_count(), &Fragment::empty())
            || !after_type.valid_content(&rest)
        {
            return false;
        }
        d -= 1;
        i -= 1;
    }

    let index = rpos.index_after(base);
    let base_type = types_after
        .first()
        .and_then(|t| t.as_ref())
        .map(|t| t.ty.clone())
        .unwrap_or_else(|| rpos.node(base + 1).node_type().clone());
    rpos.node(base).can_replace_with(index, index, &base_type, None)
}

fn type_at(types: &[Option<TypeWithAttrs>], i: isize) -> Option<&TypeWithAttrs> {
    usize::try_from(i)
        .ok()
        .and_then(|i| types.get(i))
        .and_then(|t| t.as_ref())
}

fn joinable(before: Option<&Node>, after: Option<&Node>) -> bool {
    match (before, after) {
        (Some(a), Some(b)) => !a.is_leaf() && a.can_append(b),
        _ => false,
    }
}

/// Whether the nodes directly before and after `pos` can be joined.
pub fn can_join(doc: &Node, pos: usize) -> bool {
    let Ok(rpos) = doc.resolve(pos) else {
        return false;
    };
    let index = rpos.index(rpos.depth());
    joinable(rpos.node_before().as_ref(), rpos.node_after().as_ref())
        && rpos
            .parent()
            .can_replace(index, index + 1, &Fragment::empty())
}

/// Nearest position at or around `pos`, searching outward in `dir`, where two blocks can be
/// joined.
pub fn join_point(doc: &Node, pos: usize, dir: Direction) -> Option<usize> {
    let rpos = doc.resolve(pos).ok()?;
    let mut pos = pos;
    let mut d = rpos.depth();
    loop {
        let mut index = rpos.index(d);
        let (before, after) = if d == rpos.depth() {
            (rpos.node_before(), rpos.node_after())
        } else if dir == Direction::Forward {
            index += 1;
            (
                Some(rpos.node(d + 1).clone()),
                rpos.node(d).maybe_child(index).cloned(),
            )
        } else {
            (
                index
                    .checked_sub(1)
                    .and_then(|i| rpos.node(d).maybe_child(i))
                    .cloned(),
                Some(rpos.node(d + 1).clone()),
            )
        };
        if before.as_ref().is_some_and(|b| !b.is_textblock())
            && joinable(before.as_ref(), after.as_ref())
            && rpos
                .node(d)
                .can_replace(index, index + 1, &Fragment::empty())
        {
            return Some(pos);
        }
        if d == 0 {
            return None;
        }
        pos = match dir {
            Direction::Backward => rpos.before(d).ok()?,
            Direction::Forward => rpos.after(d).ok()?,
        };
        d -= 1;
    }
}

/// Build a step that replaces `from..to` with `slice`, adjusting the structure when a plain
/// replace would not fit. `Ok(None)` when nothing needs to happen or no fitting step exists.
pub fn replace_step(doc: &Node, from: usize, to: usize, slice: &Slice) -> Result<Option<Step>> {
    if from == to && slice.size() == 0 {
        return Ok(None);
    }
    let rfrom = doc.resolve(from)?;
    let rto = doc.resolve(to)?;
    let plain = Step::from(ReplaceStep::new(from, to, slice.clone()));
    if fits_trivially(&rfrom, &rto, slice) || plain.apply(doc).is_ok() {
        return Ok(Some(plain));
    }
    if slice.size() > 0 {
        return Ok(None);
    }
    if let Some(step) = move_inline_through(doc, &rfrom, &rto) {
        return Ok(Some(step));
    }
    Ok(fill_deleted(doc, &rfrom, &rto))
}

fn fits_trivially(from: &ResolvedPos, to: &ResolvedPos, slice: &Slice) -> bool {
    slice.open_start() == 0
        && slice.open_end() == 0
        && from.start(from.depth()) == to.start(to.depth())
        && from.parent().can_replace(
            from.index(from.depth()),
            to.index(to.depth()),
            slice.content(),
        )
}

/// Deleting from one textblock into another at a different depth: keep the inline content
/// after `to` and move it into the textblock at `from`, closing whatever lies between.
fn move_inline_through(doc: &Node, from: &ResolvedPos, to: &ResolvedPos) -> Option<Step> {
    if !from.parent().inline_content() || !to.parent().inline_content() || from.same_parent(to) {
        return None;
    }
    let mut depth = to.depth();
    let mut after = to.after(depth).ok()?;
    while depth > 1 && after == to.end(depth - 1) {
        depth -= 1;
        after += 1;
    }
    let rafter = doc.resolve(after).ok()?;
    let shared = from.shared_depth(after);
    if shared >= from.depth() {
        return None;
    }

    let mut left = Fragment::empty();
    for d in (shared + 1..=from.depth()).rev() {
        left = Fragment::from(from.node(d).copy(left));
    }
    let mut right = Fragment::empty();
    for d in (shared + 1..=rafter.depth()).rev() {
        right = Fragment::from(rafter.node(d).copy(right));
    }
    let slice = Slice::new(
        left.append(&right),
        from.depth() - shared,
        rafter.depth() - shared,
    );
    let step = Step::from(ReplaceAroundStep::new(
        from.pos(),
        after,
        to.pos(),
        to.end(to.depth()),
        slice,
        0,
    ));
    step.apply(doc).ok().map(|_| step)
}

/// Deleting whole nodes from a parent whose content would become invalid: fill in the
/// required nodes instead.
fn fill_deleted(doc: &Node, from: &ResolvedPos, to: &ResolvedPos) -> Option<Step> {
    if from.depth() != to.depth() || !from.same_parent(to) {
        return None;
    }
    let parent = from.parent();
    let start = parent.content_match_at(from.index(from.depth()))?;
    let fill = start.fill_before(parent.content(), true, to.index(to.depth()))?;
    if fill.size() == 0 {
        return None;
    }
    let step = Step::from(ReplaceStep::new(from.pos(), to.pos(), Slice::closed(fill)));
    step.apply(doc).ok().map(|_| step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    #[test]
    fn test_lift_target() {
        let d = doc!(blockquote!(p!("a"), p!("b"))).node;
        let from = d.resolve(2).unwrap();
        let range = from.block_range(&from, None).unwrap();
        assert_eq!(lift_target(&range), Some(0));

        let plain = doc!(p!("a")).node;
        let from = plain.resolve(1).unwrap();
        let range = from.block_range(&from, None).unwrap();
        assert_eq!(lift_target(&range), None);
    }

    #[test]
    fn test_find_wrapping_for_list() {
        let d = doc!(p!("a")).node;
        let from = d.resolve(1).unwrap();
        let range = from.block_range(&from, None).unwrap();
        let list = schema().node_type("bullet_list").unwrap();
        let wrappers = find_wrapping(&range, &list, None, None).unwrap();
        let names: Vec<&str> = wrappers.iter().map(|w| w.ty.name()).collect();
        assert_eq!(names, vec!["bullet_list", "list_item"]);
    }

    #[test]
    fn test_can_split_and_join() {
        let d = doc!(p!("ab"), p!("cd")).node;
        assert!(can_split(&d, 2, 1, &[]));
        assert!(!can_split(&d, 2, 2, &[]));
        assert!(can_join(&d, 4));
        assert!(!can_join(&d, 2));
        let lists = doc!(ul!(li!(p!("a"))), ul!(li!(p!("b")))).node;
        assert_eq!(join_point(&lists, 3, Direction::Backward), None);
        assert_eq!(join_point(&lists, 7, Direction::Forward), Some(7));
    }

    #[test]
    fn test_replace_step_moves_inline_content() {
        let d = doc!(p!("one"), blockquote!(p!("two"))).node;
        let step = replace_step(&d, 3, 8, &Slice::empty()).unwrap().unwrap();
        let result = step.apply(&d).unwrap();
        assert_eq!(result, doc!(p!("onwo")).node);
    }

    #[test]
    fn test_replace_step_fills_required_content() {
        let d = doc!(p!("a")).node;
        let step = replace_step(&d, 0, 3, &Slice::empty()).unwrap().unwrap();
        let result = step.apply(&d).unwrap();
        assert_eq!(result, doc!(p!()).node);
    }
}
