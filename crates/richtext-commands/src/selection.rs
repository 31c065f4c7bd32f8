//! Selections
//!
//! A selection is one of three shapes, matched exhaustively by every command:
//!
//! - [`Selection::Text`]: a range between two positions in inline content. When both ends
//!   are equal it is a cursor.
//! - [`Selection::Node`]: exactly one selected node.
//! - [`Selection::All`]: the whole document.
//!
//! Selections hold plain positions. Commands resolve them against the document they act
//! on, and transactions re-map them through every step they apply.
//!
//! # Example
//!
//! ```rust
//! use richtext_commands::Selection;
//! use richtext_model::{doc, p, testing::hr};
//!
//! let d = doc!(hr(), p!("text"));
//! let sel = Selection::at_start(&d.node);
//! assert_eq!(sel, Selection::Node { from: 0, to: 1 });
//!
//! let sel = Selection::at_end(&d.node);
//! assert_eq!(sel, Selection::cursor(6));
//! ```

use richtext_model::{Assoc, Direction, Mapping, Node, ResolvedPos};

/// The selected part of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selection {
    /// A text range; `anchor` stays put when the range is extended, `head` moves.
    Text {
        /// The fixed end.
        anchor: usize,
        /// The moving end.
        head: usize,
    },
    /// A selected node spanning `from..to`.
    Node {
        /// Position before the node.
        from: usize,
        /// Position after the node.
        to: usize,
    },
    /// The whole document, whose content has `size` positions.
    All {
        /// Content size of the document.
        size: usize,
    },
}

impl Selection {
    /// An empty text selection at `pos`.
    pub fn cursor(pos: usize) -> Self {
        Selection::Text {
            anchor: pos,
            head: pos,
        }
    }

    /// A text selection from `anchor` to `head`. Both must point into inline content.
    pub fn text(anchor: usize, head: usize) -> Self {
        Selection::Text { anchor, head }
    }

    /// Select the node starting at `pos`, if there is one.
    pub fn node(doc: &Node, pos: usize) -> Option<Self> {
        let node = doc.resolve(pos).ok()?.node_after()?;
        Some(Selection::Node {
            from: pos,
            to: pos + node.node_size(),
        })
    }

    /// Select the whole document.
    pub fn all(doc: &Node) -> Self {
        Selection::All {
            size: doc.content_size(),
        }
    }

    /// The fixed end of the selection.
    pub fn anchor(&self) -> usize {
        match *self {
            Selection::Text { anchor, .. } => anchor,
            Selection::Node { from, .. } => from,
            Selection::All { .. } => 0,
        }
    }

    /// The moving end of the selection.
    pub fn head(&self) -> usize {
        match *self {
            Selection::Text { head, .. } => head,
            Selection::Node { to, .. } => to,
            Selection::All { size } => size,
        }
    }

    /// The lower bound.
    pub fn from(&self) -> usize {
        self.anchor().min(self.head())
    }

    /// The upper bound.
    pub fn to(&self) -> usize {
        self.anchor().max(self.head())
    }

    /// `true` when the selection covers no content.
    pub fn is_empty(&self) -> bool {
        self.from() == self.to()
    }

    /// Position of the cursor when this is an empty text selection.
    pub fn cursor_pos(&self) -> Option<usize> {
        match *self {
            Selection::Text { anchor, head } if anchor == head => Some(head),
            _ => None,
        }
    }

    /// The selected node of a node selection.
    pub fn selected_node(&self, doc: &Node) -> Option<Node> {
        match *self {
            Selection::Node { from, .. } => doc.node_at(from),
            _ => None,
        }
    }

    /// Resolve both bounds against `doc`.
    pub fn resolve_range(&self, doc: &Node) -> Option<(ResolvedPos, ResolvedPos)> {
        Some((doc.resolve(self.from()).ok()?, doc.resolve(self.to()).ok()?))
    }

    /// Resolve the head against `doc`.
    pub fn resolve_head(&self, doc: &Node) -> Option<ResolvedPos> {
        doc.resolve(self.head()).ok()
    }

    /// Resolve the anchor against `doc`.
    pub fn resolve_anchor(&self, doc: &Node) -> Option<ResolvedPos> {
        doc.resolve(self.anchor()).ok()
    }

    /// Resolve the cursor position when this is an empty text selection.
    pub fn resolve_cursor(&self, doc: &Node) -> Option<ResolvedPos> {
        doc.resolve(self.cursor_pos()?).ok()
    }

    /// Whether a node selection may target `node`.
    pub fn is_selectable(node: &Node) -> bool {
        !node.is_text() && node.node_type().is_selectable()
    }

    /// A text selection between two positions, moving ends that are not in inline content
    /// to the nearest spot that is. `bias` breaks ties for empty ranges.
    pub fn between(anchor: &ResolvedPos, head: &ResolvedPos, bias: Option<Direction>) -> Self {
        let bias = match bias {
            Some(bias) if anchor.pos() == head.pos() => bias,
            _ if anchor.pos() >= head.pos() => Direction::Forward,
            _ => Direction::Backward,
        };
        let mut head_pos = head.pos();
        if !head.parent().inline_content() {
            match Selection::find_from(head, bias, true)
                .or_else(|| Selection::find_from(head, bias.reverse(), true))
            {
                Some(found) => head_pos = found.head(),
                None => return Selection::near(head, bias),
            }
        }
        let mut anchor_pos = anchor.pos();
        if !anchor.parent().inline_content() {
            if anchor.pos() == head.pos() {
                anchor_pos = head_pos;
            } else {
                anchor_pos = Selection::find_from(anchor, bias.reverse(), true)
                    .or_else(|| Selection::find_from(anchor, bias, true))
                    .map_or(head_pos, |found| found.anchor());
                if (anchor_pos < head_pos) != (anchor.pos() < head.pos()) {
                    anchor_pos = head_pos;
                }
            }
        }
        Selection::text(anchor_pos, head_pos)
    }

    /// The first valid selection starting at `pos` and looking in `dir`, entering and
    /// leaving ancestors as needed. With `text_only`, node selections are skipped.
    pub fn find_from(pos: &ResolvedPos, dir: Direction, text_only: bool) -> Option<Self> {
        if pos.parent().inline_content() {
            return Some(Selection::cursor(pos.pos()));
        }
        let depth = pos.depth();
        if let Some(found) =
            find_selection_in(pos.parent(), pos.pos(), pos.index(depth), dir, text_only)
        {
            return Some(found);
        }
        for d in (0..depth).rev() {
            let found = match dir {
                Direction::Backward => find_selection_in(
                    pos.node(d),
                    pos.before(d + 1).ok()?,
                    pos.index(d),
                    dir,
                    text_only,
                ),
                Direction::Forward => find_selection_in(
                    pos.node(d),
                    pos.after(d + 1).ok()?,
                    pos.index(d) + 1,
                    dir,
                    text_only,
                ),
            };
            if found.is_some() {
                return found;
            }
        }
        None
    }

    /// The valid selection nearest to `pos`, preferring `bias`. Falls back to selecting the
    /// whole document.
    pub fn near(pos: &ResolvedPos, bias: Direction) -> Self {
        Selection::find_from(pos, bias, false)
            .or_else(|| Selection::find_from(pos, bias.reverse(), false))
            .unwrap_or_else(|| Selection::all(pos.doc()))
    }

    /// The first valid selection in `doc`.
    pub fn at_start(doc: &Node) -> Self {
        find_selection_in(doc, 0, 0, Direction::Forward, false)
            .unwrap_or_else(|| Selection::all(doc))
    }

    /// The last valid selection in `doc`.
    pub fn at_end(doc: &Node) -> Self {
        find_selection_in(
            doc,
            doc.content_size(),
            doc.child_count(),
            Direction::Backward,
            false,
        )
        .unwrap_or_else(|| Selection::all(doc))
    }

    /// Map the selection through `mapping` onto `doc`, the document the mapping produces.
    pub fn map(&self, doc: &Node, mapping: &Mapping) -> Self {
        match *self {
            Selection::Text { anchor, head } => {
                let head = mapping.map(head);
                let Ok(rhead) = doc.resolve(head) else {
                    return Selection::at_start(doc);
                };
                if !rhead.parent().inline_content() {
                    return Selection::near(&rhead, Direction::Forward);
                }
                let anchor = mapping.map(anchor);
                let anchor_inline = doc
                    .resolve(anchor)
                    .is_ok_and(|ranchor| ranchor.parent().inline_content());
                Selection::text(if anchor_inline { anchor } else { head }, head)
            }
            Selection::Node { from, .. } => {
                let result = mapping.map_result(from, Assoc::Right);
                let Ok(rpos) = doc.resolve(result.pos) else {
                    return Selection::at_start(doc);
                };
                if result.deleted() {
                    return Selection::near(&rpos, Direction::Forward);
                }
                match rpos.node_after() {
                    Some(node) => Selection::Node {
                        from: result.pos,
                        to: result.pos + node.node_size(),
                    },
                    None => Selection::near(&rpos, Direction::Forward),
                }
            }
            Selection::All { .. } => Selection::all(doc),
        }
    }
}

/// Search `node`'s children from `index` in `dir` for a place to put a selection. `pos`
/// is the position at the edge of child `index` facing the search.
fn find_selection_in(
    node: &Node,
    pos: usize,
    index: usize,
    dir: Direction,
    text_only: bool,
) -> Option<Selection> {
    if node.inline_content() {
        return Some(Selection::cursor(pos));
    }
    let mut pos = pos;
    match dir {
        Direction::Forward => {
            for child in node.content().iter().skip(index) {
                if !child.is_atom() {
                    if let Some(inner) = find_selection_in(child, pos + 1, 0, dir, text_only) {
                        return Some(inner);
                    }
                } else if !text_only && Selection::is_selectable(child) {
                    return Some(Selection::Node {
                        from: pos,
                        to: pos + child.node_size(),
                    });
                }
                pos += child.node_size();
            }
        }
        Direction::Backward => {
            for child in node.content().iter().take(index).rev() {
                if !child.is_atom() {
                    let inner = find_selection_in(
                        child,
                        pos.saturating_sub(1),
                        child.child_count(),
                        dir,
                        text_only,
                    );
                    if inner.is_some() {
                        return inner;
                    }
                } else if !text_only && Selection::is_selectable(child) {
                    return Some(Selection::Node {
                        from: pos.saturating_sub(child.node_size()),
                        to: pos,
                    });
                }
                pos = pos.saturating_sub(child.node_size());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use richtext_model::testing::*;
    use richtext_model::{Slice, Transform};

    #[test]
    fn test_find_from_skips_into_nested_blocks() {
        let d = doc!(p!("ab"), blockquote!(p!("<a>cd")));
        let rpos = d.node.resolve(4).unwrap();
        let found = Selection::find_from(&rpos, Direction::Forward, false).unwrap();
        assert_eq!(found, Selection::cursor(d.tag("a")));
        let back = Selection::find_from(&rpos, Direction::Backward, false).unwrap();
        assert_eq!(back, Selection::cursor(3));
    }

    #[test]
    fn test_near_prefers_selectable_leaf() {
        let d = doc!(p!("x"), hr(), p!("y"));
        let rpos = d.node.resolve(3).unwrap();
        assert_eq!(
            Selection::near(&rpos, Direction::Forward),
            Selection::Node { from: 3, to: 4 }
        );
    }

    #[test]
    fn test_text_only_skips_nodes() {
        let d = doc!(hr(), p!("y"));
        let rpos = d.node.resolve(0).unwrap();
        assert_eq!(
            Selection::find_from(&rpos, Direction::Forward, true),
            Some(Selection::cursor(2))
        );
    }

    #[test]
    fn test_between_moves_ends_into_text() {
        let d = doc!(p!("ab"), p!("cd"));
        let anchor = d.node.resolve(0).unwrap();
        let head = d.node.resolve(8).unwrap();
        assert_eq!(
            Selection::between(&anchor, &head, None),
            Selection::text(1, 7)
        );
    }

    #[test]
    fn test_map_text_selection_through_insert() {
        let d = doc!(p!("a<a>b"));
        let sel = Selection::cursor(d.tag("a"));
        let mut tr = Transform::new(d.node.clone());
        tr.insert(1, schema().text("xy", Vec::new()).unwrap()).unwrap();
        assert_eq!(sel.map(tr.doc(), tr.mapping()), Selection::cursor(4));
    }

    #[test]
    fn test_map_deleted_node_selection_falls_back() {
        let d = doc!(p!("a"), hr(), p!("b"));
        let sel = Selection::node(&d.node, 3).unwrap();
        let mut tr = Transform::new(d.node.clone());
        tr.replace(3, 4, &Slice::empty()).unwrap();
        assert_eq!(sel.map(tr.doc(), tr.mapping()), Selection::cursor(4));
    }

    #[test]
    fn test_empty_doc_bounds() {
        let d = doc!(p!());
        assert_eq!(Selection::at_start(&d.node), Selection::cursor(1));
        assert_eq!(Selection::at_end(&d.node), Selection::cursor(1));
        assert!(Selection::all(&d.node).cursor_pos().is_none());
    }
}
