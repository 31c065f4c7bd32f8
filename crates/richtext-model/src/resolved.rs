use std::fmt;

use crate::error::{ModelError, Result};
use crate::mark::Mark;
use crate::node::Node;

#[derive(Clone)]
struct PathEntry {
    node: Node,
    index: usize,
    /// Absolute position of the start of the child at `index`.
    offset: usize,
}

/// A position resolved against a document: the chain of ancestors from the root down to the
/// innermost node whose content contains the position.
///
/// Depth 0 is the document itself; [`ResolvedPos::parent`] is the node at
/// [`ResolvedPos::depth`].
#[derive(Clone)]
pub struct ResolvedPos {
    pos: usize,
    path: Vec<PathEntry>,
    parent_offset: usize,
}

impl fmt::Debug for ResolvedPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut path = String::new();
        for d in 1..=self.depth() {
            if !path.is_empty() {
                path.push('/');
            }
            path.push_str(&format!(
                "{}_{}",
                self.node(d).node_type().name(),
                self.index(d - 1)
            ));
        }
        write!(f, "{}:{}", path, self.parent_offset)
    }
}

impl PartialEq for ResolvedPos {
    fn eq(&self, other: &Self) -> bool {
        self.pos == other.pos && self.doc() == other.doc()
    }
}

impl ResolvedPos {
    pub(crate) fn resolve(doc: &Node, pos: usize) -> Result<ResolvedPos> {
        if pos > doc.content_size() {
            return Err(ModelError::PositionOutOfRange {
                pos,
                size: doc.content_size(),
            });
        }
        let mut path = Vec::new();
        let mut start = 0;
        let mut parent_offset = pos;
        let mut node = doc.clone();
        loop {
            let (index, offset) = node.content().find_index(parent_offset);
            let rem = parent_offset - offset;
            path.push(PathEntry {
                node: node.clone(),
                index,
                offset: start + offset,
            });
            if rem == 0 {
                break;
            }
            let child = node.child(index).clone();
            if child.is_text() {
                break;
            }
            parent_offset = rem - 1;
            start += offset + 1;
            node = child;
        }
        Ok(ResolvedPos {
            pos,
            path,
            parent_offset,
        })
    }

    /// The absolute position.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Depth of the innermost containing node.
    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    /// Offset within the parent's content.
    pub fn parent_offset(&self) -> usize {
        self.parent_offset
    }

    /// The innermost node whose content contains the position.
    pub fn parent(&self) -> &Node {
        self.node(self.depth())
    }

    /// The root document.
    pub fn doc(&self) -> &Node {
        self.node(0)
    }

    /// Ancestor at depth `depth`.
    pub fn node(&self, depth: usize) -> &Node {
        &self.path[depth].node
    }

    /// Index into the ancestor at `depth`.
    pub fn index(&self, depth: usize) -> usize {
        self.path[depth].index
    }

    /// Index pointing after this position into the ancestor at `depth`.
    pub fn index_after(&self, depth: usize) -> usize {
        let index = self.index(depth);
        if depth == self.depth() && self.text_offset() == 0 {
            index
        } else {
            index + 1
        }
    }

    /// Start position of the ancestor at `depth`'s content.
    pub fn start(&self, depth: usize) -> usize {
        if depth == 0 {
            0
        } else {
            self.path[depth - 1].offset + 1
        }
    }

    /// End position of the ancestor at `depth`'s content.
    pub fn end(&self, depth: usize) -> usize {
        self.start(depth) + self.node(depth).content_size()
    }

    /// Position directly before the ancestor at `depth` (`1..=depth + 1`; `depth + 1` is the
    /// position itself).
    pub fn before(&self, depth: usize) -> Result<usize> {
        if depth == 0 {
            return Err(ModelError::Structure(
                "there is no position before the top-level node".to_string(),
            ));
        }
        Ok(if depth == self.depth() + 1 {
            self.pos
        } else {
            self.path[depth - 1].offset
        })
    }

    /// Position directly after the ancestor at `depth` (`1..=depth + 1`).
    pub fn after(&self, depth: usize) -> Result<usize> {
        if depth == 0 {
            return Err(ModelError::Structure(
                "there is no position after the top-level node".to_string(),
            ));
        }
        Ok(if depth == self.depth() + 1 {
            self.pos
        } else {
            self.path[depth - 1].offset + self.node(depth).node_size()
        })
    }

    /// Offset into the text node the position points into, 0 between nodes.
    pub fn text_offset(&self) -> usize {
        self.pos - self.path[self.depth()].offset
    }

    /// Node directly after the position (a partial text node when inside text).
    pub fn node_after(&self) -> Option<Node> {
        let parent = self.parent();
        let index = self.index(self.depth());
        let child = parent.maybe_child(index)?;
        let offset = self.text_offset();
        if offset > 0 {
            Some(child.cut(offset, child.node_size()))
        } else {
            Some(child.clone())
        }
    }

    /// Node directly before the position.
    pub fn node_before(&self) -> Option<Node> {
        let index = self.index(self.depth());
        let offset = self.text_offset();
        if offset > 0 {
            return Some(self.parent().child(index).cut(0, offset));
        }
        if index == 0 {
            None
        } else {
            Some(self.parent().child(index - 1).clone())
        }
    }

    /// Position of child `index` of the ancestor at `depth`.
    pub fn pos_at_index(&self, index: usize, depth: usize) -> usize {
        let node = self.node(depth);
        let mut pos = self.start(depth);
        for i in 0..index.min(node.child_count()) {
            pos += node.child(i).node_size();
        }
        pos
    }

    /// Marks that apply to content inserted here.
    pub fn marks(&self) -> Vec<Mark> {
        let parent = self.parent();
        let index = self.index(self.depth());
        if parent.content_size() == 0 {
            return Vec::new();
        }
        if self.text_offset() > 0 {
            return parent.child(index).marks().to_vec();
        }
        let mut main = index.checked_sub(1).and_then(|i| parent.maybe_child(i));
        let mut other = parent.maybe_child(index);
        if main.is_none() {
            std::mem::swap(&mut main, &mut other);
        }
        let Some(main) = main else {
            return Vec::new();
        };
        let mut marks = main.marks().to_vec();
        for mark in main.marks() {
            let inclusive = mark.mark_type().is_inclusive();
            if !inclusive && other.is_none_or(|o| !mark.is_in_set(o.marks())) {
                marks = mark.remove_from_set(&marks);
            }
        }
        marks
    }

    /// Marks to preserve after deleting from here to `end`, or `None` when `end` is not in
    /// inline content.
    pub fn marks_across(&self, end: &ResolvedPos) -> Option<Vec<Mark>> {
        let after = self.parent().maybe_child(self.index(self.depth()))?;
        if !after.is_inline() {
            return None;
        }
        let next = end.parent().maybe_child(end.index(end.depth()));
        let mut marks = after.marks().to_vec();
        for mark in after.marks() {
            if !mark.mark_type().is_inclusive() && next.is_none_or(|n| !mark.is_in_set(n.marks())) {
                marks = mark.remove_from_set(&marks);
            }
        }
        Some(marks)
    }

    /// Deepest depth at which this position and `pos` share an ancestor.
    pub fn shared_depth(&self, pos: usize) -> usize {
        for depth in (1..=self.depth()).rev() {
            if self.start(depth) <= pos && self.end(depth) >= pos {
                return depth;
            }
        }
        0
    }

    /// Range of blocks around this position and `other`, optionally restricted to parents
    /// accepted by `pred`.
    pub fn block_range(
        &self,
        other: &ResolvedPos,
        pred: Option<&dyn Fn(&Node) -> bool>,
    ) -> Option<NodeRange> {
        if other.pos < self.pos {
            return other.block_range(self, pred);
        }
        let inline_extra = usize::from(self.parent().inline_content() || self.pos == other.pos);
        let start = self.depth().checked_sub(inline_extra)?;
        (0..=start)
            .rev()
            .find(|&d| other.pos <= self.end(d) && pred.is_none_or(|p| p(self.node(d))))
            .map(|d| NodeRange::new(self.clone(), other.clone(), d))
    }

    /// Whether both positions share a parent node.
    pub fn same_parent(&self, other: &ResolvedPos) -> bool {
        self.pos - self.parent_offset == other.pos - other.parent_offset
    }
}

/// A flat range of sibling nodes: the children of the node at `depth` between two positions.
#[derive(Clone, Debug)]
pub struct NodeRange {
    from: ResolvedPos,
    to: ResolvedPos,
    depth: usize,
}

impl NodeRange {
    /// Construct a range. `from` and `to` must share the ancestor at `depth`.
    pub fn new(from: ResolvedPos, to: ResolvedPos, depth: usize) -> Self {
        Self { from, to, depth }
    }

    /// Position the range starts at (inside its first node).
    pub fn from(&self) -> &ResolvedPos {
        &self.from
    }

    /// Position the range ends at.
    pub fn to(&self) -> &ResolvedPos {
        &self.to
    }

    /// Depth of the parent node.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Position before the first node.
    pub fn start(&self) -> usize {
        self.from
            .before(self.depth + 1)
            .unwrap_or_else(|_| self.from.pos())
    }

    /// Position after the last node.
    pub fn end(&self) -> usize {
        self.to.after(self.depth + 1).unwrap_or_else(|_| self.to.pos())
    }

    /// The parent node.
    pub fn parent(&self) -> &Node {
        self.from.node(self.depth)
    }

    /// Index of the first node in the parent.
    pub fn start_index(&self) -> usize {
        self.from.index(self.depth)
    }

    /// Index after the last node in the parent.
    pub fn end_index(&self) -> usize {
        self.to.index_after(self.depth)
    }
}
