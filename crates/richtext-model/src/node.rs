use std::fmt;
use std::sync::Arc;

use crate::content::ContentMatch;
use crate::error::{ModelError, Result};
use crate::fragment::Fragment;
use crate::mark::Mark;
use crate::replace;
use crate::resolved::ResolvedPos;
use crate::schema::{AttrValue, Attrs, MarkType, NodeType};
use crate::slice::Slice;

struct NodeInner {
    ty: NodeType,
    attrs: Attrs,
    content: Fragment,
    marks: Vec<Mark>,
    text: Option<TextValue>,
}

struct TextValue {
    value: String,
    /// Length in chars.
    len: usize,
}

/// An immutable document node. Cloning is cheap (reference counted).
#[derive(Clone)]
pub struct Node(Arc<NodeInner>);

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
            || (self.same_markup(other)
                && self.text() == other.text()
                && self.0.content == other.0.content)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for mark in self.0.marks.iter().rev() {
            write!(f, "{:?}(", mark)?;
        }
        if let Some(text) = self.text() {
            write!(f, "{:?}", text)?;
        } else {
            write!(f, "{}", self.0.ty.name())?;
            let shown: Vec<String> = self
                .0
                .attrs
                .iter()
                .filter(|(k, v)| {
                    self.0
                        .ty
                        .default_attrs()
                        .and_then(|d| d.get(*k))
                        .is_none_or(|default| default != *v)
                })
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            if !shown.is_empty() {
                write!(f, "[{}]", shown.join(" "))?;
            }
            if self.0.content.size() > 0 {
                write!(f, "(")?;
                self.0.content.fmt_inner(f)?;
                write!(f, ")")?;
            }
        }
        for _ in &self.0.marks {
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl Node {
    pub(crate) fn new(ty: NodeType, attrs: Attrs, content: Fragment, marks: Vec<Mark>) -> Node {
        Node(Arc::new(NodeInner {
            ty,
            attrs,
            content,
            marks,
            text: None,
        }))
    }

    pub(crate) fn new_text(ty: NodeType, text: String, marks: Vec<Mark>) -> Node {
        let len = text.chars().count();
        Node(Arc::new(NodeInner {
            ty,
            attrs: Attrs::new(),
            content: Fragment::empty(),
            marks,
            text: Some(TextValue { value: text, len }),
        }))
    }

    /// The node's type.
    pub fn node_type(&self) -> &NodeType {
        &self.0.ty
    }

    /// The node's attributes.
    pub fn attrs(&self) -> &Attrs {
        &self.0.attrs
    }

    /// A single attribute.
    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.0.attrs.get(name)
    }

    /// The node's children.
    pub fn content(&self) -> &Fragment {
        &self.0.content
    }

    /// Marks applied to this node.
    pub fn marks(&self) -> &[Mark] {
        &self.0.marks
    }

    /// Text of a text node.
    pub fn text(&self) -> Option<&str> {
        self.0.text.as_ref().map(|t| t.value.as_str())
    }

    /// Size in positions: text length for text, 1 for other leaves, content size plus 2
    /// otherwise.
    pub fn node_size(&self) -> usize {
        match &self.0.text {
            Some(text) => text.len,
            None if self.is_leaf() => 1,
            None => self.0.content.size() + 2,
        }
    }

    /// Size of the content.
    pub fn content_size(&self) -> usize {
        self.0.content.size()
    }

    /// Number of children.
    pub fn child_count(&self) -> usize {
        self.0.content.child_count()
    }

    /// Child at `index`. Panics when out of range.
    pub fn child(&self, index: usize) -> &Node {
        self.0.content.child(index)
    }

    /// Child at `index`, if any.
    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.0.content.maybe_child(index)
    }

    /// First child.
    pub fn first_child(&self) -> Option<&Node> {
        self.0.content.first_child()
    }

    /// Last child.
    pub fn last_child(&self) -> Option<&Node> {
        self.0.content.last_child()
    }

    /// Text node.
    pub fn is_text(&self) -> bool {
        self.0.text.is_some()
    }

    /// Block node.
    pub fn is_block(&self) -> bool {
        self.0.ty.is_block()
    }

    /// Inline node (including text).
    pub fn is_inline(&self) -> bool {
        self.0.ty.is_inline()
    }

    /// Block with inline content.
    pub fn is_textblock(&self) -> bool {
        self.0.ty.is_textblock()
    }

    /// Whether the content is inline.
    pub fn inline_content(&self) -> bool {
        self.0.ty.inline_content()
    }

    /// Node that can't have content.
    pub fn is_leaf(&self) -> bool {
        self.0.ty.is_leaf()
    }

    /// Leaf or declared atom.
    pub fn is_atom(&self) -> bool {
        self.0.ty.is_atom()
    }

    /// Same type, attributes and marks as `other`.
    pub fn same_markup(&self, other: &Node) -> bool {
        self.has_markup(&other.0.ty, Some(&other.0.attrs), Some(&other.0.marks))
    }

    /// Whether the node has the given type, attributes (defaults when `None`) and marks
    /// (none when `None`).
    pub fn has_markup(&self, ty: &NodeType, attrs: Option<&Attrs>, marks: Option<&[Mark]>) -> bool {
        let empty = Attrs::new();
        let attrs = attrs.or(ty.default_attrs()).unwrap_or(&empty);
        self.0.ty == *ty
            && self.0.attrs == *attrs
            && Mark::same_set(&self.0.marks, marks.unwrap_or(&[]))
    }

    /// Same markup, different content.
    pub fn copy(&self, content: Fragment) -> Node {
        if content == self.0.content {
            return self.clone();
        }
        Node::new(
            self.0.ty.clone(),
            self.0.attrs.clone(),
            content,
            self.0.marks.clone(),
        )
    }

    /// Same node, different marks.
    pub fn mark(&self, marks: Vec<Mark>) -> Node {
        if marks == self.0.marks {
            return self.clone();
        }
        match self.text() {
            Some(text) => Node::new_text(self.0.ty.clone(), text.to_string(), marks),
            None => Node::new(
                self.0.ty.clone(),
                self.0.attrs.clone(),
                self.0.content.clone(),
                marks,
            ),
        }
    }

    /// Text node with the same marks and different text.
    pub(crate) fn with_text(&self, text: String) -> Node {
        Node::new_text(self.0.ty.clone(), text, self.0.marks.clone())
    }

    /// The node restricted to content positions `from..to` (chars for text nodes).
    pub fn cut(&self, from: usize, to: usize) -> Node {
        if let Some(text) = &self.0.text {
            if from == 0 && to >= text.len {
                return self.clone();
            }
            let cut: String = text
                .value
                .chars()
                .skip(from)
                .take(to.saturating_sub(from))
                .collect();
            return self.with_text(cut);
        }
        if from == 0 && to >= self.content_size() {
            return self.clone();
        }
        self.copy(self.0.content.cut(from, to))
    }

    /// The content between `from` and `to` as a slice. With `include_parents`, the slice is
    /// opened all the way up to this node.
    pub fn slice(&self, from: usize, to: usize, include_parents: bool) -> Result<Slice> {
        if from == to {
            return Ok(Slice::empty());
        }
        let rfrom = self.resolve(from)?;
        let rto = self.resolve(to)?;
        let depth = if include_parents {
            0
        } else {
            rfrom.shared_depth(to)
        };
        let start = rfrom.start(depth);
        let node = rfrom.node(depth);
        let content = node.content().cut(rfrom.pos() - start, rto.pos() - start);
        Ok(Slice::new(content, rfrom.depth() - depth, rto.depth() - depth))
    }

    /// Replace `from..to` with `slice`, which must fit.
    pub fn replace(&self, from: usize, to: usize, slice: &Slice) -> Result<Node> {
        replace::replace(&self.resolve(from)?, &self.resolve(to)?, slice)
    }

    /// Node directly after `pos`.
    pub fn node_at(&self, pos: usize) -> Option<Node> {
        let mut node = self.clone();
        let mut pos = pos;
        loop {
            let (index, offset) = node.content().find_index(pos);
            let child = node.maybe_child(index)?.clone();
            if offset == pos || child.is_text() {
                return Some(child);
            }
            pos -= offset + 1;
            node = child;
        }
    }

    /// Call `f(node, pos, parent, index)` for every descendant overlapping `from..to`.
    /// Returning `false` skips the node's children.
    pub fn nodes_between(
        &self,
        from: usize,
        to: usize,
        f: &mut dyn FnMut(&Node, usize, &Node, usize) -> bool,
    ) {
        self.0.content.nodes_between(from, to, f, 0, self);
    }

    /// Call `f` for every descendant.
    pub fn descendants(&self, f: &mut dyn FnMut(&Node, usize, &Node, usize) -> bool) {
        self.nodes_between(0, self.content_size(), f);
    }

    /// All text in the node.
    pub fn text_content(&self) -> String {
        match self.text() {
            Some(text) => text.to_string(),
            None => self.text_between(0, self.content_size(), None, None),
        }
    }

    /// Text between two positions.
    pub fn text_between(
        &self,
        from: usize,
        to: usize,
        block_separator: Option<&str>,
        leaf_text: Option<&str>,
    ) -> String {
        self.0
            .content
            .text_between(from, to, block_separator, leaf_text)
    }

    /// Whether any inline node in `from..to` carries a mark of `mark_type`.
    pub fn range_has_mark(&self, from: usize, to: usize, mark_type: &MarkType) -> bool {
        let mut found = false;
        if to > from {
            self.nodes_between(from, to, &mut |node, _, _, _| {
                if mark_type.is_in_set(node.marks()).is_some() {
                    found = true;
                }
                !found
            });
        }
        found
    }

    /// Resolve `pos` into a path through the tree.
    pub fn resolve(&self, pos: usize) -> Result<ResolvedPos> {
        ResolvedPos::resolve(self, pos)
    }

    /// Content match after the first `index` children.
    pub fn content_match_at(&self, index: usize) -> Option<ContentMatch> {
        self.0
            .ty
            .content_match()
            .match_fragment_range(&self.0.content, 0, index)
    }

    /// Whether replacing children `from..to` with `replacement` keeps the content valid.
    pub fn can_replace(&self, from: usize, to: usize, replacement: &Fragment) -> bool {
        self.can_replace_range(from, to, replacement, 0, replacement.child_count())
    }

    /// Like [`Node::can_replace`], using only `replacement` children `start..end`.
    pub fn can_replace_range(
        &self,
        from: usize,
        to: usize,
        replacement: &Fragment,
        start: usize,
        end: usize,
    ) -> bool {
        let Some(one) = self
            .content_match_at(from)
            .and_then(|m| m.match_fragment_range(replacement, start, end))
        else {
            return false;
        };
        let Some(two) = one.match_fragment_range(&self.0.content, to, self.child_count()) else {
            return false;
        };
        two.valid_end()
            && replacement
                .iter()
                .take(end)
                .skip(start)
                .all(|child| self.0.ty.allows_marks(child.marks()))
    }

    /// Whether children `from..to` can be replaced by a single node of type `ty`.
    pub fn can_replace_with(
        &self,
        from: usize,
        to: usize,
        ty: &NodeType,
        marks: Option<&[Mark]>,
    ) -> bool {
        if let Some(marks) = marks
            && !self.0.ty.allows_marks(marks)
        {
            return false;
        }
        self.content_match_at(from)
            .and_then(|m| m.match_type(ty))
            .and_then(|m| m.match_fragment_range(&self.0.content, to, self.child_count()))
            .is_some_and(|m| m.valid_end())
    }

    /// Whether `other`'s content may be appended to this node's content.
    pub fn can_append(&self, other: &Node) -> bool {
        if other.content_size() > 0 {
            self.can_replace(self.child_count(), self.child_count(), other.content())
        } else {
            self.0.ty.compatible_content(&other.0.ty)
        }
    }

    /// Validate the node and its descendants against the schema.
    pub fn check(&self) -> Result<()> {
        if let Some(text) = &self.0.text
            && text.len == 0
        {
            return Err(ModelError::EmptyText);
        }
        self.0.ty.check_content(&self.0.content)?;
        self.0.ty.compute_attrs(Some(&self.0.attrs))?;
        let mut set = Vec::new();
        for mark in &self.0.marks {
            set = mark.add_to_set(&set);
        }
        if !Mark::same_set(&set, &self.0.marks) {
            return Err(ModelError::InvalidContent(format!(
                "invalid collection of marks for node {}",
                self.0.ty.name()
            )));
        }
        for child in self.0.content.iter() {
            child.check()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::*;

    #[test]
    fn test_node_size_and_text() {
        let d = doc!(p!("héllo"), p!(em!("x"), "y")).node;
        assert_eq!(d.content_size(), 7 + 4);
        assert_eq!(d.text_content(), "hélloxy");
        assert_eq!(d.text_between(0, d.content_size(), Some("|"), None), "héllo|xy");
    }

    #[test]
    fn test_node_at() {
        let d = doc!(blockquote!(p!("ab")), p!("c")).node;
        assert_eq!(d.node_at(0).unwrap().node_type().name(), "blockquote");
        assert_eq!(d.node_at(1).unwrap().node_type().name(), "paragraph");
        assert_eq!(d.node_at(2).unwrap().text(), Some("ab"));
        assert_eq!(d.node_at(3).unwrap().text(), Some("ab"));
        assert_eq!(d.node_at(6).unwrap().node_type().name(), "paragraph");
    }

    #[test]
    fn test_slice_and_replace() {
        let d = doc!(p!("hello"), p!("world")).node;
        let slice = d.slice(3, 10, false).unwrap();
        assert_eq!(slice.open_start(), 1);
        assert_eq!(slice.open_end(), 1);
        let joined = d.replace(3, 10, &crate::Slice::empty()).unwrap();
        assert_eq!(joined, doc!(p!("herld")).node);
    }

    #[test]
    fn test_range_has_mark_and_check() {
        let d = doc!(p!("a", strong!("b"), "c")).node;
        let strong = schema().mark_type("strong").unwrap();
        assert!(d.range_has_mark(1, 3, &strong));
        assert!(!d.range_has_mark(1, 2, &strong));
        assert!(d.check().is_ok());
    }
}
