use std::fmt;

use crate::node::Node;

/// An ordered, immutable sequence of child nodes with a cached size.
///
/// Adjacent text nodes with identical marks are always merged, so two fragments with the
/// same content compare equal.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Fragment {
    nodes: Vec<Node>,
    size: usize,
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<")?;
        self.fmt_inner(f)?;
        write!(f, ">")
    }
}

impl From<Node> for Fragment {
    fn from(node: Node) -> Self {
        let size = node.node_size();
        Fragment {
            nodes: vec![node],
            size,
        }
    }
}

impl From<Vec<Node>> for Fragment {
    fn from(nodes: Vec<Node>) -> Self {
        Fragment::from_vec(nodes)
    }
}

impl Fragment {
    /// The empty fragment.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a fragment, merging adjacent text nodes that share marks.
    pub fn from_vec(nodes: Vec<Node>) -> Self {
        let mut joined: Vec<Node> = Vec::with_capacity(nodes.len());
        let mut size = 0;
        for node in nodes {
            size += node.node_size();
            if let Some(last) = joined.last_mut()
                && node.is_text()
                && node.same_markup(last)
            {
                let text = format!("{}{}", last.text().unwrap_or(""), node.text().unwrap_or(""));
                *last = last.with_text(text);
                continue;
            }
            joined.push(node);
        }
        Fragment {
            nodes: joined,
            size,
        }
    }

    pub(crate) fn fmt_inner(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, child) in self.nodes.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}", child)?;
        }
        Ok(())
    }

    /// Total size of the children, in positions.
    pub fn size(&self) -> usize {
        self.size
    }

    /// `true` when the fragment has no children.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of children.
    pub fn child_count(&self) -> usize {
        self.nodes.len()
    }

    /// Child at `index`. Panics when out of range; use [`Fragment::maybe_child`] otherwise.
    pub fn child(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    /// Child at `index`, if any.
    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    /// First child.
    pub fn first_child(&self) -> Option<&Node> {
        self.nodes.first()
    }

    /// Last child.
    pub fn last_child(&self) -> Option<&Node> {
        self.nodes.last()
    }

    /// Iterate over the children.
    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    /// Concatenate two fragments, merging text at the seam.
    pub fn append(&self, other: &Fragment) -> Fragment {
        if other.size == 0 && other.is_empty() {
            return self.clone();
        }
        if self.size == 0 && self.is_empty() {
            return other.clone();
        }
        let mut nodes = self.nodes.clone();
        nodes.extend(other.nodes.iter().cloned());
        Fragment::from_vec(nodes)
    }

    /// The part of the fragment between positions `from` and `to`.
    pub fn cut(&self, from: usize, to: usize) -> Fragment {
        if from == 0 && to >= self.size {
            return self.clone();
        }
        let mut result = Vec::new();
        if to > from {
            let mut pos = 0;
            for child in &self.nodes {
                if pos >= to {
                    break;
                }
                let end = pos + child.node_size();
                if end > from {
                    let piece = if pos < from || end > to {
                        if child.is_text() {
                            child.cut(from.saturating_sub(pos), (to - pos).min(child.node_size()))
                        } else {
                            child.cut(
                                from.saturating_sub(pos + 1),
                                (to.saturating_sub(pos + 1)).min(child.content_size()),
                            )
                        }
                    } else {
                        child.clone()
                    };
                    result.push(piece);
                }
                pos = end;
            }
        }
        Fragment::from_vec(result)
    }

    /// The part of the fragment from `from` to its end.
    pub fn cut_from(&self, from: usize) -> Fragment {
        self.cut(from, self.size)
    }

    /// Children `from..to` by index.
    pub fn cut_by_index(&self, from: usize, to: usize) -> Fragment {
        if from == to {
            return Fragment::empty();
        }
        if from == 0 && to == self.nodes.len() {
            return self.clone();
        }
        Fragment::from_vec(self.nodes[from..to].to_vec())
    }

    /// Copy with the child at `index` replaced.
    pub fn replace_child(&self, index: usize, node: Node) -> Fragment {
        if self.nodes.get(index) == Some(&node) {
            return self.clone();
        }
        let mut nodes = self.nodes.clone();
        nodes[index] = node;
        Fragment::from_vec(nodes)
    }

    /// Copy with `node` prepended.
    pub fn add_to_start(&self, node: Node) -> Fragment {
        Fragment::from(node).append(self)
    }

    /// Copy with `node` appended.
    pub fn add_to_end(&self, node: Node) -> Fragment {
        self.append(&Fragment::from(node))
    }

    /// Index of the child at or containing `pos`, and that child's start offset. Positions
    /// at or past the end map to `(child_count, size)`.
    pub fn find_index(&self, pos: usize) -> (usize, usize) {
        if pos == 0 {
            return (0, 0);
        }
        if pos >= self.size {
            return (self.nodes.len(), self.size);
        }
        let mut cur = 0;
        for (i, child) in self.nodes.iter().enumerate() {
            let end = cur + child.node_size();
            if end > pos {
                return (i, cur);
            }
            cur = end;
        }
        (self.nodes.len(), self.size)
    }

    /// Call `f(node, pos, parent, index)` for every descendant overlapping `from..to`.
    /// Returning `false` skips the node's children.
    pub(crate) fn nodes_between(
        &self,
        from: usize,
        to: usize,
        f: &mut dyn FnMut(&Node, usize, &Node, usize) -> bool,
        node_start: usize,
        parent: &Node,
    ) {
        let mut pos = 0;
        for (i, child) in self.nodes.iter().enumerate() {
            if pos >= to {
                break;
            }
            let end = pos + child.node_size();
            if end > from && f(child, node_start + pos, parent, i) && child.content_size() > 0 {
                let start = pos + 1;
                child.content().nodes_between(
                    from.saturating_sub(start),
                    child.content_size().min(to.saturating_sub(start)),
                    f,
                    node_start + start,
                    child,
                );
            }
            pos = end;
        }
    }

    /// Text between `from` and `to`, with `block_separator` between textblocks and
    /// `leaf_text` standing in for non-text leaves.
    pub fn text_between(
        &self,
        from: usize,
        to: usize,
        block_separator: Option<&str>,
        leaf_text: Option<&str>,
    ) -> String {
        let mut text = String::new();
        let mut first = true;
        let mut visit = |node: &Node, pos: usize| {
            let node_text: String = if let Some(t) = node.text() {
                let start = from.saturating_sub(pos);
                let end = to.saturating_sub(pos).min(node.node_size());
                t.chars().skip(start).take(end.saturating_sub(start)).collect()
            } else if !node.is_leaf() {
                String::new()
            } else {
                leaf_text.unwrap_or("").to_string()
            };
            if ((node.is_block() && node.is_leaf() && !node_text.is_empty()) || node.is_textblock())
                && let Some(sep) = block_separator
            {
                if first {
                    first = false;
                } else {
                    text.push_str(sep);
                }
            }
            text.push_str(&node_text);
        };
        walk_between(self, from, to, 0, &mut visit);
        text
    }
}

fn walk_between(
    fragment: &Fragment,
    from: usize,
    to: usize,
    node_start: usize,
    f: &mut dyn FnMut(&Node, usize),
) {
    let mut pos = 0;
    for child in fragment.iter() {
        if pos >= to {
            break;
        }
        let end = pos + child.node_size();
        if end > from {
            f(child, node_start + pos);
            if child.content_size() > 0 {
                let start = pos + 1;
                walk_between(
                    child.content(),
                    from.saturating_sub(start),
                    child.content_size().min(to.saturating_sub(start)),
                    node_start + start,
                    f,
                );
            }
        }
        pos = end;
    }
}

impl<'a> IntoIterator for &'a Fragment {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}
