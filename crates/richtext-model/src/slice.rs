use std::fmt;

use crate::fragment::Fragment;
use crate::node::Node;

/// A piece of a document: a fragment plus how many levels are open at either side.
///
/// An open start of 2 means the first node and its first child are cut off at the left, so
/// their content continues whatever is to the left of an insertion point.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Slice {
    content: Fragment,
    open_start: usize,
    open_end: usize,
}

impl fmt::Debug for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({},{})", self.content, self.open_start, self.open_end)
    }
}

impl Slice {
    /// Create a slice.
    pub fn new(content: Fragment, open_start: usize, open_end: usize) -> Self {
        Self {
            content,
            open_start,
            open_end,
        }
    }

    /// The empty slice.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A closed slice around `fragment`.
    pub fn closed(content: Fragment) -> Self {
        Self::new(content, 0, 0)
    }

    /// Slice content.
    pub fn content(&self) -> &Fragment {
        &self.content
    }

    /// Open depth at the start.
    pub fn open_start(&self) -> usize {
        self.open_start
    }

    /// Open depth at the end.
    pub fn open_end(&self) -> usize {
        self.open_end
    }

    /// Number of positions the slice adds when inserted.
    pub fn size(&self) -> usize {
        self.content
            .size()
            .saturating_sub(self.open_start + self.open_end)
    }

    /// Insert `fragment` at `pos` (relative to the slice's open start). `None` if the
    /// insertion is not valid content.
    pub fn insert_at(&self, pos: usize, fragment: &Fragment) -> Option<Slice> {
        let content = insert_into(&self.content, pos + self.open_start, fragment, None)?;
        Some(Slice::new(content, self.open_start, self.open_end))
    }

    /// The slice that opens `fragment` as deeply as possible on both sides.
    pub fn max_open(fragment: Fragment, open_isolating: bool) -> Slice {
        let opens = |n: &Node| !n.is_leaf() && (open_isolating || !n.node_type().is_isolating());
        let mut open_start = 0;
        let mut node = fragment.first_child();
        while let Some(n) = node.filter(|n| opens(n)) {
            open_start += 1;
            node = n.first_child();
        }
        let mut open_end = 0;
        let mut node = fragment.last_child();
        while let Some(n) = node.filter(|n| opens(n)) {
            open_end += 1;
            node = n.last_child();
        }
        Slice::new(fragment, open_start, open_end)
    }
}

fn insert_into(
    content: &Fragment,
    dist: usize,
    insert: &Fragment,
    parent: Option<&Node>,
) -> Option<Fragment> {
    let (index, offset) = content.find_index(dist);
    let child = content.maybe_child(index);
    if offset == dist || child.is_some_and(|c| c.is_text()) {
        if let Some(parent) = parent
            && !parent.can_replace(index, index, insert)
        {
            return None;
        }
        return Some(
            content
                .cut(0, dist)
                .append(insert)
                .append(&content.cut_from(dist)),
        );
    }
    let child = child?;
    let inner = insert_into(child.content(), dist - offset - 1, insert, Some(child))?;
    Some(content.replace_child(index, child.copy(inner)))
}
