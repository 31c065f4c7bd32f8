//! Atomic document changes.

use crate::error::{ModelError, Result};
use crate::fragment::Fragment;
use crate::mapping::StepMap;
use crate::mark::Mark;
use crate::node::Node;
use crate::slice::Slice;

/// A single, invertible-by-map edit of a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Replace a range with a slice.
    Replace(ReplaceStep),
    /// Replace a range, keeping an inner gap and moving it into the slice.
    ReplaceAround(ReplaceAroundStep),
    /// Add a mark to inline content in a range.
    AddMark(AddMarkStep),
    /// Remove a mark from inline content in a range.
    RemoveMark(RemoveMarkStep),
}

impl Step {
    /// Apply the step, failing when the result would violate the schema.
    pub fn apply(&self, doc: &Node) -> Result<Node> {
        match self {
            Step::Replace(step) => step.apply(doc),
            Step::ReplaceAround(step) => step.apply(doc),
            Step::AddMark(step) => step.apply(doc),
            Step::RemoveMark(step) => step.apply(doc),
        }
    }

    /// Position map describing the step.
    pub fn get_map(&self) -> StepMap {
        match self {
            Step::Replace(step) => StepMap::new(vec![(
                step.from,
                step.to - step.from,
                step.slice.size(),
            )]),
            Step::ReplaceAround(step) => StepMap::new(vec![
                (step.from, step.gap_from - step.from, step.insert),
                (
                    step.gap_to,
                    step.to - step.gap_to,
                    step.slice.size().saturating_sub(step.insert),
                ),
            ]),
            Step::AddMark(_) | Step::RemoveMark(_) => StepMap::empty(),
        }
    }
}

impl From<ReplaceStep> for Step {
    fn from(step: ReplaceStep) -> Self {
        Step::Replace(step)
    }
}

impl From<ReplaceAroundStep> for Step {
    fn from(step: ReplaceAroundStep) -> Self {
        Step::ReplaceAround(step)
    }
}

impl From<AddMarkStep> for Step {
    fn from(step: AddMarkStep) -> Self {
        Step::AddMark(step)
    }
}

impl From<RemoveMarkStep> for Step {
    fn from(step: RemoveMarkStep) -> Self {
        Step::RemoveMark(step)
    }
}

fn from_replace(doc: &Node, from: usize, to: usize, slice: &Slice) -> Result<Node> {
    doc.replace(from, to, slice)
        .map_err(|err| ModelError::Step(err.to_string()))
}

/// Replace `from..to` with a slice.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceStep {
    /// Start of the replaced range.
    pub from: usize,
    /// End of the replaced range.
    pub to: usize,
    /// Inserted content.
    pub slice: Slice,
    /// Structural steps may only remove node boundaries, never content.
    pub structure: bool,
}

impl ReplaceStep {
    /// A content replacement.
    pub fn new(from: usize, to: usize, slice: Slice) -> Self {
        Self {
            from,
            to,
            slice,
            structure: false,
        }
    }

    /// A replacement that only moves node boundaries.
    pub fn structural(from: usize, to: usize, slice: Slice) -> Self {
        Self {
            from,
            to,
            slice,
            structure: true,
        }
    }

    fn apply(&self, doc: &Node) -> Result<Node> {
        if self.structure && content_between(doc, self.from, self.to) {
            return Err(ModelError::Step(
                "structure replace would overwrite content".to_string(),
            ));
        }
        from_replace(doc, self.from, self.to, &self.slice)
    }
}

/// Replace `from..to` with a slice while keeping `gap_from..gap_to` and inserting it into
/// the slice at `insert`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceAroundStep {
    /// Start of the replaced range.
    pub from: usize,
    /// End of the replaced range.
    pub to: usize,
    /// Start of the kept gap.
    pub gap_from: usize,
    /// End of the kept gap.
    pub gap_to: usize,
    /// Content wrapped around the gap.
    pub slice: Slice,
    /// Offset into the slice where the gap goes.
    pub insert: usize,
    /// Structural steps may only move node boundaries, never content.
    pub structure: bool,
}

impl ReplaceAroundStep {
    /// A gap replacement.
    pub fn new(
        from: usize,
        to: usize,
        gap_from: usize,
        gap_to: usize,
        slice: Slice,
        insert: usize,
    ) -> Self {
        Self {
            from,
            to,
            gap_from,
            gap_to,
            slice,
            insert,
            structure: false,
        }
    }

    /// A gap replacement that only moves node boundaries.
    pub fn structural(
        from: usize,
        to: usize,
        gap_from: usize,
        gap_to: usize,
        slice: Slice,
        insert: usize,
    ) -> Self {
        Self {
            structure: true,
            ..Self::new(from, to, gap_from, gap_to, slice, insert)
        }
    }

    fn apply(&self, doc: &Node) -> Result<Node> {
        if self.structure
            && (content_between(doc, self.from, self.gap_from)
                || content_between(doc, self.gap_to, self.to))
        {
            return Err(ModelError::Step(
                "structure gap-replace would overwrite content".to_string(),
            ));
        }
        let gap = doc.slice(self.gap_from, self.gap_to, false)?;
        if gap.open_start() > 0 || gap.open_end() > 0 {
            return Err(ModelError::Step("gap is not a flat range".to_string()));
        }
        let inserted = self
            .slice
            .insert_at(self.insert, gap.content())
            .ok_or_else(|| ModelError::Step("content does not fit in gap".to_string()))?;
        from_replace(doc, self.from, self.to, &inserted)
    }
}

/// Add a mark to all inline content in a range.
#[derive(Debug, Clone, PartialEq)]
pub struct AddMarkStep {
    /// Range start.
    pub from: usize,
    /// Range end.
    pub to: usize,
    /// The mark.
    pub mark: Mark,
}

impl AddMarkStep {
    /// Create the step.
    pub fn new(from: usize, to: usize, mark: Mark) -> Self {
        Self { from, to, mark }
    }

    fn apply(&self, doc: &Node) -> Result<Node> {
        let old = doc.slice(self.from, self.to, false)?;
        let rfrom = doc.resolve(self.from)?;
        let parent = rfrom.node(rfrom.shared_depth(self.to));
        let content = map_fragment(
            old.content(),
            &|node, parent| {
                if !node.is_atom() || !parent.node_type().allows_mark_type(self.mark.mark_type()) {
                    node.clone()
                } else {
                    node.mark(self.mark.add_to_set(node.marks()))
                }
            },
            parent,
        );
        let slice = Slice::new(content, old.open_start(), old.open_end());
        from_replace(doc, self.from, self.to, &slice)
    }
}

/// Remove a mark from all inline content in a range.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoveMarkStep {
    /// Range start.
    pub from: usize,
    /// Range end.
    pub to: usize,
    /// The mark.
    pub mark: Mark,
}

impl RemoveMarkStep {
    /// Create the step.
    pub fn new(from: usize, to: usize, mark: Mark) -> Self {
        Self { from, to, mark }
    }

    fn apply(&self, doc: &Node) -> Result<Node> {
        let old = doc.slice(self.from, self.to, false)?;
        let content = map_fragment(
            old.content(),
            &|node, _| node.mark(self.mark.remove_from_set(node.marks())),
            doc,
        );
        let slice = Slice::new(content, old.open_start(), old.open_end());
        from_replace(doc, self.from, self.to, &slice)
    }
}

fn map_fragment(fragment: &Fragment, f: &dyn Fn(&Node, &Node) -> Node, parent: &Node) -> Fragment {
    let mut mapped = Vec::with_capacity(fragment.child_count());
    for child in fragment.iter() {
        let mut child = child.clone();
        if child.content_size() > 0 {
            child = child.copy(map_fragment(child.content(), f, &child));
        }
        if child.is_inline() {
            child = f(&child, parent);
        }
        mapped.push(child);
    }
    Fragment::from_vec(mapped)
}

/// Whether `from..to` contains anything besides node boundaries.
pub(crate) fn content_between(doc: &Node, from: usize, to: usize) -> bool {
    let Ok(rfrom) = doc.resolve(from) else {
        return true;
    };
    let mut dist = to.saturating_sub(from);
    let mut depth = rfrom.depth();
    while dist > 0 && depth > 0 && rfrom.index_after(depth) == rfrom.node(depth).child_count() {
        depth -= 1;
        dist -= 1;
    }
    if dist > 0 {
        let mut next = rfrom
            .node(depth)
            .maybe_child(rfrom.index_after(depth))
            .cloned();
        while dist > 0 {
            match next {
                Some(node) if !node.is_leaf() => next = node.first_child().cloned(),
                _ => return true,
            }
            dist -= 1;
        }
    }
    false
}
