use crate::content::ContentMatch;
use crate::error::{ModelError, Result};
use crate::fragment::Fragment;
use crate::mapping::Mapping;
use crate::mark::Mark;
use crate::node::Node;
use crate::resolved::{NodeRange, ResolvedPos};
use crate::schema::{Attrs, MarkType, NodeType};
use crate::slice::Slice;
use crate::step::{AddMarkStep, RemoveMarkStep, ReplaceAroundStep, ReplaceStep, Step};
use crate::structure::{TypeWithAttrs, can_change_type, replace_step};

/// Accumulates steps against a document, tracking intermediate documents and the combined
/// position mapping.
#[derive(Debug, Clone)]
pub struct Transform {
    doc: Node,
    docs: Vec<Node>,
    steps: Vec<Step>,
    mapping: Mapping,
}

impl Transform {
    /// Start a transform on `doc`.
    pub fn new(doc: Node) -> Self {
        Self {
            doc,
            docs: Vec::new(),
            steps: Vec::new(),
            mapping: Mapping::new(),
        }
    }

    /// The current document.
    pub fn doc(&self) -> &Node {
        &self.doc
    }

    /// The document before any step.
    pub fn before(&self) -> &Node {
        self.docs.first().unwrap_or(&self.doc)
    }

    /// Steps applied so far.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Document before each step.
    pub fn docs(&self) -> &[Node] {
        &self.docs
    }

    /// Mapping through all steps.
    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// Whether any step was applied.
    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Apply a step, failing without changes if it does not apply.
    pub fn step(&mut self, step: impl Into<Step>) -> Result<&mut Self> {
        let step = step.into();
        let doc = step.apply(&self.doc)?;
        self.docs.push(std::mem::replace(&mut self.doc, doc));
        self.mapping.append_map(step.get_map());
        self.steps.push(step);
        Ok(self)
    }

    /// Replace `from..to` with `slice`, adjusting structure where needed.
    pub fn replace(&mut self, from: usize, to: usize, slice: &Slice) -> Result<&mut Self> {
        match replace_step(&self.doc, from, to, slice)? {
            Some(step) => self.step(step),
            None if from == to && slice.size() == 0 => Ok(self),
            None => Err(ModelError::Replace(format!(
                "no valid way to replace {}..{} with {:?}",
                from, to, slice
            ))),
        }
    }

    /// Replace `from..to` with closed content.
    pub fn replace_with(
        &mut self,
        from: usize,
        to: usize,
        content: impl Into<Fragment>,
    ) -> Result<&mut Self> {
        self.replace(from, to, &Slice::closed(content.into()))
    }

    /// Delete `from..to`.
    pub fn delete(&mut self, from: usize, to: usize) -> Result<&mut Self> {
        self.replace(from, to, &Slice::empty())
    }

    /// Insert content at `pos`.
    pub fn insert(&mut self, pos: usize, content: impl Into<Fragment>) -> Result<&mut Self> {
        self.replace_with(pos, pos, content)
    }

    /// Delete `from..to`, widening the range to whole nodes when that is what the range
    /// covers.
    pub fn delete_range(&mut self, from: usize, to: usize) -> Result<&mut Self> {
        let rfrom = self.doc.resolve(from)?;
        let rto = self.doc.resolve(to)?;
        let covered = covered_depths(&rfrom, &rto);
        for (i, &depth) in covered.iter().enumerate() {
            let last = i + 1 == covered.len();
            if (last && depth == 0) || rfrom.node(depth).node_type().content_match().valid_end() {
                return self.delete(rfrom.start(depth), rto.end(depth));
            }
            if depth > 0
                && (last
                    || rfrom.node(depth - 1).can_replace(
                        rfrom.index(depth - 1),
                        rto.index_after(depth - 1),
                        &Fragment::empty(),
                    ))
            {
                return self.delete(rfrom.before(depth)?, rto.after(depth)?);
            }
        }
        for d in 1..=rfrom.depth().min(rto.depth()) {
            if from - rfrom.start(d) == rfrom.depth() - d
                && to > rfrom.end(d)
                && rto.end(d) - to != rto.depth() - d
                && rfrom.start(d - 1) == rto.start(d - 1)
                && rfrom.node(d - 1).can_replace(
                    rfrom.index(d - 1),
                    rto.index(d - 1),
                    &Fragment::empty(),
                )
            {
                return self.delete(rfrom.before(d)?, to);
            }
        }
        self.delete(from, to)
    }

    /// Move the content of `range` out of its parent to depth `target`.
    pub fn lift(&mut self, range: &NodeRange, target: usize) -> Result<&mut Self> {
        let (from, to, depth) = (range.from(), range.to(), range.depth());
        let gap_start = from.before(depth + 1)?;
        let gap_end = to.after(depth + 1)?;
        let (mut start, mut end) = (gap_start, gap_end);

        let mut before = Fragment::empty();
        let mut open_start = 0;
        let mut splitting = false;
        for d in (target + 1..=depth).rev() {
            if splitting || from.index(d) > 0 {
                splitting = true;
                before = Fragment::from(from.node(d).copy(before));
                open_start += 1;
            } else {
                start -= 1;
            }
        }
        let mut after = Fragment::empty();
        let mut open_end = 0;
        splitting = false;
        for d in (target + 1..=depth).rev() {
            if splitting || to.after(d + 1)? < to.end(d) {
                splitting = true;
                after = Fragment::from(to.node(d).copy(after));
                open_end += 1;
            } else {
                end += 1;
            }
        }

        let insert = before.size() - open_start;
        self.step(ReplaceAroundStep::structural(
            start,
            end,
            gap_start,
            gap_end,
            Slice::new(before.append(&after), open_start, open_end),
            insert,
        ))
    }

    /// Wrap `range` in the given wrappers, outermost first.
    pub fn wrap(&mut self, range: &NodeRange, wrappers: &[TypeWithAttrs]) -> Result<&mut Self> {
        let mut content = Fragment::empty();
        for wrapper in wrappers.iter().rev() {
            if content.size() > 0 {
                let fits = wrapper
                    .ty
                    .content_match()
                    .match_fragment(&content)
                    .is_some_and(|m| m.valid_end());
                if !fits {
                    return Err(ModelError::Structure(
                        "wrapper type does not form valid content of its parent wrapper"
                            .to_string(),
                    ));
                }
            }
            content = Fragment::from(wrapper.ty.create(
                wrapper.attrs.as_ref(),
                content,
                Vec::new(),
            )?);
        }
        let (start, end) = (range.start(), range.end());
        self.step(ReplaceAroundStep::structural(
            start,
            end,
            start,
            end,
            Slice::closed(content),
            wrappers.len(),
        ))
    }

    /// Turn every textblock in `from..to` into a `ty` node where the parent allows it.
    pub fn set_block_type(
        &mut self,
        from: usize,
        to: usize,
        ty: &NodeType,
        attrs: Option<&Attrs>,
    ) -> Result<&mut Self> {
        if !ty.is_textblock() {
            return Err(ModelError::Structure(
                "type given to set_block_type should be a textblock".to_string(),
            ));
        }
        let map_from = self.steps.len();
        let mut targets = Vec::new();
        self.doc.nodes_between(from, to, &mut |node, pos, _, _| {
            if node.is_textblock() {
                targets.push((pos, node.clone()));
                false
            } else {
                true
            }
        });
        for (pos, node) in targets {
            if node.has_markup(ty, attrs, None) {
                continue;
            }
            let mapped = self.mapping.slice(map_from).map(pos);
            if !can_change_type(&self.doc, mapped, ty) {
                continue;
            }
            self.clear_incompatible(mapped, ty, None)?;
            let mapping = self.mapping.slice(map_from);
            let start = mapping.map(pos);
            let end = mapping.map(pos + node.node_size());
            let replacement = ty.create(attrs, Fragment::empty(), node.marks().to_vec())?;
            self.step(ReplaceAroundStep::structural(
                start,
                end,
                start + 1,
                end - 1,
                Slice::closed(Fragment::from(replacement)),
                1,
            ))?;
        }
        Ok(self)
    }

    /// Change the type, attributes and/or marks of the node at `pos`.
    pub fn set_node_markup(
        &mut self,
        pos: usize,
        ty: Option<&NodeType>,
        attrs: Option<&Attrs>,
        marks: Option<Vec<Mark>>,
    ) -> Result<&mut Self> {
        let node = self.doc.node_at(pos).ok_or(ModelError::NoNodeAt(pos))?;
        let ty = ty.cloned().unwrap_or_else(|| node.node_type().clone());
        let replacement = ty.create(
            attrs,
            Fragment::empty(),
            marks.unwrap_or_else(|| node.marks().to_vec()),
        )?;
        if node.is_leaf() {
            return self.replace_with(pos, pos + node.node_size(), replacement);
        }
        ty.check_content(node.content())?;
        self.step(ReplaceAroundStep::structural(
            pos,
            pos + node.node_size(),
            pos + 1,
            pos + node.node_size() - 1,
            Slice::closed(Fragment::from(replacement)),
            1,
        ))
    }

    /// Remove children and marks of the node at `pos` that a `parent_type` node would not
    /// allow, and fill in required content.
    pub fn clear_incompatible(
        &mut self,
        pos: usize,
        parent_type: &NodeType,
        start: Option<ContentMatch>,
    ) -> Result<&mut Self> {
        let node = self.doc.node_at(pos).ok_or(ModelError::NoNodeAt(pos))?;
        let mut matched = start.unwrap_or_else(|| parent_type.content_match());
        let mut removals = Vec::new();
        let mut cur = pos + 1;
        for child in node.content().iter() {
            let end = cur + child.node_size();
            match matched.match_type(child.node_type()) {
                None => removals.push(ReplaceStep::new(cur, end, Slice::empty())),
                Some(next) => {
                    matched = next;
                    for mark in child.marks() {
                        if !parent_type.allows_mark_type(mark.mark_type()) {
                            self.step(RemoveMarkStep::new(cur, end, mark.clone()))?;
                        }
                    }
                }
            }
            cur = end;
        }
        if !matched.valid_end()
            && let Some(fill) = matched.fill_before(&Fragment::empty(), true, 0)
        {
            self.replace(cur, cur, &Slice::closed(fill))?;
        }
        for step in removals.into_iter().rev() {
            self.step(step)?;
        }
        Ok(self)
    }

    /// Split the node at `pos` through `depth` levels. `types_after` optionally sets the
    /// types of the new nodes, outermost first.
    pub fn split(
        &mut self,
        pos: usize,
        depth: usize,
        types_after: &[Option<TypeWithAttrs>],
    ) -> Result<&mut Self> {
        let rpos = self.doc.resolve(pos)?;
        if depth == 0 || depth > rpos.depth() {
            return Err(ModelError::Structure(format!(
                "cannot split {} levels at position {}",
                depth, pos
            )));
        }
        let mut before = Fragment::empty();
        let mut after = Fragment::empty();
        for (k, d) in (rpos.depth() - depth + 1..=rpos.depth()).rev().enumerate() {
            before = Fragment::from(rpos.node(d).copy(before));
            let type_after = types_after
                .get(depth - 1 - k)
                .and_then(|t| t.as_ref());
            after = Fragment::from(match type_after {
                Some(t) => t.ty.create(t.attrs.as_ref(), after, Vec::new())?,
                None => rpos.node(d).copy(after),
            });
        }
        self.step(ReplaceStep::structural(
            pos,
            pos,
            Slice::new(before.append(&after), depth, depth),
        ))
    }

    /// Join the blocks around `pos`, `depth` levels deep.
    pub fn join(&mut self, pos: usize, depth: usize) -> Result<&mut Self> {
        let from = pos.checked_sub(depth).ok_or_else(|| {
            ModelError::Structure(format!("cannot join {} levels at position {}", depth, pos))
        })?;
        self.step(ReplaceStep::structural(from, pos + depth, Slice::empty()))
    }

    /// Add `mark` to inline content in `from..to`, replacing marks it excludes.
    pub fn add_mark(&mut self, from: usize, to: usize, mark: &Mark) -> Result<&mut Self> {
        let mut removed: Vec<RemoveMarkStep> = Vec::new();
        let mut added: Vec<AddMarkStep> = Vec::new();
        self.doc.nodes_between(from, to, &mut |node, pos, parent, _| {
            if !node.is_inline() {
                return true;
            }
            let marks = node.marks();
            if !mark.is_in_set(marks) && parent.node_type().allows_mark_type(mark.mark_type()) {
                let start = pos.max(from);
                let end = (pos + node.node_size()).min(to);
                let new_set = mark.add_to_set(marks);
                for old in marks {
                    if !old.is_in_set(&new_set) {
                        match removed.last_mut() {
                            Some(prev) if prev.to == start && prev.mark == *old => prev.to = end,
                            _ => removed.push(RemoveMarkStep::new(start, end, old.clone())),
                        }
                    }
                }
                match added.last_mut() {
                    Some(prev) if prev.to == start => prev.to = end,
                    _ => added.push(AddMarkStep::new(start, end, mark.clone())),
                }
            }
            true
        });
        for step in removed {
            self.step(step)?;
        }
        for step in added {
            self.step(step)?;
        }
        Ok(self)
    }

    /// Remove marks of `mark_type` from inline content in `from..to`.
    pub fn remove_mark(
        &mut self,
        from: usize,
        to: usize,
        mark_type: &MarkType,
    ) -> Result<&mut Self> {
        let mut matched: Vec<RemoveMarkStep> = Vec::new();
        self.doc.nodes_between(from, to, &mut |node, pos, _, _| {
            if !node.is_inline() {
                return true;
            }
            let end = (pos + node.node_size()).min(to);
            let start = pos.max(from);
            for mark in node.marks().iter().filter(|m| m.mark_type() == mark_type) {
                match matched.iter_mut().find(|m| m.mark == *mark && m.to == start) {
                    Some(found) => found.to = end,
                    None => matched.push(RemoveMarkStep::new(start, end, mark.clone())),
                }
            }
            true
        });
        for step in matched {
            self.step(step)?;
        }
        Ok(self)
    }
}

/// Depths (deepest first) whose node content is entirely covered by `from..to`.
fn covered_depths(from: &ResolvedPos, to: &ResolvedPos) -> Vec<usize> {
    let min_depth = from.depth().min(to.depth());
    let mut result = Vec::new();
    for d in (0..=min_depth).rev() {
        let start = from.start(d);
        if start < from.pos().saturating_sub(from.depth() - d)
            || to.end(d) > to.pos() + (to.depth() - d)
            || from.node(d).node_type().spec().isolating
            || to.node(d).node_type().spec().isolating
        {
            break;
        }
        if start == to.start(d)
            || (d == from.depth()
                && d == to.depth()
                && from.parent().inline_content()
                && to.parent().inline_content()
                && d > 0
                && to.start(d - 1) == start - 1)
        {
            result.push(d);
        }
    }
    result
}
