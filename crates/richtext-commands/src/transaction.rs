//! Transactions
//!
//! A [`Transaction`] is a [`Transform`] plus the editor-level state that travels with it:
//! the selection, the stored marks and a scroll request. It dereferences to its transform,
//! so every transform builder (`split`, `lift`, `join`, ...) is available directly.
//!
//! The selection is mapped lazily: after steps are added, [`Transaction::selection`]
//! returns the last explicitly set selection mapped through the steps added since. Stored
//! marks are cleared by any new step and by setting a selection.

use std::ops::{Deref, DerefMut};

use richtext_model::{
    Direction, Mark, MarkType, Node, Result as ModelResult, Step, Transform,
};

use crate::selection::Selection;
use crate::state::EditorState;

/// A planned change to an [`EditorState`].
#[derive(Debug, Clone)]
pub struct Transaction {
    transform: Transform,
    selection: Selection,
    selection_for: usize,
    selection_set: bool,
    stored_marks: Option<Vec<Mark>>,
    stored_marks_for: usize,
    stored_marks_set: bool,
    scroll_into_view: bool,
}

impl Deref for Transaction {
    type Target = Transform;

    fn deref(&self) -> &Transform {
        &self.transform
    }
}

impl DerefMut for Transaction {
    fn deref_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }
}

impl Transaction {
    pub(crate) fn new(state: &EditorState) -> Self {
        Self {
            transform: Transform::new(state.doc().clone()),
            selection: *state.selection(),
            selection_for: 0,
            selection_set: false,
            stored_marks: state.stored_marks().map(<[Mark]>::to_vec),
            stored_marks_for: 0,
            stored_marks_set: false,
            scroll_into_view: false,
        }
    }

    /// The selection, mapped through the steps added since it was set.
    pub fn selection(&self) -> Selection {
        let steps = self.transform.steps().len();
        if self.selection_for < steps {
            self.selection.map(
                self.transform.doc(),
                &self.transform.mapping().slice(self.selection_for),
            )
        } else {
            self.selection
        }
    }

    /// Replace the selection. Clears the stored marks.
    pub fn set_selection(&mut self, selection: Selection) -> &mut Self {
        self.selection = selection;
        self.selection_for = self.transform.steps().len();
        self.selection_set = true;
        self.stored_marks = None;
        self.stored_marks_set = false;
        self
    }

    /// Whether the selection was set explicitly.
    pub fn selection_set(&self) -> bool {
        self.selection_set
    }

    /// Stored marks, unless a step was added since they were set.
    pub fn stored_marks(&self) -> Option<&[Mark]> {
        if self.stored_marks_for == self.transform.steps().len() {
            self.stored_marks.as_deref()
        } else {
            None
        }
    }

    /// Set the stored marks.
    pub fn set_stored_marks(&mut self, marks: Option<Vec<Mark>>) -> &mut Self {
        self.stored_marks = marks;
        self.stored_marks_for = self.transform.steps().len();
        self.stored_marks_set = true;
        self
    }

    /// Whether the stored marks were set explicitly.
    pub fn stored_marks_set(&self) -> bool {
        self.stored_marks_set
    }

    /// Make `marks` the active marks, storing them only if they differ from what is
    /// already active at the selection.
    pub fn ensure_marks(&mut self, marks: Vec<Mark>) -> &mut Self {
        let current = match self.stored_marks() {
            Some(stored) => stored.to_vec(),
            None => self.marks_at(self.selection().from()),
        };
        if !Mark::same_set(&current, &marks) {
            self.set_stored_marks(Some(marks));
        }
        self
    }

    /// Add `mark` to the active marks.
    pub fn add_stored_mark(&mut self, mark: &Mark) -> &mut Self {
        let current = self.active_marks_at_head();
        self.ensure_marks(mark.add_to_set(&current))
    }

    /// Remove marks of `mark_type` from the active marks.
    pub fn remove_stored_mark(&mut self, mark_type: &MarkType) -> &mut Self {
        let current = self.active_marks_at_head();
        self.ensure_marks(mark_type.remove_from_set(&current))
    }

    fn active_marks_at_head(&self) -> Vec<Mark> {
        match self.stored_marks() {
            Some(stored) => stored.to_vec(),
            None => self.marks_at(self.selection().head()),
        }
    }

    fn marks_at(&self, pos: usize) -> Vec<Mark> {
        self.transform
            .doc()
            .resolve(pos)
            .map(|rpos| rpos.marks())
            .unwrap_or_default()
    }

    /// Ask the host to scroll the selection into view after applying.
    pub fn scroll_into_view(&mut self) -> &mut Self {
        self.scroll_into_view = true;
        self
    }

    /// Whether [`Transaction::scroll_into_view`] was called.
    pub fn scrolled_into_view(&self) -> bool {
        self.scroll_into_view
    }

    /// Delete the selected content. Deleting a text range keeps the marks that were active
    /// across it as stored marks.
    pub fn delete_selection(&mut self) -> ModelResult<&mut Self> {
        let selection = self.selection();
        match selection {
            Selection::All { .. } => {
                let size = self.transform.doc().content_size();
                self.transform.delete(0, size)?;
                let start = Selection::at_start(self.transform.doc());
                if start != self.selection() {
                    self.set_selection(start);
                }
            }
            Selection::Text { .. } | Selection::Node { .. } => {
                let (from, to) = (selection.from(), selection.to());
                let across = match selection {
                    Selection::Text { .. } => {
                        let rfrom = self.transform.doc().resolve(from)?;
                        let rto = self.transform.doc().resolve(to)?;
                        rfrom.marks_across(&rto)
                    }
                    _ => None,
                };
                let map_from = self.transform.steps().len();
                self.transform.delete_range(from, to)?;
                self.selection_to_insertion_end(map_from, Direction::Forward);
                if let Some(marks) = across {
                    self.ensure_marks(marks);
                }
            }
        }
        Ok(self)
    }

    /// Replace the selection with `node`. With `inherit_marks`, the node takes the stored
    /// marks or the marks active at the selection.
    pub fn replace_selection_with(
        &mut self,
        node: Node,
        inherit_marks: bool,
    ) -> ModelResult<&mut Self> {
        let selection = self.selection();
        let (from, to) = (selection.from(), selection.to());
        let node = if inherit_marks {
            let marks = match self.stored_marks() {
                Some(stored) => stored.to_vec(),
                None => {
                    let rfrom = self.transform.doc().resolve(from)?;
                    if from == to {
                        rfrom.marks()
                    } else {
                        let rto = self.transform.doc().resolve(to)?;
                        rfrom.marks_across(&rto).unwrap_or_default()
                    }
                }
            };
            node.mark(marks)
        } else {
            node
        };
        let bias = if node.is_inline() {
            Direction::Backward
        } else {
            Direction::Forward
        };
        let map_from = self.transform.steps().len();
        if from < to {
            self.transform.delete_range(from, to)?;
        }
        let at = self.transform.mapping().slice(map_from).map(from);
        self.transform.insert(at, node)?;
        self.selection_to_insertion_end(map_from, bias);
        Ok(self)
    }

    /// Insert `text`. Without a range the selection is replaced and the text takes the
    /// active marks; with a range `from..to` is replaced and the selection kept. Empty
    /// text deletes.
    pub fn insert_text(
        &mut self,
        text: &str,
        range: Option<(usize, usize)>,
    ) -> ModelResult<&mut Self> {
        let schema = self.transform.doc().node_type().schema().clone();
        let Some((from, to)) = range else {
            if text.is_empty() {
                return self.delete_selection();
            }
            return self.replace_selection_with(schema.text(text, Vec::new())?, true);
        };
        if text.is_empty() {
            self.transform.delete_range(from, to)?;
            return Ok(self);
        }
        let marks = match self.stored_marks() {
            Some(stored) => stored.to_vec(),
            None => {
                let rfrom = self.transform.doc().resolve(from)?;
                if from == to {
                    rfrom.marks()
                } else {
                    let rto = self.transform.doc().resolve(to)?;
                    rfrom.marks_across(&rto).unwrap_or_default()
                }
            }
        };
        let node = schema.text(text, marks)?;
        if from < to {
            self.transform.delete(from, to)?;
        }
        self.transform.insert(from, node)?;
        let selection = self.selection();
        if !selection.is_empty()
            && let Ok(rto) = self.transform.doc().resolve(selection.to())
        {
            self.set_selection(Selection::near(&rto, Direction::Forward));
        }
        Ok(self)
    }

    /// Put the cursor at the end of what the last replace step inserted.
    fn selection_to_insertion_end(&mut self, start_len: usize, bias: Direction) {
        let last = self.transform.steps().len();
        if last <= start_len {
            return;
        }
        if !matches!(
            self.transform.steps()[last - 1],
            Step::Replace(_) | Step::ReplaceAround(_)
        ) {
            return;
        }
        let mut end = None;
        self.transform.mapping().maps()[last - 1].for_each(|_, _, _, new_end| {
            end.get_or_insert(new_end);
        });
        if let Some(end) = end
            && let Ok(rend) = self.transform.doc().resolve(end)
        {
            let selection = Selection::near(&rend, bias);
            self.set_selection(selection);
        }
    }
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

    #[test]
    fn test_selection_maps_lazily() {
        let d = doc!(p!("ab<a>c"));
        let mut tr = state(&d).tr();
        tr.delete(1, 2).unwrap();
        assert_eq!(tr.selection(), Selection::cursor(2));
    }

    #[test]
    fn test_delete_selection_keeps_marks_across() {
        let d = doc!(p!("a", em!("<a>bc<b>"), "d"));
        let mut tr = state(&d).tr();
        tr.delete_selection().unwrap();
        assert_eq!(tr.doc(), &doc!(p!("ad")).node);
        assert_eq!(tr.selection(), Selection::cursor(2));
        let em = schema().mark("em", None).unwrap();
        assert_eq!(tr.stored_marks(), Some(&[em][..]));
    }

    #[test]
    fn test_delete_all() {
        let d = doc!(p!("a"), p!("b"));
        let mut tr = EditorState::with_selection(d.node.clone(), Selection::all(&d.node)).tr();
        tr.delete_selection().unwrap();
        assert_eq!(tr.doc(), &doc!(p!()).node);
        assert_eq!(tr.selection(), Selection::cursor(1));
    }

    #[test]
    fn test_insert_text_inherits_marks() {
        let d = doc!(p!(strong!("ab<a>")));
        let mut tr = state(&d).tr();
        tr.insert_text("c", None).unwrap();
        assert_eq!(tr.doc(), &doc!(p!(strong!("abc"))).node);
        assert_eq!(tr.selection(), Selection::cursor(4));
    }

    #[test]
    fn test_insert_text_over_range() {
        let d = doc!(p!("one <a>two<b>"));
        let mut tr = state(&d).tr();
        tr.insert_text("2", None).unwrap();
        assert_eq!(tr.doc(), &doc!(p!("one 2")).node);
        assert_eq!(tr.selection(), Selection::cursor(6));
    }

    #[test]
    fn test_step_clears_stored_marks() {
        let d = doc!(p!("ab<a>"));
        let em = schema().mark("em", None).unwrap();
        let mut tr = state(&d).tr();
        tr.add_stored_mark(&em);
        assert!(tr.stored_marks().is_some());
        tr.insert_text("x", Some((1, 1))).unwrap();
        assert!(tr.stored_marks().is_none());
    }
}
