//! Editor State
//!
//! An [`EditorState`] is an immutable snapshot: a document, a selection, and the marks
//! that the next typed text will receive. Commands read a state and plan a
//! [`Transaction`]; [`EditorState::apply`] turns the plan into the next state. The old
//! state is never modified, so states can be kept, compared, and shared across threads.
//!
//! # Example
//!
//! ```rust
//! use richtext_commands::{EditorState, Selection};
//! use richtext_model::{doc, p};
//!
//! let d = doc!(p!("hello<a>"));
//! let a = d.tag("a");
//! let state = EditorState::with_selection(d.node, Selection::cursor(a));
//!
//! let mut tr = state.tr();
//! tr.insert_text("!", None).unwrap();
//! let next = state.apply(tr);
//!
//! assert_eq!(next.doc().text_content(), "hello!");
//! assert_eq!(next.selection().cursor_pos(), Some(7));
//! assert_eq!(state.doc().text_content(), "hello");
//! ```

use richtext_model::{Mark, Node, Schema};

use crate::selection::Selection;
use crate::transaction::Transaction;

/// A document, a selection in it, and the stored marks for the next insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorState {
    doc: Node,
    selection: Selection,
    stored_marks: Option<Vec<Mark>>,
}

impl EditorState {
    /// A state with the selection at the start of `doc`.
    pub fn new(doc: Node) -> Self {
        let selection = Selection::at_start(&doc);
        Self::with_selection(doc, selection)
    }

    /// A state with an explicit selection.
    pub fn with_selection(doc: Node, selection: Selection) -> Self {
        Self {
            doc,
            selection,
            stored_marks: None,
        }
    }

    /// Replace the stored marks.
    pub fn with_stored_marks(mut self, marks: Option<Vec<Mark>>) -> Self {
        self.stored_marks = marks;
        self
    }

    /// The document.
    pub fn doc(&self) -> &Node {
        &self.doc
    }

    /// The selection.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Marks applied to the next inserted text, overriding the marks at the cursor.
    pub fn stored_marks(&self) -> Option<&[Mark]> {
        self.stored_marks.as_deref()
    }

    /// The document's schema.
    pub fn schema(&self) -> &Schema {
        self.doc.node_type().schema()
    }

    /// Start a transaction on this state.
    pub fn tr(&self) -> Transaction {
        Transaction::new(self)
    }

    /// The state after `tr`, which must have been started from this state.
    pub fn apply(&self, tr: Transaction) -> EditorState {
        let selection = tr.selection();
        let stored_marks = match selection.cursor_pos() {
            Some(_) => tr.stored_marks().map(<[Mark]>::to_vec),
            None => None,
        };
        log::debug!(
            "applying transaction: {} step(s), selection {:?}",
            tr.steps().len(),
            selection
        );
        EditorState {
            doc: tr.doc().clone(),
            selection,
            stored_marks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use richtext_model::testing::*;

    #[test]
    fn test_new_state_selects_start() {
        let d = doc!(p!("abc"));
        let state = EditorState::new(d.node);
        assert_eq!(state.selection(), &Selection::cursor(1));
        assert!(state.stored_marks().is_none());
    }

    #[test]
    fn test_stored_marks_dropped_for_ranges() {
        let d = doc!(p!("abc"));
        let em = schema().mark("em", None).unwrap();
        let state = EditorState::new(d.node);
        let mut tr = state.tr();
        tr.set_stored_marks(Some(vec![em]));
        tr.set_selection(Selection::text(1, 3));
        let next = state.apply(tr);
        assert!(next.stored_marks().is_none());
    }

    #[test]
    fn test_apply_keeps_old_state() {
        let d = doc!(p!("ab"), p!("cd"));
        let state = EditorState::new(d.node.clone());
        let mut tr = state.tr();
        tr.delete(2, 6).unwrap();
        let next = state.apply(tr);
        assert_eq!(state.doc(), &d.node);
        assert_eq!(next.doc(), &doc!(p!("ad")).node);
    }
}
