//! Command Interface
//!
//! A [`Command`] checks an [`EditorState`] and either reports that it does not apply
//! (`None`) or plans exactly one [`Transaction`]. Checking is pure: the same state always
//! yields the same answer, and nothing changes until the caller hands the transaction to
//! [`EditorState::apply`].
//!
//! - [`Command::check`] plans the transaction.
//! - [`Command::probe`] only asks whether the command applies.
//! - [`Command::run`] plans and applies in one go.
//!
//! Commands that need to know whether the caret sits visually at the edge of a textblock
//! (soft-wrapped lines share one block) accept an optional [`LayoutOracle`]. Without one
//! they fall back to the structural answer.
//!
//! # Example
//!
//! ```rust
//! use richtext_commands::{Command, EditorState, Selection, chain_commands, commands};
//! use richtext_model::{doc, p};
//!
//! let d = doc!(p!("hi"), p!("<a>there"));
//! let a = d.tag("a");
//! let state = EditorState::with_selection(d.node, Selection::cursor(a));
//!
//! let backspace = chain_commands(vec![
//!     Command::new("delete_selection", commands::delete_selection),
//!     Command::new("join_backward", commands::join_backward),
//! ]);
//! assert!(backspace.probe(&state, None));
//!
//! let next = backspace.run(&state, None).unwrap();
//! assert_eq!(next.doc().child_count(), 1);
//! ```

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use richtext_model::{Direction, Node, can_join};

use crate::state::EditorState;
use crate::transaction::Transaction;

/// View-level layout queries a host may supply.
pub trait LayoutOracle {
    /// Whether the cursor in `state` is at the visual start (`Backward`) or end (`Forward`)
    /// of its textblock.
    fn end_of_textblock(&self, dir: Direction, state: &EditorState) -> bool;
}

/// The function type behind a [`Command`].
pub type CommandFn =
    dyn Fn(&EditorState, Option<&dyn LayoutOracle>) -> Option<Transaction> + Send + Sync;

/// A named, shareable editing command.
#[derive(Clone)]
pub struct Command {
    name: Cow<'static, str>,
    check: Arc<CommandFn>,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Command").field(&self.name).finish()
    }
}

impl Command {
    /// Wrap a check function.
    pub fn new<F>(name: impl Into<Cow<'static, str>>, check: F) -> Self
    where
        F: Fn(&EditorState, Option<&dyn LayoutOracle>) -> Option<Transaction>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    /// The command's name, used in logs and keymap configuration.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Plan the command's transaction, or `None` when it does not apply.
    pub fn check(
        &self,
        state: &EditorState,
        view: Option<&dyn LayoutOracle>,
    ) -> Option<Transaction> {
        let planned = (self.check)(state, view);
        log::trace!(
            "command {} {}",
            self.name,
            if planned.is_some() { "applies" } else { "does not apply" }
        );
        planned
    }

    /// Whether the command applies to `state`.
    pub fn probe(&self, state: &EditorState, view: Option<&dyn LayoutOracle>) -> bool {
        self.check(state, view).is_some()
    }

    /// Plan and apply the command, returning the next state.
    pub fn run(&self, state: &EditorState, view: Option<&dyn LayoutOracle>) -> Option<EditorState> {
        let tr = self.check(state, view)?;
        log::debug!("dispatching {}", self.name);
        Some(state.apply(tr))
    }
}

/// A command that tries `commands` in order and uses the first that applies. Later
/// commands are not consulted once one applies.
pub fn chain_commands(commands: Vec<Command>) -> Command {
    let name = commands
        .iter()
        .map(Command::name)
        .collect::<Vec<_>>()
        .join(" | ");
    Command::new(name, move |state, view| {
        commands.iter().find_map(|command| command.check(state, view))
    })
}

/// Wrap `command` so that, when its transaction changes the document, sibling nodes of
/// the same type that became adjacent inside the changed ranges and satisfy `is_joinable`
/// are joined.
pub fn auto_join<F>(command: Command, is_joinable: F) -> Command
where
    F: Fn(&Node, &Node) -> bool + Send + Sync + 'static,
{
    let name = format!("auto_join({})", command.name());
    Command::new(name, move |state, view| {
        let mut tr = command.check(state, view)?;
        if tr.doc_changed() {
            join_adjacent(&mut tr, &is_joinable);
        }
        Some(tr)
    })
}

/// [`auto_join`] with a list of joinable node type names.
pub fn auto_join_types(command: Command, types: &[&str]) -> Command {
    let types: Vec<String> = types.iter().map(|name| name.to_string()).collect();
    auto_join(command, move |before, _| {
        types.iter().any(|name| name == before.node_type().name())
    })
}

fn join_adjacent(tr: &mut Transaction, is_joinable: &dyn Fn(&Node, &Node) -> bool) {
    let mut ranges: Vec<usize> = Vec::new();
    for map in tr.mapping().maps() {
        for pos in ranges.iter_mut() {
            *pos = map.map(*pos);
        }
        map.for_each(|_, _, from, to| ranges.extend([from, to]));
    }

    let mut joinable: Vec<usize> = Vec::new();
    for pair in ranges.chunks(2) {
        let [from, to] = *pair else { continue };
        let Ok(rfrom) = tr.doc().resolve(from) else {
            continue;
        };
        let depth = rfrom.shared_depth(to);
        let parent = rfrom.node(depth);
        let Ok(mut pos) = rfrom.after(depth + 1) else {
            continue;
        };
        let mut index = rfrom.index_after(depth);
        while pos <= to {
            let Some(after) = parent.maybe_child(index) else {
                break;
            };
            if index > 0 && !joinable.contains(&pos) {
                let before = parent.child(index - 1);
                if before.node_type() == after.node_type() && is_joinable(before, after) {
                    joinable.push(pos);
                }
            }
            pos += after.node_size();
            index += 1;
        }
    }

    joinable.sort_unstable();
    for &pos in joinable.iter().rev() {
        if can_join(tr.doc(), pos)
            && let Err(err) = tr.join(pos, 1)
        {
            log::warn!("auto-join at {} failed: {}", pos, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::Selection;
    use richtext_model::testing::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(applies: bool, calls: Arc<AtomicUsize>) -> Command {
        Command::new("counting", move |state, _| {
            calls.fetch_add(1, Ordering::SeqCst);
            applies.then(|| state.tr())
        })
    }

    #[test]
    fn test_chain_stops_at_first_applicable() {
        let state = EditorState::new(doc!(p!("a")).node);
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let chain = chain_commands(vec![
            counting(true, first.clone()),
            counting(true, second.clone()),
        ]);
        assert!(chain.probe(&state, None));
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_chain_falls_through() {
        let state = EditorState::new(doc!(p!("a")).node);
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let chain = chain_commands(vec![
            counting(false, first.clone()),
            counting(false, second.clone()),
        ]);
        assert!(!chain.probe(&state, None));
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(chain.name(), "counting | counting");
    }

    #[test]
    fn test_auto_join_merges_new_neighbours() {
        let d = doc!(ul!(li!(p!("a"))), p!("<a>b"), ul!(li!(p!("c"))));
        let a = d.tag("a");
        let state = EditorState::with_selection(d.node, Selection::cursor(a));
        let list = schema().node_type("bullet_list").unwrap();
        let wrap = auto_join_types(crate::commands::wrap_in(&list, None), &["bullet_list"]);
        let next = wrap.run(&state, None).unwrap();
        assert_eq!(
            next.doc(),
            &doc!(ul!(li!(p!("a")), li!(p!("b")), li!(p!("c")))).node
        );
    }
}
