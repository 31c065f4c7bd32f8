#![warn(missing_docs)]
//! `richtext-commands` - structural editing commands for schema-constrained rich text.
//!
//! # Overview
//!
//! A command looks at an [`EditorState`] (a document, a [`Selection`] and stored marks)
//! and decides whether an editing action applies. When it does, it plans exactly one
//! [`Transaction`]: the steps that change the document plus where the selection ends up.
//! The caller applies the transaction to get the next state. States are immutable, so a
//! command that does not apply leaves no trace, and probing a command is the same call
//! as running it.
//!
//! Every edit goes through the schema of [`richtext_model`]. Commands check content
//! constraints before they build steps, so they never produce a document the schema
//! rejects.
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Keymap (chords → chained commands)         │  ← host entry point
//! ├─────────────────────────────────────────────┤
//! │  Combinators (chain, auto-join, factories)  │  ← composition
//! ├─────────────────────────────────────────────┤
//! │  Primitive commands                         │  ← join / split / lift / wrap / marks
//! ├─────────────────────────────────────────────┤
//! │  Structural merge (delete barrier)          │  ← cross-block joins
//! ├─────────────────────────────────────────────┤
//! │  EditorState / Transaction / Selection      │  ← snapshots and plans
//! ├─────────────────────────────────────────────┤
//! │  richtext-model (schema, steps, mapping)    │  ← document model
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use richtext_commands::{EditorState, Selection, commands, chain_commands, Command};
//! use richtext_model::{blockquote, doc, p};
//!
//! let d = doc!(p!("hi"), blockquote!(p!("<a>there")));
//! let a = d.tag("a");
//! let state = EditorState::with_selection(d.node, Selection::cursor(a));
//!
//! let backspace = chain_commands(vec![
//!     Command::new("delete_selection", commands::delete_selection),
//!     Command::new("join_backward", commands::join_backward),
//! ]);
//!
//! // Probing does not change anything.
//! assert!(backspace.probe(&state, None));
//!
//! let next = backspace.run(&state, None).unwrap();
//! assert_eq!(next.doc(), &doc!(p!("hi"), p!("there")).node);
//! ```
//!
//! # Module Description
//!
//! - [`commands`] - the primitive commands and command factories
//! - [`text_unit`] - grapheme and word boundaries used by character and word deletion
//! - [`Keymap`] - default key bindings and configurable extensions
//! - [`delete_barrier`] - the merge used by `join_backward` and `join_forward`

mod command;
pub mod commands;
mod keymap;
mod merge;
mod selection;
mod state;
pub mod text_unit;
mod transaction;

pub use command::{Command, CommandFn, LayoutOracle, auto_join, auto_join_types, chain_commands};
pub use keymap::{Keymap, KeymapConfig, KeymapError, Platform, command_by_name, normalize_key};
pub use merge::delete_barrier;
pub use selection::Selection;
pub use state::EditorState;
pub use text_unit::{CharClass, TextUnit};
pub use transaction::Transaction;

pub use richtext_model;
