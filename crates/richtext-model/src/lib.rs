#![warn(missing_docs)]
//! `richtext-model` - the document model under `richtext-commands`.
//!
//! # Overview
//!
//! Documents are immutable trees of typed [`Node`]s. Every node type is declared in a
//! [`Schema`] together with a *content expression* (`"paragraph block*"`, `"inline*"`, ...)
//! that is compiled into a deterministic automaton ([`ContentMatch`]). All edits go through
//! [`Step`]s, which refuse to produce a tree that violates the schema, and are collected in a
//! [`Transform`] together with the position [`Mapping`] needed to follow positions through them.
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Transform + structure helpers              │  ← lift / wrap / split / join
//! ├─────────────────────────────────────────────┤
//! │  Steps & Mapping                            │  ← atomic, position-mapped edits
//! ├─────────────────────────────────────────────┤
//! │  ResolvedPos / NodeRange                    │  ← tree navigation
//! ├─────────────────────────────────────────────┤
//! │  Node / Fragment / Mark / Slice             │  ← persistent tree
//! ├─────────────────────────────────────────────┤
//! │  Schema / ContentMatch                      │  ← content constraints
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Positions
//!
//! Positions are flat integer offsets. Entering or leaving a non-text node counts as one
//! token, and each `char` (Unicode scalar value) of a text node counts as one token.
//!
//! # Quick Start
//!
//! ```rust
//! use richtext_model::{NodeSpec, Schema, SchemaSpec, Fragment, Transform};
//!
//! let schema = Schema::new(
//!     SchemaSpec::new()
//!         .node("doc", NodeSpec::new().content("paragraph+"))
//!         .node("paragraph", NodeSpec::new().content("text*"))
//!         .node("text", NodeSpec::new()),
//! )
//! .unwrap();
//!
//! let text = schema.text("hello", Vec::new()).unwrap();
//! let para = schema.node("paragraph", None, Fragment::from(text), Vec::new()).unwrap();
//! let doc = schema.node("doc", None, Fragment::from(para), Vec::new()).unwrap();
//!
//! let mut tr = Transform::new(doc);
//! tr.split(3, 1, &[]).unwrap();
//! assert_eq!(tr.doc().child_count(), 2);
//! ```

mod content;
mod error;
mod fragment;
mod mapping;
mod mark;
mod node;
mod replace;
mod resolved;
mod schema;
mod slice;
mod step;
mod structure;
mod transform;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use content::ContentMatch;
pub use error::{ModelError, Result, SchemaError};
pub use fragment::Fragment;
pub use mapping::{Assoc, MapResult, Mapping, StepMap};
pub use mark::Mark;
pub use node::Node;
pub use resolved::{NodeRange, ResolvedPos};
pub use schema::{
    AttrSpec, AttrValue, Attrs, MarkSpec, MarkType, NodeSpec, NodeType, Schema, SchemaSpec,
};
pub use slice::Slice;
pub use step::{AddMarkStep, RemoveMarkStep, ReplaceAroundStep, ReplaceStep, Step};
pub use structure::{
    Direction, TypeWithAttrs, can_join, can_split, find_wrapping, join_point, lift_target,
    replace_step,
};
pub use transform::Transform;
