use thiserror::Error;

/// Result alias used throughout the model crate.
pub type Result<T, E = ModelError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors produced while building, querying or editing documents.
pub enum ModelError {
    #[error("position {pos} out of range (content size {size})")]
    /// A position lies outside the node it was resolved against.
    PositionOutOfRange {
        /// The offending position.
        pos: usize,
        /// Content size of the node.
        size: usize,
    },

    #[error("index {index} out of range for fragment with {count} children")]
    /// A child index lies outside a fragment.
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// Number of children in the fragment.
        count: usize,
    },

    #[error("{0}")]
    /// A replace could not be performed (inconsistent open depths, incompatible joins, ...).
    Replace(String),

    #[error("invalid content for node type {0}")]
    /// Content does not satisfy a node type's content expression or mark rules.
    InvalidContent(String),

    #[error("no value supplied for required attribute '{attr}' of {owner}")]
    /// A required attribute was not given when creating a node or mark.
    MissingAttribute {
        /// Node or mark type name.
        owner: String,
        /// Attribute name.
        attr: String,
    },

    #[error("unknown node or mark type '{0}'")]
    /// A type name is not part of the schema.
    UnknownType(String),

    #[error("empty text nodes are not allowed")]
    /// Text nodes must hold at least one character.
    EmptyText,

    #[error("no node at position {0}")]
    /// A node was expected directly after a position.
    NoNodeAt(usize),

    #[error("step failed: {0}")]
    /// A step could not be applied to the document.
    Step(String),

    #[error("{0}")]
    /// A structural transform helper was used with invalid arguments.
    Structure(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors produced while compiling a [`crate::Schema`].
pub enum SchemaError {
    #[error("duplicate type name '{0}'")]
    /// Two node or mark types share a name.
    DuplicateName(String),

    #[error("schema is missing its top node type '{0}'")]
    /// The top node type is not declared.
    MissingTopNode(String),

    #[error("every schema needs a 'text' type")]
    /// The `text` node type is not declared.
    MissingText,

    #[error("the text node type should not have attributes")]
    /// The `text` node type declares attributes.
    TextWithAttrs,

    #[error("no node type or group '{name}' found (in content expression '{expr}')")]
    /// A content expression references an unknown type or group.
    UnknownName {
        /// The unresolved name.
        name: String,
        /// The full expression.
        expr: String,
    },

    #[error("{message} (in content expression '{expr}')")]
    /// A content expression could not be parsed.
    Expression {
        /// What went wrong.
        message: String,
        /// The full expression.
        expr: String,
    },

    #[error("unknown mark type '{0}' in marks or excludes expression")]
    /// A marks/excludes expression references an unknown mark type.
    UnknownMark(String),
}
