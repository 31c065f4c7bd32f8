//! A ready-made schema and builder macros for tests.
//!
//! Text arguments may contain `<name>` tags; the resulting [`TestDoc`] records the position
//! of each tag so tests can place selections without counting tokens.
//!
//! ```rust
//! use richtext_model::{doc, p, em};
//!
//! let d = doc!(p!("he<a>llo ", em!("wor<b>ld")));
//! assert_eq!(d.tag("a"), 3);
//! assert_eq!(d.tag("b"), 10);
//! ```

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::fragment::Fragment;
use crate::node::Node;
use crate::schema::{AttrSpec, AttrValue, Attrs, MarkSpec, NodeSpec, Schema, SchemaSpec};

/// The schema used by the builders: paragraphs, blockquotes, headings, code blocks, rules,
/// lists, images and hard breaks, with link/em/strong/code marks.
pub fn schema() -> Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA
        .get_or_init(|| {
            Schema::new(
                SchemaSpec::new()
                    .node("doc", NodeSpec::new().content("block+"))
                    .node(
                        "paragraph",
                        NodeSpec::new().content("inline*").group("block"),
                    )
                    .node(
                        "blockquote",
                        NodeSpec::new().content("block+").group("block").defining(),
                    )
                    .node("horizontal_rule", NodeSpec::new().group("block"))
                    .node(
                        "heading",
                        NodeSpec::new()
                            .attr("level", AttrSpec::with_default(1))
                            .content("inline*")
                            .group("block")
                            .defining(),
                    )
                    .node(
                        "code_block",
                        NodeSpec::new()
                            .content("text*")
                            .marks("")
                            .group("block")
                            .code()
                            .defining(),
                    )
                    .node("text", NodeSpec::new().inline().group("inline"))
                    .node(
                        "image",
                        NodeSpec::new()
                            .inline()
                            .attr("src", AttrSpec::required())
                            .attr("alt", AttrSpec::with_default(AttrValue::Null))
                            .group("inline"),
                    )
                    .node(
                        "hard_break",
                        NodeSpec::new().inline().group("inline").selectable(false),
                    )
                    .node(
                        "ordered_list",
                        NodeSpec::new()
                            .attr("order", AttrSpec::with_default(1))
                            .content("list_item+")
                            .group("block"),
                    )
                    .node(
                        "bullet_list",
                        NodeSpec::new().content("list_item+").group("block"),
                    )
                    .node(
                        "list_item",
                        NodeSpec::new().content("paragraph block*").defining(),
                    )
                    .mark(
                        "link",
                        MarkSpec::new()
                            .attr("href", AttrSpec::required())
                            .inclusive(false),
                    )
                    .mark("em", MarkSpec::new())
                    .mark("strong", MarkSpec::new())
                    .mark("code", MarkSpec::new()),
            )
            .expect("test schema is valid")
        })
        .clone()
}

fn tag_regex() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"<(\w+)>").expect("tag pattern is valid"))
}

/// Nodes produced by a builder, with tag positions relative to their start.
#[derive(Debug, Clone, Default)]
pub struct Tagged {
    /// The built nodes.
    pub nodes: Vec<Node>,
    /// Tag name and position.
    pub tags: Vec<(String, usize)>,
}

impl From<&str> for Tagged {
    fn from(source: &str) -> Self {
        let mut text = String::new();
        let mut tags = Vec::new();
        let mut len = 0;
        let mut last = 0;
        for caps in tag_regex().captures_iter(source) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let before = &source[last..whole.start()];
            text.push_str(before);
            len += before.chars().count();
            tags.push((name.as_str().to_string(), len));
            last = whole.end();
        }
        text.push_str(&source[last..]);
        let nodes = if text.is_empty() {
            Vec::new()
        } else {
            vec![schema().text(&text, Vec::new()).expect("text is non-empty")]
        };
        Tagged { nodes, tags }
    }
}

impl From<String> for Tagged {
    fn from(source: String) -> Self {
        Tagged::from(source.as_str())
    }
}

impl From<Node> for Tagged {
    fn from(node: Node) -> Self {
        Tagged {
            nodes: vec![node],
            tags: Vec::new(),
        }
    }
}

fn flatten(children: Vec<Tagged>) -> Tagged {
    let mut out = Tagged::default();
    let mut pos = 0;
    for child in children {
        out.tags
            .extend(child.tags.into_iter().map(|(name, at)| (name, at + pos)));
        for node in child.nodes {
            pos += node.node_size();
            out.nodes.push(node);
        }
    }
    out
}

/// Build a node of type `name` around `children`. Panics on invalid content.
pub fn block(name: &str, attrs: Option<Attrs>, children: Vec<Tagged>) -> Tagged {
    let inner = flatten(children);
    let ty = schema()
        .node_type(name)
        .unwrap_or_else(|| panic!("unknown node type {}", name));
    let node = ty
        .create_checked(attrs.as_ref(), Fragment::from_vec(inner.nodes), Vec::new())
        .unwrap_or_else(|err| panic!("invalid {} content: {}", name, err));
    Tagged {
        nodes: vec![node],
        tags: inner
            .tags
            .into_iter()
            .map(|(tag, at)| (tag, at + 1))
            .collect(),
    }
}

/// Apply the mark `name` to every inline node in `children`.
pub fn mark(name: &str, attrs: Option<Attrs>, children: Vec<Tagged>) -> Tagged {
    let inner = flatten(children);
    let mark = schema()
        .mark(name, attrs.as_ref())
        .unwrap_or_else(|err| panic!("invalid mark {}: {}", name, err));
    Tagged {
        nodes: inner
            .nodes
            .into_iter()
            .map(|node| node.mark(mark.add_to_set(node.marks())))
            .collect(),
        tags: inner.tags,
    }
}

/// A built document and its tag positions.
#[derive(Debug, Clone)]
pub struct TestDoc {
    /// The document node.
    pub node: Node,
    /// Tag positions.
    pub tags: HashMap<String, usize>,
}

impl TestDoc {
    /// Position of a tag. Panics when absent.
    pub fn tag(&self, name: &str) -> usize {
        self.tags
            .get(name)
            .copied()
            .unwrap_or_else(|| panic!("no <{}> tag in document", name))
    }

    /// Position of a tag, if present.
    pub fn maybe_tag(&self, name: &str) -> Option<usize> {
        self.tags.get(name).copied()
    }
}

/// Build a document. Used by the [`doc!`](crate::doc) macro.
pub fn build_doc(children: Vec<Tagged>) -> TestDoc {
    let inner = flatten(children);
    let node = schema()
        .top_node_type()
        .create_checked(None, Fragment::from_vec(inner.nodes), Vec::new())
        .unwrap_or_else(|err| panic!("invalid document: {}", err));
    TestDoc {
        node,
        tags: inner.tags.into_iter().collect(),
    }
}

fn attrs_of(pairs: &[(&str, AttrValue)]) -> Attrs {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// A heading of the given level.
pub fn heading(level: i64, children: Vec<Tagged>) -> Tagged {
    block(
        "heading",
        Some(attrs_of(&[("level", AttrValue::Int(level))])),
        children,
    )
}

/// A link mark around `children`.
pub fn link(href: &str, children: Vec<Tagged>) -> Tagged {
    mark("link", Some(attrs_of(&[("href", href.into())])), children)
}

/// A horizontal rule.
pub fn hr() -> Tagged {
    block("horizontal_rule", None, Vec::new())
}

/// An inline image.
pub fn img() -> Tagged {
    block(
        "image",
        Some(attrs_of(&[("src", "img.png".into())])),
        Vec::new(),
    )
}

/// A hard line break.
pub fn br() -> Tagged {
    block("hard_break", None, Vec::new())
}

/// Build a document from children.
#[macro_export]
macro_rules! doc {
    ($($child:expr),* $(,)?) => {
        $crate::testing::build_doc(vec![$($crate::testing::Tagged::from($child)),*])
    };
}

/// A paragraph.
#[macro_export]
macro_rules! p {
    ($($child:expr),* $(,)?) => {
        $crate::testing::block("paragraph", None, vec![$($crate::testing::Tagged::from($child)),*])
    };
}

/// A blockquote.
#[macro_export]
macro_rules! blockquote {
    ($($child:expr),* $(,)?) => {
        $crate::testing::block("blockquote", None, vec![$($crate::testing::Tagged::from($child)),*])
    };
}

/// A level 1 heading.
#[macro_export]
macro_rules! h1 {
    ($($child:expr),* $(,)?) => {
        $crate::testing::heading(1, vec![$($crate::testing::Tagged::from($child)),*])
    };
}

/// A level 2 heading.
#[macro_export]
macro_rules! h2 {
    ($($child:expr),* $(,)?) => {
        $crate::testing::heading(2, vec![$($crate::testing::Tagged::from($child)),*])
    };
}

/// A code block.
#[macro_export]
macro_rules! pre {
    ($($child:expr),* $(,)?) => {
        $crate::testing::block("code_block", None, vec![$($crate::testing::Tagged::from($child)),*])
    };
}

/// A bullet list.
#[macro_export]
macro_rules! ul {
    ($($child:expr),* $(,)?) => {
        $crate::testing::block(
            "bullet_list",
            None,
            vec![$($crate::testing::Tagged::from($child)),*],
        )
    };
}

/// An ordered list.
#[macro_export]
macro_rules! ol {
    ($($child:expr),* $(,)?) => {
        $crate::testing::block(
            "ordered_list",
            None,
            vec![$($crate::testing::Tagged::from($child)),*],
        )
    };
}

/// A list item.
#[macro_export]
macro_rules! li {
    ($($child:expr),* $(,)?) => {
        $crate::testing::block("list_item", None, vec![$($crate::testing::Tagged::from($child)),*])
    };
}

/// Emphasis.
#[macro_export]
macro_rules! em {
    ($($child:expr),* $(,)?) => {
        $crate::testing::mark("em", None, vec![$($crate::testing::Tagged::from($child)),*])
    };
}

/// Strong emphasis.
#[macro_export]
macro_rules! strong {
    ($($child:expr),* $(,)?) => {
        $crate::testing::mark("strong", None, vec![$($crate::testing::Tagged::from($child)),*])
    };
}

/// Inline code.
#[macro_export]
macro_rules! code {
    ($($child:expr),* $(,)?) => {
        $crate::testing::mark("code", None, vec![$($crate::testing::Tagged::from($child)),*])
    };
}

/// A link: `a!("href"; children...)`.
#[macro_export]
macro_rules! a {
    ($href:expr; $($child:expr),* $(,)?) => {
        $crate::testing::link($href, vec![$($crate::testing::Tagged::from($child)),*])
    };
}

pub use crate::{a, blockquote, code, doc, em, h1, h2, li, ol, p, pre, strong, ul};
