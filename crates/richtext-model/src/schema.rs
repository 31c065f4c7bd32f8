//! Schema definitions: node types, mark types and their attributes.
//!
//! A [`Schema`] is compiled once from a [`SchemaSpec`] and shared (it is an `Arc` internally).
//! [`NodeType`] and [`MarkType`] are cheap handles into it.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::content::{ContentMatch, MatchGraph, TypeHeader, compile_content};
use crate::error::{ModelError, Result, SchemaError};
use crate::fragment::Fragment;
use crate::mark::Mark;
use crate::node::Node;

/// Attribute value carried by nodes and marks.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttrValue {
    /// Explicit absence of a value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// String value.
    Str(String),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Null => write!(f, "null"),
            AttrValue::Bool(b) => write!(f, "{}", b),
            AttrValue::Int(i) => write!(f, "{}", i),
            AttrValue::Str(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

/// Attribute map of a node or mark. Ordered so equality and display are deterministic.
pub type Attrs = BTreeMap<String, AttrValue>;

/// Declaration of a single attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttrSpec {
    /// Default value. `None` makes the attribute required.
    pub default: Option<AttrValue>,
}

impl AttrSpec {
    /// An attribute that must be supplied on creation.
    pub fn required() -> Self {
        Self { default: None }
    }

    /// An attribute with a default value.
    pub fn with_default(value: impl Into<AttrValue>) -> Self {
        Self {
            default: Some(value.into()),
        }
    }
}

/// Declaration of a node type.
#[derive(Debug, Clone, Default)]
pub struct NodeSpec {
    /// Content expression, e.g. `"paragraph block*"`. `None` or empty makes a leaf.
    pub content: Option<String>,
    /// Marks allowed inside this node: `"_"` for all, space-separated names, or `""` for
    /// none. Defaults to all marks for nodes with inline content and none otherwise.
    pub marks: Option<String>,
    /// Space-separated group names the type belongs to.
    pub group: Option<String>,
    /// Inline node (as opposed to block).
    pub inline: bool,
    /// Treated as a single unit even when it has content.
    pub atom: bool,
    /// Whether node selections may target this type (default `true`).
    pub selectable: Option<bool>,
    /// Holds code; commands insert literal newlines instead of splitting.
    pub code: bool,
    /// Content is kept when the node is replaced by pasted or lifted content.
    pub defining: bool,
    /// Edits such as joining or lifting never cross this node's boundary.
    pub isolating: bool,
    /// Attribute declarations.
    pub attrs: Vec<(String, AttrSpec)>,
}

impl NodeSpec {
    /// An empty spec (block leaf, no attributes).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the content expression.
    pub fn content(mut self, expr: impl Into<String>) -> Self {
        self.content = Some(expr.into());
        self
    }

    /// Set the allowed marks expression.
    pub fn marks(mut self, expr: impl Into<String>) -> Self {
        self.marks = Some(expr.into());
        self
    }

    /// Set the group list.
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Mark the type as inline.
    pub fn inline(mut self) -> Self {
        self.inline = true;
        self
    }

    /// Mark the type as atomic.
    pub fn atom(mut self) -> Self {
        self.atom = true;
        self
    }

    /// Set whether node selections may target the type.
    pub fn selectable(mut self, selectable: bool) -> Self {
        self.selectable = Some(selectable);
        self
    }

    /// Mark the type as holding code.
    pub fn code(mut self) -> Self {
        self.code = true;
        self
    }

    /// Mark the type as defining.
    pub fn defining(mut self) -> Self {
        self.defining = true;
        self
    }

    /// Mark the type as isolating.
    pub fn isolating(mut self) -> Self {
        self.isolating = true;
        self
    }

    /// Declare an attribute.
    pub fn attr(mut self, name: impl Into<String>, spec: AttrSpec) -> Self {
        self.attrs.push((name.into(), spec));
        self
    }
}

/// Declaration of a mark type.
#[derive(Debug, Clone, Default)]
pub struct MarkSpec {
    /// Attribute declarations.
    pub attrs: Vec<(String, AttrSpec)>,
    /// Whether the mark extends to text typed at its end (default `true`).
    pub inclusive: Option<bool>,
    /// Space-separated mark names this mark cannot coexist with. Defaults to the mark itself;
    /// `""` allows several instances with different attributes.
    pub excludes: Option<String>,
}

impl MarkSpec {
    /// An empty spec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an attribute.
    pub fn attr(mut self, name: impl Into<String>, spec: AttrSpec) -> Self {
        self.attrs.push((name.into(), spec));
        self
    }

    /// Set inclusiveness.
    pub fn inclusive(mut self, inclusive: bool) -> Self {
        self.inclusive = Some(inclusive);
        self
    }

    /// Set the excludes expression.
    pub fn excludes(mut self, expr: impl Into<String>) -> Self {
        self.excludes = Some(expr.into());
        self
    }
}

/// Declaration of a whole schema. Node order matters: the first type of a group is the
/// default when content must be synthesized.
#[derive(Debug, Clone, Default)]
pub struct SchemaSpec {
    /// Node types in declaration order.
    pub nodes: Vec<(String, NodeSpec)>,
    /// Mark types in declaration order (which is also their rank).
    pub marks: Vec<(String, MarkSpec)>,
    /// Name of the top node type (default `"doc"`).
    pub top_node: Option<String>,
}

impl SchemaSpec {
    /// An empty spec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a node type.
    pub fn node(mut self, name: impl Into<String>, spec: NodeSpec) -> Self {
        self.nodes.push((name.into(), spec));
        self
    }

    /// Declare a mark type.
    pub fn mark(mut self, name: impl Into<String>, spec: MarkSpec) -> Self {
        self.marks.push((name.into(), spec));
        self
    }

    /// Set the top node type.
    pub fn top_node(mut self, name: impl Into<String>) -> Self {
        self.top_node = Some(name.into());
        self
    }
}

pub(crate) struct NodeTypeInfo {
    pub(crate) name: String,
    pub(crate) spec: NodeSpec,
    pub(crate) groups: Vec<String>,
    pub(crate) graph: MatchGraph,
    pub(crate) is_block: bool,
    pub(crate) is_leaf: bool,
    pub(crate) inline_content: bool,
    /// `None` allows every mark.
    pub(crate) mark_set: Option<Vec<usize>>,
    /// `None` when some attribute is required.
    pub(crate) default_attrs: Option<Attrs>,
}

pub(crate) struct MarkTypeInfo {
    pub(crate) name: String,
    pub(crate) spec: MarkSpec,
    pub(crate) excluded: Vec<usize>,
}

struct SchemaInner {
    nodes: Vec<NodeTypeInfo>,
    marks: Vec<MarkTypeInfo>,
    top: usize,
    text: usize,
}

/// A compiled document schema.
#[derive(Clone)]
pub struct Schema {
    inner: Arc<SchemaInner>,
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Schema {}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field(
                "nodes",
                &self.inner.nodes.iter().map(|n| &n.name).collect::<Vec<_>>(),
            )
            .field(
                "marks",
                &self.inner.marks.iter().map(|m| &m.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Schema {
    /// Compile a schema from its spec.
    pub fn new(spec: SchemaSpec) -> std::result::Result<Schema, SchemaError> {
        let mut names = HashSet::new();
        let declared = spec
            .nodes
            .iter()
            .map(|(name, _)| name)
            .chain(spec.marks.iter().map(|(name, _)| name));
        for name in declared {
            if !names.insert(name.as_str()) {
                return Err(SchemaError::DuplicateName(name.clone()));
            }
        }

        let top_name = spec.top_node.clone().unwrap_or_else(|| "doc".to_string());
        let top = spec
            .nodes
            .iter()
            .position(|(name, _)| *name == top_name)
            .ok_or(SchemaError::MissingTopNode(top_name))?;
        let text = spec
            .nodes
            .iter()
            .position(|(name, _)| name == "text")
            .ok_or(SchemaError::MissingText)?;
        if !spec.nodes[text].1.attrs.is_empty() {
            return Err(SchemaError::TextWithAttrs);
        }

        let headers: Vec<TypeHeader<'_>> = spec
            .nodes
            .iter()
            .map(|(name, node)| TypeHeader {
                name: name.as_str(),
                groups: split_names(node.group.as_deref()),
                is_inline: node.inline || name == "text",
            })
            .collect();

        let mut marks = Vec::with_capacity(spec.marks.len());
        for (name, mark) in &spec.marks {
            let excluded = match mark.excludes.as_deref() {
                None => vec![marks.len()],
                Some(expr) => gather_marks(&spec.marks, expr)?,
            };
            marks.push(MarkTypeInfo {
                name: name.clone(),
                spec: mark.clone(),
                excluded,
            });
        }

        let mut nodes = Vec::with_capacity(spec.nodes.len());
        for (index, (name, node)) in spec.nodes.iter().enumerate() {
            let expr = node.content.as_deref().unwrap_or("").trim();
            let graph = compile_content(expr, &headers)?;
            let inline_content = graph
                .states
                .first()
                .and_then(|s| s.next.first())
                .is_some_and(|&(ty, _)| headers[ty].is_inline);
            let mark_set = match node.marks.as_deref() {
                Some("_") => None,
                Some("") => Some(Vec::new()),
                Some(expr) => Some(gather_marks(&spec.marks, expr)?),
                None if inline_content => None,
                None => Some(Vec::new()),
            };
            let default_attrs = node
                .attrs
                .iter()
                .map(|(k, a)| a.default.clone().map(|v| (k.clone(), v)))
                .collect::<Option<Attrs>>();
            nodes.push(NodeTypeInfo {
                name: name.clone(),
                spec: node.clone(),
                groups: headers[index].groups.iter().map(|g| g.to_string()).collect(),
                graph,
                is_block: !headers[index].is_inline,
                is_leaf: expr.is_empty(),
                inline_content,
                mark_set,
                default_attrs,
            });
        }

        Ok(Schema {
            inner: Arc::new(SchemaInner {
                nodes,
                marks,
                top,
                text,
            }),
        })
    }

    pub(crate) fn node_info(&self, index: usize) -> &NodeTypeInfo {
        &self.inner.nodes[index]
    }

    pub(crate) fn mark_info(&self, index: usize) -> &MarkTypeInfo {
        &self.inner.marks[index]
    }

    pub(crate) fn node_type_at(&self, index: usize) -> NodeType {
        NodeType {
            schema: self.clone(),
            index,
        }
    }

    /// Look up a node type by name.
    pub fn node_type(&self, name: &str) -> Option<NodeType> {
        self.inner
            .nodes
            .iter()
            .position(|n| n.name == name)
            .map(|index| self.node_type_at(index))
    }

    /// Look up a mark type by name.
    pub fn mark_type(&self, name: &str) -> Option<MarkType> {
        self.inner
            .marks
            .iter()
            .position(|m| m.name == name)
            .map(|index| MarkType {
                schema: self.clone(),
                index,
            })
    }

    /// All node types in declaration order.
    pub fn node_types(&self) -> impl Iterator<Item = NodeType> + '_ {
        (0..self.inner.nodes.len()).map(|index| self.node_type_at(index))
    }

    /// The type of document roots.
    pub fn top_node_type(&self) -> NodeType {
        self.node_type_at(self.inner.top)
    }

    /// The `text` node type.
    pub fn text_type(&self) -> NodeType {
        self.node_type_at(self.inner.text)
    }

    /// Create a text node.
    pub fn text(&self, text: &str, marks: Vec<Mark>) -> Result<Node> {
        if text.is_empty() {
            return Err(ModelError::EmptyText);
        }
        Ok(Node::new_text(
            self.text_type(),
            text.to_string(),
            Mark::set_from(marks),
        ))
    }

    /// Create a node of the named type. Content is not checked; see [`NodeType::create_checked`].
    pub fn node(
        &self,
        name: &str,
        attrs: Option<&Attrs>,
        content: Fragment,
        marks: Vec<Mark>,
    ) -> Result<Node> {
        self.node_type(name)
            .ok_or_else(|| ModelError::UnknownType(name.to_string()))?
            .create(attrs, content, marks)
    }

    /// Create a mark of the named type.
    pub fn mark(&self, name: &str, attrs: Option<&Attrs>) -> Result<Mark> {
        self.mark_type(name)
            .ok_or_else(|| ModelError::UnknownType(name.to_string()))?
            .create(attrs)
    }
}

fn split_names(list: Option<&str>) -> Vec<&str> {
    list.map(|l| l.split_whitespace().collect())
        .unwrap_or_default()
}

fn gather_marks(
    marks: &[(String, MarkSpec)],
    expr: &str,
) -> std::result::Result<Vec<usize>, SchemaError> {
    let mut found = Vec::new();
    for name in expr.split_whitespace() {
        if name == "_" {
            found.extend(0..marks.len());
            continue;
        }
        let index = marks
            .iter()
            .position(|(n, _)| n == name)
            .ok_or_else(|| SchemaError::UnknownMark(name.to_string()))?;
        found.push(index);
    }
    found.sort_unstable();
    found.dedup();
    Ok(found)
}

fn compute_attrs(
    owner: &str,
    specs: &[(String, AttrSpec)],
    given: Option<&Attrs>,
) -> Result<Attrs> {
    let mut attrs = Attrs::new();
    for (name, spec) in specs {
        let value = match given.and_then(|g| g.get(name)) {
            Some(value) => value.clone(),
            None => spec
                .default
                .clone()
                .ok_or_else(|| ModelError::MissingAttribute {
                    owner: owner.to_string(),
                    attr: name.clone(),
                })?,
        };
        attrs.insert(name.clone(), value);
    }
    Ok(attrs)
}

/// Handle to a node type of a [`Schema`].
#[derive(Clone)]
pub struct NodeType {
    schema: Schema,
    index: usize,
}

impl PartialEq for NodeType {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.schema == other.schema
    }
}

impl Eq for NodeType {}

impl Hash for NodeType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeType({})", self.name())
    }
}

impl NodeType {
    fn info(&self) -> &NodeTypeInfo {
        self.schema.node_info(self.index)
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    /// Type name.
    pub fn name(&self) -> &str {
        &self.info().name
    }

    /// Owning schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The spec the type was declared with.
    pub fn spec(&self) -> &NodeSpec {
        &self.info().spec
    }

    /// Whether the type belongs to `group`.
    pub fn is_in_group(&self, group: &str) -> bool {
        self.info().groups.iter().any(|g| g == group)
    }

    /// `true` for the `text` type.
    pub fn is_text(&self) -> bool {
        self.index == self.schema.inner.text
    }

    /// `true` for block types.
    pub fn is_block(&self) -> bool {
        self.info().is_block
    }

    /// `true` for inline types (including text).
    pub fn is_inline(&self) -> bool {
        !self.is_block()
    }

    /// `true` for types whose content is inline.
    pub fn inline_content(&self) -> bool {
        self.info().inline_content
    }

    /// `true` for block types with inline content.
    pub fn is_textblock(&self) -> bool {
        self.is_block() && self.inline_content()
    }

    /// `true` for types that can't hold content.
    pub fn is_leaf(&self) -> bool {
        self.info().is_leaf
    }

    /// `true` for leaves and types declared `atom`.
    pub fn is_atom(&self) -> bool {
        self.is_leaf() || self.spec().atom
    }

    /// `true` for types declared `isolating`.
    pub fn is_isolating(&self) -> bool {
        self.spec().isolating
    }

    /// `true` for types declared `code`.
    pub fn is_code(&self) -> bool {
        self.spec().code
    }

    /// Whether node selections may target nodes of this type.
    pub fn is_selectable(&self) -> bool {
        self.spec().selectable.unwrap_or(true)
    }

    /// Whether some attribute has no default.
    pub fn has_required_attrs(&self) -> bool {
        self.info().default_attrs.is_none()
    }

    pub(crate) fn default_attrs(&self) -> Option<&Attrs> {
        self.info().default_attrs.as_ref()
    }

    /// Start state of the type's content automaton.
    pub fn content_match(&self) -> ContentMatch {
        ContentMatch::start(self)
    }

    /// Whether this type and `other` share at least one allowed child type.
    pub fn compatible_content(&self, other: &NodeType) -> bool {
        self == other || self.content_match().compatible(&other.content_match())
    }

    /// Whether marks of `mark_type` may appear in this type's content.
    pub fn allows_mark_type(&self, mark_type: &MarkType) -> bool {
        match &self.info().mark_set {
            None => true,
            Some(set) => set.contains(&mark_type.index),
        }
    }

    /// Whether every mark in `marks` is allowed.
    pub fn allows_marks(&self, marks: &[Mark]) -> bool {
        marks.iter().all(|m| self.allows_mark_type(m.mark_type()))
    }

    /// Whether `content` satisfies the content expression and mark rules of the type.
    pub fn valid_content(&self, content: &Fragment) -> bool {
        match self.content_match().match_fragment(content) {
            Some(end) if end.valid_end() => content
                .iter()
                .all(|child| self.allows_marks(child.marks())),
            _ => false,
        }
    }

    /// Error-returning form of [`NodeType::valid_content`].
    pub fn check_content(&self, content: &Fragment) -> Result<()> {
        if self.valid_content(content) {
            Ok(())
        } else {
            Err(ModelError::InvalidContent(self.name().to_string()))
        }
    }

    /// Fill in defaults for missing attributes.
    pub fn compute_attrs(&self, attrs: Option<&Attrs>) -> Result<Attrs> {
        match (attrs, self.default_attrs()) {
            (None, Some(defaults)) => Ok(defaults.clone()),
            _ => compute_attrs(self.name(), &self.spec().attrs, attrs),
        }
    }

    /// Create a node of this type. Content is not checked against the schema.
    pub fn create(
        &self,
        attrs: Option<&Attrs>,
        content: Fragment,
        marks: Vec<Mark>,
    ) -> Result<Node> {
        if self.is_text() {
            return Err(ModelError::Structure(
                "NodeType::create can't construct text nodes".to_string(),
            ));
        }
        Ok(Node::new(
            self.clone(),
            self.compute_attrs(attrs)?,
            content,
            Mark::set_from(marks),
        ))
    }

    /// Like [`NodeType::create`], but validates the content.
    pub fn create_checked(
        &self,
        attrs: Option<&Attrs>,
        content: Fragment,
        marks: Vec<Mark>,
    ) -> Result<Node> {
        self.check_content(&content)?;
        self.create(attrs, content, marks)
    }

    /// Create a node, adding whatever content is needed before and after `content` to make
    /// it valid. `None` when no such completion exists.
    pub fn create_and_fill(
        &self,
        attrs: Option<&Attrs>,
        content: Fragment,
        marks: Vec<Mark>,
    ) -> Option<Node> {
        let attrs = self.compute_attrs(attrs).ok()?;
        let start = self.content_match();
        let mut content = content;
        if content.size() > 0 {
            let before = start.fill_before(&content, false, 0)?;
            content = before.append(&content);
        }
        let matched = start.match_fragment(&content)?;
        let after = matched.fill_before(&Fragment::empty(), true, 0)?;
        Some(Node::new(
            self.clone(),
            attrs,
            content.append(&after),
            Mark::set_from(marks),
        ))
    }
}

/// Handle to a mark type of a [`Schema`].
#[derive(Clone)]
pub struct MarkType {
    schema: Schema,
    index: usize,
}

impl PartialEq for MarkType {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.schema == other.schema
    }
}

impl Eq for MarkType {}

impl Hash for MarkType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl fmt::Debug for MarkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MarkType({})", self.name())
    }
}

impl MarkType {
    fn info(&self) -> &MarkTypeInfo {
        self.schema.mark_info(self.index)
    }

    /// Type name.
    pub fn name(&self) -> &str {
        &self.info().name
    }

    /// Ordering rank inside mark sets (declaration order).
    pub fn rank(&self) -> usize {
        self.index
    }

    /// Owning schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The spec the type was declared with.
    pub fn spec(&self) -> &MarkSpec {
        &self.info().spec
    }

    /// Whether the mark extends to text typed at its end.
    pub fn is_inclusive(&self) -> bool {
        self.spec().inclusive.unwrap_or(true)
    }

    /// Create a mark of this type.
    pub fn create(&self, attrs: Option<&Attrs>) -> Result<Mark> {
        let attrs = compute_attrs(self.name(), &self.spec().attrs, attrs)?;
        Ok(Mark::new(self.clone(), attrs))
    }

    /// Whether this type excludes `other` from a mark set.
    pub fn excludes(&self, other: &MarkType) -> bool {
        self.schema == other.schema && self.info().excluded.contains(&other.index)
    }

    /// The mark of this type in `set`, if any.
    pub fn is_in_set<'a>(&self, set: &'a [Mark]) -> Option<&'a Mark> {
        set.iter().find(|m| m.mark_type() == self)
    }

    /// `set` without marks of this type.
    pub fn remove_from_set(&self, set: &[Mark]) -> Vec<Mark> {
        set.iter()
            .filter(|m| m.mark_type() != self)
            .cloned()
            .collect()
    }
}
