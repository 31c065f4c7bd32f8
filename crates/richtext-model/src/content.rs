//! Content expressions and the automata compiled from them.
//!
//! An expression such as `"heading paragraph+ (image | hard_break)*"` is parsed into a small
//! syntax tree, compiled to an NFA, and then determinized. The resulting [`MatchGraph`] is
//! stored per node type; [`ContentMatch`] is a handle to one of its states.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::SchemaError;
use crate::fragment::Fragment;
use crate::node::Node;
use crate::schema::{NodeType, Schema};

/// Name and groups of a node type, available before the schema is assembled.
pub(crate) struct TypeHeader<'a> {
    pub(crate) name: &'a str,
    pub(crate) groups: Vec<&'a str>,
    pub(crate) is_inline: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct MatchState {
    pub(crate) valid_end: bool,
    /// `(node type index, target state)` in first-seen order.
    pub(crate) next: Vec<(usize, usize)>,
}

/// Deterministic automaton for one content expression. State 0 is the start.
#[derive(Debug, Clone)]
pub(crate) struct MatchGraph {
    pub(crate) states: Vec<MatchState>,
}

#[derive(Debug)]
enum Expr {
    Choice(Vec<Expr>),
    Seq(Vec<Expr>),
    Plus(Box<Expr>),
    Star(Box<Expr>),
    Opt(Box<Expr>),
    Range {
        min: usize,
        max: Option<usize>,
        expr: Box<Expr>,
    },
    Name(usize),
}

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"\w+|[^\w\s]").expect("token pattern is valid"))
}

struct TokenStream<'a> {
    expr: &'a str,
    tokens: Vec<&'a str>,
    pos: usize,
    inline: Option<bool>,
    types: &'a [TypeHeader<'a>],
}

impl<'a> TokenStream<'a> {
    fn new(expr: &'a str, types: &'a [TypeHeader<'a>]) -> Self {
        Self {
            expr,
            tokens: token_regex().find_iter(expr).map(|m| m.as_str()).collect(),
            pos: 0,
            inline: None,
            types,
        }
    }

    fn next(&self) -> Option<&'a str> {
        self.tokens.get(self.pos).copied()
    }

    fn eat(&mut self, tok: &str) -> bool {
        if self.next() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn err(&self, message: impl Into<String>) -> SchemaError {
        SchemaError::Expression {
            message: message.into(),
            expr: self.expr.to_string(),
        }
    }
}

/// Compile `expr` (already trimmed) against the declared types. An empty expression yields the
/// single accepting state of a leaf.
pub(crate) fn compile_content(
    expr: &str,
    types: &[TypeHeader<'_>],
) -> Result<MatchGraph, SchemaError> {
    let mut stream = TokenStream::new(expr, types);
    if stream.next().is_none() {
        return Ok(MatchGraph {
            states: vec![MatchState {
                valid_end: true,
                next: Vec::new(),
            }],
        });
    }
    let parsed = parse_expr(&mut stream)?;
    if let Some(tok) = stream.next() {
        return Err(stream.err(format!("Unexpected trailing text '{}'", tok)));
    }
    let graph = dfa(&Nfa::build(&parsed));
    check_for_dead_ends(&graph, &stream)?;
    Ok(graph)
}

fn parse_expr(stream: &mut TokenStream<'_>) -> Result<Expr, SchemaError> {
    let mut exprs = Vec::new();
    loop {
        exprs.push(parse_seq(stream)?);
        if !stream.eat("|") {
            break;
        }
    }
    Ok(if exprs.len() == 1 {
        exprs.remove(0)
    } else {
        Expr::Choice(exprs)
    })
}

fn parse_seq(stream: &mut TokenStream<'_>) -> Result<Expr, SchemaError> {
    let mut exprs = Vec::new();
    loop {
        exprs.push(parse_subscript(stream)?);
        match stream.next() {
            Some(tok) if tok != ")" && tok != "|" => continue,
            _ => break,
        }
    }
    Ok(if exprs.len() == 1 {
        exprs.remove(0)
    } else {
        Expr::Seq(exprs)
    })
}

fn parse_subscript(stream: &mut TokenStream<'_>) -> Result<Expr, SchemaError> {
    let mut expr = parse_atom(stream)?;
    loop {
        if stream.eat("+") {
            expr = Expr::Plus(Box::new(expr));
        } else if stream.eat("*") {
            expr = Expr::Star(Box::new(expr));
        } else if stream.eat("?") {
            expr = Expr::Opt(Box::new(expr));
        } else if stream.eat("{") {
            expr = parse_range(stream, expr)?;
        } else {
            break;
        }
    }
    Ok(expr)
}

fn parse_num(stream: &mut TokenStream<'_>) -> Result<usize, SchemaError> {
    let tok = stream.next().unwrap_or("");
    let value = tok
        .parse::<usize>()
        .map_err(|_| stream.err(format!("Expected number, got '{}'", tok)))?;
    stream.pos += 1;
    Ok(value)
}

fn parse_range(stream: &mut TokenStream<'_>, expr: Expr) -> Result<Expr, SchemaError> {
    let min = parse_num(stream)?;
    let mut max = Some(min);
    if stream.eat(",") {
        max = if stream.next() != Some("}") {
            Some(parse_num(stream)?)
        } else {
            None
        };
    }
    if !stream.eat("}") {
        return Err(stream.err("Unclosed braced range"));
    }
    Ok(Expr::Range {
        min,
        max,
        expr: Box::new(expr),
    })
}

fn resolve_name(stream: &TokenStream<'_>, name: &str) -> Result<Vec<usize>, SchemaError> {
    if let Some(index) = stream.types.iter().position(|t| t.name == name) {
        return Ok(vec![index]);
    }
    let members: Vec<usize> = stream
        .types
        .iter()
        .enumerate()
        .filter(|(_, t)| t.groups.contains(&name))
        .map(|(i, _)| i)
        .collect();
    if members.is_empty() {
        return Err(SchemaError::UnknownName {
            name: name.to_string(),
            expr: stream.expr.to_string(),
        });
    }
    Ok(members)
}

fn parse_atom(stream: &mut TokenStream<'_>) -> Result<Expr, SchemaError> {
    if stream.eat("(") {
        let expr = parse_expr(stream)?;
        if !stream.eat(")") {
            return Err(stream.err("Missing closing paren"));
        }
        return Ok(expr);
    }
    match stream.next() {
        Some(tok) if tok.chars().all(|c| c.is_alphanumeric() || c == '_') => {
            let types = resolve_name(stream, tok)?;
            for &ty in &types {
                let inline = stream.types[ty].is_inline;
                match stream.inline {
                    None => stream.inline = Some(inline),
                    Some(current) if current != inline => {
                        return Err(stream.err("Mixing inline and block content"));
                    }
                    _ => {}
                }
            }
            stream.pos += 1;
            let mut exprs: Vec<Expr> = types.into_iter().map(Expr::Name).collect();
            Ok(if exprs.len() == 1 {
                exprs.remove(0)
            } else {
                Expr::Choice(exprs)
            })
        }
        Some(tok) => Err(stream.err(format!("Unexpected token '{}'", tok))),
        None => Err(stream.err("Unexpected end of expression")),
    }
}

#[derive(Clone, Copy)]
struct Edge {
    term: Option<usize>,
    to: Option<usize>,
}

/// `(state, edge index)` of an edge whose target is still open.
type EdgeRef = (usize, usize);

struct Nfa {
    nodes: Vec<Vec<Edge>>,
}

impl Nfa {
    fn build(expr: &Expr) -> Self {
        let mut nfa = Nfa {
            nodes: vec![Vec::new()],
        };
        let out = nfa.compile(expr, 0);
        let end = nfa.node();
        nfa.connect(&out, end);
        nfa
    }

    fn node(&mut self) -> usize {
        self.nodes.push(Vec::new());
        self.nodes.len() - 1
    }

    fn edge(&mut self, from: usize, to: Option<usize>, term: Option<usize>) -> EdgeRef {
        self.nodes[from].push(Edge { term, to });
        (from, self.nodes[from].len() - 1)
    }

    fn connect(&mut self, edges: &[EdgeRef], to: usize) {
        for &(node, index) in edges {
            self.nodes[node][index].to = Some(to);
        }
    }

    fn compile(&mut self, expr: &Expr, from: usize) -> Vec<EdgeRef> {
        match expr {
            Expr::Choice(exprs) => {
                let mut out = Vec::new();
                for expr in exprs {
                    out.extend(self.compile(expr, from));
                }
                out
            }
            Expr::Seq(exprs) => {
                let mut from = from;
                let mut out = Vec::new();
                for (i, expr) in exprs.iter().enumerate() {
                    out = self.compile(expr, from);
                    if i + 1 < exprs.len() {
                        from = self.node();
                        self.connect(&out, from);
                    }
                }
                out
            }
            Expr::Star(expr) => {
                let looped = self.node();
                self.edge(from, Some(looped), None);
                let out = self.compile(expr, looped);
                self.connect(&out, looped);
                vec![self.edge(looped, None, None)]
            }
            Expr::Plus(expr) => {
                let looped = self.node();
                let first = self.compile(expr, from);
                self.connect(&first, looped);
                let again = self.compile(expr, looped);
                self.connect(&again, looped);
                vec![self.edge(looped, None, None)]
            }
            Expr::Opt(expr) => {
                let mut out = vec![self.edge(from, None, None)];
                out.extend(self.compile(expr, from));
                out
            }
            Expr::Range { min, max, expr } => {
                let mut cur = from;
                for _ in 0..*min {
                    let next = self.node();
                    let out = self.compile(expr, cur);
                    self.connect(&out, next);
                    cur = next;
                }
                match max {
                    None => {
                        let out = self.compile(expr, cur);
                        self.connect(&out, cur);
                    }
                    Some(max) => {
                        for _ in *min..*max {
                            let next = self.node();
                            self.edge(cur, Some(next), None);
                            let out = self.compile(expr, cur);
                            self.connect(&out, next);
                            cur = next;
                        }
                    }
                }
                vec![self.edge(cur, None, None)]
            }
            Expr::Name(ty) => vec![self.edge(from, None, Some(*ty))],
        }
    }

    /// States reachable from `node` through epsilon edges, sorted.
    fn null_from(&self, node: usize) -> Vec<usize> {
        let mut result = Vec::new();
        let mut visited = vec![false; self.nodes.len()];
        self.scan(node, &mut result, &mut visited);
        result.sort_unstable();
        result
    }

    fn scan(&self, node: usize, result: &mut Vec<usize>, visited: &mut [bool]) {
        if visited[node] {
            return;
        }
        visited[node] = true;
        let edges = &self.nodes[node];
        // A state with a single epsilon edge adds nothing of its own.
        if let [
            Edge {
                term: None,
                to: Some(to),
            },
        ] = edges.as_slice()
        {
            self.scan(*to, result, visited);
            return;
        }
        result.push(node);
        for edge in edges {
            if let (None, Some(to)) = (edge.term, edge.to) {
                self.scan(to, result, visited);
            }
        }
    }
}

fn dfa(nfa: &Nfa) -> MatchGraph {
    let mut graph = MatchGraph { states: Vec::new() };
    let mut labeled = HashMap::new();
    explore(nfa, nfa.null_from(0), &mut graph, &mut labeled);
    graph
}

fn explore(
    nfa: &Nfa,
    states: Vec<usize>,
    graph: &mut MatchGraph,
    labeled: &mut HashMap<Vec<usize>, usize>,
) -> usize {
    let mut out: Vec<(usize, Vec<usize>)> = Vec::new();
    for &node in &states {
        for edge in &nfa.nodes[node] {
            let (Some(term), Some(to)) = (edge.term, edge.to) else {
                continue;
            };
            let slot = match out.iter().position(|(t, _)| *t == term) {
                Some(slot) => slot,
                None => {
                    out.push((term, Vec::new()));
                    out.len() - 1
                }
            };
            for target in nfa.null_from(to) {
                if !out[slot].1.contains(&target) {
                    out[slot].1.push(target);
                }
            }
        }
    }

    let id = graph.states.len();
    graph.states.push(MatchState {
        valid_end: states.contains(&(nfa.nodes.len() - 1)),
        next: Vec::new(),
    });
    labeled.insert(states, id);

    for (term, mut set) in out {
        set.sort_unstable();
        let target = match labeled.get(&set) {
            Some(&known) => known,
            None => explore(nfa, set, graph, labeled),
        };
        graph.states[id].next.push((term, target));
    }
    id
}

/// Reject expressions that force a node type which can't be generated (text or a type with
/// required attributes is fine to allow, but never to require).
fn check_for_dead_ends(graph: &MatchGraph, stream: &TokenStream<'_>) -> Result<(), SchemaError> {
    let mut work = vec![0usize];
    let mut seen = HashSet::new();
    seen.insert(0usize);
    while let Some(state) = work.pop() {
        let node = &graph.states[state];
        let mut dead = !node.valid_end;
        let mut nodes = Vec::new();
        for &(ty, next) in &node.next {
            nodes.push(stream.types[ty].name);
            if dead && stream.types[ty].name != "text" {
                dead = false;
            }
            if seen.insert(next) {
                work.push(next);
            }
        }
        if dead && !node.next.is_empty() {
            return Err(stream.err(format!(
                "Only non-generatable nodes ({}) in a required position",
                nodes.join(", ")
            )));
        }
    }
    Ok(())
}

/// A state in a node type's content automaton.
///
/// Obtained from [`NodeType::content_match`] or [`Node::content_match_at`], and advanced one
/// child type at a time with [`ContentMatch::match_type`].
#[derive(Clone)]
pub struct ContentMatch {
    schema: Schema,
    owner: usize,
    state: usize,
}

impl PartialEq for ContentMatch {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner && self.state == other.state && self.schema == other.schema
    }
}

impl Eq for ContentMatch {}

impl fmt::Debug for ContentMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .data()
            .next
            .iter()
            .map(|&(ty, next)| {
                format!("{}->{}", self.schema.node_info(ty).name, next)
            })
            .collect();
        write!(
            f,
            "ContentMatch({}#{}{} [{}])",
            self.schema.node_info(self.owner).name,
            self.state,
            if self.valid_end() { "*" } else { "" },
            names.join(", ")
        )
    }
}

impl ContentMatch {
    pub(crate) fn start(ty: &NodeType) -> Self {
        Self {
            schema: ty.schema().clone(),
            owner: ty.index(),
            state: 0,
        }
    }

    fn data(&self) -> &MatchState {
        &self.schema.node_info(self.owner).graph.states[self.state]
    }

    fn with_state(&self, state: usize) -> Self {
        Self {
            schema: self.schema.clone(),
            owner: self.owner,
            state,
        }
    }

    /// Whether the content may end here.
    pub fn valid_end(&self) -> bool {
        self.data().valid_end
    }

    /// Whether the first allowed child type is inline.
    pub fn inline_content(&self) -> bool {
        self.data()
            .next
            .first()
            .is_some_and(|&(ty, _)| !self.schema.node_info(ty).is_block)
    }

    /// Number of outgoing edges.
    pub fn edge_count(&self) -> usize {
        self.data().next.len()
    }

    /// The `n`th outgoing edge as `(child type, next state)`.
    pub fn edge(&self, n: usize) -> Option<(NodeType, ContentMatch)> {
        self.data()
            .next
            .get(n)
            .map(|&(ty, next)| (self.schema.node_type_at(ty), self.with_state(next)))
    }

    /// Advance over a child of type `ty`.
    pub fn match_type(&self, ty: &NodeType) -> Option<ContentMatch> {
        if ty.schema() != &self.schema {
            return None;
        }
        self.data()
            .next
            .iter()
            .find(|&&(t, _)| t == ty.index())
            .map(|&(_, next)| self.with_state(next))
    }

    /// Advance over every child of `fragment`.
    pub fn match_fragment(&self, fragment: &Fragment) -> Option<ContentMatch> {
        self.match_fragment_range(fragment, 0, fragment.child_count())
    }

    /// Advance over children `start..end` of `fragment`.
    pub fn match_fragment_range(
        &self,
        fragment: &Fragment,
        start: usize,
        end: usize,
    ) -> Option<ContentMatch> {
        let mut cur = self.clone();
        for child in fragment.iter().take(end).skip(start) {
            cur = cur.match_type(child.node_type())?;
        }
        Some(cur)
    }

    /// First allowed child type that can be created without input.
    pub fn default_type(&self) -> Option<NodeType> {
        self.data()
            .next
            .iter()
            .map(|&(ty, _)| self.schema.node_type_at(ty))
            .find(|ty| !(ty.is_text() || ty.has_required_attrs()))
    }

    /// Whether this state and `other` share an outgoing child type.
    pub fn compatible(&self, other: &ContentMatch) -> bool {
        self.schema == other.schema
            && self
                .data()
                .next
                .iter()
                .any(|&(a, _)| other.data().next.iter().any(|&(b, _)| a == b))
    }

    /// Find nodes that, inserted here, make `after[start_index..]` match. With `to_end` the
    /// result must also leave the content at a valid end.
    pub fn fill_before(
        &self,
        after: &Fragment,
        to_end: bool,
        start_index: usize,
    ) -> Option<Fragment> {
        let mut seen = vec![self.state];
        let mut types = Vec::new();
        self.search_fill(self, &mut types, &mut seen, after, to_end, start_index)
    }

    fn search_fill(
        &self,
        at: &ContentMatch,
        types: &mut Vec<NodeType>,
        seen: &mut Vec<usize>,
        after: &Fragment,
        to_end: bool,
        start_index: usize,
    ) -> Option<Fragment> {
        if let Some(finished) = at.match_fragment_range(after, start_index, after.child_count())
            && (!to_end || finished.valid_end())
        {
            let nodes: Option<Vec<Node>> = types
                .iter()
                .map(|ty| ty.create_and_fill(None, Fragment::empty(), Vec::new()))
                .collect();
            return nodes.map(Fragment::from_vec);
        }
        for &(ty, next) in &at.data().next {
            let ty = self.schema.node_type_at(ty);
            if ty.is_text() || ty.has_required_attrs() || seen.contains(&next) {
                continue;
            }
            seen.push(next);
            types.push(ty);
            let found =
                self.search_fill(&at.with_state(next), types, seen, after, to_end, start_index);
            if found.is_some() {
                return found;
            }
            types.pop();
        }
        None
    }

    /// Shortest chain of wrapper types that lets a node of type `target` appear here.
    /// `Some(vec![])` when `target` fits directly.
    pub fn find_wrapping(&self, target: &NodeType) -> Option<Vec<NodeType>> {
        struct Active {
            at: ContentMatch,
            ty: Option<NodeType>,
            via: Option<usize>,
        }

        let mut seen = HashSet::new();
        let mut active = vec![Active {
            at: self.clone(),
            ty: None,
            via: None,
        }];
        let mut head = 0;
        while head < active.len() {
            let current = head;
            head += 1;
            if active[current].at.match_type(target).is_some() {
                let mut result = Vec::new();
                let mut cursor = Some(current);
                while let Some(i) = cursor {
                    match &active[i].ty {
                        Some(ty) => result.push(ty.clone()),
                        None => break,
                    }
                    cursor = active[i].via;
                }
                result.reverse();
                return Some(result);
            }
            let at = active[current].at.clone();
            let wrapped = active[current].ty.is_some();
            for &(ty_index, next) in &at.data().next {
                let ty = self.schema.node_type_at(ty_index);
                if !ty.is_leaf()
                    && !ty.has_required_attrs()
                    && !seen.contains(&ty_index)
                    && (!wrapped || at.with_state(next).valid_end())
                {
                    seen.insert(ty_index);
                    active.push(Active {
                        at: ty.content_match(),
                        ty: Some(ty),
                        via: Some(current),
                    });
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{NodeSpec, SchemaSpec};

    fn schema() -> Schema {
        Schema::new(
            SchemaSpec::new()
                .node("doc", NodeSpec::new().content("heading? paragraph{1,2} quote*"))
                .node("heading", NodeSpec::new().content("text*"))
                .node("paragraph", NodeSpec::new().content("text*").group("block"))
                .node("quote", NodeSpec::new().content("block+"))
                .node("text", NodeSpec::new().inline()),
        )
        .unwrap()
    }

    fn ty(schema: &Schema, name: &str) -> NodeType {
        schema.node_type(name).unwrap()
    }

    #[test]
    fn test_optional_and_range() {
        let s = schema();
        let start = s.top_node_type().content_match();
        assert!(!start.valid_end());
        let after_h = start.match_type(&ty(&s, "heading")).unwrap();
        assert!(after_h.match_type(&ty(&s, "heading")).is_none());
        let one = after_h.match_type(&ty(&s, "paragraph")).unwrap();
        assert!(one.valid_end());
        let two = one.match_type(&ty(&s, "paragraph")).unwrap();
        assert!(two.match_type(&ty(&s, "paragraph")).is_none());
        assert!(two.match_type(&ty(&s, "quote")).is_some());
    }

    #[test]
    fn test_default_type_and_fill() {
        let s = schema();
        let start = s.top_node_type().content_match();
        assert_eq!(start.default_type(), Some(ty(&s, "heading")));
        // Depth-first: the optional heading is tried before skipping to the paragraph.
        let fill = start.fill_before(&Fragment::empty(), true, 0).unwrap();
        assert_eq!(fill.child_count(), 2);
        assert_eq!(fill.child(0).node_type().name(), "heading");
        assert_eq!(fill.child(1).node_type().name(), "paragraph");

        let para = s
            .node("paragraph", None, Fragment::empty(), Vec::new())
            .unwrap();
        let fill = start
            .fill_before(&Fragment::from(para), true, 0)
            .unwrap();
        assert_eq!(fill.child_count(), 0);
    }

    #[test]
    fn test_find_wrapping() {
        let s = schema();
        let quote = ty(&s, "quote").content_match();
        assert_eq!(quote.find_wrapping(&ty(&s, "paragraph")), Some(Vec::new()));
        assert_eq!(quote.find_wrapping(&ty(&s, "heading")), None);
    }

    #[test]
    fn test_expression_errors() {
        let bad = Schema::new(
            SchemaSpec::new()
                .node("doc", NodeSpec::new().content("paragraph+ nope"))
                .node("paragraph", NodeSpec::new().content("text*"))
                .node("text", NodeSpec::new().inline()),
        );
        assert!(matches!(bad, Err(SchemaError::UnknownName { .. })));

        let mixed = Schema::new(
            SchemaSpec::new()
                .node("doc", NodeSpec::new().content("paragraph text"))
                .node("paragraph", NodeSpec::new().content("text*"))
                .node("text", NodeSpec::new().inline()),
        );
        assert!(matches!(mixed, Err(SchemaError::Expression { .. })));

        let unclosed = Schema::new(
            SchemaSpec::new()
                .node("doc", NodeSpec::new().content("(paragraph"))
                .node("paragraph", NodeSpec::new().content("text*"))
                .node("text", NodeSpec::new().inline()),
        );
        assert!(matches!(unclosed, Err(SchemaError::Expression { .. })));
    }
}
