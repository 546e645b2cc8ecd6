//! Offset-addressable document model for properties files.
//!
//! Nodes live in an arena owned by [`Document`] and refer to each other by
//! [`NodeId`]. Parents are plain ids, so the tree has a single owner and no
//! reference cycles. Offsets are character offsets into the original text.

pub mod key;
mod parser;
pub mod template;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

pub use parser::{parse, MAX_EXPRESSION_NESTING};
pub use template::{Expression, Segment, Template};

/// Index of a node inside its [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// The document root.
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// A `[start, end)` character range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    /// `#` or `!` comment line.
    Comment,
    Property,
    Key,
    /// `=`, `:` or the whitespace run separating key and value.
    Delimiter,
    Value,
    /// Literal text inside a value or an expression default.
    Text,
    /// `${name}` or `${name:default}`. The default's text and nested
    /// expressions are the node's children.
    Expression { name: Span, default: Option<Span> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    kind: NodeKind,
    start: usize,
    end: Option<usize>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(kind: NodeKind, start: usize, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            start,
            end: None,
            parent,
            children: Vec::new(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn start(&self) -> usize {
        self.start
    }

    /// End offset, or `None` when the parser hit end of input before the
    /// node was closed.
    pub fn end(&self) -> Option<usize> {
        self.end
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    fn contains(&self, offset: usize) -> bool {
        self.start <= offset && self.end.map_or(true, |end| offset <= end)
    }
}

/// A parsed properties document.
///
/// Produced by [`parse`], which accepts any input. Displaying a document
/// writes back the exact text it was parsed from.
#[derive(Debug, Clone)]
pub struct Document {
    chars: Vec<char>,
    nodes: Vec<Node>,
    /// Qualified key to its last defining property, built on first lookup.
    keys: OnceLock<BTreeMap<String, NodeId>>,
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.chars == other.chars && self.nodes == other.nodes
    }
}

impl Eq for Document {}

impl Document {
    pub(crate) fn from_parts(chars: Vec<char>, nodes: Vec<Node>) -> Self {
        Self {
            chars,
            nodes,
            keys: OnceLock::new(),
        }
    }

    /// Number of characters in the source text.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Properties in document order.
    pub fn properties(&self) -> impl Iterator<Item = Property<'_>> {
        self.children(NodeId::ROOT)
            .iter()
            .filter(move |id| self.node(**id).kind == NodeKind::Property)
            .map(move |id| Property { doc: self, id: *id })
    }

    /// Typed view of a property node.
    pub fn property(&self, id: NodeId) -> Option<Property<'_>> {
        (self.node(id).kind == NodeKind::Property).then_some(Property { doc: self, id })
    }

    /// The last property defined under a qualified key.
    pub fn find_property(&self, key: &str) -> Option<Property<'_>> {
        let id = *self.key_index().get(key)?;
        Some(Property { doc: self, id })
    }

    /// Qualified keys of all properties, sorted and deduplicated.
    pub fn property_keys(&self) -> impl Iterator<Item = &str> {
        self.key_index().keys().map(String::as_str)
    }

    fn key_index(&self) -> &BTreeMap<String, NodeId> {
        self.keys.get_or_init(|| {
            self.properties()
                .map(|property| (property.property_name_with_profile(), property.id))
                .filter(|(key, _)| !key.is_empty())
                .collect()
        })
    }

    /// Raw source text of a node, continuation sequences included.
    pub fn node_text(&self, id: NodeId) -> String {
        let node = self.node(id);
        self.slice(node.start, self.effective_end(id))
    }

    pub fn span_text(&self, span: Span) -> String {
        self.slice(span.start, span.end)
    }

    fn slice(&self, start: usize, end: usize) -> String {
        let end = end.min(self.chars.len());
        let start = start.min(end);
        self.chars[start..end].iter().collect()
    }

    /// End of a node, falling back to the nearest closed ancestor (or the
    /// end of input) for unterminated nodes.
    pub(crate) fn effective_end(&self, id: NodeId) -> usize {
        let mut current = Some(id);
        while let Some(id) = current {
            let node = self.node(id);
            if let Some(end) = node.end {
                return end;
            }
            current = node.parent;
        }
        self.chars.len()
    }

    /// Finds the most specific node at `offset`.
    ///
    /// Total over `0..=len()`. The document itself is returned only when it
    /// has no children; an offset between entries maps to the closest
    /// preceding entry.
    pub fn find_node_at(&self, offset: usize) -> NodeId {
        let children = self.children(NodeId::ROOT);
        let Some(first) = children.first() else {
            return NodeId::ROOT;
        };
        let entry = children
            .iter()
            .find(|id| self.node(**id).contains(offset))
            .or_else(|| {
                children
                    .iter()
                    .rev()
                    .find(|id| self.node(**id).start <= offset)
            })
            .unwrap_or(first);

        match self.property(*entry) {
            Some(property) => property.find_node_at(offset),
            None => *entry,
        }
    }

    /// Descends into value children (text and expressions), returning
    /// `id` itself when no child contains `offset`.
    fn find_in_segments(&self, id: NodeId, offset: usize) -> NodeId {
        let child = self.children(id).iter().find(|child| {
            let node = self.node(**child);
            node.start <= offset && node.end.map_or(true, |end| offset < end)
        });
        match child {
            Some(child) => self.find_in_segments(*child, offset),
            None => id,
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.chars.iter().try_for_each(|c| write!(f, "{c}"))
    }
}

/// Borrowed view of one `[%profile.]name <delim> value` entry.
#[derive(Debug, Clone, Copy)]
pub struct Property<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl<'a> Property<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    fn child(&self, kind: NodeKind) -> Option<NodeId> {
        self.doc
            .children(self.id)
            .iter()
            .copied()
            .find(|child| self.doc.node(*child).kind == kind)
    }

    /// Every property has a key; this is `None` only for a malformed arena.
    pub fn key(&self) -> Option<NodeId> {
        self.child(NodeKind::Key)
    }

    pub fn delimiter(&self) -> Option<NodeId> {
        self.child(NodeKind::Delimiter)
    }

    pub fn value(&self) -> Option<NodeId> {
        self.child(NodeKind::Value)
    }

    /// The key with continuations removed, e.g. `%dev.key1.key2`.
    pub fn property_name_with_profile(&self) -> String {
        self.key()
            .map(|key| key::strip_continuations(&self.doc.node_text(key)))
            .unwrap_or_default()
    }

    pub fn profile(&self) -> Option<String> {
        let full = self.property_name_with_profile();
        key::split_profile(&full).0.map(str::to_string)
    }

    /// The key without its profile; empty for a bare `%dev.`.
    pub fn property_name(&self) -> String {
        let full = self.property_name_with_profile();
        key::base_name(&full).to_string()
    }

    /// The logical value, continuations removed.
    pub fn property_value(&self) -> Option<String> {
        self.value()
            .map(|value| key::strip_continuations(&self.doc.node_text(value)))
    }

    pub fn template(&self) -> Option<Template> {
        self.value().map(|value| Template::from_node(self.doc, value))
    }

    /// Whether the value contains at least one `${...}` expression.
    pub fn is_value_expression(&self) -> bool {
        self.value().is_some_and(|value| {
            self.doc
                .children(value)
                .iter()
                .map(|child| self.doc.node(*child))
                .any(|node| matches!(node.kind, NodeKind::Expression { .. }) && node.end.is_some())
        })
    }

    pub fn find_node_at(&self, offset: usize) -> NodeId {
        let Some(key) = self.key() else {
            return self.id;
        };
        if self.doc.node(key).end.is_none() {
            return key;
        }
        let Some(delimiter) = self.delimiter() else {
            return key;
        };
        let delimiter_start = self.doc.node(delimiter).start;
        if offset == delimiter_start {
            return delimiter;
        }
        if offset > delimiter_start {
            return match self.value() {
                Some(value) => self.doc.find_in_segments(value, offset),
                None => delimiter,
            };
        }
        key
    }
}
