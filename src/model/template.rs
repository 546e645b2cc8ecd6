//! Expression view of a property value.
//!
//! A [`Template`] is the logical, continuation-free form of a value node:
//! literal text interleaved with `${name:default}` expressions. Resolution and
//! the property graph only ever look at templates.

use super::key::strip_continuations;
use super::parser::parse_value;
use super::{Document, NodeId, NodeKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Expression(Expression),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    /// Referenced property name, trimmed.
    pub name: String,
    /// `None` for `${name}`; `Some(vec![])` for `${name:}`.
    pub default: Option<Vec<Segment>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parses a raw value, e.g. one read from a YAML source.
    pub fn parse(text: &str) -> Self {
        match parse_value(text) {
            (doc, Some(value)) => Self::from_node(&doc, value),
            (_, None) => Self::default(),
        }
    }

    /// Builds the template for a value (or expression) node.
    ///
    /// Unterminated expressions are kept as literal text.
    pub fn from_node(doc: &Document, id: NodeId) -> Self {
        Self {
            segments: collect(doc, id),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn has_expressions(&self) -> bool {
        self.segments
            .iter()
            .any(|segment| matches!(segment, Segment::Expression(_)))
    }

    /// Every referenced name, including those nested in defaults.
    pub fn references(&self) -> Vec<&str> {
        let mut names = Vec::new();
        push_references(&self.segments, &mut names);
        names
    }
}

fn push_references<'a>(segments: &'a [Segment], names: &mut Vec<&'a str>) {
    for segment in segments {
        if let Segment::Expression(expression) = segment {
            names.push(&expression.name);
            if let Some(default) = &expression.default {
                push_references(default, names);
            }
        }
    }
}

fn collect(doc: &Document, parent: NodeId) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::new();

    for child in doc.children(parent) {
        let node = doc.node(*child);
        let segment = match node.kind() {
            NodeKind::Text => Segment::Text(strip_continuations(&doc.node_text(*child))),
            NodeKind::Expression { name, default } if node.end().is_some() => {
                Segment::Expression(Expression {
                    name: strip_continuations(&doc.span_text(name)).trim().to_string(),
                    default: default.map(|_| collect(doc, *child)),
                })
            }
            NodeKind::Expression { .. } => {
                Segment::Text(strip_continuations(&doc.node_text(*child)))
            }
            _ => continue,
        };

        match (segments.last_mut(), segment) {
            (Some(Segment::Text(previous)), Segment::Text(text)) => previous.push_str(&text),
            (_, segment) => segments.push(segment),
        }
    }

    segments
}
