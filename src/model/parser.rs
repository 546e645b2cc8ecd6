//! Forgiving properties parser.
//!
//! Every input produces a tree. Incomplete constructs are kept with an open
//! end (`Node::end() == None`) so an in-progress document stays navigable.

use super::{Document, Node, NodeId, NodeKind, Span};

/// Deepest `${...}` nesting kept as expression nodes. A `${` nested deeper
/// stays literal text inside the innermost default.
pub const MAX_EXPRESSION_NESTING: usize = 64;

/// Parses properties text into a [`Document`]. Never fails.
pub fn parse(text: &str) -> Document {
    let mut parser = Parser::new(text);
    parser.document();
    parser.finish()
}

/// Parses a standalone value (no key, no delimiter). The returned id is the
/// value node, absent for empty input.
pub(crate) fn parse_value(text: &str) -> (Document, Option<NodeId>) {
    let mut parser = Parser::new(text);
    let len = parser.chars.len();
    let value = (len > 0).then(|| {
        let value = parser.push(NodeKind::Value, 0, NodeId::ROOT);
        parser.close(value, len);
        parser.segments(value, 0, len, false, 0);
        value
    });
    (parser.finish(), value)
}

struct Parser {
    chars: Vec<char>,
    nodes: Vec<Node>,
    pos: usize,
}

fn is_newline(c: char) -> bool {
    c == '\n' || c == '\r'
}

fn is_inline_space(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\x0c'
}

impl Parser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            nodes: vec![Node::new(NodeKind::Document, 0, None)],
            pos: 0,
        }
    }

    fn finish(mut self) -> Document {
        self.nodes[0].end = Some(self.chars.len());
        Document::from_parts(self.chars, self.nodes)
    }

    fn push(&mut self, kind: NodeKind, start: usize, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(kind, start, Some(parent)));
        self.nodes[parent.0].children.push(id);
        id
    }

    fn close(&mut self, id: NodeId, end: usize) {
        self.nodes[id.0].end = Some(end);
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn at(&self, index: usize) -> Option<char> {
        self.chars.get(index).copied()
    }

    fn document(&mut self) {
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.pos += 1;
            }
            match self.peek() {
                None => break,
                Some('#') | Some('!') => self.comment(),
                Some(_) => self.property(),
            }
        }
    }

    fn comment(&mut self) {
        let start = self.pos;
        while self.peek().is_some_and(|c| !is_newline(c)) {
            self.pos += 1;
        }
        let comment = self.push(NodeKind::Comment, start, NodeId::ROOT);
        self.close(comment, self.pos);
    }

    fn property(&mut self) {
        let start = self.pos;
        let property = self.push(NodeKind::Property, start, NodeId::ROOT);
        let key = self.push(NodeKind::Key, start, property);

        // An unterminated key leaves both the key and the property open.
        let Some(key_end) = self.scan_key() else {
            return;
        };
        self.close(key, key_end);
        let mut end = key_end;

        let space_start = self.pos;
        self.skip_inline_space();
        let delimiter = match self.peek() {
            Some('=') | Some(':') => {
                let delimiter = self.push(NodeKind::Delimiter, self.pos, property);
                self.pos += 1;
                self.close(delimiter, self.pos);
                Some(delimiter)
            }
            Some(c) if !is_newline(c) && self.pos > space_start => {
                let delimiter = self.push(NodeKind::Delimiter, space_start, property);
                self.close(delimiter, self.pos);
                Some(delimiter)
            }
            _ => None,
        };

        if delimiter.is_some() {
            end = self.pos;
            self.skip_inline_space();
            if self.peek().is_some_and(|c| !is_newline(c)) {
                let value_start = self.pos;
                let value = self.push(NodeKind::Value, value_start, property);
                let value_end = self.scan_value();
                self.close(value, value_end);
                self.segments(value, value_start, value_end, false, 0);
                end = value_end;
            }
        }

        self.close(property, end);
    }

    fn skip_inline_space(&mut self) {
        while self.peek().is_some_and(is_inline_space) {
            self.pos += 1;
        }
    }

    /// Steps over `\`, the line break and the leading whitespace of the
    /// continued line.
    fn skip_continuation(&mut self) {
        self.pos += 1;
        if self.peek() == Some('\r') {
            self.pos += 1;
        }
        if self.peek() == Some('\n') {
            self.pos += 1;
        }
        self.skip_inline_space();
    }

    /// Returns the key end, or `None` when input ends inside the key.
    fn scan_key(&mut self) -> Option<usize> {
        loop {
            match self.peek()? {
                '\\' => match self.at(self.pos + 1) {
                    Some(c) if is_newline(c) => {
                        self.skip_continuation();
                        self.peek()?;
                    }
                    Some(_) => self.pos += 2,
                    None => {
                        self.pos += 1;
                        return None;
                    }
                },
                c if c == '=' || c == ':' || c.is_whitespace() => return Some(self.pos),
                _ => self.pos += 1,
            }
        }
    }

    /// Scans to the end of the logical line, following continuations.
    fn scan_value(&mut self) -> usize {
        loop {
            match self.peek() {
                None => return self.pos,
                Some(c) if is_newline(c) => return self.pos,
                Some('\\') => match self.at(self.pos + 1) {
                    Some(c) if is_newline(c) => self.skip_continuation(),
                    Some(_) => self.pos += 2,
                    None => self.pos += 1,
                },
                Some(_) => self.pos += 1,
            }
        }
    }

    fn text(&mut self, parent: NodeId, start: usize, end: usize) {
        if start < end {
            let text = self.push(NodeKind::Text, start, parent);
            self.close(text, end);
        }
    }

    /// Splits `[from, to)` into text and expression children of `parent`.
    ///
    /// With `until_close` the scan stops at the `}` that closes the enclosing
    /// expression and returns its index. Returns `None` when an expression is
    /// left open at `to`. `nesting` counts the enclosing expressions.
    fn segments(&mut self, parent: NodeId, from: usize, to: usize, until_close: bool, nesting: usize) -> Option<usize> {
        let mut i = from;
        let mut text_start = from;
        let mut depth = 0usize;

        while i < to {
            match self.chars[i] {
                '\\' => i += 2,
                '$' if nesting < MAX_EXPRESSION_NESTING && i + 1 < to && self.chars[i + 1] == '{' => {
                    self.text(parent, text_start, i);
                    i = self.expression(parent, i, to, nesting)?;
                    text_start = i;
                }
                '{' if until_close => {
                    depth += 1;
                    i += 1;
                }
                '}' if until_close => {
                    if depth == 0 {
                        self.text(parent, text_start, i);
                        return Some(i);
                    }
                    depth -= 1;
                    i += 1;
                }
                _ => i += 1,
            }
        }

        let end = i.min(to);
        self.text(parent, text_start, end);
        (!until_close).then_some(end)
    }

    /// Parses the expression opening at `open` (`${`). Returns the index
    /// after its closing brace, or `None` if it is unterminated.
    fn expression(&mut self, parent: NodeId, open: usize, to: usize, nesting: usize) -> Option<usize> {
        let name_start = open + 2;
        let expression = self.push(
            NodeKind::Expression {
                name: Span {
                    start: name_start,
                    end: name_start,
                },
                default: None,
            },
            open,
            parent,
        );

        let mut i = name_start;
        while i < to && !matches!(self.chars[i], ':' | '}') {
            i += if self.chars[i] == '\\' { 2 } else { 1 };
        }
        let name_end = i.min(to);
        let name = Span {
            start: name_start,
            end: name_end,
        };
        self.nodes[expression.0].kind = NodeKind::Expression {
            name,
            default: None,
        };

        if name_end >= to {
            return None;
        }
        if self.chars[name_end] == '}' {
            self.close(expression, name_end + 1);
            return Some(name_end + 1);
        }

        let default_start = name_end + 1;
        let closed_at = self.segments(expression, default_start, to, true, nesting + 1);
        let default = Span {
            start: default_start,
            end: closed_at.unwrap_or(to),
        };
        self.nodes[expression.0].kind = NodeKind::Expression {
            name,
            default: Some(default),
        };

        let closed_at = closed_at?;
        self.close(expression, closed_at + 1);
        Some(closed_at + 1)
    }
}
