//! Reference graph between properties.

use std::collections::HashMap;
use std::sync::OnceLock;

use super::{reference_target, PropertyLookup};
use crate::model::key::split_profile;
use crate::model::Template;

/// Directed graph where an edge `a -> b` means "the value of `a` references `b`".
///
/// Vertices are qualified keys. Acyclicity is computed once and cached until
/// the next edge is added.
#[derive(Debug, Clone, Default)]
pub struct PropertyGraph {
    names: Vec<String>,
    index: HashMap<String, usize>,
    edges: Vec<Vec<usize>>,
    acyclic: OnceLock<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

impl PropertyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph for every key `lookup` defines.
    ///
    /// A reference from a profiled key prefers the same-profile target when
    /// one is defined, like resolution does.
    pub fn build(lookup: &dyn PropertyLookup) -> Self {
        let mut graph = Self::new();
        for key in lookup.keys() {
            graph.add_vertex(&key);
            let Some(raw) = lookup.raw_value(&key) else {
                continue;
            };
            let template = Template::parse(&raw);
            let profile = split_profile(&key).0;
            for reference in template.references() {
                let target = reference_target(lookup, profile, reference);
                graph.add_edge(&key, &target);
            }
        }
        graph
    }

    pub fn add_vertex(&mut self, name: &str) -> usize {
        if let Some(index) = self.index.get(name) {
            return *index;
        }
        let index = self.names.len();
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), index);
        self.edges.push(Vec::new());
        self.acyclic = OnceLock::new();
        index
    }

    pub fn add_edge(&mut self, from: &str, to: &str) {
        let from = self.add_vertex(from);
        let to = self.add_vertex(to);
        if !self.edges[from].contains(&to) {
            self.edges[from].push(to);
            self.acyclic = OnceLock::new();
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn vertex_count(&self) -> usize {
        self.names.len()
    }

    /// Names referenced by `name`'s value.
    pub fn dependencies(&self, name: &str) -> Vec<&str> {
        self.index
            .get(name)
            .map(|index| {
                self.edges[*index]
                    .iter()
                    .map(|target| self.names[*target].as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_acyclic(&self) -> bool {
        *self.acyclic.get_or_init(|| self.find_cycle().is_none())
    }

    /// Returns the vertices of one cycle, in edge order, if any exists.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut marks = vec![Mark::Unvisited; self.names.len()];

        for root in 0..self.names.len() {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            marks[root] = Mark::InProgress;
            let mut stack = vec![(root, 0usize)];

            while let Some((node, next)) = stack.last().copied() {
                let Some(target) = self.edges[node].get(next).copied() else {
                    marks[node] = Mark::Done;
                    stack.pop();
                    continue;
                };
                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }
                match marks[target] {
                    Mark::Unvisited => {
                        marks[target] = Mark::InProgress;
                        stack.push((target, 0));
                    }
                    Mark::InProgress => {
                        let start = stack.iter().position(|(n, _)| *n == target).unwrap_or(0);
                        return Some(
                            stack[start..]
                                .iter()
                                .map(|(n, _)| self.names[*n].clone())
                                .collect(),
                        );
                    }
                    Mark::Done => {}
                }
            }
        }

        None
    }
}
