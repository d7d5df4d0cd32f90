// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Manifest Tree Walking
//
// Placeholder discovery and substitution over `serde_json::Value` trees.
// Sites are reported in traversal order (map insertion order, then array
// order); ignored subtrees are never entered.

use serde_json::Value;
use std::fmt;

use crate::domain::variable_name::{extract_placeholders, is_full_placeholder};

/// Step from a node to one of its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(index) => write!(f, "{}", index),
        }
    }
}

/// One segment of an ignored-subtree pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtreeSegment {
    Key(String),
    Index(usize),
    /// Any element of an array
    AnyIndex,
}

impl SubtreeSegment {
    fn matches(&self, segment: &PathSegment) -> bool {
        match (self, segment) {
            (SubtreeSegment::Key(expected), PathSegment::Key(key)) => expected == key,
            (SubtreeSegment::Index(expected), PathSegment::Index(index)) => expected == index,
            // Numeric pattern segments also name map keys such as "0"
            (SubtreeSegment::Index(expected), PathSegment::Key(key)) => expected.to_string() == *key,
            (SubtreeSegment::AnyIndex, PathSegment::Index(_)) => true,
            _ => false,
        }
    }
}

/// A subtree excluded from interpolation, e.g. `instance_groups.*.jobs.0.properties`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtreePath(pub Vec<SubtreeSegment>);

impl SubtreePath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.0.push(SubtreeSegment::Key(key.into()));
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.0.push(SubtreeSegment::Index(index));
        self
    }

    pub fn any_index(mut self) -> Self {
        self.0.push(SubtreeSegment::AnyIndex);
        self
    }

    /// Dot-separated pattern: `*` is any index, digits are an index, anything
    /// else a key.
    pub fn parse(pattern: &str) -> Self {
        Self(
            pattern
                .split('.')
                .filter(|segment| !segment.is_empty())
                .map(|segment| match segment {
                    "*" => SubtreeSegment::AnyIndex,
                    s => s
                        .parse::<usize>()
                        .map(SubtreeSegment::Index)
                        .unwrap_or_else(|_| SubtreeSegment::Key(s.to_string())),
                })
                .collect(),
        )
    }

    fn matches(&self, path: &[PathSegment]) -> bool {
        self.0.len() == path.len()
            && self
                .0
                .iter()
                .zip(path)
                .all(|(pattern, segment)| pattern.matches(segment))
    }
}

/// A string scalar that is exactly one placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderSite {
    pub path: Vec<PathSegment>,
    pub placeholder: String,
}

fn is_ignored(path: &[PathSegment], ignored: &[SubtreePath]) -> bool {
    ignored.iter().any(|subtree| subtree.matches(path))
}

fn walk<'a>(
    node: &'a Value,
    path: &mut Vec<PathSegment>,
    ignored: &[SubtreePath],
    visit: &mut dyn FnMut(&[PathSegment], &'a str),
) {
    if is_ignored(path, ignored) {
        return;
    }

    match node {
        Value::String(text) => visit(path, text),
        Value::Object(map) => {
            for (key, child) in map {
                path.push(PathSegment::Key(key.clone()));
                walk(child, path, ignored, visit);
                path.pop();
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                path.push(PathSegment::Index(index));
                walk(child, path, ignored, visit);
                path.pop();
            }
        }
        _ => {}
    }
}

/// Full-placeholder scalars in traversal order.
pub fn collect_sites(tree: &Value, ignored: &[SubtreePath]) -> Vec<PlaceholderSite> {
    let mut sites = Vec::new();
    walk(tree, &mut Vec::new(), ignored, &mut |path, text| {
        if is_full_placeholder(text) {
            sites.push(PlaceholderSite {
                path: path.to_vec(),
                placeholder: text.to_string(),
            });
        }
    });
    sites
}

/// Raw names of every `((...))` token in any string, embedded ones included.
/// Names are not validated.
pub fn collect_raw_names(tree: &Value, ignored: &[SubtreePath]) -> Vec<String> {
    let mut names = Vec::new();
    walk(tree, &mut Vec::new(), ignored, &mut |_, text| {
        for token in extract_placeholders(text) {
            let body = &token[2..token.len() - 2];
            names.push(body.strip_prefix('!').unwrap_or(body).to_string());
        }
    });
    names
}

/// Replace the node at `path`. Paths come from [`collect_sites`] over the
/// same tree, so every step exists.
pub fn replace_at(tree: &mut Value, path: &[PathSegment], value: Value) {
    let mut node = tree;
    for segment in path {
        let next = match (segment, node) {
            (PathSegment::Key(key), Value::Object(map)) => map.get_mut(key),
            (PathSegment::Index(index), Value::Array(items)) => items.get_mut(*index),
            _ => None,
        };
        match next {
            Some(child) => node = child,
            None => return,
        }
    }
    *node = value;
}
