use std::collections::{HashMap, HashSet};

use serde::Serialize;

use hbuild_core::{GraphEdge, PackageGraph};

/// Something in the raw graph that had to be repaired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphIssue {
    DuplicateNode { name: String },
    /// Edge to or from a node that is not in `nodes`; dropped.
    DanglingEdge { source: String, dest: String },
    DuplicateEdge { source: String, dest: String },
    /// Kept as an edge, ignored for layering.
    SelfLoop { name: String },
}

/// Graph with unique nodes and unique edges between known nodes.
///
/// Node and edge order follow first appearance in the raw payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidGraph {
    nodes: Vec<String>,
    edges: Vec<GraphEdge>,
    index: HashMap<String, usize>,
}

impl ValidGraph {
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

pub fn sanitize(raw: &PackageGraph) -> (ValidGraph, Vec<GraphIssue>) {
    let mut graph = ValidGraph::default();
    let mut issues = Vec::new();

    for name in &raw.nodes {
        if graph.index.contains_key(name) {
            issues.push(GraphIssue::DuplicateNode { name: name.clone() });
            continue;
        }
        graph.index.insert(name.clone(), graph.nodes.len());
        graph.nodes.push(name.clone());
    }

    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    for edge in &raw.edges {
        if !graph.index.contains_key(&edge.source) || !graph.index.contains_key(&edge.dest) {
            tracing::warn!(source = %edge.source, dest = %edge.dest, "dropping edge to unknown package");
            issues.push(GraphIssue::DanglingEdge {
                source: edge.source.clone(),
                dest: edge.dest.clone(),
            });
            continue;
        }
        if !seen.insert((edge.source.as_str(), edge.dest.as_str())) {
            issues.push(GraphIssue::DuplicateEdge {
                source: edge.source.clone(),
                dest: edge.dest.clone(),
            });
            continue;
        }
        if edge.is_self_loop() {
            tracing::debug!(package = %edge.source, "self-dependency");
            issues.push(GraphIssue::SelfLoop {
                name: edge.source.clone(),
            });
        }
        graph.edges.push(edge.clone());
    }

    (graph, issues)
}
