use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphEdge {
    pub source: String,
    pub dest: String,
}

impl GraphEdge {
    pub fn new(source: impl Into<String>, dest: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.dest
    }
}

/// Raw dependency graph as returned by `GET /api/graph`.
///
/// Nothing is validated here: edges may dangle, repeat, or form cycles.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageGraph {
    pub nodes: Vec<String>,
    pub edges: Vec<GraphEdge>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_graph_payload() {
        let json = r#"{"nodes": ["a", "b"], "edges": [{"source": "a", "dest": "b"}]}"#;
        let graph: PackageGraph = serde_json::from_str(json).unwrap();
        assert_eq!(graph.nodes, vec!["a", "b"]);
        assert_eq!(graph.edges, vec![GraphEdge::new("a", "b")]);
        assert!(!graph.edges[0].is_self_loop());
    }
}
