use std::fmt::Write as _;

use anyhow::Context as _;

use hbuild_graph::{Direction, EdgeCurve, GraphBuilder, GraphIssue, LayeredLayout, LayoutOptions, RenderedGraph};

use crate::context::Context;

/// `hbctl graph [--json] [--horizontal]`
pub fn execute(ctx: &Context, json: bool, horizontal: bool) -> anyhow::Result<()> {
    let server = ctx.server()?;
    let raw = ctx
        .runtime()?
        .block_on(server.graph())
        .context("failed to load dependency graph")?;

    let options = LayoutOptions {
        direction: if horizontal {
            Direction::Right
        } else {
            Direction::Down
        },
        ..LayoutOptions::default()
    };
    let builder = GraphBuilder::new(Box::new(LayeredLayout::new()), options);
    let rendered = builder.build(&raw)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&*rendered)?);
    } else {
        print!("{}", render_text(&rendered));
    }
    Ok(())
}

/// Layers in flow order, each listed in drawing order, then edges and issues.
pub(crate) fn render_text(graph: &RenderedGraph) -> String {
    let layout = &graph.layout;
    if layout.nodes.is_empty() {
        return "Empty graph.\n".to_string();
    }

    let mut out = String::new();
    for layer in 0..layout.layers() {
        let mut nodes: Vec<_> = layout.nodes.iter().filter(|n| n.layer == layer).collect();
        nodes.sort_by(|a, b| {
            let (ka, kb) = match layout.direction {
                Direction::Down => (a.x, b.x),
                Direction::Right => (a.y, b.y),
            };
            ka.total_cmp(&kb)
        });
        let names: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        let _ = writeln!(out, "layer {layer}: {}", names.join("  "));
    }

    if !layout.edges.is_empty() {
        let _ = writeln!(out);
        for edge in &layout.edges {
            let note = match (edge.curve, edge.reversed) {
                (EdgeCurve::Loop, _) => "  (self)",
                (_, true) => "  (cycle)",
                _ => "",
            };
            let _ = writeln!(out, "{} -> {}{note}", edge.source, edge.target);
        }
    }

    for issue in &graph.issues {
        let _ = writeln!(out, "warning: {}", describe(issue));
    }
    out
}

fn describe(issue: &GraphIssue) -> String {
    match issue {
        GraphIssue::DuplicateNode { name } => format!("node {name} listed more than once"),
        GraphIssue::DanglingEdge { source, dest } => {
            format!("edge {source} -> {dest} names an unknown node, dropped")
        }
        GraphIssue::DuplicateEdge { source, dest } => {
            format!("edge {source} -> {dest} listed more than once")
        }
        GraphIssue::SelfLoop { name } => format!("{name} depends on itself"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hbuild_core::{GraphEdge, PackageGraph};

    fn build(raw: &PackageGraph) -> std::sync::Arc<RenderedGraph> {
        GraphBuilder::default().build(raw).unwrap()
    }

    #[test]
    fn lists_layers_and_edges() {
        let raw = PackageGraph {
            nodes: vec!["a".into(), "b".into(), "c".into()],
            edges: vec![GraphEdge::new("a", "b"), GraphEdge::new("a", "c")],
        };
        let text = render_text(&build(&raw));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "layer 0: a");
        assert_eq!(lines[1], "layer 1: b  c");
        assert!(lines.contains(&"a -> b"));
        assert!(lines.contains(&"a -> c"));
    }

    #[test]
    fn marks_cycles_loops_and_issues() {
        let raw = PackageGraph {
            nodes: vec!["a".into(), "b".into()],
            edges: vec![
                GraphEdge::new("a", "b"),
                GraphEdge::new("b", "a"),
                GraphEdge::new("b", "b"),
                GraphEdge::new("b", "ghost"),
            ],
        };
        let text = render_text(&build(&raw));
        assert!(text.contains("b -> a  (cycle)"));
        assert!(text.contains("b -> b  (self)"));
        assert!(text.contains("warning: edge b -> ghost names an unknown node, dropped"));
        assert!(text.contains("warning: b depends on itself"));
    }

    #[test]
    fn empty_graph() {
        assert_eq!(render_text(&build(&PackageGraph::default())), "Empty graph.\n");
    }
}
