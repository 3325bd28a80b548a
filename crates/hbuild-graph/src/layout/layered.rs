use std::collections::VecDeque;

use crate::sanitize::ValidGraph;

use super::{
    Direction, EdgeCurve, EdgeLayout, GraphLayout, LayoutEngine, LayoutError, LayoutOptions,
    NodeLayout, Point,
};

const DEFAULT_SWEEPS: usize = 4;

/// Layered (Sugiyama style) layout.
///
/// 1. Cycles are broken by reversing DFS back edges, visiting nodes and
///    edges in input order.
/// 2. Layers are longest-path depths from the sources (Kahn's algorithm).
/// 3. Each layer is reordered by barycenter for a fixed number of down/up
///    sweeps; ties keep the current order.
/// 4. Layers are centered on the widest one.
///
/// Self-loops take no part in steps 1-4 and are drawn beside their node.
/// The result depends only on the input, never on hashing or timing.
#[derive(Debug, Clone)]
pub struct LayeredLayout {
    sweeps: usize,
}

impl Default for LayeredLayout {
    fn default() -> Self {
        Self {
            sweeps: DEFAULT_SWEEPS,
        }
    }
}

impl LayeredLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sweeps(sweeps: usize) -> Self {
        Self { sweeps }
    }
}

impl LayoutEngine for LayeredLayout {
    fn layout(&self, graph: &ValidGraph, options: &LayoutOptions) -> Result<GraphLayout, LayoutError> {
        options.validate()?;
        let n = graph.nodes().len();

        // (edge index in graph, from, to) for every edge that takes part in layering.
        let links: Vec<(usize, usize, usize)> = graph
            .edges()
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_self_loop())
            .filter_map(|(i, e)| Some((i, graph.index_of(&e.source)?, graph.index_of(&e.dest)?)))
            .collect();
        let pairs: Vec<(usize, usize)> = links.iter().map(|&(_, u, v)| (u, v)).collect();

        let back = break_cycles(n, &pairs);
        let dag: Vec<(usize, usize)> = pairs
            .iter()
            .zip(&back)
            .map(|(&(u, v), &rev)| if rev { (v, u) } else { (u, v) })
            .collect();
        let layer = assign_layers(n, &dag);
        let rows = order_layers(&layer, &dag, self.sweeps);

        let mut reversed = vec![false; graph.edges().len()];
        for (&(i, _, _), &rev) in links.iter().zip(&back) {
            reversed[i] = rev;
        }

        let nodes = place_nodes(graph, &layer, &rows, options);
        let (mut width, mut height) = extent(&rows, options);

        let mut edges = Vec::with_capacity(graph.edges().len());
        for (i, edge) in graph.edges().iter().enumerate() {
            let (Some(s), Some(t)) = (graph.index_of(&edge.source), graph.index_of(&edge.dest))
            else {
                continue;
            };
            let (points, curve) = if s == t {
                (loop_route(&nodes[s], options), EdgeCurve::Loop)
            } else {
                (
                    step_route(&nodes[s], &nodes[t], options.direction),
                    EdgeCurve::SmoothStep,
                )
            };
            for p in &points {
                width = width.max(p.x);
                height = height.max(p.y);
            }
            edges.push(EdgeLayout {
                id: format!("{}-{}", edge.source, edge.dest),
                source: edge.source.clone(),
                target: edge.dest.clone(),
                points,
                curve,
                reversed: reversed[i],
            });
        }

        Ok(GraphLayout {
            direction: options.direction,
            nodes,
            edges,
            width,
            height,
        })
    }
}

/// Marks the edges that close a cycle during a DFS in input order.
/// Reversing exactly those edges leaves the graph acyclic.
fn break_cycles(n: usize, edges: &[(usize, usize)]) -> Vec<bool> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    let mut out: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, &(u, _)) in edges.iter().enumerate() {
        out[u].push(i);
    }

    let mut mark = vec![Mark::New; n];
    let mut back = vec![false; edges.len()];
    for root in 0..n {
        if mark[root] != Mark::New {
            continue;
        }
        mark[root] = Mark::Active;
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        while let Some(top) = stack.last_mut() {
            let (node, next) = *top;
            let Some(&e) = out[node].get(next) else {
                mark[node] = Mark::Done;
                stack.pop();
                continue;
            };
            top.1 += 1;
            let to = edges[e].1;
            match mark[to] {
                Mark::New => {
                    mark[to] = Mark::Active;
                    stack.push((to, 0));
                }
                Mark::Active => back[e] = true,
                Mark::Done => {}
            }
        }
    }
    back
}

/// Longest-path layering of an acyclic edge list.
fn assign_layers(n: usize, dag: &[(usize, usize)]) -> Vec<usize> {
    let mut in_degree = vec![0usize; n];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    for &(u, v) in dag {
        in_degree[v] += 1;
        dependents[u].push(v);
    }

    let mut layer = vec![0usize; n];
    let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    while let Some(u) = queue.pop_front() {
        for &v in &dependents[u] {
            layer[v] = layer[v].max(layer[u] + 1);
            in_degree[v] -= 1;
            if in_degree[v] == 0 {
                queue.push_back(v);
            }
        }
    }
    layer
}

/// Node order inside each layer after barycenter sweeps.
fn order_layers(layer: &[usize], dag: &[(usize, usize)], sweeps: usize) -> Vec<Vec<usize>> {
    let depth = layer.iter().max().map_or(0, |m| m + 1);
    let mut rows: Vec<Vec<usize>> = vec![Vec::new(); depth];
    for (node, &l) in layer.iter().enumerate() {
        rows[l].push(node);
    }

    let mut preds: Vec<Vec<usize>> = vec![Vec::new(); layer.len()];
    let mut succs: Vec<Vec<usize>> = vec![Vec::new(); layer.len()];
    for &(u, v) in dag {
        preds[v].push(u);
        succs[u].push(v);
    }

    let mut pos = vec![0usize; layer.len()];
    for row in &rows {
        for (i, &node) in row.iter().enumerate() {
            pos[node] = i;
        }
    }

    for _ in 0..sweeps {
        for row in rows.iter_mut().skip(1) {
            reorder(row, &preds, &mut pos);
        }
        for row in rows.iter_mut().rev().skip(1) {
            reorder(row, &succs, &mut pos);
        }
    }
    rows
}

fn reorder(row: &mut [usize], neighbours: &[Vec<usize>], pos: &mut [usize]) {
    let mut keyed: Vec<(f64, usize, usize)> = row
        .iter()
        .enumerate()
        .map(|(i, &node)| {
            let adj = &neighbours[node];
            let key = if adj.is_empty() {
                i as f64
            } else {
                adj.iter().map(|&m| pos[m] as f64).sum::<f64>() / adj.len() as f64
            };
            (key, i, node)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    for (i, (_, _, node)) in keyed.into_iter().enumerate() {
        row[i] = node;
        pos[node] = i;
    }
}

/// Box size along the layer and across layers.
fn box_axes(options: &LayoutOptions) -> (f64, f64) {
    match options.direction {
        Direction::Down => (options.node_width, options.node_height),
        Direction::Right => (options.node_height, options.node_width),
    }
}

fn row_span(count: usize, options: &LayoutOptions) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let (along, _) = box_axes(options);
    count as f64 * along + (count - 1) as f64 * options.node_spacing
}

fn place_nodes(
    graph: &ValidGraph,
    layer: &[usize],
    rows: &[Vec<usize>],
    options: &LayoutOptions,
) -> Vec<NodeLayout> {
    let (along, across) = box_axes(options);
    let widest = rows.iter().map(|r| row_span(r.len(), options)).fold(0.0, f64::max);

    let mut placed: Vec<Option<NodeLayout>> = vec![None; graph.nodes().len()];
    for (l, row) in rows.iter().enumerate() {
        let offset = (widest - row_span(row.len(), options)) / 2.0;
        let depth = l as f64 * (across + options.layer_spacing);
        for (i, &node) in row.iter().enumerate() {
            let breadth = offset + i as f64 * (along + options.node_spacing);
            let (x, y) = match options.direction {
                Direction::Down => (breadth, depth),
                Direction::Right => (depth, breadth),
            };
            placed[node] = Some(NodeLayout {
                id: graph.nodes()[node].clone(),
                x,
                y,
                width: options.node_width,
                height: options.node_height,
                layer: layer[node],
            });
        }
    }
    placed.into_iter().flatten().collect()
}

fn extent(rows: &[Vec<usize>], options: &LayoutOptions) -> (f64, f64) {
    let (_, across) = box_axes(options);
    let breadth = rows.iter().map(|r| row_span(r.len(), options)).fold(0.0, f64::max);
    let depth = match rows.len() {
        0 => 0.0,
        d => d as f64 * across + (d - 1) as f64 * options.layer_spacing,
    };
    match options.direction {
        Direction::Down => (breadth, depth),
        Direction::Right => (depth, breadth),
    }
}

/// Leave the source on the side facing the target, meet halfway, enter the
/// target on the side facing the source.
fn step_route(src: &NodeLayout, dst: &NodeLayout, direction: Direction) -> Vec<Point> {
    let forward = dst.layer > src.layer;
    match direction {
        Direction::Down => {
            let sx = src.x + src.width / 2.0;
            let tx = dst.x + dst.width / 2.0;
            let (sy, ty) = if forward {
                (src.y + src.height, dst.y)
            } else {
                (src.y, dst.y + dst.height)
            };
            let mid = (sy + ty) / 2.0;
            vec![
                Point::new(sx, sy),
                Point::new(sx, mid),
                Point::new(tx, mid),
                Point::new(tx, ty),
            ]
        }
        Direction::Right => {
            let sy = src.y + src.height / 2.0;
            let ty = dst.y + dst.height / 2.0;
            let (sx, tx) = if forward {
                (src.x + src.width, dst.x)
            } else {
                (src.x, dst.x + dst.width)
            };
            let mid = (sx + tx) / 2.0;
            vec![
                Point::new(sx, sy),
                Point::new(mid, sy),
                Point::new(mid, ty),
                Point::new(tx, ty),
            ]
        }
    }
}

/// Loop off the node's side facing away from the flow.
fn loop_route(node: &NodeLayout, options: &LayoutOptions) -> Vec<Point> {
    let reach = options.node_spacing / 2.0;
    match options.direction {
        Direction::Down => {
            let x = node.x + node.width;
            let (a, b) = (node.y + node.height / 4.0, node.y + node.height * 0.75);
            vec![
                Point::new(x, a),
                Point::new(x + reach, a),
                Point::new(x + reach, b),
                Point::new(x, b),
            ]
        }
        Direction::Right => {
            let y = node.y + node.height;
            let (a, b) = (node.x + node.width / 4.0, node.x + node.width * 0.75);
            vec![
                Point::new(a, y),
                Point::new(a, y + reach),
                Point::new(b, y + reach),
                Point::new(b, y),
            ]
        }
    }
}
