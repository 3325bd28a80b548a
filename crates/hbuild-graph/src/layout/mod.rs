//! Positioned graph types and the [`LayoutEngine`] seam.

mod layered;

pub use layered::LayeredLayout;

use serde::Serialize;

use crate::sanitize::ValidGraph;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Dependencies flow top to bottom.
    #[default]
    Down,
    /// Dependencies flow left to right.
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOptions {
    pub direction: Direction,
    pub node_width: f64,
    pub node_height: f64,
    /// Gap between neighbours in the same layer.
    pub node_spacing: f64,
    /// Gap between consecutive layers.
    pub layer_spacing: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            direction: Direction::Down,
            node_width: 150.0,
            node_height: 50.0,
            node_spacing: 80.0,
            layer_spacing: 100.0,
        }
    }
}

impl LayoutOptions {
    pub fn validate(&self) -> Result<(), LayoutError> {
        let dims = [
            ("node_width", self.node_width, false),
            ("node_height", self.node_height, false),
            ("node_spacing", self.node_spacing, true),
            ("layer_spacing", self.layer_spacing, true),
        ];
        for (name, value, zero_ok) in dims {
            let bad = !value.is_finite() || value < 0.0 || (!zero_ok && value == 0.0);
            if bad {
                return Err(LayoutError::InvalidOption { name, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("invalid layout option {name}: {value}")]
    InvalidOption { name: &'static str, value: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Node box; `x`/`y` is the top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeLayout {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub layer: usize,
}

impl NodeLayout {
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeCurve {
    /// Orthogonal segments with rounded corners.
    SmoothStep,
    /// Self-dependency drawn beside its node.
    Loop,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeLayout {
    /// `"{source}-{target}"`.
    pub id: String,
    pub source: String,
    pub target: String,
    pub points: Vec<Point>,
    pub curve: EdgeCurve,
    /// Edge was reversed to break a cycle and points against the flow.
    pub reversed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphLayout {
    pub direction: Direction,
    pub nodes: Vec<NodeLayout>,
    pub edges: Vec<EdgeLayout>,
    pub width: f64,
    pub height: f64,
}

impl GraphLayout {
    pub fn node(&self, id: &str) -> Option<&NodeLayout> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn layers(&self) -> usize {
        self.nodes.iter().map(|n| n.layer + 1).max().unwrap_or(0)
    }
}

/// Computes node positions and edge routes for a sanitized graph.
pub trait LayoutEngine: Send + Sync {
    fn layout(&self, graph: &ValidGraph, options: &LayoutOptions) -> Result<GraphLayout, LayoutError>;
}
