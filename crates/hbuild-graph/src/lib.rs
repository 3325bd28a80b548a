//! Turns the raw `/api/graph` payload into a positioned, drawable graph.

pub mod builder;
pub mod layout;
pub mod sanitize;

pub use builder::{GraphBuilder, RenderedGraph};
pub use layout::{
    Direction, EdgeCurve, EdgeLayout, GraphLayout, LayeredLayout, LayoutEngine, LayoutError,
    LayoutOptions, NodeLayout, Point,
};
pub use sanitize::{sanitize, GraphIssue, ValidGraph};
