use std::sync::{Arc, Mutex};

use serde::Serialize;

use hbuild_core::PackageGraph;

use crate::layout::{GraphLayout, LayeredLayout, LayoutEngine, LayoutError, LayoutOptions};
use crate::sanitize::{sanitize, GraphIssue};

/// Drawable graph plus what was repaired on the way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedGraph {
    pub layout: GraphLayout,
    pub issues: Vec<GraphIssue>,
}

/// Sanitizes and lays out graph payloads, reusing the previous result when
/// the payload has not changed.
pub struct GraphBuilder {
    engine: Box<dyn LayoutEngine>,
    options: LayoutOptions,
    last: Mutex<Option<(PackageGraph, Arc<RenderedGraph>)>>,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new(Box::new(LayeredLayout::new()), LayoutOptions::default())
    }
}

impl GraphBuilder {
    pub fn new(engine: Box<dyn LayoutEngine>, options: LayoutOptions) -> Self {
        Self {
            engine,
            options,
            last: Mutex::new(None),
        }
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    pub fn build(&self, raw: &PackageGraph) -> Result<Arc<RenderedGraph>, LayoutError> {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((input, rendered)) = last.as_ref() {
            if input == raw {
                return Ok(Arc::clone(rendered));
            }
        }

        let (graph, issues) = sanitize(raw);
        let layout = self.engine.layout(&graph, &self.options)?;
        tracing::debug!(
            nodes = layout.nodes.len(),
            edges = layout.edges.len(),
            issues = issues.len(),
            "graph laid out"
        );
        let rendered = Arc::new(RenderedGraph { layout, issues });
        *last = Some((raw.clone(), Arc::clone(&rendered)));
        Ok(rendered)
    }
}
