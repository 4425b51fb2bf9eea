mod edge;
mod error;
pub mod svg;
mod vertex;

pub use edge::{
    BoxEdgeRenderer, Branch, EdgeRenderer, RoutedEdge, SourceGroup, TargetInfo, group_edges,
    route_group,
};
pub use error::ErrorRenderer;
pub use svg::{SvgSurface, render_svg, write_output_png, write_output_svg};
pub use vertex::{
    BoxVertexRenderer, LinePlacement, RunPlacement, VertexDrawing, VertexMetrics, VertexRenderer,
};

use crate::config::{Config, LayoutConfig};
use crate::ir::{Graph, GraphId, VertexHandle};
use crate::layout::{Layout, LayoutCache, LayoutError, compute_layout};
use crate::surface::{DrawingSurface, TextMeasurer};

#[derive(Debug, Clone, PartialEq)]
pub enum RenderState {
    /// Nothing preprocessed yet.
    Empty,
    Ready,
    /// Integrity or layout failure; the error renderer paints `message`.
    Failed { message: String },
}

/// Preprocess/render pipeline for one graph panel.
///
/// Metrics, layout and drawing data are cached for the current graph and rebuilt only
/// when the graph identity or its vertex count changes.
pub struct GraphRenderer {
    vertex_renderer: Box<dyn VertexRenderer>,
    edge_renderer: Box<dyn EdgeRenderer>,
    error_renderer: ErrorRenderer,
    layout_config: LayoutConfig,
    cache: LayoutCache,
    graph: Option<(GraphId, usize)>,
    metrics: Vec<VertexMetrics>,
    prepared: bool,
    state: RenderState,
}

impl GraphRenderer {
    pub fn new(config: &Config) -> Self {
        Self::with_renderers(
            config,
            Box::new(BoxVertexRenderer::new(config)),
            Box::new(BoxEdgeRenderer::new(config)),
        )
    }

    pub fn with_renderers(
        config: &Config,
        vertex_renderer: Box<dyn VertexRenderer>,
        edge_renderer: Box<dyn EdgeRenderer>,
    ) -> Self {
        Self {
            vertex_renderer,
            edge_renderer,
            error_renderer: ErrorRenderer::new(config),
            layout_config: config.layout.clone(),
            cache: LayoutCache::new(),
            graph: None,
            metrics: Vec::new(),
            prepared: false,
            state: RenderState::Empty,
        }
    }

    fn clear(&mut self) {
        self.cache.invalidate();
        self.metrics.clear();
        self.vertex_renderer.clear();
        self.edge_renderer.clear();
        self.prepared = false;
    }

    /// Brings drawing data up to date with `graph`.
    ///
    /// A graph seen for the first time is renumbered. A known graph whose vertex count
    /// changed only drops its caches, so vertices added after numbering fail the
    /// integrity check until the owner renumbers them.
    pub fn preprocess(&mut self, measurer: &dyn TextMeasurer, graph: &mut Graph) -> &RenderState {
        let id = graph.id();
        let count = graph.vertex_count();
        match self.graph {
            Some((known, _)) if known != id => {
                tracing::debug!(graph = ?id, "new graph, renumbering vertices");
                self.clear();
                graph.update_identifiers();
            }
            None => {
                graph.update_identifiers();
            }
            Some((_, known_count)) if known_count != count => {
                tracing::debug!(graph = ?id, from = known_count, to = count, "vertex count changed");
                self.clear();
            }
            Some(_) => {}
        }
        self.graph = Some((id, count));

        if !graph.verify_integrity() {
            self.fail(LayoutError::Integrity);
            return &self.state;
        }
        if self.prepared {
            return &self.state;
        }

        if self.metrics.len() != count {
            let renderer = &self.vertex_renderer;
            self.metrics = graph
                .vertices()
                .iter()
                .map(|vertex| renderer.metrics(measurer, vertex))
                .collect();
        }

        let sizes: Vec<(f32, f32)> = self.metrics.iter().map(|m| (m.width, m.height)).collect();
        let layout_config = &self.layout_config;
        let graph_ref: &Graph = graph;
        let result = self
            .cache
            .get_or_compute(graph_ref, || compute_layout(graph_ref, &sizes, layout_config))
            .clone();

        match result {
            Ok(layout) => {
                self.vertex_renderer
                    .preprocess(measurer, graph_ref, &layout, &self.metrics);
                self.edge_renderer.preprocess(&layout);
                self.prepared = true;
                self.state = RenderState::Ready;
            }
            Err(err) => self.fail(err),
        }
        &self.state
    }

    fn fail(&mut self, err: LayoutError) {
        let message = err.to_string();
        if self.state != (RenderState::Failed { message: message.clone() }) {
            tracing::warn!(error = %message, "graph cannot be displayed");
        }
        self.vertex_renderer.clear();
        self.edge_renderer.clear();
        self.prepared = false;
        self.state = RenderState::Failed { message };
    }

    /// Paints edges then vertices, or the error display. The caller sets the camera
    /// transform beforehand.
    pub fn render(&self, surface: &mut dyn DrawingSurface, graph: &Graph, zoom: f32) {
        match &self.state {
            RenderState::Empty => {}
            RenderState::Ready => {
                self.edge_renderer.render(surface, graph);
                self.vertex_renderer.render(surface, graph, zoom);
            }
            RenderState::Failed { message } => self.error_renderer.render(surface, message),
        }
    }

    /// Deselects every vertex, then selects the one whose box contains the canvas point.
    pub fn select(&self, graph: &mut Graph, x: f32, y: f32) -> Option<VertexHandle> {
        graph.clear_selection();
        let hit = self
            .vertex_renderer
            .drawings()
            .iter()
            .find(|drawing| drawing.contains(x, y))
            .map(|drawing| VertexHandle::new(drawing.id))?;
        graph.select(hit);
        Some(hit)
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn layout(&self) -> Option<&Layout> {
        match self.cache.get() {
            Some(Ok(layout)) => Some(layout),
            _ => None,
        }
    }

    pub fn metrics(&self) -> &[VertexMetrics] {
        &self.metrics
    }

    pub fn vertex_drawings(&self) -> &[VertexDrawing] {
        self.vertex_renderer.drawings()
    }

    pub fn edge_routes(&self) -> &[RoutedEdge] {
        self.edge_renderer.routes()
    }

    pub fn layout_computations(&self) -> usize {
        self.cache.computations()
    }

    /// Bounding box `(x, y, width, height)` of the drawn vertices.
    pub fn bounds(&self) -> Option<(f32, f32, f32, f32)> {
        let drawings = self.vertex_renderer.drawings();
        if drawings.is_empty() {
            return None;
        }
        let mut min = (f32::INFINITY, f32::INFINITY);
        let mut max = (f32::NEG_INFINITY, f32::NEG_INFINITY);
        for d in drawings {
            min = (min.0.min(d.x), min.1.min(d.y));
            max = (max.0.max(d.x + d.width), max.1.max(d.y + d.height));
        }
        Some((min.0, min.1, max.0 - min.0, max.1 - min.1))
    }
}

impl std::fmt::Debug for GraphRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphRenderer")
            .field("graph", &self.graph)
            .field("state", &self.state)
            .field("prepared", &self.prepared)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Line;
    use crate::provider::{DebugContentProvider, sample_graph};
    use crate::surface::{MonospaceMeasurer, RecordingSurface};

    fn branch_graph() -> Graph {
        let mut graph = Graph::without_content();
        let root = graph.root();
        let a = graph.add_vertex();
        let b = graph.add_vertex();
        for handle in [root, a, b] {
            graph.vertex_mut(handle).unwrap().lines = vec![Line::default().with("NOP", None)];
        }
        graph.add_edge(root, a);
        graph.add_edge(root, b);
        graph
    }

    #[test]
    fn two_way_branch_draws_one_true_and_one_false_edge() {
        let mut graph = branch_graph();
        let mut renderer = GraphRenderer::new(&Config::default());
        let measurer = MonospaceMeasurer::default();
        assert_eq!(renderer.preprocess(&measurer, &mut graph), &RenderState::Ready);

        let layout = renderer.layout().unwrap();
        assert_eq!(layout.vertices[1].rank, 1);
        assert_eq!(layout.vertices[2].rank, 1);
        assert_eq!(layout.vertices[0].rank, 0);

        let branches: Vec<Branch> = renderer.edge_routes().iter().map(|r| r.branch).collect();
        assert_eq!(branches.iter().filter(|b| **b == Branch::True).count(), 1);
        assert_eq!(branches.iter().filter(|b| **b == Branch::False).count(), 1);
        assert!(!branches.contains(&Branch::Direct));
    }

    #[test]
    fn layout_runs_once_per_graph() {
        let mut graph = sample_graph(Box::new(DebugContentProvider::new(5)));
        let mut renderer = GraphRenderer::new(&Config::default());
        let measurer = MonospaceMeasurer::default();
        for _ in 0..5 {
            renderer.preprocess(&measurer, &mut graph);
        }
        assert_eq!(renderer.layout_computations(), 1);

        let mut other = sample_graph(Box::new(DebugContentProvider::new(5)));
        renderer.preprocess(&measurer, &mut other);
        assert_eq!(renderer.layout_computations(), 2);
    }

    #[test]
    fn late_vertex_degrades_to_error_display() {
        let mut graph = branch_graph();
        let mut renderer = GraphRenderer::new(&Config::default());
        let measurer = MonospaceMeasurer::default();
        renderer.preprocess(&measurer, &mut graph);
        graph.add_vertex();
        let state = renderer.preprocess(&measurer, &mut graph).clone();
        assert!(matches!(state, RenderState::Failed { .. }));

        let mut surface = RecordingSurface::new(300.0, 200.0);
        renderer.render(&mut surface, &graph, 1.0);
        assert!(surface.texts().any(|t| t == "unable to display graph"));
        assert_eq!(surface.polylines().count(), 0);

        graph.update_identifiers();
        assert_eq!(renderer.preprocess(&measurer, &mut graph), &RenderState::Ready);
    }

    #[test]
    fn dangling_edge_is_a_layout_failure() {
        let mut graph = branch_graph();
        graph.add_edge(graph.root(), VertexHandle::new(42));
        let mut renderer = GraphRenderer::new(&Config::default());
        let state = renderer
            .preprocess(&MonospaceMeasurer::default(), &mut graph)
            .clone();
        match state {
            RenderState::Failed { message } => assert!(message.contains("42")),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn select_hits_vertex_boxes_only() {
        let mut graph = branch_graph();
        let mut renderer = GraphRenderer::new(&Config::default());
        renderer.preprocess(&MonospaceMeasurer::default(), &mut graph);
        let drawing = renderer.vertex_drawings()[1].clone();
        let (cx, cy) = (drawing.x + drawing.width / 2.0, drawing.y + drawing.height / 2.0);

        assert_eq!(renderer.select(&mut graph, cx, cy), Some(VertexHandle::new(1)));
        assert_eq!(graph.selected(), Some(VertexHandle::new(1)));
        assert_eq!(renderer.select(&mut graph, -1.0e6, -1.0e6), None);
        assert_eq!(graph.selected(), None);
    }
}
