use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::provider::{ContentProvider, EmptyContentProvider};

pub const DEFAULT_FONT: &str = "Consolas";
pub const DEFAULT_TEXT_COLOR: &str = "#9b9b9b";

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`Graph`]; renderer caches are keyed on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphId(u64);

impl GraphId {
    fn next() -> Self {
        Self(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Position of a vertex in its graph's vertex sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexHandle(usize);

impl VertexHandle {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

pub type VertexId = usize;

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub font: String,
    pub color: String,
    pub runs: Vec<TextRun>,
}

impl Line {
    pub fn new(font: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            font: font.into(),
            color: color.into(),
            runs: Vec::new(),
        }
    }

    /// Appends a run; runs without an explicit colour take the line colour.
    pub fn push(&mut self, text: impl Into<String>, color: Option<&str>) -> &mut Self {
        let color = color.unwrap_or(self.color.as_str()).to_string();
        self.runs.push(TextRun {
            text: text.into(),
            color,
        });
        self
    }

    pub fn with(mut self, text: impl Into<String>, color: Option<&str>) -> Self {
        self.push(text, color);
        self
    }

    pub fn raw(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }
}

impl Default for Line {
    fn default() -> Self {
        Self::new(DEFAULT_FONT, DEFAULT_TEXT_COLOR)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Vertex {
    id: Option<VertexId>,
    pub lines: Vec<Line>,
    selected: bool,
}

impl Vertex {
    /// `None` until [`Graph::update_identifiers`] has numbered this vertex.
    pub fn id(&self) -> Option<VertexId> {
        self.id
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    source: VertexHandle,
    target: VertexHandle,
}

impl Edge {
    pub fn source(&self) -> VertexHandle {
        self.source
    }

    pub fn target(&self) -> VertexHandle {
        self.target
    }
}

pub struct Graph {
    id: GraphId,
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    root: VertexHandle,
    provider: Box<dyn ContentProvider>,
}

impl Graph {
    /// Creates a graph holding a single root vertex filled by `provider`.
    pub fn new(provider: Box<dyn ContentProvider>) -> Self {
        let mut graph = Self {
            id: GraphId::next(),
            vertices: Vec::new(),
            edges: Vec::new(),
            root: VertexHandle(0),
            provider,
        };
        graph.root = graph.add_vertex();
        graph
    }

    pub fn without_content() -> Self {
        Self::new(Box::new(EmptyContentProvider))
    }

    pub fn id(&self) -> GraphId {
        self.id
    }

    pub fn add_vertex(&mut self) -> VertexHandle {
        let mut vertex = Vertex::default();
        self.provider.provide(&mut vertex);
        self.vertices.push(vertex);
        VertexHandle(self.vertices.len() - 1)
    }

    /// Endpoints are not checked; a dangling handle surfaces as a layout failure.
    pub fn add_edge(&mut self, source: VertexHandle, target: VertexHandle) {
        self.edges.push(Edge { source, target });
    }

    pub fn update_identifiers(&mut self) {
        for (index, vertex) in self.vertices.iter_mut().enumerate() {
            vertex.id = Some(index);
        }
    }

    pub fn verify_integrity(&self) -> bool {
        self.vertices.iter().all(|vertex| vertex.id.is_some())
    }

    pub fn root(&self) -> VertexHandle {
        self.root
    }

    pub fn set_root(&mut self, handle: VertexHandle) {
        if handle.0 < self.vertices.len() {
            self.root = handle;
        }
    }

    pub fn vertex(&self, handle: VertexHandle) -> Option<&Vertex> {
        self.vertices.get(handle.0)
    }

    pub fn vertex_mut(&mut self, handle: VertexHandle) -> Option<&mut Vertex> {
        self.vertices.get_mut(handle.0)
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn handles(&self) -> impl Iterator<Item = VertexHandle> + '_ {
        (0..self.vertices.len()).map(VertexHandle)
    }

    pub fn out_degree(&self, handle: VertexHandle) -> usize {
        self.edges.iter().filter(|edge| edge.source == handle).count()
    }

    /// Selects `handle` and deselects every other vertex. Returns whether anything changed.
    pub fn select(&mut self, handle: VertexHandle) -> bool {
        if handle.0 >= self.vertices.len() {
            return false;
        }
        let mut changed = false;
        for (index, vertex) in self.vertices.iter_mut().enumerate() {
            let selected = index == handle.0;
            if vertex.selected != selected {
                vertex.selected = selected;
                changed = true;
            }
        }
        changed
    }

    pub fn clear_selection(&mut self) -> bool {
        let mut changed = false;
        for vertex in &mut self.vertices {
            if vertex.selected {
                vertex.selected = false;
                changed = true;
            }
        }
        changed
    }

    pub fn selected(&self) -> Option<VertexHandle> {
        self.vertices
            .iter()
            .position(|vertex| vertex.selected)
            .map(VertexHandle)
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("id", &self.id)
            .field("vertices", &self.vertices)
            .field("edges", &self.edges)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(len: usize) -> Graph {
        let mut graph = Graph::without_content();
        let mut prev = graph.root();
        for _ in 1..len {
            let next = graph.add_vertex();
            graph.add_edge(prev, next);
            prev = next;
        }
        graph
    }

    #[test]
    fn identifiers_follow_sequence_order() {
        let mut graph = chain(5);
        assert!(!graph.verify_integrity());
        graph.update_identifiers();
        let ids: Vec<_> = graph.vertices().iter().map(|v| v.id()).collect();
        assert_eq!(ids, (0..5).map(Some).collect::<Vec<_>>());
        graph.update_identifiers();
        let again: Vec<_> = graph.vertices().iter().map(|v| v.id()).collect();
        assert_eq!(ids, again);
    }

    #[test]
    fn late_vertices_break_integrity_until_renumbered() {
        let mut graph = chain(3);
        graph.update_identifiers();
        assert!(graph.verify_integrity());
        graph.add_vertex();
        assert!(!graph.verify_integrity());
        graph.update_identifiers();
        assert!(graph.verify_integrity());
    }

    #[test]
    fn selection_is_exclusive() {
        let mut graph = chain(3);
        assert!(graph.select(VertexHandle::new(1)));
        assert!(graph.select(VertexHandle::new(2)));
        let selected: Vec<_> = graph.vertices().iter().filter(|v| v.is_selected()).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(graph.selected(), Some(VertexHandle::new(2)));
        assert!(!graph.select(VertexHandle::new(2)));
        assert!(!graph.select(VertexHandle::new(9)));
        assert!(graph.clear_selection());
        assert_eq!(graph.selected(), None);
    }

    #[test]
    fn graphs_have_distinct_identities() {
        let a = Graph::without_content();
        let b = Graph::without_content();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn line_runs_default_to_line_color() {
        let line = Line::new("Consolas", "#111111")
            .with("LOADK\t", None)
            .with("1", Some("#222222"));
        assert_eq!(line.runs[0].color, "#111111");
        assert_eq!(line.runs[1].color, "#222222");
        assert_eq!(line.raw(), "LOADK\t1");
    }
}
