mod error;
mod position;
mod ranking;
pub(crate) mod types;
pub use error::LayoutError;
pub use types::*;

use position::assign_positions;
use ranking::{compute_ranks, order_rank_nodes};

use crate::config::LayoutConfig;
use crate::ir::{Graph, GraphId};

/// Layered layout of `graph` with one `(width, height)` per vertex, indexed by identifier.
///
/// The graph must pass [`Graph::verify_integrity`]. Deterministic for a given graph,
/// sizes and config.
pub fn compute_layout(
    graph: &Graph,
    sizes: &[(f32, f32)],
    config: &LayoutConfig,
) -> Result<Layout, LayoutError> {
    if !graph.verify_integrity() {
        return Err(LayoutError::Integrity);
    }
    let vertex_count = graph.vertex_count();
    if sizes.len() != vertex_count {
        return Err(LayoutError::SizeMismatch {
            expected: vertex_count,
            actual: sizes.len(),
        });
    }
    if let Some(bad) = sizes
        .iter()
        .position(|(w, h)| !w.is_finite() || !h.is_finite() || *w < 0.0 || *h < 0.0)
    {
        return Err(LayoutError::InvalidSize(bad));
    }

    let mut edges: Vec<EdgeLayout> = Vec::with_capacity(graph.edges().len());
    for (index, edge) in graph.edges().iter().enumerate() {
        for handle in [edge.source(), edge.target()] {
            if graph.vertex(handle).is_none() {
                return Err(LayoutError::DanglingEdge {
                    index,
                    vertex: handle.index(),
                    count: vertex_count,
                });
            }
        }
        edges.push(EdgeLayout {
            source: edge.source().index(),
            target: edge.target().index(),
        });
    }

    let rank_edges: Vec<(usize, usize)> = edges.iter().map(|e| (e.source, e.target)).collect();
    let ranks = compute_ranks(vertex_count, &rank_edges);
    let max_rank = ranks.iter().copied().max().unwrap_or(0);
    let mut rank_nodes: Vec<Vec<usize>> = vec![Vec::new(); max_rank + 1];
    for (node, rank) in ranks.iter().enumerate() {
        rank_nodes[*rank].push(node);
    }

    // Long forward edges get a zero-size dummy on every rank they cross.
    let mut node_sizes: Vec<(f32, f32)> = sizes.to_vec();
    let mut expanded_edges: Vec<(usize, usize)> = Vec::new();
    for &(from, to) in &rank_edges {
        let (from_rank, to_rank) = (ranks[from], ranks[to]);
        if to_rank <= from_rank {
            continue;
        }
        let mut prev = from;
        for rank in from_rank + 1..to_rank {
            let dummy = node_sizes.len();
            node_sizes.push((0.0, 0.0));
            rank_nodes[rank].push(dummy);
            expanded_edges.push((prev, dummy));
            prev = dummy;
        }
        expanded_edges.push((prev, to));
    }

    order_rank_nodes(
        &mut rank_nodes,
        &expanded_edges,
        node_sizes.len(),
        config.order_passes,
    );
    let centers = assign_positions(&rank_nodes, &expanded_edges, &node_sizes, config);

    let mut vertices: Vec<VertexLayout> = (0..vertex_count)
        .map(|node| VertexLayout {
            center_x: centers[node].0,
            center_y: centers[node].1,
            width: sizes[node].0,
            height: sizes[node].1,
            rank: ranks[node],
        })
        .collect();

    let min_x = (0..node_sizes.len())
        .map(|node| centers[node].0 - node_sizes[node].0 / 2.0)
        .fold(f32::INFINITY, f32::min);
    let shift_x = config.margin - if min_x.is_finite() { min_x } else { 0.0 };
    let mut width = 0.0f32;
    let mut height = 0.0f32;
    for vertex in &mut vertices {
        vertex.center_x += shift_x;
        vertex.center_y += config.margin;
        width = width.max(vertex.right());
        height = height.max(vertex.bottom());
    }

    tracing::debug!(
        vertices = vertex_count,
        edges = edges.len(),
        ranks = rank_nodes.len(),
        dummies = node_sizes.len() - vertex_count,
        "computed layered layout"
    );

    Ok(Layout {
        vertices,
        edges,
        width: width + config.margin,
        height: height + config.margin,
        rank_count: rank_nodes.len(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CacheKey {
    graph: GraphId,
    vertex_count: usize,
}

impl CacheKey {
    fn of(graph: &Graph) -> Self {
        Self {
            graph: graph.id(),
            vertex_count: graph.vertex_count(),
        }
    }
}

/// Last layout result, keyed on graph identity and vertex count.
#[derive(Debug, Default)]
pub struct LayoutCache {
    entry: Option<(CacheKey, Result<Layout, LayoutError>)>,
    computations: usize,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached result for `graph`, running `compute` only when the graph
    /// identity or vertex count differs from the cached entry.
    pub fn get_or_compute<F>(&mut self, graph: &Graph, compute: F) -> &Result<Layout, LayoutError>
    where
        F: FnOnce() -> Result<Layout, LayoutError>,
    {
        let key = CacheKey::of(graph);
        if !self.is_fresh_for(graph) {
            self.entry = None;
        }
        let computations = &mut self.computations;
        let (_, result) = self.entry.get_or_insert_with(|| {
            *computations += 1;
            tracing::debug!(graph = ?key.graph, vertices = key.vertex_count, "layout cache miss");
            (key, compute())
        });
        result
    }

    pub fn get(&self) -> Option<&Result<Layout, LayoutError>> {
        self.entry.as_ref().map(|(_, result)| result)
    }

    pub fn is_fresh_for(&self, graph: &Graph) -> bool {
        matches!(&self.entry, Some((key, _)) if *key == CacheKey::of(graph))
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// Number of layouts computed so far.
    pub fn computations(&self) -> usize {
        self.computations
    }
}
