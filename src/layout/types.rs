use crate::ir::VertexId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexLayout {
    pub center_x: f32,
    pub center_y: f32,
    pub width: f32,
    pub height: f32,
    pub rank: usize,
}

impl VertexLayout {
    pub fn left(&self) -> f32 {
        self.center_x - self.width / 2.0
    }

    pub fn right(&self) -> f32 {
        self.center_x + self.width / 2.0
    }

    pub fn top(&self) -> f32 {
        self.center_y - self.height / 2.0
    }

    pub fn bottom(&self) -> f32 {
        self.center_y + self.height / 2.0
    }

    /// Inclusive on every edge.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left() && x <= self.right() && y >= self.top() && y <= self.bottom()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeLayout {
    pub source: VertexId,
    pub target: VertexId,
}

/// Computed geometry, indexed by vertex identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub vertices: Vec<VertexLayout>,
    /// Graph edges in declaration order.
    pub edges: Vec<EdgeLayout>,
    pub width: f32,
    pub height: f32,
    pub rank_count: usize,
}

impl Layout {
    pub fn vertex(&self, id: VertexId) -> Option<&VertexLayout> {
        self.vertices.get(id)
    }
}
