use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("graph integrity check failed: vertices without identifiers")]
    Integrity,
    #[error("edge {index} references vertex {vertex}, graph has {count} vertices")]
    DanglingEdge {
        index: usize,
        vertex: usize,
        count: usize,
    },
    #[error("expected {expected} vertex sizes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("vertex {0} has a non-finite or negative size")]
    InvalidSize(usize),
}
