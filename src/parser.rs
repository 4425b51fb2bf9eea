use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

use crate::ir::{DEFAULT_FONT, DEFAULT_TEXT_COLOR, Graph, Line, VertexHandle};
use crate::provider::ContentProvider;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid graph document: {0}")]
    Syntax(#[from] json5::Error),
    #[error("graph document has no vertices")]
    Empty,
    #[error("duplicate vertex id {0}")]
    DuplicateVertex(i64),
    #[error("edge {index} references unknown vertex {id}")]
    UnknownVertex { index: usize, id: i64 },
    #[error("root references unknown vertex {0}")]
    UnknownRoot(i64),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphDocument {
    root: Option<i64>,
    #[serde(default)]
    vertices: Vec<VertexDocument>,
    #[serde(default)]
    edges: Vec<EdgeDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VertexDocument {
    id: i64,
    font: Option<String>,
    color: Option<String>,
    lines: Option<Vec<Vec<RunDocument>>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RunDocument {
    Plain(String),
    Styled { text: String, color: Option<String> },
}

#[derive(Debug, Deserialize)]
struct EdgeDocument {
    source: i64,
    target: i64,
}

/// Builds a graph from a JSON5 document.
///
/// Vertices keep document order; the first document vertex becomes the graph's initial
/// root vertex. Vertices without `lines` are filled by `provider`, vertices with `lines`
/// keep exactly the document content.
pub fn parse_graph(input: &str, provider: Box<dyn ContentProvider>) -> Result<Graph, ParseError> {
    let document: GraphDocument = json5::from_str(input)?;
    if document.vertices.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut graph = Graph::new(provider);
    let mut handles: HashMap<i64, VertexHandle> = HashMap::new();

    for (index, vertex_doc) in document.vertices.iter().enumerate() {
        let handle = if index == 0 {
            graph.root()
        } else {
            graph.add_vertex()
        };
        if handles.insert(vertex_doc.id, handle).is_some() {
            return Err(ParseError::DuplicateVertex(vertex_doc.id));
        }
        if let Some(lines) = &vertex_doc.lines
            && let Some(vertex) = graph.vertex_mut(handle)
        {
            vertex.lines = build_lines(vertex_doc, lines);
        }
    }

    for (index, edge) in document.edges.iter().enumerate() {
        let source = *handles
            .get(&edge.source)
            .ok_or(ParseError::UnknownVertex {
                index,
                id: edge.source,
            })?;
        let target = *handles
            .get(&edge.target)
            .ok_or(ParseError::UnknownVertex {
                index,
                id: edge.target,
            })?;
        graph.add_edge(source, target);
    }

    if let Some(root) = document.root {
        let handle = *handles.get(&root).ok_or(ParseError::UnknownRoot(root))?;
        graph.set_root(handle);
    }

    Ok(graph)
}

fn build_lines(vertex_doc: &VertexDocument, lines: &[Vec<RunDocument>]) -> Vec<Line> {
    let font = vertex_doc.font.as_deref().unwrap_or(DEFAULT_FONT);
    let color = vertex_doc.color.as_deref().unwrap_or(DEFAULT_TEXT_COLOR);
    lines
        .iter()
        .map(|runs| {
            let mut line = Line::new(font, color);
            for run in runs {
                match run {
                    RunDocument::Plain(text) => line.push(text.as_str(), None),
                    RunDocument::Styled { text, color } => {
                        line.push(text.as_str(), color.as_deref())
                    }
                };
            }
            line
        })
        .collect()
}
