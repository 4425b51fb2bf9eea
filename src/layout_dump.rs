use crate::ir::{Graph, VertexHandle};
use crate::render::{Branch, GraphRenderer, RenderState};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub state: String,
    pub width: f32,
    pub height: f32,
    pub rank_count: usize,
    pub vertices: Vec<VertexDump>,
    pub edges: Vec<EdgeDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexDump {
    pub id: usize,
    pub rank: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub selected: bool,
    pub lines: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDump {
    pub source: usize,
    pub target: usize,
    pub branch: String,
    pub points: Vec<[f32; 2]>,
}

impl LayoutDump {
    /// Snapshot of the last preprocess pass: drawn boxes with their ranks and routed edges.
    pub fn from_renderer(renderer: &GraphRenderer, graph: &Graph) -> Self {
        let state = match renderer.state() {
            RenderState::Empty => "empty".to_string(),
            RenderState::Ready => "ready".to_string(),
            RenderState::Failed { message } => format!("failed: {message}"),
        };
        let layout = renderer.layout();

        let vertices = renderer
            .vertex_drawings()
            .iter()
            .map(|drawing| {
                let vertex = graph.vertex(VertexHandle::new(drawing.id));
                VertexDump {
                    id: drawing.id,
                    rank: layout
                        .and_then(|layout| layout.vertex(drawing.id))
                        .map_or(0, |v| v.rank),
                    x: drawing.x,
                    y: drawing.y,
                    width: drawing.width,
                    height: drawing.height,
                    selected: vertex.is_some_and(|v| v.is_selected()),
                    lines: vertex
                        .map(|v| v.lines.iter().map(|line| line.raw()).collect())
                        .unwrap_or_default(),
                }
            })
            .collect();

        let edges = renderer
            .edge_routes()
            .iter()
            .map(|route| EdgeDump {
                source: route.source,
                target: route.target,
                branch: match route.branch {
                    Branch::True => "true",
                    Branch::False => "false",
                    Branch::Direct => "direct",
                }
                .to_string(),
                points: route.points.iter().map(|(x, y)| [*x, *y]).collect(),
            })
            .collect();

        LayoutDump {
            state,
            width: layout.map_or(0.0, |l| l.width),
            height: layout.map_or(0.0, |l| l.height),
            rank_count: layout.map_or(0, |l| l.rank_count),
            vertices,
            edges,
        }
    }
}

pub fn write_layout_dump(path: &Path, renderer: &GraphRenderer, graph: &Graph) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_renderer(renderer, graph);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::provider::{DebugContentProvider, sample_graph};
    use crate::surface::MonospaceMeasurer;

    #[test]
    fn dump_lists_vertices_and_branches() {
        let mut graph = sample_graph(Box::new(DebugContentProvider::new(2)));
        let mut renderer = GraphRenderer::new(&Config::default());
        renderer.preprocess(&MonospaceMeasurer::default(), &mut graph);
        let dump = LayoutDump::from_renderer(&renderer, &graph);
        assert_eq!(dump.state, "ready");
        assert_eq!(dump.vertices.len(), 11);
        assert_eq!(dump.edges.len(), 11);
        assert!(dump.edges.iter().any(|e| e.branch == "true"));

        let json = serde_json::to_value(&dump).unwrap();
        assert!(json.get("rankCount").is_some());
        assert_eq!(json["vertices"][0]["id"], 0);
    }
}
