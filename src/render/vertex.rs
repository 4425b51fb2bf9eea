use crate::config::{Config, VertexConfig};
use crate::ir::{Graph, Line, Vertex, VertexHandle, VertexId};
use crate::layout::Layout;
use crate::surface::{DrawingSurface, Font, Shadow, TextMeasurer};
use crate::theme::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VertexMetrics {
    pub font_height: f32,
    pub widest_line: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunPlacement {
    pub text: String,
    pub color: String,
    pub x: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinePlacement {
    /// Baseline.
    pub y: f32,
    pub font: Font,
    pub runs: Vec<RunPlacement>,
}

/// Box geometry and text placement of one vertex, in canvas coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexDrawing {
    pub id: VertexId,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub lines: Vec<LinePlacement>,
}

impl VertexDrawing {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

pub trait VertexRenderer {
    fn metrics(&self, measurer: &dyn TextMeasurer, vertex: &Vertex) -> VertexMetrics;

    /// Places boxes and text runs from the layout; `metrics` is indexed by vertex id.
    fn preprocess(
        &mut self,
        measurer: &dyn TextMeasurer,
        graph: &Graph,
        layout: &Layout,
        metrics: &[VertexMetrics],
    );

    fn render(&self, surface: &mut dyn DrawingSurface, graph: &Graph, zoom: f32);

    fn drawings(&self) -> &[VertexDrawing];

    fn clear(&mut self);
}

/// Shadowed, bordered boxes of styled monospace lines.
#[derive(Debug, Clone)]
pub struct BoxVertexRenderer {
    config: VertexConfig,
    theme: Theme,
    drawings: Vec<VertexDrawing>,
}

impl BoxVertexRenderer {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.vertex.clone(),
            theme: config.theme.clone(),
            drawings: Vec::new(),
        }
    }

    fn font_for(&self, line: &Line) -> Font {
        let family = if line.font.trim().is_empty() {
            self.theme.font_family.as_str()
        } else {
            line.font.as_str()
        };
        Font::new(family, self.theme.font_size)
    }

    fn place_lines(
        &self,
        measurer: &dyn TextMeasurer,
        vertex: &Vertex,
        x: f32,
        y: f32,
        metrics: &VertexMetrics,
    ) -> Vec<LinePlacement> {
        let pad = &self.config;
        vertex
            .lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let font = self.font_for(line);
                let baseline = y
                    + pad.padding_box_vertical
                    + i as f32 * metrics.font_height
                    + pad.padding_line * (i + 1) as f32;
                let mut cursor = x + pad.padding_box_horizontal;
                let runs = line
                    .runs
                    .iter()
                    .map(|run| {
                        let placement = RunPlacement {
                            text: run.text.clone(),
                            color: run.color.clone(),
                            x: cursor,
                        };
                        cursor += measurer.measure_text(&run.text, &font).width;
                        placement
                    })
                    .collect();
                LinePlacement {
                    y: baseline,
                    font,
                    runs,
                }
            })
            .collect()
    }
}

impl VertexRenderer for BoxVertexRenderer {
    fn metrics(&self, measurer: &dyn TextMeasurer, vertex: &Vertex) -> VertexMetrics {
        let mut widest_line = 0.0f32;
        let mut font_height = 0.0f32;
        for line in &vertex.lines {
            let font = self.font_for(line);
            let width: f32 = line
                .runs
                .iter()
                .map(|run| measurer.measure_text(&run.text, &font).width)
                .sum();
            widest_line = widest_line.max(width);
            font_height = font_height.max(measurer.measure_text(&line.raw(), &font).height());
        }

        let pad = &self.config;
        // Line count minus one: a single-line box is exactly its vertical padding tall.
        let spaced_lines = vertex.lines.len().saturating_sub(1) as f32;
        VertexMetrics {
            font_height,
            widest_line,
            width: widest_line + pad.padding_box_horizontal * 2.0,
            height: (font_height + pad.padding_line) * spaced_lines
                + pad.padding_box_vertical * 2.0,
        }
    }

    fn preprocess(
        &mut self,
        measurer: &dyn TextMeasurer,
        graph: &Graph,
        layout: &Layout,
        metrics: &[VertexMetrics],
    ) {
        let mut drawings = Vec::with_capacity(layout.vertices.len());
        for (id, positioned) in layout.vertices.iter().enumerate() {
            let (Some(vertex), Some(metrics)) =
                (graph.vertex(VertexHandle::new(id)), metrics.get(id))
            else {
                continue;
            };
            let mut x = positioned.center_x;
            let mut y = positioned.center_y;
            if self.config.centering {
                x -= metrics.width / 2.0;
                y -= metrics.height / 2.0;
            }
            let lines = self.place_lines(measurer, vertex, x, y, metrics);
            drawings.push(VertexDrawing {
                id,
                x,
                y,
                width: metrics.width,
                height: metrics.height,
                lines,
            });
        }
        self.drawings = drawings;
    }

    fn render(&self, surface: &mut dyn DrawingSurface, graph: &Graph, zoom: f32) {
        let theme = &self.theme;
        let border = self.config.size_border;
        let offset = self.config.offset_shadow * zoom;

        for drawing in &self.drawings {
            let selected = graph
                .vertex(VertexHandle::new(drawing.id))
                .is_some_and(Vertex::is_selected);
            let (shadow_color, border_color) = if selected {
                (&theme.vertex_shadow_selected, &theme.vertex_border_selected)
            } else {
                (&theme.vertex_shadow, &theme.vertex_border)
            };

            surface.set_shadow(Some(Shadow {
                color: shadow_color.clone(),
                offset_x: offset,
                offset_y: offset,
                blur: self.config.shadow_blur,
            }));
            surface.set_fill_color(border_color);
            surface.fill_rect(
                drawing.x - border,
                drawing.y - border,
                drawing.width + border * 2.0,
                drawing.height + border * 2.0,
            );

            surface.set_shadow(None);
            surface.set_fill_color(&theme.vertex_background);
            surface.fill_rect(drawing.x, drawing.y, drawing.width, drawing.height);

            for line in &drawing.lines {
                surface.set_font(&line.font);
                for run in &line.runs {
                    surface.set_fill_color(&run.color);
                    surface.fill_text(&run.text, run.x, line.y);
                }
            }
        }
    }

    fn drawings(&self) -> &[VertexDrawing] {
        &self.drawings
    }

    fn clear(&mut self) {
        self.drawings.clear();
    }
}
