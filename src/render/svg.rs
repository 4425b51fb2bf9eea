use std::fmt::Write as _;
use std::path::Path;

use anyhow::Result;

use super::GraphRenderer;
use crate::camera::Camera;
use crate::config::{Config, RenderConfig};
use crate::ir::Graph;
use crate::surface::{
    Affine, DrawingSurface, Font, MonospaceMeasurer, Shadow, TextMeasure, TextMeasurer,
};
use crate::text_metrics::FontMeasurer;

#[derive(Debug, Clone)]
struct PaintState {
    fill: String,
    stroke: String,
    line_width: f32,
    shadow: Option<Shadow>,
    font: Font,
    transform: Affine,
}

/// Headless surface that serialises paint calls as SVG elements.
pub struct SvgSurface {
    width: f32,
    height: f32,
    background: String,
    measurer: Box<dyn TextMeasurer>,
    state: PaintState,
    stack: Vec<PaintState>,
    body: String,
}

impl SvgSurface {
    pub fn new(width: f32, height: f32, background: &str, measurer: Box<dyn TextMeasurer>) -> Self {
        Self {
            width,
            height,
            background: background.to_string(),
            measurer,
            state: PaintState {
                fill: "#000000".to_string(),
                stroke: "#000000".to_string(),
                line_width: 1.0,
                shadow: None,
                font: Font::new("monospace", 16.0),
                transform: Affine::IDENTITY,
            },
            stack: Vec::new(),
            body: String::new(),
        }
    }

    pub fn finish(self) -> String {
        let (width, height) = (self.width, self.height);
        let mut svg = String::with_capacity(self.body.len() + 512);
        let _ = write!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">"
        );
        svg.push_str(
            "<defs><filter id=\"shadow\" x=\"-20%\" y=\"-20%\" width=\"140%\" height=\"140%\"><feGaussianBlur stdDeviation=\"1\"/></filter></defs>",
        );
        let _ = write!(
            svg,
            "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
            escape_xml(&self.background)
        );
        svg.push_str(&self.body);
        svg.push_str("</svg>");
        svg
    }

    fn matrix(transform: &Affine) -> String {
        format!(
            "matrix({:.4} {:.4} {:.4} {:.4} {:.2} {:.2})",
            transform.a, transform.b, transform.c, transform.d, transform.e, transform.f
        )
    }
}

impl TextMeasurer for SvgSurface {
    fn measure_text(&self, text: &str, font: &Font) -> TextMeasure {
        self.measurer.measure_text(text, font)
    }
}

impl DrawingSurface for SvgSurface {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.body.clear();
    }

    fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    fn set_transform(&mut self, transform: Affine) {
        self.state.transform = transform;
    }

    fn transform(&mut self, transform: Affine) {
        self.state.transform = self.state.transform.then(&transform);
    }

    fn set_fill_color(&mut self, color: &str) {
        self.state.fill = color.to_string();
    }

    fn set_stroke_color(&mut self, color: &str) {
        self.state.stroke = color.to_string();
    }

    fn set_line_width(&mut self, width: f32) {
        self.state.line_width = width;
    }

    fn set_shadow(&mut self, shadow: Option<Shadow>) {
        self.state.shadow = shadow;
    }

    fn set_font(&mut self, font: &Font) {
        self.state.font = font.clone();
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        // Shadow offsets are in device pixels, independent of the current transform.
        if let Some(shadow) = &self.state.shadow {
            let shifted = Affine::translate(shadow.offset_x, shadow.offset_y).then(&self.state.transform);
            let filter = if shadow.blur > 0.0 {
                " filter=\"url(#shadow)\""
            } else {
                ""
            };
            let _ = write!(
                self.body,
                "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{width:.2}\" height=\"{height:.2}\" fill=\"{}\" transform=\"{}\"{filter}/>",
                escape_xml(&shadow.color),
                Self::matrix(&shifted),
            );
        }
        let _ = write!(
            self.body,
            "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{width:.2}\" height=\"{height:.2}\" fill=\"{}\" transform=\"{}\"/>",
            escape_xml(&self.state.fill),
            Self::matrix(&self.state.transform),
        );
    }

    fn stroke_polyline(&mut self, points: &[(f32, f32)]) {
        if points.len() < 2 {
            return;
        }
        let mut coords = String::new();
        for (i, (x, y)) in points.iter().enumerate() {
            if i > 0 {
                coords.push(' ');
            }
            let _ = write!(coords, "{x:.2},{y:.2}");
        }
        let _ = write!(
            self.body,
            "<polyline points=\"{coords}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\" transform=\"{}\"/>",
            escape_xml(&self.state.stroke),
            self.state.line_width,
            Self::matrix(&self.state.transform),
        );
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32) {
        let font = &self.state.font;
        let _ = write!(
            self.body,
            "<text x=\"{x:.2}\" y=\"{y:.2}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\" xml:space=\"preserve\" transform=\"{}\">{}</text>",
            escape_xml(&font.family),
            font.size,
            escape_xml(&self.state.fill),
            Self::matrix(&self.state.transform),
            escape_xml(&text.replace('\t', "    ")),
        );
    }
}

/// Lays out and paints `graph` into a standalone SVG document.
///
/// Without an explicit `zoom` the camera fits the whole graph into the configured
/// viewport; either way the graph is centred.
pub fn render_svg(graph: &mut Graph, config: &Config, zoom: Option<f32>) -> String {
    let measurer: Box<dyn TextMeasurer> = if config.render.fast_text {
        Box::new(MonospaceMeasurer::default())
    } else {
        Box::new(FontMeasurer::new())
    };
    let (width, height) = (config.render.width, config.render.height);
    let mut surface = SvgSurface::new(width, height, &config.render.background, measurer);

    let mut renderer = GraphRenderer::new(config);
    renderer.preprocess(&surface, graph);

    let mut camera = Camera::new(&config.camera, (width, height));
    if let Some(bounds) = renderer.bounds() {
        match zoom {
            Some(zoom) => {
                camera.set_zoom(zoom);
            }
            None => camera.fit(bounds),
        }
        camera.center_on(bounds);
    }

    surface.clear();
    surface.set_transform(camera.transform());
    renderer.render(&mut surface, graph, camera.zoom());
    surface.finish()
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig, font_family: &str) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = font_family.to_string();
    opt.fontdb_mut().load_system_fonts();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .ok_or_else(|| anyhow::anyhow!("invalid output size {}x{}", render_cfg.width, render_cfg.height))?;

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, _output: &Path, _render_cfg: &RenderConfig, _font_family: &str) -> Result<()> {
    anyhow::bail!("PNG output requires the `png` feature")
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
