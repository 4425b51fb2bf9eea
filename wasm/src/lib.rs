use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use cfgview::camera::{WheelInput, WheelMode};
use cfgview::config::{Config, parse_config};
use cfgview::ir::Graph;
use cfgview::parser::parse_graph;
use cfgview::provider::{DebugContentProvider, SimpleRng, random_graph};
use cfgview::render::render_svg;
use cfgview::surface::{Affine, DrawingSurface, Font, Shadow, TextMeasure, TextMeasurer};
use cfgview::theme::Theme;
use cfgview::view::{GraphView, RedrawLoop};
use serde::Deserialize;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SvgOptions {
    theme: Option<String>,
    width: Option<f32>,
    height: Option<f32>,
    zoom: Option<f32>,
    select: Option<usize>,
    fast_text: Option<bool>,
}

fn build_config(options: &SvgOptions) -> Result<Config, String> {
    let mut config = Config::default();
    if let Some(name) = options.theme.as_deref() {
        config.theme = Theme::by_name(name).ok_or_else(|| format!("unknown theme {name:?}"))?;
    }
    if let Some(width) = options.width {
        config.render.width = width;
    }
    if let Some(height) = options.height {
        config.render.height = height;
    }
    // Browser builds carry no font database.
    config.render.fast_text = options.fast_text.unwrap_or(true);
    Ok(config)
}

fn render_document(document: &str, options: SvgOptions) -> Result<String, String> {
    let config = build_config(&options)?;
    let mut graph = parse_graph(document, Box::new(DebugContentProvider::new(0)))
        .map_err(|error| error.to_string())?;
    if let Some(position) = options.select {
        if position >= graph.vertex_count() {
            return Err(format!(
                "select {position} is out of range, graph has {} vertices",
                graph.vertex_count()
            ));
        }
        graph.select(cfgview::VertexHandle::new(position));
    }
    Ok(render_svg(&mut graph, &config, options.zoom))
}

/// Renders a JSON5 graph document to an SVG string.
#[wasm_bindgen]
pub fn render_graph_svg(document: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let options = match options_json {
        Some(raw) => serde_json::from_str::<SvgOptions>(&raw)
            .map_err(|error| JsValue::from_str(&error.to_string()))?,
        None => SvgOptions::default(),
    };
    render_document(document, options).map_err(|error| JsValue::from_str(&error))
}

#[wasm_bindgen(start)]
pub fn init_console() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

/// Measures through a 2D context, restoring the context font afterwards.
#[derive(Clone)]
struct CanvasMeasurer {
    ctx: CanvasRenderingContext2d,
}

impl TextMeasurer for CanvasMeasurer {
    fn measure_text(&self, text: &str, font: &Font) -> TextMeasure {
        let previous = self.ctx.font();
        self.ctx.set_font(&font.css());
        let measure = match self.ctx.measure_text(&text.replace('\t', "    ")) {
            Ok(metrics) => TextMeasure {
                width: metrics.width() as f32,
                ascent: metrics.font_bounding_box_ascent() as f32,
                descent: metrics.font_bounding_box_descent() as f32,
            },
            Err(_) => TextMeasure {
                width: 0.0,
                ascent: font.size * 0.8,
                descent: font.size * 0.2,
            },
        };
        self.ctx.set_font(&previous);
        measure
    }
}

pub struct CanvasSurface {
    measurer: CanvasMeasurer,
    width: f32,
    height: f32,
    background: String,
}

impl CanvasSurface {
    pub fn new(ctx: CanvasRenderingContext2d, width: f32, height: f32, background: &str) -> Self {
        Self {
            measurer: CanvasMeasurer { ctx },
            width,
            height,
            background: background.to_string(),
        }
    }

    fn ctx(&self) -> &CanvasRenderingContext2d {
        &self.measurer.ctx
    }

    fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }
}

impl TextMeasurer for CanvasSurface {
    fn measure_text(&self, text: &str, font: &Font) -> TextMeasure {
        self.measurer.measure_text(text, font)
    }
}

impl DrawingSurface for CanvasSurface {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        let ctx = self.ctx();
        ctx.save();
        let _ = ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
        ctx.set_fill_style_str(&self.background);
        ctx.fill_rect(0.0, 0.0, self.width as f64, self.height as f64);
        ctx.restore();
    }

    fn save(&mut self) {
        self.ctx().save();
    }

    fn restore(&mut self) {
        self.ctx().restore();
    }

    fn set_transform(&mut self, t: Affine) {
        let _ = self.ctx().set_transform(
            t.a as f64, t.b as f64, t.c as f64, t.d as f64, t.e as f64, t.f as f64,
        );
    }

    fn transform(&mut self, t: Affine) {
        let _ = self.ctx().transform(
            t.a as f64, t.b as f64, t.c as f64, t.d as f64, t.e as f64, t.f as f64,
        );
    }

    fn set_fill_color(&mut self, color: &str) {
        self.ctx().set_fill_style_str(color);
    }

    fn set_stroke_color(&mut self, color: &str) {
        self.ctx().set_stroke_style_str(color);
    }

    fn set_line_width(&mut self, width: f32) {
        self.ctx().set_line_width(width as f64);
    }

    fn set_shadow(&mut self, shadow: Option<Shadow>) {
        let ctx = self.ctx();
        match shadow {
            Some(shadow) => {
                ctx.set_shadow_color(&shadow.color);
                ctx.set_shadow_blur(shadow.blur as f64);
                ctx.set_shadow_offset_x(shadow.offset_x as f64);
                ctx.set_shadow_offset_y(shadow.offset_y as f64);
            }
            None => {
                ctx.set_shadow_color("transparent");
                ctx.set_shadow_blur(0.0);
                ctx.set_shadow_offset_x(0.0);
                ctx.set_shadow_offset_y(0.0);
            }
        }
    }

    fn set_font(&mut self, font: &Font) {
        self.ctx().set_font(&font.css());
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.ctx()
            .fill_rect(x as f64, y as f64, width as f64, height as f64);
    }

    fn stroke_polyline(&mut self, points: &[(f32, f32)]) {
        let [(x0, y0), rest @ ..] = points else {
            return;
        };
        let ctx = self.ctx();
        ctx.begin_path();
        ctx.move_to(*x0 as f64, *y0 as f64);
        for (x, y) in rest {
            ctx.line_to(*x as f64, *y as f64);
        }
        ctx.stroke();
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32) {
        let _ = self
            .ctx()
            .fill_text(&text.replace('\t', "    "), x as f64, y as f64);
    }
}

struct CanvasState {
    view: GraphView,
    surface: CanvasSurface,
    redraw: RedrawLoop,
}

fn now() -> Duration {
    Duration::from_secs_f64(js_sys::Date::now().max(0.0) / 1000.0)
}

fn request_frame(callback: &Closure<dyn FnMut()>) {
    if let Some(window) = web_sys::window() {
        let _ = window.request_animation_frame(callback.as_ref().unchecked_ref());
    }
}

/// One graph view painted onto a canvas element by a `requestAnimationFrame` loop.
#[wasm_bindgen]
pub struct GraphCanvas {
    canvas: HtmlCanvasElement,
    state: Rc<RefCell<CanvasState>>,
    animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>>,
}

impl GraphCanvas {
    fn with_graph(canvas: HtmlCanvasElement, graph: Graph, config: &Config) -> Result<GraphCanvas, JsValue> {
        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("canvas has no 2d context"))?
            .dyn_into()?;
        let (width, height) = (canvas.width() as f32, canvas.height() as f32);
        let surface = CanvasSurface::new(ctx, width, height, &config.theme.background);
        let measurer = Box::new(surface.measurer.clone());
        let view = GraphView::with_measurer(graph, config, (width, height), measurer);
        Ok(GraphCanvas {
            canvas,
            state: Rc::new(RefCell::new(CanvasState {
                view,
                surface,
                redraw: RedrawLoop::new(),
            })),
            animate: Rc::new(RefCell::new(None)),
        })
    }
}

#[wasm_bindgen]
impl GraphCanvas {
    /// Shows a JSON5 graph document; `config_json` takes the same camelCase overrides as
    /// the command line config file.
    #[wasm_bindgen(constructor)]
    pub fn new(
        canvas: HtmlCanvasElement,
        document: &str,
        config_json: Option<String>,
    ) -> Result<GraphCanvas, JsValue> {
        let config = match config_json {
            Some(raw) => parse_config(&raw).map_err(|error| JsValue::from_str(&format!("{error:#}")))?,
            None => Config::default(),
        };
        let graph = parse_graph(document, Box::new(DebugContentProvider::new(0)))
            .map_err(|error| JsValue::from_str(&error.to_string()))?;
        Self::with_graph(canvas, graph, &config)
    }

    /// Shows a generated debug graph.
    pub fn demo(canvas: HtmlCanvasElement, seed: u64) -> Result<GraphCanvas, JsValue> {
        let mut rng = SimpleRng::new(seed);
        let graph = random_graph(Box::new(DebugContentProvider::new(seed)), &mut rng);
        Self::with_graph(canvas, graph, &Config::default())
    }

    /// Starts the redraw loop; frames only repaint when something changed. The frame
    /// closure is built once and reused, so a restart never drops a queued callback.
    pub fn start(&self) {
        if !self.state.borrow_mut().redraw.start() {
            return;
        }
        if self.animate.borrow().is_none() {
            let (state, animate) = (self.state.clone(), self.animate.clone());
            *self.animate.borrow_mut() = Some(Closure::new(move || {
                let again = {
                    let mut guard = state.borrow_mut();
                    let CanvasState {
                        view,
                        surface,
                        redraw,
                    } = &mut *guard;
                    redraw.tick(|| view.frame(surface, false))
                };
                if again && let Some(ref cb) = *animate.borrow() {
                    request_frame(cb);
                }
            }));
        }
        if let Some(ref cb) = *self.animate.borrow() {
            request_frame(cb);
        }
        log::debug!("graph canvas redraw loop started");
    }

    pub fn stop(&self) {
        self.state.borrow_mut().redraw.stop();
    }

    /// Matches the canvas backing store to its CSS size.
    pub fn resize(&self, width: u32, height: u32) {
        self.canvas.set_width(width);
        self.canvas.set_height(height);
        let mut state = self.state.borrow_mut();
        state.surface.resize(width as f32, height as f32);
        state.view.resize(width as f32, height as f32);
    }

    pub fn center(&self) {
        self.state.borrow_mut().view.center();
    }

    pub fn pointer_down(&self, x: f32, y: f32) {
        self.state.borrow_mut().view.pointer_down(x, y);
    }

    pub fn pointer_move(&self, x: f32, y: f32) {
        self.state.borrow_mut().view.pointer_move(x, y);
    }

    /// Ends a drag and treats the release as a click; returns the selected vertex.
    pub fn pointer_up(&self, x: f32, y: f32) -> Option<u32> {
        let now = now();
        let mut state = self.state.borrow_mut();
        state.view.pointer_up(now);
        state.view.click(x, y, now);
        state.view.graph().selected().map(|handle| handle.index() as u32)
    }

    /// `delta_mode` follows `WheelEvent.deltaMode`: 0 pixels, 1 lines, 2 pages.
    pub fn wheel(&self, delta_y: f32, delta_mode: u32) {
        let mode = match delta_mode {
            1 => WheelMode::Line,
            2 => WheelMode::Page,
            _ => WheelMode::Pixel,
        };
        self.state
            .borrow_mut()
            .view
            .wheel(WheelInput { delta_y, mode });
    }

    /// Touch points as a flat `[x0, y0, x1, y1, ...]` array in canvas coordinates.
    pub fn touch_move(&self, points: Vec<f32>) {
        let points: Vec<(f32, f32)> = points
            .chunks_exact(2)
            .map(|pair| (pair[0], pair[1]))
            .collect();
        self.state.borrow_mut().view.touch_move(&points);
    }

    pub fn touch_end(&self) {
        self.state.borrow_mut().view.touch_end(now());
    }

    pub fn zoom(&self) -> f32 {
        self.state.borrow().view.camera().zoom()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_document_with_selection() {
        let document = r#"{
            vertices: [
                { id: 0, lines: [["cmp", " r1, r2"]] },
                { id: 1, lines: [["mov", " r0, 1"]] },
                { id: 2, lines: [["mov", " r0, 0"]] },
            ],
            edges: [{ source: 0, target: 1 }, { source: 0, target: 2 }],
        }"#;
        let options: SvgOptions =
            serde_json::from_str(r#"{"theme":"light","width":400,"select":1}"#).unwrap();
        let svg = render_document(document, options).expect("document should render");
        assert!(svg.contains("<svg"));
        assert!(svg.contains("width=\"400\""));
        assert!(svg.contains("cmp"));
    }

    #[test]
    fn rejects_out_of_range_selection_and_unknown_theme() {
        let document = "{ vertices: [{ id: 0 }] }";
        let select = SvgOptions {
            select: Some(3),
            ..SvgOptions::default()
        };
        assert!(render_document(document, select).is_err());
        let theme = SvgOptions {
            theme: Some("neon".to_string()),
            ..SvgOptions::default()
        };
        assert!(render_document(document, theme).is_err());
    }
}
