//! Content of a graph panel: graph, render pipeline and camera, plus the per-frame
//! repaint policy.

use std::time::Duration;

use crate::camera::{Camera, WheelInput};
use crate::config::{Config, ViewConfig};
use crate::ir::{Graph, VertexHandle};
use crate::render::{GraphRenderer, RenderState};
use crate::surface::{DrawingSurface, MonospaceMeasurer, TextMeasurer};
use crate::text_metrics::FontMeasurer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The owning panel is moving, resizing, collapsed or closing.
    Suppressed,
    /// Nothing changed since the last paint.
    Idle,
    Painted,
}

pub struct GraphView {
    graph: Graph,
    renderer: GraphRenderer,
    camera: Camera,
    measurer: Box<dyn TextMeasurer>,
    config: ViewConfig,
    needs_paint: bool,
    centered: bool,
    drag_moved: bool,
    drag_ended: Option<Duration>,
    painted_state: RenderState,
    painted_layouts: usize,
}

impl GraphView {
    pub fn new(graph: Graph, config: &Config, viewport: (f32, f32)) -> Self {
        let measurer: Box<dyn TextMeasurer> = if config.render.fast_text {
            Box::new(MonospaceMeasurer::default())
        } else {
            Box::new(FontMeasurer::new())
        };
        Self::with_measurer(graph, config, viewport, measurer)
    }

    pub fn with_measurer(
        graph: Graph,
        config: &Config,
        viewport: (f32, f32),
        measurer: Box<dyn TextMeasurer>,
    ) -> Self {
        Self {
            graph,
            renderer: GraphRenderer::new(config),
            camera: Camera::new(&config.camera, viewport),
            measurer,
            config: config.view.clone(),
            needs_paint: true,
            centered: false,
            drag_moved: false,
            drag_ended: None,
            painted_state: RenderState::Empty,
            painted_layouts: 0,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Mutable access for the owner; the next frame re-checks the graph.
    pub fn graph_mut(&mut self) -> &mut Graph {
        self.needs_paint = true;
        &mut self.graph
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn renderer(&self) -> &GraphRenderer {
        &self.renderer
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.camera.set_viewport(width, height);
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.drag_moved = false;
        self.camera.pointer_down(x, y);
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        if self.camera.pointer_move(x, y) {
            self.drag_moved = true;
        }
    }

    /// Ends a drag. A drag that moved the camera opens the click-suppression window.
    pub fn pointer_up(&mut self, now: Duration) {
        let was_panning = self.camera.is_panning();
        self.camera.pointer_up();
        if was_panning && self.drag_moved {
            self.drag_ended = Some(now);
        }
        self.drag_moved = false;
    }

    fn click_suppressed(&self, now: Duration) -> bool {
        self.drag_ended.is_some_and(|ended| {
            now.saturating_sub(ended) < Duration::from_millis(self.config.click_suppress_ms)
        })
    }

    /// Selects the vertex under the screen point, or clears the selection.
    pub fn click(&mut self, x: f32, y: f32, now: Duration) -> Option<VertexHandle> {
        if self.click_suppressed(now) {
            tracing::debug!("click suppressed after drag");
            return None;
        }
        let (cx, cy) = self.camera.screen_to_canvas(x, y)?;
        let before = self.graph.selected();
        let hit = self.renderer.select(&mut self.graph, cx, cy);
        if hit != before {
            self.needs_paint = true;
        }
        hit
    }

    pub fn wheel(&mut self, input: WheelInput) {
        self.camera.wheel(input);
    }

    pub fn touch_move(&mut self, points: &[(f32, f32)]) {
        if self.camera.touch_move(points) {
            self.drag_moved = true;
        }
    }

    pub fn touch_end(&mut self, now: Duration) {
        self.pointer_up(now);
    }

    /// Centres the camera on the drawn graph.
    pub fn center(&mut self) {
        if let Some(bounds) = self.renderer.bounds() {
            self.camera.center_on(bounds);
        }
    }

    /// Repaints when the camera, the selection or the render state changed since the
    /// last paint. `busy` skips the frame entirely.
    pub fn frame(&mut self, surface: &mut dyn DrawingSurface, busy: bool) -> FrameOutcome {
        if busy {
            return FrameOutcome::Suppressed;
        }
        let state = self
            .renderer
            .preprocess(self.measurer.as_ref(), &mut self.graph)
            .clone();
        if state == RenderState::Ready && !self.centered {
            self.centered = true;
            self.center();
        }

        let layouts = self.renderer.layout_computations();
        let changed = self.camera.take_dirty()
            || self.needs_paint
            || state != self.painted_state
            || layouts != self.painted_layouts;
        if !changed {
            return FrameOutcome::Idle;
        }

        surface.clear();
        surface.save();
        surface.set_transform(self.camera.transform());
        self.renderer.render(surface, &self.graph, self.camera.zoom());
        surface.restore();

        self.needs_paint = false;
        self.painted_state = state;
        self.painted_layouts = layouts;
        FrameOutcome::Painted
    }
}

impl std::fmt::Debug for GraphView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphView")
            .field("graph", &self.graph)
            .field("camera", &self.camera)
            .field("renderer", &self.renderer)
            .finish_non_exhaustive()
    }
}

/// Self-rescheduling per-frame callback driver. Stopping is the only way to cancel.
///
/// At most one frame request is outstanding: `pending` stays set from the request
/// until the host runs [`RedrawLoop::tick`].
#[derive(Debug, Clone, Default)]
pub struct RedrawLoop {
    running: bool,
    pending: bool,
    frames: u64,
    painted: u64,
}

impl RedrawLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the host should request a frame. A restart while the previous
    /// request is still outstanding reuses that request.
    pub fn start(&mut self) -> bool {
        self.running = true;
        if self.pending {
            return false;
        }
        self.pending = true;
        true
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn painted(&self) -> u64 {
        self.painted
    }

    /// Runs one frame and returns whether the host should schedule the next one.
    pub fn tick<F>(&mut self, frame: F) -> bool
    where
        F: FnOnce() -> FrameOutcome,
    {
        self.pending = false;
        if !self.running {
            return false;
        }
        self.frames += 1;
        if frame() == FrameOutcome::Painted {
            self.painted += 1;
        }
        self.pending = self.running;
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{DebugContentProvider, sample_graph};
    use crate::surface::RecordingSurface;

    fn view() -> GraphView {
        let mut config = Config::default();
        config.render.fast_text = true;
        let graph = sample_graph(Box::new(DebugContentProvider::new(11)));
        GraphView::new(graph, &config, (800.0, 600.0))
    }

    #[test]
    fn paints_only_when_something_changed() {
        let mut view = view();
        let mut surface = RecordingSurface::new(800.0, 600.0);
        assert_eq!(view.frame(&mut surface, false), FrameOutcome::Painted);
        assert_eq!(view.frame(&mut surface, false), FrameOutcome::Idle);

        view.wheel(WheelInput::lines(-20.0));
        assert_eq!(view.frame(&mut surface, false), FrameOutcome::Painted);
        assert_eq!(view.frame(&mut surface, false), FrameOutcome::Idle);
        assert_eq!(view.renderer().layout_computations(), 1);
    }

    #[test]
    fn busy_panel_suppresses_painting() {
        let mut view = view();
        let mut surface = RecordingSurface::new(800.0, 600.0);
        assert_eq!(view.frame(&mut surface, true), FrameOutcome::Suppressed);
        assert!(surface.commands().is_empty());
        assert_eq!(view.frame(&mut surface, false), FrameOutcome::Painted);
    }

    #[test]
    fn click_selects_and_drag_suppresses_click() {
        let mut view = view();
        let mut surface = RecordingSurface::new(800.0, 600.0);
        view.frame(&mut surface, false);

        let drawing = view.renderer().vertex_drawings()[0].clone();
        let screen = view.camera().canvas_to_screen(
            drawing.x + drawing.width / 2.0,
            drawing.y + drawing.height / 2.0,
        );
        let t0 = Duration::from_secs(10);
        assert_eq!(view.click(screen.0, screen.1, t0), Some(VertexHandle::new(0)));
        assert_eq!(view.frame(&mut surface, false), FrameOutcome::Painted);

        view.pointer_down(10.0, 10.0);
        view.pointer_move(40.0, 10.0);
        view.pointer_up(t0);
        assert_eq!(view.click(300.0, 300.0, t0 + Duration::from_millis(50)), None);
        assert_eq!(view.graph().selected(), Some(VertexHandle::new(0)));

        // A plain click after the window clears the selection.
        view.pointer_down(0.0, 0.0);
        view.pointer_up(t0 + Duration::from_millis(400));
        assert_eq!(view.click(-5000.0, -5000.0, t0 + Duration::from_millis(400)), None);
        assert_eq!(view.graph().selected(), None);
    }

    #[test]
    fn redraw_loop_reschedules_until_stopped() {
        let mut redraw = RedrawLoop::new();
        assert!(!redraw.tick(|| FrameOutcome::Painted));
        assert!(redraw.start());
        assert!(!redraw.start());
        assert!(redraw.tick(|| FrameOutcome::Painted));
        assert!(redraw.tick(|| FrameOutcome::Idle));
        redraw.stop();
        assert!(!redraw.tick(|| FrameOutcome::Painted));
        assert_eq!(redraw.frames(), 2);
        assert_eq!(redraw.painted(), 1);
    }

    #[test]
    fn restart_within_a_frame_keeps_a_single_request() {
        let mut redraw = RedrawLoop::new();
        assert!(redraw.start());
        redraw.stop();
        // The earlier request has not fired yet, so no second one is made.
        assert!(!redraw.start());
        assert!(redraw.is_pending());
        assert!(redraw.tick(|| FrameOutcome::Painted));
        assert_eq!(redraw.frames(), 1);

        redraw.stop();
        assert!(!redraw.tick(|| FrameOutcome::Painted));
        assert!(!redraw.is_pending());
        assert!(redraw.start());
    }
}
