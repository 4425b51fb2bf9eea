//! Pan/zoom state of a graph view and the affine transform it implies.

use crate::config::CameraConfig;
use crate::surface::Affine;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Idle,
    /// Pointer drag; `origin` is the grab point in camera space (`screen / zoom - position`).
    Panning { origin: (f32, f32) },
    /// Two-finger pinch; `baseline` is the squared finger distance of the first sample.
    Pinching { baseline: Option<f32> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WheelMode {
    #[default]
    Pixel,
    Line,
    Page,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelInput {
    pub delta_y: f32,
    pub mode: WheelMode,
}

impl WheelInput {
    pub fn pixels(delta_y: f32) -> Self {
        Self {
            delta_y,
            mode: WheelMode::Pixel,
        }
    }

    pub fn lines(delta_y: f32) -> Self {
        Self {
            delta_y,
            mode: WheelMode::Line,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Camera {
    config: CameraConfig,
    x: f32,
    y: f32,
    zoom: f32,
    last_zoom: f32,
    viewport: (f32, f32),
    gesture: Gesture,
    dirty: bool,
}

impl Camera {
    pub fn new(config: &CameraConfig, viewport: (f32, f32)) -> Self {
        let config = Self::ordered_bounds(config);
        let zoom = if config.initial_zoom.is_finite() {
            config.initial_zoom.clamp(config.min_zoom, config.max_zoom)
        } else {
            1.0_f32.clamp(config.min_zoom, config.max_zoom)
        };
        Self {
            config,
            x: 0.0,
            y: 0.0,
            zoom,
            last_zoom: zoom,
            viewport,
            gesture: Gesture::Idle,
            dirty: true,
        }
    }

    /// Swaps inverted zoom bounds and falls back to the defaults for non-finite ones,
    /// so clamping never sees `min > max` or NaN.
    fn ordered_bounds(config: &CameraConfig) -> CameraConfig {
        let mut config = config.clone();
        if !(config.min_zoom.is_finite() && config.max_zoom.is_finite()) {
            let defaults = CameraConfig::default();
            config.min_zoom = defaults.min_zoom;
            config.max_zoom = defaults.max_zoom;
        }
        if config.min_zoom > config.max_zoom {
            tracing::warn!(
                min_zoom = config.min_zoom,
                max_zoom = config.max_zoom,
                "camera zoom bounds inverted, swapping"
            );
            std::mem::swap(&mut config.min_zoom, &mut config.max_zoom);
        }
        config
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn last_zoom(&self) -> f32 {
        self.last_zoom
    }

    pub fn viewport(&self) -> (f32, f32) {
        self.viewport
    }

    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    pub fn is_panning(&self) -> bool {
        matches!(self.gesture, Gesture::Panning { .. })
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns and clears the dirty flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        if self.viewport != (width, height) {
            self.viewport = (width, height);
            self.dirty = true;
        }
    }

    pub fn pointer_down(&mut self, sx: f32, sy: f32) {
        let origin = (sx / self.zoom - self.x, sy / self.zoom - self.y);
        tracing::debug!(?origin, "camera pan start");
        self.gesture = Gesture::Panning { origin };
    }

    /// Returns whether the camera moved.
    pub fn pointer_move(&mut self, sx: f32, sy: f32) -> bool {
        let Gesture::Panning { origin } = self.gesture else {
            return false;
        };
        let next = (sx / self.zoom - origin.0, sy / self.zoom - origin.1);
        if !(next.0.is_finite() && next.1.is_finite()) || next == (self.x, self.y) {
            return false;
        }
        (self.x, self.y) = next;
        self.dirty = true;
        true
    }

    /// Ends any pan or pinch and records the current zoom as the pinch baseline.
    pub fn pointer_up(&mut self) {
        if self.gesture != Gesture::Idle {
            tracing::debug!(zoom = self.zoom, "camera gesture end");
        }
        self.gesture = Gesture::Idle;
        self.last_zoom = self.zoom;
    }

    fn wheel_sensitivity(&self, input: &WheelInput) -> f32 {
        let trackpad = match input.mode {
            WheelMode::Line | WheelMode::Page => false,
            WheelMode::Pixel => {
                input.delta_y.fract() != 0.0
                    || input.delta_y.abs() < self.config.trackpad_delta_threshold
            }
        };
        if trackpad {
            self.config.trackpad_sensitivity
        } else {
            self.config.scroll_sensitivity
        }
    }

    /// Additive zoom step; ignored while a pan is in progress. Returns whether zoom changed.
    pub fn wheel(&mut self, input: WheelInput) -> bool {
        if self.is_panning() || !input.delta_y.is_finite() {
            return false;
        }
        let sensitivity = self.wheel_sensitivity(&input);
        let changed = self.set_zoom(self.zoom - input.delta_y * sensitivity);
        self.last_zoom = self.zoom;
        changed
    }

    /// Touch move with the current touch points. One finger pans, two fingers pinch.
    pub fn touch_move(&mut self, points: &[(f32, f32)]) -> bool {
        match points {
            [(x, y)] => {
                if !self.is_panning() {
                    // A later pinch scales from the zoom this gesture ended at.
                    self.last_zoom = self.zoom;
                    self.pointer_down(*x, *y);
                    return false;
                }
                self.pointer_move(*x, *y)
            }
            [a, b] => {
                let distance = (a.0 - b.0).powi(2) + (a.1 - b.1).powi(2);
                match self.gesture {
                    Gesture::Pinching {
                        baseline: Some(baseline),
                    } => self.set_zoom((distance / baseline).sqrt() * self.last_zoom),
                    _ => {
                        self.last_zoom = self.zoom;
                        let baseline = (distance > 0.0 && distance.is_finite()).then_some(distance);
                        tracing::debug!(?baseline, "camera pinch start");
                        self.gesture = Gesture::Pinching { baseline };
                        false
                    }
                }
            }
            _ => false,
        }
    }

    pub fn touch_end(&mut self) {
        self.pointer_up();
    }

    /// Sets zoom clamped to the configured bounds. Non-finite values are ignored.
    pub fn set_zoom(&mut self, zoom: f32) -> bool {
        if !zoom.is_finite() {
            return false;
        }
        let zoom = zoom.clamp(self.config.min_zoom, self.config.max_zoom);
        if zoom == self.zoom {
            return false;
        }
        self.zoom = zoom;
        self.dirty = true;
        true
    }

    /// Zooms so that `bounds` (x, y, width, height) fills most of the viewport.
    pub fn fit(&mut self, (_, _, width, height): (f32, f32, f32, f32)) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        let (vw, vh) = self.viewport;
        self.set_zoom((vw / width).min(vh / height) * 0.9);
        self.last_zoom = self.zoom;
    }

    /// Pans so the centre of `bounds` sits in the middle of the viewport.
    pub fn center_on(&mut self, (x, y, width, height): (f32, f32, f32, f32)) {
        let (cx, cy) = (self.viewport.0 / 2.0, self.viewport.1 / 2.0);
        let next = (cx - (x + width / 2.0), cy - (y + height / 2.0));
        if next != (self.x, self.y) {
            (self.x, self.y) = next;
            self.dirty = true;
        }
    }

    pub fn reset(&mut self) {
        let viewport = self.viewport;
        *self = Self::new(&self.config, viewport);
    }

    /// `translate(centre) · scale(zoom) · translate(-centre + position)`.
    pub fn transform(&self) -> Affine {
        let (cx, cy) = (self.viewport.0 / 2.0, self.viewport.1 / 2.0);
        Affine::translate(cx, cy)
            .then(&Affine::scale(self.zoom))
            .then(&Affine::translate(-cx + self.x, -cy + self.y))
    }

    pub fn canvas_to_screen(&self, x: f32, y: f32) -> (f32, f32) {
        self.transform().apply(x, y)
    }

    pub fn screen_to_canvas(&self, sx: f32, sy: f32) -> Option<(f32, f32)> {
        self.transform().invert().map(|inverse| inverse.apply(sx, sy))
    }
}
