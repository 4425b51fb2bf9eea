//! Paint and measurement primitives the engine draws through.
//!
//! The renderers only ever issue the calls on [`DrawingSurface`]; every backend (SVG,
//! browser canvas, the recording surface used by tests) implements the same small set.

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextMeasure {
    pub width: f32,
    pub ascent: f32,
    pub descent: f32,
}

impl TextMeasure {
    pub fn height(&self) -> f32 {
        self.ascent + self.descent
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Font {
    pub family: String,
    pub size: f32,
}

impl Font {
    pub fn new(family: impl Into<String>, size: f32) -> Self {
        Self {
            family: family.into(),
            size,
        }
    }

    /// CSS shorthand, e.g. `16px Consolas`.
    pub fn css(&self) -> String {
        format!("{}px {}", self.size, self.family)
    }
}

pub trait TextMeasurer {
    fn measure_text(&self, text: &str, font: &Font) -> TextMeasure;
}

/// 2D affine transform in canvas order: `x' = a·x + c·y + e`, `y' = b·x + d·y + f`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Affine {
    pub const IDENTITY: Affine = Affine {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn translate(x: f32, y: f32) -> Self {
        Self {
            e: x,
            f: y,
            ..Self::IDENTITY
        }
    }

    pub fn scale(factor: f32) -> Self {
        Self {
            a: factor,
            d: factor,
            ..Self::IDENTITY
        }
    }

    /// `self` followed by `next` in canvas call order: `self.then(next)` maps a point
    /// through `next` first, exactly like `ctx.transform(self); ctx.transform(next)`.
    pub fn then(&self, next: &Affine) -> Affine {
        Affine {
            a: self.a * next.a + self.c * next.b,
            b: self.b * next.a + self.d * next.b,
            c: self.a * next.c + self.c * next.d,
            d: self.b * next.c + self.d * next.d,
            e: self.a * next.e + self.c * next.f + self.e,
            f: self.b * next.e + self.d * next.f + self.f,
        }
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    pub fn invert(&self) -> Option<Affine> {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() <= f32::EPSILON || !det.is_finite() {
            return None;
        }
        let inv = 1.0 / det;
        Some(Affine {
            a: self.d * inv,
            b: -self.b * inv,
            c: -self.c * inv,
            d: self.a * inv,
            e: (self.c * self.f - self.d * self.e) * inv,
            f: (self.b * self.e - self.a * self.f) * inv,
        })
    }

    /// Uniform scale factor, assuming no skew.
    pub fn scale_factor(&self) -> f32 {
        (self.a * self.a + self.b * self.b).sqrt()
    }
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shadow {
    pub color: String,
    pub offset_x: f32,
    pub offset_y: f32,
    pub blur: f32,
}

pub trait DrawingSurface: TextMeasurer {
    /// Surface size in device pixels.
    fn size(&self) -> (f32, f32);
    /// Clears the whole surface regardless of the current transform.
    fn clear(&mut self);
    fn save(&mut self);
    fn restore(&mut self);
    fn set_transform(&mut self, transform: Affine);
    /// Composes `transform` onto the current transform.
    fn transform(&mut self, transform: Affine);
    fn set_fill_color(&mut self, color: &str);
    fn set_stroke_color(&mut self, color: &str);
    fn set_line_width(&mut self, width: f32);
    fn set_shadow(&mut self, shadow: Option<Shadow>);
    fn set_font(&mut self, font: &Font);
    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32);
    fn stroke_polyline(&mut self, points: &[(f32, f32)]);
    fn fill_text(&mut self, text: &str, x: f32, y: f32);
}

/// Fixed-advance measurer; used when no system font is available and in tests.
#[derive(Debug, Clone, Copy)]
pub struct MonospaceMeasurer {
    pub advance: f32,
    pub ascent: f32,
    pub descent: f32,
}

impl Default for MonospaceMeasurer {
    fn default() -> Self {
        Self {
            advance: 0.6,
            ascent: 0.8,
            descent: 0.2,
        }
    }
}

impl TextMeasurer for MonospaceMeasurer {
    fn measure_text(&self, text: &str, font: &Font) -> TextMeasure {
        let columns: usize = text
            .chars()
            .map(|ch| match ch {
                '\t' => 4,
                '\n' => 0,
                _ => 1,
            })
            .sum();
        TextMeasure {
            width: columns as f32 * self.advance * font.size,
            ascent: self.ascent * font.size,
            descent: self.descent * font.size,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear,
    FillRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: String,
        shadow: Option<Shadow>,
        transform: Affine,
    },
    StrokePolyline {
        points: Vec<(f32, f32)>,
        color: String,
        width: f32,
        transform: Affine,
    },
    FillText {
        text: String,
        x: f32,
        y: f32,
        color: String,
        font: Font,
        transform: Affine,
    },
}

#[derive(Debug, Clone)]
struct PaintState {
    fill: String,
    stroke: String,
    line_width: f32,
    shadow: Option<Shadow>,
    font: Font,
    transform: Affine,
}

impl Default for PaintState {
    fn default() -> Self {
        Self {
            fill: "#000000".to_string(),
            stroke: "#000000".to_string(),
            line_width: 1.0,
            shadow: None,
            font: Font::new("sans-serif", 10.0),
            transform: Affine::IDENTITY,
        }
    }
}

/// Keeps every paint call as a [`DrawCommand`]; measures with [`MonospaceMeasurer`].
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    width: f32,
    height: f32,
    measurer: MonospaceMeasurer,
    state: PaintState,
    stack: Vec<PaintState>,
    commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            measurer: MonospaceMeasurer::default(),
            state: PaintState::default(),
            stack: Vec::new(),
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn polylines(&self) -> impl Iterator<Item = (&[(f32, f32)], &str)> {
        self.commands.iter().filter_map(|command| match command {
            DrawCommand::StrokePolyline { points, color, .. } => {
                Some((points.as_slice(), color.as_str()))
            }
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|command| match command {
            DrawCommand::FillText { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

impl TextMeasurer for RecordingSurface {
    fn measure_text(&self, text: &str, font: &Font) -> TextMeasure {
        self.measurer.measure_text(text, font)
    }
}

impl DrawingSurface for RecordingSurface {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.commands.push(DrawCommand::Clear);
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
        self.commands.push(DrawCommand::FillRect {
            x,
            y,
            width,
            height,
            color: self.state.fill.clone(),
            shadow: self.state.shadow.clone(),
            transform: self.state.transform,
        });
    }

    fn stroke_polyline(&mut self, points: &[(f32, f32)]) {
        if points.len() < 2 {
            return;
        }
        self.commands.push(DrawCommand::StrokePolyline {
            points: points.to_vec(),
            color: self.state.stroke.clone(),
            width: self.state.line_width,
            transform: self.state.transform,
        });
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32) {
        self.commands.push(DrawCommand::FillText {
            text: text.to_string(),
            x,
            y,
            color: self.state.fill.clone(),
            font: self.state.font.clone(),
            transform: self.state.transform,
        });
    }
}
