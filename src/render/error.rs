use crate::config::Config;
use crate::surface::{Affine, DrawingSurface, Font};
use crate::theme::Theme;

/// Paints the terminal error state in screen space, centred on the surface.
#[derive(Debug, Clone)]
pub struct ErrorRenderer {
    theme: Theme,
}

impl ErrorRenderer {
    pub fn new(config: &Config) -> Self {
        Self {
            theme: config.theme.clone(),
        }
    }

    pub fn render(&self, surface: &mut dyn DrawingSurface, message: &str) {
        let (width, height) = surface.size();
        let font = Font::new(self.theme.font_family.as_str(), self.theme.font_size);
        let lines: Vec<&str> = std::iter::once("unable to display graph")
            .chain(message.lines())
            .collect();
        let line_height = surface.measure_text("M", &font).height() * 1.5;
        let total = line_height * lines.len() as f32;

        surface.save();
        surface.set_transform(Affine::IDENTITY);
        surface.set_shadow(None);
        surface.set_font(&font);
        surface.set_fill_color(&self.theme.error_text);
        for (i, line) in lines.iter().enumerate() {
            let text_width = surface.measure_text(line, &font).width;
            let x = (width - text_width) / 2.0;
            let y = (height - total) / 2.0 + line_height * (i + 1) as f32;
            surface.fill_text(line, x, y);
        }
        surface.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::RecordingSurface;

    #[test]
    fn paints_heading_and_message() {
        let renderer = ErrorRenderer::new(&Config::default());
        let mut surface = RecordingSurface::new(400.0, 300.0);
        renderer.render(&mut surface, "graph integrity check failed");
        let texts: Vec<_> = surface.texts().collect();
        assert_eq!(texts, vec!["unable to display graph", "graph integrity check failed"]);
    }
}
