use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Mutex;
use ttf_parser::Face;

use crate::surface::{Font, MonospaceMeasurer, TextMeasure, TextMeasurer};

static FONT_CACHE: Lazy<Mutex<FontCache>> = Lazy::new(|| Mutex::new(FontCache::new()));

/// Measures `text` with the system font that best matches `font_family`.
///
/// Tabs advance four spaces. Returns `None` when no font could be resolved.
pub fn measure_text(text: &str, font_size: f32, font_family: &str) -> Option<TextMeasure> {
    if font_size <= 0.0 {
        return Some(TextMeasure::default());
    }
    let mut guard = FONT_CACHE.lock().ok()?;
    guard.measure(text, font_size, font_family)
}

/// [`TextMeasurer`] backed by system fonts, falling back to fixed advances per family
/// that cannot be resolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct FontMeasurer {
    fallback: MonospaceMeasurer,
}

impl FontMeasurer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TextMeasurer for FontMeasurer {
    fn measure_text(&self, text: &str, font: &Font) -> TextMeasure {
        measure_text(text, font.size, &font.family)
            .unwrap_or_else(|| self.fallback.measure_text(text, font))
    }
}

struct FontCache {
    db: Database,
    loaded_system_fonts: bool,
    faces: HashMap<String, Option<FontFace>>,
}

impl FontCache {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            faces: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f32, font_family: &str) -> Option<TextMeasure> {
        let family_key = normalize_family_key(font_family);
        if !self.faces.contains_key(&family_key) {
            let face = self.load_face(font_family);
            if face.is_none() {
                tracing::debug!(family = %family_key, "no system font, using fixed advances");
            }
            self.faces.insert(family_key.clone(), face);
        }
        let face = self.faces.get_mut(&family_key)?.as_mut()?;
        let normalized = text.replace('\t', "    ");
        Some(face.measure(&normalized, font_size))
    }

    fn load_face(&mut self, font_family: &str) -> Option<FontFace> {
        let family_key = normalize_family_key(font_family);
        if let Some(face) = load_cached_face(&family_key) {
            return Some(face);
        }

        let mut names: Vec<&str> = Vec::new();
        let mut generics: Vec<Option<Family<'static>>> = Vec::new();
        for part in font_family.split(',') {
            let raw = part.trim().trim_matches('"').trim_matches('\'');
            if raw.is_empty() {
                continue;
            }
            let generic = match raw.to_ascii_lowercase().as_str() {
                "serif" => Some(Family::Serif),
                "sans-serif" | "system-ui" => Some(Family::SansSerif),
                "monospace" | "ui-monospace" => Some(Family::Monospace),
                _ => None,
            };
            if generic.is_none() {
                names.push(raw);
            }
            generics.push(generic);
        }

        let mut families: Vec<Family<'_>> = Vec::with_capacity(generics.len() + 1);
        let mut named = names.iter();
        for generic in generics {
            match generic {
                Some(family) => families.push(family),
                None => {
                    if let Some(name) = named.next() {
                        families.push(Family::Name(name));
                    }
                }
            }
        }
        // Debugger content is code; prefer a monospace face over the platform default.
        families.push(Family::Monospace);

        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }

        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        let mut loaded: Option<FontFace> = None;
        self.db.with_face_data(id, |data, index| {
            let bytes = data.to_vec();
            if let Some(face) = FontFace::parse(bytes.clone(), index) {
                if let Some((font_path, meta_path)) = cache_paths(&family_key)
                    && !font_path.exists()
                {
                    if let Some(parent) = font_path.parent() {
                        let _ = fs::create_dir_all(parent);
                    }
                    let _ = fs::write(&font_path, &bytes);
                    let _ = fs::write(&meta_path, index.to_string());
                }
                loaded = Some(face);
            }
        });
        loaded
    }
}

struct FontFace {
    data: Vec<u8>,
    index: u32,
    units_per_em: u16,
    ascender: i16,
    descender: i16,
    ascii_advances: [u16; 128],
    advance_cache: HashMap<char, Option<u16>>,
}

impl FontFace {
    fn parse(data: Vec<u8>, index: u32) -> Option<Self> {
        let face = Face::parse(&data, index).ok()?;
        let mut ascii_advances = [0u16; 128];
        for byte in 0u8..=127 {
            if let Some(glyph) = face.glyph_index(byte as char) {
                ascii_advances[byte as usize] = face.glyph_hor_advance(glyph).unwrap_or(0);
            }
        }
        let units_per_em = face.units_per_em().max(1);
        let ascender = face.ascender();
        let descender = face.descender();
        Some(Self {
            data,
            index,
            units_per_em,
            ascender,
            descender,
            ascii_advances,
            advance_cache: HashMap::new(),
        })
    }

    fn measure(&mut self, text: &str, font_size: f32) -> TextMeasure {
        let scale = font_size / self.units_per_em as f32;
        let fallback = font_size * 0.56;
        let mut width = 0.0f32;

        let mut missing: Vec<char> = Vec::new();
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            if ch.is_ascii() {
                let advance = self.ascii_advances[ch as usize];
                width += if advance == 0 {
                    fallback
                } else {
                    advance as f32 * scale
                };
                continue;
            }
            match self.advance_cache.get(&ch) {
                Some(Some(advance)) => width += *advance as f32 * scale,
                Some(None) => width += fallback,
                None => missing.push(ch),
            }
        }

        if !missing.is_empty() {
            let face = Face::parse(&self.data, self.index).ok();
            for ch in missing {
                let advance = face.as_ref().and_then(|face| {
                    face.glyph_index(ch)
                        .and_then(|glyph| face.glyph_hor_advance(glyph))
                });
                self.advance_cache.insert(ch, advance);
                width += advance.map_or(fallback, |advance| advance as f32 * scale);
            }
        }

        TextMeasure {
            width: width.max(0.0),
            ascent: self.ascender as f32 * scale,
            descent: -(self.descender as f32) * scale,
        }
    }
}

fn normalize_family_key(font_family: &str) -> String {
    let trimmed = font_family.trim();
    if trimmed.is_empty() {
        "monospace".to_string()
    } else {
        trimmed.to_string()
    }
}

fn cache_paths(family_key: &str) -> Option<(PathBuf, PathBuf)> {
    let base = std::env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache")))?;
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    family_key.hash(&mut hasher);
    let hash = hasher.finish();
    let dir = base.join("cfgview").join("font-cache");
    let font_path = dir.join(format!("{hash:x}.font"));
    let meta_path = dir.join(format!("{hash:x}.meta"));
    Some((font_path, meta_path))
}

fn load_cached_face(family_key: &str) -> Option<FontFace> {
    let (font_path, meta_path) = cache_paths(family_key)?;
    if !font_path.exists() || !meta_path.exists() {
        return None;
    }
    let bytes = fs::read(font_path).ok()?;
    let index: u32 = fs::read_to_string(meta_path).ok()?.trim().parse().ok()?;
    FontFace::parse(bytes, index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_measurer_is_monotonic_in_text_length() {
        let measurer = FontMeasurer::new();
        let font = Font::new("Consolas", 16.0);
        let short = measurer.measure_text("MOVE", &font);
        let long = measurer.measure_text("MOVE\t1\t2", &font);
        assert!(long.width > short.width);
        assert!(short.height() > 0.0);
    }

    #[test]
    fn zero_size_font_measures_nothing() {
        let measure = measure_text("LOADK", 0.0, "Consolas").unwrap();
        assert_eq!(measure, TextMeasure::default());
    }
}
