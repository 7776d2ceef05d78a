//! Text width measurement for raster map titles.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use ttf_parser::Face;
use usvg::fontdb::{Database, Family, Query, Stretch, Style, Weight};

/// Advance used per character when no font is available, relative to the font size.
pub const FALLBACK_CHAR_WIDTH: f32 = 0.56;

static FONT_DB: Lazy<Arc<Database>> = Lazy::new(|| {
    let mut db = Database::new();
    db.load_system_fonts();
    log::debug!("Loaded {} system font faces", db.len());
    Arc::new(db)
});

static TEXT_MEASURER: Lazy<Mutex<TextMeasurer>> = Lazy::new(|| Mutex::new(TextMeasurer::new()));

/// System fonts, loaded once. Titles are measured and drawn with this database.
pub fn font_database() -> Arc<Database> {
    Arc::clone(&FONT_DB)
}

/// Width of `text` in pixels, or `None` when no matching font is installed.
pub fn measure_text_width(text: &str, font_size: f32, font_family: &str, bold: bool) -> Option<f32> {
    if text.is_empty() || font_size <= 0.0 {
        return Some(0.0);
    }
    let mut guard = TEXT_MEASURER.lock().ok()?;
    guard.measure(text, font_size, font_family, bold)
}

/// Like [`measure_text_width`], estimating from the font size when no font is found.
pub fn text_width_or_estimate(text: &str, font_size: f32, font_family: &str, bold: bool) -> f32 {
    measure_text_width(text, font_size, font_family, bold).unwrap_or_else(|| {
        log::warn!("No font found for {font_family:?}, estimating title width");
        text.chars().count() as f32 * font_size * FALLBACK_CHAR_WIDTH
    })
}

struct TextMeasurer {
    db: Arc<Database>,
    cache: HashMap<(String, bool), Option<FontFace>>,
}

impl TextMeasurer {
    fn new() -> Self {
        Self {
            db: font_database(),
            cache: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f32, font_family: &str, bold: bool) -> Option<f32> {
        let key = (normalize_family_key(font_family), bold);
        if !self.cache.contains_key(&key) {
            let face = self.load_face(font_family, bold);
            self.cache.insert(key.clone(), face);
        }
        let face = self.cache.get_mut(&key).and_then(|face| face.as_mut())?;
        face.measure_width(text, font_size)
    }

    fn load_face(&self, font_family: &str, bold: bool) -> Option<FontFace> {
        let names: Vec<&str> = font_family
            .split(',')
            .map(|part| part.trim().trim_matches('"').trim_matches('\''))
            .filter(|part| !part.is_empty())
            .collect();
        let mut families: Vec<Family<'_>> = names
            .iter()
            .map(|name| match name.to_ascii_lowercase().as_str() {
                "serif" => Family::Serif,
                "sans-serif" => Family::SansSerif,
                "monospace" => Family::Monospace,
                _ => Family::Name(*name),
            })
            .collect();
        if families.is_empty() {
            families.push(Family::SansSerif);
        }

        let query = Query {
            families: &families,
            weight: if bold { Weight::BOLD } else { Weight::NORMAL },
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        self.db
            .with_face_data(id, |data, index| FontFace::new(data.to_vec(), index))
            .flatten()
    }
}

struct FontFace {
    data: Vec<u8>,
    index: u32,
    units_per_em: u16,
    advance_cache: HashMap<char, Option<u16>>,
}

impl FontFace {
    fn new(data: Vec<u8>, index: u32) -> Option<Self> {
        let units_per_em = Face::parse(&data, index).ok()?.units_per_em().max(1);
        Some(Self {
            data,
            index,
            units_per_em,
            advance_cache: HashMap::new(),
        })
    }

    fn measure_width(&mut self, text: &str, font_size: f32) -> Option<f32> {
        let face = Face::parse(&self.data, self.index).ok()?;
        let scale = font_size / f32::from(self.units_per_em);
        let fallback = font_size * FALLBACK_CHAR_WIDTH;
        let mut width = 0.0f32;
        for ch in text.chars().filter(|ch| *ch != '\n') {
            let advance = *self.advance_cache.entry(ch).or_insert_with(|| {
                face.glyph_index(ch)
                    .and_then(|glyph| face.glyph_hor_advance(glyph))
            });
            width += match advance {
                Some(advance) if advance > 0 => f32::from(advance) * scale,
                _ => fallback,
            };
        }
        Some(width.max(0.0))
    }
}

fn normalize_family_key(font_family: &str) -> String {
    let trimmed = font_family.trim();
    if trimmed.is_empty() {
        "sans-serif".to_string()
    } else {
        trimmed.to_ascii_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_has_no_width() {
        assert_eq!(measure_text_width("", 12.0, "sans-serif", true), Some(0.0));
        assert_eq!(measure_text_width("abc", 0.0, "sans-serif", false), Some(0.0));
    }

    #[test]
    fn estimate_grows_with_text_length() {
        let short = text_width_or_estimate("Kaart", 16.0, "sans-serif", true);
        let long = text_width_or_estimate("Kaart van Nederland", 16.0, "sans-serif", true);
        assert!(short > 0.0);
        assert!(long > short);
    }

    #[test]
    fn measurer_uses_the_shared_font_database() {
        let guard = TEXT_MEASURER.lock().unwrap();
        assert!(Arc::ptr_eq(&guard.db, &font_database()));
    }

    #[test]
    fn family_keys_are_case_insensitive() {
        assert_eq!(normalize_family_key(" DejaVu Sans "), "dejavu sans");
        assert_eq!(normalize_family_key(""), "sans-serif");
    }
}
