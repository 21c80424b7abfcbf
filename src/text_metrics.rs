use std::collections::HashMap;
use std::sync::Mutex;

use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use ttf_parser::Face;

static FONT_MEASURER: Lazy<Mutex<FontMeasurer>> = Lazy::new(|| Mutex::new(FontMeasurer::new()));

/// Text-measurement capability injected into the layout core. Implementors
/// report the advance width in pixels of a single line of text, or `None`
/// when no usable face exists for the family — the caller treats that as a
/// fatal configuration error.
pub trait TextMeasure {
    fn line_width(&self, line: &str, font_size: f32, font_family: &str) -> Option<f32>;
}

/// Default capability: measures against the system font database. Face
/// lookups and per-glyph advances are cached behind a process-wide lock;
/// the lock is scoped to a single measurement call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemFonts;

impl TextMeasure for SystemFonts {
    fn line_width(&self, line: &str, font_size: f32, font_family: &str) -> Option<f32> {
        if line.is_empty() || font_size <= 0.0 {
            return Some(0.0);
        }
        let mut guard = FONT_MEASURER.lock().ok()?;
        guard.line_width(line, font_size, font_family)
    }
}

/// Deterministic measurer: every glyph advances a fixed fraction of the
/// font size. Lets the layout core run headless (automated tests, servers
/// without fonts) with stable geometry.
#[derive(Debug, Clone, Copy)]
pub struct FixedMetrics {
    pub char_width: f32,
}

impl Default for FixedMetrics {
    fn default() -> Self {
        Self { char_width: 0.56 }
    }
}

impl TextMeasure for FixedMetrics {
    fn line_width(&self, line: &str, font_size: f32, _font_family: &str) -> Option<f32> {
        Some(line.chars().count() as f32 * self.char_width * font_size)
    }
}

struct FontMeasurer {
    db: Database,
    loaded_system_fonts: bool,
    faces: HashMap<String, Option<LoadedFace>>,
}

impl FontMeasurer {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            faces: HashMap::new(),
        }
    }

    fn line_width(&mut self, line: &str, font_size: f32, font_family: &str) -> Option<f32> {
        let key = family_key(font_family);
        if !self.faces.contains_key(&key) {
            let face = self.load_face(font_family);
            self.faces.insert(key.clone(), face);
        }
        let face = self.faces.get_mut(&key)?.as_mut()?;
        let expanded = line.replace('\t', "    ");
        face.line_width(&expanded, font_size)
    }

    fn load_face(&mut self, font_family: &str) -> Option<LoadedFace> {
        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }

        let names: Vec<String> = font_family
            .split(',')
            .map(|part| part.trim().trim_matches('"').trim_matches('\'').to_string())
            .filter(|name| !name.is_empty())
            .collect();
        let mut families: Vec<Family<'_>> = names.iter().map(|name| resolve_family(name)).collect();
        if families.is_empty() {
            families.push(Family::SansSerif);
        }

        // Node and edge labels render bold, so measure against the bold face.
        let query = Query {
            families: &families,
            weight: Weight::BOLD,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query).or_else(|| {
            self.db.query(&Query {
                families: &families,
                weight: Weight::NORMAL,
                stretch: Stretch::Normal,
                style: Style::Normal,
            })
        })?;

        let mut loaded = None;
        self.db.with_face_data(id, |data, index| {
            if let Ok(face) = Face::parse(data, index) {
                loaded = Some(LoadedFace {
                    data: data.to_vec(),
                    index,
                    units_per_em: face.units_per_em().max(1),
                    advances: HashMap::new(),
                });
            }
        });
        loaded
    }
}

struct LoadedFace {
    data: Vec<u8>,
    index: u32,
    units_per_em: u16,
    advances: HashMap<char, Option<u16>>,
}

impl LoadedFace {
    fn line_width(&mut self, line: &str, font_size: f32) -> Option<f32> {
        let face = Face::parse(&self.data, self.index).ok()?;
        let scale = font_size / self.units_per_em as f32;
        let fallback = font_size * 0.56;
        let mut width = 0.0f32;
        for ch in line.chars() {
            let advance = match self.advances.get(&ch) {
                Some(cached) => *cached,
                None => {
                    let advance = face
                        .glyph_index(ch)
                        .and_then(|glyph| face.glyph_hor_advance(glyph));
                    self.advances.insert(ch, advance);
                    advance
                }
            };
            width += advance.map_or(fallback, |units| units as f32 * scale);
        }
        Some(width.max(0.0))
    }
}

fn resolve_family(name: &str) -> Family<'_> {
    match name.to_ascii_lowercase().as_str() {
        "serif" => Family::Serif,
        "sans-serif" | "system-ui" | "-apple-system" | "ui-sans-serif" => Family::SansSerif,
        "monospace" | "ui-monospace" => Family::Monospace,
        "cursive" => Family::Cursive,
        "fantasy" => Family::Fantasy,
        _ => Family::Name(name),
    }
}

fn family_key(font_family: &str) -> String {
    let trimmed = font_family.trim();
    if trimmed.is_empty() {
        "sans-serif".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_metrics_scale_linearly() {
        let metrics = FixedMetrics::default();
        let narrow = metrics.line_width("flow", 10.0, "sans-serif").unwrap();
        let wide = metrics.line_width("flow", 20.0, "sans-serif").unwrap();
        assert!((wide - narrow * 2.0).abs() < 1e-4);
    }

    #[test]
    fn fixed_metrics_empty_line_is_zero() {
        let metrics = FixedMetrics { char_width: 0.5 };
        assert_eq!(metrics.line_width("", 12.0, "sans-serif"), Some(0.0));
    }

    #[test]
    fn system_fonts_empty_line_is_zero() {
        assert_eq!(SystemFonts.line_width("", 12.0, "sans-serif"), Some(0.0));
    }

    #[test]
    fn family_key_defaults_blank_to_sans() {
        assert_eq!(family_key("  "), "sans-serif");
        assert_eq!(family_key("Inter, sans-serif"), "Inter, sans-serif");
    }
}
