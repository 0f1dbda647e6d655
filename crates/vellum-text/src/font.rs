// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Font registry and the metrics/rasterization port.
//!
//! The engine never touches font files. Hosts implement [`FontProvider`]
//! and hand it in; [`MonoProvider`] is the built-in deterministic fallback
//! used headless and under test.

use vellum_model::StyleFlags;

/// Metrics for a single glyph at a given size.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GlyphMetrics {
    /// Horizontal advance in layout units.
    pub advance: f32,
    /// Left side bearing.
    pub bearing_x: f32,
    /// Top of the glyph box relative to the baseline.
    pub bearing_y: f32,
    /// Ink box width.
    pub width: f32,
    /// Ink box height.
    pub height: f32,
}

/// Per-font vertical metrics at a given size.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LineMetrics {
    /// Ascent above the baseline.
    pub ascent: f32,
    /// Descent below the baseline (positive).
    pub descent: f32,
    /// Extra leading between lines.
    pub line_gap: f32,
}

impl LineMetrics {
    /// Baseline-to-baseline distance.
    #[must_use]
    pub fn line_height(&self) -> f32 {
        self.ascent + self.descent + self.line_gap
    }
}

/// Coverage bitmap for one rasterized glyph.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GlyphBitmap {
    /// Bitmap width in pixels.
    pub width: u32,
    /// Bitmap height in pixels.
    pub height: u32,
    /// `width * height` coverage bytes, row-major.
    pub coverage: Vec<u8>,
}

/// Port supplying font metrics and glyph bitmaps to the engine.
///
/// Implementations must be deterministic: the same (font, size, code point,
/// flags) query returns the same answer for the lifetime of the engine
/// instance, or layout output stops being reproducible.
pub trait FontProvider {
    /// Metrics for one code point. Only `BOLD` and `ITALIC` may affect the
    /// result; decorations are materialized downstream.
    fn glyph_metrics(&self, font: u32, size_pt: f32, ch: char, flags: StyleFlags) -> GlyphMetrics;

    /// Vertical metrics for a font at a size.
    fn line_metrics(&self, font: u32, size_pt: f32) -> LineMetrics;

    /// Rasterizes one glyph at an integer pixel size.
    fn rasterize(&self, font: u32, size_px: u32, ch: char, flags: StyleFlags) -> GlyphBitmap;
}

/// Deterministic synthetic monospace provider.
///
/// Every glyph advances 0.6 em and rasterizes to a filled box. Good enough
/// for headless layout, caret math, and atlas exercise; hosts that care
/// about real shapes supply their own provider.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonoProvider;

impl FontProvider for MonoProvider {
    fn glyph_metrics(&self, _font: u32, size_pt: f32, ch: char, flags: StyleFlags) -> GlyphMetrics {
        let em = size_pt.max(1.0);
        let wide = flags.contains(StyleFlags::BOLD);
        let advance = if ch == '\t' {
            em * 2.4
        } else {
            em * if wide { 0.66 } else { 0.6 }
        };
        GlyphMetrics {
            advance,
            bearing_x: em * 0.05,
            bearing_y: em * 0.75,
            width: advance * 0.9,
            height: em * 0.9,
        }
    }

    fn line_metrics(&self, _font: u32, size_pt: f32) -> LineMetrics {
        let em = size_pt.max(1.0);
        LineMetrics {
            ascent: em * 0.78,
            descent: em * 0.22,
            line_gap: em * 0.2,
        }
    }

    fn rasterize(&self, _font: u32, size_px: u32, ch: char, _flags: StyleFlags) -> GlyphBitmap {
        let size_px = size_px.clamp(1, 256);
        let w = (size_px * 3).div_euclid(5).max(1);
        let h = size_px;
        let coverage = if ch.is_whitespace() {
            vec![0u8; (w * h) as usize]
        } else {
            vec![0xFF; (w * h) as usize]
        };
        GlyphBitmap {
            width: w,
            height: h,
            coverage,
        }
    }
}

/// Registry mapping font names to stable u32 ids.
///
/// Id 0 is always the default font; registering the same name twice returns
/// the existing id.
#[derive(Debug, Clone)]
pub struct FontRegistry {
    names: Vec<String>,
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self {
            names: vec!["default".to_owned()],
        }
    }
}

impl FontRegistry {
    /// Creates a registry holding only the default font.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a font name, returning its id. Idempotent per name.
    pub fn register(&mut self, name: &str) -> u32 {
        if let Some(idx) = self.names.iter().position(|n| n == name) {
            return idx as u32;
        }
        self.names.push(name.to_owned());
        (self.names.len() - 1) as u32
    }

    /// Looks up a font name by id.
    #[must_use]
    pub fn name(&self, id: u32) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    /// Number of registered fonts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false: the default font is never removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}
