// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Growable shelf-packed glyph atlas.
//!
//! Single-channel coverage texture. Glyphs are keyed by
//! (font, size bucket, code point, raster-affecting style bits) and packed
//! left-to-right into shelves; when a glyph does not fit the atlas doubles
//! (up to [`ATLAS_MAX_DIM`]) and repacks every resident glyph. Consumers
//! watch the dirty bit and re-upload the whole texture when set.

use std::collections::BTreeMap;

use vellum_model::StyleFlags;

use crate::font::GlyphBitmap;
use crate::TextError;

/// Initial atlas dimension (square).
pub const ATLAS_INITIAL_DIM: u32 = 256;

/// Maximum atlas dimension; beyond this insertion reports `AtlasFull`.
pub const ATLAS_MAX_DIM: u32 = 4096;

/// Padding between packed glyphs in texels.
const GLYPH_PAD: u32 = 1;

/// Key identifying one rasterized glyph.
///
/// Only the raster-affecting style bits (bold, italic) participate;
/// decorations share the same bitmap.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GlyphKey {
    /// Font id.
    pub font: u32,
    /// Size bucket in pixels.
    pub size_px: u32,
    /// Unicode code point.
    pub code_point: u32,
    /// Raster-affecting style bits.
    pub style_bits: u8,
}

impl GlyphKey {
    /// Builds a key, masking the flags down to the raster-affecting bits.
    #[must_use]
    pub fn new(font: u32, size_px: u32, ch: char, flags: StyleFlags) -> Self {
        let raster = flags & (StyleFlags::BOLD | StyleFlags::ITALIC);
        Self {
            font,
            size_px,
            code_point: ch as u32,
            style_bits: raster.bits(),
        }
    }
}

/// Placement of one glyph inside the atlas, in texels.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AtlasRect {
    /// Left texel.
    pub x: u32,
    /// Top texel.
    pub y: u32,
    /// Width in texels.
    pub w: u32,
    /// Height in texels.
    pub h: u32,
}

#[derive(Debug, Clone)]
struct Shelf {
    y: u32,
    height: u32,
    cursor_x: u32,
}

/// The atlas: pixel store, shelf state, and the key → placement map.
#[derive(Debug)]
pub struct GlyphAtlas {
    dim: u32,
    pixels: Vec<u8>,
    shelves: Vec<Shelf>,
    next_shelf_y: u32,
    entries: BTreeMap<GlyphKey, AtlasRect>,
    bitmaps: BTreeMap<GlyphKey, GlyphBitmap>,
    dirty: bool,
}

impl Default for GlyphAtlas {
    fn default() -> Self {
        Self::new()
    }
}

impl GlyphAtlas {
    /// Creates an empty atlas at the initial dimension.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dim: ATLAS_INITIAL_DIM,
            pixels: vec![0; (ATLAS_INITIAL_DIM * ATLAS_INITIAL_DIM) as usize],
            shelves: Vec::new(),
            next_shelf_y: 0,
            entries: BTreeMap::new(),
            bitmaps: BTreeMap::new(),
            dirty: false,
        }
    }

    /// Current square dimension in texels.
    #[must_use]
    pub fn dim(&self) -> u32 {
        self.dim
    }

    /// The raw coverage texture, `dim * dim` bytes row-major.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Number of resident glyphs.
    #[must_use]
    pub fn glyph_count(&self) -> usize {
        self.entries.len()
    }

    /// Whether the texture changed since the dirty bit was last cleared.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clears the dirty bit; callers do this after re-uploading.
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Looks up a resident glyph.
    #[must_use]
    pub fn get(&self, key: &GlyphKey) -> Option<AtlasRect> {
        self.entries.get(key).copied()
    }

    /// Returns the placement for `key`, rasterizing via `raster` and packing
    /// on a miss. Growth doubles the atlas and repacks; when even the
    /// maximum dimension cannot host the glyph, reports `AtlasFull` and
    /// leaves the atlas unchanged.
    pub fn get_or_insert<F>(&mut self, key: GlyphKey, raster: F) -> Result<AtlasRect, TextError>
    where
        F: FnOnce() -> GlyphBitmap,
    {
        if let Some(rect) = self.entries.get(&key) {
            return Ok(*rect);
        }
        let bitmap = raster();
        if bitmap.width + 2 * GLYPH_PAD > ATLAS_MAX_DIM || bitmap.height + 2 * GLYPH_PAD > ATLAS_MAX_DIM
        {
            return Err(TextError::AtlasFull);
        }
        loop {
            if let Some(rect) = self.try_pack(bitmap.width, bitmap.height) {
                self.blit(&bitmap, rect);
                self.entries.insert(key, rect);
                self.bitmaps.insert(key, bitmap);
                self.dirty = true;
                return Ok(rect);
            }
            if self.dim >= ATLAS_MAX_DIM {
                return Err(TextError::AtlasFull);
            }
            self.grow();
        }
    }

    fn try_pack(&mut self, w: u32, h: u32) -> Option<AtlasRect> {
        let w_pad = w + GLYPH_PAD;
        let h_pad = h + GLYPH_PAD;
        // First fit on an existing shelf of adequate height.
        for shelf in &mut self.shelves {
            if shelf.height >= h_pad && shelf.cursor_x + w_pad <= self.dim {
                let rect = AtlasRect {
                    x: shelf.cursor_x,
                    y: shelf.y,
                    w,
                    h,
                };
                shelf.cursor_x += w_pad;
                return Some(rect);
            }
        }
        // Open a new shelf.
        if self.next_shelf_y + h_pad <= self.dim && w_pad <= self.dim {
            let shelf = Shelf {
                y: self.next_shelf_y,
                height: h_pad,
                cursor_x: w_pad,
            };
            let rect = AtlasRect {
                x: 0,
                y: self.next_shelf_y,
                w,
                h,
            };
            self.next_shelf_y += h_pad;
            self.shelves.push(shelf);
            return Some(rect);
        }
        None
    }

    fn blit(&mut self, bitmap: &GlyphBitmap, rect: AtlasRect) {
        for row in 0..bitmap.height {
            let src_start = (row * bitmap.width) as usize;
            let src_end = src_start + bitmap.width as usize;
            let dst_start = ((rect.y + row) * self.dim + rect.x) as usize;
            let dst_end = dst_start + bitmap.width as usize;
            if let (Some(src), Some(dst)) = (
                bitmap.coverage.get(src_start..src_end),
                self.pixels.get_mut(dst_start..dst_end),
            ) {
                dst.copy_from_slice(src);
            }
        }
    }

    /// Doubles the dimension and repacks every resident glyph in key order,
    /// which keeps placement deterministic across identical histories.
    fn grow(&mut self) {
        self.dim = (self.dim * 2).min(ATLAS_MAX_DIM);
        self.pixels = vec![0; (self.dim * self.dim) as usize];
        self.shelves.clear();
        self.next_shelf_y = 0;
        self.entries.clear();
        self.dirty = true;

        let bitmaps = core::mem::take(&mut self.bitmaps);
        for (key, bitmap) in &bitmaps {
            if let Some(rect) = self.try_pack(bitmap.width, bitmap.height) {
                self.blit(bitmap, rect);
                self.entries.insert(*key, rect);
            } else {
                debug_assert!(false, "repack after grow must fit all resident glyphs");
            }
        }
        self.bitmaps = bitmaps;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(w: u32, h: u32) -> GlyphBitmap {
        GlyphBitmap {
            width: w,
            height: h,
            coverage: vec![0xFF; (w * h) as usize],
        }
    }

    fn key(n: u32) -> GlyphKey {
        GlyphKey {
            font: 0,
            size_px: 16,
            code_point: n,
            style_bits: 0,
        }
    }

    #[test]
    fn insert_sets_dirty_and_is_idempotent() {
        let mut atlas = GlyphAtlas::new();
        let rect = atlas.get_or_insert(key(65), || block(10, 12)).unwrap();
        assert!(atlas.is_dirty());
        atlas.clear_dirty();
        let again = atlas.get_or_insert(key(65), || block(10, 12)).unwrap();
        assert_eq!(rect, again);
        assert!(!atlas.is_dirty());
        assert_eq!(atlas.glyph_count(), 1);
    }

    #[test]
    fn packing_fills_shelves_left_to_right() {
        let mut atlas = GlyphAtlas::new();
        let a = atlas.get_or_insert(key(1), || block(10, 10)).unwrap();
        let b = atlas.get_or_insert(key(2), || block(10, 10)).unwrap();
        assert_eq!(a.y, b.y);
        assert!(b.x > a.x);
    }

    #[test]
    fn growth_repacks_existing_glyphs() {
        let mut atlas = GlyphAtlas::new();
        // Fill past the initial 256x256 with 64x64 blocks.
        for i in 0..40 {
            atlas.get_or_insert(key(i), || block(64, 64)).unwrap();
        }
        assert!(atlas.dim() > ATLAS_INITIAL_DIM);
        // Every glyph is still resident and readable.
        for i in 0..40 {
            assert!(atlas.get(&key(i)).is_some());
        }
    }

    #[test]
    fn oversized_glyph_reports_full() {
        let mut atlas = GlyphAtlas::new();
        let too_big = ATLAS_MAX_DIM;
        assert_eq!(
            atlas.get_or_insert(key(9), || block(too_big, 8)),
            Err(TextError::AtlasFull)
        );
    }

    #[test]
    fn blit_lands_coverage_where_placed() {
        let mut atlas = GlyphAtlas::new();
        let rect = atlas.get_or_insert(key(3), || block(4, 4)).unwrap();
        let idx = (rect.y * atlas.dim() + rect.x) as usize;
        assert_eq!(atlas.pixels()[idx], 0xFF);
    }
}
