// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! vellum-text: the engine's text subsystem.
//!
//! Content editing works on logical (code-point) indices with byte
//! conversions provided; layout breaks lines on hard newlines and, in
//! fixed-width mode, soft-wraps at word boundaries. Font metrics and glyph
//! bitmaps come through the [`FontProvider`] port — the engine owns no font
//! files — and rasterized glyphs are packed into a growable atlas.
#![forbid(unsafe_code)]

mod atlas;
mod content;
mod font;
mod layout;

pub use atlas::{AtlasRect, GlyphAtlas, GlyphKey, ATLAS_INITIAL_DIM, ATLAS_MAX_DIM};
pub use content::{
    apply_style, byte_to_logical, delete_content, insert_content, logical_len, logical_to_byte,
    set_caret, set_selection, StylePatch,
};
pub use font::{FontProvider, FontRegistry, GlyphBitmap, GlyphMetrics, LineMetrics, MonoProvider};
pub use layout::{
    caret_geometry, hit_test, layout_text, CaretGeometry, GlyphQuad, HitResult, LayoutLine,
    TextLayout,
};

use thiserror::Error;

/// Errors produced by the text subsystem.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum TextError {
    /// A glyph did not fit the atlas even at its maximum dimension.
    #[error("glyph atlas full")]
    AtlasFull,
}
