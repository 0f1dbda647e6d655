// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use bitflags::bitflags;

/// RGBA color with f32 components in `[0, 1]`.
pub type ColorRgba = [f32; 4];

/// Packs an f32 RGBA color into `0xRRGGBBAA`.
#[must_use]
pub fn pack_rgba(color: ColorRgba) -> u32 {
    let to_byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0 + 0.5) as u32;
    (to_byte(color[0]) << 24) | (to_byte(color[1]) << 16) | (to_byte(color[2]) << 8) | to_byte(color[3])
}

/// Unpacks `0xRRGGBBAA` into an f32 RGBA color.
#[must_use]
pub fn unpack_rgba(packed: u32) -> ColorRgba {
    let from_byte = |b: u32| (b & 0xFF) as f32 / 255.0;
    [
        from_byte(packed >> 24),
        from_byte(packed >> 16),
        from_byte(packed >> 8),
        from_byte(packed),
    ]
}

/// Stroke styling shared by every drawable kind.
///
/// `width_px` is in screen pixels; the render builder divides by the current
/// view scale to obtain world units at build time.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Stroke {
    /// Stroke color.
    pub color: ColorRgba,
    /// Whether the stroke is drawn at all.
    pub enabled: bool,
    /// Stroke width in screen pixels.
    pub width_px: f32,
}

impl Default for Stroke {
    fn default() -> Self {
        Self {
            color: [0.0, 0.0, 0.0, 1.0],
            enabled: true,
            width_px: 1.0,
        }
    }
}

bitflags! {
    /// Per-run text style flags.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
    pub struct StyleFlags: u8 {
        /// Bold weight.
        const BOLD = 1 << 0;
        /// Italic slant.
        const ITALIC = 1 << 1;
        /// Underline decoration.
        const UNDERLINE = 1 << 2;
        /// Strike-through decoration.
        const STRIKE = 1 << 3;
    }
}

/// Horizontal text alignment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TextAlign {
    /// Left-aligned lines.
    #[default]
    Left = 0,
    /// Centered lines.
    Center = 1,
    /// Right-aligned lines.
    Right = 2,
}

impl TextAlign {
    /// Decodes a wire tag; unknown values fall back to `Left`.
    #[must_use]
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            1 => Self::Center,
            2 => Self::Right,
            _ => Self::Left,
        }
    }
}

/// Text box sizing mode.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TextBoxMode {
    /// The box grows with its longest line.
    #[default]
    AutoWidth = 0,
    /// Lines soft-wrap at `constraint_width`.
    FixedWidth = 1,
}

impl TextBoxMode {
    /// Decodes a wire tag; unknown values fall back to `AutoWidth`.
    #[must_use]
    pub fn from_tag(tag: u8) -> Self {
        if tag == 1 {
            Self::FixedWidth
        } else {
            Self::AutoWidth
        }
    }
}

/// Contiguous byte range of text content sharing one style.
///
/// Runs are kept sorted by `start`, non-overlapping, and covering the whole
/// content; edits split and merge runs to preserve that shape.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StyleRun {
    /// Start byte offset into the UTF-8 content.
    pub start: u32,
    /// Run length in bytes.
    pub len: u32,
    /// Font id from the font registry.
    pub font: u32,
    /// Point size.
    pub size_pt: f32,
    /// Packed `0xRRGGBBAA` color.
    pub color: u32,
    /// Style flags.
    pub flags: StyleFlags,
}

impl StyleRun {
    /// Exclusive end byte offset.
    #[must_use]
    pub fn end(&self) -> u32 {
        self.start + self.len
    }
}

impl Default for StyleRun {
    fn default() -> Self {
        Self {
            start: 0,
            len: 0,
            font: 0,
            size_pt: 12.0,
            color: 0x0000_00FF,
            flags: StyleFlags::empty(),
        }
    }
}
