// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Line breaking, glyph placement, and caret/hit queries.
//!
//! Coordinates are local to the text block: x grows right, y grows down
//! from the top of the first line. Hard newlines always break; in
//! fixed-width mode lines additionally soft-wrap at word boundaries, with a
//! character-level fallback for words wider than the whole box. Layout is a
//! pure function of (content, runs, mode, constraint, provider) and is
//! deterministic because providers are.

use unicode_segmentation::UnicodeSegmentation;
use vellum_geom::Vec2;
use vellum_model::{Text, TextAlign, TextBoxMode};

use crate::font::FontProvider;

/// One positioned glyph box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphQuad {
    /// Left edge relative to the block origin.
    pub x: f32,
    /// Top edge relative to the block origin.
    pub y: f32,
    /// Box width (the glyph advance).
    pub w: f32,
    /// Box height (the line height).
    pub h: f32,
    /// Byte offset of the character in the content.
    pub byte_index: u32,
    /// Logical index of the character.
    pub char_index: u32,
    /// Line ordinal.
    pub line: u32,
    /// Style-run ordinal the character belongs to.
    pub run: u32,
    /// The character itself.
    pub ch: char,
}

/// One visual line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutLine {
    /// Logical index of the first character on the line.
    pub start_char: u32,
    /// Exclusive logical end of the line's characters.
    pub end_char: u32,
    /// Whether the line ends at a hard newline (which consumes one logical
    /// index that renders no glyph).
    pub hard_break: bool,
    /// Top edge of the line.
    pub top: f32,
    /// Line height.
    pub height: f32,
    /// Baseline offset from the block origin.
    pub baseline: f32,
    /// Advance width of the line's glyphs.
    pub width: f32,
    /// Left edge after alignment.
    pub offset_x: f32,
    /// Range into [`TextLayout::glyphs`].
    pub glyph_start: u32,
    /// Exclusive end of the glyph range.
    pub glyph_end: u32,
}

/// Full layout result. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextLayout {
    /// Visual lines, top to bottom.
    pub lines: Vec<LayoutLine>,
    /// Positioned glyphs in reading order.
    pub glyphs: Vec<GlyphQuad>,
    /// Logical box size.
    pub size: Vec2,
}

/// Caret placement answer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaretGeometry {
    /// Caret x relative to the block origin.
    pub x: f32,
    /// Top of the caret bar.
    pub y: f32,
    /// Caret bar height.
    pub height: f32,
    /// Line ordinal the caret sits on.
    pub line: u32,
}

/// Hit-test answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitResult {
    /// Logical index of the hit character.
    pub char_index: u32,
    /// Line ordinal.
    pub line_index: u32,
    /// Whether the hit landed on the leading (left) half of the glyph.
    pub is_leading_edge: bool,
}

/// Index of the run covering byte offset `byte`; runs are sorted and cover
/// the content, so the last run whose start ≤ byte wins.
fn run_at(text: &Text, byte: u32) -> u32 {
    let mut found = 0u32;
    for (i, run) in text.runs.iter().enumerate() {
        if run.start <= byte {
            found = i as u32;
        } else {
            break;
        }
    }
    found
}

struct PendingGlyph {
    byte_index: u32,
    char_index: u32,
    run: u32,
    advance: f32,
    ch: char,
}

/// Lays out a text block.
#[must_use]
pub fn layout_text(text: &Text, provider: &dyn FontProvider) -> TextLayout {
    let wrap_width = if text.box_mode == TextBoxMode::FixedWidth {
        Some(text.constraint_width.max(1.0))
    } else {
        None
    };

    // Phase 1: break into visual lines of pending glyphs.
    let mut lines: Vec<(Vec<PendingGlyph>, bool, u32)> = Vec::new(); // (glyphs, hard, start_char)
    let mut char_cursor = 0u32;
    let mut byte_cursor = 0u32;

    let mut hard_lines: Vec<&str> = text.content.split('\n').collect();
    if hard_lines.is_empty() {
        hard_lines.push("");
    }
    let hard_count = hard_lines.len();
    for (hard_idx, hard_line) in hard_lines.into_iter().enumerate() {
        let is_last_hard = hard_idx + 1 == hard_count;
        let line_start_char = char_cursor;
        let mut current: Vec<PendingGlyph> = Vec::new();
        let mut current_start = line_start_char;
        let mut current_width = 0.0f32;

        for word in hard_line.split_word_bounds() {
            // Measure the word.
            let mut word_glyphs: Vec<PendingGlyph> = Vec::new();
            let mut word_width = 0.0f32;
            for (rel_byte, ch) in word.char_indices() {
                let byte_index = byte_cursor + rel_byte as u32;
                let run = run_at(text, byte_index);
                let style = text
                    .runs
                    .get(run as usize)
                    .copied()
                    .unwrap_or_default();
                let metrics =
                    provider.glyph_metrics(style.font, style.size_pt, ch, style.flags);
                word_glyphs.push(PendingGlyph {
                    byte_index,
                    char_index: char_cursor + word_glyphs.len() as u32,
                    run,
                    advance: metrics.advance,
                    ch,
                });
                word_width += metrics.advance;
            }

            if let Some(max_w) = wrap_width {
                let fits = current_width + word_width <= max_w;
                let breakable = !current.is_empty() && !word.trim().is_empty();
                if !fits && breakable {
                    // Soft wrap before this word.
                    let end_char = current_start + current.len() as u32;
                    lines.push((core::mem::take(&mut current), false, current_start));
                    current_start = end_char;
                    current_width = 0.0;
                }
                if word_width > max_w && word.trim().len() > 1 {
                    // Overlong word: spill character by character.
                    for g in word_glyphs {
                        if current_width + g.advance > max_w && !current.is_empty() {
                            let end_char = current_start + current.len() as u32;
                            lines.push((core::mem::take(&mut current), false, current_start));
                            current_start = end_char;
                            current_width = 0.0;
                        }
                        current_width += g.advance;
                        current.push(g);
                    }
                } else {
                    current_width += word_width;
                    current.extend(word_glyphs);
                }
            } else {
                current_width += word_width;
                current.extend(word_glyphs);
            }
            char_cursor += word.chars().count() as u32;
            byte_cursor += word.len() as u32;
        }

        lines.push((current, !is_last_hard, current_start));
        if !is_last_hard {
            // The newline consumes one logical index and one byte.
            char_cursor += 1;
            byte_cursor += 1;
        }
    }

    // Phase 2: vertical metrics and widths.
    struct MeasuredLine {
        glyphs: Vec<PendingGlyph>,
        hard: bool,
        start_char: u32,
        ascent: f32,
        height: f32,
        width: f32,
    }
    let mut measured: Vec<MeasuredLine> = Vec::with_capacity(lines.len());
    for (glyphs, hard, start_char) in lines {
        let mut ascent = 0.0f32;
        let mut descent = 0.0f32;
        let mut gap = 0.0f32;
        let probe_runs: Vec<u32> = if glyphs.is_empty() {
            vec![run_at(text, byte_of_char(text, start_char))]
        } else {
            let mut rs: Vec<u32> = glyphs.iter().map(|g| g.run).collect();
            rs.dedup();
            rs
        };
        for run_idx in probe_runs {
            let style = text
                .runs
                .get(run_idx as usize)
                .copied()
                .unwrap_or_default();
            let lm = provider.line_metrics(style.font, style.size_pt);
            ascent = ascent.max(lm.ascent);
            descent = descent.max(lm.descent);
            gap = gap.max(lm.line_gap);
        }
        let width: f32 = glyphs.iter().map(|g| g.advance).sum();
        measured.push(MeasuredLine {
            glyphs,
            hard,
            start_char,
            ascent,
            height: ascent + descent + gap,
            width,
        });
    }

    // Box width: constraint in fixed mode, max line width in auto mode.
    let box_width =
        wrap_width.unwrap_or_else(|| measured.iter().fold(0.0f32, |a, m| a.max(m.width)));

    // Phase 3: place.
    let mut out = TextLayout::default();
    let mut top = 0.0f32;
    for (line_idx, MeasuredLine { glyphs, hard, start_char, ascent, height, width }) in
        measured.into_iter().enumerate()
    {
        let offset_x = match text.align {
            TextAlign::Left => 0.0,
            TextAlign::Center => (box_width - width) * 0.5,
            TextAlign::Right => box_width - width,
        };
        let glyph_start = out.glyphs.len() as u32;
        let mut pen_x = offset_x;
        let glyph_count = glyphs.len() as u32;
        for g in glyphs {
            out.glyphs.push(GlyphQuad {
                x: pen_x,
                y: top,
                w: g.advance,
                h: height,
                byte_index: g.byte_index,
                char_index: g.char_index,
                line: line_idx as u32,
                run: g.run,
                ch: g.ch,
            });
            pen_x += g.advance;
        }
        out.lines.push(LayoutLine {
            start_char,
            end_char: start_char + glyph_count,
            hard_break: hard,
            top,
            height,
            baseline: top + ascent,
            width,
            offset_x,
            glyph_start,
            glyph_end: glyph_start + glyph_count,
        });
        top += height;
    }
    out.size = Vec2::new(box_width, top);
    out
}

fn byte_of_char(text: &Text, logical: u32) -> u32 {
    crate::content::logical_to_byte(&text.content, logical)
}

/// Caret geometry for a logical index: the midpoint between the adjacent
/// glyph boxes, or the line edge at line boundaries.
#[must_use]
pub fn caret_geometry(layout: &TextLayout, logical: u32) -> CaretGeometry {
    let line_idx = layout
        .lines
        .iter()
        .position(|l| logical >= l.start_char && logical <= l.end_char)
        .unwrap_or(layout.lines.len().saturating_sub(1));
    let Some(line) = layout.lines.get(line_idx) else {
        return CaretGeometry {
            x: 0.0,
            y: 0.0,
            height: 0.0,
            line: 0,
        };
    };
    let line_idx = line_idx as u32;

    let glyphs = &layout.glyphs[line.glyph_start as usize..line.glyph_end as usize];
    let ordinal = (logical - line.start_char) as usize;
    let x = if glyphs.is_empty() {
        line.offset_x
    } else if ordinal == 0 {
        glyphs[0].x
    } else if ordinal >= glyphs.len() {
        let last = glyphs[glyphs.len() - 1];
        last.x + last.w
    } else {
        let prev = glyphs[ordinal - 1];
        let next = glyphs[ordinal];
        (prev.x + prev.w + next.x) * 0.5
    };
    CaretGeometry {
        x,
        y: line.top,
        height: line.height,
        line: line_idx,
    }
}

/// Hit test a local-space point against the layout.
#[must_use]
pub fn hit_test(layout: &TextLayout, point: Vec2) -> HitResult {
    if layout.lines.is_empty() {
        return HitResult {
            char_index: 0,
            line_index: 0,
            is_leading_edge: true,
        };
    }
    let line_idx = layout
        .lines
        .iter()
        .position(|l| point.y < l.top + l.height)
        .unwrap_or(layout.lines.len() - 1);
    let line = &layout.lines[line_idx];
    let glyphs = &layout.glyphs[line.glyph_start as usize..line.glyph_end as usize];

    if glyphs.is_empty() || point.x < line.offset_x {
        return HitResult {
            char_index: line.start_char,
            line_index: line_idx as u32,
            is_leading_edge: true,
        };
    }
    for g in glyphs {
        if point.x < g.x + g.w {
            return HitResult {
                char_index: g.char_index,
                line_index: line_idx as u32,
                is_leading_edge: point.x < g.x + g.w * 0.5,
            };
        }
    }
    let last = glyphs[glyphs.len() - 1];
    HitResult {
        char_index: last.char_index,
        line_index: line_idx as u32,
        is_leading_edge: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::MonoProvider;
    use crate::content;
    use vellum_model::{StyleRun, TextAlign, TextBoxMode};

    fn make_text(content: &str, mode: TextBoxMode, width: f32) -> Text {
        Text {
            pos: Vec2::ZERO,
            rotation: 0.0,
            box_mode: mode,
            constraint_width: width,
            align: TextAlign::Left,
            content: content.to_owned(),
            runs: vec![StyleRun {
                start: 0,
                len: content.len() as u32,
                font: 0,
                size_pt: 10.0,
                color: 0xFF,
                flags: vellum_model::StyleFlags::empty(),
            }],
            caret: 0,
            selection: (0, 0),
            layout_size: Vec2::ZERO,
        }
    }

    // MonoProvider: advance = 6.0 at 10pt, line height = 12.0.

    #[test]
    fn hard_newlines_always_break() {
        let t = make_text("ab\ncd", TextBoxMode::AutoWidth, 0.0);
        let l = layout_text(&t, &MonoProvider);
        assert_eq!(l.lines.len(), 2);
        assert!(l.lines[0].hard_break);
        assert_eq!(l.lines[0].end_char, 2);
        assert_eq!(l.lines[1].start_char, 3); // newline consumed one index
        assert_eq!(l.glyphs.len(), 4);
    }

    #[test]
    fn auto_width_box_is_longest_line() {
        let t = make_text("abcd\nab", TextBoxMode::AutoWidth, 0.0);
        let l = layout_text(&t, &MonoProvider);
        assert!((l.size.x - 24.0).abs() < 1e-4);
        assert!((l.size.y - 24.0).abs() < 1e-4);
    }

    #[test]
    fn fixed_width_wraps_at_word_boundaries() {
        // "aaa bbb ccc": 11 chars * 6 = 66 wide; wrap at 40 → "aaa bbb " is
        // 48 wide so "bbb" wraps, then "ccc".
        let t = make_text("aaa bbb ccc", TextBoxMode::FixedWidth, 40.0);
        let l = layout_text(&t, &MonoProvider);
        assert!(l.lines.len() >= 2);
        // No line of glyphs exceeds the wrap width.
        for line in &l.lines {
            assert!(line.width <= 40.0 + 1e-4);
        }
        // All 11 characters are placed.
        assert_eq!(l.glyphs.len(), 11);
    }

    #[test]
    fn overlong_word_breaks_per_character() {
        let t = make_text("abcdefghij", TextBoxMode::FixedWidth, 24.0);
        let l = layout_text(&t, &MonoProvider);
        assert!(l.lines.len() > 1);
        assert_eq!(l.glyphs.len(), 10);
        for line in &l.lines {
            assert!(line.width <= 24.0 + 1e-4);
        }
    }

    #[test]
    fn center_alignment_offsets_short_lines() {
        let mut t = make_text("ab\nabcd", TextBoxMode::AutoWidth, 0.0);
        t.align = TextAlign::Center;
        let l = layout_text(&t, &MonoProvider);
        assert!((l.lines[0].offset_x - 6.0).abs() < 1e-4);
        assert!((l.lines[1].offset_x).abs() < 1e-4);
    }

    #[test]
    fn caret_midpoint_between_glyphs() {
        let t = make_text("abc", TextBoxMode::AutoWidth, 0.0);
        let l = layout_text(&t, &MonoProvider);
        let c0 = caret_geometry(&l, 0);
        let c1 = caret_geometry(&l, 1);
        let c3 = caret_geometry(&l, 3);
        assert!((c0.x - 0.0).abs() < 1e-4);
        assert!((c1.x - 6.0).abs() < 1e-4);
        assert!((c3.x - 18.0).abs() < 1e-4);
        assert_eq!(c1.line, 0);
    }

    #[test]
    fn caret_on_second_line_after_newline() {
        let t = make_text("ab\ncd", TextBoxMode::AutoWidth, 0.0);
        let l = layout_text(&t, &MonoProvider);
        let c = caret_geometry(&l, 3);
        assert_eq!(c.line, 1);
        assert!((c.x - 0.0).abs() < 1e-4);
        assert!((c.y - 12.0).abs() < 1e-4);
    }

    #[test]
    fn hit_test_leading_and_trailing_halves() {
        let t = make_text("ab", TextBoxMode::AutoWidth, 0.0);
        let l = layout_text(&t, &MonoProvider);
        let lead = hit_test(&l, Vec2::new(1.0, 5.0));
        assert_eq!(lead.char_index, 0);
        assert!(lead.is_leading_edge);
        let trail = hit_test(&l, Vec2::new(5.0, 5.0));
        assert_eq!(trail.char_index, 0);
        assert!(!trail.is_leading_edge);
        let second = hit_test(&l, Vec2::new(7.0, 5.0));
        assert_eq!(second.char_index, 1);
    }

    #[test]
    fn hit_test_below_last_line_clamps() {
        let t = make_text("ab\ncd", TextBoxMode::AutoWidth, 0.0);
        let l = layout_text(&t, &MonoProvider);
        let hit = hit_test(&l, Vec2::new(1.0, 999.0));
        assert_eq!(hit.line_index, 1);
    }

    #[test]
    fn layout_agrees_with_logical_indices() {
        let t = make_text("aé𝄞", TextBoxMode::AutoWidth, 0.0);
        let l = layout_text(&t, &MonoProvider);
        assert_eq!(l.glyphs.len(), 3);
        assert_eq!(l.glyphs[2].char_index, 2);
        assert_eq!(
            l.glyphs[2].byte_index,
            content::logical_to_byte(&t.content, 2)
        );
    }
}
