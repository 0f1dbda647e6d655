// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Content editing over logical (code-point) indices.
//!
//! The store keeps UTF-8 bytes and byte-offset style runs; callers speak
//! logical indices. Every edit keeps the run list sorted, non-overlapping,
//! and covering the content exactly, merging adjacent runs with identical
//! style so repeated edits do not fragment the list.

use vellum_model::{StyleFlags, StyleRun, Text};

/// Tri-state style patch applied over a logical range.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StylePatch {
    /// Flags forced on.
    pub set_flags: StyleFlags,
    /// Flags forced off.
    pub clear_flags: StyleFlags,
    /// New font id, when present.
    pub font: Option<u32>,
    /// New point size, when present.
    pub size_pt: Option<f32>,
    /// New packed color, when present.
    pub color: Option<u32>,
}

/// Number of logical indices (code points) in `s`.
#[must_use]
pub fn logical_len(s: &str) -> u32 {
    s.chars().count() as u32
}

/// Converts a logical index to a byte offset, clamping past-the-end.
#[must_use]
pub fn logical_to_byte(s: &str, logical: u32) -> u32 {
    s.char_indices()
        .nth(logical as usize)
        .map_or(s.len() as u32, |(idx, _)| idx as u32)
}

/// Converts a byte offset to the logical index of the code point containing
/// it. Offsets inside a code point round down; past-the-end clamps.
#[must_use]
pub fn byte_to_logical(s: &str, byte: u32) -> u32 {
    let byte = byte as usize;
    let mut logical = 0u32;
    for (idx, _) in s.char_indices() {
        if idx >= byte {
            return logical;
        }
        logical += 1;
    }
    logical
}

fn style_eq(a: &StyleRun, b: &StyleRun) -> bool {
    a.font == b.font && a.size_pt == b.size_pt && a.color == b.color && a.flags == b.flags
}

/// Re-establishes the run invariants: sorted, covering, no empty runs, and
/// adjacent runs with identical style merged.
fn normalize_runs(text: &mut Text) {
    let total = text.content.len() as u32;
    text.runs.retain(|r| r.len > 0);
    text.runs.sort_by_key(|r| r.start);

    if text.runs.is_empty() {
        if total > 0 {
            text.runs.push(StyleRun {
                start: 0,
                len: total,
                ..StyleRun::default()
            });
        }
        return;
    }

    // Stitch gaps and overlaps by walking a cursor across the content.
    let mut cursor = 0u32;
    for run in &mut text.runs {
        run.start = cursor;
        cursor += run.len;
    }
    if cursor != total {
        if let Some(last) = text.runs.last_mut() {
            let prior = cursor - last.len;
            last.len = total.saturating_sub(prior);
            if last.len == 0 {
                text.runs.pop();
            }
        }
    }

    // Merge adjacent identical styles.
    let mut merged: Vec<StyleRun> = Vec::with_capacity(text.runs.len());
    for run in text.runs.drain(..) {
        match merged.last_mut() {
            Some(prev) if style_eq(prev, &run) => prev.len += run.len,
            _ => merged.push(run),
        }
    }
    text.runs = merged;
}

/// Inserts `s` at a logical index, extending the run the insertion lands in
/// (or the preceding run at a boundary) and shifting everything after.
pub fn insert_content(text: &mut Text, at_logical: u32, s: &str) {
    if s.is_empty() {
        return;
    }
    let at_logical = at_logical.min(logical_len(&text.content));
    let at = logical_to_byte(&text.content, at_logical);
    let inserted = s.len() as u32;
    text.content.insert_str(at as usize, s);

    let mut absorbed = false;
    for run in &mut text.runs {
        if absorbed {
            run.start += inserted;
            continue;
        }
        // A boundary insert extends the run ending at `at`.
        if run.start < at && at <= run.end() || (run.start == 0 && at == 0) {
            run.len += inserted;
            absorbed = true;
        } else if run.start >= at {
            run.start += inserted;
        }
    }
    if !absorbed && !text.runs.is_empty() {
        // Insert landed before every run; grow the first.
        if let Some(first) = text.runs.first_mut() {
            first.start = first.start.saturating_sub(inserted);
            first.len += inserted;
        }
    }
    normalize_runs(text);

    // Caret follows the insertion.
    text.caret = at_logical + logical_len(s);
    text.selection = (text.caret, text.caret);
}

/// Deletes the logical range `start..end` (clamped, re-ordered).
pub fn delete_content(text: &mut Text, start_logical: u32, end_logical: u32) {
    let (start_logical, end_logical) = if start_logical <= end_logical {
        (start_logical, end_logical)
    } else {
        (end_logical, start_logical)
    };
    let start = logical_to_byte(&text.content, start_logical);
    let end = logical_to_byte(&text.content, end_logical);
    if start >= end {
        return;
    }
    let removed = end - start;
    text.content.drain(start as usize..end as usize);

    for run in &mut text.runs {
        let run_start = run.start;
        let run_end = run.end();
        // Overlap of [start, end) with [run_start, run_end).
        let cut = run_end.min(end).saturating_sub(run_start.max(start));
        run.len -= cut;
        if run_start >= end {
            run.start = run_start - removed;
        } else if run_start > start {
            run.start = start;
        }
    }
    normalize_runs(text);

    text.caret = start_logical;
    text.selection = (start_logical, start_logical);
}

/// Moves the caret, clamped to the content length.
pub fn set_caret(text: &mut Text, caret: u32) {
    let max = logical_len(&text.content);
    text.caret = caret.min(max);
    text.selection = (text.caret, text.caret);
}

/// Sets the selection to an ordered, clamped logical range; the caret moves
/// to the selection end.
pub fn set_selection(text: &mut Text, start: u32, end: u32) {
    let max = logical_len(&text.content);
    let (start, end) = if start <= end { (start, end) } else { (end, start) };
    text.selection = (start.min(max), end.min(max));
    text.caret = text.selection.1;
}

/// Applies a tri-state style patch over the logical range `start..end`.
///
/// Runs are split at the range boundaries so styling outside the range is
/// untouched; afterwards adjacent identical runs merge back together.
pub fn apply_style(text: &mut Text, start_logical: u32, end_logical: u32, patch: &StylePatch) {
    let (start_logical, end_logical) = if start_logical <= end_logical {
        (start_logical, end_logical)
    } else {
        (end_logical, start_logical)
    };
    let start = logical_to_byte(&text.content, start_logical);
    let end = logical_to_byte(&text.content, end_logical);
    if start >= end {
        return;
    }

    let mut out: Vec<StyleRun> = Vec::with_capacity(text.runs.len() + 2);
    for run in text.runs.drain(..) {
        let run_start = run.start;
        let run_end = run.end();
        if run_end <= start || run_start >= end {
            out.push(run);
            continue;
        }
        // Left remainder.
        if run_start < start {
            out.push(StyleRun {
                start: run_start,
                len: start - run_start,
                ..run
            });
        }
        // Patched middle.
        let mid_start = run_start.max(start);
        let mid_end = run_end.min(end);
        let mut patched = StyleRun {
            start: mid_start,
            len: mid_end - mid_start,
            ..run
        };
        patched.flags = (patched.flags | patch.set_flags) - patch.clear_flags;
        if let Some(font) = patch.font {
            patched.font = font;
        }
        if let Some(size_pt) = patch.size_pt {
            patched.size_pt = size_pt;
        }
        if let Some(color) = patch.color {
            patched.color = color;
        }
        out.push(patched);
        // Right remainder.
        if run_end > end {
            out.push(StyleRun {
                start: end,
                len: run_end - end,
                ..run
            });
        }
    }
    text.runs = out;
    normalize_runs(text);
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_geom::Vec2;
    use vellum_model::{TextAlign, TextBoxMode};

    fn make_text(content: &str) -> Text {
        let mut t = Text {
            pos: Vec2::ZERO,
            rotation: 0.0,
            box_mode: TextBoxMode::AutoWidth,
            constraint_width: 0.0,
            align: TextAlign::Left,
            content: content.to_owned(),
            runs: Vec::new(),
            caret: 0,
            selection: (0, 0),
            layout_size: Vec2::ZERO,
        };
        normalize_runs(&mut t);
        t
    }

    fn coverage_ok(t: &Text) -> bool {
        let mut cursor = 0u32;
        for run in &t.runs {
            if run.start != cursor || run.len == 0 {
                return false;
            }
            cursor = run.end();
        }
        cursor as usize == t.content.len()
    }

    #[test]
    fn logical_byte_round_trip_multibyte() {
        let s = "aé𝄞b";
        assert_eq!(logical_len(s), 4);
        assert_eq!(logical_to_byte(s, 0), 0);
        assert_eq!(logical_to_byte(s, 1), 1);
        assert_eq!(logical_to_byte(s, 2), 3);
        assert_eq!(logical_to_byte(s, 3), 7);
        assert_eq!(logical_to_byte(s, 4), 8);
        assert_eq!(byte_to_logical(s, 7), 3);
        assert_eq!(byte_to_logical(s, 999), 4);
    }

    #[test]
    fn insert_extends_run_and_moves_caret() {
        let mut t = make_text("hello");
        insert_content(&mut t, 5, " world");
        assert_eq!(t.content, "hello world");
        assert!(coverage_ok(&t));
        assert_eq!(t.caret, 11);
    }

    #[test]
    fn insert_into_empty_creates_covering_run() {
        let mut t = make_text("");
        insert_content(&mut t, 0, "ab");
        assert_eq!(t.content, "ab");
        assert!(coverage_ok(&t));
    }

    #[test]
    fn delete_shrinks_overlapping_runs() {
        let mut t = make_text("abcdef");
        apply_style(
            &mut t,
            2,
            4,
            &StylePatch {
                set_flags: StyleFlags::BOLD,
                ..StylePatch::default()
            },
        );
        assert_eq!(t.runs.len(), 3);
        delete_content(&mut t, 1, 5);
        assert_eq!(t.content, "af");
        assert!(coverage_ok(&t));
        assert_eq!(t.caret, 1);
    }

    #[test]
    fn delete_reversed_range_is_reordered() {
        let mut t = make_text("abcd");
        delete_content(&mut t, 3, 1);
        assert_eq!(t.content, "ad");
    }

    #[test]
    fn style_splits_at_boundaries_and_merges_back() {
        let mut t = make_text("abcdef");
        let bold = StylePatch {
            set_flags: StyleFlags::BOLD,
            ..StylePatch::default()
        };
        apply_style(&mut t, 2, 4, &bold);
        assert_eq!(t.runs.len(), 3);
        assert!(t.runs[1].flags.contains(StyleFlags::BOLD));
        // Un-bold the same range: three runs collapse back to one.
        let unbold = StylePatch {
            clear_flags: StyleFlags::BOLD,
            ..StylePatch::default()
        };
        apply_style(&mut t, 2, 4, &unbold);
        assert_eq!(t.runs.len(), 1);
        assert!(coverage_ok(&t));
    }

    #[test]
    fn style_scalar_fields_apply_only_when_present() {
        let mut t = make_text("abc");
        apply_style(
            &mut t,
            0,
            3,
            &StylePatch {
                size_pt: Some(20.0),
                ..StylePatch::default()
            },
        );
        assert_eq!(t.runs[0].size_pt, 20.0);
        // Font untouched.
        assert_eq!(t.runs[0].font, 0);
    }

    #[test]
    fn caret_and_selection_clamp() {
        let mut t = make_text("ab");
        set_caret(&mut t, 99);
        assert_eq!(t.caret, 2);
        set_selection(&mut t, 5, 1);
        assert_eq!(t.selection, (1, 2));
        assert_eq!(t.caret, 2);
    }

    #[test]
    fn multibyte_styling_keeps_utf8_boundaries() {
        let mut t = make_text("aé𝄞b");
        apply_style(
            &mut t,
            1,
            3,
            &StylePatch {
                set_flags: StyleFlags::ITALIC,
                ..StylePatch::default()
            },
        );
        assert!(coverage_ok(&t));
        // The styled middle run spans the é and 𝄞 bytes exactly.
        assert_eq!(t.runs[1].start, 1);
        assert_eq!(t.runs[1].len, 6);
    }
}
