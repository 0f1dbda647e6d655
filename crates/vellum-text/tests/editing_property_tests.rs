// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! Property tests: arbitrary edit sequences keep the run invariants, and
//! layout accounts for every non-newline character.

use proptest::prelude::*;
use vellum_geom::Vec2;
use vellum_model::{StyleFlags, Text, TextAlign, TextBoxMode};
use vellum_text::{
    apply_style, delete_content, insert_content, layout_text, logical_len, set_caret,
    set_selection, MonoProvider, StylePatch,
};

#[derive(Debug, Clone)]
enum Edit {
    Insert(u32, String),
    Delete(u32, u32),
    Style(u32, u32, u8),
    Caret(u32),
    Selection(u32, u32),
}

fn arb_edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (0u32..64, "[a-zé𝄞 \n]{0,8}").prop_map(|(at, s)| Edit::Insert(at, s)),
        (0u32..64, 0u32..64).prop_map(|(a, b)| Edit::Delete(a, b)),
        (0u32..64, 0u32..64, 0u8..16).prop_map(|(a, b, f)| Edit::Style(a, b, f)),
        (0u32..64).prop_map(Edit::Caret),
        (0u32..64, 0u32..64).prop_map(|(a, b)| Edit::Selection(a, b)),
    ]
}

fn empty_text() -> Text {
    Text {
        pos: Vec2::ZERO,
        rotation: 0.0,
        box_mode: TextBoxMode::FixedWidth,
        constraint_width: 60.0,
        align: TextAlign::Left,
        content: String::new(),
        runs: Vec::new(),
        caret: 0,
        selection: (0, 0),
        layout_size: Vec2::ZERO,
    }
}

fn runs_cover_content(t: &Text) -> bool {
    if t.content.is_empty() {
        return t.runs.is_empty();
    }
    let mut cursor = 0u32;
    for run in &t.runs {
        if run.start != cursor || run.len == 0 {
            return false;
        }
        if !t.content.is_char_boundary(run.start as usize) {
            return false;
        }
        cursor = run.start + run.len;
    }
    cursor as usize == t.content.len()
}

proptest! {
    #[test]
    fn edits_preserve_run_invariants(edits in proptest::collection::vec(arb_edit(), 0..24)) {
        let mut text = empty_text();
        for edit in edits {
            match edit {
                Edit::Insert(at, s) => insert_content(&mut text, at, &s),
                Edit::Delete(a, b) => delete_content(&mut text, a, b),
                Edit::Style(a, b, bits) => apply_style(
                    &mut text,
                    a,
                    b,
                    &StylePatch {
                        set_flags: StyleFlags::from_bits_truncate(bits),
                        ..StylePatch::default()
                    },
                ),
                Edit::Caret(at) => set_caret(&mut text, at),
                Edit::Selection(a, b) => set_selection(&mut text, a, b),
            }
            prop_assert!(runs_cover_content(&text), "runs broke: {:?}", text.runs);
            let max = logical_len(&text.content);
            prop_assert!(text.caret <= max);
            prop_assert!(text.selection.0 <= text.selection.1);
            prop_assert!(text.selection.1 <= max);
        }
    }

    #[test]
    fn layout_places_every_non_newline_char(edits in proptest::collection::vec(arb_edit(), 0..12)) {
        let mut text = empty_text();
        for edit in edits {
            if let Edit::Insert(at, s) = edit {
                insert_content(&mut text, at, &s);
            }
        }
        let layout = layout_text(&text, &MonoProvider);
        let newline_count = text.content.chars().filter(|c| *c == '\n').count();
        prop_assert_eq!(
            layout.glyphs.len(),
            text.content.chars().count() - newline_count
        );
        // Wrapped lines never exceed the box in fixed-width mode, except a
        // single glyph wider than the whole box.
        for line in &layout.lines {
            let glyphs = &layout.glyphs[line.glyph_start as usize..line.glyph_end as usize];
            if glyphs.len() > 1 && glyphs.iter().all(|g| !g.ch.is_whitespace()) {
                prop_assert!(line.width <= text.constraint_width + 1e-3);
            }
        }
    }
}
