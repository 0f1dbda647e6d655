// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! End-to-end command application: the S1–S3 scenarios plus the
//! idempotence and compaction laws.

use vellum_core::{Engine, EntityId, Vec2};
use vellum_model::{Line, Rect, Stroke};
use vellum_wire::CommandWriter;

fn red_rect() -> Rect {
    Rect {
        pos: Vec2::new(0.0, 0.0),
        size: Vec2::new(10.0, 10.0),
        rotation: 0.0,
        fill: [1.0, 0.0, 0.0, 1.0],
        stroke: Stroke {
            color: [0.0, 0.0, 0.0, 1.0],
            enabled: true,
            width_px: 1.0,
        },
    }
}

fn apply(engine: &mut Engine, build: impl FnOnce(&mut CommandWriter)) {
    let mut w = CommandWriter::new();
    build(&mut w);
    engine.apply_command_buffer(&w.finish()).expect("apply");
}

#[test]
fn clear_then_upsert_rect_produces_expected_buffers() {
    let mut engine = Engine::new();
    apply(&mut engine, |w| {
        w.clear_all();
        w.upsert_rect(EntityId(1), &red_rect());
    });

    let stats = engine.get_stats();
    assert_eq!(stats.rect_count, 1);

    let (tri_meta, _) = engine.position_buffer();
    assert_eq!(tri_meta.vertex_count, 6);
    let (line_meta, _) = engine.line_buffer();
    assert_eq!(line_meta.vertex_count, 8);

    // Snapshot round-trips.
    let bytes = engine.snapshot_buffer().1.to_vec();
    let mut other = Engine::new();
    other.load_snapshot(&bytes).expect("load");
    assert_eq!(other.snapshot_buffer().1, bytes.as_slice());
}

#[test]
fn draw_order_is_honored_in_the_line_buffer() {
    let mut engine = Engine::new();
    apply(&mut engine, |w| {
        w.upsert_rect(EntityId(1), &red_rect());
        w.upsert_line(
            EntityId(2),
            &Line {
                a: Vec2::new(0.0, 0.0),
                b: Vec2::new(10.0, 10.0),
                stroke: Stroke::default(),
            },
        );
        w.set_draw_order(&[EntityId(2), EntityId(1)]);
    });

    let (_, floats) = engine.line_buffer();
    // First segment is the id=2 line, ending at (10, 10).
    assert_eq!(&floats[7..9], &[10.0, 10.0]);
    // The rect outline follows: 8 more vertices.
    assert_eq!(floats.len(), (2 + 8) * 7);
}

#[test]
fn degenerate_polyline_upsert_creates_nothing() {
    let mut engine = Engine::new();
    apply(&mut engine, |w| {
        w.upsert_polyline(EntityId(5), &[Vec2::new(0.0, 0.0)], [0.0; 4], &Stroke::default());
    });
    assert!(engine.world().entity_ref(EntityId(5)).is_none());
    assert_eq!(engine.get_stats().polyline_count, 0);
}

#[test]
fn upsert_twice_is_byte_identical() {
    let mut a = Engine::new();
    apply(&mut a, |w| {
        w.upsert_rect(EntityId(1), &red_rect());
    });
    let mut b = Engine::new();
    apply(&mut b, |w| {
        w.upsert_rect(EntityId(1), &red_rect());
    });
    apply(&mut b, |w| {
        w.upsert_rect(EntityId(1), &red_rect());
    });

    assert_eq!(a.position_buffer().1, b.position_buffer().1);
    assert_eq!(a.line_buffer().1, b.line_buffer().1);
    assert_eq!(a.snapshot_buffer().1, b.snapshot_buffer().1);
}

#[test]
fn delete_then_upsert_matches_fresh_upsert() {
    let mut reused = Engine::new();
    apply(&mut reused, |w| {
        w.upsert_rect(EntityId(7), &red_rect());
    });
    apply(&mut reused, |w| {
        w.delete_entity(EntityId(7));
    });
    apply(&mut reused, |w| {
        w.upsert_rect(EntityId(7), &red_rect());
    });

    let mut fresh = Engine::new();
    apply(&mut fresh, |w| {
        w.upsert_rect(EntityId(7), &red_rect());
    });

    assert_eq!(reused.snapshot_buffer().1, fresh.snapshot_buffer().1);
    assert_eq!(reused.position_buffer().1, fresh.position_buffer().1);
}

#[test]
fn cross_kind_upsert_replaces_the_entity() {
    let mut engine = Engine::new();
    apply(&mut engine, |w| {
        w.upsert_rect(EntityId(4), &red_rect());
    });
    apply(&mut engine, |w| {
        w.upsert_line(
            EntityId(4),
            &Line {
                a: Vec2::new(0.0, 0.0),
                b: Vec2::new(5.0, 5.0),
                stroke: Stroke::default(),
            },
        );
    });
    let stats = engine.get_stats();
    assert_eq!(stats.rect_count, 0);
    assert_eq!(stats.line_count, 1);
}

#[test]
fn pool_compacts_to_live_polyline_counts() {
    let mut engine = Engine::new();
    let pts_a = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(2.0, 0.0)];
    let pts_b = [Vec2::new(5.0, 5.0), Vec2::new(6.0, 6.0)];
    apply(&mut engine, |w| {
        w.upsert_polyline(EntityId(1), &pts_a, [0.0; 4], &Stroke::default());
        w.upsert_polyline(EntityId(2), &pts_b, [0.0; 4], &Stroke::default());
    });
    assert_eq!(engine.get_stats().point_pool_size, 5);

    // Replacing a polyline discards its old range after compaction.
    apply(&mut engine, |w| {
        w.upsert_polyline(EntityId(1), &pts_b, [0.0; 4], &Stroke::default());
    });
    assert_eq!(engine.get_stats().point_pool_size, 4);

    apply(&mut engine, |w| {
        w.delete_entity(EntityId(2));
    });
    assert_eq!(engine.get_stats().point_pool_size, 2);

    apply(&mut engine, |w| {
        w.clear_all();
    });
    assert_eq!(engine.get_stats().point_pool_size, 0);
}

#[test]
fn malformed_buffer_leaves_model_untouched() {
    let mut engine = Engine::new();
    apply(&mut engine, |w| {
        w.upsert_rect(EntityId(1), &red_rect());
    });
    let generation = engine.generation();
    let snapshot = engine.snapshot_buffer().1.to_vec();

    // A buffer with a good record followed by an unknown op.
    let mut w = CommandWriter::new();
    w.upsert_rect(EntityId(2), &red_rect());
    let mut bytes = w.finish();
    bytes.extend_from_slice(&0xBEEFu32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());

    assert!(engine.apply_command_buffer(&bytes).is_err());
    assert_ne!(engine.last_error_code(), 0);
    assert_eq!(engine.generation(), generation);
    assert_eq!(engine.snapshot_buffer().1, snapshot.as_slice());
    assert!(engine.world().entity_ref(EntityId(2)).is_none());
}

#[test]
fn view_scale_clamps_and_survives_commands() {
    let mut engine = Engine::new();
    apply(&mut engine, |w| {
        w.set_view_scale(f32::NAN);
    });
    assert_eq!(engine.view_scale(), 1.0);
    apply(&mut engine, |w| {
        w.set_view_scale(2.5);
    });
    assert_eq!(engine.view_scale(), 2.5);
    apply(&mut engine, |w| {
        w.clear_all();
    });
    assert_eq!(engine.view_scale(), 1.0);
}
