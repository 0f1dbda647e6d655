// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! Undo/redo through the engine: per-batch entries, clear-all reversal,
//! draw-order restoration, and the bounded log.

use vellum_core::{Engine, EngineBuilder, EntityId, Vec2};
use vellum_model::{Rect, Stroke};
use vellum_wire::CommandWriter;

fn rect_at(x: f32) -> Rect {
    Rect {
        pos: Vec2::new(x, 0.0),
        size: Vec2::new(10.0, 10.0),
        rotation: 0.0,
        fill: [1.0, 0.0, 0.0, 1.0],
        stroke: Stroke::default(),
    }
}

fn apply(engine: &mut Engine, build: impl FnOnce(&mut CommandWriter)) {
    let mut w = CommandWriter::new();
    build(&mut w);
    engine.apply_command_buffer(&w.finish()).expect("apply");
}

#[test]
fn undo_and_redo_a_create() {
    let mut engine = Engine::new();
    apply(&mut engine, |w| w.upsert_rect(EntityId(1), &rect_at(0.0)));
    assert!(engine.can_undo());

    assert!(engine.undo());
    assert_eq!(engine.get_stats().rect_count, 0);
    assert!(engine.can_redo());

    assert!(engine.redo());
    assert_eq!(engine.get_stats().rect_count, 1);
    assert_eq!(
        engine.world().find_rect(EntityId(1)).map(|r| r.pos.x),
        Some(0.0)
    );
}

#[test]
fn one_batch_is_one_entry() {
    let mut engine = Engine::new();
    apply(&mut engine, |w| {
        w.upsert_rect(EntityId(1), &rect_at(0.0));
        w.upsert_rect(EntityId(2), &rect_at(20.0));
        w.upsert_rect(EntityId(3), &rect_at(40.0));
    });
    assert_eq!(engine.history_meta().len, 1);
    assert!(engine.undo());
    assert_eq!(engine.get_stats().rect_count, 0);
}

#[test]
fn undo_of_an_update_restores_prior_fields() {
    let mut engine = Engine::new();
    apply(&mut engine, |w| w.upsert_rect(EntityId(1), &rect_at(0.0)));
    apply(&mut engine, |w| w.upsert_rect(EntityId(1), &rect_at(99.0)));

    assert!(engine.undo());
    assert_eq!(
        engine.world().find_rect(EntityId(1)).map(|r| r.pos.x),
        Some(0.0)
    );
    assert!(engine.redo());
    assert_eq!(
        engine.world().find_rect(EntityId(1)).map(|r| r.pos.x),
        Some(99.0)
    );
}

#[test]
fn clear_all_is_reversible() {
    let mut engine = Engine::new();
    apply(&mut engine, |w| {
        w.upsert_rect(EntityId(1), &rect_at(0.0));
        w.upsert_polyline(
            EntityId(2),
            &[Vec2::new(0.0, 0.0), Vec2::new(3.0, 3.0)],
            [0.0; 4],
            &Stroke::default(),
        );
    });
    apply(&mut engine, |w| w.clear_all());
    assert_eq!(engine.get_stats().rect_count, 0);
    assert_eq!(engine.get_stats().point_pool_size, 0);

    assert!(engine.undo());
    assert_eq!(engine.get_stats().rect_count, 1);
    assert_eq!(engine.get_stats().polyline_count, 1);
    assert_eq!(engine.get_stats().point_pool_size, 2);
}

#[test]
fn draw_order_change_is_reversible() {
    let mut engine = Engine::new();
    apply(&mut engine, |w| {
        w.upsert_rect(EntityId(1), &rect_at(0.0));
        w.upsert_rect(EntityId(2), &rect_at(20.0));
    });
    apply(&mut engine, |w| w.set_draw_order(&[EntityId(2), EntityId(1)]));
    assert_eq!(engine.world().draw_order(), &[EntityId(2), EntityId(1)]);

    assert!(engine.undo());
    assert_eq!(engine.world().draw_order(), &[EntityId(1), EntityId(2)]);
    assert!(engine.redo());
    assert_eq!(engine.world().draw_order(), &[EntityId(2), EntityId(1)]);
}

#[test]
fn bounded_log_drops_the_oldest_entry() {
    let mut engine = EngineBuilder::new().history_capacity(3).build();
    for i in 0..5u32 {
        apply(&mut engine, |w| w.upsert_rect(EntityId(1), &rect_at(i as f32)));
    }
    assert_eq!(engine.history_meta().len, 3);
    assert!(engine.undo());
    assert!(engine.undo());
    assert!(engine.undo());
    // The two oldest edits fell off the log.
    assert!(!engine.can_undo());
    assert_eq!(
        engine.world().find_rect(EntityId(1)).map(|r| r.pos.x),
        Some(1.0)
    );
}

#[test]
fn undo_with_empty_log_is_a_clean_no_op() {
    let mut engine = Engine::new();
    assert!(!engine.undo());
    assert!(!engine.redo());
    assert_eq!(engine.last_error_code(), 0);
}

#[test]
fn generation_advances_on_undo_and_redo() {
    let mut engine = Engine::new();
    apply(&mut engine, |w| w.upsert_rect(EntityId(1), &rect_at(0.0)));
    let g1 = engine.generation();
    engine.undo();
    let g2 = engine.generation();
    assert!(g2 > g1);
    engine.redo();
    assert!(engine.generation() > g2);
}
