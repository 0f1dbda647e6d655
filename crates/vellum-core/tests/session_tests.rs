// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! Interaction sessions: atomic cancel, the resize anchor contract, commit
//! deltas, and drafting.

use vellum_core::{
    modifier, CommitOp, DraftKind, Engine, EntityId, TransformMode, Vec2,
};
use vellum_model::{Rect, Stroke};
use vellum_wire::CommandWriter;

fn engine_with_rect() -> Engine {
    let mut engine = Engine::new();
    let mut w = CommandWriter::new();
    w.upsert_rect(
        EntityId(1),
        &Rect {
            pos: Vec2::new(0.0, 0.0),
            size: Vec2::new(10.0, 10.0),
            rotation: 0.0,
            fill: [1.0, 0.0, 0.0, 1.0],
            stroke: Stroke::default(),
        },
    );
    engine.apply_command_buffer(&w.finish()).expect("apply");
    engine
}

fn begin(
    engine: &mut Engine,
    mode: TransformMode,
    handle_index: u32,
    start: Vec2,
    modifiers: u32,
) {
    engine
        .begin_transform(
            &[EntityId(1)],
            mode,
            EntityId(1),
            0,
            handle_index,
            start,
            start,
            Vec2::new(800.0, 600.0),
            modifiers,
        )
        .expect("begin");
}

#[test]
fn cancel_restores_byte_identical_triangles() {
    let mut engine = engine_with_rect();
    let before = engine.position_buffer().1.to_vec();

    begin(&mut engine, TransformMode::Move, 0, Vec2::new(0.0, 0.0), 0);
    engine
        .update_transform(Vec2::new(5.0, 5.0), Vec2::new(5.0, 5.0))
        .expect("update");
    // Preview actually moved the rect.
    assert_ne!(engine.position_buffer().1, before.as_slice());

    engine.cancel_transform().expect("cancel");
    assert_eq!(engine.position_buffer().1, before.as_slice());
    assert!(!engine.is_interaction_active());
    // Cancel records no history.
    assert!(!engine.can_undo());
}

#[test]
fn resize_corner_zero_against_corner_two() {
    let mut engine = engine_with_rect();
    begin(&mut engine, TransformMode::Resize, 0, Vec2::new(0.0, 0.0), 0);
    engine
        .update_transform(Vec2::new(-2.0, -2.0), Vec2::new(-2.0, -2.0))
        .expect("update");
    engine.commit_transform().expect("commit");

    let rect = engine.world().find_rect(EntityId(1)).expect("rect");
    assert!((rect.pos.x + 2.0).abs() < 1e-5);
    assert!((rect.pos.y + 2.0).abs() < 1e-5);
    assert!((rect.size.x - 12.0).abs() < 1e-5);
    assert!((rect.size.y - 12.0).abs() < 1e-5);

    assert_eq!(engine.commit_result_count(), 1);
    assert_eq!(engine.commit_result_ids(), &[1]);
    assert_eq!(engine.commit_result_op_codes(), &[CommitOp::Resize as u32]);
    let payload = engine.commit_result_payloads();
    assert!((payload[0] + 2.0).abs() < 1e-5);
    assert!((payload[1] + 2.0).abs() < 1e-5);
    assert!((payload[2] - 12.0).abs() < 1e-5);
    assert!((payload[3] - 12.0).abs() < 1e-5);
}

#[test]
fn every_corner_anchors_the_opposite_one() {
    // Dragging corner h must keep corner (h+2)%4 fixed.
    for handle in 0..4u32 {
        let mut engine = engine_with_rect();
        let corners = [
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
        ];
        let anchor_expected = corners[((handle + 2) % 4) as usize];
        begin(&mut engine, TransformMode::Resize, handle, corners[handle as usize], 0);
        let drag = corners[handle as usize].add(Vec2::new(3.0, 3.0));
        engine.update_transform(drag, drag).expect("update");
        engine.commit_transform().expect("commit");

        let rect = engine.world().find_rect(EntityId(1)).expect("rect");
        let kept = rect.corners()[((handle + 2) % 4) as usize];
        assert!(
            (kept.x - anchor_expected.x).abs() < 1e-4
                && (kept.y - anchor_expected.y).abs() < 1e-4,
            "handle {handle}: anchor moved from {anchor_expected:?} to {kept:?}"
        );
    }
}

#[test]
fn move_commit_reports_total_delta() {
    let mut engine = engine_with_rect();
    begin(&mut engine, TransformMode::Move, 0, Vec2::new(1.0, 1.0), modifier::CTRL);
    engine
        .update_transform(Vec2::new(4.0, 3.0), Vec2::new(4.0, 3.0))
        .expect("update");
    engine.commit_transform().expect("commit");

    assert_eq!(engine.commit_result_op_codes(), &[CommitOp::Move as u32]);
    let payload = engine.commit_result_payloads();
    assert!((payload[0] - 3.0).abs() < 1e-5);
    assert!((payload[1] - 2.0).abs() < 1e-5);
    let rect = engine.world().find_rect(EntityId(1)).expect("rect");
    assert!((rect.pos.x - 3.0).abs() < 1e-5);
}

#[test]
fn shift_rotate_snaps_to_fifteen_degrees() {
    let mut engine = engine_with_rect();
    // Pivot is the rect center (5, 5); start due east of it.
    begin(
        &mut engine,
        TransformMode::Rotate,
        0,
        Vec2::new(15.0, 5.0),
        modifier::SHIFT,
    );
    // Drag to roughly 40 degrees; shift snaps to 45.
    let target = Vec2::new(
        5.0 + 10.0 * libm::cosf(40.0f32.to_radians()),
        5.0 + 10.0 * libm::sinf(40.0f32.to_radians()),
    );
    engine.update_transform(target, target).expect("update");
    engine.commit_transform().expect("commit");

    assert_eq!(engine.commit_result_op_codes(), &[CommitOp::Rotate as u32]);
    let angle = engine.commit_result_payloads()[0];
    assert!((angle - 45.0f32.to_radians()).abs() < 1e-4);
    let rect = engine.world().find_rect(EntityId(1)).expect("rect");
    assert!((rect.rotation - 45.0f32.to_radians()).abs() < 1e-4);
}

#[test]
fn commit_records_one_history_entry() {
    let mut engine = engine_with_rect();
    begin(&mut engine, TransformMode::Move, 0, Vec2::new(0.0, 0.0), modifier::CTRL);
    engine
        .update_transform(Vec2::new(2.0, 0.0), Vec2::new(2.0, 0.0))
        .expect("update");
    let before_len = engine.history_meta().len;
    engine.commit_transform().expect("commit");
    assert_eq!(engine.history_meta().len, before_len + 1);

    // Undo restores the original position.
    assert!(engine.undo());
    let rect = engine.world().find_rect(EntityId(1)).expect("rect");
    assert!((rect.pos.x).abs() < 1e-5);
}

#[test]
fn begin_on_missing_target_is_an_error() {
    let mut engine = Engine::new();
    let err = engine
        .begin_transform(
            &[EntityId(99)],
            TransformMode::Move,
            EntityId(99),
            0,
            0,
            Vec2::ZERO,
            Vec2::ZERO,
            Vec2::new(800.0, 600.0),
            0,
        )
        .expect_err("missing target");
    assert_eq!(err, vellum_core::EngineError::IdNotFound);
}

#[test]
fn update_without_session_is_an_error() {
    let mut engine = engine_with_rect();
    let err = engine
        .update_transform(Vec2::ZERO, Vec2::ZERO)
        .expect_err("no session");
    assert_eq!(err, vellum_core::EngineError::SessionNotActive);
}

#[test]
fn draft_commit_reports_the_assigned_id() {
    let mut engine = Engine::new();
    let id = engine
        .begin_draft(
            DraftKind::Rect,
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(800.0, 600.0),
            modifier::CTRL,
        )
        .expect("draft");
    engine
        .update_transform(Vec2::new(8.0, 6.0), Vec2::new(8.0, 6.0))
        .expect("update");
    let committed = engine.commit_transform().expect("commit");
    assert_eq!(committed, Some(id));

    let rect = engine.world().find_rect(id).expect("drafted rect");
    assert!((rect.size.x - 8.0).abs() < 1e-5);
    assert!((rect.size.y - 6.0).abs() < 1e-5);
    // Undo removes the drafted entity.
    assert!(engine.undo());
    assert!(engine.world().entity_ref(id).is_none());
}

#[test]
fn draft_cancel_leaves_no_entity() {
    let mut engine = Engine::new();
    let id = engine
        .begin_draft(
            DraftKind::Line,
            Vec2::ZERO,
            Vec2::ZERO,
            Vec2::new(800.0, 600.0),
            modifier::CTRL,
        )
        .expect("draft");
    engine
        .update_transform(Vec2::new(5.0, 5.0), Vec2::new(5.0, 5.0))
        .expect("update");
    engine.cancel_transform().expect("cancel");
    assert!(engine.world().entity_ref(id).is_none());
    assert_eq!(engine.get_stats().line_count, 0);
}

#[test]
fn polyline_draft_accumulates_vertices() {
    let mut engine = Engine::new();
    let id = engine
        .begin_draft(
            DraftKind::Polyline,
            Vec2::ZERO,
            Vec2::ZERO,
            Vec2::new(800.0, 600.0),
            modifier::CTRL,
        )
        .expect("draft");
    engine
        .update_transform(Vec2::new(5.0, 0.0), Vec2::new(5.0, 0.0))
        .expect("update");
    engine.append_draft_vertex().expect("append");
    engine
        .update_transform(Vec2::new(5.0, 5.0), Vec2::new(5.0, 5.0))
        .expect("update");
    engine.commit_transform().expect("commit");

    let poly = engine.world().find_polyline(id).expect("polyline");
    assert_eq!(poly.count, 3);
}
