// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Selection and snap overlays.
//!
//! Overlays are sized in screen pixels and converted to world units with
//! the view scale so they keep their apparent size while zooming.

use vellum_geom::handles::{corner_handles, rotate_handles, side_handles};
use vellum_geom::Vec2;
use vellum_model::{ColorRgba, EntityId, World};

use crate::vertex::VertexBuffer;

/// Edge length of a square selection handle, in screen pixels.
pub const HANDLE_SIZE_PX: f32 = 8.0;

/// Diagonal offset of rotate handles outside the corners, in screen pixels.
pub const ROTATE_HANDLE_MARGIN_PX: f32 = 12.0;

/// Dash length of the selection outline, in screen pixels.
const DASH_PX: f32 = 6.0;

/// Gap length of the selection outline, in screen pixels.
const GAP_PX: f32 = 4.0;

const OUTLINE_COLOR: ColorRgba = [0.18, 0.45, 0.90, 1.0];
const HANDLE_COLOR: ColorRgba = [1.0, 1.0, 1.0, 1.0];
const HANDLE_RIM_COLOR: ColorRgba = [0.18, 0.45, 0.90, 1.0];
const ROTATE_COLOR: ColorRgba = [0.18, 0.80, 0.45, 1.0];
const SNAP_COLOR: ColorRgba = [0.95, 0.55, 0.10, 1.0];

/// Overlay depth: always above document content.
const OVERLAY_Z: f32 = 0.999;

fn dashed_segment(out: &mut VertexBuffer, a: Vec2, b: Vec2, dash: f32, gap: f32) {
    let delta = b.sub(a);
    let len = delta.length();
    if len <= f32::EPSILON {
        return;
    }
    let dir = delta.scale(1.0 / len);
    let period = dash + gap;
    let mut t = 0.0f32;
    while t < len {
        let end = (t + dash).min(len);
        out.push_segment(
            a.add(dir.scale(t)),
            a.add(dir.scale(end)),
            OVERLAY_Z,
            OUTLINE_COLOR,
        );
        t += period;
    }
}

/// Builds the dashed AABB outline for the selected ids, in id order.
#[must_use]
pub fn build_selection_outline(world: &World, ids: &[EntityId], view_scale: f32) -> VertexBuffer {
    let inv = 1.0 / view_scale.max(1e-4);
    let dash = DASH_PX * inv;
    let gap = GAP_PX * inv;
    let mut out = VertexBuffer::new();
    for id in ids {
        let Some(bb) = world.entity_aabb(*id) else {
            continue;
        };
        let c = corner_handles(&bb);
        for i in 0..4 {
            dashed_segment(&mut out, c[i], c[(i + 1) % 4], dash, gap);
        }
    }
    out
}

fn handle_quad(out: &mut VertexBuffer, center: Vec2, half: f32, color: ColorRgba) {
    out.push_quad(
        Vec2::new(center.x - half, center.y - half),
        Vec2::new(center.x + half, center.y + half),
        OVERLAY_Z,
        color,
    );
}

/// Builds resize and rotate handle quads for the selected ids.
///
/// Per id: four corner handles, four side handles, four rotate handles,
/// emitted in ordinal order so a consumer can recover the ordinal from the
/// vertex offset.
#[must_use]
pub fn build_selection_handles(world: &World, ids: &[EntityId], view_scale: f32) -> VertexBuffer {
    let inv = 1.0 / view_scale.max(1e-4);
    let half = HANDLE_SIZE_PX * 0.5 * inv;
    let rim = half + inv; // one pixel of rim
    let margin = ROTATE_HANDLE_MARGIN_PX * inv;
    let mut out = VertexBuffer::new();
    for id in ids {
        let Some(bb) = world.entity_aabb(*id) else {
            continue;
        };
        for corner in corner_handles(&bb) {
            handle_quad(&mut out, corner, rim, HANDLE_RIM_COLOR);
            handle_quad(&mut out, corner, half, HANDLE_COLOR);
        }
        for side in side_handles(&bb) {
            handle_quad(&mut out, side, rim, HANDLE_RIM_COLOR);
            handle_quad(&mut out, side, half, HANDLE_COLOR);
        }
        for rot in rotate_handles(&bb, margin) {
            handle_quad(&mut out, rot, half, ROTATE_COLOR);
        }
    }
    out
}

/// Builds cross markers for snap candidate points.
#[must_use]
pub fn build_snap_overlay(points: &[Vec2], view_scale: f32) -> VertexBuffer {
    let inv = 1.0 / view_scale.max(1e-4);
    let arm = 4.0 * inv;
    let mut out = VertexBuffer::new();
    for p in points {
        out.push_segment(
            Vec2::new(p.x - arm, p.y - arm),
            Vec2::new(p.x + arm, p.y + arm),
            OVERLAY_Z,
            SNAP_COLOR,
        );
        out.push_segment(
            Vec2::new(p.x - arm, p.y + arm),
            Vec2::new(p.x + arm, p.y - arm),
            OVERLAY_Z,
            SNAP_COLOR,
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_model::{Rect, Stroke};

    fn world_with_rect() -> World {
        let mut w = World::new();
        w.upsert_rect(
            EntityId(1),
            Rect {
                pos: Vec2::ZERO,
                size: Vec2::new(100.0, 100.0),
                rotation: 0.0,
                fill: [1.0; 4],
                stroke: Stroke::default(),
            },
        );
        w
    }

    #[test]
    fn outline_is_dashed() {
        let w = world_with_rect();
        let out = build_selection_outline(&w, &[EntityId(1)], 1.0);
        // 100-unit edges with a 10-unit period: 10 dashes per edge.
        assert_eq!(out.vertex_count(), 4 * 10 * 2);
    }

    #[test]
    fn handles_count_per_selected_entity() {
        let w = world_with_rect();
        let out = build_selection_handles(&w, &[EntityId(1)], 1.0);
        // 4 corners (rim+face) + 4 sides (rim+face) + 4 rotate = 20 quads.
        assert_eq!(out.vertex_count(), 20 * 6);
    }

    #[test]
    fn handle_size_tracks_view_scale() {
        let w = world_with_rect();
        let near = build_selection_handles(&w, &[EntityId(1)], 2.0);
        let far = build_selection_handles(&w, &[EntityId(1)], 0.5);
        // Same topology, different world-space extents.
        assert_eq!(near.vertex_count(), far.vertex_count());
        assert_ne!(near.as_floats(), far.as_floats());
    }

    #[test]
    fn snap_markers_are_two_segments_each() {
        let out = build_snap_overlay(&[Vec2::ZERO, Vec2::new(5.0, 5.0)], 1.0);
        assert_eq!(out.vertex_count(), 2 * 2 * 2);
    }

    #[test]
    fn missing_ids_are_skipped() {
        let w = world_with_rect();
        let out = build_selection_outline(&w, &[EntityId(42)], 1.0);
        assert!(out.is_empty());
    }
}
