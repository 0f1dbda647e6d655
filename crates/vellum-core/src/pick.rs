// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Point and marquee picking.
//!
//! Tie-break order: topmost in draw order wins; among sub-targets of the
//! same entity the smallest squared distance wins, with vertices preferred
//! over edges and handles dominating body at equal distance. Handles are
//! tested before entities because they belong to the active selection and
//! float above the document.
//!
//! Handle ordinals follow the canonical layout in `vellum_geom::handles`:
//! resize sub-indices 0..=3 are the CCW corners from bottom-left and
//! 4..=7 are the sides (S/E/N/W shifted up by four so corner and side
//! ordinals stay distinguishable in one index space).

use vellum_geom::handles::{corner_handles, rotate_handles, side_handles};
use vellum_geom::{point_segment_distance_squared, Aabb, Rot2, Vec2};
use vellum_model::{EntityId, EntityKind, Polygon, Rect, World};

/// Offset separating side-handle ordinals from corner ordinals.
pub const SIDE_HANDLE_BASE: u32 = 4;

/// What part of an entity a pick hit.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SubTarget {
    /// Nothing specific.
    #[default]
    None = 0,
    /// The filled interior.
    Body = 1,
    /// An edge segment; sub-index is the edge ordinal.
    Edge = 2,
    /// A vertex; sub-index is the vertex ordinal.
    Vertex = 3,
    /// A resize handle; sub-index 0..=3 corners, 4..=7 sides.
    ResizeHandle = 4,
    /// A rotate handle; sub-index is the corner ordinal.
    RotateHandle = 5,
    /// The interior of a text block.
    TextBody = 6,
    /// A precise caret position inside a text block.
    TextCaret = 7,
}

/// Result of a point pick.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickRecord {
    /// The hit entity.
    pub id: EntityId,
    /// Its kind tag.
    pub kind: EntityKind,
    /// The hit sub-target.
    pub sub_target: SubTarget,
    /// Sub-target ordinal (vertex, edge, or handle index).
    pub sub_index: u32,
    /// Squared distance from the query point, world units.
    pub distance_sq: f32,
    /// The clamped hit point on the entity.
    pub point: Vec2,
}

/// Marquee interpretation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum MarqueeMode {
    /// Entity must be fully enclosed.
    Window = 0,
    /// Entity must intersect the rectangle.
    Crossing = 1,
}

struct Candidate {
    sub_target: SubTarget,
    sub_index: u32,
    distance_sq: f32,
    point: Vec2,
}

fn specificity(sub: SubTarget) -> u8 {
    match sub {
        SubTarget::None => 0,
        SubTarget::Body | SubTarget::TextBody => 1,
        SubTarget::Edge => 2,
        SubTarget::Vertex | SubTarget::TextCaret => 3,
        SubTarget::ResizeHandle | SubTarget::RotateHandle => 4,
    }
}

fn better(a: &Candidate, b: &Candidate) -> bool {
    // Smaller distance wins; ties go to the more specific sub-target.
    if (a.distance_sq - b.distance_sq).abs() <= f32::EPSILON {
        specificity(a.sub_target) > specificity(b.sub_target)
    } else {
        a.distance_sq < b.distance_sq
    }
}

fn vertex_candidates(point: Vec2, verts: &[Vec2], tol_sq: f32, out: &mut Vec<Candidate>) {
    for (i, v) in verts.iter().enumerate() {
        let d = point.distance_squared(*v);
        if d <= tol_sq {
            out.push(Candidate {
                sub_target: SubTarget::Vertex,
                sub_index: i as u32,
                distance_sq: d,
                point: *v,
            });
        }
    }
}

fn edge_candidates(point: Vec2, verts: &[Vec2], closed: bool, tol_sq: f32, out: &mut Vec<Candidate>) {
    let n = verts.len();
    if n < 2 {
        return;
    }
    let edge_count = if closed { n } else { n - 1 };
    for i in 0..edge_count {
        let a = verts[i];
        let b = verts[(i + 1) % n];
        let (d, closest) = point_segment_distance_squared(point, a, b);
        if d <= tol_sq {
            out.push(Candidate {
                sub_target: SubTarget::Edge,
                sub_index: i as u32,
                distance_sq: d,
                point: closest,
            });
        }
    }
}

/// Even-odd point-in-polygon test.
fn point_in_polygon(point: Vec2, verts: &[Vec2]) -> bool {
    let n = verts.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let a = verts[i];
        let b = verts[j];
        if (a.y > point.y) != (b.y > point.y) {
            let x = a.x + (point.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if point.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

fn best_candidate(
    world: &World,
    id: EntityId,
    kind: EntityKind,
    point: Vec2,
    tol_sq: f32,
) -> Option<Candidate> {
    let mut cands: Vec<Candidate> = Vec::new();
    match kind {
        EntityKind::Rect => {
            let rect = world.find_rect(id)?;
            let corners = rect.corners();
            vertex_candidates(point, &corners, tol_sq, &mut cands);
            edge_candidates(point, &corners, true, tol_sq, &mut cands);
            if rect_contains(rect, point) {
                cands.push(Candidate {
                    sub_target: SubTarget::Body,
                    sub_index: 0,
                    distance_sq: 0.0,
                    point,
                });
            }
        }
        EntityKind::Line => {
            let line = world.find_line(id)?;
            let verts = [line.a, line.b];
            vertex_candidates(point, &verts, tol_sq, &mut cands);
            edge_candidates(point, &verts, false, tol_sq, &mut cands);
        }
        EntityKind::Polyline => {
            let poly = world.find_polyline(id)?;
            let points = world.polyline_points(poly);
            vertex_candidates(point, points, tol_sq, &mut cands);
            edge_candidates(point, points, false, tol_sq, &mut cands);
            if poly.fill[3] > 0.0 && point_in_polygon(point, points) {
                cands.push(Candidate {
                    sub_target: SubTarget::Body,
                    sub_index: 0,
                    distance_sq: 0.0,
                    point,
                });
            }
        }
        EntityKind::Circle => {
            let circle = world.find_circle(id)?;
            let r = circle.scaled_radius();
            if r.x <= f32::EPSILON || r.y <= f32::EPSILON {
                return None;
            }
            let local = Rot2::from_angle(circle.rotation)
                .inverse()
                .apply(point.sub(circle.center));
            let unit = Vec2::new(local.x / r.x, local.y / r.y);
            let d_unit = unit.length();
            let mean_r = (r.x + r.y) * 0.5;
            let rim_dist = (d_unit - 1.0).abs() * mean_r;
            if rim_dist * rim_dist <= tol_sq {
                cands.push(Candidate {
                    sub_target: SubTarget::Edge,
                    sub_index: 0,
                    distance_sq: rim_dist * rim_dist,
                    point,
                });
            }
            if d_unit <= 1.0 && circle.fill[3] > 0.0 {
                cands.push(Candidate {
                    sub_target: SubTarget::Body,
                    sub_index: 0,
                    distance_sq: 0.0,
                    point,
                });
            }
        }
        EntityKind::Polygon => {
            let polygon = world.find_polygon(id)?;
            let verts = polygon_verts(polygon);
            vertex_candidates(point, &verts, tol_sq, &mut cands);
            edge_candidates(point, &verts, true, tol_sq, &mut cands);
            if polygon.fill[3] > 0.0 && point_in_polygon(point, &verts) {
                cands.push(Candidate {
                    sub_target: SubTarget::Body,
                    sub_index: 0,
                    distance_sq: 0.0,
                    point,
                });
            }
        }
        EntityKind::Arrow => {
            let arrow = world.find_arrow(id)?;
            let verts = [arrow.a, arrow.b];
            vertex_candidates(point, &verts, tol_sq, &mut cands);
            edge_candidates(point, &verts, false, tol_sq, &mut cands);
        }
        EntityKind::Conduit => {
            let conduit = world.find_conduit(id)?;
            if let Some((a, b)) = world.conduit_endpoints(conduit) {
                let verts = [a, b];
                vertex_candidates(point, &verts, tol_sq, &mut cands);
                edge_candidates(point, &verts, false, tol_sq, &mut cands);
            }
        }
        EntityKind::Text => {
            let bb = world.entity_aabb(id)?;
            if bb.contains_point(point) {
                cands.push(Candidate {
                    sub_target: SubTarget::TextBody,
                    sub_index: 0,
                    distance_sq: 0.0,
                    point,
                });
            } else {
                let d = bb.distance_squared_to_point(point);
                if d <= tol_sq {
                    cands.push(Candidate {
                        sub_target: SubTarget::TextBody,
                        sub_index: 0,
                        distance_sq: d,
                        point: bb.clamp_point(point),
                    });
                }
            }
        }
        EntityKind::Symbol | EntityKind::Node => return None,
    }
    cands.into_iter().reduce(|best, c| if better(&c, &best) { c } else { best })
}

fn rect_contains(rect: &Rect, point: Vec2) -> bool {
    let local = Rot2::from_angle(rect.rotation)
        .inverse()
        .apply_around(point, rect.pos);
    let min = Vec2::new(rect.pos.x.min(rect.pos.x + rect.size.x), rect.pos.y.min(rect.pos.y + rect.size.y));
    let max = Vec2::new(rect.pos.x.max(rect.pos.x + rect.size.x), rect.pos.y.max(rect.pos.y + rect.size.y));
    local.x >= min.x && local.x <= max.x && local.y >= min.y && local.y <= max.y
}

fn polygon_verts(polygon: &Polygon) -> Vec<Vec2> {
    polygon.vertices()
}

/// Tests the selection handles of `ids` against the point; handles float
/// above everything, so the first hit here pre-empts entity picking.
fn pick_handles(
    world: &World,
    selected: &[EntityId],
    point: Vec2,
    tol_sq: f32,
    rotate_margin: f32,
) -> Option<PickRecord> {
    let mut best: Option<PickRecord> = None;
    for id in selected {
        let Some(bb) = world.entity_aabb(*id) else {
            continue;
        };
        let Some(entry) = world.entity_ref(*id) else {
            continue;
        };
        let mut consider = |sub_target: SubTarget, sub_index: u32, center: Vec2| {
            let d = point.distance_squared(center);
            if d > tol_sq {
                return;
            }
            let candidate = PickRecord {
                id: *id,
                kind: entry.kind,
                sub_target,
                sub_index,
                distance_sq: d,
                point: center,
            };
            let replace = match &best {
                None => true,
                Some(current) => d < current.distance_sq,
            };
            if replace {
                best = Some(candidate);
            }
        };
        for (i, c) in corner_handles(&bb).iter().enumerate() {
            consider(SubTarget::ResizeHandle, i as u32, *c);
        }
        for (i, s) in side_handles(&bb).iter().enumerate() {
            consider(SubTarget::ResizeHandle, SIDE_HANDLE_BASE + i as u32, *s);
        }
        for (i, r) in rotate_handles(&bb, rotate_margin).iter().enumerate() {
            consider(SubTarget::RotateHandle, i as u32, *r);
        }
    }
    best
}

/// Full point pick.
///
/// `tolerance_px` is divided by `view_scale` to get the world tolerance.
/// `selected` contributes handle targets; `candidates`, when present, is a
/// sorted id set from the broad phase used to skip non-nearby entities (the
/// answer must match the linear scan either way).
#[must_use]
pub fn pick_point(
    world: &World,
    point: Vec2,
    tolerance_px: f32,
    view_scale: f32,
    selected: &[EntityId],
    candidates: Option<&[u32]>,
) -> Option<PickRecord> {
    let world_tol = tolerance_px / view_scale.max(1e-4);
    let tol_sq = world_tol * world_tol;
    let rotate_margin = vellum_render::ROTATE_HANDLE_MARGIN_PX / view_scale.max(1e-4);

    if let Some(handle_hit) = pick_handles(world, selected, point, tol_sq, rotate_margin) {
        return Some(handle_hit);
    }

    // Topmost first.
    for id in world.draw_order().iter().rev() {
        if let Some(cands) = candidates {
            if cands.binary_search(&id.0).is_err() {
                continue;
            }
        }
        let Some(entry) = world.entity_ref(*id) else {
            continue;
        };
        if let Some(c) = best_candidate(world, *id, entry.kind, point, tol_sq) {
            return Some(PickRecord {
                id: *id,
                kind: entry.kind,
                sub_target: c.sub_target,
                sub_index: c.sub_index,
                distance_sq: c.distance_sq,
                point: c.point,
            });
        }
    }
    None
}

/// AABB-level area query: every drawable whose box overlaps `rect`,
/// ascending by id.
#[must_use]
pub fn query_area(world: &World, rect: &Aabb) -> Vec<EntityId> {
    let mut out: Vec<EntityId> = world
        .draw_order()
        .iter()
        .copied()
        .filter(|id| world.entity_aabb(*id).is_some_and(|bb| bb.overlaps(rect)))
        .collect();
    out.sort_unstable();
    out
}

/// Marquee query with Window/Crossing semantics, ascending by id.
#[must_use]
pub fn query_marquee(world: &World, rect: &Aabb, mode: MarqueeMode) -> Vec<EntityId> {
    let mut out: Vec<EntityId> = world
        .draw_order()
        .iter()
        .copied()
        .filter(|id| {
            world.entity_aabb(*id).is_some_and(|bb| match mode {
                MarqueeMode::Window => rect.contains(&bb),
                MarqueeMode::Crossing => rect.overlaps(&bb),
            })
        })
        .collect();
    out.sort_unstable();
    out
}
