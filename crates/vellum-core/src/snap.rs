// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Snap candidate computation.
//!
//! Candidates are gathered from live entities near the probe point and
//! returned nearest-first with a deterministic (distance, x, y) order.
//! The overlay builder renders them; interaction sessions use the nearest
//! one to adjust drags.

use vellum_geom::{Aabb, Vec2};
use vellum_model::{EntityId, EntityKind, World};

/// Which snap sources are active, plus the grid pitch.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SnapOptions {
    /// Master switch.
    pub enabled: bool,
    /// Segment endpoints and shape corners.
    pub endpoint: bool,
    /// Segment and edge midpoints.
    pub midpoint: bool,
    /// Shape centers.
    pub center: bool,
    /// Segment-segment intersections.
    pub intersection: bool,
    /// Grid intersections.
    pub grid: bool,
    /// Grid pitch in world units (positive finite).
    pub grid_size: f32,
}

impl Default for SnapOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: true,
            midpoint: true,
            center: true,
            intersection: false,
            grid: false,
            grid_size: 10.0,
        }
    }
}

impl SnapOptions {
    /// Sets the grid pitch, ignoring non-finite or non-positive values.
    pub fn set_grid_size(&mut self, size: f32) {
        if size.is_finite() && size > 0.0 {
            self.grid_size = size;
        }
    }
}

/// Upper bound on returned candidates.
const MAX_CANDIDATES: usize = 8;

fn push_near(out: &mut Vec<Vec2>, probe: Vec2, radius_sq: f32, p: Vec2) {
    if probe.distance_squared(p) <= radius_sq {
        out.push(p);
    }
}

/// Segment-segment intersection point, if the segments properly intersect.
fn segment_intersection(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> Option<Vec2> {
    let d1 = a2.sub(a1);
    let d2 = b2.sub(b1);
    let denom = d1.x * d2.y - d1.y * d2.x;
    if denom.abs() <= f32::EPSILON {
        return None;
    }
    let delta = b1.sub(a1);
    let t = (delta.x * d2.y - delta.y * d2.x) / denom;
    let u = (delta.x * d1.y - delta.y * d1.x) / denom;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some(a1.add(d1.scale(t)))
    } else {
        None
    }
}

/// Segments of an entity that participate in intersection snapping.
fn entity_segments(world: &World, id: EntityId, out: &mut Vec<(Vec2, Vec2)>) {
    let Some(entry) = world.entity_ref(id) else {
        return;
    };
    match entry.kind {
        EntityKind::Line => {
            if let Some(l) = world.find_line(id) {
                out.push((l.a, l.b));
            }
        }
        EntityKind::Arrow => {
            if let Some(a) = world.find_arrow(id) {
                out.push((a.a, a.b));
            }
        }
        EntityKind::Conduit => {
            if let Some(c) = world.find_conduit(id) {
                if let Some((a, b)) = world.conduit_endpoints(c) {
                    out.push((a, b));
                }
            }
        }
        EntityKind::Polyline => {
            if let Some(p) = world.find_polyline(id) {
                for pair in world.polyline_points(p).windows(2) {
                    out.push((pair[0], pair[1]));
                }
            }
        }
        EntityKind::Rect => {
            if let Some(r) = world.find_rect(id) {
                let c = r.corners();
                for i in 0..4 {
                    out.push((c[i], c[(i + 1) % 4]));
                }
            }
        }
        _ => {}
    }
}

/// Computes snap candidates near `probe` within `radius`, nearest first.
/// `exclude` removes entities from consideration; sessions pass their drag
/// targets so an entity cannot snap against itself.
#[must_use]
pub fn snap_candidates(
    world: &World,
    probe: Vec2,
    radius: f32,
    opts: &SnapOptions,
    exclude: &[EntityId],
) -> Vec<Vec2> {
    if !opts.enabled {
        return Vec::new();
    }
    let radius_sq = radius * radius;
    let query = Aabb::from_center_half_extents(probe, radius, radius);
    let mut out: Vec<Vec2> = Vec::new();

    let nearby: Vec<EntityId> = world
        .draw_order()
        .iter()
        .copied()
        .filter(|id| !exclude.contains(id))
        .filter(|id| world.entity_aabb(*id).is_some_and(|bb| bb.inflate(radius).overlaps(&query)))
        .collect();

    let mut segments: Vec<(Vec2, Vec2)> = Vec::new();
    for id in &nearby {
        entity_segments(world, *id, &mut segments);
    }

    if opts.endpoint {
        for (a, b) in &segments {
            push_near(&mut out, probe, radius_sq, *a);
            push_near(&mut out, probe, radius_sq, *b);
        }
    }
    if opts.midpoint {
        for (a, b) in &segments {
            push_near(&mut out, probe, radius_sq, a.midpoint(*b));
        }
    }
    if opts.center {
        for id in &nearby {
            let Some(entry) = world.entity_ref(*id) else {
                continue;
            };
            let center = match entry.kind {
                EntityKind::Circle => world.find_circle(*id).map(|c| c.center),
                EntityKind::Polygon => world.find_polygon(*id).map(|p| p.center),
                _ => world.entity_aabb(*id).map(|bb| bb.center()),
            };
            if let Some(c) = center {
                push_near(&mut out, probe, radius_sq, c);
            }
        }
    }
    if opts.intersection {
        for i in 0..segments.len() {
            for j in i + 1..segments.len() {
                let (a1, a2) = segments[i];
                let (b1, b2) = segments[j];
                if let Some(p) = segment_intersection(a1, a2, b1, b2) {
                    push_near(&mut out, probe, radius_sq, p);
                }
            }
        }
    }
    if opts.grid {
        let pitch = opts.grid_size;
        let gx = libm::roundf(probe.x / pitch) * pitch;
        let gy = libm::roundf(probe.y / pitch) * pitch;
        push_near(&mut out, probe, radius_sq, Vec2::new(gx, gy));
    }

    // Deterministic order: distance, then x, then y; dedupe exact repeats.
    out.sort_by(|a, b| {
        let da = probe.distance_squared(*a);
        let db = probe.distance_squared(*b);
        da.total_cmp(&db)
            .then(a.x.total_cmp(&b.x))
            .then(a.y.total_cmp(&b.y))
    });
    out.dedup_by(|a, b| a == b);
    out.truncate(MAX_CANDIDATES);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_model::{Line, Stroke};

    fn world_with_cross() -> World {
        let mut w = World::new();
        w.upsert_line(
            EntityId(1),
            Line {
                a: Vec2::new(-10.0, 0.0),
                b: Vec2::new(10.0, 0.0),
                stroke: Stroke::default(),
            },
        );
        w.upsert_line(
            EntityId(2),
            Line {
                a: Vec2::new(0.0, -10.0),
                b: Vec2::new(0.0, 10.0),
                stroke: Stroke::default(),
            },
        );
        w
    }

    #[test]
    fn endpoint_and_midpoint_candidates() {
        let w = world_with_cross();
        let opts = SnapOptions::default();
        let near_end = snap_candidates(&w, Vec2::new(9.5, 0.5), 2.0, &opts, &[]);
        assert!(near_end.contains(&Vec2::new(10.0, 0.0)));
        let near_mid = snap_candidates(&w, Vec2::new(0.4, 0.4), 1.0, &opts, &[]);
        assert!(near_mid.contains(&Vec2::new(0.0, 0.0)));
    }

    #[test]
    fn intersection_candidate_when_enabled() {
        let w = world_with_cross();
        let opts = SnapOptions {
            intersection: true,
            endpoint: false,
            midpoint: false,
            center: false,
            ..SnapOptions::default()
        };
        let hits = snap_candidates(&w, Vec2::new(0.5, 0.5), 2.0, &opts, &[]);
        assert_eq!(hits, vec![Vec2::new(0.0, 0.0)]);
    }

    #[test]
    fn grid_candidate_rounds_to_pitch() {
        let w = World::new();
        let opts = SnapOptions {
            grid: true,
            endpoint: false,
            midpoint: false,
            center: false,
            ..SnapOptions::default()
        };
        let hits = snap_candidates(&w, Vec2::new(12.0, 18.0), 5.0, &opts, &[]);
        assert_eq!(hits, vec![Vec2::new(10.0, 20.0)]);
    }

    #[test]
    fn disabled_returns_nothing() {
        let w = world_with_cross();
        let opts = SnapOptions {
            enabled: false,
            ..SnapOptions::default()
        };
        assert!(snap_candidates(&w, Vec2::ZERO, 50.0, &opts, &[]).is_empty());
    }

    #[test]
    fn nearest_first_ordering() {
        let w = world_with_cross();
        let opts = SnapOptions::default();
        let hits = snap_candidates(&w, Vec2::new(8.0, 0.0), 20.0, &opts, &[]);
        assert_eq!(hits[0], Vec2::new(10.0, 0.0));
    }
}
