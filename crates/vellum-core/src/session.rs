// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Interaction session state and the pure transform math it applies.
//!
//! A session captures the starting value of every target at `begin`; every
//! `update` recomputes the targets from those captured values plus the
//! total drag, so preview mutation is idempotent and `cancel` restores the
//! captured values byte-for-byte. `commit` keeps the final values and
//! reports compact per-id deltas.

use vellum_geom::handles::{corner_handles, opposite_corner, side_handles};
use vellum_geom::{atan2, Aabb, Rot2, Vec2};
use vellum_model::{EntityId, NodeAnchor, Stroke};

use crate::history::EntityState;

/// Modifier bit masks carried through `begin`/`update`.
pub mod modifier {
    /// Shift: preserve aspect while resizing, snap angles while rotating.
    pub const SHIFT: u32 = 1;
    /// Ctrl: disable point snapping.
    pub const CTRL: u32 = 2;
    /// Alt.
    pub const ALT: u32 = 4;
    /// Meta.
    pub const META: u32 = 8;
}

/// Rotation snap increment under Shift: 15 degrees.
pub const ROTATE_SNAP_RAD: f32 = core::f32::consts::PI / 12.0;

/// Transform flavors.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u32)]
pub enum TransformMode {
    /// Translate the target set.
    Move = 0,
    /// Drag one vertex of one entity.
    VertexDrag = 1,
    /// Drag one edge (axis-constrained resize).
    EdgeDrag = 2,
    /// Resize from a corner handle against the opposite corner.
    Resize = 3,
    /// Rotate about the selection pivot.
    Rotate = 4,
}

impl TransformMode {
    /// Decodes a wire tag.
    #[must_use]
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(Self::Move),
            1 => Some(Self::VertexDrag),
            2 => Some(Self::EdgeDrag),
            3 => Some(Self::Resize),
            4 => Some(Self::Rotate),
            _ => None,
        }
    }
}

/// Entity kinds a draft session can create.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u32)]
pub enum DraftKind {
    /// Rectangle from corner to corner.
    Rect = 0,
    /// Line from point to point.
    Line = 1,
    /// Polyline, one vertex per appended point.
    Polyline = 2,
    /// Ellipse spanned by the drag box.
    Circle = 3,
    /// Regular polygon around the start point.
    Polygon = 4,
    /// Arrow from point to point.
    Arrow = 5,
}

impl DraftKind {
    /// Decodes a wire tag.
    #[must_use]
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(Self::Rect),
            1 => Some(Self::Line),
            2 => Some(Self::Polyline),
            3 => Some(Self::Circle),
            4 => Some(Self::Polygon),
            5 => Some(Self::Arrow),
            _ => None,
        }
    }
}

/// What the session is doing.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionKind {
    /// Transforming existing entities.
    Transform(TransformMode),
    /// Drafting a new entity.
    Draft(DraftKind),
}

/// The single transient session.
#[derive(Debug, Clone)]
pub struct Session {
    /// What is being done.
    pub kind: SessionKind,
    /// Target ids, in the order supplied at begin.
    pub targets: Vec<EntityId>,
    /// Captured starting value per target.
    pub captured: Vec<(EntityId, EntityState)>,
    /// Resize anchor or rotate pivot.
    pub anchor: Vec2,
    /// Combined AABB of the captured targets.
    pub base_aabb: Option<Aabb>,
    /// Handle ordinal for Resize/EdgeDrag.
    pub handle_index: u32,
    /// Vertex ordinal for VertexDrag.
    pub vertex_index: u32,
    /// Specific entity a vertex/edge drag addresses.
    pub specific_id: EntityId,
    /// Screen-space start point in pixels.
    pub start_screen: Vec2,
    /// World-space start point.
    pub start_world: Vec2,
    /// Most recent world point seen by update.
    pub last_world: Vec2,
    /// Modifier mask at the latest update.
    pub modifiers: u32,
    /// View scale captured at begin.
    pub view_scale: f32,
    /// Canvas size in pixels captured at begin.
    pub canvas: Vec2,
    /// Draft entity id, allocated at begin for preview.
    pub draft_id: Option<EntityId>,
    /// Accumulated draft polyline points.
    pub draft_points: Vec<Vec2>,
}

/// Commit delta op codes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u32)]
pub enum CommitOp {
    /// Payload `(dx, dy, 0, 0)`.
    Move = 1,
    /// Payload `(vertex_index, x, y, 0)`.
    VertexSet = 2,
    /// Payload `(x, y, w, h)`.
    Resize = 3,
    /// Payload `(angle_rad, 0, 0, 0)`.
    Rotate = 4,
}

/// Parallel-array commit result read back over the boundary.
#[derive(Debug, Clone, Default)]
pub struct CommitResult {
    ids: Vec<u32>,
    op_codes: Vec<u32>,
    payloads: Vec<f32>,
}

impl CommitResult {
    /// Appends one delta.
    pub fn push(&mut self, id: EntityId, op: CommitOp, payload: [f32; 4]) {
        self.ids.push(id.0);
        self.op_codes.push(op as u32);
        self.payloads.extend_from_slice(&payload);
    }

    /// Number of recorded deltas.
    #[must_use]
    pub fn count(&self) -> usize {
        self.ids.len()
    }

    /// Drops everything.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.op_codes.clear();
        self.payloads.clear();
    }

    /// Id array.
    #[must_use]
    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    /// Op-code array, parallel to ids.
    #[must_use]
    pub fn op_codes(&self) -> &[u32] {
        &self.op_codes
    }

    /// Payload array, four floats per delta.
    #[must_use]
    pub fn payloads(&self) -> &[f32] {
        &self.payloads
    }
}

/// Snaps an angle to the nearest increment.
#[must_use]
pub fn snap_angle(angle: f32, increment: f32) -> f32 {
    libm::roundf(angle / increment) * increment
}

/// Translates a captured state by `delta`. Conduits and anchored nodes are
/// untouched: their geometry is resolved, not stored.
#[must_use]
pub fn translate_state(state: &EntityState, delta: Vec2) -> EntityState {
    match state {
        EntityState::Rect(v) => {
            let mut v = *v;
            v.pos = v.pos.add(delta);
            EntityState::Rect(v)
        }
        EntityState::Line(v) => {
            let mut v = *v;
            v.a = v.a.add(delta);
            v.b = v.b.add(delta);
            EntityState::Line(v)
        }
        EntityState::Polyline {
            points,
            fill,
            stroke,
        } => EntityState::Polyline {
            points: points.iter().map(|p| p.add(delta)).collect(),
            fill: *fill,
            stroke: *stroke,
        },
        EntityState::Circle(v) => {
            let mut v = *v;
            v.center = v.center.add(delta);
            EntityState::Circle(v)
        }
        EntityState::Polygon(v) => {
            let mut v = *v;
            v.center = v.center.add(delta);
            EntityState::Polygon(v)
        }
        EntityState::Arrow(v) => {
            let mut v = *v;
            v.a = v.a.add(delta);
            v.b = v.b.add(delta);
            EntityState::Arrow(v)
        }
        EntityState::Symbol(v) => {
            let mut v = *v;
            v.pos = v.pos.add(delta);
            EntityState::Symbol(v)
        }
        EntityState::Node(v) => {
            let mut v = *v;
            if let NodeAnchor::Free(pos) = v.anchor {
                v.anchor = NodeAnchor::Free(pos.add(delta));
            }
            EntityState::Node(v)
        }
        EntityState::Conduit(v) => EntityState::Conduit(*v),
        EntityState::Text(v) => {
            let mut v = v.clone();
            v.pos = v.pos.add(delta);
            EntityState::Text(v)
        }
    }
}

/// Rotates a captured state by `angle` about `pivot`.
#[must_use]
pub fn rotate_state(state: &EntityState, pivot: Vec2, angle: f32) -> EntityState {
    let rot = Rot2::from_angle(angle);
    let spin = |p: Vec2| rot.apply_around(p, pivot);
    match state {
        EntityState::Rect(v) => {
            let mut v = *v;
            v.pos = spin(v.pos);
            v.rotation += angle;
            EntityState::Rect(v)
        }
        EntityState::Line(v) => {
            let mut v = *v;
            v.a = spin(v.a);
            v.b = spin(v.b);
            EntityState::Line(v)
        }
        EntityState::Polyline {
            points,
            fill,
            stroke,
        } => EntityState::Polyline {
            points: points.iter().map(|p| spin(*p)).collect(),
            fill: *fill,
            stroke: *stroke,
        },
        EntityState::Circle(v) => {
            let mut v = *v;
            v.center = spin(v.center);
            v.rotation += angle;
            EntityState::Circle(v)
        }
        EntityState::Polygon(v) => {
            let mut v = *v;
            v.center = spin(v.center);
            v.rotation += angle;
            EntityState::Polygon(v)
        }
        EntityState::Arrow(v) => {
            let mut v = *v;
            v.a = spin(v.a);
            v.b = spin(v.b);
            EntityState::Arrow(v)
        }
        EntityState::Symbol(v) => {
            let mut v = *v;
            v.pos = spin(v.pos);
            v.rotation += angle;
            EntityState::Symbol(v)
        }
        EntityState::Node(v) => {
            let mut v = *v;
            if let NodeAnchor::Free(pos) = v.anchor {
                v.anchor = NodeAnchor::Free(spin(pos));
            }
            EntityState::Node(v)
        }
        EntityState::Conduit(v) => EntityState::Conduit(*v),
        EntityState::Text(v) => {
            let mut v = v.clone();
            v.pos = spin(v.pos);
            v.rotation += angle;
            EntityState::Text(v)
        }
    }
}

/// Maps a captured state through the affine `p' = anchor + (p − anchor) · factors`.
#[must_use]
pub fn scale_state(state: &EntityState, anchor: Vec2, factors: Vec2) -> EntityState {
    let map = |p: Vec2| anchor.add(p.sub(anchor).mul(factors));
    match state {
        EntityState::Rect(v) => {
            let mut v = *v;
            // Map both defining corners and rebuild, so negative factors
            // flip cleanly instead of producing negative sizes.
            let p0 = map(v.pos);
            let p1 = map(v.pos.add(v.size));
            v.pos = Vec2::new(p0.x.min(p1.x), p0.y.min(p1.y));
            v.size = Vec2::new((p1.x - p0.x).abs(), (p1.y - p0.y).abs());
            EntityState::Rect(v)
        }
        EntityState::Line(v) => {
            let mut v = *v;
            v.a = map(v.a);
            v.b = map(v.b);
            EntityState::Line(v)
        }
        EntityState::Polyline {
            points,
            fill,
            stroke,
        } => EntityState::Polyline {
            points: points.iter().map(|p| map(*p)).collect(),
            fill: *fill,
            stroke: *stroke,
        },
        EntityState::Circle(v) => {
            let mut v = *v;
            v.center = map(v.center);
            v.radius = v.radius.mul(Vec2::new(factors.x.abs(), factors.y.abs()));
            EntityState::Circle(v)
        }
        EntityState::Polygon(v) => {
            let mut v = *v;
            v.center = map(v.center);
            v.radius = v.radius.mul(Vec2::new(factors.x.abs(), factors.y.abs()));
            EntityState::Polygon(v)
        }
        EntityState::Arrow(v) => {
            let mut v = *v;
            v.a = map(v.a);
            v.b = map(v.b);
            EntityState::Arrow(v)
        }
        EntityState::Symbol(v) => {
            let mut v = *v;
            v.pos = map(v.pos);
            v.scale *= (factors.x.abs() + factors.y.abs()) * 0.5;
            EntityState::Symbol(v)
        }
        EntityState::Node(v) => {
            let mut v = *v;
            if let NodeAnchor::Free(pos) = v.anchor {
                v.anchor = NodeAnchor::Free(map(pos));
            }
            EntityState::Node(v)
        }
        EntityState::Conduit(v) => EntityState::Conduit(*v),
        EntityState::Text(v) => {
            let mut v = v.clone();
            v.pos = map(v.pos);
            EntityState::Text(v)
        }
    }
}

/// Computes the resize anchor and per-axis factors for a drag of `handle`
/// (0..=3 corners, 4..=7 sides) to `world`, against the captured AABB.
#[must_use]
pub fn resize_factors(
    base: &Aabb,
    handle: u32,
    world: Vec2,
    preserve_aspect: bool,
) -> (Vec2, Vec2) {
    if handle < 4 {
        let corners = corner_handles(base);
        let anchor = corners[opposite_corner(handle) as usize];
        let start = corners[handle as usize];
        let denom = start.sub(anchor);
        let mut fx = if denom.x.abs() <= f32::EPSILON {
            1.0
        } else {
            (world.x - anchor.x) / denom.x
        };
        let mut fy = if denom.y.abs() <= f32::EPSILON {
            1.0
        } else {
            (world.y - anchor.y) / denom.y
        };
        if preserve_aspect {
            let dominant = fx.abs().max(fy.abs());
            fx = dominant.copysign(fx);
            fy = dominant.copysign(fy);
        }
        (anchor, Vec2::new(fx, fy))
    } else {
        let side = (handle - 4).min(3);
        let sides = side_handles(base);
        let anchor = sides[((side + 2) % 4) as usize];
        let start = sides[side as usize];
        match side {
            // S or N: vertical axis.
            0 | 2 => {
                let denom = start.y - anchor.y;
                let fy = if denom.abs() <= f32::EPSILON {
                    1.0
                } else {
                    (world.y - anchor.y) / denom
                };
                (anchor, Vec2::new(1.0, fy))
            }
            // E or W: horizontal axis.
            _ => {
                let denom = start.x - anchor.x;
                let fx = if denom.abs() <= f32::EPSILON {
                    1.0
                } else {
                    (world.x - anchor.x) / denom
                };
                (anchor, Vec2::new(fx, 1.0))
            }
        }
    }
}

/// Rotation delta (radians) implied by dragging from `start` to `world`
/// about `pivot`, with optional 15° snapping.
#[must_use]
pub fn rotate_delta(pivot: Vec2, start: Vec2, world: Vec2, snap: bool) -> f32 {
    let from = start.sub(pivot);
    let to = world.sub(pivot);
    if from.length_squared() <= f32::EPSILON || to.length_squared() <= f32::EPSILON {
        return 0.0;
    }
    let mut angle = atan2(to.y, to.x) - atan2(from.y, from.x);
    if snap {
        angle = snap_angle(angle, ROTATE_SNAP_RAD);
    }
    angle
}

/// Fresh draft geometry for a drag from `start` to `current`.
#[must_use]
pub fn draft_state(kind: DraftKind, start: Vec2, current: Vec2) -> EntityState {
    let stroke = Stroke::default();
    match kind {
        DraftKind::Rect => {
            let min = Vec2::new(start.x.min(current.x), start.y.min(current.y));
            let max = Vec2::new(start.x.max(current.x), start.y.max(current.y));
            EntityState::Rect(vellum_model::Rect {
                pos: min,
                size: max.sub(min),
                rotation: 0.0,
                fill: [1.0, 1.0, 1.0, 0.0],
                stroke,
            })
        }
        DraftKind::Line => EntityState::Line(vellum_model::Line {
            a: start,
            b: current,
            stroke,
        }),
        DraftKind::Polyline => EntityState::Polyline {
            points: vec![start, current],
            fill: [0.0; 4],
            stroke,
        },
        DraftKind::Circle => {
            let center = start.midpoint(current);
            EntityState::Circle(vellum_model::Circle {
                center,
                radius: Vec2::new(
                    (current.x - start.x).abs() * 0.5,
                    (current.y - start.y).abs() * 0.5,
                ),
                rotation: 0.0,
                scale: 1.0,
                fill: [1.0, 1.0, 1.0, 0.0],
                stroke,
            })
        }
        DraftKind::Polygon => EntityState::Polygon(vellum_model::Polygon {
            center: start,
            radius: {
                let r = current.sub(start).length();
                Vec2::new(r, r)
            },
            rotation: 0.0,
            scale: 1.0,
            sides: 6,
            fill: [1.0, 1.0, 1.0, 0.0],
            stroke,
        }),
        DraftKind::Arrow => EntityState::Arrow(vellum_model::Arrow {
            a: start,
            b: current,
            head_size: 4.0,
            stroke,
        }),
    }
}
