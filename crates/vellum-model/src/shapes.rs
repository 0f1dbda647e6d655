// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use crate::{ColorRgba, EntityId, Stroke, StyleRun, TextAlign, TextBoxMode};
use vellum_geom::{Aabb, Rot2, Vec2};

/// Axis-aligned rectangle with optional rotation about its anchor corner.
///
/// `pos` is the anchor corner and the rotation pivot; the body extends to
/// `pos + size` before rotation. Corner ordinals run counter-clockwise from
/// the anchor: 0 = `pos`, 1 = `pos + (w, 0)`, 2 = `pos + (w, h)`,
/// 3 = `pos + (0, h)`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rect {
    /// Anchor corner and rotation pivot.
    pub pos: Vec2,
    /// Width and height in world units.
    pub size: Vec2,
    /// Rotation in radians about `pos`.
    pub rotation: f32,
    /// Fill color.
    pub fill: ColorRgba,
    /// Stroke styling.
    pub stroke: Stroke,
}

impl Rect {
    /// World-space corners after rotation, counter-clockwise from the anchor.
    #[must_use]
    pub fn corners(&self) -> [Vec2; 4] {
        let local = [
            self.pos,
            Vec2::new(self.pos.x + self.size.x, self.pos.y),
            Vec2::new(self.pos.x + self.size.x, self.pos.y + self.size.y),
            Vec2::new(self.pos.x, self.pos.y + self.size.y),
        ];
        if self.rotation == 0.0 {
            return local;
        }
        let rot = Rot2::from_angle(self.rotation);
        local.map(|c| rot.apply_around(c, self.pos))
    }

    /// Bounding box of the rotated body.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        // Four corners always exist, so from_points cannot fail.
        Aabb::from_points(&self.corners()).unwrap_or_else(|| Aabb::from_corners(self.pos, self.pos))
    }
}

/// Straight segment between two endpoints.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Line {
    /// First endpoint.
    pub a: Vec2,
    /// Second endpoint.
    pub b: Vec2,
    /// Stroke styling.
    pub stroke: Stroke,
}

impl Line {
    /// Bounding box of the segment.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        Aabb::from_corners(self.a, self.b)
    }
}

/// Polyline referencing a range of the world's shared point pool.
///
/// The range is `offset..offset + count` and is rewritten when the pool is
/// compacted after a command batch. Fill applies to the implied closed
/// region when the fill alpha is non-zero.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Polyline {
    /// Start index into the point pool.
    pub offset: u32,
    /// Number of points (always ≥ 2 for a live polyline).
    pub count: u32,
    /// Fill color; alpha 0 disables the fill.
    pub fill: ColorRgba,
    /// Stroke styling.
    pub stroke: Stroke,
}

/// Ellipse described by center and per-axis radii.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Circle {
    /// Center point and rotation pivot.
    pub center: Vec2,
    /// X/Y radii before scale.
    pub radius: Vec2,
    /// Rotation in radians about the center.
    pub rotation: f32,
    /// Uniform scale factor.
    pub scale: f32,
    /// Fill color.
    pub fill: ColorRgba,
    /// Stroke styling.
    pub stroke: Stroke,
}

impl Circle {
    /// Effective radii after scale.
    #[must_use]
    pub fn scaled_radius(&self) -> Vec2 {
        self.radius.scale(self.scale)
    }

    /// Exact bounding box of the rotated ellipse.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        let r = self.scaled_radius();
        let rot = Rot2::from_angle(self.rotation);
        let (s, c) = (rot.sin(), rot.cos());
        let ex = libm::sqrtf((r.x * c) * (r.x * c) + (r.y * s) * (r.y * s));
        let ey = libm::sqrtf((r.x * s) * (r.x * s) + (r.y * c) * (r.y * c));
        Aabb::from_center_half_extents(self.center, ex, ey)
    }
}

/// Regular polygon described by center, per-axis radii, and side count.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Polygon {
    /// Center point and rotation pivot.
    pub center: Vec2,
    /// X/Y radii before scale.
    pub radius: Vec2,
    /// Rotation in radians about the center.
    pub rotation: f32,
    /// Uniform scale factor.
    pub scale: f32,
    /// Side count, at least 3.
    pub sides: u32,
    /// Fill color.
    pub fill: ColorRgba,
    /// Stroke styling.
    pub stroke: Stroke,
}

impl Polygon {
    /// World-space vertices, first vertex at angle 0 plus rotation.
    #[must_use]
    pub fn vertices(&self) -> Vec<Vec2> {
        let n = self.sides.max(3);
        let r = self.radius.scale(self.scale);
        let step = core::f32::consts::TAU / n as f32;
        (0..n)
            .map(|i| {
                let angle = self.rotation + step * i as f32;
                Vec2::new(
                    self.center.x + r.x * libm::cosf(angle),
                    self.center.y + r.y * libm::sinf(angle),
                )
            })
            .collect()
    }

    /// Bounding box of the vertices.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        Aabb::from_points(&self.vertices())
            .unwrap_or_else(|| Aabb::from_corners(self.center, self.center))
    }
}

/// Arrow: a stroked segment with a filled head at the `b` endpoint.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Arrow {
    /// Tail endpoint.
    pub a: Vec2,
    /// Head endpoint.
    pub b: Vec2,
    /// Head size in world units.
    pub head_size: f32,
    /// Stroke styling.
    pub stroke: Stroke,
}

impl Arrow {
    /// Bounding box of the segment inflated by the head size.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        Aabb::from_corners(self.a, self.b).inflate(self.head_size)
    }
}

/// Reference to an immutable symbol-library entry placed in the world.
///
/// The library itself is owned by the hosting collaborator; the engine knows
/// only the key, the placement transform, and one connection anchor in local
/// UV space for anchored nodes.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Symbol {
    /// Library entry key.
    pub library_key: u32,
    /// Placement origin (also the rotation/scale pivot).
    pub pos: Vec2,
    /// Local size of the library cell in world units.
    pub size: Vec2,
    /// Rotation in radians about `pos`.
    pub rotation: f32,
    /// Uniform scale factor.
    pub scale: f32,
    /// Connection anchor in local UV space (0..1 across `size`).
    pub anchor_uv: Vec2,
}

impl Symbol {
    /// World position of the connection anchor: origin + rotation·scale of
    /// the local anchor point.
    #[must_use]
    pub fn anchor_world(&self) -> Vec2 {
        let local = self.anchor_uv.mul(self.size).scale(self.scale);
        self.pos.add(Rot2::from_angle(self.rotation).apply(local))
    }

    /// Bounding box of the placed cell.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        let rot = Rot2::from_angle(self.rotation);
        let corners = [
            Vec2::ZERO,
            Vec2::new(self.size.x, 0.0),
            self.size,
            Vec2::new(0.0, self.size.y),
        ]
        .map(|c| self.pos.add(rot.apply(c.scale(self.scale))));
        Aabb::from_points(&corners).unwrap_or_else(|| Aabb::from_corners(self.pos, self.pos))
    }
}

/// How a node derives its world position.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum NodeAnchor {
    /// Free node with an explicit position.
    Free(Vec2),
    /// Anchored to a symbol's connection anchor; resolved on lookup.
    Anchored(EntityId),
}

/// Connection node. Not drawable; contributes only through resolved
/// positions read by conduits.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NodePoint {
    /// Position source.
    pub anchor: NodeAnchor,
}

/// Conduit between two nodes. Endpoints are resolved, never stored.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Conduit {
    /// Source node id.
    pub from: EntityId,
    /// Target node id.
    pub to: EntityId,
    /// Stroke styling.
    pub stroke: Stroke,
}

/// Rich text block.
///
/// `content` is UTF-8; `runs` cover it completely without overlap. Caret and
/// selection are logical (code-point) indices and are runtime-only, as is
/// `layout_size`, which the engine refreshes from the text subsystem after
/// edits. None of the runtime fields are persisted in snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    /// Anchor position (top-left of the layout box).
    pub pos: Vec2,
    /// Rotation in radians about `pos`.
    pub rotation: f32,
    /// Box sizing mode.
    pub box_mode: TextBoxMode,
    /// Wrap width for `FixedWidth` mode.
    pub constraint_width: f32,
    /// Horizontal alignment.
    pub align: TextAlign,
    /// UTF-8 content.
    pub content: String,
    /// Ordered, covering style runs over byte offsets.
    pub runs: Vec<StyleRun>,
    /// Caret position in logical indices (runtime-only).
    pub caret: u32,
    /// Selection range in logical indices, start ≤ end (runtime-only).
    pub selection: (u32, u32),
    /// Last laid-out logical size (runtime-only, derived).
    pub layout_size: Vec2,
}

impl Text {
    /// Bounding box of the (unrotated layout box, then rotated) block.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        let size = if self.layout_size.length_squared() > 0.0 {
            self.layout_size
        } else {
            Vec2::new(self.constraint_width.max(1.0), 1.0)
        };
        let rot = Rot2::from_angle(self.rotation);
        let corners = [
            Vec2::ZERO,
            Vec2::new(size.x, 0.0),
            size,
            Vec2::new(0.0, size.y),
        ]
        .map(|c| self.pos.add(rot.apply(c)));
        Aabb::from_points(&corners).unwrap_or_else(|| Aabb::from_corners(self.pos, self.pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StyleFlags;

    #[test]
    fn rect_corners_counter_clockwise_from_anchor() {
        let r = Rect {
            pos: Vec2::new(1.0, 2.0),
            size: Vec2::new(10.0, 4.0),
            rotation: 0.0,
            fill: [1.0; 4],
            stroke: Stroke::default(),
        };
        let c = r.corners();
        assert_eq!(c[0], Vec2::new(1.0, 2.0));
        assert_eq!(c[1], Vec2::new(11.0, 2.0));
        assert_eq!(c[2], Vec2::new(11.0, 6.0));
        assert_eq!(c[3], Vec2::new(1.0, 6.0));
    }

    #[test]
    fn rect_rotation_fixes_anchor() {
        let r = Rect {
            pos: Vec2::new(3.0, 3.0),
            size: Vec2::new(2.0, 2.0),
            rotation: 1.0,
            fill: [1.0; 4],
            stroke: Stroke::default(),
        };
        assert_eq!(r.corners()[0], r.pos);
    }

    #[test]
    fn symbol_anchor_identity_transform() {
        let s = Symbol {
            library_key: 1,
            pos: Vec2::new(10.0, 10.0),
            size: Vec2::new(4.0, 2.0),
            rotation: 0.0,
            scale: 1.0,
            anchor_uv: Vec2::new(0.5, 1.0),
        };
        assert_eq!(s.anchor_world(), Vec2::new(12.0, 12.0));
    }

    #[test]
    fn polygon_has_requested_vertex_count() {
        let p = Polygon {
            center: Vec2::ZERO,
            radius: Vec2::new(5.0, 5.0),
            rotation: 0.0,
            scale: 1.0,
            sides: 6,
            fill: [1.0; 4],
            stroke: Stroke::default(),
        };
        assert_eq!(p.vertices().len(), 6);
    }

    #[test]
    fn text_default_runs_cover_content() {
        let t = Text {
            pos: Vec2::ZERO,
            rotation: 0.0,
            box_mode: TextBoxMode::AutoWidth,
            constraint_width: 0.0,
            align: TextAlign::Left,
            content: "hi".into(),
            runs: vec![StyleRun {
                start: 0,
                len: 2,
                font: 0,
                size_pt: 12.0,
                color: 0xFF,
                flags: StyleFlags::empty(),
            }],
            caret: 0,
            selection: (0, 0),
            layout_size: Vec2::ZERO,
        };
        assert_eq!(t.runs[0].end() as usize, t.content.len());
    }
}
