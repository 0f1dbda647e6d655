// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use crate::Vec2;

/// Axis-aligned bounding box in world coordinates.
///
/// Invariants:
/// - `min` components are less than or equal to `max` components.
/// - Values are `f32` world units.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    min: Vec2,
    max: Vec2,
}

impl Aabb {
    /// Constructs an AABB from two opposite corners, in any order.
    #[must_use]
    pub fn from_corners(a: Vec2, b: Vec2) -> Self {
        Self {
            min: Vec2::new(a.x.min(b.x), a.y.min(b.y)),
            max: Vec2::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Builds an AABB centered at `center` with half-extents `hx, hy`.
    #[must_use]
    pub fn from_center_half_extents(center: Vec2, hx: f32, hy: f32) -> Self {
        let he = Vec2::new(hx.abs(), hy.abs());
        Self {
            min: center.sub(he),
            max: center.add(he),
        }
    }

    /// Builds the minimal AABB that contains all `points`; `None` when empty.
    #[must_use]
    pub fn from_points(points: &[Vec2]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut min = *first;
        let mut max = *first;
        for p in rest {
            min = Vec2::new(min.x.min(p.x), min.y.min(p.y));
            max = Vec2::new(max.x.max(p.x), max.y.max(p.y));
        }
        Some(Self { min, max })
    }

    /// Returns the minimum corner.
    #[must_use]
    pub fn min(&self) -> Vec2 {
        self.min
    }

    /// Returns the maximum corner.
    #[must_use]
    pub fn max(&self) -> Vec2 {
        self.max
    }

    /// Box center.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.min.midpoint(self.max)
    }

    /// Box width.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    /// Box height.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Returns `true` if this AABB overlaps another (inclusive on edges).
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        // Inclusive so touching edges count as overlap for broad-phase queries.
        !(self.max.x < other.min.x
            || self.min.x > other.max.x
            || self.max.y < other.min.y
            || self.min.y > other.max.y)
    }

    /// Returns `true` if `other` lies fully inside this box (inclusive).
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
    }

    /// Returns `true` if the point lies inside the box (inclusive).
    #[must_use]
    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Returns the union of two AABBs.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: Vec2::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Vec2::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// Inflates the box by a uniform margin `m` in all directions.
    #[must_use]
    pub fn inflate(&self, m: f32) -> Self {
        let delta = Vec2::new(m, m);
        Self {
            min: self.min.sub(delta),
            max: self.max.add(delta),
        }
    }

    /// Clamps a point to the box.
    #[must_use]
    pub fn clamp_point(&self, p: Vec2) -> Vec2 {
        Vec2::new(p.x.clamp(self.min.x, self.max.x), p.y.clamp(self.min.y, self.max.y))
    }

    /// Squared distance from the box to a point (zero when inside).
    #[must_use]
    pub fn distance_squared_to_point(&self, p: Vec2) -> f32 {
        p.distance_squared(self.clamp_point(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_normalize_order() {
        let bb = Aabb::from_corners(Vec2::new(5.0, -1.0), Vec2::new(-2.0, 3.0));
        assert_eq!(bb.min(), Vec2::new(-2.0, -1.0));
        assert_eq!(bb.max(), Vec2::new(5.0, 3.0));
    }

    #[test]
    fn touching_edges_overlap() {
        let a = Aabb::from_corners(Vec2::ZERO, Vec2::new(1.0, 1.0));
        let b = Aabb::from_corners(Vec2::new(1.0, 0.0), Vec2::new(2.0, 1.0));
        assert!(a.overlaps(&b));
    }

    #[test]
    fn containment_is_inclusive() {
        let outer = Aabb::from_corners(Vec2::ZERO, Vec2::new(10.0, 10.0));
        let inner = Aabb::from_corners(Vec2::ZERO, Vec2::new(10.0, 5.0));
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
    }

    #[test]
    fn distance_is_zero_inside() {
        let bb = Aabb::from_corners(Vec2::ZERO, Vec2::new(4.0, 4.0));
        assert_eq!(bb.distance_squared_to_point(Vec2::new(2.0, 2.0)), 0.0);
        assert_eq!(bb.distance_squared_to_point(Vec2::new(7.0, 2.0)), 9.0);
    }
}
