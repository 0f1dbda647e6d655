// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Canonical handle layout shared by the picker and the overlay builder.
//!
//! Corner handles run counter-clockwise from the bottom-left of the AABB:
//! BL = 0, BR = 1, TR = 2, TL = 3. Side handles follow S = 0, E = 1, N = 2,
//! W = 3. Rotate handles sit diagonally outside each corner by a margin.
//! The resize anchor is always the diagonally opposite corner (0↔2, 1↔3).

use crate::{Aabb, Vec2};

/// Corner handle centers, BL/BR/TR/TL.
#[must_use]
pub fn corner_handles(bb: &Aabb) -> [Vec2; 4] {
    let min = bb.min();
    let max = bb.max();
    [
        min,
        Vec2::new(max.x, min.y),
        max,
        Vec2::new(min.x, max.y),
    ]
}

/// Side handle centers, S/E/N/W.
#[must_use]
pub fn side_handles(bb: &Aabb) -> [Vec2; 4] {
    let min = bb.min();
    let max = bb.max();
    let c = bb.center();
    [
        Vec2::new(c.x, min.y),
        Vec2::new(max.x, c.y),
        Vec2::new(c.x, max.y),
        Vec2::new(min.x, c.y),
    ]
}

/// Rotate handle centers: each corner pushed diagonally outward by
/// `margin` world units.
#[must_use]
pub fn rotate_handles(bb: &Aabb, margin: f32) -> [Vec2; 4] {
    let center = bb.center();
    corner_handles(bb).map(|corner| {
        let dir = corner.sub(center).normalize();
        if dir == Vec2::ZERO {
            corner
        } else {
            corner.add(dir.scale(margin))
        }
    })
}

/// The resize anchor for a dragged corner: the diagonally opposite one.
#[must_use]
pub fn opposite_corner(handle: u32) -> u32 {
    (handle + 2) % 4
}
