// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use crate::Vec2;

/// Precomputed 2-D rotation.
///
/// Trig goes through `libm` so the same angle yields the same bit pattern on
/// every target. Rotation composes with an optional pivot so callers can spin
/// shapes about their own anchor (rect: top-left, circle/polygon: center).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rot2 {
    sin: f32,
    cos: f32,
}

impl Rot2 {
    /// Identity rotation.
    pub const IDENTITY: Self = Self { sin: 0.0, cos: 1.0 };

    /// Builds a rotation from an angle in radians.
    #[must_use]
    pub fn from_angle(radians: f32) -> Self {
        Self {
            sin: libm::sinf(radians),
            cos: libm::cosf(radians),
        }
    }

    /// Sine of the rotation angle.
    #[must_use]
    pub fn sin(self) -> f32 {
        self.sin
    }

    /// Cosine of the rotation angle.
    #[must_use]
    pub fn cos(self) -> f32 {
        self.cos
    }

    /// Rotates `v` about the origin.
    #[must_use]
    pub fn apply(self, v: Vec2) -> Vec2 {
        Vec2::new(v.x * self.cos - v.y * self.sin, v.x * self.sin + v.y * self.cos)
    }

    /// Rotates `p` about `pivot`.
    #[must_use]
    pub fn apply_around(self, p: Vec2, pivot: Vec2) -> Vec2 {
        self.apply(p.sub(pivot)).add(pivot)
    }

    /// Inverse rotation.
    #[must_use]
    pub fn inverse(self) -> Self {
        Self {
            sin: -self.sin,
            cos: self.cos,
        }
    }
}

/// Two-argument arctangent through `libm`.
#[must_use]
pub fn atan2(y: f32, x: f32) -> f32 {
    libm::atan2f(y, x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_turn_maps_x_to_y() {
        let r = Rot2::from_angle(core::f32::consts::FRAC_PI_2);
        let v = r.apply(Vec2::new(1.0, 0.0));
        assert!((v.x).abs() < 1e-6);
        assert!((v.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rotate_around_pivot_fixes_pivot() {
        let r = Rot2::from_angle(1.234);
        let pivot = Vec2::new(3.0, -2.0);
        assert_eq!(r.apply_around(pivot, pivot), pivot);
    }

    #[test]
    fn inverse_undoes_rotation() {
        let r = Rot2::from_angle(0.7);
        let v = Vec2::new(2.0, 5.0);
        let back = r.inverse().apply(r.apply(v));
        assert!((back.x - v.x).abs() < 1e-5);
        assert!((back.y - v.y).abs() < 1e-5);
    }
}
