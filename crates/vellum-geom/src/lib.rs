// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! vellum-geom: 2-D geometry primitives for the Vellum engine core.
//!
//! Everything here is deterministic float32: trig goes through `libm` so the
//! same inputs produce the same bit patterns on every target, and query
//! results are returned in canonical sorted order.
#![forbid(unsafe_code)]

mod aabb;
mod grid;
mod rot;
mod vec2;

/// Canonical resize/rotate handle layout.
pub mod handles;

pub use aabb::Aabb;
pub use grid::{BroadPhase, LinearPhase, LooseGrid};
pub use rot::{atan2, Rot2};
pub use vec2::{point_segment_distance_squared, Vec2};
