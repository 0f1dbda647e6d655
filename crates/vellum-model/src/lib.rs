// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! vellum-model: the document model for the Vellum engine core.
//!
//! Typed tables of drawable entities, a stable id → (kind, index) index, an
//! explicit draw order, and the shared polyline point pool. These types are
//! pure domain objects with no serialization logic; the wire formats live in
//! vellum-wire.
#![forbid(unsafe_code)]

mod id;
mod shapes;
mod style;
mod world;

pub use id::EntityId;
pub use shapes::{
    Arrow, Circle, Conduit, Line, NodeAnchor, NodePoint, Polygon, Polyline, Rect, Symbol, Text,
};
pub use style::{
    pack_rgba, unpack_rgba, ColorRgba, Stroke, StyleFlags, StyleRun, TextAlign, TextBoxMode,
};
pub use world::{EntityKind, EntityRef, EntityTransform, World, DRAWABLE_KINDS};
