// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! vellum-render: builds GPU-ready vertex arrays from the document model.
//!
//! Two arrays come out of a build, both with the same 7-float stride
//! (x, y, z, r, g, b, a): triangles for filled regions and an unindexed
//! line list for strokes. The z channel carries a stable depth derived from
//! draw order. Builds are deterministic: the same (world, view scale)
//! produces byte-identical output.
#![forbid(unsafe_code)]

mod builder;
mod overlay;
mod vertex;

pub use builder::{build_world, RenderOutput, CIRCLE_SEGMENTS};
pub use overlay::{
    build_selection_handles, build_selection_outline, build_snap_overlay, HANDLE_SIZE_PX,
    ROTATE_HANDLE_MARGIN_PX,
};
pub use vertex::{BufferMeta, Vertex, VertexBuffer, FLOATS_PER_VERTEX};
