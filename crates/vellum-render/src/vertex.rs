// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use bytemuck::{Pod, Zeroable};
use vellum_geom::Vec2;
use vellum_model::ColorRgba;

/// Floats per vertex: position (x, y, z) followed by color (r, g, b, a).
pub const FLOATS_PER_VERTEX: usize = 7;

/// One vertex of either output array.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// World position plus draw-order depth.
    pub pos: [f32; 3],
    /// Straight-alpha color.
    pub color: [f32; 4],
}

impl Vertex {
    /// Builds a vertex from a 2-D point, depth, and color.
    #[must_use]
    pub fn new(p: Vec2, z: f32, color: ColorRgba) -> Self {
        Self {
            pos: [p.x, p.y, z],
            color,
        }
    }
}

/// Growable vertex array with a float view for the boundary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexBuffer {
    verts: Vec<Vertex>,
}

impl VertexBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.verts.len()
    }

    /// Current capacity in vertices.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.verts.capacity()
    }

    /// Whether the buffer holds no vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.verts.is_empty()
    }

    /// Drops all vertices, keeping capacity.
    pub fn clear(&mut self) {
        self.verts.clear();
    }

    /// Appends one vertex.
    pub fn push(&mut self, v: Vertex) {
        self.verts.push(v);
    }

    /// Appends a triangle.
    pub fn push_triangle(&mut self, a: Vertex, b: Vertex, c: Vertex) {
        self.verts.push(a);
        self.verts.push(b);
        self.verts.push(c);
    }

    /// Appends one line segment (two vertices).
    pub fn push_segment(&mut self, a: Vec2, b: Vec2, z: f32, color: ColorRgba) {
        self.verts.push(Vertex::new(a, z, color));
        self.verts.push(Vertex::new(b, z, color));
    }

    /// Appends an axis-aligned quad as two triangles.
    pub fn push_quad(&mut self, min: Vec2, max: Vec2, z: f32, color: ColorRgba) {
        let bl = Vertex::new(min, z, color);
        let br = Vertex::new(Vec2::new(max.x, min.y), z, color);
        let tr = Vertex::new(max, z, color);
        let tl = Vertex::new(Vec2::new(min.x, max.y), z, color);
        self.push_triangle(bl, br, tr);
        self.push_triangle(bl, tr, tl);
    }

    /// The vertices as a flat f32 slice, 7 floats per vertex.
    #[must_use]
    pub fn as_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.verts)
    }

    /// The vertices themselves.
    #[must_use]
    pub fn vertices(&self) -> &[Vertex] {
        &self.verts
    }
}

/// Descriptor handed to boundary consumers for one derived buffer.
///
/// The pointer field is added at the wasm layer; inside the engine the meta
/// travels alongside a borrowed float slice. Consumers must discard a read
/// when `generation` no longer matches the engine's.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct BufferMeta {
    /// Generation the buffer was built at.
    pub generation: u32,
    /// Number of vertices.
    pub vertex_count: u32,
    /// Allocated capacity in vertices.
    pub capacity_vertices: u32,
    /// Number of readable floats (`vertex_count * 7`).
    pub float_count: u32,
}

impl BufferMeta {
    /// Builds a meta record for `buffer` at `generation`.
    #[must_use]
    pub fn for_buffer(buffer: &VertexBuffer, generation: u32) -> Self {
        Self {
            generation,
            vertex_count: buffer.vertex_count() as u32,
            capacity_vertices: buffer.capacity() as u32,
            float_count: (buffer.vertex_count() * FLOATS_PER_VERTEX) as u32,
        }
    }
}
