// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The world walk: draw order in, vertex arrays out.

use vellum_geom::{Rot2, Vec2};
use vellum_model::{
    unpack_rgba, Arrow, Circle, EntityKind, Polygon, Rect, StyleFlags, Text, World,
};
use vellum_text::{layout_text, FontProvider, GlyphAtlas, GlyphKey};

use crate::vertex::{Vertex, VertexBuffer};

/// Segment count used to tessellate ellipses. Fixed so identical stores
/// tessellate identically.
pub const CIRCLE_SEGMENTS: u32 = 48;

/// Result of one world build.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RenderOutput {
    /// Filled geometry, three vertices per triangle.
    pub triangles: VertexBuffer,
    /// Stroke geometry, two vertices per segment.
    pub lines: VertexBuffer,
    /// Set when a glyph could not be packed into the atlas. The quad is
    /// still emitted as a solid box; the engine reports `AtlasFull`.
    pub atlas_overflow: bool,
}

/// Stable depth for the i-th entry of an n-entry draw order. Later entries
/// get larger z so a greater-depth test draws them on top.
fn depth_for(index: usize, total: usize) -> f32 {
    if total == 0 {
        return 0.0;
    }
    (index as f32 + 1.0) / (total as f32 + 1.0)
}

/// Builds triangle and line arrays for the whole world in draw order.
///
/// `provider` feeds text layout and keeps `atlas` warm: every glyph that
/// lands in the output is resident in the atlas afterwards. Stroke widths
/// are specified in screen pixels; the view scale converts overlay and
/// decoration thicknesses to world units at build time.
pub fn build_world(
    world: &World,
    provider: &dyn FontProvider,
    atlas: &mut GlyphAtlas,
) -> RenderOutput {
    let mut out = RenderOutput::default();
    let order = world.draw_order();
    let total = order.len();
    for (i, id) in order.iter().enumerate() {
        let z = depth_for(i, total);
        let Some(entry) = world.entity_ref(*id) else {
            continue;
        };
        match entry.kind {
            EntityKind::Rect => {
                if let Some(rect) = world.find_rect(*id) {
                    emit_rect(&mut out, rect, z);
                }
            }
            EntityKind::Line => {
                if let Some(line) = world.find_line(*id) {
                    if line.stroke.enabled {
                        out.lines.push_segment(line.a, line.b, z, line.stroke.color);
                    }
                }
            }
            EntityKind::Polyline => {
                if let Some(poly) = world.find_polyline(*id) {
                    emit_polyline(&mut out, world.polyline_points(poly), poly.fill, poly.stroke.enabled, poly.stroke.color, z);
                }
            }
            EntityKind::Circle => {
                if let Some(circle) = world.find_circle(*id) {
                    emit_circle(&mut out, circle, z);
                }
            }
            EntityKind::Polygon => {
                if let Some(polygon) = world.find_polygon(*id) {
                    emit_polygon(&mut out, polygon, z);
                }
            }
            EntityKind::Arrow => {
                if let Some(arrow) = world.find_arrow(*id) {
                    emit_arrow(&mut out, arrow, z);
                }
            }
            EntityKind::Conduit => {
                if let Some(conduit) = world.find_conduit(*id) {
                    // Unresolved endpoints draw nothing.
                    if let Some((a, b)) = world.conduit_endpoints(conduit) {
                        if conduit.stroke.enabled {
                            out.lines.push_segment(a, b, z, conduit.stroke.color);
                        }
                    }
                }
            }
            EntityKind::Text => {
                if let Some(text) = world.find_text(*id) {
                    let overflow = emit_text(&mut out, text, z, provider, atlas, world.view_scale());
                    out.atlas_overflow |= overflow;
                }
            }
            EntityKind::Symbol | EntityKind::Node => {
                // Never in the draw order; symbols rasterize through their
                // library record on the host side.
            }
        }
    }
    out
}

fn emit_rect(out: &mut RenderOutput, rect: &Rect, z: f32) {
    let c = rect.corners();
    if rect.fill[3] > 0.0 {
        out.triangles.push_triangle(
            Vertex::new(c[0], z, rect.fill),
            Vertex::new(c[1], z, rect.fill),
            Vertex::new(c[2], z, rect.fill),
        );
        out.triangles.push_triangle(
            Vertex::new(c[0], z, rect.fill),
            Vertex::new(c[2], z, rect.fill),
            Vertex::new(c[3], z, rect.fill),
        );
    }
    if rect.stroke.enabled {
        for i in 0..4 {
            out.lines
                .push_segment(c[i], c[(i + 1) % 4], z, rect.stroke.color);
        }
    }
}

fn emit_polyline(
    out: &mut RenderOutput,
    points: &[Vec2],
    fill: [f32; 4],
    stroked: bool,
    stroke_color: [f32; 4],
    z: f32,
) {
    if points.len() < 2 {
        return;
    }
    if fill[3] > 0.0 && points.len() >= 3 {
        // Fan from the first point; filled polylines are expected convex.
        for i in 1..points.len() - 1 {
            out.triangles.push_triangle(
                Vertex::new(points[0], z, fill),
                Vertex::new(points[i], z, fill),
                Vertex::new(points[i + 1], z, fill),
            );
        }
    }
    if stroked {
        for pair in points.windows(2) {
            out.lines.push_segment(pair[0], pair[1], z, stroke_color);
        }
    }
}

fn ellipse_point(circle: &Circle, rot: Rot2, k: u32) -> Vec2 {
    let r = circle.scaled_radius();
    let angle = core::f32::consts::TAU * k as f32 / CIRCLE_SEGMENTS as f32;
    let local = Vec2::new(r.x * libm::cosf(angle), r.y * libm::sinf(angle));
    circle.center.add(rot.apply(local))
}

fn emit_circle(out: &mut RenderOutput, circle: &Circle, z: f32) {
    let rot = Rot2::from_angle(circle.rotation);
    if circle.fill[3] > 0.0 {
        for k in 0..CIRCLE_SEGMENTS {
            out.triangles.push_triangle(
                Vertex::new(circle.center, z, circle.fill),
                Vertex::new(ellipse_point(circle, rot, k), z, circle.fill),
                Vertex::new(ellipse_point(circle, rot, (k + 1) % CIRCLE_SEGMENTS), z, circle.fill),
            );
        }
    }
    if circle.stroke.enabled {
        for k in 0..CIRCLE_SEGMENTS {
            out.lines.push_segment(
                ellipse_point(circle, rot, k),
                ellipse_point(circle, rot, (k + 1) % CIRCLE_SEGMENTS),
                z,
                circle.stroke.color,
            );
        }
    }
}

fn emit_polygon(out: &mut RenderOutput, polygon: &Polygon, z: f32) {
    let verts = polygon.vertices();
    if polygon.fill[3] > 0.0 {
        for i in 1..verts.len() - 1 {
            out.triangles.push_triangle(
                Vertex::new(verts[0], z, polygon.fill),
                Vertex::new(verts[i], z, polygon.fill),
                Vertex::new(verts[i + 1], z, polygon.fill),
            );
        }
    }
    if polygon.stroke.enabled {
        for i in 0..verts.len() {
            out.lines
                .push_segment(verts[i], verts[(i + 1) % verts.len()], z, polygon.stroke.color);
        }
    }
}

fn emit_arrow(out: &mut RenderOutput, arrow: &Arrow, z: f32) {
    if !arrow.stroke.enabled {
        return;
    }
    out.lines.push_segment(arrow.a, arrow.b, z, arrow.stroke.color);
    // Filled head: isoceles triangle pointing along the shaft.
    let dir = arrow.b.sub(arrow.a).normalize();
    if dir == Vec2::ZERO {
        return;
    }
    let side = dir.perp().scale(arrow.head_size * 0.5);
    let back = arrow.b.sub(dir.scale(arrow.head_size));
    out.triangles.push_triangle(
        Vertex::new(arrow.b, z, arrow.stroke.color),
        Vertex::new(back.add(side), z, arrow.stroke.color),
        Vertex::new(back.sub(side), z, arrow.stroke.color),
    );
}

fn emit_text(
    out: &mut RenderOutput,
    text: &Text,
    z: f32,
    provider: &dyn FontProvider,
    atlas: &mut GlyphAtlas,
    view_scale: f32,
) -> bool {
    let layout = layout_text(text, provider);
    let rot = Rot2::from_angle(text.rotation);
    let place = |p: Vec2| text.pos.add(rot.apply(p));
    let decoration_thickness = 1.0 / view_scale.max(1e-4);
    let mut overflow = false;

    for quad in &layout.glyphs {
        if quad.ch.is_whitespace() {
            continue;
        }
        let Some(run) = text.runs.get(quad.run as usize) else {
            continue;
        };
        let color = unpack_rgba(run.color);
        // Keep the atlas warm so the consumer can texture this quad.
        let size_px = libm::roundf(run.size_pt).max(1.0) as u32;
        let key = GlyphKey::new(run.font, size_px, quad.ch, run.flags);
        if atlas
            .get_or_insert(key, || {
                provider.rasterize(run.font, size_px, quad.ch, run.flags)
            })
            .is_err()
        {
            overflow = true;
        }

        let min = Vec2::new(quad.x, quad.y);
        let max = Vec2::new(quad.x + quad.w, quad.y + quad.h);
        let corners = [
            place(min),
            place(Vec2::new(max.x, min.y)),
            place(max),
            place(Vec2::new(min.x, max.y)),
        ];
        out.triangles.push_triangle(
            Vertex::new(corners[0], z, color),
            Vertex::new(corners[1], z, color),
            Vertex::new(corners[2], z, color),
        );
        out.triangles.push_triangle(
            Vertex::new(corners[0], z, color),
            Vertex::new(corners[2], z, color),
            Vertex::new(corners[3], z, color),
        );
    }

    // Underline / strike decorations per run segment per line.
    for line in &layout.lines {
        let glyphs = &layout.glyphs[line.glyph_start as usize..line.glyph_end as usize];
        for quad in glyphs {
            let Some(run) = text.runs.get(quad.run as usize) else {
                continue;
            };
            let color = unpack_rgba(run.color);
            let mut bars: Vec<f32> = Vec::new();
            if run.flags.contains(StyleFlags::UNDERLINE) {
                bars.push(line.baseline + decoration_thickness);
            }
            if run.flags.contains(StyleFlags::STRIKE) {
                bars.push(line.top + line.height * 0.5);
            }
            for bar_y in bars {
                let min = Vec2::new(quad.x, bar_y);
                let max = Vec2::new(quad.x + quad.w, bar_y + decoration_thickness);
                let corners = [
                    place(min),
                    place(Vec2::new(max.x, min.y)),
                    place(max),
                    place(Vec2::new(min.x, max.y)),
                ];
                out.triangles.push_triangle(
                    Vertex::new(corners[0], z, color),
                    Vertex::new(corners[1], z, color),
                    Vertex::new(corners[2], z, color),
                );
                out.triangles.push_triangle(
                    Vertex::new(corners[0], z, color),
                    Vertex::new(corners[2], z, color),
                    Vertex::new(corners[3], z, color),
                );
            }
        }
    }
    overflow
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_model::{EntityId, Stroke};
    use vellum_text::MonoProvider;

    fn red_rect() -> Rect {
        Rect {
            pos: Vec2::ZERO,
            size: Vec2::new(10.0, 10.0),
            rotation: 0.0,
            fill: [1.0, 0.0, 0.0, 1.0],
            stroke: Stroke::default(),
        }
    }

    #[test]
    fn stroked_rect_is_six_triangle_and_eight_line_vertices() {
        let mut world = World::new();
        world.upsert_rect(EntityId(1), red_rect());
        let mut atlas = GlyphAtlas::new();
        let out = build_world(&world, &MonoProvider, &mut atlas);
        assert_eq!(out.triangles.vertex_count(), 6);
        assert_eq!(out.lines.vertex_count(), 8);
    }

    #[test]
    fn build_is_deterministic() {
        let mut world = World::new();
        world.upsert_rect(EntityId(1), red_rect());
        world.upsert_circle(
            EntityId(2),
            Circle {
                center: Vec2::new(20.0, 20.0),
                radius: Vec2::new(5.0, 3.0),
                rotation: 0.3,
                scale: 1.0,
                fill: [0.0, 1.0, 0.0, 1.0],
                stroke: Stroke::default(),
            },
        );
        let mut atlas_a = GlyphAtlas::new();
        let mut atlas_b = GlyphAtlas::new();
        let a = build_world(&world, &MonoProvider, &mut atlas_a);
        let b = build_world(&world, &MonoProvider, &mut atlas_b);
        assert_eq!(a.triangles.as_floats(), b.triangles.as_floats());
        assert_eq!(a.lines.as_floats(), b.lines.as_floats());
    }

    #[test]
    fn draw_order_controls_emission_order() {
        let mut world = World::new();
        world.upsert_rect(EntityId(1), red_rect());
        world.upsert_line(
            EntityId(2),
            vellum_model::Line {
                a: Vec2::ZERO,
                b: Vec2::new(10.0, 10.0),
                stroke: Stroke::default(),
            },
        );
        world.set_draw_order(&[EntityId(2), EntityId(1)]);
        let mut atlas = GlyphAtlas::new();
        let out = build_world(&world, &MonoProvider, &mut atlas);
        // First line segment belongs to id 2: its endpoint is (10, 10).
        let floats = out.lines.as_floats();
        assert_eq!(&floats[0..2], &[0.0, 0.0]);
        assert_eq!(&floats[7..9], &[10.0, 10.0]);
        // The rect outline follows with a strictly larger depth.
        assert!(floats[2] < floats[2 + 2 * 7]);
    }

    #[test]
    fn disabled_stroke_emits_no_outline() {
        let mut world = World::new();
        let mut rect = red_rect();
        rect.stroke.enabled = false;
        world.upsert_rect(EntityId(1), rect);
        let mut atlas = GlyphAtlas::new();
        let out = build_world(&world, &MonoProvider, &mut atlas);
        assert_eq!(out.lines.vertex_count(), 0);
    }

    #[test]
    fn unresolved_conduit_draws_nothing() {
        let mut world = World::new();
        world.upsert_conduit(
            EntityId(1),
            vellum_model::Conduit {
                from: EntityId(98),
                to: EntityId(99),
                stroke: Stroke::default(),
            },
        );
        let mut atlas = GlyphAtlas::new();
        let out = build_world(&world, &MonoProvider, &mut atlas);
        assert!(out.lines.is_empty());
        assert!(out.triangles.is_empty());
    }

    #[test]
    fn text_glyphs_land_in_atlas() {
        let mut world = World::new();
        world.upsert_text(
            EntityId(1),
            Text {
                pos: Vec2::ZERO,
                rotation: 0.0,
                box_mode: vellum_model::TextBoxMode::AutoWidth,
                constraint_width: 0.0,
                align: vellum_model::TextAlign::Left,
                content: "ok".into(),
                runs: vec![vellum_model::StyleRun {
                    start: 0,
                    len: 2,
                    font: 0,
                    size_pt: 12.0,
                    color: 0x0000_00FF,
                    flags: StyleFlags::empty(),
                }],
                caret: 0,
                selection: (0, 0),
                layout_size: Vec2::ZERO,
            },
        );
        let mut atlas = GlyphAtlas::new();
        let out = build_world(&world, &MonoProvider, &mut atlas);
        // Two glyph quads, two triangles each.
        assert_eq!(out.triangles.vertex_count(), 12);
        assert_eq!(atlas.glyph_count(), 2);
        assert!(atlas.is_dirty());
    }
}
