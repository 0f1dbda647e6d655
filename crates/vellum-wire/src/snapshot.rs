// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Snapshot encode/decode.
//!
//! Determinism contract
//! - Sections appear in a fixed order: symbols, nodes, conduits, rects,
//!   lines, polylines (with the embedded point pool), circles, polygons,
//!   arrows, texts. Each section is count-prefixed; records are encoded in
//!   table storage order.
//! - All scalars are little-endian; floats are raw f32 bit patterns, so a
//!   round-trip is bit-exact.
//! - Runtime-only fields (caret, selection, layout size, view scale) are
//!   not persisted; the decoder sets documented defaults. Draw order is not
//!   persisted either: the decoder rebuilds ascending-id order.
//! - The version increments on any layout change; old versions fail fast
//!   and the decoder never returns partial state.

use vellum_geom::Vec2;
use vellum_model::{
    Arrow, Circle, Conduit, EntityId, Line, NodeAnchor, NodePoint, Polygon, Polyline, Rect,
    Stroke, StyleFlags, StyleRun, Symbol, Text, TextAlign, TextBoxMode, World,
};

use crate::codec::{Reader, WireError, Writer};

/// Magic at the head of every snapshot ("VSNP").
pub const SNAPSHOT_MAGIC: u32 = 0x5653_4E50;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 2;

fn write_vec2(w: &mut Writer, v: Vec2) {
    w.write_f32_le(v.x);
    w.write_f32_le(v.y);
}

fn read_vec2(r: &mut Reader<'_>) -> Result<Vec2, WireError> {
    Ok(Vec2::new(r.read_f32_le()?, r.read_f32_le()?))
}

fn write_rgba(w: &mut Writer, c: [f32; 4]) {
    for ch in c {
        w.write_f32_le(ch);
    }
}

fn read_rgba(r: &mut Reader<'_>) -> Result<[f32; 4], WireError> {
    Ok([
        r.read_f32_le()?,
        r.read_f32_le()?,
        r.read_f32_le()?,
        r.read_f32_le()?,
    ])
}

fn write_stroke(w: &mut Writer, s: &Stroke) {
    write_rgba(w, s.color);
    w.write_u8(u8::from(s.enabled));
    w.write_f32_le(s.width_px);
}

fn read_stroke(r: &mut Reader<'_>) -> Result<Stroke, WireError> {
    Ok(Stroke {
        color: read_rgba(r)?,
        enabled: r.read_u8()? != 0,
        width_px: r.read_f32_le()?,
    })
}

/// Serializes the world into a canonical snapshot byte block.
#[must_use]
pub fn encode_snapshot(world: &World) -> Vec<u8> {
    let mut w = Writer::with_capacity(64 + world.entity_count() * 48);
    w.write_u32_le(SNAPSHOT_MAGIC);
    w.write_u32_le(SNAPSHOT_VERSION);

    // Symbols.
    w.write_u32_le(world.count(vellum_model::EntityKind::Symbol) as u32);
    for (id, s) in world.iter_symbols() {
        w.write_u32_le(id.0);
        w.write_u32_le(s.library_key);
        write_vec2(&mut w, s.pos);
        write_vec2(&mut w, s.size);
        w.write_f32_le(s.rotation);
        w.write_f32_le(s.scale);
        write_vec2(&mut w, s.anchor_uv);
    }

    // Nodes.
    w.write_u32_le(world.count(vellum_model::EntityKind::Node) as u32);
    for (id, n) in world.iter_nodes() {
        w.write_u32_le(id.0);
        match n.anchor {
            NodeAnchor::Free(pos) => {
                w.write_u8(0);
                write_vec2(&mut w, pos);
                w.write_u32_le(0);
            }
            NodeAnchor::Anchored(symbol) => {
                w.write_u8(1);
                write_vec2(&mut w, Vec2::ZERO);
                w.write_u32_le(symbol.0);
            }
        }
    }

    // Conduits.
    w.write_u32_le(world.count(vellum_model::EntityKind::Conduit) as u32);
    for (id, c) in world.iter_conduits() {
        w.write_u32_le(id.0);
        w.write_u32_le(c.from.0);
        w.write_u32_le(c.to.0);
        write_stroke(&mut w, &c.stroke);
    }

    // Rects.
    w.write_u32_le(world.count(vellum_model::EntityKind::Rect) as u32);
    for (id, rct) in world.iter_rects() {
        w.write_u32_le(id.0);
        write_vec2(&mut w, rct.pos);
        write_vec2(&mut w, rct.size);
        w.write_f32_le(rct.rotation);
        write_rgba(&mut w, rct.fill);
        write_stroke(&mut w, &rct.stroke);
    }

    // Lines.
    w.write_u32_le(world.count(vellum_model::EntityKind::Line) as u32);
    for (id, l) in world.iter_lines() {
        w.write_u32_le(id.0);
        write_vec2(&mut w, l.a);
        write_vec2(&mut w, l.b);
        write_stroke(&mut w, &l.stroke);
    }

    // Polylines with the embedded point pool.
    w.write_u32_le(world.points().len() as u32);
    for p in world.points() {
        write_vec2(&mut w, *p);
    }
    w.write_u32_le(world.count(vellum_model::EntityKind::Polyline) as u32);
    for (id, p) in world.iter_polylines() {
        w.write_u32_le(id.0);
        w.write_u32_le(p.offset);
        w.write_u32_le(p.count);
        write_rgba(&mut w, p.fill);
        write_stroke(&mut w, &p.stroke);
    }

    // Circles.
    w.write_u32_le(world.count(vellum_model::EntityKind::Circle) as u32);
    for (id, c) in world.iter_circles() {
        w.write_u32_le(id.0);
        write_vec2(&mut w, c.center);
        write_vec2(&mut w, c.radius);
        w.write_f32_le(c.rotation);
        w.write_f32_le(c.scale);
        write_rgba(&mut w, c.fill);
        write_stroke(&mut w, &c.stroke);
    }

    // Polygons.
    w.write_u32_le(world.count(vellum_model::EntityKind::Polygon) as u32);
    for (id, p) in world.iter_polygons() {
        w.write_u32_le(id.0);
        write_vec2(&mut w, p.center);
        write_vec2(&mut w, p.radius);
        w.write_f32_le(p.rotation);
        w.write_f32_le(p.scale);
        w.write_u32_le(p.sides);
        write_rgba(&mut w, p.fill);
        write_stroke(&mut w, &p.stroke);
    }

    // Arrows.
    w.write_u32_le(world.count(vellum_model::EntityKind::Arrow) as u32);
    for (id, a) in world.iter_arrows() {
        w.write_u32_le(id.0);
        write_vec2(&mut w, a.a);
        write_vec2(&mut w, a.b);
        w.write_f32_le(a.head_size);
        write_stroke(&mut w, &a.stroke);
    }

    // Texts with embedded content and runs.
    w.write_u32_le(world.count(vellum_model::EntityKind::Text) as u32);
    for (id, t) in world.iter_texts() {
        w.write_u32_le(id.0);
        write_vec2(&mut w, t.pos);
        w.write_f32_le(t.rotation);
        w.write_u8(t.box_mode as u8);
        w.write_u8(t.align as u8);
        w.write_f32_le(t.constraint_width);
        w.write_len_prefixed_bytes(t.content.as_bytes());
        w.write_u32_le(t.runs.len() as u32);
        for run in &t.runs {
            w.write_u32_le(run.start);
            w.write_u32_le(run.len);
            w.write_u32_le(run.font);
            w.write_f32_le(run.size_pt);
            w.write_u32_le(run.color);
            w.write_u8(run.flags.bits());
        }
    }

    w.into_vec()
}

/// Parses a snapshot into a fresh shadow world.
///
/// The returned world has a rebuilt ascending-id draw order and defaulted
/// runtime-only fields. On any error nothing is returned, so callers can
/// swap atomically.
pub fn decode_snapshot(bytes: &[u8]) -> Result<World, WireError> {
    let mut r = Reader::new(bytes);
    if r.read_u32_le().map_err(|_| WireError::InvalidMagic)? != SNAPSHOT_MAGIC {
        return Err(WireError::InvalidMagic);
    }
    let version = r.read_u32_le()?;
    if version != SNAPSHOT_VERSION {
        return Err(WireError::UnsupportedVersion(version));
    }

    let mut world = World::new();

    let symbol_count = r.read_u32_le()?;
    for _ in 0..symbol_count {
        let id = EntityId(r.read_u32_le()?);
        let library_key = r.read_u32_le()?;
        let pos = read_vec2(&mut r)?;
        let size = read_vec2(&mut r)?;
        let rotation = r.read_f32_le()?;
        let scale = r.read_f32_le()?;
        let anchor_uv = read_vec2(&mut r)?;
        world.upsert_symbol(
            id,
            Symbol {
                library_key,
                pos,
                size,
                rotation,
                scale,
                anchor_uv,
            },
        );
    }

    let node_count = r.read_u32_le()?;
    for _ in 0..node_count {
        let id = EntityId(r.read_u32_le()?);
        let tag = r.read_u8()?;
        let pos = read_vec2(&mut r)?;
        let symbol = EntityId(r.read_u32_le()?);
        let anchor = if tag == 1 {
            NodeAnchor::Anchored(symbol)
        } else {
            NodeAnchor::Free(pos)
        };
        world.upsert_node(id, NodePoint { anchor });
    }

    let conduit_count = r.read_u32_le()?;
    for _ in 0..conduit_count {
        let id = EntityId(r.read_u32_le()?);
        let from = EntityId(r.read_u32_le()?);
        let to = EntityId(r.read_u32_le()?);
        let stroke = read_stroke(&mut r)?;
        world.upsert_conduit(id, Conduit { from, to, stroke });
    }

    let rect_count = r.read_u32_le()?;
    for _ in 0..rect_count {
        let id = EntityId(r.read_u32_le()?);
        let pos = read_vec2(&mut r)?;
        let size = read_vec2(&mut r)?;
        let rotation = r.read_f32_le()?;
        let fill = read_rgba(&mut r)?;
        let stroke = read_stroke(&mut r)?;
        world.upsert_rect(
            id,
            Rect {
                pos,
                size,
                rotation,
                fill,
                stroke,
            },
        );
    }

    let line_count = r.read_u32_le()?;
    for _ in 0..line_count {
        let id = EntityId(r.read_u32_le()?);
        let a = read_vec2(&mut r)?;
        let b = read_vec2(&mut r)?;
        let stroke = read_stroke(&mut r)?;
        world.upsert_line(id, Line { a, b, stroke });
    }

    let pool_len = r.read_u32_le()? as usize;
    let mut pool = Vec::with_capacity(pool_len);
    for _ in 0..pool_len {
        pool.push(read_vec2(&mut r)?);
    }
    world.append_points(&pool);

    let polyline_count = r.read_u32_le()?;
    for _ in 0..polyline_count {
        let id = EntityId(r.read_u32_le()?);
        let offset = r.read_u32_le()?;
        let count = r.read_u32_le()?;
        let fill = read_rgba(&mut r)?;
        let stroke = read_stroke(&mut r)?;
        if offset as usize + count as usize > pool_len {
            return Err(WireError::InvalidPayloadSize);
        }
        world.upsert_polyline(
            id,
            Polyline {
                offset,
                count,
                fill,
                stroke,
            },
        );
    }

    let circle_count = r.read_u32_le()?;
    for _ in 0..circle_count {
        let id = EntityId(r.read_u32_le()?);
        let center = read_vec2(&mut r)?;
        let radius = read_vec2(&mut r)?;
        let rotation = r.read_f32_le()?;
        let scale = r.read_f32_le()?;
        let fill = read_rgba(&mut r)?;
        let stroke = read_stroke(&mut r)?;
        world.upsert_circle(
            id,
            Circle {
                center,
                radius,
                rotation,
                scale,
                fill,
                stroke,
            },
        );
    }

    let polygon_count = r.read_u32_le()?;
    for _ in 0..polygon_count {
        let id = EntityId(r.read_u32_le()?);
        let center = read_vec2(&mut r)?;
        let radius = read_vec2(&mut r)?;
        let rotation = r.read_f32_le()?;
        let scale = r.read_f32_le()?;
        let sides = r.read_u32_le()?.max(3);
        let fill = read_rgba(&mut r)?;
        let stroke = read_stroke(&mut r)?;
        world.upsert_polygon(
            id,
            Polygon {
                center,
                radius,
                rotation,
                scale,
                sides,
                fill,
                stroke,
            },
        );
    }

    let arrow_count = r.read_u32_le()?;
    for _ in 0..arrow_count {
        let id = EntityId(r.read_u32_le()?);
        let a = read_vec2(&mut r)?;
        let b = read_vec2(&mut r)?;
        let head_size = r.read_f32_le()?;
        let stroke = read_stroke(&mut r)?;
        world.upsert_arrow(
            id,
            Arrow {
                a,
                b,
                head_size,
                stroke,
            },
        );
    }

    let text_count = r.read_u32_le()?;
    for _ in 0..text_count {
        let id = EntityId(r.read_u32_le()?);
        let pos = read_vec2(&mut r)?;
        let rotation = r.read_f32_le()?;
        let box_mode = TextBoxMode::from_tag(r.read_u8()?);
        let align = TextAlign::from_tag(r.read_u8()?);
        let constraint_width = r.read_f32_le()?;
        let content = r.read_string()?;
        let run_count = r.read_u32_le()?;
        let mut runs = Vec::with_capacity(run_count as usize);
        for _ in 0..run_count {
            runs.push(StyleRun {
                start: r.read_u32_le()?,
                len: r.read_u32_le()?,
                font: r.read_u32_le()?,
                size_pt: r.read_f32_le()?,
                color: r.read_u32_le()?,
                flags: StyleFlags::from_bits_truncate(r.read_u8()?),
            });
        }
        world.upsert_text(
            id,
            Text {
                pos,
                rotation,
                box_mode,
                constraint_width,
                align,
                content,
                runs,
                caret: 0,
                selection: (0, 0),
                layout_size: Vec2::ZERO,
            },
        );
    }

    if !r.is_exhausted() {
        return Err(WireError::InvalidPayloadSize);
    }

    world.rebuild_draw_order_ascending();
    Ok(world)
}
