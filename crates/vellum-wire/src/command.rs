// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Command stream decoding.
//!
//! Wire layout
//! - Optional preamble: magic (u32 LE) + protocol version (u32 LE). When the
//!   first four bytes equal [`COMMAND_MAGIC`] the preamble is verified;
//!   otherwise decoding starts at the first record.
//! - Records: `{op: u32, id: u32, len: u32, payload[len]}`, back to back.
//!   The decoder advances strictly; any size mismatch fails the whole
//!   buffer and nothing is returned.

use vellum_geom::Vec2;
use vellum_model::{
    Arrow, Circle, ColorRgba, Conduit, EntityId, Line, NodeAnchor, NodePoint, Polygon, Rect,
    Stroke, StyleFlags, StyleRun, Symbol, Text, TextAlign, TextBoxMode,
};

use crate::codec::{Reader, WireError, Writer};

/// Magic preceding a versioned command buffer ("VCMD").
pub const COMMAND_MAGIC: u32 = 0x5643_4D44;

/// Current command protocol version.
pub const COMMAND_VERSION: u32 = 1;

/// Command op codes.
pub mod op {
    /// Resets the world; increments generation.
    pub const CLEAR_ALL: u32 = 1;
    /// Removes an entity by id (no-op when absent).
    pub const DELETE_ENTITY: u32 = 2;
    /// Sets the view scale used to size screen-pixel strokes.
    pub const SET_VIEW_SCALE: u32 = 3;
    /// Replaces the draw-order list.
    pub const SET_DRAW_ORDER: u32 = 4;
    /// Creates or updates a rectangle.
    pub const UPSERT_RECT: u32 = 16;
    /// Creates or updates a line.
    pub const UPSERT_LINE: u32 = 17;
    /// Creates or updates a polyline; fewer than two points is a delete.
    pub const UPSERT_POLYLINE: u32 = 18;
    /// Creates or updates an ellipse.
    pub const UPSERT_CIRCLE: u32 = 19;
    /// Creates or updates a regular polygon.
    pub const UPSERT_POLYGON: u32 = 20;
    /// Creates or updates an arrow.
    pub const UPSERT_ARROW: u32 = 21;
    /// Creates or updates a symbol placement.
    pub const UPSERT_SYMBOL: u32 = 32;
    /// Creates or updates a connection node.
    pub const UPSERT_NODE: u32 = 33;
    /// Creates or updates a conduit.
    pub const UPSERT_CONDUIT: u32 = 34;
    /// Creates or updates a text block.
    pub const UPSERT_TEXT: u32 = 48;
    /// Inserts UTF-8 content at a logical index.
    pub const INSERT_CONTENT: u32 = 49;
    /// Deletes a logical content range.
    pub const DELETE_CONTENT: u32 = 50;
    /// Moves the caret to a logical index.
    pub const SET_CARET: u32 = 51;
    /// Sets the selection to a logical range.
    pub const SET_SELECTION: u32 = 52;
    /// Applies a tri-state style patch over a logical range.
    pub const APPLY_STYLE: u32 = 53;
    /// Sets the text alignment.
    pub const SET_ALIGN: u32 = 54;
}

/// Field-presence bits for [`ApplyStylePatch`].
mod style_field {
    pub const FONT: u32 = 1 << 0;
    pub const SIZE: u32 = 1 << 1;
    pub const COLOR: u32 = 1 << 2;
}

/// Tri-state style patch: flags are set/cleared/left per mask, scalar fields
/// apply only when present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApplyStylePatch {
    /// Start of the target range, logical indices.
    pub start: u32,
    /// Exclusive end of the target range, logical indices.
    pub end: u32,
    /// Flags forced on.
    pub set_flags: StyleFlags,
    /// Flags forced off.
    pub clear_flags: StyleFlags,
    /// New font id, when present.
    pub font: Option<u32>,
    /// New point size, when present.
    pub size_pt: Option<f32>,
    /// New packed color, when present.
    pub color: Option<u32>,
}

/// A decoded command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Reset the world.
    ClearAll,
    /// Remove an entity (no-op when absent). Also produced by a degenerate
    /// polyline upsert.
    DeleteEntity {
        /// Target entity.
        id: EntityId,
    },
    /// Set the view scale.
    SetViewScale {
        /// New scale; clamping happens in the store.
        scale: f32,
    },
    /// Replace the draw order.
    SetDrawOrder {
        /// Requested id sequence.
        ids: Vec<EntityId>,
    },
    /// Create or update a rectangle.
    UpsertRect {
        /// Target entity.
        id: EntityId,
        /// New value.
        rect: Rect,
    },
    /// Create or update a line.
    UpsertLine {
        /// Target entity.
        id: EntityId,
        /// New value.
        line: Line,
    },
    /// Create or update a polyline. Points are carried inline; the engine
    /// appends them to the shared pool.
    UpsertPolyline {
        /// Target entity.
        id: EntityId,
        /// Polyline points, two or more.
        points: Vec<Vec2>,
        /// Fill color.
        fill: ColorRgba,
        /// Stroke styling.
        stroke: Stroke,
    },
    /// Create or update an ellipse.
    UpsertCircle {
        /// Target entity.
        id: EntityId,
        /// New value.
        circle: Circle,
    },
    /// Create or update a regular polygon.
    UpsertPolygon {
        /// Target entity.
        id: EntityId,
        /// New value.
        polygon: Polygon,
    },
    /// Create or update an arrow.
    UpsertArrow {
        /// Target entity.
        id: EntityId,
        /// New value.
        arrow: Arrow,
    },
    /// Create or update a symbol placement.
    UpsertSymbol {
        /// Target entity.
        id: EntityId,
        /// New value.
        symbol: Symbol,
    },
    /// Create or update a connection node.
    UpsertNode {
        /// Target entity.
        id: EntityId,
        /// New value.
        node: NodePoint,
    },
    /// Create or update a conduit.
    UpsertConduit {
        /// Target entity.
        id: EntityId,
        /// New value.
        conduit: Conduit,
    },
    /// Create or update a text block.
    UpsertText {
        /// Target entity.
        id: EntityId,
        /// New value (runtime fields defaulted).
        text: Text,
    },
    /// Insert content at a logical index.
    InsertContent {
        /// Target text entity.
        id: EntityId,
        /// Logical insertion index.
        at: u32,
        /// Inserted content.
        content: String,
    },
    /// Delete a logical content range.
    DeleteContent {
        /// Target text entity.
        id: EntityId,
        /// Logical start.
        start: u32,
        /// Logical exclusive end.
        end: u32,
    },
    /// Move the caret.
    SetCaret {
        /// Target text entity.
        id: EntityId,
        /// Logical caret index.
        caret: u32,
    },
    /// Set the selection range.
    SetSelection {
        /// Target text entity.
        id: EntityId,
        /// Logical start (≤ end).
        start: u32,
        /// Logical exclusive end.
        end: u32,
    },
    /// Apply a style patch.
    ApplyStyle {
        /// Target text entity.
        id: EntityId,
        /// The patch.
        patch: ApplyStylePatch,
    },
    /// Set text alignment.
    SetAlign {
        /// Target text entity.
        id: EntityId,
        /// New alignment.
        align: TextAlign,
    },
}

fn read_rgba(r: &mut Reader<'_>) -> Result<ColorRgba, WireError> {
    Ok([
        r.read_f32_le()?,
        r.read_f32_le()?,
        r.read_f32_le()?,
        r.read_f32_le()?,
    ])
}

fn read_stroke(r: &mut Reader<'_>) -> Result<Stroke, WireError> {
    let color = read_rgba(r)?;
    let enabled = r.read_u32_le()? != 0;
    let width_px = r.read_f32_le()?;
    Ok(Stroke {
        color,
        enabled,
        width_px,
    })
}

fn read_vec2(r: &mut Reader<'_>) -> Result<Vec2, WireError> {
    Ok(Vec2::new(r.read_f32_le()?, r.read_f32_le()?))
}

fn decode_payload(op_code: u32, id: EntityId, payload: &[u8]) -> Result<Command, WireError> {
    let mut r = Reader::new(payload);
    let cmd = match op_code {
        op::CLEAR_ALL => Command::ClearAll,
        op::DELETE_ENTITY => Command::DeleteEntity { id },
        op::SET_VIEW_SCALE => Command::SetViewScale {
            scale: r.read_f32_le()?,
        },
        op::SET_DRAW_ORDER => {
            let count = r.read_u32_le()? as usize;
            if r.remaining() != count * 4 {
                return Err(WireError::InvalidPayloadSize);
            }
            let mut ids = Vec::with_capacity(count);
            for _ in 0..count {
                ids.push(EntityId(r.read_u32_le()?));
            }
            Command::SetDrawOrder { ids }
        }
        op::UPSERT_RECT => {
            let pos = read_vec2(&mut r)?;
            let size = read_vec2(&mut r)?;
            let rotation = r.read_f32_le()?;
            let fill = read_rgba(&mut r)?;
            let stroke = read_stroke(&mut r)?;
            Command::UpsertRect {
                id,
                rect: Rect {
                    pos,
                    size,
                    rotation,
                    fill,
                    stroke,
                },
            }
        }
        op::UPSERT_LINE => {
            let a = read_vec2(&mut r)?;
            let b = read_vec2(&mut r)?;
            let stroke = read_stroke(&mut r)?;
            Command::UpsertLine {
                id,
                line: Line { a, b, stroke },
            }
        }
        op::UPSERT_POLYLINE => {
            let count = r.read_u32_le()? as usize;
            if r.remaining() != count * 8 + 16 + 24 {
                return Err(WireError::InvalidPayloadSize);
            }
            let mut points = Vec::with_capacity(count);
            for _ in 0..count {
                points.push(read_vec2(&mut r)?);
            }
            let fill = read_rgba(&mut r)?;
            let stroke = read_stroke(&mut r)?;
            if points.len() < 2 {
                // Degenerate polyline: delete signal.
                Command::DeleteEntity { id }
            } else {
                Command::UpsertPolyline {
                    id,
                    points,
                    fill,
                    stroke,
                }
            }
        }
        op::UPSERT_CIRCLE => {
            let center = read_vec2(&mut r)?;
            let radius = read_vec2(&mut r)?;
            let rotation = r.read_f32_le()?;
            let scale = r.read_f32_le()?;
            let fill = read_rgba(&mut r)?;
            let stroke = read_stroke(&mut r)?;
            Command::UpsertCircle {
                id,
                circle: Circle {
                    center,
                    radius,
                    rotation,
                    scale,
                    fill,
                    stroke,
                },
            }
        }
        op::UPSERT_POLYGON => {
            let center = read_vec2(&mut r)?;
            let radius = read_vec2(&mut r)?;
            let rotation = r.read_f32_le()?;
            let scale = r.read_f32_le()?;
            let sides = r.read_u32_le()?.max(3);
            let fill = read_rgba(&mut r)?;
            let stroke = read_stroke(&mut r)?;
            Command::UpsertPolygon {
                id,
                polygon: Polygon {
                    center,
                    radius,
                    rotation,
                    scale,
                    sides,
                    fill,
                    stroke,
                },
            }
        }
        op::UPSERT_ARROW => {
            let a = read_vec2(&mut r)?;
            let b = read_vec2(&mut r)?;
            let head_size = r.read_f32_le()?;
            let stroke = read_stroke(&mut r)?;
            Command::UpsertArrow {
                id,
                arrow: Arrow {
                    a,
                    b,
                    head_size,
                    stroke,
                },
            }
        }
        op::UPSERT_SYMBOL => {
            let library_key = r.read_u32_le()?;
            let pos = read_vec2(&mut r)?;
            let size = read_vec2(&mut r)?;
            let rotation = r.read_f32_le()?;
            let scale = r.read_f32_le()?;
            let anchor_uv = read_vec2(&mut r)?;
            Command::UpsertSymbol {
                id,
                symbol: Symbol {
                    library_key,
                    pos,
                    size,
                    rotation,
                    scale,
                    anchor_uv,
                },
            }
        }
        op::UPSERT_NODE => {
            let tag = r.read_u32_le()?;
            let pos = read_vec2(&mut r)?;
            let symbol = EntityId(r.read_u32_le()?);
            let anchor = if tag == 1 {
                NodeAnchor::Anchored(symbol)
            } else {
                NodeAnchor::Free(pos)
            };
            Command::UpsertNode {
                id,
                node: NodePoint { anchor },
            }
        }
        op::UPSERT_CONDUIT => {
            let from = EntityId(r.read_u32_le()?);
            let to = EntityId(r.read_u32_le()?);
            let stroke = read_stroke(&mut r)?;
            Command::UpsertConduit {
                id,
                conduit: Conduit { from, to, stroke },
            }
        }
        op::UPSERT_TEXT => {
            let pos = read_vec2(&mut r)?;
            let rotation = r.read_f32_le()?;
            let box_mode = TextBoxMode::from_tag(r.read_u32_le()? as u8);
            let constraint_width = r.read_f32_le()?;
            let align = TextAlign::from_tag(r.read_u32_le()? as u8);
            let content = r.read_string()?;
            let run_count = r.read_u32_le()? as usize;
            if r.remaining() != run_count * 24 {
                return Err(WireError::InvalidPayloadSize);
            }
            let mut runs = Vec::with_capacity(run_count);
            for _ in 0..run_count {
                runs.push(StyleRun {
                    start: r.read_u32_le()?,
                    len: r.read_u32_le()?,
                    font: r.read_u32_le()?,
                    size_pt: r.read_f32_le()?,
                    color: r.read_u32_le()?,
                    flags: StyleFlags::from_bits_truncate(r.read_u32_le()? as u8),
                });
            }
            Command::UpsertText {
                id,
                text: Text {
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
            }
        }
        op::INSERT_CONTENT => {
            let at = r.read_u32_le()?;
            let content = r.read_string()?;
            Command::InsertContent { id, at, content }
        }
        op::DELETE_CONTENT => Command::DeleteContent {
            id,
            start: r.read_u32_le()?,
            end: r.read_u32_le()?,
        },
        op::SET_CARET => Command::SetCaret {
            id,
            caret: r.read_u32_le()?,
        },
        op::SET_SELECTION => Command::SetSelection {
            id,
            start: r.read_u32_le()?,
            end: r.read_u32_le()?,
        },
        op::APPLY_STYLE => {
            let start = r.read_u32_le()?;
            let end = r.read_u32_le()?;
            let set_flags = StyleFlags::from_bits_truncate(r.read_u32_le()? as u8);
            let clear_flags = StyleFlags::from_bits_truncate(r.read_u32_le()? as u8);
            let fields = r.read_u32_le()?;
            let font = r.read_u32_le()?;
            let size_pt = r.read_f32_le()?;
            let color = r.read_u32_le()?;
            Command::ApplyStyle {
                id,
                patch: ApplyStylePatch {
                    start,
                    end,
                    set_flags,
                    clear_flags,
                    font: (fields & style_field::FONT != 0).then_some(font),
                    size_pt: (fields & style_field::SIZE != 0).then_some(size_pt),
                    color: (fields & style_field::COLOR != 0).then_some(color),
                },
            }
        }
        op::SET_ALIGN => Command::SetAlign {
            id,
            align: TextAlign::from_tag(r.read_u32_le()? as u8),
        },
        unknown => return Err(WireError::UnknownCommand(unknown)),
    };
    if !r.is_exhausted() {
        return Err(WireError::InvalidPayloadSize);
    }
    Ok(cmd)
}

/// Running out of bytes *inside* a delivered payload is a size mismatch,
/// not a truncated buffer.
fn normalize_payload_err(err: WireError) -> WireError {
    if err == WireError::BufferTruncated {
        WireError::InvalidPayloadSize
    } else {
        err
    }
}

/// Decodes a full command buffer into an ordered command list.
///
/// The whole buffer decodes or nothing does; callers apply commands only
/// after a successful decode, which is what keeps failed batches from
/// partially mutating the model.
pub fn decode_command_buffer(bytes: &[u8]) -> Result<Vec<Command>, WireError> {
    let mut r = Reader::new(bytes);
    if bytes.len() >= 8 {
        let head = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if head == COMMAND_MAGIC {
            let _ = r.read_u32_le()?;
            let version = r.read_u32_le()?;
            if version != COMMAND_VERSION {
                return Err(WireError::UnsupportedVersion(version));
            }
        }
    } else if bytes.len() >= 4
        && u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) == COMMAND_MAGIC
    {
        return Err(WireError::BufferTruncated);
    }

    let mut out = Vec::new();
    while !r.is_exhausted() {
        let op_code = r.read_u32_le()?;
        let id = EntityId(r.read_u32_le()?);
        let len = r.read_u32_le()? as usize;
        let payload = r.read_bytes(len)?;
        out.push(decode_payload(op_code, id, payload).map_err(normalize_payload_err)?);
    }
    Ok(out)
}

/// Producer-side writer for command buffers.
///
/// Hosts and tests stage commands through this; the engine itself only
/// decodes. Every record is emitted with the exact payload size the decoder
/// demands.
#[derive(Debug)]
pub struct CommandWriter {
    w: Writer,
}

impl Default for CommandWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandWriter {
    /// Starts a buffer with the magic/version preamble.
    #[must_use]
    pub fn new() -> Self {
        let mut w = Writer::with_capacity(64);
        w.write_u32_le(COMMAND_MAGIC);
        w.write_u32_le(COMMAND_VERSION);
        Self { w }
    }

    /// Starts a bare buffer without the preamble.
    #[must_use]
    pub fn bare() -> Self {
        Self {
            w: Writer::default(),
        }
    }

    fn record(&mut self, op_code: u32, id: EntityId, payload: &Writer) {
        self.w.write_u32_le(op_code);
        self.w.write_u32_le(id.0);
        self.w.write_u32_le(payload.len() as u32);
        self.w.write_bytes(payload.as_slice());
    }

    /// Appends a `ClearAll`.
    pub fn clear_all(&mut self) {
        self.record(op::CLEAR_ALL, EntityId::NIL, &Writer::default());
    }

    /// Appends a `DeleteEntity`.
    pub fn delete_entity(&mut self, id: EntityId) {
        self.record(op::DELETE_ENTITY, id, &Writer::default());
    }

    /// Appends a `SetViewScale`.
    pub fn set_view_scale(&mut self, scale: f32) {
        let mut p = Writer::default();
        p.write_f32_le(scale);
        self.record(op::SET_VIEW_SCALE, EntityId::NIL, &p);
    }

    /// Appends a `SetDrawOrder`.
    pub fn set_draw_order(&mut self, ids: &[EntityId]) {
        let mut p = Writer::default();
        p.write_u32_le(ids.len() as u32);
        for id in ids {
            p.write_u32_le(id.0);
        }
        self.record(op::SET_DRAW_ORDER, EntityId::NIL, &p);
    }

    fn write_rgba(p: &mut Writer, c: ColorRgba) {
        for ch in c {
            p.write_f32_le(ch);
        }
    }

    fn write_stroke(p: &mut Writer, s: &Stroke) {
        Self::write_rgba(p, s.color);
        p.write_u32_le(u32::from(s.enabled));
        p.write_f32_le(s.width_px);
    }

    /// Appends an `UpsertRect`.
    pub fn upsert_rect(&mut self, id: EntityId, rect: &Rect) {
        let mut p = Writer::default();
        p.write_f32_le(rect.pos.x);
        p.write_f32_le(rect.pos.y);
        p.write_f32_le(rect.size.x);
        p.write_f32_le(rect.size.y);
        p.write_f32_le(rect.rotation);
        Self::write_rgba(&mut p, rect.fill);
        Self::write_stroke(&mut p, &rect.stroke);
        self.record(op::UPSERT_RECT, id, &p);
    }

    /// Appends an `UpsertLine`.
    pub fn upsert_line(&mut self, id: EntityId, line: &Line) {
        let mut p = Writer::default();
        p.write_f32_le(line.a.x);
        p.write_f32_le(line.a.y);
        p.write_f32_le(line.b.x);
        p.write_f32_le(line.b.y);
        Self::write_stroke(&mut p, &line.stroke);
        self.record(op::UPSERT_LINE, id, &p);
    }

    /// Appends an `UpsertPolyline` carrying its points inline.
    pub fn upsert_polyline(
        &mut self,
        id: EntityId,
        points: &[Vec2],
        fill: ColorRgba,
        stroke: &Stroke,
    ) {
        let mut p = Writer::default();
        p.write_u32_le(points.len() as u32);
        for pt in points {
            p.write_f32_le(pt.x);
            p.write_f32_le(pt.y);
        }
        Self::write_rgba(&mut p, fill);
        Self::write_stroke(&mut p, stroke);
        self.record(op::UPSERT_POLYLINE, id, &p);
    }

    /// Appends an `UpsertCircle`.
    pub fn upsert_circle(&mut self, id: EntityId, circle: &Circle) {
        let mut p = Writer::default();
        p.write_f32_le(circle.center.x);
        p.write_f32_le(circle.center.y);
        p.write_f32_le(circle.radius.x);
        p.write_f32_le(circle.radius.y);
        p.write_f32_le(circle.rotation);
        p.write_f32_le(circle.scale);
        Self::write_rgba(&mut p, circle.fill);
        Self::write_stroke(&mut p, &circle.stroke);
        self.record(op::UPSERT_CIRCLE, id, &p);
    }

    /// Appends an `UpsertPolygon`.
    pub fn upsert_polygon(&mut self, id: EntityId, polygon: &Polygon) {
        let mut p = Writer::default();
        p.write_f32_le(polygon.center.x);
        p.write_f32_le(polygon.center.y);
        p.write_f32_le(polygon.radius.x);
        p.write_f32_le(polygon.radius.y);
        p.write_f32_le(polygon.rotation);
        p.write_f32_le(polygon.scale);
        p.write_u32_le(polygon.sides);
        Self::write_rgba(&mut p, polygon.fill);
        Self::write_stroke(&mut p, &polygon.stroke);
        self.record(op::UPSERT_POLYGON, id, &p);
    }

    /// Appends an `UpsertArrow`.
    pub fn upsert_arrow(&mut self, id: EntityId, arrow: &Arrow) {
        let mut p = Writer::default();
        p.write_f32_le(arrow.a.x);
        p.write_f32_le(arrow.a.y);
        p.write_f32_le(arrow.b.x);
        p.write_f32_le(arrow.b.y);
        p.write_f32_le(arrow.head_size);
        Self::write_stroke(&mut p, &arrow.stroke);
        self.record(op::UPSERT_ARROW, id, &p);
    }

    /// Appends an `UpsertSymbol`.
    pub fn upsert_symbol(&mut self, id: EntityId, symbol: &Symbol) {
        let mut p = Writer::default();
        p.write_u32_le(symbol.library_key);
        p.write_f32_le(symbol.pos.x);
        p.write_f32_le(symbol.pos.y);
        p.write_f32_le(symbol.size.x);
        p.write_f32_le(symbol.size.y);
        p.write_f32_le(symbol.rotation);
        p.write_f32_le(symbol.scale);
        p.write_f32_le(symbol.anchor_uv.x);
        p.write_f32_le(symbol.anchor_uv.y);
        self.record(op::UPSERT_SYMBOL, id, &p);
    }

    /// Appends an `UpsertNode`.
    pub fn upsert_node(&mut self, id: EntityId, node: &NodePoint) {
        let mut p = Writer::default();
        match node.anchor {
            NodeAnchor::Free(pos) => {
                p.write_u32_le(0);
                p.write_f32_le(pos.x);
                p.write_f32_le(pos.y);
                p.write_u32_le(0);
            }
            NodeAnchor::Anchored(symbol) => {
                p.write_u32_le(1);
                p.write_f32_le(0.0);
                p.write_f32_le(0.0);
                p.write_u32_le(symbol.0);
            }
        }
        self.record(op::UPSERT_NODE, id, &p);
    }

    /// Appends an `UpsertConduit`.
    pub fn upsert_conduit(&mut self, id: EntityId, conduit: &Conduit) {
        let mut p = Writer::default();
        p.write_u32_le(conduit.from.0);
        p.write_u32_le(conduit.to.0);
        Self::write_stroke(&mut p, &conduit.stroke);
        self.record(op::UPSERT_CONDUIT, id, &p);
    }

    /// Appends an `UpsertText`. Runtime-only fields are not encoded.
    pub fn upsert_text(&mut self, id: EntityId, text: &Text) {
        let mut p = Writer::default();
        p.write_f32_le(text.pos.x);
        p.write_f32_le(text.pos.y);
        p.write_f32_le(text.rotation);
        p.write_u32_le(text.box_mode as u32);
        p.write_f32_le(text.constraint_width);
        p.write_u32_le(text.align as u32);
        p.write_len_prefixed_bytes(text.content.as_bytes());
        p.write_u32_le(text.runs.len() as u32);
        for run in &text.runs {
            p.write_u32_le(run.start);
            p.write_u32_le(run.len);
            p.write_u32_le(run.font);
            p.write_f32_le(run.size_pt);
            p.write_u32_le(run.color);
            p.write_u32_le(u32::from(run.flags.bits()));
        }
        self.record(op::UPSERT_TEXT, id, &p);
    }

    /// Appends an `InsertContent`.
    pub fn insert_content(&mut self, id: EntityId, at: u32, content: &str) {
        let mut p = Writer::default();
        p.write_u32_le(at);
        p.write_len_prefixed_bytes(content.as_bytes());
        self.record(op::INSERT_CONTENT, id, &p);
    }

    /// Appends a `DeleteContent`.
    pub fn delete_content(&mut self, id: EntityId, start: u32, end: u32) {
        let mut p = Writer::default();
        p.write_u32_le(start);
        p.write_u32_le(end);
        self.record(op::DELETE_CONTENT, id, &p);
    }

    /// Appends a `SetCaret`.
    pub fn set_caret(&mut self, id: EntityId, caret: u32) {
        let mut p = Writer::default();
        p.write_u32_le(caret);
        self.record(op::SET_CARET, id, &p);
    }

    /// Appends a `SetSelection`.
    pub fn set_selection(&mut self, id: EntityId, start: u32, end: u32) {
        let mut p = Writer::default();
        p.write_u32_le(start);
        p.write_u32_le(end);
        self.record(op::SET_SELECTION, id, &p);
    }

    /// Appends an `ApplyStyle`.
    pub fn apply_style(&mut self, id: EntityId, patch: &ApplyStylePatch) {
        let mut p = Writer::default();
        p.write_u32_le(patch.start);
        p.write_u32_le(patch.end);
        p.write_u32_le(u32::from(patch.set_flags.bits()));
        p.write_u32_le(u32::from(patch.clear_flags.bits()));
        let mut fields = 0u32;
        if patch.font.is_some() {
            fields |= style_field::FONT;
        }
        if patch.size_pt.is_some() {
            fields |= style_field::SIZE;
        }
        if patch.color.is_some() {
            fields |= style_field::COLOR;
        }
        p.write_u32_le(fields);
        p.write_u32_le(patch.font.unwrap_or(0));
        p.write_f32_le(patch.size_pt.unwrap_or(0.0));
        p.write_u32_le(patch.color.unwrap_or(0));
        self.record(op::APPLY_STYLE, id, &p);
    }

    /// Appends a `SetAlign`.
    pub fn set_align(&mut self, id: EntityId, align: TextAlign) {
        let mut p = Writer::default();
        p.write_u32_le(align as u32);
        self.record(op::SET_ALIGN, id, &p);
    }

    /// Finishes the buffer.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.w.into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stroke() -> Stroke {
        Stroke {
            color: [0.0, 0.0, 0.0, 1.0],
            enabled: true,
            width_px: 1.0,
        }
    }

    #[test]
    fn rect_round_trips_through_the_stream() {
        let rect = Rect {
            pos: Vec2::new(1.0, 2.0),
            size: Vec2::new(3.0, 4.0),
            rotation: 0.5,
            fill: [1.0, 0.0, 0.0, 1.0],
            stroke: stroke(),
        };
        let mut w = CommandWriter::new();
        w.upsert_rect(EntityId(7), &rect);
        let cmds = decode_command_buffer(&w.finish()).unwrap();
        assert_eq!(cmds, vec![Command::UpsertRect { id: EntityId(7), rect }]);
    }

    #[test]
    fn bare_buffer_without_preamble_decodes() {
        let mut w = CommandWriter::bare();
        w.clear_all();
        let cmds = decode_command_buffer(&w.finish()).unwrap();
        assert_eq!(cmds, vec![Command::ClearAll]);
    }

    #[test]
    fn wrong_version_is_rejected() {
        let mut raw = Writer::default();
        raw.write_u32_le(COMMAND_MAGIC);
        raw.write_u32_le(99);
        assert_eq!(
            decode_command_buffer(&raw.into_vec()),
            Err(WireError::UnsupportedVersion(99))
        );
    }

    #[test]
    fn unknown_op_is_rejected() {
        let mut raw = Writer::default();
        raw.write_u32_le(0xBEEF);
        raw.write_u32_le(1);
        raw.write_u32_le(0);
        assert_eq!(
            decode_command_buffer(&raw.into_vec()),
            Err(WireError::UnknownCommand(0xBEEF))
        );
    }

    #[test]
    fn short_payload_is_invalid() {
        let mut raw = Writer::default();
        raw.write_u32_le(op::SET_VIEW_SCALE);
        raw.write_u32_le(0);
        raw.write_u32_le(2); // declared 2 bytes, f32 needs 4
        raw.write_u16_le(0);
        assert_eq!(
            decode_command_buffer(&raw.into_vec()),
            Err(WireError::InvalidPayloadSize)
        );
    }

    #[test]
    fn oversized_payload_is_invalid() {
        let mut raw = Writer::default();
        raw.write_u32_le(op::SET_VIEW_SCALE);
        raw.write_u32_le(0);
        raw.write_u32_le(8);
        raw.write_f32_le(1.0);
        raw.write_f32_le(2.0);
        assert_eq!(
            decode_command_buffer(&raw.into_vec()),
            Err(WireError::InvalidPayloadSize)
        );
    }

    #[test]
    fn degenerate_polyline_is_a_delete() {
        let mut w = CommandWriter::new();
        w.upsert_polyline(EntityId(5), &[Vec2::ZERO], [0.0; 4], &stroke());
        let cmds = decode_command_buffer(&w.finish()).unwrap();
        assert_eq!(cmds, vec![Command::DeleteEntity { id: EntityId(5) }]);
    }

    #[test]
    fn truncated_record_header_fails() {
        let mut w = CommandWriter::bare();
        w.clear_all();
        let mut bytes = w.finish();
        bytes.extend_from_slice(&[1, 0]); // half a header
        assert_eq!(
            decode_command_buffer(&bytes),
            Err(WireError::BufferTruncated)
        );
    }

    #[test]
    fn style_patch_tri_state_round_trip() {
        let patch = ApplyStylePatch {
            start: 1,
            end: 4,
            set_flags: StyleFlags::BOLD,
            clear_flags: StyleFlags::ITALIC,
            font: None,
            size_pt: Some(18.0),
            color: None,
        };
        let mut w = CommandWriter::new();
        w.apply_style(EntityId(3), &patch);
        let cmds = decode_command_buffer(&w.finish()).unwrap();
        assert_eq!(
            cmds,
            vec![Command::ApplyStyle {
                id: EntityId(3),
                patch
            }]
        );
    }
}
