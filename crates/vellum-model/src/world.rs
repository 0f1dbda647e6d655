// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The entity store: typed tables, id index, draw order, point pool.
//!
//! Determinism contract
//! - The id index is an `FxHashMap` whose iteration order is never observed;
//!   every externally visible ordering comes from the typed tables (storage
//!   order) or the explicit draw order.
//! - Deletes are swap-with-last; the moved row's index entry is rewritten in
//!   the same operation so the index never dangles.
//! - The polyline point pool only grows during a command batch and is
//!   compacted afterwards in polyline storage order, discarding unreferenced
//!   ranges and rewriting offsets.

use rustc_hash::FxHashMap;
use vellum_geom::{Aabb, Vec2};

use crate::{
    Arrow, Circle, Conduit, EntityId, Line, NodeAnchor, NodePoint, Polygon, Polyline, Rect, Symbol,
    Text,
};

/// Entity kind tag.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum EntityKind {
    /// Rectangle.
    Rect = 0,
    /// Line segment.
    Line = 1,
    /// Polyline over the shared point pool.
    Polyline = 2,
    /// Ellipse.
    Circle = 3,
    /// Regular polygon.
    Polygon = 4,
    /// Arrow.
    Arrow = 5,
    /// Symbol-library placement.
    Symbol = 6,
    /// Connection node.
    Node = 7,
    /// Conduit between nodes.
    Conduit = 8,
    /// Rich text block.
    Text = 9,
}

/// Drawable kinds, in tag order. Symbols and nodes are excluded: symbols are
/// drawn through their library record, nodes only contribute resolved
/// positions.
pub const DRAWABLE_KINDS: [EntityKind; 8] = [
    EntityKind::Rect,
    EntityKind::Line,
    EntityKind::Polyline,
    EntityKind::Circle,
    EntityKind::Polygon,
    EntityKind::Arrow,
    EntityKind::Conduit,
    EntityKind::Text,
];

impl EntityKind {
    /// Whether entities of this kind appear in the draw order.
    #[must_use]
    pub fn is_drawable(self) -> bool {
        !matches!(self, Self::Symbol | Self::Node)
    }
}

/// Index entry: which table an id lives in, and where.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EntityRef {
    /// Table the entity lives in.
    pub kind: EntityKind,
    /// Row position inside the typed table.
    pub index: u32,
}

/// A typed table: parallel id and row vectors, contiguous, swap-removed.
#[derive(Debug, Clone, PartialEq)]
struct Table<T> {
    ids: Vec<EntityId>,
    rows: Vec<T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            ids: Vec::new(),
            rows: Vec::new(),
        }
    }
}

impl<T> Table<T> {
    fn len(&self) -> usize {
        self.rows.len()
    }

    fn push(&mut self, id: EntityId, row: T) -> u32 {
        self.ids.push(id);
        self.rows.push(row);
        (self.rows.len() - 1) as u32
    }

    fn get(&self, index: u32) -> Option<&T> {
        self.rows.get(index as usize)
    }

    fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        self.rows.get_mut(index as usize)
    }

    fn set(&mut self, index: u32, row: T) {
        if let Some(slot) = self.rows.get_mut(index as usize) {
            *slot = row;
        }
    }

    /// Swap-removes the row at `index`. Returns the id of the row that moved
    /// into its place, if any.
    fn swap_remove(&mut self, index: u32) -> Option<EntityId> {
        let idx = index as usize;
        if idx >= self.rows.len() {
            return None;
        }
        self.rows.swap_remove(idx);
        self.ids.swap_remove(idx);
        self.ids.get(idx).copied()
    }

    fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.ids.iter().copied().zip(self.rows.iter())
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.ids.iter().copied().zip(self.rows.iter_mut())
    }

    fn clear(&mut self) {
        self.ids.clear();
        self.rows.clear();
    }

    fn reserve(&mut self, additional: usize) {
        self.ids.reserve(additional);
        self.rows.reserve(additional);
    }
}

/// Position/rotation/scale record returned by transform queries.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct EntityTransform {
    /// Transform origin (anchor corner or center, kind-dependent).
    pub origin: Vec2,
    /// Rotation in radians about the origin.
    pub rotation: f32,
    /// Per-axis scale or extent, kind-dependent.
    pub scale: Vec2,
}

/// The world: every typed table plus the shared structures that bind them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct World {
    rects: Table<Rect>,
    lines: Table<Line>,
    polylines: Table<Polyline>,
    circles: Table<Circle>,
    polygons: Table<Polygon>,
    arrows: Table<Arrow>,
    symbols: Table<Symbol>,
    nodes: Table<NodePoint>,
    conduits: Table<Conduit>,
    texts: Table<Text>,
    index: FxHashMap<EntityId, EntityRef>,
    draw_order: Vec<EntityId>,
    points: Vec<Vec2>,
    view_scale: f32,
    next_id: u32,
}

macro_rules! kind_tables {
    ($macro_cb:ident) => {
        $macro_cb! {
            (Rect, rects, upsert_rect, find_rect, find_rect_mut, Rect),
            (Line, lines, upsert_line, find_line, find_line_mut, Line),
            (Polyline, polylines, upsert_polyline, find_polyline, find_polyline_mut, Polyline),
            (Circle, circles, upsert_circle, find_circle, find_circle_mut, Circle),
            (Polygon, polygons, upsert_polygon, find_polygon, find_polygon_mut, Polygon),
            (Arrow, arrows, upsert_arrow, find_arrow, find_arrow_mut, Arrow),
            (Symbol, symbols, upsert_symbol, find_symbol, find_symbol_mut, Symbol),
            (Node, nodes, upsert_node, find_node, find_node_mut, NodePoint),
            (Conduit, conduits, upsert_conduit, find_conduit, find_conduit_mut, Conduit),
            (Text, texts, upsert_text, find_text, find_text_mut, Text),
        }
    };
}

macro_rules! impl_table_ops {
    ($(($kind:ident, $table:ident, $upsert:ident, $find:ident, $find_mut:ident, $row:ident),)*) => {
        impl World {
            $(
                /// Inserts or replaces the entity under `id`. An existing
                /// entity of a different kind is deleted first.
                pub fn $upsert(&mut self, id: EntityId, row: $row) {
                    debug_assert!(id.is_valid(), "nil id in upsert");
                    self.note_id(id);
                    if let Some(entry) = self.index.get(&id).copied() {
                        if entry.kind == EntityKind::$kind {
                            self.$table.set(entry.index, row);
                            return;
                        }
                        self.delete(id);
                    }
                    let index = self.$table.push(id, row);
                    self.index.insert(id, EntityRef { kind: EntityKind::$kind, index });
                    if EntityKind::$kind.is_drawable() {
                        self.draw_order.push(id);
                    }
                }

                /// Looks up the entity under `id` if it is of this kind.
                #[must_use]
                pub fn $find(&self, id: EntityId) -> Option<&$row> {
                    let entry = self.index.get(&id)?;
                    if entry.kind != EntityKind::$kind {
                        return None;
                    }
                    self.$table.get(entry.index)
                }

                /// Mutable lookup of the entity under `id` if it is of this kind.
                #[must_use]
                pub fn $find_mut(&mut self, id: EntityId) -> Option<&mut $row> {
                    let entry = self.index.get(&id).copied()?;
                    if entry.kind != EntityKind::$kind {
                        return None;
                    }
                    self.$table.get_mut(entry.index)
                }
            )*

            /// Removes the entity under `id`. Returns `false` when absent.
            pub fn delete(&mut self, id: EntityId) -> bool {
                let Some(entry) = self.index.remove(&id) else {
                    return false;
                };
                let moved = match entry.kind {
                    $(EntityKind::$kind => self.$table.swap_remove(entry.index),)*
                };
                if let Some(moved_id) = moved {
                    if let Some(moved_entry) = self.index.get_mut(&moved_id) {
                        moved_entry.index = entry.index;
                    }
                }
                if entry.kind.is_drawable() {
                    self.draw_order.retain(|d| *d != id);
                }
                true
            }

            /// Number of live entities of `kind`.
            #[must_use]
            pub fn count(&self, kind: EntityKind) -> usize {
                match kind {
                    $(EntityKind::$kind => self.$table.len(),)*
                }
            }
        }
    };
}

kind_tables!(impl_table_ops);

macro_rules! impl_iters {
    ($(($kind:ident, $table:ident, $iter:ident, $row:ident),)*) => {
        impl World {
            $(
                /// Iterates the table in storage order.
                pub fn $iter(&self) -> impl Iterator<Item = (EntityId, &$row)> {
                    self.$table.iter()
                }
            )*
        }
    };
}

impl_iters! {
    (Rect, rects, iter_rects, Rect),
    (Line, lines, iter_lines, Line),
    (Polyline, polylines, iter_polylines, Polyline),
    (Circle, circles, iter_circles, Circle),
    (Polygon, polygons, iter_polygons, Polygon),
    (Arrow, arrows, iter_arrows, Arrow),
    (Symbol, symbols, iter_symbols, Symbol),
    (Node, nodes, iter_nodes, NodePoint),
    (Conduit, conduits, iter_conduits, Conduit),
    (Text, texts, iter_texts, Text),
}

impl World {
    /// Creates an empty world with view scale 1.0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            view_scale: 1.0,
            next_id: 1,
            ..Self::default()
        }
    }

    /// Empties every table, the draw order, and the point pool; resets the
    /// view scale to 1.0. Allocated ids are not reused.
    pub fn clear(&mut self) {
        self.rects.clear();
        self.lines.clear();
        self.polylines.clear();
        self.circles.clear();
        self.polygons.clear();
        self.arrows.clear();
        self.symbols.clear();
        self.nodes.clear();
        self.conduits.clear();
        self.texts.clear();
        self.index.clear();
        self.draw_order.clear();
        self.points.clear();
        self.view_scale = 1.0;
    }

    /// Pre-reserves table and pool capacity. Not a hard cap.
    pub fn reserve(&mut self, rects: usize, lines: usize, polylines: usize, points: usize) {
        self.rects.reserve(rects);
        self.lines.reserve(lines);
        self.polylines.reserve(polylines);
        self.points.reserve(points);
    }

    /// Total live entity count across all tables.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.index.len()
    }

    /// Looks up the index entry for `id`.
    #[must_use]
    pub fn entity_ref(&self, id: EntityId) -> Option<EntityRef> {
        self.index.get(&id).copied()
    }

    /// Current view scale.
    #[must_use]
    pub fn view_scale(&self) -> f32 {
        self.view_scale
    }

    /// Sets the view scale, clamped to a small positive finite range.
    /// Non-finite input falls back to 1.0.
    pub fn set_view_scale(&mut self, scale: f32) {
        self.view_scale = if scale.is_finite() {
            scale.clamp(1e-4, 1e4)
        } else {
            1.0
        };
    }

    /// Records an externally supplied id so engine-allocated ids stay above
    /// everything the command stream has used.
    pub fn note_id(&mut self, id: EntityId) {
        if id.0 >= self.next_id {
            self.next_id = id.0.saturating_add(1);
        }
    }

    /// Allocates a fresh id (monotonic, never 0).
    pub fn alloc_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    // ── Draw order ──────────────────────────────────────────────────

    /// The current draw order, back to front.
    #[must_use]
    pub fn draw_order(&self) -> &[EntityId] {
        &self.draw_order
    }

    /// Replaces the draw order. Ids that are unknown or not drawable are
    /// dropped; live drawables missing from `ids` are appended in ascending
    /// id order so every drawable keeps exactly one slot.
    pub fn set_draw_order(&mut self, ids: &[EntityId]) {
        let mut seen: Vec<EntityId> = Vec::with_capacity(ids.len());
        let mut order: Vec<EntityId> = Vec::with_capacity(self.draw_order.len());
        for id in ids {
            let valid = self
                .index
                .get(id)
                .is_some_and(|entry| entry.kind.is_drawable());
            if valid && !seen.contains(id) {
                seen.push(*id);
                order.push(*id);
            }
        }
        let mut missing: Vec<EntityId> = self
            .draw_order
            .iter()
            .copied()
            .filter(|id| !seen.contains(id))
            .collect();
        missing.sort_unstable();
        order.extend(missing);
        self.draw_order = order;
    }

    /// Rebuilds the draw order as ascending ids over all live drawables.
    /// Used after snapshot load, where draw order is not persisted.
    pub fn rebuild_draw_order_ascending(&mut self) {
        let mut order: Vec<EntityId> = self
            .index
            .iter()
            .filter(|(_, entry)| entry.kind.is_drawable())
            .map(|(id, _)| *id)
            .collect();
        order.sort_unstable();
        self.draw_order = order;
    }

    // ── Point pool ──────────────────────────────────────────────────

    /// Appends points to the shared pool, returning the start offset.
    pub fn append_points(&mut self, points: &[Vec2]) -> u32 {
        let offset = self.points.len() as u32;
        self.points.extend_from_slice(points);
        offset
    }

    /// The full point pool.
    #[must_use]
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// The pool slice referenced by a polyline; empty when out of range.
    #[must_use]
    pub fn polyline_points(&self, poly: &Polyline) -> &[Vec2] {
        let start = poly.offset as usize;
        let end = start + poly.count as usize;
        self.points.get(start..end).unwrap_or(&[])
    }

    /// Compacts the point pool: rebuilds it in polyline storage order so
    /// unreferenced ranges are discarded, rewriting offsets. After this the
    /// pool length equals the sum of live polyline counts.
    pub fn compact_points(&mut self) {
        let mut compacted: Vec<Vec2> = Vec::with_capacity(
            self.polylines
                .iter()
                .map(|(_, p)| p.count as usize)
                .sum(),
        );
        let old = core::mem::take(&mut self.points);
        for (_, poly) in self.polylines.iter_mut() {
            let start = poly.offset as usize;
            let end = start + poly.count as usize;
            let new_offset = compacted.len() as u32;
            if let Some(range) = old.get(start..end) {
                compacted.extend_from_slice(range);
            } else {
                // A range outside the pool means a decoder bug upstream;
                // degrade to an empty polyline rather than corrupt neighbors.
                debug_assert!(false, "polyline range outside point pool");
                poly.count = 0;
            }
            poly.offset = new_offset;
        }
        self.points = compacted;
    }

    // ── Resolution ──────────────────────────────────────────────────

    /// Resolves a node's world position. Free nodes return their stored
    /// position; anchored nodes resolve through the symbol's transform and
    /// connection anchor. `None` when the node or its symbol is missing.
    #[must_use]
    pub fn resolve_node_position(&self, id: EntityId) -> Option<Vec2> {
        let node = self.find_node(id)?;
        match node.anchor {
            NodeAnchor::Free(pos) => Some(pos),
            NodeAnchor::Anchored(symbol_id) => {
                Some(self.find_symbol(symbol_id)?.anchor_world())
            }
        }
    }

    /// Resolves both endpoints of a conduit.
    #[must_use]
    pub fn conduit_endpoints(&self, conduit: &Conduit) -> Option<(Vec2, Vec2)> {
        Some((
            self.resolve_node_position(conduit.from)?,
            self.resolve_node_position(conduit.to)?,
        ))
    }

    /// World-space bounding box of an entity, when it has one. Conduits with
    /// unresolved endpoints and unknown ids return `None`.
    #[must_use]
    pub fn entity_aabb(&self, id: EntityId) -> Option<Aabb> {
        let entry = self.entity_ref(id)?;
        match entry.kind {
            EntityKind::Rect => self.find_rect(id).map(Rect::aabb),
            EntityKind::Line => self.find_line(id).map(Line::aabb),
            EntityKind::Polyline => {
                let poly = self.find_polyline(id)?;
                Aabb::from_points(self.polyline_points(poly))
            }
            EntityKind::Circle => self.find_circle(id).map(Circle::aabb),
            EntityKind::Polygon => self.find_polygon(id).map(Polygon::aabb),
            EntityKind::Arrow => self.find_arrow(id).map(Arrow::aabb),
            EntityKind::Symbol => self.find_symbol(id).map(Symbol::aabb),
            EntityKind::Node => {
                let pos = self.resolve_node_position(id)?;
                Some(Aabb::from_corners(pos, pos))
            }
            EntityKind::Conduit => {
                let (a, b) = self.conduit_endpoints(self.find_conduit(id)?)?;
                Some(Aabb::from_corners(a, b))
            }
            EntityKind::Text => self.find_text(id).map(Text::aabb),
        }
    }

    /// Origin/rotation/scale record for an entity.
    #[must_use]
    pub fn entity_transform(&self, id: EntityId) -> Option<EntityTransform> {
        let entry = self.entity_ref(id)?;
        let t = match entry.kind {
            EntityKind::Rect => {
                let r = self.find_rect(id)?;
                EntityTransform { origin: r.pos, rotation: r.rotation, scale: r.size }
            }
            EntityKind::Line => {
                let l = self.find_line(id)?;
                EntityTransform { origin: l.a, rotation: 0.0, scale: l.b.sub(l.a) }
            }
            EntityKind::Polyline => {
                let bb = self.entity_aabb(id)?;
                EntityTransform {
                    origin: bb.min(),
                    rotation: 0.0,
                    scale: Vec2::new(bb.width(), bb.height()),
                }
            }
            EntityKind::Circle => {
                let c = self.find_circle(id)?;
                EntityTransform { origin: c.center, rotation: c.rotation, scale: c.scaled_radius() }
            }
            EntityKind::Polygon => {
                let p = self.find_polygon(id)?;
                EntityTransform {
                    origin: p.center,
                    rotation: p.rotation,
                    scale: p.radius.scale(p.scale),
                }
            }
            EntityKind::Arrow => {
                let a = self.find_arrow(id)?;
                EntityTransform { origin: a.a, rotation: 0.0, scale: a.b.sub(a.a) }
            }
            EntityKind::Symbol => {
                let s = self.find_symbol(id)?;
                EntityTransform {
                    origin: s.pos,
                    rotation: s.rotation,
                    scale: s.size.scale(s.scale),
                }
            }
            EntityKind::Node => {
                let pos = self.resolve_node_position(id)?;
                EntityTransform { origin: pos, rotation: 0.0, scale: Vec2::ZERO }
            }
            EntityKind::Conduit => {
                let (a, b) = self.conduit_endpoints(self.find_conduit(id)?)?;
                EntityTransform { origin: a, rotation: 0.0, scale: b.sub(a) }
            }
            EntityKind::Text => {
                let t = self.find_text(id)?;
                EntityTransform { origin: t.pos, rotation: t.rotation, scale: t.layout_size }
            }
        };
        Some(t)
    }

    /// Checks the cross-table invariants. Debug builds call this after every
    /// command batch; release builds only in tests.
    #[must_use]
    pub fn check_invariants(&self) -> bool {
        let sum = self.rects.len()
            + self.lines.len()
            + self.polylines.len()
            + self.circles.len()
            + self.polygons.len()
            + self.arrows.len()
            + self.symbols.len()
            + self.nodes.len()
            + self.conduits.len()
            + self.texts.len();
        if sum != self.index.len() {
            return false;
        }
        for id in &self.draw_order {
            let Some(entry) = self.index.get(id) else {
                return false;
            };
            if !entry.kind.is_drawable() {
                return false;
            }
        }
        for (_, poly) in self.polylines.iter() {
            let end = poly.offset as usize + poly.count as usize;
            if end > self.points.len() {
                return false;
            }
        }
        true
    }
}
