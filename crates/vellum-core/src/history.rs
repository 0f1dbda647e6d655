// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Append-only undo/redo log.
//!
//! Entries hold full before/after records per touched id (a `None` side is
//! the creation/deletion sentinel) plus optional world-level fields (draw
//! order, view scale). The log is bounded: overflow drops the oldest entry
//! and advances the base, so very old edits become unreachable rather than
//! unbounded.

use std::collections::VecDeque;

use vellum_geom::Vec2;
use vellum_model::{
    Arrow, Circle, ColorRgba, Conduit, EntityId, EntityKind, Line, NodePoint, Polygon, Polyline,
    Rect, Stroke, Symbol, Text, World,
};

/// Default bound on retained entries.
pub const HISTORY_CAPACITY: usize = 256;

/// Full captured value of one entity, pool-independent.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityState {
    /// Captured rectangle.
    Rect(Rect),
    /// Captured line.
    Line(Line),
    /// Captured polyline with its points copied out of the pool.
    Polyline {
        /// The points themselves.
        points: Vec<Vec2>,
        /// Fill color.
        fill: ColorRgba,
        /// Stroke styling.
        stroke: Stroke,
    },
    /// Captured ellipse.
    Circle(Circle),
    /// Captured polygon.
    Polygon(Polygon),
    /// Captured arrow.
    Arrow(Arrow),
    /// Captured symbol placement.
    Symbol(Symbol),
    /// Captured node.
    Node(NodePoint),
    /// Captured conduit.
    Conduit(Conduit),
    /// Captured text block.
    Text(Text),
}

/// Captures the current value of an entity, if it exists.
#[must_use]
pub fn capture_entity(world: &World, id: EntityId) -> Option<EntityState> {
    let entry = world.entity_ref(id)?;
    let state = match entry.kind {
        EntityKind::Rect => EntityState::Rect(*world.find_rect(id)?),
        EntityKind::Line => EntityState::Line(*world.find_line(id)?),
        EntityKind::Polyline => {
            let poly = world.find_polyline(id)?;
            EntityState::Polyline {
                points: world.polyline_points(poly).to_vec(),
                fill: poly.fill,
                stroke: poly.stroke,
            }
        }
        EntityKind::Circle => EntityState::Circle(*world.find_circle(id)?),
        EntityKind::Polygon => EntityState::Polygon(*world.find_polygon(id)?),
        EntityKind::Arrow => EntityState::Arrow(*world.find_arrow(id)?),
        EntityKind::Symbol => EntityState::Symbol(*world.find_symbol(id)?),
        EntityKind::Node => EntityState::Node(*world.find_node(id)?),
        EntityKind::Conduit => EntityState::Conduit(*world.find_conduit(id)?),
        EntityKind::Text => EntityState::Text(world.find_text(id)?.clone()),
    };
    Some(state)
}

/// Writes a captured value back into the world; `None` deletes.
pub fn apply_entity(world: &mut World, id: EntityId, state: Option<&EntityState>) {
    match state {
        None => {
            world.delete(id);
        }
        Some(EntityState::Rect(v)) => world.upsert_rect(id, *v),
        Some(EntityState::Line(v)) => world.upsert_line(id, *v),
        Some(EntityState::Polyline {
            points,
            fill,
            stroke,
        }) => {
            let offset = world.append_points(points);
            world.upsert_polyline(
                id,
                Polyline {
                    offset,
                    count: points.len() as u32,
                    fill: *fill,
                    stroke: *stroke,
                },
            );
        }
        Some(EntityState::Circle(v)) => world.upsert_circle(id, *v),
        Some(EntityState::Polygon(v)) => world.upsert_polygon(id, *v),
        Some(EntityState::Arrow(v)) => world.upsert_arrow(id, *v),
        Some(EntityState::Symbol(v)) => world.upsert_symbol(id, *v),
        Some(EntityState::Node(v)) => world.upsert_node(id, *v),
        Some(EntityState::Conduit(v)) => world.upsert_conduit(id, *v),
        Some(EntityState::Text(v)) => world.upsert_text(id, v.clone()),
    }
}

/// One touched id inside a history entry.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityChange {
    /// The entity.
    pub id: EntityId,
    /// Value before the mutation; `None` when the mutation created it.
    pub before: Option<EntityState>,
    /// Value after the mutation; `None` when the mutation deleted it.
    pub after: Option<EntityState>,
}

/// One reversible log entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryEntry {
    /// Per-entity before/after records.
    pub changes: Vec<EntityChange>,
    /// Draw order before/after, when the entry moved it.
    pub draw_order: Option<(Vec<EntityId>, Vec<EntityId>)>,
    /// View scale before/after, when the entry changed it.
    pub view_scale: Option<(f32, f32)>,
}

impl HistoryEntry {
    /// Whether the entry records no effect.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.draw_order.is_none() && self.view_scale.is_none()
    }

    /// Reverts this entry against the world (undo direction).
    pub fn revert(&self, world: &mut World) {
        for change in self.changes.iter().rev() {
            apply_entity(world, change.id, change.before.as_ref());
        }
        if let Some((before, _)) = &self.draw_order {
            world.set_draw_order(before);
        }
        if let Some((before, _)) = self.view_scale {
            world.set_view_scale(before);
        }
        world.compact_points();
    }

    /// Re-applies this entry against the world (redo direction).
    pub fn reapply(&self, world: &mut World) {
        for change in &self.changes {
            apply_entity(world, change.id, change.after.as_ref());
        }
        if let Some((_, after)) = &self.draw_order {
            world.set_draw_order(after);
        }
        if let Some((_, after)) = self.view_scale {
            world.set_view_scale(after);
        }
        world.compact_points();
    }
}

/// The bounded log with its cursor.
#[derive(Debug)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    cursor: usize,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl History {
    /// Creates a log bounded to `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: 0,
            capacity: capacity.max(1),
        }
    }

    /// Appends an entry, truncating the redo tail. Overflow drops the
    /// oldest entry and advances the base.
    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.truncate(self.cursor);
        self.entries.push_back(entry);
        if self.entries.len() > self.capacity {
            self.entries.pop_front();
        } else {
            self.cursor += 1;
            return;
        }
        self.cursor = self.entries.len();
    }

    /// Whether an undo step exists.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Whether a redo step exists.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    /// Steps the cursor back, returning the entry to revert.
    pub fn step_back(&mut self) -> Option<&HistoryEntry> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    /// Steps the cursor forward, returning the entry to reapply.
    pub fn step_forward(&mut self) -> Option<&HistoryEntry> {
        let entry = self.entries.get(self.cursor)?;
        self.cursor += 1;
        Some(entry)
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current cursor (entries applied).
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Drops everything.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f32) -> Rect {
        Rect {
            pos: Vec2::new(x, 0.0),
            size: Vec2::new(1.0, 1.0),
            rotation: 0.0,
            fill: [1.0; 4],
            stroke: Stroke::default(),
        }
    }

    fn create_entry(id: EntityId, after: Rect) -> HistoryEntry {
        HistoryEntry {
            changes: vec![EntityChange {
                id,
                before: None,
                after: Some(EntityState::Rect(after)),
            }],
            ..HistoryEntry::default()
        }
    }

    #[test]
    fn undo_of_create_deletes() {
        let mut world = World::new();
        let entry = create_entry(EntityId(1), rect(0.0));
        entry.reapply(&mut world);
        assert!(world.find_rect(EntityId(1)).is_some());
        entry.revert(&mut world);
        assert!(world.find_rect(EntityId(1)).is_none());
    }

    #[test]
    fn cursor_walks_back_and_forward() {
        let mut h = History::default();
        h.push(create_entry(EntityId(1), rect(0.0)));
        h.push(create_entry(EntityId(2), rect(1.0)));
        assert!(h.can_undo());
        assert!(!h.can_redo());
        assert!(h.step_back().is_some());
        assert!(h.can_redo());
        assert!(h.step_forward().is_some());
        assert!(!h.can_redo());
    }

    #[test]
    fn push_truncates_redo_tail() {
        let mut h = History::default();
        h.push(create_entry(EntityId(1), rect(0.0)));
        h.push(create_entry(EntityId(2), rect(1.0)));
        h.step_back();
        h.push(create_entry(EntityId(3), rect(2.0)));
        assert_eq!(h.len(), 2);
        assert!(!h.can_redo());
    }

    #[test]
    fn overflow_drops_oldest() {
        let mut h = History::with_capacity(2);
        h.push(create_entry(EntityId(1), rect(0.0)));
        h.push(create_entry(EntityId(2), rect(1.0)));
        h.push(create_entry(EntityId(3), rect(2.0)));
        assert_eq!(h.len(), 2);
        assert_eq!(h.cursor(), 2);
        // Two undos exhaust the log.
        assert!(h.step_back().is_some());
        assert!(h.step_back().is_some());
        assert!(h.step_back().is_none());
    }

    #[test]
    fn polyline_state_round_trips_through_pool() {
        let mut world = World::new();
        let points = vec![Vec2::ZERO, Vec2::new(1.0, 1.0), Vec2::new(2.0, 0.0)];
        let state = EntityState::Polyline {
            points: points.clone(),
            fill: [0.0; 4],
            stroke: Stroke::default(),
        };
        apply_entity(&mut world, EntityId(5), Some(&state));
        let captured = capture_entity(&world, EntityId(5)).unwrap();
        assert_eq!(captured, state);
    }
}
