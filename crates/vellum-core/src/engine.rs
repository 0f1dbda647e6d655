// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The engine facade: command application, derived caches, sessions,
//! history, and the event ring behind one instance.
//!
//! Mutation protocol
//! - A command batch decodes completely before anything is applied, so a
//!   malformed buffer never half-mutates the world.
//! - Every successful mutation batch bumps the generation and sets both
//!   dirty bits; queries lazily rebuild the cache they serve and clear the
//!   matching bit.
//! - Interaction previews mutate the store in place but only `commit`
//!   writes history.

use vellum_geom::{Aabb, BroadPhase, LooseGrid, Rot2, Vec2};
use vellum_model::{EntityId, EntityTransform, Polyline, World};
use vellum_render::{
    build_selection_handles, build_selection_outline, build_snap_overlay, build_world, BufferMeta,
    RenderOutput, VertexBuffer,
};
use vellum_text::{
    apply_style, caret_geometry, delete_content, hit_test, insert_content, layout_text, set_caret,
    set_selection, CaretGeometry, FontProvider, FontRegistry, GlyphAtlas, HitResult,
    MonoProvider, StylePatch,
};
use vellum_wire::{decode_command_buffer, decode_snapshot, encode_snapshot, Command, EventRecord};

use crate::error::EngineError;
use crate::events::{EventQueue, EventType, EVENT_CAPACITY};
use crate::history::{
    capture_entity, EntityChange, EntityState, History, HistoryEntry, HISTORY_CAPACITY,
};
use crate::pick::{pick_point, query_area, query_marquee, MarqueeMode, PickRecord};
use crate::session::{
    draft_state, modifier, resize_factors, rotate_delta, rotate_state, scale_state,
    translate_state, CommitOp, CommitResult, DraftKind, Session, SessionKind, TransformMode,
};
use crate::snap::{snap_candidates, SnapOptions};
use crate::stats::{Clock, EngineStats, NullClock};
use crate::telemetry;

/// Snap capture radius in screen pixels.
pub const SNAP_RADIUS_PX: f32 = 10.0;

/// Meta record for the snapshot byte block.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct SnapshotMeta {
    /// Generation the bytes were built at.
    pub generation: u32,
    /// Length of the block in bytes.
    pub byte_count: u32,
}

/// Meta record for the history log.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct HistoryMeta {
    /// Retained entries.
    pub len: u32,
    /// Cursor position.
    pub cursor: u32,
    /// Whether undo is possible.
    pub can_undo: bool,
    /// Whether redo is possible.
    pub can_redo: bool,
}

/// Fluent builder for [`Engine`] instances.
pub struct EngineBuilder {
    history_capacity: usize,
    event_capacity: usize,
    snap: SnapOptions,
    selection_tolerance_scale: f32,
    provider: Box<dyn FontProvider>,
    clock: Box<dyn Clock>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    /// Starts a builder with the documented defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            history_capacity: HISTORY_CAPACITY,
            event_capacity: EVENT_CAPACITY,
            snap: SnapOptions::default(),
            selection_tolerance_scale: 1.0,
            provider: Box::new(MonoProvider),
            clock: Box::new(NullClock),
        }
    }

    /// Bounds the history log.
    #[must_use]
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity.max(1);
        self
    }

    /// Bounds the event ring (tests shrink it; production keeps 2048).
    #[must_use]
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Sets the initial snap options.
    #[must_use]
    pub fn snap_options(mut self, snap: SnapOptions) -> Self {
        self.snap = snap;
        self
    }

    /// Scales pick tolerances (accessibility knob).
    #[must_use]
    pub fn selection_tolerance_scale(mut self, scale: f32) -> Self {
        if scale.is_finite() && scale > 0.0 {
            self.selection_tolerance_scale = scale;
        }
        self
    }

    /// Injects the font metrics/rasterization port.
    #[must_use]
    pub fn font_provider(mut self, provider: impl FontProvider + 'static) -> Self {
        self.provider = Box::new(provider);
        self
    }

    /// Injects the timing clock.
    #[must_use]
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Builds the engine.
    #[must_use]
    pub fn build(self) -> Engine {
        Engine {
            world: World::new(),
            generation: 0,
            snapshot_dirty: false,
            render_dirty: true,
            spatial_dirty: true,
            render_cache: RenderOutput::default(),
            snapshot_cache: Vec::new(),
            grid: LooseGrid::default(),
            selection: Vec::new(),
            session: None,
            history: History::with_capacity(self.history_capacity),
            events: EventQueue::with_capacity(self.event_capacity),
            atlas: GlyphAtlas::new(),
            fonts: FontRegistry::new(),
            provider: self.provider,
            clock: self.clock,
            snap: self.snap,
            selection_tolerance_scale: self.selection_tolerance_scale,
            commit_result: CommitResult::default(),
            outline_cache: VertexBuffer::new(),
            handle_cache: VertexBuffer::new(),
            snap_cache: VertexBuffer::new(),
            snap_probe: None,
            last_error: None,
            apply_ms: 0.0,
            rebuild_ms: 0.0,
            load_ms: 0.0,
        }
    }
}

/// The engine instance. See the crate docs for the operation contract.
pub struct Engine {
    world: World,
    generation: u32,
    snapshot_dirty: bool,
    render_dirty: bool,
    spatial_dirty: bool,
    render_cache: RenderOutput,
    snapshot_cache: Vec<u8>,
    grid: LooseGrid,
    selection: Vec<EntityId>,
    session: Option<Session>,
    history: History,
    events: EventQueue,
    atlas: GlyphAtlas,
    fonts: FontRegistry,
    provider: Box<dyn FontProvider>,
    clock: Box<dyn Clock>,
    snap: SnapOptions,
    selection_tolerance_scale: f32,
    commit_result: CommitResult,
    outline_cache: VertexBuffer,
    handle_cache: VertexBuffer,
    snap_cache: VertexBuffer,
    snap_probe: Option<Vec2>,
    last_error: Option<EngineError>,
    apply_ms: f32,
    rebuild_ms: f32,
    load_ms: f32,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Creates an engine with default configuration.
    #[must_use]
    pub fn new() -> Self {
        EngineBuilder::new().build()
    }

    /// Starts a configuration builder.
    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Current generation: the authoritative freshness token.
    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Read-only view of the world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    fn fail(&mut self, err: EngineError) -> EngineError {
        self.last_error = Some(err);
        err
    }

    /// Last recorded error, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<EngineError> {
        self.last_error
    }

    /// Last error as its stable numeric code (0 = ok).
    #[must_use]
    pub fn last_error_code(&self) -> u32 {
        self.last_error.map_or(0, EngineError::code)
    }

    /// Clears the last error.
    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    fn mark_mutated(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.snapshot_dirty = true;
        self.render_dirty = true;
        self.spatial_dirty = true;
    }

    fn emit_doc_changed(&mut self) {
        self.events
            .push(EventType::DocChanged, 0, self.generation, 0, 0, 0);
    }

    fn emit_history_changed(&mut self) {
        let flags =
            u16::from(self.history.can_undo()) | (u16::from(self.history.can_redo()) << 1);
        self.events
            .push(EventType::HistoryChanged, flags, self.generation, 0, 0, 0);
    }

    fn emit_interaction_changed(&mut self, active: bool) {
        self.events
            .push(EventType::InteractionChanged, u16::from(active), self.generation, 0, 0, 0);
    }

    // ── Control ─────────────────────────────────────────────────────

    /// Pre-reserves table and pool capacity.
    pub fn reserve_world(
        &mut self,
        max_rects: usize,
        max_lines: usize,
        max_polylines: usize,
        max_points: usize,
    ) {
        self.world
            .reserve(max_rects, max_lines, max_polylines, max_points);
    }

    /// Clears the world, recording one destructive history entry.
    pub fn clear(&mut self) {
        let entry = self.capture_clear_entry();
        self.world.clear();
        if !entry.is_empty() {
            self.history.push(entry);
        }
        self.selection.clear();
        self.session = None;
        self.snap_probe = None;
        self.mark_mutated();
        self.emit_doc_changed();
        self.emit_history_changed();
    }

    fn capture_clear_entry(&self) -> HistoryEntry {
        let mut entry = HistoryEntry::default();
        if !self.world.draw_order().is_empty() {
            entry.draw_order = Some((self.world.draw_order().to_vec(), Vec::new()));
        }
        if (self.world.view_scale() - 1.0).abs() > 0.0 {
            entry.view_scale = Some((self.world.view_scale(), 1.0));
        }
        let mut ids: Vec<EntityId> = Vec::new();
        for id in self.world.draw_order() {
            ids.push(*id);
        }
        // Symbols and nodes are not in the draw order; walk the tables.
        for (id, _) in self.world.iter_symbols() {
            ids.push(id);
        }
        for (id, _) in self.world.iter_nodes() {
            ids.push(id);
        }
        ids.sort_unstable();
        ids.dedup();
        for id in ids {
            entry.changes.push(EntityChange {
                id,
                before: capture_entity(&self.world, id),
                after: None,
            });
        }
        entry
    }

    /// Applies a binary command buffer. The whole buffer decodes before any
    /// command runs; on error the model is untouched and the error is also
    /// recorded as the last error.
    pub fn apply_command_buffer(&mut self, bytes: &[u8]) -> Result<(), EngineError> {
        let commands = match decode_command_buffer(bytes) {
            Ok(cmds) => cmds,
            Err(err) => return Err(self.fail(err.into())),
        };
        let started = self.clock.now_ms();

        let draw_before = self.world.draw_order().to_vec();
        let scale_before = self.world.view_scale();
        let mut entry = HistoryEntry::default();
        let mut touched: Vec<EntityId> = Vec::new();

        for cmd in &commands {
            self.capture_before(cmd, &mut entry, &mut touched);
            self.apply_command(cmd);
        }
        self.world.compact_points();
        debug_assert!(self.world.check_invariants());

        for change in &mut entry.changes {
            change.after = capture_entity(&self.world, change.id);
        }
        let draw_after = self.world.draw_order().to_vec();
        if draw_after != draw_before {
            entry.draw_order = Some((draw_before, draw_after));
        }
        if (self.world.view_scale() - scale_before).abs() > 0.0 {
            entry.view_scale = Some((scale_before, self.world.view_scale()));
        }
        if !entry.is_empty() {
            self.history.push(entry);
        }

        self.mark_mutated();
        self.selection.retain(|id| self.world.entity_ref(*id).is_some());
        self.emit_doc_changed();
        self.emit_history_changed();
        self.apply_ms = (self.clock.now_ms() - started) as f32;
        telemetry::apply(self.generation, self.apply_ms);
        Ok(())
    }

    fn capture_before(
        &self,
        cmd: &Command,
        entry: &mut HistoryEntry,
        touched: &mut Vec<EntityId>,
    ) {
        let mut touch = |id: EntityId, world: &World| {
            if id.is_valid() && !touched.contains(&id) {
                touched.push(id);
                entry.changes.push(EntityChange {
                    id,
                    before: capture_entity(world, id),
                    after: None,
                });
            }
        };
        match cmd {
            Command::ClearAll => {
                let mut ids: Vec<EntityId> = self.world.draw_order().to_vec();
                for (id, _) in self.world.iter_symbols() {
                    ids.push(id);
                }
                for (id, _) in self.world.iter_nodes() {
                    ids.push(id);
                }
                ids.sort_unstable();
                ids.dedup();
                for id in ids {
                    touch(id, &self.world);
                }
            }
            Command::DeleteEntity { id }
            | Command::UpsertRect { id, .. }
            | Command::UpsertLine { id, .. }
            | Command::UpsertPolyline { id, .. }
            | Command::UpsertCircle { id, .. }
            | Command::UpsertPolygon { id, .. }
            | Command::UpsertArrow { id, .. }
            | Command::UpsertSymbol { id, .. }
            | Command::UpsertNode { id, .. }
            | Command::UpsertConduit { id, .. }
            | Command::UpsertText { id, .. }
            | Command::InsertContent { id, .. }
            | Command::DeleteContent { id, .. }
            | Command::SetCaret { id, .. }
            | Command::SetSelection { id, .. }
            | Command::ApplyStyle { id, .. }
            | Command::SetAlign { id, .. } => touch(*id, &self.world),
            Command::SetViewScale { .. } | Command::SetDrawOrder { .. } => {}
        }
    }

    fn apply_command(&mut self, cmd: &Command) {
        match cmd {
            Command::ClearAll => {
                self.world.clear();
            }
            Command::DeleteEntity { id } => {
                self.world.delete(*id);
            }
            Command::SetViewScale { scale } => {
                self.world.set_view_scale(*scale);
            }
            Command::SetDrawOrder { ids } => {
                self.world.set_draw_order(ids);
            }
            Command::UpsertRect { id, rect } => self.world.upsert_rect(*id, *rect),
            Command::UpsertLine { id, line } => self.world.upsert_line(*id, *line),
            Command::UpsertPolyline {
                id,
                points,
                fill,
                stroke,
            } => {
                let offset = self.world.append_points(points);
                self.world.upsert_polyline(
                    *id,
                    Polyline {
                        offset,
                        count: points.len() as u32,
                        fill: *fill,
                        stroke: *stroke,
                    },
                );
            }
            Command::UpsertCircle { id, circle } => self.world.upsert_circle(*id, *circle),
            Command::UpsertPolygon { id, polygon } => self.world.upsert_polygon(*id, *polygon),
            Command::UpsertArrow { id, arrow } => self.world.upsert_arrow(*id, *arrow),
            Command::UpsertSymbol { id, symbol } => self.world.upsert_symbol(*id, *symbol),
            Command::UpsertNode { id, node } => self.world.upsert_node(*id, *node),
            Command::UpsertConduit { id, conduit } => self.world.upsert_conduit(*id, *conduit),
            Command::UpsertText { id, text } => {
                self.world.upsert_text(*id, text.clone());
                self.refresh_text_metrics(*id);
            }
            Command::InsertContent { id, at, content } => {
                if let Some(text) = self.world.find_text_mut(*id) {
                    insert_content(text, *at, content);
                    self.refresh_text_metrics(*id);
                }
            }
            Command::DeleteContent { id, start, end } => {
                if let Some(text) = self.world.find_text_mut(*id) {
                    delete_content(text, *start, *end);
                    self.refresh_text_metrics(*id);
                }
            }
            Command::SetCaret { id, caret } => {
                if let Some(text) = self.world.find_text_mut(*id) {
                    set_caret(text, *caret);
                }
            }
            Command::SetSelection { id, start, end } => {
                if let Some(text) = self.world.find_text_mut(*id) {
                    set_selection(text, *start, *end);
                }
            }
            Command::ApplyStyle { id, patch } => {
                if let Some(text) = self.world.find_text_mut(*id) {
                    apply_style(
                        text,
                        patch.start,
                        patch.end,
                        &StylePatch {
                            set_flags: patch.set_flags,
                            clear_flags: patch.clear_flags,
                            font: patch.font,
                            size_pt: patch.size_pt,
                            color: patch.color,
                        },
                    );
                    self.refresh_text_metrics(*id);
                }
            }
            Command::SetAlign { id, align } => {
                if let Some(text) = self.world.find_text_mut(*id) {
                    text.align = *align;
                    self.refresh_text_metrics(*id);
                }
            }
        }
    }

    fn refresh_text_metrics(&mut self, id: EntityId) {
        let Some(text) = self.world.find_text(id) else {
            return;
        };
        let size = layout_text(text, self.provider.as_ref()).size;
        if let Some(text) = self.world.find_text_mut(id) {
            text.layout_size = size;
        }
    }

    /// Loads a snapshot, replacing the live store atomically. On error the
    /// model is untouched.
    pub fn load_snapshot(&mut self, bytes: &[u8]) -> Result<(), EngineError> {
        let started = self.clock.now_ms();
        let shadow = match decode_snapshot(bytes) {
            Ok(world) => world,
            Err(err) => return Err(self.fail(err.into())),
        };
        // View scale is engine state, not document state; it survives the
        // store swap.
        let view_scale = self.world.view_scale();
        self.world = shadow;
        self.world.set_view_scale(view_scale);
        self.history.reset();
        self.session = None;
        self.snap_probe = None;
        self.selection.clear();
        self.generation = self.generation.wrapping_add(1);
        // Loading leaves the snapshot clean (the bytes ARE the snapshot)
        // and the render stale.
        self.snapshot_cache = bytes.to_vec();
        self.snapshot_dirty = false;
        self.render_dirty = true;
        self.spatial_dirty = true;
        let text_ids: Vec<EntityId> = self.world.iter_texts().map(|(id, _)| id).collect();
        for id in text_ids {
            self.refresh_text_metrics(id);
        }
        self.emit_doc_changed();
        self.emit_history_changed();
        self.load_ms = (self.clock.now_ms() - started) as f32;
        telemetry::load(self.generation, self.load_ms);
        Ok(())
    }

    // ── Derived caches ──────────────────────────────────────────────

    fn refresh_render(&mut self) {
        if !self.render_dirty {
            return;
        }
        let started = self.clock.now_ms();
        self.render_cache = build_world(&self.world, self.provider.as_ref(), &mut self.atlas);
        if self.render_cache.atlas_overflow {
            self.last_error = Some(EngineError::AtlasFull);
        }
        self.render_dirty = false;
        self.rebuild_ms = (self.clock.now_ms() - started) as f32;
        telemetry::rebuild(self.generation, self.rebuild_ms);
    }

    fn refresh_snapshot(&mut self) {
        if !self.snapshot_dirty {
            return;
        }
        self.snapshot_cache = encode_snapshot(&self.world);
        self.snapshot_dirty = false;
    }

    fn refresh_grid(&mut self) {
        if !self.spatial_dirty {
            return;
        }
        self.grid.clear();
        for id in self.world.draw_order() {
            if let Some(bb) = self.world.entity_aabb(*id) {
                self.grid.upsert(id.0, bb);
            }
        }
        self.grid.rebuild();
        self.spatial_dirty = false;
    }

    /// Triangle buffer meta plus its float view.
    pub fn position_buffer(&mut self) -> (BufferMeta, &[f32]) {
        self.refresh_render();
        (
            BufferMeta::for_buffer(&self.render_cache.triangles, self.generation),
            self.render_cache.triangles.as_floats(),
        )
    }

    /// Line buffer meta plus its float view.
    pub fn line_buffer(&mut self) -> (BufferMeta, &[f32]) {
        self.refresh_render();
        (
            BufferMeta::for_buffer(&self.render_cache.lines, self.generation),
            self.render_cache.lines.as_floats(),
        )
    }

    /// Snapshot meta plus the canonical bytes.
    pub fn snapshot_buffer(&mut self) -> (SnapshotMeta, &[u8]) {
        self.refresh_snapshot();
        (
            SnapshotMeta {
                generation: self.generation,
                byte_count: self.snapshot_cache.len() as u32,
            },
            &self.snapshot_cache,
        )
    }

    /// Selection outline overlay (dashed boxes).
    pub fn selection_outline_buffer(&mut self) -> (BufferMeta, &[f32]) {
        self.outline_cache =
            build_selection_outline(&self.world, &self.selection, self.world.view_scale());
        (
            BufferMeta::for_buffer(&self.outline_cache, self.generation),
            self.outline_cache.as_floats(),
        )
    }

    /// Selection handle overlay (corner/side/rotate quads).
    pub fn selection_handle_buffer(&mut self) -> (BufferMeta, &[f32]) {
        self.handle_cache =
            build_selection_handles(&self.world, &self.selection, self.world.view_scale());
        (
            BufferMeta::for_buffer(&self.handle_cache, self.generation),
            self.handle_cache.as_floats(),
        )
    }

    /// Snap marker overlay for the current interaction probe.
    pub fn snap_overlay_buffer(&mut self) -> (BufferMeta, &[f32]) {
        let markers = match self.snap_probe {
            Some(probe) if self.snap.enabled => {
                let radius = SNAP_RADIUS_PX / self.world.view_scale().max(1e-4);
                let exclude: Vec<EntityId> = self
                    .session
                    .as_ref()
                    .map(|s| s.targets.clone())
                    .unwrap_or_default();
                snap_candidates(&self.world, probe, radius, &self.snap, &exclude)
            }
            _ => Vec::new(),
        };
        self.snap_cache = build_snap_overlay(&markers, self.world.view_scale());
        (
            BufferMeta::for_buffer(&self.snap_cache, self.generation),
            self.snap_cache.as_floats(),
        )
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// Bounding box of an entity.
    #[must_use]
    pub fn entity_aabb(&self, id: EntityId) -> Option<Aabb> {
        self.world.entity_aabb(id)
    }

    /// Transform record of an entity.
    #[must_use]
    pub fn entity_transform(&self, id: EntityId) -> Option<EntityTransform> {
        self.world.entity_transform(id)
    }

    /// Point pick with the default modifier mask.
    pub fn pick(&mut self, x: f32, y: f32, tolerance_px: f32) -> Option<PickRecord> {
        self.pick_ex(x, y, tolerance_px, 0)
    }

    /// Point pick with modifiers. Tolerance is scaled by the configured
    /// selection tolerance factor and divided by the view scale.
    pub fn pick_ex(
        &mut self,
        x: f32,
        y: f32,
        tolerance_px: f32,
        _modifiers: u32,
    ) -> Option<PickRecord> {
        self.refresh_grid();
        let point = Vec2::new(x, y);
        let tol_px = tolerance_px * self.selection_tolerance_scale;
        let world_tol = tol_px / self.world.view_scale().max(1e-4);
        let query = Aabb::from_center_half_extents(point, world_tol, world_tol);
        let candidates = self.grid.query_rect(&query.inflate(world_tol));
        pick_point(
            &self.world,
            point,
            tol_px,
            self.world.view_scale(),
            &self.selection,
            Some(&candidates),
        )
    }

    /// Every drawable whose AABB overlaps `rect`, ascending by id.
    pub fn query_area(&mut self, rect: &Aabb) -> Vec<EntityId> {
        self.refresh_grid();
        let candidates = self.grid.query_rect(rect);
        let mut out: Vec<EntityId> = candidates
            .into_iter()
            .map(EntityId)
            .filter(|id| {
                self.world
                    .entity_ref(*id)
                    .is_some_and(|e| e.kind.is_drawable())
            })
            .collect();
        out.sort_unstable();
        debug_assert_eq!(out, query_area(&self.world, rect));
        out
    }

    /// Marquee query with Window/Crossing semantics.
    pub fn query_marquee(&mut self, rect: &Aabb, mode: MarqueeMode) -> Vec<EntityId> {
        query_marquee(&self.world, rect, mode)
    }

    // ── Selection ───────────────────────────────────────────────────

    /// Replaces the selection with the live subset of `ids`, deduplicated.
    pub fn set_selection(&mut self, ids: &[EntityId]) {
        let mut selection: Vec<EntityId> = Vec::with_capacity(ids.len());
        for id in ids {
            if self.world.entity_ref(*id).is_some() && !selection.contains(id) {
                selection.push(*id);
            }
        }
        self.selection = selection;
    }

    /// The current selection.
    #[must_use]
    pub fn selected_ids(&self) -> &[EntityId] {
        &self.selection
    }

    /// Empties the selection.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // ── Configuration ───────────────────────────────────────────────

    /// Sets the view scale (clamped; non-finite falls back to 1.0).
    pub fn set_view_scale(&mut self, scale: f32) {
        self.world.set_view_scale(scale);
        self.render_dirty = true;
    }

    /// Current view scale.
    #[must_use]
    pub fn view_scale(&self) -> f32 {
        self.world.view_scale()
    }

    /// Replaces the snap options.
    pub fn set_snap_options(&mut self, snap: SnapOptions) {
        self.snap = snap;
    }

    /// Scales pick tolerances at runtime; non-finite or non-positive input
    /// is ignored.
    pub fn set_selection_tolerance_scale(&mut self, scale: f32) {
        if scale.is_finite() && scale > 0.0 {
            self.selection_tolerance_scale = scale;
        }
    }

    /// Current snap options.
    #[must_use]
    pub fn snap_options(&self) -> SnapOptions {
        self.snap
    }

    /// Registers a font name, returning its id.
    pub fn register_font(&mut self, name: &str) -> u32 {
        self.fonts.register(name)
    }

    /// Looks up a registered font name.
    #[must_use]
    pub fn font_name(&self, id: u32) -> Option<&str> {
        self.fonts.name(id)
    }

    // ── Text queries ────────────────────────────────────────────────

    /// Caret geometry for a text entity at a logical index, in the text's
    /// local space.
    #[must_use]
    pub fn text_caret(&self, id: EntityId, logical: u32) -> Option<CaretGeometry> {
        let text = self.world.find_text(id)?;
        let layout = layout_text(text, self.provider.as_ref());
        Some(caret_geometry(&layout, logical))
    }

    /// Hit test a world point against a text entity's layout.
    #[must_use]
    pub fn text_hit(&self, id: EntityId, x: f32, y: f32) -> Option<HitResult> {
        let text = self.world.find_text(id)?;
        let local = Rot2::from_angle(text.rotation)
            .inverse()
            .apply(Vec2::new(x, y).sub(text.pos));
        let layout = layout_text(text, self.provider.as_ref());
        Some(hit_test(&layout, local))
    }

    /// Whether the atlas texture changed since the last clear.
    #[must_use]
    pub fn atlas_dirty(&self) -> bool {
        self.atlas.is_dirty()
    }

    /// Acknowledges an atlas upload.
    pub fn clear_atlas_dirty(&mut self) {
        self.atlas.clear_dirty();
    }

    /// Atlas dimension and raw coverage pixels.
    #[must_use]
    pub fn atlas_pixels(&self) -> (u32, &[u8]) {
        (self.atlas.dim(), self.atlas.pixels())
    }

    // ── Interaction ─────────────────────────────────────────────────

    /// Whether a session is active.
    #[must_use]
    pub fn is_interaction_active(&self) -> bool {
        self.session.is_some()
    }

    /// Begins a transform session. An active session is implicitly
    /// cancelled first.
    #[allow(clippy::too_many_arguments)]
    pub fn begin_transform(
        &mut self,
        ids: &[EntityId],
        mode: TransformMode,
        specific_id: EntityId,
        vertex_index: u32,
        handle_index: u32,
        screen_xy: Vec2,
        world_xy: Vec2,
        canvas_wh: Vec2,
        modifiers: u32,
    ) -> Result<(), EngineError> {
        if self.session.is_some() {
            self.cancel_transform()?;
        }
        let mut captured: Vec<(EntityId, EntityState)> = Vec::new();
        for id in ids {
            if let Some(state) = capture_entity(&self.world, *id) {
                captured.push((*id, state));
            }
        }
        if captured.is_empty() {
            return Err(self.fail(EngineError::IdNotFound));
        }
        let base_aabb = captured
            .iter()
            .filter_map(|(id, _)| self.world.entity_aabb(*id))
            .reduce(|a, b| a.union(&b));
        let anchor = match (mode, base_aabb.as_ref()) {
            (TransformMode::Resize | TransformMode::EdgeDrag, Some(bb)) => {
                resize_factors(bb, handle_index, world_xy, false).0
            }
            (_, Some(bb)) => bb.center(),
            (_, None) => world_xy,
        };
        self.session = Some(Session {
            kind: SessionKind::Transform(mode),
            targets: captured.iter().map(|(id, _)| *id).collect(),
            captured,
            anchor,
            base_aabb,
            handle_index,
            vertex_index,
            specific_id,
            start_screen: screen_xy,
            start_world: world_xy,
            last_world: world_xy,
            modifiers,
            view_scale: self.world.view_scale(),
            canvas: canvas_wh,
            draft_id: None,
            draft_points: Vec::new(),
        });
        self.emit_interaction_changed(true);
        Ok(())
    }

    /// Begins a draft session; the entity exists immediately for preview
    /// and survives only on commit.
    pub fn begin_draft(
        &mut self,
        kind: DraftKind,
        screen_xy: Vec2,
        world_xy: Vec2,
        canvas_wh: Vec2,
        modifiers: u32,
    ) -> Result<EntityId, EngineError> {
        if self.session.is_some() {
            self.cancel_transform()?;
        }
        let id = self.world.alloc_id();
        let state = draft_state(kind, world_xy, world_xy);
        crate::history::apply_entity(&mut self.world, id, Some(&state));
        self.session = Some(Session {
            kind: SessionKind::Draft(kind),
            targets: vec![id],
            captured: Vec::new(),
            anchor: world_xy,
            base_aabb: None,
            handle_index: 0,
            vertex_index: 0,
            specific_id: id,
            start_screen: screen_xy,
            start_world: world_xy,
            last_world: world_xy,
            modifiers,
            view_scale: self.world.view_scale(),
            canvas: canvas_wh,
            draft_id: Some(id),
            draft_points: vec![world_xy, world_xy],
        });
        self.mark_mutated();
        self.emit_interaction_changed(true);
        Ok(id)
    }

    /// Updates the session's modifier mask mid-drag.
    pub fn set_session_modifiers(&mut self, modifiers: u32) {
        if let Some(session) = self.session.as_mut() {
            session.modifiers = modifiers;
        }
    }

    /// Appends a vertex to an active polyline draft.
    pub fn append_draft_vertex(&mut self) -> Result<(), EngineError> {
        let drafting_polyline = self
            .session
            .as_ref()
            .is_some_and(|s| s.kind == SessionKind::Draft(DraftKind::Polyline));
        if !drafting_polyline {
            return Err(self.fail(EngineError::SessionNotActive));
        }
        if let Some(session) = self.session.as_mut() {
            let last = session.last_world;
            session.draft_points.push(last);
        }
        Ok(())
    }

    fn snapped_point(&self, raw: Vec2, exclude: &[EntityId], modifiers: u32) -> Vec2 {
        if !self.snap.enabled || modifiers & modifier::CTRL != 0 {
            return raw;
        }
        let radius = SNAP_RADIUS_PX / self.world.view_scale().max(1e-4);
        snap_candidates(&self.world, raw, radius, &self.snap, exclude)
            .first()
            .copied()
            .unwrap_or(raw)
    }

    /// Updates the active session with a new pointer position, mutating the
    /// store in place for preview. No history is recorded.
    pub fn update_transform(
        &mut self,
        _screen_xy: Vec2,
        world_xy: Vec2,
    ) -> Result<(), EngineError> {
        let Some(mut session) = self.session.take() else {
            return Err(self.fail(EngineError::SessionNotActive));
        };
        session.last_world = world_xy;
        self.snap_probe = Some(world_xy);

        match session.kind {
            SessionKind::Transform(mode) => {
                self.apply_transform_preview(&mut session, mode, world_xy);
            }
            SessionKind::Draft(kind) => {
                self.apply_draft_preview(&mut session, kind, world_xy);
            }
        }
        self.session = Some(session);
        self.world.compact_points();
        self.mark_mutated();
        Ok(())
    }

    fn apply_transform_preview(&mut self, session: &mut Session, mode: TransformMode, world_xy: Vec2) {
        let shift = session.modifiers & modifier::SHIFT != 0;
        match mode {
            TransformMode::Move => {
                let target = self.snapped_point(world_xy, &session.targets, session.modifiers);
                let delta = target.sub(session.start_world);
                for (id, state) in &session.captured {
                    let next = translate_state(state, delta);
                    crate::history::apply_entity(&mut self.world, *id, Some(&next));
                }
            }
            TransformMode::VertexDrag => {
                let target = self.snapped_point(world_xy, &session.targets, session.modifiers);
                let idx = session.vertex_index as usize;
                for (id, state) in &session.captured {
                    if *id != session.specific_id {
                        continue;
                    }
                    let next = set_state_vertex(state, idx, target);
                    crate::history::apply_entity(&mut self.world, *id, Some(&next));
                }
            }
            TransformMode::Resize | TransformMode::EdgeDrag => {
                let Some(base) = session.base_aabb else {
                    return;
                };
                let (anchor, factors) =
                    resize_factors(&base, session.handle_index, world_xy, shift);
                session.anchor = anchor;
                for (id, state) in &session.captured {
                    let next = scale_state(state, anchor, factors);
                    crate::history::apply_entity(&mut self.world, *id, Some(&next));
                }
            }
            TransformMode::Rotate => {
                let snap = shift && session.modifiers & modifier::CTRL == 0;
                let angle =
                    rotate_delta(session.anchor, session.start_world, world_xy, snap);
                for (id, state) in &session.captured {
                    let next = rotate_state(state, session.anchor, angle);
                    crate::history::apply_entity(&mut self.world, *id, Some(&next));
                }
            }
        }
    }

    fn apply_draft_preview(&mut self, session: &mut Session, kind: DraftKind, world_xy: Vec2) {
        let Some(id) = session.draft_id else {
            return;
        };
        let target = self.snapped_point(world_xy, &session.targets, session.modifiers);
        let state = if kind == DraftKind::Polyline {
            if let Some(last) = session.draft_points.last_mut() {
                *last = target;
            }
            EntityState::Polyline {
                points: session.draft_points.clone(),
                fill: [0.0; 4],
                stroke: vellum_model::Stroke::default(),
            }
        } else {
            draft_state(kind, session.start_world, target)
        };
        crate::history::apply_entity(&mut self.world, id, Some(&state));
    }

    /// Commits the active session: keeps the preview state, records one
    /// history entry, and exposes the commit-result arrays. Returns the
    /// drafted id for draft sessions.
    pub fn commit_transform(&mut self) -> Result<Option<EntityId>, EngineError> {
        let Some(session) = self.session.take() else {
            return Err(self.fail(EngineError::SessionNotActive));
        };
        self.commit_result.clear();
        self.snap_probe = None;

        let mut entry = HistoryEntry::default();
        let drafted = match session.kind {
            SessionKind::Transform(mode) => {
                for (id, before) in &session.captured {
                    let after = capture_entity(&self.world, *id);
                    self.push_commit_delta(&session, mode, *id, after.as_ref());
                    entry.changes.push(EntityChange {
                        id: *id,
                        before: Some(before.clone()),
                        after,
                    });
                }
                None
            }
            SessionKind::Draft(_) => {
                let id = session.specific_id;
                entry.changes.push(EntityChange {
                    id,
                    before: None,
                    after: capture_entity(&self.world, id),
                });
                Some(id)
            }
        };
        if !entry.is_empty() {
            self.history.push(entry);
        }
        self.mark_mutated();
        self.emit_doc_changed();
        self.emit_history_changed();
        self.emit_interaction_changed(false);
        Ok(drafted)
    }

    fn push_commit_delta(
        &mut self,
        session: &Session,
        mode: TransformMode,
        id: EntityId,
        after: Option<&EntityState>,
    ) {
        match mode {
            TransformMode::Move => {
                let delta = session.last_world.sub(session.start_world);
                self.commit_result
                    .push(id, CommitOp::Move, [delta.x, delta.y, 0.0, 0.0]);
            }
            TransformMode::VertexDrag => {
                if id != session.specific_id {
                    return;
                }
                let pos = after
                    .and_then(|s| state_vertex(s, session.vertex_index as usize))
                    .unwrap_or(session.last_world);
                self.commit_result.push(
                    id,
                    CommitOp::VertexSet,
                    [session.vertex_index as f32, pos.x, pos.y, 0.0],
                );
            }
            TransformMode::Resize | TransformMode::EdgeDrag => {
                let payload = match after {
                    Some(EntityState::Rect(r)) => [r.pos.x, r.pos.y, r.size.x, r.size.y],
                    _ => {
                        let bb = self.world.entity_aabb(id);
                        bb.map_or([0.0; 4], |bb| {
                            [bb.min().x, bb.min().y, bb.width(), bb.height()]
                        })
                    }
                };
                self.commit_result.push(id, CommitOp::Resize, payload);
            }
            TransformMode::Rotate => {
                let shift = session.modifiers & modifier::SHIFT != 0;
                let snap = shift && session.modifiers & modifier::CTRL == 0;
                let angle = rotate_delta(
                    session.anchor,
                    session.start_world,
                    session.last_world,
                    snap,
                );
                self.commit_result
                    .push(id, CommitOp::Rotate, [angle, 0.0, 0.0, 0.0]);
            }
        }
    }

    /// Cancels the active session, restoring the captured starting state.
    /// No history entry is recorded.
    pub fn cancel_transform(&mut self) -> Result<(), EngineError> {
        let Some(session) = self.session.take() else {
            return Err(self.fail(EngineError::SessionNotActive));
        };
        self.snap_probe = None;
        match session.kind {
            SessionKind::Transform(_) => {
                for (id, state) in &session.captured {
                    crate::history::apply_entity(&mut self.world, *id, Some(state));
                }
            }
            SessionKind::Draft(_) => {
                if let Some(id) = session.draft_id {
                    self.world.delete(id);
                }
            }
        }
        self.world.compact_points();
        self.mark_mutated();
        self.emit_interaction_changed(false);
        Ok(())
    }

    /// Number of deltas in the last commit result.
    #[must_use]
    pub fn commit_result_count(&self) -> usize {
        self.commit_result.count()
    }

    /// Commit-result id array.
    #[must_use]
    pub fn commit_result_ids(&self) -> &[u32] {
        self.commit_result.ids()
    }

    /// Commit-result op-code array.
    #[must_use]
    pub fn commit_result_op_codes(&self) -> &[u32] {
        self.commit_result.op_codes()
    }

    /// Commit-result payload array, four floats per delta.
    #[must_use]
    pub fn commit_result_payloads(&self) -> &[f32] {
        self.commit_result.payloads()
    }

    // ── History ─────────────────────────────────────────────────────

    /// Whether undo is possible.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Whether redo is possible.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Undoes one entry. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.history.step_back().cloned() else {
            return false;
        };
        entry.revert(&mut self.world);
        self.selection.retain(|id| self.world.entity_ref(*id).is_some());
        self.mark_mutated();
        self.emit_doc_changed();
        self.emit_history_changed();
        true
    }

    /// Redoes one entry. Returns `false` when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(entry) = self.history.step_forward().cloned() else {
            return false;
        };
        entry.reapply(&mut self.world);
        self.selection.retain(|id| self.world.entity_ref(*id).is_some());
        self.mark_mutated();
        self.emit_doc_changed();
        self.emit_history_changed();
        true
    }

    /// History log descriptor.
    #[must_use]
    pub fn history_meta(&self) -> HistoryMeta {
        HistoryMeta {
            len: self.history.len() as u32,
            cursor: self.history.cursor() as u32,
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        }
    }

    // ── Events ──────────────────────────────────────────────────────

    /// Polls up to `max` pending events.
    pub fn poll_events(&mut self, max: usize) -> Vec<EventRecord> {
        self.events.poll(max)
    }

    /// Whether events are pending.
    #[must_use]
    pub fn has_pending_events(&self) -> bool {
        self.events.has_pending()
    }

    /// Acknowledges a full resync at `generation`, rearming the ring after
    /// an overflow.
    pub fn ack_resync(&mut self, generation: u32) {
        self.events.ack_resync(generation, self.generation);
    }

    // ── Stats ───────────────────────────────────────────────────────

    /// Aggregate counters and timings.
    #[must_use]
    pub fn get_stats(&self) -> EngineStats {
        use vellum_model::EntityKind as K;
        EngineStats {
            generation: self.generation,
            rect_count: self.world.count(K::Rect) as u32,
            line_count: self.world.count(K::Line) as u32,
            polyline_count: self.world.count(K::Polyline) as u32,
            circle_count: self.world.count(K::Circle) as u32,
            polygon_count: self.world.count(K::Polygon) as u32,
            arrow_count: self.world.count(K::Arrow) as u32,
            symbol_count: self.world.count(K::Symbol) as u32,
            node_count: self.world.count(K::Node) as u32,
            conduit_count: self.world.count(K::Conduit) as u32,
            text_count: self.world.count(K::Text) as u32,
            point_pool_size: self.world.points().len() as u32,
            triangle_vertex_count: self.render_cache.triangles.vertex_count() as u32,
            line_vertex_count: self.render_cache.lines.vertex_count() as u32,
            history_len: self.history.len() as u32,
            history_cursor: self.history.cursor() as u32,
            apply_ms: self.apply_ms,
            rebuild_ms: self.rebuild_ms,
            load_ms: self.load_ms,
        }
    }
}

/// Reads vertex `idx` out of a captured state, mirroring the ordinals the
/// picker reports.
fn state_vertex(state: &EntityState, idx: usize) -> Option<Vec2> {
    match state {
        EntityState::Line(l) => [l.a, l.b].get(idx).copied(),
        EntityState::Arrow(a) => [a.a, a.b].get(idx).copied(),
        EntityState::Polyline { points, .. } => points.get(idx).copied(),
        EntityState::Rect(r) => r.corners().get(idx).copied(),
        _ => None,
    }
}

/// Writes vertex `idx` into a captured state.
fn set_state_vertex(state: &EntityState, idx: usize, pos: Vec2) -> EntityState {
    match state {
        EntityState::Line(l) => {
            let mut l = *l;
            if idx == 0 {
                l.a = pos;
            } else {
                l.b = pos;
            }
            EntityState::Line(l)
        }
        EntityState::Arrow(a) => {
            let mut a = *a;
            if idx == 0 {
                a.a = pos;
            } else {
                a.b = pos;
            }
            EntityState::Arrow(a)
        }
        EntityState::Polyline {
            points,
            fill,
            stroke,
        } => {
            let mut points = points.clone();
            if let Some(p) = points.get_mut(idx) {
                *p = pos;
            }
            EntityState::Polyline {
                points,
                fill: *fill,
                stroke: *stroke,
            }
        }
        other => other.clone(),
    }
}
