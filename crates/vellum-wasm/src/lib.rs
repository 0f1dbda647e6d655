// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! wasm-bindgen bindings exposing the engine's operation surface.
//!
//! The exported `WasmEngine` mirrors the memory-sharing boundary contract:
//! queries return meta arrays of `[generation, vertex_count,
//! capacity_vertices, float_count, ptr]` and the host reads vertex floats
//! straight out of wasm memory. Pointers are valid until the next mutating
//! call; the generation field is the staleness token the host must check.
#![deny(missing_docs)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use js_sys::{Float32Array, Uint32Array, Uint8Array};
use vellum_core::{
    Aabb, DraftKind, Engine, EntityId, MarqueeMode, SnapOptions, TransformMode, Vec2,
};
use wasm_bindgen::prelude::*;

#[cfg(feature = "console-panic")]
#[wasm_bindgen(start)]
/// Installs the console panic hook in debug-friendly builds.
pub fn init_console_panic_hook() {
    console_error_panic_hook::set_once();
}

/// WASM-friendly wrapper around one engine instance.
#[wasm_bindgen]
pub struct WasmEngine {
    inner: Rc<RefCell<Engine>>,
    staged: Rc<RefCell<BTreeMap<u32, Vec<u8>>>>,
}

impl Default for WasmEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn meta_array(meta: vellum_core::BufferMeta, floats: &[f32]) -> Uint32Array {
    let ptr = floats.as_ptr() as usize as u32;
    let out = [
        meta.generation,
        meta.vertex_count,
        meta.capacity_vertices,
        meta.float_count,
        ptr,
    ];
    Uint32Array::from(out.as_slice())
}

#[wasm_bindgen]
impl WasmEngine {
    /// Creates a fresh engine.
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmEngine {
        WasmEngine {
            inner: Rc::new(RefCell::new(Engine::new())),
            staged: Rc::new(RefCell::new(BTreeMap::new())),
        }
    }

    // ── Staging allocator ───────────────────────────────────────────

    /// Allocates `n` zeroed bytes inside wasm memory and returns their
    /// address. The host writes a command or snapshot buffer there, then
    /// passes the address back to `apply_command_buffer`/`load_snapshot`.
    pub fn alloc_bytes(&self, n: u32) -> u32 {
        let buf = vec![0u8; n as usize];
        let ptr = buf.as_ptr() as usize as u32;
        self.staged.borrow_mut().insert(ptr, buf);
        ptr
    }

    /// Releases a staged buffer.
    pub fn free_bytes(&self, ptr: u32) {
        self.staged.borrow_mut().remove(&ptr);
    }

    fn staged_slice(&self, ptr: u32, len: u32) -> Option<Vec<u8>> {
        let staged = self.staged.borrow();
        let buf = staged.get(&ptr)?;
        buf.get(..len as usize).map(<[u8]>::to_vec)
    }

    // ── Control ─────────────────────────────────────────────────────

    /// Clears the world.
    pub fn clear(&self) {
        self.inner.borrow_mut().clear();
    }

    /// Pre-reserves table capacity.
    pub fn reserve_world(&self, max_rects: u32, max_lines: u32, max_polylines: u32, max_points: u32) {
        self.inner.borrow_mut().reserve_world(
            max_rects as usize,
            max_lines as usize,
            max_polylines as usize,
            max_points as usize,
        );
    }

    /// Applies a staged command buffer by address. Returns the stable error
    /// code, 0 on success.
    pub fn apply_command_buffer(&self, ptr: u32, len: u32) -> u32 {
        let Some(bytes) = self.staged_slice(ptr, len) else {
            return vellum_core::EngineError::BufferTruncated.code();
        };
        self.apply_commands(&bytes)
    }

    /// Applies a command buffer passed directly as bytes.
    pub fn apply_commands(&self, bytes: &[u8]) -> u32 {
        match self.inner.borrow_mut().apply_command_buffer(bytes) {
            Ok(()) => 0,
            Err(err) => err.code(),
        }
    }

    /// Loads a staged snapshot by address. Returns the stable error code.
    pub fn load_snapshot(&self, ptr: u32, len: u32) -> u32 {
        let Some(bytes) = self.staged_slice(ptr, len) else {
            return vellum_core::EngineError::BufferTruncated.code();
        };
        self.load_snapshot_bytes(&bytes)
    }

    /// Loads a snapshot passed directly as bytes.
    pub fn load_snapshot_bytes(&self, bytes: &[u8]) -> u32 {
        match self.inner.borrow_mut().load_snapshot(bytes) {
            Ok(()) => 0,
            Err(err) => err.code(),
        }
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// Triangle buffer meta: `[generation, vertex_count, capacity,
    /// float_count, ptr]`.
    pub fn get_position_buffer_meta(&self) -> Uint32Array {
        let mut engine = self.inner.borrow_mut();
        let (meta, floats) = engine.position_buffer();
        meta_array(meta, floats)
    }

    /// Line buffer meta, same layout.
    pub fn get_line_buffer_meta(&self) -> Uint32Array {
        let mut engine = self.inner.borrow_mut();
        let (meta, floats) = engine.line_buffer();
        meta_array(meta, floats)
    }

    /// Snapshot meta: `[generation, byte_count, ptr]`.
    pub fn get_snapshot_buffer_meta(&self) -> Uint32Array {
        let mut engine = self.inner.borrow_mut();
        let (meta, bytes) = engine.snapshot_buffer();
        let out = [
            meta.generation,
            meta.byte_count,
            bytes.as_ptr() as usize as u32,
        ];
        Uint32Array::from(out.as_slice())
    }

    /// Snapshot bytes as a copied array (convenience for hosts that do not
    /// want pointer reads).
    pub fn get_snapshot_bytes(&self) -> Uint8Array {
        let mut engine = self.inner.borrow_mut();
        let (_, bytes) = engine.snapshot_buffer();
        Uint8Array::from(bytes)
    }

    /// Selection outline overlay meta.
    pub fn get_selection_outline_meta(&self) -> Uint32Array {
        let mut engine = self.inner.borrow_mut();
        let (meta, floats) = engine.selection_outline_buffer();
        meta_array(meta, floats)
    }

    /// Selection handle overlay meta.
    pub fn get_selection_handle_meta(&self) -> Uint32Array {
        let mut engine = self.inner.borrow_mut();
        let (meta, floats) = engine.selection_handle_buffer();
        meta_array(meta, floats)
    }

    /// Snap overlay meta.
    pub fn get_snap_overlay_meta(&self) -> Uint32Array {
        let mut engine = self.inner.borrow_mut();
        let (meta, floats) = engine.snap_overlay_buffer();
        meta_array(meta, floats)
    }

    /// Entity AABB as `[min_x, min_y, max_x, max_y]`, empty when unknown.
    pub fn get_entity_aabb(&self, id: u32) -> Float32Array {
        match self.inner.borrow().entity_aabb(EntityId(id)) {
            Some(bb) => Float32Array::from(
                [bb.min().x, bb.min().y, bb.max().x, bb.max().y].as_slice(),
            ),
            None => Float32Array::new_with_length(0),
        }
    }

    /// Entity transform as `[origin_x, origin_y, rotation, scale_x,
    /// scale_y]`, empty when unknown.
    pub fn get_entity_transform(&self, id: u32) -> Float32Array {
        match self.inner.borrow().entity_transform(EntityId(id)) {
            Some(t) => Float32Array::from(
                [t.origin.x, t.origin.y, t.rotation, t.scale.x, t.scale.y].as_slice(),
            ),
            None => Float32Array::new_with_length(0),
        }
    }

    /// Point pick. Returns `[id, kind, sub_target, sub_index, dist_sq_bits,
    /// hit_x_bits, hit_y_bits]`, empty on miss. Float fields travel as f32
    /// bit patterns.
    pub fn pick(&self, x: f32, y: f32, tolerance_px: f32) -> Uint32Array {
        self.pick_ex(x, y, tolerance_px, 0)
    }

    /// Point pick with modifier bits.
    pub fn pick_ex(&self, x: f32, y: f32, tolerance_px: f32, modifiers: u32) -> Uint32Array {
        let mut engine = self.inner.borrow_mut();
        match engine.pick_ex(x, y, tolerance_px, modifiers) {
            Some(hit) => {
                let out = [
                    hit.id.0,
                    hit.kind as u32,
                    hit.sub_target as u32,
                    hit.sub_index,
                    hit.distance_sq.to_bits(),
                    hit.point.x.to_bits(),
                    hit.point.y.to_bits(),
                ];
                Uint32Array::from(out.as_slice())
            }
            None => Uint32Array::new_with_length(0),
        }
    }

    /// Area query: ids of drawables whose AABB overlaps the rect.
    pub fn query_area(&self, x0: f32, y0: f32, x1: f32, y1: f32) -> Uint32Array {
        let rect = Aabb::from_corners(Vec2::new(x0, y0), Vec2::new(x1, y1));
        let ids: Vec<u32> = self
            .inner
            .borrow_mut()
            .query_area(&rect)
            .into_iter()
            .map(|id| id.0)
            .collect();
        Uint32Array::from(ids.as_slice())
    }

    /// Marquee query; `mode` 0 = Window, anything else = Crossing.
    pub fn query_marquee(&self, x0: f32, y0: f32, x1: f32, y1: f32, mode: u32) -> Uint32Array {
        let rect = Aabb::from_corners(Vec2::new(x0, y0), Vec2::new(x1, y1));
        let mode = if mode == 0 {
            MarqueeMode::Window
        } else {
            MarqueeMode::Crossing
        };
        let ids: Vec<u32> = self
            .inner
            .borrow_mut()
            .query_marquee(&rect, mode)
            .into_iter()
            .map(|id| id.0)
            .collect();
        Uint32Array::from(ids.as_slice())
    }

    // ── Selection ───────────────────────────────────────────────────

    /// Replaces the selection set.
    pub fn set_selection(&self, ids: &[u32]) {
        let ids: Vec<EntityId> = ids.iter().map(|raw| EntityId(*raw)).collect();
        self.inner.borrow_mut().set_selection(&ids);
    }

    /// Clears the selection set.
    pub fn clear_selection(&self) {
        self.inner.borrow_mut().clear_selection();
    }

    // ── Interaction ─────────────────────────────────────────────────

    /// Begins a transform session. Returns the stable error code.
    #[allow(clippy::too_many_arguments)]
    pub fn begin_transform(
        &self,
        ids: &[u32],
        mode: u32,
        specific_id: u32,
        vertex_index: u32,
        handle_index: u32,
        screen_x: f32,
        screen_y: f32,
        world_x: f32,
        world_y: f32,
        canvas_w: f32,
        canvas_h: f32,
        modifiers: u32,
    ) -> u32 {
        let Some(mode) = TransformMode::from_tag(mode) else {
            return vellum_core::EngineError::UnknownCommand.code();
        };
        let ids: Vec<EntityId> = ids.iter().map(|raw| EntityId(*raw)).collect();
        match self.inner.borrow_mut().begin_transform(
            &ids,
            mode,
            EntityId(specific_id),
            vertex_index,
            handle_index,
            Vec2::new(screen_x, screen_y),
            Vec2::new(world_x, world_y),
            Vec2::new(canvas_w, canvas_h),
            modifiers,
        ) {
            Ok(()) => 0,
            Err(err) => err.code(),
        }
    }

    /// Begins a draft session; returns the drafted id, or 0 on error.
    #[allow(clippy::too_many_arguments)]
    pub fn begin_draft(
        &self,
        kind: u32,
        screen_x: f32,
        screen_y: f32,
        world_x: f32,
        world_y: f32,
        canvas_w: f32,
        canvas_h: f32,
        modifiers: u32,
    ) -> u32 {
        let Some(kind) = DraftKind::from_tag(kind) else {
            return 0;
        };
        self.inner
            .borrow_mut()
            .begin_draft(
                kind,
                Vec2::new(screen_x, screen_y),
                Vec2::new(world_x, world_y),
                Vec2::new(canvas_w, canvas_h),
                modifiers,
            )
            .map_or(0, |id| id.0)
    }

    /// Updates the active session. Returns the stable error code.
    pub fn update_transform(&self, screen_x: f32, screen_y: f32, world_x: f32, world_y: f32) -> u32 {
        match self
            .inner
            .borrow_mut()
            .update_transform(Vec2::new(screen_x, screen_y), Vec2::new(world_x, world_y))
        {
            Ok(()) => 0,
            Err(err) => err.code(),
        }
    }

    /// Updates the modifier mask mid-session.
    pub fn set_session_modifiers(&self, modifiers: u32) {
        self.inner.borrow_mut().set_session_modifiers(modifiers);
    }

    /// Appends a vertex to an active polyline draft.
    pub fn append_draft_vertex(&self) -> u32 {
        match self.inner.borrow_mut().append_draft_vertex() {
            Ok(()) => 0,
            Err(err) => err.code(),
        }
    }

    /// Commits the active session. Returns the drafted id for drafts, 0 for
    /// transforms, and `u32::MAX` when no session was active.
    pub fn commit_transform(&self) -> u32 {
        match self.inner.borrow_mut().commit_transform() {
            Ok(Some(id)) => id.0,
            Ok(None) => 0,
            Err(_) => u32::MAX,
        }
    }

    /// Cancels the active session. Returns the stable error code.
    pub fn cancel_transform(&self) -> u32 {
        match self.inner.borrow_mut().cancel_transform() {
            Ok(()) => 0,
            Err(err) => err.code(),
        }
    }

    /// Whether a session is active.
    pub fn is_interaction_active(&self) -> bool {
        self.inner.borrow().is_interaction_active()
    }

    /// Number of commit-result deltas.
    pub fn get_commit_result_count(&self) -> u32 {
        self.inner.borrow().commit_result_count() as u32
    }

    /// Address of the commit-result id array.
    pub fn get_commit_result_ids_ptr(&self) -> u32 {
        self.inner.borrow().commit_result_ids().as_ptr() as usize as u32
    }

    /// Address of the commit-result op-code array.
    pub fn get_commit_result_op_codes_ptr(&self) -> u32 {
        self.inner.borrow().commit_result_op_codes().as_ptr() as usize as u32
    }

    /// Address of the commit-result payload array (4 floats per delta).
    pub fn get_commit_result_payloads_ptr(&self) -> u32 {
        self.inner.borrow().commit_result_payloads().as_ptr() as usize as u32
    }

    // ── History ─────────────────────────────────────────────────────

    /// Whether undo is possible.
    pub fn can_undo(&self) -> bool {
        self.inner.borrow().can_undo()
    }

    /// Whether redo is possible.
    pub fn can_redo(&self) -> bool {
        self.inner.borrow().can_redo()
    }

    /// Undoes one entry; `true` when something changed.
    pub fn undo(&self) -> bool {
        self.inner.borrow_mut().undo()
    }

    /// Redoes one entry; `true` when something changed.
    pub fn redo(&self) -> bool {
        self.inner.borrow_mut().redo()
    }

    /// History meta: `[len, cursor, can_undo, can_redo]`.
    pub fn get_history_meta(&self) -> Uint32Array {
        let meta = self.inner.borrow().history_meta();
        let out = [
            meta.len,
            meta.cursor,
            u32::from(meta.can_undo),
            u32::from(meta.can_redo),
        ];
        Uint32Array::from(out.as_slice())
    }

    // ── Events ──────────────────────────────────────────────────────

    /// Polls up to `max` events, encoded as 20-byte records back to back.
    pub fn poll_events(&self, max: u32) -> Uint8Array {
        let events = self.inner.borrow_mut().poll_events(max as usize);
        let mut w = vellum_wire::Writer::with_capacity(events.len() * vellum_wire::EVENT_RECORD_SIZE);
        for ev in &events {
            ev.encode(&mut w);
        }
        Uint8Array::from(w.into_vec().as_slice())
    }

    /// Whether events are pending.
    pub fn has_pending_events(&self) -> bool {
        self.inner.borrow().has_pending_events()
    }

    /// Acknowledges a full resync at `generation`.
    pub fn ack_resync(&self, generation: u32) {
        self.inner.borrow_mut().ack_resync(generation);
    }

    // ── Configuration ───────────────────────────────────────────────

    /// Sets the view scale.
    pub fn set_view_scale(&self, scale: f32) {
        self.inner.borrow_mut().set_view_scale(scale);
    }

    /// Sets the snap options from packed flags + grid size. Flag bits:
    /// 1 enabled, 2 endpoint, 4 midpoint, 8 center, 16 intersection,
    /// 32 grid.
    pub fn set_snap_options(&self, flags: u32, grid_size: f32) {
        let mut snap = SnapOptions {
            enabled: flags & 1 != 0,
            endpoint: flags & 2 != 0,
            midpoint: flags & 4 != 0,
            center: flags & 8 != 0,
            intersection: flags & 16 != 0,
            grid: flags & 32 != 0,
            ..SnapOptions::default()
        };
        snap.set_grid_size(grid_size);
        self.inner.borrow_mut().set_snap_options(snap);
    }

    /// Scales pick tolerances.
    pub fn set_selection_tolerance_scale(&self, scale: f32) {
        self.inner.borrow_mut().set_selection_tolerance_scale(scale);
    }

    /// Registers a font name, returning its id.
    pub fn register_font(&self, name: &str) -> u32 {
        self.inner.borrow_mut().register_font(name)
    }

    /// Whether the glyph atlas texture changed since the last clear.
    pub fn atlas_dirty(&self) -> bool {
        self.inner.borrow().atlas_dirty()
    }

    /// Acknowledges an atlas re-upload.
    pub fn clear_atlas_dirty(&self) {
        self.inner.borrow_mut().clear_atlas_dirty();
    }

    /// Atlas meta: `[dim, byte_count, ptr]` over the coverage texture.
    pub fn get_atlas_meta(&self) -> Uint32Array {
        let engine = self.inner.borrow();
        let (dim, pixels) = engine.atlas_pixels();
        let out = [
            dim,
            pixels.len() as u32,
            pixels.as_ptr() as usize as u32,
        ];
        Uint32Array::from(out.as_slice())
    }

    /// Caret geometry for a text entity at a logical index:
    /// `[x, y, height, line]` in the text's local space; empty when the id
    /// is not a text entity.
    pub fn get_text_caret(&self, id: u32, logical: u32) -> Float32Array {
        match self.inner.borrow().text_caret(EntityId(id), logical) {
            Some(c) => {
                Float32Array::from([c.x, c.y, c.height, c.line as f32].as_slice())
            }
            None => Float32Array::new_with_length(0),
        }
    }

    /// Hit test a world point against a text entity's layout:
    /// `[char_index, line_index, is_leading_edge]`; empty when the id is
    /// not a text entity.
    pub fn text_hit(&self, id: u32, x: f32, y: f32) -> Uint32Array {
        match self.inner.borrow().text_hit(EntityId(id), x, y) {
            Some(hit) => Uint32Array::from(
                [hit.char_index, hit.line_index, u32::from(hit.is_leading_edge)].as_slice(),
            ),
            None => Uint32Array::new_with_length(0),
        }
    }

    // ── Errors & stats ──────────────────────────────────────────────

    /// Last error code, 0 when clear.
    pub fn get_last_error(&self) -> u32 {
        self.inner.borrow().last_error_code()
    }

    /// Clears the last error.
    pub fn clear_error(&self) {
        self.inner.borrow_mut().clear_error();
    }

    /// Current generation.
    pub fn get_generation(&self) -> u32 {
        self.inner.borrow().generation()
    }

    /// Stats block: counts, pool size, vertex counts, history, timings
    /// (timings as f32 bit patterns in the last three slots).
    pub fn get_stats(&self) -> Uint32Array {
        let s = self.inner.borrow().get_stats();
        let out = [
            s.generation,
            s.rect_count,
            s.line_count,
            s.polyline_count,
            s.circle_count,
            s.polygon_count,
            s.arrow_count,
            s.symbol_count,
            s.node_count,
            s.conduit_count,
            s.text_count,
            s.point_pool_size,
            s.triangle_vertex_count,
            s.line_vertex_count,
            s.history_len,
            s.history_cursor,
            s.apply_ms.to_bits(),
            s.rebuild_ms.to_bits(),
            s.load_ms.to_bits(),
        ];
        Uint32Array::from(out.as_slice())
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use vellum_core::SubTarget;
    use vellum_model::{Rect, Stroke};
    use vellum_wire::CommandWriter;
    use wasm_bindgen_test::*;

    fn rect_cmd(id: u32) -> Vec<u8> {
        let mut w = CommandWriter::new();
        w.upsert_rect(
            EntityId(id),
            &Rect {
                pos: Vec2::new(0.0, 0.0),
                size: Vec2::new(10.0, 10.0),
                rotation: 0.0,
                fill: [1.0, 0.0, 0.0, 1.0],
                stroke: Stroke::default(),
            },
        );
        w.finish()
    }

    #[wasm_bindgen_test]
    fn apply_and_pick_through_the_boundary() {
        let engine = WasmEngine::new();
        assert_eq!(engine.apply_commands(&rect_cmd(1)), 0);
        let hit = engine.pick(5.0, 5.0, 10.0);
        assert_eq!(hit.length(), 7);
        assert_eq!(hit.get_index(0), 1);
        assert_eq!(hit.get_index(2), SubTarget::Body as u32);
    }

    #[wasm_bindgen_test]
    fn meta_generation_tracks_mutations() {
        let engine = WasmEngine::new();
        assert_eq!(engine.apply_commands(&rect_cmd(1)), 0);
        let before = engine.get_position_buffer_meta().get_index(0);
        assert_eq!(engine.apply_commands(&rect_cmd(2)), 0);
        let after = engine.get_position_buffer_meta().get_index(0);
        assert!(after > before);
    }

    #[wasm_bindgen_test]
    fn error_codes_surface_through_last_error() {
        let engine = WasmEngine::new();
        assert_ne!(engine.load_snapshot_bytes(&[1, 2, 3]), 0);
        assert_ne!(engine.get_last_error(), 0);
        engine.clear_error();
        assert_eq!(engine.get_last_error(), 0);
    }
}
