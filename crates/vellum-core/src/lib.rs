// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! vellum-core: the deterministic CAD engine kernel.
//!
//! One [`Engine`] instance owns the world, the history log, the event ring,
//! the glyph atlas, and every derived cache (render buffers, snapshot
//! bytes, spatial index). All operations run to completion on the calling
//! thread; queries are read-only on the model but may lazily rebuild the
//! caches they serve. Failure is synchronous: an operation either completes
//! or leaves the model unchanged and records a last-error value.
#![forbid(unsafe_code)]

mod engine;
mod error;
mod events;
mod history;
mod pick;
mod session;
mod snap;
mod stats;
mod telemetry;

pub use engine::{Engine, EngineBuilder, HistoryMeta, SnapshotMeta, SNAP_RADIUS_PX};
pub use error::EngineError;
pub use events::{EventQueue, EventType, EVENT_CAPACITY};
pub use history::{
    apply_entity, capture_entity, EntityChange, EntityState, History, HistoryEntry,
    HISTORY_CAPACITY,
};
pub use pick::{
    pick_point, query_area, query_marquee, MarqueeMode, PickRecord, SubTarget, SIDE_HANDLE_BASE,
};
pub use session::{
    draft_state, modifier, resize_factors, rotate_delta, rotate_state, scale_state, snap_angle,
    translate_state, CommitOp, CommitResult, DraftKind, Session, SessionKind, TransformMode,
    ROTATE_SNAP_RAD,
};
pub use snap::{snap_candidates, SnapOptions};
pub use stats::{Clock, EngineStats, NullClock};

// Re-export the neighbors the operation surface speaks in.
pub use vellum_geom::{Aabb, Vec2};
pub use vellum_model::{EntityId, EntityKind, EntityTransform, World};
pub use vellum_render::{BufferMeta, FLOATS_PER_VERTEX};
pub use vellum_wire::EventRecord;
