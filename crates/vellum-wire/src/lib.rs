// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! vellum-wire: the engine's binary boundary formats.
//!
//! Three wire formats live here, all explicit little-endian and independent
//! of host endianness:
//!
//! - the **command stream** an external producer feeds into the engine,
//! - the **snapshot** byte block the engine emits and reloads,
//! - the fixed 20-byte **event record** consumers poll from the event ring.
//!
//! Decoding is strict: sizes must match exactly, unknown ops and versions
//! are rejected, and no partially decoded value is ever returned.
#![forbid(unsafe_code)]

mod codec;
mod command;
mod event;
mod snapshot;

pub use codec::{Reader, WireError, Writer};
pub use command::{
    decode_command_buffer, op, ApplyStylePatch, Command, CommandWriter, COMMAND_MAGIC,
    COMMAND_VERSION,
};
pub use event::{EventRecord, EVENT_RECORD_SIZE};
pub use snapshot::{decode_snapshot, encode_snapshot, SNAPSHOT_MAGIC, SNAPSHOT_VERSION};
