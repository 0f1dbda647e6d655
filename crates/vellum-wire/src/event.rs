// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Fixed-stride event records polled by the boundary consumer.

use crate::codec::{Reader, WireError, Writer};

/// Size of one encoded event record in bytes.
pub const EVENT_RECORD_SIZE: usize = 20;

/// One out-bound engine event.
///
/// Wire layout (20 bytes): `u16 type, u16 flags, u32 a, u32 b, u32 c, u32 d`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct EventRecord {
    /// Event type tag.
    pub ty: u16,
    /// Type-specific flags.
    pub flags: u16,
    /// First payload word.
    pub a: u32,
    /// Second payload word.
    pub b: u32,
    /// Third payload word.
    pub c: u32,
    /// Fourth payload word.
    pub d: u32,
}

impl EventRecord {
    /// Encodes the record into `w`.
    pub fn encode(&self, w: &mut Writer) {
        w.write_u16_le(self.ty);
        w.write_u16_le(self.flags);
        w.write_u32_le(self.a);
        w.write_u32_le(self.b);
        w.write_u32_le(self.c);
        w.write_u32_le(self.d);
    }

    /// Decodes one record.
    pub fn decode(r: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            ty: r.read_u16_le()?,
            flags: r.read_u16_le()?,
            a: r.read_u32_le()?,
            b: r.read_u32_le()?,
            c: r.read_u32_le()?,
            d: r.read_u32_le()?,
        })
    }
}
