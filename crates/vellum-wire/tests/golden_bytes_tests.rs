// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! Golden vectors pinning the wire layouts. If one of these fails after a
//! code change, the wire format changed and needs a version bump.

use vellum_wire::{CommandWriter, EventRecord, Writer, COMMAND_MAGIC, SNAPSHOT_MAGIC};

#[test]
fn command_preamble_and_clear_all_layout() {
    let mut w = CommandWriter::new();
    w.clear_all();
    let bytes = w.finish();
    // magic "VCMD" LE, version 1, then {op=1, id=0, len=0}.
    assert_eq!(
        hex::encode(&bytes),
        "444d435601000000010000000000000000000000"
    );
}

#[test]
fn bare_clear_all_is_one_bare_record() {
    let mut w = CommandWriter::bare();
    w.clear_all();
    assert_eq!(hex::encode(w.finish()), "010000000000000000000000");
}

#[test]
fn event_record_layout_is_twenty_le_bytes() {
    let ev = EventRecord {
        ty: 4,
        flags: 0,
        a: 7,
        b: 0,
        c: 0,
        d: 0,
    };
    let mut w = Writer::default();
    ev.encode(&mut w);
    assert_eq!(
        hex::encode(w.into_vec()),
        "0400000007000000000000000000000000000000"
    );
}

#[test]
fn magic_constants_spell_their_names() {
    assert_eq!(&COMMAND_MAGIC.to_be_bytes(), b"VCMD");
    assert_eq!(&SNAPSHOT_MAGIC.to_be_bytes(), b"VSNP");
}
