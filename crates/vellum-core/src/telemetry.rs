// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]

#[cfg(feature = "telemetry")]
use serde::Serialize;

#[cfg(feature = "telemetry")]
#[derive(Serialize)]
struct Event<'a> {
    event: &'a str,
    generation: u32,
    ms: f32,
}

#[cfg(feature = "telemetry")]
fn emit(kind: &str, generation: u32, ms: f32) {
    let ev = Event {
        event: kind,
        generation,
        ms,
    };
    // Intentionally ignore errors; stdout is best-effort in dev builds.
    let _ = serde_json::to_writer(std::io::stdout(), &ev);
    let _ = std::io::Write::write_all(&mut std::io::stdout(), b"\n");
}

#[cfg(feature = "telemetry")]
pub fn apply(generation: u32, ms: f32) {
    emit("apply", generation, ms);
}

#[cfg(feature = "telemetry")]
pub fn rebuild(generation: u32, ms: f32) {
    emit("rebuild", generation, ms);
}

#[cfg(feature = "telemetry")]
pub fn load(generation: u32, ms: f32) {
    emit("load", generation, ms);
}

#[cfg(not(feature = "telemetry"))]
pub fn apply(_generation: u32, _ms: f32) {}

#[cfg(not(feature = "telemetry"))]
pub fn rebuild(_generation: u32, _ms: f32) {}

#[cfg(not(feature = "telemetry"))]
pub fn load(_generation: u32, _ms: f32) {}
