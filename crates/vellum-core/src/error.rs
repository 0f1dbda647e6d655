// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use thiserror::Error;
use vellum_text::TextError;
use vellum_wire::WireError;

/// Errors emitted by the engine.
///
/// Every operation either completes or leaves the model unchanged and
/// records one of these as the last error. The numeric codes are stable:
/// boundary consumers read them as data, never as exceptions.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum EngineError {
    /// A buffer did not start with the expected magic.
    #[error("invalid magic")]
    InvalidMagic,
    /// A format version is not the current one.
    #[error("unsupported version")]
    UnsupportedVersion,
    /// A buffer ended before its declared content.
    #[error("buffer truncated")]
    BufferTruncated,
    /// A record's payload size did not match its declared length.
    #[error("invalid payload size")]
    InvalidPayloadSize,
    /// An op code outside the command set.
    #[error("unknown command")]
    UnknownCommand,
    /// The id names no live entity. Non-fatal for deletes and text ops,
    /// which degrade to no-ops.
    #[error("id not found")]
    IdNotFound,
    /// An interaction operation needs an active session.
    #[error("no interaction session active")]
    SessionNotActive,
    /// A session is already active where none may be.
    #[error("interaction session already active")]
    SessionAlreadyActive,
    /// The glyph atlas cannot host another glyph.
    #[error("glyph atlas full")]
    AtlasFull,
}

impl EngineError {
    /// Stable numeric code for the boundary; 0 is reserved for "ok".
    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            Self::InvalidMagic => 1,
            Self::UnsupportedVersion => 2,
            Self::BufferTruncated => 3,
            Self::InvalidPayloadSize => 4,
            Self::UnknownCommand => 5,
            Self::IdNotFound => 6,
            Self::SessionNotActive => 7,
            Self::SessionAlreadyActive => 8,
            Self::AtlasFull => 9,
        }
    }
}

impl From<WireError> for EngineError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::InvalidMagic => Self::InvalidMagic,
            WireError::UnsupportedVersion(_) => Self::UnsupportedVersion,
            WireError::BufferTruncated => Self::BufferTruncated,
            WireError::InvalidPayloadSize => Self::InvalidPayloadSize,
            WireError::UnknownCommand(_) => Self::UnknownCommand,
        }
    }
}

impl From<TextError> for EngineError {
    fn from(err: TextError) -> Self {
        match err {
            TextError::AtlasFull => Self::AtlasFull,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable_and_distinct() {
        let all = [
            EngineError::InvalidMagic,
            EngineError::UnsupportedVersion,
            EngineError::BufferTruncated,
            EngineError::InvalidPayloadSize,
            EngineError::UnknownCommand,
            EngineError::IdNotFound,
            EngineError::SessionNotActive,
            EngineError::SessionAlreadyActive,
            EngineError::AtlasFull,
        ];
        let mut codes: Vec<u32> = all.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
        assert!(!codes.contains(&0));
    }

    #[test]
    fn wire_errors_map_onto_engine_errors() {
        assert_eq!(
            EngineError::from(WireError::UnsupportedVersion(9)),
            EngineError::UnsupportedVersion
        );
        assert_eq!(
            EngineError::from(WireError::UnknownCommand(77)),
            EngineError::UnknownCommand
        );
    }
}
