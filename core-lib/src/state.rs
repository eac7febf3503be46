//! Shared serialization envelope for every stateful component.
//!
//! Layouts are little-endian, fixed-size records (see each component's
//! `serialize`/`deserialize` for its exact layout); this module only carries
//! the common error taxonomy and the length-check helper every `deserialize`
//! starts with.
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    #[error("serialized state buffer too short: expected at least {expected} bytes, got {got}")]
    InvalidStateBuffer { expected: usize, got: usize },
    #[error("serialized state version mismatch: expected {expected}, got {got}")]
    VersionMismatch { expected: u8, got: u8 },
    #[error("deserializing this state requires a ROM image but none was provided")]
    MissingRom,
}

/// Fail fast with [`StateError::InvalidStateBuffer`] rather than panicking on a
/// short slice; every component's `deserialize` calls this before touching `buf`.
pub(crate) const fn require_len(buf: &[u8], expected: usize) -> Result<(), StateError> {
    if buf.len() < expected {
        return Err(StateError::InvalidStateBuffer {
            expected,
            got: buf.len(),
        });
    }
    Ok(())
}
