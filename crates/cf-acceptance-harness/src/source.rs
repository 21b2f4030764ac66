// crates/cf-acceptance-harness/src/source.rs
// ============================================================================
// Module: Output Sources
// Description: Snapshot interface over growing output streams.
// Purpose: Let assertions poll any source that can report accumulated output.
// Dependencies: crate::process
// ============================================================================

//! ## Overview
//! An [`OutputSource`] produces a [`Snapshot`] of everything captured so far.
//! Snapshots are copies: taking one never consumes or truncates the source,
//! so the same content is visible to every later poll.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use crate::process::ExitState;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Point-in-time copy of accumulated output.
///
/// # Invariants
/// - `text` is the lossy UTF-8 decoding of the captured bytes.
/// - When `exit` is present the content is final.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Decoded output text.
    pub text: String,
    /// Exit state when the producer has finished.
    pub exit: Option<ExitState>,
    /// Number of raw bytes captured.
    pub bytes: usize,
}

impl Snapshot {
    /// Builds a snapshot from text and an optional exit state.
    #[must_use]
    pub fn new(text: impl Into<String>, exit: Option<ExitState>) -> Self {
        let text = text.into();
        let bytes = text.len();
        Self {
            text,
            exit,
            bytes,
        }
    }

    /// Builds a snapshot from raw captured bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8], exit: Option<ExitState>) -> Self {
        Self {
            text: String::from_utf8_lossy(bytes).into_owned(),
            exit,
            bytes: bytes.len(),
        }
    }

    /// Returns true when the producer has finished and the content is final.
    #[must_use]
    pub const fn is_final(&self) -> bool {
        self.exit.is_some()
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit {
            Some(exit) => writeln!(f, "[{exit}, {} bytes]", self.bytes)?,
            None => writeln!(f, "[still running, {} bytes]", self.bytes)?,
        }
        if self.text.is_empty() {
            f.write_str("<no output>")
        } else {
            f.write_str(self.text.trim_end())
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Source of accumulated output that can be sampled repeatedly.
pub trait OutputSource: Send + Sync {
    /// Returns a human-readable label used in diagnostics.
    fn label(&self) -> String;

    /// Returns a copy of the content accumulated so far.
    fn snapshot(&self) -> Snapshot;
}

impl<T: OutputSource + ?Sized> OutputSource for &T {
    fn label(&self) -> String {
        (**self).label()
    }

    fn snapshot(&self) -> Snapshot {
        (**self).snapshot()
    }
}
