// crates/cf-acceptance-harness/src/error.rs
// ============================================================================
// Module: Harness Errors
// Description: Top-level error type for harness operations.
// Purpose: Give test bodies a single error type to propagate with `?`.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`HarnessError`] aggregates the failures a test body can hit: spawning a
//! process, an assertion timing out, a fixture step failing, or invalid
//! configuration. Concern-specific errors convert into it with `?`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;

use thiserror::Error;

use crate::config::ConfigError;
use crate::eventually::AssertionError;
use crate::fixtures::FixtureError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Errors raised by harness operations.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The command could not be started.
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        /// Rendered command line.
        command: String,
        /// Underlying spawn error.
        #[source]
        source: io::Error,
    },
    /// A process was spawned outside of a tokio runtime.
    #[error("no tokio runtime available to drive `{command}`")]
    Runtime {
        /// Rendered command line.
        command: String,
    },
    /// A matcher pattern failed to compile.
    #[error("invalid matcher pattern `{pattern}`: {reason}")]
    InvalidPattern {
        /// Pattern source text.
        pattern: String,
        /// Compilation failure reason.
        reason: String,
    },
    /// A polling window was rejected.
    #[error("invalid polling window: {0}")]
    InvalidWindow(String),
    /// An assertion failed.
    #[error(transparent)]
    Assertion(#[from] AssertionError),
    /// A fixture step failed.
    #[error(transparent)]
    Fixture(#[from] FixtureError),
    /// Configuration was invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Filesystem or stream error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
