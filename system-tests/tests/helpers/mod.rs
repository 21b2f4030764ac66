// system-tests/tests/helpers/mod.rs
// ============================================================================
// Module: Acceptance Helpers
// Description: Shared helpers for the live acceptance suites.
// Purpose: Provide the CLI context, platform fixtures, and artifact utilities.
// Dependencies: system-tests, cf-acceptance-harness
// ============================================================================

//! ## Overview
//! Shared helpers for the live acceptance suites.
//! Invariants:
//! - Every scenario runs in its own CLI home with unique fixture names.
//! - Fixtures are deleted after the body whether it passed or not.

#![allow(dead_code, reason = "Shared helpers are reused across multiple test suites.")]

pub mod artifacts;
pub mod context;
