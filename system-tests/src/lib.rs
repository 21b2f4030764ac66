// system-tests/src/lib.rs
// ============================================================================
// Module: CF Acceptance System Tests Library
// Description: Shared configuration for the live acceptance suites.
// Purpose: Load platform credentials and run settings for suite binaries.
// Dependencies: cf-acceptance-harness, serde, serde_json
// ============================================================================

//! ## Overview
//! This crate hosts the configuration shared by the acceptance suite binaries
//! in `system-tests/tests`. Suites drive a real `cf` binary against a live
//! platform endpoint and skip when no endpoint is configured.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
