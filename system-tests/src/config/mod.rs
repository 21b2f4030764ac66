// system-tests/src/config/mod.rs
// ============================================================================
// Module: Acceptance Configuration
// Description: Platform endpoint, credentials, and run settings.
// Purpose: Provide typed access to the acceptance config file and env overrides.
// Dependencies: cf-acceptance-harness, serde, serde_json
// ============================================================================

//! ## Overview
//! The acceptance configuration is a JSON file named by the `CONFIG`
//! environment variable, with a few environment overrides layered on top.
//! A missing `CONFIG` is not an error; suites treat it as "skip".

// ============================================================================
// SECTION: Modules
// ============================================================================

mod env;

// ============================================================================
// SECTION: Tests
// ============================================================================


// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use env::AcceptanceConfig;
pub use env::AcceptanceEnv;
pub use env::DEFAULT_CF_BINARY;
