// crates/cf-acceptance-harness/src/config/mod.rs
// ============================================================================
// Module: Harness Configuration
// Description: Suite-wide assertion defaults with environment overrides.
// Purpose: Thread one explicit timeout and poll interval into every harness call.
// Dependencies: std
// ============================================================================

//! ## Overview
//! [`HarnessConfig`] carries the default assertion timeout, the fixed polling
//! interval, and the event log target. It is an explicit value passed to the
//! harness; individual calls override the timeout without mutating it.

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

pub use env::ConfigError;
pub use env::DEFAULT_POLL_INTERVAL;
pub use env::DEFAULT_TIMEOUT;
pub use env::EventLogTarget;
pub use env::HarnessConfig;
pub use env::HarnessEnv;
pub use env::read_env_strict;
