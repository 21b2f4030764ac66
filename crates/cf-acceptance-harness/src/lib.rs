// crates/cf-acceptance-harness/src/lib.rs
// ============================================================================
// Module: CF Acceptance Harness Library
// Description: Eventually-style assertions over live CLI process output.
// Purpose: Spawn CLI invocations, poll their output, and bracket fixtures.
// Dependencies: tokio, regex, serde, thiserror, uuid, async-trait
// ============================================================================

//! ## Overview
//! This crate hosts the process-assertion harness used by the CF acceptance
//! suites. A CLI invocation is spawned without blocking, its combined stdout
//! and stderr stream into an append-only [`OutputBuffer`], and assertions
//! poll snapshots of that buffer until a [`Matcher`] is satisfied or the
//! [`PollWindow`] closes.
//!
//! ### Design Notes
//! - Positive assertions ([`Expectation::Eventually`]) resolve on the first
//!   matching snapshot and fail only on timeout.
//! - Negative assertions ([`Expectation::Never`]) sample for the whole window.
//!   They prove absence within the sampled window only; output produced after
//!   the window closes is not observed.
//! - Fixtures are bracketed by [`FixtureSet::run`]; deletes always run and
//!   teardown failures are reported next to the primary failure.
//!
//! ## Index
//! - Processes: [`CommandSpec`], [`ProcessHandle`], [`OutputBuffer`], [`Cli`]
//! - Assertions: [`Matcher`], [`Expectation`], [`PollWindow`], [`Harness`]
//! - Fixtures: [`Fixture`], [`FixtureSet`], [`FixtureNames`], [`IdGenerator`]
//! - Ambient: [`HarnessConfig`], [`HarnessEventSink`], [`HarnessError`]

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod eventually;
pub mod fixtures;
pub mod lifecycle;
pub mod matcher;
pub mod process;
pub mod source;
pub mod telemetry;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use cli::Cli;
pub use cli::HOME_ENV;
pub use config::ConfigError;
pub use config::EventLogTarget;
pub use config::HarnessConfig;
pub use error::HarnessError;
pub use eventually::AssertionError;
pub use eventually::AssertionRequest;
pub use eventually::Expectation;
pub use eventually::Harness;
pub use eventually::PollWindow;
pub use eventually::Resolution;
pub use eventually::poll;
pub use fixtures::Fixture;
pub use fixtures::FixtureError;
pub use fixtures::FixtureNames;
pub use fixtures::IdGenerator;
pub use fixtures::SequenceGenerator;
pub use fixtures::UuidGenerator;
pub use lifecycle::FixtureSet;
pub use lifecycle::LifecycleError;
pub use lifecycle::PrimaryFailure;
pub use lifecycle::TeardownFailure;
pub use matcher::Matcher;
pub use matcher::pattern;
pub use matcher::say;
pub use process::CommandSpec;
pub use process::ExitState;
pub use process::OutputBuffer;
pub use process::ProcessHandle;
pub use process::REDACTED;
pub use source::OutputSource;
pub use source::Snapshot;
pub use telemetry::FanoutEventSink;
pub use telemetry::FileEventSink;
pub use telemetry::HarnessEvent;
pub use telemetry::HarnessEventSink;
pub use telemetry::MemoryEventSink;
pub use telemetry::NoopEventSink;
pub use telemetry::StderrEventSink;
