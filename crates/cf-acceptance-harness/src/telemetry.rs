// crates/cf-acceptance-harness/src/telemetry.rs
// ============================================================================
// Module: Harness Telemetry
// Description: Structured events for process, assertion, and fixture steps.
// Purpose: Emit JSON-line logs without tying the harness to a log backend.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every process spawn/exit, assertion outcome, and fixture step produces a
//! [`HarnessEvent`]. Events go to a [`HarnessEventSink`]; the bundled sinks
//! write JSON lines to stderr or an append-only file, keep events in memory,
//! or discard them.
//!
//! Events never carry environment values; command lines are rendered without
//! the child environment.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::process::ExitState;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Outcome label attached to resolved events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOutcome {
    /// Step succeeded.
    Ok,
    /// Step failed.
    Error,
}

/// Structured harness event.
///
/// # Invariants
/// - `event` is a stable identifier such as `assertion_failed`.
/// - Optional fields are `None` when the event kind does not carry them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarnessEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Process label or fixture label the event refers to.
    pub subject: String,
    /// Expectation description for assertion events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expectation: Option<String>,
    /// Outcome for resolved events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<EventOutcome>,
    /// Elapsed time in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u128>,
    /// Number of snapshots sampled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polls: Option<u32>,
    /// Process identifier for spawn events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    /// Exit code for exit events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HarnessEvent {
    /// Builds an event with only the identifier and subject set.
    fn base(event: &'static str, subject: &str) -> Self {
        Self {
            event,
            timestamp_ms: now_millis(),
            subject: subject.to_string(),
            expectation: None,
            outcome: None,
            elapsed_ms: None,
            polls: None,
            pid: None,
            exit_code: None,
            message: None,
        }
    }

    /// A process was spawned.
    #[must_use]
    pub fn process_spawned(label: &str, pid: Option<u32>) -> Self {
        Self {
            pid,
            ..Self::base("process_spawned", label)
        }
    }

    /// A process exited and its output was drained.
    #[must_use]
    pub fn process_exited(label: &str, exit: ExitState, elapsed: Duration) -> Self {
        Self {
            outcome: Some(if exit.success() { EventOutcome::Ok } else { EventOutcome::Error }),
            exit_code: exit.code,
            elapsed_ms: Some(elapsed.as_millis()),
            ..Self::base("process_exited", label)
        }
    }

    /// An assertion started polling.
    #[must_use]
    pub fn assertion_started(label: &str, expectation: &str, timeout: Duration) -> Self {
        Self {
            expectation: Some(expectation.to_string()),
            message: Some(format!("window {}ms", timeout.as_millis())),
            ..Self::base("assertion_started", label)
        }
    }

    /// An assertion resolved successfully.
    #[must_use]
    pub fn assertion_passed(label: &str, expectation: &str, elapsed: Duration, polls: u32) -> Self {
        Self {
            expectation: Some(expectation.to_string()),
            outcome: Some(EventOutcome::Ok),
            elapsed_ms: Some(elapsed.as_millis()),
            polls: Some(polls),
            ..Self::base("assertion_passed", label)
        }
    }

    /// An assertion failed.
    #[must_use]
    pub fn assertion_failed(
        label: &str,
        expectation: &str,
        elapsed: Duration,
        polls: u32,
        reason: &str,
    ) -> Self {
        Self {
            expectation: Some(expectation.to_string()),
            outcome: Some(EventOutcome::Error),
            elapsed_ms: Some(elapsed.as_millis()),
            polls: Some(polls),
            message: Some(reason.to_string()),
            ..Self::base("assertion_failed", label)
        }
    }

    /// A fixture create or delete step finished.
    #[must_use]
    pub fn fixture_step(step: &'static str, fixture: &str, error: Option<String>) -> Self {
        Self {
            outcome: Some(if error.is_some() { EventOutcome::Error } else { EventOutcome::Ok }),
            message: error,
            ..Self::base(step, fixture)
        }
    }

    /// A test body finished.
    #[must_use]
    pub fn body_finished(label: &str, elapsed: Duration, error: Option<String>) -> Self {
        Self {
            outcome: Some(if error.is_some() { EventOutcome::Error } else { EventOutcome::Ok }),
            elapsed_ms: Some(elapsed.as_millis()),
            message: error,
            ..Self::base("body_finished", label)
        }
    }
}

/// Returns the current wall-clock time in milliseconds.
fn now_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Sink for harness events.
pub trait HarnessEventSink: Send + Sync {
    /// Record an event.
    fn record(&self, event: &HarnessEvent);
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Sink that logs JSON lines to stderr.
pub struct StderrEventSink;

impl HarnessEventSink for StderrEventSink {
    fn record(&self, event: &HarnessEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Sink that logs JSON lines to a file.
pub struct FileEventSink {
    /// File handle used for append-only logging.
    file: Mutex<File>,
}

impl FileEventSink {
    /// Opens the event log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl HarnessEventSink for FileEventSink {
    fn record(&self, event: &HarnessEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op event sink.
pub struct NoopEventSink;

impl HarnessEventSink for NoopEventSink {
    fn record(&self, _event: &HarnessEvent) {}
}

/// Sink that keeps events in memory for inspection.
#[derive(Default)]
pub struct MemoryEventSink {
    /// Recorded events in order.
    events: Mutex<Vec<HarnessEvent>>,
}

impl MemoryEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HarnessEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Returns `(event, subject)` pairs in recording order.
    #[must_use]
    pub fn steps(&self) -> Vec<(&'static str, String)> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|event| (event.event, event.subject.clone()))
            .collect()
    }
}

impl HarnessEventSink for MemoryEventSink {
    fn record(&self, event: &HarnessEvent) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event.clone());
    }
}

/// Sink that forwards every event to several sinks.
#[derive(Default, Clone)]
pub struct FanoutEventSink {
    /// Downstream sinks.
    sinks: Vec<Arc<dyn HarnessEventSink>>,
}

impl FanoutEventSink {
    /// Creates a fanout over `sinks`.
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn HarnessEventSink>>) -> Self {
        Self {
            sinks,
        }
    }
}

impl HarnessEventSink for FanoutEventSink {
    fn record(&self, event: &HarnessEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
