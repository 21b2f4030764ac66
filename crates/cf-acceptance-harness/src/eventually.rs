// crates/cf-acceptance-harness/src/eventually.rs
// ============================================================================
// Module: Eventually Assertions
// Description: Poll an output source until a matcher holds or a window closes.
// Purpose: Separate "will become true" from "is true now" for streaming output.
// Dependencies: tokio, thiserror
// ============================================================================

//! ## Overview
//! [`poll`] samples an [`OutputSource`] at a fixed interval and evaluates an
//! [`Expectation`] against each [`Snapshot`]:
//! - [`Expectation::Eventually`] succeeds on the first matching sample and
//!   fails with [`AssertionError::Timeout`] once the window closes.
//! - [`Expectation::Never`] fails with [`AssertionError::UnexpectedMatch`] on
//!   the first matching sample and succeeds only after the full window.
//!
//! The last sample is always taken at the deadline, so a timeout is reported
//! no earlier than the window and a success no later than one interval past
//! the match. Reaching the deadline stops polling immediately; the underlying
//! process is not awaited.
//!
//! A `Never` success is evidence of absence within the sampled window only.
//! It cannot rule out output that arrives after the window closes, so it is
//! not the mirror image of `Eventually`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio::time::sleep;

use crate::config::EventLogTarget;
use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::matcher::Matcher;
use crate::process::ExitState;
use crate::process::ProcessHandle;
use crate::source::OutputSource;
use crate::source::Snapshot;
use crate::telemetry::FileEventSink;
use crate::telemetry::HarnessEvent;
use crate::telemetry::HarnessEventSink;
use crate::telemetry::NoopEventSink;
use crate::telemetry::StderrEventSink;

// ============================================================================
// SECTION: Window
// ============================================================================

/// Bounded polling window.
///
/// # Invariants
/// - `interval` is non-zero.
/// - A zero `timeout` means a single sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollWindow {
    /// Maximum time to keep sampling.
    timeout: Duration,
    /// Delay between samples.
    interval: Duration,
}

impl PollWindow {
    /// Builds a window.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidWindow`] when `interval` is zero.
    pub fn new(timeout: Duration, interval: Duration) -> Result<Self, HarnessError> {
        if interval.is_zero() {
            return Err(HarnessError::InvalidWindow(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        Ok(Self::from_parts(timeout, interval))
    }

    /// Builds a window from parts already validated by [`HarnessConfig`].
    pub(crate) const fn from_parts(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout,
            interval,
        }
    }

    /// Returns the window length.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the sampling interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns a copy with a different window length.
    #[must_use]
    pub const fn with_timeout(self, timeout: Duration) -> Self {
        Self::from_parts(timeout, self.interval)
    }
}

/// Longest window the clock can represent; longer timeouts are clamped to it.
const MAX_WINDOW: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Returns `started + timeout`, clamped so oversized timeouts never overflow.
fn window_deadline(started: Instant, timeout: Duration) -> Instant {
    started
        .checked_add(timeout)
        .or_else(|| started.checked_add(MAX_WINDOW))
        .unwrap_or(started)
}

// ============================================================================
// SECTION: Requests
// ============================================================================

/// What an assertion expects of the source.
#[derive(Debug, Clone)]
pub enum Expectation {
    /// The matcher must hold at some sample within the window.
    Eventually(Matcher),
    /// The matcher must hold at no sample within the window.
    Never(Matcher),
}

impl Expectation {
    /// Returns the wrapped matcher.
    #[must_use]
    pub const fn matcher(&self) -> &Matcher {
        match self {
            Self::Eventually(matcher) | Self::Never(matcher) => matcher,
        }
    }

    /// Renders a description such as `eventually contain "OK"`.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Eventually(matcher) => format!("eventually {}", matcher.describe()),
            Self::Never(matcher) => format!("never {}", matcher.describe()),
        }
    }
}

/// Expectation paired with its polling window.
#[derive(Debug, Clone)]
pub struct AssertionRequest {
    /// Expected behavior.
    pub expectation: Expectation,
    /// Polling window.
    pub window: PollWindow,
}

impl AssertionRequest {
    /// Builds a positive request.
    #[must_use]
    pub const fn eventually(matcher: Matcher, window: PollWindow) -> Self {
        Self {
            expectation: Expectation::Eventually(matcher),
            window,
        }
    }

    /// Builds a negative request.
    #[must_use]
    pub const fn never(matcher: Matcher, window: PollWindow) -> Self {
        Self {
            expectation: Expectation::Never(matcher),
            window,
        }
    }
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Successful assertion outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Time from the first sample to resolution.
    pub elapsed: Duration,
    /// Number of samples taken.
    pub polls: u32,
    /// The sample that resolved the assertion.
    pub snapshot: Snapshot,
}

/// Assertion failures.
///
/// # Invariants
/// - Both variants carry the last observed snapshot for diagnosis.
#[derive(Debug, Clone, Error)]
pub enum AssertionError {
    /// A positive matcher never held within the window.
    #[error(
        "timed out after {elapsed:?} ({polls} polls) waiting for `{subject}` to {expectation}\nlast output:\n{snapshot}"
    )]
    Timeout {
        /// Source label.
        subject: String,
        /// Expectation description.
        expectation: String,
        /// Time spent polling.
        elapsed: Duration,
        /// Number of samples taken.
        polls: u32,
        /// Final sample.
        snapshot: Snapshot,
    },
    /// A negative matcher held at a sample.
    #[error(
        "`{subject}` was expected to {expectation} but matched after {elapsed:?} ({polls} polls)\nlast output:\n{snapshot}"
    )]
    UnexpectedMatch {
        /// Source label.
        subject: String,
        /// Expectation description.
        expectation: String,
        /// Time until the match was observed.
        elapsed: Duration,
        /// Number of samples taken.
        polls: u32,
        /// Matching sample.
        snapshot: Snapshot,
    },
}

impl AssertionError {
    /// Returns the snapshot observed last.
    #[must_use]
    pub const fn snapshot(&self) -> &Snapshot {
        match self {
            Self::Timeout {
                snapshot, ..
            }
            | Self::UnexpectedMatch {
                snapshot, ..
            } => snapshot,
        }
    }

    /// Returns the time spent polling.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        match self {
            Self::Timeout {
                elapsed, ..
            }
            | Self::UnexpectedMatch {
                elapsed, ..
            } => *elapsed,
        }
    }
}

// ============================================================================
// SECTION: Polling
// ============================================================================

/// Polls `source` until `request` resolves.
///
/// Snapshots are copies; the source is never mutated. A source whose
/// producer already exited is evaluated like any other snapshot, and keeps
/// returning the same content on every sample.
///
/// # Errors
///
/// Returns [`AssertionError::Timeout`] when a positive matcher never holds and
/// [`AssertionError::UnexpectedMatch`] when a negative matcher holds.
pub async fn poll<S>(
    source: &S,
    request: &AssertionRequest,
    sink: &dyn HarnessEventSink,
) -> Result<Resolution, AssertionError>
where
    S: OutputSource + ?Sized,
{
    let subject = source.label();
    let expectation = request.expectation.describe();
    let window = request.window;
    sink.record(&HarnessEvent::assertion_started(&subject, &expectation, window.timeout));

    let started = Instant::now();
    let deadline = window_deadline(started, window.timeout);
    let mut polls = 0_u32;
    loop {
        let snapshot = source.snapshot();
        polls = polls.saturating_add(1);
        let matched = request.expectation.matcher().matches(&snapshot);
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(started);

        match (&request.expectation, matched) {
            (Expectation::Eventually(_), true) => {
                sink.record(&HarnessEvent::assertion_passed(
                    &subject,
                    &expectation,
                    elapsed,
                    polls,
                ));
                return Ok(Resolution {
                    elapsed,
                    polls,
                    snapshot,
                });
            }
            (Expectation::Never(_), true) => {
                sink.record(&HarnessEvent::assertion_failed(
                    &subject,
                    &expectation,
                    elapsed,
                    polls,
                    "unexpected match",
                ));
                return Err(AssertionError::UnexpectedMatch {
                    subject,
                    expectation,
                    elapsed,
                    polls,
                    snapshot,
                });
            }
            _ => {}
        }

        if now >= deadline {
            return match request.expectation {
                Expectation::Eventually(_) => {
                    sink.record(&HarnessEvent::assertion_failed(
                        &subject,
                        &expectation,
                        elapsed,
                        polls,
                        "timeout",
                    ));
                    Err(AssertionError::Timeout {
                        subject,
                        expectation,
                        elapsed,
                        polls,
                        snapshot,
                    })
                }
                Expectation::Never(_) => {
                    sink.record(&HarnessEvent::assertion_passed(
                        &subject,
                        &expectation,
                        elapsed,
                        polls,
                    ));
                    Ok(Resolution {
                        elapsed,
                        polls,
                        snapshot,
                    })
                }
            };
        }

        sleep(window.interval.min(deadline.saturating_duration_since(now))).await;
    }
}

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Assertion facade carrying suite defaults and the event sink.
///
/// # Invariants
/// - Holds no mutable state; clones share only the sink.
#[derive(Clone)]
pub struct Harness {
    /// Suite defaults.
    config: HarnessConfig,
    /// Event destination.
    sink: Arc<dyn HarnessEventSink>,
}

impl Harness {
    /// Builds a harness that discards events.
    #[must_use]
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            sink: Arc::new(NoopEventSink),
        }
    }

    /// Builds a harness whose sink follows the configured event log target.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Io`] when the event log file cannot be opened.
    pub fn from_config(config: HarnessConfig) -> Result<Self, HarnessError> {
        let sink: Arc<dyn HarnessEventSink> = match config.event_log() {
            Some(EventLogTarget::Stderr) => Arc::new(StderrEventSink),
            Some(EventLogTarget::File(path)) => Arc::new(FileEventSink::new(path)?),
            None => Arc::new(NoopEventSink),
        };
        Ok(Self {
            config,
            sink,
        })
    }

    /// Returns a copy that records events to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn HarnessEventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the suite defaults.
    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Returns the event sink shared with spawned processes and fixtures.
    #[must_use]
    pub fn sink(&self) -> Arc<dyn HarnessEventSink> {
        Arc::clone(&self.sink)
    }

    /// Asserts that `matcher` holds within the default timeout.
    ///
    /// # Errors
    ///
    /// Returns [`AssertionError::Timeout`] when the matcher never holds.
    pub async fn eventually<S>(
        &self,
        source: &S,
        matcher: Matcher,
    ) -> Result<Resolution, AssertionError>
    where
        S: OutputSource + ?Sized,
    {
        self.assert(source, &AssertionRequest::eventually(matcher, self.config.window())).await
    }

    /// Asserts that `matcher` holds within `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`AssertionError::Timeout`] when the matcher never holds.
    pub async fn eventually_within<S>(
        &self,
        source: &S,
        matcher: Matcher,
        timeout: Duration,
    ) -> Result<Resolution, AssertionError>
    where
        S: OutputSource + ?Sized,
    {
        let window = self.config.window_with(timeout);
        self.assert(source, &AssertionRequest::eventually(matcher, window)).await
    }

    /// Asserts that `matcher` holds at no sample within the default timeout.
    ///
    /// Waits the full window on success; see the module notes on what a
    /// negative assertion can and cannot show.
    ///
    /// # Errors
    ///
    /// Returns [`AssertionError::UnexpectedMatch`] when the matcher holds.
    pub async fn never<S>(&self, source: &S, matcher: Matcher) -> Result<Resolution, AssertionError>
    where
        S: OutputSource + ?Sized,
    {
        self.assert(source, &AssertionRequest::never(matcher, self.config.window())).await
    }

    /// Asserts that `matcher` holds at no sample within `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`AssertionError::UnexpectedMatch`] when the matcher holds.
    pub async fn never_within<S>(
        &self,
        source: &S,
        matcher: Matcher,
        timeout: Duration,
    ) -> Result<Resolution, AssertionError>
    where
        S: OutputSource + ?Sized,
    {
        let window = self.config.window_with(timeout);
        self.assert(source, &AssertionRequest::never(matcher, window)).await
    }

    /// Waits up to the default timeout for `handle` to run to completion.
    ///
    /// Commands often print their confirmation before they finish; settling
    /// after an assertion keeps the handle's drop from killing that work.
    pub async fn settle(&self, handle: &ProcessHandle) -> Option<ExitState> {
        handle.wait(self.config.default_timeout()).await
    }

    /// Runs an explicit assertion request.
    ///
    /// # Errors
    ///
    /// Returns [`AssertionError`] when the request fails.
    pub async fn assert<S>(
        &self,
        source: &S,
        request: &AssertionRequest,
    ) -> Result<Resolution, AssertionError>
    where
        S: OutputSource + ?Sized,
    {
        poll(source, request, self.sink.as_ref()).await
    }
}
