// crates/cf-acceptance-harness/src/lifecycle.rs
// ============================================================================
// Module: Fixture Lifecycle
// Description: Setup/body/teardown bracketing with unconditional teardown.
// Purpose: Guarantee fixture deletion and keep the primary failure visible.
// Dependencies: tokio
// ============================================================================

//! ## Overview
//! [`FixtureSet::run`] creates fixtures in order, runs the test body, then
//! deletes every fixture in reverse order no matter what happened before.
//!
//! Invariants:
//! - Setup stops at the first failing create and skips the body.
//! - The body and every fixture step run on their own tasks; a panic is
//!   captured as a failure rather than unwinding past teardown.
//! - Teardown failures are collected next to the primary failure and never
//!   replace it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::time::Instant;

use crate::error::HarnessError;
use crate::fixtures::Fixture;
use crate::fixtures::FixtureError;
use crate::telemetry::HarnessEvent;
use crate::telemetry::HarnessEventSink;
use crate::telemetry::NoopEventSink;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// The failure that decides the test outcome.
#[derive(Debug)]
pub enum PrimaryFailure {
    /// A create step failed; the body did not run.
    Setup(FixtureError),
    /// The body returned an error.
    Body(HarnessError),
    /// The body panicked.
    Panic(String),
}

impl fmt::Display for PrimaryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup(error) => write!(f, "setup failed: {error}"),
            Self::Body(error) => write!(f, "test body failed: {error}"),
            Self::Panic(message) => write!(f, "test body panicked: {message}"),
        }
    }
}

/// A delete step that did not report success.
#[derive(Debug)]
pub struct TeardownFailure {
    /// Fixture label.
    pub fixture: String,
    /// Delete failure.
    pub error: FixtureError,
}

/// Lifecycle failure report.
///
/// # Invariants
/// - At least one of `primary` or `teardown` is populated.
#[derive(Debug)]
pub struct LifecycleError {
    /// Setup, body, or panic failure, if any.
    pub primary: Option<PrimaryFailure>,
    /// Fixtures whose delete step failed, in teardown order.
    pub teardown: Vec<TeardownFailure>,
}

impl LifecycleError {
    /// Returns true when teardown left fixtures behind.
    #[must_use]
    pub fn leaked_fixtures(&self) -> bool {
        !self.teardown.is_empty()
    }
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.primary {
            Some(primary) => write!(f, "{primary}")?,
            None => f.write_str("test body passed")?,
        }
        if !self.teardown.is_empty() {
            write!(f, "\nteardown left {} fixture(s) behind:", self.teardown.len())?;
            for failure in &self.teardown {
                write!(f, "\n- {}: {}", failure.fixture, failure.error)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for LifecycleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.primary {
            Some(PrimaryFailure::Setup(error)) => Some(error),
            Some(PrimaryFailure::Body(error)) => Some(error),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Fixture Set
// ============================================================================

/// Ordered fixtures bracketing a test body.
#[derive(Clone)]
pub struct FixtureSet {
    /// Label used for body events.
    label: String,
    /// Fixtures in creation order.
    fixtures: Vec<Arc<dyn Fixture>>,
    /// Event destination.
    sink: Arc<dyn HarnessEventSink>,
}

impl FixtureSet {
    /// Creates an empty set for the named test.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            fixtures: Vec::new(),
            sink: Arc::new(NoopEventSink),
        }
    }

    /// Returns a copy that records events to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn HarnessEventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Appends a fixture; fixtures are created in insertion order.
    #[must_use]
    pub fn with<F>(mut self, fixture: F) -> Self
    where
        F: Fixture + 'static,
    {
        self.fixtures.push(Arc::new(fixture));
        self
    }

    /// Appends a shared fixture.
    pub fn push(&mut self, fixture: Arc<dyn Fixture>) {
        self.fixtures.push(fixture);
    }

    /// Returns the number of fixtures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    /// Returns true when the set has no fixtures.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }

    /// Runs setup, `body`, and teardown.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] when setup, the body, or any delete step
    /// failed. Teardown has already run when this returns.
    pub async fn run<F, Fut>(&self, body: F) -> Result<(), LifecycleError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), HarnessError>> + Send + 'static,
    {
        let mut primary = self.setup().await.err().map(PrimaryFailure::Setup);
        if primary.is_none() {
            primary = self.run_body(body).await.err();
        }
        let teardown = self.teardown().await;
        if primary.is_none() && teardown.is_empty() {
            Ok(())
        } else {
            Err(LifecycleError {
                primary,
                teardown,
            })
        }
    }

    /// Creates fixtures in order, stopping at the first failure.
    async fn setup(&self) -> Result<(), FixtureError> {
        for fixture in &self.fixtures {
            let result = run_step(fixture, Step::Create).await;
            self.sink.record(&HarnessEvent::fixture_step(
                "fixture_created",
                &fixture.label(),
                result.as_ref().err().map(ToString::to_string),
            ));
            result?;
        }
        Ok(())
    }

    /// Runs the body on its own task so panics become failures.
    async fn run_body<F, Fut>(&self, body: F) -> Result<(), PrimaryFailure>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), HarnessError>> + Send + 'static,
    {
        let started = Instant::now();
        let outcome = match tokio::spawn(body()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => Err(PrimaryFailure::Body(error)),
            Err(join) if join.is_panic() => {
                Err(PrimaryFailure::Panic(panic_message(join.into_panic().as_ref())))
            }
            Err(join) => Err(PrimaryFailure::Panic(join.to_string())),
        };
        self.sink.record(&HarnessEvent::body_finished(
            &self.label,
            started.elapsed(),
            outcome.as_ref().err().map(ToString::to_string),
        ));
        outcome
    }

    /// Deletes every fixture in reverse order and collects failures.
    async fn teardown(&self) -> Vec<TeardownFailure> {
        let mut failures = Vec::new();
        for fixture in self.fixtures.iter().rev() {
            let label = fixture.label();
            let result = run_step(fixture, Step::Delete).await;
            self.sink.record(&HarnessEvent::fixture_step(
                "fixture_deleted",
                &label,
                result.as_ref().err().map(ToString::to_string),
            ));
            if let Err(error) = result {
                failures.push(TeardownFailure {
                    fixture: label,
                    error,
                });
            }
        }
        failures
    }
}

#[derive(Clone, Copy)]
enum Step {
    Create,
    Delete,
}

/// Runs one fixture step on its own task so a panic becomes a step failure.
async fn run_step(fixture: &Arc<dyn Fixture>, step: Step) -> Result<(), FixtureError> {
    let owned = Arc::clone(fixture);
    let task = tokio::spawn(async move {
        match step {
            Step::Create => owned.create().await,
            Step::Delete => owned.delete().await,
        }
    });
    match task.await {
        Ok(result) => result,
        Err(join) => Err(FixtureError::Panicked {
            fixture: fixture.label(),
            message: if join.is_panic() {
                panic_message(join.into_panic().as_ref())
            } else {
                join.to_string()
            },
        }),
    }
}

/// Extracts a readable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
