// crates/cf-acceptance-harness/src/fixtures.rs
// ============================================================================
// Module: Fixtures
// Description: Ephemeral named resources and unique identifier generation.
// Purpose: Give each test run collision-free fixture names and a create/delete contract.
// Dependencies: async-trait, thiserror, uuid
// ============================================================================

//! ## Overview
//! Fixtures are platform resources (orgs, spaces, quotas, security groups)
//! created before a test body and deleted after it. Names derive from one
//! generated identifier per run so parallel tests never collide.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::error::HarnessError;

// ============================================================================
// SECTION: Identifiers
// ============================================================================

/// Source of globally unique identifiers.
pub trait IdGenerator: Send + Sync {
    /// Returns a fresh identifier.
    fn next_id(&self) -> String;
}

/// Random UUID v4 identifiers.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic `<prefix>-<n>` identifiers.
#[derive(Debug)]
pub struct SequenceGenerator {
    /// Identifier prefix.
    prefix: String,
    /// Next sequence number.
    next: AtomicU64,
}

impl SequenceGenerator {
    /// Creates a generator starting at 1.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequenceGenerator {
    fn next_id(&self) -> String {
        let value = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{value}", self.prefix)
    }
}

/// Fixture names derived from one run identifier.
///
/// # Invariants
/// - All names embed the same identifier, so they are unique per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureNames {
    /// Run identifier.
    id: String,
}

impl FixtureNames {
    /// Draws a fresh identifier from `ids`.
    #[must_use]
    pub fn generate(ids: &dyn IdGenerator) -> Self {
        Self {
            id: ids.next_id(),
        }
    }

    /// Returns the run identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Security group name (the bare identifier).
    #[must_use]
    pub fn security_group(&self) -> String {
        self.id.clone()
    }

    /// Organization name.
    #[must_use]
    pub fn org(&self) -> String {
        format!("org-{}", self.id)
    }

    /// Space name.
    #[must_use]
    pub fn space(&self) -> String {
        format!("space-{}", self.id)
    }

    /// Quota name.
    #[must_use]
    pub fn quota(&self) -> String {
        format!("quota-{}", self.id)
    }
}

// ============================================================================
// SECTION: Fixture Contract
// ============================================================================

/// Fixture step errors.
///
/// # Invariants
/// - Every variant names the fixture it came from.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// A harness operation failed inside the step.
    #[error("fixture `{fixture}`: {source}")]
    Harness {
        /// Fixture label.
        fixture: String,
        /// Underlying failure.
        #[source]
        source: Box<HarnessError>,
    },
    /// The step failed for a reason outside the harness.
    #[error("fixture `{fixture}`: {message}")]
    Failed {
        /// Fixture label.
        fixture: String,
        /// Failure description.
        message: String,
    },
    /// The step panicked; the panic was contained so teardown could continue.
    #[error("fixture `{fixture}` panicked: {message}")]
    Panicked {
        /// Fixture label.
        fixture: String,
        /// Panic payload.
        message: String,
    },
}

impl FixtureError {
    /// Wraps a harness error raised while handling `fixture`.
    #[must_use]
    pub fn harness(fixture: impl Into<String>, error: impl Into<HarnessError>) -> Self {
        Self::Harness {
            fixture: fixture.into(),
            source: Box::new(error.into()),
        }
    }

    /// Returns the label of the fixture that failed.
    #[must_use]
    pub fn fixture(&self) -> &str {
        match self {
            Self::Harness {
                fixture, ..
            }
            | Self::Failed {
                fixture, ..
            }
            | Self::Panicked {
                fixture, ..
            } => fixture,
        }
    }
}

/// Ephemeral resource with symmetric create and delete steps.
#[async_trait]
pub trait Fixture: Send + Sync {
    /// Returns a label such as `org org-1234`.
    fn label(&self) -> String;

    /// Creates the resource and validates the success signal.
    async fn create(&self) -> Result<(), FixtureError>;

    /// Deletes the resource and validates the success signal.
    async fn delete(&self) -> Result<(), FixtureError>;
}

// ============================================================================
// SECTION: Tests
// ============================================================================
