// crates/cf-acceptance-harness/src/matcher.rs
// ============================================================================
// Module: Output Matchers
// Description: Predicates evaluated against output snapshots.
// Purpose: Describe what a CLI invocation is expected to print or return.
// Dependencies: regex
// ============================================================================

//! ## Overview
//! A [`Matcher`] is a pure predicate over a [`Snapshot`]. Text matchers look
//! at the accumulated output; exit matchers only hold once the process has
//! finished. Every matcher renders a description for failure reports.

// ============================================================================
// SECTION: Imports
// ============================================================================

use regex::Regex;

use crate::error::HarnessError;
use crate::process::ExitState;
use crate::source::Snapshot;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Predicate over accumulated output.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Output contains the literal substring.
    Contains(String),
    /// Output matches the regular expression anywhere.
    Pattern(Regex),
    /// Process exited with code zero.
    ExitSuccess,
    /// Process exited with the given code.
    ExitCode(i32),
    /// Every inner matcher holds.
    All(Vec<Self>),
    /// At least one inner matcher holds.
    Any(Vec<Self>),
}

impl Matcher {
    /// Evaluates the matcher against a snapshot.
    #[must_use]
    pub fn matches(&self, snapshot: &Snapshot) -> bool {
        match self {
            Self::Contains(needle) => snapshot.text.contains(needle.as_str()),
            Self::Pattern(regex) => regex.is_match(&snapshot.text),
            Self::ExitSuccess => snapshot.exit.is_some_and(ExitState::success),
            Self::ExitCode(code) => snapshot.exit.and_then(|exit| exit.code) == Some(*code),
            Self::All(inner) => inner.iter().all(|matcher| matcher.matches(snapshot)),
            Self::Any(inner) => inner.iter().any(|matcher| matcher.matches(snapshot)),
        }
    }

    /// Renders a description such as `contain "OK"`.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Contains(needle) => format!("contain {needle:?}"),
            Self::Pattern(regex) => format!("match /{}/", regex.as_str()),
            Self::ExitSuccess => "exit successfully".to_string(),
            Self::ExitCode(code) => format!("exit with code {code}"),
            Self::All(inner) => format!("all of [{}]", describe_list(inner)),
            Self::Any(inner) => format!("any of [{}]", describe_list(inner)),
        }
    }
}

/// Joins inner matcher descriptions.
fn describe_list(inner: &[Matcher]) -> String {
    inner.iter().map(Matcher::describe).collect::<Vec<_>>().join(", ")
}

// ============================================================================
// SECTION: Constructors
// ============================================================================

/// Matches output containing `text`.
///
/// # Examples
/// ```
/// use cf_acceptance_harness::Snapshot;
/// use cf_acceptance_harness::say;
///
/// let snapshot = Snapshot::new("Creating quota...\nOK\n", None);
/// assert!(say("OK").matches(&snapshot));
/// assert!(!say("FAILED").matches(&snapshot));
/// ```
#[must_use]
pub fn say(text: impl Into<String>) -> Matcher {
    Matcher::Contains(text.into())
}

/// Matches output against a regular expression.
///
/// # Errors
///
/// Returns [`HarnessError::InvalidPattern`] when the pattern does not compile.
pub fn pattern(source: &str) -> Result<Matcher, HarnessError> {
    Regex::new(source).map(Matcher::Pattern).map_err(|err| HarnessError::InvalidPattern {
        pattern: source.to_string(),
        reason: err.to_string(),
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
