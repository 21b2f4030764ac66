// crates/cf-acceptance-harness/src/cli.rs
// ============================================================================
// Module: CLI Invocation
// Description: Builder for repeated invocations of one CLI binary.
// Purpose: Share binary path, environment, and working directory across calls.
// Dependencies: crate::process
// ============================================================================

//! Helpers for invoking a CLI binary under test.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::HarnessError;
use crate::process::CommandSpec;
use crate::process::ProcessHandle;
use crate::telemetry::HarnessEventSink;
use crate::telemetry::NoopEventSink;

/// Environment variable the `cf` CLI reads its config directory from.
pub const HOME_ENV: &str = "CF_HOME";

/// CLI binary plus the environment every invocation shares.
#[derive(Clone)]
pub struct Cli {
    /// Binary path or name resolved through `PATH`.
    program: PathBuf,
    /// Environment overrides applied to every invocation.
    env: Vec<(String, String)>,
    /// Working directory for every invocation.
    current_dir: Option<PathBuf>,
    /// Event destination for spawned processes.
    sink: Arc<dyn HarnessEventSink>,
}

impl Cli {
    /// Creates a CLI wrapper for `program`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            env: Vec::new(),
            current_dir: None,
            sink: Arc::new(NoopEventSink),
        }
    }

    /// Returns a copy that records process events to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn HarnessEventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns a copy that sets `key=value` for every invocation.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Returns a copy whose CLI state (target, tokens) lives under `dir`.
    #[must_use]
    pub fn with_home(self, dir: &Path) -> Self {
        self.with_env(HOME_ENV, dir.display().to_string())
    }

    /// Returns a copy that runs every invocation in `dir`.
    #[must_use]
    pub fn with_current_dir(mut self, dir: &Path) -> Self {
        self.current_dir = Some(dir.to_path_buf());
        self
    }

    /// Returns the binary path.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Builds the command spec for one invocation.
    #[must_use]
    pub fn command<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut spec = CommandSpec::new(&self.program).args(args);
        for (key, value) in &self.env {
            spec = spec.env(key.clone(), value.clone());
        }
        if let Some(dir) = &self.current_dir {
            spec = spec.current_dir(dir.clone());
        }
        spec
    }

    /// Spawns one invocation and returns its handle without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] when the process cannot be spawned.
    pub fn run<I, S>(&self, args: I) -> Result<ProcessHandle, HarnessError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spawn(&self.command(args))
    }

    /// Spawns a spec built with [`Cli::command`], such as one carrying secret
    /// arguments.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] when the process cannot be spawned.
    pub fn spawn(&self, spec: &CommandSpec) -> Result<ProcessHandle, HarnessError> {
        ProcessHandle::spawn(spec, Arc::clone(&self.sink))
    }
}
