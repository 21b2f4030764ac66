// system-tests/tests/helpers/context.rs
// ============================================================================
// Module: CLI Context
// Description: Isolated `cf` invocation context and the admin session fixture.
// Purpose: Run every scenario as the admin user inside its own CLI home.
// Dependencies: cf-acceptance-harness, system-tests, tempfile
// ============================================================================

//! ## Overview
//! Each scenario gets a private `CF_HOME`, so parallel tests never share the
//! CLI's target or token state. [`AdminSession`] is the first fixture of every
//! set: it targets the API and authenticates before anything else is created,
//! and logs out and removes the home after everything else is deleted.
//!
//! Every invocation is settled after its assertion: the command runs to
//! completion (bounded by the harness timeout) before its handle is dropped.

use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use async_trait::async_trait;
use cf_acceptance_harness::Cli;
use cf_acceptance_harness::CommandSpec;
use cf_acceptance_harness::FanoutEventSink;
use cf_acceptance_harness::Fixture;
use cf_acceptance_harness::FixtureError;
use cf_acceptance_harness::FixtureNames;
use cf_acceptance_harness::Harness;
use cf_acceptance_harness::HarnessError;
use cf_acceptance_harness::HarnessEventSink;
use cf_acceptance_harness::Matcher;
use cf_acceptance_harness::ProcessHandle;
use cf_acceptance_harness::Resolution;
use cf_acceptance_harness::UuidGenerator;
use system_tests::config::AcceptanceConfig;
use tempfile::TempDir;

use super::artifacts::TestReporter;

/// `cf` wrapper bound to one CLI home plus the assertion harness.
#[derive(Clone)]
pub struct CfContext {
    cli: Cli,
    harness: Harness,
}

impl CfContext {
    /// Builds a context whose invocations share `home` as `CF_HOME`.
    pub fn new(
        config: &AcceptanceConfig,
        home: &Path,
        transcript: Arc<dyn HarnessEventSink>,
    ) -> Result<Self, Box<dyn Error>> {
        let harness = Harness::from_config(config.harness_config()?)?;
        let sinks: Vec<Arc<dyn HarnessEventSink>> = vec![transcript, harness.sink()];
        let sink: Arc<dyn HarnessEventSink> = Arc::new(FanoutEventSink::new(sinks));
        let cli = Cli::new(&config.cf_binary)
            .with_home(home)
            .with_env("CF_COLOR", "false")
            .with_sink(Arc::clone(&sink));
        Ok(Self {
            cli,
            harness: harness.with_sink(sink),
        })
    }

    /// Spawns `cf <args>` without waiting.
    pub fn cf<I, S>(&self, args: I) -> Result<ProcessHandle, HarnessError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cli.run(args)
    }

    /// CLI bound to this context's home, for building commands with secret
    /// arguments.
    pub const fn cli(&self) -> &Cli {
        &self.cli
    }

    /// Runs `cf <args>` and waits until its output satisfies `matcher`.
    pub async fn expect<I, S>(&self, args: I, matcher: Matcher) -> Result<Resolution, HarnessError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expect_command(&self.cli.command(args), matcher).await
    }

    /// Runs `spec` and waits until its output satisfies `matcher`.
    pub async fn expect_command(
        &self,
        spec: &CommandSpec,
        matcher: Matcher,
    ) -> Result<Resolution, HarnessError> {
        let handle = self.cli.spawn(spec)?;
        let resolution = self.harness.eventually(&handle, matcher).await?;
        self.harness.settle(&handle).await;
        Ok(resolution)
    }

    /// Runs `cf <args>` and checks its output never satisfies `matcher`.
    pub async fn expect_never<I, S>(
        &self,
        args: I,
        matcher: Matcher,
    ) -> Result<Resolution, HarnessError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let handle = self.cf(args)?;
        let resolution = self.harness.never(&handle, matcher).await?;
        self.harness.settle(&handle).await;
        Ok(resolution)
    }
}

/// Admin login scoped to a private CLI home.
pub struct AdminSession {
    ctx: CfContext,
    label: String,
    api_args: Vec<String>,
    auth: CommandSpec,
    home: Mutex<Option<TempDir>>,
}

#[async_trait]
impl Fixture for AdminSession {
    fn label(&self) -> String {
        self.label.clone()
    }

    async fn create(&self) -> Result<(), FixtureError> {
        self.ctx
            .expect(self.api_args.clone(), Matcher::ExitSuccess)
            .await
            .map_err(|err| FixtureError::harness(self.label(), err))?;
        self.ctx
            .expect_command(&self.auth, Matcher::ExitSuccess)
            .await
            .map_err(|err| FixtureError::harness(self.label(), err))?;
        Ok(())
    }

    async fn delete(&self) -> Result<(), FixtureError> {
        let logout = self.ctx.expect(["logout"], Matcher::ExitSuccess).await;
        let home = self.home.lock().unwrap_or_else(PoisonError::into_inner).take();
        let removed = home.map_or(Ok(()), TempDir::close);
        logout.map_err(|err| FixtureError::harness(self.label(), err))?;
        removed.map_err(|err| FixtureError::harness(self.label(), err))
    }
}

/// Everything a live scenario needs, or nothing when no platform is configured.
pub struct Scenario {
    /// Summary and transcript writer.
    pub reporter: TestReporter,
    /// Admin-authenticated `cf` context.
    pub ctx: CfContext,
    /// Session fixture; add it to the fixture set first.
    pub session: AdminSession,
    /// Unique fixture names for this run.
    pub names: FixtureNames,
}

impl Scenario {
    /// Loads the acceptance config and prepares a scenario.
    ///
    /// Returns `Ok(None)` after writing a `skip` summary when `CONFIG` is unset.
    pub fn start(test_name: &str) -> Result<Option<Self>, Box<dyn Error>> {
        let Some(config) = AcceptanceConfig::load()? else {
            let mut reporter = TestReporter::new(test_name, None)?;
            reporter.finish("skip", vec!["CONFIG is not set; live acceptance skipped".to_string()])?;
            return Ok(None);
        };
        let reporter = TestReporter::new(test_name, config.run_root.as_deref())?;
        let home = TempDir::new()?;
        let ctx = CfContext::new(&config, home.path(), reporter.transcript())?;
        let session = AdminSession {
            ctx: ctx.clone(),
            label: format!("session {}@{}", config.admin_user, config.api),
            api_args: config.api_args(),
            auth: config.auth_command(ctx.cli()),
            home: Mutex::new(Some(home)),
        };
        Ok(Some(Self {
            reporter,
            ctx,
            session,
            names: FixtureNames::generate(&UuidGenerator),
        }))
    }
}
