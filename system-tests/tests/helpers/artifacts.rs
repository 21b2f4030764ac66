// system-tests/tests/helpers/artifacts.rs
// ============================================================================
// Module: Test Artifacts
// Description: Artifact helpers for acceptance suites.
// Purpose: Create per-test run roots and write deterministic summaries.
// Dependencies: cf-acceptance-harness, serde, serde_jcs
// ============================================================================

use std::error::Error;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use cf_acceptance_harness::LifecycleError;
use cf_acceptance_harness::MemoryEventSink;
use serde::Serialize;

/// Artifact files every finished test leaves behind.
const ARTIFACTS: [&str; 3] = ["summary.json", "summary.md", "transcript.json"];

#[derive(Debug, Serialize)]
struct TestSummary {
    test_name: String,
    status: String,
    started_at_ms: u128,
    ended_at_ms: u128,
    duration_ms: u128,
    notes: Vec<String>,
    artifacts: Vec<String>,
}

fn now_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

fn default_run_root(test_name: &str) -> PathBuf {
    let stamp = now_millis();
    PathBuf::from("target/acceptance").join(format!("run_{stamp}")).join(test_name)
}

/// Artifact manager for a single acceptance test.
#[derive(Debug, Clone)]
pub struct TestArtifacts {
    root: PathBuf,
}

impl TestArtifacts {
    /// Creates the artifact root for a test under `run_root` when given.
    pub fn new(test_name: &str, run_root: Option<&Path>) -> io::Result<Self> {
        let root = run_root.map_or_else(|| default_run_root(test_name), |root| root.join(test_name));
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
        })
    }

    /// Returns the root directory for the test artifacts.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes a JSON artifact using canonical JCS serialization.
    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> io::Result<PathBuf> {
        let path = self.root.join(name);
        let bytes = serde_jcs::to_vec(value).map_err(|err| io::Error::other(err.to_string()))?;
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Writes a text artifact with UTF-8 encoding.
    pub fn write_text(&self, name: &str, value: &str) -> io::Result<PathBuf> {
        let path = self.root.join(name);
        fs::write(&path, value.as_bytes())?;
        Ok(path)
    }
}

/// Writes summaries and the CLI transcript even when a test panics.
pub struct TestReporter {
    artifacts: TestArtifacts,
    test_name: String,
    started_at_ms: u128,
    transcript: Arc<MemoryEventSink>,
    finalized: bool,
}

impl TestReporter {
    /// Creates a reporter for the named test.
    pub fn new(test_name: &str, run_root: Option<&Path>) -> io::Result<Self> {
        Ok(Self {
            artifacts: TestArtifacts::new(test_name, run_root)?,
            test_name: test_name.to_string(),
            started_at_ms: now_millis(),
            transcript: Arc::new(MemoryEventSink::new()),
            finalized: false,
        })
    }

    /// Returns the artifact manager.
    pub fn artifacts(&self) -> &TestArtifacts {
        &self.artifacts
    }

    /// Returns the sink that collects the CLI transcript.
    pub fn transcript(&self) -> Arc<MemoryEventSink> {
        Arc::clone(&self.transcript)
    }

    /// Writes the final summary and transcript for the test.
    pub fn finish(&mut self, status: &str, notes: Vec<String>) -> io::Result<()> {
        let ended_at_ms = now_millis();
        let summary = TestSummary {
            test_name: self.test_name.clone(),
            status: status.to_string(),
            started_at_ms: self.started_at_ms,
            ended_at_ms,
            duration_ms: ended_at_ms.saturating_sub(self.started_at_ms),
            notes,
            artifacts: ARTIFACTS.map(str::to_string).to_vec(),
        };
        self.artifacts.write_json("transcript.json", &self.transcript.events())?;
        self.artifacts.write_json("summary.json", &summary)?;
        self.artifacts.write_text("summary.md", &summary_markdown(&summary))?;
        self.finalized = true;
        Ok(())
    }

    /// Records the lifecycle outcome and converts it into the test result.
    pub fn conclude(&mut self, outcome: Result<(), LifecycleError>) -> Result<(), Box<dyn Error>> {
        match outcome {
            Ok(()) => {
                self.finish("pass", Vec::new())?;
                Ok(())
            }
            Err(err) => {
                let mut notes = vec![err.to_string()];
                if err.leaked_fixtures() {
                    notes.push("fixtures were left behind; clean up manually".to_string());
                }
                self.finish("fail", notes)?;
                Err(Box::new(err))
            }
        }
    }
}

impl Drop for TestReporter {
    fn drop(&mut self) {
        if self.finalized {
            return;
        }
        let status = if std::thread::panicking() { "panic" } else { "unknown" };
        let _ = self.finish(status, vec!["test terminated without explicit summary".to_string()]);
    }
}

fn summary_markdown(summary: &TestSummary) -> String {
    let mut out = String::new();
    out.push_str("# Acceptance Test Summary\n\n");
    out.push_str("## Status\n\n");
    out.push_str(&format!("- Test: {}\n", summary.test_name));
    out.push_str(&format!("- Status: {}\n", summary.status));
    out.push_str(&format!("- Duration (ms): {}\n", summary.duration_ms));
    out.push_str("\n## Notes\n\n");
    if summary.notes.is_empty() {
        out.push_str("- None\n");
    } else {
        for note in &summary.notes {
            out.push_str(&format!("- {}\n", note.replace('\n', "\n  ")));
        }
    }
    out.push_str("\n## Artifacts\n\n");
    for artifact in &summary.artifacts {
        out.push_str(&format!("- {artifact}\n"));
    }
    out
}
