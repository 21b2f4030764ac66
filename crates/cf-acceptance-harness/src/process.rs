// crates/cf-acceptance-harness/src/process.rs
// ============================================================================
// Module: Process Handles
// Description: Non-blocking process spawn with a shared output buffer.
// Purpose: Capture combined stdout/stderr as it streams and publish exit state.
// Dependencies: tokio, serde
// ============================================================================

//! ## Overview
//! [`ProcessHandle::spawn`] starts a command and returns immediately. Two
//! reader tasks append stdout and stderr chunks, in arrival order, into one
//! [`OutputBuffer`]. A monitor task waits for the child, drains both readers,
//! and only then publishes the [`ExitState`], so any snapshot that carries an
//! exit state also carries the complete output.
//!
//! Dropping a handle kills a child that is still running.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;

use serde::Serialize;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::HarnessError;
use crate::source::OutputSource;
use crate::source::Snapshot;
use crate::telemetry::HarnessEvent;
use crate::telemetry::HarnessEventSink;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Read chunk size for stdout/stderr pumps.
const READ_CHUNK_BYTES: usize = 4096;

/// Grace period for draining pipes after the child exits.
///
/// Grandchildren that inherit the pipes can hold them open indefinitely; the
/// exit state is published once this elapses even if a pipe is still open.
const DRAIN_GRACE: Duration = Duration::from_secs(5);

// ============================================================================
// SECTION: Exit State
// ============================================================================

/// Terminal state of a process.
///
/// # Invariants
/// - `code` is `None` when the process was terminated by a signal or its
///   status could not be collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExitState {
    /// Exit code when the process exited normally.
    pub code: Option<i32>,
}

impl ExitState {
    /// Builds an exit state from a numeric exit code.
    #[must_use]
    pub const fn code(code: i32) -> Self {
        Self {
            code: Some(code),
        }
    }

    /// Builds an exit state for a process without an exit code.
    #[must_use]
    pub const fn signaled() -> Self {
        Self {
            code: None,
        }
    }

    /// Returns true when the process exited with code zero.
    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self.code, Some(0))
    }
}

impl From<ExitStatus> for ExitState {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

impl fmt::Display for ExitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}"),
            None => f.write_str("terminated by signal"),
        }
    }
}

// ============================================================================
// SECTION: Output Buffer
// ============================================================================

/// Bytes and terminal state guarded together so snapshots are consistent.
#[derive(Debug, Default)]
struct BufferState {
    /// Accumulated output in arrival order.
    bytes: Vec<u8>,
    /// Exit state once the producer finished.
    exit: Option<ExitState>,
}

/// Shared, append-only output buffer.
///
/// # Invariants
/// - Bytes are only ever appended; snapshots never truncate.
/// - Once finished, further appends are ignored and the exit state is fixed.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    /// Guarded buffer state.
    state: Arc<Mutex<BufferState>>,
    /// Exit notifications for waiters.
    exit_tx: Arc<watch::Sender<Option<ExitState>>>,
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputBuffer {
    /// Creates an empty, unfinished buffer.
    #[must_use]
    pub fn new() -> Self {
        let (exit_tx, _) = watch::channel(None);
        Self {
            state: Arc::new(Mutex::new(BufferState::default())),
            exit_tx: Arc::new(exit_tx),
        }
    }

    /// Appends bytes to the buffer unless it has already finished.
    pub fn append(&self, chunk: &[u8]) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.exit.is_none() {
            state.bytes.extend_from_slice(chunk);
        }
    }

    /// Marks the buffer finished with the given exit state.
    ///
    /// The first call wins; later calls are ignored.
    pub fn finish(&self, exit: ExitState) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.exit.is_some() {
                return;
            }
            state.exit = Some(exit);
        }
        self.exit_tx.send_replace(Some(exit));
    }

    /// Returns the exit state when the producer has finished.
    #[must_use]
    pub fn exit_state(&self) -> Option<ExitState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).exit
    }

    /// Returns the number of bytes captured so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).bytes.len()
    }

    /// Returns true when no bytes have been captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a consistent copy of the current contents and exit state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        Snapshot::from_bytes(&state.bytes, state.exit)
    }

    /// Waits up to `timeout` for the buffer to finish.
    ///
    /// Returns the exit state, or `None` when the wait timed out.
    pub async fn wait_for_exit(&self, timeout: Duration) -> Option<ExitState> {
        let mut rx = self.exit_tx.subscribe();
        match tokio::time::timeout(timeout, rx.wait_for(Option::is_some)).await {
            Ok(Ok(exit)) => *exit,
            _ => self.exit_state(),
        }
    }
}

impl OutputSource for OutputBuffer {
    fn label(&self) -> String {
        "output buffer".to_string()
    }

    fn snapshot(&self) -> Snapshot {
        Self::snapshot(self)
    }
}

// ============================================================================
// SECTION: Command Spec
// ============================================================================

/// Text rendered in place of secret arguments.
pub const REDACTED: &str = "<redacted>";

/// Description of a command to spawn.
///
/// # Invariants
/// - Arguments added with [`CommandSpec::secret_arg`] are passed to the child
///   but never rendered by [`CommandSpec::display`] or `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program path or name resolved through `PATH`.
    program: PathBuf,
    /// Positional arguments.
    args: Vec<String>,
    /// Indices into `args` withheld from diagnostics.
    secret: Vec<usize>,
    /// Environment overrides.
    env: Vec<(String, String)>,
    /// Environment variables removed before spawn.
    env_remove: Vec<String>,
    /// Working directory override.
    current_dir: Option<PathBuf>,
    /// Payload written to stdin, after which stdin is closed.
    stdin: Option<Vec<u8>>,
}

impl CommandSpec {
    /// Creates a spec for `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            secret: Vec::new(),
            env: Vec::new(),
            env_remove: Vec::new(),
            current_dir: None,
            stdin: None,
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends an argument that diagnostics render as [`REDACTED`].
    #[must_use]
    pub fn secret_arg(mut self, arg: impl Into<String>) -> Self {
        self.secret.push(self.args.len());
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets an environment variable for the child.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Removes an environment variable from the child environment.
    #[must_use]
    pub fn env_remove(mut self, key: impl Into<String>) -> Self {
        self.env_remove.push(key.into());
        self
    }

    /// Sets the child working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Writes `payload` to the child's stdin and then closes it.
    #[must_use]
    pub fn stdin(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(payload.into());
        self
    }

    /// Returns the program path.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Returns the arguments.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Renders a shell-like command line for diagnostics.
    ///
    /// Environment values are omitted since they may carry credentials, and
    /// secret arguments render as [`REDACTED`].
    #[must_use]
    pub fn display(&self) -> String {
        let mut line = quote(&self.program.display().to_string());
        for (index, arg) in self.args.iter().enumerate() {
            line.push(' ');
            if self.secret.contains(&index) {
                line.push_str(REDACTED);
            } else {
                line.push_str(&quote(arg));
            }
        }
        line
    }

    /// Builds the tokio command for this spec.
    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        for key in &self.env_remove {
            command.env_remove(key);
        }
        for (key, value) in &self.env {
            command.env(key, value);
        }
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        command
            .stdin(if self.stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env_keys: Vec<&str> = self.env.iter().map(|(key, _)| key.as_str()).collect();
        f.debug_struct("CommandSpec")
            .field("command", &self.display())
            .field("env", &env_keys)
            .field("env_remove", &self.env_remove)
            .field("current_dir", &self.current_dir)
            .field("stdin", &self.stdin.as_ref().map(Vec::len))
            .finish()
    }
}

/// Quotes an argument when it contains whitespace or quotes.
fn quote(value: &str) -> String {
    if value.is_empty() {
        return "''".to_string();
    }
    if value.chars().any(|ch| ch.is_whitespace() || ch == '\'' || ch == '"') {
        format!("'{}'", value.replace('\'', r"'\''"))
    } else {
        value.to_string()
    }
}

// ============================================================================
// SECTION: Process Handle
// ============================================================================

/// Handle to a spawned process and its captured output.
///
/// # Invariants
/// - The handle exclusively owns the child; dropping it kills a running child.
/// - The exit state is published only after output has been drained.
#[derive(Debug)]
pub struct ProcessHandle {
    /// Rendered command line used for diagnostics.
    label: String,
    /// OS process identifier when available.
    pid: Option<u32>,
    /// Shared output buffer.
    buffer: OutputBuffer,
    /// Kill trigger; dropping it also kills a running child.
    kill_tx: Option<oneshot::Sender<()>>,
}

impl ProcessHandle {
    /// Spawns `spec` and returns immediately.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Runtime`] when called outside a tokio runtime
    /// and [`HarnessError::Spawn`] when the program cannot be started.
    pub fn spawn(
        spec: &CommandSpec,
        sink: Arc<dyn HarnessEventSink>,
    ) -> Result<Self, HarnessError> {
        let label = spec.display();
        let runtime = Handle::try_current().map_err(|_| HarnessError::Runtime {
            command: label.clone(),
        })?;
        let mut child = spec.to_command().spawn().map_err(|source| HarnessError::Spawn {
            command: label.clone(),
            source,
        })?;
        let pid = child.id();
        let started = Instant::now();
        sink.record(&HarnessEvent::process_spawned(&label, pid));

        let buffer = OutputBuffer::new();
        if let (Some(mut stdin), Some(payload)) = (child.stdin.take(), spec.stdin.clone()) {
            runtime.spawn(async move {
                let _ = stdin.write_all(&payload).await;
                let _ = stdin.shutdown().await;
            });
        }
        let stdout = child.stdout.take().map(|out| runtime.spawn(pump(out, buffer.clone())));
        let stderr = child.stderr.take().map(|err| runtime.spawn(pump(err, buffer.clone())));

        let (kill_tx, kill_rx) = oneshot::channel::<()>();
        let monitor_buffer = buffer.clone();
        let monitor_label = label.clone();
        runtime.spawn(async move {
            // A dropped sender resolves `kill_rx` as well, so dropping the handle kills.
            let status = tokio::select! {
                status = child.wait() => status.ok(),
                _ = kill_rx => {
                    let _ = child.kill().await;
                    child.wait().await.ok()
                }
            };
            for reader in [stdout, stderr].into_iter().flatten() {
                let _ = tokio::time::timeout(DRAIN_GRACE, reader).await;
            }
            let exit = status.map_or_else(ExitState::signaled, ExitState::from);
            sink.record(&HarnessEvent::process_exited(&monitor_label, exit, started.elapsed()));
            monitor_buffer.finish(exit);
        });

        Ok(Self {
            label,
            pid,
            buffer,
            kill_tx: Some(kill_tx),
        })
    }

    /// Returns the rendered command line.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the OS process identifier when one was assigned.
    #[must_use]
    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Returns the shared output buffer.
    #[must_use]
    pub const fn output(&self) -> &OutputBuffer {
        &self.buffer
    }

    /// Returns the exit state when the process has exited.
    #[must_use]
    pub fn exit_state(&self) -> Option<ExitState> {
        self.buffer.exit_state()
    }

    /// Waits up to `timeout` for the process to exit.
    ///
    /// Returns `None` when the process is still running after the wait.
    pub async fn wait(&self, timeout: Duration) -> Option<ExitState> {
        self.buffer.wait_for_exit(timeout).await
    }

    /// Requests that a running process be killed.
    pub fn kill(&mut self) {
        if let Some(kill_tx) = self.kill_tx.take() {
            let _ = kill_tx.send(());
        }
    }
}

impl OutputSource for ProcessHandle {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn snapshot(&self) -> Snapshot {
        self.buffer.snapshot()
    }
}

/// Copies a child stream into the buffer until EOF or a read error.
async fn pump<R>(mut reader: R, buffer: OutputBuffer)
where
    R: AsyncRead + Unpin,
{
    let mut chunk = vec![0_u8; READ_CHUNK_BYTES];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(read) => buffer.append(chunk.get(..read).unwrap_or_default()),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
