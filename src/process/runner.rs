//! Subprocess execution for toolkit commands
//!
//! Stdout, stderr and the exit status are each watched by their own task and
//! funnelled into one channel; the [`Completion`] state machine decides how
//! the invocation settled, and the runner keeps reading until both pipes
//! are closed before it hands back the result.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::command::ToolkitCommand;
use super::completion::{Completion, Outcome, Signal};
use super::result::{CommandLog, CommandResult};
use crate::error::{Result, WorkflowError};

const READ_CHUNK: usize = 8 * 1024;

enum Event {
    Signal(Signal),
    Fault(std::io::Error),
}

/// Aborts the watcher tasks when an invocation is abandoned.
///
/// Aborting the exit watcher drops the child, which is spawned with
/// `kill_on_drop`, so timeouts and cancellations also kill the process.
#[derive(Default)]
struct Watchers(Vec<JoinHandle<()>>);

impl Watchers {
    fn push(&mut self, handle: JoinHandle<()>) {
        self.0.push(handle);
    }
}

impl Drop for Watchers {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

/// Spawns the toolkit binary and settles each invocation exactly once
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
    log: CommandLog,
    timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new(program: impl Into<PathBuf>, log: CommandLog) -> Self {
        Self {
            program: program.into(),
            log,
            timeout: None,
        }
    }

    /// Fail invocations that have not settled within `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn log(&self) -> &CommandLog {
        &self.log
    }

    pub async fn run(&self, command: &ToolkitCommand) -> Result<CommandResult> {
        self.run_cancellable(command, &CancellationToken::new()).await
    }

    /// Run `command`, giving up early if `cancel` fires or the timeout elapses
    pub async fn run_cancellable(
        &self,
        command: &ToolkitCommand,
        cancel: &CancellationToken,
    ) -> Result<CommandResult> {
        let command_line = command.command_line(self.program.as_os_str());

        let Some(after) = self.timeout else {
            return self.execute(command, command_line, cancel).await;
        };

        let execution = self.execute(command, command_line.clone(), cancel);
        match tokio::time::timeout(after, execution).await {
            Ok(result) => result,
            Err(_) => {
                warn!("`{command_line}` timed out after {after:?}");
                Err(WorkflowError::Timeout {
                    command: command_line,
                    after,
                })
            }
        }
    }

    async fn execute(
        &self,
        command: &ToolkitCommand,
        command_line: String,
        cancel: &CancellationToken,
    ) -> Result<CommandResult> {
        debug!("Running {command_line}");

        let mut child = Command::new(&self.program)
            .args(&command.args)
            .stdin(if command.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| WorkflowError::ProcessLaunch {
                command: command_line.clone(),
                source,
            })?;

        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
        let mut watchers = Watchers::default();

        match child.stdout.take() {
            Some(stdout) => watchers.push(tokio::spawn(pump(
                stdout,
                tx.clone(),
                Signal::Stdout,
                Signal::StdoutClosed,
            ))),
            None => {
                let _ = tx.send(Event::Signal(Signal::StdoutClosed));
            }
        }
        match child.stderr.take() {
            Some(stderr) => watchers.push(tokio::spawn(pump(
                stderr,
                tx.clone(),
                Signal::Stderr,
                Signal::StderrClosed,
            ))),
            None => {
                let _ = tx.send(Event::Signal(Signal::StderrClosed));
            }
        }

        // Write the payload and close stdin immediately after
        if let (Some(input), Some(mut stdin)) = (command.stdin.clone(), child.stdin.take()) {
            watchers.push(tokio::spawn(async move {
                if let Err(e) = stdin.write_all(input.as_bytes()).await {
                    warn!("Failed to write to toolkit stdin: {e}");
                }
                if let Err(e) = stdin.shutdown().await {
                    debug!("Failed to close toolkit stdin: {e}");
                }
            }));
        }

        watchers.push(tokio::spawn(async move {
            let event = match child.wait().await {
                Ok(status) => Event::Signal(Signal::Exit(exit_code(status))),
                Err(e) => Event::Fault(e),
            };
            let _ = tx.send(event);
        }));

        // The outcome is fixed by the first settling signal, but the result is
        // only built once both pipes hit EOF so no buffered output is lost
        let mut completion = Completion::new(command.requests_output_file());
        let mut settled = None;
        while settled.is_none() || !completion.is_drained() {
            let event = tokio::select! {
                _ = cancel.cancelled() => {
                    warn!("`{command_line}` cancelled");
                    return Err(WorkflowError::Cancelled { command: command_line });
                }
                event = rx.recv() => event,
            };

            match event {
                Some(Event::Signal(signal)) => {
                    if let Some(outcome) = completion.feed(signal) {
                        debug!("`{command_line}` settled as {outcome:?}, draining");
                        settled = Some(outcome);
                    }
                }
                Some(Event::Fault(source)) => {
                    return Err(WorkflowError::ProcessLaunch {
                        command: command_line,
                        source,
                    });
                }
                // Every watcher has finished
                None => break,
            }
        }
        let outcome = settled.unwrap_or(match completion.exit_code() {
            Some(0) => Outcome::Success,
            _ => Outcome::Failure,
        });

        let (stdout, stderr, exit_code) = completion.into_parts();
        let result = CommandResult::new(command_line, stdout, stderr, exit_code.unwrap_or(-1));
        self.log.push(result.clone());

        match outcome {
            Outcome::Success => {
                info!("`{}` completed", result.command);
                Ok(result)
            }
            Outcome::Failure => {
                warn!("`{}` failed with exit code {}", result.command, result.exit_code);
                Err(WorkflowError::ProcessFailure(Box::new(result)))
            }
        }
    }
}

async fn pump<R>(
    mut reader: R,
    tx: UnboundedSender<Event>,
    chunk: fn(Vec<u8>) -> Signal,
    closed: Signal,
) where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if tx.send(Event::Signal(chunk(buf[..n].to_vec()))).is_err() {
                    return;
                }
            }
            Err(e) => {
                debug!("Toolkit stream read failed: {e}");
                break;
            }
        }
    }
    let _ = tx.send(Event::Signal(closed));
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
