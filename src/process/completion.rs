//! Completion protocol for a subprocess whose stdout, stderr and exit
//! notifications arrive on independent, unordered channels.
//!
//! `Completion` is a plain accumulator. The runner feeds it every signal it
//! receives and settles the invocation the first (and only) time `feed`
//! returns an [`Outcome`]. Settlement fires when:
//!
//! - the process exited with code 0 and either stdout is non-empty or the
//!   command asked for file output, or
//! - the process exited non-zero and stderr is non-empty, or
//! - the process exited and both streams are closed (nothing more can arrive).
//!
//! Chunks arriving after settlement are still absorbed so the buffers always
//! equal the concatenation of every chunk seen.

/// One notification from a running subprocess
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Stdout(Vec<u8>),
    Stderr(Vec<u8>),
    Exit(i32),
    StdoutClosed,
    StderrClosed,
}

/// How an invocation settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

#[derive(Debug, Default)]
pub struct Completion {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    exit_code: Option<i32>,
    expects_file_output: bool,
    stdout_closed: bool,
    stderr_closed: bool,
    settled: bool,
}

impl Completion {
    pub fn new(expects_file_output: bool) -> Self {
        Self {
            expects_file_output,
            ..Default::default()
        }
    }

    /// Absorb a signal; returns the outcome exactly once across all calls
    pub fn feed(&mut self, signal: Signal) -> Option<Outcome> {
        match signal {
            Signal::Stdout(chunk) => self.stdout.extend_from_slice(&chunk),
            Signal::Stderr(chunk) => self.stderr.extend_from_slice(&chunk),
            Signal::Exit(code) => {
                // Only the first exit notification counts
                if self.exit_code.is_none() {
                    self.exit_code = Some(code);
                }
            }
            Signal::StdoutClosed => self.stdout_closed = true,
            Signal::StderrClosed => self.stderr_closed = true,
        }
        self.try_settle()
    }

    fn try_settle(&mut self) -> Option<Outcome> {
        if self.settled {
            return None;
        }
        let code = self.exit_code?;

        let output_received = !self.stdout.is_empty() || self.expects_file_output;
        let error_received = !self.stderr.is_empty();
        let drained = self.is_drained();

        let ready = (code == 0 && output_received) || (code != 0 && error_received) || drained;
        if !ready {
            return None;
        }

        self.settled = true;
        Some(if code == 0 {
            Outcome::Success
        } else {
            Outcome::Failure
        })
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Both output streams have reported end of file
    pub fn is_drained(&self) -> bool {
        self.stdout_closed && self.stderr_closed
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn stdout(&self) -> &[u8] {
        &self.stdout
    }

    pub fn stderr(&self) -> &[u8] {
        &self.stderr
    }

    /// Hand over the accumulated buffers and exit code
    pub fn into_parts(self) -> (Vec<u8>, Vec<u8>, Option<i32>) {
        (self.stdout, self.stderr, self.exit_code)
    }
}
