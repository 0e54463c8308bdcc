//! Argument vector builder for toolkit invocations

use std::ffi::OsStr;
use std::path::Path;

/// Flag that makes the toolkit write its primary output to a file instead of stdout
pub const OUTPUT_FLAG: &str = "-out";

/// A toolkit verb plus its flat argument vector and optional stdin payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolkitCommand {
    pub args: Vec<String>,
    pub stdin: Option<String>,
}

impl ToolkitCommand {
    /// Start a command with the given verb (`genpkey`, `req`, `enc`, `version`)
    pub fn new(verb: &str) -> Self {
        Self {
            args: vec![verb.to_string()],
            stdin: None,
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Push `flag value`
    pub fn opt<S: Into<String>>(self, flag: &str, value: S) -> Self {
        self.arg(flag).arg(value)
    }

    /// Push `flag path`, rendering the path lossily
    pub fn path_opt<P: AsRef<Path>>(self, flag: &str, path: P) -> Self {
        let value = path.as_ref().to_string_lossy().into_owned();
        self.opt(flag, value)
    }

    pub fn stdin<S: Into<String>>(mut self, input: S) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Whether the primary output goes to a file, so an empty stdout is expected
    pub fn requests_output_file(&self) -> bool {
        self.args.iter().any(|a| a == OUTPUT_FLAG)
    }

    /// Full command line as recorded in results and logs
    pub fn command_line(&self, program: &OsStr) -> String {
        let mut parts = vec![program.to_string_lossy().into_owned()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}
