//! Toolkit process execution
//!
//! Builds argument vectors, spawns the toolkit binary, reconciles its
//! unordered stdout/stderr/exit notifications and records every settled
//! invocation in a shared [`CommandLog`].

mod command;
mod completion;
mod result;
mod runner;

pub use command::{OUTPUT_FLAG, ToolkitCommand};
pub use completion::{Completion, Outcome, Signal};
pub use result::{CommandLog, CommandResult};
pub use runner::ProcessRunner;
