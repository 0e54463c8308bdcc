//! Settled subprocess results and the append-only command log

use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of one toolkit invocation, built once at settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandResult {
    /// Program path followed by every argument, space separated
    pub command: String,
    #[serde(serialize_with = "serialize_lossy")]
    pub stdout: Vec<u8>,
    #[serde(serialize_with = "serialize_lossy")]
    pub stderr: Vec<u8>,
    pub exit_code: i32,
    pub finished_at: DateTime<Utc>,
}

impl CommandResult {
    pub fn new(command: String, stdout: Vec<u8>, stderr: Vec<u8>, exit_code: i32) -> Self {
        Self {
            command,
            stdout,
            stderr,
            exit_code,
            finished_at: Utc::now(),
        }
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "`{}` exited with code {}: {}",
            self.command,
            self.exit_code,
            self.stderr_text().trim()
        )
    }
}

fn serialize_lossy<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&String::from_utf8_lossy(bytes))
}

/// Append-only log of every settled invocation made by one workflow instance.
///
/// Cloning shares the same underlying log.
#[derive(Debug, Clone, Default)]
pub struct CommandLog {
    entries: Arc<Mutex<Vec<CommandResult>>>,
}

impl CommandLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, result: CommandResult) {
        // A poisoned lock still holds a consistent Vec; keep appending
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.push(result);
    }

    /// Copy of every entry recorded so far, oldest first
    pub fn snapshot(&self) -> Vec<CommandResult> {
        match self.entries.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self.entries.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last(&self) -> Option<CommandResult> {
        match self.entries.lock() {
            Ok(guard) => guard.last().cloned(),
            Err(poisoned) => poisoned.into_inner().last().cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_clones_share_entries() {
        let log = CommandLog::new();
        let shared = log.clone();
        shared.push(CommandResult::new(
            "openssl version".into(),
            b"OpenSSL 3.0.2".to_vec(),
            vec![],
            0,
        ));

        assert_eq!(log.len(), 1);
        assert_eq!(log.last().map(|r| r.command), Some("openssl version".to_string()));
    }

    #[test]
    fn display_includes_stderr_diagnostic() {
        let result = CommandResult::new(
            "openssl genpkey -algorithm FOO".into(),
            vec![],
            b"genpkey: Algorithm FOO not found\n".to_vec(),
            1,
        );
        assert_eq!(
            result.to_string(),
            "`openssl genpkey -algorithm FOO` exited with code 1: genpkey: Algorithm FOO not found"
        );
    }
}
