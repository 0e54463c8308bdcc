//! Certificate workflow orchestration
//!
//! [`CertificateWorkflow`] threads key, certificate and config paths from one
//! toolkit invocation into the next: private key generation, CSR creation,
//! self-signed root CA creation and CSR signing. A created CA comes back with
//! a [`CaSigner`] that remembers its own key/certificate/config so callers
//! never re-supply CA identity.
//!
//! Operations are issued one at a time per instance. Each awaits one
//! subprocess (two when encryption first needs the cipher list) and appends
//! every settled invocation to the instance's [`CommandLog`].

mod artifact;
mod ca;
mod csr;
mod key;
mod params;
mod sign;
mod tempconf;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

pub use artifact::{ArtifactFiles, FileRole, PrivateKey, WorkflowArtifact};
pub use ca::{CaIdentity, CaSignRequest, CaSigner, RootCa, RootCaRequest};
pub use csr::{CsrRequest, NewKey};
pub use key::{KeyEncryption, PrivateKeyRequest};
pub use params::{
    KeyAlgorithm, PASSPHRASE_SOURCES, STDIN_PASSPHRASE, SUPPORTED_DIGESTS, check_digest,
    normalize_cipher, parse_cipher_list, parse_version,
};
pub use sign::SignRequest;

use crate::error::{Result, WorkflowError};
use crate::process::{CommandLog, CommandResult, ProcessRunner, ToolkitCommand};

/// Toolkit binary used when none is configured, resolved through `PATH`
pub const DEFAULT_PROGRAM: &str = "openssl";

/// Tunables shared by every operation of one workflow instance
#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    /// Directory temporary config files are created in
    pub temp_dir: PathBuf,
    /// Permission bits applied to temporary config files (Unix)
    pub config_file_mode: u32,
    /// Give up on an invocation that has not settled in this long
    pub timeout: Option<Duration>,
    /// Cancels in-flight and future invocations once triggered
    pub cancel: CancellationToken,
    pub default_digest: String,
    pub default_expiry_days: u32,
    pub default_csr_file: PathBuf,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir(),
            config_file_mode: 0o644,
            timeout: None,
            cancel: CancellationToken::new(),
            default_digest: "sha512".to_string(),
            default_expiry_days: 365,
            default_csr_file: PathBuf::from("csr.pem"),
        }
    }
}

#[derive(Debug)]
struct Inner {
    runner: ProcessRunner,
    options: WorkflowOptions,
    ciphers: OnceCell<BTreeSet<String>>,
}

/// Stateful orchestrator over one toolkit binary.
///
/// Cloning is cheap and shares the command log and cipher cache.
#[derive(Debug, Clone)]
pub struct CertificateWorkflow {
    inner: Arc<Inner>,
}

impl Default for CertificateWorkflow {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl CertificateWorkflow {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self::with_options(program, WorkflowOptions::default())
    }

    pub fn with_options(program: impl Into<PathBuf>, options: WorkflowOptions) -> Self {
        let runner = ProcessRunner::new(program, CommandLog::new()).with_timeout(options.timeout);
        Self {
            inner: Arc::new(Inner {
                runner,
                options,
                ciphers: OnceCell::new(),
            }),
        }
    }

    pub fn program(&self) -> &Path {
        self.inner.runner.program()
    }

    pub fn options(&self) -> &WorkflowOptions {
        &self.inner.options
    }

    /// Every settled invocation made through this instance, oldest first
    pub fn command_log(&self) -> &CommandLog {
        self.inner.runner.log()
    }

    /// Cipher names accepted for key encryption.
    ///
    /// The first call runs `enc -list`; the set is cached for the lifetime
    /// of the instance and never refreshed.
    pub async fn supported_ciphers(&self) -> Result<&BTreeSet<String>> {
        self.inner
            .ciphers
            .get_or_try_init(|| self.fetch_ciphers())
            .await
    }

    async fn fetch_ciphers(&self) -> Result<BTreeSet<String>> {
        let result = self.run(&ToolkitCommand::new("enc").arg("-list")).await?;
        match parse_cipher_list(&result.stdout_text()) {
            Some(ciphers) => {
                debug!("Toolkit supports {} ciphers", ciphers.len());
                Ok(ciphers)
            }
            None => Err(WorkflowError::CipherLookup {
                stdout: result.stdout_text(),
                command: result.command,
            }),
        }
    }

    /// Version token reported by the toolkit, absent when unparseable
    pub async fn toolkit_version(&self) -> Result<Option<String>> {
        let result = self.run(&ToolkitCommand::new("version")).await?;
        Ok(parse_version(&result.stdout_text()))
    }

    async fn run(&self, command: &ToolkitCommand) -> Result<CommandResult> {
        self.inner
            .runner
            .run_cancellable(command, &self.inner.options.cancel)
            .await
    }

    fn expiry_days(&self, requested: Option<u32>) -> u32 {
        requested.unwrap_or(self.inner.options.default_expiry_days)
    }

    fn digest(&self, requested: Option<&str>) -> Result<String> {
        let digest = requested.unwrap_or(&self.inner.options.default_digest);
        Ok(check_digest(digest)?)
    }
}
