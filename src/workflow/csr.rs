//! Certificate signing requests (`req -new`)

use std::path::PathBuf;

use log::info;

use super::CertificateWorkflow;
use super::artifact::{ArtifactFiles, FileRole, WorkflowArtifact};
use super::params::{KeyAlgorithm, with_passphrase};
use super::tempconf::write_temp_config;
use crate::cnf::{ConfigBlock, ConfigValue, csr_config, sanitize_block};
use crate::error::{Result, ValidationError};
use crate::process::{OUTPUT_FLAG, ToolkitCommand};

/// Instruction to mint a fresh, unencrypted key alongside the request
#[derive(Debug, Clone, Default)]
pub struct NewKey {
    /// Defaults to RSA when neither this nor `param_file` is set
    pub algorithm: Option<KeyAlgorithm>,
    pub param_file: Option<PathBuf>,
    /// Key size appended as `<alg>:<bits>`
    pub bits: Option<u32>,
    pub pkey_opts: ConfigBlock,
    /// Where the toolkit writes the new key
    pub key_out: PathBuf,
}

impl NewKey {
    pub fn new(algorithm: KeyAlgorithm, key_out: impl Into<PathBuf>) -> Self {
        Self {
            algorithm: Some(algorithm),
            key_out: key_out.into(),
            ..Self::default()
        }
    }

    pub fn bits(mut self, bits: u32) -> Self {
        self.bits = Some(bits);
        self
    }

    pub fn pkey_opt(mut self, key: &str, value: impl Into<ConfigValue>) -> Self {
        self.pkey_opts.insert(key, value);
        self
    }

    /// `-newkey` argument: `param:<file>` or `<alg>[:<bits>]`
    pub fn spec(&self) -> std::result::Result<String, ValidationError> {
        match (&self.param_file, self.algorithm) {
            (Some(_), Some(_)) => Err(ValidationError::ConflictingKeyParameters),
            (Some(param_file), None) => Ok(format!("param:{}", param_file.display())),
            (None, algorithm) => {
                let algorithm = algorithm.unwrap_or_default();
                Ok(match self.bits {
                    Some(bits) => format!("{algorithm}:{bits}"),
                    None => algorithm.to_string(),
                })
            }
        }
    }
}

/// Parameters for [`CertificateWorkflow::generate_csr`].
///
/// Exactly one of `key_file` and `new_key` must be set.
#[derive(Debug, Clone, Default)]
pub struct CsrRequest {
    pub key_file: Option<PathBuf>,
    /// Passphrase for an encrypted `key_file`
    pub key_passphrase: Option<String>,
    pub new_key: Option<NewKey>,
    /// Falls back to the workflow's default digest
    pub message_digest: Option<String>,
    pub distinguished_name: ConfigBlock,
    /// Subject alternative names (`DNS.1`, `IP.1`, ...)
    pub alt_names: ConfigBlock,
    /// Falls back to the workflow's default CSR file
    pub output_file: Option<PathBuf>,
}

impl CsrRequest {
    pub fn with_key(key_file: impl Into<PathBuf>) -> Self {
        Self {
            key_file: Some(key_file.into()),
            ..Self::default()
        }
    }

    pub fn with_new_key(new_key: NewKey) -> Self {
        Self {
            new_key: Some(new_key),
            ..Self::default()
        }
    }

    pub fn subject(mut self, key: &str, value: impl Into<ConfigValue>) -> Self {
        self.distinguished_name.insert(key, value);
        self
    }

    pub fn alt_name(mut self, key: &str, value: impl Into<ConfigValue>) -> Self {
        self.alt_names.insert(key, value);
        self
    }

    pub fn digest(mut self, digest: impl Into<String>) -> Self {
        self.message_digest = Some(digest.into());
        self
    }

    pub fn output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = Some(path.into());
        self
    }
}

impl CertificateWorkflow {
    /// Render a request config and run `req -new` against an existing or a new key
    pub async fn generate_csr(&self, request: &CsrRequest) -> Result<WorkflowArtifact> {
        // Everything is validated before anything touches the filesystem
        let new_key_spec = match (&request.key_file, &request.new_key) {
            (Some(_), Some(_)) => return Err(ValidationError::ConflictingKeySource.into()),
            (None, None) => return Err(ValidationError::MissingKeySource.into()),
            (None, Some(new_key)) => Some(new_key.spec()?),
            (Some(_), None) => None,
        };
        let digest = self.digest(request.message_digest.as_deref())?;
        let dn = sanitize_block(&request.distinguished_name)?;
        let alt_names = sanitize_block(&request.alt_names)?;

        let config = csr_config(&digest, Some(dn), Some(alt_names)).render();
        let options = self.options();
        let config_path =
            write_temp_config(&options.temp_dir, "csr", &config, options.config_file_mode)?;

        let output = request
            .output_file
            .clone()
            .unwrap_or_else(|| options.default_csr_file.clone());

        let mut cmd = ToolkitCommand::new("req")
            .arg("-new")
            .path_opt("-config", &config_path)
            .path_opt(OUTPUT_FLAG, &output);

        let mut files = ArtifactFiles::new();
        files.insert(FileRole::Csr, output.clone());

        match (&request.new_key, new_key_spec) {
            (Some(new_key), Some(spec)) => {
                cmd = cmd.opt("-newkey", spec);
                for (key, value) in new_key.pkey_opts.iter() {
                    cmd = cmd.opt("-pkeyopt", format!("{key}:{value}"));
                }
                cmd = cmd.path_opt("-keyout", &new_key.key_out).arg("-noenc");
                files.insert(FileRole::Key, new_key.key_out.clone());
            }
            _ => {
                if let Some(key_file) = &request.key_file {
                    cmd = cmd.path_opt("-key", key_file);
                }
                if let Some(passphrase) = &request.key_passphrase {
                    cmd = with_passphrase(cmd, "-passin", passphrase);
                }
            }
        }

        let result = self.run(&cmd).await?;
        info!("Certificate signing request written to {}", output.display());

        Ok(WorkflowArtifact {
            output: result.stdout_text(),
            command: result.command,
            config,
            files,
        })
    }
}
