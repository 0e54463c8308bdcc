//! Self-signed root CAs and their bound signers

use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;

use super::CertificateWorkflow;
use super::artifact::{ArtifactFiles, FileRole, WorkflowArtifact};
use super::params::with_passphrase;
use super::sign::SignRequest;
use super::tempconf::{persist, write_temp_config};
use crate::cnf::{ConfigBlock, ConfigValue, LEAF_EXTENSIONS, ca_config, sanitize_block};
use crate::error::Result;
use crate::process::{OUTPUT_FLAG, ToolkitCommand};

/// Parameters for [`CertificateWorkflow::generate_root_ca`]
#[derive(Debug, Clone, Default)]
pub struct RootCaRequest {
    /// Existing private key the CA certificate is self-signed with
    pub key_file: PathBuf,
    pub key_passphrase: Option<String>,
    /// Where the CA certificate is written
    pub output_file: PathBuf,
    pub distinguished_name: ConfigBlock,
    /// Falls back to the workflow's default validity
    pub expiry_days: Option<u32>,
    pub message_digest: Option<String>,
}

impl RootCaRequest {
    pub fn new(key_file: impl Into<PathBuf>, output_file: impl Into<PathBuf>) -> Self {
        Self {
            key_file: key_file.into(),
            output_file: output_file.into(),
            ..Self::default()
        }
    }

    pub fn subject(mut self, key: &str, value: impl Into<ConfigValue>) -> Self {
        self.distinguished_name.insert(key, value);
        self
    }

    pub fn expiry_days(mut self, days: u32) -> Self {
        self.expiry_days = Some(days);
        self
    }

    pub fn digest(mut self, digest: impl Into<String>) -> Self {
        self.message_digest = Some(digest.into());
        self
    }

    pub fn key_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.key_passphrase = Some(passphrase.into());
        self
    }
}

/// Everything needed to sign with an existing CA
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaIdentity {
    pub certificate: PathBuf,
    pub key: PathBuf,
    /// Persisted config document the CA was created with
    pub config: PathBuf,
    #[serde(skip)]
    pub key_passphrase: Option<String>,
    /// Rendered text of `config`, reported on signed artifacts
    #[serde(skip)]
    pub config_text: String,
}

/// What a bound signer needs from the caller
#[derive(Debug, Clone, Default)]
pub struct CaSignRequest {
    pub csr_file: PathBuf,
    pub output_file: Option<PathBuf>,
    pub expiry_days: Option<u32>,
}

impl CaSignRequest {
    pub fn new(csr_file: impl Into<PathBuf>) -> Self {
        Self {
            csr_file: csr_file.into(),
            ..Self::default()
        }
    }

    pub fn output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = Some(path.into());
        self
    }

    pub fn expiry_days(mut self, days: u32) -> Self {
        self.expiry_days = Some(days);
        self
    }
}

/// Signing capability bound to one CA.
///
/// Holds paths only; the CA files stay where they are and may back any
/// number of signing calls.
#[derive(Debug, Clone)]
pub struct CaSigner {
    workflow: CertificateWorkflow,
    identity: CaIdentity,
}

impl CaSigner {
    pub fn new(workflow: CertificateWorkflow, identity: CaIdentity) -> Self {
        Self { workflow, identity }
    }

    pub fn identity(&self) -> &CaIdentity {
        &self.identity
    }

    /// Sign a CSR as a leaf certificate of this CA
    pub async fn sign(&self, request: &CaSignRequest) -> Result<WorkflowArtifact> {
        let identity = &self.identity;
        let sign = SignRequest {
            csr_file: request.csr_file.clone(),
            ca_crt_file: identity.certificate.clone(),
            ca_key_file: identity.key.clone(),
            config_file: identity.config.clone(),
            ca_key_passphrase: identity.key_passphrase.clone(),
            expiry_days: request.expiry_days,
            output_file: request.output_file.clone(),
            extensions: Some(LEAF_EXTENSIONS.to_string()),
        };

        let mut artifact = self.workflow.sign_csr(&sign).await?;
        artifact.config = identity.config_text.clone();
        Ok(artifact)
    }
}

/// A created root CA plus the signer bound to it
#[derive(Debug, Clone, Serialize)]
pub struct RootCa {
    #[serde(flatten)]
    pub artifact: WorkflowArtifact,
    #[serde(skip)]
    pub signer: CaSigner,
}

impl RootCa {
    pub fn certificate(&self) -> &Path {
        &self.signer.identity.certificate
    }

    pub async fn sign(&self, request: &CaSignRequest) -> Result<WorkflowArtifact> {
        self.signer.sign(request).await
    }
}

impl CertificateWorkflow {
    /// Self-sign a CA certificate for an existing key.
    ///
    /// The config file is kept on disk since the returned signer reuses it.
    pub async fn generate_root_ca(&self, request: &RootCaRequest) -> Result<RootCa> {
        let digest = self.digest(request.message_digest.as_deref())?;
        let dn = sanitize_block(&request.distinguished_name)?;
        let days = self.expiry_days(request.expiry_days);

        let config = ca_config(&digest, Some(dn)).render();
        let options = self.options();
        let temp = write_temp_config(&options.temp_dir, "ca", &config, options.config_file_mode)?;

        let mut cmd = ToolkitCommand::new("req")
            .args(["-new", "-x509"])
            .path_opt("-config", &temp)
            .path_opt("-key", &request.key_file);
        if let Some(passphrase) = &request.key_passphrase {
            cmd = with_passphrase(cmd, "-passin", passphrase);
        }
        cmd = cmd
            .opt("-days", days.to_string())
            .path_opt(OUTPUT_FLAG, &request.output_file);

        // A failed run drops `temp` and with it the config file
        let result = self.run(&cmd).await?;
        let config_path = persist(temp, &options.temp_dir)?;
        info!(
            "Root CA written to {} (config {})",
            request.output_file.display(),
            config_path.display()
        );

        let mut files = ArtifactFiles::new();
        files.insert(FileRole::CaCrt, request.output_file.clone());
        files.insert(FileRole::CaKey, request.key_file.clone());

        let identity = CaIdentity {
            certificate: request.output_file.clone(),
            key: request.key_file.clone(),
            config: config_path,
            key_passphrase: request.key_passphrase.clone(),
            config_text: config.clone(),
        };

        Ok(RootCa {
            artifact: WorkflowArtifact {
                output: result.stdout_text(),
                command: result.command,
                config,
                files,
            },
            signer: CaSigner::new(self.clone(), identity),
        })
    }
}
