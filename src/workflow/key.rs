//! Private key generation (`genpkey`)

use std::path::PathBuf;

use log::info;

use super::CertificateWorkflow;
use super::artifact::{ArtifactFiles, FileRole, PrivateKey};
use super::params::{KeyAlgorithm, normalize_cipher, with_passphrase};
use crate::cnf::{ConfigBlock, ConfigValue};
use crate::error::{Result, ValidationError};
use crate::process::{OUTPUT_FLAG, ToolkitCommand};

/// Cipher and password protecting a generated key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEncryption {
    /// Any name printed by `enc -list`, with or without the leading dash
    pub cipher: String,
    /// Plain password, or a toolkit passphrase source such as `env:VAR`
    pub password: String,
}

impl KeyEncryption {
    pub fn new(cipher: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            cipher: cipher.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PrivateKeyRequest {
    /// Defaults to RSA when neither this nor `param_file` is set
    pub algorithm: Option<KeyAlgorithm>,
    /// Parameter file the toolkit derives the algorithm from
    pub param_file: Option<PathBuf>,
    /// Per-algorithm options, passed as `-pkeyopt key:value` in order
    pub pkey_opts: ConfigBlock,
    pub encryption: Option<KeyEncryption>,
    /// Write the key here instead of returning it on stdout
    pub output_file: Option<PathBuf>,
}

impl PrivateKeyRequest {
    pub fn new(algorithm: KeyAlgorithm) -> Self {
        Self {
            algorithm: Some(algorithm),
            ..Self::default()
        }
    }

    pub fn from_param_file(param_file: impl Into<PathBuf>) -> Self {
        Self {
            param_file: Some(param_file.into()),
            ..Self::default()
        }
    }

    pub fn pkey_opt(mut self, key: &str, value: impl Into<ConfigValue>) -> Self {
        self.pkey_opts.insert(key, value);
        self
    }

    pub fn encrypted(mut self, cipher: impl Into<String>, password: impl Into<String>) -> Self {
        self.encryption = Some(KeyEncryption::new(cipher, password));
        self
    }

    pub fn output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = Some(path.into());
        self
    }
}

/// Argument vector for `request`.
///
/// The cipher is not checked against the toolkit here; that needs the
/// cipher list and happens in [`CertificateWorkflow::generate_private_key`].
pub(crate) fn genpkey_command(
    request: &PrivateKeyRequest,
) -> std::result::Result<ToolkitCommand, ValidationError> {
    let mut cmd = ToolkitCommand::new("genpkey").opt("-outform", "PEM");

    cmd = match (&request.param_file, request.algorithm) {
        (Some(_), Some(_)) => return Err(ValidationError::ConflictingKeyParameters),
        (Some(param_file), None) => cmd.path_opt("-paramfile", param_file),
        (None, algorithm) => cmd.opt("-algorithm", algorithm.unwrap_or_default().as_str()),
    };

    for (key, value) in request.pkey_opts.iter() {
        cmd = cmd.opt("-pkeyopt", format!("{key}:{value}"));
    }

    if let Some(encryption) = &request.encryption {
        cmd = with_passphrase(cmd, "-pass", &encryption.password);
        cmd = cmd.arg(format!("-{}", normalize_cipher(&encryption.cipher)));
    }

    if let Some(output) = &request.output_file {
        cmd = cmd.path_opt(OUTPUT_FLAG, output);
    }

    Ok(cmd)
}

impl CertificateWorkflow {
    /// Generate a private key, optionally encrypted with a supported cipher
    pub async fn generate_private_key(&self, request: &PrivateKeyRequest) -> Result<PrivateKey> {
        let cmd = genpkey_command(request)?;

        if let Some(encryption) = &request.encryption {
            let cipher = normalize_cipher(&encryption.cipher);
            if !self.supported_ciphers().await?.contains(cipher) {
                return Err(ValidationError::InvalidCipher(encryption.cipher.clone()).into());
            }
        }

        let result = self.run(&cmd).await?;

        let mut files = ArtifactFiles::new();
        if let Some(output) = &request.output_file {
            files.insert(FileRole::Key, output.clone());
            info!("Private key written to {}", output.display());
        }

        Ok(PrivateKey {
            key: result.stdout_text(),
            command: result.command,
            files,
        })
    }
}
