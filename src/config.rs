//! Toolkit settings loaded from `sslforge.toml`
//!
//! ```toml
//! openssl_path = "/usr/local/opt/openssl@3/bin/openssl"
//! temp_dir = "/var/tmp/sslforge"
//! config_file_mode = 0o600
//! command_timeout_secs = 60
//! default_digest = "sha256"
//! default_expiry_days = 825
//! default_csr_file = "request.pem"
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::workflow::{CertificateWorkflow, DEFAULT_PROGRAM, WorkflowOptions};

/// Environment variable overriding `openssl_path`
pub const OPENSSL_ENV: &str = "SSLFORGE_OPENSSL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Settings for one [`CertificateWorkflow`]; every field is optional in the file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolkitConfig {
    /// Toolkit binary, looked up on `PATH` when not absolute
    pub openssl_path: PathBuf,
    /// Where temporary config files go (system temp dir when unset)
    pub temp_dir: Option<PathBuf>,
    /// Permission bits for temporary config files
    pub config_file_mode: u32,
    pub command_timeout_secs: Option<u64>,
    pub default_digest: String,
    pub default_expiry_days: u32,
    pub default_csr_file: PathBuf,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        let options = WorkflowOptions::default();
        Self {
            openssl_path: PathBuf::from(DEFAULT_PROGRAM),
            temp_dir: None,
            config_file_mode: options.config_file_mode,
            command_timeout_secs: None,
            default_digest: options.default_digest,
            default_expiry_days: options.default_expiry_days,
            default_csr_file: options.default_csr_file,
        }
    }
}

impl ToolkitConfig {
    /// `<config dir>/sslforge/sslforge.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sslforge").join("sslforge.toml"))
    }

    /// Load `explicit` if given, else the default path if it exists, else defaults.
    ///
    /// A missing default file is not an error and nothing is written.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::from_file(&path),
                _ => {
                    debug!("No config file found, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Using config from: {}", path.display());
        Ok(config)
    }

    /// Toolkit binary to run, honouring [`OPENSSL_ENV`]
    pub fn resolve_program(&self) -> PathBuf {
        self.resolve_program_with(std::env::var_os(OPENSSL_ENV))
    }

    fn resolve_program_with(&self, env_override: Option<OsString>) -> PathBuf {
        let requested = env_override
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| self.openssl_path.clone());

        match which::which(&requested) {
            Ok(found) => found,
            Err(e) => {
                // Left as-is; the first invocation reports a launch error
                debug!("Could not resolve {}: {e}", requested.display());
                requested
            }
        }
    }

    pub fn workflow_options(&self) -> WorkflowOptions {
        let defaults = WorkflowOptions::default();
        WorkflowOptions {
            temp_dir: self.temp_dir.clone().unwrap_or(defaults.temp_dir),
            config_file_mode: self.config_file_mode,
            timeout: self.command_timeout_secs.map(Duration::from_secs),
            cancel: defaults.cancel,
            default_digest: self.default_digest.clone(),
            default_expiry_days: self.default_expiry_days,
            default_csr_file: self.default_csr_file.clone(),
        }
    }

    pub fn workflow(&self) -> CertificateWorkflow {
        CertificateWorkflow::with_options(self.resolve_program(), self.workflow_options())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: ToolkitConfig = toml::from_str("").unwrap();
        assert_eq!(config, ToolkitConfig::default());
        assert_eq!(config.default_digest, "sha512");
        assert_eq!(config.default_expiry_days, 365);
        assert_eq!(config.config_file_mode, 0o644);
    }

    #[test]
    fn partial_file_overrides_fields() {
        let config: ToolkitConfig = toml::from_str(
            "config_file_mode = 0o600\ncommand_timeout_secs = 30\ndefault_digest = \"sha256\"\n",
        )
        .unwrap();
        assert_eq!(config.config_file_mode, 0o600);
        assert_eq!(config.default_digest, "sha256");

        let options = config.workflow_options();
        assert_eq!(options.timeout, Some(Duration::from_secs(30)));
        assert_eq!(options.default_csr_file, PathBuf::from("csr.pem"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ToolkitConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sslforge.toml");
        std::fs::write(&path, "default_expiry_days = \"soon\"\n").unwrap();
        let err = ToolkitConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn env_override_wins_and_unresolvable_paths_are_kept() {
        let config = ToolkitConfig::default();
        let program = config.resolve_program_with(Some("/nonexistent/openssl".into()));
        assert_eq!(program, PathBuf::from("/nonexistent/openssl"));

        let config = ToolkitConfig {
            openssl_path: PathBuf::from("sslforge-no-such-binary"),
            ..ToolkitConfig::default()
        };
        assert_eq!(
            config.resolve_program_with(Some(OsString::new())),
            PathBuf::from("sslforge-no-such-binary")
        );
    }
}
