//! Results handed back by workflow operations

use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;

/// Logical role of a file produced or consumed by an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FileRole {
    Key,
    Csr,
    CaCrt,
    CaKey,
    Crt,
}

impl FileRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileRole::Key => "key",
            FileRole::Csr => "csr",
            FileRole::CaCrt => "caCrt",
            FileRole::CaKey => "caKey",
            FileRole::Crt => "crt",
        }
    }
}

impl fmt::Display for FileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type ArtifactFiles = IndexMap<FileRole, PathBuf>;

/// Output of `generate_private_key`
#[derive(Debug, Clone, Serialize)]
pub struct PrivateKey {
    /// PEM text from stdout; empty when written to a file
    pub key: String,
    pub command: String,
    pub files: ArtifactFiles,
}

/// Output of CSR generation, CA creation and CSR signing
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowArtifact {
    /// Exact command line that produced the artifact
    pub command: String,
    /// Rendered config document used, empty when none was needed
    pub config: String,
    pub files: ArtifactFiles,
    /// Anything the toolkit printed to stdout (e.g. a certificate with no `-out`)
    #[serde(skip_serializing_if = "String::is_empty")]
    pub output: String,
}

impl WorkflowArtifact {
    pub fn file(&self, role: FileRole) -> Option<&Path> {
        self.files.get(&role).map(PathBuf::as_path)
    }
}
