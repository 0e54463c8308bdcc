//! Parameter validation and parsing shared by the workflow operations

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::process::ToolkitCommand;

/// Prefixes the toolkit accepts as a passphrase source argument
pub const PASSPHRASE_SOURCES: [&str; 4] = ["pass:", "env:", "file:", "fd:"];

/// Passphrase argument telling the toolkit to read the secret from stdin
pub const STDIN_PASSPHRASE: &str = "stdin";

/// Message digests accepted for CSR and certificate signing
pub const SUPPORTED_DIGESTS: [&str; 18] = [
    "md5",
    "sha1",
    "sha224",
    "sha256",
    "sha384",
    "sha512",
    "sha512-224",
    "sha512-256",
    "sha3-224",
    "sha3-256",
    "sha3-384",
    "sha3-512",
    "shake128",
    "shake256",
    "sm3",
    "blake2b512",
    "blake2s256",
    "ripemd160",
];

const CIPHER_PATTERN: &str =
    r"-[a-zA-Z0-9]{2,11}(-[a-zA-Z0-9]{2,11})?(-[a-zA-Z0-9]{2,11})?(-[a-zA-Z0-9]{2,11})?";

const VERSION_PATTERN: &str = r"(?m)^\s*\S+\s+v?(\d+\.\d+(?:\.\d+)?[0-9A-Za-z\-]*)";

/// Key algorithms `genpkey -algorithm` is allowed to receive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyAlgorithm {
    #[default]
    #[serde(rename = "RSA")]
    Rsa,
    #[serde(rename = "RSA-PSS")]
    RsaPss,
    #[serde(rename = "EC")]
    Ec,
    #[serde(rename = "X25519")]
    X25519,
    #[serde(rename = "X448")]
    X448,
    #[serde(rename = "ED25519")]
    Ed25519,
    #[serde(rename = "ED448")]
    Ed448,
}

impl KeyAlgorithm {
    pub const ALL: [KeyAlgorithm; 7] = [
        KeyAlgorithm::Rsa,
        KeyAlgorithm::RsaPss,
        KeyAlgorithm::Ec,
        KeyAlgorithm::X25519,
        KeyAlgorithm::X448,
        KeyAlgorithm::Ed25519,
        KeyAlgorithm::Ed448,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyAlgorithm::Rsa => "RSA",
            KeyAlgorithm::RsaPss => "RSA-PSS",
            KeyAlgorithm::Ec => "EC",
            KeyAlgorithm::X25519 => "X25519",
            KeyAlgorithm::X448 => "X448",
            KeyAlgorithm::Ed25519 => "ED25519",
            KeyAlgorithm::Ed448 => "ED448",
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyAlgorithm {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyAlgorithm::ALL
            .into_iter()
            .find(|alg| alg.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::InvalidAlgorithm(s.to_string()))
    }
}

/// Lower-cased digest name if it is in [`SUPPORTED_DIGESTS`]
pub fn check_digest(digest: &str) -> Result<String, ValidationError> {
    let normalized = digest.trim_start_matches('-').to_ascii_lowercase();
    if SUPPORTED_DIGESTS.contains(&normalized.as_str()) {
        Ok(normalized)
    } else {
        Err(ValidationError::InvalidDigest(digest.to_string()))
    }
}

/// Cipher name without the leading dash `enc -list` prints
pub fn normalize_cipher(cipher: &str) -> &str {
    cipher.trim_start_matches('-')
}

/// Push `flag <source>`, streaming the password over stdin unless it already
/// names a toolkit passphrase source (`pass:`, `env:`, `file:`, `fd:`)
pub fn with_passphrase(command: ToolkitCommand, flag: &str, password: &str) -> ToolkitCommand {
    if PASSPHRASE_SOURCES.iter().any(|p| password.starts_with(p)) {
        command.opt(flag, password)
    } else {
        command.opt(flag, STDIN_PASSPHRASE).stdin(password)
    }
}

/// Cipher names from `enc -list` output, or `None` when nothing matches
pub fn parse_cipher_list(stdout: &str) -> Option<BTreeSet<String>> {
    let pattern = Regex::new(CIPHER_PATTERN).ok()?;
    let ciphers: BTreeSet<String> = pattern
        .find_iter(stdout)
        .map(|m| normalize_cipher(m.as_str()).to_string())
        .collect();
    if ciphers.is_empty() { None } else { Some(ciphers) }
}

/// Version token from `version` output (`OpenSSL 3.0.2 15 Mar 2022` -> `3.0.2`)
pub fn parse_version(stdout: &str) -> Option<String> {
    let pattern = Regex::new(VERSION_PATTERN).ok()?;
    pattern
        .captures(stdout)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
