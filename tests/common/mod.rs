//! Fake toolkit used by the integration tests.
//!
//! One shell script is written per test binary, before anything is spawned,
//! and every test links to it from its own directory. The script appends its
//! arguments to `<link>.log`, so each test sees only its own invocations.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use sslforge::{CertificateWorkflow, WorkflowOptions};
use tempfile::TempDir;

const SCRIPT: &str = r#"#!/bin/sh
echo "$*" >> "$0.log"
verb="$1"
shift
out=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "-out" ]; then out="$arg"; fi
  prev="$arg"
done
case "$(basename "$0")" in
  *broken*)
    echo "nothing useful here"
    exit 0
    ;;
esac
case "$verb" in
  enc)
    echo "Supported ciphers:"
    echo "-aes-128-cbc               -aes-256-cbc               -des3"
    ;;
  version)
    echo "OpenSSL 3.0.2 15 Mar 2022 (Library: OpenSSL 3.0.2 15 Mar 2022)"
    ;;
  genpkey|req)
    if [ -n "$out" ]; then
      echo "fake $verb output" > "$out"
    else
      echo "-----BEGIN FAKE-----"
    fi
    ;;
  echo-stdin)
    cat
    ;;
  fail)
    echo "fake failure" >&2
    exit 3
    ;;
  quiet)
    exit 0
    ;;
  quiet-fail)
    exit 4
    ;;
  warn)
    echo "warning: deprecated option" >&2
    echo "done"
    ;;
  sleep)
    sleep 10
    ;;
  flood)
    head -c "$1" /dev/zero | tr '\0' a
    ;;
  flood-fail)
    head -c "$1" /dev/zero | tr '\0' e >&2
    exit 5
    ;;
  *)
    echo "unknown verb $verb" >&2
    exit 1
    ;;
esac
"#;

static SCRIPT_DIR: LazyLock<TempDir> = LazyLock::new(|| {
    let dir = tempfile::tempdir().expect("script dir");
    let path = dir.path().join("fake-openssl.sh");
    std::fs::write(&path, SCRIPT).expect("write script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
    dir
});

/// Shared script; call before spawning anything in a test
pub fn script() -> PathBuf {
    SCRIPT_DIR.path().join("fake-openssl.sh")
}

/// Per-test link to the fake script plus a scratch directory
pub struct FakeToolkit {
    pub dir: TempDir,
    pub program: PathBuf,
}

impl FakeToolkit {
    pub fn new() -> Self {
        Self::named("openssl")
    }

    /// A link whose name contains `broken` prints garbage for every verb
    pub fn named(name: &str) -> Self {
        let script = script();
        let dir = tempfile::tempdir().expect("test dir");
        let program = dir.path().join(name);
        std::os::unix::fs::symlink(&script, &program).expect("symlink");
        Self { dir, program }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn options(&self) -> WorkflowOptions {
        WorkflowOptions {
            temp_dir: self.dir.path().to_path_buf(),
            default_csr_file: self.path("csr.pem"),
            ..WorkflowOptions::default()
        }
    }

    pub fn workflow(&self) -> CertificateWorkflow {
        CertificateWorkflow::with_options(&self.program, self.options())
    }

    /// Argument lines the script recorded, oldest first
    pub fn invocations(&self) -> Vec<String> {
        let log = PathBuf::from(format!("{}.log", self.program.display()));
        match std::fs::read_to_string(log) {
            Ok(text) => text.lines().map(str::to_string).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Temporary config files currently on disk
    pub fn config_files(&self, label: &str) -> Vec<PathBuf> {
        list_configs(self.dir.path(), label)
    }
}

pub fn list_configs(dir: &Path, label: &str) -> Vec<PathBuf> {
    let prefix = format!("sslforge-{label}-");
    let mut found: Vec<PathBuf> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| {
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(".cnf"))
                })
                .collect()
        })
        .unwrap_or_default();
    found.sort();
    found
}
