//! Temporary config files handed to the toolkit through `-config`

use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;
use tempfile::TempPath;

use crate::error::{Result, WorkflowError};

/// Write `contents` to a fresh, uniquely named `.cnf` file in `dir`.
///
/// The file is removed when the returned path is dropped unless it is
/// persisted with [`persist`].
pub fn write_temp_config(dir: &Path, label: &str, contents: &str, mode: u32) -> Result<TempPath> {
    let fail = |source: std::io::Error| WorkflowError::ConfigWrite {
        dir: dir.to_path_buf(),
        source,
    };

    let mut file = tempfile::Builder::new()
        .prefix(&format!("sslforge-{label}-"))
        .suffix(".cnf")
        .tempfile_in(dir)
        .map_err(fail)?;
    file.write_all(contents.as_bytes()).map_err(fail)?;
    file.flush().map_err(fail)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(mode))
            .map_err(fail)?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    debug!("Wrote {label} config to {}", file.path().display());
    Ok(file.into_temp_path())
}

/// Keep a temporary config on disk past the end of the operation
pub fn persist(path: TempPath, dir: &Path) -> Result<PathBuf> {
    path.keep().map_err(|e| WorkflowError::ConfigWrite {
        dir: dir.to_path_buf(),
        source: e.error,
    })
}
