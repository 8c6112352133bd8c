//! Transactional output files
//!
//! Work is written into a temporary directory next to the final location and
//! moved into place only when it succeeds, so a destination path either holds
//! a complete result or does not exist.

use crate::utils::ensure_parent_dirs;
use crate::{SentieonError, SentieonResult};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Index files published together with their data file
pub const COMPANION_SUFFIXES: &[&str] = &[".tbi", ".csi", ".idx"];

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Run `work` with a temporary path standing in for `out_file`.
///
/// On success the temporary file (and any index written beside it) is renamed
/// onto `out_file`. On error everything written to the temporary directory is
/// removed and `out_file` is left untouched.
pub fn file_transaction<T, F>(out_file: &Path, work: F) -> SentieonResult<T>
where
    F: FnOnce(&Path) -> SentieonResult<T>,
{
    let name = out_file.file_name().ok_or_else(|| {
        SentieonError::InvalidArgument(format!("Not a file path: {}", out_file.display()))
    })?;
    ensure_parent_dirs(out_file)?;
    let parent = match out_file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let tx_dir = tempfile::Builder::new().prefix(".tx-").tempdir_in(parent)?;
    let tx_file = tx_dir.path().join(name);
    log::debug!("Transaction for {} in {}", out_file.display(), tx_dir.path().display());

    let result = match work(&tx_file) {
        Ok(result) => result,
        Err(e) => {
            log::debug!("Discarding transaction for {}", out_file.display());
            return Err(e);
        }
    };

    if !tx_file.exists() {
        return Err(SentieonError::MissingOutput(out_file.display().to_string()));
    }

    // Indexes first so the data file never appears without them
    for suffix in COMPANION_SUFFIXES {
        let tx_index = with_suffix(&tx_file, suffix);
        if tx_index.exists() {
            std::fs::rename(&tx_index, with_suffix(out_file, suffix))?;
        }
    }
    std::fs::rename(&tx_file, out_file)?;
    tx_dir.close()?;

    Ok(result)
}
