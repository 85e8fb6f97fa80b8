//! Filename normalization.
//!
//! Spaces in file and directory names break markdown links, so the
//! first pipeline stage replaces them with underscores throughout the
//! tree before anything is scanned.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::IgnoreSet;

/// Rename files and directories containing spaces, bottom-up.
///
/// Returns how many entries were renamed. A name collision leaves the
/// original in place with a warning.
pub fn normalize_names(root: &Path, ignore: &IgnoreSet) -> Result<usize> {
    normalize_dir(root, root, ignore)
}

fn normalize_dir(root: &Path, dir: &Path, ignore: &IgnoreSet) -> Result<usize> {
    let mut renamed = 0;

    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?;

    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to read entry in {}", dir.display()))?;
        let path = entry.path();

        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }

        let rel = path.strip_prefix(root).unwrap_or(&path);
        if ignore.is_ignored(rel) {
            continue;
        }

        // Recurse before renaming so child paths stay valid
        if path.is_dir() {
            renamed += normalize_dir(root, &path, ignore)?;
        }

        if !name.contains(' ') {
            continue;
        }

        let new_name = name.replace(' ', "_");
        let new_path = dir.join(&new_name);
        if new_path.exists() {
            warn!(from = %path.display(), to = %new_path.display(), "Rename target exists, keeping original");
            continue;
        }

        std::fs::rename(&path, &new_path)
            .with_context(|| format!("Failed to rename {}", path.display()))?;
        info!(from = %name, to = %new_name, dir = %dir.display(), "Renamed");
        renamed += 1;
    }

    Ok(renamed)
}
