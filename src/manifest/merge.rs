//! Manifest merging and change detection.
//!
//! A rescan must not wipe out metadata that later pipeline stages have
//! attached to entries, so merging prefers the existing entry whenever
//! the file content is unchanged (same MD5) and only takes the fresh
//! entry when the content changed or the file is new.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{info, warn};

use crate::config::IgnoreSet;

use super::entry::DirConfig;
use super::scan::Scanner;

/// A detected difference between an existing manifest and a rescan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Added(PathBuf),
    Modified(PathBuf),
    Deleted(PathBuf),
}

impl std::fmt::Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Change::Added(path) => write!(f, "Added: {}", path.display()),
            Change::Modified(path) => write!(f, "Modified: {}", path.display()),
            Change::Deleted(path) => write!(f, "Deleted: {}", path.display()),
        }
    }
}

/// Merge an existing manifest with a fresh scan of the same directory.
///
/// Detected changes are appended to `changes`. When `old` is `None` the
/// fresh scan is returned as-is.
pub fn merge_configs(
    old: Option<DirConfig>,
    new: DirConfig,
    dir: &Path,
    changes: &mut Vec<Change>,
) -> DirConfig {
    let Some(old) = old else {
        return new;
    };

    let mut merged_files = Vec::with_capacity(new.files.len());
    let new_names: HashSet<&str> = new.files.iter().map(|f| f.filename.as_str()).collect();

    for new_file in &new.files {
        match old.file(&new_file.filename) {
            Some(old_file) if old_file.md5 == new_file.md5 => {
                // Unchanged content: keep accumulated metadata
                merged_files.push(old_file.clone());
            }
            Some(_) => {
                changes.push(Change::Modified(dir.join(&new_file.filename)));
                merged_files.push(new_file.clone());
            }
            None => {
                changes.push(Change::Added(dir.join(&new_file.filename)));
                merged_files.push(new_file.clone());
            }
        }
    }

    for old_file in &old.files {
        if !new_names.contains(old_file.filename.as_str()) {
            changes.push(Change::Deleted(dir.join(&old_file.filename)));
        }
    }

    DirConfig {
        // Hand-maintained fields survive the rescan
        name: old.name,
        description: old.description,
        tags: old.tags,
        files: merged_files,
        subdirs: new.subdirs,
    }
}

/// Scan and merge a directory tree rooted at `root`, writing manifests
/// where needed. Returns every detected change.
///
/// A directory that fails to scan is logged and skipped; its existing
/// manifest (and subtree) is left untouched.
pub fn update_tree(root: &Path, ignore: &IgnoreSet) -> Result<Vec<Change>> {
    let scanner = Scanner::new(root, ignore);
    let mut changes = Vec::new();
    update_directory(&scanner, root, &mut changes)?;
    Ok(changes)
}

fn update_directory(scanner: &Scanner<'_>, dir: &Path, changes: &mut Vec<Change>) -> Result<()> {
    let old = DirConfig::load(dir)?;
    let had_config = old.is_some();

    let fresh = scanner.scan_directory(dir)?;

    let before = changes.len();
    let merged = merge_configs(old, fresh, dir, changes);
    let changed = changes.len() > before;

    if !had_config || changed {
        merged.save(dir)?;
        info!(dir = %dir.display(), "Updated manifest");
    }

    for subdir in &merged.subdirs {
        let subdir_path = dir.join(subdir);
        if let Err(e) = update_directory(scanner, &subdir_path, changes) {
            warn!(dir = %subdir_path.display(), error = %e, "Skipping directory");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::entry::{FileEntry, FileType};
    use tempfile::TempDir;

    fn entry(filename: &str, md5: &str) -> FileEntry {
        FileEntry::new(filename, FileType::from_filename(filename), md5)
    }

    #[test]
    fn test_merge_preserves_metadata_when_unchanged() {
        let mut old_entry = entry("a.pdf", "hash1");
        old_entry.page = Some("a_page.md".to_string());
        old_entry.archived = Some("2021-05-01".to_string());

        let old = DirConfig {
            description: "curated".to_string(),
            files: vec![old_entry],
            ..Default::default()
        };
        let new = DirConfig {
            files: vec![entry("a.pdf", "hash1")],
            ..Default::default()
        };

        let mut changes = Vec::new();
        let merged = merge_configs(Some(old), new, Path::new("."), &mut changes);

        assert!(changes.is_empty());
        assert_eq!(merged.description, "curated");
        assert_eq!(merged.files[0].page.as_deref(), Some("a_page.md"));
        assert_eq!(merged.files[0].archived.as_deref(), Some("2021-05-01"));
    }

    #[test]
    fn test_merge_detects_added_modified_deleted() {
        let old = DirConfig {
            files: vec![entry("kept.txt", "same"), entry("gone.txt", "x")],
            ..Default::default()
        };
        let new = DirConfig {
            files: vec![
                entry("kept.txt", "same"),
                entry("fresh.txt", "y"),
            ],
            ..Default::default()
        };

        let mut changes = Vec::new();
        merge_configs(Some(old), new, Path::new("dir"), &mut changes);

        assert!(changes.contains(&Change::Added(PathBuf::from("dir/fresh.txt"))));
        assert!(changes.contains(&Change::Deleted(PathBuf::from("dir/gone.txt"))));
        assert_eq!(changes.len(), 2);
    }

    #[test]
    fn test_change_display_names_the_path() {
        assert_eq!(
            Change::Added(PathBuf::from("dir/a.txt")).to_string(),
            "Added: dir/a.txt"
        );
        assert_eq!(
            Change::Modified(PathBuf::from("dir/a.txt")).to_string(),
            "Modified: dir/a.txt"
        );
        assert_eq!(
            Change::Deleted(PathBuf::from("dir/a.txt")).to_string(),
            "Deleted: dir/a.txt"
        );
    }

    #[test]
    fn test_merge_replaces_entry_on_content_change() {
        let mut old_entry = entry("a.pdf", "before");
        old_entry.page = Some("stale_page.md".to_string());

        let old = DirConfig {
            files: vec![old_entry],
            ..Default::default()
        };
        let new = DirConfig {
            files: vec![entry("a.pdf", "after")],
            ..Default::default()
        };

        let mut changes = Vec::new();
        let merged = merge_configs(Some(old), new, Path::new("dir"), &mut changes);

        assert_eq!(changes, vec![Change::Modified(PathBuf::from("dir/a.pdf"))]);
        assert_eq!(merged.files[0].md5, "after");
        assert!(merged.files[0].page.is_none());
    }

    #[test]
    fn test_merge_idempotent_for_unchanged_inputs() {
        let config = DirConfig {
            files: vec![entry("a.txt", "h1"), entry("b.txt", "h2")],
            subdirs: vec!["sub".to_string()],
            ..Default::default()
        };

        let mut changes = Vec::new();
        let once = merge_configs(Some(config.clone()), config.clone(), Path::new("."), &mut changes);
        let twice = merge_configs(Some(once.clone()), config.clone(), Path::new("."), &mut changes);

        assert!(changes.is_empty());
        assert_eq!(once, twice);
        assert_eq!(once, config);
    }

    #[test]
    fn test_update_tree_writes_manifests_recursively() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("top.txt"), b"top").unwrap();
        std::fs::create_dir(temp.path().join("sub")).unwrap();
        std::fs::write(temp.path().join("sub/inner.txt"), b"inner").unwrap();

        let ignore = IgnoreSet::default();
        // First run: no previous manifests to diff against
        let changes = update_tree(temp.path(), &ignore).unwrap();
        assert!(changes.is_empty());

        let root_config = DirConfig::load(temp.path()).unwrap().unwrap();
        assert_eq!(root_config.subdirs, vec!["sub".to_string()]);
        let sub_config = DirConfig::load(&temp.path().join("sub")).unwrap().unwrap();
        assert_eq!(sub_config.files[0].filename, "inner.txt");

        // Second run over the unchanged tree is a no-op
        let changes = update_tree(temp.path(), &ignore).unwrap();
        assert!(changes.is_empty());

        // A new file shows up as Added on the next run
        std::fs::write(temp.path().join("sub/late.txt"), b"late").unwrap();
        let changes = update_tree(temp.path(), &ignore).unwrap();
        assert_eq!(
            changes,
            vec![Change::Added(temp.path().join("sub/late.txt"))]
        );
    }
}
