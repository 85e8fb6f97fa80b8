//! Archive-wide bookkeeping catalogs under `.github/`.
//!
//! Two depth-limited sweeps over the manifest tree:
//! - `catalog.yml`: relative path → name/description per directory
//! - `md5.yml`: filename → name/path/md5 per tracked file, with
//!   duplicate-content detection

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{github_dir, IgnoreSet};
use crate::manifest::DirConfig;

/// Default directory depth for catalog sweeps
pub const DEFAULT_MAX_DEPTH: usize = 2;

/// Duplicate content found while building `md5.yml`
#[derive(Debug, Error)]
#[error("Duplicate MD5 {md5}: {first} and {second}")]
pub struct DuplicateMd5 {
    pub md5: String,
    pub first: PathBuf,
    pub second: PathBuf,
}

/// One `catalog.yml` record
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CatalogRecord {
    pub name: String,
    pub description: String,
}

/// One `md5.yml` record
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChecksumRecord {
    pub name: String,
    pub path: PathBuf,
    pub md5: String,
}

/// Build the directory catalog and write `.github/catalog.yml`.
///
/// Sorted map keyed by root-relative path, so output is deterministic.
pub fn generate_catalog(
    root: &Path,
    ignore: &IgnoreSet,
    max_depth: usize,
) -> Result<BTreeMap<String, CatalogRecord>> {
    let mut catalog = BTreeMap::new();
    collect_catalog(root, root, ignore, max_depth, &mut catalog)?;

    write_yaml(&github_dir(root).join("catalog.yml"), &catalog)?;
    info!(directories = catalog.len(), "Catalog generated");
    Ok(catalog)
}

fn collect_catalog(
    root: &Path,
    dir: &Path,
    ignore: &IgnoreSet,
    depth_left: usize,
    catalog: &mut BTreeMap<String, CatalogRecord>,
) -> Result<()> {
    let rel = dir.strip_prefix(root).unwrap_or(dir);
    if ignore.is_ignored(rel) {
        return Ok(());
    }

    let Some(config) = DirConfig::load(dir)? else {
        return Ok(());
    };

    let rel_key = if rel.as_os_str().is_empty() {
        ".".to_string()
    } else {
        rel.to_string_lossy().replace('\\', "/")
    };

    catalog.insert(
        rel_key.clone(),
        CatalogRecord {
            name: if rel_key == "." {
                config.name.clone()
            } else {
                Path::new(&rel_key)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            },
            description: if config.description.is_empty() {
                "No description available".to_string()
            } else {
                config.description.clone()
            },
        },
    );

    if depth_left == 0 {
        return Ok(());
    }

    for subdir in &config.subdirs {
        collect_catalog(root, &dir.join(subdir), ignore, depth_left - 1, catalog)?;
    }

    Ok(())
}

/// Behavior when `md5.yml` generation finds duplicate content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Log each duplicate and keep going
    #[default]
    Warn,

    /// Fail the stage on the first duplicate
    Fail,

    /// Delete later duplicates (and their generated pages), keeping the
    /// first occurrence
    Remove,
}

/// Build the checksum catalog and write `.github/md5.yml`.
///
/// Returns the catalog and the paths of any removed duplicate files.
pub fn generate_checksums(
    root: &Path,
    ignore: &IgnoreSet,
    max_depth: usize,
    policy: DuplicatePolicy,
) -> Result<(BTreeMap<String, ChecksumRecord>, Vec<PathBuf>)> {
    let mut catalog = BTreeMap::new();
    collect_checksums(root, root, ignore, max_depth, &mut catalog)?;

    // First occurrence wins; BTreeMap iteration keeps this deterministic
    let mut seen: BTreeMap<&str, &PathBuf> = BTreeMap::new();
    let mut duplicates = Vec::new();
    for (filename, record) in &catalog {
        match seen.get(record.md5.as_str()) {
            Some(first) => {
                let dup = DuplicateMd5 {
                    md5: record.md5.clone(),
                    first: (*first).clone(),
                    second: record.path.clone(),
                };
                match policy {
                    DuplicatePolicy::Fail => return Err(dup.into()),
                    _ => warn!(%dup, "Duplicate content"),
                }
                duplicates.push(filename.clone());
            }
            None => {
                seen.insert(&record.md5, &record.path);
            }
        }
    }

    let mut removed = Vec::new();
    if policy == DuplicatePolicy::Remove {
        for filename in &duplicates {
            let Some(record) = catalog.get(filename) else {
                continue;
            };
            // Stored paths are root-relative
            let path = root.join(&record.path);
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
            removed.push(path.clone());

            // Generated page goes with the file
            let page = path.with_file_name(format!(
                "{}_page.md",
                path.file_stem().unwrap_or_default().to_string_lossy()
            ));
            if page.exists() {
                std::fs::remove_file(&page)
                    .with_context(|| format!("Failed to remove {}", page.display()))?;
                removed.push(page);
            }

            info!(file = %path.display(), "Removed duplicate");
        }
        for filename in &duplicates {
            catalog.remove(filename);
        }
    }

    write_yaml(&github_dir(root).join("md5.yml"), &catalog)?;
    info!(files = catalog.len(), "Checksum catalog generated");
    Ok((catalog, removed))
}

fn collect_checksums(
    root: &Path,
    dir: &Path,
    ignore: &IgnoreSet,
    depth_left: usize,
    catalog: &mut BTreeMap<String, ChecksumRecord>,
) -> Result<()> {
    let rel = dir.strip_prefix(root).unwrap_or(dir);
    if ignore.is_ignored(rel) {
        return Ok(());
    }

    let Some(config) = DirConfig::load(dir)? else {
        return Ok(());
    };

    for file in &config.files {
        let path = dir.join(&file.filename);
        let rel_file = path.strip_prefix(root).unwrap_or(&path);
        if ignore.is_ignored(rel_file) {
            continue;
        }

        catalog.insert(
            file.filename.clone(),
            ChecksumRecord {
                name: file.name.clone(),
                path: rel_file.to_path_buf(),
                md5: file.md5.clone(),
            },
        );
    }

    if depth_left == 0 {
        return Ok(());
    }

    for subdir in &config.subdirs {
        collect_checksums(root, &dir.join(subdir), ignore, depth_left - 1, catalog)?;
    }

    Ok(())
}

fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let content = serde_yaml::to_string(value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{FileEntry, FileType};
    use tempfile::TempDir;

    fn tree_with(files: Vec<(&str, &str)>) -> TempDir {
        let temp = TempDir::new().unwrap();
        let config = DirConfig {
            name: "root".to_string(),
            description: "Root dir".to_string(),
            files: files
                .iter()
                .map(|(f, md5)| FileEntry::new(*f, FileType::from_filename(f), *md5))
                .collect(),
            subdirs: vec!["sub".to_string()],
            ..Default::default()
        };
        config.save(temp.path()).unwrap();

        std::fs::create_dir(temp.path().join("sub")).unwrap();
        DirConfig {
            name: "sub".to_string(),
            ..Default::default()
        }
        .save(&temp.path().join("sub"))
        .unwrap();

        temp
    }

    #[test]
    fn test_catalog_collects_directories() {
        let temp = tree_with(vec![]);
        let ignore = IgnoreSet::default();

        let catalog = generate_catalog(temp.path(), &ignore, DEFAULT_MAX_DEPTH).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog["."].description, "Root dir");
        assert_eq!(catalog["sub"].description, "No description available");

        assert!(github_dir(temp.path()).join("catalog.yml").exists());
    }

    #[test]
    fn test_catalog_depth_limit() {
        let temp = tree_with(vec![]);
        let ignore = IgnoreSet::default();

        let catalog = generate_catalog(temp.path(), &ignore, 0).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains_key("."));
    }

    #[test]
    fn test_checksums_unique() {
        let temp = tree_with(vec![("a.txt", "h1"), ("b.txt", "h2")]);
        let ignore = IgnoreSet::default();

        let (catalog, removed) =
            generate_checksums(temp.path(), &ignore, DEFAULT_MAX_DEPTH, DuplicatePolicy::Warn)
                .unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(removed.is_empty());
        assert_eq!(catalog["a.txt"].md5, "h1");
    }

    #[test]
    fn test_checksums_fail_on_duplicate() {
        let temp = tree_with(vec![("a.txt", "same"), ("b.txt", "same")]);
        let ignore = IgnoreSet::default();

        let result =
            generate_checksums(temp.path(), &ignore, DEFAULT_MAX_DEPTH, DuplicatePolicy::Fail);
        assert!(result.is_err());
    }

    #[test]
    fn test_checksums_remove_duplicates() {
        let temp = tree_with(vec![("a.txt", "same"), ("b.txt", "same")]);
        std::fs::write(temp.path().join("a.txt"), b"x").unwrap();
        std::fs::write(temp.path().join("b.txt"), b"x").unwrap();
        std::fs::write(temp.path().join("b_page.md"), b"page").unwrap();
        let ignore = IgnoreSet::default();

        let (catalog, removed) =
            generate_checksums(temp.path(), &ignore, DEFAULT_MAX_DEPTH, DuplicatePolicy::Remove)
                .unwrap();

        // a.txt sorts first, so b.txt is the duplicate
        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains_key("a.txt"));
        assert!(!temp.path().join("b.txt").exists());
        assert!(!temp.path().join("b_page.md").exists());
        assert!(temp.path().join("a.txt").exists());
        assert_eq!(removed.len(), 2);
        // Deletion resolves against the archive root, not the CWD
        assert!(removed.iter().all(|p| p.starts_with(temp.path())));
    }
}
