//! Directory scanner.
//!
//! Produces a fresh [`DirConfig`] for a directory from what is actually
//! on disk: one entry per tracked file with its type bucket and content
//! MD5, plus the list of tracked subdirectories.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use md5::{Digest, Md5};
use tracing::debug;

use crate::config::IgnoreSet;

use super::entry::{DirConfig, FileEntry, FileType, CONFIG_YML};

/// Bookkeeping files and generated outputs never tracked in a manifest
const EXCLUDED_FILES: [&str; 7] = [
    "README.md",
    "LICENSE",
    "LICENSE.md",
    ".gitignore",
    "digital.yml",
    "search_index.json",
    "independence_repo.json",
];

/// Scans directories into fresh manifests
pub struct Scanner<'a> {
    root: &'a Path,
    ignore: &'a IgnoreSet,
}

impl<'a> Scanner<'a> {
    pub fn new(root: &'a Path, ignore: &'a IgnoreSet) -> Self {
        Self { root, ignore }
    }

    /// Scan a single directory into a fresh manifest.
    ///
    /// Entries come out sorted by filename so repeated scans of an
    /// unchanged directory produce identical manifests.
    pub fn scan_directory(&self, dir: &Path) -> Result<DirConfig> {
        let name = if dir == self.root {
            String::new()
        } else {
            dir.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        };

        let mut config = DirConfig {
            name,
            ..Default::default()
        };

        let mut entries: Vec<_> = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read directory {}", dir.display()))?
            .collect::<std::io::Result<_>>()
            .with_context(|| format!("Failed to list directory {}", dir.display()))?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let path = entry.path();
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let rel = path.strip_prefix(self.root).unwrap_or(&path);

            let file_kind = entry
                .file_type()
                .with_context(|| format!("Failed to stat {}", path.display()))?;

            if file_kind.is_file() {
                if !self.should_include(&file_name) || self.ignore.is_ignored(rel) {
                    continue;
                }

                let md5 = file_md5(&path)?;
                let file_type = FileType::from_filename(&file_name);
                let mut file_entry = FileEntry::new(file_name, file_type, md5);
                file_entry.size = entry.metadata().ok().map(|m| m.len());

                debug!(file = %file_entry.filename, kind = %file_entry.file_type, "Scanned file");
                config.files.push(file_entry);
            } else if file_kind.is_dir() {
                if file_name.starts_with('.') || self.ignore.is_ignored(rel) {
                    continue;
                }
                config.subdirs.push(file_name);
            }
        }

        Ok(config)
    }

    /// Filter for files that belong in a manifest
    fn should_include(&self, filename: &str) -> bool {
        if filename.starts_with('.') {
            return false;
        }
        if filename == CONFIG_YML || EXCLUDED_FILES.contains(&filename) {
            return false;
        }
        // Generated metadata pages are derived state, not content
        if filename.ends_with("_page.md") {
            return false;
        }
        true
    }
}

/// MD5 of a file's content, read in chunks
pub fn file_md5(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

    let mut hasher = Md5::new();
    let mut buf = [0u8; 8192];

    loop {
        let n = file
            .read(&mut buf)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn scan(temp: &TempDir) -> DirConfig {
        let ignore = IgnoreSet::default();
        Scanner::new(temp.path(), &ignore)
            .scan_directory(temp.path())
            .unwrap()
    }

    #[test]
    fn test_scan_picks_up_files_and_subdirs() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("report.pdf"), b"pdf bytes").unwrap();
        std::fs::write(temp.path().join("cover.png"), b"png bytes").unwrap();
        std::fs::create_dir(temp.path().join("2021")).unwrap();

        let config = scan(&temp);
        assert_eq!(config.name, "");
        assert_eq!(config.files.len(), 2);
        assert_eq!(config.subdirs, vec!["2021".to_string()]);

        let report = config.file("report.pdf").unwrap();
        assert_eq!(report.file_type, FileType::Document);
        assert_eq!(report.size, Some(9));
        assert_eq!(report.md5.len(), 32);
    }

    #[test]
    fn test_scan_excludes_bookkeeping() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("README.md"), b"toc").unwrap();
        std::fs::write(temp.path().join("config.yml"), b"name: x").unwrap();
        std::fs::write(temp.path().join(".hidden"), b"dot").unwrap();
        std::fs::write(temp.path().join("essay_page.md"), b"generated").unwrap();
        std::fs::write(temp.path().join("digital.yml"), b"name: y").unwrap();
        std::fs::write(temp.path().join("search_index.json"), b"[]").unwrap();
        std::fs::write(temp.path().join("essay.txt"), b"content").unwrap();
        std::fs::create_dir(temp.path().join(".git")).unwrap();

        let config = scan(&temp);
        assert_eq!(config.files.len(), 1);
        assert_eq!(config.files[0].filename, "essay.txt");
        assert!(config.subdirs.is_empty());
    }

    #[test]
    fn test_scan_respects_ignore_patterns() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("keep.txt"), b"a").unwrap();
        std::fs::write(temp.path().join("drop.tmp"), b"b").unwrap();
        std::fs::create_dir(temp.path().join("workspace")).unwrap();

        let ignore = IgnoreSet::new(&["*.tmp".to_string(), "workspace".to_string()]);
        let config = Scanner::new(temp.path(), &ignore)
            .scan_directory(temp.path())
            .unwrap();

        assert_eq!(config.files.len(), 1);
        assert_eq!(config.files[0].filename, "keep.txt");
        assert!(config.subdirs.is_empty());
    }

    #[test]
    fn test_md5_stable_across_runs() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.bin");
        std::fs::write(&path, b"identical bytes").unwrap();

        let first = file_md5(&path).unwrap();
        let second = file_md5(&path).unwrap();
        assert_eq!(first, second);

        // Known digest for fixed input
        std::fs::write(&path, b"").unwrap();
        assert_eq!(file_md5(&path).unwrap(), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_scan_is_deterministic() {
        let temp = TempDir::new().unwrap();
        for name in ["b.txt", "a.txt", "c.txt"] {
            std::fs::write(temp.path().join(name), name.as_bytes()).unwrap();
        }

        let first = scan(&temp);
        let second = scan(&temp);
        assert_eq!(first, second);

        let names: Vec<_> = first.files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
    }
}
