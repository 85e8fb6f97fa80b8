//! Search index generation.
//!
//! Flattens every manifest entry into `search_index.json` at the
//! archive root, pulling descriptions and dates from the metadata
//! pages so client-side search has something to match on.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::IgnoreSet;
use crate::manifest::{DirConfig, FileType};
use crate::toc::PageMeta;

/// Output file at the archive root
pub const SEARCH_INDEX_JSON: &str = "search_index.json";

/// One searchable record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRecord {
    /// Display name
    pub name: String,

    /// Root-relative directory holding the file
    pub path: String,

    /// Content category
    #[serde(rename = "type")]
    pub file_type: FileType,

    /// Abstract from the metadata page, when filled in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Topic tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Content date (YYYY-MM-DD), when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    /// Root-relative link target (page when one exists, file otherwise)
    pub link: String,
}

/// Build the flat index and write it to `<root>/search_index.json`
pub fn generate_search_index(root: &Path, ignore: &IgnoreSet) -> Result<Vec<SearchRecord>> {
    let mut records = Vec::new();
    collect(root, root, ignore, &mut records)?;

    let path = root.join(SEARCH_INDEX_JSON);
    let content = serde_json::to_string_pretty(&records)
        .context("Failed to serialize search index")?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!(records = records.len(), path = %path.display(), "Wrote search index");
    Ok(records)
}

fn collect(
    root: &Path,
    dir: &Path,
    ignore: &IgnoreSet,
    records: &mut Vec<SearchRecord>,
) -> Result<()> {
    let Some(config) = DirConfig::load(dir)? else {
        return Ok(());
    };

    let rel_dir = dir
        .strip_prefix(root)
        .unwrap_or(Path::new(""))
        .to_string_lossy()
        .replace('\\', "/");

    for entry in &config.files {
        let target = entry.page.as_deref().unwrap_or(&entry.filename);
        let link = if rel_dir.is_empty() {
            target.to_string()
        } else {
            format!("{}/{}", rel_dir, target)
        };

        let meta = entry
            .page
            .as_deref()
            .filter(|p| *p != entry.filename)
            .map(|p| PageMeta::from_file(&dir.join(p)))
            .unwrap_or_default();

        records.push(SearchRecord {
            name: entry.name.clone(),
            path: rel_dir.clone(),
            file_type: entry.file_type,
            description: meta.description,
            tags: meta.tags,
            date: meta.date,
            link,
        });
    }

    for subdir in &config.subdirs {
        let subdir_path = dir.join(subdir);
        let rel = subdir_path.strip_prefix(root).unwrap_or(&subdir_path);
        if ignore.is_ignored(rel) {
            continue;
        }
        if let Err(e) = collect(root, &subdir_path, ignore, records) {
            warn!(dir = %subdir_path.display(), error = %e, "Skipping directory");
        }
    }

    Ok(())
}
