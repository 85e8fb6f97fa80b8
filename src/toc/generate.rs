//! Recursive README generation.
//!
//! Walks the manifest tree (following `subdirs`, not the raw
//! filesystem) and writes one `README.md` per directory. The root
//! README additionally lists satellite archives and can be shaped by a
//! `.github/README.md.template` with a `{{TABLE_OF_CONTENTS}}`
//! placeholder.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{github_dir, ArchiveConfig, IgnoreSet, IndependenceEntry};
use crate::manifest::{DirConfig, FileType};

use super::page_meta::PageMeta;
use super::render::{DirItem, FileItem, TocFormat};
use super::sort::sort_natural;

/// Placeholder substituted into README templates
pub const TOC_PLACEHOLDER: &str = "{{TABLE_OF_CONTENTS}}";

/// Wordcloud page looked for in each directory
const WORDCLOUD_PAGE: &str = "abstracts_wordcloud.html";

/// Generates READMEs for a whole archive
pub struct TocGenerator<'a> {
    root: &'a Path,
    archive: &'a ArchiveConfig,
    ignore: IgnoreSet,
    format: TocFormat,
    wordcloud: bool,
}

impl<'a> TocGenerator<'a> {
    pub fn new(root: &'a Path, archive: &'a ArchiveConfig, format: TocFormat) -> Self {
        Self {
            root,
            archive,
            ignore: archive.ignore_set(),
            format,
            wordcloud: archive.build_config.generate_wordcloud,
        }
    }

    /// Override the wordcloud embedding option from `digital.yml`
    pub fn with_wordcloud(mut self, wordcloud: bool) -> Self {
        self.wordcloud = wordcloud;
        self
    }

    /// Generate READMEs for the root and every tracked subdirectory.
    ///
    /// A directory that fails to render is logged and skipped; its
    /// subtree is still visited.
    pub fn generate(&self) -> Result<()> {
        self.generate_dir(self.root)
    }

    fn generate_dir(&self, dir: &Path) -> Result<()> {
        let Some(config) = DirConfig::load(dir)? else {
            warn!(dir = %dir.display(), "No manifest, skipping TOC");
            return Ok(());
        };

        let readme = self.render_directory(dir, &config)?;
        std::fs::write(dir.join("README.md"), readme)
            .with_context(|| format!("Failed to write README in {}", dir.display()))?;
        info!(dir = %dir.display(), "Wrote README");

        for subdir in &config.subdirs {
            let subdir_path = dir.join(subdir);
            if self.is_ignored(&subdir_path) {
                continue;
            }
            if let Err(e) = self.generate_dir(&subdir_path) {
                warn!(dir = %subdir_path.display(), error = %e, "Skipping TOC");
            }
        }

        Ok(())
    }

    /// Render the complete README body for one directory
    fn render_directory(&self, dir: &Path, config: &DirConfig) -> Result<String> {
        let is_root = dir == self.root;
        let toc = self.render_toc(dir, config);

        // Per-directory template overrides the default layout
        if let Some(template) = self.template_for(dir)? {
            return Ok(template.replace(TOC_PLACEHOLDER, &toc));
        }

        let (title, description) = if is_root {
            (self.archive.name.as_str(), self.archive.description.as_str())
        } else {
            (config.name.as_str(), config.description.as_str())
        };

        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", title));
        if !description.is_empty() {
            out.push_str(&format!("{}\n\n", description));
        }
        out.push_str(&toc);
        Ok(out)
    }

    /// Render only the TOC body (counts, directories, categorized files)
    fn render_toc(&self, dir: &Path, config: &DirConfig) -> String {
        let mut out = String::new();

        // The count marker is parsed back by satellite archives
        let total = self.count_recursive(dir) + if dir == self.root { self.independence_total() } else { 0 };
        out.push_str(&format!("总计 {} 篇内容\n\n", total));

        if self.wordcloud && dir.join(WORDCLOUD_PAGE).exists() {
            out.push_str(&format!("[Abstracts wordcloud]({})\n\n", WORDCLOUD_PAGE));
        }

        let dirs = self.dir_items(dir, config);
        out.push_str(&self.format.render_dirs(&dirs));

        for (file_type, items) in self.file_items(dir, config) {
            out.push_str(&self.format.render_files(file_type, &items));
        }

        if dir == self.root && !self.archive.independence.is_empty() {
            out.push_str("\n### Satellite archives\n\n");
            for entry in &self.archive.independence {
                let size = self.independence_size(entry);
                out.push_str(&format!(
                    "- [{}: {}]({}) ({} 篇内容)\n",
                    entry.name, entry.url, entry.url, size
                ));
            }
        }

        out
    }

    /// Subdirectory rows with recursive counts and descriptions
    fn dir_items(&self, dir: &Path, config: &DirConfig) -> Vec<DirItem> {
        let mut subdirs: Vec<&String> = config
            .subdirs
            .iter()
            .filter(|s| !self.is_ignored(&dir.join(s.as_str())))
            .collect();
        subdirs.sort();

        subdirs
            .into_iter()
            .map(|subdir| {
                let path = dir.join(subdir);
                let description = DirConfig::load(&path)
                    .ok()
                    .flatten()
                    .map(|c| c.description)
                    .filter(|d| !d.is_empty());

                DirItem {
                    name: subdir.clone(),
                    count: self.count_recursive(&path),
                    description,
                }
            })
            .collect()
    }

    /// File rows bucketed by type, in natural order within each bucket
    fn file_items(&self, dir: &Path, config: &DirConfig) -> Vec<(FileType, Vec<FileItem>)> {
        let mut files: Vec<_> = config
            .files
            .iter()
            .filter(|f| !self.is_ignored(&dir.join(&f.filename)))
            .collect();
        sort_natural(&mut files, |f| f.name.as_str());

        let mut buckets: Vec<(FileType, Vec<FileItem>)> =
            FileType::ALL.iter().map(|t| (*t, Vec::new())).collect();

        for file in files {
            let link = match file.file_type {
                // Images embed the raw file
                FileType::Image => file.filename.clone(),
                _ => file.page.clone().unwrap_or_else(|| file.filename.clone()),
            };

            let meta = match &file.page {
                Some(page) => PageMeta::from_file(&dir.join(page)),
                None => PageMeta::default(),
            };

            let item = FileItem {
                name: file.name.clone(),
                link,
                year: meta.year,
                summary: meta.description,
            };

            if let Some(bucket) = buckets.iter_mut().find(|(t, _)| *t == file.file_type) {
                bucket.1.push(item);
            }
        }

        buckets
    }

    /// Recursive tracked-file count, following manifests
    pub fn count_recursive(&self, dir: &Path) -> usize {
        if self.is_ignored(dir) {
            return 0;
        }

        let Ok(Some(config)) = DirConfig::load(dir) else {
            return 0;
        };

        let mut count = config.files.len();
        for subdir in &config.subdirs {
            count += self.count_recursive(&dir.join(subdir));
        }
        count
    }

    /// Total published size of all satellite archives
    fn independence_total(&self) -> usize {
        self.archive
            .independence
            .iter()
            .map(|e| self.independence_size(e) as usize)
            .sum()
    }

    /// Item count of one satellite archive: the declared size, or the
    /// count marker recovered from its local published README
    fn independence_size(&self, entry: &IndependenceEntry) -> u64 {
        if let Some(size) = entry.size {
            return size;
        }

        entry
            .path
            .as_deref()
            .and_then(|p| std::fs::read_to_string(self.root.join(p)).ok())
            .and_then(|content| parse_total_count(&content))
            .unwrap_or(0)
    }

    /// Write `independence_repo.json` with resolved sizes.
    ///
    /// A no-op when `digital.yml` lists no satellite archives.
    pub fn write_independence_json(&self) -> Result<()> {
        if self.archive.independence.is_empty() {
            return Ok(());
        }

        let records: Vec<IndependenceRecord<'_>> = self
            .archive
            .independence
            .iter()
            .map(|e| IndependenceRecord {
                name: &e.name,
                url: &e.url,
                path: e.path.as_deref(),
                size: self.independence_size(e),
            })
            .collect();

        let path = self.root.join("independence_repo.json");
        let content = serde_json::to_string_pretty(&records)?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    fn is_ignored(&self, path: &Path) -> bool {
        let rel = path.strip_prefix(self.root).unwrap_or(path);
        self.ignore.is_ignored(rel)
    }

    /// Template for a directory: `.github/templates/<rel>/README.md.template`,
    /// or `.github/README.md.template` for the root
    fn template_for(&self, dir: &Path) -> Result<Option<String>> {
        let template_path = if dir == self.root {
            github_dir(self.root).join("README.md.template")
        } else {
            let rel = dir.strip_prefix(self.root).unwrap_or(dir);
            github_dir(self.root)
                .join("templates")
                .join(rel)
                .join("README.md.template")
        };

        if !template_path.exists() {
            return Ok(None);
        }

        std::fs::read_to_string(&template_path)
            .map(Some)
            .with_context(|| format!("Failed to read {}", template_path.display()))
    }
}

/// Record shape of `independence_repo.json`
#[derive(Serialize)]
struct IndependenceRecord<'a> {
    name: &'a str,
    url: &'a str,
    path: Option<&'a str>,
    size: u64,
}

/// Parse the `总计 N 篇内容` count marker out of README content
pub fn parse_total_count(content: &str) -> Option<u64> {
    let after = content.split("总计").nth(1)?;
    let after = after.trim_start();
    let digits: String = after.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let rest = after[digits.len()..].trim_start();
    if rest.starts_with("篇内容") {
        digits.parse().ok()
    } else {
        None
    }
}
