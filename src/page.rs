//! Metadata page generation and marker filling.
//!
//! Every document/audio/video entry gets a `<name>_page.md` beside the
//! file: an abstract block, an attribute table, and a download link.
//! Later stages replace the `[Unknown ...]` placeholders as metadata
//! becomes available; this module also fills the link and archived-date
//! placeholders from `.github/visit_links.yml`.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::{github_dir, IgnoreSet};
use crate::manifest::{DirConfig, FileEntry, FileType};
use crate::toc::page_meta::{
    ABSTRACT_END, ABSTRACT_START, DOWNLOAD_LINK_END, DOWNLOAD_LINK_START,
};

/// Placeholder for a metadata field still awaiting a value
pub fn unknown_marker(field: &str) -> String {
    format!("[Unknown {}(update needed)]", field)
}

/// Render the page markdown for one file entry
pub fn render_page(entry: &FileEntry) -> String {
    let size = entry
        .size
        .map(|s| s.to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    let format = entry.format.clone().unwrap_or_else(|| {
        Path::new(&entry.filename)
            .extension()
            .map(|e| e.to_string_lossy().to_uppercase())
            .unwrap_or_else(|| "Unknown".to_string())
    });

    format!(
        "# {name}\n\n\
{abs_start}\n\
{description}\n\
{abs_end}\n\n\
| Attribute | Value |\n\
|-----------|-------|\n\
| Name | {name} |\n\
| Filename | {filename} |\n\
| Type | {file_type} |\n\
| Format | {format} |\n\
| Size | {size} |\n\
| MD5 | {md5} |\n\
| Date | {date} |\n\
| Author | {author} |\n\
| Region | {region} |\n\
| Tags | {tags} |\n\
| Archived Date | {archived} |\n\
| Original Link | {link} |\n\n\
{dl_start}\n\
[Download]({filename})\n\
{dl_end}\n",
        name = entry.name,
        filename = entry.filename,
        file_type = entry.file_type,
        format = format,
        size = size,
        md5 = entry.md5,
        description = unknown_marker("description"),
        date = unknown_marker("date"),
        author = unknown_marker("author"),
        region = unknown_marker("region"),
        tags = unknown_marker("tags"),
        archived = unknown_marker("archived date"),
        link = unknown_marker("link"),
        abs_start = ABSTRACT_START,
        abs_end = ABSTRACT_END,
        dl_start = DOWNLOAD_LINK_START,
        dl_end = DOWNLOAD_LINK_END,
    )
}

/// Generate pages for every manifest in the tree.
///
/// Markdown files serve as their own page; images, webpages, and other
/// types link directly to the file. Existing pages are not regenerated,
/// so filled-in metadata survives rebuilds.
pub fn generate_pages(root: &Path, ignore: &IgnoreSet) -> Result<()> {
    generate_dir_pages(root, root, ignore)
}

fn generate_dir_pages(root: &Path, dir: &Path, ignore: &IgnoreSet) -> Result<()> {
    let Some(mut config) = DirConfig::load(dir)? else {
        return Ok(());
    };

    let mut modified = false;
    for entry in &mut config.files {
        if entry.page.is_some() {
            continue;
        }

        let page = match entry.file_type {
            FileType::Document | FileType::Audio | FileType::Video => {
                if entry.filename.ends_with(".md") {
                    entry.filename.clone()
                } else {
                    let page_name = format!("{}_page.md", entry.name);
                    let page_path = dir.join(&page_name);
                    if !page_path.exists() {
                        std::fs::write(&page_path, render_page(entry))
                            .with_context(|| format!("Failed to write {}", page_path.display()))?;
                        info!(page = %page_path.display(), "Generated page");
                    }
                    page_name
                }
            }
            // Non-page types link straight to the file
            _ => entry.filename.clone(),
        };

        entry.page = Some(page);
        modified = true;
    }

    if modified {
        config.save(dir)?;
    }

    for subdir in &config.subdirs {
        let subdir_path = dir.join(subdir);
        let rel = subdir_path.strip_prefix(root).unwrap_or(&subdir_path);
        if ignore.is_ignored(rel) {
            continue;
        }
        if let Err(e) = generate_dir_pages(root, &subdir_path, ignore) {
            warn!(dir = %subdir_path.display(), error = %e, "Skipping page generation");
        }
    }

    Ok(())
}

/// One `visit_links.yml` record, keyed by content MD5
#[derive(Debug, Clone, Deserialize)]
pub struct VisitLink {
    #[serde(default)]
    pub link: Option<String>,

    #[serde(default)]
    pub visited_date: Option<String>,
}

/// Load `.github/visit_links.yml`, tolerating its absence
pub fn load_visit_links(root: &Path) -> Result<HashMap<String, VisitLink>> {
    let path = github_dir(root).join("visit_links.yml");
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Fill link and archived-date placeholders in every generated page.
///
/// The source link and visit date come from `visit_links.yml` by MD5;
/// when no visit date is recorded, today's date is used so pages never
/// stay undated forever.
pub fn fill_markers(root: &Path, ignore: &IgnoreSet) -> Result<()> {
    let visit_links = load_visit_links(root)?;
    if visit_links.is_empty() {
        info!("No visit_links.yml; only dating markers will be filled");
    }

    fill_dir_markers(root, root, ignore, &visit_links)
}

fn fill_dir_markers(
    root: &Path,
    dir: &Path,
    ignore: &IgnoreSet,
    visit_links: &HashMap<String, VisitLink>,
) -> Result<()> {
    let Some(config) = DirConfig::load(dir)? else {
        return Ok(());
    };

    for entry in &config.files {
        let Some(page) = &entry.page else {
            continue;
        };
        // Markdown content files have no generated placeholders
        if *page == entry.filename {
            continue;
        }

        let page_path = dir.join(page);
        if !page_path.exists() {
            continue;
        }

        if let Err(e) = fill_page(&page_path, entry, visit_links) {
            warn!(page = %page_path.display(), error = %e, "Skipping marker fill");
        }
    }

    for subdir in &config.subdirs {
        let subdir_path = dir.join(subdir);
        let rel = subdir_path.strip_prefix(root).unwrap_or(&subdir_path);
        if ignore.is_ignored(rel) {
            continue;
        }
        if let Err(e) = fill_dir_markers(root, &subdir_path, ignore, visit_links) {
            warn!(dir = %subdir_path.display(), error = %e, "Skipping marker fill");
        }
    }

    Ok(())
}

fn fill_page(
    page_path: &Path,
    entry: &FileEntry,
    visit_links: &HashMap<String, VisitLink>,
) -> Result<()> {
    let mut content = std::fs::read_to_string(page_path)
        .with_context(|| format!("Failed to read {}", page_path.display()))?;
    let original = content.clone();

    if let Some(visit) = visit_links.get(&entry.md5) {
        if let Some(link) = &visit.link {
            content = content.replace(&unknown_marker("link"), link);
        }
        if let Some(date) = &visit.visited_date {
            content = content.replace(&unknown_marker("archived date"), date);
        }
    }

    // Anything still undated gets today's date
    let archived_marker = unknown_marker("archived date");
    if content.contains(&archived_marker) {
        let today = Local::now().format("%Y-%m-%d").to_string();
        content = content.replace(&archived_marker, &today);
    }

    if content != original {
        std::fs::write(page_path, content)
            .with_context(|| format!("Failed to write {}", page_path.display()))?;
        info!(page = %page_path.display(), "Filled markers");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toc::PageMeta;
    use tempfile::TempDir;

    fn entry(filename: &str) -> FileEntry {
        let mut e = FileEntry::new(filename, FileType::from_filename(filename), "abc123");
        e.size = Some(1024);
        e
    }

    #[test]
    fn test_rendered_page_parses_back() {
        let page = render_page(&entry("report.pdf"));

        assert!(page.starts_with("# report\n"));
        assert!(page.contains("| MD5 | abc123 |"));
        assert!(page.contains("| Format | PDF |"));
        assert!(page.contains("[Download](report.pdf)"));

        // Placeholders read back as absent metadata
        let meta = PageMeta::parse(&page);
        assert_eq!(meta.description, None);
        assert_eq!(meta.year, None);
        assert_eq!(meta.link, None);
    }

    #[test]
    fn test_generate_pages_sets_page_field() {
        let temp = TempDir::new().unwrap();
        DirConfig {
            files: vec![entry("talk.mp4"), entry("notes.md"), entry("photo.png")],
            ..Default::default()
        }
        .save(temp.path())
        .unwrap();

        generate_pages(temp.path(), &IgnoreSet::default()).unwrap();

        let config = DirConfig::load(temp.path()).unwrap().unwrap();
        assert_eq!(config.file("talk.mp4").unwrap().page.as_deref(), Some("talk_page.md"));
        assert!(temp.path().join("talk_page.md").exists());

        // Markdown is its own page; images link directly
        assert_eq!(config.file("notes.md").unwrap().page.as_deref(), Some("notes.md"));
        assert!(!temp.path().join("notes_page.md").exists());
        assert_eq!(config.file("photo.png").unwrap().page.as_deref(), Some("photo.png"));
    }

    #[test]
    fn test_existing_page_not_regenerated() {
        let temp = TempDir::new().unwrap();
        DirConfig {
            files: vec![entry("talk.mp4")],
            ..Default::default()
        }
        .save(temp.path())
        .unwrap();
        std::fs::write(temp.path().join("talk_page.md"), "hand edited").unwrap();

        generate_pages(temp.path(), &IgnoreSet::default()).unwrap();

        let content = std::fs::read_to_string(temp.path().join("talk_page.md")).unwrap();
        assert_eq!(content, "hand edited");
    }

    #[test]
    fn test_fill_markers_from_visit_links() {
        let temp = TempDir::new().unwrap();
        DirConfig {
            files: vec![entry("report.pdf")],
            ..Default::default()
        }
        .save(temp.path())
        .unwrap();
        generate_pages(temp.path(), &IgnoreSet::default()).unwrap();

        std::fs::create_dir_all(github_dir(temp.path())).unwrap();
        std::fs::write(
            github_dir(temp.path()).join("visit_links.yml"),
            "abc123:\n  link: https://example.com/original\n  visited_date: 2023-04-01\n",
        )
        .unwrap();

        fill_markers(temp.path(), &IgnoreSet::default()).unwrap();

        let content = std::fs::read_to_string(temp.path().join("report_page.md")).unwrap();
        assert!(content.contains("| Original Link | https://example.com/original |"));
        assert!(content.contains("| Archived Date | 2023-04-01 |"));
        assert!(!content.contains("[Unknown link(update needed)]"));
    }

    #[test]
    fn test_fill_markers_survives_corrupt_sibling() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("good")).unwrap();
        std::fs::create_dir(temp.path().join("bad")).unwrap();

        DirConfig {
            subdirs: vec!["bad".to_string(), "good".to_string()],
            ..Default::default()
        }
        .save(temp.path())
        .unwrap();
        DirConfig {
            files: vec![entry("report.pdf")],
            ..Default::default()
        }
        .save(&temp.path().join("good"))
        .unwrap();
        std::fs::write(temp.path().join("bad/config.yml"), "files: [not: valid").unwrap();

        generate_pages(&temp.path().join("good"), &IgnoreSet::default()).unwrap();
        fill_markers(temp.path(), &IgnoreSet::default()).unwrap();

        let content =
            std::fs::read_to_string(temp.path().join("good/report_page.md")).unwrap();
        assert!(!content.contains("[Unknown archived date(update needed)]"));
    }

    #[test]
    fn test_fill_markers_dates_with_today_without_links() {
        let temp = TempDir::new().unwrap();
        DirConfig {
            files: vec![entry("report.pdf")],
            ..Default::default()
        }
        .save(temp.path())
        .unwrap();
        generate_pages(temp.path(), &IgnoreSet::default()).unwrap();

        fill_markers(temp.path(), &IgnoreSet::default()).unwrap();

        let content = std::fs::read_to_string(temp.path().join("report_page.md")).unwrap();
        assert!(!content.contains("[Unknown archived date(update needed)]"));
        // Link stays unknown without visit data
        assert!(content.contains("[Unknown link(update needed)]"));
    }
}
