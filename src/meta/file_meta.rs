//! Concurrent file-metadata annotation.
//!
//! Finds pages whose description placeholder is still unfilled, asks
//! the backend for metadata, and rewrites the placeholders in place.
//! At most five requests run at once.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::IgnoreSet;
use crate::manifest::{DirConfig, FileType};
use crate::page::unknown_marker;

use super::{strip_fence, FileMetadata, MetadataBackend};

/// Concurrent request limit
pub const MAX_WORKERS: usize = 5;

/// How much file content to quote in the prompt
const EXCERPT_CHARS: usize = 5000;

/// A page queued for annotation
#[derive(Debug, Clone)]
struct PendingPage {
    path: PathBuf,
    source: PathBuf,
    name: String,
    filename: String,
    file_type: FileType,
}

/// Annotate every page still carrying an unknown-description marker.
///
/// Returns the number of pages updated. Individual failures are logged
/// and skipped so one bad request never aborts the sweep.
pub async fn annotate_files(
    root: &Path,
    ignore: &IgnoreSet,
    backend: Arc<dyn MetadataBackend>,
) -> Result<usize> {
    let mut pending = Vec::new();
    collect_pending(root, root, ignore, &mut pending)?;

    if pending.is_empty() {
        info!("No pages awaiting metadata");
        return Ok(0);
    }
    info!(pages = pending.len(), backend = backend.name(), "Annotating pages");

    let semaphore = Arc::new(Semaphore::new(MAX_WORKERS));
    let mut tasks = JoinSet::new();

    for page in pending {
        let semaphore = Arc::clone(&semaphore);
        let backend = Arc::clone(&backend);

        tasks.spawn(async move {
            // Semaphore is never closed while tasks run
            let Ok(_permit) = semaphore.acquire().await else {
                return false;
            };

            match annotate_page(&page, backend.as_ref()).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(page = %page.path.display(), error = %e, "Annotation failed");
                    false
                }
            }
        });
    }

    let mut updated = 0;
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(true) => updated += 1,
            Ok(false) => {}
            Err(e) => warn!(error = %e, "Annotation task panicked"),
        }
    }

    info!(updated, "Page annotation finished");
    Ok(updated)
}

fn collect_pending(
    root: &Path,
    dir: &Path,
    ignore: &IgnoreSet,
    pending: &mut Vec<PendingPage>,
) -> Result<()> {
    let Some(config) = DirConfig::load(dir)? else {
        return Ok(());
    };

    for entry in &config.files {
        // Webpages and uncategorized files get no generated metadata
        if matches!(entry.file_type, FileType::Webpage | FileType::Other) {
            continue;
        }

        let Some(page) = &entry.page else {
            continue;
        };
        if *page == entry.filename {
            continue;
        }

        let path = dir.join(page);
        let Ok(content) = std::fs::read_to_string(&path) else {
            continue;
        };
        if !content.contains(&unknown_marker("description")) {
            continue;
        }

        pending.push(PendingPage {
            path,
            source: dir.join(&entry.filename),
            name: entry.name.clone(),
            filename: entry.filename.clone(),
            file_type: entry.file_type,
        });
    }

    for subdir in &config.subdirs {
        let subdir_path = dir.join(subdir);
        let rel = subdir_path.strip_prefix(root).unwrap_or(&subdir_path);
        if ignore.is_ignored(rel) {
            continue;
        }
        if let Err(e) = collect_pending(root, &subdir_path, ignore, pending) {
            warn!(dir = %subdir_path.display(), error = %e, "Skipping directory");
        }
    }

    Ok(())
}

async fn annotate_page(page: &PendingPage, backend: &dyn MetadataBackend) -> Result<()> {
    let excerpt = content_excerpt(&page.source);
    let prompt = format!(
        "Describe this archived file.\n\
Name: {}\n\
Filename: {}\n\
Type: {}\n\
{}\n\
Reply with JSON: {{\"description\": string, \"tags\": [string], \
\"date\": \"YYYY-MM-DD\" or null, \"author\": string or null, \
\"region\": string or null}}. \
Leave fields null when there is no evidence.",
        page.name,
        page.filename,
        page.file_type,
        match &excerpt {
            Some(text) => format!("Content excerpt:\n{}\n", text),
            None => String::new(),
        },
    );

    let completion = backend.complete(&prompt).await?;
    let meta: FileMetadata = serde_json::from_str(strip_fence(&completion))
        .context("Backend returned malformed metadata JSON")?;

    let content = std::fs::read_to_string(&page.path)
        .with_context(|| format!("Failed to read {}", page.path.display()))?;
    let updated = apply_metadata(&content, &meta);

    if updated != content {
        std::fs::write(&page.path, updated)
            .with_context(|| format!("Failed to write {}", page.path.display()))?;
        info!(page = %page.path.display(), "Annotated");
    }

    Ok(())
}

/// Leading file content for the prompt, when it reads as text
fn content_excerpt(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(EXCERPT_CHARS).collect())
}

/// Replace the unknown markers a metadata answer covers
fn apply_metadata(content: &str, meta: &FileMetadata) -> String {
    let mut content = content.to_string();

    if let Some(description) = &meta.description {
        content = content.replace(&unknown_marker("description"), description);
    }
    if !meta.tags.is_empty() {
        content = content.replace(&unknown_marker("tags"), &meta.tags.join(", "));
    }
    if let Some(date) = &meta.date {
        content = content.replace(&unknown_marker("date"), date);
    }
    if let Some(author) = &meta.author {
        content = content.replace(&unknown_marker("author"), author);
    }
    if let Some(region) = &meta.region {
        content = content.replace(&unknown_marker("region"), region);
    }

    content
}
