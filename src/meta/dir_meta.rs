//! Directory-metadata annotation.
//!
//! Summarizes each directory from a sample of its file names and
//! abstracts, then writes the summary into the manifest. Directories
//! that already have a description are left alone, so hand-written
//! summaries survive rebuilds.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::IgnoreSet;
use crate::manifest::DirConfig;
use crate::toc::PageMeta;

use super::{strip_fence, DirMetadata, MetadataBackend};

/// How many files to sample per directory prompt
const SAMPLE_SIZE: usize = 20;

/// Annotate every directory manifest with an empty description.
///
/// Returns the number of manifests updated. Failures on one directory
/// are logged and the sweep continues.
pub async fn annotate_dirs(
    root: &Path,
    ignore: &IgnoreSet,
    backend: Arc<dyn MetadataBackend>,
) -> Result<usize> {
    let mut updated = 0;
    annotate_tree(root, root, ignore, backend.as_ref(), &mut updated).await?;
    info!(updated, "Directory annotation finished");
    Ok(updated)
}

// Recursion over async fn needs the boxed form
fn annotate_tree<'a>(
    root: &'a Path,
    dir: &'a Path,
    ignore: &'a IgnoreSet,
    backend: &'a dyn MetadataBackend,
    updated: &'a mut usize,
) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
    Box::pin(async move {
        let Some(mut config) = DirConfig::load(dir)? else {
            return Ok(());
        };

        if config.description.is_empty() && !config.files.is_empty() {
            match annotate_one(dir, &config, backend).await {
                Ok(meta) => {
                    if let Some(description) = meta.description {
                        config.description = description;
                        if config.tags.is_empty() {
                            config.tags = meta.tags;
                        }
                        config.save(dir)?;
                        *updated += 1;
                        info!(dir = %dir.display(), "Annotated directory");
                    }
                }
                Err(e) => warn!(dir = %dir.display(), error = %e, "Directory annotation failed"),
            }
        }

        for subdir in &config.subdirs {
            let subdir_path = dir.join(subdir);
            let rel = subdir_path.strip_prefix(root).unwrap_or(&subdir_path);
            if ignore.is_ignored(rel) {
                continue;
            }
            if let Err(e) = annotate_tree(root, &subdir_path, ignore, backend, updated).await {
                warn!(dir = %subdir_path.display(), error = %e, "Skipping directory");
            }
        }

        Ok(())
    })
}

async fn annotate_one(
    dir: &Path,
    config: &DirConfig,
    backend: &dyn MetadataBackend,
) -> Result<DirMetadata> {
    let mut sample = String::new();
    for entry in config.files.iter().take(SAMPLE_SIZE) {
        sample.push_str("- ");
        sample.push_str(&entry.name);

        let abstract_text = entry
            .page
            .as_deref()
            .filter(|p| *p != entry.filename)
            .and_then(|p| PageMeta::from_file(&dir.join(p)).description);
        if let Some(text) = abstract_text {
            sample.push_str(": ");
            sample.push_str(&text);
        }
        sample.push('\n');
    }

    let dir_name = if config.name.is_empty() {
        dir.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    } else {
        config.name.clone()
    };

    let prompt = format!(
        "Summarize this archive directory from its contents.\n\
Directory: {}\n\
Files:\n{}\n\
Reply with JSON: {{\"description\": string, \"tags\": [string]}}.",
        dir_name, sample,
    );

    let completion = backend.complete(&prompt).await?;
    serde_json::from_str(strip_fence(&completion))
        .context("Backend returned malformed directory metadata JSON")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{FileEntry, FileType};
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct CannedBackend(String);

    #[async_trait]
    impl MetadataBackend for CannedBackend {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_empty_description_filled() {
        let temp = TempDir::new().unwrap();
        DirConfig {
            files: vec![FileEntry::new("a.pdf", FileType::Document, "aa")],
            ..Default::default()
        }
        .save(temp.path())
        .unwrap();

        let backend = Arc::new(CannedBackend(
            r#"{"description": "Scanned pamphlets.", "tags": ["pamphlets"]}"#.to_string(),
        ));
        let updated = annotate_dirs(temp.path(), &IgnoreSet::default(), backend)
            .await
            .unwrap();

        assert_eq!(updated, 1);
        let config = DirConfig::load(temp.path()).unwrap().unwrap();
        assert_eq!(config.description, "Scanned pamphlets.");
        assert_eq!(config.tags, vec!["pamphlets"]);
    }

    #[tokio::test]
    async fn test_corrupt_sibling_does_not_abort_sweep() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("good")).unwrap();
        std::fs::create_dir(temp.path().join("bad")).unwrap();

        DirConfig {
            description: "root".to_string(),
            subdirs: vec!["bad".to_string(), "good".to_string()],
            ..Default::default()
        }
        .save(temp.path())
        .unwrap();
        std::fs::write(temp.path().join("bad/config.yml"), "files: [not: valid").unwrap();
        DirConfig {
            files: vec![FileEntry::new("a.pdf", FileType::Document, "aa")],
            ..Default::default()
        }
        .save(&temp.path().join("good"))
        .unwrap();

        let backend = Arc::new(CannedBackend(
            r#"{"description": "Still swept.", "tags": []}"#.to_string(),
        ));
        let updated = annotate_dirs(temp.path(), &IgnoreSet::default(), backend)
            .await
            .unwrap();

        assert_eq!(updated, 1);
        let config = DirConfig::load(&temp.path().join("good")).unwrap().unwrap();
        assert_eq!(config.description, "Still swept.");
    }

    #[tokio::test]
    async fn test_existing_description_untouched() {
        let temp = TempDir::new().unwrap();
        DirConfig {
            description: "Curated by hand".to_string(),
            files: vec![FileEntry::new("a.pdf", FileType::Document, "aa")],
            ..Default::default()
        }
        .save(temp.path())
        .unwrap();

        let backend = Arc::new(CannedBackend(r#"{"description": "Generated."}"#.to_string()));
        let updated = annotate_dirs(temp.path(), &IgnoreSet::default(), backend)
            .await
            .unwrap();

        assert_eq!(updated, 0);
        let config = DirConfig::load(temp.path()).unwrap().unwrap();
        assert_eq!(config.description, "Curated by hand");
    }
}
