//! Build pipeline driver.
//!
//! Runs the ordered stage list for a build against one archive root.
//! A stage failure aborts the build; failures on individual files or
//! directories are handled inside the stages and logged.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::ValueEnum;
use tracing::{info, warn};

use crate::catalog::{self, DuplicatePolicy, DEFAULT_MAX_DEPTH};
use crate::config::{ArchiveConfig, IgnoreSet};
use crate::manifest;
use crate::meta::{self, MetadataBackend, OpenAiBackend};
use crate::page;
use crate::rename;
use crate::search_index;
use crate::toc::{TocFormat, TocGenerator};

/// Which stage list to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BuildKind {
    /// Full build for document archives
    #[default]
    Document,

    /// Build for saved-webpage archives (no satellite-archive index)
    Webpage,
}

/// One pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Rename,
    Scan,
    Catalog,
    Checksum,
    Pages,
    FileMeta,
    FillMarkers,
    Independence,
    DirMeta,
    SearchIndex,
    Toc,
}

impl Stage {
    /// Stage name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Rename => "rename",
            Stage::Scan => "scan",
            Stage::Catalog => "catalog",
            Stage::Checksum => "checksum",
            Stage::Pages => "pages",
            Stage::FileMeta => "file-meta",
            Stage::FillMarkers => "fill-markers",
            Stage::Independence => "independence",
            Stage::DirMeta => "dir-meta",
            Stage::SearchIndex => "search-index",
            Stage::Toc => "toc",
        }
    }

    /// Look up a stage by its log name
    pub fn by_name(name: &str) -> Option<Stage> {
        BuildKind::Document
            .stages()
            .iter()
            .copied()
            .find(|s| s.name() == name)
    }
}

impl BuildKind {
    /// Ordered stages for this build kind
    pub fn stages(&self) -> &'static [Stage] {
        match self {
            BuildKind::Document => &[
                Stage::Rename,
                Stage::Scan,
                Stage::Catalog,
                Stage::Checksum,
                Stage::Pages,
                Stage::FileMeta,
                Stage::FillMarkers,
                Stage::Independence,
                Stage::DirMeta,
                Stage::SearchIndex,
                Stage::Toc,
            ],
            BuildKind::Webpage => &[
                Stage::Rename,
                Stage::Scan,
                Stage::Catalog,
                Stage::Checksum,
                Stage::Pages,
                Stage::FileMeta,
                Stage::FillMarkers,
                Stage::DirMeta,
                Stage::SearchIndex,
                Stage::Toc,
            ],
        }
    }
}

/// A configured build ready to run
pub struct BuildPipeline {
    root: PathBuf,
    archive: ArchiveConfig,
    ignore: IgnoreSet,
    kind: BuildKind,
    format: TocFormat,
    max_depth: usize,
    duplicate_policy: DuplicatePolicy,
    wordcloud: bool,
}

impl BuildPipeline {
    /// Load `digital.yml` from `root` and prepare a build
    pub fn new(root: PathBuf, kind: BuildKind) -> Result<Self> {
        let archive = ArchiveConfig::load(&root)?;
        let ignore = archive.ignore_set();
        let wordcloud = archive.build_config.generate_wordcloud;

        Ok(Self {
            root,
            archive,
            ignore,
            kind,
            format: TocFormat::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            duplicate_policy: DuplicatePolicy::default(),
            wordcloud,
        })
    }

    /// Override the TOC rendering format
    pub fn with_format(mut self, format: TocFormat) -> Self {
        self.format = format;
        self
    }

    /// Override the catalog recursion depth
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Override how duplicate checksums are handled
    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Force wordcloud embedding on or off
    pub fn with_wordcloud(mut self, wordcloud: bool) -> Self {
        self.wordcloud = wordcloud;
        self
    }

    /// Run every stage for the configured build kind
    pub async fn run(&self) -> Result<()> {
        let started = Instant::now();
        info!(root = %self.root.display(), kind = ?self.kind, "Starting build");

        for stage in self.kind.stages() {
            let stage_started = Instant::now();
            info!(stage = stage.name(), "Running stage");

            self.run_stage(*stage)
                .await
                .with_context(|| format!("Stage '{}' failed", stage.name()))?;

            info!(
                stage = stage.name(),
                elapsed_ms = stage_started.elapsed().as_millis() as u64,
                "Stage finished"
            );
        }

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Build finished"
        );
        Ok(())
    }

    /// Run a single stage by name instead of the whole list
    pub async fn run_single(&self, name: &str) -> Result<()> {
        let stage = Stage::by_name(name)
            .with_context(|| format!("Unknown stage '{}'", name))?;

        info!(stage = stage.name(), "Running stage");
        self.run_stage(stage)
            .await
            .with_context(|| format!("Stage '{}' failed", stage.name()))
    }

    async fn run_stage(&self, stage: Stage) -> Result<()> {
        match stage {
            Stage::Rename => {
                rename::normalize_names(&self.root, &self.ignore)?;
            }
            Stage::Scan => {
                let changes = manifest::update_tree(&self.root, &self.ignore)?;
                for change in &changes {
                    info!(change = %change, "Manifest change");
                }
            }
            Stage::Catalog => {
                catalog::generate_catalog(&self.root, &self.ignore, self.max_depth)?;
            }
            Stage::Checksum => {
                catalog::generate_checksums(
                    &self.root,
                    &self.ignore,
                    self.max_depth,
                    self.duplicate_policy,
                )?;
            }
            Stage::Pages => {
                page::generate_pages(&self.root, &self.ignore)?;
            }
            Stage::FileMeta => {
                if let Some(backend) = self.backend() {
                    meta::annotate_files(&self.root, &self.ignore, backend).await?;
                }
            }
            Stage::FillMarkers => {
                page::fill_markers(&self.root, &self.ignore)?;
            }
            Stage::Independence => {
                self.toc_generator().write_independence_json()?;
            }
            Stage::DirMeta => {
                if let Some(backend) = self.backend() {
                    meta::annotate_dirs(&self.root, &self.ignore, backend).await?;
                }
            }
            Stage::SearchIndex => {
                search_index::generate_search_index(&self.root, &self.ignore)?;
            }
            Stage::Toc => {
                self.toc_generator().generate()?;
            }
        }

        Ok(())
    }

    fn toc_generator(&self) -> TocGenerator<'_> {
        TocGenerator::new(&self.root, &self.archive, self.format)
            .with_wordcloud(self.wordcloud)
    }

    /// Metadata backend from the environment; without an API key the
    /// metadata stages are skipped rather than failing the build
    fn backend(&self) -> Option<Arc<dyn MetadataBackend>> {
        match OpenAiBackend::from_env(self.archive.build_config.openai_temperature) {
            Ok(backend) => Some(Arc::new(backend)),
            Err(e) => {
                warn!(error = %e, "Skipping metadata generation");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_lists() {
        let document = BuildKind::Document.stages();
        let webpage = BuildKind::Webpage.stages();

        assert_eq!(document.first(), Some(&Stage::Rename));
        assert_eq!(document.last(), Some(&Stage::Toc));
        assert!(document.contains(&Stage::Independence));
        assert!(!webpage.contains(&Stage::Independence));
        assert_eq!(document.len(), webpage.len() + 1);
    }
}
