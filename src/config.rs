//! Archive-level configuration from `digital.yml`.
//!
//! `digital.yml` lives at the archive root and carries everything that is
//! not per-directory state: ignore patterns, satellite-archive entries,
//! and build options.
//!
//! Ignore patterns are globs matched against paths relative to the
//! archive root, with forward slashes on every platform.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::Pattern;
use serde::{Deserialize, Serialize};

/// File name of the root configuration
pub const DIGITAL_YML: &str = "digital.yml";

/// Raw `digital.yml` schema
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ArchiveConfig {
    /// Archive display name
    #[serde(default)]
    pub name: String,

    /// Archive description
    #[serde(default)]
    pub description: String,

    /// Glob patterns for paths excluded from every stage
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Satellite archives listed on the root README
    #[serde(default)]
    pub independence: Vec<IndependenceEntry>,

    /// Build options
    #[serde(default)]
    pub build_config: BuildConfig,
}

/// A satellite archive maintained outside this tree
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndependenceEntry {
    /// Display name
    pub name: String,

    /// Public URL of the satellite archive
    pub url: String,

    /// Local path to its published README (used to recover the item count)
    #[serde(default)]
    pub path: Option<String>,

    /// Item count, when known ahead of time
    #[serde(default)]
    pub size: Option<u64>,
}

/// Options consumed by the build pipeline
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuildConfig {
    /// Embed per-directory wordcloud pages in the TOC when they exist
    #[serde(default)]
    pub generate_wordcloud: bool,

    /// Sampling temperature passed to the metadata backend
    #[serde(default = "default_temperature")]
    pub openai_temperature: f64,
}

fn default_temperature() -> f64 {
    0.7
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            generate_wordcloud: false,
            openai_temperature: default_temperature(),
        }
    }
}

impl ArchiveConfig {
    /// Load `digital.yml` from the archive root.
    ///
    /// A missing file is not an error: every field has a default, so
    /// curator works on a bare tree.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(DIGITAL_YML);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Compile the ignore patterns for repeated matching
    pub fn ignore_set(&self) -> IgnoreSet {
        IgnoreSet::new(&self.ignore)
    }
}

/// Compiled ignore patterns, matched against root-relative paths
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    patterns: Vec<Pattern>,
}

impl IgnoreSet {
    /// Compile a list of glob patterns, skipping any that fail to parse
    pub fn new(patterns: &[String]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|p| match Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    tracing::warn!(pattern = %p, error = %e, "Skipping invalid ignore pattern");
                    None
                }
            })
            .collect();

        Self { patterns }
    }

    /// Check whether a root-relative path is ignored
    pub fn is_ignored(&self, rel_path: &Path) -> bool {
        if rel_path.as_os_str().is_empty() || rel_path == Path::new(".") {
            return false;
        }

        let normalized = normalize(rel_path);
        self.patterns.iter().any(|p| p.matches(&normalized))
    }
}

/// Forward-slash form of a relative path
fn normalize(path: &Path) -> String {
    let s = path.to_string_lossy().replace('\\', "/");
    s.trim_start_matches("./").trim_end_matches('/').to_string()
}

/// Bookkeeping directory under the archive root (`catalog.yml`, `md5.yml`,
/// `visit_links.yml`, templates)
pub fn github_dir(root: &Path) -> PathBuf {
    root.join(".github")
}
