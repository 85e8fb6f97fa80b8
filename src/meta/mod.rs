//! AI-assisted metadata generation.
//!
//! A metadata backend turns file names and page excerpts into
//! descriptions, tags, and dates. File annotation runs up to five
//! requests concurrently; directory annotation is sequential and only
//! touches directories with no description yet.

pub mod backend;
pub mod dir_meta;
pub mod file_meta;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

pub use backend::OpenAiBackend;
pub use dir_meta::annotate_dirs;
pub use file_meta::annotate_files;

/// A completion backend that answers metadata prompts with JSON
#[async_trait]
pub trait MetadataBackend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Run one prompt and return the raw completion text
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Metadata generated for a single file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileMetadata {
    /// One-paragraph abstract
    #[serde(default)]
    pub description: Option<String>,

    /// Topic tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Content date (YYYY-MM-DD), when inferable
    #[serde(default)]
    pub date: Option<String>,

    /// Author or publishing body, when inferable
    #[serde(default)]
    pub author: Option<String>,

    /// Geographic region the content concerns, when inferable
    #[serde(default)]
    pub region: Option<String>,
}

/// Metadata generated for a directory
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirMetadata {
    /// One-paragraph summary of the directory's contents
    #[serde(default)]
    pub description: Option<String>,

    /// Topic tags
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Strip a markdown code fence from a completion, if present
pub(crate) fn strip_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
