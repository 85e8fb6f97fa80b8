//! `config.yml` schema.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// File name of the per-directory manifest
pub const CONFIG_YML: &str = "config.yml";

/// Manifest of a single directory
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DirConfig {
    /// Directory name ("" at the archive root)
    #[serde(default)]
    pub name: String,

    /// Description, filled in by the directory-metadata stage
    #[serde(default)]
    pub description: String,

    /// Topic tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Tracked files in this directory
    #[serde(default)]
    pub files: Vec<FileEntry>,

    /// Names of tracked child directories
    #[serde(default)]
    pub subdirs: Vec<String>,
}

impl DirConfig {
    /// Load the manifest of `dir`, or `None` when it has none yet
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(CONFIG_YML);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(Some(config))
    }

    /// Write the manifest into `dir`
    pub fn save(&self, dir: &Path) -> Result<()> {
        let path = dir.join(CONFIG_YML);
        let content = serde_yaml::to_string(self)
            .with_context(|| format!("Failed to serialize {}", path.display()))?;

        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Look up a file entry by filename
    pub fn file(&self, filename: &str) -> Option<&FileEntry> {
        self.files.iter().find(|f| f.filename == filename)
    }
}

/// A tracked file and its accumulated metadata
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FileEntry {
    /// Display name (filename without extension)
    pub name: String,

    /// File name on disk
    pub filename: String,

    /// Content category
    #[serde(rename = "type")]
    pub file_type: FileType,

    /// Original format label, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// MD5 of the file content (hex)
    pub md5: String,

    /// Generated metadata page, relative to the directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,

    /// Date the content was archived (YYYY-MM-DD)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived: Option<String>,

    /// Visitor count imported from analytics exports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visitors: Option<u64>,
}

impl FileEntry {
    /// Build a bare entry for a freshly scanned file
    pub fn new(filename: impl Into<String>, file_type: FileType, md5: impl Into<String>) -> Self {
        let filename = filename.into();
        let name = Path::new(&filename)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| filename.clone());

        Self {
            name,
            filename,
            file_type,
            format: None,
            size: None,
            md5: md5.into(),
            page: None,
            archived: None,
            visitors: None,
        }
    }
}

/// Content category, derived from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    /// Text and office documents
    Document,

    /// Raster images
    Image,

    /// Video files
    Video,

    /// Audio files
    Audio,

    /// Saved web pages
    Webpage,

    /// Everything else
    Other,
}

impl FileType {
    /// All categories in TOC rendering order
    pub const ALL: [FileType; 6] = [
        FileType::Document,
        FileType::Image,
        FileType::Video,
        FileType::Audio,
        FileType::Webpage,
        FileType::Other,
    ];

    /// Categorize a file name by its extension
    pub fn from_filename(filename: &str) -> Self {
        let ext = Path::new(filename)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "md" | "txt" | "doc" | "docx" | "pdf" | "epub" => FileType::Document,
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp" => FileType::Image,
            "mp4" | "avi" | "mov" | "wmv" | "flv" | "webm" => FileType::Video,
            "mp3" | "wav" | "ogg" | "m4a" => FileType::Audio,
            "html" | "htm" | "mhtml" => FileType::Webpage,
            _ => FileType::Other,
        }
    }

    /// Emoji-tagged label used as the TOC category header
    pub fn label(&self) -> &'static str {
        match self {
            FileType::Document => "📄 Documents",
            FileType::Image => "🖼️ Images",
            FileType::Video => "🎬 Videos",
            FileType::Audio => "🎵 Audio",
            FileType::Webpage => "🌐 Webpages",
            FileType::Other => "📎 Other",
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FileType::Document => "document",
            FileType::Image => "image",
            FileType::Video => "video",
            FileType::Audio => "audio",
            FileType::Webpage => "webpage",
            FileType::Other => "other",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for FileType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "document" => Ok(FileType::Document),
            "image" => Ok(FileType::Image),
            "video" => Ok(FileType::Video),
            "audio" => Ok(FileType::Audio),
            "webpage" => Ok(FileType::Webpage),
            "other" => Ok(FileType::Other),
            _ => anyhow::bail!("Unknown file type: {}", s),
        }
    }
}
