//! curator - Content pipeline for static document archives
//!
//! Keeps a directory tree of archived files described by per-directory
//! `config.yml` manifests and renders browsable `README.md` tables of
//! contents from them.
//!
//! # Architecture
//!
//! The build is a sequence of stages over shared on-disk state:
//! - The scanner detects added, modified, and deleted files by MD5 and
//!   merges the result into the manifests without losing metadata
//! - Bookkeeping stages maintain `.github/catalog.yml`, `.github/md5.yml`,
//!   per-file metadata pages, and `search_index.json`
//! - The TOC renderer writes a `README.md` per directory, bucketed by
//!   content type in natural sort order
//!
//! # Modules
//!
//! - `manifest`: `config.yml` schema, scanner, and merge
//! - `toc`: natural sort, page metadata, README rendering
//! - `catalog`: archive-wide catalog and checksum files
//! - `page`: metadata page generation and marker filling
//! - `meta`: AI-assisted metadata (bounded to 5 concurrent requests)
//! - `pipeline`: stage ordering and the build driver
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Full build of the archive in the current directory
//! curator build
//!
//! # Rescan and show manifest changes
//! curator scan
//!
//! # Regenerate READMEs as plain lists
//! curator toc --format list
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod manifest;
pub mod meta;
pub mod page;
pub mod pipeline;
pub mod rename;
pub mod search_index;
pub mod toc;

// Re-export main types at crate root for convenience
pub use config::{ArchiveConfig, IgnoreSet};
pub use manifest::{Change, DirConfig, FileEntry, FileType};
pub use pipeline::{BuildKind, BuildPipeline, Stage};
pub use toc::{TocFormat, TocGenerator};
