//! Per-directory `config.yml` manifests.
//!
//! Every directory in the archive carries a `config.yml` describing its
//! files and subdirectories. The scanner produces a fresh manifest from
//! the filesystem; the merger reconciles it with the existing one so that
//! metadata added by later pipeline stages survives rescans.

pub mod entry;
pub mod merge;
pub mod scan;

pub use entry::{DirConfig, FileEntry, FileType, CONFIG_YML};
pub use merge::{merge_configs, update_tree, Change};
pub use scan::Scanner;
