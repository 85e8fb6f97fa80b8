//! Command-line interface for curator.
//!
//! `build` runs the whole pipeline; the remaining commands expose the
//! individual stages for incremental use and debugging.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::catalog::{self, DuplicatePolicy, DEFAULT_MAX_DEPTH};
use crate::config::ArchiveConfig;
use crate::manifest;
use crate::meta::{self, MetadataBackend, OpenAiBackend};
use crate::page;
use crate::pipeline::{BuildKind, BuildPipeline};
use crate::rename;
use crate::search_index;
use crate::toc::{TocFormat, TocGenerator};

/// curator - Static archive content pipeline
#[derive(Parser, Debug)]
#[command(name = "curator")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Archive root shared by every command
#[derive(Args, Debug)]
pub struct RootArg {
    /// Archive root directory
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,
}

/// Catalog sweep options
#[derive(Args, Debug)]
pub struct DepthArgs {
    /// Directory depth covered by the catalogs
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,
}

/// Duplicate-checksum handling
#[derive(Args, Debug)]
pub struct DuplicateArgs {
    /// Abort when two files share an MD5
    #[arg(long, conflicts_with = "remove_duplicates")]
    pub fail_on_duplicates: bool,

    /// Delete later copies of duplicated files (and their pages)
    #[arg(long)]
    pub remove_duplicates: bool,
}

impl DuplicateArgs {
    fn policy(&self) -> DuplicatePolicy {
        if self.fail_on_duplicates {
            DuplicatePolicy::Fail
        } else if self.remove_duplicates {
            DuplicatePolicy::Remove
        } else {
            DuplicatePolicy::Warn
        }
    }
}

/// What the `meta` command annotates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MetaTarget {
    /// File metadata pages
    #[default]
    Files,

    /// Directory descriptions
    Dirs,

    /// Both
    All,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full build pipeline
    Build {
        #[command(flatten)]
        root: RootArg,

        /// Build kind
        #[arg(short = 't', long = "type", value_enum, default_value = "document")]
        kind: BuildKind,

        /// TOC rendering format
        #[arg(short, long, value_enum, default_value = "table")]
        format: TocFormat,

        #[command(flatten)]
        depth: DepthArgs,

        #[command(flatten)]
        duplicates: DuplicateArgs,

        /// Embed wordcloud pages in the TOC when present
        #[arg(long)]
        wordcloud: bool,

        /// Run only the named stage (e.g. "scan", "toc")
        #[arg(long)]
        stage: Option<String>,
    },

    /// Scan the tree and update manifests
    Scan {
        #[command(flatten)]
        root: RootArg,
    },

    /// Regenerate READMEs
    Toc {
        #[command(flatten)]
        root: RootArg,

        /// TOC rendering format
        #[arg(short, long, value_enum, default_value = "table")]
        format: TocFormat,

        /// Embed wordcloud pages in the TOC when present
        #[arg(long)]
        wordcloud: bool,
    },

    /// Rebuild `.github/catalog.yml`
    Catalog {
        #[command(flatten)]
        root: RootArg,

        #[command(flatten)]
        depth: DepthArgs,
    },

    /// Rebuild `.github/md5.yml` and report duplicates
    Checksum {
        #[command(flatten)]
        root: RootArg,

        #[command(flatten)]
        depth: DepthArgs,

        #[command(flatten)]
        duplicates: DuplicateArgs,
    },

    /// Generate metadata pages for new entries
    Pages {
        #[command(flatten)]
        root: RootArg,
    },

    /// Fill link and date markers from `.github/visit_links.yml`
    Fill {
        #[command(flatten)]
        root: RootArg,
    },

    /// Generate AI metadata for pages and directories
    Meta {
        #[command(flatten)]
        root: RootArg,

        /// What to annotate
        #[arg(long, value_enum, default_value = "files")]
        target: MetaTarget,
    },

    /// Rebuild `search_index.json`
    Index {
        #[command(flatten)]
        root: RootArg,
    },

    /// Replace spaces in file and directory names with underscores
    Rename {
        #[command(flatten)]
        root: RootArg,
    },

    /// Show the resolved archive configuration
    Config {
        #[command(flatten)]
        root: RootArg,
    },
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Build {
                root,
                kind,
                format,
                depth,
                duplicates,
                wordcloud,
                stage,
            } => {
                let mut pipeline = BuildPipeline::new(root.root, kind)?
                    .with_format(format)
                    .with_max_depth(depth.max_depth)
                    .with_duplicate_policy(duplicates.policy());
                if wordcloud {
                    pipeline = pipeline.with_wordcloud(true);
                }
                match stage {
                    Some(name) => pipeline.run_single(&name).await,
                    None => pipeline.run().await,
                }
            }

            Commands::Scan { root } => {
                let archive = ArchiveConfig::load(&root.root)?;
                let changes = manifest::update_tree(&root.root, &archive.ignore_set())?;
                if changes.is_empty() {
                    println!("No changes");
                } else {
                    for change in &changes {
                        println!("{}", change);
                    }
                    println!("{} change(s)", changes.len());
                }
                Ok(())
            }

            Commands::Toc {
                root,
                format,
                wordcloud,
            } => {
                let archive = ArchiveConfig::load(&root.root)?;
                let generator = TocGenerator::new(&root.root, &archive, format)
                    .with_wordcloud(wordcloud || archive.build_config.generate_wordcloud);
                generator.generate()?;
                generator.write_independence_json()
            }

            Commands::Catalog { root, depth } => {
                let archive = ArchiveConfig::load(&root.root)?;
                let entries = catalog::generate_catalog(
                    &root.root,
                    &archive.ignore_set(),
                    depth.max_depth,
                )?;
                println!("Cataloged {} directories", entries.len());
                Ok(())
            }

            Commands::Checksum {
                root,
                depth,
                duplicates,
            } => {
                let archive = ArchiveConfig::load(&root.root)?;
                let (entries, removed) = catalog::generate_checksums(
                    &root.root,
                    &archive.ignore_set(),
                    depth.max_depth,
                    duplicates.policy(),
                )?;
                println!("Recorded {} checksums", entries.len());
                for path in &removed {
                    println!("Removed duplicate: {}", path.display());
                }
                Ok(())
            }

            Commands::Pages { root } => {
                let archive = ArchiveConfig::load(&root.root)?;
                page::generate_pages(&root.root, &archive.ignore_set())
            }

            Commands::Fill { root } => {
                let archive = ArchiveConfig::load(&root.root)?;
                page::fill_markers(&root.root, &archive.ignore_set())
            }

            Commands::Meta { root, target } => {
                let archive = ArchiveConfig::load(&root.root)?;
                let ignore = archive.ignore_set();
                let backend: Arc<dyn MetadataBackend> = Arc::new(OpenAiBackend::from_env(
                    archive.build_config.openai_temperature,
                )?);

                if matches!(target, MetaTarget::Files | MetaTarget::All) {
                    let updated =
                        meta::annotate_files(&root.root, &ignore, Arc::clone(&backend)).await?;
                    println!("Annotated {} page(s)", updated);
                }
                if matches!(target, MetaTarget::Dirs | MetaTarget::All) {
                    let updated = meta::annotate_dirs(&root.root, &ignore, backend).await?;
                    println!("Annotated {} directories", updated);
                }
                Ok(())
            }

            Commands::Index { root } => {
                let archive = ArchiveConfig::load(&root.root)?;
                let records =
                    search_index::generate_search_index(&root.root, &archive.ignore_set())?;
                println!("Indexed {} entries", records.len());
                Ok(())
            }

            Commands::Rename { root } => {
                let archive = ArchiveConfig::load(&root.root)?;
                let renamed = rename::normalize_names(&root.root, &archive.ignore_set())?;
                println!("Renamed {} entries", renamed);
                Ok(())
            }

            Commands::Config { root } => {
                let archive = ArchiveConfig::load(&root.root)?;
                print!("{}", serde_yaml::to_string(&archive)?);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_build_flags() {
        let cli = Cli::parse_from([
            "curator",
            "build",
            "--root",
            "/tmp/archive",
            "--type",
            "webpage",
            "--format",
            "list",
            "--max-depth",
            "3",
            "--remove-duplicates",
            "--wordcloud",
        ]);

        match cli.command {
            Commands::Build {
                root,
                kind,
                format,
                depth,
                duplicates,
                wordcloud,
                stage,
            } => {
                assert_eq!(root.root, PathBuf::from("/tmp/archive"));
                assert_eq!(kind, BuildKind::Webpage);
                assert_eq!(format, TocFormat::List);
                assert_eq!(depth.max_depth, 3);
                assert_eq!(duplicates.policy(), DuplicatePolicy::Remove);
                assert!(wordcloud);
                assert!(stage.is_none());
            }
            other => panic!("Unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["curator", "checksum"]);
        match cli.command {
            Commands::Checksum {
                root,
                depth,
                duplicates,
            } => {
                assert_eq!(root.root, PathBuf::from("."));
                assert_eq!(depth.max_depth, DEFAULT_MAX_DEPTH);
                assert_eq!(duplicates.policy(), DuplicatePolicy::Warn);
            }
            other => panic!("Unexpected command: {:?}", other),
        }
    }
}
