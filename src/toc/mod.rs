//! Table-of-contents generation.
//!
//! Walks the manifest tree and renders a `README.md` per directory:
//! subdirectory listings with recursive counts, then file listings
//! bucketed by type in natural order, enriched with abstracts pulled
//! from the generated metadata pages.

pub mod generate;
pub mod page_meta;
pub mod render;
pub mod sort;

pub use generate::TocGenerator;
pub use page_meta::PageMeta;
pub use render::TocFormat;
pub use sort::natural_key;
