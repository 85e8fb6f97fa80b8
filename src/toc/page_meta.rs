//! Metadata extraction from generated page markdown.
//!
//! Pages carry an abstract between HTML-comment markers and an
//! attribute/value metadata table. Both are fixed formats written by
//! the page generator, so a line scan is enough to read them back.

use std::path::Path;

/// Opening marker of the abstract block
pub const ABSTRACT_START: &str = "<!-- tcd_abstract -->";
/// Closing marker of the abstract block
pub const ABSTRACT_END: &str = "<!-- tcd_abstract_end -->";
/// Opening marker of the download-link block
pub const DOWNLOAD_LINK_START: &str = "<!-- tcd_download_link -->";
/// Closing marker of the download-link block
pub const DOWNLOAD_LINK_END: &str = "<!-- tcd_download_link_end -->";

/// Fallback archived date for pages that never recorded one
pub const UNKNOWN_ARCHIVED_DATE: &str = "0000-01-01";

/// Metadata recovered from a page markdown file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMeta {
    /// Abstract text between the `tcd_abstract` markers
    pub description: Option<String>,

    /// Four-digit year from the `Date` table row
    pub year: Option<String>,

    /// Full value of the `Date` table row
    pub date: Option<String>,

    /// `Archived Date` table row
    pub archived_date: Option<String>,

    /// `Author` table row
    pub author: Option<String>,

    /// Comma-separated `Tags` table row
    pub tags: Vec<String>,

    /// URL from the `Original Link` table row
    pub link: Option<String>,
}

impl PageMeta {
    /// Parse metadata out of page markdown content
    pub fn parse(content: &str) -> Self {
        let mut meta = Self {
            description: extract_block(content, ABSTRACT_START, ABSTRACT_END),
            ..Default::default()
        };

        for line in content.lines() {
            let Some((key, value)) = table_row(line) else {
                continue;
            };
            let value = known(value);

            match key.to_lowercase().as_str() {
                "date" => {
                    meta.year = value.as_deref().and_then(leading_year);
                    meta.date = value;
                }
                "archived date" => meta.archived_date = value,
                "author" => meta.author = value,
                "tags" => {
                    meta.tags = value
                        .map(|v| {
                            v.split(',')
                                .map(|t| t.trim().to_string())
                                .filter(|t| !t.is_empty())
                                .collect()
                        })
                        .unwrap_or_default();
                }
                "original link" => {
                    meta.link = value.map(|v| markdown_link_url(&v).unwrap_or(v));
                }
                _ => {}
            }
        }

        meta
    }

    /// Read and parse a page file; missing or unreadable pages yield
    /// empty metadata
    pub fn from_file(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    /// Archived date with the unknown fallback applied
    pub fn archived_or_default(&self) -> &str {
        self.archived_date.as_deref().unwrap_or(UNKNOWN_ARCHIVED_DATE)
    }
}

/// Text between two marker lines, trimmed
fn extract_block(content: &str, start: &str, end: &str) -> Option<String> {
    let after = content.split_once(start)?.1;
    let block = after.split_once(end)?.0.trim();
    known(block)
}

/// Treat placeholder values still awaiting metadata as absent
fn known(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.starts_with("[Unknown") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Split a `| Key | Value |` markdown table row
fn table_row(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if !line.starts_with('|') {
        return None;
    }

    let mut cells = line.trim_matches('|').splitn(2, '|');
    let key = cells.next()?.trim();
    let value = cells.next()?.trim();

    // Skip the header separator row
    if key.chars().all(|c| matches!(c, '-' | ':' | ' ')) {
        return None;
    }

    Some((key, value))
}

/// Leading four-digit year of a date value, when present
fn leading_year(value: &str) -> Option<String> {
    let digits: String = value.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() >= 4 {
        Some(digits[..4].to_string())
    } else {
        None
    }
}

/// URL of the first `[text](url)` markdown link in a value
fn markdown_link_url(value: &str) -> Option<String> {
    let after = value.split_once("](")?.1;
    let url = after.split_once(')')?.0;
    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "# Example\n\n\
<!-- tcd_abstract -->\n\
A short summary of the document.\n\
<!-- tcd_abstract_end -->\n\n\
| Attribute | Value |\n\
|-----------|-------|\n\
| Date | 2021-06-15 |\n\
| Author | J. Doe |\n\
| Tags | history, archive |\n\
| Archived Date | 2022-01-03 |\n\
| Original Link | [source](https://example.com/doc) |\n";

    #[test]
    fn test_parse_full_page() {
        let meta = PageMeta::parse(PAGE);

        assert_eq!(
            meta.description.as_deref(),
            Some("A short summary of the document.")
        );
        assert_eq!(meta.year.as_deref(), Some("2021"));
        assert_eq!(meta.date.as_deref(), Some("2021-06-15"));
        assert_eq!(meta.author.as_deref(), Some("J. Doe"));
        assert_eq!(meta.tags, vec!["history", "archive"]);
        assert_eq!(meta.archived_date.as_deref(), Some("2022-01-03"));
        assert_eq!(meta.link.as_deref(), Some("https://example.com/doc"));
    }

    #[test]
    fn test_known_filters_placeholders_borrowed() {
        // Table cells arrive as borrowed slices of the page content
        let row = "| Author | [Unknown author(update needed)] |";
        let (key, value) = table_row(row).unwrap();
        assert_eq!(key, "Author");
        assert_eq!(known(value), None);

        let row = "| Author | J. Doe |";
        let (_, value) = table_row(row).unwrap();
        assert_eq!(known(value).as_deref(), Some("J. Doe"));
    }

    #[test]
    fn test_placeholders_read_as_absent() {
        let content = "<!-- tcd_abstract -->\n\
[Unknown description(update needed)]\n\
<!-- tcd_abstract_end -->\n\
| Date | [Unknown date(update needed)] |\n";

        let meta = PageMeta::parse(content);
        assert_eq!(meta.description, None);
        assert_eq!(meta.year, None);
        assert_eq!(meta.archived_or_default(), UNKNOWN_ARCHIVED_DATE);
    }

    #[test]
    fn test_year_only_date() {
        let meta = PageMeta::parse("| Date | 2019 |\n");
        assert_eq!(meta.year.as_deref(), Some("2019"));
    }

    #[test]
    fn test_missing_markers() {
        let meta = PageMeta::parse("just some text");
        assert_eq!(meta, PageMeta::default());
    }

    #[test]
    fn test_plain_url_link() {
        let meta = PageMeta::parse("| Original Link | https://example.com/x |\n");
        assert_eq!(meta.link.as_deref(), Some("https://example.com/x"));
    }
}
