//! TOC formatters.
//!
//! Two output styles over the same structured items: sortable HTML
//! tables (the default for published archives) and plain markdown
//! lists (for mirrors that strip HTML).

use clap::ValueEnum;

use crate::manifest::FileType;

/// Output style of generated READMEs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TocFormat {
    /// Sortable HTML tables
    #[default]
    Table,

    /// Plain markdown lists
    List,
}

/// A file row in a TOC section
#[derive(Debug, Clone)]
pub struct FileItem {
    /// Display name
    pub name: String,

    /// Link target relative to the README's directory
    pub link: String,

    /// Publication year, when known
    pub year: Option<String>,

    /// Abstract pulled from the page markdown
    pub summary: Option<String>,
}

/// A subdirectory row in a TOC
#[derive(Debug, Clone)]
pub struct DirItem {
    /// Directory name (doubles as the link target)
    pub name: String,

    /// Recursive tracked-file count
    pub count: usize,

    /// Directory description, when one has been generated
    pub description: Option<String>,
}

impl TocFormat {
    /// Render the subdirectory section
    pub fn render_dirs(&self, dirs: &[DirItem]) -> String {
        if dirs.is_empty() {
            return String::new();
        }

        match self {
            TocFormat::Table => {
                let rows: Vec<String> = dirs
                    .iter()
                    .map(|d| {
                        let description = d.description.as_deref().unwrap_or("");
                        format!(
                            "<tr><td><a href=\"{}\" class=\"md-button\">{}</a></td>\
<td class=\"count-cell\">{} items</td><td>{}</td></tr>",
                            d.name, d.name, d.count, description
                        )
                    })
                    .collect();

                html_table(
                    &[
                        ("Directory", "30%", Sort::Text),
                        ("Items", "20%", Sort::None),
                        ("Description", "50%", Sort::None),
                    ],
                    &rows,
                )
            }
            TocFormat::List => {
                let mut out = String::new();
                for d in dirs {
                    out.push_str(&format!("- [{}]({}) ({} items)\n", d.name, d.name, d.count));
                    if let Some(description) = &d.description {
                        out.push_str(&format!(
                            "  <details><summary>About</summary>\n\n  {}\n  </details>\n",
                            description
                        ));
                    }
                }
                out.push('\n');
                out
            }
        }
    }

    /// Render one per-type file section, header included.
    ///
    /// Image sections embed the files inline instead of linking them.
    pub fn render_files(&self, file_type: FileType, items: &[FileItem]) -> String {
        if items.is_empty() {
            return String::new();
        }

        if file_type == FileType::Image {
            let mut out = format!("\n### {}\n\n", file_type.label());
            for item in items {
                out.push_str(&format!("![{}]({})\n", item.name, item.link));
            }
            return out;
        }

        match self {
            TocFormat::Table => {
                let rows: Vec<String> = items
                    .iter()
                    .map(|item| {
                        format!(
                            "<tr><td><a href=\"{}\" class=\"md-button\">{}</a></td>\
<td class=\"year-cell\">{}</td><td>{}</td></tr>",
                            item.link,
                            item.name,
                            item.year.as_deref().unwrap_or(""),
                            item.summary.as_deref().unwrap_or("")
                        )
                    })
                    .collect();

                format!(
                    "\n### {}\n\n{}",
                    file_type.label(),
                    html_table(
                        &[
                            ("Title", "40%", Sort::Text),
                            ("Year", "15%", Sort::YearDesc),
                            ("Abstract", "45%", Sort::None),
                        ],
                        &rows,
                    )
                )
            }
            TocFormat::List => {
                let mut out = format!("\n### {} ({} items)\n\n", file_type.label(), items.len());
                for item in items {
                    out.push_str(&format!("- [{}]({})\n", item.name, item.link));
                    if let Some(summary) = &item.summary {
                        out.push_str(&format!(
                            "  <details><summary>Abstract</summary>\n\n  {}\n  </details>\n",
                            summary
                        ));
                    }
                }
                out.push('\n');
                out
            }
        }
    }
}

/// Column sorting behavior in table headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sort {
    None,
    Text,
    YearDesc,
}

/// Build a sortable HTML table from pre-rendered rows
fn html_table(headers: &[(&str, &str, Sort)], rows: &[String]) -> String {
    let mut table = vec!["<table>".to_string(), "<thead><tr>".to_string()];

    for (name, width, sort) in headers {
        let th = match sort {
            Sort::None => format!("<th style=\"width: {}\">{}</th>", width, name),
            Sort::Text => format!(
                "<th style=\"width: {}\" data-sortable=\"true\" \
data-sort-direction=\"asc\" data-sort-type=\"text\">{} ▲</th>",
                width, name
            ),
            Sort::YearDesc => format!(
                "<th style=\"width: {}\" data-sortable=\"true\" \
data-sort-direction=\"desc\" data-sort-type=\"year\">{} ▼</th>",
                width, name
            ),
        };
        table.push(th);
    }

    table.push("</tr></thead>".to_string());
    table.push("<tbody>".to_string());
    table.extend(rows.iter().cloned());
    table.push("</tbody>".to_string());
    table.push("</table>\n".to_string());

    table.join("\n")
}
