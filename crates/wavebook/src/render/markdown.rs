//! Markdown rendering.
//!
//! Markdown is also the intermediate form handed to external renderers, so
//! page breaks are written as `\newpage` (understood by pandoc's LaTeX and
//! docx writers) when the final format is paginated.

use std::fmt::Write as _;
use std::path::Path;

use crate::content::{ContentBlock, Document, Figure};
use crate::error::Result;
use crate::tabulate::{format_value, TabulationResult, ValueTransform};

use super::{write_output, OutputFormat, RenderBackend};

const BAR_WIDTH: f64 = 40.0;

/// Writes documents as Markdown.
#[derive(Debug, Clone)]
pub struct MarkdownBackend {
    target: OutputFormat,
    decimals: usize,
}

impl MarkdownBackend {
    /// A backend producing plain Markdown output.
    pub fn new() -> Self {
        Self::for_target(OutputFormat::Markdown)
    }

    /// A backend producing Markdown destined for `target`.
    pub fn for_target(target: OutputFormat) -> Self {
        Self {
            target,
            decimals: 0,
        }
    }

    /// Decimal places for table cells.
    pub fn with_decimals(mut self, decimals: usize) -> Self {
        self.decimals = decimals;
        self
    }

    /// Render a document to a Markdown string.
    pub fn to_markdown(&self, document: &Document) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# {}\n", document.title);

        for block in &document.blocks {
            match block {
                ContentBlock::Text { text } => {
                    let _ = writeln!(out, "{}\n", text.trim_end());
                }
                ContentBlock::Scalar { label, value, .. } => {
                    let _ = writeln!(out, "**{}:** {}\n", label, value);
                }
                ContentBlock::Table { caption, table } => {
                    if let Some(caption) = caption {
                        let _ = writeln!(out, "**{}**\n", caption);
                    }
                    self.table(&mut out, table);
                    out.push('\n');
                }
                ContentBlock::Figure(figure) => {
                    self.figure(&mut out, figure);
                    out.push('\n');
                }
                ContentBlock::PageBreak => {
                    if self.target.is_paginated() {
                        out.push_str("\\newpage\n\n");
                    }
                }
            }
        }

        out
    }

    fn table(&self, out: &mut String, table: &TabulationResult) {
        let headers: Vec<String> = if table.is_two_way() {
            table.column_labels.iter().map(|l| escape(l)).collect()
        } else {
            vec![table.spec.transform.label().to_string()]
        };

        let _ = writeln!(out, "| {} | {} |", escape(&table.spec.row), headers.join(" | "));
        let _ = writeln!(out, "|---|{}", "---:|".repeat(headers.len()));

        for (r, label) in table.row_labels.iter().enumerate() {
            let cells: Vec<String> = (0..table.width())
                .map(|c| table.format_cell(r, c, self.decimals))
                .collect();
            let _ = writeln!(out, "| {} | {} |", escape(label), cells.join(" | "));
        }
    }

    fn figure(&self, out: &mut String, figure: &Figure) {
        let _ = writeln!(out, "*Figure: {}*\n", figure.caption);

        let transform = if figure.proportions {
            ValueTransform::Proportion
        } else {
            ValueTransform::Count
        };
        let max = figure
            .series
            .iter()
            .flat_map(|s| s.values.iter().copied())
            .fold(0.0f64, f64::max);
        let width = figure.categories.iter().map(|c| c.chars().count()).max().unwrap_or(0);

        out.push_str("```\n");
        for series in &figure.series {
            if figure.series.len() > 1 {
                let _ = writeln!(out, "{}", series.name);
            }
            for (category, value) in figure.categories.iter().zip(&series.values) {
                let len = if max > 0.0 {
                    (value / max * BAR_WIDTH).round() as usize
                } else {
                    0
                };
                let _ = writeln!(
                    out,
                    "{:<width$}  {} {}",
                    category,
                    "#".repeat(len),
                    format_value(*value, transform, self.decimals),
                    width = width
                );
            }
        }
        out.push_str("```\n");
    }
}

impl Default for MarkdownBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderBackend for MarkdownBackend {
    fn name(&self) -> &str {
        "markdown"
    }

    fn version(&self) -> String {
        format!("wavebook-markdown {}", env!("CARGO_PKG_VERSION"))
    }

    fn format(&self) -> OutputFormat {
        self.target
    }

    fn render(&self, document: &Document, output: &Path) -> Result<()> {
        write_output(output, self.to_markdown(document).as_bytes())
    }
}

/// Escape pipe characters in table cells.
fn escape(text: &str) -> String {
    text.replace('|', "\\|")
}
