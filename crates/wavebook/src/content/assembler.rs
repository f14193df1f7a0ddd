//! Content assembly: template sections plus computed results into blocks.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::batch::RunParameters;
use crate::dataset::Dataset;
use crate::error::{Result, WavebookError};
use crate::tabulate::{format_value, tabulate, CrossTabSpec, ValueTransform};

use super::block::{ContentBlock, Document, Figure};
use super::template::{ScalarSource, Section, Template};

// `{{ name }}` placeholders in narrative text.
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap());

/// Builds documents from a template.
#[derive(Debug, Clone, Copy)]
pub struct Assembler<'a> {
    template: &'a Template,
}

impl<'a> Assembler<'a> {
    /// Create an assembler for a template.
    pub fn new(template: &'a Template) -> Self {
        Self { template }
    }

    /// Assemble one document from a recoded dataset.
    pub fn assemble(&self, dataset: &Dataset, params: &RunParameters) -> Result<Document> {
        let (source_index, source_label) = self.source(params);
        let context = self.context(dataset, source_index, &source_label)?;
        let title = substitute(&self.template.title, &context)?;

        let mut blocks = Vec::new();
        for section in &self.template.sections {
            self.section(section, dataset, &context, &mut blocks)?;
        }

        info!(
            source = %source_label,
            blocks = blocks.len(),
            "assembled document"
        );

        Ok(Document {
            title,
            source_index,
            source_label,
            blocks,
        })
    }

    /// Source index and label, falling back to the template's defaults
    /// when the run leaves them unset (index 0, empty label).
    fn source(&self, params: &RunParameters) -> (usize, String) {
        let defaults = &self.template.parameters;
        let index = match params.source_index {
            0 => defaults.source_index,
            n => n,
        };
        let label = if params.label.is_empty() {
            defaults.source_label.clone()
        } else {
            params.label.clone()
        };
        (index, label)
    }

    /// Run parameters and computed scalars, by placeholder name.
    fn context(
        &self,
        dataset: &Dataset,
        source_index: usize,
        source_label: &str,
    ) -> Result<IndexMap<String, String>> {
        let mut context = IndexMap::new();
        context.insert("source_index".to_string(), source_index.to_string());
        context.insert("source_label".to_string(), source_label.to_string());

        for scalar in &self.template.scalars {
            let value = self.scalar(&scalar.source, dataset)?;
            debug!(name = %scalar.name, value = %value, "computed scalar");
            context.insert(scalar.name.clone(), value);
        }
        Ok(context)
    }

    fn scalar(&self, source: &ScalarSource, dataset: &Dataset) -> Result<String> {
        let decimals = self.template.decimals;
        match source {
            ScalarSource::Cell { table, row, column } => {
                let result = tabulate(dataset, table)?;
                let value = result
                    .value(row, column.as_deref())
                    .ok_or_else(|| WavebookError::Aggregation {
                        spec: table.to_string(),
                        message: match column {
                            Some(c) => format!("no cell for '{}' x '{}'", row, c),
                            None => format!("no cell for '{}'", row),
                        },
                    })?;
                Ok(format_value(value, table.transform, decimals))
            }
            ScalarSource::Modal { column, weight } => {
                let mut spec = CrossTabSpec::one_way(column.clone())
                    .with_transform(ValueTransform::Count);
                spec.weight = weight.clone();
                let result = tabulate(dataset, &spec)?;

                let mut best: Option<(usize, f64)> = None;
                for r in 0..result.height() {
                    let w = result.get(r, 0).unwrap_or(0.0);
                    if w > best.map(|(_, b)| b).unwrap_or(0.0) {
                        best = Some((r, w));
                    }
                }
                best.map(|(r, _)| result.row_labels[r].clone())
                    .ok_or_else(|| WavebookError::Aggregation {
                        spec: spec.to_string(),
                        message: "no non-missing values".to_string(),
                    })
            }
            ScalarSource::Respondents => Ok(dataset.row_count().to_string()),
        }
    }

    fn section(
        &self,
        section: &Section,
        dataset: &Dataset,
        context: &IndexMap<String, String>,
        blocks: &mut Vec<ContentBlock>,
    ) -> Result<()> {
        match section {
            Section::Text { text } => blocks.push(ContentBlock::Text {
                text: substitute(text, context)?,
            }),
            Section::Scalar { name, label } => {
                let value = context.get(name).cloned().ok_or_else(|| {
                    WavebookError::config(name, "scalar section refers to an undefined scalar")
                })?;
                blocks.push(ContentBlock::Scalar {
                    name: name.clone(),
                    label: label.clone().unwrap_or_else(|| name.clone()),
                    value,
                });
            }
            Section::Table { table, caption } => {
                let caption = caption.as_deref().map(|c| substitute(c, context)).transpose()?;
                blocks.push(ContentBlock::Table {
                    caption,
                    table: tabulate(dataset, table)?,
                });
            }
            Section::Figure { table, caption } => {
                let caption = match caption {
                    Some(c) => substitute(c, context)?,
                    None => table.to_string(),
                };
                let result = tabulate(dataset, table)?;
                blocks.push(ContentBlock::Figure(Figure::from_table(caption, &result)));
            }
            Section::Crosstabs {
                outer,
                inner,
                weight,
                transform,
                figures,
            } => {
                for row in outer {
                    for column in inner {
                        let spec = CrossTabSpec {
                            row: row.clone(),
                            column: Some(column.clone()),
                            weight: weight.clone(),
                            transform: *transform,
                        };
                        let table = tabulate(dataset, &spec)?;
                        let caption = format!("{} by {}", row, column);
                        if *figures {
                            blocks.push(ContentBlock::Figure(Figure::from_table(
                                caption.clone(),
                                &table,
                            )));
                        }
                        blocks.push(ContentBlock::Table {
                            caption: Some(caption),
                            table,
                        });
                    }
                    blocks.push(ContentBlock::PageBreak);
                }
            }
            Section::PageBreak => blocks.push(ContentBlock::PageBreak),
        }
        Ok(())
    }
}

/// Assemble one document. See [`Assembler::assemble`].
pub fn assemble(dataset: &Dataset, params: &RunParameters, template: &Template) -> Result<Document> {
    Assembler::new(template).assemble(dataset, params)
}

/// Replace `{{name}}` placeholders. An unknown name is a configuration error.
pub fn substitute(text: &str, context: &IndexMap<String, String>) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = context.get(name.as_str()).ok_or_else(|| {
            WavebookError::config(
                "template",
                format!(
                    "unknown placeholder '{}' (known: {})",
                    whole.as_str(),
                    context.keys().cloned().collect::<Vec<_>>().join(", ")
                ),
            )
        })?;
        out.push_str(&text[last..whole.start()]);
        out.push_str(value);
        last = whole.end();
    }

    out.push_str(&text[last..]);
    Ok(out)
}
