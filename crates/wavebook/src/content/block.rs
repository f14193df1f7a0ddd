//! The intermediate content model handed to rendering backends.

use serde::{Deserialize, Serialize};

use crate::tabulate::TabulationResult;

/// One unit of a document body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Narrative text with placeholders already substituted.
    Text { text: String },
    /// A named computed value shown on its own line.
    Scalar {
        name: String,
        label: String,
        value: String,
    },
    /// A tabulation.
    Table {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
        table: TabulationResult,
    },
    /// A chart description.
    Figure(Figure),
    /// Page-break hint; ignored by non-paginated backends.
    PageBreak,
}

impl ContentBlock {
    /// Short name of the block kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ContentBlock::Text { .. } => "text",
            ContentBlock::Scalar { .. } => "scalar",
            ContentBlock::Table { .. } => "table",
            ContentBlock::Figure(_) => "figure",
            ContentBlock::PageBreak => "page_break",
        }
    }
}

/// A bar chart: one bar group per category, one bar per series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub caption: String,
    pub categories: Vec<String>,
    pub series: Vec<Series>,
    /// Whether values are shares (rendered as percentages).
    pub proportions: bool,
}

/// One named series of values, aligned with the figure categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

impl Figure {
    /// Describe a tabulation as a bar chart.
    ///
    /// A one-way table gives a single series; a two-way table gives one
    /// series per column label.
    pub fn from_table(caption: impl Into<String>, table: &TabulationResult) -> Self {
        let series = if table.is_two_way() {
            table
                .column_labels
                .iter()
                .enumerate()
                .map(|(c, name)| Series {
                    name: name.clone(),
                    values: (0..table.height())
                        .map(|r| table.get(r, c).unwrap_or(0.0))
                        .collect(),
                })
                .collect()
        } else {
            vec![Series {
                name: table.spec.row.clone(),
                values: (0..table.height())
                    .map(|r| table.get(r, 0).unwrap_or(0.0))
                    .collect(),
            }]
        };

        Self {
            caption: caption.into(),
            categories: table.row_labels.clone(),
            series,
            proportions: table.spec.transform.is_proportion(),
        }
    }
}

/// An assembled document: a title and an ordered body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub source_index: usize,
    pub source_label: String,
    pub blocks: Vec<ContentBlock>,
}

impl Document {
    /// Number of blocks of a given kind.
    pub fn count(&self, kind: &str) -> usize {
        self.blocks.iter().filter(|b| b.kind() == kind).count()
    }
}
