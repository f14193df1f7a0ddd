//! In-memory tabular model: label sets, typed columns, and the dataset.

mod column;
mod labels;
mod table;

pub use column::{CategoricalColumn, Column, ColumnData, ColumnKind};
pub use labels::{LabelSet, Relabel};
pub use table::Dataset;
