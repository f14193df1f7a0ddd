//! In-memory survey dataset.

use crate::error::{Result, WavebookError};

use super::column::{CategoricalColumn, Column, ColumnKind};

/// A table of named, typed columns with an optional weight column.
///
/// All columns have the same number of rows. Column order is the order in
/// which columns were added (source order, then derived columns).
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
    row_count: usize,
    weight_column: Option<String>,
}

impl Dataset {
    /// Create an empty dataset with a fixed number of rows.
    pub fn new(row_count: usize) -> Self {
        Self {
            columns: Vec::new(),
            row_count,
            weight_column: None,
        }
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// All columns in order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Get a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Whether a column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Get a categorical column by name.
    pub fn categorical(&self, name: &str) -> Option<&CategoricalColumn> {
        self.column(name).and_then(Column::as_categorical)
    }

    /// Get a numeric column by name.
    pub fn numeric(&self, name: &str) -> Option<&[Option<f64>]> {
        self.column(name).and_then(Column::as_numeric)
    }

    /// Names of all columns of a kind.
    pub fn columns_of_kind(&self, kind: ColumnKind) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(move |c| c.kind() == kind)
    }

    /// Append a column.
    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if column.len() != self.row_count {
            return Err(WavebookError::config(
                column.name.clone(),
                format!(
                    "column has {} rows, dataset has {}",
                    column.len(),
                    self.row_count
                ),
            ));
        }
        if self.has_column(&column.name) {
            return Err(WavebookError::config(
                column.name.clone(),
                "column already exists",
            ));
        }
        self.columns.push(column);
        Ok(())
    }

    /// Replace an existing column of the same name, keeping its position.
    pub fn replace_column(&mut self, column: Column) -> Result<()> {
        let slot = self
            .columns
            .iter_mut()
            .find(|c| c.name == column.name)
            .ok_or_else(|| WavebookError::MissingColumn {
                column: column.name.clone(),
                context: "replace".to_string(),
            })?;
        *slot = column;
        Ok(())
    }

    /// Name of the weight column, if any.
    pub fn weight_column(&self) -> Option<&str> {
        self.weight_column.as_deref()
    }

    /// Designate a numeric column as the weight column.
    ///
    /// Every weight must be present, finite, and non-negative.
    pub fn set_weight_column(&mut self, name: &str) -> Result<()> {
        let values = self.numeric(name).ok_or_else(|| WavebookError::MissingColumn {
            column: name.to_string(),
            context: "weight column must be numeric".to_string(),
        })?;

        for (row, value) in values.iter().enumerate() {
            match value {
                Some(w) if w.is_finite() && *w >= 0.0 => {}
                other => {
                    return Err(WavebookError::InvalidWeight {
                        column: name.to_string(),
                        row,
                        value: other.map(|w| w.to_string()).unwrap_or_default(),
                    });
                }
            }
        }

        self.weight_column = Some(name.to_string());
        Ok(())
    }

    /// Weight of every row, defaulting to 1.0 when no weight column is set.
    pub fn weights(&self) -> Vec<f64> {
        match self.weight_column.as_deref().and_then(|w| self.numeric(w)) {
            Some(values) => values.iter().map(|v| v.unwrap_or(0.0)).collect(),
            None => vec![1.0; self.row_count],
        }
    }
}
