//! Dataset loader: raw delimited text into a typed [`Dataset`].
//!
//! Columns are typed once, at load time:
//!
//! - columns with declared labels (inline or in a `<stem>.labels.json`
//!   sidecar) and columns listed in `categorical_columns` are categorical;
//! - the weight column and `numeric_columns` are numeric;
//! - anything else is numeric when every non-missing value parses as a
//!   number, categorical otherwise.
//!
//! Required columns are checked before typing so a source that drifted from
//! the template fails here, not halfway through tabulation.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::parser::{Parser, ParserConfig};
use super::source::{RawTable, SourceMetadata};
use crate::dataset::{CategoricalColumn, Column, Dataset};
use crate::error::{Result, WavebookError};

/// Loader configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Name of the sample-weight column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_column: Option<String>,
    /// Fail with `MissingWeightColumn` when the weight column is absent.
    pub require_weight: bool,
    /// Columns downstream stages rely on.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required_columns: Vec<String>,
    /// Columns forced to numeric.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub numeric_columns: Vec<String>,
    /// Columns forced to categorical even when values look numeric.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub categorical_columns: Vec<String>,
    /// Declared label order per column.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub labels: IndexMap<String, Vec<String>>,
    /// Parser settings.
    pub parser: ParserConfig,
}

impl LoaderConfig {
    /// Create a default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the weight column and require it.
    pub fn with_weight(mut self, column: impl Into<String>) -> Self {
        self.weight_column = Some(column.into());
        self.require_weight = true;
        self
    }

    /// Add a required column.
    pub fn with_required(mut self, column: impl Into<String>) -> Self {
        self.required_columns.push(column.into());
        self
    }

    /// Declare the label order of a categorical column.
    pub fn with_labels<I, S>(mut self, column: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels
            .insert(column.into(), labels.into_iter().map(Into::into).collect());
        self
    }

    /// Force a column to categorical.
    pub fn with_categorical(mut self, column: impl Into<String>) -> Self {
        self.categorical_columns.push(column.into());
        self
    }
}

/// Path of the label sidecar for a data file: `<stem>.labels.json`.
pub fn labels_sidecar_path(path: &Path) -> PathBuf {
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    path.with_file_name(format!("{}.labels.json", stem))
}

/// Reads one data file into a [`Dataset`].
#[derive(Debug, Clone, Default)]
pub struct DatasetLoader {
    config: LoaderConfig,
    parser: Parser,
}

impl DatasetLoader {
    /// Create a loader.
    pub fn new(config: LoaderConfig) -> Self {
        let parser = Parser::with_config(config.parser.clone());
        Self { config, parser }
    }

    /// The loader configuration.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Load a file into a typed dataset.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<(Dataset, SourceMetadata)> {
        let path = path.as_ref();
        let (raw, metadata) = self.parser.parse_file(path)?;

        let mut declared = self.config.labels.clone();
        for (column, labels) in read_sidecar(path)? {
            declared.entry(column).or_insert(labels);
        }

        self.check_schema(path, &raw, &declared)?;
        let dataset = self.build(path, &raw, &declared)?;

        info!(
            file = %metadata.file,
            rows = dataset.row_count(),
            columns = dataset.column_count(),
            weight = dataset.weight_column().unwrap_or("-"),
            "loaded dataset"
        );

        Ok((dataset, metadata))
    }

    /// Fail fast when required, declared, or weight columns are absent.
    fn check_schema(
        &self,
        path: &Path,
        raw: &RawTable,
        declared: &IndexMap<String, Vec<String>>,
    ) -> Result<()> {
        if let Some(ref weight) = self.config.weight_column {
            if raw.column_index(weight).is_none() {
                if self.config.require_weight {
                    return Err(WavebookError::MissingWeightColumn {
                        path: path.to_path_buf(),
                        column: weight.clone(),
                    });
                }
                warn!(file = %path.display(), column = %weight, "weight column absent, using unit weights");
            }
        }

        let missing: Vec<String> = self
            .config
            .required_columns
            .iter()
            .chain(declared.keys())
            .chain(self.config.categorical_columns.iter())
            .filter(|c| raw.column_index(c).is_none())
            .cloned()
            .collect();

        if !missing.is_empty() {
            return Err(WavebookError::SchemaMismatch {
                path: path.to_path_buf(),
                missing,
            });
        }

        Ok(())
    }

    fn build(
        &self,
        path: &Path,
        raw: &RawTable,
        declared: &IndexMap<String, Vec<String>>,
    ) -> Result<Dataset> {
        let mut dataset = Dataset::new(raw.row_count());
        let weight = self.config.weight_column.as_deref();

        for (index, name) in raw.headers.iter().enumerate() {
            if name.is_empty() || dataset.has_column(name) {
                warn!(file = %path.display(), column = %name, "skipping unnamed or duplicate column");
                continue;
            }

            let values: Vec<Option<&str>> = raw
                .column_values(index)
                .map(|v| {
                    let v = v.trim();
                    (!RawTable::is_null_value(v)).then_some(v)
                })
                .collect();

            let labels = declared.get(name);
            let forced_categorical =
                labels.is_some() || self.config.categorical_columns.contains(name);
            let forced_numeric =
                weight == Some(name.as_str()) || self.config.numeric_columns.contains(name);

            let column = if forced_categorical {
                categorical(name, &values, labels.map(Vec::as_slice))?
            } else if forced_numeric || looks_numeric(&values) {
                numeric(path, name, &values)?
            } else {
                categorical(name, &values, None)?
            };

            debug!(column = %name, kind = ?column.kind(), "typed column");
            dataset.push_column(column)?;
        }

        if let Some(weight) = weight {
            if dataset.has_column(weight) {
                dataset.set_weight_column(weight)?;
            }
        }

        Ok(dataset)
    }
}

fn read_sidecar(path: &Path) -> Result<IndexMap<String, Vec<String>>> {
    let sidecar = labels_sidecar_path(path);
    if !sidecar.exists() {
        return Ok(IndexMap::new());
    }

    let contents = fs::read_to_string(&sidecar).map_err(|e| WavebookError::Io {
        path: sidecar.clone(),
        source: e,
    })?;
    serde_json::from_str(&contents).map_err(|e| WavebookError::UnreadableSource {
        path: sidecar,
        message: e.to_string(),
    })
}

/// All non-missing values parse as numbers. All-missing columns type as
/// numeric so they never yield an empty label set.
fn looks_numeric(values: &[Option<&str>]) -> bool {
    values.iter().flatten().all(|v| v.parse::<f64>().is_ok())
}

fn numeric(path: &Path, name: &str, values: &[Option<&str>]) -> Result<Column> {
    let parsed = values
        .iter()
        .enumerate()
        .map(|(row, v)| match v {
            Some(s) => s.parse::<f64>().map(Some).map_err(|_| {
                WavebookError::UnreadableSource {
                    path: path.to_path_buf(),
                    message: format!("column '{}' row {}: '{}' is not numeric", name, row + 1, s),
                }
            }),
            None => Ok(None),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Column::numeric(name, parsed))
}

fn categorical(name: &str, values: &[Option<&str>], labels: Option<&[String]>) -> Result<Column> {
    let (column, undeclared) = CategoricalColumn::from_values(values.iter().copied(), labels);
    if !undeclared.is_empty() {
        warn!(column = %name, ?undeclared, "values outside declared labels");
    }
    if column.labels().is_empty() {
        return Err(WavebookError::EmptyLabelSet {
            column: name.to_string(),
        });
    }
    Ok(Column::categorical(name, column))
}
