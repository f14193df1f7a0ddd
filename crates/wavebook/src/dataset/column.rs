//! Typed dataset columns.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::labels::{LabelSet, Relabel};

/// Kind of a column, without its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Discrete labelled values.
    Categorical,
    /// Floating-point values (weights included).
    Numeric,
}

/// A categorical column: a label set and one optional label code per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoricalColumn {
    labels: LabelSet,
    codes: Vec<Option<usize>>,
}

impl CategoricalColumn {
    /// Create a column from a label set and row codes.
    ///
    /// Codes must index into `labels`; out-of-range codes are treated as missing.
    pub fn new(labels: LabelSet, codes: Vec<Option<usize>>) -> Self {
        let len = labels.len();
        let codes = codes
            .into_iter()
            .map(|c| c.filter(|&i| i < len))
            .collect();
        Self { labels, codes }
    }

    /// Build a column from raw row values.
    ///
    /// Declared labels come first in declared order; values outside the
    /// declaration are appended in order of appearance. `None` rows are missing.
    pub fn from_values<'a, I>(values: I, declared: Option<&[String]>) -> (Self, Vec<String>)
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let mut labels = declared
            .map(|d| LabelSet::new(d.iter().cloned()))
            .unwrap_or_default();
        let declared_len = labels.len();
        let mut codes = Vec::new();

        for value in values {
            match value {
                Some(v) => {
                    let (next, index) = match labels.position(v) {
                        Some(i) => (labels, i),
                        None => labels.with_label(v),
                    };
                    labels = next;
                    codes.push(Some(index));
                }
                None => codes.push(None),
            }
        }

        let undeclared = if declared.is_some() {
            labels.iter().skip(declared_len).map(str::to_string).collect()
        } else {
            Vec::new()
        };

        (Self { labels, codes }, undeclared)
    }

    /// The label set.
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Per-row label codes.
    pub fn codes(&self) -> &[Option<usize>] {
        &self.codes
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// True when the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Label of a row, or `None` when missing.
    pub fn value(&self, row: usize) -> Option<&str> {
        self.codes
            .get(row)
            .copied()
            .flatten()
            .and_then(|i| self.labels.get(i))
    }

    /// Apply a relabeling, producing a new column.
    pub fn relabeled(&self, relabel: &Relabel) -> Self {
        let codes = self
            .codes
            .iter()
            .map(|c| c.map(|i| relabel.remap[i]))
            .collect();
        Self {
            labels: relabel.labels.clone(),
            codes,
        }
    }

    /// Number of non-missing rows per label, in label order.
    pub fn counts(&self) -> IndexMap<String, usize> {
        let mut tally = vec![0usize; self.labels.len()];
        for &i in self.codes.iter().flatten() {
            tally[i] += 1;
        }
        self.labels
            .iter()
            .zip(tally)
            .map(|(l, n)| (l.to_string(), n))
            .collect()
    }
}

/// Column payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Labelled categories.
    Categorical(CategoricalColumn),
    /// Numbers; `None` marks a missing value.
    Numeric(Vec<Option<f64>>),
}

/// A named column carrying its own data and label set.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Column payload.
    pub data: ColumnData,
}

impl Column {
    /// Create a categorical column.
    pub fn categorical(name: impl Into<String>, column: CategoricalColumn) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Categorical(column),
        }
    }

    /// Create a numeric column.
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    /// Kind of this column.
    pub fn kind(&self) -> ColumnKind {
        match self.data {
            ColumnData::Categorical(_) => ColumnKind::Categorical,
            ColumnData::Numeric(_) => ColumnKind::Numeric,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Categorical(c) => c.len(),
            ColumnData::Numeric(v) => v.len(),
        }
    }

    /// True when the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow as categorical.
    pub fn as_categorical(&self) -> Option<&CategoricalColumn> {
        match &self.data {
            ColumnData::Categorical(c) => Some(c),
            ColumnData::Numeric(_) => None,
        }
    }

    /// Borrow as numeric.
    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Numeric(v) => Some(v),
            ColumnData::Categorical(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_values_first_appearance_order() {
        let values = [Some("No"), Some("Yes"), None, Some("No")];
        let (col, undeclared) = CategoricalColumn::from_values(values, None);

        assert_eq!(col.labels().to_vec(), vec!["No", "Yes"]);
        assert_eq!(col.codes(), &[Some(0), Some(1), None, Some(0)]);
        assert!(undeclared.is_empty());
    }

    #[test]
    fn test_from_values_respects_declaration() {
        let declared = vec!["Yes".to_string(), "No".to_string(), "Maybe".to_string()];
        let values = [Some("No"), Some("Other"), Some("Yes")];
        let (col, undeclared) = CategoricalColumn::from_values(values, Some(declared.as_slice()));

        assert_eq!(col.labels().to_vec(), vec!["Yes", "No", "Maybe", "Other"]);
        assert_eq!(undeclared, vec!["Other"]);
        assert_eq!(col.value(0), Some("No"));
        assert_eq!(col.counts()["Maybe"], 0);
    }

    #[test]
    fn test_relabeled() {
        let (col, _) =
            CategoricalColumn::from_values([Some("a"), Some("b"), Some("c")], None);
        let relabel = col
            .labels()
            .relabel(|_, l| if l == "c" { "a".into() } else { l.into() });
        let merged = col.relabeled(&relabel);

        assert_eq!(merged.labels().len(), 2);
        assert_eq!(merged.value(2), Some("a"));
        assert_eq!(merged.counts()["a"], 2);
    }

    #[test]
    fn test_new_drops_out_of_range_codes() {
        let col = CategoricalColumn::new(LabelSet::new(["x"]), vec![Some(0), Some(3)]);
        assert_eq!(col.value(1), None);
    }
}
