//! Cross-tabulation specifications.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How accumulated weights are turned into cell values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueTransform {
    /// Raw weighted sums.
    Count,
    /// Share of the grand total; all cells sum to 1.
    #[default]
    Proportion,
    /// Share within each row of a two-way table.
    RowProportion,
    /// Share within each column of a two-way table.
    ColumnProportion,
}

impl ValueTransform {
    /// Whether cell values are shares rather than weighted sums.
    pub fn is_proportion(&self) -> bool {
        !matches!(self, ValueTransform::Count)
    }

    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ValueTransform::Count => "weighted count",
            ValueTransform::Proportion => "proportion",
            ValueTransform::RowProportion => "row proportion",
            ValueTransform::ColumnProportion => "column proportion",
        }
    }
}

/// What to tabulate: a row variable, an optional column variable, and how to
/// weight and scale the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossTabSpec {
    /// Row (outer) categorical variable.
    pub row: String,
    /// Optional column (grouping) categorical variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// Weight column. When unset, the dataset's designated weight column is
    /// used, or unit weights if it has none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    /// Value transform.
    #[serde(default)]
    pub transform: ValueTransform,
}

impl CrossTabSpec {
    /// A one-way frequency table of proportions.
    pub fn one_way(row: impl Into<String>) -> Self {
        Self {
            row: row.into(),
            column: None,
            weight: None,
            transform: ValueTransform::default(),
        }
    }

    /// A two-way table of proportions.
    pub fn two_way(row: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            column: Some(column.into()),
            ..Self::one_way(row)
        }
    }

    /// Use an explicit weight column.
    pub fn weighted_by(mut self, weight: impl Into<String>) -> Self {
        self.weight = Some(weight.into());
        self
    }

    /// Set the value transform.
    pub fn with_transform(mut self, transform: ValueTransform) -> Self {
        self.transform = transform;
        self
    }

    /// All categorical columns this spec reads.
    pub fn categorical_columns(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.row.as_str()).chain(self.column.as_deref())
    }
}

impl fmt::Display for CrossTabSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.row)?;
        if let Some(ref column) = self.column {
            write!(f, " x {}", column)?;
        }
        if let Some(ref weight) = self.weight {
            write!(f, " weighted by {}", weight)?;
        }
        write!(f, " ({})", self.transform.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let spec = CrossTabSpec::two_way("ideo", "sex")
            .weighted_by("weight")
            .with_transform(ValueTransform::Count);
        assert_eq!(spec.to_string(), "ideo x sex weighted by weight (weighted count)");
        assert_eq!(CrossTabSpec::one_way("q1").to_string(), "q1 (proportion)");
    }

    #[test]
    fn test_from_json_defaults() {
        let spec: CrossTabSpec = serde_json::from_str(r#"{"row": "q1", "column": "sex"}"#).unwrap();
        assert_eq!(spec.transform, ValueTransform::Proportion);
        assert_eq!(spec.categorical_columns().collect::<Vec<_>>(), vec!["q1", "sex"]);
    }
}
