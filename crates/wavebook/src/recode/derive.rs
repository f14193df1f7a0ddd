//! Derived categorical variables.
//!
//! A derived variable is a new column computed from an existing categorical
//! column. The source column is never overwritten.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::dataset::{CategoricalColumn, Column, Dataset, LabelSet};
use crate::error::{Result, WavebookError};

fn default_other() -> String {
    "Other".to_string()
}

/// A derived-column definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DerivedVariable {
    /// Keep the `keep` most frequent labels (by weight), bucket the rest.
    TopN {
        source: String,
        target: String,
        keep: usize,
        #[serde(default = "default_other")]
        other_label: String,
    },
    /// Map source labels onto new labels. Unlisted labels go to `default`,
    /// or become missing when there is no default.
    Group {
        source: String,
        target: String,
        groups: IndexMap<String, Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<String>,
    },
}

impl DerivedVariable {
    /// Name of the column this produces.
    pub fn target(&self) -> &str {
        match self {
            DerivedVariable::TopN { target, .. } | DerivedVariable::Group { target, .. } => target,
        }
    }

    /// Name of the column this reads.
    pub fn source(&self) -> &str {
        match self {
            DerivedVariable::TopN { source, .. } | DerivedVariable::Group { source, .. } => source,
        }
    }

    /// Compute the derived column.
    pub fn derive(&self, dataset: &Dataset) -> Result<Column> {
        let target = self.target();
        if dataset.has_column(target) {
            return Err(WavebookError::config(
                target,
                "derived column would overwrite an existing column",
            ));
        }

        let source = dataset
            .column(self.source())
            .ok_or_else(|| WavebookError::MissingColumn {
                column: self.source().to_string(),
                context: format!("source of derived column '{}'", target),
            })?
            .as_categorical()
            .ok_or_else(|| {
                WavebookError::config(target, format!("source '{}' is not categorical", self.source()))
            })?;

        let (labels, mapping) = match self {
            DerivedVariable::TopN {
                keep, other_label, ..
            } => top_n(dataset, source, *keep, other_label, target)?,
            DerivedVariable::Group {
                groups, default, ..
            } => group(source, groups, default.as_deref(), target)?,
        };

        let codes = source
            .codes()
            .iter()
            .map(|c| c.and_then(|i| mapping[i]))
            .collect();

        Ok(Column::categorical(target, CategoricalColumn::new(labels, codes)))
    }
}

type Mapping = (LabelSet, Vec<Option<usize>>);

fn top_n(
    dataset: &Dataset,
    source: &CategoricalColumn,
    keep: usize,
    other_label: &str,
    target: &str,
) -> Result<Mapping> {
    if keep == 0 {
        return Err(WavebookError::config(target, "top-n must keep at least one label"));
    }

    let weights = dataset.weights();
    let mut totals = vec![0.0f64; source.labels().len()];
    for (code, weight) in source.codes().iter().zip(&weights) {
        if let Some(i) = code {
            totals[*i] += weight;
        }
    }

    // Stable sort: ties keep declared order.
    let mut ranked: Vec<usize> = (0..totals.len()).collect();
    ranked.sort_by(|a, b| totals[*b].total_cmp(&totals[*a]));
    let mut kept = vec![false; totals.len()];
    for &i in ranked.iter().take(keep) {
        kept[i] = true;
    }

    let mut labels: Vec<&str> = source
        .labels()
        .iter()
        .enumerate()
        .filter(|(i, _)| kept[*i])
        .map(|(_, l)| l)
        .collect();
    if kept.iter().any(|k| !k) {
        labels.push(other_label);
    }
    let labels = LabelSet::new(labels);

    let mapping = source
        .labels()
        .iter()
        .enumerate()
        .map(|(i, l)| {
            let out = if kept[i] { l } else { other_label };
            labels.position(out)
        })
        .collect();

    Ok((labels, mapping))
}

fn group(
    source: &CategoricalColumn,
    groups: &IndexMap<String, Vec<String>>,
    default: Option<&str>,
    target: &str,
) -> Result<Mapping> {
    let mut assigned: HashMap<&str, &str> = HashMap::new();

    for (group_label, members) in groups {
        if members.is_empty() {
            return Err(WavebookError::config(
                target,
                format!("group '{}' has no source labels", group_label),
            ));
        }
        for member in members {
            if !source.labels().contains(member) {
                return Err(WavebookError::config(
                    target,
                    format!(
                        "group '{}' references unknown label '{}' (have {:?})",
                        group_label,
                        member,
                        source.labels().to_vec()
                    ),
                ));
            }
            if let Some(previous) = assigned.insert(member.as_str(), group_label.as_str()) {
                return Err(WavebookError::config(
                    target,
                    format!(
                        "label '{}' is in both '{}' and '{}'",
                        member, previous, group_label
                    ),
                ));
            }
        }
    }

    let mut labels: Vec<&str> = groups.keys().map(String::as_str).collect();
    let unassigned = source.labels().iter().any(|l| !assigned.contains_key(l));
    if let Some(default) = default.filter(|_| unassigned) {
        labels.push(default);
    }
    let labels = LabelSet::new(labels);

    let mapping = source
        .labels()
        .iter()
        .map(|l| match assigned.get(l) {
            Some(group_label) => labels.position(group_label),
            None => default.and_then(|d| labels.position(d)),
        })
        .collect();

    Ok((labels, mapping))
}
