//! Weighted tabulation.

use tracing::debug;

use crate::dataset::{CategoricalColumn, Dataset};
use crate::error::{Result, WavebookError};

use super::result::TabulationResult;
use super::spec::{CrossTabSpec, ValueTransform};

/// Tabulate a dataset according to `spec`.
///
/// Each row adds its weight to the cell its label(s) index. Rows missing a
/// value in any referenced categorical column are excluded rather than
/// counted in a separate cell.
pub fn tabulate(dataset: &Dataset, spec: &CrossTabSpec) -> Result<TabulationResult> {
    let fail = |message: String| WavebookError::Aggregation {
        spec: spec.to_string(),
        message,
    };

    let rows = categorical(dataset, &spec.row).map_err(&fail)?;
    let columns = match spec.column {
        Some(ref name) => Some(categorical(dataset, name).map_err(&fail)?),
        None => None,
    };

    if columns.is_none()
        && matches!(
            spec.transform,
            ValueTransform::RowProportion | ValueTransform::ColumnProportion
        )
    {
        return Err(fail(format!(
            "{} needs a column variable",
            spec.transform.label()
        )));
    }

    let weights = weights(dataset, spec).map_err(&fail)?;

    let width = columns.map(|c| c.labels().len()).unwrap_or(1);
    let mut weighted = vec![0.0f64; rows.labels().len() * width];
    let mut included = 0;
    let mut excluded = 0;

    for (row, weight) in weights.iter().enumerate() {
        let r = rows.codes()[row];
        let c = match columns {
            Some(col) => col.codes()[row],
            None => Some(0),
        };
        match (r, c, weight) {
            (Some(r), Some(c), Some(w)) => {
                weighted[r * width + c] += w;
                included += 1;
            }
            _ => excluded += 1,
        }
    }

    debug!(
        spec = %spec,
        included,
        excluded,
        cells = weighted.len(),
        "tabulated"
    );

    Ok(TabulationResult::from_weighted(
        spec.clone(),
        rows.labels().to_vec(),
        columns.map(|c| c.labels().to_vec()).unwrap_or_default(),
        weighted,
        included,
        excluded,
    ))
}

fn categorical<'a>(
    dataset: &'a Dataset,
    name: &str,
) -> std::result::Result<&'a CategoricalColumn, String> {
    let column = dataset
        .column(name)
        .ok_or_else(|| format!("column '{}' not found", name))?;
    column
        .as_categorical()
        .ok_or_else(|| format!("column '{}' is not categorical", name))
}

/// Per-row weights; `None` marks a row with no usable weight.
fn weights(dataset: &Dataset, spec: &CrossTabSpec) -> std::result::Result<Vec<Option<f64>>, String> {
    let Some(ref name) = spec.weight else {
        return Ok(dataset.weights().into_iter().map(Some).collect());
    };

    let values = dataset
        .column(name)
        .ok_or_else(|| format!("weight column '{}' not found", name))?
        .as_numeric()
        .ok_or_else(|| format!("weight column '{}' is not numeric", name))?;

    values
        .iter()
        .enumerate()
        .map(|(row, v)| match v {
            Some(w) if w.is_finite() && *w >= 0.0 => Ok(Some(*w)),
            Some(w) => Err(format!("invalid weight {} at row {}", w, row)),
            None => Ok(None),
        })
        .collect()
}
