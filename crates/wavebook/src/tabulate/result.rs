//! Dense tabulation results.

use serde::{Deserialize, Serialize};

use super::spec::{CrossTabSpec, ValueTransform};

/// A dense one- or two-way table.
///
/// Rows and columns follow the declared label order of their variables.
/// Cells are stored row-major. A one-way table has no column labels and a
/// width of one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabulationResult {
    /// The cross-tab that produced this table.
    pub spec: CrossTabSpec,
    /// Row labels in declared order.
    pub row_labels: Vec<String>,
    /// Column labels in declared order; empty for a one-way table.
    pub column_labels: Vec<String>,
    /// Transformed cell values, row-major.
    cells: Vec<f64>,
    /// Raw weighted sums, row-major.
    weighted: Vec<f64>,
    /// Sum of all included weights.
    pub total_weight: f64,
    /// Rows that contributed.
    pub included_rows: usize,
    /// Rows dropped for a missing value.
    pub excluded_rows: usize,
}

impl TabulationResult {
    /// Build a result from raw weighted sums, applying the requested transform.
    pub(crate) fn from_weighted(
        spec: CrossTabSpec,
        row_labels: Vec<String>,
        column_labels: Vec<String>,
        weighted: Vec<f64>,
        included_rows: usize,
        excluded_rows: usize,
    ) -> Self {
        let width = column_labels.len().max(1);
        let total_weight: f64 = weighted.iter().sum();

        let cells = match spec.transform {
            ValueTransform::Count => weighted.clone(),
            ValueTransform::Proportion => weighted.iter().map(|w| share(*w, total_weight)).collect(),
            ValueTransform::RowProportion => {
                let totals: Vec<f64> = weighted.chunks(width).map(|r| r.iter().sum()).collect();
                weighted
                    .iter()
                    .enumerate()
                    .map(|(i, w)| share(*w, totals[i / width]))
                    .collect()
            }
            ValueTransform::ColumnProportion => {
                let mut totals = vec![0.0; width];
                for (i, w) in weighted.iter().enumerate() {
                    totals[i % width] += w;
                }
                weighted
                    .iter()
                    .enumerate()
                    .map(|(i, w)| share(*w, totals[i % width]))
                    .collect()
            }
        };

        Self {
            spec,
            row_labels,
            column_labels,
            cells,
            weighted,
            total_weight,
            included_rows,
            excluded_rows,
        }
    }

    /// Whether the table has a column variable.
    pub fn is_two_way(&self) -> bool {
        !self.column_labels.is_empty()
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.row_labels.len()
    }

    /// Number of value columns (1 for a one-way table).
    pub fn width(&self) -> usize {
        self.column_labels.len().max(1)
    }

    /// Cell value at a row and column position.
    pub fn get(&self, row: usize, column: usize) -> Option<f64> {
        if row >= self.height() || column >= self.width() {
            return None;
        }
        self.cells.get(row * self.width() + column).copied()
    }

    /// Cell value by label. Pass `None` as the column for a one-way table.
    pub fn value(&self, row: &str, column: Option<&str>) -> Option<f64> {
        let r = self.row_labels.iter().position(|l| l == row)?;
        let c = match column {
            Some(label) => self.column_labels.iter().position(|l| l == label)?,
            None if self.is_two_way() => return None,
            None => 0,
        };
        self.get(r, c)
    }

    /// Cell values of one row.
    pub fn row(&self, row: usize) -> &[f64] {
        let width = self.width();
        self.cells
            .get(row * width..(row + 1) * width)
            .unwrap_or(&[])
    }

    /// Sum of cell values per row.
    pub fn row_totals(&self) -> Vec<f64> {
        self.cells.chunks(self.width()).map(|r| r.iter().sum()).collect()
    }

    /// Sum of cell values per column.
    pub fn column_totals(&self) -> Vec<f64> {
        let width = self.width();
        let mut totals = vec![0.0; width];
        for (i, v) in self.cells.iter().enumerate() {
            totals[i % width] += v;
        }
        totals
    }

    /// Sum of all cell values.
    pub fn sum(&self) -> f64 {
        self.cells.iter().sum()
    }

    /// Format a cell for display. Rounding happens only here.
    pub fn format_cell(&self, row: usize, column: usize, decimals: usize) -> String {
        match self.get(row, column) {
            Some(v) => format_value(v, self.spec.transform, decimals),
            None => String::new(),
        }
    }
}

/// Format a value as a percentage or a weighted count.
pub fn format_value(value: f64, transform: ValueTransform, decimals: usize) -> String {
    if transform.is_proportion() {
        format!("{:.*}%", decimals, value * 100.0)
    } else {
        format!("{:.*}", decimals, value)
    }
}

/// `part / whole`, or zero for an empty denominator.
fn share(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_two(transform: ValueTransform) -> TabulationResult {
        TabulationResult::from_weighted(
            CrossTabSpec::two_way("q", "sex").with_transform(transform),
            vec!["Yes".into(), "No".into()],
            vec!["Male".into(), "Female".into()],
            vec![30.0, 10.0, 20.0, 40.0],
            100,
            0,
        )
    }

    #[test]
    fn test_proportion_of_total() {
        let t = two_by_two(ValueTransform::Proportion);
        assert!((t.sum() - 1.0).abs() < 1e-12);
        assert_eq!(t.value("Yes", Some("Male")), Some(0.3));
        let totals = t.row_totals();
        assert!((totals[0] - 0.4).abs() < 1e-12);
        assert!((totals[1] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_row_and_column_proportions() {
        let rows = two_by_two(ValueTransform::RowProportion);
        assert_eq!(rows.row(0), &[0.75, 0.25]);
        for total in rows.row_totals() {
            assert!((total - 1.0).abs() < 1e-12);
        }

        let cols = two_by_two(ValueTransform::ColumnProportion);
        assert_eq!(cols.get(0, 0), Some(0.6));
        assert_eq!(cols.get(1, 1), Some(0.8));
    }

    #[test]
    fn test_counts_and_formatting() {
        let t = two_by_two(ValueTransform::Count);
        assert_eq!(t.column_totals(), vec![50.0, 50.0]);
        assert_eq!(t.format_cell(0, 0, 1), "30.0");

        let p = two_by_two(ValueTransform::Proportion);
        assert_eq!(p.format_cell(0, 1, 0), "10%");
        assert_eq!(p.format_cell(9, 9, 0), "");
    }

    #[test]
    fn test_one_way_lookup() {
        let t = TabulationResult::from_weighted(
            CrossTabSpec::one_way("q"),
            vec!["a".into(), "b".into()],
            Vec::new(),
            vec![0.0, 0.0],
            0,
            3,
        );
        assert!(!t.is_two_way());
        assert_eq!(t.width(), 1);
        assert_eq!(t.value("a", None), Some(0.0));
        assert_eq!(t.value("a", Some("x")), None);
    }
}
