//! Property-based tests for recoding and tabulation.
//!
//! # Running Property Tests
//!
//! ```bash
//! cargo test -p wavebook --test property_tests
//!
//! # More cases
//! PROPTEST_CASES=10000 cargo test -p wavebook --test property_tests
//! ```

use proptest::prelude::*;

use wavebook::dataset::{CategoricalColumn, Column};
use wavebook::{tabulate, CrossTabSpec, Dataset, Recoder, RecodingRule, ValueTransform};

// =============================================================================
// Test Strategies
// =============================================================================

/// Labels as they show up in real waves: stray punctuation, case drift,
/// volunteered markers, and free-form noise.
fn messy_label() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Approve".to_string()),
        Just("approve ".to_string()),
        Just("Disapprove".to_string()),
        Just("Dont know/Refused (VOL.)".to_string()),
        Just("Don't know".to_string()),
        Just("Refused".to_string()),
        Just("Other (VOL.)".to_string()),
        Just("Dem".to_string()),
        Just("Democrat".to_string()),
        Just("Lean Dem".to_string()),
        "[A-Za-z .,()/'-]{0,20}",
    ]
}

fn messy_column(max_rows: usize) -> impl Strategy<Value = Vec<Option<String>>> {
    prop::collection::vec(prop::option::weighted(0.9, messy_label()), 1..max_rows)
}

fn dataset_of(columns: &[(&str, &[Option<String>])]) -> Dataset {
    let rows = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
    let mut ds = Dataset::new(rows);
    for (name, values) in columns {
        let (column, _) = CategoricalColumn::from_values(values.iter().map(|v| v.as_deref()), None);
        ds.push_column(Column::categorical(*name, column)).unwrap();
    }
    ds
}

/// Rules as templates write them: a template-wide clean-up next to
/// per-column collapses, replacements, and renames.
fn rule_pool() -> Vec<RecodingRule> {
    vec![
        RecodingRule::for_pattern("normalize_all", ".*"),
        RecodingRule::for_pattern("volunteered", ".*").with_volunteered("VOL", '*'),
        RecodingRule::for_column("approval", "approve")
            .with_collapse("^(dont know|refused)", "Don't know"),
        RecodingRule::for_column("party", "party")
            .with_replacement("Dem", "Democrat")
            .with_collapse("^lean", "Leaner"),
        RecodingRule::for_column("open", "open").with_rename(0, "First mention"),
    ]
}

/// Any subset of the pool, in any order.
fn rule_sequence() -> impl Strategy<Value = Vec<RecodingRule>> {
    let pool = rule_pool();
    let len = pool.len();
    prop::sample::subsequence(pool, 0..=len).prop_shuffle()
}

fn codes_strategy(labels: usize, rows: usize) -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0..labels, rows)
}

fn coded_dataset(name: &str, labels: &[&str], codes: &[usize], rows: usize) -> Dataset {
    let mut ds = Dataset::new(rows);
    push_coded(&mut ds, name, labels, codes);
    ds
}

fn push_coded(ds: &mut Dataset, name: &str, labels: &[&str], codes: &[usize]) {
    let values = codes.iter().map(|&c| Some(labels[c]));
    let (column, _) = CategoricalColumn::from_values(
        values,
        Some(&labels.iter().map(|l| l.to_string()).collect::<Vec<_>>()),
    );
    ds.push_column(Column::categorical(name, column)).unwrap();
}

// =============================================================================
// Recoding Properties
// =============================================================================

proptest! {
    /// Recoding an already recoded dataset changes nothing, whatever the
    /// rule order.
    #[test]
    fn recoding_is_idempotent(
        rules in rule_sequence(),
        approve in messy_column(60),
        party in messy_column(60),
        open in messy_column(60),
    ) {
        let rows = approve.len().min(party.len()).min(open.len());
        // An all-missing column has no position 0 to rename.
        prop_assume!(open[..rows].iter().any(Option::is_some));
        let ds = dataset_of(&[
            ("approve", &approve[..rows]),
            ("party", &party[..rows]),
            ("open", &open[..rows]),
        ]);

        let recoder = Recoder::compile(&rules, Vec::new()).unwrap();
        let (once, _) = recoder.recode(ds).unwrap();
        let (twice, report) = recoder.recode(once.clone()).unwrap();

        prop_assert_eq!(&twice, &once);
        prop_assert_eq!(report.columns_changed, 0);
    }

    /// A template-wide normalize never undoes a per-column collapse.
    #[test]
    fn canonical_labels_survive_template_wide_rules(
        normalize_first in any::<bool>(),
        approve in messy_column(60),
    ) {
        let normalize = RecodingRule::for_pattern("normalize_all", ".*");
        let collapse = RecodingRule::for_column("approval", "approve")
            .with_collapse("^(dont know|refused)", "Don't know");
        let rules = if normalize_first {
            vec![normalize, collapse]
        } else {
            vec![collapse, normalize]
        };

        let recoder = Recoder::compile(&rules, Vec::new()).unwrap();
        let (once, _) = recoder.recode(dataset_of(&[("approve", &approve[..])])).unwrap();
        let (twice, _) = recoder.recode(once.clone()).unwrap();
        prop_assert_eq!(&twice, &once);

        let labels = once.categorical("approve").unwrap().labels().to_vec();
        prop_assert!(!labels.iter().any(|l| l == "Dont know"));
        let had_dk = approve.iter().flatten().any(|v| {
            let v = v.to_lowercase();
            v.trim_start().starts_with("refused") || v.trim_start().starts_with("dont know")
                || v.trim_start().starts_with("don't know")
        });
        if had_dk {
            prop_assert!(labels.iter().any(|l| l == "Don't know"));
        }
    }

    /// Every label left after recoding is still used by at least one row.
    #[test]
    fn recoding_introduces_no_orphan_labels(approve in messy_column(80)) {
        let ds = dataset_of(&[("approve", &approve[..])]);
        let recoder = Recoder::compile(&rule_pool()[..3], Vec::new()).unwrap();
        let (recoded, _) = recoder.recode(ds).unwrap();

        let column = recoded.categorical("approve").unwrap();
        for (label, count) in column.counts() {
            prop_assert!(count > 0, "label '{}' has no rows", label);
        }
    }

    /// The number of distinct labels never grows.
    #[test]
    fn recoding_never_adds_labels(approve in messy_column(80)) {
        let ds = dataset_of(&[("approve", &approve[..])]);
        let before = ds.categorical("approve").unwrap().labels().len();
        let recoder = Recoder::compile(&rule_pool()[..3], Vec::new()).unwrap();
        let (recoded, _) = recoder.recode(ds).unwrap();

        prop_assert!(recoded.categorical("approve").unwrap().labels().len() <= before);
    }
}

// =============================================================================
// Tabulation Properties
// =============================================================================

const IDEO: [&str; 5] = [
    "Very conservative",
    "Conservative",
    "Moderate",
    "Liberal",
    "Very liberal",
];
const SEX: [&str; 2] = ["Male", "Female"];

proptest! {
    /// Proportions of the grand total sum to one when nothing is excluded.
    #[test]
    fn proportions_sum_to_one(
        (ideo, sex, weights) in (1usize..300).prop_flat_map(|rows| (
            codes_strategy(IDEO.len(), rows),
            codes_strategy(SEX.len(), rows),
            prop::collection::vec(0.01f64..10.0, rows),
        ))
    ) {
        let rows = ideo.len();
        let mut ds = coded_dataset("ideo", &IDEO, &ideo, rows);
        push_coded(&mut ds, "sex", &SEX, &sex);
        ds.push_column(Column::numeric("weight", weights.into_iter().map(Some).collect())).unwrap();
        ds.set_weight_column("weight").unwrap();

        let one_way = tabulate(&ds, &CrossTabSpec::one_way("ideo")).unwrap();
        prop_assert_eq!(one_way.excluded_rows, 0);
        prop_assert!((one_way.sum() - 1.0).abs() < 1e-9);

        let two_way = tabulate(&ds, &CrossTabSpec::two_way("ideo", "sex")).unwrap();
        prop_assert!((two_way.sum() - 1.0).abs() < 1e-9);

        let by_sex = tabulate(
            &ds,
            &CrossTabSpec::two_way("ideo", "sex").with_transform(ValueTransform::ColumnProportion),
        ).unwrap();
        for (i, total) in by_sex.column_totals().iter().enumerate() {
            if sex.contains(&i) {
                prop_assert!((total - 1.0).abs() < 1e-9);
            }
        }
    }

    /// Tables follow declared label order regardless of data order.
    #[test]
    fn tables_follow_declared_order(ideo in codes_strategy(IDEO.len(), 50)) {
        let ds = coded_dataset("ideo", &IDEO, &ideo, 50);
        let result = tabulate(&ds, &CrossTabSpec::one_way("ideo")).unwrap();
        prop_assert_eq!(result.row_labels, IDEO.to_vec());
    }
}

/// With every weight 1.0, the weighted shares are the unweighted counts
/// divided by the number of rows.
#[test]
fn unit_weights_match_unweighted_counts() {
    const ROWS: usize = 1000;
    let ideo: Vec<usize> = (0..ROWS).map(|i| (i * 7 + i / 13) % IDEO.len()).collect();
    let sex: Vec<usize> = (0..ROWS).map(|i| (i / 3) % SEX.len()).collect();

    let mut unweighted = coded_dataset("ideo", &IDEO, &ideo, ROWS);
    push_coded(&mut unweighted, "sex", &SEX, &sex);

    let mut weighted = unweighted.clone();
    weighted
        .push_column(Column::numeric("weight", vec![Some(1.0); ROWS]))
        .unwrap();
    weighted.set_weight_column("weight").unwrap();

    let counts = tabulate(
        &unweighted,
        &CrossTabSpec::two_way("ideo", "sex").with_transform(ValueTransform::Count),
    )
    .unwrap();
    let shares = tabulate(&weighted, &CrossTabSpec::two_way("ideo", "sex")).unwrap();

    assert_eq!(shares.height(), 5);
    assert_eq!(shares.width(), 2);
    for r in 0..shares.height() {
        for c in 0..shares.width() {
            let expected = counts.get(r, c).unwrap() / ROWS as f64;
            assert!((shares.get(r, c).unwrap() - expected).abs() < 1e-12);
        }
    }
}
