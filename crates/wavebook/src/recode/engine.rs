//! Recoding engine: applies compiled rules and derived variables to a dataset.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dataset::{CategoricalColumn, Column, ColumnKind, Dataset};
use crate::error::{Result, WavebookError};

use super::derive::DerivedVariable;
use super::rules::{CompiledRule, CompiledTarget, RecodingRule};

/// Summary of what a recode pass changed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecodeReport {
    /// Number of rule applications (one per rule per matched column).
    pub rules_applied: usize,
    /// Number of distinct columns whose labels changed.
    pub columns_changed: usize,
    /// Derived columns appended to the dataset.
    pub columns_added: Vec<String>,
    /// Per-column changes.
    pub changes: Vec<LabelChange>,
}

/// Label-level change to one column made by one rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelChange {
    /// Rule identifier.
    pub rule: String,
    /// Column affected.
    pub column: String,
    /// Labels before the rule.
    pub before: Vec<String>,
    /// Labels after the rule.
    pub after: Vec<String>,
    /// Rows whose label text changed.
    pub values_changed: usize,
}

impl RecodeReport {
    fn add_change(&mut self, change: LabelChange) {
        if !self.changes.iter().any(|c| c.column == change.column) {
            self.columns_changed += 1;
        }
        self.changes.push(change);
    }
}

/// Upper bound on passes over the rule list.
const MAX_RULE_PASSES: usize = 8;

/// Applies an ordered rule list, then derived variables.
#[derive(Debug, Clone)]
pub struct Recoder {
    rules: Vec<CompiledRule>,
    derived: Vec<DerivedVariable>,
}

impl Recoder {
    /// Compile rules up front so configuration errors surface before any data
    /// is touched.
    pub fn compile(rules: &[RecodingRule], derived: Vec<DerivedVariable>) -> Result<Self> {
        let mut rules = rules
            .iter()
            .map(RecodingRule::compile)
            .collect::<Result<Vec<_>>>()?;

        // Canonical labels of any rule are off limits to every other rule.
        let protected: HashSet<String> = rules
            .iter()
            .flat_map(|r| r.protected.iter().cloned())
            .collect();
        for rule in &mut rules {
            rule.protected = protected.clone();
        }

        let mut targets: Vec<&str> = Vec::new();
        for d in &derived {
            if targets.contains(&d.target()) {
                return Err(WavebookError::config(
                    d.target(),
                    "derived column is defined twice",
                ));
            }
            targets.push(d.target());
        }

        Ok(Self { rules, derived })
    }

    /// Number of compiled rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Recode a dataset, returning the new dataset and a report.
    ///
    /// Rules run in list order; each sees the output of the previous one.
    /// The whole sequence repeats until a pass changes nothing, so recoding
    /// the result again is a no-op. Derived variables run afterwards, in
    /// list order, so a derived column may read an earlier derived column.
    pub fn recode(&self, mut dataset: Dataset) -> Result<(Dataset, RecodeReport)> {
        let mut report = RecodeReport::default();

        let mut settled = self.rules.is_empty();
        for pass in 0..MAX_RULE_PASSES {
            if settled {
                break;
            }
            settled = !self.pass(&mut dataset, &mut report, pass == 0)?;
        }
        if !settled {
            return Err(WavebookError::config(
                "recode",
                format!(
                    "rules still changing labels after {} passes over the rule list",
                    MAX_RULE_PASSES
                ),
            ));
        }

        for derived in &self.derived {
            let column = derived.derive(&dataset)?;
            debug!(
                source = derived.source(),
                target = derived.target(),
                "derived column"
            );
            report.columns_added.push(column.name.clone());
            dataset.push_column(column)?;
        }

        Ok((dataset, report))
    }

    /// Apply every rule once. Returns whether any column changed.
    fn pass(&self, dataset: &mut Dataset, report: &mut RecodeReport, first: bool) -> Result<bool> {
        let mut changed = false;

        for rule in &self.rules {
            for name in self.resolve(rule, dataset, first)? {
                let Some(before) = dataset.categorical(&name) else {
                    continue;
                };
                let relabel = rule.apply(before.labels())?;
                let after = before.relabeled(&relabel);
                if first {
                    report.rules_applied += 1;
                }

                if after.codes() == before.codes() && after.labels().iter().eq(before.labels().iter()) {
                    continue;
                }

                let values_changed = (0..before.len())
                    .filter(|&row| before.value(row) != after.value(row))
                    .count();
                debug!(
                    rule = %rule.id,
                    column = %name,
                    before = before.labels().len(),
                    after = after.labels().len(),
                    values_changed,
                    "recoded column"
                );

                report.add_change(LabelChange {
                    rule: rule.id.clone(),
                    column: name.clone(),
                    before: before.labels().to_vec(),
                    after: after.labels().to_vec(),
                    values_changed,
                });
                dataset.replace_column(Column::categorical(name, after))?;
                changed = true;
            }
        }

        Ok(changed)
    }

    /// Names of the categorical columns a rule applies to.
    fn resolve(&self, rule: &CompiledRule, dataset: &Dataset, warn_empty: bool) -> Result<Vec<String>> {
        match &rule.target {
            CompiledTarget::Column(name) => {
                let column = dataset
                    .column(name)
                    .ok_or_else(|| WavebookError::MissingColumn {
                        column: name.clone(),
                        context: format!("target of rule '{}'", rule.id),
                    })?;
                if column.kind() != ColumnKind::Categorical {
                    return Err(WavebookError::config(
                        rule.id.clone(),
                        format!("column '{}' is not categorical", name),
                    ));
                }
                Ok(vec![name.clone()])
            }
            CompiledTarget::Pattern(regex) => {
                let names: Vec<String> = dataset
                    .columns_of_kind(ColumnKind::Categorical)
                    .filter(|c| regex.is_match(&c.name))
                    .map(|c| c.name.clone())
                    .collect();
                if names.is_empty() && warn_empty {
                    warn!(rule = %rule.id, pattern = regex.as_str(), "rule matched no columns");
                }
                Ok(names)
            }
        }
    }
}

/// Recode a single column in isolation.
pub fn recode_column(rule: &RecodingRule, column: &CategoricalColumn) -> Result<CategoricalColumn> {
    let compiled = rule.compile()?;
    let relabel = compiled.apply(column.labels())?;
    Ok(column.relabeled(&relabel))
}
