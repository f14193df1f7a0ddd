//! Declarative recoding rules and the pure label-set steps they compile to.

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::dataset::{LabelSet, Relabel};
use crate::error::{Result, WavebookError};

/// Which columns a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleTarget {
    /// One named column; it must exist.
    Column(String),
    /// Every categorical column whose name matches the regex.
    Pattern(String),
}

/// Literal substring replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    pub from: String,
    pub to: String,
}

/// Marks volunteered (unprompted) responses.
///
/// A label containing `marker` loses the marker and gains a trailing `tag`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolunteeredTag {
    #[serde(default = "default_marker")]
    pub marker: String,
    #[serde(default = "default_tag")]
    pub tag: char,
}

fn default_marker() -> String {
    "VOL".to_string()
}

fn default_tag() -> char {
    '*'
}

impl Default for VolunteeredTag {
    fn default() -> Self {
        Self {
            marker: default_marker(),
            tag: default_tag(),
        }
    }
}

/// Any label matching `pattern` (case-insensitive) becomes `label`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collapse {
    pub pattern: String,
    pub label: String,
}

/// Rename the label at a 0-based position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionalRename {
    pub position: usize,
    pub label: String,
}

/// A recoding rule as written in a template.
///
/// Sub-operations always run in this order: normalize, replacements,
/// volunteered tagging, collapses, positional renames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecodingRule {
    /// Identifier used in error messages and reports.
    pub id: String,
    /// Target column(s).
    pub target: RuleTarget,
    /// Strip every character that is not alphanumeric or a space.
    #[serde(default = "default_true")]
    pub normalize: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replacements: Vec<Replacement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volunteered: Option<VolunteeredTag>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collapse: Vec<Collapse>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub renames: Vec<PositionalRename>,
}

fn default_true() -> bool {
    true
}

impl RecodingRule {
    /// A rule that only normalizes the named column.
    pub fn for_column(id: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            target: RuleTarget::Column(column.into()),
            normalize: true,
            replacements: Vec::new(),
            volunteered: None,
            collapse: Vec::new(),
            renames: Vec::new(),
        }
    }

    /// A rule that normalizes every column matching a name pattern.
    pub fn for_pattern(id: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            target: RuleTarget::Pattern(pattern.into()),
            ..Self::for_column(id, String::new())
        }
    }

    /// Toggle text normalization.
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Add a substring replacement.
    pub fn with_replacement(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.replacements.push(Replacement {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    /// Tag volunteered responses.
    pub fn with_volunteered(mut self, marker: impl Into<String>, tag: char) -> Self {
        self.volunteered = Some(VolunteeredTag {
            marker: marker.into(),
            tag,
        });
        self
    }

    /// Collapse labels matching a pattern into a canonical label.
    pub fn with_collapse(mut self, pattern: impl Into<String>, label: impl Into<String>) -> Self {
        self.collapse.push(Collapse {
            pattern: pattern.into(),
            label: label.into(),
        });
        self
    }

    /// Rename the label at a position.
    pub fn with_rename(mut self, position: usize, label: impl Into<String>) -> Self {
        self.renames.push(PositionalRename {
            position,
            label: label.into(),
        });
        self
    }

    /// Validate the rule and compile it into ordered steps.
    ///
    /// Rejects rules that would keep changing labels when re-applied.
    pub fn compile(&self) -> Result<CompiledRule> {
        let fail = |message: String| WavebookError::config(self.id.clone(), message);

        let target = match &self.target {
            RuleTarget::Column(name) if name.is_empty() => {
                return Err(fail("empty target column".to_string()));
            }
            RuleTarget::Column(name) => CompiledTarget::Column(name.clone()),
            RuleTarget::Pattern(pattern) => CompiledTarget::Pattern(Regex::new(pattern)?),
        };

        let mut keep = Vec::new();
        if let Some(ref vol) = self.volunteered {
            if vol.marker.trim().is_empty() {
                return Err(fail("volunteered marker is empty".to_string()));
            }
            if self.normalize && !vol.marker.chars().all(is_plain) {
                return Err(fail(format!(
                    "volunteered marker '{}' would be stripped by normalization",
                    vol.marker
                )));
            }
            if is_plain(vol.tag) {
                return Err(fail(format!(
                    "volunteered tag '{}' must not be alphanumeric or a space",
                    vol.tag
                )));
            }
            keep.push(vol.tag);
        }

        for (i, rep) in self.replacements.iter().enumerate() {
            if rep.from.is_empty() {
                return Err(fail("replacement with empty 'from'".to_string()));
            }
            let clash = self
                .replacements
                .iter()
                .enumerate()
                .find(|(j, r)| *j != i && rep.to.contains(&r.from));
            if let Some((_, other)) = clash {
                return Err(fail(format!(
                    "replacement output '{}' contains replacement input '{}'",
                    rep.to, other.from
                )));
            }
            if self.normalize && !rep.to.chars().all(|c| is_plain(c) || keep.contains(&c)) {
                return Err(fail(format!(
                    "replacement output '{}' would be changed by normalization",
                    rep.to
                )));
            }
        }

        let mut protected = HashSet::new();
        let mut steps = Vec::new();

        if self.normalize {
            steps.push(RecodeStep::Normalize { keep: keep.clone() });
        }
        for rep in &self.replacements {
            steps.push(RecodeStep::Replace {
                from: rep.from.clone(),
                to: rep.to.clone(),
            });
        }
        if let Some(ref vol) = self.volunteered {
            steps.push(RecodeStep::TagVolunteered {
                marker: vol.marker.clone(),
                tag: vol.tag,
            });
        }
        for collapse in &self.collapse {
            if collapse.label.trim().is_empty() {
                return Err(fail(format!("collapse '{}' has an empty label", collapse.pattern)));
            }
            let pattern = RegexBuilder::new(&collapse.pattern)
                .case_insensitive(true)
                .build()?;
            let recaptured = steps.iter().find_map(|step| match step {
                RecodeStep::Collapse { pattern, label } if pattern.is_match(&collapse.label) => {
                    Some(label)
                }
                _ => None,
            });
            if let Some(earlier) = recaptured {
                return Err(fail(format!(
                    "collapse label '{}' is matched by the earlier collapse into '{}'",
                    collapse.label, earlier
                )));
            }
            protected.insert(collapse.label.clone());
            steps.push(RecodeStep::Collapse {
                pattern,
                label: collapse.label.clone(),
            });
        }
        for rename in &self.renames {
            if rename.label.trim().is_empty() {
                return Err(fail(format!("rename at position {} has an empty label", rename.position)));
            }
            protected.insert(rename.label.clone());
            steps.push(RecodeStep::RenamePosition {
                position: rename.position,
                label: rename.label.clone(),
            });
        }

        Ok(CompiledRule {
            id: self.id.clone(),
            target,
            steps,
            protected,
        })
    }
}

/// Upper bound on repetitions of a rule's text steps.
const MAX_TEXT_ROUNDS: usize = 8;

/// Alphanumeric or a plain space: what normalization keeps.
fn is_plain(c: char) -> bool {
    c.is_alphanumeric() || c == ' '
}

/// Collapse runs of whitespace into single spaces and trim.
pub(crate) fn squeeze(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove everything except alphanumerics, spaces, and `keep`.
pub fn normalize_label(label: &str, keep: &[char]) -> String {
    let filtered: String = label
        .chars()
        .filter(|c| is_plain(*c) || keep.contains(c))
        .collect();
    squeeze(&filtered)
}

/// Relabel every unprotected label through `f`.
fn map_text<F>(labels: &LabelSet, protected: &HashSet<String>, f: F) -> Relabel
where
    F: Fn(&str) -> String,
{
    labels.relabel(|_, l| {
        if protected.contains(l) {
            l.to_string()
        } else {
            f(l)
        }
    })
}

/// Substring replacement that is stable under re-application.
///
/// When `to` contains `from` ("Dem" → "Democrat"), labels already holding
/// `to` are left alone. Otherwise replacement repeats until `from` is gone.
fn replace_stable(label: &str, from: &str, to: &str) -> String {
    if to.contains(from) {
        if label.contains(to) {
            return label.to_string();
        }
        return squeeze(&label.replace(from, to));
    }

    let mut out = label.to_string();
    for _ in 0..=label.len() {
        if !out.contains(from) {
            break;
        }
        out = squeeze(&out.replace(from, to));
    }
    out
}

/// Resolved rule target.
#[derive(Debug, Clone)]
pub enum CompiledTarget {
    Column(String),
    Pattern(Regex),
}

/// One pure transformation of a label set.
#[derive(Debug, Clone)]
pub enum RecodeStep {
    /// Strip punctuation, squeeze whitespace.
    Normalize { keep: Vec<char> },
    /// Literal substring replacement.
    Replace { from: String, to: String },
    /// Strip the volunteered marker and append the tag.
    TagVolunteered { marker: String, tag: char },
    /// Map every matching label onto one canonical label.
    Collapse { pattern: Regex, label: String },
    /// Rename the label at a fixed position.
    RenamePosition { position: usize, label: String },
}

impl RecodeStep {
    /// Whether the step rewrites label text rather than mapping whole labels.
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            RecodeStep::Normalize { .. } | RecodeStep::Replace { .. } | RecodeStep::TagVolunteered { .. }
        )
    }

    /// Human-readable description.
    pub fn description(&self) -> String {
        match self {
            RecodeStep::Normalize { .. } => "normalize label text".to_string(),
            RecodeStep::Replace { from, to } => format!("replace '{}' → '{}'", from, to),
            RecodeStep::TagVolunteered { marker, tag } => {
                format!("tag '{}' responses with '{}'", marker, tag)
            }
            RecodeStep::Collapse { pattern, label } => {
                format!("collapse /{}/ → '{}'", pattern.as_str(), label)
            }
            RecodeStep::RenamePosition { position, label } => {
                format!("rename position {} → '{}'", position, label)
            }
        }
    }

    /// Apply the step, returning a new label set and the index mapping.
    ///
    /// Labels in `protected` (canonical collapse and rename outputs) pass
    /// through the text steps untouched.
    pub fn apply(&self, labels: &LabelSet, protected: &HashSet<String>) -> Result<Relabel> {
        match self {
            RecodeStep::Normalize { keep } => {
                Ok(map_text(labels, protected, |l| normalize_label(l, keep)))
            }
            RecodeStep::Replace { from, to } => {
                Ok(map_text(labels, protected, |l| replace_stable(l, from, to)))
            }
            RecodeStep::TagVolunteered { marker, tag } => Ok(map_text(labels, protected, |l| {
                if !l.contains(marker.as_str()) {
                    return l.to_string();
                }
                let mut tagged = squeeze(&l.replace(marker.as_str(), ""));
                if !tagged.ends_with(*tag) {
                    tagged.push(*tag);
                }
                tagged
            })),
            RecodeStep::Collapse { pattern, label } => Ok(map_text(labels, protected, |l| {
                if pattern.is_match(l) {
                    label.clone()
                } else {
                    l.to_string()
                }
            })),
            RecodeStep::RenamePosition { position, label } => {
                let current = labels.get(*position).ok_or_else(|| {
                    WavebookError::config(
                        format!("rename position {}", position),
                        format!(
                            "label set has {} label(s): {:?}",
                            labels.len(),
                            labels.to_vec()
                        ),
                    )
                })?;
                if current != label {
                    if let Some(existing) = labels.position(label) {
                        return Err(WavebookError::config(
                            format!("rename position {}", position),
                            format!("label '{}' already exists at position {}", label, existing),
                        ));
                    }
                }
                Ok(labels.relabel(|i, l| {
                    if i == *position {
                        label.clone()
                    } else {
                        l.to_string()
                    }
                }))
            }
        }
    }
}

/// A validated rule ready to run.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    /// Rule identifier.
    pub id: String,
    /// Resolved target.
    pub target: CompiledTarget,
    /// Steps in execution order.
    pub steps: Vec<RecodeStep>,
    /// Labels that text steps leave alone.
    pub protected: HashSet<String>,
}

impl CompiledRule {
    /// Run every step over a label set.
    ///
    /// Text steps repeat until no label changes, since one step can expose
    /// new input for an earlier one ("aVOLb" loses its marker and becomes
    /// "ab"). Collapses and renames then run once over the settled labels.
    pub fn apply(&self, labels: &LabelSet) -> Result<Relabel> {
        let (text, structural): (Vec<&RecodeStep>, Vec<&RecodeStep>) =
            self.steps.iter().partition(|s| s.is_text());

        let mut acc = Relabel::identity(labels);
        let mut settled = text.is_empty();
        for _ in 0..MAX_TEXT_ROUNDS {
            if settled {
                break;
            }
            let before = acc.labels.clone();
            for step in &text {
                let next = self.apply_step(step, &acc.labels)?;
                acc = acc.then(next);
            }
            settled = before.iter().eq(acc.labels.iter());
        }
        if !settled {
            return Err(WavebookError::config(
                self.id.clone(),
                format!("labels still changing after {} rounds of text steps", MAX_TEXT_ROUNDS),
            ));
        }

        for step in structural {
            let next = self.apply_step(step, &acc.labels)?;
            acc = acc.then(next);
        }
        Ok(acc)
    }

    fn apply_step(&self, step: &RecodeStep, labels: &LabelSet) -> Result<Relabel> {
        step.apply(labels, &self.protected).map_err(|e| match e {
            WavebookError::Config { rule, message } => {
                WavebookError::config(self.id.clone(), format!("{}: {}", rule, message))
            }
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(rule: &RecodingRule, labels: &[&str]) -> Vec<String> {
        let compiled = rule.compile().unwrap();
        compiled
            .apply(&LabelSet::new(labels.iter().copied()))
            .unwrap()
            .labels
            .to_vec()
    }

    #[test]
    fn test_normalize_strips_punctuation() {
        assert_eq!(normalize_label("Approve (strongly)!", &[]), "Approve strongly");
        assert_eq!(normalize_label("  Don't   know ", &[]), "Dont know");
        assert_eq!(normalize_label("Other*", &['*']), "Other*");
    }

    #[test]
    fn test_full_rule_on_approval_labels() {
        let rule = RecodingRule::for_column("approve", "approve")
            .with_volunteered("VOL", '*')
            .with_collapse("refused", "Don't know")
            .with_collapse("dont know", "Don't know")
            .with_collapse("neither", "Other");

        let labels = run(
            &rule,
            &[
                "Approve",
                "Disapprove",
                "(VOL) Neither",
                "(VOL) Other",
                "Don't know/Refused (VOL)",
                "Don't know",
            ],
        );

        assert_eq!(
            labels,
            vec!["Approve", "Disapprove", "Other", "Other*", "Don't know"]
        );
    }

    #[test]
    fn test_rule_is_idempotent() {
        let rule = RecodingRule::for_column("party", "party")
            .with_replacement("Indep", "Independent")
            .with_volunteered("VOL", '*')
            .with_collapse("refused", "Don't know")
            .with_rename(0, "Republican");
        let compiled = rule.compile().unwrap();

        let raw = LabelSet::new(["Rep.", "Indep", "No pref (VOL)", "Refused"]);
        let once = compiled.apply(&raw).unwrap().labels;
        let twice = compiled.apply(&once).unwrap().labels;

        assert_eq!(once.to_vec(), vec!["Republican", "Independent", "No pref*", "Don't know"]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_rename_out_of_range_is_config_error() {
        let rule = RecodingRule::for_column("r1", "sex").with_rename(5, "Other");
        let err = rule
            .compile()
            .unwrap()
            .apply(&LabelSet::new(["Male", "Female"]))
            .unwrap_err();
        match err {
            WavebookError::Config { rule, message } => {
                assert_eq!(rule, "r1");
                assert!(message.contains("rename position 5"));
            }
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn test_rename_onto_existing_label_is_rejected() {
        let rule = RecodingRule::for_column("r1", "sex").with_rename(1, "Male");
        let err = rule
            .compile()
            .unwrap()
            .apply(&LabelSet::new(["Male", "Female"]))
            .unwrap_err();
        assert!(matches!(err, WavebookError::Config { .. }));
    }

    #[test]
    fn test_chained_replacements_rejected() {
        let rule = RecodingRule::for_column("r", "party")
            .with_replacement("a", "b")
            .with_replacement("b", "c");
        assert!(rule.compile().is_err());
    }

    #[test]
    fn test_expanding_replacement_is_stable() {
        assert_eq!(replace_stable("Dem", "Dem", "Democrat"), "Democrat");
        assert_eq!(replace_stable("Democrat", "Dem", "Democrat"), "Democrat");
        assert_eq!(replace_stable("aab", "ab", ""), "");
    }

    #[test]
    fn test_replacement_output_with_punctuation_rejected() {
        let rule = RecodingRule::for_column("r", "q").with_replacement("Dont", "Don't");
        assert!(rule.compile().is_err());
        let rule = rule.with_normalize(false);
        assert!(rule.compile().is_ok());
    }

    #[test]
    fn test_marker_must_survive_normalization() {
        let rule = RecodingRule::for_column("r", "q").with_volunteered("(VOL)", '*');
        assert!(rule.compile().is_err());
        let rule = RecodingRule::for_column("r", "q").with_volunteered("VOL", 'x');
        assert!(rule.compile().is_err());
    }

    #[test]
    fn test_collapse_is_case_insensitive() {
        let rule = RecodingRule::for_column("r", "q").with_collapse("REFUSED", "Don't know");
        assert_eq!(run(&rule, &["refused"]), vec!["Don't know"]);
    }

    #[test]
    fn test_collapse_label_recaptured_by_earlier_pattern() {
        let rule = RecodingRule::for_column("r", "q")
            .with_collapse("know", "Unsure")
            .with_collapse("refused", "Don't know");
        assert!(rule.compile().is_err());
    }

    #[test]
    fn test_text_steps_settle_before_collapse() {
        let rule = RecodingRule::for_column("r", "q")
            .with_replacement("ab", "X")
            .with_volunteered("VOL", '*');
        assert_eq!(run(&rule, &["VVOLOL", "aVOLb"]), ["*", "X*"]);

        let once = run(&rule, &["VVOLOL", "aVOLb"]);
        let refs: Vec<&str> = once.iter().map(String::as_str).collect();
        assert_eq!(run(&rule, &refs), once);
    }

    #[test]
    fn test_bad_collapse_pattern() {
        let rule = RecodingRule::for_column("r", "q").with_collapse("(", "x");
        assert!(matches!(rule.compile(), Err(WavebookError::Regex(_))));
    }

    #[test]
    fn test_rule_from_json() {
        let json = r#"{
            "id": "ideo",
            "target": {"pattern": "^ideo"},
            "volunteered": {},
            "collapse": [{"pattern": "refused", "label": "Don't know"}]
        }"#;
        let rule: RecodingRule = serde_json::from_str(json).unwrap();
        assert!(rule.normalize);
        assert_eq!(rule.volunteered, Some(VolunteeredTag::default()));
        assert!(matches!(rule.compile().unwrap().target, CompiledTarget::Pattern(_)));
    }
}
