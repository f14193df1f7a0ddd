//! Categorical recoding.
//!
//! Rules are declared in templates, compiled once, and applied to every
//! dataset in a batch. Every step maps a [`LabelSet`](crate::dataset::LabelSet)
//! to a new set plus an index mapping; nothing is changed in place.

mod derive;
mod engine;
mod rules;

pub use derive::DerivedVariable;
pub use engine::{recode_column, LabelChange, RecodeReport, Recoder};
pub use rules::{
    normalize_label, Collapse, CompiledRule, CompiledTarget, PositionalRename, RecodeStep,
    RecodingRule, Replacement, RuleTarget, VolunteeredTag,
};
