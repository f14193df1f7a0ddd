//! Ordered categorical label sets.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// An ordered set of distinct category labels.
///
/// Label sets are values: every transformation returns a new set together
/// with the index mapping from old positions to new ones, so callers never
/// mutate a set that another column still references.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LabelSet {
    labels: IndexSet<String>,
}

impl LabelSet {
    /// Build a label set, dropping duplicates while keeping first positions.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True when the set has no labels.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label at a position.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get_index(index).map(|s| s.as_str())
    }

    /// Position of a label.
    pub fn position(&self, label: &str) -> Option<usize> {
        self.labels.get_index_of(label)
    }

    /// Whether the set contains a label.
    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    /// Iterate labels in declared order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|s| s.as_str())
    }

    /// Labels as owned strings, in order.
    pub fn to_vec(&self) -> Vec<String> {
        self.labels.iter().cloned().collect()
    }

    /// Map every label through `f`, merging labels that become equal.
    ///
    /// The merged label keeps the position of its first contributor.
    pub fn relabel<F>(&self, mut f: F) -> Relabel
    where
        F: FnMut(usize, &str) -> String,
    {
        let mut labels = IndexSet::with_capacity(self.labels.len());
        let mut remap = Vec::with_capacity(self.labels.len());

        for (index, label) in self.labels.iter().enumerate() {
            let (new_index, _) = labels.insert_full(f(index, label));
            remap.push(new_index);
        }

        Relabel {
            labels: LabelSet { labels },
            remap,
        }
    }

    /// Append a label if absent and return its position.
    pub(crate) fn with_label(mut self, label: &str) -> (Self, usize) {
        let (index, _) = self.labels.insert_full(label.to_string());
        (self, index)
    }
}

impl<'a> IntoIterator for &'a LabelSet {
    type Item = &'a String;
    type IntoIter = indexmap::set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.labels.iter()
    }
}

/// A new label set plus the mapping from old label positions into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relabel {
    /// The resulting labels.
    pub labels: LabelSet,
    /// `remap[old] = new` for every old label position.
    pub remap: Vec<usize>,
}

impl Relabel {
    /// The identity mapping over a label set.
    pub fn identity(labels: &LabelSet) -> Self {
        Self {
            labels: labels.clone(),
            remap: (0..labels.len()).collect(),
        }
    }

    /// Follow this mapping with another one defined over `self.labels`.
    pub fn then(self, next: Relabel) -> Relabel {
        let remap = self.remap.iter().map(|&i| next.remap[i]).collect();
        Relabel {
            labels: next.labels,
            remap,
        }
    }

    /// New label positions that no old label maps onto.
    pub fn orphans(&self) -> Vec<usize> {
        let mut hit = vec![false; self.labels.len()];
        for &i in &self.remap {
            hit[i] = true;
        }
        hit.iter()
            .enumerate()
            .filter(|(_, h)| !**h)
            .map(|(i, _)| i)
            .collect()
    }
}
