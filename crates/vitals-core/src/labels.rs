//! Label tuples identifying one time series within an instrument.

use std::collections::BTreeMap;
use std::fmt;

/// A set of `name => value` label pairs.
///
/// Backed by a [`BTreeMap`] so two sets carrying the same pairs compare and
/// hash identically regardless of insertion order. Instruments validate every
/// observation's label set against their declared label names by name, not by
/// position.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelSet(BTreeMap<String, String>);

impl LabelSet {
    /// Empty label set, for instruments declared without labels.
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Build from `(name, value)` pairs.
    pub fn from_pairs<N, V>(pairs: &[(N, V)]) -> Self
    where
        N: AsRef<str>,
        V: AsRef<str>,
    {
        Self(
            pairs
                .iter()
                .map(|(n, v)| (n.as_ref().to_owned(), v.as_ref().to_owned()))
                .collect(),
        )
    }

    /// Number of labels in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the set carries no labels.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value for a label name, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Iterate pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Label names in name order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// True when the set's names are exactly `declared` (order-independent).
    pub(crate) fn matches(&self, declared: &[String]) -> bool {
        if self.0.len() != declared.len() {
            return false;
        }
        declared.iter().all(|name| self.0.contains_key(name))
    }
}

impl<N: AsRef<str>, V: AsRef<str>> FromIterator<(N, V)> for LabelSet {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(n, v)| (n.as_ref().to_owned(), v.as_ref().to_owned()))
                .collect(),
        )
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in self.iter() {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{}=\"{}\"", name, value)?;
            first = false;
        }
        Ok(())
    }
}

/// Build a [`LabelSet`] from `name => value` pairs.
///
/// ```
/// use vitals_core::labels;
///
/// let labels = labels! { "method" => "GET", "endpoint" => "/hello" };
/// assert_eq!(labels.get("method"), Some("GET"));
/// ```
#[macro_export]
macro_rules! labels {
    () => { $crate::LabelSet::empty() };
    ($($name:expr => $value:expr),+ $(,)?) => {
        [$(($name.to_string(), $value.to_string())),+]
            .into_iter()
            .collect::<$crate::LabelSet>()
    };
}
