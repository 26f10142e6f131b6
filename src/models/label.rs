//! Open enumerations for tier, request type and status.

use serde::{Deserialize, Serialize};

/// A tier, request type or status value.
///
/// Historical rows carry values outside the options the dashboard offers, so any string is
/// accepted. Use [`OptionSet::classify`] to tell suggested values from legacy ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(String);

impl Label {
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(value.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Case-insensitive comparison against a plain string.
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other.trim())
    }
}

impl From<&str> for Label {
    fn from(value: &str) -> Self {
        Label::new(value)
    }
}

impl From<String> for Label {
    fn from(value: String) -> Self {
        Label::new(value)
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of checking a label against an [`OptionSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified<'a> {
    /// Matches a suggested option; carries the option's canonical spelling
    Listed(&'a str),
    /// Not among the suggestions; kept as-is
    Unlisted,
}

/// Ordered, extensible list of suggested values for a [`Label`] field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionSet(Vec<String>);

impl OptionSet {
    /// Build a set from raw values; blanks and case-insensitive duplicates are dropped.
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = OptionSet::default();
        for value in values {
            set.insert(value.as_ref());
        }
        set
    }

    /// Add an option unless it is blank or already present.
    pub fn insert(&mut self, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() || self.0.iter().any(|v| v.eq_ignore_ascii_case(value)) {
            return false;
        }
        self.0.push(value.to_string());
        true
    }

    pub fn classify(&self, label: &Label) -> Classified<'_> {
        self.0
            .iter()
            .find(|option| label.matches(option))
            .map_or(Classified::Unlisted, |option| Classified::Listed(option.as_str()))
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
