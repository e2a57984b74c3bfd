//! Object discovery and name filtering.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::StringOrList;
use crate::core::traits::{ObjectKind, RoutineKind, SchemaSource};
use crate::error::Result;

/// One entry of an [`ObjectFilter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamePattern {
    /// Matches only this exact name.
    Exact(String),
    /// Matches every name starting with this prefix (written `prefix*`).
    Prefix(String),
}

impl NamePattern {
    /// Parse one entry. Surrounding whitespace is ignored; blank entries
    /// yield `None`.
    pub fn parse(entry: &str) -> Option<Self> {
        let entry = entry.trim();
        if entry.is_empty() {
            return None;
        }
        Some(match entry.strip_suffix('*') {
            Some(prefix) => NamePattern::Prefix(prefix.trim_end_matches('*').to_string()),
            None => NamePattern::Exact(entry.to_string()),
        })
    }

    /// Case-sensitive, byte-wise match.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            NamePattern::Exact(exact) => name == exact,
            NamePattern::Prefix(prefix) => name.as_bytes().starts_with(prefix.as_bytes()),
        }
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamePattern::Exact(exact) => f.write_str(exact),
            NamePattern::Prefix(prefix) => write!(f, "{}*", prefix),
        }
    }
}

/// Ordered list of name patterns. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StringOrList", into = "Vec<String>")]
pub struct ObjectFilter {
    patterns: Vec<NamePattern>,
}

impl ObjectFilter {
    /// Build a filter from raw entries such as `["wp_*", "log"]`.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: entries
                .into_iter()
                .filter_map(|e| NamePattern::parse(e.as_ref()))
                .collect(),
        }
    }

    /// Parse a comma-separated list such as `"wp_*,log"`.
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(','))
    }

    /// The parsed patterns, in the order given.
    pub fn patterns(&self) -> &[NamePattern] {
        &self.patterns
    }

    /// Whether the filter has no patterns (and so matches everything).
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether `name` is selected by this filter.
    pub fn matches(&self, name: &str) -> bool {
        self.is_empty() || self.patterns.iter().any(|p| p.matches(name))
    }

    /// Keep the selected names, preserving their order.
    pub fn apply(&self, names: Vec<String>) -> Vec<String> {
        if self.is_empty() {
            return names;
        }
        names.into_iter().filter(|n| self.matches(n)).collect()
    }
}

impl From<StringOrList> for ObjectFilter {
    fn from(value: StringOrList) -> Self {
        Self::new(value.into_items())
    }
}

impl From<ObjectFilter> for Vec<String> {
    fn from(filter: ObjectFilter) -> Self {
        filter.patterns.iter().map(ToString::to_string).collect()
    }
}

/// Discover objects of `kind` selected by `filter`, in catalog order.
pub async fn discover(
    source: &dyn SchemaSource,
    kind: ObjectKind,
    filter: &ObjectFilter,
) -> Result<Vec<String>> {
    let all = source.list_objects(kind).await?;
    let total = all.len();
    let selected = filter.apply(all);
    debug!(
        "Selected {} of {} {} object(s) in {}",
        selected.len(),
        total,
        kind,
        source.database()
    );
    Ok(selected)
}

/// List stored routines of `kind`. Routines are never name-filtered.
pub async fn list_routines(source: &dyn SchemaSource, kind: RoutineKind) -> Result<Vec<String>> {
    source.list_routines(kind).await
}
