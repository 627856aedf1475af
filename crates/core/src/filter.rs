//! Query-string filters for collections
//!
//! A filter is a mapping of key to value. Its canonical wire form sorts keys
//! lexicographically, so two filters with the same pairs always produce the
//! same query string and therefore the same cache key.

use std::collections::BTreeMap;
use std::fmt::Display;

use ledgerbridge_domain::impl_wire_name_conversions;
use serde::{Deserialize, Serialize};

/// How filter keys are spelled on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterStyle {
    /// `?status=closed`
    #[default]
    Plain,
    /// `?search[status]=closed`
    Search,
}

impl_wire_name_conversions!(FilterStyle {
    Plain => "plain",
    Search => "search",
});

/// Sorted key/value query parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Filter(BTreeMap<String, String>);

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Display) {
        self.0.insert(key.into(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Layer `overrides` on top of `self`; keys present in both take the
    /// override's value.
    pub fn merged(&self, overrides: &Filter) -> Filter {
        let mut merged = self.0.clone();
        merged.extend(overrides.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        Filter(merged)
    }

    /// Encoded query string including the leading `?`, or an empty string for
    /// an empty filter.
    pub fn query_string(&self, style: FilterStyle) -> String {
        if self.0.is_empty() {
            return String::new();
        }

        let pairs: Vec<String> = self
            .0
            .iter()
            .map(|(key, value)| {
                let key = match style {
                    FilterStyle::Plain => key.clone(),
                    FilterStyle::Search => format!("search[{key}]"),
                };
                format!("{}={}", urlencoding::encode(&key), urlencoding::encode(value))
            })
            .collect();

        format!("?{}", pairs.join("&"))
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Filter
where
    K: Into<String>,
    V: Display,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().fold(Filter::new(), |filter, (k, v)| filter.with(k, v))
    }
}

impl<K, V> FromIterator<(K, V)> for Filter
where
    K: Into<String>,
    V: Display,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter().fold(Filter::new(), |filter, (k, v)| filter.with(k, v))
    }
}
