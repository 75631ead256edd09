// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/duckdb-behavioral)

//! The `DEFINE` clause as a read-only predicate store.
//!
//! Each pattern variable maps to its predicate split into conjuncts:
//!
//! ```sql
//! DEFINE
//!     B AS B.close > A.close AND B.ts - A.ts <= INTERVAL '7' DAY
//! ```
//!
//! becomes `B -> ["B.close > A.close", "B.ts - A.ts <= INTERVAL '7' DAY"]`.
//! Symbol lookups are case-insensitive, like SQL identifiers.

use indexmap::IndexMap;

use crate::common::sql::split_conjuncts;

/// Ordered mapping from pattern variable to its conjunctive fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefineClause {
    entries: IndexMap<String, Vec<String>>,
}

impl DefineClause {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from already AND-split fragments.
    pub fn from_fragments<I, S, F>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<F>)>,
        S: Into<String>,
        F: Into<String>,
    {
        let mut store = Self::new();
        for (symbol, fragments) in entries {
            store.insert(symbol, fragments.into_iter().map(Into::into).collect());
        }
        store
    }

    /// Builds a store from whole DEFINE expressions, splitting each on its
    /// top-level `AND`s.
    ///
    /// ```
    /// use prefilter::define::DefineClause;
    ///
    /// let define = DefineClause::from_expressions([
    ///     ("A", "price > 10"),
    ///     ("B", "price > A.price AND B.ts - A.ts <= 5"),
    /// ]);
    /// assert_eq!(define.get("b").unwrap().len(), 2);
    /// ```
    pub fn from_expressions<I, S, E>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, E)>,
        S: Into<String>,
        E: AsRef<str>,
    {
        let mut store = Self::new();
        for (symbol, expression) in entries {
            store.insert(symbol, split_conjuncts(expression.as_ref()));
        }
        store
    }

    /// Adds fragments for `symbol`, appending to any existing entry.
    pub fn insert(&mut self, symbol: impl Into<String>, fragments: Vec<String>) {
        let symbol = symbol.into();
        match self.key_of(&symbol).map(str::to_string) {
            Some(existing) => {
                self.entries
                    .entry(existing)
                    .or_default()
                    .extend(fragments);
            }
            None => {
                self.entries.insert(symbol, fragments);
            }
        }
    }

    /// Fragments for `symbol`, if defined.
    pub fn get(&self, symbol: &str) -> Option<&[String]> {
        let key = self.key_of(symbol)?;
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Whether `symbol` has an entry.
    pub fn contains(&self, symbol: &str) -> bool {
        self.key_of(symbol).is_some()
    }

    /// Defined symbols in declaration order.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// `(symbol, fragments)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(symbol, fragments)| (symbol.as_str(), fragments.as_slice()))
    }

    /// Number of defined symbols.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no symbol is defined.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn key_of(&self, symbol: &str) -> Option<&str> {
        if let Some((key, _)) = self.entries.get_key_value(symbol) {
            return Some(key.as_str());
        }
        self.entries
            .keys()
            .find(|k| k.eq_ignore_ascii_case(symbol))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_fragments_preserves_order() {
        let define = DefineClause::from_fragments([
            ("B", vec!["price > 2"]),
            ("A", vec!["price < 1", "qty > 0"]),
        ]);
        assert_eq!(define.symbols().collect::<Vec<_>>(), vec!["B", "A"]);
        assert_eq!(define.get("A").unwrap(), ["price < 1", "qty > 0"]);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let define = DefineClause::from_fragments([("Up", vec!["price > 2"])]);
        assert!(define.contains("UP"));
        assert!(define.contains("up"));
        assert!(!define.contains("down"));
    }

    #[test]
    fn test_insert_appends_to_existing_symbol() {
        let mut define = DefineClause::new();
        define.insert("A", vec!["x > 1".to_string()]);
        define.insert("a", vec!["y > 2".to_string()]);
        assert_eq!(define.len(), 1);
        assert_eq!(define.get("A").unwrap(), ["x > 1", "y > 2"]);
    }

    #[test]
    fn test_from_expressions_splits_conjuncts() {
        let define = DefineClause::from_expressions([(
            "M",
            "M.type = 'THEFT' AND M.lon BETWEEN R.lon - 0.05 AND R.lon + 0.05 \
             AND M.datetime - R.datetime <= INTERVAL '30' MINUTE",
        )]);
        assert_eq!(
            define.get("M").unwrap(),
            [
                "M.type = 'THEFT'",
                "M.lon BETWEEN R.lon - 0.05 AND R.lon + 0.05",
                "M.datetime - R.datetime <= INTERVAL '30' MINUTE",
            ]
        );
    }

    #[test]
    fn test_empty_store() {
        let define = DefineClause::new();
        assert!(define.is_empty());
        assert!(define.get("A").is_none());
    }
}
