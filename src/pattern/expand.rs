// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/duckdb-behavioral)

//! Expansion of a row pattern into finite "special patterns".
//!
//! A special pattern is a quantifier-free symbol sequence standing in for a
//! family of matches. Expansion is a deliberately lossy approximation used
//! only to drive prefiltering:
//!
//! | Construct | Expansion |
//! |-----------|-----------|
//! | `A` | `[A]` |
//! | `^`, `$`, `{- p -}` | `[]` |
//! | `(p)` | `p` |
//! | `p*`, `p?`, `p{0,n}` (n > 0 or unbounded) | `[]` and every expansion of `p` |
//! | `p+` | every expansion of `p`, once |
//! | `p{n,m}` otherwise | the first expansion of `p`, repeated `n` times |
//! | `l \| r` | expansions of `l` then of `r` |
//! | `p q` | cartesian product, concatenated in order |
//! | `PERMUTE(p, q, ...)` | cartesian product, concatenated in every order |
//!
//! Results are deduplicated in first-seen order, so output is deterministic.
//!
//! # Combinatorial growth
//!
//! Concatenation multiplies the expansion counts of its items, and
//! `PERMUTE` with `k` items adds a further `k!` orderings per choice. Neither
//! is capped here; callers feeding very wide patterns should expect large
//! outputs.

use std::fmt;
use std::ops::Deref;

use indexmap::IndexSet;
use itertools::Itertools;
use tracing::{debug, warn};

use super::ast::{PatternNode, Quantifier};
use crate::error::{Diagnostic, PrefilterError};

/// A concrete, quantifier-free symbol sequence. Duplicates are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecialPattern(Vec<String>);

impl SpecialPattern {
    /// Creates a special pattern from symbol names.
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(symbols.into_iter().map(Into::into).collect())
    }

    /// The symbols in order.
    pub fn symbols(&self) -> &[String] {
        &self.0
    }

    /// First symbol, if any.
    pub fn first_symbol(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Last symbol, if any.
    pub fn last_symbol(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Index of the first occurrence of `symbol`.
    pub fn position(&self, symbol: &str) -> Option<usize> {
        self.0.iter().position(|s| s == symbol)
    }

    /// Whether `symbol` occurs anywhere in the sequence.
    pub fn contains(&self, symbol: &str) -> bool {
        self.position(symbol).is_some()
    }

    /// Whether any symbol occurs more than once.
    pub fn has_duplicates(&self) -> bool {
        let distinct: IndexSet<&String> = self.0.iter().collect();
        distinct.len() != self.0.len()
    }

    /// The sequence as a plain concatenation pattern.
    pub fn to_node(&self) -> PatternNode {
        PatternNode::sequence(self.0.iter().cloned())
    }

    /// Consumes the pattern, returning its symbols.
    pub fn into_symbols(self) -> Vec<String> {
        self.0
    }
}

impl Deref for SpecialPattern {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for SpecialPattern {
    fn from(symbols: Vec<String>) -> Self {
        Self(symbols)
    }
}

impl fmt::Display for SpecialPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

/// Special patterns produced by [`expand_with_diagnostics`], plus any
/// degraded-accuracy findings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    /// Distinct special patterns in first-seen order.
    pub patterns: Vec<SpecialPattern>,
    /// Non-fatal findings raised while expanding.
    pub diagnostics: Vec<Diagnostic>,
}

/// Expands a pattern into its distinct special patterns.
///
/// # Errors
///
/// Returns [`PrefilterError::MalformedPattern`] when a node has no operand
/// that could be expanded (for example `PERMUTE()`).
///
/// # Examples
///
/// ```
/// use prefilter::pattern::expand::expand;
/// use prefilter::pattern::parser::parse_pattern;
///
/// let node = parse_pattern("PERMUTE(E, F)").unwrap();
/// let patterns = expand(&node).unwrap();
/// assert_eq!(patterns.len(), 2);
/// ```
pub fn expand(node: &PatternNode) -> Result<Vec<SpecialPattern>, PrefilterError> {
    Ok(expand_with_diagnostics(node)?.patterns)
}

/// Like [`expand`], but also returns the diagnostics raised along the way.
pub fn expand_with_diagnostics(node: &PatternNode) -> Result<Expansion, PrefilterError> {
    let mut expander = Expander::default();
    let set = expander.expand_node(node)?;
    let patterns: Vec<SpecialPattern> = set.into_iter().map(SpecialPattern).collect();
    debug!(
        pattern = %node,
        special_patterns = patterns.len(),
        "expanded row pattern"
    );
    Ok(Expansion {
        patterns,
        diagnostics: expander.diagnostics,
    })
}

type Sequences = IndexSet<Vec<String>>;

fn single(seq: Vec<String>) -> Sequences {
    let mut out = IndexSet::with_capacity(1);
    out.insert(seq);
    out
}

fn with_empty(rest: Sequences) -> Sequences {
    let mut out = single(Vec::new());
    out.extend(rest);
    out
}

/// Upstream tokenizers can leave operator tokens behind as bare "symbols".
fn is_marker_token(name: &str) -> bool {
    matches!(name, "|" | "?" | "," | "^" | "$" | "")
}

#[derive(Default)]
struct Expander {
    diagnostics: Vec<Diagnostic>,
}

impl Expander {
    fn expand_node(&mut self, node: &PatternNode) -> Result<Sequences, PrefilterError> {
        match node {
            PatternNode::Symbol(name) if is_marker_token(name) => Ok(single(Vec::new())),
            PatternNode::Symbol(name) => Ok(single(vec![name.clone()])),
            PatternNode::Anchor | PatternNode::Excluded(_) => Ok(single(Vec::new())),
            PatternNode::Group(inner) => self.expand_node(inner),
            PatternNode::Quantified {
                primary,
                quantifier,
            } => self.expand_quantified(primary, *quantifier),
            PatternNode::Alternation(left, right) => {
                let mut out = self.expand_node(left)?;
                out.extend(self.expand_node(right)?);
                Ok(out)
            }
            PatternNode::Concatenation(items) => self.expand_concatenation(items),
            PatternNode::Permute(items) => self.expand_permute(items),
        }
    }

    fn expand_quantified(
        &mut self,
        primary: &PatternNode,
        quantifier: Quantifier,
    ) -> Result<Sequences, PrefilterError> {
        match quantifier {
            Quantifier::Star | Quantifier::Optional => Ok(with_empty(self.expand_node(primary)?)),
            Quantifier::Plus => self.expand_node(primary),
            Quantifier::Range { lo, hi: Some(hi) } if hi < lo => {
                let diagnostic = Diagnostic::DegradedQuantifier {
                    message: format!("{primary}{quantifier}"),
                };
                warn!(%diagnostic, "degraded quantifier expansion");
                self.diagnostics.push(diagnostic);
                self.expand_node(primary)
            }
            Quantifier::Range { lo: 0, hi } if hi.is_none_or(|h| h > 0) => {
                Ok(with_empty(self.expand_node(primary)?))
            }
            Quantifier::Range { lo, .. } => {
                let inner = self.expand_node(primary)?;
                let Some(first) = inner.first() else {
                    return Ok(single(Vec::new()));
                };
                let repeated = (0..lo).flat_map(|_| first.iter().cloned()).collect();
                Ok(single(repeated))
            }
        }
    }

    fn expand_concatenation(&mut self, items: &[PatternNode]) -> Result<Sequences, PrefilterError> {
        let mut result = single(Vec::new());
        for item in items {
            let part = self.expand_node(item)?;
            let mut next = IndexSet::with_capacity(result.len() * part.len());
            for prefix in &result {
                for seq in &part {
                    let mut joined = Vec::with_capacity(prefix.len() + seq.len());
                    joined.extend_from_slice(prefix);
                    joined.extend_from_slice(seq);
                    next.insert(joined);
                }
            }
            result = next;
        }
        Ok(result)
    }

    fn expand_permute(&mut self, items: &[PatternNode]) -> Result<Sequences, PrefilterError> {
        if items.is_empty() {
            return Err(PrefilterError::MalformedPattern {
                message: "PERMUTE has no arguments".to_string(),
            });
        }
        let parts = items
            .iter()
            .map(|item| self.expand_node(item).map(|set| set.into_iter().collect_vec()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut out = IndexSet::new();
        for choice in parts.into_iter().multi_cartesian_product() {
            for order in (0..choice.len()).permutations(choice.len()) {
                let seq = order
                    .into_iter()
                    .flat_map(|idx| choice[idx].iter().cloned())
                    .collect_vec();
                out.insert(seq);
            }
        }
        Ok(out)
    }
}
