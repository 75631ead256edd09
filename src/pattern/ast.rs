// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/duckdb-behavioral)

//! Row pattern syntax tree.
//!
//! One closed enum covers every construct of the `PATTERN ( ... )` clause.
//! Nodes are immutable once built and form a tree (no sharing, no cycles).

use std::fmt;

use indexmap::IndexSet;

/// Repetition operator applied to a primary pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantifier {
    /// `*`: zero or more.
    Star,
    /// `+`: one or more.
    Plus,
    /// `?`: zero or one.
    Optional,
    /// `{lo,hi}`: bounded repetition. `hi == None` means unbounded.
    Range {
        /// Minimum repetitions.
        lo: u32,
        /// Maximum repetitions, if bounded.
        hi: Option<u32>,
    },
}

impl fmt::Display for Quantifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Star => f.write_str("*"),
            Self::Plus => f.write_str("+"),
            Self::Optional => f.write_str("?"),
            Self::Range { lo, hi: Some(hi) } if lo == hi => write!(f, "{{{lo}}}"),
            Self::Range { lo, hi: Some(hi) } => write!(f, "{{{lo},{hi}}}"),
            Self::Range { lo, hi: None } => write!(f, "{{{lo},}}"),
        }
    }
}

/// A node of the row pattern tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternNode {
    /// A pattern variable such as `A`.
    Symbol(String),
    /// `^` or `$`. Matches a partition boundary, binds no row.
    Anchor,
    /// A primary pattern with a repetition operator.
    Quantified {
        /// The repeated pattern.
        primary: Box<PatternNode>,
        /// The repetition operator.
        quantifier: Quantifier,
    },
    /// Juxtaposed patterns, matched in order.
    Concatenation(Vec<PatternNode>),
    /// `left | right`.
    Alternation(Box<PatternNode>, Box<PatternNode>),
    /// `PERMUTE(a, b, ...)`: every ordering of the items.
    Permute(Vec<PatternNode>),
    /// `{- ... -}`: matched but excluded from output.
    Excluded(Box<PatternNode>),
    /// Parenthesized pattern.
    Group(Box<PatternNode>),
}

impl PatternNode {
    /// Builds a [`PatternNode::Symbol`].
    pub fn symbol(name: impl Into<String>) -> Self {
        Self::Symbol(name.into())
    }

    /// Wraps `self` in a quantifier.
    #[must_use]
    pub fn quantified(self, quantifier: Quantifier) -> Self {
        Self::Quantified {
            primary: Box::new(self),
            quantifier,
        }
    }

    /// Builds `left | right`.
    #[must_use]
    pub fn alternation(left: Self, right: Self) -> Self {
        Self::Alternation(Box::new(left), Box::new(right))
    }

    /// Wraps `self` in parentheses.
    #[must_use]
    pub fn group(self) -> Self {
        Self::Group(Box::new(self))
    }

    /// Wraps `self` in `{- ... -}`.
    #[must_use]
    pub fn excluded(self) -> Self {
        Self::Excluded(Box::new(self))
    }

    /// Builds a concatenation of plain symbols, e.g. `A B C`.
    pub fn sequence<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Concatenation(names.into_iter().map(Self::symbol).collect())
    }

    /// Distinct symbol names in first-seen order, excluded subpatterns included.
    ///
    /// Callers use this to check every pattern variable against DEFINE.
    pub fn symbols(&self) -> Vec<String> {
        let mut out = IndexSet::new();
        self.collect_symbols(&mut out);
        out.into_iter().collect()
    }

    fn collect_symbols(&self, out: &mut IndexSet<String>) {
        match self {
            Self::Symbol(name) => {
                out.insert(name.clone());
            }
            Self::Anchor => {}
            Self::Quantified { primary, .. } => primary.collect_symbols(out),
            Self::Concatenation(items) | Self::Permute(items) => {
                for item in items {
                    item.collect_symbols(out);
                }
            }
            Self::Alternation(left, right) => {
                left.collect_symbols(out);
                right.collect_symbols(out);
            }
            Self::Excluded(inner) | Self::Group(inner) => inner.collect_symbols(out),
        }
    }
}

impl fmt::Display for PatternNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Symbol(name) => f.write_str(name),
            Self::Anchor => f.write_str("^"),
            Self::Quantified {
                primary,
                quantifier,
            } => match primary.as_ref() {
                // A quantifier binds to a single unquantified primary; a
                // trailing `?` would otherwise read back as reluctance.
                Self::Concatenation(_) | Self::Alternation(_, _) | Self::Quantified { .. } => {
                    write!(f, "({primary}){quantifier}")
                }
                _ => write!(f, "{primary}{quantifier}"),
            },
            Self::Concatenation(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    match item {
                        Self::Alternation(_, _) => write!(f, "({item})")?,
                        _ => write!(f, "{item}")?,
                    }
                }
                Ok(())
            }
            Self::Alternation(left, right) => write!(f, "{left} | {right}"),
            Self::Permute(items) => {
                f.write_str("PERMUTE(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            Self::Excluded(inner) => write!(f, "{{- {inner} -}}"),
            Self::Group(inner) => write!(f, "({inner})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbols_first_seen_order() {
        let node = PatternNode::Concatenation(vec![
            PatternNode::symbol("B").quantified(Quantifier::Plus),
            PatternNode::alternation(PatternNode::symbol("A"), PatternNode::symbol("B")),
            PatternNode::symbol("C").excluded(),
        ]);
        assert_eq!(node.symbols(), vec!["B", "A", "C"]);
    }

    #[test]
    fn test_anchor_has_no_symbols() {
        assert!(PatternNode::Anchor.symbols().is_empty());
    }

    #[test]
    fn test_display_quantifiers() {
        assert_eq!(Quantifier::Star.to_string(), "*");
        assert_eq!(Quantifier::Range { lo: 3, hi: Some(5) }.to_string(), "{3,5}");
        assert_eq!(Quantifier::Range { lo: 2, hi: Some(2) }.to_string(), "{2}");
        assert_eq!(Quantifier::Range { lo: 2, hi: None }.to_string(), "{2,}");
    }

    #[test]
    fn test_display_nested() {
        let node = PatternNode::Concatenation(vec![
            PatternNode::Concatenation(vec![
                PatternNode::symbol("A").quantified(Quantifier::Star),
                PatternNode::symbol("B").quantified(Quantifier::Plus),
            ])
            .group(),
            PatternNode::Permute(vec![PatternNode::symbol("E"), PatternNode::symbol("F")]),
        ]);
        assert_eq!(node.to_string(), "(A* B+) PERMUTE(E, F)");
    }

    #[test]
    fn test_display_stacked_quantifiers_reparse() {
        use crate::pattern::parser::parse_pattern;

        let node = PatternNode::symbol("A")
            .quantified(Quantifier::Star)
            .quantified(Quantifier::Optional);
        let text = node.to_string();
        assert_eq!(text, "(A*)?");
        let reparsed = parse_pattern(&text).unwrap();
        assert_eq!(
            reparsed,
            PatternNode::symbol("A")
                .quantified(Quantifier::Star)
                .group()
                .quantified(Quantifier::Optional)
        );
        assert_eq!(reparsed.to_string(), text);
    }

    #[test]
    fn test_display_excluded() {
        let node = PatternNode::symbol("A").excluded();
        assert_eq!(node.to_string(), "{- A -}");
    }
}
