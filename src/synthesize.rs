// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/duckdb-behavioral)

//! Condition synthesis for one special pattern and its anchor sequence.
//!
//! Given a special pattern such as `A B C`, the DEFINE store, the ordering
//! attribute, and an anchor subsequence such as `A C`, synthesis produces the
//! predicates a prefilter can evaluate over the anchor rows alone:
//!
//! 1. Anchors are put in pattern order (when the pattern has no repeated
//!    symbol).
//! 2. Every anchor position gets its own table alias (a repeated `Z` becomes
//!    `Z`, `Z_2`; see [`AnchorSequence::aliases`]) and consecutive aliases
//!    get `s1.attr <= s2.attr`.
//! 3. A fragment shaped `last.attr - first.attr <= W`, where `first`/`last`
//!    bound the special pattern, is taken out as the window.
//! 4. Each anchor's fragments are kept only if they reference anchors alone
//!    and call no navigation function. A fragment naming some other repeated
//!    anchor is dropped too, since the occurrence it means is unknown. Kept
//!    fragments are emitted per position with bare columns and self
//!    references qualified by that position's alias.
//! 5. The window fragment is rewritten onto the endpoint aliases and
//!    appended. Anchors lie inside the pattern span, so this only relaxes it.

use std::fmt;
use std::ops::Range;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};

use crate::common::sql::{
    calls_navigation, qualified_references, qualify_columns, references_only, requalify,
    window_matcher,
};
use crate::define::DefineClause;
use crate::error::{Diagnostic, PrefilterError, UndefinedReason};
use crate::pattern::expand::SpecialPattern;

/// Caller-chosen ordered subsequence of a special pattern's symbols.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnchorSequence(Vec<String>);

impl AnchorSequence {
    /// Creates an anchor sequence from symbol names.
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(symbols.into_iter().map(Into::into).collect())
    }

    /// The pattern's first and last symbol (just the first when they coincide
    /// in a one-symbol pattern). Empty for an empty pattern.
    pub fn boundary(pattern: &SpecialPattern) -> Self {
        match pattern.symbols() {
            [] => Self::default(),
            [only] => Self(vec![only.clone()]),
            [first, .., last] => Self(vec![first.clone(), last.clone()]),
        }
    }

    /// The anchor symbols in order.
    pub fn symbols(&self) -> &[String] {
        &self.0
    }

    /// First anchor.
    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Last anchor.
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Number of anchors.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no anchors.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Table alias for each anchor position.
    ///
    /// A symbol's first occurrence is its own alias. Later occurrences get
    /// `_2`, `_3`, ... so each position binds a row of its own; a suffix that
    /// collides with another anchor's name is bumped.
    ///
    /// ```
    /// use prefilter::synthesize::AnchorSequence;
    ///
    /// let anchors = AnchorSequence::new(["Z", "M", "Z"]);
    /// assert_eq!(anchors.aliases(), ["Z", "M", "Z_2"]);
    /// ```
    pub fn aliases(&self) -> Vec<String> {
        let mut taken: IndexSet<String> = self.0.iter().map(|s| s.to_ascii_lowercase()).collect();
        let mut seen: IndexMap<String, usize> = IndexMap::new();
        self.0
            .iter()
            .map(|symbol| {
                let count = seen.entry(symbol.to_ascii_lowercase()).or_insert(0);
                *count += 1;
                if *count == 1 {
                    return symbol.clone();
                }
                let mut suffix = *count;
                loop {
                    let alias = format!("{symbol}_{suffix}");
                    if taken.insert(alias.to_ascii_lowercase()) {
                        return alias;
                    }
                    suffix += 1;
                }
            })
            .collect()
    }

    /// Symbols occurring more than once, in first-seen order.
    fn repeated(&self) -> IndexSet<&str> {
        let mut seen = IndexSet::new();
        let mut repeated = IndexSet::new();
        for symbol in &self.0 {
            if !seen.insert(symbol.as_str()) {
                repeated.insert(symbol.as_str());
            }
        }
        repeated
    }
}

impl fmt::Display for AnchorSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

/// A window bound extracted from DEFINE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    /// The bound itself, e.g. `INTERVAL '7' DAY`.
    pub expression: String,
    /// The full fragment it was extracted from.
    pub fragment: String,
    /// The symbol whose DEFINE entry held the fragment.
    pub symbol: String,
    last_qualifier: Range<usize>,
    first_qualifier: Range<usize>,
}

impl Window {
    /// Rewrites the fragment so its boundary qualifiers name `first` and
    /// `last` instead of the special pattern's boundary symbols.
    ///
    /// Qualifiers that already name the target symbol are left byte-for-byte
    /// as written.
    pub fn propagate(&self, first: &str, last: &str) -> String {
        let text = &self.fragment;
        let pick = |range: &Range<usize>, target: &str| -> String {
            let current = &text[range.clone()];
            if current.eq_ignore_ascii_case(target) {
                current.to_string()
            } else {
                target.to_string()
            }
        };
        let mut out = String::with_capacity(text.len() + first.len() + last.len());
        out.push_str(&text[..self.last_qualifier.start]);
        out.push_str(&pick(&self.last_qualifier, last));
        out.push_str(&text[self.last_qualifier.end..self.first_qualifier.start]);
        out.push_str(&pick(&self.first_qualifier, first));
        out.push_str(&text[self.first_qualifier.end..]);
        out
    }
}

/// Predicates synthesized for one special pattern and anchor sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct SynthesizedConditions {
    /// The anchors after normalization, spelled as in the special pattern.
    pub anchors: AnchorSequence,
    /// Ordering constraints, then filtered DEFINE fragments per anchor
    /// position, then the propagated window fragment if any. Rows are named
    /// by [`AnchorSequence::aliases`].
    pub conditions: Vec<String>,
    /// The extracted window, if DEFINE declared one.
    pub window: Option<Window>,
    /// Non-fatal findings.
    pub diagnostics: Vec<Diagnostic>,
}

impl SynthesizedConditions {
    /// The raw window bound, e.g. `INTERVAL '7' DAY`.
    pub fn window_expression(&self) -> Option<&str> {
        self.window.as_ref().map(|w| w.expression.as_str())
    }
}

/// Synthesizes prefilter predicates for `pattern` driven by `anchors`.
///
/// # Errors
///
/// - [`PrefilterError::EmptyAnchorSequence`] if `anchors` is empty.
/// - [`PrefilterError::UndefinedAnchorSymbol`] if an anchor is missing from
///   the special pattern or from DEFINE. Checked before any other work.
///
/// # Examples
///
/// ```
/// use prefilter::define::DefineClause;
/// use prefilter::pattern::expand::SpecialPattern;
/// use prefilter::synthesize::{synthesize, AnchorSequence};
///
/// let define = DefineClause::from_expressions([
///     ("A", "price < 10"),
///     ("B", "price > A.price AND B.ts - A.ts <= INTERVAL '7' DAY"),
/// ]);
/// let pattern = SpecialPattern::new(["A", "B"]);
/// let out = synthesize(&pattern, &define, "ts", &AnchorSequence::new(["B", "A"])).unwrap();
/// assert_eq!(out.conditions, [
///     "A.ts <= B.ts",
///     "A.price < 10",
///     "B.price > A.price",
///     "B.ts - A.ts <= INTERVAL '7' DAY",
/// ]);
/// ```
pub fn synthesize(
    pattern: &SpecialPattern,
    define: &DefineClause,
    order_by: &str,
    anchors: &AnchorSequence,
) -> Result<SynthesizedConditions, PrefilterError> {
    let mut anchors = resolve_anchors(pattern, define, anchors)?;
    let mut diagnostics = Vec::new();

    if pattern.has_duplicates() {
        let diagnostic = Diagnostic::AmbiguousAnchorOrder {
            pattern: pattern.symbols().to_vec(),
        };
        warn!(%diagnostic, "using caller anchor order");
        diagnostics.push(diagnostic);
    } else {
        // Every anchor resolved to a pattern symbol, so the position exists.
        anchors.sort_by_key(|s| pattern.position(s).unwrap_or(usize::MAX));
    }

    let anchors = AnchorSequence(anchors);
    let aliases = anchors.aliases();
    let repeated = anchors.repeated();

    let mut conditions: Vec<String> = aliases
        .windows(2)
        .map(|pair| format!("{}.{order_by} <= {}.{order_by}", pair[0], pair[1]))
        .collect();

    let window = extract_window(pattern, define, order_by, &mut diagnostics)?;

    for (symbol, alias) in anchors.symbols().iter().zip(&aliases) {
        let Some(fragments) = define.get(symbol) else {
            continue;
        };
        for (idx, fragment) in fragments.iter().enumerate() {
            if window
                .as_ref()
                .is_some_and(|(w, at)| *at == idx && w.symbol.eq_ignore_ascii_case(symbol))
            {
                continue;
            }
            if !references_only(fragment, anchors.symbols()) {
                debug!(%symbol, %fragment, "dropping fragment referencing non-anchor symbols");
                continue;
            }
            if calls_navigation(fragment) {
                debug!(%symbol, %fragment, "dropping fragment with navigation call");
                continue;
            }
            // Which occurrence another repeated symbol means is unknown.
            if qualified_references(fragment).iter().any(|q| {
                !q.eq_ignore_ascii_case(symbol) && repeated.iter().any(|r| r.eq_ignore_ascii_case(q))
            }) {
                debug!(%symbol, %fragment, "dropping fragment referencing a repeated anchor");
                continue;
            }
            let own = if alias == symbol {
                fragment.clone()
            } else {
                requalify(fragment, symbol, alias)
            };
            conditions.push(qualify_columns(&own, alias));
        }
    }

    let window = window.map(|(w, _)| w);
    if let Some(window) = &window {
        if let (Some(first), Some(last)) = (aliases.first(), aliases.last()) {
            conditions.push(window.propagate(first, last));
        }
    }

    debug!(
        pattern = %pattern,
        anchors = %anchors,
        conditions = conditions.len(),
        window = window.as_ref().map(|w| w.expression.as_str()),
        "synthesized prefilter conditions"
    );

    Ok(SynthesizedConditions {
        anchors,
        conditions,
        window,
        diagnostics,
    })
}

/// Validates anchors and respells them as the special pattern does.
fn resolve_anchors(
    pattern: &SpecialPattern,
    define: &DefineClause,
    anchors: &AnchorSequence,
) -> Result<Vec<String>, PrefilterError> {
    if anchors.is_empty() {
        return Err(PrefilterError::EmptyAnchorSequence {
            pattern: pattern.symbols().to_vec(),
        });
    }
    anchors
        .symbols()
        .iter()
        .map(|anchor| {
            let Some(spelled) = pattern.iter().find(|s| s.eq_ignore_ascii_case(anchor)) else {
                return Err(PrefilterError::UndefinedAnchorSymbol {
                    symbol: anchor.clone(),
                    reason: UndefinedReason::NotInPattern,
                });
            };
            if !define.contains(spelled) {
                return Err(PrefilterError::UndefinedAnchorSymbol {
                    symbol: anchor.clone(),
                    reason: UndefinedReason::NotDefined,
                });
            }
            Ok(spelled.clone())
        })
        .collect()
}

/// Finds the window fragment among the DEFINE entries of the pattern's
/// symbols. Returns the window and the fragment's index within its entry.
fn extract_window(
    pattern: &SpecialPattern,
    define: &DefineClause,
    order_by: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Option<(Window, usize)>, PrefilterError> {
    let (Some(first), Some(last)) = (pattern.first_symbol(), pattern.last_symbol()) else {
        return Ok(None);
    };
    let matcher =
        window_matcher(first, last, order_by).map_err(|e| PrefilterError::WindowMatcher {
            message: e.to_string(),
        })?;

    let mut found: Option<(Window, usize)> = None;
    for (symbol, fragments) in define.iter() {
        if !pattern.iter().any(|s| s.eq_ignore_ascii_case(symbol)) {
            continue;
        }
        for (idx, fragment) in fragments.iter().enumerate() {
            let Some(caps) = matcher.captures(fragment) else {
                continue;
            };
            if found.is_some() {
                let diagnostic = Diagnostic::AdditionalWindowIgnored {
                    symbol: symbol.to_string(),
                    fragment: fragment.clone(),
                };
                warn!(%diagnostic, "only one window condition is supported");
                diagnostics.push(diagnostic);
                continue;
            }
            let (Some(window), Some(last_q), Some(first_q)) =
                (caps.name("window"), caps.name("last"), caps.name("first"))
            else {
                continue;
            };
            debug!(%symbol, window = window.as_str(), "extracted window condition");
            found = Some((
                Window {
                    expression: window.as_str().trim().to_string(),
                    fragment: fragment.clone(),
                    symbol: symbol.to_string(),
                    last_qualifier: last_q.range(),
                    first_qualifier: first_q.range(),
                },
                idx,
            ));
        }
    }
    Ok(found)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    const NAMES: [&str; 5] = ["A", "B", "C", "D", "E"];

    proptest! {
        #[test]
        fn full_anchor_window_is_unchanged(len in 2..=5usize, spaces in 0..3usize) {
            let pattern = SpecialPattern::new(NAMES[..len].iter().copied());
            let first = NAMES[0];
            let last = NAMES[len - 1];
            let pad = " ".repeat(spaces);
            let fragment = format!("{last}.ts{pad} - {first}.ts <={pad} INTERVAL '3' HOUR");
            let define = DefineClause::from_fragments(
                NAMES[..len].iter().map(|n| {
                    let frags = if *n == last { vec![fragment.clone()] } else { vec![] };
                    (*n, frags)
                }),
            );
            let anchors = AnchorSequence::new(NAMES[..len].iter().copied());
            let out = synthesize(&pattern, &define, "ts", &anchors).unwrap();
            let window = out.window.unwrap();
            prop_assert_eq!(window.propagate(first, last), fragment.clone());
            prop_assert_eq!(out.conditions.last().unwrap(), &fragment);
        }

        #[test]
        fn ordering_constraints_count(len in 1..=5usize) {
            let pattern = SpecialPattern::new(NAMES[..len].iter().copied());
            let define = DefineClause::from_fragments(
                NAMES[..len].iter().map(|n| (*n, Vec::<String>::new())),
            );
            let anchors = AnchorSequence::new(NAMES[..len].iter().rev().copied());
            let out = synthesize(&pattern, &define, "ts", &anchors).unwrap();
            prop_assert_eq!(out.conditions.len(), len - 1);
            prop_assert_eq!(out.anchors.symbols(), pattern.symbols());
        }
    }
}
