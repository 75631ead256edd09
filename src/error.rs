// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/duckdb-behavioral)

//! Error and diagnostic types for the prefilter pipeline.
//!
//! Fatal conditions are [`PrefilterError`] values and abort processing of the
//! special pattern they concern. Non-fatal conditions are [`Diagnostic`]
//! values returned next to the result they qualify.

use std::fmt;

use thiserror::Error;

use crate::pattern::parser::PatternError;

/// Renders a special pattern as space-separated symbols for messages.
pub(crate) fn display_pattern(symbols: &[String]) -> String {
    if symbols.is_empty() {
        "<empty>".to_string()
    } else {
        symbols.join(" ")
    }
}

/// Why an anchor symbol was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndefinedReason {
    /// The symbol does not occur in the special pattern.
    NotInPattern,
    /// The symbol has no entry in the DEFINE clause.
    NotDefined,
}

impl fmt::Display for UndefinedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInPattern => f.write_str("not part of the special pattern"),
            Self::NotDefined => f.write_str("not defined in DEFINE"),
        }
    }
}

/// Fatal errors raised while building a prefilter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PrefilterError {
    /// A pattern node could not be interpreted at all.
    #[error("malformed pattern: {message}")]
    MalformedPattern {
        /// What was wrong with the node.
        message: String,
    },

    /// A range case needs a window bound but DEFINE declared none.
    #[error("missing window condition for special pattern [{}]", display_pattern(.pattern))]
    MissingWindow {
        /// The special pattern that could not be bounded.
        pattern: Vec<String>,
    },

    /// An anchor references a symbol the pattern or DEFINE does not know.
    #[error("anchor symbol '{symbol}' is {reason}")]
    UndefinedAnchorSymbol {
        /// The offending symbol.
        symbol: String,
        /// Which lookup failed.
        reason: UndefinedReason,
    },

    /// The anchor sequence has no symbols.
    #[error("empty anchor sequence for special pattern [{}]", display_pattern(.pattern))]
    EmptyAnchorSequence {
        /// The special pattern the anchors were chosen for.
        pattern: Vec<String>,
    },

    /// A bucketed plan saw a window different from the bucket width in use.
    #[error(
        "special pattern [{}] has window '{found}' but buckets are '{expected}' wide",
        display_pattern(.pattern)
    )]
    InconsistentBucketWidth {
        /// The special pattern carrying the conflicting window.
        pattern: Vec<String>,
        /// Bucket width already chosen.
        expected: String,
        /// Window of this special pattern.
        found: String,
    },

    /// The window recognizer could not be built for these symbol names.
    #[error("cannot build window matcher: {message}")]
    WindowMatcher {
        /// The underlying regex error.
        message: String,
    },

    /// Every special pattern was skipped, so no range rows exist.
    #[error("no special pattern produced a range row")]
    NoRangeRows,

    /// The pattern text could not be parsed.
    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// Non-fatal findings surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Diagnostic {
    /// The special pattern repeats a symbol, so anchors were used in the
    /// order the caller supplied them.
    AmbiguousAnchorOrder {
        /// The special pattern with duplicate symbols.
        pattern: Vec<String>,
    },
    /// A second window-shaped fragment was found and kept as an ordinary
    /// predicate instead of being merged into the window bound.
    AdditionalWindowIgnored {
        /// Symbol whose DEFINE entry holds the fragment.
        symbol: String,
        /// The fragment text.
        fragment: String,
    },
    /// A quantifier could not be interpreted and its operand was expanded
    /// once instead.
    DegradedQuantifier {
        /// Description of the unrecognized quantifier.
        message: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AmbiguousAnchorOrder { pattern } => write!(
                f,
                "special pattern [{}] repeats a symbol; anchor order taken as given",
                display_pattern(pattern)
            ),
            Self::AdditionalWindowIgnored { symbol, fragment } => write!(
                f,
                "additional window condition on {symbol} kept as a plain predicate: {fragment}"
            ),
            Self::DegradedQuantifier { message } => {
                write!(f, "unrecognized quantifier, expanded once: {message}")
            }
        }
    }
}
