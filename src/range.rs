// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/duckdb-behavioral)

//! Range bounds for the rows a special pattern can touch.
//!
//! Both strategies share one case analysis on where the anchors sit relative
//! to the special pattern's boundary symbols. With `first`/`last` the anchor
//! endpoints, `W` the window and `attr` the ordering attribute:
//!
//! | Anchors touch | Continuous `(t_s, t_e)` | Bucketed `(bk_s, bk_e)` |
//! |---------------|-------------------------|-------------------------|
//! | both ends | `(first.attr, last.attr)` | `(first.bk, last.bk)` |
//! | last end only | `(last.attr - W, last.attr)` | `(last.bk - 1, last.bk)` |
//! | first end only | `(first.attr, first.attr + W)` | `(first.bk, first.bk + 1)` |
//! | neither | `(last.attr - W, first.attr + W)` | `(last.bk - 1, first.bk + 1)` |
//!
//! A true match spans at most `W`, so every row it binds lies inside the
//! bound. Where an anchor already sits on a pattern boundary no slack is
//! needed on that side.
//!
//! The bucketed strategy indexes rows by `floor(attr / W)`. Because a match
//! can straddle two adjacent buckets, it yields two candidate rows per special
//! pattern: one with every anchor in the same bucket, one with the anchors
//! split across two consecutive buckets. The bucketed strategy always needs
//! `W`, since it is the bucket width.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::error::PrefilterError;
use crate::pattern::expand::SpecialPattern;
use crate::synthesize::{AnchorSequence, SynthesizedConditions};

/// Column holding the bucket index in the bucketized input.
pub const BUCKET_COLUMN: &str = "bk";

/// How range bounds are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeStrategy {
    /// Intervals over the ordering attribute.
    #[default]
    Continuous,
    /// Intervals over a discretized bucket index.
    Bucketed,
}

impl RangeStrategy {
    /// Parses a strategy name.
    ///
    /// Accepts `continuous`/`basic` and `bucketed`/`bucket`, ignoring case.
    /// Returns `None` for unrecognized names.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continuous" | "basic" => Some(Self::Continuous),
            "bucketed" | "bucket" => Some(Self::Bucketed),
            _ => None,
        }
    }
}

impl FromStr for RangeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown range strategy '{s}'"))
    }
}

impl fmt::Display for RangeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continuous => f.write_str("continuous"),
            Self::Bucketed => f.write_str("bucketed"),
        }
    }
}

/// A symbolic range, as SQL expressions over the anchor rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeBound {
    /// Bounds on the ordering attribute.
    Continuous {
        /// `t_s`.
        start: String,
        /// `t_e`.
        end: String,
    },
    /// Bounds on the bucket index.
    Bucketed {
        /// `bk_s`.
        start: String,
        /// `bk_e`.
        end: String,
    },
}

impl RangeBound {
    /// Lower bound expression.
    pub fn start(&self) -> &str {
        match self {
            Self::Continuous { start, .. } | Self::Bucketed { start, .. } => start,
        }
    }

    /// Upper bound expression.
    pub fn end(&self) -> &str {
        match self {
            Self::Continuous { end, .. } | Self::Bucketed { end, .. } => end,
        }
    }

    /// Output column names for the bound pair.
    pub const fn columns(&self) -> (&'static str, &'static str) {
        match self {
            Self::Continuous { .. } => ("t_s", "t_e"),
            Self::Bucketed { .. } => ("bk_s", "bk_e"),
        }
    }
}

/// One candidate row of the ranges relation: a bound plus the predicates the
/// anchor rows must satisfy for it to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRow {
    /// The bound.
    pub bound: RangeBound,
    /// Join and filter predicates over the anchor rows.
    pub conditions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Touches {
    Both,
    Last,
    First,
    Neither,
}

/// Endpoint aliases of the anchors and where the anchors sit.
struct Endpoints {
    first: String,
    last: String,
    touches: Touches,
}

fn endpoints(
    pattern: &SpecialPattern,
    anchors: &AnchorSequence,
) -> Result<Endpoints, PrefilterError> {
    let empty = || PrefilterError::EmptyAnchorSequence {
        pattern: pattern.symbols().to_vec(),
    };
    let (Some(first), Some(last)) = (anchors.first(), anchors.last()) else {
        return Err(empty());
    };
    let (Some(p_first), Some(p_last)) = (pattern.first_symbol(), pattern.last_symbol()) else {
        return Err(empty());
    };
    let touches = match (first == p_first, last == p_last) {
        (true, true) => Touches::Both,
        (false, true) => Touches::Last,
        (true, false) => Touches::First,
        (false, false) => Touches::Neither,
    };
    let aliases = anchors.aliases();
    let (Some(first), Some(last)) = (aliases.first(), aliases.last()) else {
        return Err(empty());
    };
    Ok(Endpoints {
        first: first.clone(),
        last: last.clone(),
        touches,
    })
}

fn missing_window(pattern: &SpecialPattern) -> PrefilterError {
    PrefilterError::MissingWindow {
        pattern: pattern.symbols().to_vec(),
    }
}

/// Continuous range `(t_s, t_e)` over `order_by`.
///
/// # Errors
///
/// [`PrefilterError::MissingWindow`] when the anchors do not touch both
/// pattern boundaries and `window` is `None`.
///
/// # Examples
///
/// ```
/// use prefilter::pattern::expand::SpecialPattern;
/// use prefilter::range::continuous_range;
/// use prefilter::synthesize::AnchorSequence;
///
/// let pattern = SpecialPattern::new(["A", "B", "C"]);
/// let bound = continuous_range(&pattern, &AnchorSequence::new(["A", "B"]), "ts", Some("5")).unwrap();
/// assert_eq!(bound.start(), "A.ts");
/// assert_eq!(bound.end(), "A.ts + 5");
/// ```
pub fn continuous_range(
    pattern: &SpecialPattern,
    anchors: &AnchorSequence,
    order_by: &str,
    window: Option<&str>,
) -> Result<RangeBound, PrefilterError> {
    let Endpoints {
        first,
        last,
        touches,
    } = endpoints(pattern, anchors)?;
    let (start, end) = match (touches, window) {
        (Touches::Both, _) => (format!("{first}.{order_by}"), format!("{last}.{order_by}")),
        (Touches::Last, Some(w)) => (
            format!("{last}.{order_by} - {w}"),
            format!("{last}.{order_by}"),
        ),
        (Touches::First, Some(w)) => (
            format!("{first}.{order_by}"),
            format!("{first}.{order_by} + {w}"),
        ),
        (Touches::Neither, Some(w)) => (
            format!("{last}.{order_by} - {w}"),
            format!("{first}.{order_by} + {w}"),
        ),
        (_, None) => return Err(missing_window(pattern)),
    };
    Ok(RangeBound::Continuous { start, end })
}

/// Bucketed range `(bk_s, bk_e)` over [`BUCKET_COLUMN`].
///
/// # Errors
///
/// [`PrefilterError::MissingWindow`] when `window` is `None`; the window is
/// the bucket width.
pub fn bucket_range(
    pattern: &SpecialPattern,
    anchors: &AnchorSequence,
    window: Option<&str>,
) -> Result<RangeBound, PrefilterError> {
    let Endpoints {
        first,
        last,
        touches,
    } = endpoints(pattern, anchors)?;
    if window.is_none() {
        return Err(missing_window(pattern));
    }
    let bk = BUCKET_COLUMN;
    let (start, end) = match touches {
        Touches::Both => (format!("{first}.{bk}"), format!("{last}.{bk}")),
        Touches::Last => (format!("{last}.{bk} - 1"), format!("{last}.{bk}")),
        Touches::First => (format!("{first}.{bk}"), format!("{first}.{bk} + 1")),
        Touches::Neither => (format!("{last}.{bk} - 1"), format!("{first}.{bk} + 1")),
    };
    Ok(RangeBound::Bucketed { start, end })
}

/// Candidate range rows for one synthesized special pattern.
///
/// Continuous yields one row carrying the synthesized conditions. Bucketed
/// yields the same-bucket row and, for two or more anchors, the two-bucket
/// row.
///
/// # Errors
///
/// [`PrefilterError::MissingWindow`] as for [`continuous_range`] and
/// [`bucket_range`].
pub fn build_range_rows(
    strategy: RangeStrategy,
    pattern: &SpecialPattern,
    synthesized: &SynthesizedConditions,
    order_by: &str,
) -> Result<Vec<RangeRow>, PrefilterError> {
    let anchors = &synthesized.anchors;
    let window = synthesized.window_expression();
    let rows = match strategy {
        RangeStrategy::Continuous => vec![RangeRow {
            bound: continuous_range(pattern, anchors, order_by, window)?,
            conditions: synthesized.conditions.clone(),
        }],
        RangeStrategy::Bucketed => {
            let bound = bucket_range(pattern, anchors, window)?;
            bucket_rows(bound, &anchors.aliases(), &synthesized.conditions)
        }
    };
    debug!(
        pattern = %pattern,
        strategy = %strategy,
        rows = rows.len(),
        "built range rows"
    );
    Ok(rows)
}

fn bucket_rows(bound: RangeBound, aliases: &[String], conditions: &[String]) -> Vec<RangeRow> {
    let bk = BUCKET_COLUMN;
    let [first, rest @ ..] = aliases else {
        return Vec::new();
    };

    let same_bucket = rest
        .iter()
        .map(|s| format!("{first}.{bk} = {s}.{bk}"))
        .chain(conditions.iter().cloned())
        .collect();
    let mut rows = vec![RangeRow {
        bound: bound.clone(),
        conditions: same_bucket,
    }];

    let Some(last) = rest.last() else {
        return rows;
    };
    let mut split = vec![format!("{first}.{bk} + 1 = {last}.{bk}")];
    if aliases.len() > 2 {
        split.extend(
            aliases
                .windows(2)
                .map(|pair| format!("{}.{bk} <= {}.{bk}", pair[0], pair[1])),
        );
    }
    split.extend(conditions.iter().cloned());
    rows.push(RangeRow {
        bound,
        conditions: split,
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::define::DefineClause;
    use crate::synthesize::synthesize;

    fn abc() -> SpecialPattern {
        SpecialPattern::new(["A", "B", "C"])
    }

    fn anchors(symbols: &[&str]) -> AnchorSequence {
        AnchorSequence::new(symbols.iter().copied())
    }

    #[test]
    fn test_continuous_both_boundaries_needs_no_window() {
        let bound = continuous_range(&abc(), &anchors(&["A", "C"]), "ts", None).unwrap();
        assert_eq!(
            bound,
            RangeBound::Continuous {
                start: "A.ts".into(),
                end: "C.ts".into()
            }
        );
    }

    #[test]
    fn test_continuous_last_only() {
        let bound = continuous_range(&abc(), &anchors(&["B", "C"]), "ts", Some("INTERVAL '7' DAY"))
            .unwrap();
        assert_eq!(bound.start(), "C.ts - INTERVAL '7' DAY");
        assert_eq!(bound.end(), "C.ts");
    }

    #[test]
    fn test_continuous_first_only() {
        let bound = continuous_range(&abc(), &anchors(&["A", "B"]), "ts", Some("5")).unwrap();
        assert_eq!(bound.start(), "A.ts");
        assert_eq!(bound.end(), "A.ts + 5");
    }

    #[test]
    fn test_continuous_neither() {
        let bound = continuous_range(&abc(), &anchors(&["B"]), "ts", Some("5")).unwrap();
        assert_eq!(bound.start(), "B.ts - 5");
        assert_eq!(bound.end(), "B.ts + 5");
    }

    #[test]
    fn test_continuous_missing_window_is_fatal() {
        let err = continuous_range(&abc(), &anchors(&["B"]), "ts", None).unwrap_err();
        assert_eq!(
            err,
            PrefilterError::MissingWindow {
                pattern: vec!["A".into(), "B".into(), "C".into()]
            }
        );
    }

    #[test]
    fn test_bucket_cases() {
        let w = Some("5");
        let cases = [
            (&["A", "C"][..], "A.bk", "C.bk"),
            (&["B", "C"][..], "C.bk - 1", "C.bk"),
            (&["A", "B"][..], "A.bk", "A.bk + 1"),
            (&["B"][..], "B.bk - 1", "B.bk + 1"),
        ];
        for (anchor, start, end) in cases {
            let bound = bucket_range(&abc(), &anchors(anchor), w).unwrap();
            assert_eq!(bound.start(), start, "anchors {anchor:?}");
            assert_eq!(bound.end(), end, "anchors {anchor:?}");
            assert_eq!(bound.columns(), ("bk_s", "bk_e"));
        }
    }

    #[test]
    fn test_bucket_always_requires_window() {
        let err = bucket_range(&abc(), &anchors(&["A", "C"]), None).unwrap_err();
        assert!(matches!(err, PrefilterError::MissingWindow { .. }));
    }

    #[test]
    fn test_empty_anchor_rejected() {
        let err = continuous_range(&abc(), &AnchorSequence::default(), "ts", Some("1")).unwrap_err();
        assert!(matches!(err, PrefilterError::EmptyAnchorSequence { .. }));
    }

    #[test]
    fn test_bucket_rows_single_anchor() {
        let define = DefineClause::from_expressions([
            ("A", "x > 0"),
            ("B", "x > 1"),
            ("C", "C.ts - A.ts <= 5"),
        ]);
        let synthesized = synthesize(&abc(), &define, "ts", &anchors(&["B"])).unwrap();
        let rows = build_range_rows(RangeStrategy::Bucketed, &abc(), &synthesized, "ts").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].conditions, ["B.x > 1", "B.ts - B.ts <= 5"]);
    }

    #[test]
    fn test_bucket_rows_split_across_two_buckets() {
        let define = DefineClause::from_expressions([
            ("A", "x > 0"),
            ("B", "x > 1"),
            ("C", "C.ts - A.ts <= 5"),
        ]);
        let synthesized = synthesize(&abc(), &define, "ts", &anchors(&["A", "B", "C"])).unwrap();
        let rows = build_range_rows(RangeStrategy::Bucketed, &abc(), &synthesized, "ts").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0].conditions[..2], ["A.bk = B.bk", "A.bk = C.bk"]);
        assert_eq!(
            &rows[1].conditions[..3],
            ["A.bk + 1 = C.bk", "A.bk <= B.bk", "B.bk <= C.bk"]
        );
        assert_eq!(rows[0].bound, rows[1].bound);
    }

    #[test]
    fn test_repeated_anchor_bounds_use_each_position() {
        let zmz = SpecialPattern::new(["Z", "M", "Z"]);
        let define = DefineClause::from_expressions([
            ("Z", "kind = 'z' AND Z.ts - Z.ts <= 5"),
            ("M", "kind = 'm'"),
        ]);
        let synthesized = synthesize(&zmz, &define, "ts", &anchors(&["Z", "M", "Z"])).unwrap();

        let rows = build_range_rows(RangeStrategy::Continuous, &zmz, &synthesized, "ts").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].bound.start(), "Z.ts");
        assert_eq!(rows[0].bound.end(), "Z_2.ts");

        let rows = build_range_rows(RangeStrategy::Bucketed, &zmz, &synthesized, "ts").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].bound.start(), "Z.bk");
        assert_eq!(rows[0].bound.end(), "Z_2.bk");
        assert_eq!(&rows[0].conditions[..2], ["Z.bk = M.bk", "Z.bk = Z_2.bk"]);
        assert_eq!(
            &rows[1].conditions[..3],
            ["Z.bk + 1 = Z_2.bk", "Z.bk <= M.bk", "M.bk <= Z_2.bk"]
        );
    }

    #[test]
    fn test_bucket_rows_two_anchors_no_chain() {
        let define = DefineClause::from_expressions([("A", "x > 0"), ("B", "B.ts - A.ts <= 5")]);
        let pattern = SpecialPattern::new(["A", "B"]);
        let synthesized = synthesize(&pattern, &define, "ts", &anchors(&["A", "B"])).unwrap();
        let rows = build_range_rows(RangeStrategy::Bucketed, &pattern, &synthesized, "ts").unwrap();
        assert_eq!(
            rows[1].conditions,
            ["A.bk + 1 = B.bk", "A.ts <= B.ts", "A.x > 0", "B.ts - A.ts <= 5"]
        );
    }

    #[test]
    fn test_continuous_rows_carry_conditions() {
        let define = DefineClause::from_expressions([("A", "x > 0"), ("B", "B.ts - A.ts <= 5")]);
        let pattern = SpecialPattern::new(["A", "B"]);
        let synthesized = synthesize(&pattern, &define, "ts", &anchors(&["A", "B"])).unwrap();
        let rows =
            build_range_rows(RangeStrategy::Continuous, &pattern, &synthesized, "ts").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].conditions, synthesized.conditions);
        assert_eq!(rows[0].bound.columns(), ("t_s", "t_e"));
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!(RangeStrategy::parse("basic"), Some(RangeStrategy::Continuous));
        assert_eq!(RangeStrategy::parse(" Bucket "), Some(RangeStrategy::Bucketed));
        assert_eq!(RangeStrategy::parse("nope"), None);
        assert_eq!(RangeStrategy::parse("bucketized"), None);
        assert!("nope".parse::<RangeStrategy>().is_err());
        assert_eq!(
            "continuous".parse::<RangeStrategy>(),
            Ok(RangeStrategy::Continuous)
        );
    }
}
