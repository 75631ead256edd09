// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/duckdb-behavioral)

//! Prefilter planning and query assembly.
//!
//! [`Rewriter::plan`] runs the whole pipeline for one `MATCH_RECOGNIZE`
//! clause: expand the pattern, then for every non-empty special pattern ask
//! the caller for an anchor sequence, synthesize conditions, and build range
//! rows. A fatal error for one special pattern skips that pattern only.
//!
//! The resulting [`PrefilterPlan`] renders as common table expressions placed
//! ahead of the original clause:
//!
//! ```sql
//! WITH ranges AS (
//!     SELECT A.ts AS t_s, C.ts AS t_e FROM events AS A, events AS C WHERE ...
//!     UNION
//!     ...
//! ),
//! prefilter AS (
//!     SELECT DISTINCT events.* FROM events, ranges AS r
//!     WHERE ts BETWEEN r.t_s AND r.t_e
//! )
//! SELECT * FROM prefilter MATCH_RECOGNIZE ( ... )
//! ```
//!
//! The bucketed strategy adds `input_bucketized` (rows tagged with
//! `bk = floor(ts / W)`) and `buckets` (every bucket index covered by a range
//! row, via `UNNEST(sequence(bk_s, bk_e))`).

use std::fmt;

use itertools::Itertools;
use tracing::{debug, warn};

use crate::define::DefineClause;
use crate::error::{Diagnostic, PrefilterError};
use crate::pattern::ast::PatternNode;
use crate::pattern::expand::{expand_with_diagnostics, SpecialPattern};
use crate::range::{build_range_rows, RangeRow, RangeStrategy, BUCKET_COLUMN};
use crate::synthesize::{synthesize, AnchorSequence, SynthesizedConditions};

/// Name of the CTE holding candidate ranges.
pub const RANGES_CTE: &str = "ranges";
/// Name of the CTE holding the input tagged with its bucket index.
pub const INPUT_BUCKETIZED_CTE: &str = "input_bucketized";
/// Name of the CTE holding every bucket index covered by a range.
pub const BUCKETS_CTE: &str = "buckets";
/// Name of the CTE holding the filtered input.
pub const PREFILTER_CTE: &str = "prefilter";

/// Where the input lives and how ranges are expressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefilterConfig {
    /// Input relation the `MATCH_RECOGNIZE` clause reads.
    pub dataset: String,
    /// The single ordering attribute of the clause.
    pub order_by: String,
    /// Range strategy.
    pub strategy: RangeStrategy,
}

impl PrefilterConfig {
    /// A continuous-strategy configuration.
    pub fn new(dataset: impl Into<String>, order_by: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            order_by: order_by.into(),
            strategy: RangeStrategy::default(),
        }
    }

    /// Replaces the input relation.
    #[must_use]
    pub fn with_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = dataset.into();
        self
    }

    /// Replaces the ordering attribute.
    #[must_use]
    pub fn with_order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = order_by.into();
        self
    }

    /// Replaces the range strategy.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: RangeStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// One special pattern that produced range rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedPattern {
    /// The special pattern.
    pub pattern: SpecialPattern,
    /// Synthesized conditions for its anchor sequence.
    pub synthesized: SynthesizedConditions,
    /// Candidate range rows.
    pub rows: Vec<RangeRow>,
}

/// A special pattern left out of the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPattern {
    /// The special pattern.
    pub pattern: SpecialPattern,
    /// Why it was skipped.
    pub error: PrefilterError,
}

/// A named common table expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cte {
    /// CTE name.
    pub name: &'static str,
    /// The query inside the parentheses.
    pub body: String,
}

impl fmt::Display for Cte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} AS (\n{}\n)", self.name, self.body)
    }
}

/// Result of planning a prefilter for one pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefilterPlan {
    config: PrefilterConfig,
    bucket_width: Option<String>,
    /// Special patterns with range rows, in expansion order.
    pub entries: Vec<PlannedPattern>,
    /// Special patterns skipped after a fatal error.
    pub skipped: Vec<SkippedPattern>,
    /// Non-fatal findings from expansion and synthesis.
    pub diagnostics: Vec<Diagnostic>,
}

impl PrefilterPlan {
    /// The configuration the plan was built with.
    pub const fn config(&self) -> &PrefilterConfig {
        &self.config
    }

    /// Bucket width of a bucketed plan.
    pub fn bucket_width(&self) -> Option<&str> {
        self.bucket_width.as_deref()
    }

    /// Whether no special pattern produced a range row.
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|e| e.rows.is_empty())
    }

    /// The common table expressions, in dependency order.
    ///
    /// # Errors
    ///
    /// [`PrefilterError::NoRangeRows`] when the plan is empty.
    pub fn ctes(&self) -> Result<Vec<Cte>, PrefilterError> {
        if self.is_empty() {
            return Err(PrefilterError::NoRangeRows);
        }
        let ranges = Cte {
            name: RANGES_CTE,
            body: self
                .entries
                .iter()
                .flat_map(|entry| entry.rows.iter().map(move |row| self.render_row(entry, row)))
                .join("\n\n\tUNION\n\n"),
        };
        let ds = &self.config.dataset;
        let attr = &self.config.order_by;

        match (self.config.strategy, self.bucket_width.as_deref()) {
            (RangeStrategy::Bucketed, Some(width)) => Ok(vec![
                Cte {
                    name: INPUT_BUCKETIZED_CTE,
                    body: format!(
                        "\tSELECT *, CAST(FLOOR({attr} / {width}) AS BIGINT) AS {BUCKET_COLUMN}\n\tFROM {ds}"
                    ),
                },
                ranges,
                Cte {
                    name: BUCKETS_CTE,
                    body: format!(
                        "\tSELECT DISTINCT {BUCKET_COLUMN} FROM {RANGES_CTE}\n\t\
                         CROSS JOIN UNNEST(sequence({RANGES_CTE}.bk_s, {RANGES_CTE}.bk_e)) AS t({BUCKET_COLUMN})"
                    ),
                },
                Cte {
                    name: PREFILTER_CTE,
                    body: format!(
                        "\tSELECT i.* FROM {INPUT_BUCKETIZED_CTE} AS i, {BUCKETS_CTE} AS b\n\t\
                         WHERE i.{BUCKET_COLUMN} = b.{BUCKET_COLUMN}"
                    ),
                },
            ]),
            // A bucketed entry without a window is skipped with MissingWindow,
            // so a non-empty bucketed plan always has a width.
            (RangeStrategy::Bucketed, None) => Err(PrefilterError::NoRangeRows),
            (RangeStrategy::Continuous, _) => Ok(vec![
                ranges,
                Cte {
                    name: PREFILTER_CTE,
                    body: format!(
                        "\tSELECT DISTINCT {ds}.* FROM {ds}, {RANGES_CTE} AS r\n\t\
                         WHERE {attr} BETWEEN r.t_s AND r.t_e"
                    ),
                },
            ]),
        }
    }

    /// The `WITH` clause holding every CTE.
    ///
    /// # Errors
    ///
    /// [`PrefilterError::NoRangeRows`] when the plan is empty.
    pub fn with_clause(&self) -> Result<String, PrefilterError> {
        Ok(format!("WITH {}", self.ctes()?.iter().join(",\n")))
    }

    /// The filtered input alone: `WITH ... SELECT * FROM prefilter`.
    ///
    /// # Errors
    ///
    /// [`PrefilterError::NoRangeRows`] when the plan is empty.
    pub fn to_prefilter_query(&self) -> Result<String, PrefilterError> {
        Ok(format!("{}\nSELECT * FROM {PREFILTER_CTE}", self.with_clause()?))
    }

    /// The rewritten query, running `mr_body` (the text inside the original
    /// `MATCH_RECOGNIZE ( ... )`) over the prefiltered input.
    ///
    /// # Errors
    ///
    /// [`PrefilterError::NoRangeRows`] when the plan is empty.
    pub fn to_query(&self, mr_body: &str) -> Result<String, PrefilterError> {
        Ok(format!(
            "{}\nSELECT * FROM {PREFILTER_CTE} MATCH_RECOGNIZE (\n\t{}\n)",
            self.with_clause()?,
            mr_body.trim()
        ))
    }

    fn render_row(&self, entry: &PlannedPattern, row: &RangeRow) -> String {
        let source = match self.config.strategy {
            RangeStrategy::Continuous => self.config.dataset.as_str(),
            RangeStrategy::Bucketed => INPUT_BUCKETIZED_CTE,
        };
        let (start_col, end_col) = row.bound.columns();
        // One alias per anchor position; a repeated symbol binds two rows.
        let aliases = entry.synthesized.anchors.aliases();
        let mut sql = format!(
            "\tSELECT {} AS {start_col}, {} AS {end_col}\t-- pattern: {}; anchors: {}\n\tFROM {}",
            row.bound.start(),
            row.bound.end(),
            entry.pattern,
            entry.synthesized.anchors,
            aliases.iter().map(|a| format!("{source} AS {a}")).join(", "),
        );
        if !row.conditions.is_empty() {
            sql.push_str("\n\tWHERE ");
            sql.push_str(&row.conditions.join("\n\t\tAND "));
        }
        sql
    }
}

/// Builds prefilter plans against one DEFINE clause.
#[derive(Debug, Clone)]
pub struct Rewriter {
    config: PrefilterConfig,
    define: DefineClause,
}

impl Rewriter {
    /// Creates a rewriter.
    pub const fn new(config: PrefilterConfig, define: DefineClause) -> Self {
        Self { config, define }
    }

    /// The configuration in use.
    pub const fn config(&self) -> &PrefilterConfig {
        &self.config
    }

    /// The DEFINE clause in use.
    pub const fn define(&self) -> &DefineClause {
        &self.define
    }

    /// Plans a prefilter for `node`.
    ///
    /// `select_anchors` is called once per non-empty special pattern, in
    /// expansion order; [`AnchorSequence::boundary`] is a reasonable default.
    ///
    /// # Errors
    ///
    /// [`PrefilterError::MalformedPattern`] when the pattern cannot be
    /// expanded. Errors for individual special patterns are collected in
    /// [`PrefilterPlan::skipped`] instead.
    ///
    /// # Examples
    ///
    /// ```
    /// use prefilter::define::DefineClause;
    /// use prefilter::pattern::parser::parse_pattern;
    /// use prefilter::rewrite::{PrefilterConfig, Rewriter};
    /// use prefilter::synthesize::AnchorSequence;
    ///
    /// let define = DefineClause::from_expressions([
    ///     ("A", "price < 10"),
    ///     ("B", "price > A.price AND B.ts - A.ts <= 60"),
    /// ]);
    /// let rewriter = Rewriter::new(PrefilterConfig::new("quotes", "ts"), define);
    /// let node = parse_pattern("A B+").unwrap();
    /// let plan = rewriter.plan(&node, AnchorSequence::boundary).unwrap();
    /// assert_eq!(plan.entries.len(), 1);
    /// assert!(plan.to_query("PATTERN (A B+) DEFINE ...").unwrap().starts_with("WITH ranges AS ("));
    /// ```
    pub fn plan<F>(
        &self,
        node: &PatternNode,
        mut select_anchors: F,
    ) -> Result<PrefilterPlan, PrefilterError>
    where
        F: FnMut(&SpecialPattern) -> AnchorSequence,
    {
        let expansion = expand_with_diagnostics(node)?;
        let mut plan = PrefilterPlan {
            config: self.config.clone(),
            bucket_width: None,
            entries: Vec::new(),
            skipped: Vec::new(),
            diagnostics: expansion.diagnostics,
        };

        for pattern in expansion.patterns {
            if pattern.is_empty() {
                debug!("skipping empty special pattern");
                continue;
            }
            let anchors = select_anchors(&pattern);
            match self.plan_one(&pattern, &anchors, plan.bucket_width.as_deref()) {
                Ok(entry) => {
                    if plan.bucket_width.is_none() && self.config.strategy == RangeStrategy::Bucketed {
                        plan.bucket_width = entry.synthesized.window_expression().map(str::to_string);
                    }
                    plan.diagnostics
                        .extend(entry.synthesized.diagnostics.iter().cloned());
                    plan.entries.push(entry);
                }
                Err(error) => {
                    warn!(pattern = %pattern, %error, "skipping special pattern");
                    plan.skipped.push(SkippedPattern { pattern, error });
                }
            }
        }

        debug!(
            planned = plan.entries.len(),
            skipped = plan.skipped.len(),
            strategy = %self.config.strategy,
            "planned prefilter"
        );
        Ok(plan)
    }

    fn plan_one(
        &self,
        pattern: &SpecialPattern,
        anchors: &AnchorSequence,
        bucket_width: Option<&str>,
    ) -> Result<PlannedPattern, PrefilterError> {
        let synthesized = synthesize(pattern, &self.define, &self.config.order_by, anchors)?;
        let rows = build_range_rows(
            self.config.strategy,
            pattern,
            &synthesized,
            &self.config.order_by,
        )?;
        if let (Some(expected), Some(found)) = (bucket_width, synthesized.window_expression()) {
            if !same_sql_text(expected, found) {
                return Err(PrefilterError::InconsistentBucketWidth {
                    pattern: pattern.symbols().to_vec(),
                    expected: expected.to_string(),
                    found: found.to_string(),
                });
            }
        }
        Ok(PlannedPattern {
            pattern: pattern.clone(),
            synthesized,
            rows,
        })
    }
}

/// Equality up to whitespace runs and keyword case.
fn same_sql_text(a: &str, b: &str) -> bool {
    a.split_whitespace()
        .map(str::to_ascii_lowercase)
        .eq(b.split_whitespace().map(str::to_ascii_lowercase))
}
