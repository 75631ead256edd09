// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/duckdb-behavioral)

//! # `prefilter`: Prefilters for `MATCH_RECOGNIZE` Queries
//!
//! Row pattern matching is expensive: the engine replays every partition
//! through an automaton. This crate derives a cheaper query that keeps only
//! rows which can take part in a match, so the pattern engine sees less input.
//!
//! ## Pipeline
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | Pattern model | [`pattern::ast`], [`pattern::parser`] | `PatternNode` tree |
//! | Expansion | [`pattern::expand`] | finite special patterns |
//! | Predicate store | [`define`] | per-symbol conjuncts |
//! | Synthesis | [`synthesize`] | anchor predicates and window bound |
//! | Range building | [`range`] | continuous or bucketed range rows |
//! | Assembly | [`rewrite`] | `WITH ranges ..., prefilter ...` CTEs |
//!
//! ## Example
//!
//! ```
//! use prefilter::{parse_pattern, AnchorSequence, DefineClause, PrefilterConfig, Rewriter};
//!
//! let define = DefineClause::from_expressions([
//!     ("A", "price < 10"),
//!     ("B", "price > A.price"),
//!     ("C", "price > B.price AND C.ts - A.ts <= INTERVAL '7' DAY"),
//! ]);
//! let rewriter = Rewriter::new(PrefilterConfig::new("quotes", "ts"), define);
//! let plan = rewriter
//!     .plan(&parse_pattern("A B+ C").unwrap(), AnchorSequence::boundary)
//!     .unwrap();
//! let sql = plan.to_query("ORDER BY ts PATTERN (A B+ C) DEFINE ...").unwrap();
//! assert!(sql.contains("SELECT A.ts AS t_s, C.ts AS t_e"));
//! ```
//!
//! The prefilter is an approximation. Expansion keeps at most one repetition
//! of each quantified subpattern, and predicates that navigate to other rows
//! are dropped rather than translated.

pub mod common;
pub mod define;
pub mod error;
pub mod pattern;
pub mod range;
pub mod rewrite;
pub mod synthesize;

pub use define::DefineClause;
pub use error::{Diagnostic, PrefilterError, UndefinedReason};
pub use pattern::ast::{PatternNode, Quantifier};
pub use pattern::expand::{expand, expand_with_diagnostics, Expansion, SpecialPattern};
pub use pattern::parser::{parse_pattern, PatternError};
pub use range::{RangeBound, RangeRow, RangeStrategy};
pub use rewrite::{PrefilterConfig, PrefilterPlan, Rewriter};
pub use synthesize::{synthesize, AnchorSequence, SynthesizedConditions, Window};
