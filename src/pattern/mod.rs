// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/duckdb-behavioral)

//! Row pattern model, parsing, and expansion.
//!
//! Covers the `PATTERN ( ... )` clause of `MATCH_RECOGNIZE`.
//!
//! # Pattern Syntax
//!
//! ```text
//! A             pattern variable (symbol)
//! A B           concatenation
//! A | B         alternation
//! (A B)         grouping
//! A* A+ A?      zero-or-more, one-or-more, zero-or-one
//! A{n} A{n,m}   bounded repetition ({n,} and {,m} also accepted)
//! PERMUTE(A,B)  every ordering of the arguments
//! {- A -}       exclusion from output
//! ^ $           partition start / end
//! ```

pub mod ast;
pub mod expand;
pub mod parser;
