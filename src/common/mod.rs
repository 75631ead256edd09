// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/duckdb-behavioral)

//! Helpers shared across the prefilter pipeline stages.

pub mod sql;
