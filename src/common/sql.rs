// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/duckdb-behavioral)

//! Text-level helpers for DEFINE predicate fragments.
//!
//! Fragments arrive as SQL text. These helpers lex them just far enough to
//! tell identifiers, literals, and punctuation apart, which is all that
//! qualification, reference analysis, and conjunct splitting need. Every
//! function is pure and takes its inputs explicitly.

use regex::Regex;

/// SQL words that are never column references.
const KEYWORDS: &[&str] = &[
    "ALL", "AND", "ANY", "AS", "ASC", "AT", "BETWEEN", "BIGINT", "BOOLEAN", "BOTH", "CASE", "CAST",
    "CENTURY", "CHAR", "COLLATE", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "DATE",
    "DAY", "DAYS", "DECADE", "DECIMAL", "DESC", "DISTINCT", "DOUBLE", "ELSE", "END", "ESCAPE",
    "EXISTS", "FALSE", "FLOAT", "FOR", "FROM", "HOUR", "HOURS", "HUGEINT", "ILIKE", "IN", "INT",
    "INTEGER", "INTERVAL", "IS", "LEADING", "LIKE", "MICROSECOND", "MICROSECONDS", "MILLENNIUM",
    "MILLISECOND", "MILLISECONDS", "MINUTE", "MINUTES", "MONTH", "MONTHS", "NOT", "NULL", "NULLS",
    "NUMERIC", "OR", "PRECISION", "QUARTER", "QUARTERS", "REAL", "SECOND", "SECONDS", "SIMILAR",
    "SMALLINT", "SOME", "TEXT", "THEN", "TIME", "TIMESTAMP", "TIMESTAMPTZ", "TINYINT", "TO",
    "TRAILING", "TRUE", "TRY_CAST", "UBIGINT", "UINTEGER", "USMALLINT", "UTINYINT", "VARCHAR",
    "WEEK", "WEEKS", "WHEN", "WITH", "WITHOUT", "YEAR", "YEARS", "ZONE",
];

/// Row navigation functions. A fragment calling one of these depends on rows
/// other than the one it is evaluated on.
const NAVIGATION_FUNCTIONS: &[&str] = &[
    "PREV",
    "NEXT",
    "FIRST",
    "LAST",
    "LAG",
    "LEAD",
    "FIRST_VALUE",
    "LAST_VALUE",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Word,
    QuotedIdent,
    Number,
    Str,
    Dot,
    OpenParen,
    CloseParen,
    Space,
    Other,
}

#[derive(Debug, Clone, Copy)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

impl Token {
    fn text(self, source: &str) -> &str {
        &source[self.start..self.end]
    }

    fn is_word(self, source: &str, word: &str) -> bool {
        self.kind == TokenKind::Word && self.text(source).eq_ignore_ascii_case(word)
    }
}

// Bytes >= 0x80 count as word bytes so token boundaries never split a UTF-8
// sequence.
const fn is_word_byte(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c >= 0x80
}

fn tokenize(text: &str) -> Vec<Token> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let start = pos;
        let c = bytes[pos];
        let kind = match c {
            b'\'' | b'"' => {
                pos = scan_quoted(bytes, pos, c);
                if c == b'\'' {
                    TokenKind::Str
                } else {
                    TokenKind::QuotedIdent
                }
            }
            b'0'..=b'9' => {
                pos = scan_number(bytes, pos);
                TokenKind::Number
            }
            b'.' if bytes.get(pos + 1).is_some_and(u8::is_ascii_digit) => {
                pos = scan_number(bytes, pos);
                TokenKind::Number
            }
            c if is_word_byte(c) => {
                while pos < bytes.len() && is_word_byte(bytes[pos]) {
                    pos += 1;
                }
                TokenKind::Word
            }
            c if c.is_ascii_whitespace() => {
                while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                    pos += 1;
                }
                TokenKind::Space
            }
            b'.' => {
                pos += 1;
                TokenKind::Dot
            }
            b'(' => {
                pos += 1;
                TokenKind::OpenParen
            }
            b')' => {
                pos += 1;
                TokenKind::CloseParen
            }
            _ => {
                pos += 1;
                TokenKind::Other
            }
        };
        tokens.push(Token {
            kind,
            start,
            end: pos,
        });
    }
    tokens
}

/// Scans a quoted run starting at `pos`; a doubled quote is an escape.
/// Unterminated quotes run to the end of input.
fn scan_quoted(bytes: &[u8], mut pos: usize, quote: u8) -> usize {
    pos += 1;
    while pos < bytes.len() {
        if bytes[pos] == quote {
            if bytes.get(pos + 1) == Some(&quote) {
                pos += 2;
                continue;
            }
            return pos + 1;
        }
        pos += 1;
    }
    pos
}

fn scan_number(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'.') {
        pos += 1;
    }
    if pos < bytes.len() && (bytes[pos] == b'e' || bytes[pos] == b'E') {
        let mut exp = pos + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        if exp < bytes.len() && bytes[exp].is_ascii_digit() {
            pos = exp;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
        }
    }
    pos
}

/// Nearest non-space token before `idx`.
fn prev_significant(tokens: &[Token], idx: usize) -> Option<Token> {
    tokens[..idx]
        .iter()
        .rev()
        .find(|t| t.kind != TokenKind::Space)
        .copied()
}

/// Nearest non-space token after `idx`.
fn next_significant(tokens: &[Token], idx: usize) -> Option<Token> {
    tokens[idx + 1..]
        .iter()
        .find(|t| t.kind != TokenKind::Space)
        .copied()
}

fn is_keyword(word: &str) -> bool {
    KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
}

/// Whether the word at `idx` names a type, collation, or interval unit:
/// `CAST(x AS t)`, `x::t`, `x COLLATE c`, `INTERVAL '1' u`.
fn names_type_or_unit(source: &str, tokens: &[Token], idx: usize) -> bool {
    let mut before = tokens[..idx]
        .iter()
        .rev()
        .filter(|t| t.kind != TokenKind::Space);
    let Some(prev) = before.next() else {
        return false;
    };
    match prev.kind {
        TokenKind::Word => prev.is_word(source, "AS") || prev.is_word(source, "COLLATE"),
        TokenKind::Other if prev.text(source) == ":" => {
            before.next().is_some_and(|t| t.text(source) == ":")
        }
        TokenKind::Str | TokenKind::Number => {
            before.next().is_some_and(|t| t.is_word(source, "INTERVAL"))
        }
        _ => false,
    }
}

fn unquote(ident: &str) -> String {
    ident.trim_matches('"').replace("\"\"", "\"")
}

/// Qualifiers of every `qualifier.column` reference in `fragment`, in order
/// of appearance. Quoted qualifiers are returned unquoted.
pub fn qualified_references(fragment: &str) -> Vec<String> {
    let tokens = tokenize(fragment);
    let mut out = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        if !matches!(token.kind, TokenKind::Word | TokenKind::QuotedIdent) {
            continue;
        }
        if prev_significant(&tokens, i).is_some_and(|t| t.kind == TokenKind::Dot) {
            continue;
        }
        if next_significant(&tokens, i).is_some_and(|t| t.kind == TokenKind::Dot) {
            out.push(unquote(token.text(fragment)));
        }
    }
    out
}

/// Whether every qualified reference in `fragment` names one of `allowed`.
/// Symbols compare case-insensitively.
pub fn references_only<S: AsRef<str>>(fragment: &str, allowed: &[S]) -> bool {
    qualified_references(fragment).iter().all(|qualifier| {
        allowed
            .iter()
            .any(|a| a.as_ref().eq_ignore_ascii_case(qualifier))
    })
}

/// Whether `fragment` calls a row navigation function such as `PREV(...)`.
pub fn calls_navigation(fragment: &str) -> bool {
    let tokens = tokenize(fragment);
    tokens.iter().enumerate().any(|(i, token)| {
        token.kind == TokenKind::Word
            && NAVIGATION_FUNCTIONS
                .iter()
                .any(|f| token.is_word(fragment, f))
            && next_significant(&tokens, i).is_some_and(|t| t.kind == TokenKind::OpenParen)
    })
}

/// Qualifies every bare column reference in `fragment` with `symbol.`.
///
/// A word is left alone when it is a SQL keyword, a function name (followed
/// by `(`), a qualifier (followed by `.`), or already qualified (preceded by
/// `.`). Type names after `AS` or `::`, collations, and the unit of an
/// `INTERVAL` literal are left alone too. Literals are never touched.
///
/// ```
/// use prefilter::common::sql::qualify_columns;
///
/// assert_eq!(
///     qualify_columns("price > cost AND B.x IS NOT NULL", "A"),
///     "A.price > A.cost AND B.x IS NOT NULL"
/// );
/// ```
pub fn qualify_columns(fragment: &str, symbol: &str) -> String {
    let tokens = tokenize(fragment);
    let mut out = String::with_capacity(fragment.len() + 8);
    for (i, token) in tokens.iter().enumerate() {
        let text = token.text(fragment);
        let bare = match token.kind {
            TokenKind::Word => !is_keyword(text) && !names_type_or_unit(fragment, &tokens, i),
            TokenKind::QuotedIdent => true,
            _ => false,
        };
        let qualify = bare
            && !prev_significant(&tokens, i).is_some_and(|t| t.kind == TokenKind::Dot)
            && !next_significant(&tokens, i)
                .is_some_and(|t| matches!(t.kind, TokenKind::Dot | TokenKind::OpenParen));
        if qualify {
            out.push_str(symbol);
            out.push('.');
        }
        out.push_str(text);
    }
    out
}

/// Renames the qualifier `from` to `to` in every `from.column` reference.
/// Qualifiers compare case-insensitively; everything else is kept as written.
///
/// ```
/// use prefilter::common::sql::requalify;
///
/// assert_eq!(requalify("z.kind = 'Z.x' AND M.v > Z.v", "Z", "Z_2"), "Z_2.kind = 'Z.x' AND M.v > Z_2.v");
/// ```
pub fn requalify(fragment: &str, from: &str, to: &str) -> String {
    let tokens = tokenize(fragment);
    let mut out = String::with_capacity(fragment.len() + to.len());
    for (i, token) in tokens.iter().enumerate() {
        let text = token.text(fragment);
        let rename = matches!(token.kind, TokenKind::Word | TokenKind::QuotedIdent)
            && !prev_significant(&tokens, i).is_some_and(|t| t.kind == TokenKind::Dot)
            && next_significant(&tokens, i).is_some_and(|t| t.kind == TokenKind::Dot)
            && unquote(text).eq_ignore_ascii_case(from);
        out.push_str(if rename { to } else { text });
    }
    out
}

/// Splits a boolean expression on its top-level `AND`s.
///
/// `AND`s nested in parentheses, inside `CASE ... END`, or belonging to a
/// `BETWEEN x AND y` are not split points. Conjuncts are trimmed; empty ones
/// are dropped.
pub fn split_conjuncts(expression: &str) -> Vec<String> {
    let tokens = tokenize(expression);
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut case_depth = 0usize;
    let mut pending_between = 0usize;
    let mut segment_start = 0;

    let push_segment = |out: &mut Vec<String>, start: usize, end: usize| {
        let part = expression[start..end].trim();
        if !part.is_empty() {
            out.push(part.to_string());
        }
    };

    for token in &tokens {
        match token.kind {
            TokenKind::OpenParen => depth += 1,
            TokenKind::CloseParen => depth = depth.saturating_sub(1),
            TokenKind::Word if depth == 0 => {
                if token.is_word(expression, "CASE") {
                    case_depth += 1;
                } else if token.is_word(expression, "END") {
                    case_depth = case_depth.saturating_sub(1);
                } else if case_depth == 0 && token.is_word(expression, "BETWEEN") {
                    pending_between += 1;
                } else if case_depth == 0 && token.is_word(expression, "AND") {
                    if pending_between > 0 {
                        pending_between -= 1;
                    } else {
                        push_segment(&mut out, segment_start, token.start);
                        segment_start = token.end;
                    }
                }
            }
            _ => {}
        }
    }
    push_segment(&mut out, segment_start, expression.len());
    out
}

/// Builds the matcher for `last.attr - first.attr <= window`.
///
/// The window is either an interval literal (`INTERVAL '7' DAY`) or a bare
/// number with an optional unit word. Named groups: `last`, `first`,
/// `window`.
pub fn window_matcher(first: &str, last: &str, order_by: &str) -> Result<Regex, regex::Error> {
    let attr = regex::escape(order_by);
    let pattern = format!(
        r#"(?i)^\s*(?P<last>{last})\s*\.\s*{attr}\s*-\s*(?P<first>{first})\s*\.\s*{attr}\s*<=\s*(?P<window>INTERVAL\s+['"]?-?\d+(?:\.\d+)?['"]?\s+\w+|-?\d+(?:\.\d+)?(?:\s*[A-Za-z_]\w*)?)\s*$"#,
        last = regex::escape(last),
        first = regex::escape(first),
    );
    Regex::new(&pattern)
}
