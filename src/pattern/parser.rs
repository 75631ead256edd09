// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/duckdb-behavioral)

//! Recursive descent parser for `MATCH_RECOGNIZE` row pattern text.
//!
//! Parses the body of a `PATTERN ( ... )` clause such as
//! `(A* B+ | C{2,4})? D* PERMUTE(E, F)` into a [`PatternNode`] tree.
//!
//! Precedence, loosest first: alternation `|`, concatenation (juxtaposition),
//! quantified primary. Reluctant quantifiers (`A*?`) are accepted and read as
//! their greedy form.

use std::fmt;

use super::ast::{PatternNode, Quantifier};

/// Error returned when pattern parsing fails.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct PatternError {
    /// Human-readable error message.
    pub message: String,
    /// Byte position in the input string where the error occurred.
    pub position: usize,
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pattern error at position {}: {}",
            self.position, self.message
        )
    }
}

impl std::error::Error for PatternError {}

/// Parses row pattern text into a [`PatternNode`].
///
/// # Errors
///
/// Returns [`PatternError`] if the pattern text is malformed.
///
/// # Examples
///
/// ```
/// use prefilter::pattern::parser::parse_pattern;
///
/// let node = parse_pattern("A B+ C?").unwrap();
/// assert_eq!(node.to_string(), "A B+ C?");
/// ```
pub fn parse_pattern(input: &str) -> Result<PatternNode, PatternError> {
    let mut parser = Parser::new(input);
    parser.skip_whitespace();
    if parser.at_end() {
        return Err(PatternError {
            message: "empty pattern".to_string(),
            position: 0,
        });
    }
    let node = parser.parse_alternation()?;
    parser.skip_whitespace();
    match parser.peek() {
        None => Ok(node),
        Some(c) => Err(PatternError {
            message: format!("unexpected character '{}'", char::from(c)),
            position: parser.pos,
        }),
    }
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    const fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    fn parse_alternation(&mut self) -> Result<PatternNode, PatternError> {
        let mut node = self.parse_concatenation()?;
        loop {
            self.skip_whitespace();
            if self.peek() != Some(b'|') {
                return Ok(node);
            }
            self.advance();
            let right = self.parse_concatenation()?;
            node = PatternNode::alternation(node, right);
        }
    }

    fn parse_concatenation(&mut self) -> Result<PatternNode, PatternError> {
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match (self.peek(), self.peek_at(1)) {
                (None | Some(b'|' | b')' | b','), _) | (Some(b'-'), Some(b'}')) => break,
                _ => items.push(self.parse_term()?),
            }
        }
        if items.len() == 1 {
            Ok(items.remove(0))
        } else {
            Ok(PatternNode::Concatenation(items))
        }
    }

    fn parse_term(&mut self) -> Result<PatternNode, PatternError> {
        let primary = self.parse_primary()?;
        match self.parse_quantifier()? {
            Some(quantifier) => Ok(primary.quantified(quantifier)),
            None => Ok(primary),
        }
    }

    fn parse_primary(&mut self) -> Result<PatternNode, PatternError> {
        match (self.peek(), self.peek_at(1)) {
            (Some(b'('), _) => {
                self.advance();
                let inner = self.parse_alternation()?;
                self.skip_whitespace();
                self.expect(b')')?;
                Ok(inner.group())
            }
            (Some(b'{'), Some(b'-')) => {
                self.advance();
                self.advance();
                let inner = self.parse_alternation()?;
                self.skip_whitespace();
                self.expect(b'-')?;
                self.expect(b'}')?;
                Ok(inner.excluded())
            }
            (Some(b'^' | b'$'), _) => {
                self.advance();
                Ok(PatternNode::Anchor)
            }
            (Some(c), _) if c.is_ascii_alphabetic() || c == b'_' => {
                let name = self.parse_identifier();
                if name.eq_ignore_ascii_case("PERMUTE") {
                    self.skip_whitespace();
                    if self.peek() == Some(b'(') {
                        return self.parse_permute();
                    }
                }
                Ok(PatternNode::Symbol(name))
            }
            (Some(c), _) => Err(PatternError {
                message: format!("unexpected character '{}'", char::from(c)),
                position: self.pos,
            }),
            (None, _) => Err(PatternError {
                message: "unexpected end of pattern".to_string(),
                position: self.pos,
            }),
        }
    }

    fn parse_permute(&mut self) -> Result<PatternNode, PatternError> {
        self.expect(b'(')?;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            let start = self.pos;
            let item = self.parse_alternation()?;
            if item == PatternNode::Concatenation(Vec::new()) {
                return Err(PatternError {
                    message: "empty PERMUTE argument".to_string(),
                    position: start,
                });
            }
            items.push(item);
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.advance(),
                _ => break,
            }
        }
        self.expect(b')')?;
        Ok(PatternNode::Permute(items))
    }

    fn parse_quantifier(&mut self) -> Result<Option<Quantifier>, PatternError> {
        self.skip_whitespace();
        let quantifier = match (self.peek(), self.peek_at(1)) {
            (Some(b'*'), _) => {
                self.advance();
                Quantifier::Star
            }
            (Some(b'+'), _) => {
                self.advance();
                Quantifier::Plus
            }
            (Some(b'?'), _) => {
                self.advance();
                Quantifier::Optional
            }
            // `{-` opens an exclusion, not a range
            (Some(b'{'), Some(c)) if c != b'-' => self.parse_range()?,
            _ => return Ok(None),
        };
        // Reluctant marker: accepted, treated as greedy.
        if self.peek() == Some(b'?') {
            self.advance();
        }
        Ok(Some(quantifier))
    }

    fn parse_range(&mut self) -> Result<Quantifier, PatternError> {
        let start = self.pos;
        self.expect(b'{')?;
        self.skip_whitespace();
        let lo = self.parse_optional_number()?;
        self.skip_whitespace();
        let quantifier = if self.peek() == Some(b',') {
            self.advance();
            self.skip_whitespace();
            let hi = self.parse_optional_number()?;
            Quantifier::Range {
                lo: lo.unwrap_or(0),
                hi,
            }
        } else {
            let Some(n) = lo else {
                return Err(PatternError {
                    message: "expected number".to_string(),
                    position: self.pos,
                });
            };
            Quantifier::Range { lo: n, hi: Some(n) }
        };
        self.skip_whitespace();
        self.expect(b'}')?;
        if let Quantifier::Range { lo, hi: Some(hi) } = quantifier {
            if hi < lo {
                return Err(PatternError {
                    message: format!("range upper bound {hi} is below lower bound {lo}"),
                    position: start,
                });
            }
        }
        Ok(quantifier)
    }

    fn parse_optional_number(&mut self) -> Result<Option<u32>, PatternError> {
        let start = self.pos;
        let mut num: u32 = 0;
        let mut digits = 0;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                num = num
                    .checked_mul(10)
                    .and_then(|n| n.checked_add(u32::from(c - b'0')))
                    .ok_or_else(|| PatternError {
                        message: "number overflow in pattern".to_string(),
                        position: start,
                    })?;
                digits += 1;
                self.advance();
            } else {
                break;
            }
        }
        Ok((digits > 0).then_some(num))
    }

    fn parse_identifier(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == b'_' {
                self.advance();
            } else {
                break;
            }
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn expect(&mut self, expected: u8) -> Result<(), PatternError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.advance();
                Ok(())
            }
            Some(c) => Err(PatternError {
                message: format!(
                    "expected '{}', got '{}'",
                    char::from(expected),
                    char::from(c)
                ),
                position: self.pos,
            }),
            None => Err(PatternError {
                message: format!("expected '{}', got end of pattern", char::from(expected)),
                position: self.pos,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(name: &str) -> PatternNode {
        PatternNode::symbol(name)
    }

    #[test]
    fn test_single_symbol() {
        assert_eq!(parse_pattern("A").unwrap(), sym("A"));
    }

    #[test]
    fn test_concatenation() {
        assert_eq!(
            parse_pattern("A B C").unwrap(),
            PatternNode::sequence(["A", "B", "C"])
        );
    }

    #[test]
    fn test_quantifiers() {
        let p = parse_pattern("A* B+ C?").unwrap();
        assert_eq!(
            p,
            PatternNode::Concatenation(vec![
                sym("A").quantified(Quantifier::Star),
                sym("B").quantified(Quantifier::Plus),
                sym("C").quantified(Quantifier::Optional),
            ])
        );
    }

    #[test]
    fn test_range_forms() {
        for (text, lo, hi) in [
            ("C{3,5}", 3, Some(5)),
            ("C{3}", 3, Some(3)),
            ("C{3,}", 3, None),
            ("C{,4}", 0, Some(4)),
            ("C{ 2 , 4 }", 2, Some(4)),
        ] {
            let p = parse_pattern(text).unwrap();
            assert_eq!(
                p,
                sym("C").quantified(Quantifier::Range { lo, hi }),
                "failed for {text}"
            );
        }
    }

    #[test]
    fn test_alternation_lowest_precedence() {
        let p = parse_pattern("A | B C").unwrap();
        assert_eq!(
            p,
            PatternNode::alternation(sym("A"), PatternNode::sequence(["B", "C"]))
        );
    }

    #[test]
    fn test_alternation_left_associative() {
        let p = parse_pattern("A | B | C").unwrap();
        assert_eq!(
            p,
            PatternNode::alternation(PatternNode::alternation(sym("A"), sym("B")), sym("C"))
        );
    }

    #[test]
    fn test_group_quantified() {
        let p = parse_pattern("(A B)+").unwrap();
        assert_eq!(
            p,
            PatternNode::sequence(["A", "B"])
                .group()
                .quantified(Quantifier::Plus)
        );
    }

    #[test]
    fn test_empty_group() {
        let p = parse_pattern("()").unwrap();
        assert_eq!(p, PatternNode::Concatenation(vec![]).group());
    }

    #[test]
    fn test_permute() {
        let p = parse_pattern("PERMUTE(E, F G{3})").unwrap();
        assert_eq!(
            p,
            PatternNode::Permute(vec![
                sym("E"),
                PatternNode::Concatenation(vec![
                    sym("F"),
                    sym("G").quantified(Quantifier::Range {
                        lo: 3,
                        hi: Some(3)
                    }),
                ]),
            ])
        );
    }

    #[test]
    fn test_permute_keyword_case_insensitive() {
        let p = parse_pattern("permute (A, B)").unwrap();
        assert_eq!(p, PatternNode::Permute(vec![sym("A"), sym("B")]));
    }

    #[test]
    fn test_symbol_named_permute_without_parens() {
        assert_eq!(parse_pattern("PERMUTE").unwrap(), sym("PERMUTE"));
    }

    #[test]
    fn test_exclusion() {
        let p = parse_pattern("A {- B -} C").unwrap();
        assert_eq!(
            p,
            PatternNode::Concatenation(vec![sym("A"), sym("B").excluded(), sym("C")])
        );
    }

    #[test]
    fn test_anchors() {
        let p = parse_pattern("^ A $").unwrap();
        assert_eq!(
            p,
            PatternNode::Concatenation(vec![PatternNode::Anchor, sym("A"), PatternNode::Anchor])
        );
    }

    #[test]
    fn test_reluctant_read_as_greedy() {
        assert_eq!(
            parse_pattern("A*?").unwrap(),
            sym("A").quantified(Quantifier::Star)
        );
        assert_eq!(
            parse_pattern("A??").unwrap(),
            sym("A").quantified(Quantifier::Optional)
        );
    }

    #[test]
    fn test_roundtrip_display() {
        let text = "(A* B+ | C{2,4})? D* PERMUTE(E, F)";
        let p = parse_pattern(text).unwrap();
        assert_eq!(parse_pattern(&p.to_string()).unwrap(), p);
    }

    #[test]
    fn test_empty_pattern_rejected() {
        let err = parse_pattern("   ").unwrap_err();
        assert!(err.message.contains("empty"));
    }

    #[test]
    fn test_unclosed_group() {
        let err = parse_pattern("(A B").unwrap_err();
        assert!(err.message.contains("expected ')'"));
    }

    #[test]
    fn test_unexpected_character() {
        let err = parse_pattern("A # B").unwrap_err();
        assert!(err.message.contains("unexpected character '#'"));
        assert_eq!(err.position, 2);
    }

    #[test]
    fn test_stray_close_paren() {
        let err = parse_pattern("A)").unwrap_err();
        assert!(err.message.contains("unexpected character ')'"));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let err = parse_pattern("A{5,2}").unwrap_err();
        assert!(err.message.contains("below lower bound"));
    }

    #[test]
    fn test_empty_range_rejected() {
        let err = parse_pattern("A{}").unwrap_err();
        assert!(err.message.contains("expected number"));
    }

    #[test]
    fn test_number_overflow() {
        let err = parse_pattern("A{99999999999}").unwrap_err();
        assert!(err.message.contains("overflow"));
    }

    #[test]
    fn test_empty_permute_argument() {
        let err = parse_pattern("PERMUTE(A, )").unwrap_err();
        assert!(err.message.contains("empty PERMUTE argument"));
    }

    #[test]
    fn test_pattern_error_display() {
        let err = PatternError {
            message: "test error".to_string(),
            position: 5,
        };
        assert_eq!(err.to_string(), "pattern error at position 5: test error");
    }
}
