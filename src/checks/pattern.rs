//! Restricted wildcard patterns.
//!
//! A pattern is a literal substring unless it contains `*` (any run of
//! characters within one line) or `?` (exactly one character). `\*`, `\?`
//! and `\\` stand for the literal characters. Nothing else is supported.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Char(char),
    AnyRun,
    AnyOne,
}

/// A compiled match pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    tokens: Vec<Token>,
    ignore_case: bool,
}

impl Pattern {
    /// Compile a case-sensitive pattern.
    pub fn new(source: &str) -> Self {
        Self::compile(source, false)
    }

    /// Compile a pattern that ignores ASCII and Unicode case.
    pub fn new_ignore_case(source: &str) -> Self {
        Self::compile(source, true)
    }

    fn compile(source: &str, ignore_case: bool) -> Self {
        let folded;
        let text = if ignore_case {
            folded = source.to_lowercase();
            folded.as_str()
        } else {
            source
        };

        let mut tokens = Vec::with_capacity(text.len());
        let mut chars = text.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some(next @ ('*' | '?' | '\\')) => tokens.push(Token::Char(next)),
                    Some(other) => {
                        tokens.push(Token::Char('\\'));
                        tokens.push(Token::Char(other));
                    }
                    None => tokens.push(Token::Char('\\')),
                },
                '*' => {
                    // Collapse runs of stars.
                    if tokens.last() != Some(&Token::AnyRun) {
                        tokens.push(Token::AnyRun);
                    }
                }
                '?' => tokens.push(Token::AnyOne),
                c => tokens.push(Token::Char(c)),
            }
        }

        Pattern {
            source: source.to_string(),
            tokens,
            ignore_case,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.tokens
            .iter()
            .any(|t| matches!(t, Token::AnyRun | Token::AnyOne))
    }

    /// True if the pattern occurs anywhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.find_line(text).is_some()
    }

    /// True if the pattern occurs within `line`.
    pub fn matches_line(&self, line: &str) -> bool {
        let folded;
        let line = if self.ignore_case {
            folded = line.to_lowercase();
            folded.as_str()
        } else {
            line
        };

        if self.is_wildcard() {
            let chars: Vec<char> = line.chars().collect();
            wildcard_contains(&self.tokens, &chars)
        } else {
            line.contains(self.literal().as_str())
        }
    }

    /// Zero-based index of the first line of `text` where the pattern
    /// occurs. Literal patterns may span lines; wildcards never do.
    pub fn find_line(&self, text: &str) -> Option<usize> {
        if self.is_wildcard() {
            return text.lines().position(|line| self.matches_line(line));
        }

        let literal = self.literal();
        if literal.is_empty() {
            return Some(0);
        }
        let folded;
        let haystack = if self.ignore_case {
            folded = text.to_lowercase();
            folded.as_str()
        } else {
            text
        };
        haystack
            .find(literal.as_str())
            .map(|offset| haystack[..offset].matches('\n').count())
    }

    fn literal(&self) -> String {
        self.tokens
            .iter()
            .filter_map(|t| match t {
                Token::Char(c) => Some(*c),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Substring wildcard match: an implicit `*` surrounds the pattern.
fn wildcard_contains(tokens: &[Token], text: &[char]) -> bool {
    let mut p = 0usize;
    let mut t = 0usize;
    // Position after the last star seen, and the text position it was tried at.
    let mut star: Option<(usize, usize)> = Some((0, 0));

    loop {
        if p == tokens.len() {
            return true;
        }
        match tokens[p] {
            Token::AnyRun => {
                p += 1;
                star = Some((p, t));
                continue;
            }
            Token::AnyOne if t < text.len() => {
                p += 1;
                t += 1;
                continue;
            }
            Token::Char(c) if t < text.len() && text[t] == c => {
                p += 1;
                t += 1;
                continue;
            }
            _ => {}
        }

        match star {
            Some((star_p, star_t)) if star_t < text.len() => {
                p = star_p;
                t = star_t + 1;
                star = Some((star_p, star_t + 1));
            }
            _ => return false,
        }
    }
}
