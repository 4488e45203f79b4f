//! Text normalization
//!
//! Whitespace is collapsed and ordinary words are lowercased, while tokens
//! that look like symbols or acronyms (`TP53`, `BRCA1`, `mRNA`, `DNA`) keep
//! their case because case carries meaning for gene symbols.

use crate::error::QueryError;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9](?:[A-Za-z0-9:_\-]*[A-Za-z0-9])?").expect("valid token pattern")
});

/// A word of the normalized text with char offsets (`end` exclusive)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Normalized question text plus its tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedText {
    pub text: String,
    pub tokens: Vec<Token>,
}

impl NormalizedText {
    /// Substring by char offsets
    pub fn slice(&self, start: usize, end: usize) -> String {
        self.text
            .chars()
            .skip(start)
            .take(end.saturating_sub(start))
            .collect()
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Index of the token starting at `start`, if any
    pub fn token_at(&self, start: usize) -> Option<usize> {
        self.tokens.iter().position(|t| t.start == start)
    }

    /// Index of the token ending at `end`, if any
    pub fn token_ending_at(&self, end: usize) -> Option<usize> {
        self.tokens.iter().position(|t| t.end == end)
    }

    /// Lowercase token text by index
    pub fn token_lower(&self, index: usize) -> Option<String> {
        self.tokens.get(index).map(|t| t.text.to_lowercase())
    }
}

fn keeps_case(word: &str) -> bool {
    let letters: Vec<char> = word.chars().filter(|c| c.is_alphabetic()).collect();
    let has_digit = word.chars().any(|c| c.is_ascii_digit());
    let inner_upper = word.chars().skip(1).any(|c| c.is_uppercase());
    let all_upper = letters.len() >= 2 && letters.iter().all(|c| c.is_uppercase());

    has_digit || inner_upper || all_upper
}

/// Normalize raw question text; fails with `EmptyInput` when nothing remains
pub fn normalize(raw: &str) -> Result<NormalizedText, QueryError> {
    let text = raw
        .split_whitespace()
        .map(|word| {
            if keeps_case(word) {
                word.to_string()
            } else {
                word.to_lowercase()
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    if text.is_empty() {
        return Err(QueryError::EmptyInput);
    }

    let tokens = TOKEN_PATTERN
        .find_iter(&text)
        .map(|m| {
            let start = text[..m.start()].chars().count();
            Token {
                text: m.as_str().to_string(),
                start,
                end: start + m.as_str().chars().count(),
            }
        })
        .collect::<Vec<_>>();

    if tokens.is_empty() {
        return Err(QueryError::EmptyInput);
    }

    Ok(NormalizedText { text, tokens })
}
