//! Replacement templates with positional `$N` capture group references.

use std::collections::BTreeSet;

use crate::batch_rename::{MatchResult, PatternError};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Reference(usize),
}

/// Parsed replacement template such as `"$1.S01E$2"`.
///
/// References are parsed greedily, so `$10` is always group ten and never `$1` followed by `0`.
/// A `$` not followed by a digit is kept as literal text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    tokens: Vec<Token>,
}

impl Template {
    /// Parse a template and check every reference against the available capture groups.
    ///
    /// # Errors
    /// Returns an error if a reference is `$0` or exceeds `capture_groups`.
    pub fn parse(template: &str, capture_groups: usize) -> Result<Self, PatternError> {
        let parsed = Self::scan(template);
        if let Some(reference) = parsed
            .references()
            .find(|&reference| reference == 0 || reference > capture_groups)
        {
            return Err(PatternError::UnknownGroupReference {
                reference,
                available: capture_groups,
            });
        }
        Ok(parsed)
    }

    fn scan(template: &str) -> Self {
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek().is_some_and(char::is_ascii_digit) {
                let mut digits = String::new();
                while let Some(&digit) = chars.peek() {
                    if !digit.is_ascii_digit() {
                        break;
                    }
                    digits.push(digit);
                    chars.next();
                }
                if !literal.is_empty() {
                    tokens.push(Token::Literal(std::mem::take(&mut literal)));
                }
                // Saturate absurdly long digit runs so they fail validation instead of wrapping
                let reference = digits.parse::<usize>().unwrap_or(usize::MAX);
                tokens.push(Token::Reference(reference));
            } else {
                literal.push(c);
            }
        }
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }

        Self { tokens }
    }

    fn references(&self) -> impl Iterator<Item = usize> + '_ {
        self.tokens.iter().filter_map(|token| match token {
            Token::Reference(index) => Some(*index),
            Token::Literal(_) => None,
        })
    }

    /// Highest group index referenced, or 0 if there are no references.
    #[must_use]
    pub fn max_reference(&self) -> usize {
        self.references().max().unwrap_or(0)
    }

    #[must_use]
    pub fn has_references(&self) -> bool {
        self.references().next().is_some()
    }

    /// Replace each reference with the verbatim captured text.
    ///
    /// Groups that did not participate in the match render as empty text.
    #[must_use]
    pub fn substitute(&self, result: &MatchResult) -> String {
        let mut slots: Vec<Option<&str>> = self
            .tokens
            .iter()
            .map(|token| match token {
                Token::Literal(text) => Some(text.as_str()),
                Token::Reference(_) => None,
            })
            .collect();

        // Fill reference positions from the highest group index down
        let indices: BTreeSet<usize> = self.references().collect();
        for index in indices.into_iter().rev() {
            let value = result.group(index).unwrap_or_default();
            for (slot, token) in slots.iter_mut().zip(&self.tokens) {
                if *token == Token::Reference(index) {
                    *slot = Some(value);
                }
            }
        }

        slots.into_iter().flatten().collect()
    }
}
