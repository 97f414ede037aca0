//! User-supplied search patterns
//!
//! Operators type either a raw regular expression (`https?://cdn\.[^"']+`) or
//! a delimited pattern with trailing flags (`/https?:\/\/cdn\.[^"']+/i`).

use regex::{Regex, RegexBuilder};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Characters accepted as pattern delimiters
const DELIMITERS: &[char] = &['/', '#', '~', '!', '@', '%', ';', ',', '`'];

/// Errors produced while parsing a pattern
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("Pattern is empty")]
    Empty,

    #[error("Delimited pattern has an empty body")]
    EmptyBody,

    #[error("Unknown pattern flag '{0}'")]
    UnknownFlag(char),

    #[error("Invalid regular expression: {0}")]
    Compile(#[from] regex::Error),
}

/// Modifiers that may trail a delimited pattern
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Flags {
    case_insensitive: bool,
    multi_line: bool,
    dot_matches_new_line: bool,
    ignore_whitespace: bool,
    swap_greed: bool,
}

impl Flags {
    fn parse(flags: &str) -> Result<Self, PatternError> {
        let mut parsed = Self::default();
        for flag in flags.chars() {
            match flag {
                'i' => parsed.case_insensitive = true,
                'm' => parsed.multi_line = true,
                's' => parsed.dot_matches_new_line = true,
                'x' => parsed.ignore_whitespace = true,
                'U' => parsed.swap_greed = true,
                // Unicode is always on
                'u' => {}
                other => return Err(PatternError::UnknownFlag(other)),
            }
        }
        Ok(parsed)
    }
}

/// A validated, compiled search pattern
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Parses and compiles a pattern
    ///
    /// A pattern is treated as delimited when it starts with one of the
    /// accepted delimiters and everything after the last occurrence of that
    /// delimiter is ASCII letters (the flags). Anything else is compiled as
    /// a raw regular expression.
    ///
    /// # Examples
    ///
    /// ```
    /// use regex_sweep::matcher::Pattern;
    ///
    /// let pattern = Pattern::parse("/CDN\\.example\\.com/i").unwrap();
    /// assert!(pattern.is_match("see cdn.example.com"));
    ///
    /// assert!(Pattern::parse("(unclosed").is_err());
    /// ```
    pub fn parse(source: &str) -> Result<Self, PatternError> {
        if source.is_empty() {
            return Err(PatternError::Empty);
        }

        let regex = match split_delimited(source) {
            Some((body, flags)) => {
                if body.is_empty() {
                    return Err(PatternError::EmptyBody);
                }
                let flags = Flags::parse(flags)?;
                RegexBuilder::new(body)
                    .case_insensitive(flags.case_insensitive)
                    .multi_line(flags.multi_line)
                    .dot_matches_new_line(flags.dot_matches_new_line)
                    .ignore_whitespace(flags.ignore_whitespace)
                    .swap_greed(flags.swap_greed)
                    .build()?
            }
            None => Regex::new(source)?,
        };

        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// The pattern exactly as the operator supplied it
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, document: &str) -> bool {
        self.regex.is_match(document)
    }

    /// Returns every distinct match of the whole pattern in first-seen order
    ///
    /// Matches are non-overlapping, trimmed of surrounding whitespace, and
    /// empty matches are skipped. Capture groups are ignored.
    pub fn find_all(&self, document: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut matches = Vec::new();

        for found in self.regex.find_iter(document) {
            let text = found.as_str().trim();
            if text.is_empty() {
                continue;
            }
            if seen.insert(text) {
                matches.push(text.to_string());
            }
        }

        matches
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Splits `/body/flags` into its body and flags
///
/// Returns None when the source is not in delimited form.
fn split_delimited(source: &str) -> Option<(&str, &str)> {
    let delimiter = source.chars().next()?;
    if !DELIMITERS.contains(&delimiter) {
        return None;
    }

    let rest = &source[delimiter.len_utf8()..];
    let close = rest.rfind(delimiter)?;
    let body = &rest[..close];
    let flags = &rest[close + delimiter.len_utf8()..];

    if !flags.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    Some((body, flags))
}
