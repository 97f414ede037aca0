//! Pattern matching against raw page source
//!
//! This module validates user patterns and extracts matches from documents.
//! Patterns are validated once when a job is created; the batch executor
//! re-parses the stored pattern before each chunk and degrades to an
//! `invalid regex` outcome per URL if that ever fails.

mod pattern;

pub use pattern::{Pattern, PatternError};

/// Reports whether a pattern is syntactically valid
///
/// Never panics; an empty pattern is invalid.
///
/// # Examples
///
/// ```
/// use regex_sweep::matcher::validate;
///
/// assert!(validate(r"/https?:\/\/[^\s]+/i"));
/// assert!(!validate("(unbalanced"));
/// assert!(!validate(""));
/// ```
pub fn validate(pattern: &str) -> bool {
    Pattern::parse(pattern)
        .map(|compiled| {
            // Exercise the compiled program once on trivial input
            let _ = compiled.is_match("");
            true
        })
        .unwrap_or(false)
}

/// Parses `pattern` and returns its distinct matches in `document`
///
/// See [`Pattern::find_all`] for the matching rules.
pub fn find_all(pattern: &str, document: &str) -> Result<Vec<String>, PatternError> {
    Ok(Pattern::parse(pattern)?.find_all(document))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(validate("abc"));
        assert!(validate("/abc/im"));
        assert!(!validate(""));
        assert!(!validate("[unclosed"));
        assert!(!validate("/abc/z"));
    }

    #[test]
    fn test_find_all_bare_urls() {
        let matches = find_all(
            r"https?://[^\s]+",
            "http://a.com http://a.com http://b.com",
        )
        .unwrap();
        assert_eq!(matches, vec!["http://a.com", "http://b.com"]);
    }

    #[test]
    fn test_find_all_invalid_pattern() {
        assert!(find_all("(", "anything").is_err());
    }
}
