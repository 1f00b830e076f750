use std::fmt;

use regex::{Regex, RegexBuilder};

/// Key filter with SQL `LIKE` semantics.
///
/// `%` matches any run of characters (including none), `_` matches exactly
/// one character and everything else matches itself, case-insensitively.
#[derive(Debug, Clone)]
pub struct LikePattern {
    source: String,
    regex: Regex,
}

impl LikePattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let mut expr = String::with_capacity(pattern.len() + 8);
        expr.push('^');
        let mut literal = [0u8; 4];
        for ch in pattern.chars() {
            match ch {
                '%' => expr.push_str(".*"),
                '_' => expr.push('.'),
                _ => expr.push_str(&regex::escape(ch.encode_utf8(&mut literal))),
            }
        }
        expr.push('$');

        let regex = RegexBuilder::new(&expr)
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for LikePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl PartialEq for LikePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_matches_any_run() {
        let pattern = LikePattern::new("cache:%").unwrap();
        assert!(pattern.matches("cache:"));
        assert!(pattern.matches("cache:repo/thumb.png"));
        assert!(!pattern.matches("token"));
        assert!(!pattern.matches("xcache:a"));
    }

    #[test]
    fn test_underscore_matches_one_char() {
        let pattern = LikePattern::new("repo_").unwrap();
        assert!(pattern.matches("repo1"));
        assert!(!pattern.matches("repo"));
        assert!(!pattern.matches("repo12"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let pattern = LikePattern::new("a.b(c)%").unwrap();
        assert!(pattern.matches("a.b(c)"));
        assert!(pattern.matches("a.b(c)[x]"));
        assert!(!pattern.matches("axb(c)"));
    }

    #[test]
    fn test_case_insensitive() {
        let pattern = LikePattern::new("Collections%").unwrap();
        assert!(pattern.matches("collections"));
        assert!(pattern.matches("COLLECTIONS:main"));
        assert_eq!(pattern.to_string(), "Collections%");
    }
}
