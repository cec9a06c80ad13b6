//! URL glob patterns
//!
//! `*` matches within one path segment and `**` spans segments, so
//! `*/**/api/franchise/*` matches `http://host/api/franchise/2` but not
//! `http://host/api/franchise/2/store`.

use std::fmt;

use glob::{MatchOptions, Pattern};

use crate::common::{Error, Result};

use super::message::strip_query;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A compiled URL glob
#[derive(Debug, Clone)]
pub struct UrlPattern {
    raw: String,
    pattern: Pattern,
}

impl UrlPattern {
    pub fn new(raw: &str) -> Result<Self> {
        let pattern = Pattern::new(raw).map_err(|e| Error::InvalidPattern {
            pattern: raw.to_string(),
            reason: e.msg.to_string(),
        })?;
        Ok(Self {
            raw: raw.to_string(),
            pattern,
        })
    }

    /// Match an absolute URL; the query string is ignored
    pub fn matches(&self, url: &str) -> bool {
        self.pattern.matches_with(strip_query(url), MATCH_OPTIONS)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(raw: &str) -> UrlPattern {
        UrlPattern::new(raw).unwrap()
    }

    #[test]
    fn test_double_star_spans_host() {
        let p = pattern("*/**/api/order/menu");
        assert!(p.matches("http://localhost:3000/api/order/menu"));
        assert!(p.matches("https://pizza-service.example.com/api/order/menu?x=1"));
        assert!(!p.matches("http://localhost:3000/api/order"));
    }

    #[test]
    fn test_single_star_stays_in_segment() {
        let p = pattern("*/**/api/franchise/*");
        assert!(p.matches("http://localhost:3000/api/franchise/2"));
        assert!(!p.matches("http://localhost:3000/api/franchise/2/store"));
        assert!(!p.matches("http://localhost:3000/api/franchise"));
    }

    #[test]
    fn test_nested_store_patterns() {
        let create = pattern("*/**/api/franchise/*/store");
        let delete = pattern("*/**/api/franchise/*/store/*");
        assert!(create.matches("http://localhost:3000/api/franchise/2/store"));
        assert!(!create.matches("http://localhost:3000/api/franchise/2/store/1"));
        assert!(delete.matches("http://localhost:3000/api/franchise/2/store/1"));
    }

    #[test]
    fn test_exact_root() {
        let p = pattern("http://*/");
        assert!(p.matches("http://127.0.0.1:8080/"));
        assert!(!p.matches("http://127.0.0.1:8080/api/auth"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(
            UrlPattern::new("http://[/"),
            Err(Error::InvalidPattern { .. })
        ));
    }
}
