//! # Subscription patterns over dot-segmented event types.
//!
//! ## Syntax
//! - Segments are separated by `.`; matching is case-sensitive.
//! - `*` matches exactly one segment.
//! - `**` (final segment only) matches the remainder, zero or more segments.
//! - A pattern without wildcards is a segment prefix: `"LOG"` matches `"LOG.INFO"`
//!   and `"LOG.ERROR.FATAL"` but not `"LOGGER.INFO"`.
//!
//! ## Rejected patterns
//! Empty patterns, empty segments (`"A..B"`, `".A"`, `"A."`), segments mixing `*`
//! with other characters (`"TO*"`) and a non-final `**`.
//!
//! ## Example
//! ```rust
//! use nodevisor::Pattern;
//!
//! let p = Pattern::parse("TOOL.*").unwrap();
//! assert!(p.matches("TOOL.INVOCATION"));
//! assert!(!p.matches("HEALTH.SNAPSHOT"));
//! ```

use std::fmt;

use crate::error::BusError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `*`
    One,
    /// `**`
    Rest,
}

/// A validated subscription pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    segments: Vec<Segment>,
    has_wildcard: bool,
}

impl Pattern {
    /// Parses and validates a pattern.
    pub fn parse(raw: &str) -> Result<Self, BusError> {
        let invalid = |reason| BusError::InvalidPattern {
            pattern: raw.to_string(),
            reason,
        };
        if raw.is_empty() {
            return Err(invalid("empty pattern"));
        }

        let parts: Vec<&str> = raw.split('.').collect();
        let last = parts.len() - 1;
        let mut segments = Vec::with_capacity(parts.len());
        for (i, part) in parts.iter().enumerate() {
            let seg = match *part {
                "" => return Err(invalid("empty segment")),
                "*" => Segment::One,
                "**" if i == last => Segment::Rest,
                "**" => return Err(invalid("`**` is only allowed as the last segment")),
                p if p.contains('*') => {
                    return Err(invalid("wildcard must be a whole segment"));
                }
                p => Segment::Literal(p.to_string()),
            };
            segments.push(seg);
        }

        let has_wildcard = segments.iter().any(|s| !matches!(s, Segment::Literal(_)));
        Ok(Self {
            raw: raw.to_string(),
            segments,
            has_wildcard,
        })
    }

    /// Returns the pattern as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Tests `event_type` against this pattern.
    pub fn matches(&self, event_type: &str) -> bool {
        if self.raw == event_type {
            return true;
        }

        let mut parts = event_type.split('.');
        for seg in &self.segments {
            match seg {
                Segment::Rest => return true,
                Segment::One => {
                    if parts.next().is_none() {
                        return false;
                    }
                }
                Segment::Literal(lit) => match parts.next() {
                    Some(p) if p == lit => {}
                    _ => return false,
                },
            }
        }

        // Literal-only patterns are prefixes; wildcard patterns must consume everything.
        !self.has_wildcard || parts.next().is_none()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(raw: &str) -> Pattern {
        Pattern::parse(raw).unwrap()
    }

    #[test]
    fn test_single_wildcard() {
        let pat = p("TOOL.*");
        assert!(pat.matches("TOOL.INVOCATION"));
        assert!(pat.matches("TOOL.RESPONSE"));
        assert!(!pat.matches("HEALTH.SNAPSHOT"));
        assert!(!pat.matches("TOOL"));
        assert!(!pat.matches("TOOL.INVOCATION.RETRY"));
    }

    #[test]
    fn test_bare_prefix() {
        let pat = p("TOOL");
        assert!(pat.matches("TOOL"));
        assert!(pat.matches("TOOL.INVOCATION"));
        let log = p("LOG");
        assert!(log.matches("LOG.INFO"));
        assert!(log.matches("LOG.ERROR.FATAL"));
        assert!(!log.matches("LOGGER.INFO"));
        assert!(!log.matches("METRIC.CPU"));
    }

    #[test]
    fn test_exact_type() {
        let pat = p("TOOL.INVOCATION");
        assert!(pat.matches("TOOL.INVOCATION"));
        assert!(!pat.matches("TOOL.RESPONSE"));
        assert!(!pat.matches("TOOL"));
        assert!(!pat.matches("TOOL.INVOCATIONS"));
    }

    #[test]
    fn test_leading_wildcard() {
        let pat = p("*.RESPONSE");
        assert!(pat.matches("TOOL.RESPONSE"));
        assert!(pat.matches("SEARCH.RESPONSE"));
        assert!(!pat.matches("TOOL.ERROR"));
        assert!(!pat.matches("RESPONSE"));
    }

    #[test]
    fn test_double_wildcard_matches_remainder() {
        let pat = p("LOG.**");
        assert!(pat.matches("LOG"));
        assert!(pat.matches("LOG.INFO"));
        assert!(pat.matches("LOG.ERROR.FATAL"));
        assert!(!pat.matches("METRIC.CPU"));
        assert!(p("**").matches("ANY.THING.AT.ALL"));
    }

    #[test]
    fn test_case_sensitive() {
        assert!(!p("tool.*").matches("TOOL.INVOCATION"));
    }

    #[test]
    fn test_rejected_patterns() {
        for raw in ["", ".", "A..B", ".A", "A.", "TO*", "A.**.B", "***"] {
            assert!(
                matches!(Pattern::parse(raw), Err(BusError::InvalidPattern { .. })),
                "pattern {raw:?} should be rejected"
            );
        }
    }
}
