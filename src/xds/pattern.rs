//! Wildcard pattern compilation
//!
//! Hostname and SPIFFE identity patterns use two wildcard tokens:
//!
//! - `**` matches one or more segments joined by the separator
//! - `*` matches exactly one segment
//!
//! Everything else matches literally. The compiled expression is anchored at
//! both ends and restricted to syntax shared by the `regex` crate and RE2, so
//! the same string is handed to Envoy as a `safe_regex` matcher.

use regex::Regex;

use crate::errors::Result;

/// Prefix of every SPIFFE identity URI
pub const SPIFFE_SCHEME: &str = "spiffe://";

/// Segment and separator rules a pattern is compiled with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// DNS names and SPIFFE trust domains: `.`-separated labels
    Hostname,
    /// SPIFFE paths: `/`-separated segments, dots allowed inside a segment
    SpiffePath,
}

impl PatternKind {
    fn segment(self) -> &'static str {
        match self {
            PatternKind::Hostname => "[A-Za-z0-9_-]+",
            PatternKind::SpiffePath => "[A-Za-z0-9_.-]+",
        }
    }

    fn separator(self) -> &'static str {
        match self {
            PatternKind::Hostname => r"\.",
            PatternKind::SpiffePath => "/",
        }
    }

    fn one_or_more_segments(self) -> String {
        format!("{seg}(?:{sep}{seg})*", seg = self.segment(), sep = self.separator())
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    Literal(&'a str),
    AnySegments,
    OneSegment,
}

/// Split a pattern into literal runs and wildcards, `**` taking precedence
fn tokenize(pattern: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = pattern;

    while let Some(idx) = rest.find('*') {
        if idx > 0 {
            tokens.push(Token::Literal(&rest[..idx]));
        }
        if rest[idx..].starts_with("**") {
            tokens.push(Token::AnySegments);
            rest = &rest[idx + 2..];
        } else {
            tokens.push(Token::OneSegment);
            rest = &rest[idx + 1..];
        }
    }
    if !rest.is_empty() {
        tokens.push(Token::Literal(rest));
    }
    tokens
}

/// Translate a pattern into an unanchored expression body
fn translate(pattern: &str, kind: PatternKind) -> String {
    tokenize(pattern)
        .into_iter()
        .map(|token| match token {
            Token::Literal(text) => regex::escape(text),
            Token::AnySegments => kind.one_or_more_segments(),
            Token::OneSegment => kind.segment().to_string(),
        })
        .collect()
}

/// An anchored matcher derived from a wildcard pattern
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: String,
    regex: Regex,
}

impl CompiledPattern {
    fn from_expression(source: String) -> Result<Self> {
        let regex = Regex::new(&source)?;
        Ok(Self { source, regex })
    }

    /// The anchored expression, suitable for an Envoy `safe_regex`
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether `candidate` matches in full
    pub fn is_match(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }
}

/// Compile a single pattern with the given segment rules
pub fn compile(pattern: &str, kind: PatternKind) -> Result<CompiledPattern> {
    CompiledPattern::from_expression(format!("^{}$", translate(pattern, kind)))
}

/// Compile a DNS hostname pattern such as `**.example.com`
pub fn compile_hostname(pattern: &str) -> Result<CompiledPattern> {
    compile(pattern, PatternKind::Hostname)
}

/// Compile a SPIFFE identity from its trust domain and service path patterns
///
/// Each half is translated with its own separator before both are joined
/// into one `spiffe://{trust_domain}/{service}` expression.
pub fn compile_spiffe(trust_domain: &str, service: &str) -> Result<CompiledPattern> {
    CompiledPattern::from_expression(format!(
        "^{}{}/{}$",
        regex::escape(SPIFFE_SCHEME),
        translate(trust_domain, PatternKind::Hostname),
        translate(service, PatternKind::SpiffePath),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_prefers_double_wildcard() {
        assert_eq!(
            tokenize("**.a.*"),
            vec![Token::AnySegments, Token::Literal(".a."), Token::OneSegment]
        );
        assert_eq!(tokenize("plain"), vec![Token::Literal("plain")]);
        assert_eq!(tokenize("***"), vec![Token::AnySegments, Token::OneSegment]);
    }

    #[test]
    fn literal_pattern_is_exact_and_anchored() {
        let pattern = compile_hostname("example.com").unwrap();
        assert_eq!(pattern.as_str(), r"^example\.com$");
        assert!(pattern.is_match("example.com"));
        assert!(!pattern.is_match("example.comx"));
        assert!(!pattern.is_match("xexample.com"));
        assert!(!pattern.is_match("exampleXcom"));
    }

    #[test]
    fn double_wildcard_requires_at_least_one_label() {
        let pattern = compile_hostname("**.example.com").unwrap();
        assert!(!pattern.is_match("example.com"));
        assert!(!pattern.is_match(".example.com"));
        assert!(pattern.is_match("a.example.com"));
        assert!(pattern.is_match("a.b.example.com"));
        assert!(pattern.is_match("a-1.b_2.example.com"));
    }

    #[test]
    fn single_wildcard_matches_exactly_one_label() {
        let pattern = compile_hostname("*.example.com").unwrap();
        assert!(pattern.is_match("a.example.com"));
        assert!(!pattern.is_match("a.b.example.com"));
        assert!(!pattern.is_match("example.com"));
    }

    #[test]
    fn wildcard_in_the_middle() {
        let pattern = compile_hostname("api.*.example.com").unwrap();
        assert!(pattern.is_match("api.eu.example.com"));
        assert!(!pattern.is_match("api.eu.west.example.com"));
    }

    #[test]
    fn characters_outside_the_alphabet_stay_literal() {
        let pattern = compile_hostname("a+b.com").unwrap();
        assert!(pattern.is_match("a+b.com"));
        assert!(!pattern.is_match("aab.com"));
    }

    #[test]
    fn spiffe_service_double_wildcard() {
        let pattern = compile_spiffe("example.org", "svc/**").unwrap();
        assert_eq!(
            pattern.as_str(),
            r"^spiffe://example\.org/svc/[A-Za-z0-9_.-]+(?:/[A-Za-z0-9_.-]+)*$"
        );
        assert!(pattern.is_match("spiffe://example.org/svc/a"));
        assert!(pattern.is_match("spiffe://example.org/svc/a/b"));
        assert!(!pattern.is_match("spiffe://example.org/svc"));
        assert!(!pattern.is_match("spiffe://example.org/other"));
        assert!(!pattern.is_match("spiffe://evil.org/svc/a"));
    }

    #[test]
    fn spiffe_trust_domain_wildcard_uses_dns_labels() {
        let pattern = compile_spiffe("*.example.org", "ns/*/sa/web").unwrap();
        assert!(pattern.is_match("spiffe://prod.example.org/ns/default/sa/web"));
        assert!(!pattern.is_match("spiffe://a.prod.example.org/ns/default/sa/web"));
        assert!(!pattern.is_match("spiffe://prod.example.org/ns/a/b/sa/web"));
        // Dots are allowed inside a path segment
        assert!(pattern.is_match("spiffe://prod.example.org/ns/v1.2/sa/web"));
    }

    #[test]
    fn compilation_is_deterministic() {
        let first = compile_hostname("**.a.com").unwrap();
        let second = compile_hostname("**.a.com").unwrap();
        assert_eq!(first.as_str(), second.as_str());
    }
}
