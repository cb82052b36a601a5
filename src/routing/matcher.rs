//! Route matching logic.
//!
//! # Responsibilities
//! - Normalize the Host header (strip port, lowercase)
//! - Match host patterns (any, exact, single-label wildcard)
//! - Match path prefix or exact path (case-sensitive)
//!
//! # Design Decisions
//! - Host matching is case-insensitive (RFC 9110)
//! - Path matching is case-sensitive and byte-exact
//! - A wildcard covers exactly one leading label, never several
//! - No regex to guarantee O(n) matching

use std::fmt;

/// Normalize a Host header value for matching.
///
/// Strips the port (including bracketed IPv6 literals), a trailing dot, and
/// lowercases the rest.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let without_port = if let Some(rest) = host.strip_prefix('[') {
        // [::1]:8080
        match rest.find(']') {
            Some(end) => &rest[..end],
            None => rest,
        }
    } else {
        match host.rsplit_once(':') {
            Some((name, port)) if port.bytes().all(|b| b.is_ascii_digit()) => name,
            _ => host,
        }
    };
    without_port.trim_end_matches('.').to_ascii_lowercase()
}

/// Host condition of a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostPattern {
    /// Matches every host.
    Any,
    /// Matches one host verbatim (after normalization).
    Exact(String),
    /// `{label}.suffix` where the label may be empty but never contains a dot.
    Wildcard { suffix: String },
}

impl HostPattern {
    /// Exact host pattern. Normalized like request hosts.
    pub fn exact(host: impl AsRef<str>) -> Self {
        HostPattern::Exact(normalize_host(host.as_ref()))
    }

    /// Wildcard over the first label of `domain`.
    pub fn wildcard(domain: impl AsRef<str>) -> Self {
        HostPattern::Wildcard {
            suffix: normalize_host(domain.as_ref()),
        }
    }

    /// Parse the textual form: `*`, `*.example.com`, or `example.com`.
    pub fn parse(pattern: &str) -> Self {
        if pattern == "*" {
            HostPattern::Any
        } else if let Some(suffix) = pattern.strip_prefix("*.") {
            HostPattern::wildcard(suffix)
        } else {
            HostPattern::exact(pattern)
        }
    }

    /// Returns true if the already-normalized host matches.
    pub fn matches(&self, host: &str) -> bool {
        match self {
            HostPattern::Any => true,
            HostPattern::Exact(expected) => host == expected,
            HostPattern::Wildcard { suffix } => match host.split_once('.') {
                Some((_label, rest)) => rest == suffix,
                None => false,
            },
        }
    }
}

impl fmt::Display for HostPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostPattern::Any => f.write_str("*"),
            HostPattern::Exact(host) => f.write_str(host),
            HostPattern::Wildcard { suffix } => write!(f, "*.{}", suffix),
        }
    }
}

/// Matches the request path, by prefix or as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefix {
    prefix: String,
    exact: bool,
}

impl PathPrefix {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            exact: false,
        }
    }

    /// Matcher for exactly `path`, nothing below or beside it.
    pub fn exact(path: impl Into<String>) -> Self {
        Self {
            prefix: path.into(),
            exact: true,
        }
    }

    /// Byte-exact test: whole path for exact matchers, prefix otherwise.
    pub fn matches(&self, path: &str) -> bool {
        if self.exact {
            path.as_bytes() == self.prefix.as_bytes()
        } else {
            path.as_bytes().starts_with(self.prefix.as_bytes())
        }
    }

    /// Prefix length, used to pick the most specific route.
    pub fn len(&self) -> usize {
        self.prefix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefix.is_empty()
    }

    pub fn is_exact(&self) -> bool {
        self.exact
    }

    pub fn as_str(&self) -> &str {
        &self.prefix
    }
}
