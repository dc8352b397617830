//! Public-route classification.
//!
//! Paths are matched against an ordered table of typed matchers. Patterns use
//! the identity provider's route syntax: a literal path matches exactly, a
//! trailing `(.*)` matches the literal prefix followed by anything, and any
//! other regex syntax is compiled as an anchored regular expression.

use regex::Regex;

use crate::error::RouteError;

/// Paths reachable without a session: marketing pages, blog, auth flows,
/// legal pages, crawler documents and every API route.
pub const DEFAULT_PUBLIC_ROUTES: &[&str] = &[
    "/",
    "/pricing",
    "/features",
    "/about",
    "/blog(.*)",
    "/auth(.*)",
    "/privacy",
    "/terms",
    "/cookies",
    "/sitemap.xml",
    "/robots.txt",
    "/api(.*)",
];

const WILDCARD_SUFFIX: &str = "(.*)";

/// Whether a path needs a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Public,
    Protected,
}

/// A single compiled route pattern.
#[derive(Debug, Clone)]
pub enum RouteMatcher {
    /// Matches one path exactly.
    Exact(String),
    /// Matches any path starting with the literal prefix.
    Prefix(String),
    /// Matches paths the anchored expression accepts in full.
    Regex(Regex),
}

impl RouteMatcher {
    /// Compile a route pattern.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidPattern`] if the pattern is empty, does
    /// not start with `/`, or contains an invalid regular expression.
    pub fn parse(pattern: &str) -> Result<Self, RouteError> {
        let pattern = pattern.trim();
        if !pattern.starts_with('/') {
            return Err(RouteError::InvalidPattern {
                pattern: pattern.to_owned(),
                reason: "pattern must start with '/'".to_owned(),
            });
        }

        if let Some(prefix) = pattern.strip_suffix(WILDCARD_SUFFIX) {
            if !has_regex_syntax(prefix) {
                return Ok(Self::Prefix(prefix.to_owned()));
            }
        }

        if has_regex_syntax(pattern) {
            let re = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
                RouteError::InvalidPattern {
                    pattern: pattern.to_owned(),
                    reason: e.to_string(),
                }
            })?;
            return Ok(Self::Regex(re));
        }

        Ok(Self::Exact(normalize(pattern).to_owned()))
    }

    /// Whether this matcher accepts the path.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(p) => normalize(path) == p.as_str(),
            Self::Prefix(p) => path.starts_with(p.as_str()),
            Self::Regex(re) => re.is_match(path),
        }
    }
}

/// Ordered list of public-route matchers.
#[derive(Debug, Clone)]
pub struct RouteTable {
    matchers: Vec<RouteMatcher>,
}

impl RouteTable {
    /// Compile a table from patterns, preserving their order.
    ///
    /// # Errors
    ///
    /// Returns the first [`RouteError::InvalidPattern`] encountered.
    pub fn new<I, S>(patterns: I) -> Result<Self, RouteError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let matchers = patterns
            .into_iter()
            .map(|p| RouteMatcher::parse(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { matchers })
    }

    /// The default public-route table plus any extra patterns.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidPattern`] if an extra pattern is invalid.
    pub fn with_defaults<S: AsRef<str>>(extra: &[S]) -> Result<Self, RouteError> {
        let patterns = DEFAULT_PUBLIC_ROUTES
            .iter()
            .copied()
            .chain(extra.iter().map(AsRef::<str>::as_ref));
        Self::new(patterns)
    }

    /// Classify a request path (without query string).
    #[must_use]
    pub fn classify(&self, path: &str) -> RouteClass {
        if self.matchers.iter().any(|m| m.matches(path)) {
            RouteClass::Public
        } else {
            RouteClass::Protected
        }
    }

    #[must_use]
    pub fn is_public(&self, path: &str) -> bool {
        self.classify(path) == RouteClass::Public
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

fn has_regex_syntax(s: &str) -> bool {
    s.chars().any(|c| {
        matches!(
            c,
            '(' | ')' | '[' | ']' | '{' | '}' | '*' | '+' | '?' | '|' | '^' | '$' | '\\'
        )
    })
}

/// `/pricing/` and `/pricing` are the same page.
fn normalize(path: &str) -> &str {
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn defaults() -> RouteTable {
        RouteTable::with_defaults::<&str>(&[]).unwrap()
    }

    #[test]
    fn parse_picks_matcher_kind() {
        assert!(matches!(RouteMatcher::parse("/pricing").unwrap(), RouteMatcher::Exact(p) if p == "/pricing"));
        assert!(matches!(RouteMatcher::parse("/blog(.*)").unwrap(), RouteMatcher::Prefix(p) if p == "/blog"));
        assert!(matches!(RouteMatcher::parse("/posts/[0-9]+").unwrap(), RouteMatcher::Regex(_)));
    }

    #[test]
    fn parse_rejects_relative_and_broken_patterns() {
        assert!(RouteMatcher::parse("pricing").is_err());
        assert!(RouteMatcher::parse("").is_err());
        assert!(RouteMatcher::parse("/bad[").is_err());
    }

    #[test]
    fn marketing_pages_are_public() {
        let table = defaults();
        for path in ["/", "/pricing", "/features", "/about", "/privacy", "/terms", "/cookies"] {
            assert!(table.is_public(path), "{path} should be public");
        }
    }

    #[test]
    fn wildcard_prefixes_match_anything_after() {
        let table = defaults();
        assert!(table.is_public("/blog"));
        assert!(table.is_public("/blog/launch-week"));
        assert!(table.is_public("/auth/login"));
        assert!(table.is_public("/auth/callback"));
        assert!(table.is_public("/api/project-energy/p1"));
        assert!(table.is_public("/sitemap.xml"));
        assert!(table.is_public("/robots.txt"));
    }

    #[test]
    fn dashboard_is_protected() {
        let table = defaults();
        assert_eq!(table.classify("/dashboard"), RouteClass::Protected);
        assert_eq!(table.classify("/dashboard/billing"), RouteClass::Protected);
        assert_eq!(table.classify("/checkout/pro"), RouteClass::Protected);
    }

    #[test]
    fn exact_match_does_not_extend_to_children() {
        let table = defaults();
        assert!(!table.is_public("/pricing/enterprise"));
        assert!(!table.is_public("/about-us"));
    }

    #[test]
    fn trailing_slash_is_ignored_for_exact_routes() {
        let table = defaults();
        assert!(table.is_public("/pricing/"));
    }

    #[test]
    fn extra_patterns_extend_the_table() {
        let table = RouteTable::with_defaults(&["/faq", "/careers(.*)"]).unwrap();
        assert_eq!(table.len(), DEFAULT_PUBLIC_ROUTES.len() + 2);
        assert!(table.is_public("/faq"));
        assert!(table.is_public("/careers/engineer"));
    }

    #[test]
    fn regex_matcher_is_anchored() {
        let m = RouteMatcher::parse("/v[0-9]+/status").unwrap();
        assert!(m.matches("/v2/status"));
        assert!(!m.matches("/v2/status/extra"));
        assert!(!m.matches("/prefix/v2/status"));
    }
}
