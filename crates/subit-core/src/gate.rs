//! Request admission decisions.
//!
//! Every request walks the same short path:
//!
//! ```text
//! Start ─► legacy host + canonical URL? ─► Redirect (308)
//!       ─► enforcement off or public path? ─► Allow
//!       ─► Authenticate (session required)
//! ```
//!
//! The gate holds no per-request or cross-request state. Session
//! verification itself belongs to the identity provider; the gate only says
//! when one is required.

use url::Url;

use crate::error::RouteError;
use crate::routes::RouteTable;

/// Hostname the site was served from before moving to its own domain.
pub const DEFAULT_LEGACY_HOST: &str = "subit-ai.vercel.app";

/// Canonical site URL used in production when none is configured.
pub const PRODUCTION_SITE_URL: &str = "https://www.subitai.com";

/// Outcome of admitting a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Send a permanent redirect to `location`.
    Redirect { location: String },
    /// Let the request through without a session.
    Allow,
    /// Let the request through only with a valid session.
    Authenticate,
}

/// The canonical origin requests on the legacy host are moved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalHost {
    origin: String,
}

impl CanonicalHost {
    /// Parse a canonical site URL. Only the scheme, host and port are kept;
    /// a trailing `/` or path is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidCanonicalUrl`] if the URL is not an
    /// absolute `http` or `https` URL with a host.
    pub fn parse(site_url: &str) -> Result<Self, RouteError> {
        let invalid = |reason: &str| RouteError::InvalidCanonicalUrl {
            url: site_url.to_owned(),
            reason: reason.to_owned(),
        };

        let url = Url::parse(site_url.trim()).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if url.host_str().is_none() {
            return Err(invalid("missing host"));
        }

        Ok(Self {
            origin: url.origin().ascii_serialization(),
        })
    }

    /// `scheme://host[:port]` without a trailing slash.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Absolute URL for `path_and_query` on the canonical origin.
    #[must_use]
    pub fn url_for(&self, path_and_query: &str) -> String {
        if path_and_query.starts_with('/') {
            format!("{}{path_and_query}", self.origin)
        } else {
            format!("{}/{path_and_query}", self.origin)
        }
    }
}

/// Resolve the canonical site URL the way the site always has: an explicit
/// setting wins (trailing `/` stripped), production falls back to
/// [`PRODUCTION_SITE_URL`], and anything else has no canonical host.
///
/// # Errors
///
/// Returns [`RouteError::InvalidCanonicalUrl`] if the configured URL is invalid.
pub fn resolve_canonical(
    configured: Option<&str>,
    production: bool,
) -> Result<Option<CanonicalHost>, RouteError> {
    let configured = configured
        .map(|s| s.trim().trim_end_matches('/'))
        .filter(|s| !s.is_empty());

    match configured {
        Some(url) => CanonicalHost::parse(url).map(Some),
        None if production => CanonicalHost::parse(PRODUCTION_SITE_URL).map(Some),
        None => Ok(None),
    }
}

/// The admission gate, built once at startup and shared by reference.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    legacy_host: String,
    canonical: Option<CanonicalHost>,
    public_routes: RouteTable,
    enforce_sessions: bool,
}

impl AdmissionGate {
    /// Build a gate.
    ///
    /// With `enforce_sessions` off every path is treated as public; this is
    /// the mode used when identity-provider credentials are not configured.
    #[must_use]
    pub fn new(
        legacy_host: &str,
        canonical: Option<CanonicalHost>,
        public_routes: RouteTable,
        enforce_sessions: bool,
    ) -> Self {
        Self {
            legacy_host: legacy_host.trim().to_ascii_lowercase(),
            canonical,
            public_routes,
            enforce_sessions,
        }
    }

    #[must_use]
    pub fn enforces_sessions(&self) -> bool {
        self.enforce_sessions
    }

    #[must_use]
    pub fn canonical(&self) -> Option<&CanonicalHost> {
        self.canonical.as_ref()
    }

    #[must_use]
    pub fn public_routes(&self) -> &RouteTable {
        &self.public_routes
    }

    /// Decide what to do with a request.
    ///
    /// `host` is the raw `Host` header (`None` if absent or not UTF-8);
    /// `path_and_query` is the request target as received.
    #[must_use]
    pub fn admit(&self, host: Option<&str>, path_and_query: &str) -> Admission {
        if let Some(location) = self.canonical_redirect(host, path_and_query) {
            return Admission::Redirect { location };
        }

        let path = path_and_query
            .split_once('?')
            .map_or(path_and_query, |(path, _)| path);

        if !self.enforce_sessions || self.public_routes.is_public(path) {
            Admission::Allow
        } else {
            Admission::Authenticate
        }
    }

    /// Location to redirect to when the request arrived on the legacy host.
    #[must_use]
    pub fn canonical_redirect(&self, host: Option<&str>, path_and_query: &str) -> Option<String> {
        let hostname = host.and_then(hostname_of)?;
        if !hostname.eq_ignore_ascii_case(&self.legacy_host) {
            return None;
        }

        let Some(canonical) = &self.canonical else {
            tracing::debug!(host = %hostname, "request on legacy host but no canonical URL configured");
            return None;
        };

        Some(canonical.url_for(path_and_query))
    }
}

/// Hostname part of a `Host` header, without port. `None` for empty input.
fn hostname_of(host: &str) -> Option<&str> {
    let host = host.trim();
    if host.is_empty() {
        return None;
    }

    // Bracketed IPv6 literal, e.g. `[::1]:8080`.
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split_once(']').map(|(addr, _)| addr);
    }

    let name = host.split(':').next().unwrap_or(host);
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn gate(canonical: Option<&str>, enforce: bool) -> AdmissionGate {
        let canonical = canonical.map(|u| CanonicalHost::parse(u).unwrap());
        AdmissionGate::new(
            DEFAULT_LEGACY_HOST,
            canonical,
            RouteTable::with_defaults::<&str>(&[]).unwrap(),
            enforce,
        )
    }

    #[test]
    fn legacy_host_redirects_to_canonical_path() {
        let g = gate(Some("https://www.subitai.com"), true);
        assert_eq!(
            g.admit(Some("subit-ai.vercel.app"), "/pricing"),
            Admission::Redirect {
                location: "https://www.subitai.com/pricing".to_owned()
            }
        );
    }

    #[test]
    fn redirect_ignores_port_and_keeps_query() {
        let g = gate(Some("https://www.subitai.com/"), true);
        assert_eq!(
            g.admit(Some("subit-ai.vercel.app:443"), "/dashboard?tab=usage"),
            Admission::Redirect {
                location: "https://www.subitai.com/dashboard?tab=usage".to_owned()
            }
        );
    }

    #[test]
    fn redirect_happens_before_auth_and_for_protected_paths() {
        let g = gate(Some("https://www.subitai.com"), true);
        assert!(matches!(
            g.admit(Some("SUBIT-AI.vercel.app"), "/dashboard/billing"),
            Admission::Redirect { .. }
        ));
    }

    #[test]
    fn legacy_host_without_canonical_is_not_redirected() {
        let g = gate(None, true);
        assert_eq!(g.admit(Some("subit-ai.vercel.app"), "/pricing"), Admission::Allow);
    }

    #[test]
    fn malformed_or_missing_host_does_not_redirect() {
        let g = gate(Some("https://www.subitai.com"), true);
        assert_eq!(g.admit(None, "/pricing"), Admission::Allow);
        assert_eq!(g.admit(Some(""), "/pricing"), Admission::Allow);
        assert_eq!(g.admit(Some(":8080"), "/pricing"), Admission::Allow);
    }

    #[test]
    fn canonical_host_is_not_redirected() {
        let g = gate(Some("https://www.subitai.com"), true);
        assert_eq!(g.admit(Some("www.subitai.com"), "/pricing"), Admission::Allow);
    }

    #[test]
    fn public_path_is_allowed_and_protected_needs_session() {
        let g = gate(None, true);
        assert_eq!(g.admit(Some("www.subitai.com"), "/pricing"), Admission::Allow);
        assert_eq!(
            g.admit(Some("www.subitai.com"), "/dashboard/billing"),
            Admission::Authenticate
        );
    }

    #[test]
    fn query_string_does_not_affect_classification() {
        let g = gate(None, true);
        assert_eq!(g.admit(None, "/pricing?plan=pro"), Admission::Allow);
        assert_eq!(g.admit(None, "/dashboard?x=/pricing"), Admission::Authenticate);
    }

    #[test]
    fn disabled_enforcement_allows_everything() {
        let g = gate(None, false);
        assert!(!g.enforces_sessions());
        assert_eq!(g.admit(None, "/dashboard/billing"), Admission::Allow);
    }

    #[test]
    fn canonical_url_validation() {
        assert!(CanonicalHost::parse("ftp://example.com").is_err());
        assert!(CanonicalHost::parse("not a url").is_err());
        let c = CanonicalHost::parse("http://localhost:3000/").unwrap();
        assert_eq!(c.origin(), "http://localhost:3000");
        assert_eq!(c.url_for("about"), "http://localhost:3000/about");
    }

    #[test]
    fn resolve_canonical_precedence() {
        let explicit = resolve_canonical(Some("https://staging.subitai.com/"), true).unwrap();
        assert_eq!(explicit.unwrap().origin(), "https://staging.subitai.com");

        let prod = resolve_canonical(None, true).unwrap();
        assert_eq!(prod.unwrap().origin(), PRODUCTION_SITE_URL);

        assert_eq!(resolve_canonical(Some("  "), false).unwrap(), None);
        assert_eq!(resolve_canonical(None, false).unwrap(), None);
    }

    #[test]
    fn hostname_parsing() {
        assert_eq!(hostname_of("example.com:80"), Some("example.com"));
        assert_eq!(hostname_of("[::1]:8080"), Some("::1"));
        assert_eq!(hostname_of("   "), None);
    }
}
