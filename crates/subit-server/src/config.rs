//! Server configuration for the `SubIt` edge.
//!
//! Everything is read from the environment once, at startup, into a
//! [`ServerConfig`]. Nothing downstream reads environment variables; the
//! resolved values (notably [`AuthMode`]) are passed in by reference.
//!
//! Legacy `NEXT_PUBLIC_*` names are accepted as fallbacks so the same
//! deployment environment works unchanged.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    pub environment: Environment,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
    /// Canonical site URL as configured, trailing `/` not yet stripped.
    pub site_url: Option<String>,
    /// Previous deployment hostname that is redirected to the canonical site.
    pub legacy_host: String,
    /// Extra public-route patterns appended to the defaults.
    pub extra_public_routes: Vec<String>,
    /// Directory holding the exported site served as the fallback.
    pub static_dir: PathBuf,
    /// Origins allowed to call `/api` cross-origin.
    pub allowed_origins: Vec<String>,
    /// Identity enforcement, resolved from the Clerk credentials.
    pub auth: AuthMode,
    /// Billing/usage store connection.
    pub store: StoreConfig,
}

/// Clerk credentials and session settings.
#[derive(Clone)]
pub struct ClerkConfig {
    pub publishable_key: String,
    /// Backend API key, used to fetch the instance's JWKS.
    pub secret_key: Option<String>,
    /// PEM public key for networkless verification (preferred when set).
    pub jwt_key: Option<String>,
    /// Allowed `azp` values; empty accepts any.
    pub authorized_parties: Vec<String>,
    /// Where unauthenticated page requests are sent.
    pub sign_in_url: String,
    /// Base URL of the Clerk backend API.
    pub api_url: String,
}

impl std::fmt::Debug for ClerkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClerkConfig")
            .field("publishable_key", &self.publishable_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "[redacted]"))
            .field("jwt_key", &self.jwt_key.as_ref().map(|_| "[set]"))
            .field("authorized_parties", &self.authorized_parties)
            .field("sign_in_url", &self.sign_in_url)
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Whether sessions are enforced on protected routes.
#[derive(Debug, Clone)]
pub enum AuthMode {
    /// Clerk credentials are present and well-formed.
    Enforced(ClerkConfig),
    /// Credentials are missing or malformed: every route behaves as public.
    Disabled { reason: String },
}

impl AuthMode {
    #[must_use]
    pub fn is_enforced(&self) -> bool {
        matches!(self, Self::Enforced(_))
    }
}

/// Billing/usage store connection parameters.
#[derive(Clone)]
pub enum StoreConfig {
    /// Supabase REST with the service-role key.
    Supabase { url: String, service_key: String },
    /// Direct `PostgreSQL` connection.
    Postgres { url: String },
    /// In-memory store (development only, always empty at start).
    Memory,
    /// No connection parameters: usage endpoints report a configuration error.
    Unconfigured,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Supabase { url, .. } => f
                .debug_struct("Supabase")
                .field("url", url)
                .finish_non_exhaustive(),
            Self::Postgres { .. } => f.write_str("Postgres { url: [redacted] }"),
            Self::Memory => f.write_str("Memory"),
            Self::Unconfigured => f.write_str("Unconfigured"),
        }
    }
}

const DEFAULT_BIND: ([u8; 4], u16) = ([127, 0, 0, 1], 3000);
const DEFAULT_SIGN_IN_URL: &str = "/auth/login";
const DEFAULT_CLERK_API_URL: &str = "https://api.clerk.com/v1";
const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PORT`: port to bind on, binds to `0.0.0.0`
    /// - `SUBIT_BIND_ADDR`: full bind address (overrides `PORT`, default: `127.0.0.1:3000`)
    /// - `SUBIT_ENV`: `production` or `development` (default: `development`)
    /// - `SUBIT_LOG_LEVEL`: log filter (default: `info`)
    /// - `SUBIT_SITE_URL` / `NEXT_PUBLIC_SITE_URL`: canonical site URL
    /// - `SUBIT_LEGACY_HOST`: legacy hostname (default: `subit-ai.vercel.app`)
    /// - `SUBIT_PUBLIC_ROUTES`: comma-separated extra public-route patterns
    /// - `SUBIT_STATIC_DIR`: exported site directory (default: `./public`)
    /// - `SUBIT_ALLOWED_ORIGINS`: comma-separated CORS origins for `/api`
    /// - `SUBIT_STORE`: set to `memory` to use the in-memory store
    /// - `CLERK_PUBLISHABLE_KEY` / `NEXT_PUBLIC_CLERK_PUBLISHABLE_KEY`
    /// - `CLERK_SECRET_KEY`, `CLERK_JWT_KEY`, `CLERK_AUTHORIZED_PARTIES`
    /// - `CLERK_SIGN_IN_URL` (default: `/auth/login`), `CLERK_API_URL`
    /// - `SUPABASE_URL` / `NEXT_PUBLIC_SUPABASE_URL`, `SUPABASE_SERVICE_ROLE_KEY`
    /// - `DATABASE_URL`: used when Supabase is not configured
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    #[must_use]
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset.
        let var = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
        let var_or = |primary: &str, fallback: &str| var(primary).or_else(|| var(fallback));

        // Priority: SUBIT_BIND_ADDR > PORT > default 127.0.0.1:3000
        let bind_addr = if let Some(addr) = var("SUBIT_BIND_ADDR") {
            addr.parse().unwrap_or_else(|_| SocketAddr::from(DEFAULT_BIND))
        } else if let Some(port_str) = var("PORT") {
            let port: u16 = port_str.parse().unwrap_or(DEFAULT_BIND.1);
            SocketAddr::from(([0, 0, 0, 0], port))
        } else {
            SocketAddr::from(DEFAULT_BIND)
        };

        let environment = match var("SUBIT_ENV").map(|v| v.to_lowercase()).as_deref() {
            Some("production" | "prod") => Environment::Production,
            _ => Environment::Development,
        };

        let log_level = var("SUBIT_LOG_LEVEL").unwrap_or_else(|| "info".to_owned());
        let site_url = var_or("SUBIT_SITE_URL", "NEXT_PUBLIC_SITE_URL");
        let legacy_host = var("SUBIT_LEGACY_HOST")
            .unwrap_or_else(|| subit_core::gate::DEFAULT_LEGACY_HOST.to_owned());
        let extra_public_routes = var("SUBIT_PUBLIC_ROUTES")
            .map(|v| split_list(&v))
            .unwrap_or_default();
        let static_dir = PathBuf::from(var("SUBIT_STATIC_DIR").unwrap_or_else(|| "./public".to_owned()));
        let allowed_origins = var("SUBIT_ALLOWED_ORIGINS")
            .map(|v| split_list(&v))
            .unwrap_or_else(|| vec![DEFAULT_ALLOWED_ORIGIN.to_owned()]);

        let auth = resolve_auth(
            var_or("CLERK_PUBLISHABLE_KEY", "NEXT_PUBLIC_CLERK_PUBLISHABLE_KEY"),
            var("CLERK_SECRET_KEY"),
            var("CLERK_JWT_KEY"),
            var("CLERK_AUTHORIZED_PARTIES").map(|v| split_list(&v)).unwrap_or_default(),
            var("CLERK_SIGN_IN_URL").unwrap_or_else(|| DEFAULT_SIGN_IN_URL.to_owned()),
            var("CLERK_API_URL").unwrap_or_else(|| DEFAULT_CLERK_API_URL.to_owned()),
        );

        let store = match (
            var_or("SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"),
            var("SUPABASE_SERVICE_ROLE_KEY"),
            var("DATABASE_URL"),
        ) {
            (Some(url), Some(service_key), _) => StoreConfig::Supabase { url, service_key },
            (_, _, Some(url)) => StoreConfig::Postgres { url },
            _ if var("SUBIT_STORE").is_some_and(|v| v.eq_ignore_ascii_case("memory")) => {
                StoreConfig::Memory
            }
            _ => StoreConfig::Unconfigured,
        };

        Self {
            bind_addr,
            environment,
            log_level,
            site_url,
            legacy_host,
            extra_public_routes,
            static_dir,
            allowed_origins,
            auth,
            store,
        }
    }
}

/// Decide whether Clerk credentials are usable.
///
/// A publishable key must start with `pk_`, and sessions need something to be
/// verified with: a PEM key, or a secret key (`sk_`) to fetch the JWKS.
fn resolve_auth(
    publishable_key: Option<String>,
    secret_key: Option<String>,
    jwt_key: Option<String>,
    authorized_parties: Vec<String>,
    sign_in_url: String,
    api_url: String,
) -> AuthMode {
    let Some(publishable_key) = publishable_key else {
        return AuthMode::Disabled {
            reason: "CLERK_PUBLISHABLE_KEY is not set".to_owned(),
        };
    };
    if !publishable_key.starts_with("pk_") {
        return AuthMode::Disabled {
            reason: "CLERK_PUBLISHABLE_KEY does not look like a Clerk publishable key".to_owned(),
        };
    }

    let secret_key = secret_key.filter(|k| k.starts_with("sk_"));
    if secret_key.is_none() && jwt_key.is_none() {
        return AuthMode::Disabled {
            reason: "neither a valid CLERK_SECRET_KEY nor CLERK_JWT_KEY is set".to_owned(),
        };
    }

    AuthMode::Enforced(ClerkConfig {
        publishable_key,
        secret_key,
        jwt_key,
        authorized_parties,
        sign_in_url,
        api_url: api_url.trim_end_matches('/').to_owned(),
    })
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}
