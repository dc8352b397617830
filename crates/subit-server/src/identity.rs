//! Identity verification for Clerk session tokens.
//!
//! Clerk issues a short-lived RS256 session JWT. Browsers carry it in the
//! `__session` cookie; API clients send it as `Authorization: Bearer <jwt>`.
//! The gate only needs to know whether a valid session exists and who it
//! belongs to; everything else about the session stays with Clerk.
//!
//! Keys come from one of two places, decided at startup:
//! 1. **PEM key** (`CLERK_JWT_KEY`): verification needs no network access.
//! 2. **JWKS** fetched once from the Clerk backend API with the secret key;
//!    the token's `kid` header picks the key.

use std::collections::HashMap;

use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};

use crate::config::ClerkConfig;

/// Name of the cookie Clerk stores the session token in.
pub const SESSION_COOKIE: &str = "__session";

/// Allowed clock skew when checking `exp` and `nbf`, in seconds.
const CLOCK_SKEW_SECS: u64 = 5;

/// A verified identity session, attached to request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Clerk user ID (e.g., `user_2abc...`).
    pub user_id: String,
    pub session_id: Option<String>,
    pub org_id: Option<String>,
}

/// Why a request has no valid session.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No session cookie or bearer token on the request.
    #[error("no session token")]
    MissingToken,

    /// The token is malformed, has a bad signature, or fails a claim check.
    #[error("invalid session token: {0}")]
    InvalidToken(String),

    /// The token's `exp` has passed.
    #[error("session token expired")]
    Expired,

    /// Verification keys could not be loaded.
    #[error("failed to load verification keys: {0}")]
    Keys(String),
}

/// The identity collaborator the admission gate delegates to.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    /// Verify the session carried by the request headers.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when no valid session is present.
    async fn protect(&self, headers: &HeaderMap) -> Result<Session, AuthError>;

    /// The response sent to a request that needs a session but has none.
    fn challenge(&self, path_and_query: &str) -> Response;
}

/// Claims read from a Clerk session token.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ClerkClaims {
    /// Clerk user ID.
    pub sub: String,
    /// Session ID.
    #[serde(default)]
    pub sid: Option<String>,
    /// Authorized party: the origin the token was minted for.
    #[serde(default)]
    pub azp: Option<String>,
    /// Active organization, if the user is acting within one.
    #[serde(default)]
    pub org_id: Option<String>,
    pub exp: u64,
}

enum VerificationKeys {
    Single(DecodingKey),
    ByKid(HashMap<String, DecodingKey>),
}

/// Clerk session verifier.
pub struct ClerkProvider {
    keys: VerificationKeys,
    algorithm: Algorithm,
    authorized_parties: Vec<String>,
    sign_in_url: String,
}

impl std::fmt::Debug for ClerkProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys = match &self.keys {
            VerificationKeys::Single(_) => 1,
            VerificationKeys::ByKid(map) => map.len(),
        };
        f.debug_struct("ClerkProvider")
            .field("keys", &keys)
            .field("algorithm", &self.algorithm)
            .field("authorized_parties", &self.authorized_parties)
            .field("sign_in_url", &self.sign_in_url)
            .finish()
    }
}

/// Clerk's `GET /jwks` response is a standard JWK set.
async fn fetch_jwks(api_url: &str, secret_key: &str) -> Result<JwkSet, AuthError> {
    let resp = reqwest::Client::new()
        .get(format!("{api_url}/jwks"))
        .bearer_auth(secret_key)
        .send()
        .await
        .map_err(|e| AuthError::Keys(format!("JWKS request failed: {e}")))?;

    if !resp.status().is_success() {
        return Err(AuthError::Keys(format!("JWKS request returned {}", resp.status())));
    }

    resp.json::<JwkSet>()
        .await
        .map_err(|e| AuthError::Keys(format!("invalid JWKS response: {e}")))
}

impl ClerkProvider {
    /// Build a verifier from resolved Clerk configuration.
    ///
    /// Uses the PEM key when present, otherwise fetches the JWKS.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Keys`] if no usable key can be loaded.
    pub async fn from_config(config: &ClerkConfig) -> Result<Self, AuthError> {
        if let Some(pem) = &config.jwt_key {
            let key = DecodingKey::from_rsa_pem(normalize_pem(pem).as_bytes())
                .map_err(|e| AuthError::Keys(format!("invalid CLERK_JWT_KEY: {e}")))?;
            return Ok(Self::with_key(
                key,
                Algorithm::RS256,
                config.authorized_parties.clone(),
                &config.sign_in_url,
            ));
        }

        let secret_key = config
            .secret_key
            .as_deref()
            .ok_or_else(|| AuthError::Keys("no CLERK_SECRET_KEY to fetch JWKS".to_owned()))?;

        let jwks = fetch_jwks(&config.api_url, secret_key).await?;
        let mut by_kid = HashMap::new();
        for jwk in &jwks.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                continue;
            };
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => {
                    by_kid.insert(kid, key);
                }
                Err(e) => tracing::warn!(kid = %kid, error = %e, "skipping unusable JWK"),
            }
        }

        if by_kid.is_empty() {
            return Err(AuthError::Keys("JWKS contained no usable keys".to_owned()));
        }

        tracing::info!(keys = by_kid.len(), "loaded Clerk JWKS");

        Ok(Self {
            keys: VerificationKeys::ByKid(by_kid),
            algorithm: Algorithm::RS256,
            authorized_parties: config.authorized_parties.clone(),
            sign_in_url: config.sign_in_url.clone(),
        })
    }

    /// Build a verifier around a single key.
    #[must_use]
    pub fn with_key(
        key: DecodingKey,
        algorithm: Algorithm,
        authorized_parties: Vec<String>,
        sign_in_url: &str,
    ) -> Self {
        Self {
            keys: VerificationKeys::Single(key),
            algorithm,
            authorized_parties,
            sign_in_url: sign_in_url.to_owned(),
        }
    }

    fn key_for(&self, token: &str) -> Result<&DecodingKey, AuthError> {
        match &self.keys {
            VerificationKeys::Single(key) => Ok(key),
            VerificationKeys::ByKid(map) => {
                let header = jsonwebtoken::decode_header(token)
                    .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
                let kid = header
                    .kid
                    .ok_or_else(|| AuthError::InvalidToken("token has no kid".to_owned()))?;
                map.get(&kid)
                    .ok_or_else(|| AuthError::InvalidToken(format!("unknown signing key '{kid}'")))
            }
        }
    }

    /// Verify a session token and extract its claims.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Expired`] for an expired token and
    /// [`AuthError::InvalidToken`] for any other failure.
    pub fn verify(&self, token: &str) -> Result<ClerkClaims, AuthError> {
        let key = self.key_for(token)?;

        let mut validation = Validation::new(self.algorithm);
        validation.leeway = CLOCK_SKEW_SECS;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = jsonwebtoken::decode::<ClerkClaims>(token, key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        let claims = data.claims;
        if let Some(azp) = &claims.azp {
            if !self.authorized_parties.is_empty() && !self.authorized_parties.contains(azp) {
                return Err(AuthError::InvalidToken(format!("unauthorized party '{azp}'")));
            }
        }

        Ok(claims)
    }
}

#[async_trait::async_trait]
impl IdentityProvider for ClerkProvider {
    async fn protect(&self, headers: &HeaderMap) -> Result<Session, AuthError> {
        let token = session_token(headers).ok_or(AuthError::MissingToken)?;
        let claims = self.verify(token)?;
        Ok(Session {
            user_id: claims.sub,
            session_id: claims.sid,
            org_id: claims.org_id,
        })
    }

    fn challenge(&self, path_and_query: &str) -> Response {
        sign_in_redirect(&self.sign_in_url, path_and_query)
    }
}

/// `302 Found` to the sign-in page, carrying where to come back to.
#[must_use]
pub fn sign_in_redirect(sign_in_url: &str, path_and_query: &str) -> Response {
    let sep = if sign_in_url.contains('?') { '&' } else { '?' };
    let location = format!(
        "{sign_in_url}{sep}redirect_url={}",
        urlencoding::encode(path_and_query)
    );
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

/// Session token from `Authorization: Bearer`, falling back to the
/// `__session` cookie.
#[must_use]
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value)
}

/// Accept PEM keys pasted with literal `\n` sequences, as env files often have.
fn normalize_pem(pem: &str) -> String {
    pem.replace("\\n", "\n")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;
    use jsonwebtoken::{EncodingKey, Header};
    use serde_json::json;

    use super::*;

    const SECRET: &[u8] = b"test-signing-secret-test-signing-secret";

    fn now() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    fn provider(parties: &[&str]) -> ClerkProvider {
        ClerkProvider::with_key(
            DecodingKey::from_secret(SECRET),
            Algorithm::HS256,
            parties.iter().map(|p| (*p).to_owned()).collect(),
            "/auth/login",
        )
    }

    fn token(claims: &serde_json::Value) -> String {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap()
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn valid_bearer_token_yields_session() {
        let t = token(&json!({"sub": "user_1", "sid": "sess_1", "exp": now() + 60}));
        let session = provider(&[]).protect(&bearer(&t)).await.unwrap();
        assert_eq!(session.user_id, "user_1");
        assert_eq!(session.session_id.as_deref(), Some("sess_1"));
    }

    #[tokio::test]
    async fn session_cookie_is_accepted() {
        let t = token(&json!({"sub": "user_2", "exp": now() + 60}));
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; __session={t}; other=1")).unwrap(),
        );
        let session = provider(&[]).protect(&headers).await.unwrap();
        assert_eq!(session.user_id, "user_2");
    }

    #[tokio::test]
    async fn missing_token_is_reported() {
        let err = provider(&[]).protect(&HeaderMap::new()).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingToken));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let t = token(&json!({"sub": "user_1", "exp": now() - 3600}));
        let err = provider(&[]).protect(&bearer(&t)).await.unwrap_err();
        assert!(matches!(err, AuthError::Expired));
    }

    #[tokio::test]
    async fn wrong_signature_is_rejected() {
        let forged = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &json!({"sub": "user_1", "exp": now() + 60}),
            &EncodingKey::from_secret(b"someone-else-entirely-different-key"),
        )
        .unwrap();
        let err = provider(&[]).protect(&bearer(&forged)).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let err = provider(&[]).protect(&bearer("not.a.jwt")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[test]
    fn authorized_party_is_checked() {
        let p = provider(&["https://www.subitai.com"]);
        let ok = token(&json!({"sub": "u", "exp": now() + 60, "azp": "https://www.subitai.com"}));
        let bad = token(&json!({"sub": "u", "exp": now() + 60, "azp": "https://evil.example"}));
        assert!(p.verify(&ok).is_ok());
        assert!(matches!(p.verify(&bad), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn challenge_redirects_to_sign_in_with_return_path() {
        let resp = provider(&[]).challenge("/dashboard/billing?tab=cards");
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            resp.headers()[header::LOCATION],
            "/auth/login?redirect_url=%2Fdashboard%2Fbilling%3Ftab%3Dcards"
        );
    }

    #[test]
    fn sign_in_url_with_query_appends() {
        let resp = sign_in_redirect("https://accounts.subitai.com/sign-in?x=1", "/dashboard");
        assert_eq!(
            resp.headers()[header::LOCATION],
            "https://accounts.subitai.com/sign-in?x=1&redirect_url=%2Fdashboard"
        );
    }

    #[test]
    fn bearer_takes_precedence_over_cookie() {
        let mut headers = bearer("from-header");
        headers.insert(header::COOKIE, HeaderValue::from_static("__session=from-cookie"));
        assert_eq!(session_token(&headers), Some("from-header"));
    }

    #[test]
    fn empty_session_cookie_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("__session=; a=b"));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn pem_with_escaped_newlines_is_normalized() {
        assert_eq!(normalize_pem("a\\nb"), "a\nb");
    }
}
