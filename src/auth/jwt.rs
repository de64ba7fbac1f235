//! JWT validation with shared-secret or JWKS keys.
//!
//! HMAC-signed tokens (e.g. Supabase access tokens) are verified with the
//! configured secret. Asymmetric tokens are verified against a JWKS endpoint
//! whose keys are cached and refreshed on a timer or on an unknown `kid`.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use jsonwebtoken::{
    Algorithm, DecodingKey, Validation, decode, decode_header, errors::ErrorKind, jwk::JwkSet,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::AuthError;
use crate::config::JwtAuthConfig;

/// Claims extracted from a validated JWT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (identity ID)
    pub sub: String,

    /// Expiration time (Unix timestamp)
    pub exp: u64,

    /// Email claim
    #[serde(default)]
    pub email: Option<String>,

    /// Provider-specific profile data (Supabase puts display names here)
    #[serde(default)]
    pub user_metadata: Option<serde_json::Map<String, serde_json::Value>>,

    /// All other claims
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

const NAME_CLAIMS: [&str; 4] = ["full_name", "name", "user_name", "preferred_username"];

impl JwtClaims {
    /// First non-blank display name, preferring `user_metadata` over
    /// top-level claims.
    pub fn display_name(&self) -> Option<String> {
        let from_metadata = self
            .user_metadata
            .iter()
            .flat_map(|meta| NAME_CLAIMS.iter().filter_map(move |k| meta.get(*k)));
        let from_claims = NAME_CLAIMS.iter().filter_map(|k| self.extra.get(*k));

        from_metadata
            .chain(from_claims)
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .find(|v| !v.is_empty())
            .map(String::from)
    }
}

enum KeySource {
    Secret(DecodingKey),
    Jwks(JwksKeys),
}

/// Keys published at a JWKS endpoint, indexed by `kid`.
struct JwksKeys {
    url: String,
    max_age: Duration,
    http_client: reqwest::Client,
    snapshot: RwLock<Option<(Instant, HashMap<String, DecodingKey>)>>,
}

impl JwksKeys {
    /// Serve from the snapshot while it is fresh and knows `kid`, otherwise
    /// reload once. A rotated key shows up as an unknown `kid`.
    async fn lookup(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        if let Some(key) = self.cached(kid).await {
            return Ok(key);
        }

        let keys = self.fetch().await?;
        let found = keys.get(kid).cloned();
        *self.snapshot.write().await = Some((Instant::now(), keys));

        found.ok_or_else(|| {
            tracing::warn!(kid, url = %self.url, "JWT signed with a key the JWKS does not publish");
            AuthError::InvalidToken
        })
    }

    async fn cached(&self, kid: &str) -> Option<DecodingKey> {
        let snapshot = self.snapshot.read().await;
        let (loaded_at, keys) = snapshot.as_ref()?;
        if loaded_at.elapsed() >= self.max_age {
            return None;
        }
        keys.get(kid).cloned()
    }

    async fn fetch(&self) -> Result<HashMap<String, DecodingKey>, AuthError> {
        let unreachable = |e: reqwest::Error| {
            tracing::error!(error = %e, url = %self.url, "JWKS request failed");
            AuthError::Internal(format!("JWKS request failed: {e}"))
        };
        let set: JwkSet = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(unreachable)?
            .json()
            .await
            .map_err(unreachable)?;

        // Keys without a `kid` can never be selected, and unusable ones are skipped.
        let keys: HashMap<_, _> = set
            .keys
            .iter()
            .filter_map(|jwk| {
                let kid = jwk.common.key_id.clone()?;
                DecodingKey::from_jwk(jwk)
                    .inspect_err(|e| tracing::warn!(%kid, error = %e, "Skipping unusable JWK"))
                    .ok()
                    .map(|key| (kid, key))
            })
            .collect();

        tracing::info!(keys = keys.len(), url = %self.url, "Loaded JWKS");
        Ok(keys)
    }
}

/// Verifies bearer tokens against the configured key source.
pub struct JwtValidator {
    allowed_algorithms: Vec<Algorithm>,
    /// Issuer, audience and expiry rules; the algorithm is set per token.
    rules: Validation,
    keys: Option<KeySource>,
}

impl JwtValidator {
    pub fn with_client(config: JwtAuthConfig, http_client: reqwest::Client) -> Self {
        let allowed_algorithms = config
            .effective_algorithms()
            .into_iter()
            .map(|a| a.to_jwt_algorithm())
            .collect();

        let mut rules = Validation::default();
        rules.validate_exp = !config.allow_expired;
        match &config.issuer {
            Some(issuer) => rules.set_issuer(&[issuer]),
            None => rules.iss = None,
        }
        match &config.audience {
            Some(audience) => rules.set_audience(&audience.to_vec()),
            None => rules.validate_aud = false,
        }

        let keys = match (config.secret, config.jwks_url) {
            (Some(secret), _) => Some(KeySource::Secret(DecodingKey::from_secret(
                secret.as_bytes(),
            ))),
            (None, Some(url)) => Some(KeySource::Jwks(JwksKeys {
                url,
                max_age: Duration::from_secs(config.jwks_refresh_secs),
                http_client,
                snapshot: RwLock::new(None),
            })),
            (None, None) => None,
        };

        Self {
            allowed_algorithms,
            rules,
            keys,
        }
    }

    /// Validate a JWT and return the claims.
    pub async fn validate(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let header = decode_header(token).map_err(|e| {
            tracing::debug!(error = %e, "Unreadable JWT header");
            AuthError::InvalidToken
        })?;

        // Checked before key lookup so a token cannot pick its own algorithm.
        if !self.allowed_algorithms.contains(&header.alg) {
            tracing::warn!(
                algorithm = ?header.alg,
                allowed = ?self.allowed_algorithms,
                "JWT algorithm not allowed"
            );
            return Err(AuthError::InvalidToken);
        }

        let key = match &self.keys {
            None => return Err(AuthError::NotConfigured),
            Some(KeySource::Secret(key)) => key.clone(),
            Some(KeySource::Jwks(jwks)) => {
                let Some(kid) = header.kid.as_deref() else {
                    tracing::debug!("JWT has no kid to select a JWKS key");
                    return Err(AuthError::InvalidToken);
                };
                jwks.lookup(kid).await?
            }
        };

        let mut validation = self.rules.clone();
        validation.algorithms = vec![header.alg];

        let claims = decode::<JwtClaims>(token, &key, &validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "JWT rejected");
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                    _ => AuthError::InvalidToken,
                }
            })?
            .claims;

        if claims.sub.trim().is_empty() {
            tracing::debug!("JWT has an empty subject");
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }
}
