use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Authentication configuration.
///
/// Sessions are owned by an external identity provider. The server only
/// verifies what the provider hands it: a signed bearer token, or identity
/// headers injected by an authenticating reverse proxy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Emails that receive the admin flag. Matched case-insensitively.
    #[serde(default)]
    pub admin_emails: Vec<String>,

    /// How the caller's identity is established.
    /// With no identity source every API request is rejected.
    #[serde(default)]
    pub identity: Option<IdentityConfig>,
}

impl AuthConfig {
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.identity.is_none() {
            tracing::warn!(
                "No [auth.identity] configured. All API requests will be rejected as unauthenticated."
            );
        }

        for email in &mut self.admin_emails {
            let trimmed = email.trim();
            if trimmed.is_empty() {
                return Err(ConfigError::Validation(
                    "auth.admin_emails cannot contain empty entries".into(),
                ));
            }
            *email = trimmed.to_lowercase();
        }

        match &self.identity {
            Some(identity) => identity.validate(),
            None => Ok(()),
        }
    }

    /// Whether the given email is listed in `admin_emails`.
    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.trim();
        self.admin_emails
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(email))
    }
}

/// Identity source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IdentityConfig {
    /// Bearer JWT issued by the identity provider.
    Jwt(Box<JwtAuthConfig>),

    /// Trusted identity headers set by an authenticating reverse proxy.
    ProxyAuth(ProxyAuthConfig),
}

impl IdentityConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            IdentityConfig::Jwt(c) => c.validate(),
            IdentityConfig::ProxyAuth(c) => c.validate(),
        }
    }
}

/// JWT authentication configuration.
///
/// Exactly one of `secret` (HMAC, e.g. a Supabase project's JWT secret) or
/// `jwks_url` (asymmetric keys) must be set.
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JwtAuthConfig {
    /// Shared HMAC secret.
    #[serde(default)]
    pub secret: Option<String>,

    /// JWKS URL for fetching public keys.
    #[serde(default)]
    pub jwks_url: Option<String>,

    /// Expected issuer (iss claim). Not checked when unset.
    #[serde(default)]
    pub issuer: Option<String>,

    /// Expected audience (aud claim). Can be a single value or a list.
    #[serde(default)]
    pub audience: Option<OneOrMany<String>>,

    /// How often to refresh the JWKS in seconds.
    #[serde(default = "default_jwks_refresh")]
    pub jwks_refresh_secs: u64,

    /// Allow expired tokens (for testing only!).
    #[serde(default)]
    pub allow_expired: bool,

    /// Allowed JWT signing algorithms.
    /// Defaults to HS256 with a secret and to RS256/ES256 with a JWKS URL.
    #[serde(default)]
    pub allowed_algorithms: Vec<JwtAlgorithm>,
}

impl std::fmt::Debug for JwtAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthConfig")
            .field("secret", &self.secret.as_ref().map(|_| "****"))
            .field("jwks_url", &self.jwks_url)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("jwks_refresh_secs", &self.jwks_refresh_secs)
            .field("allow_expired", &self.allow_expired)
            .field("allowed_algorithms", &self.allowed_algorithms)
            .finish()
    }
}

impl JwtAuthConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        match (&self.secret, &self.jwks_url) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::Validation(
                    "JWT auth: set either `secret` or `jwks_url`, not both".into(),
                ));
            }
            (None, None) => {
                return Err(ConfigError::Validation(
                    "JWT auth requires `secret` or `jwks_url`".into(),
                ));
            }
            (Some(secret), None) if secret.is_empty() => {
                return Err(ConfigError::Validation("JWT secret cannot be empty".into()));
            }
            (None, Some(url)) if url.is_empty() => {
                return Err(ConfigError::Validation("JWKS URL cannot be empty".into()));
            }
            _ => {}
        }

        let hmac_only = self.secret.is_some();
        for alg in self.effective_algorithms() {
            if alg.is_hmac() != hmac_only {
                return Err(ConfigError::Validation(format!(
                    "JWT algorithm {alg:?} does not match the configured key source \
                     (HMAC algorithms need `secret`, asymmetric algorithms need `jwks_url`)"
                )));
            }
        }
        Ok(())
    }

    /// Allowed algorithms, falling back to defaults for the key source.
    pub fn effective_algorithms(&self) -> Vec<JwtAlgorithm> {
        if !self.allowed_algorithms.is_empty() {
            return self.allowed_algorithms.clone();
        }
        if self.secret.is_some() {
            vec![JwtAlgorithm::HS256]
        } else {
            vec![JwtAlgorithm::RS256, JwtAlgorithm::ES256]
        }
    }
}

/// JWT signing algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JwtAlgorithm {
    HS256,
    HS384,
    HS512,
    RS256,
    RS384,
    RS512,
    ES256,
    ES384,
    PS256,
    PS384,
    PS512,
    EdDSA,
}

impl JwtAlgorithm {
    /// Convert to jsonwebtoken Algorithm.
    pub fn to_jwt_algorithm(self) -> jsonwebtoken::Algorithm {
        match self {
            JwtAlgorithm::HS256 => jsonwebtoken::Algorithm::HS256,
            JwtAlgorithm::HS384 => jsonwebtoken::Algorithm::HS384,
            JwtAlgorithm::HS512 => jsonwebtoken::Algorithm::HS512,
            JwtAlgorithm::RS256 => jsonwebtoken::Algorithm::RS256,
            JwtAlgorithm::RS384 => jsonwebtoken::Algorithm::RS384,
            JwtAlgorithm::RS512 => jsonwebtoken::Algorithm::RS512,
            JwtAlgorithm::ES256 => jsonwebtoken::Algorithm::ES256,
            JwtAlgorithm::ES384 => jsonwebtoken::Algorithm::ES384,
            JwtAlgorithm::PS256 => jsonwebtoken::Algorithm::PS256,
            JwtAlgorithm::PS384 => jsonwebtoken::Algorithm::PS384,
            JwtAlgorithm::PS512 => jsonwebtoken::Algorithm::PS512,
            JwtAlgorithm::EdDSA => jsonwebtoken::Algorithm::EdDSA,
        }
    }

    pub fn is_hmac(self) -> bool {
        matches!(
            self,
            JwtAlgorithm::HS256 | JwtAlgorithm::HS384 | JwtAlgorithm::HS512
        )
    }

    /// Check if this algorithm matches a jsonwebtoken Algorithm.
    pub fn matches(self, alg: jsonwebtoken::Algorithm) -> bool {
        self.to_jwt_algorithm() == alg
    }
}

fn default_jwks_refresh() -> u64 {
    3600 // 1 hour
}

/// Reverse proxy authentication configuration.
///
/// Trusts identity headers set by an authenticating proxy such as
/// oauth2-proxy (X-Forwarded-User, X-Forwarded-Email) or Cloudflare Access.
/// Only enable this when the server is unreachable except through that proxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProxyAuthConfig {
    /// Header containing the authenticated user's identity.
    pub identity_header: String,

    /// Header containing the user's email.
    #[serde(default)]
    pub email_header: Option<String>,

    /// Header containing the user's display name.
    #[serde(default)]
    pub name_header: Option<String>,
}

impl ProxyAuthConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.identity_header.is_empty() {
            return Err(ConfigError::Validation(
                "Proxy auth identity header cannot be empty".into(),
            ));
        }
        Ok(())
    }
}

/// A value that can be either a single item or a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T: Clone> OneOrMany<T> {
    pub fn to_vec(&self) -> Vec<T> {
        match self {
            OneOrMany::One(v) => vec![v.clone()],
            OneOrMany::Many(v) => v.clone(),
        }
    }
}
