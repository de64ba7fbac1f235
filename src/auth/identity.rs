use std::sync::Arc;

use axum::http::{HeaderMap, header};

use super::{AuthError, Principal, jwt::JwtValidator};
use crate::config::{AuthConfig, IdentityConfig, ProxyAuthConfig};

/// Where caller identity comes from.
enum IdentitySource {
    /// `Authorization: Bearer <jwt>` issued by the identity provider.
    Jwt(Arc<JwtValidator>),
    /// Headers set by an authenticating reverse proxy.
    Proxy(ProxyAuthConfig),
    /// Nothing configured; every request is rejected.
    Disabled,
}

/// Turns request credentials into a [`Principal`].
pub struct IdentityResolver {
    source: IdentitySource,
    config: AuthConfig,
}

impl IdentityResolver {
    pub fn new(config: &AuthConfig, http_client: reqwest::Client) -> Self {
        let source = match &config.identity {
            Some(IdentityConfig::Jwt(jwt)) => IdentitySource::Jwt(Arc::new(
                JwtValidator::with_client(jwt.as_ref().clone(), http_client),
            )),
            Some(IdentityConfig::ProxyAuth(proxy)) => IdentitySource::Proxy(proxy.clone()),
            None => IdentitySource::Disabled,
        };

        Self {
            source,
            config: config.clone(),
        }
    }

    /// Resolve the caller. Fails closed on anything missing or invalid.
    pub async fn resolve(&self, headers: &HeaderMap) -> Result<Principal, AuthError> {
        let (id, email, name) = match &self.source {
            IdentitySource::Jwt(validator) => {
                let token = extract_bearer_token(headers).ok_or(AuthError::MissingCredentials)?;
                let claims = validator.validate(token).await?;
                let name = claims.display_name();
                (claims.sub, claims.email, name)
            }
            IdentitySource::Proxy(config) => {
                let id = header_value(headers, &config.identity_header)
                    .ok_or(AuthError::MissingCredentials)?;
                let email = config
                    .email_header
                    .as_deref()
                    .and_then(|h| header_value(headers, h));
                let name = config
                    .name_header
                    .as_deref()
                    .and_then(|h| header_value(headers, h));
                (id, email, name)
            }
            IdentitySource::Disabled => return Err(AuthError::NotConfigured),
        };

        let email = email.filter(|e| !e.trim().is_empty());
        let is_admin = email
            .as_deref()
            .is_some_and(|e| self.config.is_admin_email(e));

        Ok(Principal {
            id,
            email,
            name,
            is_admin,
        })
    }
}

/// Extract a bearer token from the Authorization header.
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Non-blank header value, trimmed.
fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}
