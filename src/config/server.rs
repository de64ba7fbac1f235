use std::{net::IpAddr, time::Duration};

use http::{HeaderName, HeaderValue, Method, header};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};

use super::ConfigError;

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Loopback by default: the server normally sits behind the proxy or
    /// frontend that terminates the user's session.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted request body. Message content counts against it.
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,

    #[serde(default)]
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
            cors: CorsConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.body_limit_bytes == 0 {
            return Err(ConfigError::Validation(
                "server.body_limit_bytes must be greater than zero".into(),
            ));
        }
        self.cors.validate()
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([127, 0, 0, 1])
}

fn default_port() -> u16 {
    3000
}

fn default_body_limit() -> usize {
    1024 * 1024
}

/// Cross-origin access for a browser client served from another origin.
///
/// With no origins listed no CORS headers are sent at all.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
    /// Exact origins such as `https://chat.example.com`, or `["*"]`.
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Needed when the identity provider's session cookie must reach the
    /// proxy in front of this server. Not combinable with `"*"`.
    #[serde(default)]
    pub allow_credentials: bool,

    /// Preflight cache lifetime.
    #[serde(default = "default_cors_max_age")]
    pub max_age_secs: u64,
}

impl CorsConfig {
    fn is_wildcard(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.is_wildcard() {
            if self.allowed_origins.len() > 1 {
                return Err(ConfigError::Validation(
                    "server.cors.allowed_origins: \"*\" cannot be mixed with other origins".into(),
                ));
            }
            if self.allow_credentials {
                return Err(ConfigError::Validation(
                    "server.cors: allow_credentials cannot be used with \"*\"".into(),
                ));
            }
            return Ok(());
        }

        for origin in &self.allowed_origins {
            if HeaderValue::from_str(origin).is_err() || !origin.contains("://") {
                return Err(ConfigError::Validation(format!(
                    "server.cors.allowed_origins: invalid origin {origin:?}"
                )));
            }
        }
        Ok(())
    }

    /// The CORS layer, or `None` when no origins are configured.
    ///
    /// Origins were checked when the configuration was loaded.
    pub fn into_layer(self) -> Option<CorsLayer> {
        if self.allowed_origins.is_empty() {
            return None;
        }

        let allow_origin = if self.is_wildcard() {
            tracing::warn!("CORS allows any origin; list origins explicitly in production");
            AllowOrigin::any()
        } else {
            AllowOrigin::list(
                self.allowed_origins
                    .iter()
                    .filter_map(|origin| HeaderValue::from_str(origin).ok()),
            )
        };

        let request_id = HeaderName::from_static("x-request-id");
        Some(
            CorsLayer::new()
                .allow_origin(allow_origin)
                .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
                .expose_headers([request_id])
                .allow_credentials(self.allow_credentials)
                .max_age(Duration::from_secs(self.max_age_secs)),
        )
    }
}

fn default_cors_max_age() -> u64 {
    3600
}
