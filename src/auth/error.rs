use thiserror::Error;

/// Why a request could not be tied to a principal.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No authentication credentials provided
    #[error("Authentication credentials required")]
    MissingCredentials,

    /// Invalid token (bad signature, wrong issuer or audience, disallowed algorithm)
    #[error("Invalid authentication token")]
    InvalidToken,

    /// Token has expired
    #[error("Authentication token has expired")]
    ExpiredToken,

    /// No identity source is configured, so nobody can authenticate
    #[error("No identity source configured")]
    NotConfigured,

    /// Internal error during authentication (e.g. JWKS endpoint unreachable)
    #[error("Internal authentication error: {0}")]
    Internal(String),
}
