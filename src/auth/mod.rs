//! Caller identity.
//!
//! Sessions live with the external identity provider; this module only
//! verifies the credentials it issues and turns them into a [`Principal`].

mod error;
mod identity;
pub mod jwt;
mod principal;

pub use error::AuthError;
pub use identity::IdentityResolver;
pub use principal::Principal;
