// src/lib.rs

//! OpenID Connect identity resolution for bearer tokens.
//!
//! A [`TokenResolver`](resolver::TokenResolver) turns an `Authorization: Bearer <jwt>`
//! header into a verified subject. Signing keys are discovered through the
//! issuer's `.well-known/openid-configuration` document and cached by a
//! [`KeySetCache`](discovery::KeySetCache), which refreshes once when a token
//! names a key it has not seen.

pub mod at_hash;
pub mod auth0;
pub mod config;
pub mod discovery;
pub mod error;
pub mod fetch;
pub mod header;
pub mod identity;
pub mod issuer;
pub mod keys;
pub mod model;
pub mod resolver;

pub use resolver::identity_provider;

/// The public prelude for the `nila-idp` crate.
///
/// This module re-exports the most commonly used types for convenience.
pub mod prelude {
    pub use crate::config::{Config, ConfigBuilder, Settings, ValidationDetails};
    pub use crate::discovery::KeySetCache;
    pub use crate::error::{AccessTokenError, DiscoveryError, NilaIdpError};
    pub use crate::fetch::{HttpFetcher, JsonFetcher};
    pub use crate::identity::Identity;
    pub use crate::issuer::Issuer;
    pub use crate::model::{JsonWebKey, KeySet, OidcConfig};
    pub use crate::resolver::{identity_provider, Claims, TokenResolver};
    pub use jsonwebtoken::Algorithm;
}
