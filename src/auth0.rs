// src/auth0.rs

use crate::config::{Config, ConfigBuilder};
use crate::error::NilaIdpError;
use crate::issuer::Issuer;
use crate::resolver::TokenResolver;
use jsonwebtoken::Algorithm;

/// Builds the resolver configuration for an Auth0 tenant.
///
/// Auth0 publishes its keys at `/.well-known/jwks.json`, signs with RS256, and
/// always sets `azp`, so discovery is skipped and `azp` is required.
pub fn config(domain: &str, client_id: &str, audience: &str) -> Result<Config, NilaIdpError> {
    let issuer = Issuer::parse(domain)?;
    let jwks_uri = format!("{}/.well-known/jwks.json", issuer.as_str().trim_end_matches('/'));

    ConfigBuilder::new()
        .issuer(issuer.as_str())?
        .client_id(client_id)
        .audience(audience)
        .jwks_uri(&jwks_uri)?
        .algorithms(vec![Algorithm::RS256])
        .require_azp(true)
        .build()
}

/// Creates a `TokenResolver` for tokens issued by the Auth0 tenant at `domain`.
pub fn identity_provider(domain: &str, client_id: &str, audience: &str) -> Result<TokenResolver, NilaIdpError> {
    TokenResolver::new(config(domain, client_id, audience)?)
}
