// src/resolver.rs

use crate::at_hash;
use crate::config::{Config, ConfigBuilder};
use crate::discovery::KeySetCache;
use crate::error::{AccessTokenError, NilaIdpError};
use crate::header::{parse_authorization_header, unverified_key_id};
use crate::identity::Identity;
use crate::keys::VerificationKey;
use crate::model::JsonWebKey;
use jsonwebtoken::{decode, Validation};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, instrument};

/// The claims decoded from a verified bearer token.
///
/// `sub` is kept as a raw JSON value so that a token with a non-string
/// subject can be rejected explicitly instead of failing to decode.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<Value>,
    #[serde(default)]
    pub at_hash: Option<String>,
    /// All remaining claims (`aud`, `azp`, `exp`, `iss`, custom claims).
    /// A claim set to `null` is kept as `Value::Null`.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Claims {
    /// Looks up a JSON-valued claim by name. `at_hash` is exposed as a field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match name {
            "sub" => self.sub.as_ref(),
            _ => self.other.get(name),
        }
    }

    fn contains(&self, name: &str) -> bool {
        match name {
            "at_hash" => self.at_hash.is_some(),
            _ => self.get(name).is_some_and(|value| !value.is_null()),
        }
    }
}

/// Resolves `Authorization: Bearer` headers into verified subject identities.
///
/// This struct is initialized with a `Config` and should be created once per
/// issuer and reused for all requests. Clones share the same key cache.
#[derive(Clone)]
pub struct TokenResolver {
    config: Arc<Config>,
    key_set_cache: KeySetCache,
}

impl TokenResolver {
    /// Creates a resolver that discovers the issuer's keys over HTTPS.
    pub fn new(config: Config) -> Result<Self, NilaIdpError> {
        let key_set_cache = KeySetCache::from_config(&config)?;
        Ok(Self::with_key_set_cache(config, key_set_cache))
    }

    /// Creates a resolver that uses an existing key cache for the same issuer.
    pub fn with_key_set_cache(config: Config, key_set_cache: KeySetCache) -> Self {
        Self {
            config: Arc::new(config),
            key_set_cache,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The cache holding the issuer's signing keys.
    pub fn key_set_cache(&self) -> &KeySetCache {
        &self.key_set_cache
    }

    /// Validates an `Authorization` header and returns the token's subject.
    ///
    /// This method performs, in order:
    /// 1. Parsing of the `Bearer <token>` header.
    /// 2. Extraction of the unverified `kid` from the token header.
    /// 3. Signing key lookup, refreshing the issuer's keys once on a miss.
    /// 4. Signature and claim verification (`aud`, time claims, optional `iss`,
    ///    and `at_hash` when `access_token` is given).
    /// 5. The `azp` check against the client ID.
    /// 6. Extraction of the `sub` claim.
    ///
    /// # Arguments
    ///
    /// * `authorization_header` - The raw `Authorization` header value.
    /// * `access_token` - An access token issued alongside the ID token. When
    ///   given, the token's `at_hash` claim must bind to it.
    #[instrument(skip(self, authorization_header, access_token), fields(issuer = %self.config.issuer), err)]
    pub async fn resolve(
        &self,
        authorization_header: &str,
        access_token: Option<&str>,
    ) -> Result<Identity, NilaIdpError> {
        let token = parse_authorization_header(authorization_header)?;
        let kid = unverified_key_id(token)?;
        let jwk = self.key_set_cache.find_key(&kid).await?;

        let claims = self.verify(token, &jwk, access_token)?;
        self.check_authorized_party(&claims)?;
        let subject = subject(claims)?;

        debug!("Bearer token verified for subject: {}", subject);
        Ok(Identity::Subject(subject))
    }

    /// Verifies `token` with `jwk` and returns its claims.
    pub fn verify(
        &self,
        token: &str,
        jwk: &JsonWebKey,
        access_token: Option<&str>,
    ) -> Result<Claims, AccessTokenError> {
        let VerificationKey {
            algorithm,
            decoding_key,
        } = jwk.to_verification_key()?;

        if !self.config.validation.algorithms.contains(&algorithm) {
            return Err(AccessTokenError::UnsupportedAlgorithm(algorithm));
        }

        let mut validation = Validation::new(algorithm);
        validation.leeway = self.config.validation.leeway.as_secs();
        validation.validate_nbf = true;
        validation.set_audience(&[self.config.expected_audience()]);
        validation.set_required_spec_claims(&["aud"]);
        if self.config.validation.validate_issuer {
            validation.set_issuer(&self.config.issuer.accepted_iss_values());
        }

        let claims = decode::<Claims>(token, &decoding_key, &validation)?.claims;

        if let Some(missing) = self
            .config
            .validation
            .required_claims
            .iter()
            .find(|name| !claims.contains(name))
        {
            return Err(AccessTokenError::InvalidToken(
                jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(missing.clone()).into(),
            ));
        }

        if let Some(access_token) = access_token {
            at_hash::verify(claims.at_hash.as_deref(), access_token, algorithm)?;
        }

        Ok(claims)
    }

    fn check_authorized_party(&self, claims: &Claims) -> Result<(), AccessTokenError> {
        match claims.get("azp") {
            Some(Value::String(azp)) if *azp == self.config.client_id => Ok(()),
            Some(_) => Err(AccessTokenError::AzpMismatch),
            None if self.config.validation.require_azp => Err(AccessTokenError::AzpMismatch),
            None => Ok(()),
        }
    }
}

fn subject(claims: Claims) -> Result<String, AccessTokenError> {
    match claims.sub {
        Some(Value::String(sub)) if !sub.is_empty() => Ok(sub),
        _ => Err(AccessTokenError::InvalidSubject),
    }
}

/// Creates a new OpenID Connect identity provider.
///
/// # Arguments
///
/// * `issuer` - The OpenID Connect Issuer Identifier, as an `https` URL or bare host.
/// * `client_id` - The OAuth 2.0 Client Identifier issued by the authorization server.
/// * `audience` - The audience tokens are intended for. If omitted, `client_id` is used.
///
/// # Returns
///
/// A `TokenResolver` that validates JWTs created by `issuer` and extracts subject names.
pub fn identity_provider(
    issuer: &str,
    client_id: &str,
    audience: Option<&str>,
) -> Result<TokenResolver, NilaIdpError> {
    let mut builder = ConfigBuilder::new().issuer(issuer)?.client_id(client_id);
    if let Some(audience) = audience {
        builder = builder.audience(audience);
    }
    TokenResolver::new(builder.build()?)
}
