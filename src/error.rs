// src/error.rs

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Source of a transport failure, so custom fetchers can report their own errors.
///
/// Reference-counted so that one failed fetch can be handed to every caller
/// that was waiting on it.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// The primary error type for the `nila-idp` library.
///
/// Failures fall into three groups:
/// * [`NilaIdpError::AccessToken`]: the bearer token is not acceptable. This
///   includes [`DiscoveryError`], which is carried inside [`AccessTokenError`].
/// * [`NilaIdpError::Transport`] and [`NilaIdpError::Timeout`]: the issuer could
///   not be reached at all.
/// * Configuration errors raised while building a resolver.
#[derive(Debug, Clone, Error)]
pub enum NilaIdpError {
    /// The bearer token was rejected.
    #[error(transparent)]
    AccessToken(#[from] AccessTokenError),

    /// An HTTP request to the issuer failed before a response was received (DNS, TLS, connect).
    #[error("HTTP request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: SharedError,
    },

    /// An HTTP request to the issuer did not complete in time.
    #[error("HTTP request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    /// The issuer is not a valid `https` issuer identifier.
    #[error("Invalid issuer: {0}")]
    InvalidIssuer(String),

    /// A provided URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A required configuration field is missing.
    #[error("A required configuration field is missing: {0}")]
    MissingConfiguration(String),

    /// A configuration value is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl NilaIdpError {
    /// `true` when the token itself was rejected, including discovery failures.
    pub fn is_access_token_error(&self) -> bool {
        matches!(self, NilaIdpError::AccessToken(_))
    }

    /// `true` when the issuer metadata or signing key could not be resolved.
    pub fn is_discovery_error(&self) -> bool {
        matches!(self, NilaIdpError::AccessToken(AccessTokenError::Discovery(_)))
    }

    /// `true` when the issuer was unreachable.
    pub fn is_transport_error(&self) -> bool {
        matches!(self, NilaIdpError::Transport { .. } | NilaIdpError::Timeout { .. })
    }
}

impl From<DiscoveryError> for NilaIdpError {
    fn from(err: DiscoveryError) -> Self {
        NilaIdpError::AccessToken(AccessTokenError::Discovery(err))
    }
}

/// An error that occurs while processing a bearer token.
///
/// These are client-input errors: the request is not authenticated and
/// should not be retried with the same token.
#[derive(Debug, Clone, Error)]
pub enum AccessTokenError {
    #[error("Authorization header missing")]
    MissingHeader,

    #[error("Authorization header must start with 'Bearer'")]
    NotBearer,

    #[error("Bearer token not found")]
    MissingToken,

    #[error("Authorization header must be a valid Bearer token")]
    MalformedHeader,

    #[error("Bearer token does not have 'kid' claim")]
    MissingKeyId,

    /// The token could not be decoded or failed signature/claim verification.
    #[error("Invalid bearer token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    /// The token header names an algorithm the resolver does not accept.
    #[error("Unsupported JWT algorithm: {0:?}")]
    UnsupportedAlgorithm(jsonwebtoken::Algorithm),

    /// The signing key cannot be used to verify an asymmetric signature.
    #[error("Unsupported signing key '{kid}': {reason}")]
    UnsupportedKey { kid: String, reason: String },

    #[error("'at_hash' claim is required to verify the access token")]
    MissingAtHash,

    #[error("'at_hash' claim does not match the access token")]
    AtHashMismatch,

    #[error("'azp' claim does not match client ID")]
    AzpMismatch,

    #[error("'sub' claim is not a valid identity")]
    InvalidSubject,

    /// The issuer's signing keys could not be resolved.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

/// An error that occurs during the OIDC discovery process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    #[error("Issuer openid-configuration missing 'jwks_uri'")]
    MissingJwksUri,

    #[error("Issuer 'jwks_uri' is not a valid URL: {0}")]
    InvalidJwksUri(String),

    #[error("Keyset missing required field 'keys'")]
    MissingKeys,

    #[error("{url} responded with HTTP {status}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("{url} did not return a valid JSON document: {reason}")]
    MalformedDocument { url: String, reason: String },

    #[error("Signing key with ID '{0}' was not found")]
    KeyNotFound(String),
}
