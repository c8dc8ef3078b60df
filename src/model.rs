// src/model.rs

use crate::error::DiscoveryError;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;
use url::Url;

/// Represents an OIDC provider's discovery document.
/// Found at the `.well-known/openid-configuration` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct OidcConfig {
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub jwks_uri: Option<String>,
    /// Remaining provider metadata (strings or string lists).
    #[serde(flatten)]
    pub metadata: HashMap<String, Value>,
}

impl OidcConfig {
    /// Reads a discovery document fetched from `url`.
    pub fn from_document(url: &Url, document: Value) -> Result<Self, DiscoveryError> {
        if !document.is_object() {
            return Err(DiscoveryError::MalformedDocument {
                url: url.to_string(),
                reason: "expected a JSON object".to_string(),
            });
        }
        serde_json::from_value(document).map_err(|e| DiscoveryError::MalformedDocument {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    /// The JWKS location advertised by the issuer.
    pub fn jwks_uri(&self) -> Result<Url, DiscoveryError> {
        let raw = self
            .jwks_uri
            .as_deref()
            .filter(|uri| !uri.is_empty())
            .ok_or(DiscoveryError::MissingJwksUri)?;
        Url::parse(raw).map_err(|e| DiscoveryError::InvalidJwksUri(format!("{raw}: {e}")))
    }
}

/// Represents a single JSON Web Key (JWK) as defined in RFC 7517.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JsonWebKey {
    pub kid: String,
    pub kty: String,
    #[serde(rename = "use", default)]
    pub use_purpose: Option<String>,
    #[serde(default)]
    pub alg: Option<String>,
    // RSA
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
    // EC
    #[serde(default)]
    pub crv: Option<String>,
    #[serde(default)]
    pub x: Option<String>,
    #[serde(default)]
    pub y: Option<String>,
    #[serde(flatten)]
    pub other: HashMap<String, Value>,
}

/// A JSON Web Key Set (JWKS). Replaced wholesale on every refresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeySet {
    keys: Vec<JsonWebKey>,
}

impl KeySet {
    pub fn new(keys: Vec<JsonWebKey>) -> Self {
        Self { keys }
    }

    /// Reads a JWKS document fetched from `url`.
    ///
    /// The document must carry a non-empty `keys` array. Individual entries that
    /// are not usable JWKs (for example, missing `kid`) are skipped.
    pub fn from_document(url: &Url, document: Value) -> Result<Self, DiscoveryError> {
        let entries = match document {
            Value::Object(mut object) => match object.remove("keys") {
                Some(Value::Array(entries)) if !entries.is_empty() => entries,
                _ => return Err(DiscoveryError::MissingKeys),
            },
            _ => {
                return Err(DiscoveryError::MalformedDocument {
                    url: url.to_string(),
                    reason: "expected a JSON object".to_string(),
                })
            }
        };

        let keys = entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value::<JsonWebKey>(entry) {
                Ok(jwk) => Some(jwk),
                Err(e) => {
                    warn!(jwks_uri = %url, index, error = %e, "Skipping unreadable JWK");
                    None
                }
            })
            .collect();

        Ok(Self { keys })
    }

    /// Finds the key with the given `kid`.
    pub fn find(&self, kid: &str) -> Option<&JsonWebKey> {
        self.keys.iter().find(|key| key.kid == kid)
    }

    pub fn keys(&self) -> &[JsonWebKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
