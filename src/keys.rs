// src/keys.rs

use crate::error::AccessTokenError;
use crate::model::JsonWebKey;
use jsonwebtoken::{Algorithm, DecodingKey};
use std::str::FromStr;

/// Asymmetric algorithms accepted by default.
pub const DEFAULT_ALGORITHMS: [Algorithm; 8] = [
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
    Algorithm::ES256,
    Algorithm::ES384,
];

const RSA_ALGORITHMS: [Algorithm; 6] = [
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
];

/// A public key materialized from a JWK, bound to the one algorithm it verifies.
#[derive(Clone)]
pub struct VerificationKey {
    pub algorithm: Algorithm,
    pub decoding_key: DecodingKey,
}

impl JsonWebKey {
    /// The signature algorithm this key verifies.
    ///
    /// Uses `alg` when present, otherwise infers it from `kty` and `crv`.
    pub fn algorithm(&self) -> Result<Algorithm, AccessTokenError> {
        let declared = self
            .alg
            .as_deref()
            .map(|alg| Algorithm::from_str(alg).map_err(|_| self.unsupported(format!("unknown algorithm '{alg}'"))))
            .transpose()?;

        match self.kty.as_str() {
            "RSA" => match declared {
                None => Ok(Algorithm::RS256),
                Some(alg) if RSA_ALGORITHMS.contains(&alg) => Ok(alg),
                Some(alg) => Err(self.unsupported(format!("algorithm {alg:?} cannot be used with an RSA key"))),
            },
            "EC" => {
                let curve_alg = match self.crv.as_deref() {
                    Some("P-256") => Algorithm::ES256,
                    Some("P-384") => Algorithm::ES384,
                    other => return Err(self.unsupported(format!("EC curve {other:?} is not supported"))),
                };
                match declared {
                    None => Ok(curve_alg),
                    Some(alg) if alg == curve_alg => Ok(alg),
                    Some(alg) => Err(self.unsupported(format!(
                        "algorithm {alg:?} does not match curve {:?}",
                        self.crv.as_deref().unwrap_or_default()
                    ))),
                }
            }
            kty => Err(self.unsupported(format!("key type '{kty}' is not supported"))),
        }
    }

    /// Builds the public key used to verify token signatures.
    pub fn to_verification_key(&self) -> Result<VerificationKey, AccessTokenError> {
        if self.use_purpose.as_deref().is_some_and(|purpose| purpose != "sig") {
            return Err(self.unsupported("key is not a signing key".to_string()));
        }

        let algorithm = self.algorithm()?;
        let decoding_key = match self.kty.as_str() {
            "RSA" => {
                let n = self.component("n", self.n.as_deref())?;
                let e = self.component("e", self.e.as_deref())?;
                DecodingKey::from_rsa_components(n, e)
            }
            _ => {
                let x = self.component("x", self.x.as_deref())?;
                let y = self.component("y", self.y.as_deref())?;
                DecodingKey::from_ec_components(x, y)
            }
        }
        .map_err(|e| self.unsupported(format!("malformed key material: {e}")))?;

        Ok(VerificationKey { algorithm, decoding_key })
    }

    fn component<'a>(&self, name: &str, value: Option<&'a str>) -> Result<&'a str, AccessTokenError> {
        value.ok_or_else(|| self.unsupported(format!("{} key missing '{name}' component", self.kty)))
    }

    fn unsupported(&self, reason: String) -> AccessTokenError {
        AccessTokenError::UnsupportedKey {
            kid: self.kid.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const RSA_N: &str = "0vx7agoebGcQSuuPiLJXZptN9nndrQmbXEps2aiAFbWhM78LhWx4cbbfAAtVT86zwu1RK7aPFFxuhDR1L6tSoc_BJECPebWKRXjBZCiFV4n3oknjhMstn64tZ_2W-5JsGY4Hc5n9yBXArwl93lqt7_RN5w6Cf0h4QyQ5v-65YGjQR0_FDW2QvzqY368QQMicAtaSqzs8KJZgnYb9c7d0zgdAZHzu6qMQvRL5hajrn1n91CbOpbISD08qNLyrdkt-bFTWhAI4vMQFh6WeZu0fM4lFd2NcRwr3XPksINHaQ-G_xBniIqbw0Ls1jF44-csFCur-kEgU8awapJzKnqDKgw";

    fn jwk(value: serde_json::Value) -> JsonWebKey {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn rsa_key_defaults_to_rs256() {
        let key = jwk(json!({"kid": "rsa", "kty": "RSA", "n": RSA_N, "e": "AQAB"}));
        let verification_key = key.to_verification_key().unwrap();
        assert_eq!(verification_key.algorithm, Algorithm::RS256);
    }

    #[test]
    fn rsa_key_honours_declared_algorithm() {
        let key = jwk(json!({"kid": "rsa", "kty": "RSA", "alg": "PS384", "use": "sig", "n": RSA_N, "e": "AQAB"}));
        assert_eq!(key.algorithm().unwrap(), Algorithm::PS384);
    }

    #[test]
    fn ec_key_algorithm_follows_curve() {
        let p256 = jwk(json!({"kid": "ec", "kty": "EC", "crv": "P-256", "x": "AAAA", "y": "AAAA"}));
        assert_eq!(p256.algorithm().unwrap(), Algorithm::ES256);

        let p384 = jwk(json!({"kid": "ec", "kty": "EC", "crv": "P-384", "alg": "ES384", "x": "AAAA", "y": "AAAA"}));
        assert_eq!(p384.algorithm().unwrap(), Algorithm::ES384);

        let mismatched = jwk(json!({"kid": "ec", "kty": "EC", "crv": "P-256", "alg": "ES384", "x": "AAAA", "y": "AAAA"}));
        assert!(matches!(mismatched.algorithm(), Err(AccessTokenError::UnsupportedKey { .. })));
    }

    #[test]
    fn symmetric_and_mismatched_keys_are_rejected() {
        let oct = jwk(json!({"kid": "hmac", "kty": "oct", "k": "c2VjcmV0"}));
        assert!(matches!(oct.to_verification_key(), Err(AccessTokenError::UnsupportedKey { kid, .. }) if kid == "hmac"));

        let rsa_with_hmac = jwk(json!({"kid": "rsa", "kty": "RSA", "alg": "HS256", "n": RSA_N, "e": "AQAB"}));
        assert!(rsa_with_hmac.to_verification_key().is_err());

        let encryption_key = jwk(json!({"kid": "enc", "kty": "RSA", "use": "enc", "n": RSA_N, "e": "AQAB"}));
        assert!(encryption_key.to_verification_key().is_err());
    }

    #[test]
    fn rsa_key_without_modulus_is_rejected() {
        let key = jwk(json!({"kid": "rsa", "kty": "RSA", "e": "AQAB"}));
        let err = key.to_verification_key().err().unwrap();
        assert!(err.to_string().contains("missing 'n'"), "{err}");
    }
}
