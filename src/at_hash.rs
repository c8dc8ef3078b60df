// src/at_hash.rs

use crate::error::AccessTokenError;
use base64::engine::{general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::Algorithm;
use sha2::{Digest, Sha256, Sha384, Sha512};

/// Computes the OIDC `at_hash` of `access_token` for the ID token's algorithm:
/// the base64url encoding of the left-most half of the access token's hash.
pub fn compute(access_token: &str, algorithm: Algorithm) -> String {
    let digest = match algorithm {
        Algorithm::RS384 | Algorithm::PS384 | Algorithm::ES384 | Algorithm::HS384 => {
            Sha384::digest(access_token.as_bytes()).to_vec()
        }
        Algorithm::RS512 | Algorithm::PS512 | Algorithm::HS512 | Algorithm::EdDSA => {
            Sha512::digest(access_token.as_bytes()).to_vec()
        }
        _ => Sha256::digest(access_token.as_bytes()).to_vec(),
    };
    URL_SAFE_NO_PAD.encode(&digest[..digest.len() / 2])
}

/// Checks that the `at_hash` claim binds the ID token to `access_token`.
pub fn verify(claim: Option<&str>, access_token: &str, algorithm: Algorithm) -> Result<(), AccessTokenError> {
    let claim = claim.ok_or(AccessTokenError::MissingAtHash)?;
    if compute(access_token, algorithm) == claim {
        Ok(())
    } else {
        Err(AccessTokenError::AtHashMismatch)
    }
}
