// src/header.rs

use crate::error::AccessTokenError;
use jsonwebtoken::decode_header;

/// Extracts the compact JWT from an `Authorization: Bearer <token>` header value.
pub fn parse_authorization_header(header: &str) -> Result<&str, AccessTokenError> {
    let mut parts = header.split_whitespace();

    let scheme = parts.next().ok_or(AccessTokenError::MissingHeader)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AccessTokenError::NotBearer);
    }

    let token = parts.next().ok_or(AccessTokenError::MissingToken)?;
    if parts.next().is_some() {
        return Err(AccessTokenError::MalformedHeader);
    }

    Ok(token)
}

/// Reads the `kid` from the token's JOSE header without verifying the signature.
///
/// Nothing else in the header is trusted at this point.
pub fn unverified_key_id(token: &str) -> Result<String, AccessTokenError> {
    let header = decode_header(token)?;
    header
        .kid
        .filter(|kid| !kid.is_empty())
        .ok_or(AccessTokenError::MissingKeyId)
}
