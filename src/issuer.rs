// src/issuer.rs

use crate::error::NilaIdpError;
use std::fmt;
use url::Url;

const DISCOVERY_PATH: &str = ".well-known/openid-configuration";

/// An OpenID Connect Issuer Identifier.
///
/// Issuers always use the `https` scheme. A bare host such as `"id.example.com"`
/// is coerced to `"https://id.example.com"`; any other scheme is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issuer {
    raw: String,
    url: Url,
}

impl Issuer {
    /// Parses and normalizes an issuer URL or bare host.
    pub fn parse(issuer: &str) -> Result<Self, NilaIdpError> {
        let issuer = issuer.trim();
        if issuer.is_empty() {
            return Err(NilaIdpError::InvalidIssuer("issuer is empty".to_string()));
        }

        let input = if issuer.contains("://") {
            issuer.to_string()
        } else {
            format!("https://{issuer}")
        };

        let url = Url::parse(&input).map_err(|e| NilaIdpError::InvalidIssuer(format!("{input}: {e}")))?;
        // Lowercased scheme and host, default port removed, no trailing slash.
        let raw = url.as_str().trim_end_matches('/').to_string();

        if url.scheme() != "https" {
            return Err(NilaIdpError::InvalidIssuer(
                "OIDC issuer MUST use the 'https' scheme".to_string(),
            ));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(NilaIdpError::InvalidIssuer(format!("{raw}: missing host")));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(NilaIdpError::InvalidIssuer(format!(
                "{raw}: issuer must not have a query or fragment"
            )));
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(NilaIdpError::InvalidIssuer(format!(
                "{raw}: issuer must not have userinfo"
            )));
        }

        Ok(Self { raw, url })
    }

    /// The normalized issuer identifier, without a trailing slash.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The parsed issuer URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The issuer's `.well-known/openid-configuration` URL.
    pub fn discovery_url(&self) -> Result<Url, NilaIdpError> {
        let base = self.raw.trim_end_matches('/');
        Url::parse(&format!("{base}/{DISCOVERY_PATH}")).map_err(|e| NilaIdpError::InvalidUrl(e.to_string()))
    }

    /// Values accepted for the `iss` claim: the issuer with and without a trailing slash.
    pub(crate) fn accepted_iss_values(&self) -> [String; 2] {
        let base = self.raw.trim_end_matches('/');
        [base.to_string(), format!("{base}/")]
    }
}

impl fmt::Display for Issuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for Issuer {
    type Err = NilaIdpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
