// src/config.rs

use crate::error::NilaIdpError;
use crate::fetch::DEFAULT_HTTP_TIMEOUT;
use crate::issuer::Issuer;
use crate::keys::DEFAULT_ALGORITHMS;
use jsonwebtoken::Algorithm;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Contains the validation settings for a bearer token.
///
/// This struct is used to configure the specific checks that will be performed
/// on the token's claims, such as allowed algorithms and clock skew tolerance.
#[derive(Clone, Debug)]
pub struct ValidationDetails {
    /// The signing algorithms that are permitted for the token.
    /// Tokens signed with any other algorithm will be rejected.
    pub algorithms: Vec<Algorithm>,
    /// The tolerance for clock skew when validating time-based claims like `exp` and `nbf`.
    /// Defaults to 60 seconds.
    pub leeway: Duration,
    /// Whether the `iss` claim must match the configured issuer.
    ///
    /// Off by default: keys are only ever fetched from the configured issuer,
    /// so a valid signature already ties the token to it. Turn it on for
    /// issuers that share signing keys across tenants.
    pub validate_issuer: bool,
    /// Whether tokens without an `azp` claim are rejected.
    pub require_azp: bool,
    /// Registered claims that must be present (e.g. `"exp"`, `"iat"`).
    pub required_claims: Vec<String>,
}

impl Default for ValidationDetails {
    fn default() -> Self {
        Self {
            algorithms: DEFAULT_ALGORITHMS.to_vec(),
            leeway: Duration::from_secs(60),
            validate_issuer: false,
            require_azp: false,
            required_claims: Vec::new(),
        }
    }
}

/// The main configuration for a `TokenResolver`.
///
/// It should be constructed using the `ConfigBuilder`.
#[derive(Clone, Debug)]
pub struct Config {
    /// The OpenID Connect issuer whose tokens are accepted.
    pub issuer: Issuer,
    /// The OAuth 2.0 client ID. Checked against the `azp` claim and, unless
    /// `audience` is set, the `aud` claim.
    pub client_id: String,
    /// An explicit audience for the `aud` claim.
    pub audience: Option<String>,
    /// Fetch keys from this URI instead of performing discovery.
    pub jwks_uri: Option<Url>,
    /// Upper bound on each discovery or JWKS request.
    pub http_timeout: Duration,
    /// The specific validation parameters to apply to the token.
    pub validation: ValidationDetails,
}

impl Config {
    /// The audience tokens must be issued for: `audience` if set, otherwise `client_id`.
    pub fn expected_audience(&self) -> &str {
        self.audience.as_deref().unwrap_or(&self.client_id)
    }
}

/// A builder for creating a `Config` instance.
#[derive(Default)]
pub struct ConfigBuilder {
    issuer: Option<Issuer>,
    client_id: Option<String>,
    audience: Option<String>,
    jwks_uri: Option<Url>,
    http_timeout: Option<Duration>,
    validation: ValidationDetails,
}

impl ConfigBuilder {
    /// Creates a new `ConfigBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the issuer. This is a required field.
    ///
    /// # Arguments
    ///
    /// * `issuer` - An `https` URL or a bare host, e.g. `"id.example.com"`.
    pub fn issuer(mut self, issuer: &str) -> Result<Self, NilaIdpError> {
        self.issuer = Some(Issuer::parse(issuer)?);
        Ok(self)
    }

    /// Sets the client ID of the application. This is a required field.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Sets the expected audience. Defaults to the client ID.
    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Sets an explicit JWKS URI, bypassing OIDC discovery. This is optional.
    pub fn jwks_uri(mut self, url: &str) -> Result<Self, NilaIdpError> {
        let parsed_url = Url::parse(url).map_err(|e| NilaIdpError::InvalidUrl(e.to_string()))?;
        self.jwks_uri = Some(parsed_url);
        Ok(self)
    }

    /// Sets the timeout for discovery and JWKS requests. Defaults to 10 seconds.
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }

    /// Sets the allowed signing algorithms.
    pub fn algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        self.validation.algorithms = algorithms;
        self
    }

    /// Sets the clock skew tolerance. Defaults to 60 seconds.
    pub fn leeway(mut self, leeway: Duration) -> Self {
        self.validation.leeway = leeway;
        self
    }

    /// Requires the `iss` claim to match the issuer.
    pub fn validate_issuer(mut self, validate: bool) -> Self {
        self.validation.validate_issuer = validate;
        self
    }

    /// Rejects tokens that carry no `azp` claim.
    pub fn require_azp(mut self, require: bool) -> Self {
        self.validation.require_azp = require;
        self
    }

    /// Sets registered claims that must be present in every token.
    pub fn required_claims(mut self, claims: Vec<String>) -> Self {
        self.validation.required_claims = claims;
        self
    }

    /// Consumes the builder and returns a `Config` object.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields (`issuer`, `client_id`) are missing,
    /// or if the algorithm list is empty or contains symmetric algorithms.
    pub fn build(self) -> Result<Config, NilaIdpError> {
        let issuer = self
            .issuer
            .ok_or_else(|| NilaIdpError::MissingConfiguration("issuer".to_string()))?;
        let client_id = self
            .client_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| NilaIdpError::MissingConfiguration("client_id".to_string()))?;

        if self.validation.algorithms.is_empty() {
            return Err(NilaIdpError::InvalidConfiguration(
                "at least one signing algorithm must be allowed".to_string(),
            ));
        }
        if let Some(alg) = self
            .validation
            .algorithms
            .iter()
            .find(|alg| !DEFAULT_ALGORITHMS.contains(*alg))
        {
            return Err(NilaIdpError::InvalidConfiguration(format!(
                "algorithm {alg:?} is not an asymmetric RSA/EC signature algorithm"
            )));
        }

        Ok(Config {
            issuer,
            client_id,
            audience: self.audience.filter(|aud| !aud.is_empty()),
            jwks_uri: self.jwks_uri,
            http_timeout: self.http_timeout.unwrap_or(DEFAULT_HTTP_TIMEOUT),
            validation: self.validation,
        })
    }
}

/// File or environment representation of a `Config`, e.g. loaded from YAML.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub issuer: String,
    pub client_id: String,
    #[serde(default)]
    pub audience: Option<String>,
    #[serde(default)]
    pub jwks_uri: Option<String>,
    #[serde(default)]
    pub algorithms: Option<Vec<Algorithm>>,
    #[serde(default)]
    pub leeway_seconds: Option<u64>,
    #[serde(default)]
    pub http_timeout_seconds: Option<u64>,
    #[serde(default)]
    pub validate_issuer: bool,
    #[serde(default)]
    pub require_azp: bool,
    #[serde(default)]
    pub required_claims: Vec<String>,
}

impl TryFrom<Settings> for Config {
    type Error = NilaIdpError;

    fn try_from(settings: Settings) -> Result<Self, Self::Error> {
        let mut builder = ConfigBuilder::new()
            .issuer(&settings.issuer)?
            .client_id(settings.client_id)
            .validate_issuer(settings.validate_issuer)
            .require_azp(settings.require_azp)
            .required_claims(settings.required_claims);

        if let Some(audience) = settings.audience {
            builder = builder.audience(audience);
        }
        if let Some(jwks_uri) = &settings.jwks_uri {
            builder = builder.jwks_uri(jwks_uri)?;
        }
        if let Some(algorithms) = settings.algorithms {
            builder = builder.algorithms(algorithms);
        }
        if let Some(leeway) = settings.leeway_seconds {
            builder = builder.leeway(Duration::from_secs(leeway));
        }
        if let Some(timeout) = settings.http_timeout_seconds {
            builder = builder.http_timeout(Duration::from_secs(timeout));
        }

        builder.build()
    }
}
