#![allow(dead_code)]

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use nila_idp::prelude::*;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{pkcs8::DecodePrivateKey, RsaPrivateKey};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use url::Url;

pub const ISSUER: &str = "https://id.test.local";
pub const DISCOVERY_URL: &str = "https://id.test.local/.well-known/openid-configuration";
pub const JWKS_URL: &str = "https://id.test.local/.well-known/jwks.json";
pub const CLIENT_ID: &str = "client-1";
pub const KID: &str = "test-kid";

const SIGNING_KEY_PEM: &str = include_str!("../fixtures/signing_key.pem");
const ROGUE_SIGNING_KEY_PEM: &str = include_str!("../fixtures/rogue_signing_key.pem");

/// Installs a test subscriber so `RUST_LOG=debug cargo test` shows the library's traces.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// An RSA signing key together with its public JWK.
pub struct TestKey {
    pub kid: String,
    encoding_key: EncodingKey,
    n: String,
    e: String,
}

impl TestKey {
    fn from_pem(kid: &str, pem: &str) -> Self {
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem).unwrap();
        let pkcs1_der = private_key.to_pkcs1_der().unwrap();
        let public_key = private_key.to_public_key();
        Self {
            kid: kid.to_string(),
            encoding_key: EncodingKey::from_rsa_der(pkcs1_der.as_bytes()),
            n: base64_url::encode(&public_key.n().to_bytes_be()),
            e: base64_url::encode(&public_key.e().to_bytes_be()),
        }
    }

    /// The key published in the test issuer's JWKS.
    pub fn signing(kid: &str) -> Self {
        Self::from_pem(kid, SIGNING_KEY_PEM)
    }

    /// A different key, never published by the issuer.
    pub fn rogue(kid: &str) -> Self {
        Self::from_pem(kid, ROGUE_SIGNING_KEY_PEM)
    }

    pub fn jwk(&self) -> Value {
        json!({
            "kty": "RSA",
            "n": self.n,
            "e": self.e,
            "alg": "RS256",
            "use": "sig",
            "kid": self.kid,
        })
    }

    pub fn jwk_with_alg(&self, alg: &str) -> Value {
        let mut jwk = self.jwk();
        jwk["alg"] = json!(alg);
        jwk
    }

    /// Signs `claims` with RS256 and this key's `kid`.
    pub fn mint(&self, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.kid.clone());
        encode(&header, claims, &self.encoding_key).unwrap()
    }

    /// Signs `claims` without a `kid` header.
    pub fn mint_without_kid(&self, claims: &Value) -> String {
        encode(&Header::new(Algorithm::RS256), claims, &self.encoding_key).unwrap()
    }
}

pub fn now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()
}

/// Claims of a valid token for `sub`, issued to `CLIENT_ID`.
pub fn claims_for(sub: &str) -> Value {
    let now = now();
    json!({
        "iss": ISSUER,
        "sub": sub,
        "aud": CLIENT_ID,
        "azp": CLIENT_ID,
        "iat": now,
        "exp": now + 3600,
    })
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

pub fn discovery_document() -> Value {
    json!({
        "issuer": ISSUER,
        "jwks_uri": JWKS_URL,
        "id_token_signing_alg_values_supported": ["RS256"],
    })
}

pub fn jwks(keys: &[Value]) -> Value {
    json!({ "keys": keys })
}

#[derive(Clone)]
pub enum MockResponse {
    Json(Value),
    Status(u16),
    ConnectionRefused,
    Hang,
}

/// An in-memory `JsonFetcher` that counts requests per URL.
#[derive(Default)]
pub struct MockFetcher {
    responses: Mutex<HashMap<String, MockResponse>>,
    calls: Mutex<HashMap<String, usize>>,
    delay: Duration,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves the standard discovery document and a JWKS with `keys`.
    pub fn with_issuer(keys: &[Value]) -> Self {
        let fetcher = Self::new();
        fetcher.respond(DISCOVERY_URL, MockResponse::Json(discovery_document()));
        fetcher.respond(JWKS_URL, MockResponse::Json(jwks(keys)));
        fetcher
    }

    /// Delays every response, widening the window for concurrent requests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn respond(&self, url: &str, response: MockResponse) {
        self.responses.lock().unwrap().insert(url.to_string(), response);
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl JsonFetcher for MockFetcher {
    async fn get_json(&self, url: &Url) -> Result<Value, NilaIdpError> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;
        let response = self.responses.lock().unwrap().get(url.as_str()).cloned();

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match response {
            Some(MockResponse::Json(document)) => Ok(document),
            Some(MockResponse::Status(status)) => Err(DiscoveryError::UnexpectedStatus {
                url: url.to_string(),
                status,
            }
            .into()),
            Some(MockResponse::ConnectionRefused) => Err(NilaIdpError::Transport {
                url: url.to_string(),
                source: Arc::new(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                )),
            }),
            Some(MockResponse::Hang) => std::future::pending().await,
            None => Err(DiscoveryError::UnexpectedStatus {
                url: url.to_string(),
                status: 404,
            }
            .into()),
        }
    }
}

pub fn key_set_cache(fetcher: &Arc<MockFetcher>) -> KeySetCache {
    KeySetCache::new(
        Issuer::parse(ISSUER).unwrap(),
        None,
        Arc::clone(fetcher) as Arc<dyn JsonFetcher>,
        Duration::from_secs(5),
    )
}

/// A resolver for the test issuer and `CLIENT_ID`, backed by `fetcher`.
pub fn resolver(fetcher: &Arc<MockFetcher>) -> TokenResolver {
    resolver_with(fetcher, |builder| builder)
}

pub fn resolver_with(
    fetcher: &Arc<MockFetcher>,
    configure: impl FnOnce(ConfigBuilder) -> ConfigBuilder,
) -> TokenResolver {
    let builder = ConfigBuilder::new().issuer(ISSUER).unwrap().client_id(CLIENT_ID);
    let config = configure(builder).build().unwrap();
    let cache = KeySetCache::new(
        config.issuer.clone(),
        config.jwks_uri.clone(),
        Arc::clone(fetcher) as Arc<dyn JsonFetcher>,
        config.http_timeout,
    );
    TokenResolver::with_key_set_cache(config, cache)
}
