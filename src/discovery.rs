// src/discovery.rs

use crate::config::Config;
use crate::error::{DiscoveryError, NilaIdpError};
use crate::fetch::{HttpFetcher, JsonFetcher, DEFAULT_HTTP_TIMEOUT};
use crate::issuer::Issuer;
use crate::model::{JsonWebKey, KeySet, OidcConfig};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Fetches and caches an issuer's JSON Web Key Set.
///
/// The keyset is discovered through the issuer's `.well-known/openid-configuration`
/// document (or taken from an explicit JWKS URI) and kept as an immutable
/// snapshot. A lookup for an unknown `kid` refetches the keyset once, which
/// recovers from the issuer rotating its keys.
///
/// The cache is cheap to clone; clones share the same snapshot.
#[derive(Clone)]
pub struct KeySetCache {
    // The cache is internally ref-counted to allow for cheap cloning.
    inner: Arc<Inner>,
}

struct Inner {
    issuer: Issuer,
    jwks_uri_override: Option<Url>,
    fetcher: Arc<dyn JsonFetcher>,
    fetch_timeout: Duration,
    key_set: RwLock<Option<Arc<KeySet>>>,
    // Held while a refresh is in flight so concurrent misses share one fetch.
    // Guards the error of the last completed fetch, if it failed.
    refresh_gate: Mutex<Option<NilaIdpError>>,
    // Number of completed fetches. Bumped with the gate held.
    fetch_generation: AtomicU64,
}

impl KeySetCache {
    /// Creates a new `KeySetCache`.
    ///
    /// # Arguments
    ///
    /// * `issuer` - The issuer whose keys are cached.
    /// * `jwks_uri_override` - Fetch keys from this URI instead of performing discovery.
    /// * `fetcher` - Performs the HTTP GET requests.
    /// * `fetch_timeout` - Upper bound on each discovery or JWKS request.
    pub fn new(
        issuer: Issuer,
        jwks_uri_override: Option<Url>,
        fetcher: Arc<dyn JsonFetcher>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                issuer,
                jwks_uri_override,
                fetcher,
                fetch_timeout,
                key_set: RwLock::new(None),
                refresh_gate: Mutex::new(None),
                fetch_generation: AtomicU64::new(0),
            }),
        }
    }

    /// Creates a cache for `issuer` that discovers its keys over HTTPS.
    pub fn for_issuer(issuer: Issuer) -> Result<Self, NilaIdpError> {
        let fetcher = HttpFetcher::new(DEFAULT_HTTP_TIMEOUT)?;
        Ok(Self::new(issuer, None, Arc::new(fetcher), DEFAULT_HTTP_TIMEOUT))
    }

    /// Creates a cache from a resolver configuration, using the `reqwest` fetcher.
    pub fn from_config(config: &Config) -> Result<Self, NilaIdpError> {
        let fetcher = HttpFetcher::new(config.http_timeout)?;
        Ok(Self::new(
            config.issuer.clone(),
            config.jwks_uri.clone(),
            Arc::new(fetcher),
            config.http_timeout,
        ))
    }

    pub fn issuer(&self) -> &Issuer {
        &self.inner.issuer
    }

    /// Finds the signing key with the given key ID.
    ///
    /// If the key is not in the cached keyset, the keyset is fetched exactly
    /// once more before giving up with [`DiscoveryError::KeyNotFound`].
    /// Transport failures are returned immediately and leave the cached keyset
    /// in place.
    #[instrument(skip(self), fields(issuer = %self.inner.issuer), err)]
    pub async fn find_key(&self, kid: &str) -> Result<JsonWebKey, NilaIdpError> {
        let key_set = self.key_set().await?;
        if let Some(key) = key_set.find(kid) {
            debug!("Found signing key for kid: {}", kid);
            return Ok(key.clone());
        }

        warn!("Signing key for kid: {} not in cached keyset. Refreshing.", kid);
        let key_set = self.refresh(&key_set).await?;
        match key_set.find(kid) {
            Some(key) => {
                debug!("Found signing key for kid: {} after refresh", kid);
                Ok(key.clone())
            }
            None => Err(DiscoveryError::KeyNotFound(kid.to_string()).into()),
        }
    }

    /// Returns the cached keyset, fetching it first if the cache is empty.
    ///
    /// Concurrent callers that find the cache empty wait for a single fetch
    /// and share its result, including its error.
    pub async fn key_set(&self) -> Result<Arc<KeySet>, NilaIdpError> {
        if let Some(key_set) = self.cached() {
            debug!("JWKS cache hit");
            return Ok(key_set);
        }

        let observed = self.fetch_generation();
        let mut last_failure = self.inner.refresh_gate.lock().await;
        if let Some(key_set) = self.cached() {
            debug!("JWKS refreshed by a concurrent lookup");
            return Ok(key_set);
        }
        self.shared_failure(observed, &last_failure)?;

        debug!("JWKS cache miss. Fetching from provider.");
        self.install_fresh(&mut last_failure).await
    }

    /// Drops the cached keyset without making a network call.
    pub fn invalidate(&self) {
        *self.write_slot() = None;
    }

    /// `true` if a keyset is currently cached.
    pub fn is_cached(&self) -> bool {
        self.cached().is_some()
    }

    fn cached(&self) -> Option<Arc<KeySet>> {
        self.inner
            .key_set
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn write_slot(&self) -> RwLockWriteGuard<'_, Option<Arc<KeySet>>> {
        self.inner.key_set.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces `stale` with a freshly fetched keyset.
    ///
    /// If another caller already replaced `stale` while this one waited for the
    /// gate, its keyset is returned without a second fetch. If that caller's
    /// fetch failed, its error is returned instead.
    async fn refresh(&self, stale: &Arc<KeySet>) -> Result<Arc<KeySet>, NilaIdpError> {
        let observed = self.fetch_generation();
        let mut last_failure = self.inner.refresh_gate.lock().await;
        if let Some(current) = self.cached() {
            if !Arc::ptr_eq(&current, stale) {
                debug!("JWKS refreshed by a concurrent lookup");
                return Ok(current);
            }
        }
        self.shared_failure(observed, &last_failure)?;

        self.install_fresh(&mut last_failure).await
    }

    /// Fetches the keyset and installs it as the new snapshot.
    ///
    /// Must be called with the refresh gate held; `last_failure` is the value it
    /// guards. On failure the current snapshot is left untouched.
    async fn install_fresh(&self, last_failure: &mut Option<NilaIdpError>) -> Result<Arc<KeySet>, NilaIdpError> {
        let fetched = self.fetch_key_set().await;
        self.inner.fetch_generation.fetch_add(1, Ordering::Release);

        match fetched {
            Ok(key_set) => {
                *last_failure = None;
                let key_set = Arc::new(key_set);
                *self.write_slot() = Some(Arc::clone(&key_set));
                info!("Successfully fetched {} keys for issuer {}", key_set.len(), self.inner.issuer);
                Ok(key_set)
            }
            Err(e) => {
                warn!("Failed to fetch keys for issuer {}: {}", self.inner.issuer, e);
                *last_failure = Some(e.clone());
                Err(e)
            }
        }
    }

    fn fetch_generation(&self) -> u64 {
        self.inner.fetch_generation.load(Ordering::Acquire)
    }

    /// Returns the error of a fetch that completed after `observed` was read,
    /// so callers queued behind a failed fetch do not repeat it.
    fn shared_failure(&self, observed: u64, last_failure: &Option<NilaIdpError>) -> Result<(), NilaIdpError> {
        match last_failure {
            Some(err) if self.fetch_generation() != observed => {
                debug!("Sharing the failure of a concurrent JWKS fetch");
                Err(err.clone())
            }
            _ => Ok(()),
        }
    }

    async fn fetch_key_set(&self) -> Result<KeySet, NilaIdpError> {
        let jwks_uri = self.jwks_uri().await?;
        let document = self.get_json(&jwks_uri).await?;
        Ok(KeySet::from_document(&jwks_uri, document)?)
    }

    /// Determines the JWKS URI, either from the override or OIDC discovery.
    async fn jwks_uri(&self) -> Result<Url, NilaIdpError> {
        if let Some(uri) = &self.inner.jwks_uri_override {
            debug!("Using JWKS URI from config override: {}", uri);
            return Ok(uri.clone());
        }

        let discovery_url = self.inner.issuer.discovery_url()?;
        debug!("Performing OIDC discovery at: {}", discovery_url);
        let document = self.get_json(&discovery_url).await?;
        let jwks_uri = OidcConfig::from_document(&discovery_url, document)?.jwks_uri()?;
        debug!("Discovered JWKS URI: {}", jwks_uri);
        Ok(jwks_uri)
    }

    async fn get_json(&self, url: &Url) -> Result<serde_json::Value, NilaIdpError> {
        tokio::time::timeout(self.inner.fetch_timeout, self.inner.fetcher.get_json(url))
            .await
            .map_err(|_| NilaIdpError::Timeout {
                url: url.to_string(),
                timeout: self.inner.fetch_timeout,
            })?
    }
}
