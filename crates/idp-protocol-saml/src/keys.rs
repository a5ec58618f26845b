//! Process-wide signing key cache.
//!
//! Parsing PEM and checking the key against the certificate happens once;
//! later requests share the loaded pair. Settings changes call
//! [`KeyPairCache::invalidate`] so the next request reloads.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use idp_crypto::SigningKeyPair;
use parking_lot::{Mutex, RwLock};

use crate::error::SamlResult;

/// Lazily loaded, invalidatable signing key pair.
#[derive(Debug, Default)]
pub struct KeyPairCache {
    current: RwLock<Option<Arc<SigningKeyPair>>>,
    // Serializes loads so concurrent misses parse the keys once.
    loading: Mutex<()>,
    generation: AtomicU64,
}

impl KeyPairCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached pair, loading it with `load` on a miss.
    ///
    /// A failed load leaves the cache empty; the error is returned to the
    /// caller and the next request tries again.
    pub fn get_or_load<F>(&self, load: F) -> SamlResult<Arc<SigningKeyPair>>
    where
        F: FnOnce() -> SamlResult<SigningKeyPair>,
    {
        if let Some(keys) = self.current.read().as_ref() {
            return Ok(Arc::clone(keys));
        }

        let _guard = self.loading.lock();
        if let Some(keys) = self.current.read().as_ref() {
            return Ok(Arc::clone(keys));
        }

        let generation = self.generation.load(Ordering::Acquire);
        let keys = Arc::new(load()?);

        let mut current = self.current.write();
        // An invalidation during the load means the loaded keys may be stale.
        if self.generation.load(Ordering::Acquire) == generation {
            *current = Some(Arc::clone(&keys));
            tracing::debug!(modulus_bits = keys.modulus_bits(), "loaded IdP signing keys");
        }
        Ok(keys)
    }

    /// Drops the cached pair.
    pub fn invalidate(&self) {
        let mut current = self.current.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        if current.take().is_some() {
            tracing::info!("IdP signing key cache invalidated");
        }
    }

    /// Whether a pair is cached.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }
}
