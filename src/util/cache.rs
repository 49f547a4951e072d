//! Keyed HTTP client cache with explicit invalidation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use sha2::{Digest, Sha256};

use crate::error::Result;

/// Identity of a cached client: endpoint plus a fingerprint of the credential.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey {
    base_url: String,
    credential: Option<String>,
}

impl ClientKey {
    pub fn new(base_url: &str, api_key: Option<&str>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credential: api_key.map(fingerprint),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn fingerprint(secret: &str) -> String {
    format!("{:x}", Sha256::digest(secret.as_bytes()))
}

/// Memoizes one `reqwest::Client` per endpoint/credential pair.
///
/// Owned by the orchestration root and passed by reference. When a client is
/// requested for an endpoint with a different credential than the cached one,
/// the stale entry for that endpoint is dropped.
#[derive(Clone, Default)]
pub struct ClientCache {
    inner: Arc<RwLock<HashMap<ClientKey, reqwest::Client>>>,
}

impl ClientCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached client for `key`, building it on a miss.
    pub fn get_or_build<F>(&self, key: &ClientKey, build: F) -> Result<reqwest::Client>
    where
        F: FnOnce() -> Result<reqwest::Client>,
    {
        if let Some(client) = self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return Ok(client.clone());
        }

        let client = build()?;
        let mut entries = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|existing, _| existing.base_url != key.base_url);
        entries.insert(key.clone(), client.clone());
        tracing::debug!(base_url = %key.base_url, "built http client");
        Ok(client)
    }

    /// Drop every client for `base_url`.
    pub fn invalidate_endpoint(&self, base_url: &str) {
        let base_url = base_url.trim_end_matches('/');
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|key, _| key.base_url != base_url);
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Current number of entries.
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
