//! Memoization of rasterized pages, keyed by a SHA-256 of the uploaded
//! bytes. The UI re-submits the same file on every interaction, so an
//! unchanged upload must not trigger a redundant conversion.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{ConversionError, PageRasterizer, RasterizedPage};

/// Uploads rarely change within a session; a handful of entries is plenty.
const DEFAULT_CAPACITY: usize = 8;

pub struct RasterCache {
    inner: Mutex<LruCache<[u8; 32], Arc<RasterizedPage>>>,
}

impl RasterCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Returns the cached page for `pdf`, rasterizing on a miss.
    ///
    /// The lock is not held across the backend call; a concurrent miss on
    /// the same bytes rasterizes twice and the second insert wins. With a
    /// single active session that never happens.
    pub fn get_or_rasterize(
        &self,
        backend: &dyn PageRasterizer,
        pdf: &[u8],
    ) -> Result<Arc<RasterizedPage>, ConversionError> {
        let key: [u8; 32] = Sha256::digest(pdf).into();

        if let Some(hit) = self.inner.lock().get(&key) {
            debug!("raster cache hit for upload {}", hex::encode(&key[..8]));
            return Ok(hit.clone());
        }

        let page = Arc::new(backend.rasterize_first_page(pdf)?);
        self.inner.lock().put(key, page.clone());
        debug!(
            "rasterized upload {} ({} PNG bytes)",
            hex::encode(&key[..8]),
            page.png.len()
        );

        Ok(page)
    }
}

impl Default for RasterCache {
    fn default() -> Self {
        Self::new()
    }
}
