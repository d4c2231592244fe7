//! Cached database handle with a bounded lifetime.
//!
//! The chat loop asks for a handle on every question; connecting and
//! re-introspecting each time would be wasteful, so the handle and its
//! schema are memoized against the configuration that produced them. A
//! cached entry expires after a fixed TTL and is replaced transparently,
//! as it is when the configuration changes. The replaced handle is closed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::DatabaseConfig;
use crate::db::{self, DatabaseHandle, Schema};
use crate::error::Result;

/// How long a cached handle stays valid.
pub const HANDLE_TTL: Duration = Duration::from_secs(2 * 60 * 60);

#[derive(Debug)]
struct CachedHandle {
    config: DatabaseConfig,
    handle: Arc<dyn DatabaseHandle>,
    schema: Schema,
    created_at: Instant,
}

/// Memoized database handle keyed by configuration identity.
#[derive(Debug)]
pub struct HandleCache {
    entry: Option<CachedHandle>,
    ttl: Duration,
}

impl HandleCache {
    /// Creates an empty cache with the default TTL.
    pub fn new() -> Self {
        Self::with_ttl(HANDLE_TTL)
    }

    /// Creates an empty cache with a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { entry: None, ttl }
    }

    /// Returns the cached handle and schema if one exists for this
    /// configuration and has not expired.
    pub fn cached(&self, config: &DatabaseConfig) -> Option<(Arc<dyn DatabaseHandle>, Schema)> {
        let entry = self.entry.as_ref()?;
        if entry.config != *config {
            return None;
        }
        if entry.created_at.elapsed() >= self.ttl {
            return None;
        }
        Some((Arc::clone(&entry.handle), entry.schema.clone()))
    }

    /// Returns a live handle and schema for the configuration, connecting
    /// if there is no fresh cached entry.
    ///
    /// On a miss the previous entry (stale, expired, or differently
    /// configured) is closed before the new connection is attempted. A
    /// failed connection leaves the cache empty; the error is surfaced
    /// once, with no retry.
    pub async fn get_or_connect(
        &mut self,
        config: &DatabaseConfig,
    ) -> Result<(Arc<dyn DatabaseHandle>, Schema)> {
        if let Some(cached) = self.cached(config) {
            return Ok(cached);
        }

        self.evict().await;

        let handle = db::connect(config).await?;
        let schema = match handle.introspect_schema().await {
            Ok(schema) => schema,
            Err(e) => {
                let _ = handle.close().await;
                return Err(e);
            }
        };

        debug!(
            "Cached new database handle for {}",
            config.display_string()
        );
        self.entry = Some(CachedHandle {
            config: config.clone(),
            handle: Arc::clone(&handle),
            schema: schema.clone(),
            created_at: Instant::now(),
        });

        Ok((handle, schema))
    }

    /// Stores a pre-built handle, closing any previous entry.
    ///
    /// This is primarily useful for testing with mock handles.
    pub async fn insert(
        &mut self,
        config: DatabaseConfig,
        handle: Arc<dyn DatabaseHandle>,
        schema: Schema,
    ) {
        self.evict().await;
        self.entry = Some(CachedHandle {
            config,
            handle,
            schema,
            created_at: Instant::now(),
        });
    }

    /// Drops the cached entry, closing its handle.
    pub async fn evict(&mut self) {
        if let Some(old) = self.entry.take() {
            if let Err(e) = old.handle.close().await {
                warn!("Failed to close replaced database handle: {e}");
            }
        }
    }
}

impl Default for HandleCache {
    fn default() -> Self {
        Self::new()
    }
}
