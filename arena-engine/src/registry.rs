//! Participant directory lookup
//!
//! The directory is fetched once per application session and cached; the
//! cache may go stale (a mind added after the fetch) and that is
//! acceptable — this is display metadata, not a correctness-critical
//! path. A lookup miss triggers a single refetch before giving up.

use std::collections::HashMap;
use std::sync::Arc;

use arena_common::api::MindSummary;
use arena_common::model::Mind;
use arena_common::ArenaConfig;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::RegistryError;

/// Cached directory of debate participants.
///
/// Constructed once at the composition root and shared by reference;
/// sessions only read the cache, and the single-writer refresh routine
/// holds a lock so at most one refetch is outstanding at a time.
pub struct MindRegistry {
    http: reqwest::Client,
    directory_url: String,
    request_timeout: std::time::Duration,
    cache: RwLock<HashMap<Uuid, Mind>>,
    refresh_lock: Mutex<()>,
}

impl MindRegistry {
    pub fn new(http: reqwest::Client, config: &ArenaConfig) -> Arc<Self> {
        Arc::new(Self {
            http,
            directory_url: format!("{}/api/minds", config.base_url()),
            request_timeout: config.request_timeout(),
            cache: RwLock::new(HashMap::new()),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Refetch the directory, replacing the cache.
    ///
    /// Returns the number of entries loaded. Holding `refresh_lock` across
    /// the fetch enforces the one-outstanding-refresh discipline.
    pub async fn refresh(&self) -> Result<usize, RegistryError> {
        let _guard = self.refresh_lock.lock().await;

        let summaries: Vec<MindSummary> = self
            .http
            .get(&self.directory_url)
            .timeout(self.request_timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let entries: HashMap<Uuid, Mind> = summaries
            .into_iter()
            .map(|doc| {
                let mind: Mind = doc.into();
                (mind.id, mind)
            })
            .collect();

        let count = entries.len();
        *self.cache.write().await = entries;
        info!("mind directory refreshed: {} entries", count);
        Ok(count)
    }

    /// Resolve a participant identifier to its directory entry.
    ///
    /// A miss triggers one refetch; a second miss is `NotFound`.
    pub async fn resolve(&self, id: Uuid) -> Result<Mind, RegistryError> {
        if let Some(mind) = self.cache.read().await.get(&id) {
            return Ok(mind.clone());
        }

        debug!("mind {} not cached, refetching directory", id);
        self.refresh().await?;

        self.cache
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(RegistryError::NotFound(id))
    }

    /// Number of cached directory entries
    pub async fn cached_count(&self) -> usize {
        self.cache.read().await.len()
    }
}
