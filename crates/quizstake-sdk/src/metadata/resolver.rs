//! Metadata resolution: an ordered fallback chain that always produces a
//! usable record. Remote store first (under the content key, then the pool
//! id when they differ), then the local cache under both keys, then a
//! generated placeholder. Remote failures are downgraded to misses so one
//! flaky store never blanks a lesson list.

use std::sync::{Arc, Mutex};

use crate::metadata::content::{self, LessonMetadata};
use crate::metadata::remote::RemoteMetadataStore;
use crate::metadata::store_trait::MetadataCache;

pub struct MetadataResolver<R: RemoteMetadataStore, C: MetadataCache> {
    remote: Option<Arc<R>>,
    cache: Mutex<C>,
}

impl<R: RemoteMetadataStore, C: MetadataCache> MetadataResolver<R, C> {
    pub fn new(remote: Option<Arc<R>>, cache: C) -> Self {
        Self {
            remote,
            cache: Mutex::new(cache),
        }
    }

    /// Resolve metadata for a pool. Total: every failure falls through to
    /// the next tier and the last tier cannot fail. The result is always
    /// normalized against the pool's on-chain `choice_count`.
    pub async fn resolve(
        &self,
        primary: &str,
        secondary: &str,
        choice_count: u8,
    ) -> LessonMetadata {
        if let Some(found) = self.fetch_remote(primary, secondary).await {
            self.cache_remote_hit(primary, secondary, &found);
            return content::normalize(found, choice_count);
        }

        if let Some(found) = self.lookup_cache(primary, secondary) {
            return content::normalize(found, choice_count);
        }

        content::normalize(content::placeholder(primary, choice_count), choice_count)
    }

    async fn fetch_remote(&self, primary: &str, secondary: &str) -> Option<LessonMetadata> {
        let remote = self.remote.as_ref()?;
        let mut keys = vec![primary];
        if secondary != primary {
            keys.push(secondary);
        }
        for key in keys {
            match remote.fetch(key).await {
                Ok(Some(metadata)) => return Some(metadata),
                Ok(None) => {}
                Err(e) => {
                    log::debug!("remote metadata fetch for {key} failed: {e}");
                }
            }
        }
        None
    }

    fn lookup_cache(&self, primary: &str, secondary: &str) -> Option<LessonMetadata> {
        let mut cache = self.cache.lock().ok()?;
        cache.get(primary).or_else(|| {
            if secondary != primary {
                cache.get(secondary)
            } else {
                None
            }
        })
    }

    /// Write a remote hit through to the cache so later passes survive an
    /// outage. Cache write failures are logged and otherwise ignored.
    fn cache_remote_hit(&self, primary: &str, secondary: &str, metadata: &LessonMetadata) {
        let Ok(mut cache) = self.cache.lock() else {
            return;
        };
        let aliases: Vec<String> = if secondary != primary {
            vec![secondary.to_string()]
        } else {
            Vec::new()
        };
        if let Err(e) = cache.put(primary, metadata, &aliases) {
            log::warn!("caching metadata for {primary} failed: {e}");
        }
    }
}
