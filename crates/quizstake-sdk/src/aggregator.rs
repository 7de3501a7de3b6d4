//! Pool aggregation: merges on-chain pool records with resolved metadata
//! into `Lesson` views. Aggregation is stateless; each pass re-reads the
//! ledger and recomputes, so repeated runs against unchanged state produce
//! identical output.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ledger::LedgerReader;
use crate::metadata::content::LessonMetadata;
use crate::metadata::remote::RemoteMetadataStore;
use crate::metadata::resolver::MetadataResolver;
use crate::metadata::store_trait::MetadataCache;
use crate::types::{Pool, PoolStatus};

/// A pool joined with its resolved metadata. Derived per pass, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: u64,
    pub pool: Pool,
    pub metadata: LessonMetadata,
}

pub struct PoolAggregator<L: LedgerReader, R: RemoteMetadataStore, C: MetadataCache> {
    reader: Arc<L>,
    resolver: MetadataResolver<R, C>,
}

impl<L: LedgerReader, R: RemoteMetadataStore, C: MetadataCache> PoolAggregator<L, R, C> {
    pub fn new(reader: Arc<L>, resolver: MetadataResolver<R, C>) -> Self {
        Self { reader, resolver }
    }

    /// Merged lessons for ids `1..=min(counter, limit)`, newest first.
    ///
    /// A failed counter read is terminal; a failed individual pool read is
    /// logged and skipped, so one bad slot never hides the rest. Zeroed
    /// (never-allocated) slots are silently dropped.
    pub async fn list_lessons(&self, limit: u64) -> Result<Vec<Lesson>> {
        let counter = self.reader.pool_counter().await?;
        let count = counter.min(limit);
        log::debug!("aggregating {count} of {counter} pools");

        let mut lessons = Vec::with_capacity(count as usize);
        for id in 1..=count {
            let pool = match self.reader.get_pool(id).await {
                Ok(pool) => pool,
                Err(e) => {
                    log::warn!("skipping pool {id}: {e}");
                    continue;
                }
            };
            if pool.is_empty_slot() {
                continue;
            }
            lessons.push(self.merge(pool).await);
        }

        lessons.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(lessons)
    }

    /// One merged lesson, `None` when the slot was never allocated.
    pub async fn get_lesson(&self, id: u64) -> Result<Option<Lesson>> {
        let pool = self.reader.get_pool(id).await?;
        if pool.is_empty_slot() {
            return Ok(None);
        }
        Ok(Some(self.merge(pool).await))
    }

    /// Lessons still open for staking at `now` (unix seconds).
    pub async fn active_lessons(&self, limit: u64, now: u64) -> Result<Vec<Lesson>> {
        let mut lessons = self.list_lessons(limit).await?;
        lessons.retain(|l| l.pool.status == PoolStatus::Active && l.pool.deadline > now);
        Ok(lessons)
    }

    async fn merge(&self, pool: Pool) -> Lesson {
        let id_key = pool.id.to_string();
        let primary = if pool.metadata_uri.is_empty() {
            id_key.as_str()
        } else {
            pool.metadata_uri.as_str()
        };
        let metadata = self
            .resolver
            .resolve(primary, &id_key, pool.choices_count)
            .await;
        Lesson {
            id: pool.id,
            pool,
            metadata,
        }
    }
}
