//! Local metadata cache seam. Implementations live outside the SDK (the
//! file-backed store crate, or an in-memory map in tests); the resolver only
//! needs get-by-key and put-under-aliases.

use crate::metadata::content::LessonMetadata;

/// A local key→record cache. Misses are not errors; only `put` can fail,
/// and it reports failures as plain strings since callers can do nothing
/// beyond logging them.
pub trait MetadataCache: Send {
    fn get(&mut self, key: &str) -> Option<LessonMetadata>;

    /// Store `metadata` under `id` and every alias. Returns the id.
    fn put(
        &mut self,
        id: &str,
        metadata: &LessonMetadata,
        aliases: &[String],
    ) -> Result<String, String>;
}

/// Cache that remembers nothing. Used when no local store is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl MetadataCache for NoopCache {
    fn get(&mut self, _key: &str) -> Option<LessonMetadata> {
        None
    }

    fn put(
        &mut self,
        id: &str,
        _metadata: &LessonMetadata,
        _aliases: &[String],
    ) -> Result<String, String> {
        Ok(id.to_string())
    }
}
