//! Lesson metadata: content records, the remote store client, the local
//! cache seam and the fallback-chain resolver.

pub mod content;
pub mod remote;
pub mod resolver;
pub mod store_trait;

pub use content::{Difficulty, LessonMetadata, Question};
pub use remote::{HttpMetadataStore, PublishRequest, RemoteMetadataStore};
pub use resolver::MetadataResolver;
pub use store_trait::{MetadataCache, NoopCache};
