mod error;
mod store;

pub use error::StoreError;
pub use store::MetadataStore;

pub type Result<T> = std::result::Result<T, StoreError>;
