pub mod aggregator;
pub mod allowance;
pub mod config;
pub mod error;
pub mod ledger;
pub mod metadata;
pub mod network;
pub mod node;
pub mod orchestrator;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;

// Core types
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use network::Network;
pub use node::QuizstakeNode;
pub use types::{
    Address, ONE_TOKEN, Pool, PoolStatus, TOKEN_DECIMALS, UserStake, format_units, parse_units,
};

// Ledger seams
pub use ledger::{
    CallHandle, LedgerCall, LedgerReader, PoolCreationParams, Receipt, TxRef, WalletBackend,
};

// Transaction orchestration
pub use allowance::{AllowanceCheck, AllowanceGate};
pub use orchestrator::{
    TransactionOrchestrator, TransactionRecord, TxEvent, TxKind, TxStatus, advance,
};

// Lessons
pub use aggregator::{Lesson, PoolAggregator};
pub use metadata::{
    Difficulty, HttpMetadataStore, LessonMetadata, MetadataCache, MetadataResolver, NoopCache,
    PublishRequest, Question, RemoteMetadataStore,
};
