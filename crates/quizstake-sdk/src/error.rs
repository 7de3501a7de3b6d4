use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no wallet identity available")]
    NoIdentity,

    #[error("wrong network: expected chain {expected}, wallet is on chain {actual}")]
    WrongNetwork { expected: u64, actual: u64 },

    #[error("a transaction is already pending")]
    TransactionPending,

    #[error("choice {choice} out of range for pool with {count} choices")]
    InvalidChoice { choice: u8, count: u8 },

    #[error("pool {0} does not exist")]
    PoolNotFound(u64),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("signature declined: {0}")]
    Declined(String),

    #[error("transaction reverted: {0}")]
    Reverted(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("metadata store error: {0}")]
    Store(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
