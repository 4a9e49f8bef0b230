use thiserror::Error;

/// Errors from the durable store and the latest-value cache.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("store operation timed out after {0}ms")]
    Timeout(u64),

    #[error("malformed cache entry: {field}={value:?}")]
    MalformedEntry { field: &'static str, value: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors that drop a single stream message without stopping the consumer.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid tick: {0}")]
    Invalid(&'static str),
}
