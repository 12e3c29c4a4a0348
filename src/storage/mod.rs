//! Key-value persistence for client state.
//!
//! Everything the client keeps across reloads goes through [`KvBackend`]: the JSON session
//! snapshot under `auth-storage` and the three flat credential slots. Values are strings; callers
//! own their encoding.

use std::sync::Arc;

use thiserror::Error;

pub mod kv;

pub use kv::{FileKv, MemoryKv};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("storage serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Durable string slots. Implementations must be safe to share across tasks.
pub trait KvBackend: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove(&self, key: &str) -> StorageResult<()>;
}

pub type SharedKv = Arc<dyn KvBackend>;
