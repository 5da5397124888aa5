use std::future::Future;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlobError {
    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("local storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Key-addressed storage of opaque payloads.
///
/// A missing key is `Ok(None)`, never an error, so callers can tell "nothing
/// stored yet" apart from an unreachable or misbehaving backend.
pub trait BlobStore: Send + Sync {
    /// Human-readable name of the store, used in status messages.
    fn location(&self) -> String;

    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>, BlobError>> + Send;

    /// Replaces whatever is stored at `key`.
    fn put(&self, key: &str, body: Vec<u8>) -> impl Future<Output = Result<(), BlobError>> + Send;
}
