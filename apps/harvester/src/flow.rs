use stockpile_alphavantage::AlphaVantageError;
use stockpile_store::{merge, store, BlobError, BlobStore, MergeError, StorageKey, StoreError, StoreReceipt};
use thiserror::Error;
use tracing::info;

use crate::config::ConfigError;
use crate::fetcher::{make_api_call, QuoteSource, SeriesRequest};
use crate::retry::{RetryPolicy, Retryable};

#[derive(Error, Debug)]
pub enum TaskError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("upstream data error: {0}")]
    Upstream(#[from] AlphaVantageError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Merge(#[from] MergeError),
    #[error("blob store unavailable: {0}")]
    Backend(#[from] BlobError),
}

impl Retryable for TaskError {
    fn is_retryable(&self) -> bool {
        match self {
            TaskError::Config(_) => false,
            TaskError::Upstream(
                AlphaVantageError::UnknownInterval(_) | AlphaVantageError::UnknownOutputSize(_),
            ) => false,
            TaskError::Upstream(_) => true,
            TaskError::Store(e) => e.is_transient(),
            TaskError::Merge(e) => e.is_transient(),
            TaskError::Backend(_) => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FlowOptions {
    pub request: SeriesRequest,
    pub key: StorageKey,
    /// Overwrite the key with the fetched rows before merging them.
    pub overwrite_first: bool,
}

/// Fetch, normalize and merge one series into the blob store. Each step is
/// retried on its own; a failed step does not undo earlier ones.
pub async fn get_data_to_store<Q: QuoteSource, S: BlobStore>(
    source: &Q,
    blobs: &S,
    options: &FlowOptions,
    policy: &RetryPolicy,
) -> Result<StoreReceipt, TaskError> {
    info!("Starting the data retrieval flow.");

    let request = &options.request;
    let key = &options.key;

    let rows = policy
        .run("make_api_call", move || async move {
            make_api_call(source, request).await.map_err(TaskError::from)
        })
        .await?;
    let rows = &rows;

    if options.overwrite_first {
        let receipt = policy
            .run("store_to_blob", move || async move {
                store(blobs, rows, key).await.map_err(TaskError::from)
            })
            .await?;
        info!("{receipt}");
    }

    let receipt = policy
        .run("append_to_blob", move || async move {
            merge(blobs, rows, key).await.map_err(TaskError::from)
        })
        .await?;
    info!("{receipt}");

    Ok(receipt)
}
