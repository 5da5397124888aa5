use stockpile_timeseries::{CodecError, RowSet, decode, encode};
use thiserror::Error;
use tracing::info;

use crate::blob::{BlobError, BlobStore};
use crate::models::{StorageKey, StoreReceipt, WriteKind};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to encode rows for {key}: {source}")]
    Encode { key: StorageKey, source: CodecError },
    #[error("failed to write {location}/{key}: {source}")]
    Write {
        location: String,
        key: StorageKey,
        source: BlobError,
    },
}

impl StoreError {
    /// Whether running the same write again could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Write { .. })
    }
}

#[derive(Error, Debug)]
#[error("error appending data to {location}/{key}: {cause}")]
pub struct MergeError {
    pub location: String,
    pub key: StorageKey,
    #[source]
    pub cause: MergeCause,
}

impl MergeError {
    /// Backend failures may clear up; codec failures will not.
    pub fn is_transient(&self) -> bool {
        matches!(self.cause, MergeCause::Fetch(_) | MergeCause::Write(_))
    }
}

#[derive(Error, Debug)]
pub enum MergeCause {
    #[error("reading the existing blob failed: {0}")]
    Fetch(#[source] BlobError),
    #[error("the existing blob is not a readable row set: {0}")]
    Decode(#[source] CodecError),
    #[error("encoding the merged rows failed: {0}")]
    Encode(#[source] CodecError),
    #[error("writing the merged blob failed: {0}")]
    Write(#[source] BlobError),
}

/// Encodes `rows` and overwrites `key` with them. Nothing is read.
pub async fn store<S: BlobStore>(
    blobs: &S,
    rows: &RowSet,
    key: &StorageKey,
) -> Result<StoreReceipt, StoreError> {
    let body = encode(rows).map_err(|source| StoreError::Encode {
        key: key.clone(),
        source,
    })?;

    blobs
        .put(key.as_str(), body)
        .await
        .map_err(|source| StoreError::Write {
            location: blobs.location(),
            key: key.clone(),
            source,
        })?;

    let receipt = StoreReceipt {
        kind: WriteKind::Overwrite,
        location: blobs.location(),
        key: key.clone(),
        existing_rows: 0,
        incoming_rows: rows.len(),
        stored_rows: rows.len(),
    };
    info!(key = %key, rows = rows.len(), "overwrote blob");

    Ok(receipt)
}

/// Unions `new_rows` into the row set stored at `key`.
///
/// The existing blob (if any) is decoded, `new_rows` are appended after it,
/// exact duplicate rows are dropped keeping the first occurrence, and the
/// result replaces the blob. A missing blob counts as an empty row set. The
/// key is written at most once, and only after everything before it
/// succeeded.
pub async fn merge<S: BlobStore>(
    blobs: &S,
    new_rows: &RowSet,
    key: &StorageKey,
) -> Result<StoreReceipt, MergeError> {
    let location = blobs.location();
    let fail = |cause| MergeError {
        location: location.clone(),
        key: key.clone(),
        cause,
    };

    let existing = match blobs
        .get(key.as_str())
        .await
        .map_err(|e| fail(MergeCause::Fetch(e)))?
    {
        Some(bytes) => decode(&bytes).map_err(|e| fail(MergeCause::Decode(e)))?,
        None => {
            info!(key = %key, "no existing blob, starting a new series");
            RowSet::new()
        }
    };

    let existing_rows = existing.len();
    let merged = existing.concat(new_rows).dedup();
    let body = encode(&merged).map_err(|e| fail(MergeCause::Encode(e)))?;

    blobs
        .put(key.as_str(), body)
        .await
        .map_err(|e| fail(MergeCause::Write(e)))?;

    info!(
        key = %key,
        existing_rows,
        incoming_rows = new_rows.len(),
        stored_rows = merged.len(),
        "merged rows"
    );

    Ok(StoreReceipt {
        kind: WriteKind::Merge,
        location,
        key: key.clone(),
        existing_rows,
        incoming_rows: new_rows.len(),
        stored_rows: merged.len(),
    })
}
