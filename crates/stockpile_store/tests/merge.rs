use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDateTime;
use stockpile_store::operations::MergeCause;
use stockpile_store::{BlobError, BlobStore, ObjectStoreBlobs, StorageKey, WriteKind, merge, store};
use stockpile_timeseries::{Row, RowSet, decode, encode};

fn ts(raw: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M").unwrap()
}

fn row(t: &str, o: f64, h: f64, l: f64, c: f64, v: u64) -> Row {
    Row {
        timestamp: ts(t),
        open: o,
        high: h,
        low: l,
        close: c,
        volume: v,
    }
}

fn ten_oclock() -> Row {
    row("2024-01-01T10:00", 1.0, 2.0, 1.0, 1.5, 100)
}

fn eleven_oclock() -> Row {
    row("2024-01-01T11:00", 2.0, 3.0, 2.0, 2.5, 200)
}

fn key() -> StorageKey {
    StorageKey::for_series("alpha_vantage", "IBM", "60min")
}

async fn stored(blobs: &impl BlobStore, key: &StorageKey) -> RowSet {
    let bytes = blobs.get(key.as_str()).await.unwrap().expect("blob exists");
    decode(&bytes).unwrap()
}

/// Counts calls and can be told to fail reads.
#[derive(Default)]
struct ScriptedStore {
    blob: Mutex<Option<Vec<u8>>>,
    fail_reads: bool,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl BlobStore for ScriptedStore {
    fn location(&self) -> String {
        "scripted".to_string()
    }

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, BlobError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads {
            return Err(BlobError::Io(io::Error::other("connection reset")));
        }
        Ok(self.blob.lock().unwrap().clone())
    }

    async fn put(&self, _key: &str, body: Vec<u8>) -> Result<(), BlobError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        *self.blob.lock().unwrap() = Some(body);
        Ok(())
    }
}

#[tokio::test]
async fn merge_absorbs_rows_already_stored() {
    let blobs = ObjectStoreBlobs::in_memory();
    let key = key();
    store(&blobs, &RowSet::from(vec![ten_oclock()]), &key)
        .await
        .unwrap();

    let receipt = merge(&blobs, &RowSet::from(vec![ten_oclock(), eleven_oclock()]), &key)
        .await
        .unwrap();

    assert_eq!(stored(&blobs, &key).await.rows(), &[ten_oclock(), eleven_oclock()]);
    assert_eq!(receipt.kind, WriteKind::Merge);
    assert_eq!(receipt.existing_rows, 1);
    assert_eq!(receipt.incoming_rows, 2);
    assert_eq!(receipt.stored_rows, 2);
    assert_eq!(
        receipt.to_string(),
        "Data successfully updated and stored in memory/alpha_vantage/IBM_60min.csv"
    );
}

#[tokio::test]
async fn merging_twice_stores_the_same_rows() {
    let blobs = ObjectStoreBlobs::in_memory();
    let key = key();
    let rows = RowSet::from(vec![ten_oclock(), eleven_oclock(), ten_oclock()]);

    merge(&blobs, &rows, &key).await.unwrap();
    let once = stored(&blobs, &key).await;
    merge(&blobs, &rows, &key).await.unwrap();
    let twice = stored(&blobs, &key).await;

    assert_eq!(once, twice);
    assert_eq!(once.len(), 2);
}

#[tokio::test]
async fn successive_merges_store_the_union() {
    let blobs = ObjectStoreBlobs::in_memory();
    let key = key();
    let noon = row("2024-01-01T12:00", 2.5, 2.7, 2.4, 2.6, 150);
    let revised_ten = row("2024-01-01T10:00", 1.0, 2.0, 1.0, 1.6, 100);

    merge(&blobs, &RowSet::from(vec![ten_oclock(), eleven_oclock()]), &key)
        .await
        .unwrap();
    merge(
        &blobs,
        &RowSet::from(vec![eleven_oclock(), noon.clone(), revised_ten.clone()]),
        &key,
    )
    .await
    .unwrap();

    assert_eq!(
        stored(&blobs, &key).await.rows(),
        &[ten_oclock(), eleven_oclock(), noon, revised_ten]
    );
}

#[tokio::test]
async fn merge_into_missing_key_stores_deduplicated_rows() {
    let blobs = ObjectStoreBlobs::in_memory();
    let key = key();
    let rows = RowSet::from(vec![eleven_oclock(), eleven_oclock(), ten_oclock()]);

    let receipt = merge(&blobs, &rows, &key).await.unwrap();

    assert_eq!(receipt.existing_rows, 0);
    assert_eq!(stored(&blobs, &key).await.rows(), &[eleven_oclock(), ten_oclock()]);
}

#[tokio::test]
async fn failed_read_aborts_without_writing() {
    let blobs = ScriptedStore {
        fail_reads: true,
        ..Default::default()
    };

    let err = merge(&blobs, &RowSet::from(vec![ten_oclock()]), &key())
        .await
        .unwrap_err();

    assert!(matches!(err.cause, MergeCause::Fetch(_)));
    assert!(err.is_transient());
    assert!(err.to_string().contains("scripted/alpha_vantage/IBM_60min.csv"));
    assert_eq!(blobs.reads.load(Ordering::SeqCst), 1);
    assert_eq!(blobs.writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unreadable_existing_blob_is_left_untouched() {
    let garbage = b"date;price\n2024-01-01;1\n".to_vec();
    let blobs = ScriptedStore {
        blob: Mutex::new(Some(garbage.clone())),
        ..Default::default()
    };

    let err = merge(&blobs, &RowSet::from(vec![ten_oclock()]), &key())
        .await
        .unwrap_err();

    assert!(matches!(err.cause, MergeCause::Decode(_)));
    assert!(!err.is_transient());
    assert_eq!(blobs.writes.load(Ordering::SeqCst), 0);
    assert_eq!(blobs.blob.lock().unwrap().as_deref(), Some(garbage.as_slice()));
}

#[tokio::test]
async fn merge_reads_once_and_writes_once() {
    let blobs = ScriptedStore::default();

    merge(&blobs, &RowSet::from(vec![ten_oclock()]), &key())
        .await
        .unwrap();

    assert_eq!(blobs.reads.load(Ordering::SeqCst), 1);
    assert_eq!(blobs.writes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn direct_store_overwrites_without_reading() {
    let blobs = ScriptedStore {
        blob: Mutex::new(Some(encode(&RowSet::from(vec![eleven_oclock()])).unwrap())),
        ..Default::default()
    };

    let receipt = store(&blobs, &RowSet::from(vec![ten_oclock()]), &key())
        .await
        .unwrap();

    assert_eq!(receipt.kind, WriteKind::Overwrite);
    assert_eq!(receipt.to_string(), "Data successfully stored in scripted/alpha_vantage/IBM_60min.csv");
    assert_eq!(blobs.reads.load(Ordering::SeqCst), 0);
    let bytes = blobs.blob.lock().unwrap().clone().unwrap();
    assert_eq!(decode(&bytes).unwrap().rows(), &[ten_oclock()]);
}

#[tokio::test]
async fn merge_into_blob_with_unnamed_index_column() {
    let blobs = ObjectStoreBlobs::in_memory();
    let key = key();
    blobs
        .put(
            key.as_str(),
            b",Open,High,Low,Close,Volume\n2024-01-01 10:00:00,1.0,2.0,1.0,1.5,100\n".to_vec(),
        )
        .await
        .unwrap();

    let receipt = merge(&blobs, &RowSet::from(vec![ten_oclock(), eleven_oclock()]), &key)
        .await
        .unwrap();

    assert_eq!(receipt.existing_rows, 1);
    assert_eq!(stored(&blobs, &key).await.rows(), &[ten_oclock(), eleven_oclock()]);
    let bytes = blobs.get(key.as_str()).await.unwrap().unwrap();
    assert!(bytes.starts_with(b"Timestamp,Open,High,Low,Close,Volume\n"));
}

#[tokio::test]
async fn signed_zero_prices_merge_as_one_row() {
    let blobs = ObjectStoreBlobs::in_memory();
    let key = key();
    let flat = row("2024-01-01T10:00", 0.0, 0.0, 0.0, 0.0, 0);
    let negative = Row { close: -0.0, ..flat.clone() };

    merge(&blobs, &RowSet::from(vec![flat.clone()]), &key).await.unwrap();
    let receipt = merge(&blobs, &RowSet::from(vec![negative]), &key).await.unwrap();

    assert_eq!(receipt.stored_rows, 1);
    assert_eq!(stored(&blobs, &key).await.rows(), &[flat]);
}
