//! CSV encoding of row sets, as stored in the blob store.

use thiserror::Error;

use crate::row::{Row, RowSet};

pub const HEADER: [&str; 6] = ["Timestamp", "Open", "High", "Low", "Close", "Volume"];

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("unexpected CSV header: {found}")]
    Header { found: String },
    #[error("malformed CSV record: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush CSV buffer: {0}")]
    Flush(String),
}

/// Encodes rows with a `Timestamp,Open,High,Low,Close,Volume` header.
pub fn encode(rows: &RowSet) -> Result<Vec<u8>, CodecError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(HEADER)?;
    for row in rows {
        writer.serialize(row)?;
    }

    writer
        .into_inner()
        .map_err(|e| CodecError::Flush(e.error().to_string()))
}

/// Decodes a previously encoded blob. An empty blob is an empty row set.
pub fn decode(bytes: &[u8]) -> Result<RowSet, CodecError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(RowSet::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader.headers()?;
    if !is_known_header(headers) {
        return Err(CodecError::Header {
            found: headers.iter().collect::<Vec<_>>().join(","),
        });
    }
    reader.set_headers(csv::StringRecord::from(HEADER.to_vec()));

    reader
        .deserialize::<Row>()
        .map(|record| record.map_err(CodecError::from))
        .collect()
}

/// Blobs written by the earlier pipeline left the index column unnamed, so
/// an empty first cell is read as `Timestamp`.
fn is_known_header(headers: &csv::StringRecord) -> bool {
    let mut cells = headers.iter();
    matches!(cells.next(), Some("Timestamp" | ""))
        && cells.eq(HEADER[1..].iter().copied())
}
