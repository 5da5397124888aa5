use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_PREFIX: &str = "alpha_vantage";

/// Blob key of one series: `{prefix}/{symbol}_{interval}.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageKey(String);

impl StorageKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn for_series(prefix: &str, symbol: &str, interval: &str) -> Self {
        let name = format!("{symbol}_{interval}.csv");
        match prefix.trim_matches('/') {
            "" => Self(name),
            prefix => Self(format!("{prefix}/{name}")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub enum WriteKind {
    Overwrite,
    Merge,
}

/// Outcome of a successful write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreReceipt {
    pub kind: WriteKind,
    pub location: String,
    pub key: StorageKey,
    /// Rows already stored before the write. Always 0 for an overwrite.
    pub existing_rows: usize,
    pub incoming_rows: usize,
    pub stored_rows: usize,
}

impl fmt::Display for StoreReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            WriteKind::Overwrite => {
                write!(f, "Data successfully stored in {}/{}", self.location, self.key)
            }
            WriteKind::Merge => write!(
                f,
                "Data successfully updated and stored in {}/{}",
                self.location, self.key
            ),
        }
    }
}
