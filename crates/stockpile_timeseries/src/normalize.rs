//! Repair of upstream time-series payloads into typed rows.
//!
//! The provider returns a mapping of timestamp to a mapping of field name to
//! string value. Malformed responses sometimes leave cells out, which shifts
//! the remaining cells out of their columns. When that happens the index is
//! treated as an ordinary column, the cells are relabeled by position and
//! every row that still cannot be read is dropped.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::row::{Row, RowSet, parse_timestamp};

/// Number of value columns after the timestamp: open, high, low, close, volume.
const VALUE_COLUMNS: usize = 5;

/// One upstream entry before any typing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    pub timestamp: String,
    pub fields: BTreeMap<String, Option<String>>,
}

impl RawRow {
    pub fn new(timestamp: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Option<String>) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    fn cell(&self, column: &str) -> Option<&str> {
        self.fields.get(column).and_then(|value| value.as_deref())
    }
}

/// Upstream entries in timestamp-string order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSeries {
    rows: Vec<RawRow>,
}

impl RawSeries {
    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Union of field names across all rows, sorted. The provider numbers its
    /// fields (`1. open` .. `5. volume`) so sorting restores their position.
    fn columns(&self) -> Vec<&str> {
        self.rows
            .iter()
            .flat_map(|row| row.fields.keys().map(String::as_str))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl FromIterator<RawRow> for RawSeries {
    fn from_iter<I: IntoIterator<Item = RawRow>>(iter: I) -> Self {
        let mut rows: Vec<RawRow> = iter.into_iter().collect();
        rows.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Self { rows }
    }
}

/// Converts a raw series into typed rows, repairing misaligned rows if any
/// cell is missing. Rows that cannot be read are dropped without error.
pub fn normalize(raw: &RawSeries) -> RowSet {
    let columns = raw.columns();
    let has_missing = raw
        .rows
        .iter()
        .any(|row| columns.iter().any(|column| row.cell(column).is_none()));

    let rows: RowSet = if has_missing {
        raw.rows
            .iter()
            .filter_map(|row| repair_row(row, &columns))
            .collect()
    } else {
        raw.rows
            .iter()
            .filter_map(|row| typed_row(&row.timestamp, value_cells(row, &columns)))
            .collect()
    };

    let dropped = raw.len() - rows.len();
    if dropped > 0 {
        debug!(dropped, repaired = has_missing, "dropped unreadable upstream rows");
    }

    rows
}

fn value_cells<'a>(row: &'a RawRow, columns: &[&str]) -> [Option<&'a str>; VALUE_COLUMNS] {
    std::array::from_fn(|i| columns.get(i).and_then(|column| row.cell(column)))
}

/// Relabels `[index, cells..]` positionally as
/// `Timestamp, Open, High, Low, Close, Volume`.
fn repair_row(row: &RawRow, columns: &[&str]) -> Option<Row> {
    let mut cells = std::iter::once(Some(row.timestamp.as_str()))
        .chain(columns.iter().map(|column| row.cell(column)));

    let timestamp = cells.next().flatten()?;
    let values: [Option<&str>; VALUE_COLUMNS] = std::array::from_fn(|_| cells.next().flatten());

    typed_row(timestamp, values)
}

fn typed_row(timestamp: &str, values: [Option<&str>; VALUE_COLUMNS]) -> Option<Row> {
    let [open, high, low, close, volume] = values;

    Some(Row {
        timestamp: parse_timestamp(timestamp)?,
        open: parse_price(open?)?,
        high: parse_price(high?)?,
        low: parse_price(low?)?,
        close: parse_price(close?)?,
        volume: parse_volume(volume?)?,
    })
}

fn parse_price(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(|value| if value == 0.0 { 0.0 } else { value })
}

fn parse_volume(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    raw.parse::<u64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|value| value.is_finite() && *value >= 0.0 && value.fract() == 0.0)
            .map(|value| value as u64)
    })
}
