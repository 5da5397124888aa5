use std::fmt;
use std::str::FromStr;

use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use stockpile_timeseries::{RawRow, RawSeries};

use crate::error::AlphaVantageError;

/// Body fields the provider uses to explain an empty answer.
const PROVIDER_MESSAGES: [&str; 3] = ["Error Message", "Note", "Information"];

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    #[serde(rename = "1min")]
    OneMinute,
    #[serde(rename = "5min")]
    FiveMinutes,
    #[serde(rename = "15min")]
    FifteenMinutes,
    #[serde(rename = "30min")]
    ThirtyMinutes,
    #[serde(rename = "60min")]
    SixtyMinutes,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::OneMinute => "1min",
            Interval::FiveMinutes => "5min",
            Interval::FifteenMinutes => "15min",
            Interval::ThirtyMinutes => "30min",
            Interval::SixtyMinutes => "60min",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = AlphaVantageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1min" => Ok(Interval::OneMinute),
            "5min" => Ok(Interval::FiveMinutes),
            "15min" => Ok(Interval::FifteenMinutes),
            "30min" => Ok(Interval::ThirtyMinutes),
            "60min" => Ok(Interval::SixtyMinutes),
            other => Err(AlphaVantageError::UnknownInterval(other.to_string())),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputSize {
    /// Latest 100 points.
    Compact,
    /// Trailing 30 days, or the whole `month` when one is given.
    Full,
}

impl FromStr for OutputSize {
    type Err = AlphaVantageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "compact" => Ok(OutputSize::Compact),
            "full" => Ok(OutputSize::Full),
            other => Err(AlphaVantageError::UnknownOutputSize(other.to_string())),
        }
    }
}

#[derive(Serialize, Debug, Clone, Builder)]
#[builder(on(String, into))]
pub struct IntradayParams {
    pub symbol: String,
    pub interval: Interval,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputsize: Option<OutputSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjusted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended_hours: Option<bool>,
    /// `YYYY-MM`, for history beyond the trailing window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<String>,
}

impl IntradayParams {
    /// Value of the `function` query parameter.
    pub const FUNCTION: &'static str = "TIME_SERIES_INTRADAY";
}

/// Raw response body. The series sits under a key that depends on the
/// requested interval, so the body is kept as a JSON object.
#[derive(Deserialize, Debug, Clone)]
#[serde(transparent)]
pub struct IntradayResponse {
    pub body: Map<String, Value>,
}

impl IntradayResponse {
    pub fn series_key(interval: Interval) -> String {
        format!("Time Series ({interval})")
    }

    /// Explanation the provider put in place of data, if any.
    pub fn provider_message(&self) -> Option<&str> {
        PROVIDER_MESSAGES
            .iter()
            .find_map(|field| self.body.get(*field).and_then(Value::as_str))
    }

    /// Extracts the `Time Series ({interval})` mapping. A missing or empty
    /// mapping is an error; individual bars are left for normalization.
    pub fn into_series(mut self, interval: Interval) -> Result<RawSeries, AlphaVantageError> {
        let key = Self::series_key(interval);
        let message = self.provider_message().map(str::to_string);

        let entries = match self.body.remove(&key) {
            Some(Value::Object(entries)) if !entries.is_empty() => entries,
            Some(Value::Object(_)) | Some(Value::Null) | None => {
                return Err(AlphaVantageError::MissingTimeSeries { key, message });
            }
            Some(_) => return Err(AlphaVantageError::MalformedTimeSeries { key }),
        };

        Ok(entries
            .into_iter()
            .map(|(timestamp, bar)| raw_row(timestamp, bar))
            .collect())
    }
}

fn raw_row(timestamp: String, bar: Value) -> RawRow {
    let Value::Object(fields) = bar else {
        return RawRow::new(timestamp);
    };

    fields
        .into_iter()
        .fold(RawRow::new(timestamp), |row, (name, value)| {
            let cell = match value {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            };
            row.with_field(name, cell)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(body: Value) -> IntradayResponse {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn interval_round_trips_through_text() {
        for interval in [
            Interval::OneMinute,
            Interval::FiveMinutes,
            Interval::FifteenMinutes,
            Interval::ThirtyMinutes,
            Interval::SixtyMinutes,
        ] {
            assert_eq!(interval.as_str().parse::<Interval>().unwrap(), interval);
        }
        assert!("90min".parse::<Interval>().is_err());
    }

    #[test]
    fn params_serialize_only_what_is_set() {
        let params = IntradayParams::builder()
            .symbol("IBM")
            .interval(Interval::SixtyMinutes)
            .outputsize(OutputSize::Full)
            .build();

        let value = serde_json::to_value(&params).unwrap();

        assert_eq!(
            value,
            json!({ "symbol": "IBM", "interval": "60min", "outputsize": "full" })
        );
    }

    #[test]
    fn extracts_series_for_requested_interval() {
        let body = json!({
            "Meta Data": { "1. Information": "Intraday (60min) open, high, low, close prices and volume" },
            "Time Series (60min)": {
                "2024-01-01 11:00:00": {
                    "1. open": "2.0", "2. high": "3.0", "3. low": "2.0", "4. close": "2.5", "5. volume": "200"
                },
                "2024-01-01 10:00:00": {
                    "1. open": "1.0", "2. high": "2.0", "3. low": "1.0", "4. close": "1.5", "5. volume": "100"
                }
            }
        });

        let series = response(body).into_series(Interval::SixtyMinutes).unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.rows()[0].timestamp, "2024-01-01 10:00:00");
        assert_eq!(
            series.rows()[0].fields.get("4. close"),
            Some(&Some("1.5".to_string()))
        );
    }

    #[test]
    fn missing_series_carries_provider_note() {
        let body = json!({ "Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute." });

        let err = response(body)
            .into_series(Interval::SixtyMinutes)
            .unwrap_err();

        match err {
            AlphaVantageError::MissingTimeSeries { key, message } => {
                assert_eq!(key, "Time Series (60min)");
                assert!(message.unwrap().contains("call frequency"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn series_for_another_interval_is_missing() {
        let body = json!({ "Time Series (5min)": { "2024-01-01 10:00:00": { "1. open": "1.0" } } });

        let err = response(body)
            .into_series(Interval::SixtyMinutes)
            .unwrap_err();

        assert!(matches!(err, AlphaVantageError::MissingTimeSeries { .. }));
    }

    #[test]
    fn empty_series_is_missing() {
        let body = json!({ "Time Series (60min)": {} });

        let err = response(body)
            .into_series(Interval::SixtyMinutes)
            .unwrap_err();

        assert!(matches!(err, AlphaVantageError::MissingTimeSeries { message: None, .. }));
    }

    #[test]
    fn series_that_is_not_a_mapping_is_malformed() {
        for series in [json!("no data today"), json!([1, 2, 3]), json!(42)] {
            let body = json!({ "Time Series (60min)": series });

            let err = response(body)
                .into_series(Interval::SixtyMinutes)
                .unwrap_err();

            match err {
                AlphaVantageError::MalformedTimeSeries { key } => {
                    assert_eq!(key, "Time Series (60min)")
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn bar_that_is_not_a_mapping_is_dropped_by_normalization() {
        let body = json!({
            "Time Series (60min)": {
                "2024-01-01 10:00:00": "garbled",
                "2024-01-01 11:00:00": {
                    "1. open": "2.0", "2. high": "3.0", "3. low": "2.0", "4. close": "2.5", "5. volume": "200"
                }
            }
        });

        let series = response(body).into_series(Interval::SixtyMinutes).unwrap();

        assert_eq!(series.len(), 2);
        assert!(series.rows()[0].fields.is_empty());

        let rows = stockpile_timeseries::normalize(&series);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.rows()[0].volume, 200);
    }

    #[test]
    fn null_cells_become_missing_fields() {
        let body = json!({
            "Time Series (60min)": {
                "2024-01-01 10:00:00": { "1. open": null, "2. high": 2.0 }
            }
        });

        let series = response(body).into_series(Interval::SixtyMinutes).unwrap();
        let fields = &series.rows()[0].fields;

        assert_eq!(fields.get("1. open"), Some(&None));
        assert_eq!(fields.get("2. high"), Some(&Some("2.0".to_string())));
    }
}
