use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlphaVantageError {
    #[error("request to Alpha Vantage failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error(
        "`{key}` is missing from the API response{}",
        .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
    )]
    MissingTimeSeries { key: String, message: Option<String> },
    #[error("`{key}` in the API response is not a mapping of timestamps to bars")]
    MalformedTimeSeries { key: String },
    #[error("unknown interval `{0}` (expected 1min, 5min, 15min, 30min or 60min)")]
    UnknownInterval(String),
    #[error("unknown output size `{0}` (expected compact or full)")]
    UnknownOutputSize(String),
}
