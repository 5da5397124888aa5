use std::future::Future;

use stockpile_alphavantage::{AlphaVantageClient, AlphaVantageError, Interval, IntradayParams, OutputSize};
use stockpile_timeseries::{normalize, RawSeries, RowSet};
use tracing::info;

#[derive(Debug, Clone)]
pub struct SeriesRequest {
    pub symbol: String,
    pub interval: Interval,
    pub outputsize: Option<OutputSize>,
}

/// Anything that can hand back a raw intraday series.
pub trait QuoteSource: Send + Sync {
    fn fetch_intraday(
        &self,
        request: &SeriesRequest,
    ) -> impl Future<Output = Result<RawSeries, AlphaVantageError>> + Send;
}

impl QuoteSource for AlphaVantageClient {
    async fn fetch_intraday(&self, request: &SeriesRequest) -> Result<RawSeries, AlphaVantageError> {
        let params = IntradayParams::builder()
            .symbol(request.symbol.clone())
            .interval(request.interval)
            .maybe_outputsize(request.outputsize)
            .build();

        self.intraday(params).await
    }
}

/// Fetches one series and normalizes it into typed rows.
pub async fn make_api_call<Q: QuoteSource>(
    source: &Q,
    request: &SeriesRequest,
) -> Result<RowSet, AlphaVantageError> {
    let raw = source.fetch_intraday(request).await?;
    let rows = normalize(&raw);

    info!(
        symbol = %request.symbol,
        interval = %request.interval,
        fetched = raw.len(),
        kept = rows.len(),
        "fetched intraday series"
    );

    Ok(rows)
}
