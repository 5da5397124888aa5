pub mod error;
pub mod intraday;

use std::time::Duration;

use reqwest::{Client, ClientBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use stockpile_timeseries::RawSeries;
use tracing::debug;

pub use error::AlphaVantageError;
pub use intraday::{Interval, IntradayParams, IntradayResponse, OutputSize};

pub const BASE_URL: &str = "https://www.alphavantage.co/query";

pub struct AlphaVantageClient {
    reqwest: Client,
    api_key: String,
    base_url: String,
}

impl AlphaVantageClient {
    pub fn new(api_key: &str) -> Result<Self, AlphaVantageError> {
        let reqwest = ClientBuilder::new()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            reqwest,
            api_key: api_key.to_string(),
            base_url: BASE_URL.to_string(),
        })
    }

    /// Points the client at another endpoint, e.g. a local stub.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub(crate) async fn get<T: DeserializeOwned, P: Serialize + ?Sized>(
        &self,
        function: &str,
        params: &P,
    ) -> reqwest::Result<T> {
        let response = self
            .reqwest
            .get(&self.base_url)
            .query(&[("function", function), ("apikey", self.api_key.as_str())])
            .query(params)
            .send()
            .await?
            .error_for_status()?
            .json::<T>()
            .await?;

        Ok(response)
    }

    /// Fetches one intraday series and extracts its `Time Series ({interval})`
    /// mapping.
    pub async fn intraday(&self, params: IntradayParams) -> Result<RawSeries, AlphaVantageError> {
        debug!(
            function = IntradayParams::FUNCTION,
            symbol = %params.symbol,
            interval = %params.interval,
            "calling Alpha Vantage"
        );
        let response: IntradayResponse = self.get(IntradayParams::FUNCTION, &params).await?;

        response.into_series(params.interval)
    }
}
