use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use dotenv::dotenv;
use stockpile_alphavantage::{AlphaVantageClient, Interval, OutputSize};
use stockpile_store::models::DEFAULT_PREFIX;
use stockpile_store::{BlobStore, ObjectStoreBlobs, RedisBlobs, StorageKey};
use tracing::error;

mod config;
mod fetcher;
mod flow;
mod logging;
mod retry;

use config::{PipelineConfig, DEFAULT_CONFIG_PATH};
use fetcher::SeriesRequest;
use flow::{get_data_to_store, FlowOptions, TaskError};
use retry::RetryPolicy;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    /// S3 bucket, credentials from the AWS_* environment
    S3,
    /// Redis string values
    Redis,
    /// Directory on the local filesystem
    Local,
    /// Throwaway in-process store, for dry runs
    Memory,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML file holding the Alpha Vantage key
    #[arg(long, env = "STOCKPILE_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Ticker to fetch
    #[arg(long, default_value = "IBM")]
    symbol: String,

    /// Bar size: 1min, 5min, 15min, 30min or 60min
    #[arg(long, default_value = "60min")]
    interval: Interval,

    /// compact (latest 100 bars) or full
    #[arg(long)]
    outputsize: Option<OutputSize>,

    #[arg(long, value_enum, default_value_t = Backend::S3)]
    backend: Backend,

    #[arg(long, env = "STOCKPILE_BUCKET", default_value = "alpha-vantage-data-bucket")]
    bucket: String,

    /// Root directory for the local backend
    #[arg(long, default_value = "./data")]
    local_root: PathBuf,

    /// Falls back to REDIS_URL, then redis://127.0.0.1/
    #[arg(long)]
    redis_url: Option<String>,

    /// Key prefix inside the store
    #[arg(long, default_value = DEFAULT_PREFIX)]
    prefix: String,

    #[arg(long, default_value = logging::DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Extra attempts per task after the first failure
    #[arg(long, default_value = "3")]
    retries: u32,

    /// Base delay before the first retry; doubles on each further retry
    #[arg(long, default_value = "1000")]
    retry_delay_ms: u64,

    /// Overwrite the stored series with the fetched one before merging
    #[arg(long)]
    overwrite_first: bool,
}

impl Args {
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.retries,
            base_delay: Duration::from_millis(self.retry_delay_ms),
            ..RetryPolicy::default()
        }
    }

    fn flow_options(&self) -> FlowOptions {
        FlowOptions {
            request: SeriesRequest {
                symbol: self.symbol.clone(),
                interval: self.interval,
                outputsize: self.outputsize,
            },
            key: StorageKey::for_series(&self.prefix, &self.symbol, self.interval.as_str()),
            overwrite_first: self.overwrite_first,
        }
    }
}

async fn run_with<S: BlobStore>(
    client: &AlphaVantageClient,
    blobs: &S,
    options: &FlowOptions,
    policy: &RetryPolicy,
) -> anyhow::Result<()> {
    get_data_to_store(client, blobs, options, policy).await?;
    Ok(())
}

async fn run(args: Args) -> anyhow::Result<()> {
    let policy = args.retry_policy();
    let config_path = args.config.as_path();

    let config = policy
        .run("retrieve_key", move || async move {
            PipelineConfig::load(config_path).map_err(TaskError::from)
        })
        .await?;

    let client = AlphaVantageClient::new(config.api_key())?;
    let options = args.flow_options();

    match args.backend {
        Backend::S3 => {
            let blobs = ObjectStoreBlobs::s3(&args.bucket).map_err(TaskError::from)?;
            run_with(&client, &blobs, &options, &policy).await
        }
        Backend::Redis => {
            let blobs = match &args.redis_url {
                Some(url) => RedisBlobs::open(url),
                None => RedisBlobs::from_env(),
            }
            .map_err(TaskError::from)?;
            run_with(&client, &blobs, &options, &policy).await
        }
        Backend::Local => {
            let blobs = ObjectStoreBlobs::local(&args.local_root).map_err(TaskError::from)?;
            run_with(&client, &blobs, &options, &policy).await
        }
        Backend::Memory => {
            let blobs = ObjectStoreBlobs::in_memory();
            run_with(&client, &blobs, &options, &policy).await
        }
    }
}

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let args = Args::parse();
    let _log_guard = logging::init(&args.log_file)?;

    let rt = tokio::runtime::Runtime::new()?;

    if let Err(e) = rt.block_on(run(args)) {
        error!("Flow failed: {e:#}");
        return Err(e);
    }

    Ok(())
}
