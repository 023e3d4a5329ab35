//! feed-relay binary entry point.
//!
//! Usage: feed-relay --channels channels.json [--once]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use feed_relay::channels::ChannelRegistry;
use feed_relay::config::{Config, StoreKind};
use feed_relay::dispatch::{self, ItemWorker};
use feed_relay::notify::WebhookNotifier;
use feed_relay::pipeline::{ChannelProcessor, ItemProcessor};
use feed_relay::poll;
use feed_relay::source::HttpFeedSource;
use feed_relay::store::{JsonFileStore, MemoryStore, RecordStore};

/// Poll RSS/Atom feeds and post new entries to chat webhooks.
#[derive(Parser, Debug)]
#[command(name = "feed-relay", version, about)]
struct Args {
    /// JSON file listing the channels to poll.
    #[arg(long, env = "FEED_RELAY_CHANNELS")]
    channels: PathBuf,

    /// Record store backend.
    #[arg(long, value_enum, env = "FEED_RELAY_STORE", default_value = "json")]
    store: StoreKind,

    /// Directory holding the JSON record store.
    #[arg(long, env = "FEED_RELAY_STORE_DIR", default_value = "data")]
    store_dir: PathBuf,

    /// Record collection name.
    #[arg(long, env = "FEED_RELAY_COLLECTION", default_value = "processed")]
    collection: String,

    /// Seconds between polls.
    #[arg(long, env = "FEED_RELAY_INTERVAL_SECS", default_value = "300")]
    interval_secs: u64,

    /// Delivery attempts per item.
    #[arg(long, env = "FEED_RELAY_MAX_ATTEMPTS", default_value = "3")]
    max_attempts: u32,

    /// Seconds to wait before the first redelivery (grows linearly).
    #[arg(long, default_value = "5")]
    retry_backoff_secs: u64,

    /// Items that may wait for delivery at once.
    #[arg(long, default_value = "256")]
    queue_capacity: usize,

    /// Timeout for feed fetches and webhook posts, in seconds.
    #[arg(long, default_value = "30")]
    http_timeout_secs: u64,

    /// Poll once, deliver everything found, then exit.
    #[arg(long)]
    once: bool,

    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides it.
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            channels_path: args.channels,
            store: args.store,
            store_dir: args.store_dir,
            collection: args.collection,
            poll_interval: Duration::from_secs(args.interval_secs),
            max_attempts: args.max_attempts,
            retry_backoff: Duration::from_secs(args.retry_backoff_secs),
            queue_capacity: args.queue_capacity,
            http_timeout: Duration::from_secs(args.http_timeout_secs),
            once: args.once,
        }
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn open_store(config: &Config) -> Result<Arc<dyn RecordStore>> {
    let store: Arc<dyn RecordStore> = match config.store {
        StoreKind::Memory => Arc::new(MemoryStore::new()),
        StoreKind::Json => Arc::new(
            JsonFileStore::open(&config.store_dir, &config.collection)
                .await
                .context("failed opening record store")?,
        ),
    };
    Ok(store)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let config = Config::from(args);
    config.validate().context("invalid configuration")?;

    // -- channels: fail fast on a broken registry ---------------------------
    let registry = ChannelRegistry::new(&config.channels_path);
    let initial = registry.list().await.context("invalid channel registry")?;
    info!(channels = initial.len(), path = %registry.path().display(), "loaded channel registry");

    // -- collaborators -------------------------------------------------------
    let store = open_store(&config).await?;
    let source = Arc::new(HttpFeedSource::new(config.http_timeout).context("failed building HTTP client")?);
    let notifier = Arc::new(WebhookNotifier::new(config.http_timeout).context("failed building HTTP client")?);

    // -- item side -----------------------------------------------------------
    let (dispatcher, rx) = dispatch::queue(config.queue_capacity);
    let item_processor = Arc::new(ItemProcessor::new(notifier, Arc::clone(&store)));
    let worker = tokio::spawn(
        ItemWorker::new(item_processor, config.max_attempts, config.retry_backoff).run(rx),
    );

    // -- channel side --------------------------------------------------------
    let channel_processor = ChannelProcessor::new(source, store, Arc::new(dispatcher));

    if config.once {
        poll::poll_once(&channel_processor, &registry).await;
    } else {
        info!(interval_secs = config.poll_interval.as_secs(), "polling started");
        tokio::select! {
            _ = poll::run(&channel_processor, &registry, config.poll_interval) => {}
            _ = tokio::signal::ctrl_c() => info!("shutdown requested"),
        }
    }

    // Dropping the processor drops the last queue sender; the worker then
    // finishes whatever is in flight.
    drop(channel_processor);
    let stats = worker.await.context("item worker panicked")?;
    info!(delivered = stats.delivered, failed = stats.failed, "item worker stopped");

    Ok(())
}
