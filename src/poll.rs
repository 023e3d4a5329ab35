//! Scheduled feed polling.
//!
//! On every tick the channel registry is listed and each channel is run
//! through the [`ChannelProcessor`], one after the other.  A failing channel
//! is logged and does not stop the others; the next tick simply tries again
//! (dedup makes that safe).

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::channels::ChannelRegistry;
use crate::pipeline::ChannelProcessor;

/// Outcome of one pass over the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub channels: usize,
    pub failed_channels: usize,
    pub new_items: usize,
}

/// Run every channel once.
pub async fn poll_once(processor: &ChannelProcessor, registry: &ChannelRegistry) -> PollSummary {
    let channels = match registry.list().await {
        Ok(channels) => channels,
        Err(e) => {
            error!(error = %e, "failed listing channels");
            return PollSummary::default();
        }
    };

    let mut summary = PollSummary {
        channels: channels.len(),
        ..Default::default()
    };

    for channel in &channels {
        match processor.run(channel).await {
            Ok(report) => summary.new_items += report.new,
            Err(e) => {
                warn!(feed = %channel.url, error = %e, "channel failed");
                summary.failed_channels += 1;
            }
        }
    }

    info!(
        channels = summary.channels,
        failed = summary.failed_channels,
        new_items = summary.new_items,
        "poll finished"
    );
    summary
}

/// Poll forever, once per `interval`, starting immediately.
pub async fn run(processor: &ChannelProcessor, registry: &ChannelRegistry, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        poll_once(processor, registry).await;
    }
}
