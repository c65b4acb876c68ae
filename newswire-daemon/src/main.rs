//! Newswire Backfill Daemon
//!
//! Connects a Telegram user session, then backfills every configured channel
//! into the content store, one calendar day at a time.

mod config;

use std::sync::Arc;

use newswire_feed::{ChannelSource, FeedProvider, TelegramConfig, TelegramFeed, WireReport};
use newswire_store::{Backfill, BackfillConfig, ContentStore};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env: {}", e);
        }
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,newswire_daemon=debug")),
        )
        .init();

    info!("Starting Newswire backfill daemon");

    let config = Config::from_env()?;
    info!(
        channels = config.channels.len(),
        start_date = %config.start_date,
        "configuration loaded"
    );

    // Connect Telegram and run the interactive login if the saved session
    // is not authorized yet
    let feed = TelegramFeed::connect(TelegramConfig {
        api_id: config.api_id,
        api_hash: config.api_hash.clone(),
        session_path: config.session_path.clone(),
    })
    .await?;
    feed.authorize_interactive().await?;
    let provider: Arc<dyn FeedProvider> = Arc::new(feed);

    // Open the content store up front so a bad database path surfaces
    // before any history is fetched
    info!(db_path = %config.db_path.display(), "opening content store");
    let store = Arc::new(ContentStore::new(&config.db_path));
    store.connect().await?;

    // Backfill every channel concurrently; each gets its own cursor and
    // its own table
    let mut handles = Vec::with_capacity(config.channels.len());
    for channel in &config.channels {
        let source = ChannelSource::new(
            Arc::clone(&provider),
            channel,
            Arc::new(WireReport),
        );
        let mut backfill = Backfill::new(
            Arc::clone(&store),
            source,
            BackfillConfig::new(config.start_date),
        );
        let channel = channel.clone();
        handles.push(tokio::spawn(async move {
            (channel, backfill.run().await)
        }));
    }

    let mut failed = false;
    for handle in handles {
        let (channel, result) = handle.await?;
        match result {
            Ok(report) => info!(
                %channel,
                days = report.days,
                inserted = report.inserted,
                skipped = report.skipped,
                "channel backfill complete"
            ),
            Err(e) => {
                error!(%channel, error = %e, "channel backfill failed");
                failed = true;
            }
        }
    }

    if failed {
        anyhow::bail!("one or more channel backfills failed");
    }
    info!("All channels backfilled");
    Ok(())
}
