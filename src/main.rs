/// vidshare - video sharing backend
///
/// Keeps a blob store of media files and a relational metadata store
/// consistent across upload, deletion and reads.

mod api;
mod blob_store;
mod catalog;
mod config;
mod context;
mod db;
mod error;
mod jobs;
mod media;
mod server;
#[cfg(test)]
mod testutil;

use config::ServerConfig;
use context::AppContext;
use error::VidResult;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> VidResult<()> {
    // Load configuration (also reads .env)
    let config = ServerConfig::from_env()?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&config.logging.level)
                .unwrap_or_else(|_| config::DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Print banner
    print_banner();

    // Create application context
    let ctx = Arc::new(AppContext::new(config).await?);

    // Start background jobs
    let scheduler = Arc::new(jobs::JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    // Start server
    server::serve((*ctx).clone()).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
        _     _     _
 __   _(_) __| |___| |__   __ _ _ __ ___
 \ \ / / |/ _` / __| '_ \ / _` | '__/ _ \
  \ V /| | (_| \__ \ | | | (_| | | |  __/
   \_/ |_|\__,_|___/_| |_|\__,_|_|  \___|

        video sharing backend v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
