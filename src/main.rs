use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use itemproxy::app;
use itemproxy::cache::ItemCache;
use itemproxy::config::Config;
use itemproxy::lookup::LookupService;
use itemproxy::server::Server;
use itemproxy::upstream::{Inventory, UpstreamClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    config.log_summary();

    let cache = Arc::new(ItemCache::new(config.cache_ttl));
    if let Some(every) = config.sweep_interval {
        let _sweeper = Arc::clone(&cache).spawn_sweeper(every);
    }

    let inventory: Arc<dyn Inventory> = Arc::new(UpstreamClient::new(config.upstream.clone())?);
    let service = Arc::new(LookupService::new(cache, inventory));

    let server = Server::bind(config.listen_addr()).await?;
    info!(address = %server.local_addr(), "API Server is running");

    app::serve(server, app::pipeline(service), async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    })
    .await?;

    info!("server stopped");
    Ok(())
}
