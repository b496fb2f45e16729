use std::sync::Arc;

use anyhow::Context;

use wicket::config::Config;
use wicket::server::Server;
use wicket::static_files::StaticFiles;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;

    let files = StaticFiles::new(&cfg.static_files.root, cfg.static_files.index.clone())
        .with_context(|| format!("opening static root {}", cfg.static_files.root.display()))?;
    tracing::info!(root = %files.root().display(), "Serving static files");

    let mut server = Server::new(cfg.server.clone(), Arc::new(files));
    server.start()?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    // Joining workers blocks; keep it off the runtime threads.
    tokio::task::spawn_blocking(move || server.stop()).await?;

    Ok(())
}
