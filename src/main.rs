use std::sync::Arc;

use platbench::APPLICATION_NAME;
use platbench::clock::{ClockCache, ClockService, REFRESH_INTERVAL};
use platbench::config::Config;
use platbench::http::request::Route;
use platbench::server;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;

    tracing::info!("{}", APPLICATION_NAME);
    tracing::info!("{}", Route::PLAINTEXT_PATH);
    tracing::info!("{}", Route::JSON_PATH);

    let clock = ClockService::start(Arc::new(ClockCache::new()), REFRESH_INTERVAL);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let listener = server::Listener::bind(&cfg).await?;
    let mut serving = tokio::spawn(listener.serve(Arc::clone(clock.cache()), shutdown_rx));

    let result = tokio::select! {
        res = &mut serving => res?,

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
            serving.await?
        }
    };

    clock.stop().await;
    result
}
