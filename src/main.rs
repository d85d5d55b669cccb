mod app;
mod config;
mod data;
mod indicators;
mod ui;

use app::App;
use data::{KlineClient, RefreshLoop};
use tracing_subscriber::EnvFilter;
use ui::{LayoutManager, OverlayControls};

fn init_tracing() -> color_eyre::Result<()> {
    // The terminal belongs to the dashboard, so logs go to a file.
    let path = std::env::var("GAMCHART_LOG").unwrap_or_else(|_| "gamchart.log".to_string());
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    init_tracing()?;

    let config = config::load_config(&config::config_path());
    tracing::info!(
        symbol = %config.symbol,
        interval = %config.interval,
        limit = config.limit,
        refresh_ms = config.refresh_ms,
        "starting dashboard"
    );

    let client = KlineClient::new(&config.base_url, config.request_timeout())?;
    let refresh = RefreshLoop::new(
        client,
        config.query(),
        config.smoothing,
        config.refresh_period(),
    );
    let (store, events, handle) = refresh.spawn();

    let title = format!("{} / {} · GAM", config.symbol, config.interval);
    let layout = LayoutManager::new(
        title,
        config.interval.bar_duration(),
        OverlayControls::new(&config.smoothing),
    );
    let result = App::new(layout).run(store, events).await;

    handle.abort();
    result
}
