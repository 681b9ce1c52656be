use std::sync::Arc;

use anyhow::Context;
use stagedock_live::config::{AppConfig, MonitorConfig};
use stagedock_live::logging::init_logging;
use stagedock_live::monitor::LiveMonitor;
use stagedock_live::notification::{
    LogNotifier, NotificationService, WebhookConfig, WebhookNotifier,
};
use stagedock_live::store::MemoryStore;
use stagedock_platforms::{HttpFetcher, ReqwestFetcher};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let app_config = AppConfig::from_env_or_default();
    let (logging, _log_guard) = init_logging(&app_config.log_dir)?;
    let shutdown = CancellationToken::new();
    logging.start_retention_cleanup(shutdown.clone());

    let monitor_config = MonitorConfig::from_env_or_default();

    let store = MemoryStore::load_from_file(&app_config.creators_file)
        .await
        .with_context(|| {
            format!(
                "failed to load creators from {}",
                app_config.creators_file.display()
            )
        })?;

    let http: Arc<dyn HttpFetcher> = Arc::new(ReqwestFetcher::with_settings(
        monitor_config.request_timeout,
        monitor_config.max_redirects,
    )?);
    let fetchers = monitor_config.fetcher_registry(http)?;

    let monitor = LiveMonitor::with_config(Arc::new(store), fetchers, monitor_config)?;

    let mut notifications = NotificationService::new().with_notifier(Arc::new(LogNotifier));
    if let Some(url) = app_config.webhook_url {
        notifications.add_notifier(Arc::new(WebhookNotifier::new(WebhookConfig::new(url))?));
    }
    let notifications = Arc::new(notifications);
    let listener = notifications.start(monitor.subscribe());

    monitor.start();
    info!("stagedock-live running, press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");

    // Let the last tick finish, then flush the notifications it produced.
    monitor.shutdown().await;
    notifications.stop();
    listener.await?;
    shutdown.cancel();

    Ok(())
}
