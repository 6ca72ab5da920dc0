use std::time::Duration;

use anyhow::Result;
use tokio::sync::oneshot;

use devlog::args;
use devlog::config::Config;
use devlog::logging::{self, LogMirror, LogStore, Logger, ObjectRef};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    logging::init_diagnostics(&config.diagnostics_filter)?;

    let store = LogStore::shared();
    let logger = Logger::from_config(&config, store.clone());
    tracing::info!(env = logger.env().as_str(), "devlog demo starting");

    // Stand-in for a log panel: follows the store and redraws in batches
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
    let mut panel = LogMirror::attach(&store);
    let panel_task = tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_millis(50));
        loop {
            tokio::select! {
                _ = panel.changed() => {}
                _ = &mut stop_rx => break,
            }
            tick.tick().await;
            let summary = panel.sync();
            if !summary.is_empty() {
                tracing::info!(
                    appended = summary.appended,
                    cleared = summary.cleared,
                    total = panel.len(),
                    "panel refreshed"
                );
            }
        }
        panel.sync();
        panel
    });

    logger.log(args!["plain message"]);
    logger.info(args!["action completed"]);
    logger.success(args!["data saved", 3, "records"]);
    logger.warn(args!["this might cause problems"]);
    logger.error(args!["failed to process data"]);
    logger.force(args!["shown even in production"]);

    let request = ObjectRef::map();
    request.insert("path", "/api/items");
    request.insert("retries", 2);
    request.insert("self", &request);
    logger.info(args!["request", &request]);

    tokio::time::sleep(Duration::from_millis(200)).await;
    let _ = stop_tx.send(());
    let panel = panel_task.await?;

    tracing::info!(
        env = logger.env().as_str(),
        entries = panel.len(),
        "devlog demo finished"
    );
    for entry in panel.entries() {
        println!(
            "{} {:>7} #{} {}",
            entry.timestamp.format("%H:%M:%S%.3f"),
            entry.severity.as_str(),
            entry.seq,
            entry.message.lines().next().unwrap_or_default()
        );
    }

    panel.detach();
    Ok(())
}
