use std::sync::Arc;

use elo_core::{config::Config, migration, ports::MetricFetcher, roster};
use elo_faceit::FaceitClient;

#[tokio::main]
async fn main() -> Result<(), elo_core::Error> {
    elo_core::logging::init("elo")?;

    let cfg = Arc::new(Config::load()?);
    tracing::info!(store = ?cfg.store, game = %cfg.game, "configuration loaded");

    let store = roster::open(&cfg.store).await?;
    let fetcher: Arc<dyn MetricFetcher> = Arc::new(FaceitClient::from_config(&cfg)?);

    let report = migration::upgrade_legacy_records(store.as_ref(), fetcher.as_ref()).await?;
    if report.upgraded + report.not_found + report.deferred > 0 {
        tracing::info!(
            upgraded = report.upgraded,
            not_found = report.not_found,
            deferred = report.deferred,
            "legacy roster migration finished"
        );
    }

    elo_telegram::router::run_polling(cfg, store, fetcher)
        .await
        .map_err(|e| elo_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
