//! Startup upgrade of metric-only roster rows.
//!
//! Early rosters stored `name -> elo` without the provider id, which the
//! reconciliation loop needs. Each such row is resolved by name and rewritten as
//! a full record. Rows that cannot be resolved stay untouched and are retried on
//! the next startup, so the pass is safe to run every time.

use crate::{
    domain::TrackedEntity, ports::MetricFetcher, roster::RosterStore, Error, Result,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub upgraded: usize,
    pub not_found: usize,
    pub deferred: usize,
}

/// Upgrade every legacy row the store reports.
///
/// Storage failures abort the pass; provider failures only skip the row.
pub async fn upgrade_legacy_records(
    store: &dyn RosterStore,
    fetcher: &dyn MetricFetcher,
) -> Result<MigrationReport> {
    let legacy = store.legacy_records().await?;
    let mut report = MigrationReport::default();
    if legacy.is_empty() {
        return Ok(report);
    }

    tracing::info!(count = legacy.len(), "upgrading legacy roster records");

    for rec in legacy {
        match fetcher.resolve(&rec.display_name).await {
            Ok(resolved) => {
                store
                    .upsert(
                        &rec.group,
                        TrackedEntity::new(
                            rec.display_name.clone(),
                            resolved.stable_id,
                            resolved.metric,
                        ),
                    )
                    .await?;
                tracing::info!(
                    group = %rec.group,
                    player = %rec.display_name,
                    "legacy record upgraded"
                );
                report.upgraded += 1;
            }
            Err(Error::NotFound(_)) => match fetcher.resolve_id(&rec.display_name).await {
                // Exists but is unrated: keep the stored value.
                Ok(stable_id) => {
                    store
                        .upsert(
                            &rec.group,
                            TrackedEntity::new(rec.display_name.clone(), stable_id, rec.metric),
                        )
                        .await?;
                    tracing::info!(
                        group = %rec.group,
                        player = %rec.display_name,
                        metric = rec.metric,
                        "legacy record upgraded, stored metric kept"
                    );
                    report.upgraded += 1;
                }
                Err(Error::NotFound(_)) => {
                    tracing::warn!(
                        group = %rec.group,
                        player = %rec.display_name,
                        "legacy player not found at provider, left as is"
                    );
                    report.not_found += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        group = %rec.group,
                        player = %rec.display_name,
                        error = %e,
                        "cannot resolve legacy player, will retry on next startup"
                    );
                    report.deferred += 1;
                }
            },
            Err(e) => {
                tracing::warn!(
                    group = %rec.group,
                    player = %rec.display_name,
                    error = %e,
                    "cannot resolve legacy player, will retry on next startup"
                );
                report.deferred += 1;
            }
        }
    }

    Ok(report)
}
