//! Periodic fetch / diff / notify loop.
//!
//! Each cycle:
//! - lists every group's roster
//! - fetches all players concurrently (fan-out across the whole cycle, one
//!   bounded request per player, then fan-in)
//! - swaps each fetched value into the store and diffs against the value it
//!   replaced; persisted per player before any notification is attempted
//! - sends one ranked report per group that had changes
//!
//! Failed fetches leave the player untouched until the next cycle. Delivery and
//! storage failures are logged and only affect the group / player in flight.

use std::{sync::Arc, time::Duration};

use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

use crate::{
    domain::{GroupId, TrackedEntity},
    notifier::Notifier,
    ports::MetricFetcher,
    report::Change,
    roster::RosterStore,
    Error, Result,
};

/// Counters for one reconciliation cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub groups: usize,
    pub fetched: usize,
    pub unavailable: usize,
    pub changes: usize,
    pub notified: usize,
    pub delivery_failures: usize,
    pub storage_errors: usize,
}

pub struct Reconciler {
    store: Arc<dyn RosterStore>,
    fetcher: Arc<dyn MetricFetcher>,
    notifier: Notifier,
    interval: Duration,
    fetch_timeout: Duration,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn RosterStore>,
        fetcher: Arc<dyn MetricFetcher>,
        notifier: Notifier,
        interval: Duration,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            store,
            fetcher,
            notifier,
            interval,
            fetch_timeout,
        }
    }

    /// Run the loop on its own task until `cancel` fires.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    /// Run cycles forever, sleeping `interval` between them.
    ///
    /// Cancellation is observed between cycles; an in-flight cycle always finishes.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "reconciliation loop started"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let report = self.run_cycle().await;
            if report.changes > 0 || report.delivery_failures > 0 || report.storage_errors > 0 {
                tracing::info!(?report, "reconciliation cycle finished");
            } else {
                tracing::debug!(?report, "reconciliation cycle finished");
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(self.interval) => {}
            }
        }

        tracing::info!("reconciliation loop stopped");
    }

    /// One fetch / diff / notify pass over every group.
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();

        let groups = match self.store.all_group_ids().await {
            Ok(g) => g,
            Err(e) => {
                tracing::warn!(error = %e, "cannot enumerate groups, skipping cycle");
                report.storage_errors += 1;
                return report;
            }
        };

        let mut rosters: Vec<(GroupId, Vec<TrackedEntity>)> = Vec::with_capacity(groups.len());
        for group in groups {
            match self.store.list(&group).await {
                Ok(entities) if !entities.is_empty() => rosters.push((group, entities)),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(group = %group, error = %e, "cannot list roster, skipping group");
                    report.storage_errors += 1;
                }
            }
        }
        report.groups = rosters.len();

        let all: Vec<TrackedEntity> = rosters
            .iter()
            .flat_map(|(_, entities)| entities.iter().cloned())
            .collect();
        let mut results = fetch_all(&self.fetcher, &all, self.fetch_timeout)
            .await
            .into_iter();

        for (group, entities) in rosters {
            let mut changes = Vec::new();

            for entity in entities {
                let Some(result) = results.next() else {
                    break;
                };
                let metric = match result {
                    Ok(m) => m,
                    Err(e) => {
                        tracing::debug!(
                            group = %group,
                            player = %entity.display_name,
                            error = %e,
                            "fetch failed, skipping player this cycle"
                        );
                        report.unavailable += 1;
                        continue;
                    }
                };
                report.fetched += 1;

                match self
                    .store
                    .record_metric(&group, &entity.display_name, &entity.stable_id, metric)
                    .await
                {
                    Ok(Some(previous)) if previous != metric => {
                        changes.push(Change::new(entity.display_name, metric, metric - previous));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(
                            group = %group,
                            player = %entity.display_name,
                            error = %e,
                            "cannot persist metric"
                        );
                        report.storage_errors += 1;
                    }
                }
            }

            if changes.is_empty() {
                continue;
            }
            report.changes += changes.len();

            match self.notifier.notify(&group, changes).await {
                Ok(()) => report.notified += 1,
                Err(e) => {
                    tracing::warn!(group = %group, error = %e, "delivery failed, report dropped");
                    report.delivery_failures += 1;
                }
            }
        }

        report
    }
}

/// Fetch every entity's current metric concurrently.
///
/// Results come back in input order. A request that exceeds `limit` (or whose
/// task dies) is reported as `Error::Unavailable` for that entity only.
pub(crate) async fn fetch_all(
    fetcher: &Arc<dyn MetricFetcher>,
    entities: &[TrackedEntity],
    limit: Duration,
) -> Vec<Result<i64>> {
    let mut set = JoinSet::new();
    for (idx, entity) in entities.iter().enumerate() {
        let fetcher = Arc::clone(fetcher);
        let stable_id = entity.stable_id.clone();
        set.spawn(async move {
            let out = match timeout(limit, fetcher.fetch(&stable_id)).await {
                Ok(res) => res,
                Err(_) => Err(Error::Unavailable(format!(
                    "fetch for {} timed out after {}ms",
                    stable_id.0,
                    limit.as_millis()
                ))),
            };
            (idx, out)
        });
    }

    let mut results: Vec<Option<Result<i64>>> = entities.iter().map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((idx, out)) => results[idx] = Some(out),
            Err(e) => tracing::warn!(error = %e, "fetch task failed"),
        }
    }

    results
        .into_iter()
        .map(|r| r.unwrap_or_else(|| Err(Error::Unavailable("fetch task failed".to_string()))))
        .collect()
}
