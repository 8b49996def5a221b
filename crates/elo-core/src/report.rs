//! Ranked reports shared by the reconciliation loop and `/stats`.

use crate::formatting::{escape_html, signed};

/// One observed metric change (or, for `/stats`, one current reading).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Change {
    pub display_name: String,
    pub metric: i64,
    pub delta: i64,
}

impl Change {
    pub fn new(display_name: impl Into<String>, metric: i64, delta: i64) -> Self {
        Self {
            display_name: display_name.into(),
            metric,
            delta,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankedEntry {
    pub rank: usize,
    pub change: Change,
}

/// Sort descending by metric and assign 1-based ranks.
///
/// The sort is stable: equal metrics keep the order they were produced in.
pub fn rank(mut changes: Vec<Change>) -> Vec<RankedEntry> {
    changes.sort_by(|a, b| b.metric.cmp(&a.metric));
    changes
        .into_iter()
        .enumerate()
        .map(|(i, change)| RankedEntry { rank: i + 1, change })
        .collect()
}

/// Report pushed to a group when the loop detects changes.
pub fn format_update(entries: &[RankedEntry]) -> String {
    let mut lines = vec!["📊 <b>ELO update</b>\n".to_string()];
    for e in entries {
        lines.push(format!(
            "{}. {} — {} ({})",
            e.rank,
            escape_html(&e.change.display_name),
            e.change.metric,
            signed(e.change.delta)
        ));
    }
    lines.join("\n")
}

/// Reply to `/stats`. `omitted` counts players whose refresh failed.
pub fn format_stats(entries: &[RankedEntry], omitted: usize) -> String {
    let mut lines = vec!["📊 <b>Player stats</b>\n".to_string()];
    for e in entries {
        lines.push(format!(
            "{}. {} — {} ELO ({})",
            e.rank,
            escape_html(&e.change.display_name),
            e.change.metric,
            signed(e.change.delta)
        ));
    }
    if omitted > 0 {
        lines.push(format!(
            "\n⚠️ Could not refresh {omitted} player(s); they are not shown."
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_descending_with_stable_ties() {
        let ranked = rank(vec![
            Change::new("a", 1800, 5),
            Change::new("b", 2100, -3),
            Change::new("c", 1800, 7),
            Change::new("d", 900, 1),
        ]);
        let order: Vec<_> = ranked
            .iter()
            .map(|e| (e.rank, e.change.display_name.as_str()))
            .collect();
        assert_eq!(order, vec![(1, "b"), (2, "a"), (3, "c"), (4, "d")]);
    }

    #[test]
    fn update_report_lines() {
        let html = format_update(&rank(vec![
            Change::new("lo<w>", 1500, -12),
            Change::new("high", 2500, 25),
        ]));
        assert_eq!(
            html,
            "📊 <b>ELO update</b>\n\n1. high — 2500 (+25)\n2. lo&lt;w&gt; — 1500 (-12)"
        );
    }

    #[test]
    fn stats_report_mentions_omitted_players() {
        let html = format_stats(&rank(vec![Change::new("x", 2000, 0)]), 2);
        assert!(html.contains("1. x — 2000 ELO (0)"));
        assert!(html.contains("Could not refresh 2 player(s)"));

        let clean = format_stats(&rank(vec![Change::new("x", 2000, 0)]), 0);
        assert!(!clean.contains("Could not refresh"));
    }
}
