//! Periodic analyzer loop (spec.md §4.3 "Scheduling"): wakes every
//! `T_analyze_interval` and runs one cycle.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{interval, Duration};

use crate::analyzer::IncrementalAnalyzer;

pub async fn run_analyzer_loop(analyzer: Arc<IncrementalAnalyzer>, interval_seconds: u64, mut shutdown: watch::Receiver<bool>) {
    let mut tick = interval(Duration::from_secs(interval_seconds));
    loop {
        tokio::select! {
            _ = tick.tick() => {
                match analyzer.run_cycle().await {
                    Ok(summary) => tracing::info!(
                        groups = summary.groups_processed,
                        created = summary.events_created,
                        updated = summary.events_updated,
                        "analyzer cycle complete"
                    ),
                    Err(e) => tracing::error!(error = %e, "analyzer cycle failed"),
                }
            }
            _ = shutdown.changed() => {
                return;
            }
        }
        if *shutdown.borrow() {
            return;
        }
    }
}
