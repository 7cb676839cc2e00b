//! Prometheus metrics collection and formatting.
//!
//! This module provides metrics in Prometheus text exposition format.

use std::fmt::Write;
use std::sync::Arc;

use agentrun_core::RunStatus;

use crate::state::AppState;

/// Collect all metrics from AppState and format as Prometheus text.
pub async fn collect_metrics(state: &Arc<AppState>) -> String {
    let mut output = String::new();

    collect_run_metrics(state, &mut output).await;
    collect_slot_metrics(state, &mut output);

    output
}

/// Collect run metrics by status.
async fn collect_run_metrics(state: &Arc<AppState>, output: &mut String) {
    let runs = state.registry.list().await;

    writeln!(output, "# HELP agentrun_runs Number of known runs by status").ok();
    writeln!(output, "# TYPE agentrun_runs gauge").ok();
    for status in RunStatus::all() {
        let count = runs.iter().filter(|r| r.status == *status).count();
        writeln!(
            output,
            "agentrun_runs{{status=\"{}\"}} {count}",
            status.as_str()
        )
        .ok();
    }

    let paused = runs
        .iter()
        .filter(|r| r.status.is_active() && r.paused)
        .count();
    writeln!(output, "# HELP agentrun_runs_paused Number of active runs that are paused").ok();
    writeln!(output, "# TYPE agentrun_runs_paused gauge").ok();
    writeln!(output, "agentrun_runs_paused {paused}").ok();
}

/// Collect execution slot usage.
fn collect_slot_metrics(state: &Arc<AppState>, output: &mut String) {
    let total = state.config.max_concurrent_runs.max(1);
    let available = state.available_slots();

    writeln!(output, "# HELP agentrun_slots_total Configured execution slots").ok();
    writeln!(output, "# TYPE agentrun_slots_total gauge").ok();
    writeln!(output, "agentrun_slots_total {total}").ok();

    writeln!(output, "# HELP agentrun_slots_in_use Execution slots held by running runs").ok();
    writeln!(output, "# TYPE agentrun_slots_in_use gauge").ok();
    writeln!(output, "agentrun_slots_in_use {}", total.saturating_sub(available)).ok();
}
