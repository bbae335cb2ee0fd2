use super::open_store;
use crate::cli::args::{RunsListArgs, RunsSweepArgs};
use attest_core::ledger::RunLedger;
use attest_core::model::RunStatus;

pub fn list(args: RunsListArgs) -> anyhow::Result<i32> {
    let store = open_store(&args.db)?;
    let ledger = RunLedger::new(store);
    let runs = ledger.recent(&args.org, args.last)?;

    if runs.is_empty() {
        println!("no runs recorded for {}", args.org);
        return Ok(0);
    }

    for run in &runs {
        let icon = match run.status {
            RunStatus::Completed => "✅",
            RunStatus::Failed => "❌",
            RunStatus::Running => "⏳",
        };
        let duration = run
            .duration_ms
            .map(|d| format!("({:.1}s)", d as f64 / 1000.0))
            .unwrap_or_default();
        let detail = match run.status {
            RunStatus::Failed => run.error.clone().unwrap_or_default(),
            _ => run.output_summary.clone().unwrap_or_default(),
        };
        println!(
            "{} #{:<5} {:<20} {:<10} {}  {}",
            icon,
            run.id,
            run.agent,
            run.trigger.as_str(),
            duration,
            detail
        );
    }
    Ok(0)
}

pub fn sweep(args: RunsSweepArgs) -> anyhow::Result<i32> {
    let store = open_store(&args.db)?;
    let ledger = RunLedger::new(store);
    let stale = ledger.stale_running(&args.org, args.max_age_minutes, chrono::Utc::now())?;

    if stale.is_empty() {
        println!(
            "no runs older than {} minutes still marked running",
            args.max_age_minutes
        );
        return Ok(0);
    }

    for run in &stale {
        println!(
            "⚠️  #{:<5} {:<20} started {} (likely abandoned)",
            run.id, run.agent, run.started_at
        );
    }
    Ok(0)
}
