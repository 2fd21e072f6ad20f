use super::runner::{build_runner, load_config};
use crate::output::Output;
use color_eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use plexwatch_config::PathManager;
use plexwatch_core::CycleOutcome;
use std::time::Duration;

pub async fn run_scan(dry_run: bool, output: &Output) -> Result<()> {
    tracing::debug!("Scan command started");

    let paths = PathManager::default();
    let config = load_config(&paths)?;
    let runner = build_runner(&config, &paths, dry_run)?;

    let spinner = (output.is_human() && !output.is_quiet()).then(|| {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message("Scanning watchlist against the library...");
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    });

    let result = runner.run_cycle().await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    match result.map_err(|e| color_eyre::eyre::eyre!("Scan cycle failed: {:#}", e))? {
        Some(outcome) => report(&outcome, output),
        None => output.warn("A scan is already running; this one was skipped"),
    }
    Ok(())
}

fn report(outcome: &CycleOutcome, output: &Output) {
    if !output.is_human() {
        output.json(&serde_json::to_value(outcome).unwrap_or_default());
        return;
    }

    let stats = &outcome.stats;
    if outcome.dry_run {
        output.info("Dry-run mode: state not saved, no notifications sent");
    }
    output.success(format!(
        "Scan completed: {} entries, {} in library, {} pending, {} newly available ({:.1}s)",
        stats.entries,
        stats.resolved(),
        outcome.pending_snapshot.len(),
        outcome.newly_available.len(),
        stats.duration_ms as f64 / 1000.0
    ));
    for entry in &outcome.newly_available {
        match entry.year {
            Some(year) => output.println(format!("  + {} ({})", entry.title, year)),
            None => output.println(format!("  + {}", entry.title)),
        }
    }
    if stats.tier_failures > 0 {
        output.warn(format!(
            "{} lookups failed and were skipped; run with -v for details",
            stats.tier_failures
        ));
    }
}
