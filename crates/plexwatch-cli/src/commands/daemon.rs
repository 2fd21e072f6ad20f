use super::runner::{build_runner, load_config};
use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use plexwatch_config::{Config, PathManager, SchedulerConfig};
use plexwatch_core::CycleRunner;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

/// Log file from `[logging] file`, if the config has one. Read before logging
/// is initialized, so problems here are ignored and stderr is used.
pub fn configured_log_file() -> Option<PathBuf> {
    let paths = PathManager::default();
    let file = Config::load_from_file(&paths.config_file()).ok()?.logging?.file?;
    Some(paths.resolve_log_file(&file))
}

pub struct Scheduler {
    scheduler: JobScheduler,
    runner: Arc<CycleRunner>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub async fn new(runner: CycleRunner, config: SchedulerConfig) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;
        Ok(Self {
            scheduler,
            runner: Arc::new(runner),
            config,
        })
    }

    /// Register the cron job and run until Ctrl-C
    pub async fn start(mut self) -> Result<()> {
        if self.config.run_on_startup {
            info!(operation = "scheduler_startup", "Running initial scan on startup");
            run_scheduled_cycle(&self.runner).await;
        }

        let runner = self.runner.clone();
        let job = Job::new_async(self.config.schedule.as_str(), move |_id, _scheduler| {
            let runner = runner.clone();
            Box::pin(async move {
                run_scheduled_cycle(&runner).await;
            })
        })
        .map_err(|e| eyre!("Invalid schedule '{}': {}", self.config.schedule, e))?;

        self.scheduler.add(job).await?;
        self.scheduler.start().await?;

        info!(
            operation = "scheduler_started",
            schedule = self.config.schedule,
            "Scheduler started"
        );

        tokio::signal::ctrl_c().await?;
        info!(operation = "scheduler_shutdown", "Shutting down scheduler");
        self.scheduler.shutdown().await?;
        Ok(())
    }
}

/// One scheduled cycle. Failures are logged and the next trigger retries.
async fn run_scheduled_cycle(runner: &CycleRunner) {
    info!(operation = "scheduled_scan_start", "Starting scheduled scan");
    match runner.run_cycle().await {
        Ok(Some(outcome)) => {
            info!(
                operation = "scheduled_scan_complete",
                entries = outcome.stats.entries,
                newly_available = outcome.newly_available.len(),
                pending = outcome.pending_snapshot.len(),
                duration_ms = outcome.stats.duration_ms,
                "Scheduled scan completed"
            );
        }
        // Overlap is logged by the runner
        Ok(None) => {}
        Err(e) => {
            error!(
                operation = "scheduled_scan_error",
                error = %format!("{:#}", e),
                "Scheduled scan failed"
            );
        }
    }
}

pub async fn run_daemon(schedule_override: Option<String>, no_startup_scan: bool, output: &Output) -> Result<()> {
    let paths = PathManager::default();
    paths
        .ensure_directories()
        .map_err(|e| eyre!("Failed to create plexwatch directories: {}", e))?;
    let config = load_config(&paths)?;
    let runner = build_runner(&config, &paths, false)?;

    let mut scheduler_config = config.scheduler_or_default();
    if let Some(schedule) = schedule_override {
        scheduler_config.schedule = schedule;
    }
    if no_startup_scan {
        scheduler_config.run_on_startup = false;
    }

    output.info(format!(
        "plexwatch daemon running with schedule '{}' (Ctrl-C to stop)",
        scheduler_config.schedule
    ));

    let scheduler = Scheduler::new(runner, scheduler_config)
        .await
        .map_err(|e| eyre!("Failed to create scheduler: {}", e))?;
    scheduler.start().await
}
