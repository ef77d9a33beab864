use std::path::Path;

use anyhow::Result;
use clap::Args;
use scheduler_core::engine::CycleConfig;

use crate::app::Bootstrap;
use crate::exit;

use super::summary;

/// `run-all` — the composite cycle the periodic trigger invokes: ingest,
/// reconcile, then plan (spec.md §4.8/§6).
#[derive(Args)]
pub struct RunAllCommand {
    #[arg(long, default_value_t = 3)]
    plan_days: u32,

    #[arg(long, default_value_t = 7)]
    reconcile_days: u32,

    #[arg(long)]
    dry_run: bool,
}

impl RunAllCommand {
    pub async fn run(&self, config_path: &Path) -> Result<u8> {
        let bootstrap = Bootstrap::load(config_path.to_path_buf()).await?;

        if !bootstrap.try_acquire_lock().await? {
            println!("another cycle is already running for {}", config_path.display());
            return Ok(exit::USER_ERROR);
        }

        // Ingestion adapters are out-of-scope collaborators (spec.md §1);
        // `run-all` still drives them so a periodic trigger has one entry
        // point, matching the composite cycle in spec.md §4.8 step 1.
        tracing::info!("skipping ingestion: wearable/calendar adapters are external collaborators");

        let cycle_config = CycleConfig {
            plan_horizon_days: self.plan_days,
            reconcile_window_days: self.reconcile_days,
            dry_run: self.dry_run,
            ..CycleConfig::default()
        };

        let result = bootstrap
            .orchestrator
            .run_cycle(&bootstrap.goals, &bootstrap.templates, cycle_config)
            .await;

        bootstrap.release_lock().await?;

        match result {
            Ok(cycle_summary) => {
                summary::print(&cycle_summary);
                Ok(exit::OK)
            }
            Err(e) => {
                tracing::error!(error = %e, "cycle failed");
                Ok(exit::for_error(&e))
            }
        }
    }
}
