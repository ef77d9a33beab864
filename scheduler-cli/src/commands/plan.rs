use std::path::Path;

use anyhow::Result;
use clap::Args;
use scheduler_core::engine::CycleConfig;

use crate::app::Bootstrap;
use crate::exit;

use super::summary;

/// `plan [--days N] [--dry-run]` (spec.md §6).
#[derive(Args)]
pub struct PlanCommand {
    /// Number of days forward to plan (the Planner's horizon, spec.md §4.5).
    #[arg(long, default_value_t = 3)]
    days: u32,

    /// Suppress calendar writes; still emits audit entries with `executed=false`.
    #[arg(long)]
    dry_run: bool,
}

impl PlanCommand {
    pub async fn run(&self, config_path: &Path) -> Result<u8> {
        let bootstrap = Bootstrap::load(config_path.to_path_buf()).await?;

        if !bootstrap.try_acquire_lock().await? {
            println!("another cycle is already running for {}", config_path.display());
            return Ok(exit::USER_ERROR);
        }

        let cycle_config = CycleConfig {
            plan_horizon_days: self.days,
            dry_run: self.dry_run,
            ..CycleConfig::default()
        };

        let result = bootstrap
            .orchestrator
            .run_plan_only(&bootstrap.goals, &bootstrap.templates, cycle_config)
            .await;

        bootstrap.release_lock().await?;

        match result {
            Ok(cycle_summary) => {
                summary::print(&cycle_summary);
                Ok(exit::OK)
            }
            Err(e) => {
                tracing::error!(error = %e, "plan cycle failed");
                Ok(exit::for_error(&e))
            }
        }
    }
}
