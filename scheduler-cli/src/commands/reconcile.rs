use std::path::Path;

use anyhow::Result;
use clap::Args;
use scheduler_core::engine::CycleConfig;

use crate::app::Bootstrap;
use crate::exit;

use super::summary;

/// `reconcile [--days N]` (spec.md §6).
#[derive(Args)]
pub struct ReconcileCommand {
    /// Trailing window, in days, to reconcile (spec.md §4.7/§4.8).
    #[arg(long, default_value_t = 7)]
    days: u32,
}

impl ReconcileCommand {
    pub async fn run(&self, config_path: &Path) -> Result<u8> {
        let bootstrap = Bootstrap::load(config_path.to_path_buf()).await?;

        if !bootstrap.try_acquire_lock().await? {
            println!("another cycle is already running for {}", config_path.display());
            return Ok(exit::USER_ERROR);
        }

        let cycle_config = CycleConfig {
            reconcile_window_days: self.days,
            ..CycleConfig::default()
        };

        let result = bootstrap.orchestrator.run_reconcile_only(&bootstrap.goals, cycle_config).await;

        bootstrap.release_lock().await?;

        match result {
            Ok(cycle_summary) => {
                summary::print(&cycle_summary);
                Ok(exit::OK)
            }
            Err(e) => {
                tracing::error!(error = %e, "reconcile cycle failed");
                Ok(exit::for_error(&e))
            }
        }
    }
}
