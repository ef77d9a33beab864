use std::path::Path;

use anyhow::Result;
use clap::Args;

use crate::exit;

/// `import-garmin [--days N]` — ingestion collaborator (spec.md §1/§6).
///
/// The wearable API client is explicitly out of scope for this core
/// (spec.md §1): there is no real Garmin protocol integration to invoke.
/// The subcommand still exists, wired through the same config path as
/// every other command, so a periodic trigger's `run-all` entry point
/// stays stable if a real adapter is plugged in later.
#[derive(Args)]
pub struct ImportGarminCommand {
    /// Trailing window, in days, the real adapter would fetch.
    #[arg(long, default_value_t = 7)]
    days: u32,
}

impl ImportGarminCommand {
    pub async fn run(&self, _config_path: &Path) -> Result<u8> {
        tracing::info!(
            days = self.days,
            "import-garmin is a stub: the wearable API client is an out-of-scope collaborator"
        );
        println!("no-op: wire a HealthStore-backed Garmin adapter to populate health_samples/activities");
        Ok(exit::OK)
    }
}
