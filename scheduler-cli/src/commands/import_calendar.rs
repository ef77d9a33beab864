use std::path::Path;

use anyhow::Result;
use clap::Args;

use crate::exit;

/// `import-calendar [--past P] [--future F]` — ingestion collaborator
/// (spec.md §1/§6).
///
/// The calendar API client is explicitly out of scope for this core
/// (spec.md §1); the reference `HttpCalendarClient` in `scheduler-core`
/// already satisfies the `CalendarClient` trait for any backend that
/// exposes list/create/update/delete over the expected JSON shape, so
/// there is no separate one-shot "import" to perform — `CalendarView`
/// reads are always live. This subcommand exists for CLI surface parity
/// with spec.md §6.
#[derive(Args)]
pub struct ImportCalendarCommand {
    #[arg(long, default_value_t = 30)]
    past: u32,

    #[arg(long, default_value_t = 90)]
    future: u32,
}

impl ImportCalendarCommand {
    pub async fn run(&self, _config_path: &Path) -> Result<u8> {
        tracing::info!(
            past_days = self.past,
            future_days = self.future,
            "import-calendar is a stub: CalendarView reads are always live, no batch import needed"
        );
        println!("no-op: the calendar adapter is read live through CalendarView, not imported in batch");
        Ok(exit::OK)
    }
}
