mod import_calendar;
mod import_garmin;
mod plan;
mod reconcile;
mod run_all;
mod summary;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use import_calendar::ImportCalendarCommand;
pub use import_garmin::ImportGarminCommand;
pub use plan::PlanCommand;
pub use reconcile::ReconcileCommand;
pub use run_all::RunAllCommand;

use crate::exit;

#[derive(Parser)]
#[command(name = "scheduler")]
#[command(about = "Autonomous fitness-workout scheduler", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the declarative goals/template TOML document.
    #[arg(long, global = true, env = "SCHEDULER_CONFIG", default_value = "scheduler.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the Planner (C6) for the next N days.
    Plan(PlanCommand),

    /// Run the Reconciler (C8) over the trailing N days.
    Reconcile(ReconcileCommand),

    /// Ingestion collaborator: import recent wearable rows.
    ImportGarmin(ImportGarminCommand),

    /// Ingestion collaborator: import recent/upcoming calendar events.
    ImportCalendar(ImportCalendarCommand),

    /// Composite cycle: ingest, reconcile, then plan.
    RunAll(RunAllCommand),
}

impl Cli {
    /// Dispatches to the selected subcommand and returns the process exit
    /// code (spec.md §6: 0 success/degraded, 1 user/config error,
    /// 2 transient external failure, 3 aborted by deadline).
    pub async fn execute(self) -> u8 {
        let result = match self.command {
            Commands::Plan(cmd) => cmd.run(&self.config).await,
            Commands::Reconcile(cmd) => cmd.run(&self.config).await,
            Commands::ImportGarmin(cmd) => cmd.run(&self.config).await,
            Commands::ImportCalendar(cmd) => cmd.run(&self.config).await,
            Commands::RunAll(cmd) => cmd.run(&self.config).await,
        };

        match result {
            Ok(code) => code,
            Err(err) => {
                tracing::error!(error = %err, "command failed");
                eprintln!("error: {err:#}");
                exit::USER_ERROR
            }
        }
    }
}
