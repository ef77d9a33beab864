//! Wires the explicit dependency bundle the orchestrator needs (clock, LM
//! client, calendar client, store, goal/template provider) — the teacher's
//! `config::app`/`config::database` bootstrap pattern, generalized past a
//! single DB pool into the whole collaborator set spec.md §9 calls for
//! ("replace implicit global state with an explicit dependency bundle
//! handed to the orchestrator at construction").

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use scheduler_core::clients::{Clock, HttpCalendarClient, HttpLmClient, SqliteStore, SystemClock};
use scheduler_core::config::{self, AppConfig};
use scheduler_core::engine::{CalendarView, LmContentGenerator, ModelSpec, Orchestrator, Planner, Reconciler};
use scheduler_core::models::{Discipline, Goals, WorkoutTemplate};

pub struct Bootstrap {
    pub app_config: AppConfig,
    pub goals: Goals,
    pub templates: HashMap<Discipline, WorkoutTemplate>,
    pub orchestrator: Orchestrator,
    pub store: Arc<SqliteStore>,
    pub clock: Arc<dyn Clock>,
    pub config_path: PathBuf,
}

impl Bootstrap {
    pub async fn load(config_path: PathBuf) -> Result<Self> {
        let app_config = AppConfig::from_env();

        let (goals, templates) = config::load(&config_path)
            .with_context(|| format!("loading goals/templates document from {}", config_path.display()))?;

        let store = Arc::new(
            SqliteStore::connect(&app_config.sqlite_path)
                .await
                .with_context(|| format!("opening sqlite store at {}", app_config.sqlite_path))?,
        );
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let http_client = reqwest::Client::builder()
            .timeout(app_config.http_timeout)
            .build()
            .context("building http client")?;

        let calendar_base_url =
            std::env::var("SCHEDULER_CALENDAR_URL").unwrap_or_else(|_| "http://localhost:8081".to_string());
        let calendar_client = Arc::new(HttpCalendarClient::new(calendar_base_url, http_client.clone()));
        let calendar = Arc::new(CalendarView::new(calendar_client));

        let lm_base_url =
            std::env::var("SCHEDULER_LM_URL").unwrap_or_else(|_| "http://localhost:8082/v1".to_string());
        let lm_api_key = std::env::var("SCHEDULER_LM_API_KEY").ok();
        let lm_client = Arc::new(HttpLmClient::new(lm_base_url, lm_api_key, http_client));

        let primary_model = std::env::var("SCHEDULER_LM_PRIMARY_MODEL").unwrap_or_else(|_| "local-llama3".to_string());
        let secondary_model = std::env::var("SCHEDULER_LM_SECONDARY_MODEL").ok();

        let mut chain = vec![ModelSpec {
            name: primary_model,
            client: lm_client.clone(),
            timeout: Duration::from_secs(120),
        }];
        if let Some(secondary) = secondary_model {
            chain.push(ModelSpec {
                name: secondary,
                client: lm_client,
                timeout: Duration::from_secs(30),
            });
        }

        let llm = Arc::new(LmContentGenerator::with_concurrency(chain, app_config.lm_fanout_concurrency));

        let planner = Arc::new(Planner::new(calendar.clone(), llm, store.clone(), clock.clone()));
        let reconciler = Arc::new(Reconciler::new(calendar.clone(), store.clone(), clock.clone()));

        let orchestrator = Orchestrator::new(calendar, store.clone(), store.clone(), clock.clone(), planner, reconciler);

        Ok(Self {
            app_config,
            goals,
            templates,
            orchestrator,
            store,
            clock,
            config_path,
        })
    }

    /// Attempts the process-wide advisory lock keyed by the config path
    /// (spec.md §5.1). Returns `Ok(None)` (not an error) if another cycle
    /// already holds it, matching the "exits immediately with
    /// `already_running`" contract.
    pub async fn try_acquire_lock(&self) -> Result<bool> {
        let now = self.clock.now();
        self.store
            .try_acquire_lock(&lock_key(&self.config_path), now)
            .await
            .context("acquiring single-flight lock")
    }

    pub async fn release_lock(&self) -> Result<()> {
        self.store
            .release_lock(&lock_key(&self.config_path))
            .await
            .context("releasing single-flight lock")
    }
}

fn lock_key(config_path: &Path) -> String {
    config_path.display().to_string()
}
