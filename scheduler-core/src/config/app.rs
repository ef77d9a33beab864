use std::env;
use std::time::Duration;

/// Deployment-level configuration, read from the environment (teacher's
/// `config::app::AppConfig` pattern, generalized past its HTTP-server
/// fields to this crate's background-job concerns).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub sqlite_path: String,
    pub http_timeout: Duration,
    pub lm_fanout_concurrency: usize,
    pub cycle_deadline: Duration,
}

impl AppConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let log_level = env::var("SCHEDULER_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let sqlite_path = env::var("SCHEDULER_DB_PATH").unwrap_or_else(|_| "scheduler.sqlite3".to_string());
        let http_timeout_secs: u64 = env::var("SCHEDULER_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);
        let lm_fanout_concurrency: usize = env::var("SCHEDULER_LM_FANOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2);
        let cycle_deadline_secs: u64 = env::var("SCHEDULER_CYCLE_DEADLINE_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(600);

        Self {
            log_level,
            sqlite_path,
            http_timeout: Duration::from_secs(http_timeout_secs),
            lm_fanout_concurrency,
            cycle_deadline: Duration::from_secs(cycle_deadline_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_env_unset() {
        // SAFETY: test-only removal of vars this process may have set;
        // no other test in this crate reads these keys concurrently.
        for key in [
            "SCHEDULER_LOG_LEVEL",
            "SCHEDULER_DB_PATH",
            "SCHEDULER_HTTP_TIMEOUT_SECS",
            "SCHEDULER_LM_FANOUT",
            "SCHEDULER_CYCLE_DEADLINE_SECS",
        ] {
            env::remove_var(key);
        }
        let config = AppConfig::from_env();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.lm_fanout_concurrency, 2);
    }
}
