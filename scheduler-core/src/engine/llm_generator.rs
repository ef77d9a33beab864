//! LM Content Generator (C7) — spec.md §4.6. Renders a prompt from a
//! `PlanRequest`, walks a model fallback chain under per-call deadlines,
//! and parses the response into a `WorkoutPlan`. Never returns an error:
//! an exhausted chain degrades to the template-only fallback instead of
//! failing the cycle.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::clients::LmClient;
use crate::models::{PlanRequest, WorkoutOption, WorkoutPlan};

/// One rung of the fallback chain: a named model served by a client.
pub struct ModelSpec {
    pub name: String,
    pub client: Arc<dyn LmClient>,
    pub timeout: Duration,
}

/// Default bound on concurrent in-flight LM calls (spec.md §5 "bounded
/// fan-out, default concurrency 2").
pub const DEFAULT_FANOUT_CONCURRENCY: usize = 2;

pub struct LmContentGenerator {
    chain: Vec<ModelSpec>,
    fanout: Arc<Semaphore>,
}

impl LmContentGenerator {
    #[must_use]
    pub fn new(chain: Vec<ModelSpec>) -> Self {
        Self::with_concurrency(chain, DEFAULT_FANOUT_CONCURRENCY)
    }

    #[must_use]
    pub fn with_concurrency(chain: Vec<ModelSpec>, concurrency: usize) -> Self {
        Self {
            chain,
            fanout: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    /// Try each model in order; the first one that returns a parseable
    /// response wins. A network/timeout/quota error or a non-parseable
    /// body both advance the chain (spec.md §4.6 Failure policy). If
    /// every rung is exhausted, falls back to the template rendered
    /// verbatim with `degraded = true`. Concurrent calls across candidate
    /// days are capped by the fan-out semaphore (spec.md §5).
    pub async fn generate(&self, request: &PlanRequest) -> WorkoutPlan {
        let _permit = self.fanout.acquire().await.expect("semaphore never closed");
        let prompt = render_prompt(request);

        for spec in &self.chain {
            match spec.client.generate(&prompt, &spec.name, spec.timeout).await {
                Ok(raw) => {
                    if let Some(mut plan) = parse_response(&raw) {
                        plan.model_used = Some(spec.name.clone());
                        if plan.backup.trim().is_empty() {
                            plan.backup = request.template.render_plain(request.intensity_tier.downshift());
                        }
                        return plan;
                    }
                    tracing::warn!(model = %spec.name, "lm response failed to parse, trying next model");
                }
                Err(err) => {
                    tracing::warn!(model = %spec.name, error = %err, "lm call failed, trying next model");
                }
            }
        }

        tracing::warn!(
            discipline = %request.discipline,
            date = %request.date,
            "lm fallback chain exhausted, using template-only plan"
        );
        template_fallback(request)
    }
}

/// Pure prompt rendering — no I/O, so it's independently testable and the
/// orchestrator can log the exact prompt sent.
#[must_use]
pub fn render_prompt(request: &PlanRequest) -> String {
    let snap = &request.health_snapshot;
    format!(
        "You are a training coach assistant. Produce a workout plan for {discipline} on {date} \
         at {tier:?} intensity.\n\n\
         Recovery tier: {recovery_tier} (score: {score})\n\
         48h training load: {load:.1}\n\
         Sleep quality: {sleep}\n\
         Stress level: {stress}\n\
         Recent activity: {recent}\n\n\
         Preferred window: {start}:00-{end}:00\n\n\
         Template warmup: {warmup}\n\
         Template cooldown: {cooldown}\n\n\
         Respond with exactly these sections, each starting on its own line:\n\
         Option A: <one-line summary>\n<steps>\n\n\
         Option B: <one-line summary>\n<steps>\n\n\
         Backup (low energy):\n<steps>\n",
        discipline = request.discipline,
        date = request.date,
        tier = request.intensity_tier,
        recovery_tier = snap.recovery_tier,
        score = snap.recovery_score.map_or("unknown".to_string(), |s| format!("{s:.1}")),
        load = snap.training_load_48h,
        sleep = snap.sleep_quality_score.map_or("unknown".to_string(), |s| format!("{s:.1}")),
        stress = snap.stress_level.map_or("unknown".to_string(), |s| format!("{s:.1}")),
        recent = request.recent_activities_summary,
        start = request.preferred_window.start_hour,
        end = request.preferred_window.end_hour,
        warmup = request.template.warmup,
        cooldown = request.template.cooldown,
    )
}

/// Parse a raw LM response into a `WorkoutPlan`. Strips markdown code
/// fences and any preamble before the first recognized section header.
/// Requires both `Option A` and `Option B`; `Backup` is optional and left
/// empty here when absent — `generate` backfills it from the template
/// since this function has no template to render from (spec.md §4.6
/// parse contract / Invariant 8).
fn parse_response(raw: &str) -> Option<WorkoutPlan> {
    let cleaned = strip_fences(raw);

    let a_start = find_label(&cleaned, "Option A")?;
    let b_start = find_label(&cleaned, "Option B")?;
    if b_start <= a_start {
        return None;
    }
    let backup_start = find_label(&cleaned, "Backup");

    let a_end = b_start;
    let b_end = backup_start.unwrap_or(cleaned.len());

    let option_a = parse_option("Option A", &cleaned[a_start..a_end])?;
    let option_b = parse_option("Option B", &cleaned[b_start..b_end])?;
    let backup = backup_start.map_or_else(String::new, |start| {
        cleaned[start..]
            .splitn(2, '\n')
            .nth(1)
            .unwrap_or_default()
            .trim()
            .to_string()
    });

    Some(WorkoutPlan {
        option_a,
        option_b,
        backup,
        model_used: None,
        degraded: false,
    })
}

fn strip_fences(raw: &str) -> String {
    raw.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn find_label(text: &str, label: &str) -> Option<usize> {
    text.find(&format!("{label}:")).or_else(|| text.find(label))
}

fn parse_option(label: &str, section: &str) -> Option<WorkoutOption> {
    let after_label = section.strip_prefix(label)?.trim_start_matches(':').trim_start();
    let mut lines = after_label.splitn(2, '\n');
    let summary = lines.next().unwrap_or_default().trim().to_string();
    let steps = lines.next().unwrap_or_default().trim().to_string();
    if summary.is_empty() {
        return None;
    }
    Some(WorkoutOption {
        label: label.to_string(),
        summary,
        steps,
        target_hr_zone_low: None,
        target_hr_zone_high: None,
        duration_minutes: None,
    })
}

fn template_fallback(request: &PlanRequest) -> WorkoutPlan {
    let variant = request.template.variant(request.intensity_tier);
    let rendered = request.template.render_plain(request.intensity_tier);

    let option_a = WorkoutOption {
        label: "Option A".into(),
        summary: format!("{} ({:?}, template)", request.discipline, request.intensity_tier),
        steps: rendered.clone(),
        target_hr_zone_low: variant.map(|v| v.hr_zone_low),
        target_hr_zone_high: variant.map(|v| v.hr_zone_high),
        duration_minutes: variant.map(|v| v.target_duration_minutes),
    };
    let option_b = option_a.clone();

    WorkoutPlan {
        option_a,
        option_b,
        backup: request.template.render_plain(request.intensity_tier.downshift()),
        model_used: None,
        degraded: true,
    }
}
