//! Rule-driven recommendation selection with a fixed fallback chain.

use serde::Serialize;

use crate::catalog::{Category, RuleCatalog};
use crate::document::{AnalysisDocument, num_or};
use crate::metrics::Metrics;
use crate::placeholders::{HEARTBEAT_SAVINGS_RATE, Placeholders};
use crate::template::render;
use crate::util::{fmt_money, one_decimal};

pub const MAX_RECOMMENDATIONS: usize = 3;

const HEARTBEAT_PCT_THRESHOLD: i64 = 30;
const UNUSED_SKILLS_THRESHOLD: usize = 3;
const ERROR_RATE_THRESHOLD: f64 = 0.10;
const READ_WRITE_RATIO_THRESHOLD: i64 = 50;
const THREE_AM_SESSIONS_THRESHOLD: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub category: Category,
    pub text: String,
    pub impact: String,
    pub config_change: Option<String>,
}

impl Recommendation {
    fn new(category: Category, text: impl Into<String>, impact: impl Into<String>) -> Self {
        Self {
            category,
            text: text.into(),
            impact: impact.into(),
            config_change: None,
        }
    }
}

/// Values the fallback chain compares against its thresholds.
///
/// Heartbeat share and read/write ratio are whole numbers; three-AM sessions
/// keep their fractional part.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackInput {
    pub heartbeat_pct: i64,
    pub heartbeat_usd: f64,
    pub unused_count: usize,
    pub unused_names: String,
    pub error_rate: f64,
    pub read_write_ratio: i64,
    pub context_overflows: i64,
    pub three_am_sessions: f64,
}

impl FallbackInput {
    /// Built from derived values only; three-AM sessions come from the metric.
    pub fn from_metrics(metrics: &Metrics, placeholders: &Placeholders) -> Self {
        FallbackInput {
            heartbeat_pct: metrics.value_or_zero("heartbeat_cost_pct").trunc() as i64,
            heartbeat_usd: metrics.value_or_zero("heartbeat_cost_usd"),
            unused_count: metrics.value_or_zero("unused_skills_count").max(0.0) as usize,
            unused_names: placeholders
                .get("unused_names_short")
                .unwrap_or("none")
                .to_string(),
            error_rate: metrics.value_or_zero("error_rate"),
            read_write_ratio: metrics.value_or_zero("read_write_ratio").trunc() as i64,
            context_overflows: metrics.value_or_zero("context_overflows").trunc() as i64,
            three_am_sessions: metrics.value_or_zero("three_am_sessions"),
        }
    }

    pub fn from_document(doc: &AnalysisDocument, metrics: &Metrics, placeholders: &Placeholders) -> Self {
        FallbackInput {
            three_am_sessions: num_or(doc.autonomous.three_am_sessions, 0.0),
            ..Self::from_metrics(metrics, placeholders)
        }
    }
}

/// Convenience entry point: derives metrics and placeholders from `doc`.
pub fn select(doc: &AnalysisDocument, catalog: &RuleCatalog) -> Vec<Recommendation> {
    let metrics = Metrics::from_document(doc);
    let placeholders = Placeholders::from_document(doc);
    let fallback = FallbackInput::from_document(doc, &metrics, &placeholders);
    select_with_fallback(&metrics, &placeholders, &fallback, catalog)
}

/// Selection from derived values alone.
pub fn select_with(
    metrics: &Metrics,
    placeholders: &Placeholders,
    catalog: &RuleCatalog,
) -> Vec<Recommendation> {
    let fallback = FallbackInput::from_metrics(metrics, placeholders);
    select_with_fallback(metrics, placeholders, &fallback, catalog)
}

/// Matching catalog rules in priority order; the fallback chain when none match.
/// Always returns between one and [`MAX_RECOMMENDATIONS`] entries.
pub fn select_with_fallback(
    metrics: &Metrics,
    placeholders: &Placeholders,
    fallback: &FallbackInput,
    catalog: &RuleCatalog,
) -> Vec<Recommendation> {
    let mut recs = matching_rules(metrics, placeholders, catalog);
    if recs.is_empty() {
        tracing::debug!(rules = catalog.len(), "no catalog rule matched; applying fallback chain");
        recs = fallback_recommendations(fallback);
    }
    recs.truncate(MAX_RECOMMENDATIONS);
    recs
}

pub fn matching_rules(
    metrics: &Metrics,
    placeholders: &Placeholders,
    catalog: &RuleCatalog,
) -> Vec<Recommendation> {
    catalog
        .rules()
        .iter()
        .filter(|rule| rule.condition.evaluate(metrics))
        .map(|rule| {
            tracing::debug!(condition = %rule.condition_source, priority = rule.priority, "rule matched");
            Recommendation {
                category: rule.category,
                text: render(&rule.template, placeholders),
                impact: render(&rule.impact_template, placeholders),
                config_change: rule.config_change.clone(),
            }
        })
        .collect()
}

pub fn fallback_recommendations(input: &FallbackInput) -> Vec<Recommendation> {
    let mut recs: Vec<Recommendation> = Vec::new();

    if input.heartbeat_pct > HEARTBEAT_PCT_THRESHOLD {
        let savings = input.heartbeat_usd * HEARTBEAT_SAVINGS_RATE;
        recs.push(Recommendation::new(
            Category::Cost,
            "Switch heartbeat model to a cheaper default and limit overnight windows",
            format!("Expected savings: ${}/week", fmt_money(savings)),
        ));
    }

    if input.unused_count > UNUSED_SKILLS_THRESHOLD {
        recs.push(Recommendation::new(
            Category::Cleanup,
            format!(
                "Disable unused skills ({}) to reduce prompt overhead",
                input.unused_names
            ),
            "Reduces token load per session and lowers latency",
        ));
    }

    if input.error_rate > ERROR_RATE_THRESHOLD {
        recs.push(Recommendation::new(
            Category::Reliability,
            "Add guardrails for recurring failing task types and increase validation before writes",
            format!("Current error rate: {}%", one_decimal(input.error_rate * 100.0)),
        ));
    }

    if input.read_write_ratio > READ_WRITE_RATIO_THRESHOLD {
        recs.push(Recommendation::new(
            Category::Efficiency,
            "Restructure MEMORY.md to reduce repetitive read-heavy tool chains",
            format!("Read/write ratio currently {}:1", input.read_write_ratio),
        ));
    }

    if input.context_overflows > 0 {
        recs.push(Recommendation::new(
            Category::Reliability,
            "Increase compaction threshold and trim oversized memory sections",
            format!("Observed overflows: {}", input.context_overflows),
        ));
    }

    if input.three_am_sessions > THREE_AM_SESSIONS_THRESHOLD {
        recs.push(Recommendation::new(
            Category::Efficiency,
            "Restrict autonomous runtime hours to 08:00-24:00",
            "Cuts low-value overnight activity",
        ));
    }

    if recs.is_empty() {
        recs.push(Recommendation::new(
            Category::Efficiency,
            "Keep current configuration and monitor weekly trend movement",
            "No major regressions detected",
        ));
    }
    recs.truncate(MAX_RECOMMENDATIONS);
    recs
}
