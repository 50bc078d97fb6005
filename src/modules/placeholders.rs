//! Display strings for `{token}` substitution in rule and note templates.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::document::{AnalysisDocument, int_or, num_or};
use crate::util::{fmt_money, one_decimal, pct_of_rate};

pub const DEFAULT_RATING_TITLE: &str = "Unpaid Intern";
pub const DEFAULT_SKILL_NAME: &str = "example-skill";
pub const DEFAULT_TOP_SKILL: &str = "github";
pub const DEFAULT_NOTABLE_DESC: &str = "status checks";
pub const DEFAULT_RECOMMENDATION_SUMMARY: &str =
    "tighten cost controls and reduce low-yield autonomous cycles";
pub const CHEAP_MODEL: &str = "anthropic/claude-haiku-4-5";

/// Share of heartbeat spend a cheaper heartbeat setup is expected to save.
pub const HEARTBEAT_SAVINGS_RATE: f64 = 0.35;
const OVERNIGHT_SHARE: f64 = 0.22;
const MIN_ESTIMATED_SAVINGS: f64 = 2.0;
const MIN_REDUCTION_PCT: i64 = 10;
const MIN_TOKEN_SAVINGS: usize = 80;
const TOKENS_PER_UNUSED_SKILL: usize = 42;
const MAX_UNUSED_NAMES: usize = 4;

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Placeholders(BTreeMap<String, String>);

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, token: impl Into<String>, value: impl Into<String>) {
        self.0.insert(token.into(), value.into());
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.0.get(token).map(String::as_str)
    }

    /// True when the token exists and renders to something other than blanks.
    pub fn is_filled(&self, token: &str) -> bool {
        self.get(token).is_some_and(|v| !v.trim().is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn from_document(doc: &AnalysisDocument) -> Self {
        let mut p = Placeholders::new();
        insert_task_tokens(&mut p, doc);
        insert_cost_tokens(&mut p, doc);
        insert_autonomous_tokens(&mut p, doc);
        insert_health_tokens(&mut p, doc);
        insert_skill_tokens(&mut p, doc);
        insert_rating_tokens(&mut p, doc);
        insert_constants(&mut p);
        p
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Placeholders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut p = Placeholders::new();
        for (k, v) in iter {
            p.insert(k, v);
        }
        p
    }
}

fn count(value: Option<f64>) -> String {
    int_or(value, 0).to_string()
}

fn rounded_pct(rate: Option<f64>) -> Option<String> {
    rate.map(pct_of_rate)
}

/// Last completion rate the agent had, as a 0..1 rate.
fn previous_completion_rate(doc: &AnalysisDocument) -> Option<f64> {
    doc.rating.previous_task_completion_rate.or_else(|| {
        doc.tasks
            .trend
            .last()
            .map(|point| num_or(point.value, 0.0) / 100.0)
    })
}

fn insert_task_tokens(p: &mut Placeholders, doc: &AnalysisDocument) {
    let tasks = &doc.tasks;
    let completion = num_or(tasks.completion_rate, 0.0);
    p.insert("completed_tasks", count(tasks.completed));
    p.insert("asked_tasks", int_or(tasks.asked, 0).max(1).to_string());
    p.insert("failed_tasks", count(tasks.failed));
    p.insert("in_progress_tasks", count(tasks.in_progress));
    p.insert("completion_rate", pct_of_rate(completion));

    let previous = previous_completion_rate(doc);
    p.insert(
        "prev_completion",
        rounded_pct(previous).unwrap_or_default(),
    );
    p.insert(
        "completion_delta",
        previous
            .map(|prev| one_decimal((completion - prev) * 100.0))
            .unwrap_or_default(),
    );
}

fn insert_cost_tokens(p: &mut Placeholders, doc: &AnalysisDocument) {
    let cost = &doc.cost;
    let sources = &cost.by_source;
    let total = num_or(cost.total_usd, 0.0);
    let heartbeat = num_or(sources.heartbeats.usd, 0.0);
    let reduction_pct = if total > 0.0 {
        ((heartbeat / total) * HEARTBEAT_SAVINGS_RATE * 100.0).round() as i64
    } else {
        0
    };

    p.insert("total_cost", fmt_money(total));
    p.insert(
        "cost_per_task",
        fmt_money(num_or(cost.per_completed_task_usd, 0.0)),
    );
    p.insert("heartbeat_pct", count(sources.heartbeats.pct));
    p.insert("heartbeat_cost", fmt_money(heartbeat));
    p.insert(
        "self_initiated_cost",
        fmt_money(num_or(sources.self_initiated.usd, 0.0)),
    );
    p.insert("self_initiated_count", count(sources.self_initiated.count));
    p.insert(
        "estimated_savings",
        fmt_money((heartbeat * HEARTBEAT_SAVINGS_RATE).max(MIN_ESTIMATED_SAVINGS)),
    );
    p.insert("overnight_cost", fmt_money(heartbeat * OVERNIGHT_SHARE));
    p.insert(
        "reduction_pct",
        reduction_pct.max(MIN_REDUCTION_PCT).to_string(),
    );
}

fn insert_autonomous_tokens(p: &mut Placeholders, doc: &AnalysisDocument) {
    let auto = &doc.autonomous;
    let risky = match auto.risky_count {
        Some(n) => n.trunc() as i64,
        None => auto
            .notable
            .iter()
            .filter(|a| a.verdict.as_deref() == Some("risky"))
            .count() as i64,
    };
    let notable_desc = auto
        .notable
        .first()
        .and_then(|a| a.summary.clone())
        .unwrap_or_else(|| DEFAULT_NOTABLE_DESC.to_string());

    p.insert("autonomous_actions", count(auto.total_actions));
    p.insert("tool_calls_total", count(auto.total_actions));
    p.insert(
        "autonomous_useful_pct",
        pct_of_rate(num_or(auto.useful_rate, 0.0)),
    );
    p.insert("autonomous_notable_desc", notable_desc);
    p.insert("risky_actions", risky.to_string());
    p.insert("three_am_sessions", count(auto.three_am_sessions));
    p.insert("three_am_useful", count(auto.three_am_useful));
    p.insert(
        "heartbeat_useful_pct",
        rounded_pct(auto.heartbeat_useful_rate).unwrap_or_default(),
    );
}

fn insert_health_tokens(p: &mut Placeholders, doc: &AnalysisDocument) {
    let health = &doc.health;
    let asked = int_or(doc.tasks.asked, 0).max(1) as f64;
    let reported = num_or(health.error_rate, 0.0);
    let error_rate = if reported > 0.0 {
        reported
    } else {
        num_or(health.errors_total, 0.0) / asked
    };

    p.insert("errors_total", count(health.errors_total));
    p.insert("errors_self_caused", count(health.errors_self_caused));
    // No upstream source reports fixes yet.
    p.insert("errors_fixed", "");
    p.insert("error_rate_pct", one_decimal(error_rate * 100.0));
    p.insert("read_write_ratio", count(health.read_write_ratio));
    p.insert(
        "reads_total",
        health
            .read_calls
            .map(|v| (v.trunc() as i64).to_string())
            .unwrap_or_default(),
    );
    p.insert(
        "writes_total",
        health
            .write_calls
            .map(|v| (v.trunc() as i64).to_string())
            .unwrap_or_default(),
    );
    p.insert("context_overflows", count(health.context_overflows));
    p.insert("tool_failures", count(health.tool_failures));
    p.insert("compactions", count(health.compactions));
    p.insert(
        "avg_response_seconds",
        one_decimal(num_or(health.avg_response_seconds, 0.0)),
    );
}

fn insert_skill_tokens(p: &mut Placeholders, doc: &AnalysisDocument) {
    let skills = &doc.skills;
    let unused = &skills.unused;
    let top = doc.top_skill();

    p.insert("skills_used", count(skills.used));
    p.insert("skills_installed", count(skills.installed));
    p.insert("unused_count", unused.len().to_string());
    let short_names: Vec<&str> = unused
        .iter()
        .take(MAX_UNUSED_NAMES)
        .filter_map(|name| name.as_deref())
        .collect();
    p.insert(
        "unused_names_short",
        if short_names.is_empty() {
            "none".to_string()
        } else {
            short_names.join(", ")
        },
    );
    p.insert(
        "skill_name",
        skills
            .unused_names()
            .next()
            .unwrap_or(DEFAULT_SKILL_NAME),
    );
    p.insert(
        "token_savings",
        (unused.len() * TOKENS_PER_UNUSED_SKILL)
            .max(MIN_TOKEN_SAVINGS)
            .to_string(),
    );
    p.insert(
        "top_skill_name",
        top.and_then(|s| s.name.clone())
            .unwrap_or_else(|| DEFAULT_TOP_SKILL.to_string()),
    );
    p.insert("top_skill_pct", count(top.and_then(|s| s.pct_of_total)));
}

fn insert_rating_tokens(p: &mut Placeholders, doc: &AnalysisDocument) {
    let rating = &doc.rating;
    let title = rating
        .title
        .clone()
        .unwrap_or_else(|| DEFAULT_RATING_TITLE.to_string());
    p.insert(
        "previous_rating",
        rating.previous_title.clone().unwrap_or_else(|| title.clone()),
    );
    p.insert("rating_title", title);
    p.insert("percentile", int_or(rating.percentile, 50).to_string());
}

fn insert_constants(p: &mut Placeholders) {
    p.insert("recommendation_summary", DEFAULT_RECOMMENDATION_SUMMARY);
    p.insert("cheapest_model", CHEAP_MODEL);
    p.insert("cheaper_model", CHEAP_MODEL);
    p.insert("suggested_threshold", "120000");
    p.insert("suggested_confidence", "0.75");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(value: serde_json::Value) -> Placeholders {
        Placeholders::from_document(&AnalysisDocument::from_value(value).expect("object root"))
    }

    #[test]
    fn empty_document_uses_sentinels_and_blanks() {
        let p = build(json!({}));
        assert_eq!(p.get("skill_name"), Some(DEFAULT_SKILL_NAME));
        assert_eq!(p.get("unused_names_short"), Some("none"));
        assert_eq!(p.get("rating_title"), Some(DEFAULT_RATING_TITLE));
        assert_eq!(p.get("previous_rating"), Some(DEFAULT_RATING_TITLE));
        assert_eq!(p.get("top_skill_name"), Some("github"));
        assert_eq!(p.get("percentile"), Some("50"));
        assert_eq!(p.get("asked_tasks"), Some("1"));
        assert_eq!(p.get("prev_completion"), Some(""));
        assert_eq!(p.get("completion_delta"), Some(""));
        assert_eq!(p.get("reads_total"), Some(""));
        assert_eq!(p.get("errors_fixed"), Some(""));
        assert!(!p.is_filled("heartbeat_useful_pct"));
        assert_eq!(p.get("estimated_savings"), Some("2.00"));
        assert_eq!(p.get("reduction_pct"), Some("10"));
        assert_eq!(p.get("token_savings"), Some("80"));
    }

    #[test]
    fn currency_and_percent_formatting() {
        let p = build(json!({
            "cost": {
                "total_usd": 1234.5,
                "per_completed_task_usd": 0.456,
                "by_source": {"heartbeats": {"usd": 600.0, "pct": 48.6}}
            },
            "tasks": {"completion_rate": 0.875, "asked": 8},
            "autonomous": {"useful_rate": 0.333, "heartbeat_useful_rate": 0.5},
            "health": {"errors_total": 1}
        }));
        assert_eq!(p.get("total_cost"), Some("1,234.50"));
        assert_eq!(p.get("cost_per_task"), Some("0.46"));
        assert_eq!(p.get("heartbeat_cost"), Some("600.00"));
        assert_eq!(p.get("heartbeat_pct"), Some("48"));
        assert_eq!(p.get("estimated_savings"), Some("210.00"));
        assert_eq!(p.get("overnight_cost"), Some("132.00"));
        assert_eq!(p.get("reduction_pct"), Some("17"));
        assert_eq!(p.get("completion_rate"), Some("88"));
        assert_eq!(p.get("autonomous_useful_pct"), Some("33"));
        assert_eq!(p.get("heartbeat_useful_pct"), Some("50"));
        assert_eq!(p.get("error_rate_pct"), Some("12.5"));
    }

    #[test]
    fn previous_completion_falls_back_to_trend() {
        let p = build(json!({
            "tasks": {"completion_rate": 0.8, "trend": [{"value": 50}, {"value": 70}]}
        }));
        assert_eq!(p.get("prev_completion"), Some("70"));
        assert_eq!(p.get("completion_delta"), Some("10.0"));

        let p = build(json!({
            "tasks": {"completion_rate": 0.5, "trend": [{"value": 90}]},
            "rating": {"previous_task_completion_rate": 0.6}
        }));
        assert_eq!(p.get("prev_completion"), Some("60"));
        assert_eq!(p.get("completion_delta"), Some("-10.0"));
    }

    #[test]
    fn skill_and_autonomy_names() {
        let p = build(json!({
            "skills": {"unused": ["a", "b", "c", "d", "e"], "top_used": [{"name": "browser", "pct_of_total": 63.2}]},
            "autonomous": {"notable": [
                {"summary": "rotated logs", "verdict": "helpful"},
                {"summary": "deleted cache", "verdict": "risky"},
                {"verdict": "risky"}
            ]}
        }));
        assert_eq!(p.get("unused_names_short"), Some("a, b, c, d"));
        assert_eq!(p.get("unused_count"), Some("5"));
        assert_eq!(p.get("skill_name"), Some("a"));
        assert_eq!(p.get("token_savings"), Some("210"));
        assert_eq!(p.get("top_skill_name"), Some("browser"));
        assert_eq!(p.get("top_skill_pct"), Some("63"));
        assert_eq!(p.get("autonomous_notable_desc"), Some("rotated logs"));
        assert_eq!(p.get("risky_actions"), Some("2"));
    }

    #[test]
    fn blank_unused_entries_count_but_are_not_named() {
        let p = build(json!({"skills": {"unused": ["a", null, "", "b"]}}));
        assert_eq!(p.get("unused_count"), Some("4"));
        assert_eq!(p.get("unused_names_short"), Some("a, b"));
        assert_eq!(p.get("skill_name"), Some("a"));
        assert_eq!(p.get("token_savings"), Some("168"));
    }
}
