use serde::Serialize;
use std::collections::BTreeMap;

use crate::document::{AnalysisDocument, int_or, num_or};

/// Floor for `cost.total_usd` when it is used as a denominator.
pub const COST_EPSILON: f64 = 0.0001;

pub const METRIC_NAMES: [&str; 14] = [
    "heartbeat_cost_pct",
    "unused_skills_count",
    "three_am_sessions",
    "three_am_useful_rate",
    "error_rate",
    "cost_per_task",
    "read_write_ratio",
    "context_overflows",
    "top_skill_pct",
    "self_initiated_cost_pct",
    "autonomous_useful_rate",
    "tool_failures",
    "heartbeat_cost_usd",
    "total_cost_usd",
];

/// Named numeric signals consumed by rule conditions. Values are always finite.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Metrics(BTreeMap<String, f64>);

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value`, or `0.0` when it is NaN or infinite.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let value = if value.is_finite() { value } else { 0.0 };
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    /// Lookup used by conditions: unknown names read as `0.0`.
    pub fn value_or_zero(&self, name: &str) -> f64 {
        self.get(name).unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn from_document(doc: &AnalysisDocument) -> Self {
        let cost = &doc.cost;
        let heartbeats = &cost.by_source.heartbeats;
        let health = &doc.health;
        let auto = &doc.autonomous;

        let asked = int_or(doc.tasks.asked, 0).max(1) as f64;
        let total_usd = num_or(cost.total_usd, 0.0).max(COST_EPSILON);
        let auto_total = int_or(auto.total_actions, 0).max(1) as f64;
        let three_am = int_or(auto.three_am_sessions, 0);
        let self_usd = num_or(cost.by_source.self_initiated.usd, 0.0);

        let reported_error_rate = num_or(health.error_rate, 0.0);
        let error_rate = if reported_error_rate != 0.0 {
            reported_error_rate
        } else {
            num_or(health.errors_total, 0.0) / asked
        };

        let mut m = Metrics::new();
        m.insert("heartbeat_cost_pct", num_or(heartbeats.pct, 0.0));
        m.insert("unused_skills_count", doc.skills.unused.len() as f64);
        m.insert("three_am_sessions", three_am as f64);
        m.insert(
            "three_am_useful_rate",
            num_or(auto.three_am_useful, 0.0) / three_am.max(1) as f64,
        );
        m.insert("error_rate", error_rate);
        m.insert("cost_per_task", num_or(cost.per_completed_task_usd, 0.0));
        m.insert("read_write_ratio", num_or(health.read_write_ratio, 0.0));
        m.insert("context_overflows", num_or(health.context_overflows, 0.0));
        m.insert(
            "top_skill_pct",
            doc.top_skill()
                .and_then(|s| s.pct_of_total)
                .unwrap_or(0.0),
        );
        m.insert("self_initiated_cost_pct", (self_usd / total_usd) * 100.0);
        m.insert(
            "autonomous_useful_rate",
            num_or(auto.useful_count, 0.0) / auto_total,
        );
        m.insert("tool_failures", num_or(health.tool_failures, 0.0));
        m.insert("heartbeat_cost_usd", num_or(heartbeats.usd, 0.0));
        m.insert("total_cost_usd", total_usd);
        m
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for Metrics {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut m = Metrics::new();
        for (k, v) in iter {
            m.insert(k, v);
        }
        m
    }
}
