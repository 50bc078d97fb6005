//! Typed view of the weekly analysis document.
//!
//! Every field is optional. Sections of the wrong type collapse to their
//! empty default and leaves of the wrong type collapse to `None`, so turning
//! a JSON object into an [`AnalysisDocument`] never fails. Only the root has
//! to be an object; that check belongs to [`AnalysisDocument::from_value`].

use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::error::{ReviewError, ReviewResult};

#[derive(Debug, Default, Clone, Deserialize)]
pub struct AnalysisDocument {
    #[serde(default, deserialize_with = "lenient::section")]
    pub meta: Meta,
    #[serde(default, deserialize_with = "lenient::section")]
    pub cost: Cost,
    #[serde(default, deserialize_with = "lenient::section")]
    pub tasks: Tasks,
    #[serde(default, deserialize_with = "lenient::section")]
    pub autonomous: Autonomous,
    #[serde(default, deserialize_with = "lenient::section")]
    pub skills: Skills,
    #[serde(default, deserialize_with = "lenient::section")]
    pub health: Health,
    #[serde(default, deserialize_with = "lenient::section")]
    pub rating: Rating,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct Meta {
    #[serde(default, deserialize_with = "lenient::text")]
    pub agent_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub hostname: Option<String>,
    #[serde(default, deserialize_with = "lenient::section")]
    pub period: Period,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct Period {
    #[serde(default, deserialize_with = "lenient::text")]
    pub start: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub end: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub days: Option<f64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct Cost {
    #[serde(default, deserialize_with = "lenient::number")]
    pub total_usd: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub per_completed_task_usd: Option<f64>,
    #[serde(default, deserialize_with = "lenient::section")]
    pub by_source: CostBySource,
    #[serde(default, deserialize_with = "lenient::list")]
    pub trend: Vec<TrendPoint>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct CostBySource {
    #[serde(default, deserialize_with = "lenient::section")]
    pub user_requests: SourceCost,
    #[serde(default, deserialize_with = "lenient::section")]
    pub heartbeats: SourceCost,
    #[serde(default, deserialize_with = "lenient::section")]
    pub cron_jobs: SourceCost,
    #[serde(default, deserialize_with = "lenient::section")]
    pub self_initiated: SourceCost,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct SourceCost {
    #[serde(default, deserialize_with = "lenient::number")]
    pub usd: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub pct: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub count: Option<f64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct TrendPoint {
    #[serde(default, deserialize_with = "lenient::number")]
    pub value: Option<f64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct Tasks {
    #[serde(default, deserialize_with = "lenient::number")]
    pub asked: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub completed: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub failed: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub in_progress: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub completion_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub trend: Vec<TrendPoint>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct Autonomous {
    #[serde(default, deserialize_with = "lenient::number")]
    pub total_actions: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub useful_count: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub useful_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub three_am_sessions: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub three_am_useful: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub heartbeat_useful_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub risky_count: Option<f64>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub notable: Vec<NotableAction>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct NotableAction {
    #[serde(default, deserialize_with = "lenient::text")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub verdict: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct Skills {
    #[serde(default, deserialize_with = "lenient::number")]
    pub used: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub installed: Option<f64>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub top_used: Vec<SkillUsage>,
    /// One slot per array element; blank or null entries still count.
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub unused: Vec<Option<String>>,
}

impl Skills {
    pub fn unused_names(&self) -> impl Iterator<Item = &str> {
        self.unused.iter().filter_map(|name| name.as_deref())
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct SkillUsage {
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub calls: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub pct_of_total: Option<f64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct Health {
    #[serde(default, deserialize_with = "lenient::number")]
    pub error_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub errors_total: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub errors_self_caused: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub read_write_ratio: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub read_calls: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub write_calls: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub context_overflows: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub tool_failures: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub avg_response_seconds: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub compactions: Option<f64>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub error_rate_trend: Vec<TrendPoint>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct Rating {
    #[serde(default, deserialize_with = "lenient::text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub previous_title: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub percentile: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub previous_task_completion_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub tier_index: Option<f64>,
}

/// Integer view of an optional leaf: truncated toward zero, `default` when absent.
pub fn int_or(value: Option<f64>, default: i64) -> i64 {
    value.map(|v| v.trunc() as i64).unwrap_or(default)
}

pub fn num_or(value: Option<f64>, default: f64) -> f64 {
    value.unwrap_or(default)
}

impl AnalysisDocument {
    pub fn from_value(value: Value) -> ReviewResult<Self> {
        if !value.is_object() {
            return Err(ReviewError::invalid(format!(
                "analysis root must be a JSON object, got {}",
                lenient::kind(&value)
            )));
        }
        AnalysisDocument::deserialize(value)
            .map_err(|e| ReviewError::json("failed to normalize analysis document", e))
    }

    pub fn from_json_str(raw: &str) -> ReviewResult<Self> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| ReviewError::json("analysis is not valid JSON", e))?;
        Self::from_value(value)
    }

    pub fn load(path: &Path) -> ReviewResult<Self> {
        if !path.exists() {
            return Err(ReviewError::MissingInput {
                path: path.to_path_buf(),
            });
        }
        let raw = fs::read_to_string(path)
            .map_err(|e| ReviewError::io(format!("failed reading analysis file {}", path.display()), e))?;
        let value: Value = serde_json::from_str(&raw).map_err(|e| {
            ReviewError::json(format!("analysis file is not valid JSON: {}", path.display()), e)
        })?;
        Self::from_value(value)
    }

    pub fn top_skill(&self) -> Option<&SkillUsage> {
        self.skills.top_used.first()
    }

    /// `agent:period_end`, the stable identity of one weekly review.
    pub fn review_key(&self) -> String {
        let agent = self.meta.agent_id.as_deref().unwrap_or("agent");
        let end = self.meta.period.end.as_deref().unwrap_or("week");
        format!("{agent}:{end}")
    }
}

pub(crate) mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn kind(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    fn short_type_name<T>() -> &'static str {
        let full = std::any::type_name::<T>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Finite number from a number, bool (0/1) or numeric string.
    pub fn coerce_f64(value: &Value) -> Option<f64> {
        let parsed = match value {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed.filter(|v| v.is_finite())
    }

    pub fn coerce_text(value: &Value) -> Option<String> {
        let text = match value {
            Value::Null => return None,
            Value::String(s) => s.clone(),
            Value::Array(_) | Value::Object(_) => serde_json::to_string(value).ok()?,
            other => other.to_string(),
        };
        let text = text.replace('\0', " ").trim().to_string();
        (!text.is_empty()).then_some(text)
    }

    pub fn number<'de, D>(d: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(d)?;
        Ok(coerce_f64(&value))
    }

    pub fn text<'de, D>(d: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(d)?;
        Ok(coerce_text(&value))
    }

    pub fn section<'de, D, T>(d: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + Default,
    {
        let value = Value::deserialize(d)?;
        Ok(section_from(value))
    }

    fn section_from<T>(value: Value) -> T
    where
        T: DeserializeOwned + Default,
    {
        match value {
            Value::Null => T::default(),
            Value::Object(_) => T::deserialize(value).unwrap_or_else(|e| {
                tracing::warn!(section = short_type_name::<T>(), error = %e, "malformed section; using empty object");
                T::default()
            }),
            other => {
                tracing::warn!(
                    section = short_type_name::<T>(),
                    got = kind(&other),
                    "expected object; using empty object"
                );
                T::default()
            }
        }
    }

    pub fn list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + Default,
    {
        let value = Value::deserialize(d)?;
        Ok(match value {
            Value::Null => Vec::new(),
            Value::Array(items) => items.into_iter().map(section_from).collect(),
            other => {
                tracing::warn!(
                    item = short_type_name::<T>(),
                    got = kind(&other),
                    "expected list; using empty list"
                );
                Vec::new()
            }
        })
    }

    pub fn text_list<'de, D>(d: D) -> Result<Vec<Option<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(d)?;
        Ok(match value {
            Value::Null => Vec::new(),
            Value::Array(items) => items.iter().map(coerce_text).collect(),
            other => {
                tracing::warn!(got = kind(&other), "expected list of names; using empty list");
                Vec::new()
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wrong_typed_sections_fall_back_to_defaults() {
        let doc = AnalysisDocument::from_value(json!({
            "meta": "oops",
            "cost": [1, 2, 3],
            "tasks": null,
            "skills": {"unused": "not-a-list", "top_used": [42, {"name": "github"}]},
            "health": {"error_rate": "NaN", "errors_total": true, "read_write_ratio": "12.5"}
        }))
        .expect("object root");
        assert!(doc.meta.agent_id.is_none());
        assert!(doc.cost.total_usd.is_none());
        assert!(doc.tasks.asked.is_none());
        assert!(doc.skills.unused.is_empty());
        assert_eq!(doc.skills.top_used.len(), 2);
        assert!(doc.skills.top_used[0].name.is_none());
        assert_eq!(doc.skills.top_used[1].name.as_deref(), Some("github"));
        assert_eq!(doc.health.error_rate, None);
        assert_eq!(doc.health.errors_total, Some(1.0));
        assert_eq!(doc.health.read_write_ratio, Some(12.5));
    }

    #[test]
    fn non_object_root_is_rejected() {
        let err = AnalysisDocument::from_value(json!([1, 2])).expect_err("array root");
        assert!(err.to_string().contains("must be a JSON object"), "{err}");
        assert!(AnalysisDocument::from_json_str("{not json").is_err());
    }

    #[test]
    fn unused_entries_keep_their_slots() {
        let doc = AnalysisDocument::from_value(json!({
            "skills": {"unused": ["weather", 7, null, "", {"n": 1}]}
        }))
        .expect("doc");
        assert_eq!(doc.skills.unused.len(), 5);
        let names: Vec<&str> = doc.skills.unused_names().collect();
        assert_eq!(names, vec!["weather", "7", "{\"n\":1}"]);
    }

    #[test]
    fn int_or_truncates_toward_zero() {
        assert_eq!(int_or(Some(3.9), 0), 3);
        assert_eq!(int_or(Some(-3.9), 0), -3);
        assert_eq!(int_or(None, 50), 50);
    }

    #[test]
    fn review_key_uses_defaults() {
        let doc = AnalysisDocument::default();
        assert_eq!(doc.review_key(), "agent:week");
        let doc = AnalysisDocument::from_value(json!({
            "meta": {"agent_id": "main", "period": {"end": "2026-02-16"}}
        }))
        .expect("doc");
        assert_eq!(doc.review_key(), "main:2026-02-16");
    }
}
