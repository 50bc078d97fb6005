use jsonschema::JSONSchema;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::condition::Expr;
use crate::document::lenient::{coerce_f64, coerce_text};
use crate::error::{ReviewError, ReviewResult};

pub const DEFAULT_PRIORITY: i64 = 99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Cost,
    Efficiency,
    Cleanup,
    Reliability,
}

impl Category {
    /// Case-insensitive; anything unknown is `Efficiency`.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_uppercase()).as_deref() {
            Some("COST") => Category::Cost,
            Some("CLEANUP") => Category::Cleanup,
            Some("RELIABILITY") => Category::Reliability,
            _ => Category::Efficiency,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Cost => "COST",
            Category::Efficiency => "EFFICIENCY",
            Category::Cleanup => "CLEANUP",
            Category::Reliability => "RELIABILITY",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub condition_source: String,
    pub condition: Expr,
    pub template: String,
    pub impact_template: String,
    pub category: Category,
    pub priority: i64,
    pub config_change: Option<String>,
}

impl Rule {
    fn from_object(obj: &Map<String, Value>) -> Self {
        let text = |key: &str| obj.get(key).and_then(coerce_text).unwrap_or_default();
        let condition_source = text("condition");
        let category = obj.get("category").and_then(coerce_text);
        Rule {
            condition: Expr::parse(&condition_source),
            condition_source,
            template: text("template"),
            impact_template: text("impact"),
            category: Category::parse_or_default(category.as_deref()),
            priority: obj
                .get("priority")
                .and_then(coerce_f64)
                .map(|p| p.trunc() as i64)
                .unwrap_or(DEFAULT_PRIORITY),
            config_change: obj.get("config_change").and_then(coerce_text),
        }
    }
}

/// Candidate rules, sorted ascending by priority with catalog order kept on ties.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RuleCatalog {
    rules: Vec<Rule>,
}

fn catalog_shape() -> Value {
    json!({
        "type": "object",
        "properties": {
            "patterns": {"type": "array", "items": {"type": "object"}}
        }
    })
}

fn check_shape(value: &Value) -> ReviewResult<()> {
    let schema = catalog_shape();
    let compiled = JSONSchema::compile(&schema)
        .map_err(|e| ReviewError::invalid(format!("failed to compile catalog schema: {e}")))?;
    if let Err(errors) = compiled.validate(value) {
        let reasons: Vec<String> = errors.take(3).map(|e| e.to_string()).collect();
        return Err(ReviewError::invalid(format!(
            "unexpected catalog shape: {}",
            reasons.join(" | ")
        )));
    }
    Ok(())
}

impl RuleCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_rules(mut rules: Vec<Rule>) -> Self {
        rules.sort_by_key(|r| r.priority);
        RuleCatalog { rules }
    }

    /// Builds a catalog from a parsed `{"patterns": [...]}` document.
    /// Any pattern entry that is not an object rejects the whole catalog.
    pub fn from_value(value: &Value) -> ReviewResult<Self> {
        check_shape(value)?;
        let Some(patterns) = value.get("patterns").and_then(Value::as_array) else {
            return Ok(Self::empty());
        };
        let rules = patterns
            .iter()
            .filter_map(Value::as_object)
            .map(Rule::from_object)
            .collect();
        Ok(Self::from_rules(rules))
    }

    pub fn from_json_str(raw: &str) -> ReviewResult<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| ReviewError::json("recommendation catalog is not valid JSON", e))?;
        Self::from_value(&value)
    }

    /// Reads the catalog at `path`. Never fails: a missing file, unreadable
    /// file, invalid JSON or unexpected shape all yield an empty catalog.
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no recommendation catalog; using fallback rules");
                return Self::empty();
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed reading recommendation catalog");
                return Self::empty();
            }
        };
        match Self::from_json_str(&raw) {
            Ok(catalog) => {
                tracing::debug!(path = %path.display(), rules = catalog.len(), "loaded recommendation catalog");
                catalog
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring recommendation catalog");
                Self::empty()
            }
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
