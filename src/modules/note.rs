//! The "manager note": one narrative paragraph picked deterministically from
//! a catalog of templates.

use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::document::AnalysisDocument;
use crate::document::lenient::coerce_text;
use crate::error::{ReviewError, ReviewResult};
use crate::placeholders::Placeholders;
use crate::recommend::Recommendation;
use crate::template::render_narrative;
use crate::util::sha256_hex;

pub const DEFAULT_NOTE_TEMPLATE: &str = "Completion rate is {completion_rate}% on ${total_cost} weekly spend. \
Autonomous work logged {autonomous_actions} actions with {autonomous_useful_pct}% usefulness. \
Current rating: {rating_title}. Recommendation: {recommendation_summary}.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteTemplate {
    pub template: String,
    pub requires: Vec<String>,
}

impl NoteTemplate {
    pub fn is_satisfied_by(&self, values: &Placeholders) -> bool {
        self.requires.iter().all(|token| values.is_filled(token))
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NoteCatalog {
    notes: Vec<NoteTemplate>,
}

impl NoteCatalog {
    pub fn new(notes: Vec<NoteTemplate>) -> Self {
        Self { notes }
    }

    /// Reads `{"manager_notes": [{"template": ..., "requires": [...]}]}`.
    /// Entries without a template are dropped.
    pub fn from_value(value: &Value) -> ReviewResult<Self> {
        let Some(root) = value.as_object() else {
            return Err(ReviewError::invalid("note catalog root must be a JSON object"));
        };
        let items = match root.get("manager_notes") {
            None | Some(Value::Null) => return Ok(Self::default()),
            Some(Value::Array(items)) => items,
            Some(_) => return Err(ReviewError::invalid("manager_notes must be a list")),
        };
        let notes = items
            .iter()
            .filter_map(|item| {
                let template = item.get("template").and_then(coerce_text)?;
                let requires = item
                    .get("requires")
                    .and_then(Value::as_array)
                    .map(|tokens| tokens.iter().filter_map(coerce_text).collect())
                    .unwrap_or_default();
                Some(NoteTemplate { template, requires })
            })
            .collect();
        Ok(Self { notes })
    }

    /// Tolerant loader: anything but a readable, well-formed file yields an
    /// empty catalog.
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no note catalog; using built-in note");
                return Self::default();
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed reading note catalog");
                return Self::default();
            }
        };
        let parsed = serde_json::from_str::<Value>(&raw)
            .map_err(|e| ReviewError::json("note catalog is not valid JSON", e))
            .and_then(|v| Self::from_value(&v));
        match parsed {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring note catalog");
                Self::default()
            }
        }
    }

    pub fn notes(&self) -> &[NoteTemplate] {
        &self.notes
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

/// Seed derived from the review identity: the first 8 hex digits of
/// SHA-256(`agent:period_end`).
pub fn review_seed(doc: &AnalysisDocument) -> u64 {
    let digest = sha256_hex(&doc.review_key());
    u64::from_str_radix(&digest[..8], 16).unwrap_or(0)
}

/// Picks among notes whose required tokens are filled, at index `seed % count`.
pub fn choose_note_template<'a>(
    catalog: &'a NoteCatalog,
    values: &Placeholders,
    seed: u64,
) -> Option<&'a NoteTemplate> {
    let candidates: Vec<&NoteTemplate> = catalog
        .notes()
        .iter()
        .filter(|n| n.is_satisfied_by(values))
        .collect();
    if candidates.is_empty() {
        return None;
    }
    let idx = (seed % candidates.len() as u64) as usize;
    candidates.get(idx).copied()
}

/// Renders the manager note. `values` should already be the document's
/// placeholder map; the top recommendation becomes `recommendation_summary`.
pub fn manager_note(
    doc: &AnalysisDocument,
    values: &Placeholders,
    recommendations: &[Recommendation],
    catalog: &NoteCatalog,
    seed: Option<u64>,
) -> String {
    let mut values = values.clone();
    if let Some(top) = recommendations.first() {
        values.insert("recommendation_summary", top.text.clone());
    }
    let seed = seed.unwrap_or_else(|| review_seed(doc));
    let template = choose_note_template(catalog, &values, seed)
        .map(|n| n.template.as_str())
        .unwrap_or(DEFAULT_NOTE_TEMPLATE);
    render_narrative(template, &values)
}
