use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use crate::catalog::{Category, RuleCatalog};
use crate::document::AnalysisDocument;
use crate::metrics::Metrics;
use crate::note::{NoteCatalog, manager_note};
use crate::placeholders::Placeholders;
use crate::recommend::{FallbackInput, Recommendation, select_with_fallback};
use crate::util::fmt_money;

static DOLLAR_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$([0-9][0-9,]*(?:\.[0-9]+)?)").expect("static amount pattern")
});

pub const NO_LEAK_TIP: &str =
    "No large leak detected this week; keep current config and monitor trends";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostTip {
    pub text: String,
    pub savings_usd: f64,
}

/// Savings below this are not quoted on the tip line.
const QUOTED_SAVINGS_MIN: f64 = 2.0;

impl CostTip {
    pub fn line(&self) -> String {
        if self.savings_usd >= QUOTED_SAVINGS_MIN {
            format!("TIP: {} -> -${}/wk", self.text, fmt_money(self.savings_usd))
        } else {
            format!("TIP: {}", self.text)
        }
    }
}

/// The first COST recommendation, with savings read from the first `$amount`
/// in its impact line.
pub fn choose_tip(recommendations: &[Recommendation]) -> CostTip {
    let Some(rec) = recommendations.iter().find(|r| r.category == Category::Cost) else {
        return CostTip {
            text: NO_LEAK_TIP.to_string(),
            savings_usd: 0.0,
        };
    };
    let savings_usd = DOLLAR_AMOUNT
        .captures(&rec.impact)
        .and_then(|caps| caps[1].replace(',', "").parse::<f64>().ok())
        .unwrap_or(0.0);
    CostTip {
        text: rec.text.clone(),
        savings_usd,
    }
}

pub fn iso_week(doc: &AnalysisDocument) -> Option<u32> {
    let end = doc.meta.period.end.as_deref()?;
    NaiveDate::parse_from_str(end.trim(), "%Y-%m-%d")
        .ok()
        .map(|d| d.iso_week().week())
}

/// `Week <n>` from `meta.period.end`, or `Week N` when it is missing or unparseable.
pub fn week_label(doc: &AnalysisDocument) -> String {
    match iso_week(doc) {
        Some(week) => format!("Week {week}"),
        None => "Week N".to_string(),
    }
}

pub fn plan_header(doc: &AnalysisDocument) -> String {
    match iso_week(doc) {
        Some(week) => format!("PERFORMANCE IMPROVEMENT PLAN - WEEK {}", week + 1),
        None => "PERFORMANCE IMPROVEMENT PLAN - WEEK N+1".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewReport {
    pub week: String,
    pub plan_header: String,
    pub period_start: Option<String>,
    pub period_end: Option<String>,
    pub agent_id: Option<String>,
    pub metrics: Metrics,
    pub recommendations: Vec<Recommendation>,
    pub tip: CostTip,
    pub manager_note: String,
}

impl ReviewReport {
    pub fn build(
        doc: &AnalysisDocument,
        rules: &RuleCatalog,
        notes: &NoteCatalog,
        seed: Option<u64>,
    ) -> Self {
        let metrics = Metrics::from_document(doc);
        let placeholders = Placeholders::from_document(doc);
        let fallback = FallbackInput::from_document(doc, &metrics, &placeholders);
        let recommendations = select_with_fallback(&metrics, &placeholders, &fallback, rules);
        let tip = choose_tip(&recommendations);
        let manager_note = manager_note(doc, &placeholders, &recommendations, notes, seed);
        ReviewReport {
            week: week_label(doc),
            plan_header: plan_header(doc),
            period_start: doc.meta.period.start.clone(),
            period_end: doc.meta.period.end.clone(),
            agent_id: doc.meta.agent_id.clone(),
            metrics,
            recommendations,
            tip,
            manager_note,
        }
    }
}
