//! Metrics-to-recommendation engine for weekly agent performance reviews.
//!
//! An [`AnalysisDocument`](document::AnalysisDocument) is reduced to
//! [`Metrics`](metrics::Metrics) for rule conditions and
//! [`Placeholders`](placeholders::Placeholders) for template text. Rules from
//! a [`RuleCatalog`](catalog::RuleCatalog) are evaluated in priority order and
//! [`select`](recommend::select) returns one to three recommendations,
//! falling back to a fixed heuristic chain when no rule matches.

pub mod app;
pub mod error;
pub mod util;

#[path = "modules/catalog.rs"]
pub mod catalog;
#[path = "modules/condition.rs"]
pub mod condition;
#[path = "modules/config.rs"]
pub mod config;
#[path = "modules/document.rs"]
pub mod document;
#[path = "modules/logging.rs"]
pub mod logging;
#[path = "modules/metrics.rs"]
pub mod metrics;
#[path = "modules/note.rs"]
pub mod note;
#[path = "modules/paths.rs"]
pub mod paths;
#[path = "modules/placeholders.rs"]
pub mod placeholders;
#[path = "modules/recommend.rs"]
pub mod recommend;
#[path = "modules/report.rs"]
pub mod report;
#[path = "modules/template.rs"]
pub mod template;

pub use catalog::{Category, Rule, RuleCatalog};
pub use condition::{Expr, evaluate_condition};
pub use document::AnalysisDocument;
pub use error::{ReviewError, ReviewResult};
pub use metrics::Metrics;
pub use placeholders::Placeholders;
pub use recommend::{
    FallbackInput, MAX_RECOMMENDATIONS, Recommendation, select, select_with, select_with_fallback,
};
pub use template::{render, render_narrative};
