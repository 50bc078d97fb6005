mod common;

use common::{read_fixture, shipped_catalog};
use perfreview::{
    AnalysisDocument, Category, Metrics, Placeholders, RuleCatalog, evaluate_condition, render,
    render_narrative, select, select_with,
};
use serde_json::{Value, json};

fn metrics(pairs: &[(&str, f64)]) -> Metrics {
    pairs.iter().map(|(k, v)| (*k, *v)).collect()
}

fn doc(value: Value) -> AnalysisDocument {
    AnalysisDocument::from_value(value).expect("object root")
}

fn irregular_documents() -> Vec<Value> {
    vec![
        json!({}),
        json!({"meta": null, "cost": 5, "tasks": "x", "autonomous": [], "skills": true, "health": {}, "rating": 1.5}),
        json!({"cost": {"total_usd": "NaN", "by_source": {"heartbeats": {"usd": "inf", "pct": "1e999"}}}}),
        json!({"health": {"error_rate": true, "errors_total": [1], "read_write_ratio": {"x": 1}}}),
        json!({"skills": {"unused": ["a", "b", "c", "d", "e"], "top_used": "github"}}),
        json!({"tasks": {"asked": -4, "trend": [null, 3, {"value": "90"}]}, "rating": {"title": 7}}),
        read_fixture("week_sample.json"),
    ]
}

#[test]
fn selection_always_returns_one_to_three() {
    let shipped = RuleCatalog::load(&shipped_catalog());
    assert!(!shipped.is_empty(), "shipped catalog should load");
    for raw in irregular_documents() {
        let d = doc(raw.clone());
        for catalog in [&RuleCatalog::empty(), &shipped] {
            let recs = select(&d, catalog);
            assert!(
                (1..=3).contains(&recs.len()),
                "len={} for {raw}",
                recs.len()
            );
        }
        let m = Metrics::from_document(&d);
        assert!(m.iter().all(|(_, v)| v.is_finite()), "non-finite metric for {raw}");
    }
}

#[test]
fn selection_is_idempotent() {
    let d = doc(read_fixture("week_sample.json"));
    let catalog = RuleCatalog::load(&shipped_catalog());
    let first = select(&d, &catalog);
    let second = select(&d, &RuleCatalog::load(&shipped_catalog()));
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).expect("json"),
        serde_json::to_string(&second).expect("json")
    );
}

#[test]
fn condition_truth_table() {
    let cond = "a>5 AND b<2 OR c==3";
    assert!(evaluate_condition(cond, &metrics(&[("a", 6.0), ("b", 1.0), ("c", 0.0)])));
    assert!(evaluate_condition(cond, &metrics(&[("a", 1.0), ("b", 1.0), ("c", 3.0)])));
    assert!(!evaluate_condition(cond, &metrics(&[("a", 1.0), ("b", 1.0), ("c", 0.0)])));
    assert!(!evaluate_condition("ghost>1", &Metrics::new()));
    assert!(evaluate_condition("ghost<=0", &Metrics::new()));
}

#[test]
fn equal_priorities_keep_catalog_order() {
    let catalog = RuleCatalog::from_value(&json!({
        "patterns": [
            {"condition": "x >= 0", "template": "first five", "priority": 5},
            {"condition": "x >= 0", "template": "one", "priority": 1},
            {"condition": "x >= 0", "template": "second five", "priority": 5}
        ]
    }))
    .expect("catalog");
    let recs = select_with(&Metrics::new(), &Placeholders::new(), &catalog);
    let texts: Vec<&str> = recs.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, vec!["one", "first five", "second five"]);
}

#[test]
fn empty_catalog_heartbeat_fallback_cites_savings() {
    let m = metrics(&[("heartbeat_cost_pct", 40.0), ("heartbeat_cost_usd", 20.0)]);
    let recs = select_with(&m, &Placeholders::new(), &RuleCatalog::empty());
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].category, Category::Cost);
    assert_eq!(recs[0].impact, "Expected savings: $7.00/week");
}

#[test]
fn error_rate_only_scenario_yields_one_reliability() {
    let m = metrics(&[
        ("error_rate", 0.15),
        ("heartbeat_cost_pct", 10.0),
        ("unused_skills_count", 0.0),
        ("read_write_ratio", 10.0),
        ("context_overflows", 0.0),
        ("three_am_sessions", 0.0),
    ]);
    let catalog = RuleCatalog::from_value(&json!({
        "patterns": [{"condition": "error_rate > 0.5", "template": "never"}]
    }))
    .expect("catalog");
    let recs = select_with(&m, &Placeholders::new(), &catalog);
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].category, Category::Reliability);
    assert_eq!(recs[0].impact, "Current error rate: 15.0%");
}

#[test]
fn quiet_week_yields_generic_recommendation() {
    let recs = select(&doc(json!({})), &RuleCatalog::empty());
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].category, Category::Efficiency);
    assert_eq!(recs[0].impact, "No major regressions detected");
}

#[test]
fn unresolved_tokens_differ_between_renderers() {
    let values = Placeholders::from_document(&doc(json!({})));
    assert_eq!(render("fix {typo_field}", &values), "fix {typo_field}");
    assert_eq!(render_narrative("fix {typo_field}", &values), "fix n/a");

    let catalog = RuleCatalog::from_value(&json!({
        "patterns": [{"condition": "total_cost_usd > 0", "template": "spend {typo_field}", "impact": "${total_cost}"}]
    }))
    .expect("catalog");
    let recs = select(&doc(json!({"cost": {"total_usd": 3}})), &catalog);
    assert_eq!(recs[0].text, "spend {typo_field}");
    assert_eq!(recs[0].impact, "$3.00");
}

#[test]
fn shipped_catalog_on_sample_week() {
    let recs = select(
        &doc(read_fixture("week_sample.json")),
        &RuleCatalog::load(&shipped_catalog()),
    );
    let cats: Vec<Category> = recs.iter().map(|r| r.category).collect();
    assert_eq!(cats, vec![Category::Cost, Category::Cleanup, Category::Efficiency]);
    assert_eq!(
        recs[0].text,
        "Move heartbeats to anthropic/claude-haiku-4-5; they are 47% of spend ($18.20)"
    );
    assert_eq!(recs[0].impact, "Expected savings: $6.37/week (~17% of total)");
    assert_eq!(
        recs[0].config_change.as_deref(),
        Some("heartbeat.model = \"anthropic/claude-haiku-4-5\"")
    );
    assert_eq!(
        recs[1].text,
        "Disable 6 unused skills (weather, spotify, notion, trello)"
    );
}
