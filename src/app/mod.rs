use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::catalog::RuleCatalog;
use crate::condition::Expr;
use crate::config::{APP_DESC, APP_NAME, APP_VERSION, app_config};
use crate::document::AnalysisDocument;
use crate::error::{ReviewError, ReviewResult};
use crate::logging::init_tracing;
use crate::metrics::Metrics;
use crate::note::{NoteCatalog, manager_note};
use crate::paths::{resolve_notes_file, resolve_recommendations_file};
use crate::placeholders::Placeholders;
use crate::recommend::{FallbackInput, Recommendation, select, select_with_fallback};
use crate::report::{ReviewReport, choose_tip, plan_header};

#[derive(Debug, Parser)]
#[command(name = APP_NAME, version = APP_VERSION, about = APP_DESC)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct AnalysisArgs {
    /// Weekly analysis JSON document
    analysis: PathBuf,
    /// Recommendation catalog (defaults to references/recommendations.json)
    #[arg(long, value_name = "PATH")]
    catalog: Option<PathBuf>,
    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct NoteArgs {
    /// Note catalog (defaults to references/roasts.json)
    #[arg(long, value_name = "PATH")]
    notes: Option<PathBuf>,
    /// Fixed seed for note selection (defaults to a hash of agent and period)
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Select up to three recommendations for the week
    Recommend(AnalysisArgs),
    /// Show the derived metrics used by rule conditions
    Metrics(AnalysisArgs),
    /// Show the placeholder values available to templates
    Placeholders(AnalysisArgs),
    /// Evaluate a condition against an analysis document
    Eval {
        /// Condition, e.g. "heartbeat_cost_pct > 30 AND total_cost_usd > 5"
        condition: String,
        #[command(flatten)]
        source: AnalysisArgs,
    },
    /// List catalog rules in evaluation order
    Rules {
        #[arg(long, value_name = "PATH")]
        catalog: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Render the manager note
    Note {
        #[command(flatten)]
        source: AnalysisArgs,
        #[command(flatten)]
        note: NoteArgs,
    },
    /// Show the cost-saving tip
    Tip(AnalysisArgs),
    /// Full review: metrics, recommendations, tip and manager note
    Report {
        #[command(flatten)]
        source: AnalysisArgs,
        #[command(flatten)]
        note: NoteArgs,
    },
}

pub fn run() -> i32 {
    run_from(std::env::args_os())
}

pub fn run_from<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() { 2 } else { 0 };
        }
    };
    init_tracing(&app_config().log_filter);
    match dispatch(cli.command) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{APP_NAME}: {e}");
            1
        }
    }
}

fn dispatch(command: Command) -> ReviewResult<()> {
    match command {
        Command::Recommend(args) => cmd_recommend(&args),
        Command::Metrics(args) => cmd_metrics(&args),
        Command::Placeholders(args) => cmd_placeholders(&args),
        Command::Eval { condition, source } => cmd_eval(&condition, &source),
        Command::Rules { catalog, json } => cmd_rules(catalog.as_deref(), json),
        Command::Note { source, note } => cmd_note(&source, &note),
        Command::Tip(args) => cmd_tip(&args),
        Command::Report { source, note } => cmd_report(&source, &note),
    }
}

fn load_rules(catalog: Option<&Path>) -> RuleCatalog {
    RuleCatalog::load(&resolve_recommendations_file(app_config(), catalog))
}

fn load_notes(notes: Option<&Path>) -> NoteCatalog {
    NoteCatalog::load(&resolve_notes_file(app_config(), notes))
}

fn print_json<T: Serialize>(value: &T) -> ReviewResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| ReviewError::json("failed to serialize output", e))?;
    println!("{text}");
    Ok(())
}

fn print_recommendations(recs: &[Recommendation]) {
    for (idx, rec) in recs.iter().enumerate() {
        println!("{}. [{}] {}", idx + 1, rec.category, rec.text);
        if !rec.impact.is_empty() {
            println!("   impact: {}", rec.impact);
        }
        if let Some(change) = &rec.config_change {
            println!("   config: {change}");
        }
    }
}

fn cmd_recommend(args: &AnalysisArgs) -> ReviewResult<()> {
    let doc = AnalysisDocument::load(&args.analysis)?;
    let rules = load_rules(args.catalog.as_deref());
    let recs = select(&doc, &rules);
    if args.json {
        return print_json(&recs);
    }
    println!("== {APP_NAME} recommend ==");
    println!("{}", plan_header(&doc));
    print_recommendations(&recs);
    Ok(())
}

fn cmd_metrics(args: &AnalysisArgs) -> ReviewResult<()> {
    let doc = AnalysisDocument::load(&args.analysis)?;
    let metrics = Metrics::from_document(&doc);
    if args.json {
        return print_json(&metrics);
    }
    println!("== {APP_NAME} metrics ==");
    for (name, value) in metrics.iter() {
        println!("{name}: {value}");
    }
    Ok(())
}

fn cmd_placeholders(args: &AnalysisArgs) -> ReviewResult<()> {
    let doc = AnalysisDocument::load(&args.analysis)?;
    let values = Placeholders::from_document(&doc);
    if args.json {
        return print_json(&values);
    }
    println!("== {APP_NAME} placeholders ==");
    for (token, value) in values.iter() {
        let shown = if value.is_empty() { "<empty>" } else { value };
        println!("{{{token}}}: {shown}");
    }
    Ok(())
}

fn cmd_eval(condition: &str, args: &AnalysisArgs) -> ReviewResult<()> {
    let doc = AnalysisDocument::load(&args.analysis)?;
    let expr = Expr::parse(condition);
    let result = expr.evaluate(&Metrics::from_document(&doc));
    if args.json {
        return print_json(&serde_json::json!({
            "condition": condition,
            "parsed": expr.to_string(),
            "malformed": expr.is_malformed(),
            "result": result
        }));
    }
    println!("parsed: {expr}");
    if expr.is_malformed() {
        println!("warning: malformed terms make their clause false");
    }
    println!("result: {result}");
    Ok(())
}

fn cmd_rules(catalog: Option<&Path>, json: bool) -> ReviewResult<()> {
    let path = resolve_recommendations_file(app_config(), catalog);
    let rules = RuleCatalog::load(&path);
    if json {
        let rows: Vec<serde_json::Value> = rules
            .rules()
            .iter()
            .map(|r| {
                serde_json::json!({
                    "priority": r.priority,
                    "category": r.category,
                    "condition": r.condition_source,
                    "malformed": r.condition.is_malformed(),
                    "template": r.template,
                    "impact": r.impact_template,
                    "config_change": r.config_change,
                })
            })
            .collect();
        return print_json(&serde_json::json!({
            "catalog": path.display().to_string(),
            "rules": rows
        }));
    }
    println!("== {APP_NAME} rules ({} loaded) ==", rules.len());
    println!("catalog: {}", path.display());
    for r in rules.rules() {
        let flag = if r.condition.is_malformed() { " (malformed)" } else { "" };
        println!("{:>3} [{}] {}{}", r.priority, r.category, r.condition_source, flag);
    }
    Ok(())
}

fn cmd_note(args: &AnalysisArgs, note: &NoteArgs) -> ReviewResult<()> {
    let doc = AnalysisDocument::load(&args.analysis)?;
    let metrics = Metrics::from_document(&doc);
    let values = Placeholders::from_document(&doc);
    let fallback = FallbackInput::from_document(&doc, &metrics, &values);
    let recs = select_with_fallback(
        &metrics,
        &values,
        &fallback,
        &load_rules(args.catalog.as_deref()),
    );
    let text = manager_note(
        &doc,
        &values,
        &recs,
        &load_notes(note.notes.as_deref()),
        note.seed,
    );
    if args.json {
        return print_json(&serde_json::json!({ "manager_note": text }));
    }
    println!("{text}");
    Ok(())
}

fn cmd_tip(args: &AnalysisArgs) -> ReviewResult<()> {
    let doc = AnalysisDocument::load(&args.analysis)?;
    let recs = select(&doc, &load_rules(args.catalog.as_deref()));
    let tip = choose_tip(&recs);
    if args.json {
        return print_json(&tip);
    }
    println!("{}", tip.line());
    Ok(())
}

fn cmd_report(args: &AnalysisArgs, note: &NoteArgs) -> ReviewResult<()> {
    let doc = AnalysisDocument::load(&args.analysis)?;
    let report = ReviewReport::build(
        &doc,
        &load_rules(args.catalog.as_deref()),
        &load_notes(note.notes.as_deref()),
        note.seed,
    );
    if args.json {
        return print_json(&report);
    }
    println!("== {APP_NAME} report: {} ==", report.week);
    if let (Some(start), Some(end)) = (&report.period_start, &report.period_end) {
        println!("period: {start} to {end}");
    }
    println!();
    println!("MANAGER'S NOTE");
    println!("{}", report.manager_note);
    println!();
    println!("{}", report.plan_header);
    print_recommendations(&report.recommendations);
    println!();
    println!("{}", report.tip.line());
    Ok(())
}
