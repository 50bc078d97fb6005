//! Rule conditions: an `OR` of `AND` clauses over metric comparisons.
//!
//! ```text
//! heartbeat_cost_pct > 30 AND total_cost_usd >= 5 OR error_rate > 0.1
//! ```
//!
//! There is no nesting, negation or grouping. Separators are matched
//! case-insensitively and need whitespace on both sides. A term that does not
//! parse turns its whole clause false; unknown metrics read as `0.0`.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use crate::metrics::Metrics;

static OR_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+OR\s+").expect("static OR pattern"));
static AND_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+AND\s+").expect("static AND pattern"));
static TERM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9_]+)\s*(>=|<=|>|<|==|!=)\s*(-?[0-9]+(?:\.[0-9]+)?)$")
        .expect("static term pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
}

impl CompareOp {
    fn parse(op: &str) -> Option<Self> {
        Some(match op {
            ">" => CompareOp::Gt,
            "<" => CompareOp::Lt,
            ">=" => CompareOp::Ge,
            "<=" => CompareOp::Le,
            "==" => CompareOp::Eq,
            "!=" => CompareOp::Ne,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
        }
    }

    /// Plain IEEE comparison; `==` and `!=` carry no tolerance.
    #[allow(clippy::float_cmp)]
    pub fn apply(self, left: f64, right: f64) -> bool {
        match self {
            CompareOp::Gt => left > right,
            CompareOp::Lt => left < right,
            CompareOp::Ge => left >= right,
            CompareOp::Le => left <= right,
            CompareOp::Eq => left == right,
            CompareOp::Ne => left != right,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub metric: String,
    pub op: CompareOp,
    pub value: f64,
}

impl Comparison {
    pub fn evaluate(&self, metrics: &Metrics) -> bool {
        self.op.apply(metrics.value_or_zero(&self.metric), self.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Or(Vec<Expr>),
    And(Vec<Expr>),
    Compare(Comparison),
    /// A term that failed to parse; always false.
    Malformed(String),
}

impl Expr {
    /// Parses a condition string. Never fails: bad input becomes an
    /// expression that evaluates to false.
    pub fn parse(source: &str) -> Expr {
        let source = source.trim();
        if source.is_empty() {
            return Expr::Or(Vec::new());
        }
        let clauses = OR_SPLIT
            .split(source)
            .map(|clause| {
                Expr::And(
                    AND_SPLIT
                        .split(clause.trim())
                        .map(|term| parse_term(term.trim()))
                        .collect(),
                )
            })
            .collect();
        Expr::Or(clauses)
    }

    pub fn evaluate(&self, metrics: &Metrics) -> bool {
        match self {
            Expr::Or(clauses) => clauses.iter().any(|c| c.evaluate(metrics)),
            Expr::And(terms) => terms.iter().all(|t| t.evaluate(metrics)),
            Expr::Compare(cmp) => cmp.evaluate(metrics),
            Expr::Malformed(_) => false,
        }
    }

    pub fn is_malformed(&self) -> bool {
        match self {
            Expr::Or(items) | Expr::And(items) => items.iter().any(Expr::is_malformed),
            Expr::Compare(_) => false,
            Expr::Malformed(_) => true,
        }
    }
}

fn parse_term(term: &str) -> Expr {
    let Some(caps) = TERM.captures(term) else {
        return Expr::Malformed(term.to_string());
    };
    let (Some(op), Ok(value)) = (CompareOp::parse(&caps[2]), caps[3].parse::<f64>()) else {
        return Expr::Malformed(term.to_string());
    };
    Expr::Compare(Comparison {
        metric: caps[1].to_string(),
        op,
        value,
    })
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Or(items) | Expr::And(items) => {
                let sep = if matches!(self, Expr::Or(_)) { " OR " } else { " AND " };
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(sep)?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Expr::Compare(c) => write!(f, "{} {} {}", c.metric, c.op.as_str(), c.value),
            Expr::Malformed(raw) => write!(f, "<malformed: {raw}>"),
        }
    }
}

/// Parse-and-evaluate shortcut for one-off checks.
pub fn evaluate_condition(source: &str, metrics: &Metrics) -> bool {
    Expr::parse(source).evaluate(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(pairs: &[(&str, f64)]) -> Metrics {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn or_of_and_truth_table() {
        let cond = Expr::parse("a>5 AND b<2 OR c==3");
        assert!(cond.evaluate(&metrics(&[("a", 6.0), ("b", 1.0), ("c", 0.0)])));
        assert!(cond.evaluate(&metrics(&[("a", 1.0), ("b", 1.0), ("c", 3.0)])));
        assert!(!cond.evaluate(&metrics(&[("a", 1.0), ("b", 1.0), ("c", 0.0)])));
    }

    #[test]
    fn unknown_metric_reads_as_zero() {
        let empty = Metrics::new();
        assert!(!evaluate_condition("ghost>1", &empty));
        assert!(evaluate_condition("ghost<=0", &empty));
        assert!(evaluate_condition("ghost == 0", &empty));
    }

    #[test]
    fn separators_are_case_insensitive() {
        let m = metrics(&[("a", 2.0), ("b", 3.0)]);
        assert!(evaluate_condition("a > 1 and b > 2", &m));
        assert!(evaluate_condition("a > 5 or b > 2", &m));
        assert!(evaluate_condition("a > 5 Or b >= 3", &m));
    }

    #[test]
    fn malformed_term_fails_only_its_clause() {
        let m = metrics(&[("a", 10.0), ("b", 10.0)]);
        assert!(!evaluate_condition("a > 1 AND b >> 2", &m));
        assert!(evaluate_condition("a > 1 AND b >> 2 OR b > 1", &m));
        assert!(!evaluate_condition("a > one", &m));
        assert!(!evaluate_condition("a > 1 AND", &m));
        assert!(!evaluate_condition("(a > 1)", &m));
        assert!(Expr::parse("a > 1 AND b >> 2").is_malformed());
        assert!(!Expr::parse("a > 1 OR b < 2").is_malformed());
    }

    #[test]
    fn empty_condition_is_false() {
        let m = metrics(&[("a", 1.0)]);
        assert!(!evaluate_condition("", &m));
        assert!(!evaluate_condition("   \t ", &m));
    }

    #[test]
    fn operators_and_negative_literals() {
        let m = metrics(&[("x", -1.5)]);
        assert!(evaluate_condition("x < 0", &m));
        assert!(evaluate_condition("x >= -1.5", &m));
        assert!(evaluate_condition("x <= -1.5", &m));
        assert!(evaluate_condition("x == -1.5", &m));
        assert!(evaluate_condition("x != 2", &m));
        assert!(!evaluate_condition("x > -1.5", &m));
    }

    #[test]
    fn equality_is_exact() {
        let m = metrics(&[("error_rate", 0.1 + 0.2)]);
        assert!(!evaluate_condition("error_rate == 0.3", &m));
        assert!(evaluate_condition("error_rate != 0.3", &m));
    }

    #[test]
    fn display_round_trips_structure() {
        let cond = Expr::parse("a>5 AND b<2 OR c==3");
        assert_eq!(cond.to_string(), "a > 5 AND b < 2 OR c == 3");
    }
}
