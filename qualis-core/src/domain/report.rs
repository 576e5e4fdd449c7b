// qualis-core/src/domain/report.rs

use serde::Serialize;

use crate::domain::quality::{Rule, RuleKind};
use crate::domain::record::Record;

/// Lifecycle of one evaluation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Pending,
    Running,
    Completed,
    /// Only reached when the source is unavailable before any rule runs.
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    Pass,
    Fail,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Pass,
    Fail,
}

/// One record flagged by a rule. `row` is the 0-based position in the pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub rule: String,
    pub row: u64,
    pub record: Record,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnCount {
    pub column: String,
    pub violations: u64,
}

/// Outcome of one rule. `violation_count <= total_examined` always holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleResult {
    pub rule: String,
    pub kind: RuleKind,
    pub status: RuleStatus,
    pub total_examined: u64,
    pub violation_count: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub column_counts: Vec<ColumnCount>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<Violation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RuleResult {
    pub(crate) fn counted(
        rule: &Rule,
        total_examined: u64,
        violation_count: u64,
        column_counts: Vec<ColumnCount>,
        samples: Vec<Violation>,
    ) -> Self {
        debug_assert!(
            violation_count <= total_examined,
            "rule '{}' flagged {} of {} records",
            rule.name(),
            violation_count,
            total_examined
        );
        let status = if violation_count == 0 {
            RuleStatus::Pass
        } else {
            RuleStatus::Fail
        };
        Self {
            rule: rule.name().to_string(),
            kind: rule.kind(),
            status,
            total_examined,
            violation_count,
            column_counts,
            samples,
            error: None,
        }
    }

    pub fn errored(rule: &Rule, reason: impl Into<String>) -> Self {
        Self {
            rule: rule.name().to_string(),
            kind: rule.kind(),
            status: RuleStatus::Error,
            total_examined: 0,
            violation_count: 0,
            column_counts: Vec::new(),
            samples: Vec::new(),
            error: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total_rules: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
}

/// Ordered results of one run, one entry per registered rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub dataset: String,
    pub state: RunState,
    pub status: OverallStatus,
    pub summary: Summary,
    pub results: Vec<RuleResult>,
}

impl Report {
    pub fn completed(dataset: impl Into<String>, results: Vec<RuleResult>) -> Self {
        let summary = summarize(&results);
        let status = if summary.passed == summary.total_rules {
            OverallStatus::Pass
        } else {
            OverallStatus::Fail
        };
        Self {
            dataset: dataset.into(),
            state: RunState::Completed,
            status,
            summary,
            results,
        }
    }

    pub fn summarize(&self) -> Summary {
        self.summary
    }

    pub fn passed(&self) -> bool {
        self.status == OverallStatus::Pass
    }

    pub fn result(&self, rule: &str) -> Option<&RuleResult> {
        self.results.iter().find(|r| r.rule == rule)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn summarize(results: &[RuleResult]) -> Summary {
    let count = |status: RuleStatus| results.iter().filter(|r| r.status == status).count();
    Summary {
        total_rules: results.len(),
        passed: count(RuleStatus::Pass),
        failed: count(RuleStatus::Fail),
        errored: count(RuleStatus::Error),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn rule(name: &str) -> Rule {
        Rule::completeness(name, ["order_id"]).unwrap()
    }

    #[test]
    fn test_summary_counts_each_status() {
        let results = vec![
            RuleResult::counted(&rule("a"), 10, 0, vec![], vec![]),
            RuleResult::counted(&rule("b"), 10, 2, vec![], vec![]),
            RuleResult::errored(&rule("c"), "boom"),
        ];
        let report = Report::completed("orders", results);

        insta::assert_yaml_snapshot!(report.summarize(), @r###"
        total_rules: 3
        passed: 1
        failed: 1
        errored: 1
        "###);
        assert!(!report.passed());
        assert_eq!(report.state, RunState::Completed);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "flagged 4 of 3 records")]
    fn test_more_violations_than_examined_is_a_bug() {
        RuleResult::counted(&rule("a"), 3, 4, vec![], vec![]);
    }

    #[test]
    fn test_errored_rule_fails_overall_status() {
        let report = Report::completed("orders", vec![RuleResult::errored(&rule("a"), "x")]);
        assert_eq!(report.status, OverallStatus::Fail);
    }

    #[test]
    fn test_empty_report_passes() {
        let report = Report::completed("orders", vec![]);
        assert!(report.passed());
        assert_eq!(report.summarize().total_rules, 0);
    }

    #[test]
    fn test_json_omits_empty_details() {
        let report = Report::completed(
            "orders",
            vec![RuleResult::counted(&rule("a"), 3, 0, vec![], vec![])],
        );
        let json = report.to_json().unwrap();
        assert!(json.contains("\"status\": \"pass\""));
        assert!(!json.contains("samples"));
        assert!(!json.contains("\"error\":"));
    }
}
