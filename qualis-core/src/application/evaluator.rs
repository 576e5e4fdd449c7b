// qualis-core/src/application/evaluator.rs

use futures::StreamExt;
use std::time::{Duration, Instant};
use tracing::{Instrument, debug, error, info, info_span, instrument, warn};

use crate::domain::error::DomainError;
use crate::domain::quality::{Check, Rule, RuleRegistry};
use crate::domain::report::{Report, RuleResult, RunState};
use crate::error::QualisError;
use crate::infrastructure::config::EvaluationConfig;
use crate::ports::row_source::RowSource;

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationOptions {
    /// Rules evaluated at the same time, each on its own pass.
    pub concurrency: usize,
    /// Per-rule budget. An expired rule is reported as `error`.
    pub timeout: Option<Duration>,
    /// Offending records kept per rule.
    pub sample_limit: usize,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            timeout: None,
            sample_limit: 5,
        }
    }
}

impl From<&EvaluationConfig> for EvaluationOptions {
    fn from(config: &EvaluationConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            timeout: config.timeout_secs.map(Duration::from_secs),
            sample_limit: config.sample_limit,
        }
    }
}

/// Runs every rule of a registry against one dataset.
pub struct Evaluator {
    dataset: String,
    options: EvaluationOptions,
}

impl Evaluator {
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            options: EvaluationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EvaluationOptions) -> Self {
        self.options = options;
        self
    }

    /// Evaluates the registry and returns one result per rule, in registry order.
    ///
    /// The registry is locked for good once this is called. The only fatal
    /// error is `SourceUnavailable` before any rule starts; anything going
    /// wrong inside a rule is reported in that rule's result.
    #[instrument(skip_all, fields(dataset = %self.dataset, rules = registry.len()))]
    pub async fn run(
        &self,
        registry: &RuleRegistry,
        source: &dyn RowSource,
    ) -> Result<Report, QualisError> {
        let start = Instant::now();
        let mut state = RunState::Pending;
        registry.lock();
        debug!(?state, "registry locked");

        let columns = match source.columns(&self.dataset).await {
            Ok(columns) => columns,
            Err(e) => {
                state = RunState::Aborted;
                error!(?state, engine = source.engine_name(), "run aborted: {}", e);
                return Err(match e {
                    QualisError::SourceUnavailable { .. } => e,
                    other => QualisError::source_unavailable(&self.dataset, other),
                });
            }
        };

        state = RunState::Running;
        info!(?state, engine = source.engine_name(), columns = columns.len(), "run started");

        let concurrency = self.options.concurrency.max(1);
        let results: Vec<RuleResult> = futures::stream::iter(registry.all())
            .map(|rule| {
                let span = info_span!("rule", name = rule.name(), kind = %rule.kind());
                self.evaluate_rule(rule, source, &columns).instrument(span)
            })
            // `buffered` keeps registry order whatever the completion order
            .buffered(concurrency)
            .collect()
            .await;

        state = RunState::Completed;
        let report = Report::completed(self.dataset.clone(), results);
        let summary = report.summarize();
        info!(
            ?state,
            passed = summary.passed,
            failed = summary.failed,
            errored = summary.errored,
            "run finished in {:.2?}",
            start.elapsed()
        );
        Ok(report)
    }

    async fn evaluate_rule(
        &self,
        rule: &Rule,
        source: &dyn RowSource,
        columns: &[String],
    ) -> RuleResult {
        let start = Instant::now();
        let pass = self.scan_rule(rule, source, columns);

        let outcome = match self.options.timeout {
            Some(limit) => match tokio::time::timeout(limit, pass).await {
                Ok(outcome) => outcome,
                Err(_) => Err(QualisError::from(DomainError::evaluation(
                    rule.name(),
                    format!("timed out after {:?}", limit),
                ))),
            },
            None => pass.await,
        };

        match outcome {
            Ok(result) => {
                debug!(
                    examined = result.total_examined,
                    violations = result.violation_count,
                    "rule finished in {:.2?}",
                    start.elapsed()
                );
                result
            }
            Err(e) => {
                warn!("rule errored: {}", e);
                RuleResult::errored(rule, error_reason(e))
            }
        }
    }

    async fn scan_rule(
        &self,
        rule: &Rule,
        source: &dyn RowSource,
        columns: &[String],
    ) -> Result<RuleResult, QualisError> {
        // Resolve to the source's own spelling of each column
        let mut projection = Vec::new();
        for wanted in rule.columns() {
            let actual = columns
                .iter()
                .find(|c| c.eq_ignore_ascii_case(&wanted))
                .ok_or_else(|| {
                    DomainError::evaluation(
                        rule.name(),
                        format!("unknown column '{}' in dataset '{}'", wanted, self.dataset),
                    )
                })?;
            projection.push(actual.clone());
        }

        // A broken expression must not pass by never meeting a record
        if let Check::BusinessPredicate { predicate } = rule.check() {
            if let Some(err) = predicate.malformed() {
                return Err(DomainError::evaluation(rule.name(), err).into());
            }
        }

        let mut records = source.scan(&self.dataset, Some(&projection)).await?;
        let mut tally = rule.tally(self.options.sample_limit);
        let mut row: u64 = 0;

        while let Some(record) = records.next().await {
            tally.observe(row, &record?)?;
            row += 1;
        }

        Ok(tally.finish())
    }
}

// Rule errors already carry the rule name in the result; keep only the cause
fn error_reason(err: QualisError) -> String {
    match err {
        QualisError::Domain(DomainError::RuleEvaluation { reason, .. }) => reason,
        other => other.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::quality::{Comparison, Predicate};
    use crate::domain::record::{Record, Value};
    use crate::domain::report::{OverallStatus, RuleStatus};
    use crate::infrastructure::adapters::InMemorySource;
    use crate::infrastructure::compiler::compile_predicate_lenient;
    use crate::ports::row_source::RecordStream;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> Value {
        Value::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn supastore() -> InMemorySource {
        InMemorySource::new()
            .with_dataset(
                "supastore_db",
                ["order_id", "customer_name", "order_date", "ship_date", "quantity"],
                vec![
                    vec![1.into(), "Alice".into(), date(2024, 1, 1), date(2024, 1, 3), 5.into()],
                    vec![2.into(), " Bob".into(), date(2024, 1, 5), date(2024, 1, 1), 0.into()],
                    vec![2.into(), "Carol ".into(), date(2024, 1, 6), Value::Null, (-1).into()],
                    vec![Value::Null, Value::Null, date(2024, 1, 7), date(2024, 1, 8), 1.into()],
                ],
            )
            .unwrap()
    }

    fn registry() -> RuleRegistry {
        RuleRegistry::try_from(vec![
            Rule::completeness("order_id_complete", ["order_id"]).unwrap(),
            Rule::null_check("keys_present", ["order_id", "order_date"]).unwrap(),
            Rule::duplicate_check("order_id_unique", ["order_id"]).unwrap(),
            Rule::whitespace_check("customer_name_trimmed", "customer_name").unwrap(),
            Rule::cross_field("ship_after_order", "ship_date", Comparison::Lt, "order_date")
                .unwrap(),
            Rule::business_predicate(
                "positive_quantity",
                Predicate::compare("quantity", Comparison::Lt, 1),
            )
            .unwrap(),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_run_reports_every_rule_in_order() {
        let registry = registry();
        let report = Evaluator::new("supastore_db")
            .run(&registry, &supastore())
            .await
            .unwrap();

        let names: Vec<&str> = report.results.iter().map(|r| r.rule.as_str()).collect();
        let expected: Vec<&str> = registry.all().iter().map(|r| r.name()).collect();
        assert_eq!(names, expected);
        assert!(
            report
                .results
                .iter()
                .all(|r| r.violation_count <= r.total_examined)
        );

        let counts: Vec<(u64, u64)> = report
            .results
            .iter()
            .map(|r| (r.total_examined, r.violation_count))
            .collect();
        assert_eq!(
            counts,
            vec![(4, 1), (4, 1), (3, 2), (3, 2), (3, 1), (4, 2)]
        );
        assert_eq!(report.status, OverallStatus::Fail);
        assert_eq!(report.state, RunState::Completed);
    }

    #[tokio::test]
    async fn test_run_locks_registry() {
        let mut registry = registry();
        Evaluator::new("supastore_db")
            .run(&registry, &supastore())
            .await
            .unwrap();

        let late = Rule::completeness("late", ["order_id"]).unwrap();
        assert_eq!(
            registry.register(late).unwrap_err(),
            DomainError::RegistryLocked("late".into())
        );
    }

    #[tokio::test]
    async fn test_unavailable_source_aborts_run() {
        let err = Evaluator::new("missing_table")
            .run(&registry(), &supastore())
            .await
            .unwrap_err();
        assert!(matches!(err, QualisError::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_broken_rules_are_isolated() {
        let registry = RuleRegistry::try_from(vec![
            Rule::completeness("ok", ["order_id"]).unwrap(),
            Rule::completeness("ghost_column", ["does_not_exist"]).unwrap(),
            Rule::business_predicate(
                "bad_types",
                Predicate::compare("customer_name", Comparison::Lt, 3),
            )
            .unwrap(),
            Rule::whitespace_check("trimmed", "customer_name").unwrap(),
        ])
        .unwrap();

        let report = Evaluator::new("supastore_db")
            .run(&registry, &supastore())
            .await
            .unwrap();

        let statuses: Vec<RuleStatus> = report.results.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                RuleStatus::Fail,
                RuleStatus::Error,
                RuleStatus::Error,
                RuleStatus::Fail
            ]
        );
        let ghost = report.result("ghost_column").unwrap();
        assert!(ghost.error.as_deref().unwrap().contains("does_not_exist"));
        assert_eq!(report.summarize().errored, 2);
    }

    #[tokio::test]
    async fn test_malformed_predicate_errors_on_empty_dataset() {
        let source = InMemorySource::new()
            .with_dataset("orders", ["quantity"], vec![])
            .unwrap();
        let registry = RuleRegistry::try_from(vec![
            Rule::business_predicate("broken", compile_predicate_lenient("quantity <")).unwrap(),
        ])
        .unwrap();

        let report = Evaluator::new("orders").run(&registry, &source).await.unwrap();

        let result = report.result("broken").unwrap();
        assert_eq!(result.status, RuleStatus::Error);
        assert!(result.error.as_deref().unwrap().contains("malformed predicate"));
        assert_eq!(report.status, OverallStatus::Fail);
    }

    #[tokio::test]
    async fn test_custom_predicate_error_reason_is_bare() {
        let registry = RuleRegistry::try_from(vec![
            Rule::business_predicate(
                "custom",
                Predicate::custom("always_broken", &["quantity"], |_| Err("boom".to_string())),
            )
            .unwrap(),
        ])
        .unwrap();

        let report = Evaluator::new("supastore_db")
            .run(&registry, &supastore())
            .await
            .unwrap();

        assert_eq!(report.results[0].error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_identical_snapshots_give_identical_reports() {
        let evaluator = Evaluator::new("supastore_db").with_options(EvaluationOptions {
            concurrency: 3,
            ..Default::default()
        });
        let first = evaluator.run(&registry(), &supastore()).await.unwrap();
        let second = evaluator.run(&registry(), &supastore()).await.unwrap();

        assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    }

    // Never yields: stands in for a stuck database scan
    struct StalledSource;

    #[async_trait]
    impl RowSource for StalledSource {
        async fn columns(&self, _dataset: &str) -> Result<Vec<String>, QualisError> {
            Ok(vec!["order_id".into()])
        }

        async fn scan(
            &self,
            _dataset: &str,
            _projection: Option<&[String]>,
        ) -> Result<RecordStream, QualisError> {
            Ok(futures::stream::pending::<Result<Record, QualisError>>().boxed())
        }

        fn engine_name(&self) -> &str {
            "stalled"
        }
    }

    #[tokio::test]
    async fn test_timeout_only_fails_the_rule() {
        let registry = RuleRegistry::try_from(vec![
            Rule::completeness("a", ["order_id"]).unwrap(),
            Rule::duplicate_check("b", ["order_id"]).unwrap(),
        ])
        .unwrap();
        let evaluator = Evaluator::new("orders").with_options(EvaluationOptions {
            timeout: Some(Duration::from_millis(20)),
            ..Default::default()
        });

        let report = evaluator.run(&registry, &StalledSource).await.unwrap();

        assert_eq!(report.results.len(), 2);
        for result in &report.results {
            assert_eq!(result.status, RuleStatus::Error);
            assert!(result.error.as_deref().unwrap().contains("timed out"));
        }
    }

    #[test]
    fn test_options_from_config() {
        let config = EvaluationConfig {
            concurrency: 2,
            timeout_secs: Some(30),
            sample_limit: 10,
        };
        let options = EvaluationOptions::from(&config);
        assert_eq!(options.timeout, Some(Duration::from_secs(30)));
        assert_eq!(options.concurrency, 2);
    }
}
