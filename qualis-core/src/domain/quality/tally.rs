// qualis-core/src/domain/quality/tally.rs

use std::collections::{BTreeMap, HashMap};

use crate::domain::error::DomainError;
use crate::domain::quality::rule::{Check, Rule};
use crate::domain::record::{KeyAtom, Record, Value};
use crate::domain::report::{ColumnCount, RuleResult, Violation};

struct KeyGroup {
    first_row: u64,
    first: Record,
    count: u64,
}

/// Streaming accumulator for one rule over one pass.
///
/// Per-record kinds keep only counters and the first `sample_limit`
/// offenders. `duplicate-check` keeps one entry per distinct key since a key
/// can only be judged once the whole pass has been seen.
pub struct RuleTally<'r> {
    rule: &'r Rule,
    columns: Vec<String>,
    guarded: Vec<String>,
    sample_limit: usize,
    examined: u64,
    violations: u64,
    column_counts: Vec<u64>,
    samples: Vec<Violation>,
    groups: HashMap<Vec<KeyAtom>, KeyGroup>,
    duplicate_samples: BTreeMap<u64, Record>,
}

impl<'r> RuleTally<'r> {
    pub fn new(rule: &'r Rule, sample_limit: usize) -> Self {
        let column_counts = match rule.check() {
            Check::Completeness { columns } => vec![0; columns.len()],
            _ => Vec::new(),
        };
        let guarded = match rule.check() {
            Check::BusinessPredicate { predicate } => predicate.guarded_columns(),
            _ => Vec::new(),
        };

        Self {
            rule,
            columns: rule.columns(),
            guarded,
            sample_limit,
            examined: 0,
            violations: 0,
            column_counts,
            samples: Vec::new(),
            groups: HashMap::new(),
            duplicate_samples: BTreeMap::new(),
        }
    }

    pub fn observe(&mut self, row: u64, record: &Record) -> Result<(), DomainError> {
        let rule: &'r Rule = self.rule;

        match rule.check() {
            Check::Completeness { columns } => {
                self.examined += 1;
                let mut missing = false;
                for (i, column) in columns.iter().enumerate() {
                    if record.value(column).is_null() {
                        self.column_counts[i] += 1;
                        missing = true;
                    }
                }
                if missing {
                    self.flag(row, record);
                }
            }

            Check::NullCheck { columns } => {
                self.examined += 1;
                if columns.iter().any(|c| record.value(c).is_null()) {
                    self.flag(row, record);
                }
            }

            Check::DuplicateCheck { key } => {
                let atoms: Option<Vec<KeyAtom>> =
                    key.iter().map(|c| record.value(c).key_atom()).collect();
                // A null key component cannot be compared: not evaluable
                let Some(atoms) = atoms else {
                    return Ok(());
                };
                self.examined += 1;
                self.observe_key(row, record, atoms);
            }

            Check::WhitespaceCheck { column } => match record.value(column) {
                Value::Null => {}
                Value::Text(text) => {
                    self.examined += 1;
                    if text.trim().len() != text.len() {
                        self.flag(row, record);
                    }
                }
                // Non-text values cannot carry padding
                _ => self.examined += 1,
            },

            Check::CrossField { left, op, right } => {
                let ordering = record
                    .value(left)
                    .compare(record.value(right))
                    .map_err(|e| DomainError::evaluation(rule.name(), e))?;
                if let Some(ordering) = ordering {
                    self.examined += 1;
                    if op.holds(ordering) {
                        self.flag(row, record);
                    }
                }
            }

            Check::BusinessPredicate { predicate } => {
                if self.guarded.iter().any(|c| record.value(c).is_null()) {
                    return Ok(());
                }
                let verdict = predicate
                    .evaluate(record)
                    .map_err(|e| DomainError::evaluation(rule.name(), e))?;
                if let Some(breach) = verdict {
                    self.examined += 1;
                    if breach {
                        self.flag(row, record);
                    }
                }
            }
        }

        Ok(())
    }

    pub fn finish(self) -> RuleResult {
        let column_counts = match self.rule.check() {
            Check::Completeness { columns } => columns
                .iter()
                .zip(self.column_counts)
                .map(|(column, violations)| ColumnCount {
                    column: column.clone(),
                    violations,
                })
                .collect(),
            _ => Vec::new(),
        };

        let mut samples = self.samples;
        let rule_name = self.rule.name();
        samples.extend(
            self.duplicate_samples
                .into_iter()
                .map(|(row, record)| Violation {
                    rule: rule_name.to_string(),
                    row,
                    record,
                }),
        );

        RuleResult::counted(
            self.rule,
            self.examined,
            self.violations,
            column_counts,
            samples,
        )
    }

    fn flag(&mut self, row: u64, record: &Record) {
        self.violations += 1;
        if self.samples.len() < self.sample_limit {
            self.samples.push(Violation {
                rule: self.rule.name().to_string(),
                row,
                record: record.project(&self.columns),
            });
        }
    }

    // Every record of a key group of size > 1 is a violation
    fn observe_key(&mut self, row: u64, record: &Record, atoms: Vec<KeyAtom>) {
        let projected = record.project(&self.columns);
        let group = self.groups.entry(atoms).or_insert_with(|| KeyGroup {
            first_row: row,
            first: projected.clone(),
            count: 0,
        });
        group.count += 1;

        match group.count {
            1 => {}
            2 => {
                self.violations += 2;
                let (first_row, first) = (group.first_row, group.first.clone());
                self.keep_duplicate_sample(first_row, first);
                self.keep_duplicate_sample(row, projected);
            }
            _ => {
                self.violations += 1;
                self.keep_duplicate_sample(row, projected);
            }
        }
    }

    fn keep_duplicate_sample(&mut self, row: u64, record: Record) {
        if self.sample_limit == 0 {
            return;
        }
        self.duplicate_samples.insert(row, record);
        if self.duplicate_samples.len() > self.sample_limit {
            self.duplicate_samples.pop_last();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::quality::{Comparison, Predicate};
    use crate::domain::report::RuleStatus;
    use chrono::NaiveDate;

    fn records(column: &str, values: Vec<Value>) -> Vec<Record> {
        values
            .into_iter()
            .map(|v| Record::from_pairs([(column, v)]))
            .collect()
    }

    fn date(s: &str) -> Value {
        Value::Date(NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap())
    }

    #[test]
    fn test_completeness_counts_null_order_ids() {
        let mut values: Vec<Value> = (1..=8).map(Value::Integer).collect();
        values.insert(3, Value::Null);
        values.push(Value::Null);
        let rule = Rule::completeness("order_id_complete", ["order_id"]).unwrap();

        let result = rule.evaluate(records("order_id", values), 5).unwrap();

        assert_eq!(result.total_examined, 10);
        assert_eq!(result.violation_count, 2);
        assert_eq!(result.status, RuleStatus::Fail);
        assert_eq!(result.column_counts[0].violations, 2);
        assert_eq!(result.samples.len(), 2);
        assert_eq!(result.samples[0].row, 3);
    }

    #[test]
    fn test_completeness_sub_counts_per_column() {
        let rows = vec![
            Record::from_pairs([("a", Value::Null), ("b", Value::Null)]),
            Record::from_pairs([("a", Value::Integer(1)), ("b", Value::Null)]),
            Record::from_pairs([("a", Value::Integer(1)), ("b", Value::Integer(2))]),
        ];
        let rule = Rule::completeness("keys", ["a", "b"]).unwrap();

        let result = rule.evaluate(rows, 5).unwrap();

        // A record counts once even with two missing columns
        assert_eq!(result.violation_count, 2);
        assert_eq!(result.column_counts[0].violations, 1);
        assert_eq!(result.column_counts[1].violations, 2);
    }

    #[test]
    fn test_null_check_counts_record_once() {
        let rows = vec![
            Record::from_pairs([("a", Value::Null), ("b", Value::Null)]),
            Record::from_pairs([("a", Value::Integer(1)), ("b", Value::Integer(1))]),
        ];
        let rule = Rule::null_check("no_nulls", ["a", "b"]).unwrap();
        let result = rule.evaluate(rows, 5).unwrap();
        assert_eq!(result.total_examined, 2);
        assert_eq!(result.violation_count, 1);
    }

    #[test]
    fn test_duplicate_counts_offending_records() {
        let values = vec!["A".into(), "B".into(), "A".into(), "C".into()];
        let rule = Rule::duplicate_check("order_id_unique", ["order_id"]).unwrap();

        let result = rule.evaluate(records("order_id", values), 5).unwrap();

        // violation_count counts offending records, so both A rows: 2
        assert_eq!(result.total_examined, 4);
        assert_eq!(result.violation_count, 2);
        let rows: Vec<u64> = result.samples.iter().map(|s| s.row).collect();
        assert_eq!(rows, vec![0, 2]);
    }

    #[test]
    fn test_duplicate_composite_key_and_null_keys() {
        let rows = vec![
            Record::from_pairs([("id", Value::Integer(1)), ("line", Value::Integer(1))]),
            Record::from_pairs([("id", Value::Integer(1)), ("line", Value::Integer(2))]),
            Record::from_pairs([("id", Value::Integer(1)), ("line", Value::Integer(1))]),
            Record::from_pairs([("id", Value::Integer(1)), ("line", Value::Integer(1))]),
            Record::from_pairs([("id", Value::Null), ("line", Value::Integer(1))]),
        ];
        let rule = Rule::duplicate_check("line_unique", ["id", "line"]).unwrap();

        let result = rule.evaluate(rows, 2).unwrap();

        assert_eq!(result.total_examined, 4);
        assert_eq!(result.violation_count, 3);
        let sampled: Vec<u64> = result.samples.iter().map(|s| s.row).collect();
        assert_eq!(sampled, vec![0, 2]);
    }

    #[test]
    fn test_whitespace_skips_nulls() {
        let values = vec!["abc".into(), " abc".into(), "abc ".into(), Value::Null];
        let rule = Rule::whitespace_check("name_trimmed", "customer_name").unwrap();

        let result = rule.evaluate(records("customer_name", values), 5).unwrap();

        assert_eq!(result.total_examined, 3);
        assert_eq!(result.violation_count, 2);
        let rows: Vec<u64> = result.samples.iter().map(|s| s.row).collect();
        assert_eq!(rows, vec![1, 2]);
    }

    #[test]
    fn test_cross_field_excludes_nulls() {
        let rows = vec![
            Record::from_pairs([
                ("order_date", date("2024-01-05")),
                ("ship_date", date("2024-01-01")),
            ]),
            Record::from_pairs([("order_date", date("2024-01-05")), ("ship_date", Value::Null)]),
            Record::from_pairs([
                ("order_date", date("2024-01-05")),
                ("ship_date", date("2024-01-06")),
            ]),
        ];
        let rule =
            Rule::cross_field("ship_after_order", "ship_date", Comparison::Lt, "order_date")
                .unwrap();

        let result = rule.evaluate(rows, 5).unwrap();

        assert_eq!(result.total_examined, 2);
        assert_eq!(result.violation_count, 1);
        assert_eq!(result.samples[0].row, 0);
    }

    #[test]
    fn test_cross_field_type_mismatch_is_an_error() {
        let rows = vec![Record::from_pairs([
            ("a", Value::Integer(1)),
            ("b", Value::Text("x".into())),
        ])];
        let rule = Rule::cross_field("bad", "a", Comparison::Lt, "b").unwrap();
        let err = rule.evaluate(rows, 5).unwrap_err();
        assert!(matches!(err, DomainError::RuleEvaluation { .. }));
    }

    #[test]
    fn test_business_predicate_quantity() {
        let values = vec![5.into(), 0.into(), (-1).into(), 1.into()];
        let predicate = Predicate::compare("quantity", Comparison::Lt, 1);
        let rule = Rule::business_predicate("positive_quantity", predicate).unwrap();

        let result = rule.evaluate(records("quantity", values), 5).unwrap();

        assert_eq!(result.total_examined, 4);
        assert_eq!(result.violation_count, 2);
    }

    #[test]
    fn test_business_predicate_null_is_excluded() {
        let rows = vec![
            Record::from_pairs([("quantity", Value::Null), ("price", Value::Integer(3))]),
            Record::from_pairs([("quantity", Value::Integer(2)), ("price", Value::Null)]),
        ];
        // Any referenced null excludes the record, even when AND could decide
        let predicate = Predicate::compare("quantity", Comparison::Lt, 1)
            .and(Predicate::compare("price", Comparison::Gt, 0));
        let rule = Rule::business_predicate("p", predicate).unwrap();

        let result = rule.evaluate(rows, 5).unwrap();

        assert_eq!(result.total_examined, 0);
        assert_eq!(result.violation_count, 0);
        assert_eq!(result.status, RuleStatus::Pass);
    }

    #[test]
    fn test_custom_predicate_error_names_the_rule_once() {
        let predicate = Predicate::custom("always_broken", &["quantity"], |_| {
            Err("boom".to_string())
        });
        let rule = Rule::business_predicate("custom_rule", predicate).unwrap();
        let rows = vec![Record::from_pairs([("quantity", Value::Integer(1))])];

        let err = rule.evaluate(rows, 5).unwrap_err();

        assert_eq!(err.to_string(), "Rule 'custom_rule' failed to evaluate: boom");
    }

    #[test]
    fn test_sample_limit_is_respected() {
        let values = vec![Value::Null; 20];
        let rule = Rule::completeness("c", ["x"]).unwrap();
        let result = rule.evaluate(records("x", values), 3).unwrap();
        assert_eq!(result.violation_count, 20);
        assert_eq!(result.samples.len(), 3);
    }

    #[test]
    fn test_samples_are_projected_to_rule_columns() {
        let rows = vec![Record::from_pairs([
            ("order_id", Value::Null),
            ("notes", Value::Text("long".into())),
        ])];
        let rule = Rule::completeness("c", ["order_id"]).unwrap();
        let result = rule.evaluate(rows, 1).unwrap();
        assert_eq!(result.samples[0].record.columns(), ["order_id".to_string()]);
    }
}
