// qualis-core/src/domain/quality/predicate.rs

use regex::Regex;
use std::fmt;
use std::sync::Arc;

use crate::domain::error::DomainError;
use crate::domain::quality::rule::Comparison;
use crate::domain::record::{Record, Value};

/// Closure-backed predicate for rules built in code.
#[derive(Clone)]
pub struct RecordPredicate(Arc<dyn Fn(&Record) -> Result<bool, String> + Send + Sync>);

impl RecordPredicate {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Record) -> Result<bool, String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }
}

impl fmt::Debug for RecordPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RecordPredicate(<fn>)")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Column(String),
    Literal(Value),
}

impl Operand {
    fn resolve<'a>(&'a self, record: &'a Record) -> &'a Value {
        match self {
            Operand::Column(c) => record.value(c),
            Operand::Literal(v) => v,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Column(c) => f.write_str(c),
            Operand::Literal(v) => write!(f, "{}", v),
        }
    }
}

/// Boolean expression over a single record. Evaluates to `Some(true)` when the
/// record breaches the rule, `Some(false)` when it complies, and `None` when
/// the answer is unknown because of nulls (SQL three-valued logic).
#[derive(Debug, Clone)]
pub enum Predicate {
    Compare {
        left: Operand,
        op: Comparison,
        right: Operand,
    },
    IsNull {
        column: String,
        negated: bool,
    },
    Like {
        column: String,
        pattern: String,
        regex: Regex,
        negated: bool,
    },
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
    Custom {
        label: String,
        columns: Vec<String>,
        test: RecordPredicate,
    },
    /// An expression that failed to compile. Kept so the failure surfaces as
    /// an errored rule result instead of aborting the whole run.
    Malformed { expression: String, reason: String },
}

impl Predicate {
    pub fn compare(column: &str, op: Comparison, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            left: Operand::Column(column.to_string()),
            op,
            right: Operand::Literal(value.into()),
        }
    }

    pub fn is_null(column: &str, negated: bool) -> Self {
        Predicate::IsNull {
            column: column.to_string(),
            negated,
        }
    }

    /// SQL `LIKE`: `%` matches any run of characters, `_` exactly one.
    pub fn like(column: &str, pattern: &str, negated: bool) -> Result<Self, DomainError> {
        let mut re = String::from("(?s)^");
        for ch in pattern.chars() {
            match ch {
                '%' => re.push_str(".*"),
                '_' => re.push('.'),
                other => re.push_str(&regex::escape(&other.to_string())),
            }
        }
        re.push('$');

        let regex = Regex::new(&re)
            .map_err(|e| DomainError::invalid(column, format!("bad LIKE pattern: {}", e)))?;

        Ok(Predicate::Like {
            column: column.to_string(),
            pattern: pattern.to_string(),
            regex,
            negated,
        })
    }

    pub fn custom<F>(label: &str, columns: &[&str], test: F) -> Self
    where
        F: Fn(&Record) -> Result<bool, String> + Send + Sync + 'static,
    {
        Predicate::Custom {
            label: label.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            test: RecordPredicate::new(test),
        }
    }

    pub fn and(self, other: Predicate) -> Self {
        Predicate::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Predicate) -> Self {
        Predicate::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// Every column the expression reads.
    pub fn columns(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_columns(&mut out, true);
        out
    }

    /// Columns whose null value makes the record "not evaluable". Columns
    /// only tested by `IS [NOT] NULL` are excluded: nulls are the point there.
    pub fn guarded_columns(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_columns(&mut out, false);
        out
    }

    fn collect_columns(&self, out: &mut Vec<String>, include_null_tests: bool) {
        match self {
            Predicate::Compare { left, right, .. } => {
                for operand in [left, right] {
                    if let Operand::Column(c) = operand {
                        out.push(c.clone());
                    }
                }
            }
            Predicate::IsNull { column, .. } => {
                if include_null_tests {
                    out.push(column.clone());
                }
            }
            Predicate::Like { column, .. } => out.push(column.clone()),
            Predicate::And(a, b) | Predicate::Or(a, b) => {
                a.collect_columns(out, include_null_tests);
                b.collect_columns(out, include_null_tests);
            }
            Predicate::Not(p) => p.collect_columns(out, include_null_tests),
            Predicate::Custom { columns, .. } => out.extend(columns.iter().cloned()),
            Predicate::Malformed { .. } => {}
        }
    }

    /// First sub-expression that failed to compile, if any.
    pub fn malformed(&self) -> Option<DomainError> {
        match self {
            Predicate::Malformed { expression, reason } => Some(malformed_error(expression, reason)),
            Predicate::And(a, b) | Predicate::Or(a, b) => a.malformed().or_else(|| b.malformed()),
            Predicate::Not(p) => p.malformed(),
            _ => None,
        }
    }

    pub fn evaluate(&self, record: &Record) -> Result<Option<bool>, DomainError> {
        match self {
            Predicate::Compare { left, op, right } => {
                let ordering = left.resolve(record).compare(right.resolve(record))?;
                Ok(ordering.map(|o| op.holds(o)))
            }
            Predicate::IsNull { column, negated } => {
                Ok(Some(record.value(column).is_null() != *negated))
            }
            Predicate::Like {
                column,
                regex,
                negated,
                ..
            } => match record.value(column) {
                Value::Null => Ok(None),
                Value::Text(s) => Ok(Some(regex.is_match(s) != *negated)),
                other => Err(DomainError::TypeMismatch {
                    left: format!("{} ({})", other, other.type_name()),
                    right: "LIKE pattern (text)".to_string(),
                }),
            },
            Predicate::And(a, b) => {
                let (a, b) = (a.evaluate(record)?, b.evaluate(record)?);
                Ok(match (a, b) {
                    (Some(false), _) | (_, Some(false)) => Some(false),
                    (Some(true), Some(true)) => Some(true),
                    _ => None,
                })
            }
            Predicate::Or(a, b) => {
                let (a, b) = (a.evaluate(record)?, b.evaluate(record)?);
                Ok(match (a, b) {
                    (Some(true), _) | (_, Some(true)) => Some(true),
                    (Some(false), Some(false)) => Some(false),
                    _ => None,
                })
            }
            Predicate::Not(p) => Ok(p.evaluate(record)?.map(|b| !b)),
            Predicate::Custom { test, .. } => (test.0)(record)
                .map(Some)
                .map_err(DomainError::Predicate),
            Predicate::Malformed { expression, reason } => Err(malformed_error(expression, reason)),
        }
    }
}

fn malformed_error(expression: &str, reason: &str) -> DomainError {
    DomainError::invalid(expression, format!("malformed predicate: {}", reason))
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Compare { left, op, right } => write!(f, "{} {} {}", left, op, right),
            Predicate::IsNull { column, negated } => {
                let not = if *negated { " NOT" } else { "" };
                write!(f, "{} IS{} NULL", column, not)
            }
            Predicate::Like {
                column,
                pattern,
                negated,
                ..
            } => {
                let not = if *negated { " NOT" } else { "" };
                write!(f, "{}{} LIKE '{}'", column, not, pattern)
            }
            Predicate::And(a, b) => write!(f, "({} AND {})", a, b),
            Predicate::Or(a, b) => write!(f, "({} OR {})", a, b),
            Predicate::Not(p) => write!(f, "NOT ({})", p),
            Predicate::Custom { label, .. } => f.write_str(label),
            Predicate::Malformed { expression, .. } => write!(f, "{} (malformed)", expression),
        }
    }
}
