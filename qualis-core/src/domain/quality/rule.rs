// qualis-core/src/domain/quality/rule.rs

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::domain::error::DomainError;
use crate::domain::quality::predicate::Predicate;
use crate::domain::quality::tally::RuleTally;
use crate::domain::record::Record;
use crate::domain::report::RuleResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    Completeness,
    NullCheck,
    DuplicateCheck,
    WhitespaceCheck,
    CrossField,
    BusinessPredicate,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Completeness => "completeness",
            RuleKind::NullCheck => "null-check",
            RuleKind::DuplicateCheck => "duplicate-check",
            RuleKind::WhitespaceCheck => "whitespace-check",
            RuleKind::CrossField => "cross-field",
            RuleKind::BusinessPredicate => "business-predicate",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison operator. In a cross-field rule it describes the *invalid*
/// state: `ship_date < order_date` flags records shipped before ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = "<", alias = "lt")]
    Lt,
    #[serde(rename = "<=", alias = "lte")]
    LtEq,
    #[serde(rename = ">", alias = "gt")]
    Gt,
    #[serde(rename = ">=", alias = "gte")]
    GtEq,
    #[serde(rename = "=", alias = "eq", alias = "==")]
    Eq,
    #[serde(rename = "!=", alias = "ne", alias = "<>")]
    NotEq,
}

impl Comparison {
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            Comparison::Lt => ordering == Ordering::Less,
            Comparison::LtEq => ordering != Ordering::Greater,
            Comparison::Gt => ordering == Ordering::Greater,
            Comparison::GtEq => ordering != Ordering::Less,
            Comparison::Eq => ordering == Ordering::Equal,
            Comparison::NotEq => ordering != Ordering::Equal,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Lt => "<",
            Comparison::LtEq => "<=",
            Comparison::Gt => ">",
            Comparison::GtEq => ">=",
            Comparison::Eq => "=",
            Comparison::NotEq => "!=",
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// What a rule inspects, one variant per [`RuleKind`].
#[derive(Debug, Clone)]
pub enum Check {
    /// Null or missing value in any required column, with per-column sub-counts.
    Completeness { columns: Vec<String> },
    /// Any column of the set is null. Counted once per record.
    NullCheck { columns: Vec<String> },
    /// Key (single or composite) seen more than once in the pass.
    DuplicateCheck { key: Vec<String> },
    /// Leading or trailing whitespace in a text column. Nulls are exempt.
    WhitespaceCheck { column: String },
    /// `left op right` holds. Records with a null on either side are skipped.
    CrossField {
        left: String,
        op: Comparison,
        right: String,
    },
    /// Boolean expression over one record; `true` means a breach.
    BusinessPredicate { predicate: Predicate },
}

impl Check {
    pub fn kind(&self) -> RuleKind {
        match self {
            Check::Completeness { .. } => RuleKind::Completeness,
            Check::NullCheck { .. } => RuleKind::NullCheck,
            Check::DuplicateCheck { .. } => RuleKind::DuplicateCheck,
            Check::WhitespaceCheck { .. } => RuleKind::WhitespaceCheck,
            Check::CrossField { .. } => RuleKind::CrossField,
            Check::BusinessPredicate { .. } => RuleKind::BusinessPredicate,
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::Completeness { columns } => write!(f, "not null: {}", columns.join(", ")),
            Check::NullCheck { columns } => write!(f, "no null in: {}", columns.join(", ")),
            Check::DuplicateCheck { key } => write!(f, "unique key: ({})", key.join(", ")),
            Check::WhitespaceCheck { column } => write!(f, "trimmed: {}", column),
            Check::CrossField { left, op, right } => write!(f, "{} {} {}", left, op, right),
            Check::BusinessPredicate { predicate } => write!(f, "{}", predicate),
        }
    }
}

/// A named data-quality check.
#[derive(Debug, Clone)]
pub struct Rule {
    name: String,
    description: Option<String>,
    check: Check,
}

impl Rule {
    pub fn new(name: impl Into<String>, check: Check) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::invalid(&name, "rule name cannot be empty"));
        }

        let empty_set = match &check {
            Check::Completeness { columns } | Check::NullCheck { columns } => columns.is_empty(),
            Check::DuplicateCheck { key } => key.is_empty(),
            Check::WhitespaceCheck { column } => column.is_empty(),
            Check::CrossField { left, right, .. } => left.is_empty() || right.is_empty(),
            Check::BusinessPredicate { .. } => false,
        };
        if empty_set {
            return Err(DomainError::invalid(
                &name,
                format!("a {} rule needs at least one column", check.kind()),
            ));
        }

        Ok(Self {
            name,
            description: None,
            check,
        })
    }

    pub fn completeness<S: Into<String>>(
        name: &str,
        columns: impl IntoIterator<Item = S>,
    ) -> Result<Self, DomainError> {
        Self::new(
            name,
            Check::Completeness {
                columns: columns.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn null_check<S: Into<String>>(
        name: &str,
        columns: impl IntoIterator<Item = S>,
    ) -> Result<Self, DomainError> {
        Self::new(
            name,
            Check::NullCheck {
                columns: columns.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn duplicate_check<S: Into<String>>(
        name: &str,
        key: impl IntoIterator<Item = S>,
    ) -> Result<Self, DomainError> {
        Self::new(
            name,
            Check::DuplicateCheck {
                key: key.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn whitespace_check(name: &str, column: &str) -> Result<Self, DomainError> {
        Self::new(
            name,
            Check::WhitespaceCheck {
                column: column.to_string(),
            },
        )
    }

    pub fn cross_field(
        name: &str,
        left: &str,
        op: Comparison,
        right: &str,
    ) -> Result<Self, DomainError> {
        Self::new(
            name,
            Check::CrossField {
                left: left.to_string(),
                op,
                right: right.to_string(),
            },
        )
    }

    pub fn business_predicate(name: &str, predicate: Predicate) -> Result<Self, DomainError> {
        Self::new(name, Check::BusinessPredicate { predicate })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn kind(&self) -> RuleKind {
        self.check.kind()
    }

    pub fn check(&self) -> &Check {
        &self.check
    }

    /// Columns the rule reads, in declaration order, without duplicates.
    pub fn columns(&self) -> Vec<String> {
        let raw: Vec<String> = match &self.check {
            Check::Completeness { columns } | Check::NullCheck { columns } => columns.clone(),
            Check::DuplicateCheck { key } => key.clone(),
            Check::WhitespaceCheck { column } => vec![column.clone()],
            Check::CrossField { left, right, .. } => vec![left.clone(), right.clone()],
            Check::BusinessPredicate { predicate } => predicate.columns(),
        };

        let mut seen: Vec<String> = Vec::with_capacity(raw.len());
        for column in raw {
            if !seen.iter().any(|c| c.eq_ignore_ascii_case(&column)) {
                seen.push(column);
            }
        }
        seen
    }

    pub fn tally(&self, sample_limit: usize) -> RuleTally<'_> {
        RuleTally::new(self, sample_limit)
    }

    /// Evaluates the rule over one full pass of records.
    pub fn evaluate<I>(&self, records: I, sample_limit: usize) -> Result<RuleResult, DomainError>
    where
        I: IntoIterator<Item = Record>,
    {
        let mut tally = self.tally(sample_limit);
        for (row, record) in records.into_iter().enumerate() {
            tally.observe(row as u64, &record)?;
        }
        Ok(tally.finish())
    }
}
