// qualis-core/src/domain/record.rs

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::domain::error::DomainError;

static NULL: Value = Value::Null;

/// A scalar cell value as read from a row source.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

/// Hashable projection of a non-null value, used for grouping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum KeyAtom {
    Boolean(bool),
    Integer(i64),
    Float(u64),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Date(_) => "date",
            Value::Timestamp(_) => "timestamp",
        }
    }

    pub(crate) fn key_atom(&self) -> Option<KeyAtom> {
        match self {
            Value::Null => None,
            Value::Boolean(b) => Some(KeyAtom::Boolean(*b)),
            Value::Integer(i) => Some(KeyAtom::Integer(*i)),
            Value::Float(f) => Some(KeyAtom::Float(f.to_bits())),
            Value::Text(s) => Some(KeyAtom::Text(s.clone())),
            Value::Date(d) => Some(KeyAtom::Date(*d)),
            Value::Timestamp(t) => Some(KeyAtom::Timestamp(*t)),
        }
    }

    /// Compares two values with SQL-like coercions.
    ///
    /// Returns `Ok(None)` when either side is null (the comparison is not
    /// evaluable). Integers and floats compare numerically, dates compare with
    /// timestamps at midnight, and ISO-8601 texts are coerced when the other
    /// side is temporal. Any other pairing is a [`DomainError::TypeMismatch`].
    pub fn compare(&self, other: &Value) -> Result<Option<Ordering>, DomainError> {
        use Value::*;

        let ordering = match (self, other) {
            (Null, _) | (_, Null) => return Ok(None),
            (Boolean(a), Boolean(b)) => Some(a.cmp(b)),
            (Integer(a), Integer(b)) => Some(a.cmp(b)),
            (Integer(a), Float(b)) => (*a as f64).partial_cmp(b),
            (Float(a), Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Float(a), Float(b)) => a.partial_cmp(b),
            (Text(a), Text(b)) => Some(a.cmp(b)),
            (Date(a), Date(b)) => Some(a.cmp(b)),
            (Timestamp(a), Timestamp(b)) => Some(a.cmp(b)),
            (Date(a), Timestamp(b)) => Some(a.and_time(NaiveTime::MIN).cmp(b)),
            (Timestamp(a), Date(b)) => Some(a.cmp(&b.and_time(NaiveTime::MIN))),
            (Date(_) | Timestamp(_), Text(t)) => {
                let coerced = parse_temporal(t).ok_or_else(|| self.mismatch(other))?;
                return self.compare(&coerced);
            }
            (Text(t), Date(_) | Timestamp(_)) => {
                let coerced = parse_temporal(t).ok_or_else(|| self.mismatch(other))?;
                return coerced.compare(other);
            }
            _ => return Err(self.mismatch(other)),
        };

        // NaN is the only way to get here without an ordering
        ordering.map(Some).ok_or_else(|| self.mismatch(other))
    }

    fn mismatch(&self, other: &Value) -> DomainError {
        DomainError::TypeMismatch {
            left: format!("{} ({})", self, self.type_name()),
            right: format!("{} ({})", other, other.type_name()),
        }
    }
}

fn parse_temporal(text: &str) -> Option<Value> {
    let text = text.trim();
    if let Ok(d) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(Value::Date(d));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(Value::Timestamp)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "'{}'", s),
            Value::Date(d) => write!(f, "{}", d),
            Value::Timestamp(t) => write!(f, "{}", t),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// One row: an ordered mapping from column name to value.
///
/// Column names are shared across every record of a pass, which keeps the
/// field set stable and cheap to clone.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Record {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Result<Self, DomainError> {
        if columns.len() != values.len() {
            return Err(DomainError::RecordShape {
                columns: columns.len(),
                values: values.len(),
            });
        }
        Ok(Self { columns, values })
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let (columns, values): (Vec<String>, Vec<Value>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self {
            columns: columns.into(),
            values,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Looks a column up (case-insensitive). `None` means the column is absent.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.position(column).map(|i| &self.values[i])
    }

    /// Like [`Record::get`], but a missing column reads as null.
    pub fn value(&self, column: &str) -> &Value {
        self.get(column).unwrap_or(&NULL)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Keeps only `columns`, in the given order. Missing columns become null.
    pub fn project(&self, columns: &[String]) -> Record {
        let values = columns.iter().map(|c| self.value(c).clone()).collect();
        Record {
            columns: columns.to_vec().into(),
            values,
        }
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}
