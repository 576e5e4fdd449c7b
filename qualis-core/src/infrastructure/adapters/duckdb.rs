// qualis-core/src/infrastructure/adapters/duckdb.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use duckdb::types::{TimeUnit, ValueRef};
use duckdb::{Config, Connection};
use futures::StreamExt;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, instrument};

use crate::domain::record::{Record, Value};
use crate::error::QualisError;
use crate::infrastructure::error::{DatabaseError, InfrastructureError};
use crate::ports::row_source::{RecordStream, RowSource};

// Rows buffered between the blocking reader and the async consumer
const SCAN_BUFFER: usize = 1024;

// Day number of 1970-01-01 counted from 0001-01-01
const UNIX_EPOCH_CE_DAYS: i32 = 719_163;

/// Row source backed by a DuckDB database (file or in-memory).
///
/// Each scan runs on its own cloned connection inside `spawn_blocking`, so
/// concurrent rules read in parallel and the mutex is only held while cloning.
pub struct DuckDbSource {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbSource {
    pub fn new(db_path: &str) -> Result<Self, InfrastructureError> {
        let config = Config::default();

        let conn = if db_path == ":memory:" {
            Connection::open_in_memory_with_flags(config)?
        } else {
            Connection::open_with_flags(db_path, config)?
        };

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self, InfrastructureError> {
        Self::new(":memory:")
    }

    /// Runs one or more statements (fixtures, setup scripts).
    pub fn execute(&self, sql: &str) -> Result<(), InfrastructureError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::Poisoned)?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    /// Exposes a CSV file as a view named `name`.
    #[instrument(skip(self))]
    pub fn register_csv(&self, name: &str, path: &Path) -> Result<(), InfrastructureError> {
        let query = format!(
            "CREATE OR REPLACE VIEW {} AS SELECT * FROM read_csv_auto({})",
            quote_ident(name),
            quote_literal(&path.to_string_lossy())
        );
        debug!(%query, "registering csv source");
        self.execute(&query)
    }

    fn connection(&self) -> Result<Connection, InfrastructureError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::Poisoned)?;
        Ok(conn.try_clone()?)
    }
}

#[async_trait]
impl RowSource for DuckDbSource {
    async fn columns(&self, dataset: &str) -> Result<Vec<String>, QualisError> {
        let conn = self
            .connection()
            .map_err(|e| QualisError::source_unavailable(dataset, e))?;
        let table = dataset.to_string();

        let columns = tokio::task::spawn_blocking(move || table_columns(&conn, &table))
            .await
            .map_err(|e| InfrastructureError::from(DatabaseError::Task(e.to_string())))?
            .map_err(|e| QualisError::source_unavailable(dataset, e))?;

        if columns.is_empty() {
            return Err(QualisError::source_unavailable(dataset, "no columns"));
        }
        Ok(columns)
    }

    async fn scan(
        &self,
        dataset: &str,
        projection: Option<&[String]>,
    ) -> Result<RecordStream, QualisError> {
        let columns = match projection {
            Some(cols) if !cols.is_empty() => cols.to_vec(),
            _ => self.columns(dataset).await?,
        };
        let conn = self
            .connection()
            .map_err(|e| QualisError::source_unavailable(dataset, e))?;

        let select_list: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
        let sql = format!(
            "SELECT {} FROM {}",
            select_list.join(", "),
            quote_ident(dataset)
        );
        debug!(%sql, "starting scan");

        let header: Arc<[String]> = columns.into();
        let (tx, rx) = mpsc::channel::<Result<Record, QualisError>>(SCAN_BUFFER);

        tokio::task::spawn_blocking(move || {
            if let Err(e) = stream_rows(&conn, &sql, header, &tx) {
                // Receiver may already be gone (rule timed out)
                let _ = tx.blocking_send(Err(e));
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        Ok(stream.boxed())
    }

    fn engine_name(&self) -> &str {
        "duckdb"
    }
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>, duckdb::Error> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_literal(table)))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>("name"))?;
    rows.collect()
}

fn stream_rows(
    conn: &Connection,
    sql: &str,
    header: Arc<[String]>,
    tx: &mpsc::Sender<Result<Record, QualisError>>,
) -> Result<(), QualisError> {
    let mut stmt = conn.prepare(sql).map_err(InfrastructureError::from)?;
    let mut rows = stmt.query([]).map_err(InfrastructureError::from)?;

    while let Some(row) = rows.next().map_err(InfrastructureError::from)? {
        let values = (0..header.len())
            .map(|i| row.get_ref(i).map(value_from_ref))
            .collect::<Result<Vec<_>, _>>()
            .map_err(InfrastructureError::from)?;
        let record = Record::new(header.clone(), values)?;

        if tx.blocking_send(Ok(record)).is_err() {
            break;
        }
    }
    Ok(())
}

fn value_from_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => Value::Boolean(b),
        ValueRef::TinyInt(i) => Value::Integer(i64::from(i)),
        ValueRef::SmallInt(i) => Value::Integer(i64::from(i)),
        ValueRef::Int(i) => Value::Integer(i64::from(i)),
        ValueRef::BigInt(i) => Value::Integer(i),
        ValueRef::HugeInt(i) => i64::try_from(i)
            .map(Value::Integer)
            .unwrap_or(Value::Float(i as f64)),
        ValueRef::UTinyInt(i) => Value::Integer(i64::from(i)),
        ValueRef::USmallInt(i) => Value::Integer(i64::from(i)),
        ValueRef::UInt(i) => Value::Integer(i64::from(i)),
        ValueRef::UBigInt(i) => i64::try_from(i)
            .map(Value::Integer)
            .unwrap_or(Value::Float(i as f64)),
        ValueRef::Float(f) => Value::Float(f64::from(f)),
        ValueRef::Double(f) => Value::Float(f),
        ValueRef::Decimal(d) => {
            let text = d.to_string();
            text.parse::<f64>()
                .map(Value::Float)
                .unwrap_or(Value::Text(text))
        }
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Date32(days) => days
            .checked_add(UNIX_EPOCH_CE_DAYS)
            .and_then(NaiveDate::from_num_days_from_ce_opt)
            .map(Value::Date)
            .unwrap_or(Value::Null),
        ValueRef::Timestamp(unit, raw) => {
            let micros = match unit {
                TimeUnit::Second => raw.checked_mul(1_000_000),
                TimeUnit::Millisecond => raw.checked_mul(1_000),
                TimeUnit::Microsecond => Some(raw),
                TimeUnit::Nanosecond => Some(raw / 1_000),
            };
            micros
                .and_then(DateTime::from_timestamp_micros)
                .map(|dt| Value::Timestamp(dt.naive_utc()))
                .unwrap_or(Value::Null)
        }
        other => Value::Text(format!("{:?}", other)),
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}
