// qualis-core/src/infrastructure/adapters/memory.rs

use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::record::{Record, Value};
use crate::error::QualisError;
use crate::ports::row_source::{RecordStream, RowSource};

#[derive(Debug, Clone)]
struct Dataset {
    columns: Arc<[String]>,
    rows: Arc<Vec<Vec<Value>>>,
}

/// Row source over datasets held in memory. Used by tests and embedders.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    datasets: HashMap<String, Dataset>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a dataset. Rows shorter or longer than `columns` are rejected.
    pub fn with_dataset<S: Into<String>>(
        mut self,
        name: &str,
        columns: impl IntoIterator<Item = S>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self, QualisError> {
        let columns: Arc<[String]> = columns.into_iter().map(Into::into).collect();
        for row in &rows {
            // Validates the shape once so scans never fail on it
            Record::new(columns.clone(), row.clone())?;
        }
        self.datasets.insert(
            name.to_string(),
            Dataset {
                columns,
                rows: Arc::new(rows),
            },
        );
        Ok(self)
    }

    fn dataset(&self, name: &str) -> Result<&Dataset, QualisError> {
        self.datasets
            .get(name)
            .ok_or_else(|| QualisError::source_unavailable(name, "unknown dataset"))
    }
}

#[async_trait]
impl RowSource for InMemorySource {
    async fn columns(&self, dataset: &str) -> Result<Vec<String>, QualisError> {
        Ok(self.dataset(dataset)?.columns.to_vec())
    }

    async fn scan(
        &self,
        dataset: &str,
        projection: Option<&[String]>,
    ) -> Result<RecordStream, QualisError> {
        let data = self.dataset(dataset)?;
        let full = data.columns.clone();
        let rows = data.rows.clone();

        let (header, indices): (Arc<[String]>, Vec<usize>) = match projection {
            Some(cols) => {
                let mut indices = Vec::with_capacity(cols.len());
                for col in cols {
                    let idx = full
                        .iter()
                        .position(|c| c.eq_ignore_ascii_case(col))
                        .ok_or_else(|| {
                            QualisError::InternalError(format!(
                                "column '{}' not found in dataset '{}'",
                                col, dataset
                            ))
                        })?;
                    indices.push(idx);
                }
                (cols.to_vec().into(), indices)
            }
            None => (full.clone(), (0..full.len()).collect()),
        };

        let records = (0..rows.len()).map(move |i| {
            let values = indices.iter().map(|&j| rows[i][j].clone()).collect();
            Record::new(header.clone(), values).map_err(QualisError::from)
        });
        Ok(futures::stream::iter(records).boxed())
    }

    fn engine_name(&self) -> &str {
        "memory"
    }
}
