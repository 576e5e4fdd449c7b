// qualis-core/src/application/profile.rs

use futures::StreamExt;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, instrument};

use crate::domain::record::KeyAtom;
use crate::error::QualisError;
use crate::ports::row_source::RowSource;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnProfile {
    pub column: String,
    pub rows: u64,
    pub nulls: u64,
    pub distinct: u64,
}

impl ColumnProfile {
    /// Share of non-null values, between 0 and 1. An empty column is complete.
    pub fn completeness(&self) -> f64 {
        if self.rows == 0 {
            return 1.0;
        }
        (self.rows - self.nulls) as f64 / self.rows as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetProfile {
    pub dataset: String,
    pub rows: u64,
    pub columns: Vec<ColumnProfile>,
}

/// Single pass over the dataset counting rows, nulls and distinct non-null
/// values per column, in source column order.
#[instrument(skip(source), fields(engine = source.engine_name()))]
pub async fn profile_dataset(
    source: &dyn RowSource,
    dataset: &str,
) -> Result<DatasetProfile, QualisError> {
    let columns = source.columns(dataset).await?;
    let mut nulls = vec![0u64; columns.len()];
    let mut distinct: Vec<HashSet<KeyAtom>> = vec![HashSet::new(); columns.len()];
    let mut rows = 0u64;

    let mut records = source.scan(dataset, Some(&columns)).await?;
    while let Some(record) = records.next().await {
        let record = record?;
        rows += 1;
        for (i, value) in record.values().iter().enumerate() {
            match value.key_atom() {
                Some(atom) => {
                    distinct[i].insert(atom);
                }
                None => nulls[i] += 1,
            }
        }
    }

    info!(rows, columns = columns.len(), "dataset profiled");

    let columns = columns
        .into_iter()
        .zip(nulls.into_iter().zip(distinct))
        .map(|(column, (nulls, seen))| ColumnProfile {
            column,
            rows,
            nulls,
            distinct: seen.len() as u64,
        })
        .collect();

    Ok(DatasetProfile {
        dataset: dataset.to_string(),
        rows,
        columns,
    })
}
