// qualis-core/src/ports/row_source.rs

// What the engine needs from storage, without knowing how it is done.
// DuckDB and the in-memory adapter plug in here.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::domain::record::Record;
use crate::error::QualisError;

/// A lazy pass over one dataset.
pub type RecordStream = BoxStream<'static, Result<Record, QualisError>>;

#[async_trait]
pub trait RowSource: Send + Sync {
    /// Field set of `dataset`. Fails with `SourceUnavailable` if it cannot be opened.
    async fn columns(&self, dataset: &str) -> Result<Vec<String>, QualisError>;

    /// Starts a fresh pass over the same snapshot. Every record of one pass
    /// carries the same field set: `projection` (in order) when given, all
    /// columns otherwise.
    async fn scan(
        &self,
        dataset: &str,
        projection: Option<&[String]>,
    ) -> Result<RecordStream, QualisError>;

    fn engine_name(&self) -> &str;
}
