use crate::domain::model::{Column, OutputRow, RunState};
use crate::utils::error::Result;
use async_trait::async_trait;

/// One page of registry entities plus the link to the next page, if any.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub entities: Vec<serde_json::Value>,
    pub next: Option<String>,
}

/// Paged-fetch capability of the registry API.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, url: &str, params: &[(String, String)]) -> Result<Page>;
}

/// Fetches the raw list of annual statements for one organisation number.
///
/// Implementations return the body as-is; deciding what counts as usable
/// data is the enricher's job.
#[async_trait]
pub trait StatementSource: Send + Sync {
    async fn fetch_statements(&self, org_id: &str) -> Result<serde_json::Value>;
}

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Persists the final rows. Returns a human readable location of the output.
pub trait RowSink: Send + Sync {
    fn write_rows(
        &self,
        columns: &[Column],
        rows: &[OutputRow],
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Output column order. Fixed for the lifetime of the pipeline.
    fn columns(&self) -> &[Column];

    /// Pulls pages and accumulates rows into `state` until the source is
    /// exhausted or the cap is reached. Upstream failures end collection
    /// early; they are recorded in `state`, never returned.
    async fn collect(&mut self, state: &mut RunState);
}
