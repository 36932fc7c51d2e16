use crate::domain::model::{RunState, RunSummary};
use crate::domain::ports::{Pipeline, RowSink};
use crate::utils::error::Result;
use chrono::Utc;
use std::future::Future;

pub struct EtlEngine<P: Pipeline, K: RowSink> {
    pipeline: P,
    sink: K,
}

impl<P: Pipeline, K: RowSink> EtlEngine<P, K> {
    pub fn new(pipeline: P, sink: K) -> Self {
        Self { pipeline, sink }
    }

    /// Runs until the source is exhausted or Ctrl-C is pressed.
    pub async fn run(&mut self) -> Result<RunSummary> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Could not listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Collects rows until done or until `interrupt` resolves, then hands
    /// whatever was collected to the sink. The sink is called even when no
    /// row was retained.
    pub async fn run_until<F>(&mut self, interrupt: F) -> Result<RunSummary>
    where
        F: Future<Output = ()> + Send,
    {
        let started_at = Utc::now();
        let mut state = RunState::default();

        tracing::info!("Starting ETL process...");

        let interrupted = tokio::select! {
            _ = self.pipeline.collect(&mut state) => false,
            _ = interrupt => true,
        };

        if interrupted {
            tracing::warn!(
                "⏹️ Interrupted, saving {} rows collected so far",
                state.retained()
            );
        }

        if state.rows.is_empty() {
            tracing::warn!("⚠️ No rows matched; writing header only");
        }

        let output = self
            .sink
            .write_rows(self.pipeline.columns(), &state.rows)
            .await?;

        let summary = RunSummary {
            total_seen: state.total_seen,
            retained: state.retained(),
            pages_fetched: state.pages_fetched,
            enrichment_calls: state.enrichment_calls,
            enrichment_avoided: state.enrichment_avoided,
            partial: state.partial,
            interrupted,
            output,
            started_at,
            finished_at: Utc::now(),
        };

        tracing::info!(
            "📊 {} seen, {} retained, {} pages, {} accounts lookups ({} avoided) in {}ms",
            summary.total_seen,
            summary.retained,
            summary.pages_fetched,
            summary.enrichment_calls,
            summary.enrichment_avoided,
            summary.elapsed().num_milliseconds()
        );
        tracing::info!("📁 Output saved to: {}", summary.output);

        Ok(summary)
    }
}
