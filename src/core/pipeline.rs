//! Page-driven collection of registry entities.
//!
//! Each record goes through extraction, the filter and, when needed, the
//! accounts lookup. Upstream failures never escape `collect`: a failed page
//! ends pagination and marks the run as partial, a failed lookup becomes an
//! empty snapshot.

use crate::core::enricher::FinancialEnricher;
use crate::core::extractor::extract_record;
use crate::core::filter::{RecordFilter, RecordScope, Verdict};
use crate::core::throttle::Throttle;
use crate::domain::catalog::FieldCatalog;
use crate::domain::model::{CanonicalRecord, Column, FinancialSnapshot, OrgNumber, OutputRow, RunState};
use crate::domain::ports::{PageSource, Pipeline, StatementSource};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_REGISTRY_URL: &str = "https://data.brreg.no/enhetsregisteret/api/enheter";
pub const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub registry_url: String,
    pub industry_code: String,
    pub page_size: usize,
    pub limit: Option<usize>,
    pub include_financials: bool,
    pub enrichment_interval: Duration,
    pub page_delay: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            industry_code: "73.11".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            limit: None,
            include_financials: false,
            enrichment_interval: Duration::from_millis(200),
            page_delay: Duration::from_millis(1000),
        }
    }
}

impl PipelineSettings {
    fn first_page_params(&self) -> Vec<(String, String)> {
        vec![
            ("naeringskode".to_string(), self.industry_code.clone()),
            ("size".to_string(), self.page_size.to_string()),
            ("page".to_string(), "0".to_string()),
        ]
    }

    fn cap_reached(&self, state: &RunState) -> bool {
        self.limit.is_some_and(|limit| state.retained() >= limit)
    }
}

pub struct RegistryPipeline<P: PageSource, S: StatementSource> {
    pages: P,
    enricher: FinancialEnricher<S>,
    filter: RecordFilter,
    columns: Vec<Column>,
    settings: PipelineSettings,
    throttle: Throttle,
}

impl<P: PageSource, S: StatementSource> RegistryPipeline<P, S> {
    pub fn new(
        pages: P,
        statements: S,
        catalog: Arc<FieldCatalog>,
        filter: RecordFilter,
        columns: Vec<Column>,
        settings: PipelineSettings,
    ) -> Self {
        let throttle = Throttle::new(settings.enrichment_interval);
        Self {
            pages,
            enricher: FinancialEnricher::new(statements, catalog),
            filter,
            columns,
            settings,
            throttle,
        }
    }

    /// Runs one raw entity through filter and enrichment. `None` means the
    /// record was dropped.
    async fn process(&mut self, entity: &serde_json::Value, state: &mut RunState) -> Option<OutputRow> {
        let record = extract_record(entity);
        let include_financials = self.settings.include_financials;

        let snapshot = match &self.filter {
            RecordFilter::AcceptAll => None,
            RecordFilter::Unusable { .. } => return None,
            RecordFilter::Expression(expression) if expression.references_financial() => {
                // 沒有開啟財務資料時，財務條件永遠不成立
                if !include_financials {
                    return None;
                }
                if expression.preliminary(&RecordScope::general(&record)) == Verdict::Reject {
                    state.enrichment_avoided += 1;
                    return None;
                }
                let snapshot =
                    Self::lookup_financials(&self.enricher, &mut self.throttle, &record, state).await;
                if !expression.matches(&RecordScope::with_financials(&record, &snapshot)) {
                    return None;
                }
                Some(snapshot)
            }
            RecordFilter::Expression(expression) => {
                if !expression.matches(&RecordScope::general(&record)) {
                    return None;
                }
                None
            }
        };

        // Enrichment for output columns is independent of the filter.
        let snapshot = match snapshot {
            Some(snapshot) => Some(snapshot),
            None if include_financials => Some(
                Self::lookup_financials(&self.enricher, &mut self.throttle, &record, state).await,
            ),
            None => None,
        };

        Some(OutputRow::project(&self.columns, &record, snapshot.as_ref()))
    }

    /// Throttled accounts lookup. Records without a usable org number cost
    /// no request and no throttle slot.
    async fn lookup_financials(
        enricher: &FinancialEnricher<S>,
        throttle: &mut Throttle,
        record: &CanonicalRecord,
        state: &mut RunState,
    ) -> FinancialSnapshot {
        if OrgNumber::parse(record.org_id()).is_none() {
            return FinancialSnapshot::no_data();
        }
        throttle.wait().await;
        state.enrichment_calls += 1;
        enricher.enrich(record.org_id()).await
    }
}

#[async_trait::async_trait]
impl<P: PageSource, S: StatementSource> Pipeline for RegistryPipeline<P, S> {
    fn columns(&self) -> &[Column] {
        &self.columns
    }

    async fn collect(&mut self, state: &mut RunState) {
        let mut url = self.settings.registry_url.clone();
        let mut params = self.settings.first_page_params();

        tracing::info!(
            "🚀 Fetching entities with industry code {} (financials: {}, limit: {})",
            self.settings.industry_code,
            self.settings.include_financials,
            self.settings
                .limit
                .map(|l| l.to_string())
                .unwrap_or_else(|| "none".to_string())
        );

        'pages: loop {
            if self.settings.cap_reached(state) {
                break;
            }

            if state.pages_fetched > 0 && !self.settings.page_delay.is_zero() {
                tokio::time::sleep(self.settings.page_delay).await;
            }

            tracing::debug!("Requesting page {} from {}", state.pages_fetched, url);
            let page = match self.pages.fetch_page(&url, &params).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(
                        "⚠️ Page request failed, keeping {} rows collected so far: {}",
                        state.retained(),
                        e
                    );
                    state.partial = true;
                    break;
                }
            };
            state.pages_fetched += 1;

            if page.entities.is_empty() {
                tracing::info!("📭 Page {} is empty, no more data", state.pages_fetched);
                break;
            }

            tracing::info!(
                "📄 Page {}: {} entities",
                state.pages_fetched,
                page.entities.len()
            );

            for entity in &page.entities {
                if self.settings.cap_reached(state) {
                    tracing::info!("🛑 Reached limit of {} rows", state.retained());
                    break 'pages;
                }
                state.total_seen += 1;
                if let Some(row) = self.process(entity, state).await {
                    state.rows.push(row);
                }
            }

            match page.next {
                Some(next) => {
                    url = next;
                    params.clear();
                }
                None => break,
            }
        }

        tracing::info!(
            "✅ Collected {} of {} entities over {} pages ({} accounts lookups, {} avoided)",
            state.retained(),
            state.total_seen,
            state.pages_fetched,
            state.enrichment_calls,
            state.enrichment_avoided
        );
    }
}
