pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

use std::sync::Arc;

pub use crate::adapters::{BrregClient, CsvRowSink, LocalStorage};
#[cfg(feature = "cli")]
pub use crate::config::CliConfig;
pub use crate::config::{RunConfig, TomlConfig};
pub use crate::core::{etl::EtlEngine, filter::RecordFilter, pipeline::RegistryPipeline};
pub use crate::domain::catalog::FieldCatalog;
pub use crate::domain::model::RunSummary;
pub use crate::utils::error::{EtlError, Result};

pub type RegistryEngine = EtlEngine<RegistryPipeline<BrregClient, BrregClient>, CsvRowSink<LocalStorage>>;

/// Wires the HTTP client, filter, columns and CSV sink for one run.
pub fn build_engine(config: &RunConfig, catalog: Arc<FieldCatalog>) -> Result<RegistryEngine> {
    let columns = catalog.select_columns(
        config.fields.as_deref(),
        config.pipeline.include_financials,
    )?;
    let filter = RecordFilter::from_source(config.filter.as_deref(), &catalog);

    let client = BrregClient::new(config.accounts_url.clone(), config.timeout)?;
    let pipeline = RegistryPipeline::new(
        client.clone(),
        client,
        catalog,
        filter,
        columns,
        config.pipeline.clone(),
    );

    let storage = LocalStorage::new(config.output_directory.clone());
    let sink = CsvRowSink::local(storage, config.output_file.clone());

    Ok(EtlEngine::new(pipeline, sink))
}
