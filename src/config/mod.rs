#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use toml_config::TomlConfig;

use crate::core::pipeline::PipelineSettings;
#[cfg(feature = "cli")]
use crate::utils::{error::Result, validation::Validate};
use std::time::Duration;

/// Everything a run needs, after merging command line and settings file.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub pipeline: PipelineSettings,
    pub accounts_url: String,
    pub timeout: Duration,
    pub output_directory: String,
    pub output_file: String,
    pub fields: Option<Vec<String>>,
    pub filter: Option<String>,
}

impl RunConfig {
    pub fn new(
        file: &TomlConfig,
        industry_code: &str,
        output_file: String,
        limit: Option<usize>,
        include_financials: bool,
    ) -> Self {
        Self {
            pipeline: PipelineSettings {
                registry_url: file.api.registry_url.clone(),
                industry_code: industry_code.trim().to_string(),
                page_size: file.api.page_size,
                limit,
                include_financials,
                enrichment_interval: Duration::from_millis(file.throttle.enrichment_interval_ms),
                page_delay: Duration::from_millis(file.throttle.page_delay_ms),
            },
            accounts_url: file.api.accounts_url.clone(),
            timeout: Duration::from_secs(file.api.timeout_seconds),
            output_directory: file.output.directory.clone(),
            output_file,
            fields: None,
            filter: None,
        }
    }

    pub fn with_fields(mut self, fields: Option<Vec<String>>) -> Self {
        self.fields = fields.filter(|f| !f.is_empty());
        self
    }

    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter.filter(|f| !f.trim().is_empty());
        self
    }

    /// Loads the settings file named on the command line (if any), validates
    /// both layers and merges them.
    #[cfg(feature = "cli")]
    pub fn from_cli(cli: &CliConfig) -> Result<Self> {
        cli.validate()?;

        let file = match &cli.config {
            Some(path) => {
                tracing::info!("📄 Loading settings from {}", path.display());
                TomlConfig::from_file(path)?
            }
            None => TomlConfig::default(),
        };
        file.validate()?;

        Ok(Self::new(
            &file,
            &cli.industry,
            cli.output_file(),
            cli.limit,
            cli.financials,
        )
        .with_fields(cli.fields.clone())
        .with_filter(cli.filter.clone()))
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_from_cli_defaults() {
        let cli = CliConfig::parse_from(["brreg-etl", "--filter", "  "]);
        let config = RunConfig::from_cli(&cli).unwrap();

        assert_eq!(config.pipeline.industry_code, "73.11");
        assert_eq!(config.pipeline.enrichment_interval, Duration::from_millis(200));
        assert_eq!(config.output_file, "73_11_selskaper.csv");
        assert!(config.filter.is_none());
        assert!(config.fields.is_none());
    }

    #[test]
    fn test_from_cli_with_settings_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[throttle]\nenrichment_interval_ms = 0\n[output]\ndirectory = \"out\"\n")
            .unwrap();

        let path = temp_file.path().to_str().unwrap().to_string();
        let cli = CliConfig::parse_from(["brreg-etl", "-c", &path, "--financials", "-l", "5"]);
        let config = RunConfig::from_cli(&cli).unwrap();

        assert_eq!(config.pipeline.enrichment_interval, Duration::ZERO);
        assert_eq!(config.pipeline.limit, Some(5));
        assert!(config.pipeline.include_financials);
        assert_eq!(config.output_directory, "out");
    }

    #[test]
    fn test_from_cli_missing_settings_file() {
        let cli = CliConfig::parse_from(["brreg-etl", "-c", "/definitely/not/here.toml"]);
        assert!(RunConfig::from_cli(&cli).is_err());
    }
}
