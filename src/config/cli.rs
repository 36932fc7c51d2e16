use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_INDUSTRY_CODE: &str = "73.11";

#[derive(Debug, Clone, Parser)]
#[command(name = "brreg-etl")]
#[command(about = "Fetch companies from Brønnøysundregistrene by industry code and export them as CSV")]
pub struct CliConfig {
    /// Industry code (næringskode), e.g. 73.11
    #[arg(
        short = 'i',
        long = "industry",
        visible_aliases = ["industry-code", "naeringskode"],
        default_value = DEFAULT_INDUSTRY_CODE
    )]
    pub industry: String,

    /// Output CSV file. Defaults to <industry>_selskaper.csv
    #[arg(short, long)]
    pub output: Option<String>,

    /// Comma separated field keys to include, see --list-fields
    #[arg(short, long, value_delimiter = ',')]
    pub fields: Option<Vec<String>>,

    /// Stop after this many matching companies
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Filter expression, e.g. "email and not in_liquidation and net_profit > 0"
    #[arg(long)]
    pub filter: Option<String>,

    /// Fetch the latest annual accounts and add financial columns
    #[arg(long)]
    pub financials: bool,

    /// TOML file with endpoint, throttle and output settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the available field keys and exit
    #[arg(long)]
    pub list_fields: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

impl CliConfig {
    pub fn output_file(&self) -> String {
        self.output
            .clone()
            .unwrap_or_else(|| default_output_name(&self.industry))
    }
}

/// `73.11` becomes `73_11_selskaper.csv`.
pub fn default_output_name(industry: &str) -> String {
    format!("{}_selskaper.csv", industry.trim().replace('.', "_"))
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_industry_code("industry", &self.industry)?;

        if let Some(output) = &self.output {
            validation::validate_path("output", output)?;
        }

        if let Some(limit) = self.limit {
            validation::validate_positive_number("limit", limit, 1)?;
        }

        Ok(())
    }
}
