use crate::adapters::http::{DEFAULT_ACCOUNTS_URL, DEFAULT_TIMEOUT_SECONDS};
use crate::core::pipeline::{DEFAULT_PAGE_SIZE, DEFAULT_REGISTRY_URL};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Optional settings file. Every section and key has a default, so an empty
/// file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub api: ApiConfig,
    pub throttle: ThrottleConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub registry_url: String,
    pub accounts_url: String,
    pub page_size: usize,
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            accounts_url: DEFAULT_ACCOUNTS_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Minimum gap between two accounts lookups.
    pub enrichment_interval_ms: u64,
    /// Pause between two registry pages.
    pub page_delay_ms: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            enrichment_interval_ms: 200,
            page_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: ".".to_string(),
        }
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${BRREG_API}); unknown variables are left as-is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("api.registry_url", &self.api.registry_url)?;
        validation::validate_url("api.accounts_url", &self.api.accounts_url)?;
        validation::validate_positive_number("api.page_size", self.api.page_size, 1)?;
        validation::validate_positive_number(
            "api.timeout_seconds",
            self.api.timeout_seconds as usize,
            1,
        )?;
        validation::validate_path("output.directory", &self.output.directory)?;
        Ok(())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
