use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API returned HTTP {status} for {url}")]
    HttpStatusError { status: u16, url: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Storage,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ApiError(_) | EtlError::HttpStatusError { .. } => ErrorCategory::Network,
            EtlError::CsvError(_) | EtlError::IoError(_) => ErrorCategory::Storage,
            EtlError::ProcessingError { .. } => ErrorCategory::Data,
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 上游錯誤在管線內部已降級處理，能走到這裡代表可以重試
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::ApiError(_) | EtlError::HttpStatusError { .. } => {
                "Check network connectivity and that data.brreg.no is reachable, then retry"
            }
            EtlError::CsvError(_) | EtlError::IoError(_) => {
                "Check that the output directory exists and is writable"
            }
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. } => {
                "Review the command line arguments and the TOML configuration file"
            }
            EtlError::ProcessingError { .. } => "Re-run with --verbose for details",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::ApiError(e) if e.is_timeout() => {
                "The registry API did not answer in time".to_string()
            }
            EtlError::ApiError(_) => "Could not reach the registry API".to_string(),
            EtlError::HttpStatusError { status, .. } => {
                format!("The registry API answered with HTTP {}", status)
            }
            EtlError::CsvError(_) | EtlError::IoError(_) => {
                format!("Could not write the output file: {}", self)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
