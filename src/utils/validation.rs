use crate::utils::error::{EtlError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(EtlError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// Næringskoder look like `73.11` or `62.010`: digits separated by single dots.
pub fn validate_industry_code(field_name: &str, code: &str) -> Result<()> {
    validate_non_empty_string(field_name, code)?;

    let well_formed = code
        .trim()
        .split('.')
        .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()));

    if !well_formed {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: code.to_string(),
            reason: "Expected digits separated by dots, e.g. 73.11".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("api.registry_url", "https://data.brreg.no/enhetsregisteret/api/enheter").is_ok());
        assert!(validate_url("api.registry_url", "http://localhost:8080").is_ok());
        assert!(validate_url("api.registry_url", "").is_err());
        assert!(validate_url("api.registry_url", "invalid-url").is_err());
        assert!(validate_url("api.registry_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("api.page_size", 1000, 1).is_ok());
        assert!(validate_positive_number("api.page_size", 0, 1).is_err());
    }

    #[test]
    fn test_validate_industry_code() {
        assert!(validate_industry_code("industry", "73.11").is_ok());
        assert!(validate_industry_code("industry", "62.010").is_ok());
        assert!(validate_industry_code("industry", " 73.11 ").is_ok());
        assert!(validate_industry_code("industry", "").is_err());
        assert!(validate_industry_code("industry", "73..11").is_err());
        assert!(validate_industry_code("industry", "reklame").is_err());
    }

    #[test]
    fn test_validate_path() {
        assert!(validate_path("output", "73_11_selskaper.csv").is_ok());
        assert!(validate_path("output", "").is_err());
        assert!(validate_path("output", "bad\0name.csv").is_err());
    }
}
