use crate::domain::ports::{Page, PageSource, StatementSource};
use crate::utils::error::{EtlError, Result};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_ACCOUNTS_URL: &str = "https://data.brreg.no/regnskapsregisteret/regnskap";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// HTTP client for both the entity register and the accounts register.
#[derive(Debug, Clone)]
pub struct BrregClient {
    client: Client,
    accounts_url: String,
}

impl BrregClient {
    pub fn new(accounts_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("brreg-etl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            accounts_url: accounts_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_json(&self, url: &str, params: &[(String, String)]) -> Result<Value> {
        let mut request = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json");
        if !params.is_empty() {
            request = request.query(params);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("GET {} -> {}", url, status);

        if !status.is_success() {
            return Err(EtlError::HttpStatusError {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl PageSource for BrregClient {
    async fn fetch_page(&self, url: &str, params: &[(String, String)]) -> Result<Page> {
        let body = self.get_json(url, params).await?;
        Ok(parse_page(body))
    }
}

#[async_trait::async_trait]
impl StatementSource for BrregClient {
    async fn fetch_statements(&self, org_id: &str) -> Result<Value> {
        let url = format!("{}/{}", self.accounts_url, org_id);
        self.get_json(&url, &[]).await
    }
}

/// Entities live under `_embedded.enheter`, the next page under
/// `_links.next.href`. Both may be missing.
pub fn parse_page(mut body: Value) -> Page {
    let entities = match body
        .get_mut("_embedded")
        .and_then(|e| e.get_mut("enheter"))
        .map(Value::take)
    {
        Some(Value::Array(entities)) => entities,
        _ => Vec::new(),
    };

    let next = body
        .pointer("/_links/next/href")
        .and_then(Value::as_str)
        .filter(|href| !href.is_empty())
        .map(str::to_string);

    Page { entities, next }
}
