//! Motivational quote for the morning announcement.
//!
//! The quote is decoration: any failure (network, status, body) falls back
//! to the configured fixed quote and never fails the announcement.

use serde::Deserialize;
use std::time::Duration;

use crate::storage::QuoteConfig;

#[derive(Debug, Deserialize)]
struct QuoteBody {
    content: String,
}

pub struct QuoteClient {
    http: reqwest::Client,
    url: String,
    fallback: String,
    enabled: bool,
}

impl QuoteClient {
    pub fn new(config: &QuoteConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("quote client falls back to default settings: {e}");
                reqwest::Client::new()
            });
        Self {
            http,
            url: config.url.clone(),
            fallback: config.fallback.clone(),
            enabled: config.enabled,
        }
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Fetch a quote, or the fallback if anything goes wrong.
    pub async fn fetch(&self) -> String {
        if !self.enabled {
            return self.fallback.clone();
        }
        match self.try_fetch().await {
            Ok(quote) => quote,
            Err(e) => {
                tracing::warn!(url = %self.url, "using fallback quote: {e}");
                self.fallback.clone()
            }
        }
    }

    async fn try_fetch(&self) -> Result<String, reqwest::Error> {
        let body: QuoteBody = self
            .http
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body.content)
    }
}
