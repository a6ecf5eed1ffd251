// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Spot price fetched from a public JSON endpoint.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value as JsonValue;

use super::PriceSource;
use crate::error::SourceError;

pub const FEED_SENSOR: &str = "btcFeed";
pub const FEED_INTERVAL: Duration = Duration::from_secs(20);

pub struct HttpPriceSource {
    url: Url,
    pointer: String,
    client: reqwest::Client,
}

impl HttpPriceSource {
    pub fn new(url: Url, pointer: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            url,
            pointer: pointer.into(),
            client,
        })
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    fn name(&self) -> &str {
        FEED_SENSOR
    }

    fn default_interval(&self) -> Duration {
        FEED_INTERVAL
    }

    async fn sample(&self) -> Result<f64, SourceError> {
        let resp = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| SourceError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let body: JsonValue = resp
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;
        extract_price(&body, &self.pointer)
    }
}

/// Read a price at `pointer`; accepts a JSON number or a numeric string.
pub fn extract_price(body: &JsonValue, pointer: &str) -> Result<f64, SourceError> {
    let field = body
        .pointer(pointer)
        .ok_or_else(|| SourceError::Parse(format!("no value at {pointer}")))?;
    let price = match field {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| SourceError::Parse(format!("value at {pointer} is not numeric: {field}")))?;

    if !price.is_finite() {
        return Err(SourceError::Parse(format!("value at {pointer} is not finite")));
    }
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_extract_string_and_number() {
        let body = json!({"data": {"amount": "351234.56", "base": "BTC"}});
        assert_eq!(extract_price(&body, "/data/amount").unwrap(), 351_234.56);

        let body = json!({"price": 351234.5});
        assert_eq!(extract_price(&body, "/price").unwrap(), 351_234.5);
    }

    #[test]
    fn test_extract_rejects_missing_and_non_numeric() {
        let body = json!({"data": {"amount": "n/a"}});
        assert!(matches!(
            extract_price(&body, "/data/amount"),
            Err(SourceError::Parse(_))
        ));
        assert!(matches!(
            extract_price(&body, "/data/price"),
            Err(SourceError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_sample_from_feed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/prices/BTC-BRL/spot"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"amount": "360000.10", "base": "BTC", "currency": "BRL"}
            })))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/v2/prices/BTC-BRL/spot", server.uri())).unwrap();
        let source = HttpPriceSource::new(url, "/data/amount", Duration::from_secs(5)).unwrap();
        assert_eq!(source.sample().await.unwrap(), 360_000.10);
        assert_eq!(source.name(), "btcFeed");
        assert_eq!(source.default_interval(), Duration::from_secs(20));
    }

    #[tokio::test]
    async fn test_sample_maps_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let source = HttpPriceSource::new(url, "/data/amount", Duration::from_secs(5)).unwrap();
        assert!(matches!(source.sample().await, Err(SourceError::Status(503))));
    }
}
