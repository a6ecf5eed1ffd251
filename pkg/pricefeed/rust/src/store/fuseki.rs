// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! HTTP client for a SPARQL 1.1 endpoint pair (Fuseki layout: `/<dataset>/query`
//! and `/<dataset>/update`).

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{StatusCode, Url, header};
use serde::Deserialize;

use super::{RawResult, StoreClient};
use crate::config::StoreConfig;
use crate::error::StoreError;

pub use crate::config::Credentials;

const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// Longest response-body excerpt carried in an error message.
const BODY_EXCERPT_CHARS: usize = 120;

#[derive(Clone)]
pub struct FusekiClient {
    query_url: Url,
    update_url: Url,
    credentials: Option<Credentials>,
    timeout: Duration,
    client: reqwest::Client,
}

impl FusekiClient {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            query_url: config.query_url.clone(),
            update_url: config.update_url.clone(),
            credentials: config.credentials.clone(),
            timeout: config.timeout,
            client,
        })
    }

    fn post(&self, url: &Url) -> reqwest::RequestBuilder {
        let request = self.client.post(url.clone());
        match &self.credentials {
            Some(creds) => request.basic_auth(&creds.user, Some(&creds.password)),
            None => request,
        }
    }

    fn map_send_error(&self, err: reqwest::Error) -> StoreError {
        if err.is_timeout() {
            StoreError::Timeout(self.timeout)
        } else {
            StoreError::Connectivity(err.to_string())
        }
    }

    async fn check_status(&self, resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(StoreError::Auth {
                status: status.as_u16(),
            });
        }
        let body = resp.text().await.unwrap_or_default();
        Err(StoreError::Query(format!(
            "HTTP {}: {}",
            status.as_u16(),
            excerpt(&body)
        )))
    }
}

#[async_trait]
impl StoreClient for FusekiClient {
    async fn submit(&self, query: &str) -> Result<RawResult, StoreError> {
        let resp = self
            .post(&self.query_url)
            .header(header::ACCEPT, SPARQL_RESULTS_JSON)
            .form(&[("query", query)])
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        let resp = self.check_status(resp).await?;
        let body = resp.text().await.map_err(|e| self.map_send_error(e))?;
        parse_sparql_json(&body)
    }

    async fn append(&self, update: &str) -> Result<(), StoreError> {
        let resp = self
            .post(&self.update_url)
            .form(&[("update", update)])
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        self.check_status(resp).await?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct SparqlResponse {
    #[serde(default)]
    head: SparqlHead,
    results: Option<SparqlBindings>,
    boolean: Option<bool>,
}

#[derive(Deserialize, Default)]
struct SparqlHead {
    #[serde(default)]
    vars: Vec<String>,
}

#[derive(Deserialize)]
struct SparqlBindings {
    bindings: Vec<HashMap<String, SparqlTerm>>,
}

#[derive(Deserialize)]
struct SparqlTerm {
    value: String,
}

/// Flatten a SPARQL JSON results document into columns and string cells.
/// ASK responses become a single `boolean` column with one row.
pub fn parse_sparql_json(body: &str) -> Result<RawResult, StoreError> {
    let parsed: SparqlResponse = serde_json::from_str(body)
        .map_err(|e| StoreError::Query(format!("malformed results document: {e}")))?;

    if let Some(answer) = parsed.boolean {
        return RawResult::new(
            vec!["boolean".to_string()],
            vec![vec![Some(answer.to_string())]],
        );
    }

    let columns = parsed.head.vars;
    let rows = parsed
        .results
        .map(|r| r.bindings)
        .unwrap_or_default()
        .into_iter()
        .map(|mut binding| {
            columns
                .iter()
                .map(|var| binding.remove(var).map(|term| term.value))
                .collect()
        })
        .collect();

    RawResult::new(columns, rows)
}

fn excerpt(body: &str) -> String {
    body.trim().chars().take(BODY_EXCERPT_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, timeout: Duration) -> StoreConfig {
        StoreConfig {
            query_url: Url::parse(&format!("{}/btc/query", server.uri())).unwrap(),
            update_url: Url::parse(&format!("{}/btc/update", server.uri())).unwrap(),
            credentials: Some(Credentials {
                user: "admin".into(),
                password: "admin".into(),
            }),
            timeout,
        }
    }

    const SELECT_BODY: &str = r#"{
        "head": { "vars": ["hora", "valor"] },
        "results": { "bindings": [
            { "hora": { "type": "literal", "value": "2024-01-01T00:00:05" },
              "valor": { "type": "literal", "datatype": "http://www.w3.org/2001/XMLSchema#decimal", "value": "102" } },
            { "hora": { "type": "literal", "value": "2024-01-01T00:00:00" } }
        ] }
    }"#;

    #[test]
    fn test_parse_select_keeps_unbound_as_none() {
        let raw = parse_sparql_json(SELECT_BODY).unwrap();
        assert_eq!(raw.columns, vec!["hora", "valor"]);
        assert_eq!(raw.rows.len(), 2);
        assert_eq!(raw.rows[0][1].as_deref(), Some("102"));
        assert_eq!(raw.rows[1][1], None);
    }

    #[test]
    fn test_parse_ask() {
        let raw = parse_sparql_json(r#"{ "head": {}, "boolean": true }"#).unwrap();
        assert_eq!(raw.columns, vec!["boolean"]);
        assert_eq!(raw.rows, vec![vec![Some("true".to_string())]]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse_sparql_json("<html>oops</html>").unwrap_err();
        assert!(matches!(err, StoreError::Query(_)));
    }

    #[tokio::test]
    async fn test_submit_posts_form_with_accept_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/btc/query"))
            .and(header_eq("accept", SPARQL_RESULTS_JSON))
            .and(body_string_contains("query=SELECT"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SELECT_BODY))
            .expect(1)
            .mount(&server)
            .await;

        let client = FusekiClient::new(&config_for(&server, Duration::from_secs(5))).unwrap();
        let raw = client.submit("SELECT ?hora ?valor WHERE {}").await.unwrap();
        assert_eq!(raw.rows.len(), 2);
    }

    #[tokio::test]
    async fn test_submit_maps_unauthorized_to_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/btc/query"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = FusekiClient::new(&config_for(&server, Duration::from_secs(5))).unwrap();
        let err = client.submit("SELECT * WHERE {}").await.unwrap_err();
        assert_eq!(err, StoreError::Auth { status: 401 });
    }

    #[tokio::test]
    async fn test_submit_maps_server_error_to_query_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/btc/query"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Parse error: line 1"))
            .mount(&server)
            .await;

        let client = FusekiClient::new(&config_for(&server, Duration::from_secs(5))).unwrap();
        let err = client.submit("SELEKT").await.unwrap_err();
        assert_eq!(err, StoreError::Query("HTTP 400: Parse error: line 1".into()));
    }

    #[tokio::test]
    async fn test_submit_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/btc/query"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(SELECT_BODY)
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let timeout = Duration::from_millis(100);
        let client = FusekiClient::new(&config_for(&server, timeout)).unwrap();
        let err = client.submit("SELECT * WHERE {}").await.unwrap_err();
        assert_eq!(err, StoreError::Timeout(timeout));
    }

    #[tokio::test]
    async fn test_append_posts_update() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/btc/update"))
            .and(body_string_contains("update=INSERT+DATA"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = FusekiClient::new(&config_for(&server, Duration::from_secs(5))).unwrap();
        client.append("INSERT DATA { }").await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_store_is_connectivity_error() {
        let config = StoreConfig {
            query_url: Url::parse("http://127.0.0.1:9/btc/query").unwrap(),
            update_url: Url::parse("http://127.0.0.1:9/btc/update").unwrap(),
            credentials: None,
            timeout: Duration::from_secs(2),
        };
        let client = FusekiClient::new(&config).unwrap();
        let err = client.append("INSERT DATA { }").await.unwrap_err();
        assert!(matches!(err, StoreError::Connectivity(_)), "got {err:?}");
    }
}
