// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Environment-supplied configuration shared by the producer and dashboard
//! binaries. Values are checked for well-formedness only; reachability is
//! discovered (and reported) at runtime.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, ValueEnum};
use reqwest::Url;

use crate::error::ConfigError;

pub const DEFAULT_QUERY_URL: &str = "http://localhost:3030/btc/query";
pub const DEFAULT_UPDATE_URL: &str = "http://localhost:3030/btc/update";

/// HTTP basic-auth credentials for the store.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub query_url: Url,
    pub update_url: Url,
    pub credentials: Option<Credentials>,
    pub timeout: Duration,
}

/// Store connection flags, flattened into each binary's argument parser.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// SPARQL query endpoint
    #[arg(long, env = "FUSEKI_QUERY", default_value = DEFAULT_QUERY_URL)]
    pub query_url: String,

    /// SPARQL update endpoint
    #[arg(long, env = "FUSEKI_UPDATE", default_value = DEFAULT_UPDATE_URL)]
    pub update_url: String,

    /// Basic-auth user for the store (requires --store-password)
    #[arg(long, env = "STORE_USER")]
    pub store_user: Option<String>,

    /// Basic-auth password for the store (requires --store-user)
    #[arg(long, env = "STORE_PASSWORD", hide_env_values = true)]
    pub store_password: Option<String>,

    /// Upper bound for a single store call, in seconds
    #[arg(long, env = "STORE_TIMEOUT_SECS", default_value = "10")]
    pub store_timeout_secs: u64,
}

impl StoreArgs {
    pub fn into_config(self) -> Result<StoreConfig, ConfigError> {
        let credentials = match (self.store_user, self.store_password) {
            (Some(user), Some(password)) => Some(Credentials { user, password }),
            (None, None) => None,
            _ => return Err(ConfigError::PartialCredentials),
        };
        Ok(StoreConfig {
            query_url: parse_http_url("FUSEKI_QUERY", &self.query_url)?,
            update_url: parse_http_url("FUSEKI_UPDATE", &self.update_url)?,
            credentials,
            timeout: non_zero_secs("STORE_TIMEOUT_SECS", self.store_timeout_secs)?,
        })
    }
}

/// Which price strategy the producer runs.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Random prices in a fixed band
    Simulated,
    /// Spot price fetched from an HTTP JSON feed
    Http,
}

#[derive(Args, Debug, Clone)]
pub struct ProducerArgs {
    /// Price strategy
    #[arg(long, env = "PRODUCER_SOURCE", value_enum, default_value = "simulated")]
    pub source: SourceKind,

    /// Seconds between ticks (defaults to the strategy's own interval: 5 simulated, 20 http)
    #[arg(long, env = "PRODUCER_INTERVAL_SECS")]
    pub interval_secs: Option<u64>,

    /// Seconds to wait before the first tick (lets the store come up)
    #[arg(long, env = "PRODUCER_STARTUP_DELAY_SECS", default_value = "0")]
    pub startup_delay_secs: u64,

    /// Currency tag attached to every observation
    #[arg(long, env = "PRICE_CURRENCY", default_value = "BRL")]
    pub currency: String,

    /// Spot price URL for the http strategy
    #[arg(
        long,
        env = "PRICE_FEED_URL",
        default_value = "https://api.coinbase.com/v2/prices/BTC-BRL/spot"
    )]
    pub feed_url: String,

    /// JSON pointer to the price inside the feed response
    #[arg(long, env = "PRICE_FEED_POINTER", default_value = "/data/amount")]
    pub feed_pointer: String,
}

impl ProducerArgs {
    /// Interval override, if one was configured.
    pub fn interval(&self) -> Result<Option<Duration>, ConfigError> {
        self.interval_secs
            .map(|secs| non_zero_secs("PRODUCER_INTERVAL_SECS", secs))
            .transpose()
    }

    pub fn feed_url(&self) -> Result<Url, ConfigError> {
        parse_http_url("PRICE_FEED_URL", &self.feed_url)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.interval()?;
        if self.currency.trim().is_empty() {
            return Err(ConfigError::Empty("PRICE_CURRENCY"));
        }
        if self.source == SourceKind::Http {
            self.feed_url()?;
            if !self.feed_pointer.is_empty() && !self.feed_pointer.starts_with('/') {
                return Err(ConfigError::InvalidPointer(self.feed_pointer.clone()));
            }
        }
        Ok(())
    }
}

/// Validated dashboard settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub queries_dir: PathBuf,
    pub live_query_key: String,
    pub live_ttl: Duration,
    pub query_ttl: Duration,
    pub currency_prefix: String,
    /// Sessions untouched for this long are dropped.
    pub session_idle_ttl: Duration,
    pub max_sessions: usize,
}

#[derive(Args, Debug, Clone)]
pub struct DashboardArgs {
    /// Directory of `*.rq` query files
    #[arg(long, env = "QUERIES_DIR", default_value = "queries")]
    pub queries_dir: PathBuf,

    /// Catalog key rendered in the always-visible live panel
    #[arg(long, env = "LIVE_QUERY_KEY", default_value = "latest_20")]
    pub live_query_key: String,

    /// Cache lifetime for the live panel, in seconds
    #[arg(long, env = "LIVE_CACHE_TTL_SECS", default_value = "20")]
    pub live_ttl_secs: u64,

    /// Cache lifetime for on-demand queries, in seconds
    #[arg(long, env = "QUERY_CACHE_TTL_SECS", default_value = "60")]
    pub query_ttl_secs: u64,

    /// Prefix for headline metric values
    #[arg(long, env = "CURRENCY_PREFIX", default_value = "R$")]
    pub currency_prefix: String,

    /// Drop sessions idle for this many seconds
    #[arg(long, env = "SESSION_IDLE_TTL_SECS", default_value = "1800")]
    pub session_idle_ttl_secs: u64,

    /// Upper bound on live sessions; the least recently used is dropped first
    #[arg(long, env = "MAX_SESSIONS", default_value = "10000")]
    pub max_sessions: usize,
}

impl DashboardArgs {
    pub fn into_config(self) -> Result<DashboardConfig, ConfigError> {
        if self.live_query_key.trim().is_empty() {
            return Err(ConfigError::Empty("LIVE_QUERY_KEY"));
        }
        Ok(DashboardConfig {
            queries_dir: self.queries_dir,
            live_query_key: self.live_query_key,
            live_ttl: non_zero_secs("LIVE_CACHE_TTL_SECS", self.live_ttl_secs)?,
            query_ttl: non_zero_secs("QUERY_CACHE_TTL_SECS", self.query_ttl_secs)?,
            currency_prefix: self.currency_prefix,
            session_idle_ttl: non_zero_secs("SESSION_IDLE_TTL_SECS", self.session_idle_ttl_secs)?,
            max_sessions: match self.max_sessions {
                0 => return Err(ConfigError::ZeroLimit("MAX_SESSIONS")),
                n => n,
            },
        })
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

fn parse_http_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        name,
        value: value.to_string(),
        reason,
    };
    let url = Url::parse(value).map_err(|e| invalid(e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

fn non_zero_secs(name: &'static str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::ZeroDuration(name));
    }
    Ok(Duration::from_secs(secs))
}
