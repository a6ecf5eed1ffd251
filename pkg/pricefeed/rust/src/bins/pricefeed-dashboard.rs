// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Analytical dashboard API over the SPARQL store.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use dd_pricefeed::config::{DashboardArgs, LogFormat, StoreArgs};
use dd_pricefeed::dashboard::Dashboard;
use dd_pricefeed::server::{ServerConfig, run_server};
use dd_pricefeed::shutdown::watch_signals;
use dd_pricefeed::store::{FusekiClient, StoreClient};
use dd_pricefeed::telemetry::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "pricefeed-dashboard")]
#[command(about = "Serve cached, typed query panels over the price store")]
struct Args {
    #[command(flatten)]
    store: StoreArgs,

    #[command(flatten)]
    dashboard: DashboardArgs,

    /// Port to listen on
    #[arg(short, long, env = "DASHBOARD_PORT", default_value = "8050")]
    port: u16,

    /// Seconds between background pre-warms of the live panel's cache entry
    /// (defaults to the live cache TTL, 0 to disable)
    #[arg(long, env = "LIVE_REFRESH_SECS")]
    live_refresh_secs: Option<u64>,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "text")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    let store_config = args
        .store
        .into_config()
        .context("invalid store configuration")?;
    let dashboard_config = args
        .dashboard
        .into_config()
        .context("invalid dashboard configuration")?;

    tracing::info!(
        query_url = %store_config.query_url,
        queries_dir = %dashboard_config.queries_dir.display(),
        live_query = %dashboard_config.live_query_key,
        port = args.port,
        "Starting pricefeed-dashboard"
    );

    let store: Arc<dyn StoreClient> = Arc::new(FusekiClient::new(&store_config)?);
    let dashboard = Arc::new(Dashboard::new(
        store,
        &dashboard_config,
        store_config.timeout,
    ));
    if let Some(notice) = dashboard.catalog().notice() {
        tracing::warn!(notice, "Query catalog is empty");
    }

    let config = ServerConfig {
        port: args.port,
        live_refresh: match args.live_refresh_secs {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => Some(dashboard_config.live_ttl),
        },
    };
    let shutdown = watch_signals()?;
    run_server(dashboard, config, shutdown).await
}
