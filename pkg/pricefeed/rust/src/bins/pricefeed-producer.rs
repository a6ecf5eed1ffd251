// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Periodic price observation producer.
//!
//! Samples a price (simulated or from an HTTP feed) on a fixed interval and
//! appends it to the SPARQL store. Per-tick failures are logged and skipped;
//! only invalid configuration stops the process with a non-zero exit.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use dd_pricefeed::config::{LogFormat, ProducerArgs, SourceKind, StoreArgs};
use dd_pricefeed::producer::{
    HttpPriceSource, PriceSource, Producer, ProducerConfig, SimulatedPriceSource,
};
use dd_pricefeed::shutdown::watch_signals;
use dd_pricefeed::store::{FusekiClient, StoreClient};
use dd_pricefeed::telemetry::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "pricefeed-producer")]
#[command(about = "Append periodic price observations to a SPARQL store")]
struct Args {
    #[command(flatten)]
    store: StoreArgs,

    #[command(flatten)]
    producer: ProducerArgs,

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
    args.producer
        .validate()
        .context("invalid producer configuration")?;

    let store: Arc<dyn StoreClient> = Arc::new(FusekiClient::new(&store_config)?);
    let source: Arc<dyn PriceSource> = match args.producer.source {
        SourceKind::Simulated => Arc::new(SimulatedPriceSource::new()),
        SourceKind::Http => Arc::new(HttpPriceSource::new(
            args.producer.feed_url()?,
            args.producer.feed_pointer.clone(),
            store_config.timeout,
        )?),
    };

    let mut config = ProducerConfig::for_source(source.as_ref());
    if let Some(interval) = args.producer.interval()? {
        config.interval = interval;
    }
    config.currency = args.producer.currency.clone();
    config.append_timeout = store_config.timeout;
    config.startup_delay = Duration::from_secs(args.producer.startup_delay_secs);

    tracing::info!(
        update_url = %store_config.update_url,
        source = ?args.producer.source,
        interval_ms = config.interval.as_millis() as u64,
        authenticated = store_config.credentials.is_some(),
        "Starting pricefeed-producer"
    );

    let shutdown = watch_signals()?;
    Producer::new(store, source, config).run(shutdown).await;
    Ok(())
}
