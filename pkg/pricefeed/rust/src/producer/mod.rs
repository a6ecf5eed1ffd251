// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Periodic observation producer.
//!
//! Each tick samples a price from a [`PriceSource`], wraps it in an
//! [`Observation`] and appends it to the store. A failed tick is logged and
//! dropped; the next tick runs on schedule.

pub mod http_feed;
pub mod simulated;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::error::{SourceError, StoreError, TickError};
use crate::observation::{Observation, sensor_metadata_update};
use crate::store::StoreClient;

pub use http_feed::HttpPriceSource;
pub use simulated::SimulatedPriceSource;

/// Strategy for obtaining the next price sample.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Sensor local name recorded on every observation.
    fn name(&self) -> &str;

    /// Interval used when none is configured.
    fn default_interval(&self) -> Duration;

    async fn sample(&self) -> Result<f64, SourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerConfig {
    pub interval: Duration,
    pub currency: String,
    pub append_timeout: Duration,
    pub startup_delay: Duration,
    pub publish_sensor_metadata: bool,
}

impl ProducerConfig {
    pub fn for_source(source: &dyn PriceSource) -> Self {
        Self {
            interval: source.default_interval(),
            currency: "BRL".to_string(),
            append_timeout: Duration::from_secs(10),
            startup_delay: Duration::ZERO,
            publish_sensor_metadata: true,
        }
    }
}

/// Tick counters returned when the producer stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProducerReport {
    pub ticks: u64,
    pub persisted: u64,
    pub failed: u64,
}

pub struct Producer {
    store: Arc<dyn StoreClient>,
    source: Arc<dyn PriceSource>,
    config: ProducerConfig,
}

impl Producer {
    pub fn new(
        store: Arc<dyn StoreClient>,
        source: Arc<dyn PriceSource>,
        config: ProducerConfig,
    ) -> Self {
        Self {
            store,
            source,
            config,
        }
    }

    pub fn config(&self) -> &ProducerConfig {
        &self.config
    }

    /// One sample → observe → append cycle.
    pub async fn tick(&self) -> Result<Observation, TickError> {
        let value = self.source.sample().await?;
        let observation = Observation::new(
            Utc::now(),
            value,
            self.config.currency.as_str(),
            self.source.name(),
        );
        self.append(&observation.to_insert_data()).await?;
        Ok(observation)
    }

    async fn append(&self, update: &str) -> Result<(), StoreError> {
        tokio::time::timeout(self.config.append_timeout, self.store.append(update))
            .await
            .map_err(|_| StoreError::Timeout(self.config.append_timeout))?
    }

    async fn publish_sensor_metadata(&self) {
        match self.append(&sensor_metadata_update(self.source.name())).await {
            Ok(()) => tracing::info!(sensor = self.source.name(), "Published sensor metadata"),
            Err(e) => tracing::warn!(
                error = %e,
                sensor = self.source.name(),
                "Failed to publish sensor metadata, continuing"
            ),
        }
    }

    /// Tick until `shutdown` flips to true (or its sender is dropped).
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> ProducerReport {
        let mut report = ProducerReport::default();
        if *shutdown.borrow() {
            return report;
        }

        tracing::info!(
            sensor = self.source.name(),
            interval_ms = self.config.interval.as_millis() as u64,
            currency = %self.config.currency,
            "Starting producer"
        );

        if !self.config.startup_delay.is_zero() {
            tracing::info!(
                delay_ms = self.config.startup_delay.as_millis() as u64,
                "Waiting before first tick"
            );
            tokio::select! {
                _ = tokio::time::sleep(self.config.startup_delay) => {}
                _ = shutdown.changed() => return report,
            }
        }

        if self.config.publish_sensor_metadata {
            self.publish_sensor_metadata().await;
        }

        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    report.ticks += 1;
                    match self.tick().await {
                        Ok(obs) => {
                            report.persisted += 1;
                            tracing::info!(
                                id = %obs.id,
                                value = obs.value,
                                currency = %obs.currency,
                                "Persisted price observation"
                            );
                        }
                        Err(e) => {
                            report.failed += 1;
                            tracing::warn!(error = %e, "Tick failed, skipping to next interval");
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!(
            ticks = report.ticks,
            persisted = report.persisted,
            failed = report.failed,
            "Producer stopped"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FakeStore;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted samples, then repeats the last one.
    struct ScriptedSource {
        samples: Mutex<VecDeque<Result<f64, SourceError>>>,
    }

    impl ScriptedSource {
        fn new(samples: Vec<Result<f64, SourceError>>) -> Self {
            Self {
                samples: Mutex::new(samples.into()),
            }
        }
    }

    #[async_trait]
    impl PriceSource for ScriptedSource {
        fn name(&self) -> &str {
            "testSensor"
        }

        fn default_interval(&self) -> Duration {
            Duration::from_secs(5)
        }

        async fn sample(&self) -> Result<f64, SourceError> {
            let mut samples = self.samples.lock().unwrap();
            if samples.len() > 1 {
                samples.pop_front().unwrap()
            } else {
                match samples.front().unwrap() {
                    Ok(v) => Ok(*v),
                    Err(_) => Err(SourceError::Request("exhausted".into())),
                }
            }
        }
    }

    fn producer(store: Arc<FakeStore>, source: ScriptedSource) -> Producer {
        let source: Arc<dyn PriceSource> = Arc::new(source);
        let mut config = ProducerConfig::for_source(source.as_ref());
        config.publish_sensor_metadata = false;
        Producer::new(store, source, config)
    }

    #[tokio::test]
    async fn test_tick_appends_observation() {
        let store = Arc::new(FakeStore::new());
        let producer = producer(store.clone(), ScriptedSource::new(vec![Ok(350_000.004)]));

        let obs = producer.tick().await.unwrap();
        assert_eq!(obs.value, 350_000.0);
        assert_eq!(obs.source, "testSensor");

        let appended = store.appended();
        assert_eq!(appended.len(), 1);
        assert!(appended[0].contains(&obs.iri()));
    }

    #[tokio::test]
    async fn test_tick_surfaces_source_error_without_append() {
        let store = Arc::new(FakeStore::new());
        let producer = producer(
            store.clone(),
            ScriptedSource::new(vec![Err(SourceError::Status(503)), Ok(1.0)]),
        );

        let err = producer.tick().await.unwrap_err();
        assert!(matches!(err, TickError::Source(SourceError::Status(503))));
        assert!(store.appended().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_append_timeout_is_distinguished() {
        let store = Arc::new(FakeStore::new().with_delay(Duration::from_secs(60)));
        let producer = producer(store, ScriptedSource::new(vec![Ok(1.0)]));

        let err = producer.tick().await.unwrap_err();
        assert!(matches!(err, TickError::Store(StoreError::Timeout(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_tick_does_not_stop_the_loop() {
        let store = Arc::new(FakeStore::new());
        store.fail_next_append(StoreError::Connectivity("connection refused".into()));
        let producer = Arc::new(producer(
            store.clone(),
            ScriptedSource::new(vec![Ok(300_000.0)]),
        ));

        let (tx, rx) = watch::channel(false);
        let task = {
            let producer = producer.clone();
            tokio::spawn(async move { producer.run(rx).await })
        };

        // Ticks fire at t=0s, 5s and 10s.
        tokio::time::sleep(Duration::from_secs(11)).await;
        tx.send(true).unwrap();
        let report = task.await.unwrap();

        assert_eq!(
            report,
            ProducerReport {
                ticks: 3,
                persisted: 2,
                failed: 1,
            }
        );
        assert_eq!(store.appended().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_failure_recovers_next_tick() {
        let store = Arc::new(FakeStore::new());
        let producer = Arc::new(producer(
            store.clone(),
            ScriptedSource::new(vec![
                Err(SourceError::Request("feed down".into())),
                Ok(310_000.0),
            ]),
        ));

        let (tx, rx) = watch::channel(false);
        let task = {
            let producer = producer.clone();
            tokio::spawn(async move { producer.run(rx).await })
        };

        tokio::time::sleep(Duration::from_secs(6)).await;
        tx.send(true).unwrap();
        let report = task.await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.persisted, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sensor_metadata_failure_is_not_fatal() {
        let store = Arc::new(FakeStore::new());
        store.fail_next_append(StoreError::Auth { status: 401 });
        let source: Arc<dyn PriceSource> = Arc::new(ScriptedSource::new(vec![Ok(1.0)]));
        let config = ProducerConfig::for_source(source.as_ref());
        let producer = Arc::new(Producer::new(store.clone(), source, config));

        let (tx, rx) = watch::channel(false);
        let task = {
            let producer = producer.clone();
            tokio::spawn(async move { producer.run(rx).await })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send(true).unwrap();
        let report = task.await.unwrap();

        assert_eq!(report.persisted, 1);
        assert!(store.appended()[0].contains("BitcoinPriceObservation"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_startup_delay() {
        let store = Arc::new(FakeStore::new());
        let source: Arc<dyn PriceSource> = Arc::new(ScriptedSource::new(vec![Ok(1.0)]));
        let mut config = ProducerConfig::for_source(source.as_ref());
        config.startup_delay = Duration::from_secs(10);
        let producer = Arc::new(Producer::new(store.clone(), source, config));

        let (tx, rx) = watch::channel(false);
        let task = {
            let producer = producer.clone();
            tokio::spawn(async move { producer.run(rx).await })
        };

        tokio::time::sleep(Duration::from_secs(2)).await;
        tx.send(true).unwrap();
        let report = task.await.unwrap();

        assert_eq!(report, ProducerReport::default());
        assert!(store.appended().is_empty());
    }
}
