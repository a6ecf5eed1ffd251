// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::ops::Range;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::PriceSource;
use crate::error::SourceError;

pub const SIMULATED_SENSOR: &str = "btcSensor";
pub const SIMULATED_INTERVAL: Duration = Duration::from_secs(5);
pub const SIMULATED_RANGE: Range<f64> = 300_000.0..400_000.0;

/// Uniformly random prices in a fixed band. Never fails.
pub struct SimulatedPriceSource {
    rng: Mutex<StdRng>,
    range: Range<f64>,
}

impl SimulatedPriceSource {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Deterministic sequence, for tests and reproducible demos.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
            range: SIMULATED_RANGE,
        }
    }
}

impl Default for SimulatedPriceSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceSource for SimulatedPriceSource {
    fn name(&self) -> &str {
        SIMULATED_SENSOR
    }

    fn default_interval(&self) -> Duration {
        SIMULATED_INTERVAL
    }

    async fn sample(&self) -> Result<f64, SourceError> {
        let raw = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_range(self.range.clone());
        Ok((raw * 100.0).round() / 100.0)
    }
}
