// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! The query files shipped with the crate load into the expected catalog.

use std::path::PathBuf;

use dd_pricefeed::catalog::{Catalog, VisualizationKind};

fn shipped_queries() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("queries")
}

#[test]
fn test_shipped_catalog_kinds_and_order() {
    let catalog = Catalog::load(&shipped_queries());
    assert_eq!(catalog.notice(), None);

    let entries: Vec<(&str, VisualizationKind)> = catalog
        .definitions()
        .iter()
        .map(|d| (d.key.as_str(), d.kind))
        .collect();
    assert_eq!(
        entries,
        vec![
            ("daily_high_low_30d", VisualizationKind::RangeBand),
            ("hourly_avg_24h", VisualizationKind::AggregateBar),
            ("latest_20", VisualizationKind::TimeSeries),
            ("median_last_hour", VisualizationKind::ScalarMetric),
            ("price_history_24h", VisualizationKind::TimeSeries),
            ("spikes_7d", VisualizationKind::SeverityScatter),
        ]
    );
}

#[test]
fn test_shipped_queries_are_trimmed_selects() {
    let catalog = Catalog::load(&shipped_queries());
    for def in catalog.definitions() {
        assert!(def.text.starts_with("PREFIX"), "{}", def.key);
        assert!(def.text.contains("SELECT"), "{}", def.key);
        assert_eq!(def.text, def.text.trim(), "{}", def.key);
    }
    assert_eq!(catalog.get("spikes_7d").unwrap().title, "Spikes 7D");
}
