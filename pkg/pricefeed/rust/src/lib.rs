// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Linked-data price feed and analytical dashboard.
//!
//! Write path: a [`producer::Producer`] samples a price on a fixed interval and
//! appends it to a SPARQL store as a SOSA observation.
//!
//! Read path: the [`dashboard::Dashboard`] runs catalog queries through a
//! TTL-cached executor, types the untyped bindings, and turns each result into
//! a render spec chosen by the query's visualization kind.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod executor;
pub mod export;
pub mod normalize;
pub mod observation;
pub mod producer;
pub mod render;
pub mod result;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod store;
pub mod telemetry;
