// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Price observation record and its RDF serialization.
//!
//! Observations are written as SOSA observations:
//!
//! ```text
//! <http://example.org/btc/obs/{id}> a ex:BitcoinPriceObservation, sosa:Observation ;
//!     sosa:madeBySensor ex:{source} ;
//!     sosa:hasFeatureOfInterest ex:Bitcoin ;
//!     sosa:resultTime "..."^^xsd:dateTime ;
//!     ex:priceValue "..."^^xsd:decimal ;
//!     ex:currency "BRL"^^xsd:string ;
//!     sosa:hasSimpleResult "..."^^xsd:decimal .
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use uuid::Uuid;

pub const EX: &str = "http://example.org/btc#";
pub const SOSA: &str = "http://www.w3.org/ns/sosa/";
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
pub const OBSERVATION_BASE: &str = "http://example.org/btc/obs/";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub currency: String,
    pub source: String,
}

impl Observation {
    /// New observation with a fresh id. The value is rounded to cents.
    pub fn new(
        timestamp: DateTime<Utc>,
        value: f64,
        currency: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            value: round_cents(value),
            currency: currency.into(),
            source: source.into(),
        }
    }

    pub fn iri(&self) -> String {
        format!("{OBSERVATION_BASE}{}", self.id)
    }

    pub fn to_ntriples(&self) -> String {
        let subject = format!("<{}>", self.iri());
        let decimal = typed_literal(&format!("{:.2}", self.value), "decimal");
        let triples = [
            (iri(RDF_TYPE), ex("BitcoinPriceObservation")),
            (iri(RDF_TYPE), sosa("Observation")),
            (sosa("madeBySensor"), ex(&self.source)),
            (sosa("hasFeatureOfInterest"), ex("Bitcoin")),
            (
                sosa("resultTime"),
                typed_literal(
                    &self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
                    "dateTime",
                ),
            ),
            (ex("priceValue"), decimal.clone()),
            (ex("currency"), typed_literal(&escape_literal(&self.currency), "string")),
            (sosa("hasSimpleResult"), decimal),
        ];
        triples
            .iter()
            .map(|(p, o)| format!("{subject} {p} {o} .\n"))
            .collect()
    }

    /// SPARQL update that persists this observation.
    pub fn to_insert_data(&self) -> String {
        format!("INSERT DATA {{\n{}}}", self.to_ntriples())
    }
}

/// Static triples describing the sensor that produces observations.
pub fn sensor_metadata_update(source: &str) -> String {
    let sensor = ex(source);
    format!(
        "INSERT DATA {{\n{sensor} {} {} .\n{sensor} {} {} .\n}}",
        iri(RDF_TYPE),
        sosa("Sensor"),
        sosa("observes"),
        ex("Bitcoin"),
    )
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn iri(full: &str) -> String {
    format!("<{full}>")
}

fn ex(local: &str) -> String {
    format!("<{EX}{local}>")
}

fn sosa(local: &str) -> String {
    format!("<{SOSA}{local}>")
}

fn typed_literal(lexical: &str, xsd_type: &str) -> String {
    format!("\"{lexical}\"^^<{XSD}{xsd_type}>")
}

fn escape_literal(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}
