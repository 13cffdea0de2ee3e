//! One-time bulk load of tower records from a CSV export.
//!
//! Rows have no header and at least 14 columns in the order
//! `radio,mcc,net,area,cell,unit,lon,lat,range,samples,changeable,created,updated,averageSignal`.
//! Individual malformed values become null; rows that are too short are
//! skipped. Neither stops the load. Trailing empty columns do not count
//! towards the minimum, so a row ending in an empty `averageSignal` is too
//! short.

use crate::{store::TowerStore, Result, TowerAttributes};
use chrono::{DateTime, TimeZone, Utc};
use csv::{ReaderBuilder, StringRecord};
use std::{
    io::Read,
    path::{Path, PathBuf},
    str::FromStr,
};

pub const MIN_FIELDS: usize = 14;

const LOADED_METRIC: &str = "signal_intelligence_loader_towers_loaded";
const SKIPPED_METRIC: &str = "signal_intelligence_loader_lines_skipped";
const PARSE_DURATION_METRIC: &str = "signal_intelligence_loader_parse_duration";
const INSERT_DURATION_METRIC: &str = "signal_intelligence_loader_insert_duration";

/// Outcome of a load attempt.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadReport {
    /// Towers already in the store before loading. Loading only happens when
    /// this is zero.
    pub existing: u64,
    pub parsed: usize,
    pub skipped: usize,
    pub inserted: usize,
}

/// Towers parsed from a CSV source plus the number of unusable lines.
#[derive(Debug, Default)]
pub struct ParsedTowers {
    pub towers: Vec<TowerAttributes>,
    pub skipped: usize,
}

pub struct CsvLoader {
    path: PathBuf,
}

impl CsvLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the file into `store` unless the store already holds towers.
    pub async fn run(&self, store: &dyn TowerStore) -> Result<LoadReport> {
        let existing = store.count().await?;
        if existing > 0 {
            tracing::info!(existing, "store already contains towers, skipping csv load");
            return Ok(LoadReport {
                existing,
                ..Default::default()
            });
        }

        tracing::info!(path = %self.path.display(), "loading cell towers");
        let bytes = tokio::fs::read(&self.path).await?;
        let parsed = service_metrics::record_duration!(
            PARSE_DURATION_METRIC,
            parse_reader(bytes.as_slice())
        );
        let ParsedTowers { towers, skipped } = parsed?;
        metrics::counter!(SKIPPED_METRIC).increment(skipped as u64);

        let parsed = towers.len();
        if towers.is_empty() {
            tracing::info!(skipped, "no cell tower records found to load");
            return Ok(LoadReport {
                skipped,
                ..Default::default()
            });
        }

        tracing::info!(parsed, skipped, "parsed cell tower records");
        let inserted = service_metrics::record_duration!(
            INSERT_DURATION_METRIC,
            store.insert_many(towers).await
        )?
        .len();
        metrics::counter!(LOADED_METRIC).increment(inserted as u64);
        tracing::info!(inserted, "loaded cell tower records");

        Ok(LoadReport {
            existing,
            parsed,
            skipped,
            inserted,
        })
    }
}

/// Parse every row of `reader`. Only I/O failures are returned as errors.
pub fn parse_reader<R: Read>(reader: R) -> Result<ParsedTowers> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader);

    let mut parsed = ParsedTowers::default();
    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(err) if matches!(err.kind(), csv::ErrorKind::Io(_)) => return Err(err.into()),
            Err(err) => {
                let line = err.position().map(|pos| pos.line().saturating_sub(1));
                tracing::warn!(?line, %err, "skipping unreadable line");
                parsed.skipped += 1;
                continue;
            }
        };
        let line = record
            .position()
            .map(|pos| pos.line().saturating_sub(1))
            .unwrap_or_default();
        match parse_record(&record) {
            Some(tower) => parsed.towers.push(tower),
            None => {
                let raw = record.iter().collect::<Vec<_>>().join(",");
                tracing::warn!(line, %raw, "skipping invalid line");
                parsed.skipped += 1;
            }
        }
    }
    Ok(parsed)
}

/// Map one row onto tower attributes, or `None` if the row has fewer than
/// [`MIN_FIELDS`] columns once trailing empty columns are dropped.
pub fn parse_record(record: &StringRecord) -> Option<TowerAttributes> {
    if field_count(record) < MIN_FIELDS {
        return None;
    }
    let field = |idx: usize| record.get(idx).unwrap_or_default();

    Some(TowerAttributes {
        radio: Some(field(0))
            .filter(|radio| !radio.is_empty())
            .map(str::to_string),
        mcc: parse_number("mcc", field(1)),
        net: parse_number("net", field(2)),
        area: parse_number("area", field(3)),
        cell: parse_number("cell", field(4)),
        unit: parse_number("unit", field(5)),
        lon: parse_number("lon", field(6)),
        lat: parse_number("lat", field(7)),
        range: parse_number("range", field(8)),
        samples: parse_number("samples", field(9)),
        changeable: parse_number("changeable", field(10)),
        created: parse_timestamp("created", field(11)),
        updated: parse_timestamp("updated", field(12)),
        average_signal: parse_number("averageSignal", field(13)),
    })
}

fn field_count(record: &StringRecord) -> usize {
    (0..record.len())
        .rposition(|i| !record[i].is_empty())
        .map_or(0, |last| last + 1)
}

fn parse_number<T: FromStr>(column: &str, value: &str) -> Option<T> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match value.parse() {
        Ok(number) => Some(number),
        Err(_) => {
            tracing::warn!(column, value, "unparsable number, storing null");
            None
        }
    }
}

/// Unix epoch seconds to a UTC timestamp.
fn parse_timestamp(column: &str, value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        tracing::debug!(column, "empty timestamp, storing null");
        return None;
    }
    let timestamp = value
        .parse::<i64>()
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single());
    if timestamp.is_none() {
        tracing::warn!(column, value, "unparsable timestamp, storing null");
    }
    timestamp
}
