//! Raw export → clean dataset.
//!
//! Rows whose timestamp does not parse are dropped. Every other defect is
//! absorbed: the row is kept and the field takes its missing-value form.

use crate::config::{AppConfig, ColumnsConfig, NormalizeConfig};
use crate::error::PipelineResult;
use crate::schema::{CleanRecord, Sentiment, NO_NEGATIVE_REASON};
use crate::source;
use crate::store::CleanDataset;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use polars::prelude::*;
use serde::Serialize;

/// Where to find each field in the raw export and how to read timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeSettings {
    pub columns: ColumnsConfig,
    pub timestamp_formats: Vec<String>,
}

impl Default for NormalizeSettings {
    fn default() -> Self {
        Self {
            columns: ColumnsConfig::default(),
            timestamp_formats: NormalizeConfig::default().timestamp_formats,
        }
    }
}

impl NormalizeSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            columns: config.columns.clone(),
            timestamp_formats: config.normalize.timestamp_formats.clone(),
        }
    }
}

/// Counts of what the normalizer did to the raw rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    pub raw_rows: usize,
    pub clean_rows: usize,
    /// Rows removed because their timestamp did not parse.
    pub dropped_rows: usize,
    pub defaulted_negative_reason: usize,
    pub defaulted_negative_reason_confidence: usize,
    /// Blank or unrecognised sentiment labels (row kept, sentiment unset).
    pub unknown_sentiment: usize,
    pub missing_entity: usize,
    /// Confidence values that were blank, unparseable or outside [0, 1].
    pub invalid_confidence: usize,
}

#[derive(Debug, Clone)]
pub struct Normalized {
    pub dataset: CleanDataset,
    pub report: NormalizeReport,
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parses a finite float, ignoring surrounding whitespace.
pub(crate) fn parse_f64(value: Option<&str>) -> Option<f64> {
    non_blank(value)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn optional_value(column: &Option<StringChunked>, i: usize) -> Option<&str> {
    column.as_ref().and_then(|c| c.get(i))
}

/// Parses a timestamp with RFC 3339 first, then each format in order.
/// Formats without an offset directive are read as UTC.
pub fn parse_timestamp(value: &str, formats: &[String]) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts);
    }
    let utc = FixedOffset::east_opt(0)?;
    formats.iter().find_map(|format| {
        if format.contains("%z") || format.contains("%:z") || format.contains("%#z") {
            DateTime::parse_from_str(value, format).ok()
        } else {
            NaiveDateTime::parse_from_str(value, format)
                .ok()
                .map(|naive| utc.from_utc_datetime(&naive))
        }
    })
}

/// Cleans a string-typed raw frame into the clean dataset.
pub fn normalize(raw: &DataFrame, settings: &NormalizeSettings) -> PipelineResult<Normalized> {
    let cols = &settings.columns;
    let timestamp = source::required_string_column(raw, &cols.timestamp)?;
    let entity = source::required_string_column(raw, &cols.entity)?;
    let sentiment = source::required_string_column(raw, &cols.sentiment)?;
    let sentiment_confidence = source::string_column(raw, &cols.sentiment_confidence)?;
    let negative_reason = source::string_column(raw, &cols.negative_reason)?;
    let negative_reason_confidence = source::string_column(raw, &cols.negative_reason_confidence)?;
    let text = source::string_column(raw, &cols.text)?;

    for (name, column) in [
        (&cols.sentiment_confidence, &sentiment_confidence),
        (&cols.negative_reason, &negative_reason),
        (&cols.negative_reason_confidence, &negative_reason_confidence),
        (&cols.text, &text),
    ] {
        if column.is_none() {
            tracing::warn!(column = %name, "optional column absent; every row takes its default");
        }
    }

    let mut report = NormalizeReport {
        raw_rows: raw.height(),
        ..NormalizeReport::default()
    };
    let mut records = Vec::with_capacity(raw.height());

    for i in 0..raw.height() {
        let Some(created_at) = timestamp
            .get(i)
            .and_then(|v| parse_timestamp(v, &settings.timestamp_formats))
        else {
            report.dropped_rows += 1;
            continue;
        };
        let mut record = CleanRecord::from_timestamp(created_at);

        record.entity = non_blank(entity.get(i)).map(str::to_string);
        if record.entity.is_none() {
            report.missing_entity += 1;
        }

        record.sentiment = non_blank(sentiment.get(i)).and_then(|s| s.parse::<Sentiment>().ok());
        if record.sentiment.is_none() {
            report.unknown_sentiment += 1;
        }

        record.sentiment_confidence = parse_f64(optional_value(&sentiment_confidence, i))
            .filter(|c| (0.0..=1.0).contains(c));
        if record.sentiment_confidence.is_none() {
            report.invalid_confidence += 1;
        }

        match non_blank(optional_value(&negative_reason, i)) {
            Some(reason) => record.negative_reason = reason.to_string(),
            None => {
                record.negative_reason = NO_NEGATIVE_REASON.to_string();
                report.defaulted_negative_reason += 1;
            }
        }

        match parse_f64(optional_value(&negative_reason_confidence, i)) {
            Some(c) => record.negative_reason_confidence = c,
            None => {
                record.negative_reason_confidence = 0.0;
                report.defaulted_negative_reason_confidence += 1;
            }
        }

        record.text = optional_value(&text, i).unwrap_or_default().to_string();
        records.push(record);
    }

    report.clean_rows = records.len();
    let dataset = CleanDataset::from_records(&records)?;

    tracing::info!(
        raw_rows = report.raw_rows,
        clean_rows = report.clean_rows,
        dropped_rows = report.dropped_rows,
        defaulted_negative_reason = report.defaulted_negative_reason,
        defaulted_negative_reason_confidence = report.defaulted_negative_reason_confidence,
        unknown_sentiment = report.unknown_sentiment,
        missing_entity = report.missing_entity,
        "normalized raw export"
    );

    Ok(Normalized { dataset, report })
}
