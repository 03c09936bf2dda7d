//! The clean dataset: built once by the normalizer, read-only afterwards.
//!
//! The snapshot file (CSV, optionally compressed) is the contract between the
//! cleaning stage and every query, so its column order is fixed by
//! [`CLEAN_COLUMNS`] and its bytes are a pure function of the records.

use crate::error::{PipelineError, PipelineResult};
use crate::normalize::{non_blank, parse_f64};
use crate::schema::*;
use crate::source::{self, CompressedWriter, ReadOptions};
use airsent_cli::CompressionFormat;
use chrono::{DateTime, NaiveDate};
use polars::prelude::*;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

#[derive(Debug, Clone)]
pub struct CleanDataset {
    df: DataFrame,
}

impl CleanDataset {
    /// Builds the typed frame. Records are stored in the order given.
    pub fn from_records(records: &[CleanRecord]) -> PipelineResult<Self> {
        let created_at: Vec<String> = records
            .iter()
            .map(|r| r.created_at.format(CREATED_AT_FORMAT).to_string())
            .collect();
        let date: Vec<i32> = records.iter().map(|r| date_to_days(r.date)).collect();
        let hour: Vec<u32> = records.iter().map(|r| r.hour).collect();
        let day_name: Vec<&str> = records.iter().map(|r| r.day_name.name()).collect();
        let entity: Vec<Option<&str>> = records.iter().map(|r| r.entity.as_deref()).collect();
        let sentiment: Vec<Option<&str>> = records
            .iter()
            .map(|r| r.sentiment.map(|s| s.as_str()))
            .collect();
        let sentiment_confidence: Vec<Option<f64>> =
            records.iter().map(|r| r.sentiment_confidence).collect();
        let negative_reason: Vec<&str> = records
            .iter()
            .map(|r| r.negative_reason.as_str())
            .collect();
        let negative_reason_confidence: Vec<f64> = records
            .iter()
            .map(|r| r.negative_reason_confidence)
            .collect();
        let text: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();

        let columns: Vec<Column> = vec![
            Series::new(CREATED_AT.into(), created_at).into(),
            Series::new(DATE.into(), date).cast(&DataType::Date)?.into(),
            Series::new(HOUR.into(), hour).into(),
            Series::new(DAY_NAME.into(), day_name).into(),
            Series::new(ENTITY.into(), entity).into(),
            Series::new(SENTIMENT.into(), sentiment).into(),
            Series::new(SENTIMENT_CONFIDENCE.into(), sentiment_confidence).into(),
            Series::new(NEGATIVE_REASON.into(), negative_reason).into(),
            Series::new(NEGATIVE_REASON_CONFIDENCE.into(), negative_reason_confidence).into(),
            Series::new(TEXT.into(), text).into(),
        ];
        let df = DataFrame::new(columns)?;
        Ok(Self { df })
    }

    pub fn len(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    /// A lazy plan over the stored frame. The frame's buffers are shared, not copied.
    pub fn lazy(&self) -> LazyFrame {
        self.df.clone().lazy()
    }

    /// Typed view of every stored row, in storage order.
    pub fn records(&self) -> PipelineResult<Vec<CleanRecord>> {
        records_from_frame(&self.df)
    }

    /// Sorted distinct non-null entities.
    pub fn entities(&self) -> PipelineResult<Vec<String>> {
        let entity = self.df.column(ENTITY)?.str()?;
        let distinct: BTreeSet<&str> = entity.into_iter().flatten().collect();
        Ok(distinct.into_iter().map(str::to_string).collect())
    }

    /// Earliest and latest stored date, or `None` for an empty dataset.
    pub fn date_bounds(&self) -> PipelineResult<Option<(NaiveDate, NaiveDate)>> {
        let days = self.df.column(DATE)?.cast(&DataType::Int32)?;
        let days = days.i32()?;
        let mut bounds: Option<(i32, i32)> = None;
        for d in days.into_iter().flatten() {
            bounds = Some(match bounds {
                None => (d, d),
                Some((lo, hi)) => (lo.min(d), hi.max(d)),
            });
        }
        Ok(bounds.and_then(|(lo, hi)| Some((days_to_date(lo)?, days_to_date(hi)?))))
    }

    /// The uncompressed snapshot contents.
    pub fn snapshot_bytes(&self) -> PipelineResult<Vec<u8>> {
        let mut df = self.df.clone();
        let mut buf = Vec::new();
        CsvWriter::new(&mut buf)
            .include_header(true)
            .finish(&mut df)?;
        Ok(buf)
    }

    /// Writes the snapshot atomically: the bytes go to a temporary file in the
    /// target directory, which is renamed over `path` only once complete.
    /// A `.gz`, `.zst`, `.bz2` or `.xz` extension compresses the output.
    pub fn write_snapshot(&self, path: &Path) -> PipelineResult<()> {
        let bytes = self.snapshot_bytes()?;
        let compression = CompressionFormat::from_extension(path);
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        let mut writer = CompressedWriter::new(tmp.as_file_mut(), compression)?;
        writer.write_all(&bytes)?;
        writer.finish()?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;

        tracing::info!(
            path = %path.display(),
            rows = self.len(),
            compression = compression.map(|c| c.extension()).unwrap_or("none"),
            "snapshot written"
        );
        Ok(())
    }

    /// Reads a snapshot and re-validates every row against the clean-record invariants.
    pub fn read_snapshot(path: &Path) -> PipelineResult<Self> {
        let bytes = source::read_all(path, CompressionFormat::from_extension(path))?;
        let raw = source::parse_csv_as_strings(bytes, &ReadOptions::default())?;
        let records = records_from_snapshot(&raw)?;
        tracing::debug!(path = %path.display(), rows = records.len(), "snapshot read");
        Self::from_records(&records)
    }
}

fn records_from_frame(df: &DataFrame) -> PipelineResult<Vec<CleanRecord>> {
    let created_at = df.column(CREATED_AT)?.str()?;
    let date = df.column(DATE)?.cast(&DataType::Int32)?;
    let date = date.i32()?;
    let hour = df.column(HOUR)?.u32()?;
    let day_name = df.column(DAY_NAME)?.str()?;
    let entity = df.column(ENTITY)?.str()?;
    let sentiment = df.column(SENTIMENT)?.str()?;
    let sentiment_confidence = df.column(SENTIMENT_CONFIDENCE)?.f64()?;
    let negative_reason = df.column(NEGATIVE_REASON)?.str()?;
    let negative_reason_confidence = df.column(NEGATIVE_REASON_CONFIDENCE)?.f64()?;
    let text = df.column(TEXT)?.str()?;

    let mut records = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let row = i + 1;
        let created_at = created_at
            .get(i)
            .and_then(|s| DateTime::parse_from_str(s, CREATED_AT_FORMAT).ok())
            .ok_or_else(|| PipelineError::invalid_snapshot(row, "created_at is not a timestamp"))?;
        let record = CleanRecord {
            created_at,
            date: date
                .get(i)
                .and_then(days_to_date)
                .ok_or_else(|| PipelineError::invalid_snapshot(row, "date is null"))?,
            hour: hour
                .get(i)
                .ok_or_else(|| PipelineError::invalid_snapshot(row, "hour is null"))?,
            day_name: day_name
                .get(i)
                .unwrap_or_default()
                .parse()
                .map_err(|e: String| PipelineError::invalid_snapshot(row, e))?,
            entity: entity.get(i).map(str::to_string),
            sentiment: sentiment.get(i).and_then(|s| s.parse().ok()),
            sentiment_confidence: sentiment_confidence.get(i),
            negative_reason: negative_reason.get(i).unwrap_or_default().to_string(),
            negative_reason_confidence: negative_reason_confidence.get(i).unwrap_or(0.0),
            text: text.get(i).unwrap_or_default().to_string(),
        };
        records.push(record);
    }
    Ok(records)
}

/// Decodes a string-typed snapshot frame. Unlike the normalizer, nothing is
/// defaulted here: a row that is not already clean is an error.
fn records_from_snapshot(raw: &DataFrame) -> PipelineResult<Vec<CleanRecord>> {
    let column = |name: &str| source::required_string_column(raw, name);
    let created_at = column(CREATED_AT)?;
    let date = column(DATE)?;
    let hour = column(HOUR)?;
    let day_name = column(DAY_NAME)?;
    let entity = column(ENTITY)?;
    let sentiment = column(SENTIMENT)?;
    let sentiment_confidence = column(SENTIMENT_CONFIDENCE)?;
    let negative_reason = column(NEGATIVE_REASON)?;
    let negative_reason_confidence = column(NEGATIVE_REASON_CONFIDENCE)?;
    let text = column(TEXT)?;

    let mut records = Vec::with_capacity(raw.height());
    for i in 0..raw.height() {
        let row = i + 1;
        let invalid = |reason: String| PipelineError::invalid_snapshot(row, reason);

        let created_at_raw = non_blank(created_at.get(i))
            .ok_or_else(|| invalid("created_at is empty".to_string()))?;
        let created_at = DateTime::parse_from_str(created_at_raw, CREATED_AT_FORMAT)
            .map_err(|e| invalid(format!("created_at '{}': {}", created_at_raw, e)))?;

        let date_raw = non_blank(date.get(i)).unwrap_or_default();
        let date = NaiveDate::parse_from_str(date_raw, "%Y-%m-%d")
            .map_err(|e| invalid(format!("date '{}': {}", date_raw, e)))?;

        let hour_raw = non_blank(hour.get(i)).unwrap_or_default();
        let hour = hour_raw
            .parse::<u32>()
            .map_err(|e| invalid(format!("hour '{}': {}", hour_raw, e)))?;

        let day_name = non_blank(day_name.get(i))
            .unwrap_or_default()
            .parse::<Weekday>()
            .map_err(invalid)?;

        let sentiment = match non_blank(sentiment.get(i)) {
            Some(label) => Some(label.parse::<Sentiment>().map_err(invalid)?),
            None => None,
        };

        let sentiment_confidence = match non_blank(sentiment_confidence.get(i)) {
            Some(v) => Some(
                parse_f64(Some(v))
                    .ok_or_else(|| invalid(format!("sentiment_confidence '{}'", v)))?,
            ),
            None => None,
        };

        let negative_reason_confidence_raw = negative_reason_confidence.get(i);
        let negative_reason_confidence = parse_f64(negative_reason_confidence_raw)
            .ok_or_else(|| {
                invalid(format!(
                    "negative_reason_confidence '{}'",
                    negative_reason_confidence_raw.unwrap_or_default()
                ))
            })?;

        let record = CleanRecord {
            created_at,
            date,
            hour,
            day_name,
            entity: non_blank(entity.get(i)).map(str::to_string),
            sentiment,
            sentiment_confidence,
            negative_reason: negative_reason.get(i).unwrap_or_default().to_string(),
            negative_reason_confidence,
            text: text.get(i).unwrap_or_default().to_string(),
        };
        record.check_invariants().map_err(invalid)?;
        records.push(record);
    }
    Ok(records)
}
