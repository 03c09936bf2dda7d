#![allow(dead_code)]

use airsent::{normalize, source, CleanDataset, NormalizeSettings, ReadOptions};
use std::fs;
use std::path::{Path, PathBuf};

/// Header of the Kaggle "Twitter US Airline Sentiment" export.
pub const HEADER: &str = "tweet_id,airline_sentiment,airline_sentiment_confidence,negativereason,\
negativereason_confidence,airline,name,text,tweet_coord,tweet_created,tweet_location,user_timezone";

/// One raw export row; fields left empty are written as empty CSV cells.
#[derive(Clone, Debug)]
pub struct RawRow {
    pub created: String,
    pub airline: String,
    pub sentiment: String,
    pub confidence: String,
    pub reason: String,
    pub reason_confidence: String,
    pub text: String,
}

impl RawRow {
    pub fn new(created: &str, airline: &str, sentiment: &str) -> Self {
        Self {
            created: created.to_string(),
            airline: airline.to_string(),
            sentiment: sentiment.to_string(),
            confidence: "1.0".to_string(),
            reason: String::new(),
            reason_confidence: String::new(),
            text: format!("@{} tweet", airline.replace(' ', "")),
        }
    }

    pub fn reason(mut self, reason: &str, confidence: &str) -> Self {
        self.reason = reason.to_string();
        self.reason_confidence = confidence.to_string();
        self
    }

    pub fn confidence(mut self, confidence: &str) -> Self {
        self.confidence = confidence.to_string();
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

pub fn raw_csv(rows: &[RawRow]) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    for (i, r) in rows.iter().enumerate() {
        let fields = [
            (570_000_000_000_000_000u64 + i as u64).to_string(),
            r.sentiment.clone(),
            r.confidence.clone(),
            r.reason.clone(),
            r.reason_confidence.clone(),
            r.airline.clone(),
            "someone".to_string(),
            r.text.clone(),
            String::new(),
            r.created.clone(),
            String::new(),
            "Eastern Time (US & Canada)".to_string(),
        ];
        let line: Vec<String> = fields.iter().map(|f| quote(f)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

pub fn write_raw_csv(dir: &Path, rows: &[RawRow]) -> PathBuf {
    let path = dir.join("Tweets.csv");
    fs::write(&path, raw_csv(rows)).unwrap();
    path
}

/// Writes `rows` as a raw export and runs the normalizer over it.
pub fn clean_dataset(rows: &[RawRow]) -> CleanDataset {
    let dir = tempfile::tempdir().unwrap();
    let path = write_raw_csv(dir.path(), rows);
    let raw = source::read_raw(&path, &ReadOptions::default()).unwrap();
    normalize(&raw, &NormalizeSettings::default()).unwrap().dataset
}

/// A small export spanning three airlines and a week of February 2015.
pub fn sample_rows() -> Vec<RawRow> {
    vec![
        RawRow::new("2015-02-16 09:15:00 -0800", "Virgin America", "positive")
            .text("@VirginAmerica great crew today"),
        RawRow::new("2015-02-16 10:20:00 -0800", "United", "negative")
            .reason("Late Flight", "0.6837")
            .confidence("0.6837")
            .text("@united late again, missed my connection"),
        RawRow::new("2015-02-17 14:02:00 -0500", "Delta", "neutral")
            .confidence("0.6340")
            .text("@Delta what time does boarding start?"),
        RawRow::new("2015-02-18 23:59:59 -0800", "United", "negative")
            .reason("Customer Service Issue", "1.0")
            .text("@united worst service ever"),
        RawRow::new("2015-02-20 06:30:00 -0500", "Delta", "negative")
            .reason("Cancelled Flight", "0.7033")
            .confidence("0.7033")
            .text("@Delta cancelled, no rebooking"),
        RawRow::new("2015-02-20 12:00:00 -0800", "Virgin America", "positive")
            .confidence("0.3486")
            .text(""),
        RawRow::new("2015-02-22 17:45:00 -0800", "United", "neutral").confidence("0.6769"),
    ]
}
