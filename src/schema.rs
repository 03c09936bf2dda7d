//! Clean record schema: column names, closed categorical domains and the typed row.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const CREATED_AT: &str = "created_at";
pub const DATE: &str = "date";
pub const HOUR: &str = "hour";
pub const DAY_NAME: &str = "day_name";
pub const ENTITY: &str = "entity";
pub const SENTIMENT: &str = "sentiment";
pub const SENTIMENT_CONFIDENCE: &str = "sentiment_confidence";
pub const NEGATIVE_REASON: &str = "negative_reason";
pub const NEGATIVE_REASON_CONFIDENCE: &str = "negative_reason_confidence";
pub const TEXT: &str = "text";

/// Snapshot column order. Never reorder: the snapshot is a cross-process contract.
pub const CLEAN_COLUMNS: [&str; 10] = [
    CREATED_AT,
    DATE,
    HOUR,
    DAY_NAME,
    ENTITY,
    SENTIMENT,
    SENTIMENT_CONFIDENCE,
    NEGATIVE_REASON,
    NEGATIVE_REASON_CONFIDENCE,
    TEXT,
];

/// Stored in place of an absent negative reason.
pub const NO_NEGATIVE_REASON: &str = "Positive/Neutral";

/// Serialized form of `created_at` in snapshots.
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f %z";

const UNIX_EPOCH_CE_DAYS: i32 = 719_163;

/// Days since 1970-01-01, the physical representation of a polars `Date`.
pub(crate) fn date_to_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_CE_DAYS
}

pub(crate) fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(UNIX_EPOCH_CE_DAYS.saturating_add(days))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(Sentiment::Positive),
            "neutral" => Ok(Sentiment::Neutral),
            "negative" => Ok(Sentiment::Negative),
            other => Err(format!("unknown sentiment label '{}'", other)),
        }
    }
}

impl From<airsent_cli::SentimentArg> for Sentiment {
    fn from(arg: airsent_cli::SentimentArg) -> Self {
        match arg {
            airsent_cli::SentimentArg::Positive => Sentiment::Positive,
            airsent_cli::SentimentArg::Neutral => Sentiment::Neutral,
            airsent_cli::SentimentArg::Negative => Sentiment::Negative,
        }
    }
}

/// Day of week ordered Monday first. Derived `Ord` follows declaration order,
/// so sorting by `Weekday` is week order, not alphabetical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// 0 for Monday through 6 for Sunday.
    pub fn rank(&self) -> usize {
        *self as usize
    }

    pub fn from_rank(rank: usize) -> Option<Self> {
        Self::ALL.get(rank).copied()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        Self::ALL[day.num_days_from_monday() as usize]
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Weekday {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .iter()
            .find(|d| d.name().eq_ignore_ascii_case(trimmed))
            .copied()
            .ok_or_else(|| format!("unknown weekday '{}'", trimmed))
    }
}

/// One validated row of the clean dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanRecord {
    pub created_at: DateTime<FixedOffset>,
    pub date: NaiveDate,
    pub hour: u32,
    pub day_name: Weekday,
    /// `None` when the raw row had no airline.
    pub entity: Option<String>,
    /// `None` when the raw label was blank or outside the closed set.
    pub sentiment: Option<Sentiment>,
    /// `None` when missing, unparseable or outside [0, 1].
    pub sentiment_confidence: Option<f64>,
    pub negative_reason: String,
    pub negative_reason_confidence: f64,
    pub text: String,
}

impl CleanRecord {
    /// Builds a record whose calendar fields are derived from `created_at`.
    pub fn from_timestamp(created_at: DateTime<FixedOffset>) -> Self {
        Self {
            created_at,
            date: created_at.date_naive(),
            hour: created_at.hour(),
            day_name: created_at.weekday().into(),
            entity: None,
            sentiment: None,
            sentiment_confidence: None,
            negative_reason: NO_NEGATIVE_REASON.to_string(),
            negative_reason_confidence: 0.0,
            text: String::new(),
        }
    }

    /// Checks the invariants that the normalizer guarantees. Returns the first
    /// violation found.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.date != self.created_at.date_naive() {
            return Err(format!(
                "date {} does not match created_at {}",
                self.date, self.created_at
            ));
        }
        if self.hour > 23 || self.hour != self.created_at.hour() {
            return Err(format!(
                "hour {} does not match created_at {}",
                self.hour, self.created_at
            ));
        }
        if self.day_name != Weekday::from(self.created_at.weekday()) {
            return Err(format!(
                "day_name {} does not match created_at {}",
                self.day_name, self.created_at
            ));
        }
        if self.negative_reason.trim().is_empty() {
            return Err("negative_reason is empty".to_string());
        }
        if !self.negative_reason_confidence.is_finite() {
            return Err("negative_reason_confidence is not a number".to_string());
        }
        if let Some(c) = self.sentiment_confidence {
            if !(0.0..=1.0).contains(&c) {
                return Err(format!("sentiment_confidence {} is outside [0, 1]", c));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekday_rank_is_monday_first() {
        assert_eq!(Weekday::Monday.rank(), 0);
        assert_eq!(Weekday::Sunday.rank(), 6);
        assert_eq!(Weekday::from_rank(4), Some(Weekday::Friday));
        assert_eq!(Weekday::from_rank(7), None);

        let mut days = vec![Weekday::Thursday, Weekday::Friday, Weekday::Monday];
        days.sort();
        assert_eq!(days, vec![Weekday::Monday, Weekday::Thursday, Weekday::Friday]);
    }

    #[test]
    fn weekday_from_chrono() {
        assert_eq!(Weekday::from(chrono::Weekday::Mon), Weekday::Monday);
        assert_eq!(Weekday::from(chrono::Weekday::Sun), Weekday::Sunday);
        assert_eq!("saturday".parse::<Weekday>(), Ok(Weekday::Saturday));
        assert!("Caturday".parse::<Weekday>().is_err());
    }

    #[test]
    fn sentiment_parse_is_case_insensitive() {
        assert_eq!(" Negative ".parse::<Sentiment>(), Ok(Sentiment::Negative));
        assert_eq!("POSITIVE".parse::<Sentiment>(), Ok(Sentiment::Positive));
        assert!("angry".parse::<Sentiment>().is_err());
    }

    #[test]
    fn days_round_trip() {
        let d = NaiveDate::from_ymd_opt(2015, 2, 24).unwrap();
        assert_eq!(date_to_days(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()), 0);
        assert_eq!(days_to_date(date_to_days(d)), Some(d));
    }

    #[test]
    fn record_from_timestamp_uses_local_wall_time() {
        let ts = DateTime::parse_from_str("2015-02-24 23:35:52 -0800", CREATED_AT_FORMAT).unwrap();
        let record = CleanRecord::from_timestamp(ts);
        assert_eq!(record.hour, 23);
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2015, 2, 24).unwrap());
        assert_eq!(record.day_name, Weekday::Tuesday);
        assert_eq!(record.negative_reason, NO_NEGATIVE_REASON);
        assert_eq!(record.negative_reason_confidence, 0.0);
        assert!(record.check_invariants().is_ok());
    }

    #[test]
    fn invariants_catch_inconsistent_calendar_fields() {
        let ts = DateTime::parse_from_str("2015-02-24 11:00:00 +0000", CREATED_AT_FORMAT).unwrap();
        let mut record = CleanRecord::from_timestamp(ts);
        record.hour = 12;
        assert!(record.check_invariants().is_err());

        let mut record = CleanRecord::from_timestamp(ts);
        record.negative_reason = "  ".to_string();
        assert!(record.check_invariants().is_err());
    }
}
