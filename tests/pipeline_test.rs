mod common;

use airsent::commands::run_clean;
use airsent::schema::NO_NEGATIVE_REASON;
use airsent::{AppConfig, CleanDataset, PipelineError, Sentiment, Weekday};
use airsent_cli::CleanArgs;
use common::{clean_dataset, raw_csv, sample_rows, write_raw_csv, RawRow};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

fn clean_args(input: &Path, output: &Path) -> CleanArgs {
    CleanArgs {
        input: Some(input.to_path_buf()),
        output: Some(output.to_path_buf()),
        ..CleanArgs::default()
    }
}

#[test]
fn test_missing_reason_gets_sentinel_and_zero_confidence() {
    let dataset = clean_dataset(&[
        RawRow::new("2015-02-24 11:35:52 -0800", "Virgin America", "positive"),
        RawRow::new("2015-02-24 11:40:00 -0800", "United", "negative").reason("Bad Flight", "0.7"),
    ]);
    let records = dataset.records().unwrap();
    assert_eq!(records.len(), 2);

    assert_eq!(records[0].negative_reason, NO_NEGATIVE_REASON);
    assert_eq!(records[0].negative_reason, "Positive/Neutral");
    assert_eq!(records[0].negative_reason_confidence, 0.0);

    assert_eq!(records[1].negative_reason, "Bad Flight");
    assert_eq!(records[1].negative_reason_confidence, 0.7);
}

#[test]
fn test_bad_timestamp_drops_exactly_one_row() {
    let mut rows = sample_rows();
    let before = clean_dataset(&rows).len();
    rows.push(RawRow::new("Tuesday morning", "Delta", "negative"));
    rows.push(RawRow::new("2015-02-23 08:00:00 -0800", "Delta", "negative"));
    let after = clean_dataset(&rows).len();
    assert_eq!(after, before + 1);
}

#[test]
fn test_derived_fields_follow_local_timestamp() {
    let dataset = clean_dataset(&[RawRow::new(
        "2015-02-22 23:30:00 -0800",
        "Delta",
        "neutral",
    )]);
    let record = &dataset.records().unwrap()[0];
    assert_eq!(record.date.to_string(), "2015-02-22");
    assert_eq!(record.hour, 23);
    assert_eq!(record.day_name, Weekday::Sunday);
}

#[test]
fn test_clean_records_satisfy_invariants() {
    let mut rows = sample_rows();
    rows.push(RawRow::new("", "United", "negative"));
    rows.push(RawRow::new("2015-02-19 13:00:00 -0800", "", "angry"));
    let raw_count = rows.len();

    let dataset = clean_dataset(&rows);
    assert!(dataset.len() <= raw_count);
    assert_eq!(dataset.len(), raw_count - 1);

    for record in dataset.records().unwrap() {
        record.check_invariants().unwrap();
        assert!(record.hour <= 23);
        assert!(!record.negative_reason.is_empty());
    }
}

#[test]
fn test_unknown_sentiment_and_missing_airline_are_kept_as_missing() {
    let dataset = clean_dataset(&[RawRow::new("2015-02-19 13:00:00 -0800", "", "angry")]);
    let record = &dataset.records().unwrap()[0];
    assert_eq!(record.entity, None);
    assert_eq!(record.sentiment, None);
}

#[test]
fn test_run_clean_writes_snapshot_and_reports() {
    let temp = TempDir::new().unwrap();
    let input = write_raw_csv(temp.path(), &sample_rows());
    let output = temp.path().join("tweets_clean.csv");

    let mut out = Vec::new();
    let report = run_clean(&clean_args(&input, &output), &AppConfig::default(), &mut out).unwrap();
    assert_eq!(report.raw_rows, 7);
    assert_eq!(report.clean_rows, 7);
    assert_eq!(report.dropped_rows, 0);
    assert_eq!(report.defaulted_negative_reason, 4);

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Read 7 rows"), "got: {}", text);
    assert!(text.contains("Wrote 7 rows"), "got: {}", text);

    let snapshot = CleanDataset::read_snapshot(&output).unwrap();
    assert_eq!(snapshot.len(), 7);
    let negatives = snapshot
        .records()
        .unwrap()
        .iter()
        .filter(|r| r.sentiment == Some(Sentiment::Negative))
        .count();
    assert_eq!(negatives, 3);
}

#[test]
fn test_run_clean_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let input = write_raw_csv(temp.path(), &sample_rows());
    let first = temp.path().join("first.csv");
    let second = temp.path().join("second.csv");
    let config = AppConfig::default();

    run_clean(&clean_args(&input, &first), &config, &mut Vec::new()).unwrap();
    run_clean(&clean_args(&input, &second), &config, &mut Vec::new()).unwrap();
    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());

    // Rewriting over an existing snapshot yields the same bytes too.
    run_clean(&clean_args(&input, &first), &config, &mut Vec::new()).unwrap();
    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn test_run_clean_missing_source_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("absent.csv");
    let output = temp.path().join("tweets_clean.csv");

    let err = run_clean(&clean_args(&input, &output), &AppConfig::default(), &mut Vec::new())
        .unwrap_err();
    let pipeline = err.downcast_ref::<PipelineError>().unwrap();
    assert!(matches!(pipeline, PipelineError::SourceUnavailable { .. }));
    assert!(!output.exists());
}

#[test]
fn test_run_clean_rejects_output_equal_to_input() {
    let temp = TempDir::new().unwrap();
    let input = write_raw_csv(temp.path(), &sample_rows());
    let original = fs::read(&input).unwrap();

    let result = run_clean(&clean_args(&input, &input), &AppConfig::default(), &mut Vec::new());
    assert!(result.is_err());
    assert_eq!(fs::read(&input).unwrap(), original);
}

#[test]
fn test_run_clean_rejects_output_aliasing_input() {
    let temp = TempDir::new().unwrap();
    let input = write_raw_csv(temp.path(), &sample_rows());
    fs::create_dir(temp.path().join("sub")).unwrap();
    let alias = temp.path().join("sub").join("..").join("Tweets.csv");
    assert_ne!(alias, input);
    let original = fs::read(&input).unwrap();

    let result = run_clean(&clean_args(&input, &alias), &AppConfig::default(), &mut Vec::new());
    assert!(result.is_err());
    assert_eq!(fs::read(&input).unwrap(), original);
}

#[test]
fn test_run_clean_reads_gzip_input() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("Tweets.csv.gz");
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw_csv(&sample_rows()).as_bytes()).unwrap();
    fs::write(&input, encoder.finish().unwrap()).unwrap();
    let output = temp.path().join("tweets_clean.csv");

    let report = run_clean(&clean_args(&input, &output), &AppConfig::default(), &mut Vec::new())
        .unwrap();
    assert_eq!(report.clean_rows, 7);
}

#[test]
fn test_run_clean_missing_required_column() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("Tweets.csv");
    fs::write(&input, "tweet_id,tweet_created,text\n1,2015-02-24 11:35:52 -0800,hi\n").unwrap();
    let output = temp.path().join("tweets_clean.csv");

    let err = run_clean(&clean_args(&input, &output), &AppConfig::default(), &mut Vec::new())
        .unwrap_err();
    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::MissingColumn { column }) => assert_eq!(column, "airline"),
        other => panic!("expected MissingColumn, got {:?}", other),
    }
    assert!(!output.exists());
}
