//! The `clean`, `query` and `info` stages. Each writes its human-readable
//! output to the given writer so it can be captured in tests.

use crate::aggregate::{aggregate, ViewKind, ViewParams, ViewResult};
use crate::chart_spec::{chart_spec, NO_DATA_MESSAGE, NO_HEATMAP_MESSAGE, NO_TEXT_MESSAGE};
use crate::config::AppConfig;
use crate::filter::{filter, DateRange, FilterSpec};
use crate::normalize::{normalize, NormalizeReport, NormalizeSettings, Normalized};
use crate::schema::Weekday;
use crate::source::{self, ReadOptions};
use crate::store::CleanDataset;
use airsent_cli::{CleanArgs, InfoArgs, OutputFormat, QueryArgs};
use chrono::NaiveDate;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use std::io::Write;

/// Reads the raw export, cleans it and writes the snapshot.
pub fn run_clean<W: Write>(
    args: &CleanArgs,
    config: &AppConfig,
    out: &mut W,
) -> Result<NormalizeReport> {
    check_clean_paths(args, config)?;
    let input = args
        .input
        .clone()
        .unwrap_or_else(|| config.paths.raw_input.clone());
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| config.paths.snapshot.clone());

    let options = ReadOptions::from_args_and_config(args, config);
    let raw = source::read_raw(&input, &options)?;
    let Normalized { dataset, report } =
        normalize(&raw, &NormalizeSettings::from_config(config))?;
    dataset.write_snapshot(&output)?;

    writeln!(out, "Read {} rows from {}", report.raw_rows, input.display())?;
    writeln!(
        out,
        "Dropped {} rows with unparseable timestamps",
        report.dropped_rows
    )?;
    writeln!(
        out,
        "Filled {} missing negative reasons and {} missing reason confidences",
        report.defaulted_negative_reason, report.defaulted_negative_reason_confidence
    )?;
    if report.unknown_sentiment > 0 || report.missing_entity > 0 {
        writeln!(
            out,
            "Kept {} rows without a known sentiment and {} rows without an airline",
            report.unknown_sentiment, report.missing_entity
        )?;
    }
    writeln!(out, "Wrote {} rows to {}", report.clean_rows, output.display())?;
    Ok(report)
}

fn parse_date(value: &str, flag: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .wrap_err_with(|| format!("{} expects a date like 2015-02-17, got '{}'", flag, value))
}

/// Filter for a query: omitted airlines select every airline, omitted dates
/// take the snapshot's bounds. Reversed dates are kept as given.
pub fn filter_spec_from_args(args: &QueryArgs, dataset: &CleanDataset) -> Result<FilterSpec> {
    let entities = if args.airlines.is_empty() {
        dataset.entities()?
    } else {
        args.airlines.clone()
    };

    let (lo, hi) = dataset
        .date_bounds()?
        .unwrap_or((NaiveDate::MIN, NaiveDate::MAX));
    let start = match &args.from {
        Some(value) => parse_date(value, "--from")?,
        None => lo,
    };
    let end = match &args.to {
        Some(value) => parse_date(value, "--to")?,
        None => hi,
    };

    Ok(FilterSpec::new(entities, DateRange::new(start, end)))
}

/// Filters the snapshot, computes one view and prints it.
pub fn run_query<W: Write>(args: &QueryArgs, config: &AppConfig, out: &mut W) -> Result<ViewResult> {
    let snapshot = args
        .snapshot
        .clone()
        .unwrap_or_else(|| config.paths.snapshot.clone());
    let dataset = CleanDataset::read_snapshot(&snapshot)?;

    let spec = filter_spec_from_args(args, &dataset)?;
    let subset = filter(&dataset, &spec);
    let params = ViewParams {
        token_sentiment: args
            .sentiment
            .map(Into::into)
            .unwrap_or(config.query.token_sentiment),
    };
    let result = aggregate(&subset, ViewKind::from(args.view), &params)?;

    match args.format {
        OutputFormat::Text => write_text(&result, out)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &result)?;
            writeln!(out)?;
        }
        OutputFormat::Chart => {
            serde_json::to_writer_pretty(&mut *out, &chart_spec(&result, &config.chart))?;
            writeln!(out)?;
        }
    }
    Ok(result)
}

/// Prints row count, airlines and date bounds of a snapshot.
pub fn run_info<W: Write>(args: &InfoArgs, config: &AppConfig, out: &mut W) -> Result<()> {
    let snapshot = args
        .snapshot
        .clone()
        .unwrap_or_else(|| config.paths.snapshot.clone());
    let dataset = CleanDataset::read_snapshot(&snapshot)?;

    writeln!(out, "Snapshot: {}", snapshot.display())?;
    writeln!(out, "Rows: {}", dataset.len())?;
    match dataset.date_bounds()? {
        Some((lo, hi)) => writeln!(out, "Dates: {} to {}", lo, hi)?,
        None => writeln!(out, "Dates: none")?,
    }
    let entities = dataset.entities()?;
    writeln!(out, "Airlines ({}): {}", entities.len(), entities.join(", "))?;
    Ok(())
}

fn write_text<W: Write>(result: &ViewResult, out: &mut W) -> Result<()> {
    match result {
        ViewResult::Empty { view } => {
            let message = if *view == ViewKind::ComplaintHeatmap {
                NO_HEATMAP_MESSAGE
            } else {
                NO_DATA_MESSAGE
            };
            writeln!(out, "{}", message)?;
        }
        ViewResult::NoText { .. } => writeln!(out, "{}", NO_TEXT_MESSAGE)?,
        ViewResult::GlobalProportion(rows) => {
            let total: u64 = rows.iter().map(|r| r.count).sum();
            for r in rows {
                let share = r.count as f64 / total as f64 * 100.0;
                writeln!(out, "{:<10} {:>7} {:>6.1}%", r.sentiment, r.count, share)?;
            }
        }
        ViewResult::TimeSeries(rows) => {
            for r in rows {
                writeln!(out, "{} {:<10} {:>7}", r.date, r.sentiment, r.count)?;
            }
        }
        ViewResult::EntityComparison(rows) => {
            let width = rows.iter().map(|r| r.entity.len()).max().unwrap_or(0);
            for r in rows {
                writeln!(
                    out,
                    "{:<width$} {:<10} {:>7}",
                    r.entity,
                    r.sentiment,
                    r.count,
                    width = width
                )?;
            }
        }
        ViewResult::ConfidenceDistribution(groups) => {
            for g in groups {
                let s = &g.summary;
                writeln!(
                    out,
                    "{:<10} n={} min={:.4} q1={:.4} median={:.4} q3={:.4} max={:.4} mean={:.4} outliers={}",
                    g.sentiment,
                    s.count,
                    s.min,
                    s.q1,
                    s.median,
                    s.q3,
                    s.max,
                    s.mean,
                    s.outliers.len()
                )?;
            }
        }
        ViewResult::ComplaintHeatmap(heatmap) => {
            write!(out, "{:<10}", "")?;
            for hour in 0..24 {
                write!(out, "{:>4}", hour)?;
            }
            writeln!(out)?;
            for day in Weekday::ALL {
                write!(out, "{:<10}", day.name())?;
                for count in heatmap.row(day) {
                    write!(out, "{:>4}", count)?;
                }
                writeln!(out)?;
            }
        }
        ViewResult::TokenAggregation(tokens) => {
            writeln!(
                out,
                "{} tokens from {} {} tweets",
                tokens.tokens.len(),
                tokens.documents,
                tokens.sentiment
            )?;
            writeln!(out, "{}", tokens.tokens.join(" "))?;
        }
        ViewResult::Summary(m) => {
            writeln!(out, "Total tweets: {}", m.total)?;
            writeln!(
                out,
                "Negative tweets: {} ({:.1}% of total)",
                m.negative, m.negative_pct
            )?;
            writeln!(out, "Selected airlines: {}", m.selected_entities)?;
        }
    }
    Ok(())
}

/// Rejects a configuration that would make the clean stage overwrite its own input.
fn check_clean_paths(args: &CleanArgs, config: &AppConfig) -> Result<()> {
    let input = args.input.as_ref().unwrap_or(&config.paths.raw_input);
    let output = args.output.as_ref().unwrap_or(&config.paths.snapshot);
    let same_file = match (std::fs::canonicalize(input), std::fs::canonicalize(output)) {
        (Ok(a), Ok(b)) => a == b,
        _ => input == output,
    };
    if same_file {
        return Err(eyre!(
            "Snapshot path {} is the raw input; choose a different --output",
            output.display()
        ));
    }
    Ok(())
}
