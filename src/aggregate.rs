//! Aggregate views over a working subset.
//!
//! Every view is a pure function of the subset. A view with no contributing
//! rows returns [`ViewResult::Empty`] and token aggregation with no text
//! returns [`ViewResult::NoText`], so "nothing to show" is never confused
//! with a zero-valued result or a fault.
//!
//! Rows whose sentiment (or entity, for entity comparison) is unset stay in
//! the dataset but do not contribute to views keyed on that field.

use crate::error::PipelineResult;
use crate::filter::WorkingSubset;
use crate::schema::*;
use crate::statistics::BoxStats;
use airsent_cli::ViewArg;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

const COUNT: &str = "count";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    GlobalProportion,
    TimeSeries,
    EntityComparison,
    ConfidenceDistribution,
    ComplaintHeatmap,
    TokenAggregation,
    Summary,
}

impl ViewKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewKind::GlobalProportion => "global_proportion",
            ViewKind::TimeSeries => "time_series",
            ViewKind::EntityComparison => "entity_comparison",
            ViewKind::ConfidenceDistribution => "confidence_distribution",
            ViewKind::ComplaintHeatmap => "complaint_heatmap",
            ViewKind::TokenAggregation => "token_aggregation",
            ViewKind::Summary => "summary",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ViewArg> for ViewKind {
    fn from(arg: ViewArg) -> Self {
        match arg {
            ViewArg::GlobalProportion => ViewKind::GlobalProportion,
            ViewArg::TimeSeries => ViewKind::TimeSeries,
            ViewArg::EntityComparison => ViewKind::EntityComparison,
            ViewArg::ConfidenceDistribution => ViewKind::ConfidenceDistribution,
            ViewArg::ComplaintHeatmap => ViewKind::ComplaintHeatmap,
            ViewArg::TokenAggregation => ViewKind::TokenAggregation,
            ViewArg::Summary => ViewKind::Summary,
        }
    }
}

/// View-specific arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewParams {
    /// Sentiment whose texts token aggregation concatenates.
    pub token_sentiment: Sentiment,
}

impl Default for ViewParams {
    fn default() -> Self {
        Self {
            token_sentiment: Sentiment::Negative,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentCount {
    pub sentiment: Sentiment,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub sentiment: Sentiment,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityCount {
    pub entity: String,
    pub sentiment: Sentiment,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceGroup {
    pub sentiment: Sentiment,
    /// Every confidence value of the group, full precision, in row order.
    pub values: Vec<f64>,
    pub summary: BoxStats,
}

/// Negative-row counts on a dense weekday × hour grid, Monday first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplaintHeatmap {
    pub counts: [[u64; 24]; 7],
}

impl ComplaintHeatmap {
    pub fn get(&self, day: Weekday, hour: u32) -> u64 {
        self.counts[day.rank()]
            .get(hour as usize)
            .copied()
            .unwrap_or(0)
    }

    pub fn row(&self, day: Weekday) -> &[u64; 24] {
        &self.counts[day.rank()]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    pub fn nonzero_cells(&self) -> usize {
        self.counts.iter().flatten().filter(|c| **c > 0).count()
    }

    pub fn zero_cells(&self) -> usize {
        7 * 24 - self.nonzero_cells()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenSequence {
    pub sentiment: Sentiment,
    /// Non-empty texts that contributed tokens.
    pub documents: usize,
    /// Whitespace-delimited tokens in row order, unmodified.
    pub tokens: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyMetrics {
    pub total: u64,
    pub negative: u64,
    pub negative_pct: f64,
    pub selected_entities: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ViewResult {
    GlobalProportion(Vec<SentimentCount>),
    TimeSeries(Vec<DailyCount>),
    EntityComparison(Vec<EntityCount>),
    ConfidenceDistribution(Vec<ConfidenceGroup>),
    ComplaintHeatmap(ComplaintHeatmap),
    TokenAggregation(TokenSequence),
    Summary(KeyMetrics),
    /// No row contributed to the view.
    Empty { view: ViewKind },
    /// Rows matched, but none of them had text.
    NoText { sentiment: Sentiment },
}

impl ViewResult {
    pub fn is_empty(&self) -> bool {
        matches!(self, ViewResult::Empty { .. } | ViewResult::NoText { .. })
    }
}

/// Computes `view` over `subset`.
pub fn aggregate(
    subset: &WorkingSubset,
    view: ViewKind,
    params: &ViewParams,
) -> PipelineResult<ViewResult> {
    tracing::debug!(view = %view, "aggregating");
    match view {
        ViewKind::GlobalProportion => global_proportion(subset),
        ViewKind::TimeSeries => time_series(subset),
        ViewKind::EntityComparison => entity_comparison(subset),
        ViewKind::ConfidenceDistribution => confidence_distribution(subset),
        ViewKind::ComplaintHeatmap => complaint_heatmap(subset),
        ViewKind::TokenAggregation => token_aggregation(subset, params.token_sentiment),
        ViewKind::Summary => summary(subset),
    }
}

/// Row count per sentiment. Sentiments without rows are omitted.
pub fn global_proportion(subset: &WorkingSubset) -> PipelineResult<ViewResult> {
    let df = grouped_counts(
        subset.lazy().filter(col(SENTIMENT).is_not_null()),
        &[SENTIMENT],
    )?;
    let sentiment = df.column(SENTIMENT)?.str()?;
    let count = df.column(COUNT)?.u64()?;

    let mut rows: Vec<SentimentCount> = sentiment
        .into_iter()
        .zip(count)
        .filter_map(|(s, c)| {
            Some(SentimentCount {
                sentiment: s?.parse().ok()?,
                count: c?,
            })
        })
        .collect();
    rows.sort_by_key(|r| r.sentiment);

    Ok(non_empty(rows, ViewKind::GlobalProportion, ViewResult::GlobalProportion))
}

/// Row count per (date, sentiment), sparse: absent pairs are not zero-filled.
pub fn time_series(subset: &WorkingSubset) -> PipelineResult<ViewResult> {
    let df = grouped_counts(
        subset.lazy().filter(col(SENTIMENT).is_not_null()),
        &[DATE, SENTIMENT],
    )?;
    let dates = df.column(DATE)?.cast(&DataType::Int32)?;
    let dates = dates.i32()?;
    let sentiment = df.column(SENTIMENT)?.str()?;
    let count = df.column(COUNT)?.u64()?;

    let mut rows: Vec<DailyCount> = dates
        .into_iter()
        .zip(sentiment)
        .zip(count)
        .filter_map(|((d, s), c)| {
            Some(DailyCount {
                date: days_to_date(d?)?,
                sentiment: s?.parse().ok()?,
                count: c?,
            })
        })
        .collect();
    rows.sort_by_key(|r| (r.date, r.sentiment));

    Ok(non_empty(rows, ViewKind::TimeSeries, ViewResult::TimeSeries))
}

/// Row count per observed (entity, sentiment) combination.
pub fn entity_comparison(subset: &WorkingSubset) -> PipelineResult<ViewResult> {
    let df = grouped_counts(
        subset
            .lazy()
            .filter(col(ENTITY).is_not_null().and(col(SENTIMENT).is_not_null())),
        &[ENTITY, SENTIMENT],
    )?;
    let entity = df.column(ENTITY)?.str()?;
    let sentiment = df.column(SENTIMENT)?.str()?;
    let count = df.column(COUNT)?.u64()?;

    let mut rows: Vec<EntityCount> = entity
        .into_iter()
        .zip(sentiment)
        .zip(count)
        .filter_map(|((e, s), c)| {
            Some(EntityCount {
                entity: e?.to_string(),
                sentiment: s?.parse().ok()?,
                count: c?,
            })
        })
        .collect();
    rows.sort_by(|a, b| (&a.entity, a.sentiment).cmp(&(&b.entity, b.sentiment)));

    Ok(non_empty(rows, ViewKind::EntityComparison, ViewResult::EntityComparison))
}

/// Confidence values grouped by sentiment, each with its box-plot summary.
pub fn confidence_distribution(subset: &WorkingSubset) -> PipelineResult<ViewResult> {
    let df = subset
        .lazy()
        .filter(
            col(SENTIMENT)
                .is_not_null()
                .and(col(SENTIMENT_CONFIDENCE).is_not_null()),
        )
        .select([col(SENTIMENT), col(SENTIMENT_CONFIDENCE)])
        .collect()?;
    let sentiment = df.column(SENTIMENT)?.str()?;
    let confidence = df.column(SENTIMENT_CONFIDENCE)?.f64()?;

    let mut groups: BTreeMap<Sentiment, Vec<f64>> = BTreeMap::new();
    for (s, c) in sentiment.into_iter().zip(confidence) {
        if let (Some(s), Some(c)) = (s.and_then(|s| s.parse::<Sentiment>().ok()), c) {
            groups.entry(s).or_default().push(c);
        }
    }

    let rows: Vec<ConfidenceGroup> = groups
        .into_iter()
        .filter_map(|(sentiment, values)| {
            let summary = BoxStats::from_values(&values)?;
            Some(ConfidenceGroup {
                sentiment,
                values,
                summary,
            })
        })
        .collect();

    Ok(non_empty(
        rows,
        ViewKind::ConfidenceDistribution,
        ViewResult::ConfidenceDistribution,
    ))
}

/// Negative rows counted by (day_name, hour) on a dense 7×24 grid.
pub fn complaint_heatmap(subset: &WorkingSubset) -> PipelineResult<ViewResult> {
    let df = grouped_counts(
        subset
            .lazy()
            .filter(col(SENTIMENT).eq(lit(Sentiment::Negative.as_str()))),
        &[DAY_NAME, HOUR],
    )?;
    if df.height() == 0 {
        return Ok(ViewResult::Empty {
            view: ViewKind::ComplaintHeatmap,
        });
    }

    let day_name = df.column(DAY_NAME)?.str()?;
    let hour = df.column(HOUR)?.cast(&DataType::UInt32)?;
    let hour = hour.u32()?;
    let count = df.column(COUNT)?.u64()?;

    let mut heatmap = ComplaintHeatmap {
        counts: [[0; 24]; 7],
    };
    for ((d, h), c) in day_name.into_iter().zip(hour).zip(count) {
        let (Some(d), Some(h), Some(c)) = (d, h, c) else {
            continue;
        };
        let Ok(day) = d.parse::<Weekday>() else {
            continue;
        };
        if let Some(cell) = heatmap.counts[day.rank()].get_mut(h as usize) {
            *cell += c;
        }
    }

    Ok(ViewResult::ComplaintHeatmap(heatmap))
}

/// All whitespace tokens of the texts with `sentiment`, in row order.
pub fn token_aggregation(
    subset: &WorkingSubset,
    sentiment: Sentiment,
) -> PipelineResult<ViewResult> {
    let df = subset
        .lazy()
        .filter(col(SENTIMENT).eq(lit(sentiment.as_str())))
        .select([col(TEXT)])
        .collect()?;
    if df.height() == 0 && subset.is_empty()? {
        return Ok(ViewResult::Empty {
            view: ViewKind::TokenAggregation,
        });
    }

    let text = df.column(TEXT)?.str()?;
    let mut documents = 0;
    let mut tokens = Vec::new();
    for t in text.into_iter().flatten() {
        let before = tokens.len();
        tokens.extend(t.split_whitespace().map(str::to_string));
        if tokens.len() > before {
            documents += 1;
        }
    }

    if tokens.is_empty() {
        return Ok(ViewResult::NoText { sentiment });
    }
    Ok(ViewResult::TokenAggregation(TokenSequence {
        sentiment,
        documents,
        tokens,
    }))
}

/// Total rows, negative rows and the negative share of the subset.
pub fn summary(subset: &WorkingSubset) -> PipelineResult<ViewResult> {
    let df = subset
        .lazy()
        .select([
            len().alias("total"),
            col(SENTIMENT)
                .eq(lit(Sentiment::Negative.as_str()))
                .cast(DataType::UInt64)
                .sum()
                .alias("negative"),
        ])
        .collect()?;
    let total = df
        .column("total")?
        .cast(&DataType::UInt64)?
        .u64()?
        .get(0)
        .unwrap_or(0);
    if total == 0 {
        return Ok(ViewResult::Empty {
            view: ViewKind::Summary,
        });
    }
    let negative = df
        .column("negative")?
        .cast(&DataType::UInt64)?
        .u64()?
        .get(0)
        .unwrap_or(0);

    Ok(ViewResult::Summary(KeyMetrics {
        total,
        negative,
        negative_pct: negative as f64 / total as f64 * 100.0,
        selected_entities: subset.spec().entities.len(),
    }))
}

/// Groups by `keys` and counts rows into a `count` column of type UInt64.
fn grouped_counts(lf: LazyFrame, keys: &[&str]) -> PipelineResult<DataFrame> {
    let keys: Vec<Expr> = keys.iter().map(|k| col(*k)).collect();
    let df = lf
        .group_by(keys)
        .agg([len().cast(DataType::UInt64).alias(COUNT)])
        .collect()?;
    Ok(df)
}

fn non_empty<T>(rows: Vec<T>, view: ViewKind, wrap: fn(Vec<T>) -> ViewResult) -> ViewResult {
    if rows.is_empty() {
        ViewResult::Empty { view }
    } else {
        wrap(rows)
    }
}
