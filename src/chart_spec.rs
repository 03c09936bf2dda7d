//! Renderer-agnostic chart descriptions for view results.
//!
//! A [`ChartSpec`] is data plus encoding: which mark to draw, which field
//! goes on which channel, and how sentiment maps to colour. Drawing it is
//! left to whatever consumes the JSON.

use crate::aggregate::{ViewKind, ViewResult};
use crate::config::ChartConfig;
use crate::schema::{Sentiment, Weekday};
use serde::Serialize;
use serde_json::{json, Value};

pub const NO_DATA_MESSAGE: &str =
    "No data matches the current filters. Adjust the airline or date selection.";
pub const NO_HEATMAP_MESSAGE: &str = "Not enough negative tweets for the complaint heatmap.";
pub const NO_TEXT_MESSAGE: &str = "No text available.";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Mark {
    /// Pie or donut; `inner_radius` is a fraction of the outer radius.
    Arc { inner_radius: f64 },
    Line { points: bool },
    Bar { stacked: bool },
    BoxPlot,
    /// Heatmap cells.
    Rect,
    WordCloud { max_words: usize },
    Metric,
    /// Nothing to draw; show `ChartSpec::message` instead.
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Nominal,
    Ordinal,
    Quantitative,
    Temporal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Channel {
    pub field: String,
    pub title: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Explicit category order, when not the natural order of the values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<String>>,
}

impl Channel {
    fn new(field: &str, title: &str, field_type: FieldType) -> Self {
        Self {
            field: field.to_string(),
            title: title.to_string(),
            field_type,
            sort: None,
        }
    }

    fn sorted(mut self, order: Vec<String>) -> Self {
        self.sort = Some(order);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColorScale {
    /// Fixed colour per category value.
    Categorical {
        domain: Vec<String>,
        range: Vec<String>,
    },
    /// Named continuous scheme (e.g. "Reds").
    Continuous { scheme: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Encoding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<Channel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<Channel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Channel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_scale: Option<ColorScale>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub view: ViewKind,
    pub title: String,
    pub mark: Mark,
    pub encoding: Encoding,
    pub data: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn sentiment_scale(config: &ChartConfig) -> ColorScale {
    ColorScale::Categorical {
        domain: Sentiment::ALL.iter().map(|s| s.to_string()).collect(),
        range: Sentiment::ALL
            .iter()
            .map(|s| config.color_for(*s).to_string())
            .collect(),
    }
}

fn sentiment_channel(title: &str) -> Channel {
    Channel::new("sentiment", title, FieldType::Nominal)
        .sorted(Sentiment::ALL.iter().map(|s| s.to_string()).collect())
}

fn title_for(view: ViewKind) -> &'static str {
    match view {
        ViewKind::GlobalProportion => "Global sentiment proportion",
        ViewKind::TimeSeries => "Daily tweet volume",
        ViewKind::EntityComparison => "Sentiment distribution per airline",
        ViewKind::ConfidenceDistribution => "Model confidence distribution",
        ViewKind::ComplaintHeatmap => "Complaint intensity (day vs hour)",
        ViewKind::TokenAggregation => "Dominant keywords",
        ViewKind::Summary => "Key metrics",
    }
}

fn empty_spec(view: ViewKind, message: &str) -> ChartSpec {
    ChartSpec {
        view,
        title: title_for(view).to_string(),
        mark: Mark::Empty,
        encoding: Encoding::default(),
        data: Vec::new(),
        message: Some(message.to_string()),
    }
}

/// Word-cloud colour scheme for a sentiment.
fn token_scheme(sentiment: Sentiment) -> &'static str {
    match sentiment {
        Sentiment::Positive => "Greens",
        Sentiment::Neutral => "Greys",
        Sentiment::Negative => "Reds",
    }
}

/// Maps a view result to its chart description.
pub fn chart_spec(result: &ViewResult, config: &ChartConfig) -> ChartSpec {
    let (view, mark, encoding, data) = match result {
        ViewResult::Empty { view } => {
            let message = if *view == ViewKind::ComplaintHeatmap {
                NO_HEATMAP_MESSAGE
            } else {
                NO_DATA_MESSAGE
            };
            return empty_spec(*view, message);
        }
        ViewResult::NoText { .. } => return empty_spec(ViewKind::TokenAggregation, NO_TEXT_MESSAGE),
        ViewResult::GlobalProportion(rows) => (
            ViewKind::GlobalProportion,
            Mark::Arc { inner_radius: 0.4 },
            Encoding {
                y: Some(Channel::new("count", "Tweets", FieldType::Quantitative)),
                color: Some(sentiment_channel("Sentiment")),
                color_scale: Some(sentiment_scale(config)),
                ..Encoding::default()
            },
            rows.iter()
                .map(|r| json!({ "sentiment": r.sentiment, "count": r.count }))
                .collect(),
        ),
        ViewResult::TimeSeries(rows) => (
            ViewKind::TimeSeries,
            Mark::Line { points: true },
            Encoding {
                x: Some(Channel::new("date", "Date", FieldType::Temporal)),
                y: Some(Channel::new("count", "Tweets", FieldType::Quantitative)),
                color: Some(sentiment_channel("Sentiment")),
                color_scale: Some(sentiment_scale(config)),
            },
            rows.iter()
                .map(|r| {
                    json!({
                        "date": r.date.format("%Y-%m-%d").to_string(),
                        "sentiment": r.sentiment,
                        "count": r.count,
                    })
                })
                .collect(),
        ),
        ViewResult::EntityComparison(rows) => (
            ViewKind::EntityComparison,
            Mark::Bar { stacked: true },
            Encoding {
                x: Some(Channel::new("entity", "Airline", FieldType::Nominal)),
                y: Some(Channel::new("count", "Tweets", FieldType::Quantitative)),
                color: Some(sentiment_channel("Sentiment")),
                color_scale: Some(sentiment_scale(config)),
            },
            rows.iter()
                .map(|r| json!({ "entity": r.entity, "sentiment": r.sentiment, "count": r.count }))
                .collect(),
        ),
        ViewResult::ConfidenceDistribution(groups) => (
            ViewKind::ConfidenceDistribution,
            Mark::BoxPlot,
            Encoding {
                x: Some(sentiment_channel("Sentiment class")),
                y: Some(Channel::new(
                    "confidence",
                    "Confidence (0-1)",
                    FieldType::Quantitative,
                )),
                color: Some(sentiment_channel("Sentiment")),
                color_scale: Some(sentiment_scale(config)),
            },
            groups
                .iter()
                .flat_map(|g| {
                    g.values
                        .iter()
                        .map(move |v| json!({ "sentiment": g.sentiment, "confidence": v }))
                })
                .collect(),
        ),
        ViewResult::ComplaintHeatmap(heatmap) => (
            ViewKind::ComplaintHeatmap,
            Mark::Rect,
            Encoding {
                x: Some(Channel::new("hour", "Hour", FieldType::Ordinal)),
                y: Some(
                    Channel::new("day", "Day", FieldType::Ordinal)
                        .sorted(Weekday::ALL.iter().map(|d| d.to_string()).collect()),
                ),
                color: Some(Channel::new("count", "Count", FieldType::Quantitative)),
                color_scale: Some(ColorScale::Continuous {
                    scheme: config.heatmap_color_scale.clone(),
                }),
            },
            Weekday::ALL
                .iter()
                .flat_map(|day| {
                    heatmap
                        .row(*day)
                        .iter()
                        .enumerate()
                        .map(move |(hour, count)| {
                            json!({ "day": day.name(), "hour": hour, "count": count })
                        })
                })
                .collect(),
        ),
        ViewResult::TokenAggregation(tokens) => (
            ViewKind::TokenAggregation,
            Mark::WordCloud {
                max_words: config.max_words,
            },
            Encoding {
                color_scale: Some(ColorScale::Continuous {
                    scheme: token_scheme(tokens.sentiment).to_string(),
                }),
                ..Encoding::default()
            },
            vec![json!({
                "sentiment": tokens.sentiment,
                "text": tokens.tokens.join(" "),
            })],
        ),
        ViewResult::Summary(metrics) => (
            ViewKind::Summary,
            Mark::Metric,
            Encoding::default(),
            vec![json!({
                "total": metrics.total,
                "negative": metrics.negative,
                "negative_pct": metrics.negative_pct,
                "selected_entities": metrics.selected_entities,
            })],
        ),
    };

    ChartSpec {
        view,
        title: title_for(view).to_string(),
        mark,
        encoding,
        data,
        message: None,
    }
}
