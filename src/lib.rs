//! Airline tweet sentiment pipeline.
//!
//! Raw export → [`normalize`] → [`CleanDataset`] (snapshot, written once) →
//! [`filter`] → [`WorkingSubset`] → [`aggregate`] → [`ViewResult`].

pub mod aggregate;
pub mod chart_spec;
pub mod commands;
pub mod config;
pub mod error;
pub mod error_display;
pub mod filter;
pub mod normalize;
pub mod schema;
pub mod source;
pub mod statistics;
pub mod store;

pub use aggregate::{aggregate, ViewKind, ViewParams, ViewResult};
pub use config::{AppConfig, ConfigManager};
pub use error::{PipelineError, PipelineResult};
pub use filter::{filter, DateRange, FilterSpec, WorkingSubset};
pub use normalize::{normalize, NormalizeReport, NormalizeSettings, Normalized};
pub use schema::{CleanRecord, Sentiment, Weekday};
pub use source::ReadOptions;
pub use store::CleanDataset;

/// Re-export compression format from CLI module
pub use airsent_cli::CompressionFormat;

/// Application name used for the config directory
pub const APP_NAME: &str = "airsent";
