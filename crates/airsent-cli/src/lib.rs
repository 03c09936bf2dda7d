//! Shared CLI definitions for airsent.
//!
//! Used by the main application and by the build script (manpage) and
//! gen_docs binary (command-line-options markdown).

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

/// Compression format for raw exports and snapshots
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum CompressionFormat {
    /// Gzip compression (.gz) - Most common, good balance of speed and compression
    Gzip,
    /// Zstandard compression (.zst) - Modern, fast compression with good ratios
    Zstd,
    /// Bzip2 compression (.bz2) - Good compression ratio, slower than gzip
    Bzip2,
    /// XZ compression (.xz) - Excellent compression ratio, slower than bzip2
    Xz,
}

impl CompressionFormat {
    /// Detect compression format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            match ext.to_lowercase().as_str() {
                "gz" => Some(Self::Gzip),
                "zst" | "zstd" => Some(Self::Zstd),
                "bz2" | "bz" => Some(Self::Bzip2),
                "xz" => Some(Self::Xz),
                _ => None,
            }
        } else {
            None
        }
    }

    /// Get file extension for this compression format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Gzip => "gz",
            Self::Zstd => "zst",
            Self::Bzip2 => "bz2",
            Self::Xz => "xz",
        }
    }
}

/// Aggregate view to compute over the filtered snapshot
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ViewArg {
    /// Row count per sentiment
    GlobalProportion,
    /// Row count per (date, sentiment); dates without rows are omitted
    TimeSeries,
    /// Row count per (airline, sentiment)
    EntityComparison,
    /// Sentiment confidence values and box-plot summary per sentiment
    ConfidenceDistribution,
    /// Negative rows counted on a 7x24 weekday/hour grid
    ComplaintHeatmap,
    /// Whitespace tokens of all tweets with the selected sentiment
    TokenAggregation,
    /// Total rows, negative rows and negative share
    Summary,
}

/// Sentiment label accepted on the command line
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum SentimentArg {
    Positive,
    Neutral,
    Negative,
}

/// How query results are printed
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Plain text lines
    #[default]
    Text,
    /// The view result as JSON
    Json,
    /// A renderer-agnostic chart specification as JSON
    Chart,
}

/// Command-line arguments for airsent
#[derive(Clone, Parser, Debug)]
#[command(
    name = "airsent",
    version,
    about = "Clean airline tweet exports and compute sentiment views",
    long_about = "Clean airline tweet exports and compute sentiment views.\n\n\
                  Run `airsent clean` once per raw export to produce a snapshot, then \
                  `airsent query` as often as needed to compute filtered aggregate views."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Enable debug logging (RUST_LOG takes precedence when set)
    #[arg(long = "debug", global = true, action)]
    pub debug: bool,

    /// Generate default configuration file at ~/.config/airsent/config.toml
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,

    /// Force overwrite existing config file when using --generate-config
    #[arg(long = "force", requires = "generate_config", action)]
    pub force: bool,
}

#[derive(Clone, Subcommand, Debug)]
pub enum Command {
    /// Clean a raw export into an analysis-ready snapshot
    Clean(CleanArgs),
    /// Compute one aggregate view over a filtered snapshot
    Query(QueryArgs),
    /// Show row count, airlines and date bounds of a snapshot
    Info(InfoArgs),
}

#[derive(Clone, clap::Args, Debug, Default)]
pub struct CleanArgs {
    /// Raw export to read (default: [paths] raw_input from config)
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Where to write the snapshot (default: [paths] snapshot from config)
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Skip this many lines when reading the raw export
    #[arg(long = "skip-lines")]
    pub skip_lines: Option<usize>,

    /// Skip this many rows when reading the raw export
    #[arg(long = "skip-rows")]
    pub skip_rows: Option<usize>,

    /// Delimiter of the raw export (as ASCII value, e.g. 59 for ';')
    #[arg(long = "delimiter")]
    pub delimiter: Option<u8>,

    /// Specify the compression format explicitly (gzip, zstd, bzip2, xz)
    /// If not specified, compression is auto-detected from file extension.
    #[arg(long = "compression", value_enum)]
    pub compression: Option<CompressionFormat>,

    /// Skip malformed CSV lines instead of failing (default: false)
    #[arg(long = "ignore-errors", value_name = "BOOL", value_parser = clap::value_parser!(bool))]
    pub ignore_errors: Option<bool>,
}

#[derive(Clone, clap::Args, Debug)]
pub struct QueryArgs {
    /// View to compute
    #[arg(long = "view", value_enum)]
    pub view: ViewArg,

    /// Airline to include (repeatable). Omit to include every airline in the snapshot
    #[arg(long = "airline", value_name = "NAME")]
    pub airlines: Vec<String>,

    /// First date to include, inclusive (default: earliest date in the snapshot)
    #[arg(long = "from", value_name = "YYYY-MM-DD")]
    pub from: Option<String>,

    /// Last date to include, inclusive (default: latest date in the snapshot)
    #[arg(long = "to", value_name = "YYYY-MM-DD")]
    pub to: Option<String>,

    /// Sentiment for token-aggregation (default: [query] token_sentiment from config)
    #[arg(long = "sentiment", value_enum)]
    pub sentiment: Option<SentimentArg>,

    /// Output format
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Snapshot to query (default: [paths] snapshot from config)
    #[arg(long = "snapshot", value_name = "PATH")]
    pub snapshot: Option<PathBuf>,
}

#[derive(Clone, clap::Args, Debug, Default)]
pub struct InfoArgs {
    /// Snapshot to describe (default: [paths] snapshot from config)
    #[arg(long = "snapshot", value_name = "PATH")]
    pub snapshot: Option<PathBuf>,
}

/// Escape `|` and newlines for use in markdown table cells.
fn escape_table_cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\n', '\r'], " ")
}

fn option_label(arg: &clap::Arg) -> String {
    let placeholder: String = arg
        .get_value_names()
        .map(|names| {
            names
                .iter()
                .map(|n: &clap::builder::Str| format!("<{}>", n.as_ref() as &str))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();

    if arg.is_positional() {
        return if arg.is_required_set() {
            placeholder
        } else {
            format!("[{placeholder}]")
        };
    }

    let mut parts = Vec::new();
    if let Some(s) = arg.get_short() {
        parts.push(format!("-{s}"));
    }
    if let Some(l) = arg.get_long() {
        parts.push(format!("--{l}"));
    }
    let op = parts.join(", ");
    if !arg.get_action().takes_values() || placeholder.is_empty() {
        op
    } else {
        format!("{op} {placeholder}")
    }
}

fn push_options_table(out: &mut String, cmd: &clap::Command) {
    out.push_str("| Option | Description |\n");
    out.push_str("|--------|-------------|\n");
    for arg in cmd.get_arguments() {
        let id = arg.get_id().as_ref().to_string();
        if id == "help" || id == "version" {
            continue;
        }
        let help = arg
            .get_help()
            .map(|h| escape_table_cell(&h.to_string()))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!("| `{}` | {help} |\n", option_label(arg)));
    }
}

/// Render command-line options as markdown, one table for the global options
/// and one per subcommand.
pub fn render_options_markdown() -> String {
    let mut cmd = Args::command();
    cmd.build();

    let mut out = String::from("# Command Line Options\n\n");

    out.push_str("## Usage\n\n```\n");
    let usage = cmd.render_usage();
    out.push_str(&usage.to_string());
    out.push_str("\n```\n\n");

    out.push_str("## Global options\n\n");
    push_options_table(&mut out, &cmd);

    for sub in cmd.get_subcommands() {
        if sub.get_name() == "help" {
            continue;
        }
        out.push_str(&format!("\n## `{}`\n\n", sub.get_name()));
        if let Some(about) = sub.get_about() {
            out.push_str(&format!("{about}\n\n"));
        }
        push_options_table(&mut out, sub);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_detection() {
        assert_eq!(
            CompressionFormat::from_extension(Path::new("Tweets.csv.gz")),
            Some(CompressionFormat::Gzip)
        );
        assert_eq!(
            CompressionFormat::from_extension(Path::new("Tweets.csv.zst")),
            Some(CompressionFormat::Zstd)
        );
        assert_eq!(
            CompressionFormat::from_extension(Path::new("Tweets.csv.bz2")),
            Some(CompressionFormat::Bzip2)
        );
        assert_eq!(
            CompressionFormat::from_extension(Path::new("Tweets.csv.xz")),
            Some(CompressionFormat::Xz)
        );
        assert_eq!(
            CompressionFormat::from_extension(Path::new("Tweets.csv")),
            None
        );
        assert_eq!(CompressionFormat::from_extension(Path::new("file")), None);
    }

    #[test]
    fn test_compression_extension() {
        assert_eq!(CompressionFormat::Gzip.extension(), "gz");
        assert_eq!(CompressionFormat::Zstd.extension(), "zst");
        assert_eq!(CompressionFormat::Bzip2.extension(), "bz2");
        assert_eq!(CompressionFormat::Xz.extension(), "xz");
    }

    #[test]
    fn args_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parse_query_subcommand() {
        let args = Args::parse_from([
            "airsent",
            "query",
            "--view",
            "complaint-heatmap",
            "--airline",
            "United",
            "--airline",
            "Delta",
            "--from",
            "2015-02-17",
        ]);
        match args.command {
            Some(Command::Query(q)) => {
                assert_eq!(q.view, ViewArg::ComplaintHeatmap);
                assert_eq!(q.airlines, vec!["United".to_string(), "Delta".to_string()]);
                assert_eq!(q.from.as_deref(), Some("2015-02-17"));
                assert_eq!(q.to, None);
                assert_eq!(q.format, OutputFormat::Text);
            }
            other => panic!("expected query command, got {:?}", other),
        }
    }

    #[test]
    fn generate_config_needs_no_subcommand() {
        let args = Args::parse_from(["airsent", "--generate-config", "--force"]);
        assert!(args.command.is_none());
        assert!(args.generate_config);
        assert!(args.force);
    }

    #[test]
    fn options_markdown_lists_subcommands() {
        let md = render_options_markdown();
        assert!(md.contains("## `clean`"));
        assert!(md.contains("## `query`"));
        assert!(md.contains("--view"));
    }
}
