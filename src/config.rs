use crate::schema::Sentiment;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get path to a specific config file
    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    /// Ensure the config directory exists
    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Generate default configuration template as a string with comments
    /// All fields are commented out so defaults are used, but users can uncomment to override
    pub fn generate_default_config(&self) -> Result<String> {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config)
            .map_err(|e| eyre!("Failed to serialize default config: {}", e))?;

        let comments = Self::collect_all_comments();
        Ok(Self::comment_all_fields(toml_str, comments))
    }

    /// Collect all field comments from struct constants into a map
    fn collect_all_comments() -> HashMap<String, String> {
        let mut comments = HashMap::new();

        for (field, comment) in APP_COMMENTS {
            comments.insert(field.to_string(), comment.to_string());
        }

        let sections: [(&str, &[(&str, &str)]); 6] = [
            ("file_loading", FILE_LOADING_COMMENTS),
            ("columns", COLUMNS_COMMENTS),
            ("normalize", NORMALIZE_COMMENTS),
            ("paths", PATHS_COMMENTS),
            ("chart", CHART_COMMENTS),
            ("query", QUERY_COMMENTS),
        ];
        for (section, fields) in sections {
            for (field, comment) in fields {
                comments.insert(format!("{}.{}", section, field), comment.to_string());
            }
        }

        comments
    }

    /// Comment out all fields in TOML and add comments
    /// Also adds missing Option fields as commented-out `# field = null`
    fn comment_all_fields(toml: String, comments: HashMap<String, String>) -> String {
        let mut result = String::new();
        result.push_str("# airsent configuration file\n");
        result
            .push_str("# This file uses TOML format. See https://toml.io/ for syntax reference.\n");
        result.push('\n');

        let mut current_section = String::new();
        let mut seen_fields: HashSet<String> = HashSet::new();
        // Multi-line arrays: once a field opens `[` without closing it, keep
        // commenting lines until the closing bracket.
        let mut in_array = false;

        for line in toml.lines() {
            if in_array {
                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
                if line.trim_start().starts_with(']') {
                    in_array = false;
                }
                continue;
            }

            if let Some(section) = Self::extract_section_name(line) {
                current_section = section.clone();

                if let Some(header) = SECTION_HEADERS.iter().find(|(s, _)| *s == section) {
                    result.push_str(header.1);
                    result.push('\n');
                }

                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
                continue;
            }

            if let Some(field_path) = Self::extract_field_path_simple(line, &current_section) {
                seen_fields.insert(field_path.clone());

                if let Some(comment) = comments.get(&field_path) {
                    for comment_line in comment.lines() {
                        result.push_str("# ");
                        result.push_str(comment_line);
                        result.push('\n');
                    }
                }

                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
                if line.trim_end().ends_with('[') {
                    in_array = true;
                }
            } else {
                result.push_str(line);
                result.push('\n');
            }
        }

        Self::add_missing_option_fields(result, &comments, &seen_fields)
    }

    /// Add missing Option fields that weren't serialized (because they're None)
    fn add_missing_option_fields(
        mut result: String,
        comments: &HashMap<String, String>,
        seen_fields: &HashSet<String>,
    ) -> String {
        let option_fields = [
            "file_loading.delimiter",
            "file_loading.skip_lines",
            "file_loading.skip_rows",
            "file_loading.ignore_errors",
        ];

        let mut missing_by_section: HashMap<String, Vec<&str>> = HashMap::new();
        for field_path in &option_fields {
            if !seen_fields.contains(*field_path) && comments.contains_key(*field_path) {
                if let Some((section, _)) = field_path.split_once('.') {
                    missing_by_section
                        .entry(section.to_string())
                        .or_default()
                        .push(field_path);
                }
            }
        }

        for (section, fields) in &missing_by_section {
            let section_header = format!("[{}]", section);
            if let Some(section_pos) = result.find(&section_header) {
                let after_header_start = section_pos + section_header.len();
                let newline_pos = result[after_header_start..].find('\n').unwrap_or(0);
                let insert_pos = after_header_start + newline_pos + 1;

                let mut new_content = String::new();
                for field_path in fields {
                    if let Some(comment) = comments.get(*field_path) {
                        for comment_line in comment.lines() {
                            new_content.push_str("# ");
                            new_content.push_str(comment_line);
                            new_content.push('\n');
                        }
                    }
                    let field_name = field_path.rsplit('.').next().unwrap_or(field_path);
                    new_content.push_str(&format!("# {} = null\n", field_name));
                    new_content.push('\n');
                }

                result.insert_str(insert_pos, &new_content);
            }
        }

        result
    }

    /// Extract section name from TOML line like "[chart]"
    fn extract_section_name(line: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.starts_with('[') && trimmed.ends_with(']') && !trimmed.contains('=') {
            Some(trimmed[1..trimmed.len() - 1].to_string())
        } else {
            None
        }
    }

    /// Extract field path from a line like `timestamp = "tweet_created"`
    fn extract_field_path_simple(line: &str, current_section: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('[') {
            return None;
        }

        let (field_name, _) = trimmed.split_once('=')?;
        let field_name = field_name.trim();
        if current_section.is_empty() {
            Some(field_name.to_string())
        } else {
            Some(format!("{}.{}", current_section, field_name))
        }
    }

    /// Write default configuration to config file
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path("config.toml");

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;

        let template = self.generate_default_config()?;
        std::fs::write(&config_path, template)?;

        Ok(config_path)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version (for future compatibility)
    pub version: String,
    pub file_loading: FileLoadingConfig,
    pub columns: ColumnsConfig,
    pub normalize: NormalizeConfig,
    pub paths: PathsConfig,
    pub chart: ChartConfig,
    pub query: QueryConfig,
}

const APP_COMMENTS: &[(&str, &str)] = &[(
    "version",
    "Configuration format version (for future compatibility)",
)];

// Section header comments
const SECTION_HEADERS: &[(&str, &str)] = &[
    (
        "file_loading",
        "# ============================================================================\n# Raw Export Loading\n# ============================================================================",
    ),
    (
        "columns",
        "# ============================================================================\n# Raw Column Names\n# ============================================================================\n# Header names of the fields the cleaning step reads. Other columns are ignored.",
    ),
    (
        "normalize",
        "# ============================================================================\n# Cleaning\n# ============================================================================",
    ),
    (
        "paths",
        "# ============================================================================\n# Default Paths\n# ============================================================================",
    ),
    (
        "chart",
        "# ============================================================================\n# Chart Specification\n# ============================================================================\n# Colors are hex strings: \"#RRGGBB\"",
    ),
    (
        "query",
        "# ============================================================================\n# Query Defaults\n# ============================================================================",
    ),
];

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct FileLoadingConfig {
    pub delimiter: Option<u8>,
    pub skip_lines: Option<usize>,
    pub skip_rows: Option<usize>,
    pub ignore_errors: Option<bool>,
}

const FILE_LOADING_COMMENTS: &[(&str, &str)] = &[
    (
        "delimiter",
        "Delimiter of raw exports (as ASCII value, e.g., 44 for comma)\nIf not specified, comma is used",
    ),
    ("skip_lines", "Number of lines to skip at the start of files"),
    ("skip_rows", "Number of rows to skip when reading files"),
    (
        "ignore_errors",
        "Skip malformed CSV lines instead of failing the cleaning step (default: false)",
    ),
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ColumnsConfig {
    pub timestamp: String,
    pub entity: String,
    pub sentiment: String,
    pub sentiment_confidence: String,
    pub negative_reason: String,
    pub negative_reason_confidence: String,
    pub text: String,
}

const COLUMNS_COMMENTS: &[(&str, &str)] = &[
    ("timestamp", "Tweet creation time (required)"),
    ("entity", "Airline name (required)"),
    ("sentiment", "Sentiment label: positive, neutral or negative (required)"),
    ("sentiment_confidence", "Sentiment confidence in [0, 1]"),
    (
        "negative_reason",
        "Reason for a negative tweet. Blank values become \"Positive/Neutral\"",
    ),
    (
        "negative_reason_confidence",
        "Confidence of the negative reason. Blank values become 0",
    ),
    ("text", "Tweet text"),
];

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            timestamp: "tweet_created".to_string(),
            entity: "airline".to_string(),
            sentiment: "airline_sentiment".to_string(),
            sentiment_confidence: "airline_sentiment_confidence".to_string(),
            negative_reason: "negativereason".to_string(),
            negative_reason_confidence: "negativereason_confidence".to_string(),
            text: "text".to_string(),
        }
    }
}

impl ColumnsConfig {
    pub fn merge(&mut self, other: Self) {
        let default = ColumnsConfig::default();
        if other.timestamp != default.timestamp {
            self.timestamp = other.timestamp;
        }
        if other.entity != default.entity {
            self.entity = other.entity;
        }
        if other.sentiment != default.sentiment {
            self.sentiment = other.sentiment;
        }
        if other.sentiment_confidence != default.sentiment_confidence {
            self.sentiment_confidence = other.sentiment_confidence;
        }
        if other.negative_reason != default.negative_reason {
            self.negative_reason = other.negative_reason;
        }
        if other.negative_reason_confidence != default.negative_reason_confidence {
            self.negative_reason_confidence = other.negative_reason_confidence;
        }
        if other.text != default.text {
            self.text = other.text;
        }
    }

    fn validate(&self) -> Result<()> {
        let names = [
            ("timestamp", &self.timestamp),
            ("entity", &self.entity),
            ("sentiment", &self.sentiment),
            ("sentiment_confidence", &self.sentiment_confidence),
            ("negative_reason", &self.negative_reason),
            ("negative_reason_confidence", &self.negative_reason_confidence),
            ("text", &self.text),
        ];
        for (field, name) in names {
            if name.trim().is_empty() {
                return Err(eyre!("columns.{} must not be empty", field));
            }
        }
        Ok(())
    }
}

/// Timestamp formats tried after RFC 3339, in order.
pub const DEFAULT_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NormalizeConfig {
    pub timestamp_formats: Vec<String>,
}

const NORMALIZE_COMMENTS: &[(&str, &str)] = &[(
    "timestamp_formats",
    "chrono format strings tried in order after RFC 3339\nFormats without %z are read as UTC. Rows matching none are dropped",
)];

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            timestamp_formats: DEFAULT_TIMESTAMP_FORMATS
                .iter()
                .map(|f| f.to_string())
                .collect(),
        }
    }
}

impl NormalizeConfig {
    pub fn merge(&mut self, other: Self) {
        if other.timestamp_formats != NormalizeConfig::default().timestamp_formats {
            self.timestamp_formats = other.timestamp_formats;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    pub raw_input: PathBuf,
    pub snapshot: PathBuf,
}

const PATHS_COMMENTS: &[(&str, &str)] = &[
    ("raw_input", "Raw export read by `airsent clean` when no INPUT is given"),
    (
        "snapshot",
        "Snapshot written by `airsent clean` and read by `airsent query` and `airsent info`",
    ),
];

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_input: PathBuf::from("Tweets.csv"),
            snapshot: PathBuf::from("tweets_clean.csv"),
        }
    }
}

impl PathsConfig {
    pub fn merge(&mut self, other: Self) {
        let default = PathsConfig::default();
        if other.raw_input != default.raw_input {
            self.raw_input = other.raw_input;
        }
        if other.snapshot != default.snapshot {
            self.snapshot = other.snapshot;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChartConfig {
    pub positive_color: String,
    pub neutral_color: String,
    pub negative_color: String,
    /// Continuous color scale name for the complaint heatmap.
    pub heatmap_color_scale: String,
    /// Maximum number of words the keyword renderer should draw.
    pub max_words: usize,
}

const CHART_COMMENTS: &[(&str, &str)] = &[
    ("positive_color", "Color for positive sentiment"),
    ("neutral_color", "Color for neutral sentiment"),
    ("negative_color", "Color for negative sentiment"),
    (
        "heatmap_color_scale",
        "Continuous color scale name used by the complaint heatmap",
    ),
    (
        "max_words",
        "Maximum number of words drawn by the keyword renderer (>= 1)",
    ),
];

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            positive_color: "#2ECC71".to_string(),
            neutral_color: "#95A5A6".to_string(),
            negative_color: "#E74C3C".to_string(),
            heatmap_color_scale: "Reds".to_string(),
            max_words: 100,
        }
    }
}

impl ChartConfig {
    pub fn color_for(&self, sentiment: Sentiment) -> &str {
        match sentiment {
            Sentiment::Positive => &self.positive_color,
            Sentiment::Neutral => &self.neutral_color,
            Sentiment::Negative => &self.negative_color,
        }
    }

    pub fn merge(&mut self, other: Self) {
        let default = ChartConfig::default();
        if other.positive_color != default.positive_color {
            self.positive_color = other.positive_color;
        }
        if other.neutral_color != default.neutral_color {
            self.neutral_color = other.neutral_color;
        }
        if other.negative_color != default.negative_color {
            self.negative_color = other.negative_color;
        }
        if other.heatmap_color_scale != default.heatmap_color_scale {
            self.heatmap_color_scale = other.heatmap_color_scale;
        }
        if other.max_words != default.max_words {
            self.max_words = other.max_words;
        }
    }

    fn validate(&self) -> Result<()> {
        let hex = Regex::new(r"^#[0-9A-Fa-f]{6}$")?;
        for (field, value) in [
            ("positive_color", &self.positive_color),
            ("neutral_color", &self.neutral_color),
            ("negative_color", &self.negative_color),
        ] {
            if !hex.is_match(value) {
                return Err(eyre!(
                    "chart.{} must be a hex color like \"#2ECC71\", got '{}'",
                    field,
                    value
                ));
            }
        }
        if self.max_words == 0 {
            return Err(eyre!("chart.max_words must be greater than 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QueryConfig {
    /// Sentiment used by token-aggregation when `--sentiment` is not given.
    pub token_sentiment: Sentiment,
}

const QUERY_COMMENTS: &[(&str, &str)] = &[(
    "token_sentiment",
    "Sentiment used by the token-aggregation view when --sentiment is not given\nOne of \"positive\", \"neutral\", \"negative\"",
)];

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            token_sentiment: Sentiment::Negative,
        }
    }
}

impl QueryConfig {
    pub fn merge(&mut self, other: Self) {
        if other.token_sentiment != QueryConfig::default().token_sentiment {
            self.token_sentiment = other.token_sentiment;
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            file_loading: FileLoadingConfig::default(),
            columns: ColumnsConfig::default(),
            normalize: NormalizeConfig::default(),
            paths: PathsConfig::default(),
            chart: ChartConfig::default(),
            query: QueryConfig::default(),
        }
    }
}

// Configuration loading and merging
impl AppConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        let manager = ConfigManager::new(app_name)?;
        Self::load_from(&manager)
    }

    /// Load configuration using the config file managed by `manager`
    pub fn load_from(manager: &ConfigManager) -> Result<Self> {
        let config_path = manager.config_path("config.toml");
        let mut config = AppConfig::default();
        config.merge(Self::load_user_config(&config_path)?);

        config.validate().map_err(|e| {
            eyre!(
                "Invalid configuration in {}: {}",
                config_path.display(),
                e
            )
        })?;

        tracing::debug!(path = %config_path.display(), "configuration loaded");
        Ok(config)
    }

    /// Load the user configuration file, or defaults when it does not exist
    fn load_user_config(config_path: &Path) -> Result<AppConfig> {
        if !config_path.exists() {
            return Ok(AppConfig::default());
        }

        let content = std::fs::read_to_string(config_path).map_err(|e| {
            eyre!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;

        toml::from_str(&content).map_err(|e| {
            eyre!(
                "Failed to parse config file at {}: {}",
                config_path.display(),
                e
            )
        })
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }

        self.file_loading.merge(other.file_loading);
        self.columns.merge(other.columns);
        self.normalize.merge(other.normalize);
        self.paths.merge(other.paths);
        self.chart.merge(other.chart);
        self.query.merge(other.query);
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.1") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.1.x",
                self.version
            ));
        }

        if let Some(d) = self.file_loading.delimiter {
            if !d.is_ascii() || d == b'\n' || d == b'\r' || d == b'"' {
                return Err(eyre!(
                    "file_loading.delimiter must be a single ASCII separator, got {}",
                    d
                ));
            }
        }

        self.columns.validate()?;

        if self.normalize.timestamp_formats.is_empty() {
            return Err(eyre!("normalize.timestamp_formats must not be empty"));
        }

        self.chart.validate()?;

        Ok(())
    }
}

impl FileLoadingConfig {
    pub fn merge(&mut self, other: Self) {
        if other.delimiter.is_some() {
            self.delimiter = other.delimiter;
        }
        if other.skip_lines.is_some() {
            self.skip_lines = other.skip_lines;
        }
        if other.skip_rows.is_some() {
            self.skip_rows = other.skip_rows;
        }
        if other.ignore_errors.is_some() {
            self.ignore_errors = other.ignore_errors;
        }
    }
}
