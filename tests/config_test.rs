use airsent::config::DEFAULT_TIMESTAMP_FORMATS;
use airsent::{AppConfig, ConfigManager, Sentiment};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

// Helper to create a temporary config directory for testing
fn setup_test_config_dir() -> (TempDir, ConfigManager) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_manager = ConfigManager::with_dir(temp_dir.path().to_path_buf());
    (temp_dir, config_manager)
}

fn write_config(config_manager: &ConfigManager, content: &str) {
    config_manager
        .ensure_config_dir()
        .expect("Failed to create config dir");
    fs::write(config_manager.config_path("config.toml"), content)
        .expect("Failed to write config");
}

#[test]
fn test_default_config() {
    let config = AppConfig::default();

    assert_eq!(config.version, "0.1");

    // Kaggle export column names
    assert_eq!(config.columns.timestamp, "tweet_created");
    assert_eq!(config.columns.entity, "airline");
    assert_eq!(config.columns.sentiment, "airline_sentiment");
    assert_eq!(config.columns.negative_reason, "negativereason");
    assert_eq!(config.columns.text, "text");

    assert_eq!(
        config.normalize.timestamp_formats.len(),
        DEFAULT_TIMESTAMP_FORMATS.len()
    );
    assert_eq!(config.paths.raw_input, PathBuf::from("Tweets.csv"));
    assert_eq!(config.paths.snapshot, PathBuf::from("tweets_clean.csv"));

    assert_eq!(config.chart.color_for(Sentiment::Positive), "#2ECC71");
    assert_eq!(config.chart.color_for(Sentiment::Neutral), "#95A5A6");
    assert_eq!(config.chart.color_for(Sentiment::Negative), "#E74C3C");
    assert_eq!(config.chart.max_words, 100);

    assert_eq!(config.query.token_sentiment, Sentiment::Negative);
    assert_eq!(config.file_loading.delimiter, None);
}

#[test]
fn test_generate_default_config() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    let template = config_manager
        .generate_default_config()
        .expect("Failed to generate template");

    assert!(template.contains("[file_loading]"));
    assert!(template.contains("[columns]"));
    assert!(template.contains("[normalize]"));
    assert!(template.contains("[paths]"));
    assert!(template.contains("[chart]"));
    assert!(template.contains("[query]"));
    assert!(template.contains("version = \"0.1\""));

    // Unset options are listed so users can discover them
    assert!(template.contains("delimiter = null"));
}

#[test]
fn test_generated_template_parses_to_defaults() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    let template = config_manager
        .generate_default_config()
        .expect("Failed to generate template");

    let config: AppConfig = toml::from_str(&template).expect("Template should parse");
    assert_eq!(config, AppConfig::default());
}

#[test]
fn test_write_default_config() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    let config_path = config_manager
        .write_default_config(false)
        .expect("Failed to write config");

    assert!(config_path.exists());
    let content = fs::read_to_string(&config_path).expect("Failed to read config");
    assert!(content.contains("[chart]"));

    let loaded = AppConfig::load_from(&config_manager).expect("Should load written config");
    assert_eq!(loaded, AppConfig::default());
}

#[test]
fn test_write_config_without_force_fails_if_exists() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    config_manager
        .write_default_config(false)
        .expect("First write should succeed");

    let result = config_manager.write_default_config(false);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("already exists"));
}

#[test]
fn test_write_config_with_force_overwrites() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    let first_path = config_manager
        .write_default_config(false)
        .expect("First write should succeed");
    fs::write(&first_path, "garbage").expect("Failed to clobber config");

    let second_path = config_manager
        .write_default_config(true)
        .expect("Second write with force should succeed");

    assert_eq!(first_path, second_path);
    let content = fs::read_to_string(&second_path).expect("Failed to read config");
    assert!(content.contains("[columns]"));
}

#[test]
fn test_load_with_no_file_gives_defaults() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    let config = AppConfig::load_from(&config_manager).expect("Should load default config");
    assert_eq!(config, AppConfig::default());
}

#[test]
fn test_load_partial_config_keeps_other_defaults() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    write_config(
        &config_manager,
        r##"
version = "0.1"

[file_loading]
delimiter = 59

[columns]
entity = "carrier"

[paths]
snapshot = "/tmp/clean.csv.zst"

[chart]
negative_color = "#B03A2E"

[query]
token_sentiment = "positive"
"##,
    );

    let config = AppConfig::load_from(&config_manager).expect("Should load config");

    assert_eq!(config.file_loading.delimiter, Some(b';'));
    assert_eq!(config.columns.entity, "carrier");
    assert_eq!(config.columns.sentiment, "airline_sentiment"); // Default
    assert_eq!(config.paths.snapshot, PathBuf::from("/tmp/clean.csv.zst"));
    assert_eq!(config.paths.raw_input, PathBuf::from("Tweets.csv")); // Default
    assert_eq!(config.chart.negative_color, "#B03A2E");
    assert_eq!(config.chart.positive_color, "#2ECC71"); // Default
    assert_eq!(config.query.token_sentiment, Sentiment::Positive);
}

#[test]
fn test_load_rejects_invalid_color() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    write_config(&config_manager, "[chart]\npositive_color = \"green\"\n");

    let err = AppConfig::load_from(&config_manager).unwrap_err();
    assert!(err.to_string().contains("positive_color"), "got: {}", err);
}

#[test]
fn test_load_rejects_unsupported_version() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    write_config(&config_manager, "version = \"2.0\"\n");

    let err = AppConfig::load_from(&config_manager).unwrap_err();
    assert!(err.to_string().contains("version"), "got: {}", err);
}

#[test]
fn test_load_rejects_malformed_toml() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    write_config(&config_manager, "[chart\nmax_words = ");

    let err = AppConfig::load_from(&config_manager).unwrap_err();
    assert!(err.to_string().contains("Failed to parse"), "got: {}", err);
}

#[test]
fn test_merge_configs() {
    let mut base = AppConfig::default();
    let mut override_config = AppConfig::default();

    override_config.columns.text = "body".to_string();
    override_config.chart.max_words = 25;
    override_config.file_loading.skip_rows = Some(2);

    base.merge(override_config);

    assert_eq!(base.columns.text, "body");
    assert_eq!(base.chart.max_words, 25);
    assert_eq!(base.file_loading.skip_rows, Some(2));

    // Unmodified values remain default
    assert_eq!(base.columns.timestamp, "tweet_created");
    assert_eq!(base.chart.heatmap_color_scale, "Reds");
}

#[test]
fn test_validate_config_valid() {
    assert!(AppConfig::default().validate().is_ok());
}

#[test]
fn test_validate_rejects_empty_column_name() {
    let mut config = AppConfig::default();
    config.columns.timestamp = "  ".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_zero_max_words() {
    let mut config = AppConfig::default();
    config.chart.max_words = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_empty_timestamp_formats() {
    let mut config = AppConfig::default();
    config.normalize.timestamp_formats.clear();
    assert!(config.validate().is_err());
}
