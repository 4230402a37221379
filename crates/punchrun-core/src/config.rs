//! Disk-backed run preferences.
//!
//! Everything except the password persists in `config.toml` under the user
//! config directory; the password is prompted per run and never written to
//! disk.

use std::fs;
use std::path::PathBuf;

use dirs::config_dir;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calendar::{DEFAULT_CALENDAR_URL, DEFAULT_WEBDRIVER_URL};
use crate::portal::{ADMIN_WORK_LABEL, DEFAULT_PORTAL_BASE_URL, RunMode};
use crate::runtime::RunConfig;
use crate::select::DayChoice;

const CONFIG_DIR_NAME: &str = "punchrun";
const CONFIG_FILE_NAME: &str = "config.toml";
const CURRENT_SCHEMA_VERSION: u32 = 1;

/// The work categories the original input form offers in simple mode.
pub const SIMPLE_WORK_LABELS: &[&str] = &["閱讀文獻", "購買材料", "實驗實做", "行政事務"];

/// Result returned by [`load_config`], capturing the source and any non-fatal
/// issues.
#[derive(Debug, Clone)]
pub struct ConfigLoadResult {
    pub config: FileConfig,
    pub warnings: Vec<String>,
    pub source: ConfigSource,
}

/// Indicates where the configuration was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// No persisted configuration was found or usable; defaults were
    /// synthesized.
    Default,
    /// Configuration was read from `config.toml`.
    File,
}

/// Errors that can occur when persisting configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML serialization error: {0}")]
    Ser(#[from] toml::ser::Error),
}

/// Disk-backed configuration schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default = "FileConfig::schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub run: RunPreferences,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            run: RunPreferences::default(),
        }
    }
}

impl FileConfig {
    const fn schema_version() -> u32 {
        CURRENT_SCHEMA_VERSION
    }
}

/// Run preferences that map closely to the CLI flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunPreferences {
    #[serde(default)]
    pub username: String,
    #[serde(default = "RunPreferences::default_with_time")]
    pub with_time: bool,
    /// `"all"` or a count between 1 and 10.
    #[serde(default = "RunPreferences::default_days")]
    pub days: String,
    #[serde(default = "RunPreferences::default_begin_time")]
    pub begin_time: String,
    #[serde(default = "RunPreferences::default_end_time")]
    pub end_time: String,
    #[serde(default = "RunPreferences::default_hours")]
    pub hours: String,
    #[serde(default = "RunPreferences::default_content_labels")]
    pub content_labels: Vec<String>,
    #[serde(default = "RunPreferences::default_calendar_url")]
    pub calendar_url: String,
    #[serde(default = "RunPreferences::default_webdriver_url")]
    pub webdriver_url: String,
    #[serde(default = "RunPreferences::default_portal_base_url")]
    pub portal_base_url: String,
}

impl RunPreferences {
    const fn default_with_time() -> bool {
        true
    }

    fn default_days() -> String {
        "1".to_string()
    }

    fn default_begin_time() -> String {
        "0830".to_string()
    }

    fn default_end_time() -> String {
        "1730".to_string()
    }

    fn default_hours() -> String {
        "8".to_string()
    }

    fn default_content_labels() -> Vec<String> {
        vec![SIMPLE_WORK_LABELS[0].to_string()]
    }

    fn default_calendar_url() -> String {
        DEFAULT_CALENDAR_URL.to_string()
    }

    fn default_webdriver_url() -> String {
        DEFAULT_WEBDRIVER_URL.to_string()
    }

    fn default_portal_base_url() -> String {
        DEFAULT_PORTAL_BASE_URL.to_string()
    }
}

impl Default for RunPreferences {
    fn default() -> Self {
        Self {
            username: String::new(),
            with_time: Self::default_with_time(),
            days: Self::default_days(),
            begin_time: Self::default_begin_time(),
            end_time: Self::default_end_time(),
            hours: Self::default_hours(),
            content_labels: Self::default_content_labels(),
            calendar_url: Self::default_calendar_url(),
            webdriver_url: Self::default_webdriver_url(),
            portal_base_url: Self::default_portal_base_url(),
        }
    }
}

/// Per-run overrides expressed by CLI flags, applied over the loaded file
/// configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub username: Option<String>,
    pub with_time: Option<bool>,
    pub days: Option<String>,
    pub begin_time: Option<String>,
    pub end_time: Option<String>,
    pub hours: Option<String>,
    pub content_labels: Option<Vec<String>>,
    pub calendar_url: Option<String>,
    pub webdriver_url: Option<String>,
    pub portal_base_url: Option<String>,
}

impl Overrides {
    /// Returns true when no overrides were provided.
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.with_time.is_none()
            && self.days.is_none()
            && self.begin_time.is_none()
            && self.end_time.is_none()
            && self.hours.is_none()
            && self.content_labels.is_none()
            && self.calendar_url.is_none()
            && self.webdriver_url.is_none()
            && self.portal_base_url.is_none()
    }
}

/// Apply overrides in place, collecting advisory warnings for values that
/// were ignored.
pub fn apply_overrides(
    preferences: &mut RunPreferences,
    overrides: &Overrides,
    warnings: &mut Vec<String>,
) {
    if let Some(username) = &overrides.username {
        preferences.username = username.trim().to_string();
    }
    if let Some(with_time) = overrides.with_time {
        preferences.with_time = with_time;
    }
    if let Some(days) = &overrides.days {
        match DayChoice::parse(days) {
            Ok(_) => preferences.days = days.trim().to_string(),
            Err(reason) => warnings.push(format!("Ignoring day choice override: {reason}")),
        }
    }
    if let Some(begin_time) = &overrides.begin_time {
        preferences.begin_time = begin_time.trim().to_string();
    }
    if let Some(end_time) = &overrides.end_time {
        preferences.end_time = end_time.trim().to_string();
    }
    if let Some(hours) = &overrides.hours {
        preferences.hours = hours.trim().to_string();
    }
    if let Some(labels) = &overrides.content_labels {
        let cleaned: Vec<String> = labels
            .iter()
            .map(|label| label.trim().to_string())
            .filter(|label| !label.is_empty())
            .collect();
        if cleaned.is_empty() {
            warnings.push("Ignoring empty work label override.".to_string());
        } else {
            preferences.content_labels = cleaned;
        }
    }
    if let Some(calendar_url) = &overrides.calendar_url {
        preferences.calendar_url = calendar_url.trim().to_string();
    }
    if let Some(webdriver_url) = &overrides.webdriver_url {
        preferences.webdriver_url = webdriver_url.trim().to_string();
    }
    if let Some(portal_base_url) = &overrides.portal_base_url {
        preferences.portal_base_url = portal_base_url.trim().to_string();
    }
}

/// Resolve the configuration directory, creating nothing.
pub fn config_directory() -> PathBuf {
    config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(".").join(CONFIG_DIR_NAME))
}

pub fn config_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}

/// Load `config.toml`, synthesizing defaults when it is absent or unusable.
/// A malformed file degrades to defaults with a warning rather than aborting.
pub fn load_config() -> ConfigLoadResult {
    load_config_from(&config_path())
}

fn load_config_from(path: &PathBuf) -> ConfigLoadResult {
    let mut warnings = Vec::new();

    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return ConfigLoadResult {
                config: FileConfig::default(),
                warnings,
                source: ConfigSource::Default,
            };
        }
        Err(err) => {
            warnings.push(format!(
                "Could not read {}: {err}; using defaults.",
                path.display()
            ));
            return ConfigLoadResult {
                config: FileConfig::default(),
                warnings,
                source: ConfigSource::Default,
            };
        }
    };

    match toml::from_str::<FileConfig>(&contents) {
        Ok(mut config) => {
            sanitize_config(&mut config, &mut warnings);
            ConfigLoadResult {
                config,
                warnings,
                source: ConfigSource::File,
            }
        }
        Err(err) => {
            warnings.push(format!(
                "Could not parse {}: {err}; using defaults.",
                path.display()
            ));
            ConfigLoadResult {
                config: FileConfig::default(),
                warnings,
                source: ConfigSource::Default,
            }
        }
    }
}

fn sanitize_config(config: &mut FileConfig, warnings: &mut Vec<String>) {
    if DayChoice::parse(&config.run.days).is_err() {
        warnings.push(format!(
            "Stored day choice '{}' is invalid; resetting to '{}'.",
            config.run.days,
            RunPreferences::default_days()
        ));
        config.run.days = RunPreferences::default_days();
    }

    config
        .run
        .content_labels
        .retain(|label| !label.trim().is_empty());
    if config.run.content_labels.is_empty() {
        warnings.push("Stored work label set was empty; restoring the default.".to_string());
        config.run.content_labels = RunPreferences::default_content_labels();
    }
}

/// Persist the configuration atomically (temp file then rename).
pub fn save_config(config: &FileConfig) -> Result<(), ConfigError> {
    save_config_to(config, &config_path())
}

fn save_config_to(config: &FileConfig, path: &PathBuf) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let rendered = toml::to_string_pretty(config)?;
    let temp_path = path.with_extension("toml.tmp");
    fs::write(&temp_path, rendered)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Turn loaded preferences plus the prompted password into a [`RunConfig`].
pub fn run_config_from_preferences(
    preferences: &RunPreferences,
    password: String,
) -> Result<RunConfig, String> {
    let day_choice = DayChoice::parse(&preferences.days)?;
    Ok(RunConfig {
        username: preferences.username.trim().to_string(),
        password,
        mode: if preferences.with_time {
            RunMode::WithTime
        } else {
            RunMode::Simple
        },
        day_choice,
        begin_time: preferences.begin_time.clone(),
        end_time: preferences.end_time.clone(),
        hours: preferences.hours.clone(),
        content_labels: preferences.content_labels.clone(),
        calendar_url: preferences.calendar_url.clone(),
        webdriver_url: preferences.webdriver_url.clone(),
        portal_base_url: preferences.portal_base_url.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_mirror_the_original_form() {
        let preferences = RunPreferences::default();
        assert!(preferences.with_time);
        assert_eq!(preferences.begin_time, "0830");
        assert_eq!(preferences.end_time, "1730");
        assert_eq!(preferences.hours, "8");
        assert_eq!(preferences.content_labels, vec!["閱讀文獻".to_string()]);
    }

    #[test]
    fn config_round_trips_through_toml() {
        let mut config = FileConfig::default();
        config.run.username = "A123456789".to_string();
        config.run.days = "all".to_string();
        config.run.content_labels = vec!["實驗實做".to_string(), "行政事務".to_string()];

        let rendered = toml::to_string_pretty(&config).unwrap();
        let parsed: FileConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let parsed: FileConfig = toml::from_str("[run]\nusername = \"A123456789\"\n").unwrap();
        assert_eq!(parsed.run.username, "A123456789");
        assert_eq!(parsed.run.days, "1");
        assert_eq!(parsed.run.portal_base_url, DEFAULT_PORTAL_BASE_URL);
    }

    #[test]
    fn load_and_save_round_trip_on_disk() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.toml");

        let mut config = FileConfig::default();
        config.run.username = "A123456789".to_string();
        save_config_to(&config, &path).unwrap();

        let loaded = load_config_from(&path);
        assert_eq!(loaded.source, ConfigSource::File);
        assert!(loaded.warnings.is_empty());
        assert_eq!(loaded.config, config);
    }

    #[test]
    fn malformed_file_degrades_to_defaults_with_warning() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "not toml at all [").unwrap();

        let loaded = load_config_from(&path);
        assert_eq!(loaded.source, ConfigSource::Default);
        assert_eq!(loaded.warnings.len(), 1);
        assert_eq!(loaded.config, FileConfig::default());
    }

    #[test]
    fn sanitize_resets_invalid_day_choice() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[run]\ndays = \"plenty\"\n").unwrap();

        let loaded = load_config_from(&path);
        assert_eq!(loaded.config.run.days, "1");
        assert_eq!(loaded.warnings.len(), 1);
    }

    #[test]
    fn overrides_apply_and_warn_on_invalid_values() {
        let mut preferences = RunPreferences::default();
        let mut warnings = Vec::new();
        let overrides = Overrides {
            username: Some(" A123456789 ".to_string()),
            with_time: Some(false),
            days: Some("nope".to_string()),
            content_labels: Some(vec!["  ".to_string()]),
            ..Overrides::default()
        };

        apply_overrides(&mut preferences, &overrides, &mut warnings);
        assert_eq!(preferences.username, "A123456789");
        assert!(!preferences.with_time);
        assert_eq!(preferences.days, "1");
        assert_eq!(preferences.content_labels, vec!["閱讀文獻".to_string()]);
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn empty_overrides_report_empty() {
        assert!(Overrides::default().is_empty());
        let overrides = Overrides {
            days: Some("all".to_string()),
            ..Overrides::default()
        };
        assert!(!overrides.is_empty());
    }

    #[test]
    fn run_config_conversion_parses_day_choice_and_mode() {
        let mut preferences = RunPreferences::default();
        preferences.username = "A123456789".to_string();
        preferences.days = "all".to_string();
        preferences.with_time = false;

        let config = run_config_from_preferences(&preferences, "secret".to_string()).unwrap();
        assert_eq!(config.day_choice, DayChoice::All);
        assert_eq!(config.mode, RunMode::Simple);
        assert_eq!(config.password, "secret");
    }
}
