use anyhow::{anyhow, Context, Result};
use log::{LevelFilter, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use crate::scheduler::SchedulerConfig;
use crate::translation::ModelProfile;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Locale the source fields are written in
    pub source_locale: String,

    /// Locales to translate into
    pub target_locales: Vec<String>,

    /// Translation config
    pub translation: TranslationConfig,

    /// Scheduler tuning
    #[serde(default)]
    pub scheduler: SchedulerSettings,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: OpenAI
    #[default]
    OpenAI,
    // @provider: Anthropic
    Anthropic,
    // @provider: Google Gemini
    Gemini,
    // @provider: Ollama (local)
    Ollama,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Gemini => "Gemini",
            Self::Ollama => "Ollama",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::Gemini => "gemini".to_string(),
            Self::Ollama => "ollama".to_string(),
        }
    }

    // @returns: Model used when none is configured
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAI => "gpt-4o-mini",
            Self::Anthropic => "claude-3-5-haiku",
            Self::Gemini => "gemini-2.0-flash",
            Self::Ollama => "llama3.2:3b",
        }
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct TranslationConfig {
    // @field: Provider type identifier
    #[serde(default)]
    pub provider: TranslationProvider,

    // @field: Model name, empty for the provider default
    #[serde(default = "String::new")]
    pub model: String,

    // @field: Concurrency cap override, replaces the model profile's cap
    #[serde(default)]
    pub max_concurrency: Option<usize>,
}

impl TranslationConfig {
    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if self.model.trim().is_empty() {
            self.provider.default_model().to_string()
        } else {
            self.model.clone()
        }
    }

    /// Concurrency profile of the configured model
    pub fn profile(&self) -> ModelProfile {
        ModelProfile::for_model(self.provider, &self.get_model())
    }

    /// Hard concurrency cap for a batch
    pub fn effective_cap(&self) -> usize {
        self.profile().effective_concurrent_requests(self.max_concurrency)
    }
}

/// Scheduler tuning settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Retries per item after a rate limit
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff unit in milliseconds; retry n waits n times this
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Consecutive successes before the concurrency ceiling grows
    #[serde(default = "default_success_streak_threshold")]
    pub success_streak_threshold: usize,

    /// Minimum interval between partial progress events per item
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,
}

impl SchedulerSettings {
    pub fn to_scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            max_retries: self.max_retries,
            retry_base_delay: Duration::from_millis(self.retry_base_delay_ms),
            success_streak_threshold: self.success_streak_threshold,
        }
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            success_streak_threshold: default_success_streak_threshold(),
            progress_interval_ms: default_progress_interval_ms(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1000 // 1 second, multiplied by the retry number
}

fn default_success_streak_threshold() -> usize {
    3
}

fn default_progress_interval_ms() -> u64 {
    33 // about 30 updates per second
}

// Language code with optional region/script subtags: "en", "pt-BR", "zh_Hant"
static LOCALE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]{2,3}(?:[-_][A-Za-z0-9]{2,8})*$").unwrap());

/// Check that a locale code is well formed
pub fn is_valid_locale(locale: &str) -> bool {
    LOCALE_PATTERN.is_match(locale)
}

impl Config {
    /// Load the configuration from `path`, writing a default one if absent
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!(
                "Config file not found at '{}', creating default config.",
                path.display()
            );
            let config = Config::default();
            config.save(path)?;
            Ok(config)
        }
    }

    /// Load the configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .context(format!("Failed to open config file: {}", path.display()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .context(format!("Failed to parse config file: {}", path.display()))
    }

    /// Save the configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_json =
            serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        std::fs::write(path, config_json)
            .context(format!("Failed to write config to file: {}", path.display()))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if !is_valid_locale(&self.source_locale) {
            return Err(anyhow!("Invalid source locale: '{}'", self.source_locale));
        }

        if self.target_locales.is_empty() {
            return Err(anyhow!("At least one target locale is required"));
        }

        if let Some(invalid) = self.target_locales.iter().find(|l| !is_valid_locale(l)) {
            return Err(anyhow!("Invalid target locale: '{}'", invalid));
        }

        if self
            .target_locales
            .iter()
            .all(|l| l.eq_ignore_ascii_case(&self.source_locale))
        {
            warn!("All target locales equal the source locale, nothing will be translated");
        }

        if self.scheduler.success_streak_threshold == 0 {
            return Err(anyhow!("scheduler.success_streak_threshold must be at least 1"));
        }

        if self.translation.max_concurrency == Some(0) {
            return Err(anyhow!("translation.max_concurrency must be at least 1"));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_locale: "en".to_string(),
            target_locales: vec!["fr".to_string(), "de".to_string()],
            translation: TranslationConfig::default(),
            scheduler: SchedulerSettings::default(),
            log_level: LogLevel::default(),
        }
    }
}
