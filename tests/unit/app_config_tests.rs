/*!
 * Tests for application configuration functionality
 */

use anyhow::Result;
use std::time::Duration;

use fieldwise::app_config::{Config, LogLevel, TranslationProvider};
use fieldwise::translation::ModelClass;
use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.source_locale, "en");
    assert_eq!(config.target_locales, vec!["fr".to_string(), "de".to_string()]);
    assert_eq!(config.translation.provider, TranslationProvider::OpenAI);
    assert_eq!(config.translation.max_concurrency, None);
    assert_eq!(config.scheduler.max_retries, 3);
    assert_eq!(config.scheduler.retry_base_delay_ms, 1000);
    assert_eq!(config.scheduler.success_streak_threshold, 3);
    assert_eq!(config.scheduler.progress_interval_ms, 33);
    assert_eq!(config.log_level, LogLevel::Info);
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.source_locale = "".to_string();
    assert!(config.validate().is_err());
    config.source_locale = "en".to_string();

    config.target_locales = Vec::new();
    assert!(config.validate().is_err());
    config.target_locales = vec!["fr".to_string(), "not a locale".to_string()];
    assert!(config.validate().is_err());
    config.target_locales = vec!["pt-BR".to_string()];
    assert!(config.validate().is_ok());

    config.scheduler.success_streak_threshold = 0;
    assert!(config.validate().is_err());
    config.scheduler.success_streak_threshold = 3;

    config.translation.max_concurrency = Some(0);
    assert!(config.validate().is_err());
    config.translation.max_concurrency = Some(2);
    assert!(config.validate().is_ok());
}

#[test]
fn test_provider_fromStr_withKnownNames_shouldParse() {
    assert_eq!("openai".parse::<TranslationProvider>().unwrap(), TranslationProvider::OpenAI);
    assert_eq!("Gemini".parse::<TranslationProvider>().unwrap(), TranslationProvider::Gemini);
    assert!("lmstudio".parse::<TranslationProvider>().is_err());
    assert_eq!(TranslationProvider::Anthropic.to_string(), "anthropic");
}

#[test]
fn test_translation_config_withEmptyModel_shouldUseProviderDefault() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::Gemini;
    config.translation.model = String::new();

    assert_eq!(config.translation.get_model(), "gemini-2.0-flash");
    assert_eq!(config.translation.profile().class, ModelClass::Light);
    assert_eq!(config.translation.effective_cap(), 6);
}

#[test]
fn test_translation_config_withHeavyModel_shouldLowerCap() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::Anthropic;
    config.translation.model = "claude-opus-4".to_string();
    assert_eq!(config.translation.effective_cap(), 3);

    config.translation.max_concurrency = Some(5);
    assert_eq!(config.translation.effective_cap(), 5);
}

#[test]
fn test_scheduler_settings_shouldConvertToSchedulerConfig() {
    let mut config = Config::default();
    config.scheduler.max_retries = 5;
    config.scheduler.retry_base_delay_ms = 250;

    let scheduler_config = config.scheduler.to_scheduler_config();
    assert_eq!(scheduler_config.max_retries, 5);
    assert_eq!(scheduler_config.retry_base_delay, Duration::from_millis(250));
    assert_eq!(scheduler_config.success_streak_threshold, 3);
    assert_eq!(config.scheduler.progress_interval(), Duration::from_millis(33));
}

#[test]
fn test_load_or_create_withMissingFile_shouldWriteDefault() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config_path = temp_dir.path().join("conf.json");

    let config = Config::load_or_create(&config_path)?;
    assert!(config_path.exists());
    assert_eq!(config.source_locale, "en");

    let reloaded = Config::load(&config_path)?;
    assert_eq!(reloaded.target_locales, config.target_locales);
    Ok(())
}

#[test]
fn test_load_withPartialFile_shouldFillSchedulerDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config_path = common::create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{
            "source_locale": "de",
            "target_locales": ["en", "it"],
            "translation": { "provider": "anthropic", "model": "claude-3-5-haiku" },
            "log_level": "debug"
        }"#,
    )?;

    let config = Config::load(&config_path)?;
    assert_eq!(config.source_locale, "de");
    assert_eq!(config.translation.provider, TranslationProvider::Anthropic);
    assert_eq!(config.scheduler.max_retries, 3);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.log_level.to_level_filter(), log::LevelFilter::Debug);
    Ok(())
}

#[test]
fn test_load_withInvalidJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config_path = common::create_test_file(temp_dir.path(), "conf.json", "{ not json")?;

    let error = Config::load(&config_path).unwrap_err();
    assert!(format!("{:#}", error).contains("Failed to parse config file"));
    Ok(())
}
