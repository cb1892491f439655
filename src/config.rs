//! Configuration and settings management
//!
//! Loads settings from environment variables and defines the fixed generation
//! and scheduling parameters.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,

    /// DeepSeek API key for question generation
    pub deepseek_api_key: Option<String>,
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use fingram_bot::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails, including when
    /// `TELEGRAM_TOKEN` is not set anywhere.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(File::with_name("config/default").required(false))
            // Add in the current environment file
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked into git
            .add_source(File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of APP)
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Also add settings from environment variables directly (without prefix)
            // Note: Environment::default() auto-converts UPPER_SNAKE_CASE to snake_case
            // ignore_empty treats empty env vars as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        let mut settings: Self = s.try_deserialize()?;

        // Fallback: check the environment directly if config didn't pick the key up
        if settings.deepseek_api_key.is_none() {
            if let Ok(val) = std::env::var("DEEPSEEK_API_KEY") {
                if !val.is_empty() {
                    settings.deepseek_api_key = Some(val);
                }
            }
        }

        Ok(settings)
    }
}

/// Base URL of the DeepSeek chat-completions API
pub const DEEPSEEK_API_BASE: &str = "https://api.deepseek.com/v1";

/// Model used for question generation
pub const GENERATION_MODEL: &str = "deepseek-chat";

/// Sampling temperature for question generation
pub const GENERATION_TEMPERATURE: f64 = 0.7;

/// Maximum output tokens for one generated question
pub const GENERATION_MAX_TOKENS: u32 = 500;

/// Timeout for one generation request in seconds
pub const GENERATION_TIMEOUT_SECS: u64 = 10;

/// Dispatcher tick period in seconds
pub const DISPATCH_TICK_SECS: u64 = 60;

/// Fixed prompt sent to the generation API, verbatim from the product text
pub const QUESTION_PROMPT: &str =
    "Сгенерируй новый практический вопрос по финансовой грамотности для ежедневного задания. \
     Вопрос должен быть на русском языке, требовать развернутого ответа и охватывать разные аспекты: \
     инвестиции, бюджетрование, кредиты, сбережения или финансовое планирование. \
     Формат: четкий и понятный вопрос, который побуждает к размышлениям.";

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    // Scenarios share one test body to avoid environment variable races
    #[test]
    fn test_config_env_loading() -> Result<(), Box<dyn std::error::Error>> {
        // 1. Test standard loading
        env::set_var("TELEGRAM_TOKEN", "dummy_token");
        env::set_var("DEEPSEEK_API_KEY", "sk-test");

        let settings = Settings::new()?;
        assert_eq!(settings.telegram_token, "dummy_token");
        assert_eq!(settings.deepseek_api_key, Some("sk-test".to_string()));

        env::remove_var("DEEPSEEK_API_KEY");

        // 2. Empty env var is treated as unset
        env::set_var("DEEPSEEK_API_KEY", "");

        let settings = Settings::new()?;
        assert_eq!(settings.deepseek_api_key, None);

        env::remove_var("DEEPSEEK_API_KEY");

        // 3. Missing key stays None, token still loads
        let settings = Settings::new()?;
        assert_eq!(settings.telegram_token, "dummy_token");
        assert_eq!(settings.deepseek_api_key, None);

        env::remove_var("TELEGRAM_TOKEN");
        Ok(())
    }
}
