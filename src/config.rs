use std::time::Duration;

use thiserror::Error;

use crate::message::Locale;

/// Theme name used when `NOTIFY_THEME` is unset.
pub const DEFAULT_THEME: &str = "forum";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("failed to parse {name} as boolean: {value}")]
    ParseBool { name: String, value: String },
}

/// Application configuration loaded from environment variables.
///
/// The Discourse API key is deliberately absent: it is read from
/// `DISCOURSE_API_KEY` on every request so it can be rotated without a restart.
#[derive(Debug, Clone)]
pub struct Config {
    // Web Server
    pub web_host: String,
    pub web_port: u16,

    // Discourse
    pub discourse_base_url: Option<String>,
    pub enrichment_timeout: Duration,

    // Messages
    pub locale: Locale,
    /// Short previews are sent as the post's raw HTML. Telegram's HTML mode
    /// rejects tags such as `<p>`, so enabling this with Telegram delivery
    /// makes those messages fail.
    pub include_preview: bool,
    pub preview_max_chars: usize,

    // Delivery
    pub notify_theme: String,
    pub telegram_bot_token: Option<String>,
    pub telegram_api_url: String,
    pub subscriber_chat_ids: Vec<i64>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if an environment variable holds an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Web Server
            web_host: env_or_default("WEB_HOST", "0.0.0.0"),
            web_port: parse_env_u16("WEB_PORT", 8080)?,

            // Discourse
            discourse_base_url: optional_env("DISCOURSE_BASE_URL"),
            enrichment_timeout: Duration::from_secs(parse_env_u64(
                "ENRICHMENT_TIMEOUT_SECS",
                10,
            )?),

            // Messages
            locale: parse_locale(&env_or_default("MESSAGE_LOCALE", "en"))?,
            include_preview: parse_env_bool("MESSAGE_PREVIEW", false)?,
            preview_max_chars: parse_env_usize("PREVIEW_MAX_CHARS", 280)?,

            // Delivery
            notify_theme: env_or_default("NOTIFY_THEME", DEFAULT_THEME),
            telegram_bot_token: optional_env("TELEGRAM_BOT_TOKEN"),
            telegram_api_url: env_or_default("TELEGRAM_API_URL", "https://api.telegram.org"),
            subscriber_chat_ids: parse_chat_ids(&env_or_default("SUBSCRIBER_CHAT_IDS", ""))?,
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.preview_max_chars == 0 {
            return Err(ConfigError::InvalidValue {
                name: "PREVIEW_MAX_CHARS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.enrichment_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "ENRICHMENT_TIMEOUT_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.notify_theme.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "NOTIFY_THEME".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if let Some(base) = &self.discourse_base_url {
            if url::Url::parse(base).is_err() {
                return Err(ConfigError::InvalidValue {
                    name: "DISCOURSE_BASE_URL".to_string(),
                    message: format!("'{base}' is not an absolute URL"),
                });
            }
        }
        Ok(())
    }

    /// Configuration with defaults and no delivery backend, for tests.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            web_host: "127.0.0.1".to_string(),
            web_port: 0,
            discourse_base_url: None,
            enrichment_timeout: Duration::from_secs(5),
            locale: Locale::En,
            include_preview: false,
            preview_max_chars: 280,
            notify_theme: DEFAULT_THEME.to_string(),
            telegram_bot_token: None,
            telegram_api_url: "https://api.telegram.org".to_string(),
            subscriber_chat_ids: Vec::new(),
        }
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u16(name: &str, default: u16) -> Result<u16, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_usize(name: &str, default: usize) -> Result<usize, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::ParseBool {
                name: name.to_string(),
                value: val,
            }),
        },
        _ => Ok(default),
    }
}

fn parse_locale(value: &str) -> Result<Locale, ConfigError> {
    match value.to_lowercase().as_str() {
        "en" => Ok(Locale::En),
        "ru" => Ok(Locale::Ru),
        _ => Err(ConfigError::InvalidValue {
            name: "MESSAGE_LOCALE".to_string(),
            message: format!("must be 'en' or 'ru', got '{value}'"),
        }),
    }
}

fn parse_chat_ids(value: &str) -> Result<Vec<i64>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse().map_err(|e| ConfigError::ParseInt {
                name: "SUBSCRIBER_CHAT_IDS".to_string(),
                source: e,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_locale() {
        assert_eq!(parse_locale("en").unwrap(), Locale::En);
        assert_eq!(parse_locale("RU").unwrap(), Locale::Ru);
        assert!(parse_locale("de").is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_env_bool("NONEXISTENT_VAR", true).unwrap());
        assert!(!parse_env_bool("NONEXISTENT_VAR", false).unwrap());
    }

    #[test]
    fn test_parse_chat_ids() {
        assert_eq!(
            parse_chat_ids("123, -100456 ,789").unwrap(),
            vec![123, -100_456, 789]
        );
        assert!(parse_chat_ids("").unwrap().is_empty());
        assert!(parse_chat_ids(" , ").unwrap().is_empty());
        assert!(parse_chat_ids("12,abc").is_err());
    }

    #[test]
    fn test_validate_rejects_zero_preview() {
        let config = Config {
            preview_max_chars: 0,
            ..Config::for_testing()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_relative_base_url() {
        let config = Config {
            discourse_base_url: Some("forum.example.com".to_string()),
            ..Config::for_testing()
        };
        assert!(config.validate().is_err());

        let config = Config {
            discourse_base_url: Some("https://forum.example.com".to_string()),
            ..Config::for_testing()
        };
        assert!(config.validate().is_ok());
    }
}
