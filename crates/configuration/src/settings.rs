use crate::error::ConfigError;
use serde::Deserialize;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub telegram: TelegramConfig,
    pub price_feed: PriceFeedConfig,
    pub evaluator: EvaluatorConfig,
}

/// Credentials for the Telegram Bot API.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// The bot token issued by BotFather. Required; there is no usable default.
    pub token: String,
}

/// Parameters for the spot price feed.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceFeedConfig {
    /// Base URL of the exchange REST API.
    pub base_url: String,
    /// The reference currency every symbol is quoted against (e.g. "USDT").
    pub quote_currency: String,
    /// Per-request timeout, so one slow symbol cannot stall a whole
    /// evaluation run.
    pub request_timeout_secs: u64,
}

/// Parameters for the periodic alert evaluation task.
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluatorConfig {
    /// Seconds between evaluation runs. The first run fires immediately.
    pub interval_secs: u64,
}

impl Settings {
    /// Rejects configurations the application cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram.token.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "telegram.token must be set (VIGIL__TELEGRAM__TOKEN)".to_string(),
            ));
        }
        if self.evaluator.interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "evaluator.interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
