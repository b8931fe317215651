use crate::error::ConfigError;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{EvaluatorConfig, PriceFeedConfig, Settings, TelegramConfig};

/// Loads the application configuration.
///
/// Precedence, lowest to highest: built-in defaults, an optional `config.toml`
/// next to the binary, then `VIGIL__`-prefixed environment variables
/// (e.g. `VIGIL__TELEGRAM__TOKEN`). Secrets are expected to arrive through
/// the environment, typically via a `.env` file loaded before this call.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = config::Config::builder()
        .set_default("price_feed.base_url", "https://api.binance.com")?
        .set_default("price_feed.quote_currency", "USDT")?
        .set_default("price_feed.request_timeout_secs", 10_i64)?
        .set_default("evaluator.interval_secs", 300_i64)?
        .set_default("telegram.token", "")?
        .add_source(config::File::with_name("config").required(false))
        .add_source(config::Environment::with_prefix("VIGIL").separator("__"))
        .build()?;

    let settings = builder.try_deserialize::<Settings>()?;
    settings.validate()?;

    Ok(settings)
}
