use crate::error::PriceError;
use crate::responses::TickerPrice;
use async_trait::async_trait;
use configuration::PriceFeedConfig;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::time::Duration;

pub mod error;
pub mod responses;

/// The abstract interface for a spot price feed. This trait is the contract
/// the evaluator uses, allowing the underlying implementation (live or mock)
/// to be swapped out.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetches the current price of `symbol` in the feed's reference currency.
    ///
    /// Every error kind is a per-symbol failure: callers skip the symbol for
    /// the current cycle and try again on the next one.
    async fn latest_price(&self, symbol: &str) -> Result<Decimal, PriceError>;
}

/// A concrete `PriceSource` backed by the Binance spot ticker endpoint.
#[derive(Clone)]
pub struct BinanceSpotClient {
    client: reqwest::Client,
    base_url: String,
    quote_currency: String,
}

impl BinanceSpotClient {
    pub fn new(config: &PriceFeedConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.request_timeout_secs))
                .build()
                .expect("Failed to build reqwest client"),
            base_url: config.base_url.clone(),
            quote_currency: config.quote_currency.clone(),
        }
    }

    /// Normalizes an alert symbol to the trading pair the feed expects,
    /// e.g. "btc" -> "BTCUSDT".
    fn pair_for(&self, symbol: &str) -> String {
        format!("{}{}", symbol.trim().to_uppercase(), self.quote_currency)
    }
}

#[async_trait]
impl PriceSource for BinanceSpotClient {
    async fn latest_price(&self, symbol: &str) -> Result<Decimal, PriceError> {
        let pair = self.pair_for(symbol);
        let url = format!("{}/api/v3/ticker/price", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("symbol", pair.as_str())])
            .send()
            .await?;

        let status = response.status();

        // Binance answers 400 (code -1121, "Invalid symbol.") for unknown
        // pairs; some compatible feeds use 404. Either way the symbol itself
        // is the problem, not the transport.
        if status == reqwest::StatusCode::BAD_REQUEST || status == reqwest::StatusCode::NOT_FOUND {
            return Err(PriceError::NotFound(pair));
        }
        if !status.is_success() {
            return Err(PriceError::Network(format!(
                "unexpected status {status} for {pair}"
            )));
        }

        let ticker = response
            .json::<TickerPrice>()
            .await
            .map_err(|e| PriceError::BadResponse(e.to_string()))?;

        Decimal::from_str(&ticker.price).map_err(|e| {
            PriceError::BadResponse(format!("undecodable price '{}': {e}", ticker.price))
        })
    }
}
