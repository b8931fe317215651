use serde::Deserialize;

/// The response from `GET /api/v3/ticker/price?symbol=<PAIR>`.
/// Binance serializes the price as a string; it is decoded into a `Decimal`
/// in one place so JSON-shape assumptions never leak into the evaluator.
#[derive(Debug, Clone, Deserialize)]
pub struct TickerPrice {
    pub symbol: String,
    pub price: String,
}
