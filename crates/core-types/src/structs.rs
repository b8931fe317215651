use crate::enums::Direction;
use crate::error::CoreError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A registered chat user. Created lazily on first contact with the bot,
/// never mutated or deleted afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Store-assigned surrogate key.
    pub id: i64,
    /// The Telegram account id. Unique per user.
    pub telegram_id: i64,
    pub first_name: String,
    /// Where notifications for this user are sent.
    pub chat_id: i64,
}

/// A persisted price alert: "notify when `symbol` is `direction` `target_price`".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Store-assigned surrogate key.
    pub id: i64,
    /// Owning user's surrogate key.
    pub user_id: i64,
    pub symbol: String,
    pub direction: Direction,
    pub target_price: Decimal,
}

/// A fully-collected, validated alert waiting to be persisted. This is the
/// only way an alert enters the store: partial drafts never leave the
/// conversation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub user_id: i64,
    pub symbol: String,
    pub direction: Direction,
    pub target_price: Decimal,
}

impl NewAlert {
    /// Builds a new alert, normalizing the symbol and rejecting values that
    /// must never reach the store.
    pub fn new(
        user_id: i64,
        symbol: &str,
        direction: Direction,
        target_price: Decimal,
    ) -> Result<Self, CoreError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(CoreError::InvalidInput(
                "symbol".to_string(),
                "must not be empty".to_string(),
            ));
        }
        if target_price <= Decimal::ZERO {
            return Err(CoreError::InvalidInput(
                "target_price".to_string(),
                format!("must be positive, got {target_price}"),
            ));
        }
        Ok(Self {
            user_id,
            symbol,
            direction,
            target_price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn new_alert_normalizes_symbol() {
        let a = NewAlert::new(1, " btc ", Direction::LowerOrEqual, dec!(30000)).unwrap();
        assert_eq!(a.symbol, "BTC");
    }

    #[test]
    fn new_alert_rejects_bad_fields() {
        assert!(NewAlert::new(1, "   ", Direction::LowerOrEqual, dec!(1)).is_err());
        assert!(NewAlert::new(1, "BTC", Direction::LowerOrEqual, dec!(0)).is_err());
        assert!(NewAlert::new(1, "BTC", Direction::LowerOrEqual, dec!(-5)).is_err());
    }
}
