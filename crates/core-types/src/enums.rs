use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The comparison mode of an alert: fire at-or-below or at-or-above the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    LowerOrEqual,
    GreaterOrEqual,
}

impl Direction {
    /// Parses user input. Only an exact, case-insensitive "lower" or "greater"
    /// is accepted; anything else is `None` and the caller re-prompts.
    pub fn parse_input(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "lower" => Some(Direction::LowerOrEqual),
            "greater" => Some(Direction::GreaterOrEqual),
            _ => None,
        }
    }

    /// The string form stored in the `alerts.direction` column.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Direction::LowerOrEqual => "lower",
            Direction::GreaterOrEqual => "greater",
        }
    }

    /// The inverse of `as_db_str`, for rows read back from the database.
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "lower" => Some(Direction::LowerOrEqual),
            "greater" => Some(Direction::GreaterOrEqual),
            _ => None,
        }
    }

    /// Returns whether an observed price satisfies this direction against a target.
    pub fn is_hit(&self, price: Decimal, target: Decimal) -> bool {
        match self {
            Direction::LowerOrEqual => price <= target,
            Direction::GreaterOrEqual => price >= target,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::LowerOrEqual => write!(f, "<="),
            Direction::GreaterOrEqual => write!(f, ">="),
        }
    }
}
