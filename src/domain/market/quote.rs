use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of the P2P order book being queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "BUY"),
            TradeSide::Sell => write!(f, "SELL"),
        }
    }
}

/// A resolved price, optionally with the two book sides it was derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub price: Decimal,
    pub buy: Option<Decimal>,
    pub sell: Option<Decimal>,
    /// Base URL of the endpoint that served the quote
    pub endpoint: String,
}

impl Quote {
    pub fn spot(price: Decimal, endpoint: impl Into<String>) -> Self {
        Self {
            price,
            buy: None,
            sell: None,
            endpoint: endpoint.into(),
        }
    }

    /// Midpoint quote from the averaged BUY and SELL sides.
    pub fn from_sides(buy: Decimal, sell: Decimal, endpoint: impl Into<String>) -> Self {
        Self {
            price: (buy + sell) / Decimal::TWO,
            buy: Some(buy),
            sell: Some(sell),
            endpoint: endpoint.into(),
        }
    }
}
