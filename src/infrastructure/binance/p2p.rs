//! Binance P2P order book quote
//!
//! Queries the public advertisement search for both book sides and prices
//! the pair at the midpoint of the averaged best offers.

use crate::config::P2pConfig;
use crate::domain::errors::QuoteError;
use crate::domain::market::quote::{Quote, TradeSide};
use crate::domain::ports::{JsonTransport, QuoteSource};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

pub const ADV_SEARCH_PATH: &str = "/bapi/c2c/v2/friendly/c2c/adv/search";

#[derive(Debug, Deserialize)]
struct AdvSearchResponse {
    #[serde(default)]
    data: Option<Vec<AdvEntry>>,
}

#[derive(Debug, Deserialize)]
struct AdvEntry {
    adv: Adv,
}

#[derive(Debug, Deserialize)]
struct Adv {
    price: String,
}

pub struct BinanceP2pQuoteSource {
    transport: Arc<dyn JsonTransport>,
    config: P2pConfig,
}

impl BinanceP2pQuoteSource {
    pub fn new(transport: Arc<dyn JsonTransport>, config: P2pConfig) -> Self {
        Self { transport, config }
    }

    /// Request payload for one side of the book.
    pub fn search_body(&self, side: TradeSide) -> Value {
        json!({
            "page": 1,
            "rows": self.config.rows,
            "payTypes": [],
            "asset": self.config.asset,
            "fiat": self.config.fiat,
            "tradeType": side.to_string(),
            "merchantCheck": false
        })
    }

    /// Mean price of the best `top_n` offers on one side.
    async fn side_average(&self, base_url: &str, side: TradeSide) -> Result<Decimal, QuoteError> {
        let url = format!("{}{}", base_url, ADV_SEARCH_PATH);
        let body = self.transport.post_json(&url, &self.search_body(side)).await?;

        let response: AdvSearchResponse =
            serde_json::from_value(body).map_err(|e| QuoteError::MalformedResponse {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let prices = response
            .data
            .unwrap_or_default()
            .into_iter()
            .take(self.config.top_n)
            .map(|entry| parse_price(&url, &entry.adv.price))
            .collect::<Result<Vec<_>, _>>()?;

        if prices.is_empty() {
            return Err(QuoteError::EmptyOrderBook {
                side: side.to_string(),
            });
        }

        let average = prices.iter().sum::<Decimal>() / Decimal::from(prices.len());
        debug!(
            "P2P {} {}/{}: {} offers, avg {}",
            side,
            self.config.asset,
            self.config.fiat,
            prices.len(),
            average
        );
        Ok(average)
    }
}

fn parse_price(url: &str, raw: &str) -> Result<Decimal, QuoteError> {
    let price = Decimal::from_str(raw.trim()).map_err(|e| QuoteError::MalformedResponse {
        url: url.to_string(),
        reason: format!("invalid offer price {:?}: {}", raw, e),
    })?;
    if price <= Decimal::ZERO {
        return Err(QuoteError::NonPositivePrice {
            price: price.to_string(),
        });
    }
    Ok(price)
}

#[async_trait]
impl QuoteSource for BinanceP2pQuoteSource {
    async fn fetch_from(&self, base_url: &str) -> Result<Quote, QuoteError> {
        let buy = self.side_average(base_url, TradeSide::Buy).await?;
        let sell = self.side_average(base_url, TradeSide::Sell).await?;
        Ok(Quote::from_sides(buy, sell, base_url))
    }

    fn name(&self) -> &str {
        "Binance P2P"
    }
}
