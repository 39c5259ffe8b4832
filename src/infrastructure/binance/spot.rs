//! Binance spot ticker quote

use crate::domain::errors::QuoteError;
use crate::domain::market::quote::Quote;
use crate::domain::ports::{JsonTransport, QuoteSource};
use crate::infrastructure::core::http_client_factory::build_url_with_query;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;

pub const TICKER_PRICE_PATH: &str = "/api/v3/ticker/price";

#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: String,
}

pub struct BinanceSpotQuoteSource {
    transport: Arc<dyn JsonTransport>,
    symbol: String,
}

impl BinanceSpotQuoteSource {
    pub fn new(transport: Arc<dyn JsonTransport>, symbol: impl Into<String>) -> Self {
        Self {
            transport,
            symbol: symbol.into(),
        }
    }

    pub fn ticker_url(&self, base_url: &str) -> String {
        build_url_with_query(
            &format!("{}{}", base_url, TICKER_PRICE_PATH),
            &[("symbol", self.symbol.as_str())],
        )
    }
}

#[async_trait]
impl QuoteSource for BinanceSpotQuoteSource {
    async fn fetch_from(&self, base_url: &str) -> Result<Quote, QuoteError> {
        let url = self.ticker_url(base_url);
        let body = self.transport.get_json(&url).await?;

        let ticker: TickerPrice =
            serde_json::from_value(body).map_err(|e| QuoteError::MalformedResponse {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let price =
            Decimal::from_str(ticker.price.trim()).map_err(|e| QuoteError::MalformedResponse {
                url: url.clone(),
                reason: format!("invalid price {:?}: {}", ticker.price, e),
            })?;
        if price <= Decimal::ZERO {
            return Err(QuoteError::NonPositivePrice {
                price: price.to_string(),
            });
        }

        Ok(Quote::spot(price, base_url))
    }

    fn name(&self) -> &str {
        "Binance Spot"
    }
}
