use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::prices::PriceTick;

pub type AStr = Arc<str>;

pub const SUBSCRIBED_QUOTES_PATH: &str = "/quotes/subscribed";

/// Frame pushed by the quotes socket. Only `/quotes/subscribed` frames carry prices.
#[derive(Debug, Clone, Deserialize)]
pub struct QuotesFrame {
    #[serde(rename = "p")]
    pub path: String,
    #[serde(rename = "d", default)]
    pub quotes: Vec<QuoteDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteDto {
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "b")]
    pub bid: f64,
    #[serde(rename = "t", default)]
    pub timestamp: Option<i64>,
}

impl QuotesFrame {
    pub fn into_ticks(self) -> Option<Vec<PriceTick>> {
        if self.path != SUBSCRIBED_QUOTES_PATH {
            return None;
        }

        let received_at = Utc::now();

        Some(
            self.quotes
                .into_iter()
                .map(|quote| quote.into_tick(received_at))
                .collect(),
        )
    }
}

impl QuoteDto {
    fn into_tick(self, received_at: DateTime<Utc>) -> PriceTick {
        PriceTick {
            symbol: AStr::from(self.symbol),
            price: self.bid,
            timestamp: self
                .timestamp
                .and_then(DateTime::from_timestamp_millis)
                .unwrap_or(received_at),
        }
    }
}
