use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::{TransportError, prices::dto::AStr};

pub mod dto;
pub mod subscription;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceTick {
    pub symbol: AStr,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

impl PriceTick {
    pub fn new(symbol: impl Into<AStr>, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            timestamp: Utc::now(),
        }
    }
}

/// One delivery from the feed: a batch of ticks, or a recoverable stream fault.
pub type TickBatch = Result<Vec<PriceTick>, TransportError>;
pub type TickReceiver = mpsc::Receiver<TickBatch>;

/// Push-based price stream collaborator.
///
/// `ticks` hands out the long-lived receiving side once; the engine owns it for the rest of
/// its life and drops it on teardown.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn subscribe(&self, symbols: &[AStr]);
    async fn unsubscribe(&self, symbols: &[AStr]);
    fn ticks(&self) -> Option<TickReceiver>;
    async fn disconnect(&self);
}
