use async_trait::async_trait;

use crate::{TransportError, positions::position::Position};

pub mod dto;
pub mod group;
pub mod position;
pub mod positions_book;

/// One-shot source of the open positions the engine starts from.
#[async_trait]
pub trait PositionsSnapshotSource: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<Vec<Position>, TransportError>;
}
