use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{AggregatorError, prices::dto::AStr, settings::ContractSettingsCache};

pub type PositionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionSide {
    Buy,
    Sell,
}

impl PositionSide {
    pub fn direction_sign(&self) -> f64 {
        match self {
            PositionSide::Buy => 1.0,
            PositionSide::Sell => -1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub id: PositionId,
    pub symbol: AStr,
    pub side: PositionSide,
    pub size: f64,
    pub open_time: DateTime<Utc>,
    pub open_price: f64,
    pub swap: f64,
    pub close_price: f64,
    /// Cached valuation, refreshed on every tick for `symbol`.
    pub profit: f64,
}

impl Position {
    /// Rejects sizes that are not positive, NaN included.
    pub fn validate_size(id: PositionId, size: f64) -> Result<(), AggregatorError> {
        if size > 0.0 {
            return Ok(());
        }

        Err(AggregatorError::InvalidPositionSize { id, size })
    }

    /// Profit against `reference_price`, or against the stored close price when there is none.
    pub fn calculate_profit(
        &self,
        reference_price: Option<f64>,
        settings: &ContractSettingsCache,
    ) -> Result<f64, AggregatorError> {
        let multiplier = settings.resolve_multiplier(&self.symbol)?;

        Ok(self.calculate_profit_with_multiplier(reference_price, multiplier))
    }

    pub(crate) fn calculate_profit_with_multiplier(
        &self,
        reference_price: Option<f64>,
        multiplier: f64,
    ) -> f64 {
        let latest_price = reference_price.unwrap_or(self.close_price);

        ((latest_price - self.open_price) * multiplier * self.side.direction_sign()) / 100.0
    }
}
