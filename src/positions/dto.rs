use chrono::DateTime;
use serde::Deserialize;

use crate::{
    AggregatorError,
    positions::position::{Position, PositionId, PositionSide},
    prices::dto::AStr,
};

/// Body of the open positions snapshot response.
#[derive(Debug, Clone, Deserialize)]
pub struct PositionsSnapshotResponse {
    pub data: Vec<PositionDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionDto {
    pub id: PositionId,
    pub symbol: String,
    pub side: PositionSide,
    pub size: f64,
    pub open_time: i64,
    pub open_price: f64,
    pub swap: f64,
    pub close_price: f64,
}

impl TryFrom<PositionDto> for Position {
    type Error = AggregatorError;

    fn try_from(value: PositionDto) -> Result<Self, Self::Error> {
        Position::validate_size(value.id, value.size)?;

        Ok(Position {
            id: value.id,
            symbol: AStr::from(value.symbol),
            side: value.side,
            size: value.size,
            open_time: DateTime::from_timestamp_millis(value.open_time).unwrap_or_default(),
            open_price: value.open_price,
            swap: value.swap,
            close_price: value.close_price,
            profit: 0.0,
        })
    }
}

impl PositionsSnapshotResponse {
    pub fn into_positions(self) -> Result<Vec<Position>, AggregatorError> {
        self.data.into_iter().map(Position::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_response_into_positions() {
        let response: PositionsSnapshotResponse = serde_json::from_str(
            r#"{"data":[
                {"id":1,"symbol":"BTCUSD","side":"BUY","size":0.5,"openTime":1700000000000,"openPrice":35000.0,"swap":-0.12,"closePrice":35100.0},
                {"id":2,"symbol":"TTWO.US","side":"SELL","size":3,"openTime":1700000100000,"openPrice":140.5,"swap":0,"closePrice":139.0}
            ]}"#,
        )
        .unwrap();

        let positions = response.into_positions().unwrap();

        assert_eq!(positions.len(), 2);
        assert_eq!(positions[0].id, 1);
        assert_eq!(&*positions[0].symbol, "BTCUSD");
        assert_eq!(positions[0].side, PositionSide::Buy);
        assert_eq!(positions[0].open_time.timestamp_millis(), 1700000000000);
        assert_eq!(positions[0].profit, 0.0);
        assert_eq!(positions[1].side, PositionSide::Sell);
        assert_eq!(positions[1].size, 3.0);
    }

    #[test]
    fn test_snapshot_response_rejects_empty_position() {
        let response: PositionsSnapshotResponse = serde_json::from_str(
            r#"{"data":[
                {"id":7,"symbol":"ETHUSD","side":"BUY","size":0,"openTime":1700000000000,"openPrice":2000.0,"swap":0,"closePrice":1900.0}
            ]}"#,
        )
        .unwrap();

        assert!(matches!(
            response.into_positions(),
            Err(AggregatorError::InvalidPositionSize { id: 7, .. })
        ));
    }
}
